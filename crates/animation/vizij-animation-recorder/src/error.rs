//! Error types for the animation recorder.
//!
//! Only conditions that stop an operation are errors. Bookkeeping
//! inconsistencies (curve tables, failed saves) are reported as
//! [`crate::outputs::RecorderEvent`]s instead.

use crate::session::SessionState;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RecorderError {
    /// Destination namespace or asset name rejected at StartRecord.
    #[error("Invalid destination '{path}': {reason}")]
    InvalidDestination { path: String, reason: String },

    /// The pose source's rig is not a valid hierarchy.
    #[error("Invalid rig topology: {reason}")]
    InvalidRig { reason: String },

    /// The asset store could not provide a destination asset.
    #[error("Failed to create destination asset '{path}': {reason}")]
    AssetCreation { path: String, reason: String },

    /// A recorded key landed at the wrong index, usually because the rig's
    /// bone set changed while recording.
    #[error("Mismatch in animation frames. Trying to record frame {frame} on track '{track}': {detail}")]
    FrameIntegrityMismatch {
        frame: u32,
        track: String,
        detail: String,
    },

    /// Operation invoked in a state that does not allow it.
    #[error("{operation} is not allowed while the recorder is {state}")]
    PreconditionViolation {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Invalid recorder config: {reason}")]
    InvalidConfig { reason: String },
}

impl RecorderError {
    pub(crate) fn precondition(operation: &'static str, state: SessionState) -> Self {
        Self::PreconditionViolation { operation, state }
    }

    /// True when the error ended the active recording (the session is now Faulted).
    #[inline]
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, Self::FrameIntegrityMismatch { .. })
    }
}

/// Failure writing a finalized asset to durable storage.
#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Persistence rejected: {reason}")]
    Rejected { reason: String },
}

pub type Result<T> = core::result::Result<T, RecorderError>;
