//! Events emitted by the recorder.
//!
//! Non-fatal conditions and notifications are queued here instead of being
//! returned as errors. Hosts drain them with
//! [`crate::session::RecordingSession::drain_events`] and route them to UI or
//! telemetry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resample::FrameRate;

/// Completion summary of a finalized recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub asset: String,
    pub key_count: u32,
    /// Seconds.
    pub play_length: f32,
    pub frame_rate: FrameRate,
}

impl fmt::Display for RecordingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' has been successfully recorded [{} keys : {:.3} sec(s) @ {}]",
            self.asset, self.key_count, self.play_length, self.frame_rate
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RecorderEvent {
    RecordingStarted {
        asset: String,
        bone_tracks: usize,
        /// False when an existing asset was reused.
        fresh: bool,
    },
    /// The curve identity table changed size between frames.
    CurveTableInconsistent {
        frame: u32,
        expected_slots: usize,
        actual_slots: usize,
    },
    CurveSkipped {
        uid: u16,
        name: Option<String>,
    },
    /// Bone kept with a single key because its name is excluded.
    BoneMotionDiscarded {
        bone: String,
    },
    RecordingAborted {
        asset: String,
        frame: u32,
        reason: String,
    },
    AssetSaved {
        asset: String,
        seconds: f64,
    },
    PersistenceFailed {
        asset: String,
        reason: String,
    },
    RecordingCompleted(RecordingSummary),
}
