//! Vizij Animation Recorder
//!
//! Captures a live skeletal pose into a keyframed animation asset at a fixed
//! frame rate. A [`RecordingSession`] is driven as StartRecord, UpdateRecord
//! once per tick, and Stop. Pose data comes from any [`PoseSource`]; the
//! destination asset comes from an [`AssetStore`].

pub mod asset;
pub mod config;
pub mod curves;
pub mod error;
mod finalize;
pub mod ids;
pub mod outputs;
pub mod pose;
pub mod resample;
pub mod root_motion;
pub mod session;
pub mod skeleton;
pub mod store;
pub mod transform;

// Re-exports for hosts
pub use asset::{
    AnimationAsset, BoneTrack, CurveInterpMode, CurveKey, EditTransaction, FloatCurve,
    InterpolationMode, Marker, TangentMode, TransformKeys,
};
pub use config::{NameExclusion, NamePattern, RecorderConfig};
pub use curves::{CurveAccumulator, CurveFrame, CurveIdentityTable, CurveSample, Reconciliation};
pub use error::{PersistError, RecorderError, Result};
pub use finalize::clip_extent;
pub use ids::{AssetId, CurveUid};
pub use outputs::{RecorderEvent, RecordingSummary};
pub use pose::{sample_pose, LeaderPose, LeaderSnapshot, PoseSnapshot, PoseSource};
pub use resample::{FrameRate, ResampleStep, TimeResampler};
pub use root_motion::{extract_root, RootMotion, RootOffset};
pub use session::{RawBoneTrack, RecordingSession, SessionState};
pub use skeleton::{CurveCategory, CurveMeta, RigAsset, RigBone, RigTopology, Skeleton};
pub use store::{AcquiredAsset, AssetPath, AssetStore, JsonDirStore, MemoryAssetStore};
pub use transform::RigidTransform;
