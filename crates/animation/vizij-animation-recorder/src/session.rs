//! Recording session: StartRecord, then UpdateRecord once per tick, then Stop.
//!
//! A [`RecordingSession`] owns the destination asset for the whole recording.
//! The asset is held inside an open [`EditTransaction`]. Stop commits it,
//! including after a failed frame, when only the frames captured before the
//! failure are written. A dropped or restarted recording rolls it back and
//! hands it back to the store untouched.

use std::fmt;
use std::mem;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asset::{AnimationAsset, EditTransaction, TransformKeys};
use crate::config::RecorderConfig;
use crate::curves::{CurveAccumulator, CurveSample, Reconciliation};
use crate::error::{RecorderError, Result};
use crate::finalize;
use crate::outputs::RecorderEvent;
use crate::pose::{sample_pose, PoseSource};
use crate::resample::TimeResampler;
use crate::root_motion::{extract_root, RootMotion};
use crate::skeleton::{RigTopology, Skeleton};
use crate::store::{AcquiredAsset, AssetPath, AssetStore, MemoryAssetStore};
use crate::transform::RigidTransform;

const START_TRANSACTION_LABEL: &str = "Starting Animation Recording";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    /// A frame failed its integrity check. The frames before it are kept
    /// and Stop still finalizes them.
    Faulted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Faulted => "faulted",
        })
    }
}

/// Raw keys captured for one recorded bone.
#[derive(Clone, Debug, PartialEq)]
pub struct RawBoneTrack {
    pub name: String,
    /// Index into the bound skeleton's bone list.
    pub skeleton_index: usize,
    /// Rig index the bone had at StartRecord.
    pub rig_index: usize,
    pub keys: TransformKeys,
}

impl RawBoneTrack {
    /// Current rig index of this track's bone. Falls back to a name lookup
    /// when the bone moved.
    fn resolve(&self, rig: &RigTopology) -> Option<usize> {
        match rig.bones.get(self.rig_index) {
            Some(bone) if bone.name == self.name => Some(self.rig_index),
            _ => rig.bone_index(&self.name),
        }
    }

    fn mismatch(&self, frame: u32, detail: impl Into<String>) -> RecorderError {
        RecorderError::FrameIntegrityMismatch {
            frame,
            track: self.name.clone(),
            detail: detail.into(),
        }
    }
}

/// Buffers of an in-flight recording.
pub(crate) struct ActiveRecording {
    pub(crate) transaction: EditTransaction,
    pub(crate) skeleton: Arc<Skeleton>,
    pub(crate) tracks: Vec<RawBoneTrack>,
    /// Number of frames captured so far (last frame index + 1).
    pub(crate) frame_count: u32,
    pub(crate) resampler: TimeResampler,
    pub(crate) root: RootMotion,
    pub(crate) curves: CurveAccumulator,
    pub(crate) timestamps: Vec<f64>,
}

impl ActiveRecording {
    /// Capture one frame. On error every track is truncated back to its
    /// length before the call and nothing else is touched.
    #[allow(clippy::too_many_arguments)]
    fn capture(
        &mut self,
        cfg: &RecorderConfig,
        rig: &RigTopology,
        component_to_world: &RigidTransform,
        transforms: &[RigidTransform],
        curves: &CurveSample,
        frame: u32,
        events: &mut Vec<RecorderEvent>,
    ) -> Result<()> {
        if frame == 0 {
            let bones: Vec<usize> = self.tracks.iter().map(|t| t.rig_index).collect();
            self.root = extract_root(&bones, rig, transforms, cfg.remove_root_transform);
        }

        let lengths: Vec<usize> = self.tracks.iter().map(|t| t.keys.len()).collect();
        if let Err(err) = self.capture_bones(cfg, rig, component_to_world, transforms, frame) {
            for (track, len) in self.tracks.iter_mut().zip(lengths) {
                track.keys.truncate(len);
            }
            return Err(err);
        }

        self.timestamps.push(self.resampler.time_passed());

        if cfg.records_curves() && !curves.is_empty() {
            match self.curves.push(frame, curves) {
                Some(Reconciliation::Inconsistent { expected, actual }) => {
                    log::warn!(
                        "curve identity table changed size on frame {frame}: {expected} -> {actual} slots"
                    );
                    events.push(RecorderEvent::CurveTableInconsistent {
                        frame,
                        expected_slots: expected,
                        actual_slots: actual,
                    });
                }
                Some(Reconciliation::Replace) => {
                    log::debug!("curve identity table replaced on frame {frame}");
                }
                _ => {}
            }
        }

        self.frame_count = frame + 1;
        Ok(())
    }

    fn capture_bones(
        &mut self,
        cfg: &RecorderConfig,
        rig: &RigTopology,
        component_to_world: &RigidTransform,
        transforms: &[RigidTransform],
        frame: u32,
    ) -> Result<()> {
        for track in &mut self.tracks {
            if cfg.record_transforms {
                let bone = track
                    .resolve(rig)
                    .ok_or_else(|| track.mismatch(frame, "bone is no longer part of the rig"))?;
                let component = transforms.get(bone).ok_or_else(|| {
                    track.mismatch(
                        frame,
                        format!("pose holds {} transform(s), bone index is {bone}", transforms.len()),
                    )
                })?;
                let local = match rig.parent(bone) {
                    Some(parent) => {
                        let parent_pose = transforms.get(parent).ok_or_else(|| {
                            track.mismatch(
                                frame,
                                format!(
                                    "pose holds {} transform(s), parent index is {parent}",
                                    transforms.len()
                                ),
                            )
                        })?;
                        component.relative_to(parent_pose)
                    }
                    None if cfg.record_local_to_world => component_to_world * component,
                    None => *component,
                };
                track.keys.push(&local);
                if track.keys.len() != frame as usize + 1 {
                    return Err(track.mismatch(
                        frame,
                        format!(
                            "only {} frame(s) exist; changing the skeleton while recording is not supported",
                            track.keys.len() - 1
                        ),
                    ));
                }
            } else if frame == 0 {
                let bone = track
                    .resolve(rig)
                    .ok_or_else(|| track.mismatch(frame, "bone is no longer part of the rig"))?;
                track.keys.push(&rig.bones[bone].reference_pose);
            }
        }
        Ok(())
    }
}

/// A recording halted by a failed frame. The transaction stays open.
pub(crate) struct FaultedRecording {
    active: ActiveRecording,
    error: RecorderError,
}

enum Phase {
    Idle,
    Recording(Box<ActiveRecording>),
    Faulted(Box<FaultedRecording>),
}

/// Captures a live pose into an [`AnimationAsset`] at a fixed frame rate.
pub struct RecordingSession<S: AssetStore = MemoryAssetStore> {
    cfg: RecorderConfig,
    store: S,
    phase: Phase,
    events: Vec<RecorderEvent>,
}

impl<S: AssetStore> RecordingSession<S> {
    pub fn new(cfg: RecorderConfig, store: S) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            store,
            phase: Phase::Idle,
            events: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &RecorderConfig {
        &self.cfg
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Recording(_) => SessionState::Recording,
            Phase::Faulted(_) => SessionState::Faulted,
        }
    }

    /// Events queued since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<RecorderEvent> {
        mem::take(&mut self.events)
    }

    #[inline]
    pub fn events(&self) -> &[RecorderEvent] {
        &self.events
    }

    /// Number of frames captured by the current (or faulted) recording.
    pub fn recorded_frames(&self) -> u32 {
        match &self.phase {
            Phase::Idle => 0,
            Phase::Recording(active) => active.frame_count,
            Phase::Faulted(faulted) => faulted.active.frame_count,
        }
    }

    pub fn last_frame(&self) -> Option<u32> {
        self.recorded_frames().checked_sub(1)
    }

    /// Raw bone tracks of the current (or faulted) recording.
    pub fn bone_tracks(&self) -> &[RawBoneTrack] {
        match &self.phase {
            Phase::Idle => &[],
            Phase::Recording(active) => &active.tracks,
            Phase::Faulted(faulted) => &faulted.active.tracks,
        }
    }

    /// Accumulated tick time at each captured frame.
    pub fn timestamps(&self) -> &[f64] {
        match &self.phase {
            Phase::Idle => &[],
            Phase::Recording(active) => &active.timestamps,
            Phase::Faulted(faulted) => &faulted.active.timestamps,
        }
    }

    pub fn curve_frames(&self) -> usize {
        match &self.phase {
            Phase::Idle => 0,
            Phase::Recording(active) => active.curves.len(),
            Phase::Faulted(faulted) => faulted.active.curves.len(),
        }
    }

    pub fn root_motion(&self) -> Option<&RootMotion> {
        match &self.phase {
            Phase::Recording(active) => Some(&active.root),
            Phase::Faulted(faulted) => Some(&faulted.active.root),
            Phase::Idle => None,
        }
    }

    /// Error that moved the session into [`SessionState::Faulted`].
    pub fn fault(&self) -> Option<&RecorderError> {
        match &self.phase {
            Phase::Faulted(faulted) => Some(&faulted.error),
            _ => None,
        }
    }

    /// Acquire the destination, set up one track per skeleton-mapped rig bone,
    /// and capture frame 0 from `source`.
    pub fn start_record(&mut self, source: &dyn PoseSource, namespace: &str, name: &str) -> Result<()> {
        if let Phase::Recording(_) = self.phase {
            return Err(RecorderError::precondition("start_record", SessionState::Recording));
        }
        self.discard("restarted");
        let path = AssetPath::parse(namespace, name)?;
        let rig = source.rig();
        rig.validate()?;
        let skeleton = Arc::clone(source.skeleton());

        let AcquiredAsset { asset, fresh } = self.store.acquire(&path, &skeleton)?;
        let mut transaction = EditTransaction::open(asset, START_TRANSACTION_LABEL);
        if !fresh {
            if self.cfg.keep_curves_and_markers {
                transaction.asset_mut().remove_all_bone_tracks();
            } else {
                transaction.asset_mut().reset_animation();
            }
        }

        let mut tracks = Vec::new();
        for (rig_index, skeleton_index) in rig.skeleton_mapping(&skeleton).into_iter().enumerate() {
            let bone_name = &rig.bones[rig_index].name;
            let Some(skeleton_index) = skeleton_index else {
                log::debug!("rig bone '{bone_name}' is not in skeleton '{}'", skeleton.name);
                continue;
            };
            if !transaction.asset_mut().add_bone_track(bone_name) {
                log::warn!("duplicate rig bone '{bone_name}' recorded once");
                continue;
            }
            tracks.push(RawBoneTrack {
                name: bone_name.clone(),
                skeleton_index,
                rig_index,
                keys: TransformKeys::default(),
            });
        }

        let asset_path = transaction.asset().path();
        log::info!(
            "recording {} bone track(s) into {asset_path} at {}",
            tracks.len(),
            self.cfg.recording_rate
        );
        self.events.push(RecorderEvent::RecordingStarted {
            asset: asset_path,
            bone_tracks: tracks.len(),
            fresh,
        });

        let component_to_world = source.component_to_world();
        self.phase = Phase::Recording(Box::new(ActiveRecording {
            transaction,
            skeleton,
            tracks,
            frame_count: 0,
            resampler: TimeResampler::new(component_to_world),
            root: RootMotion::default(),
            curves: CurveAccumulator::new(),
            timestamps: Vec::new(),
        }));

        let pose = sample_pose(source);
        let curves = source.curves();
        self.record(source, &component_to_world, &pose, &curves, 0)
    }

    /// Advance by `delta_time` seconds and capture the next fixed-rate frame.
    pub fn update_record(&mut self, source: &dyn PoseSource, delta_time: f32) -> Result<()> {
        let state = self.state();
        let Phase::Recording(active) = &mut self.phase else {
            return Err(RecorderError::precondition("update_record", state));
        };
        let current = source.component_to_world();
        let last_frame = active.frame_count.saturating_sub(1);
        let step = active
            .resampler
            .advance(self.cfg.recording_rate, last_frame, delta_time);
        let root = active.resampler.blend_root(&current, step.blend_alpha);
        log::trace!(
            "frame {} at {:.4}s, root blend {:.3}",
            step.frame,
            step.target_time,
            step.blend_alpha
        );

        let pose = sample_pose(source);
        let curves = source.curves();
        self.record(source, &root, &pose, &curves, step.frame)?;

        if let Phase::Recording(active) = &mut self.phase {
            active.resampler.commit(current);
        }
        Ok(())
    }

    /// Capture `transforms` (component space, rig order) as `frame`.
    ///
    /// A frame that lands at the wrong key index halts the recording: the
    /// session becomes [`SessionState::Faulted`] and keeps the frames captured
    /// before it.
    pub fn record(
        &mut self,
        source: &dyn PoseSource,
        component_to_world: &RigidTransform,
        transforms: &[RigidTransform],
        curves: &CurveSample,
        frame: u32,
    ) -> Result<()> {
        let state = self.state();
        let Phase::Recording(active) = &mut self.phase else {
            return Err(RecorderError::precondition("record", state));
        };
        let result = active.capture(
            &self.cfg,
            source.rig(),
            component_to_world,
            transforms,
            curves,
            frame,
            &mut self.events,
        );
        result.map_err(|err| self.abort(err))
    }

    /// Finalize the recording into the destination asset.
    ///
    /// Returns `None` if nothing was being recorded. A faulted recording is
    /// finalized with the frames captured before the failure.
    pub fn stop(&mut self, show_notification: bool) -> Option<AnimationAsset> {
        let active = match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => return None,
            Phase::Recording(active) => *active,
            Phase::Faulted(faulted) => {
                log::debug!(
                    "finalizing {} frame(s) recorded before: {}",
                    faulted.active.frame_count,
                    faulted.error
                );
                faulted.active
            }
        };
        Some(finalize::finalize(
            active,
            &self.cfg,
            &mut self.store,
            show_notification,
            &mut self.events,
        ))
    }

    fn abort(&mut self, error: RecorderError) -> RecorderError {
        let Phase::Recording(active) = mem::replace(&mut self.phase, Phase::Idle) else {
            return error;
        };
        let asset = active.transaction.asset().path();
        let frame = match &error {
            RecorderError::FrameIntegrityMismatch { frame, .. } => *frame,
            _ => active.frame_count,
        };
        log::warn!("recording into {asset} aborted: {error}");
        self.events.push(RecorderEvent::RecordingAborted {
            asset,
            frame,
            reason: error.to_string(),
        });
        self.phase = Phase::Faulted(Box::new(FaultedRecording {
            active: *active,
            error: error.clone(),
        }));
        error
    }

    /// Roll back an open recording and return its asset to the store.
    fn discard(&mut self, why: &str) {
        let active = match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => return,
            Phase::Recording(active) => *active,
            Phase::Faulted(faulted) => faulted.active,
        };
        log::warn!(
            "recording session {why} while recording into {}",
            active.transaction.asset().path()
        );
        self.store.release(active.transaction.rollback());
    }
}

impl<S: AssetStore> Drop for RecordingSession<S> {
    fn drop(&mut self) {
        self.discard("dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::RigBone;
    use crate::pose::PoseSnapshot;
    use glam::Vec3;

    fn snapshot() -> PoseSnapshot {
        let rig = RigTopology {
            bones: vec![
                RigBone {
                    name: "root".into(),
                    parent: None,
                    reference_pose: RigidTransform::IDENTITY,
                },
                RigBone {
                    name: "spine".into(),
                    parent: Some(0),
                    reference_pose: RigidTransform::from_translation(Vec3::Y),
                },
            ],
        };
        let skeleton = Arc::new(Skeleton {
            name: "biped".into(),
            bones: vec!["root".into(), "spine".into()],
            curves: vec![],
        });
        PoseSnapshot::at_reference(rig, skeleton)
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Faulted.to_string(), "faulted");
    }

    #[test]
    fn track_resolves_moved_bone_by_name() {
        let snap = snapshot();
        let track = RawBoneTrack {
            name: "spine".into(),
            skeleton_index: 1,
            rig_index: 0,
            keys: TransformKeys::default(),
        };
        assert_eq!(track.resolve(&snap.rig), Some(1));
    }

    #[test]
    fn failed_capture_truncates_every_track() {
        let snap = snapshot();
        let mut session = RecordingSession::new(RecorderConfig::default(), MemoryAssetStore::new()).unwrap();
        session.start_record(&snap, "/Game/Rec", "Take").unwrap();
        // Frame 2 skips frame 1: the first track gets a key at index 1.
        let err = session
            .record(&snap, &RigidTransform::IDENTITY, &snap.transforms, &CurveSample::empty(), 2)
            .unwrap_err();
        assert!(err.is_fatal_to_session());
        assert_eq!(session.state(), SessionState::Faulted);
        assert!(session.bone_tracks().iter().all(|t| t.keys.len() == 1));
    }

    #[test]
    fn dropping_mid_recording_returns_asset_to_store() {
        let snap = snapshot();
        let mut store = MemoryAssetStore::new();
        let mut existing = AnimationAsset::new("/Game/Rec", "Take", "biped");
        existing.key_count = 7;
        store.insert(existing);
        {
            let mut session = RecordingSession::new(RecorderConfig::default(), &mut store).unwrap();
            session.start_record(&snap, "/Game/Rec", "Take").unwrap();
            assert!(session.store().get("/Game/Rec/Take").is_none());
        }
        let restored = store.get("/Game/Rec/Take").unwrap();
        assert_eq!(restored.key_count, 7);
    }
}
