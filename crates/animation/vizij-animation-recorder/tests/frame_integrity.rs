use std::sync::Arc;

use vizij_animation_recorder::{
    AnimationAsset, CurveSample, MemoryAssetStore, PoseSnapshot, RecorderConfig, RecorderError,
    RecorderEvent, RecordingSession, RigAsset, RigidTransform, SessionState,
};

fn humanoid() -> PoseSnapshot {
    let rig: RigAsset = vizij_test_fixtures::rigs::load("humanoid").expect("humanoid rig fixture");
    PoseSnapshot::at_reference(rig.rig, Arc::new(rig.skeleton))
}

fn existing_take() -> AnimationAsset {
    let mut asset = AnimationAsset::new("/Game/Recordings", "Take", "SK_Humanoid");
    asset.key_count = 42;
    asset
}

fn recording_with_two_frames() -> (RecordingSession, PoseSnapshot) {
    let pose = humanoid();
    let mut store = MemoryAssetStore::new();
    store.insert(existing_take());
    let mut rec = RecordingSession::new(RecorderConfig::default(), store).unwrap();
    rec.start_record(&pose, "/Game/Recordings", "Take").unwrap();
    rec.update_record(&pose, 1.0 / 30.0).unwrap();
    (rec, pose)
}

#[test]
fn removing_a_bone_mid_recording_faults_the_session() {
    let (mut rec, mut pose) = recording_with_two_frames();

    // Drop "head" (rig index 3): root, pelvis and spine_01 are keyed first.
    pose.rig.bones.remove(3);
    pose.transforms.remove(3);
    for bone in pose.rig.bones.iter_mut() {
        if let Some(parent) = bone.parent.as_mut() {
            if *parent > 3 {
                *parent -= 1;
            }
        }
    }

    let err = rec.update_record(&pose, 1.0 / 30.0).unwrap_err();
    match &err {
        RecorderError::FrameIntegrityMismatch { frame, track, .. } => {
            assert_eq!(*frame, 2);
            assert_eq!(track, "head");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.is_fatal_to_session());
    assert_eq!(rec.state(), SessionState::Faulted);
    assert_eq!(rec.fault(), Some(&err));

    // Keys appended during the failing call are gone.
    assert_eq!(rec.recorded_frames(), 2);
    for track in rec.bone_tracks() {
        assert_eq!(track.keys.len(), 2, "track {}", track.name);
    }

    // The destination stays with the session until Stop.
    assert!(rec.store().get("/Game/Recordings/Take").is_none());
    assert!(rec.drain_events().iter().any(|e| matches!(
        e,
        RecorderEvent::RecordingAborted { frame: 2, .. }
    )));

    let asset = rec.stop(false).expect("frames before the failure are kept");
    assert_eq!(asset.key_count, 2);
    assert_eq!(asset.bone_track("head").unwrap().keys.len(), 2);
}

#[test]
fn faulted_session_rejects_updates_until_stopped() {
    let (mut rec, pose) = recording_with_two_frames();
    let err = rec
        .record(&pose, &RigidTransform::IDENTITY, &pose.transforms, &CurveSample::empty(), 7)
        .unwrap_err();
    assert!(matches!(err, RecorderError::FrameIntegrityMismatch { frame: 7, .. }));

    let err = rec.update_record(&pose, 1.0 / 30.0).unwrap_err();
    assert_eq!(
        err,
        RecorderError::PreconditionViolation {
            operation: "update_record",
            state: SessionState::Faulted
        }
    );

    let asset = rec.stop(true).expect("partial recording is finalized");
    assert_eq!(asset.key_count, 2);
    assert!(asset.bone_tracks.iter().all(|t| t.keys.len() == 2));
    assert_eq!(rec.state(), SessionState::Idle);
    assert!(rec.bone_tracks().is_empty());
    assert!(matches!(
        rec.drain_events().last(),
        Some(RecorderEvent::RecordingCompleted(summary)) if summary.key_count == 2
    ));
}

#[test]
fn dropping_a_faulted_session_restores_the_destination() {
    let pose = humanoid();
    let mut store = MemoryAssetStore::new();
    store.insert(existing_take());
    {
        let mut rec = RecordingSession::new(RecorderConfig::default(), &mut store).unwrap();
        rec.start_record(&pose, "/Game/Recordings", "Take").unwrap();
        rec.record(&pose, &RigidTransform::IDENTITY, &pose.transforms, &CurveSample::empty(), 9)
            .unwrap_err();
        assert_eq!(rec.state(), SessionState::Faulted);
    }
    let restored = store.get("/Game/Recordings/Take").expect("asset released");
    assert_eq!(restored.key_count, 42);
}

#[test]
fn faulted_session_can_start_over() {
    let (mut rec, pose) = recording_with_two_frames();
    rec.record(&pose, &RigidTransform::IDENTITY, &pose.transforms, &CurveSample::empty(), 5)
        .unwrap_err();
    rec.start_record(&pose, "/Game/Recordings", "Take").unwrap();
    assert_eq!(rec.state(), SessionState::Recording);
    rec.update_record(&pose, 1.0 / 30.0).unwrap();
    let asset = rec.stop(false).unwrap();
    assert_eq!(asset.key_count, 2);
}

#[test]
fn short_pose_is_a_mismatch() {
    let (mut rec, pose) = recording_with_two_frames();
    let err = rec
        .record(&pose, &RigidTransform::IDENTITY, &pose.transforms[..2], &CurveSample::empty(), 2)
        .unwrap_err();
    let RecorderError::FrameIntegrityMismatch { track, .. } = err else {
        panic!("expected a frame mismatch");
    };
    assert_eq!(track, "spine_01");
    assert_eq!(rec.recorded_frames(), 2);
}

#[test]
fn source_with_too_few_transforms_faults_on_update() {
    let (mut rec, mut pose) = recording_with_two_frames();
    pose.transforms.truncate(3);
    let err = rec.update_record(&pose, 1.0 / 30.0).unwrap_err();
    let RecorderError::FrameIntegrityMismatch { frame, track, .. } = err else {
        panic!("expected a frame mismatch");
    };
    assert_eq!(frame, 2);
    assert_eq!(track, "head");
    assert_eq!(rec.state(), SessionState::Faulted);
    assert!(rec.bone_tracks().iter().all(|t| t.keys.len() == 2));
}

#[test]
fn explicit_next_frame_is_accepted() {
    let (mut rec, pose) = recording_with_two_frames();
    rec.record(&pose, &RigidTransform::IDENTITY, &pose.transforms, &CurveSample::empty(), 2)
        .unwrap();
    assert_eq!(rec.last_frame(), Some(2));
    assert_eq!(rec.stop(false).unwrap().key_count, 3);
}
