use std::sync::Arc;

use glam::Vec3;
use vizij_animation_recorder::{
    FrameRate, MemoryAssetStore, PoseSnapshot, RecorderConfig, RecorderError, RecorderEvent,
    RecordingSession, RigAsset, RigBone, RigTopology, RigidTransform, SessionState,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn humanoid() -> PoseSnapshot {
    let rig: RigAsset = vizij_test_fixtures::rigs::load("humanoid").expect("humanoid rig fixture");
    PoseSnapshot::at_reference(rig.rig, Arc::new(rig.skeleton))
}

fn session(cfg: RecorderConfig) -> RecordingSession {
    RecordingSession::new(cfg, MemoryAssetStore::new()).expect("valid config")
}

#[test]
fn three_ticks_at_30fps_make_four_keys() {
    let pose = humanoid();
    let mut rec = session(RecorderConfig::default());
    rec.start_record(&pose, "/Game/Recordings", "Take_01").unwrap();
    assert_eq!(rec.state(), SessionState::Recording);
    assert_eq!(rec.recorded_frames(), 1);

    for _ in 0..3 {
        rec.update_record(&pose, 1.0 / 30.0).unwrap();
    }
    assert_eq!(rec.last_frame(), Some(3));

    let asset = rec.stop(true).expect("recording produces an asset");
    assert_eq!(rec.state(), SessionState::Idle);
    assert_eq!(asset.key_count, 4);
    approx(asset.play_length, 0.1, 1e-6);
    assert_eq!(asset.frame_rate, FrameRate::fps(30));
    assert!(asset.is_modified());

    // cloth_skirt_01 is not part of the skeleton.
    assert_eq!(asset.bone_tracks.len(), 6);
    assert!(asset.bone_track("cloth_skirt_01").is_none());
    for track in &asset.bone_tracks {
        assert_eq!(track.keys.len(), 4, "track {}", track.name);
        assert_eq!(track.keys.rotations.len(), 4);
        assert_eq!(track.keys.scales.len(), 4);
    }

    let events = rec.drain_events();
    assert!(matches!(
        events.first(),
        Some(RecorderEvent::RecordingStarted { bone_tracks: 6, fresh: true, .. })
    ));
    let Some(RecorderEvent::RecordingCompleted(summary)) = events.last() else {
        panic!("expected completion summary, got {events:?}");
    };
    assert_eq!(
        summary.to_string(),
        "'Take_01' has been successfully recorded [4 keys : 0.100 sec(s) @ 30 fps]"
    );
}

#[test]
fn child_keys_are_parent_relative() {
    let mut pose = humanoid();
    // Move the whole hierarchy; the local offsets must be unchanged.
    let shift = RigidTransform::from_translation(Vec3::new(0.0, 0.0, 5.0));
    pose.transforms = pose.transforms.iter().map(|t| shift * *t).collect();

    let mut rec = session(RecorderConfig::default());
    rec.start_record(&pose, "/Game/Recordings", "Relative").unwrap();
    let asset = rec.stop(false).unwrap();

    let head = asset.bone_track("head").unwrap().keys.get(0).unwrap();
    approx(head.translation.y, 0.55, 1e-5);
    approx(head.translation.z, 0.02, 1e-5);
    let root = asset.bone_track("root").unwrap().keys.get(0).unwrap();
    approx(root.translation.z, 5.0, 1e-5);
}

#[test]
fn single_frame_recording_spans_one_interval() {
    let pose = humanoid();
    let mut rec = session(RecorderConfig::default());
    rec.start_record(&pose, "/Game/Recordings", "Still").unwrap();
    let asset = rec.stop(false).unwrap();
    assert_eq!(asset.key_count, 1);
    approx(asset.play_length, 1.0 / 30.0, 1e-6);
    // No notification requested.
    assert!(!rec
        .drain_events()
        .iter()
        .any(|e| matches!(e, RecorderEvent::RecordingCompleted(_))));
}

#[test]
fn timestamps_follow_tick_time() {
    let pose = humanoid();
    let mut rec = session(RecorderConfig::default());
    rec.start_record(&pose, "/Game/Recordings", "Ticks").unwrap();
    rec.update_record(&pose, 0.05).unwrap();
    rec.update_record(&pose, 0.0).unwrap();
    let ts = rec.timestamps();
    assert_eq!(ts.len(), 3);
    assert_eq!(ts[0], 0.0);
    assert!((ts[1] - 0.05).abs() < 1e-6);
    // A zero delta still records a frame but does not advance time.
    assert_eq!(ts[2], ts[1]);
}

#[test]
fn stop_while_idle_is_a_no_op() {
    let mut rec = session(RecorderConfig::default());
    assert!(rec.stop(true).is_none());
    assert!(rec.events().is_empty());
    assert_eq!(rec.state(), SessionState::Idle);
}

#[test]
fn update_and_record_require_an_active_recording() {
    let pose = humanoid();
    let mut rec = session(RecorderConfig::default());
    let err = rec.update_record(&pose, 1.0 / 30.0).unwrap_err();
    assert_eq!(
        err,
        RecorderError::PreconditionViolation {
            operation: "update_record",
            state: SessionState::Idle
        }
    );
    assert_eq!(
        err.to_string(),
        "update_record is not allowed while the recorder is idle"
    );
}

#[test]
fn start_twice_is_rejected_and_keeps_recording() {
    let pose = humanoid();
    let mut rec = session(RecorderConfig::default());
    rec.start_record(&pose, "/Game/Recordings", "A").unwrap();
    let err = rec.start_record(&pose, "/Game/Recordings", "B").unwrap_err();
    assert!(matches!(err, RecorderError::PreconditionViolation { .. }));
    assert_eq!(rec.state(), SessionState::Recording);
    assert_eq!(rec.stop(false).unwrap().name, "A");
}

#[test]
fn session_can_record_again_after_stop() {
    let pose = humanoid();
    let mut rec = session(RecorderConfig::default());
    rec.start_record(&pose, "/Game/Recordings", "First").unwrap();
    rec.update_record(&pose, 1.0 / 30.0).unwrap();
    rec.stop(false).unwrap();

    rec.start_record(&pose, "/Game/Recordings", "Second").unwrap();
    assert_eq!(rec.recorded_frames(), 1);
    assert_eq!(rec.stop(false).unwrap().key_count, 1);
}

#[test]
fn invalid_destination_leaves_session_idle() {
    let pose = humanoid();
    let mut rec = session(RecorderConfig::default());
    let err = rec.start_record(&pose, "Game/NoLeadingSlash", "Take").unwrap_err();
    assert!(matches!(err, RecorderError::InvalidDestination { .. }));
    let err = rec.start_record(&pose, "/Game/Recordings", "").unwrap_err();
    assert!(matches!(err, RecorderError::InvalidDestination { .. }));
    assert_eq!(rec.state(), SessionState::Idle);
}

#[test]
fn invalid_rig_is_rejected() {
    let rig = RigTopology {
        bones: vec![
            RigBone {
                name: "a".into(),
                parent: Some(1),
                reference_pose: RigidTransform::IDENTITY,
            },
            RigBone {
                name: "b".into(),
                parent: None,
                reference_pose: RigidTransform::IDENTITY,
            },
        ],
    };
    let skeleton = Arc::new(vizij_animation_recorder::Skeleton {
        name: "broken".into(),
        bones: vec!["a".into(), "b".into()],
        curves: vec![],
    });
    let pose = PoseSnapshot::at_reference(rig, skeleton);
    let mut rec = session(RecorderConfig::default());
    let err = rec.start_record(&pose, "/Game/Recordings", "Broken").unwrap_err();
    assert!(matches!(err, RecorderError::InvalidRig { .. }));
    assert_eq!(rec.state(), SessionState::Idle);
}

#[test]
fn zero_frame_rate_config_is_rejected() {
    let cfg = RecorderConfig {
        recording_rate: FrameRate::new(0, 1),
        ..RecorderConfig::default()
    };
    let err = RecordingSession::new(cfg, MemoryAssetStore::new()).err().unwrap();
    assert!(matches!(err, RecorderError::InvalidConfig { .. }));
}
