//! Pose sampling contract.
//!
//! The recorder never evaluates a rig itself. Hosts implement [`PoseSource`]
//! (an engine component, a physics ragdoll, a capture stream) and the recorder
//! pulls component-space transforms, placement, and curves from it each tick.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::curves::CurveSample;
use crate::skeleton::{RigTopology, Skeleton};
use crate::transform::RigidTransform;

/// Pose shared from a leader component. `bone_map[i]` is the leader bone that
/// drives local bone `i`, or `None` if the bone is not driven.
#[derive(Clone, Copy, Debug)]
pub struct LeaderPose<'a> {
    pub transforms: &'a [RigidTransform],
    pub bone_map: &'a [Option<usize>],
}

/// Live skeletal pose data consumed by the recorder.
pub trait PoseSource {
    /// Hierarchy the transforms are indexed by.
    fn rig(&self) -> &RigTopology;

    /// Skeleton the recorded asset binds to.
    fn skeleton(&self) -> &Arc<Skeleton>;

    /// Per-bone component-space transforms in rig order.
    fn component_space_transforms(&self) -> &[RigidTransform];

    fn component_to_world(&self) -> RigidTransform;

    /// Leader pose if this source follows another component's pose.
    fn leader(&self) -> Option<LeaderPose<'_>> {
        None
    }

    /// Current curve values. Empty when the source has no curves.
    fn curves(&self) -> CurveSample {
        CurveSample::empty()
    }
}

/// Extract the component-space pose of `source`, resolving leader/follower
/// sharing.
///
/// With a leader, every rig bone gets an entry and bones the leader does not
/// drive yield identity. Without one, the source's own transforms are
/// returned as they are, so a short pose surfaces as a frame mismatch.
pub fn sample_pose(source: &dyn PoseSource) -> Vec<RigidTransform> {
    match source.leader() {
        Some(leader) => (0..source.rig().len())
            .map(|i| {
                leader
                    .bone_map
                    .get(i)
                    .copied()
                    .flatten()
                    .and_then(|li| leader.transforms.get(li))
                    .copied()
                    .unwrap_or(RigidTransform::IDENTITY)
            })
            .collect(),
        None => source.component_space_transforms().to_vec(),
    }
}

/// Owned leader pose for [`PoseSnapshot`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderSnapshot {
    pub transforms: Vec<RigidTransform>,
    pub bone_map: Vec<Option<usize>>,
}

/// A self-contained [`PoseSource`] holding one tick of pose data.
///
/// Useful for drivers that already have the pose in memory (capture streams,
/// offline baking) and for tests.
#[derive(Clone, Debug)]
pub struct PoseSnapshot {
    pub rig: RigTopology,
    pub skeleton: Arc<Skeleton>,
    pub transforms: Vec<RigidTransform>,
    pub component_to_world: RigidTransform,
    pub leader: Option<LeaderSnapshot>,
    pub curves: CurveSample,
}

impl PoseSnapshot {
    /// Snapshot posed at the rig's reference pose, placed at the origin.
    pub fn at_reference(rig: RigTopology, skeleton: Arc<Skeleton>) -> Self {
        let transforms = rig.reference_component_pose();
        Self {
            rig,
            skeleton,
            transforms,
            component_to_world: RigidTransform::IDENTITY,
            leader: None,
            curves: CurveSample::empty(),
        }
    }

    /// Replace the component-space transform of `bone`, if it exists.
    pub fn set_bone(&mut self, bone: usize, transform: RigidTransform) {
        if let Some(slot) = self.transforms.get_mut(bone) {
            *slot = transform;
        }
    }
}

impl PoseSource for PoseSnapshot {
    fn rig(&self) -> &RigTopology {
        &self.rig
    }

    fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    fn component_space_transforms(&self) -> &[RigidTransform] {
        &self.transforms
    }

    fn component_to_world(&self) -> RigidTransform {
        self.component_to_world
    }

    fn leader(&self) -> Option<LeaderPose<'_>> {
        self.leader.as_ref().map(|l| LeaderPose {
            transforms: &l.transforms,
            bone_map: &l.bone_map,
        })
    }

    fn curves(&self) -> CurveSample {
        self.curves.clone()
    }
}
