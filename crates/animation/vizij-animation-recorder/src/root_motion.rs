//! Root track discovery and initial root offset capture.

use serde::{Deserialize, Serialize};

use crate::skeleton::RigTopology;
use crate::transform::RigidTransform;

/// Initial root transform captured at frame 0 and its inverse. Consumers
/// that build root motion from the recording use it to cancel the root's
/// starting offset.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootOffset {
    pub initial: RigidTransform,
    pub inverse: RigidTransform,
}

impl RootOffset {
    pub fn new(initial: RigidTransform) -> Self {
        Self {
            initial,
            inverse: initial.inverse(),
        }
    }

    /// `transform` with the initial offset cancelled.
    #[inline]
    pub fn remove_from(&self, transform: &RigidTransform) -> RigidTransform {
        *transform * self.inverse
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RootMotion {
    /// Index of the recorded track holding the root bone.
    pub root_track: Option<usize>,
    /// Rig index of the root bone.
    pub root_bone: Option<usize>,
    /// Present only when offset removal is active for this session.
    pub offset: Option<RootOffset>,
}

impl RootMotion {
    #[inline]
    pub fn initial_root_transform(&self) -> RigidTransform {
        self.offset.map_or(RigidTransform::IDENTITY, |o| o.initial)
    }

    #[inline]
    pub fn inverse_initial_root_transform(&self) -> RigidTransform {
        self.offset.map_or(RigidTransform::IDENTITY, |o| o.inverse)
    }
}

/// Locate the first recorded track whose bone has no parent.
///
/// `track_bones` holds the rig bone index of every recorded track. The root's
/// frame-0 transform is snapshotted when `remove_root_transform` is set and
/// more than one track is recorded; single-bone rigs (cameras, props) always
/// keep their authored transform.
pub fn extract_root(
    track_bones: &[usize],
    rig: &RigTopology,
    transforms: &[RigidTransform],
    remove_root_transform: bool,
) -> RootMotion {
    let Some((root_track, &root_bone)) = track_bones
        .iter()
        .enumerate()
        .find(|&(_, &bone)| bone < rig.len() && rig.parent(bone).is_none())
    else {
        return RootMotion::default();
    };

    let offset = if remove_root_transform && track_bones.len() > 1 {
        transforms.get(root_bone).copied().map(RootOffset::new)
    } else {
        None
    };

    RootMotion {
        root_track: Some(root_track),
        root_bone: Some(root_bone),
        offset,
    }
}
