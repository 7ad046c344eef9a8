//! Skeleton and rig topology consumed from the pose source.
//!
//! The [`Skeleton`] is the asset-side bone/curve namespace a recording is
//! bound to. The [`RigTopology`] is the live mesh hierarchy whose
//! component-space transforms are sampled each tick. Rig bones are matched to
//! skeleton bones by name.

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};
use crate::ids::CurveUid;
use crate::transform::RigidTransform;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveCategory {
    Morph,
    Material,
    Attribute,
}

/// Per-curve metadata registered on a skeleton.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveMeta {
    pub uid: CurveUid,
    pub name: String,
    pub category: CurveCategory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub name: String,
    pub bones: Vec<String>,
    #[serde(default)]
    pub curves: Vec<CurveMeta>,
}

impl Skeleton {
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b == name)
    }

    pub fn curve(&self, uid: CurveUid) -> Option<&CurveMeta> {
        self.curves.iter().find(|c| c.uid == uid)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigBone {
    pub name: String,
    /// Index of the parent bone; `None` for a root.
    #[serde(default)]
    pub parent: Option<usize>,
    /// Parent-space reference pose.
    #[serde(default)]
    pub reference_pose: RigidTransform,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RigTopology {
    pub bones: Vec<RigBone>,
}

impl RigTopology {
    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.bones.get(index).and_then(|b| b.parent)
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Parents must precede their children and at least one root must exist.
    pub fn validate(&self) -> Result<()> {
        if self.bones.is_empty() {
            return Ok(());
        }
        let mut has_root = false;
        for (i, bone) in self.bones.iter().enumerate() {
            match bone.parent {
                None => has_root = true,
                Some(p) if p >= i => {
                    return Err(RecorderError::InvalidRig {
                        reason: format!(
                            "bone '{}' (#{i}) has parent #{p}, parents must precede children",
                            bone.name
                        ),
                    });
                }
                Some(_) => {}
            }
        }
        if !has_root {
            return Err(RecorderError::InvalidRig {
                reason: "rig has no root bone".into(),
            });
        }
        Ok(())
    }

    /// For each rig bone, the index of the same-named skeleton bone.
    pub fn skeleton_mapping(&self, skeleton: &Skeleton) -> Vec<Option<usize>> {
        self.bones
            .iter()
            .map(|b| skeleton.bone_index(&b.name))
            .collect()
    }

    /// Component-space reference pose, built by walking the hierarchy.
    pub fn reference_component_pose(&self) -> Vec<RigidTransform> {
        let mut out: Vec<RigidTransform> = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let pose = match bone.parent.and_then(|p| out.get(p)) {
                Some(parent) => *parent * bone.reference_pose,
                None => bone.reference_pose,
            };
            out.push(pose);
        }
        out
    }
}

/// A skeleton and the rig that drives it, as stored in rig fixtures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigAsset {
    pub skeleton: Skeleton,
    pub rig: RigTopology,
}
