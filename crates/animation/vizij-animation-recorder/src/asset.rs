//! Destination animation asset and its scoped edit transaction.
//!
//! The asset is the recorder's output: uniform-length bone transform tracks,
//! independent scalar curve channels, and playback metadata. While a
//! recording is active the asset is only reachable through an
//! [`EditTransaction`], which is consumed exactly once by `commit` or
//! `rollback`.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::ids::AssetId;
use crate::resample::FrameRate;
use crate::root_motion::RootOffset;
use crate::transform::RigidTransform;

/// How bone keys are interpolated at playback.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
}

/// Interpolation written on each curve key.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveInterpMode {
    #[default]
    Linear,
    Constant,
    Cubic,
}

/// Tangent handling written on each curve key.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TangentMode {
    #[default]
    Auto,
    User,
    Break,
}

/// Parallel translation/rotation/scale key arrays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformKeys {
    pub translations: Vec<Vec3>,
    pub rotations: Vec<Quat>,
    pub scales: Vec<Vec3>,
}

impl TransformKeys {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            translations: Vec::with_capacity(n),
            rotations: Vec::with_capacity(n),
            scales: Vec::with_capacity(n),
        }
    }

    #[inline]
    pub fn push(&mut self, t: &RigidTransform) {
        self.translations.push(t.translation);
        self.rotations.push(t.rotation);
        self.scales.push(t.scale);
    }

    /// Number of keys; the three arrays always have equal length.
    #[inline]
    pub fn len(&self) -> usize {
        self.translations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.translations.truncate(len);
        self.rotations.truncate(len);
        self.scales.truncate(len);
    }

    pub fn get(&self, index: usize) -> Option<RigidTransform> {
        Some(RigidTransform::new(
            *self.translations.get(index)?,
            *self.rotations.get(index)?,
            *self.scales.get(index)?,
        ))
    }

    /// Keys reduced to the first sample only (empty stays empty).
    pub fn first_only(&self) -> TransformKeys {
        let mut out = TransformKeys::with_capacity(1);
        if let Some(first) = self.get(0) {
            out.push(&first);
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneTrack {
    pub name: String,
    pub keys: TransformKeys,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Seconds from the start of the clip.
    pub time: f32,
    pub value: f32,
    pub interp: CurveInterpMode,
    pub tangent: TangentMode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatCurve {
    pub name: String,
    pub keys: Vec<CurveKey>,
}

/// Named time marker (sync marker / notify). Recorded assets never author
/// markers; they only survive from a reused destination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub time: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationAsset {
    pub id: AssetId,
    /// Owning namespace (long package path, e.g. `/Game/Recordings`).
    pub namespace: String,
    pub name: String,
    /// Name of the skeleton the asset is bound to.
    pub skeleton: String,
    #[serde(default)]
    pub interpolation: InterpolationMode,
    #[serde(default)]
    pub frame_rate: FrameRate,
    /// Seconds.
    #[serde(default)]
    pub play_length: f32,
    #[serde(default)]
    pub key_count: u32,
    #[serde(default)]
    pub bone_tracks: Vec<BoneTrack>,
    #[serde(default)]
    pub curves: Vec<FloatCurve>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    /// Root offset captured at frame 0 when root transform removal was active.
    #[serde(default)]
    pub root_offset: Option<RootOffset>,
    #[serde(skip)]
    modified: bool,
}

impl AnimationAsset {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, skeleton: impl Into<String>) -> Self {
        Self {
            id: AssetId::new_v4(),
            namespace: namespace.into(),
            name: name.into(),
            skeleton: skeleton.into(),
            interpolation: InterpolationMode::default(),
            frame_rate: FrameRate::default(),
            play_length: 0.0,
            key_count: 0,
            bone_tracks: Vec::new(),
            curves: Vec::new(),
            markers: Vec::new(),
            root_offset: None,
            modified: false,
        }
    }

    /// `<namespace>/<name>`
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    pub fn bone_track(&self, name: &str) -> Option<&BoneTrack> {
        self.bone_tracks.iter().find(|t| t.name == name)
    }

    pub fn curve(&self, name: &str) -> Option<&FloatCurve> {
        self.curves.iter().find(|c| c.name == name)
    }

    /// Add an empty bone track. Returns false if one with this name exists.
    pub fn add_bone_track(&mut self, name: &str) -> bool {
        if self.bone_track(name).is_some() {
            return false;
        }
        self.bone_tracks.push(BoneTrack {
            name: name.to_string(),
            keys: TransformKeys::default(),
        });
        true
    }

    /// Replace the keys of an existing bone track. Returns false if missing.
    pub fn set_bone_track_keys(&mut self, name: &str, keys: TransformKeys) -> bool {
        match self.bone_tracks.iter_mut().find(|t| t.name == name) {
            Some(track) => {
                track.keys = keys;
                true
            }
            None => false,
        }
    }

    pub fn remove_all_bone_tracks(&mut self) {
        self.bone_tracks.clear();
    }

    /// Drop every track, curve, and marker and clear playback metadata.
    pub fn reset_animation(&mut self) {
        self.bone_tracks.clear();
        self.curves.clear();
        self.markers.clear();
        self.play_length = 0.0;
        self.key_count = 0;
        self.root_offset = None;
    }

    /// Ensure a curve channel named `name` exists; returns its index.
    pub fn add_curve(&mut self, name: &str) -> usize {
        if let Some(i) = self.curves.iter().position(|c| c.name == name) {
            return i;
        }
        self.curves.push(FloatCurve {
            name: name.to_string(),
            keys: Vec::new(),
        });
        self.curves.len() - 1
    }

    /// Replace all keys of curve `index` in one operation.
    pub fn set_curve_keys(&mut self, index: usize, keys: Vec<CurveKey>) {
        if let Some(curve) = self.curves.get_mut(index) {
            curve.keys = keys;
        }
    }

    #[inline]
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// True once a recording has been committed into this asset and it has
    /// not been persisted since.
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    pub(crate) fn clear_modified(&mut self) {
        self.modified = false;
    }
}

/// Scoped batch of mutations on an asset.
///
/// Opening snapshots the asset. `commit` keeps the edits, `rollback` restores
/// the snapshot; both consume the transaction so it closes exactly once.
#[derive(Debug)]
#[must_use = "an edit transaction must be committed or rolled back"]
pub struct EditTransaction {
    label: String,
    asset: AnimationAsset,
    before: AnimationAsset,
}

impl EditTransaction {
    pub fn open(asset: AnimationAsset, label: impl Into<String>) -> Self {
        let label = label.into();
        log::debug!("opening edit transaction '{}' on {}", label, asset.path());
        Self {
            label,
            before: asset.clone(),
            asset,
        }
    }

    #[inline]
    pub fn asset(&self) -> &AnimationAsset {
        &self.asset
    }

    #[inline]
    pub fn asset_mut(&mut self) -> &mut AnimationAsset {
        &mut self.asset
    }

    /// Close the transaction keeping all edits.
    pub fn commit(self) -> AnimationAsset {
        log::debug!("committing edit transaction '{}' on {}", self.label, self.asset.path());
        self.asset
    }

    /// Close the transaction restoring the asset as it was when opened.
    pub fn rollback(self) -> AnimationAsset {
        log::debug!("rolling back edit transaction '{}' on {}", self.label, self.asset.path());
        self.before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> AnimationAsset {
        AnimationAsset::new("/Game/Rec", "Take1", "humanoid")
    }

    #[test]
    fn transform_keys_stay_parallel() {
        let mut keys = TransformKeys::default();
        keys.push(&RigidTransform::IDENTITY);
        keys.push(&RigidTransform::from_translation(Vec3::X));
        assert_eq!(keys.len(), 2);
        keys.truncate(1);
        assert_eq!(keys.rotations.len(), 1);
        assert_eq!(keys.scales.len(), 1);
        assert_eq!(keys.first_only().len(), 1);
        assert!(TransformKeys::default().first_only().is_empty());
    }

    #[test]
    fn commit_keeps_edits() {
        let mut tx = EditTransaction::open(asset(), "record");
        tx.asset_mut().add_bone_track("root");
        let out = tx.commit();
        assert!(out.bone_track("root").is_some());
    }

    #[test]
    fn rollback_restores_snapshot() {
        let mut base = asset();
        base.add_curve("smile");
        let mut tx = EditTransaction::open(base, "record");
        tx.asset_mut().reset_animation();
        tx.asset_mut().add_bone_track("root");
        let out = tx.rollback();
        assert!(out.bone_tracks.is_empty());
        assert!(out.curve("smile").is_some());
    }

    #[test]
    fn add_curve_reuses_existing_channel() {
        let mut a = asset();
        let i = a.add_curve("blink");
        assert_eq!(a.add_curve("blink"), i);
        assert_eq!(a.curves.len(), 1);
    }

    #[test]
    fn duplicate_bone_track_rejected() {
        let mut a = asset();
        assert!(a.add_bone_track("root"));
        assert!(!a.add_bone_track("root"));
    }
}
