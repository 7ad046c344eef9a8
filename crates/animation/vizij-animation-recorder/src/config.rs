//! Recorder configuration.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asset::{CurveInterpMode, InterpolationMode, TangentMode};
use crate::error::{RecorderError, Result};
use crate::resample::FrameRate;
use crate::skeleton::CurveCategory;

/// One immutable set of options, fixed when a session is constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Fixed sample rate of the recorded asset.
    pub recording_rate: FrameRate,
    /// Capture the root's frame-0 transform so it can be removed later.
    /// Ignored for single-track recordings.
    pub remove_root_transform: bool,
    /// Record bone transforms. When false only curves are kept.
    pub record_transforms: bool,
    /// Fold the component-to-world transform into the root track.
    pub record_local_to_world: bool,
    pub record_morph_targets: bool,
    pub record_attribute_curves: bool,
    pub record_material_curves: bool,
    /// Bone key interpolation stored on the asset.
    pub interpolation: InterpolationMode,
    pub curve_interp_mode: CurveInterpMode,
    pub tangent_mode: TangentMode,
    /// Persist the asset through the store as soon as it is finalized.
    pub auto_save_asset: bool,
    /// When reusing an existing destination, clear only its bone tracks and
    /// keep curves and markers. When false the destination is fully reset.
    pub keep_curves_and_markers: bool,
    /// Bones and curves matching this are not recorded as motion.
    pub name_exclusion: NameExclusion,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            recording_rate: FrameRate::fps(30),
            remove_root_transform: true,
            record_transforms: true,
            record_local_to_world: true,
            record_morph_targets: true,
            record_attribute_curves: true,
            record_material_curves: true,
            interpolation: InterpolationMode::Linear,
            curve_interp_mode: CurveInterpMode::Linear,
            tangent_mode: TangentMode::Auto,
            auto_save_asset: false,
            keep_curves_and_markers: true,
            name_exclusion: NameExclusion::default(),
        }
    }
}

impl RecorderConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: RecorderConfig =
            serde_json::from_str(s).map_err(|e| RecorderError::InvalidConfig {
                reason: format!("parse error: {e}"),
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.recording_rate.is_valid() {
            return Err(RecorderError::InvalidConfig {
                reason: format!(
                    "recording_rate must be positive, got {}/{}",
                    self.recording_rate.numerator, self.recording_rate.denominator
                ),
            });
        }
        Ok(())
    }

    /// True if any curve category is enabled.
    #[inline]
    pub fn records_curves(&self) -> bool {
        self.record_morph_targets || self.record_attribute_curves || self.record_material_curves
    }

    #[inline]
    pub fn records_category(&self, category: CurveCategory) -> bool {
        match category {
            CurveCategory::Morph => self.record_morph_targets,
            CurveCategory::Material => self.record_material_curves,
            CurveCategory::Attribute => self.record_attribute_curves,
        }
    }
}

/// Case-insensitive name pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NamePattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl NamePattern {
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        match self {
            NamePattern::Exact(p) => name == p.to_lowercase(),
            NamePattern::Prefix(p) => name.starts_with(&p.to_lowercase()),
            NamePattern::Suffix(p) => name.ends_with(&p.to_lowercase()),
            NamePattern::Contains(p) => name.contains(&p.to_lowercase()),
        }
    }
}

type NamePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Exclusion policy for bone and curve names: serializable patterns plus an
/// optional host-supplied predicate.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NameExclusion {
    #[serde(default)]
    pub patterns: Vec<NamePattern>,
    #[serde(skip)]
    predicate: Option<NamePredicate>,
}

impl NameExclusion {
    pub fn new(patterns: Vec<NamePattern>) -> Self {
        Self {
            patterns,
            predicate: None,
        }
    }

    /// Add a custom predicate checked after the patterns.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
            || self.predicate.as_ref().is_some_and(|f| f(name))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.predicate.is_none()
    }
}

impl fmt::Debug for NameExclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameExclusion")
            .field("patterns", &self.patterns)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
