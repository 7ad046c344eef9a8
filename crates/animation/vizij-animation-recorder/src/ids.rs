//! Identifiers shared across the recorder.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable skeleton-wide identifier of a scalar curve (morph target, material
/// parameter, or custom attribute).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CurveUid(pub u16);

impl CurveUid {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a destination animation asset. Assigned once at creation and
/// kept when the asset is reused as a recording destination.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new_v4() -> Self {
        AssetId(Uuid::new_v4())
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
