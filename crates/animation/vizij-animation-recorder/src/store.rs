//! Destination naming and the asset store the recorder writes into.
//!
//! The store is an external collaborator: it hands out a destination asset
//! (existing or fresh) at StartRecord, takes it back if a recording is
//! aborted, and persists finalized assets on request.

use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;

use crate::asset::AnimationAsset;
use crate::error::{PersistError, RecorderError, Result};
use crate::skeleton::Skeleton;

const INVALID_NAMESPACE_CHARS: &[char] = &[
    '\\', ':', '*', '?', '"', '<', '>', '|', '\'', ',', '.', '&', '!', '~', '@', '#',
];
const INVALID_NAME_CHARS: &[char] = &['/', '\\', '.', ':', '"', '\'', ','];

/// Validated destination: a long package namespace plus an asset name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetPath {
    namespace: String,
    name: String,
}

impl AssetPath {
    /// Validate `namespace` (e.g. `/Game/Recordings`) and `name`.
    pub fn parse(namespace: &str, name: &str) -> Result<Self> {
        let full = format!("{namespace}/{name}");
        let invalid = |reason: String| RecorderError::InvalidDestination {
            path: full.clone(),
            reason,
        };

        if !namespace.starts_with('/') || namespace.len() < 2 {
            return Err(invalid("namespace must start with '/' and name a root".into()));
        }
        if namespace.ends_with('/') {
            return Err(invalid("namespace must not end with '/'".into()));
        }
        if namespace[1..].split('/').any(str::is_empty) {
            return Err(invalid("namespace contains an empty segment".into()));
        }
        if let Some(c) = namespace
            .chars()
            .find(|c| INVALID_NAMESPACE_CHARS.contains(c) || c.is_whitespace())
        {
            return Err(invalid(format!("namespace contains invalid character {c:?}")));
        }

        if name.is_empty() {
            return Err(invalid("asset name is empty".into()));
        }
        if let Some(c) = name
            .chars()
            .find(|c| INVALID_NAME_CHARS.contains(c) || c.is_whitespace())
        {
            return Err(invalid(format!("asset name contains invalid character {c:?}")));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<namespace>/<name>`
    pub fn full(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Destination handed out by [`AssetStore::acquire`].
#[derive(Debug)]
pub struct AcquiredAsset {
    pub asset: AnimationAsset,
    /// False when an existing asset is being reused.
    pub fresh: bool,
}

pub trait AssetStore {
    /// Take exclusive ownership of the asset at `path`, creating one bound to
    /// `skeleton` if none exists. Reusing an asset bound to another skeleton
    /// fails.
    fn acquire(&mut self, path: &AssetPath, skeleton: &Skeleton) -> Result<AcquiredAsset>;

    /// Return an asset whose recording was abandoned.
    fn release(&mut self, asset: AnimationAsset);

    /// Write a finalized asset to durable storage.
    fn persist(&mut self, asset: &AnimationAsset) -> core::result::Result<(), PersistError>;
}

impl<S: AssetStore + ?Sized> AssetStore for &mut S {
    fn acquire(&mut self, path: &AssetPath, skeleton: &Skeleton) -> Result<AcquiredAsset> {
        (**self).acquire(path, skeleton)
    }

    fn release(&mut self, asset: AnimationAsset) {
        (**self).release(asset)
    }

    fn persist(&mut self, asset: &AnimationAsset) -> core::result::Result<(), PersistError> {
        (**self).persist(asset)
    }
}

fn check_skeleton(existing: &AnimationAsset, path: &AssetPath, skeleton: &Skeleton) -> Result<()> {
    if existing.skeleton != skeleton.name {
        return Err(RecorderError::AssetCreation {
            path: path.full(),
            reason: format!(
                "existing asset is bound to skeleton '{}', source uses '{}'",
                existing.skeleton, skeleton.name
            ),
        });
    }
    Ok(())
}

fn create_fresh(path: &AssetPath, skeleton: &Skeleton) -> AcquiredAsset {
    AcquiredAsset {
        asset: AnimationAsset::new(path.namespace(), path.name(), skeleton.name.clone()),
        fresh: true,
    }
}

/// In-memory namespace of assets keyed by full path.
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    assets: HashMap<String, AnimationAsset>,
    saved: HashMap<String, AnimationAsset>,
    read_only: bool,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset, replacing any at the same path.
    pub fn insert(&mut self, asset: AnimationAsset) {
        self.assets.insert(asset.path(), asset);
    }

    pub fn get(&self, path: &str) -> Option<&AnimationAsset> {
        self.assets.get(path)
    }

    /// Last persisted copy of the asset at `path`.
    pub fn saved(&self, path: &str) -> Option<&AnimationAsset> {
        self.saved.get(path)
    }

    /// Make every `persist` call fail.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }
}

impl AssetStore for MemoryAssetStore {
    fn acquire(&mut self, path: &AssetPath, skeleton: &Skeleton) -> Result<AcquiredAsset> {
        let key = path.full();
        if let Some(existing) = self.assets.get(&key).or_else(|| self.saved.get(&key)) {
            check_skeleton(existing, path, skeleton)?;
        }
        // A persisted copy stands in for an asset that is not loaded.
        let existing = self
            .assets
            .remove(&key)
            .or_else(|| self.saved.get(&key).cloned());
        Ok(match existing {
            Some(asset) => AcquiredAsset {
                asset,
                fresh: false,
            },
            None => create_fresh(path, skeleton),
        })
    }

    fn release(&mut self, asset: AnimationAsset) {
        self.insert(asset);
    }

    fn persist(&mut self, asset: &AnimationAsset) -> core::result::Result<(), PersistError> {
        if self.read_only {
            return Err(PersistError::Rejected {
                reason: "store is read-only".into(),
            });
        }
        self.saved.insert(asset.path(), asset.clone());
        Ok(())
    }
}

/// Stores each asset as pretty JSON at `<root>/<namespace>/<name>.anim.json`.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_path(&self, namespace: &str, name: &str) -> PathBuf {
        self.root
            .join(namespace.trim_start_matches('/'))
            .join(format!("{name}.anim.json"))
    }

    /// Read an asset previously written by this store.
    pub fn load(&self, namespace: &str, name: &str) -> core::result::Result<AnimationAsset, PersistError> {
        let file = self.file_path(namespace, name);
        let text = fs::read_to_string(&file).map_err(|source| PersistError::Io {
            path: file.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl AssetStore for JsonDirStore {
    fn acquire(&mut self, path: &AssetPath, skeleton: &Skeleton) -> Result<AcquiredAsset> {
        if !self.file_path(path.namespace(), path.name()).exists() {
            return Ok(create_fresh(path, skeleton));
        }
        let existing = self
            .load(path.namespace(), path.name())
            .map_err(|e| RecorderError::AssetCreation {
                path: path.full(),
                reason: e.to_string(),
            })?;
        check_skeleton(&existing, path, skeleton)?;
        Ok(AcquiredAsset {
            asset: existing,
            fresh: false,
        })
    }

    fn release(&mut self, _asset: AnimationAsset) {
        // The on-disk copy was never touched.
    }

    fn persist(&mut self, asset: &AnimationAsset) -> core::result::Result<(), PersistError> {
        let file = self.file_path(&asset.namespace, &asset.name);
        let io_err = |source| PersistError::Io {
            path: file.display().to_string(),
            source,
        };
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(asset)?;
        fs::write(&file, text).map_err(io_err)?;
        Ok(())
    }
}
