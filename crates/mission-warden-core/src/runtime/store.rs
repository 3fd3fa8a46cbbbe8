// crates/mission-warden-core/src/runtime/store.rs
// ============================================================================
// Module: Mission Warden Bundle Stores
// Description: Filesystem and in-memory persistence for evidence bundles.
// Purpose: Provide durable, version-checked storage behind the BundleStore seam.
// Dependencies: crate::core, crate::interfaces, serde_jcs
// ============================================================================

//! ## Overview
//! Bundle stores persist one manifest per bundle. The filesystem store lays
//! bundles out as `<root>/<bundle_id>/manifest.json` with canonical JSON
//! bytes, so identical manifests persist byte-identically. Both stores check
//! `manifest_version` on load and fail closed on anything this crate does
//! not read; a best-effort parse of a future manifest is worse than an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::evidence::EvidenceBundleManifest;
use crate::core::evidence::EvidenceIoError;
use crate::core::evidence::MANIFEST_VERSION;
use crate::core::identifiers::BundleId;
use crate::interfaces::BundleStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the manifest inside a bundle directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

// ============================================================================
// SECTION: Filesystem Store
// ============================================================================

/// Filesystem bundle store rooted at one evidence directory.
///
/// # Invariants
///
/// - Each bundle occupies `<root>/<bundle_id>/`; the manifest is written as
///   canonical JSON so a saved bundle is byte-stable across saves.
/// - Saves go through a sibling temporary file and a rename, so a reader
///   never observes a partially written manifest.
#[derive(Debug, Clone)]
pub struct FsBundleStore {
    /// Evidence root directory holding one subdirectory per bundle.
    root: PathBuf,
}

impl FsBundleStore {
    /// Creates a store rooted at the given evidence directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the evidence root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory holding one bundle's manifest and artifacts.
    #[must_use]
    pub fn bundle_dir(&self, bundle_id: &BundleId) -> PathBuf {
        self.root.join(bundle_id.as_str())
    }

    /// Returns the manifest path for one bundle.
    #[must_use]
    pub fn manifest_path(&self, bundle_id: &BundleId) -> PathBuf {
        self.bundle_dir(bundle_id).join(MANIFEST_FILE_NAME)
    }
}

impl BundleStore for FsBundleStore {
    fn save(&self, manifest: &EvidenceBundleManifest) -> Result<(), EvidenceIoError> {
        let dir = self.bundle_dir(&manifest.bundle_id);
        fs::create_dir_all(&dir).map_err(|source| EvidenceIoError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let bytes = manifest
            .canonical_bytes()
            .map_err(|err| EvidenceIoError::Canonicalize(err.to_string()))?;
        let path = self.manifest_path(&manifest.bundle_id);
        let temp_path = path.with_extension("tmp");
        write_durable(&temp_path, &bytes)?;
        fs::rename(&temp_path, &path).map_err(|source| EvidenceIoError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn load(&self, bundle_id: &BundleId) -> Result<EvidenceBundleManifest, EvidenceIoError> {
        let path = self.manifest_path(bundle_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Err(EvidenceIoError::NotFound {
                    bundle_id: bundle_id.to_string(),
                });
            }
            Err(source) => {
                return Err(EvidenceIoError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        let manifest: EvidenceBundleManifest =
            serde_json::from_slice(&bytes).map_err(|source| EvidenceIoError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        ensure_manifest_version(&manifest)?;
        Ok(manifest)
    }
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory bundle store for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBundleStore {
    /// Manifest map protected by a mutex.
    bundles: Arc<Mutex<BTreeMap<String, EvidenceBundleManifest>>>,
}

impl InMemoryBundleStore {
    /// Creates an empty in-memory bundle store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bundles: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl BundleStore for InMemoryBundleStore {
    fn save(&self, manifest: &EvidenceBundleManifest) -> Result<(), EvidenceIoError> {
        let mut guard = self.bundles.lock().map_err(|_| EvidenceIoError::Poisoned)?;
        guard.insert(manifest.bundle_id.to_string(), manifest.clone());
        Ok(())
    }

    fn load(&self, bundle_id: &BundleId) -> Result<EvidenceBundleManifest, EvidenceIoError> {
        let manifest = {
            let guard = self.bundles.lock().map_err(|_| EvidenceIoError::Poisoned)?;
            guard.get(bundle_id.as_str()).cloned()
        };
        let manifest = manifest.ok_or_else(|| EvidenceIoError::NotFound {
            bundle_id: bundle_id.to_string(),
        })?;
        ensure_manifest_version(&manifest)?;
        Ok(manifest)
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared bundle store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedBundleStore {
    /// Inner store implementation.
    inner: Arc<dyn BundleStore + Send + Sync>,
}

impl SharedBundleStore {
    /// Wraps a bundle store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl BundleStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn BundleStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl BundleStore for SharedBundleStore {
    fn save(&self, manifest: &EvidenceBundleManifest) -> Result<(), EvidenceIoError> {
        self.inner.save(manifest)
    }

    fn load(&self, bundle_id: &BundleId) -> Result<EvidenceBundleManifest, EvidenceIoError> {
        self.inner.load(bundle_id)
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Writes bytes to a file and flushes them to disk before returning.
fn write_durable(path: &Path, bytes: &[u8]) -> Result<(), EvidenceIoError> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|source| EvidenceIoError::Io {
            path: path.display().to_string(),
            source,
        })?;
    file.write_all(bytes).map_err(|source| EvidenceIoError::Io {
        path: path.display().to_string(),
        source,
    })?;
    file.sync_all().map_err(|source| EvidenceIoError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Rejects manifests declaring a version this crate does not read.
fn ensure_manifest_version(manifest: &EvidenceBundleManifest) -> Result<(), EvidenceIoError> {
    if manifest.manifest_version == MANIFEST_VERSION {
        Ok(())
    } else {
        Err(EvidenceIoError::VersionMismatch {
            found: manifest.manifest_version.clone(),
            expected: MANIFEST_VERSION.to_string(),
        })
    }
}
