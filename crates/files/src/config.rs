//! Storage configuration.
//!
//! The storage root is resolved once at process startup and then passed into
//! [`LocalObjectStore`](crate::LocalObjectStore). Reading environment variables during request
//! handling leads to inconsistent behaviour in multi-threaded runtimes and test harnesses, so
//! [`StoreConfig::from_env`] is the only place this crate touches the environment.

use crate::constants::{DEFAULT_STORAGE_ROOT, STORAGE_ROOT_ENV};
use crate::{StoreError, StoreResult};
use std::path::{Path, PathBuf};

/// Storage configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    storage_root: PathBuf,
}

impl StoreConfig {
    /// Create a new `StoreConfig`.
    ///
    /// Relative paths are resolved against the current working directory here, so the root
    /// stays fixed even if the working directory changes later.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if `storage_root` is empty or the working directory
    /// cannot be determined for a relative path.
    pub fn new(storage_root: impl Into<PathBuf>) -> StoreResult<Self> {
        let storage_root = storage_root.into();
        if storage_root.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig(
                "storage root cannot be empty".into(),
            ));
        }

        let storage_root = if storage_root.is_absolute() {
            storage_root
        } else {
            std::env::current_dir()
                .map_err(|e| {
                    StoreError::InvalidConfig(format!(
                        "cannot resolve relative storage root {}: {}",
                        storage_root.display(),
                        e
                    ))
                })?
                .join(storage_root)
        };

        Ok(Self { storage_root })
    }

    /// Build the configuration from `UPLOAD_DIR`, falling back to `/data/uploads`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if the working directory cannot be determined for a
    /// relative `UPLOAD_DIR`.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(storage_root_from_env_value(
            std::env::var(STORAGE_ROOT_ENV).ok(),
        ))
    }

    /// Returns the absolute storage root directory.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }
}

/// Parse the storage root from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default storage root.
pub fn storage_root_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT))
}
