//! Local object store implementation
//!
//! This module provides [`LocalObjectStore`], the read/write/delete surface over a single
//! storage root directory.
//!
//! # Storage Model
//!
//! - Each stored file lives directly under the root, named by its key
//! - Keys are minted by [`KeyGenerator`] and never contain path separators
//! - Keys coming back from callers are validated as [`StorageKey`] before use
//! - The filesystem is the only state; the store holds no index
//!
//! # Concurrency
//!
//! The store takes no locks. Concurrent `store` calls cannot collide in practice because every
//! key carries a random token, and creating the root tolerates another caller winning the race.
//! Operations racing on the *same* key (for example a rename and a delete) are not ordered here;
//! the loser sees [`StoreError::NotFound`].
//!
//! # Implementation Notes
//!
//! - Construction with [`LocalObjectStore::new`] performs no I/O
//! - The root is created on demand by every operation that writes or lists
//! - The service implements `Debug` but not `Clone`; share it behind an `Arc`

use crate::config::StoreConfig;
use crate::content_type::content_type;
use crate::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use docstore_keys::{GeneratedKey, KeyGenerator};
use docstore_types::StorageKey;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Size and timestamps of a stored file.
///
/// `created_at` is best-effort. Filesystems that do not record a birth time report the
/// modification time instead.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileStat {
    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Creation time, or modification time where creation time is unavailable
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub modified_at: DateTime<Utc>,
}

/// Receipt for a stored file
///
/// Returned by [`LocalObjectStore::store_detailed`] for callers that want to persist more than
/// the key alongside their record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated storage key
    pub key: StorageKey,

    /// Filename as supplied by the caller, unsanitised
    pub original_filename: String,

    /// Size of the stored bytes
    pub size_bytes: u64,

    /// Hexadecimal SHA-256 digest of the stored bytes
    pub sha256: String,

    /// MIME type derived from the key's extension
    pub content_type: String,

    /// Media type detected from the content's magic bytes, if recognised
    ///
    /// This is a best-effort detection and should not be considered authoritative.
    pub detected_media_type: Option<String>,

    /// UTC timestamp embedded in the key
    pub stored_at: DateTime<Utc>,
}

/// File lifecycle operations over one storage root
#[derive(Debug)]
pub struct LocalObjectStore {
    /// Absolute directory holding every stored file
    storage_root: PathBuf,

    keys: KeyGenerator,
}

impl LocalObjectStore {
    /// Creates a store over the configured root without touching the filesystem.
    ///
    /// The root does not need to exist yet; it is created on first write or listing.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            storage_root: config.storage_root().to_path_buf(),
            keys: KeyGenerator::new(),
        }
    }

    /// Creates a store and ensures its root directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageUnavailable`] if the root cannot be created.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let store = Self::new(config);
        store.ensure_storage_root()?;
        Ok(store)
    }

    /// Returns the storage root directory.
    #[must_use]
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Creates the storage root and any missing ancestors.
    ///
    /// Idempotent and safe to call concurrently: a creation failure is ignored when the root
    /// turns out to be a directory afterwards, which covers another caller creating it first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageUnavailable`] if the directory cannot be created, for
    /// example because of permissions or because the path (or an ancestor) is a regular file.
    pub fn ensure_storage_root(&self) -> StoreResult<()> {
        if self.storage_root.is_dir() {
            return Ok(());
        }

        match fs::create_dir_all(&self.storage_root) {
            Ok(()) => {
                tracing::info!("created storage root {}", self.storage_root.display());
                Ok(())
            }
            Err(_) if self.storage_root.is_dir() => Ok(()),
            Err(source) => Err(StoreError::StorageUnavailable {
                path: self.storage_root.clone(),
                source,
            }),
        }
    }

    /// Stores `buffer` under a freshly generated key.
    ///
    /// # Arguments
    ///
    /// * `buffer` - The bytes to store, written verbatim
    /// * `original_filename` - The client-supplied filename; only its last component is used,
    ///   and it is sanitised before becoming part of the key
    ///
    /// # Returns
    ///
    /// The generated key, for the caller to persist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageUnavailable`] if the root cannot be created or the write
    /// fails (disk full, permission denied).
    pub fn store(&self, buffer: &[u8], original_filename: &str) -> StoreResult<StorageKey> {
        Ok(self.write_new(buffer, original_filename)?.into_storage_key())
    }

    /// Stores `buffer` like [`Self::store`] and returns a receipt describing it.
    ///
    /// The receipt carries the SHA-256 digest, the extension-derived content type and a
    /// best-effort sniffed media type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageUnavailable`] if the root cannot be created or the write
    /// fails.
    pub fn store_detailed(&self, buffer: &[u8], original_filename: &str) -> StoreResult<StoredFile> {
        let generated = self.write_new(buffer, original_filename)?;
        let stored_at = generated.generated_at().unwrap_or_else(Utc::now);
        let key = generated.into_storage_key();

        let detected_media_type = infer::get(buffer).map(|kind| kind.mime_type().to_string());

        Ok(StoredFile {
            content_type: content_type(key.as_str()).to_string(),
            key,
            original_filename: original_filename.to_string(),
            size_bytes: buffer.len() as u64,
            sha256: hex::encode(Sha256::digest(buffer)),
            detected_media_type,
            stored_at,
        })
    }

    fn write_new(&self, buffer: &[u8], original_filename: &str) -> StoreResult<GeneratedKey> {
        self.ensure_storage_root()?;

        let key = self.keys.generate(original_filename);

        // Collisions are not special-cased: last write wins.
        write_file(&self.storage_root.join(key.to_string()), buffer)?;

        tracing::debug!("stored {} ({} bytes)", key, buffer.len());
        Ok(key)
    }

    /// Resolves `key` to the absolute path of an existing file.
    ///
    /// The path is always a direct child of the storage root.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidKey`] if `key` is not a single safe path segment
    /// - [`StoreError::NotFound`] if no file exists for `key`
    pub fn resolve_path(&self, key: &str) -> StoreResult<PathBuf> {
        let key = StorageKey::parse(key)?;
        let path = self.storage_root.join(key.as_str());

        if !path.exists() {
            return Err(StoreError::NotFound(key.into_inner()));
        }

        Ok(path)
    }

    /// Returns whether a file exists for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if `key` is not a single safe path segment.
    pub fn contains(&self, key: &str) -> StoreResult<bool> {
        match self.resolve_path(key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reads the full contents of the file stored under `key`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no file exists for `key`, including when it disappears
    ///   between resolution and the read
    /// - [`StoreError::ReadFailed`] for any other I/O error
    pub fn fetch_bytes(&self, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.resolve_path(key)?;

        let bytes = fs::read(&path).map_err(|source| read_error(key, source))?;
        tracing::debug!("fetched {} ({} bytes)", key, bytes.len());
        Ok(bytes)
    }

    /// Deletes the file stored under `key`.
    ///
    /// Deleting a key that does not exist succeeds, so repeated deletes are harmless.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidKey`] if `key` is not a single safe path segment
    /// - [`StoreError::DeleteFailed`] if the file exists but cannot be removed
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        let path = match self.resolve_path(key) {
            Ok(path) => path,
            Err(StoreError::NotFound(_)) => {
                tracing::info!("delete of missing key {} ignored", key);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("deleted {}", key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("key {} removed concurrently", key);
                Ok(())
            }
            Err(source) => Err(StoreError::DeleteFailed {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Moves the file under `old_key` to a key minted from `new_logical_name`.
    ///
    /// This is a logical rename: the new key gets its own timestamp and token rather than
    /// reusing those of `old_key`.
    ///
    /// # Returns
    ///
    /// The new key. The old key no longer resolves.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidKey`] if `old_key` is not a single safe path segment
    /// - [`StoreError::NotFound`] if no file exists for `old_key`
    /// - [`StoreError::RenameFailed`] for any other failure of the move
    pub fn rename(&self, old_key: &str, new_logical_name: &str) -> StoreResult<StorageKey> {
        let old_path = self.resolve_path(old_key)?;
        let new_key = self.keys.generate(new_logical_name).into_storage_key();
        let new_path = self.storage_root.join(new_key.as_str());

        fs::rename(&old_path, &new_path)
            .map_err(|source| rename_error(old_key, new_key.as_str(), source))?;

        tracing::debug!("renamed {} to {}", old_key, new_key);
        Ok(new_key)
    }

    /// Lists every entry directly inside the storage root.
    ///
    /// The listing is not recursive and its order is filesystem-dependent.
    ///
    /// The listing can under-report: entries whose names are not valid UTF-8, or are not valid
    /// keys (for example a name containing `\` on Unix), are skipped with a warning because
    /// no operation on this store could address them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageUnavailable`] if the root cannot be created or read.
    pub fn list_keys(&self) -> StoreResult<Vec<StorageKey>> {
        self.ensure_storage_root()?;

        let unavailable = |source: std::io::Error| StoreError::StorageUnavailable {
            path: self.storage_root.clone(),
            source,
        };

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.storage_root).map_err(unavailable)? {
            let entry = entry.map_err(unavailable)?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("skipping non UTF-8 entry {:?}", raw);
                    continue;
                }
            };

            match StorageKey::parse(&name) {
                Ok(key) => keys.push(key),
                Err(e) => tracing::warn!("skipping entry {:?}: {}", name, e),
            }
        }

        Ok(keys)
    }

    /// Returns size and timestamps for the file under `key` without reading it.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no file exists for `key`
    /// - [`StoreError::ReadFailed`] if the metadata cannot be read
    pub fn stat(&self, key: &str) -> StoreResult<FileStat> {
        let path = self.resolve_path(key)?;
        let metadata = fs::metadata(&path).map_err(|source| read_error(key, source))?;

        let modified_at: DateTime<Utc> = metadata
            .modified()
            .map_err(|source| read_error(key, source))?
            .into();
        let created_at = metadata
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified_at);

        Ok(FileStat {
            size_bytes: metadata.len(),
            created_at,
            modified_at,
        })
    }
}

fn write_file(path: &Path, buffer: &[u8]) -> StoreResult<()> {
    fs::write(path, buffer).map_err(|source| StoreError::StorageUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

fn rename_error(from: &str, to: &str, source: std::io::Error) -> StoreError {
    match source.kind() {
        ErrorKind::NotFound => StoreError::NotFound(from.to_string()),
        _ => StoreError::RenameFailed {
            from: from.to_string(),
            to: to.to_string(),
            source,
        },
    }
}

fn read_error(key: &str, source: std::io::Error) -> StoreError {
    match source.kind() {
        ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
        _ => StoreError::ReadFailed {
            key: key.to_string(),
            source,
        },
    }
}
