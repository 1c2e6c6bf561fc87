//! Local object storage
//!
//! This crate persists uploaded documents and generated artifacts as plain files inside a
//! single configured directory, and hands back an opaque key for each one. Callers keep the
//! key (typically in a database column) and pass it back to read, rename, inspect or delete
//! the file.
//!
//! ## Design Principles
//!
//! - The filesystem is the only source of truth; no in-memory index is kept
//! - Keys are collision-resistant and always a single path segment under the root
//! - Bytes are stored verbatim, with no header or manifest
//! - Configuration is resolved once and injected; operations never read the environment
//! - Deleting a key that is already gone succeeds
//!
//! ## Storage Layout
//!
//! The store is flat:
//!
//! ```text
//! <storage_root>/
//! ├── 1760572800123-9f2c4e1a0b7d3c55-2024_W2_form.pdf
//! ├── 1760572800123-0b81d9aa6c2e4f10-2024_W2_form.pdf
//! └── 1760572801456-5e7f00c3a1d2b948-receipt.png
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use docstore_files::{LocalObjectStore, StoreConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = LocalObjectStore::open(StoreConfig::from_env()?)?;
//!
//! let key = store.store(b"%PDF-1.7 ...", "2024 W-2.pdf")?;
//! let bytes = store.fetch_bytes(key.as_str())?;
//! let mime = docstore_files::content_type(key.as_str());
//! # let _ = (bytes, mime);
//! # Ok(())
//! # }
//! ```

mod config;
mod constants;
mod content_type;
mod store;

pub use config::{storage_root_from_env_value, StoreConfig};
pub use constants::{DEFAULT_STORAGE_ROOT, OCTET_STREAM, STORAGE_ROOT_ENV};
pub use content_type::content_type;
pub use docstore_keys::{GeneratedKey, KeyGenerator};
pub use docstore_types::{KeyError, StorageKey};
pub use store::{FileStat, LocalObjectStore, StoredFile};

use std::path::PathBuf;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage root cannot be created, read or written
    #[error("Storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key does not correspond to an existing file
    #[error("File not found for key: {0}")]
    NotFound(String),

    /// The file exists but could not be read
    #[error("Failed to read {key}: {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but could not be removed
    #[error("Failed to delete {key}: {source}")]
    DeleteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be moved to its new key
    #[error("Failed to rename {from} to {to}: {source}")]
    RenameFailed {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },

    /// The supplied key is not a single safe path segment
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// Configuration was rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
