//! Constants used throughout the files crate.

/// Environment variable naming the storage root directory.
pub const STORAGE_ROOT_ENV: &str = "UPLOAD_DIR";

/// Storage root used when no directory is configured.
pub const DEFAULT_STORAGE_ROOT: &str = "/data/uploads";

/// Content type returned for unknown or missing extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";
