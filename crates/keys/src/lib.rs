//! Storage key generation.
//!
//! Every stored file is named by a key minted from the uploader's original filename:
//!
//! `{timestamp}-{token}-{sanitised_base}{extension}`
//!
//! Example:
//! `1760572800123-9f2c4e1a0b7d3c55-2024_W2_form.pdf`
//!
//! - `timestamp` is milliseconds since the Unix epoch, non-decreasing within the process
//! - `token` is 16 lowercase hex characters drawn from the OS random source, so two keys
//!   minted in the same millisecond still differ
//! - `sanitised_base` is the filename stem with every character outside `[A-Za-z0-9_-]`
//!   replaced by `_`
//! - `extension` is the original extension including its dot
//!
//! ## Traversal safety
//!
//! Only the last path component of the supplied filename is used, with both `/` and `\`
//! treated as separators. The stem and extension are then restricted to `[A-Za-z0-9_-]` (plus
//! the extension's leading dot), so a generated key is always a single path segment no matter
//! what the client sent.
//!
//! Keys never exceed [`MAX_KEY_BYTES`]: overlong stems are shortened and extensions are capped
//! at [`MAX_EXTENSION_BYTES`].

mod generator;
mod sanitize;

pub use generator::{GeneratedKey, KeyGenerator, MAX_EXTENSION_BYTES, MAX_KEY_BYTES, TOKEN_BYTES};
pub use sanitize::{last_component, sanitize_base_name, sanitize_extension, split_extension};

/// Error type for key parsing.
#[derive(Debug, thiserror::Error)]
pub enum KeyFormatError {
    /// The string is not in generated key form
    #[error("Invalid key format: {0}")]
    InvalidInput(String),
}
