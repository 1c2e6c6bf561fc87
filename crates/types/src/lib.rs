/// Errors that can occur when validating a storage key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The key was empty
    #[error("Storage key cannot be empty")]
    Empty,

    /// The key contained a path separator or NUL byte
    #[error("Storage key must be a single path segment: '{0}'")]
    PathSeparator(String),

    /// The key was `.` or `..`
    #[error("Storage key is a reserved path segment: '{0}'")]
    Reserved(String),
}

/// A string type that guarantees a single, traversal-safe path segment.
///
/// Keys are handed out by the store and persisted by callers as opaque strings. Any key that
/// comes back from outside is parsed into a `StorageKey` before it is joined onto the storage
/// root, so a key can never name anything outside that directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Validates `input` as a storage key.
    ///
    /// Unlike user-facing text, the input is not trimmed: the key must round-trip byte for byte
    /// with the filename on disk.
    ///
    /// # Errors
    ///
    /// - [`KeyError::Empty`] if `input` is empty
    /// - [`KeyError::PathSeparator`] if `input` contains `/`, `\` or a NUL byte
    /// - [`KeyError::Reserved`] if `input` is `.` or `..`
    pub fn parse(input: impl AsRef<str>) -> Result<Self, KeyError> {
        let input = input.as_ref();
        if input.is_empty() {
            return Err(KeyError::Empty);
        }
        if input.contains(['/', '\\', '\0']) {
            return Err(KeyError::PathSeparator(input.to_owned()));
        }
        if input == "." || input == ".." {
            return Err(KeyError::Reserved(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key, returning the owned string for persistence.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for StorageKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageKey::parse(s)
    }
}

impl serde::Serialize for StorageKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for StorageKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StorageKey::parse(&s).map_err(serde::de::Error::custom)
    }
}
