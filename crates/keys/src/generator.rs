//! Key minting and parsing.

use crate::sanitize::{last_component, sanitize_base_name, sanitize_extension, split_extension};
use crate::KeyFormatError;
use chrono::{DateTime, Utc};
use docstore_types::StorageKey;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

/// Number of random bytes in each key's token (hex-encoded to twice as many characters).
pub const TOKEN_BYTES: usize = 8;

/// Longest key in bytes; the common file name limit (`NAME_MAX`).
pub const MAX_KEY_BYTES: usize = 255;

/// Longest extension kept in a key, including its dot.
pub const MAX_EXTENSION_BYTES: usize = 32;

static PROCESS_LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// A storage key split into its components.
///
/// Displaying a `GeneratedKey` yields the key string; parsing the key string with
/// [`FromStr`] recovers the components.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeneratedKey {
    timestamp_ms: i64,
    token: String,
    base: String,
    extension: String,
}

impl GeneratedKey {
    /// Milliseconds since the Unix epoch at generation time.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Generation time as a UTC timestamp, if representable.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }

    /// Random hex token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Sanitised filename stem. May be empty.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Extension including its leading dot, or empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Converts into a validated [`StorageKey`].
    pub fn into_storage_key(self) -> StorageKey {
        // Digits lead every generated key and the remaining characters are drawn from
        // [A-Za-z0-9_.-], so validation cannot fail.
        StorageKey::parse(self.to_string()).expect("generated keys are a single safe segment")
    }
}

impl fmt::Display for GeneratedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}{}",
            self.timestamp_ms, self.token, self.base, self.extension
        )
    }
}

impl FromStr for GeneratedKey {
    type Err = KeyFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let (Some(ts_str), Some(token), Some(rest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(KeyFormatError::InvalidInput(format!(
                "expected '{{timestamp}}-{{token}}-{{name}}', got: '{}'",
                s
            )));
        };

        let timestamp_ms = ts_str.parse::<i64>().map_err(|e| {
            KeyFormatError::InvalidInput(format!("Invalid timestamp '{}': {}", ts_str, e))
        })?;

        let token_valid = token.len() == TOKEN_BYTES * 2
            && token
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !token_valid {
            return Err(KeyFormatError::InvalidInput(format!(
                "Token must be {} lowercase hex characters, got: '{}'",
                TOKEN_BYTES * 2,
                token
            )));
        }

        let (base, extension) = split_extension(rest);
        if sanitize_base_name(base) != base || sanitize_extension(extension) != extension {
            return Err(KeyFormatError::InvalidInput(format!(
                "Name segment contains unsanitised characters: '{}'",
                rest
            )));
        }

        Ok(Self {
            timestamp_ms,
            token: token.to_owned(),
            base: base.to_owned(),
            extension: extension.to_owned(),
        })
    }
}

/// Mints storage keys.
///
/// Timestamps never go backwards within the process: every generator shares one high-water
/// mark, so if the wall clock steps back the last issued timestamp is reused and the random
/// token keeps keys distinct. Safe to share between threads.
#[derive(Debug)]
pub struct KeyGenerator {
    last_millis: &'static AtomicI64,
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGenerator {
    /// Creates a generator sharing the process-wide timestamp high-water mark.
    pub fn new() -> Self {
        Self {
            last_millis: &PROCESS_LAST_MILLIS,
        }
    }

    /// Generates a fresh key for `original_filename`.
    ///
    /// Never fails: empty names, names made only of punctuation and names carrying path
    /// components all produce a valid key. Overlong names are cut so the key fits in
    /// [`MAX_KEY_BYTES`]; the stem is shortened first, and the extension is capped at
    /// [`MAX_EXTENSION_BYTES`].
    pub fn generate(&self, original_filename: &str) -> GeneratedKey {
        let (base, extension) = split_extension(last_component(original_filename));

        let timestamp_ms = self.next_timestamp(Utc::now().timestamp_millis());
        let token = random_token();

        let extension = truncate_to(sanitize_extension(extension), MAX_EXTENSION_BYTES);
        // "{ts}-{token}-" prefix
        let prefix_len = timestamp_ms.to_string().len() + token.len() + 2;
        let base_budget = MAX_KEY_BYTES.saturating_sub(prefix_len + extension.len());
        let base = truncate_to(sanitize_base_name(base), base_budget);

        GeneratedKey {
            timestamp_ms,
            token,
            base,
            extension,
        }
    }

    fn next_timestamp(&self, now_ms: i64) -> i64 {
        let previous = self.last_millis.fetch_max(now_ms, Ordering::Relaxed);
        previous.max(now_ms)
    }
}

/// Cuts `value` to at most `max_bytes`, on a char boundary.
fn truncate_to(mut value: String, max_bytes: usize) -> String {
    if value.len() > max_bytes {
        let mut end = max_bytes;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
    }
    value
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_format() {
        let generator = KeyGenerator::new();
        let key = generator.generate("tax return.pdf");

        assert_eq!(key.base(), "tax_return");
        assert_eq!(key.extension(), ".pdf");
        assert_eq!(key.token().len(), 16);
        assert!(key.timestamp_ms() > 0);

        let rendered = key.to_string();
        assert!(rendered.ends_with("-tax_return.pdf"));
        assert!(rendered.starts_with(&key.timestamp_ms().to_string()));
    }

    #[test]
    fn test_generate_preserves_extension_case() {
        let key = KeyGenerator::new().generate("SCAN.TIFF");
        assert_eq!(key.base(), "SCAN");
        assert_eq!(key.extension(), ".TIFF");
    }

    #[test]
    fn test_generate_neutralises_traversal() {
        let generator = KeyGenerator::new();
        let inputs = [
            "../../etc/passwd",
            "a/b/c.pdf",
            "..\\..\\windows\\system32.dll",
            "",
            "..",
            ".",
            "/",
            "!!!@@@###",
            "evil.p\\df",
            "名前.png",
        ];

        for input in inputs {
            let key = generator.generate(input).to_string();
            assert!(!key.contains('/'), "{:?} produced {:?}", input, key);
            assert!(!key.contains('\\'), "{:?} produced {:?}", input, key);
            assert_ne!(key, "..");
            assert!(StorageKey::parse(&key).is_ok(), "{:?} produced {:?}", input, key);
        }
    }

    #[test]
    fn test_generate_uses_last_component() {
        let generator = KeyGenerator::new();

        let key = generator.generate("a/b/c.pdf");
        assert_eq!(key.base(), "c");
        assert_eq!(key.extension(), ".pdf");

        let key = generator.generate("../../etc/passwd");
        assert_eq!(key.base(), "passwd");
        assert_eq!(key.extension(), "");
    }

    #[test]
    fn test_generate_empty_and_extension_only_names() {
        let generator = KeyGenerator::new();

        let key = generator.generate("");
        assert_eq!(key.base(), "");
        assert_eq!(key.extension(), "");
        assert!(key.to_string().ends_with('-'));

        let key = generator.generate(".pdf");
        assert_eq!(key.base(), "_pdf");
        assert_eq!(key.extension(), "");
    }

    #[test]
    fn test_generate_unique_for_same_name() {
        let generator = KeyGenerator::new();
        let keys: HashSet<String> = (0..1_000)
            .map(|_| generator.generate("same.pdf").to_string())
            .collect();
        assert_eq!(keys.len(), 1_000);
    }

    /// Generator with a private high-water mark, so fixed timestamps don't leak into the
    /// process-wide one.
    fn isolated_generator() -> KeyGenerator {
        KeyGenerator {
            last_millis: Box::leak(Box::new(AtomicI64::new(0))),
        }
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let generator = isolated_generator();
        assert_eq!(generator.next_timestamp(1_000), 1_000);
        assert_eq!(generator.next_timestamp(1_005), 1_005);
        // Clock stepped back
        assert_eq!(generator.next_timestamp(900), 1_005);
        assert_eq!(generator.next_timestamp(1_010), 1_010);
    }

    #[test]
    fn test_timestamps_shared_across_generators() {
        let ahead = Utc::now().timestamp_millis() + 60_000;
        KeyGenerator::new().next_timestamp(ahead);

        // A second generator must not fall back to the (earlier) wall clock
        assert!(KeyGenerator::new().generate("x").timestamp_ms() >= ahead);
    }

    #[test]
    fn test_generate_truncates_long_stem() {
        let generator = KeyGenerator::new();
        let name = format!("{}.pdf", "a".repeat(300));

        let key = generator.generate(&name);
        let rendered = key.to_string();

        assert!(rendered.len() <= MAX_KEY_BYTES, "key is {} bytes", rendered.len());
        assert_eq!(key.extension(), ".pdf");
        assert!(!key.base().is_empty());
        assert!(key.base().chars().all(|c| c == 'a'));
        assert_eq!(rendered.parse::<GeneratedKey>().unwrap(), key);
    }

    #[test]
    fn test_generate_caps_long_extension() {
        let generator = KeyGenerator::new();
        let name = format!("report.{}", "x".repeat(400));

        let key = generator.generate(&name);

        assert_eq!(key.extension().len(), MAX_EXTENSION_BYTES);
        assert!(key.extension().starts_with('.'));
        assert_eq!(key.base(), "report");
        assert!(key.to_string().len() <= MAX_KEY_BYTES);
    }

    #[test]
    fn test_truncate_to_char_boundary() {
        assert_eq!(truncate_to("héllo".to_string(), 2), "h");
        assert_eq!(truncate_to("héllo".to_string(), 3), "hé");
        assert_eq!(truncate_to("short".to_string(), 10), "short");
        assert_eq!(truncate_to("abc".to_string(), 0), "");
    }

    #[test]
    fn test_generated_timestamps_non_decreasing() {
        let generator = KeyGenerator::new();
        let mut last = 0;
        for _ in 0..100 {
            let ts = generator.generate("x").timestamp_ms();
            assert!(ts >= last);
            last = ts;
        }
    }

    #[test]
    fn test_parse_roundtrip_of_generated_key() {
        let generator = KeyGenerator::new();
        for name in ["invoice-2024.pdf", "", "a.b.c", "..", "scan.TIF"] {
            let key = generator.generate(name);
            let parsed: GeneratedKey = key.to_string().parse().unwrap();
            assert_eq!(parsed, key, "round-trip failed for {:?}", name);
        }
    }

    #[test]
    fn test_parse_known_key() {
        let key: GeneratedKey = "1700000000000-0123456789abcdef-my-file_v2.jpeg"
            .parse()
            .unwrap();
        assert_eq!(key.timestamp_ms(), 1_700_000_000_000);
        assert_eq!(key.token(), "0123456789abcdef");
        assert_eq!(key.base(), "my-file_v2");
        assert_eq!(key.extension(), ".jpeg");
        assert_eq!(
            key.generated_at().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        for input in [
            "report.pdf",
            "abc-0123456789abcdef-x.pdf",
            "1700000000000-XYZ-x.pdf",
            "1700000000000-0123456789ABCDEF-x.pdf",
            "1700000000000-0123456789abcdef-bad name.pdf",
        ] {
            assert!(
                input.parse::<GeneratedKey>().is_err(),
                "expected rejection for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_into_storage_key() {
        let key = KeyGenerator::new().generate("../../etc/passwd");
        let rendered = key.to_string();
        let storage_key = key.into_storage_key();
        assert_eq!(storage_key.as_str(), rendered);
    }
}
