use crate::constants::OCTET_STREAM;
use docstore_keys::split_extension;

/// Maps a key's extension to a MIME type for serving the stored bytes.
///
/// The extension is matched case-insensitively. Unknown and missing extensions map to
/// `application/octet-stream`.
pub fn content_type(key: &str) -> &'static str {
    let (_, extension) = split_extension(key);
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "tiff" | "tif" => "image/tiff",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type("doc.PDF"), "application/pdf");
        assert_eq!(content_type("scan.TIFF"), "image/tiff");
        assert_eq!(content_type("scan.tif"), "image/tiff");
        assert_eq!(content_type("photo.jpg"), "image/jpeg");
        assert_eq!(content_type("photo.JpEg"), "image/jpeg");
        assert_eq!(content_type("chart.png"), "image/png");
    }

    #[test]
    fn test_unknown_extensions() {
        assert_eq!(content_type("file.exe"), "application/octet-stream");
        assert_eq!(content_type("noext"), "application/octet-stream");
        assert_eq!(content_type("trailing."), "application/octet-stream");
        assert_eq!(content_type(""), "application/octet-stream");
    }

    #[test]
    fn test_generated_key() {
        assert_eq!(
            content_type("1700000000000-0123456789abcdef-my.return.pdf"),
            "application/pdf"
        );
        assert_eq!(
            content_type("1700000000000-0123456789abcdef-_pdf"),
            "application/octet-stream"
        );
    }
}
