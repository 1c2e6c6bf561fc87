//! Filename splitting and sanitisation.
//!
//! All functions here are total: any input string, however hostile, produces output.

/// Returns the final path component of a client-supplied filename.
///
/// Both `/` and `\` count as separators, since uploads from Windows clients can carry
/// full `C:\...` paths.
pub fn last_component(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

/// Splits a filename into stem and extension.
///
/// The extension starts at the last `.` and keeps the dot. A leading dot does not start an
/// extension, so `.pdf` is all stem and `archive.tar.gz` splits as (`archive.tar`, `.gz`).
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_base_name(base: &str) -> String {
    base.chars()
        .map(|c| if is_key_char(c) { c } else { '_' })
        .collect()
}

/// Sanitises an extension produced by [`split_extension`].
///
/// Ordinary extensions come back unchanged. The leading dot is kept and anything else outside
/// `[A-Za-z0-9_-]` becomes `_`.
pub fn sanitize_extension(extension: &str) -> String {
    match extension.strip_prefix('.') {
        Some(rest) => format!(".{}", sanitize_base_name(rest)),
        None => sanitize_base_name(extension),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_component() {
        assert_eq!(last_component("a/b/c.pdf"), "c.pdf");
        assert_eq!(last_component("C:\\Users\\me\\scan.tif"), "scan.tif");
        assert_eq!(last_component("../../etc/passwd"), "passwd");
        assert_eq!(last_component("plain.png"), "plain.png");
        assert_eq!(last_component("trailing/"), "");
        assert_eq!(last_component(""), "");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("report.pdf"), ("report", ".pdf"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".pdf"), (".pdf", ""));
        assert_eq!(split_extension("file."), ("file", "."));
        assert_eq!(split_extension(""), ("", ""));
    }

    #[test]
    fn test_sanitize_base_name() {
        assert_eq!(sanitize_base_name("W-2 form (2024)"), "W-2_form__2024_");
        assert_eq!(sanitize_base_name("already_safe-1"), "already_safe-1");
        assert_eq!(sanitize_base_name(".."), "__");
        assert_eq!(sanitize_base_name(""), "");
        assert_eq!(sanitize_base_name("日本"), "__");
    }

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension(".PDF"), ".PDF");
        assert_eq!(sanitize_extension(".p\\df"), ".p_df");
        assert_eq!(sanitize_extension("."), ".");
        assert_eq!(sanitize_extension(""), "");
    }
}
