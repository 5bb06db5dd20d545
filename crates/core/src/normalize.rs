//! Extension normalization and output file naming.
//!
//! Extensions are case-folded and `.jpeg` is unified to `.jpg`. Output
//! names are random UUIDs, so repeated runs never overwrite earlier files.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

/// Characters that are not allowed in directory names on common platforms.
static INVALID_FILENAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// Extensions PowerPoint media may carry and still count as extracted images.
pub const PRESENTATION_IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".jp2"];

/// Extension of a declared name, including the dot, as written in the name.
///
/// Returns an empty string when the name has no extension. A leading dot
/// (".hidden") is not treated as an extension.
pub fn extension_of(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => String::new(),
        Some(pos) => base[pos..].to_string(),
    }
}

/// Case-fold an extension and fold `.jpeg` into `.jpg`.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.to_lowercase();
    if ext == ".jpeg" {
        return ".jpg".to_string();
    }
    ext
}

/// A fresh random file name with the given extension (lowercased).
pub fn unique_filename(ext: &str) -> String {
    format!("{}{}", Uuid::new_v4(), ext.to_lowercase())
}

/// Whether a normalized extension is kept for presentations.
pub fn is_presentation_image(ext: &str) -> bool {
    PRESENTATION_IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// Make a string safe to use as a single path component.
///
/// The text is NFC-normalized so names coming from different file systems
/// compare equal, then reserved characters are replaced with `_`.
pub fn clean_filename(name: &str) -> String {
    let composed: String = name.nfc().collect();
    INVALID_FILENAME_REGEX
        .replace_all(&composed, "_")
        .into_owned()
}
