//! # Segment Extraction
//!
//! Turns a file name into normalized tokens ("segments") and a detected extension.
//!
//! 1. The name is tested against [`KNOWN_EXTENSIONS`] in list order; the first
//!    extension whose `.ext` suffix matches (ASCII case-insensitive) wins. This is a
//!    first-match policy, not longest match.
//! 2. The matched suffix is stripped and the remainder is split on `-`, `_` and `.`.
//! 3. Empty pieces are dropped and duplicates removed, keeping first-seen order.
//!
//! Extraction is a pure function with no shared state.

pub const KNOWN_EXTENSIONS: [&str; 9] = [
    "pdf", "jpg", "jpeg", "png", "doc", "docx", "xls", "xlsx", "m4a",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments {
    pub segments: Vec<String>,
    /// Extension without the dot, in the casing found in the name.
    pub extension: Option<String>,
}

impl Segments {
    /// Segments joined with `_`, the input for homeroom-code parsing.
    pub fn joined(&self) -> String {
        self.segments.join("_")
    }

    pub fn contains(&self, token: &str) -> bool {
        self.segments.iter().any(|s| s == token)
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '-' | '_' | '.')
}

/// Splits off a known extension. Returns `(stem, extension)`.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    for ext in KNOWN_EXTENSIONS {
        let suffix_len = ext.len() + 1;
        if name.len() <= suffix_len || !name.is_char_boundary(name.len() - suffix_len) {
            continue;
        }
        let (stem, suffix) = name.split_at(name.len() - suffix_len);
        if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(ext) {
            return (stem, Some(&suffix[1..]));
        }
    }
    (name, None)
}

pub fn extract(name: &str) -> Segments {
    if name.is_empty() {
        return Segments::default();
    }

    let (stem, extension) = split_extension(name);
    let mut segments: Vec<String> = Vec::new();
    for piece in stem.split(is_delimiter) {
        if piece.is_empty() || segments.iter().any(|s| s == piece) {
            continue;
        }
        segments.push(piece.to_string());
    }

    Segments {
        segments,
        extension: extension.map(str::to_string),
    }
}
