//! Pure text normalization helpers
//!
//! No I/O, no configuration — the engine decides which transforms apply
//! based on its config and calls these in order.

/// Lowercase the whole string (case-insensitive matching).
pub fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

/// Map Polish diacritics to their base-Latin equivalents.
///
/// Covers the lowercase set; run after [`fold_case`] when both transforms
/// are enabled.
pub fn strip_diacritics(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ż' | 'ź' => 'z',
            other => other,
        })
        .collect()
}

/// Append a terminal period unless the string already ends in `.`, `!` or `?`.
pub fn enforce_terminal_punctuation(s: &str) -> String {
    if s.ends_with(['.', '!', '?']) {
        s.to_string()
    } else {
        format!("{}.", s)
    }
}

/// Uppercase the first character, leaving the rest intact.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
