//! Display width helpers for zone labels.
//!
//! Names arrive verbatim from the bus, so anything drawn into a terminal is
//! stripped of ANSI escapes and control characters first.

use unicode_width::UnicodeWidthChar;

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

/// Remove escape sequences and control characters from a label.
pub fn sanitize_label(text: &str) -> String {
    let clean = strip_ansi_escapes::strip(text);
    String::from_utf8_lossy(&clean)
        .chars()
        .filter(|ch| !ch.is_control())
        .collect()
}

/// Cut `text` so its display width does not exceed `max_width`.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}
