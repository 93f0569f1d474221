//! Markup escaping for text interpolated into chat responses.

/// Escape text for embedding in HTML markup or attribute values.
///
/// Covers `&`, `<`, `>`, `"` and `'`. Ampersands go first so entities
/// produced here are never escaped twice.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}
