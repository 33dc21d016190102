//! Logging utilities for sanitizing client-supplied strings so logs stay
//! single-line. Escapes control characters that otherwise break log readability.

/// Escape a string for single-line logging: newlines, carriage returns, tabs
/// and backslashes become their two-character escape sequences, other control
/// characters become `\xNN`. Strings longer than the preview cap are cut with
/// an ellipsis to bound log noise.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 200;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for ch in s.chars().take(MAX_PREVIEW) {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    if s.chars().count() > MAX_PREVIEW {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_log;

    #[test]
    fn escapes_newlines_and_tabs() {
        assert_eq!(escape_log("a\nb\r\tc"), "a\\nb\\r\\tc");
    }

    #[test]
    fn truncates_long_input() {
        let long = "x".repeat(500);
        let esc = escape_log(&long);
        assert!(esc.ends_with('…'));
        assert!(esc.chars().count() <= 201);
    }
}
