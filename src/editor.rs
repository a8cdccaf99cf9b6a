//! Editor plumbing constants: the caret sentinel and the zero-width
//! characters that carry cursor and marker-separation semantics through
//! every transformation.

/// The caret sentinel, U+2038. At most one may appear in any input; it
/// marks the editor cursor position inside a plain-text stream.
pub const CARET: &str = "\u{2038}";

/// Caret immediately followed by a newline.
pub const CARET_NEWLINE: &str = "\u{2038}\n";

/// Temporary stand-in used while a parser needs the caret out of the way.
pub const CARET_REPLACEMENT: &str = "caretreplacement";

/// The caret as rendered for the front end.
pub const FRONT_END_CARET: &str = "<wbr>";

/// Self-closing form of the front-end caret.
pub const FRONT_END_CARET_SELF_CLOSE: &str = "<wbr/>";

/// Escape for newlines inside IAL attribute values.
pub const IAL_VAL_ESC_NEWLINE: &str = "_esc_newline_";

/// Zero-width space, U+200B. Separates adjacent same-type inline markers.
pub const ZWSP: &str = "\u{200b}";

/// Zero-width joiner, U+200D. Breaks literal triple-backtick runs inside
/// code blocks.
pub const ZWJ: &str = "\u{200d}";

/// The caret sentinel as a char.
pub const CARET_CHAR: char = '\u{2038}';

/// Returns `s` with every caret sentinel removed.
pub fn strip_caret(s: &str) -> String {
    if !s.contains(CARET) {
        return s.to_string();
    }
    s.replace(CARET, "")
}

/// Returns `s` with zero-width spaces removed.
pub fn strip_zwsp(s: &str) -> String {
    if !s.contains(ZWSP) {
        return s.to_string();
    }
    s.replace(ZWSP, "")
}

/// Whether `s` is nothing but whitespace and caret sentinels.
pub fn is_caret_blank(s: &str) -> bool {
    s.chars().all(|c| c == CARET_CHAR || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_roundtrip_constants() {
        assert_eq!(CARET.len(), 3);
        assert_eq!(strip_caret("a\u{2038}b"), "ab");
        assert!(is_caret_blank(" \u{2038}\n"));
        assert!(!is_caret_blank("a\u{2038}"));
    }
}
