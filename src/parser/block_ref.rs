//! Scanners for `((id "anchor"))` block references and `<<id "text">>`
//! file annotation references. The caret sentinel never participates in
//! matching; it is carried into the anchor text instead.

use crate::editor;
use crate::nodes::is_node_id_pattern;

pub(crate) struct RefMatch {
    pub id: String,
    pub text: String,
    /// `d` dynamic anchor text, `s` static.
    pub subtype: &'static str,
    /// Bytes consumed from the input, caret included.
    pub len: usize,
    pub had_caret: bool,
}

/// Scans a block reference starting at `((`.
pub(crate) fn scan_block_ref(s: &str) -> Option<RefMatch> {
    scan_double_delim(s, "((", "))")
}

/// Scans a file annotation reference starting at `<<`.
pub(crate) fn scan_file_annotation_ref(s: &str) -> Option<RefMatch> {
    scan_double_delim(s, "<<", ">>")
}

fn scan_double_delim(s: &str, open: &str, close: &str) -> Option<RefMatch> {
    if !s.starts_with(open) {
        return None;
    }
    let end_rel = s[2..].find(close)?;
    let raw_inner = &s[2..2 + end_rel];
    if raw_inner.contains('\n') {
        return None;
    }

    let had_caret = raw_inner.contains(editor::CARET);
    let inner = editor::strip_caret(raw_inner);
    let inner = inner.trim();

    let (id_part, rest) = match inner.find(char::is_whitespace) {
        Some(ix) => (&inner[..ix], inner[ix..].trim_start()),
        None => (inner, ""),
    };
    if !is_node_id_pattern(id_part) {
        return None;
    }

    let (text, subtype) = if rest.is_empty() {
        (String::new(), "d")
    } else if rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"') {
        (rest[1..rest.len() - 1].to_string(), "s")
    } else if rest.len() >= 2 && rest.starts_with('\'') && rest.ends_with('\'') {
        (rest[1..rest.len() - 1].to_string(), "d")
    } else {
        (rest.to_string(), "s")
    };

    Some(RefMatch {
        id: id_part.to_string(),
        text,
        subtype,
        len: 2 + end_rel + 2,
        had_caret,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_refs() {
        let m = scan_block_ref(r#"((20210808180117-6v0mkxr "anchor")) rest"#).unwrap();
        assert_eq!(m.id, "20210808180117-6v0mkxr");
        assert_eq!(m.text, "anchor");
        assert_eq!(m.subtype, "s");
        assert_eq!(m.len, 35);

        let m = scan_block_ref("((20210808180117-6v0mkxr))").unwrap();
        assert_eq!(m.text, "");
        assert_eq!(m.subtype, "d");

        let m = scan_block_ref("((20210808180117-6v0mkxr 'dyn'))").unwrap();
        assert_eq!(m.subtype, "d");

        assert!(scan_block_ref("((not-an-id))").is_none());
    }

    #[test]
    fn caret_transparent() {
        let m = scan_block_ref("((20210808180117-6v0mkxr\u{2038}))").unwrap();
        assert_eq!(m.id, "20210808180117-6v0mkxr");
        assert!(m.had_caret);
    }

    #[test]
    fn file_annotation_refs() {
        let m = scan_file_annotation_ref(r#"<<20210808180117-6v0mkxr "p. 42">>"#).unwrap();
        assert_eq!(m.text, "p. 42");
    }
}
