//! Kramdown inline attribute lists. A block IAL is a standalone
//! `{: k="v" …}` line annotating the preceding block; span IALs follow
//! inline spans and are handled by the inline parser.

use crate::editor;
use crate::entity;
use crate::nodes::{AstNode, NodeValue};
use crate::parser::Parser;

pub(crate) fn handle_block_ial<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    container: &mut &'a AstNode<'a>,
    line: &[u8],
    indented: bool,
) -> bool {
    if indented || !parser.options.kramdown_block_ial {
        return false;
    }
    let raw = std::str::from_utf8(&line[parser.first_nonspace..]).unwrap_or("");
    let stripped = editor::strip_caret(raw);
    let trimmed = stripped.trim_end();
    let attrs = match parse_ial(trimmed) {
        Some(attrs) => attrs,
        None => return false,
    };

    let node = parser.add_child(*container, NodeValue::KramdownBlockIAL);
    node.data.borrow_mut().tokens = trimmed.to_string();

    // the IAL annotates whatever block precedes it
    if let Some(prev) = node.previous_sibling() {
        let mut past = prev.data.borrow_mut();
        for (k, v) in &attrs {
            past.set_ial_attr(k, v);
        }
    }

    *container = node;
    let adv = line.len() - 1 - parser.offset;
    parser.advance_offset(line, adv, false);
    true
}

/// Parses `{: key="value" …}` into ordered pairs. Values are HTML
/// unescaped; the newline escape is reversed.
pub fn parse_ial(text: &str) -> Option<Vec<(String, String)>> {
    let t = text.trim();
    let inner = t.strip_prefix("{:")?.strip_suffix('}')?;

    let mut attrs = Vec::new();
    let bytes = inner.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let key_start = i;
        while i < bytes.len() && bytes[i] != b'=' && bytes[i] != b' ' {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            return None;
        }
        let key = inner[key_start..i].to_string();
        i += 1;
        if i >= bytes.len() || bytes[i] != b'"' {
            return None;
        }
        i += 1;
        let val_start = i;
        while i < bytes.len() && bytes[i] != b'"' {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let raw_val = &inner[val_start..i];
        i += 1;

        let val = entity::unescape_html(raw_val).replace(editor::IAL_VAL_ESC_NEWLINE, "\n");
        attrs.push((key, val));
    }

    if attrs.is_empty() {
        None
    } else {
        Some(attrs)
    }
}

/// Renders pairs back to the `{: …}` form, escaping values.
pub fn ial_to_string(attrs: &[(String, String)]) -> String {
    let mut out = String::from("{:");
    for (k, v) in attrs {
        let escaped = escape_attr_value(v).replace('\n', editor::IAL_VAL_ESC_NEWLINE);
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(&escaped);
        out.push('"');
    }
    out.push('}');
    out
}

pub(crate) fn escape_attr_value(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether an IAL marks a document node.
pub fn is_doc_ial(attrs: &[(String, String)]) -> bool {
    attrs.iter().any(|(k, v)| k == "type" && v == "doc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ial_round_trip() {
        let attrs = parse_ial(r#"{: id="20210808180117-6v0mkxr" bookmark="a&amp;b"}"#).unwrap();
        assert_eq!(attrs[0].0, "id");
        assert_eq!(attrs[1], ("bookmark".to_string(), "a&b".to_string()));
        assert_eq!(
            ial_to_string(&attrs),
            r#"{: id="20210808180117-6v0mkxr" bookmark="a&amp;b"}"#
        );
    }

    #[test]
    fn ial_newline_escape() {
        let attrs = parse_ial(r#"{: memo="line1_esc_newline_line2"}"#).unwrap();
        assert_eq!(attrs[0].1, "line1\nline2");
        assert!(ial_to_string(&attrs).contains("_esc_newline_"));
    }

    #[test]
    fn rejects_non_ial() {
        assert!(parse_ial("{ not ial }").is_none());
        assert!(parse_ial("{: }").is_none());
        assert!(parse_ial(r#"{: id=unquoted}"#).is_none());
    }
}
