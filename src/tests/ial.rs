use pretty_assertions::assert_eq;

use super::editor_engine;
use crate::parser::ial::{ial_to_string, parse_ial};

#[test]
fn block_ial_attaches_to_previous_block() {
    let engine = editor_engine();
    let md = "para one\n{: id=\"20210808180117-6v0mkxr\" bookmark=\"b\"}\n";
    let formatted = engine.format("", md);
    assert_eq!(
        formatted,
        "para one\n{: id=\"20210808180117-6v0mkxr\" bookmark=\"b\"}\n"
    );
}

#[test]
fn block_ial_suppressed_without_option() {
    let engine = crate::Engine::new();
    // kramdown parsing off: the IAL line is a plain paragraph
    let formatted = engine.format("", "para\n{: id=\"x\"}\n");
    assert!(formatted.contains("{: id="));
}

#[test]
fn span_ial_round_trip() {
    let engine = editor_engine();
    let md = "**bold**{: style=\"color:red\"}\n";
    assert_eq!(engine.format("", md), md);
}

#[test]
fn ial_values_escape_newlines() {
    let attrs = vec![("memo".to_string(), "two\nlines".to_string())];
    let s = ial_to_string(&attrs);
    assert!(s.contains("_esc_newline_"));
    let parsed = parse_ial(&s).unwrap();
    assert_eq!(parsed[0].1, "two\nlines");
}

#[test]
fn ial_order_is_preserved() {
    let s = r#"{: id="20210808180117-6v0mkxr" name="n" memo="m"}"#;
    let parsed = parse_ial(s).unwrap();
    let keys: Vec<&str> = parsed.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["id", "name", "memo"]);
    assert_eq!(ial_to_string(&parsed), s);
}

#[test]
fn doc_ial_detection() {
    let attrs = parse_ial(r#"{: id="x" type="doc"}"#).unwrap();
    assert!(crate::parser::ial::is_doc_ial(&attrs));
    let attrs = parse_ial(r#"{: id="x"}"#).unwrap();
    assert!(!crate::parser::ial::is_doc_ial(&attrs));
}
