//! The caret sentinel must survive every transformation, exactly once.

use pretty_assertions::assert_eq;

use super::editor_engine;
use crate::editor::{CARET, FRONT_END_CARET};

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn caret_survives_format() {
    let engine = editor_engine();
    for md in [
        "# Hello \u{2038}World\n",
        "para with \u{2038}cursor\n",
        "> ```js\n> let a = 1;\u{2038}\n> ```\n",
        "* item \u{2038}one\n* item two\n",
        "a **bo\u{2038}ld** b\n",
    ] {
        let formatted = engine.format("", md);
        assert_eq!(count(&formatted, CARET), 1, "lost caret in {md:?}");
        let twice = engine.format("", &formatted);
        assert_eq!(formatted, twice);
    }
}

#[test]
fn caret_becomes_wbr_in_block_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("# Hello \u{2038}World\n");
    assert_eq!(count(&dom, FRONT_END_CARET), 1, "{dom}");
    assert_eq!(count(&dom, CARET), 0);
    assert!(dom.contains("data-subtype=\"h1\""));
    assert!(dom.contains("Hello <wbr>World"));
}

#[test]
fn wbr_round_trips_through_markdown() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("para with \u{2038}cursor here\n");
    let md = engine.block_dom2_md(&dom);
    assert_eq!(count(&md, CARET), 1, "{md}");
    assert!(md.contains("with \u{2038}cursor"));
}

#[test]
fn caret_in_code_block_keeps_position() {
    let engine = editor_engine();
    let md = "```js\nlet a = 1;\u{2038}\n```\n";
    let dom = engine.md2_block_dom(md);
    // inside data-content attributes the sentinel stays raw
    assert_eq!(count(&dom, CARET), 1, "{dom}");
    let back = engine.block_dom2_md(&dom);
    assert!(back.contains("let a = 1;\u{2038}"), "{back}");
}

#[test]
fn caret_does_not_change_parsing() {
    let engine = editor_engine();
    // the sentinel inside a would-be delimiter must not break matching
    let plain = engine.format("", "a **bold** b\n");
    let with_caret = engine.format("", "a **bo\u{2038}ld** b\n");
    assert_eq!(
        crate::editor::strip_caret(&with_caret),
        plain,
        "caret changed the parse"
    );
}

#[test]
fn caret_only_document() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom(CARET);
    assert_eq!(count(&dom, FRONT_END_CARET), 1);
    assert!(dom.contains("NodeParagraph"));
}

#[test]
fn non_editor_renders_never_leak_the_sentinel() {
    let engine = editor_engine();
    let html = engine.markdown("", "# He\u{2038}llo\n\npa\u{2038}ra\n");
    assert_eq!(count(&html, CARET), 0, "{html}");
    let std_md = engine.block_dom2_std_md(&engine.md2_block_dom("x \u{2038}y\n"));
    assert_eq!(count(&std_md, CARET), 0, "{std_md}");
}
