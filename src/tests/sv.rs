use crate::render::sv::NEWLINE_SV;
use crate::Engine;

fn sv(md: &str) -> String {
    Engine::new().md2_editor_sv_dom(md)
}

#[test]
fn every_line_ends_with_one_sentinel() {
    let out = sv("para one\n");
    assert!(out.contains("<span data-type=\"text\">para one</span>"), "{out}");
    assert!(out.contains(NEWLINE_SV));
    // no doubled sentinel from coalescing
    assert!(!out.contains(&format!("{NEWLINE_SV}{NEWLINE_SV}{NEWLINE_SV}")));
}

#[test]
fn heading_markers_are_styled_spans() {
    let out = sv("## Two\n");
    assert!(
        out.contains("editor-sv__marker--heading"),
        "{out}"
    );
    assert!(out.contains("## "));
}

#[test]
fn emphasis_markers_use_bi_class() {
    let out = sv("a **b** c\n");
    assert!(out.contains("editor-sv__marker--bi"), "{out}");
    assert_eq!(out.matches("editor-sv__marker--bi").count(), 2);
}

#[test]
fn blockquote_prefixes_every_line() {
    let out = sv("> a\n> b\n");
    assert!(out.contains("&gt; "), "{out}");
    assert!(out.matches("&gt; ").count() >= 2);
}

#[test]
fn link_parts_carry_role_classes() {
    let out = sv("[t](/u \"ti\")\n");
    assert!(out.contains("editor-sv__marker--bracket"), "{out}");
    assert!(out.contains("editor-sv__marker--paren"));
    assert!(out.contains("editor-sv__marker--link"));
    assert!(out.contains("editor-sv__marker--title"));
}

#[test]
fn code_fence_info_class() {
    let out = sv("```js\nx\n```\n");
    assert!(out.contains("editor-sv__marker--info"), "{out}");
}

#[test]
fn empty_document_renders_caret_plus_sentinel() {
    let out = sv("");
    assert!(out.contains("<wbr>"), "{out}");
    assert!(out.ends_with(NEWLINE_SV));
}

#[test]
fn caret_renders_as_wbr() {
    let out = sv("pa\u{2038}ra\n");
    assert!(out.contains("pa<wbr>ra"), "{out}");
    assert!(!out.contains('\u{2038}'));
}
