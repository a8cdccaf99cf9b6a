use pretty_assertions::assert_eq;

use super::editor_engine;

#[test]
fn paragraph_round_trip() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("Hello **world**\n");
    assert!(dom.contains("data-type=\"NodeParagraph\""), "{dom}");
    assert!(dom.contains("<span data-type=\"strong\">world</span>"));
    assert!(dom.contains("contenteditable=\"true\""));
    assert!(dom.contains("protyle-attr"));

    let md = engine.block_dom2_md(&dom);
    assert!(md.starts_with("Hello **world**"), "{md}");
    assert!(md.contains("{: id=\""), "ids must persist: {md}");
}

#[test]
fn ids_are_stable_across_the_round_trip() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("stable\n");
    let id = extract_node_id(&dom);
    let md = engine.block_dom2_md(&dom);
    assert!(md.contains(&id), "{md}");
    let dom2 = engine.md2_block_dom(&md);
    assert!(dom2.contains(&id), "{dom2}");
}

pub(crate) fn extract_node_id(dom: &str) -> String {
    let start = dom.find("data-node-id=\"").expect("id attr") + "data-node-id=\"".len();
    let end = dom[start..].find('"').unwrap() + start;
    dom[start..end].to_string()
}

#[test]
fn heading_block_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("## Second\n");
    assert!(dom.contains("data-type=\"NodeHeading\""));
    assert!(dom.contains("data-subtype=\"h2\""));
    let md = engine.block_dom2_md(&dom);
    assert!(md.starts_with("## Second"), "{md}");
}

#[test]
fn list_block_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("* a\n* b\n");
    assert!(dom.contains("data-type=\"NodeList\""));
    assert!(dom.contains("data-subtype=\"u\""));
    assert_eq!(dom.matches("data-type=\"NodeListItem\"").count(), 2);

    let md = engine.block_dom2_md(&dom);
    assert!(md.contains("* a"), "{md}");
    assert!(md.contains("* b"));
}

#[test]
fn task_list_block_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("* [x] done\n* [ ] todo\n");
    assert!(dom.contains("data-subtype=\"t\""), "{dom}");
    assert_eq!(dom.matches("protyle-task--done").count(), 1);

    let md = engine.block_dom2_md(&dom);
    assert!(md.contains("[X] done") || md.contains("[x] done"), "{md}");
    assert!(md.contains("[ ] todo"));
}

#[test]
fn code_block_dom_uses_data_content() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("```rust\nfn x() {}\n```\n");
    assert!(dom.contains("data-type=\"NodeCodeBlock\""));
    assert!(dom.contains("data-subtype=\"rust\""));
    assert!(dom.contains("data-content=\"fn x() {}"), "{dom}");

    let md = engine.block_dom2_md(&dom);
    assert!(md.contains("```rust\nfn x() {}\n```"), "{md}");
}

#[test]
fn math_block_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("$$\nx^2\n$$\n");
    assert!(dom.contains("data-type=\"NodeMathBlock\""));
    assert!(dom.contains("data-content=\"x^2\""));
    let md = engine.block_dom2_md(&dom);
    assert!(md.contains("$$\nx^2\n$$"), "{md}");
}

#[test]
fn blockquote_block_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("> quoted\n");
    assert!(dom.contains("data-type=\"NodeBlockquote\""));
    assert!(dom.contains("data-type=\"NodeParagraph\""));
    let md = engine.block_dom2_md(&dom);
    assert!(md.contains("> quoted"), "{md}");
}

#[test]
fn table_block_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("| a | b |\n| :-- | --: |\n| c | d |\n");
    assert!(dom.contains("data-type=\"NodeTable\""));
    assert!(dom.contains("<th align=\"left\">a</th>"), "{dom}");
    assert!(dom.contains("<td align=\"right\">d</td>"));

    let md = engine.block_dom2_md(&dom);
    assert!(md.contains("| a | b |"), "{md}");
    assert!(md.contains("| :-- | --: |"));
}

#[test]
fn super_block_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("{{{row\na\n\nb\n\n}}}\n");
    assert!(dom.contains("data-type=\"NodeSuperBlock\""), "{dom}");
    assert!(dom.contains("data-sb-layout=\"row\""));
    assert_eq!(dom.matches("data-type=\"NodeParagraph\"").count(), 2);
}

#[test]
fn inline_code_span_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("a `code` b\n");
    assert!(dom.contains("<span data-type=\"code\">code</span>"), "{dom}");
}

#[test]
fn link_span_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("[text](/url \"t\")\n");
    assert!(dom.contains("data-type=\"a\""), "{dom}");
    assert!(dom.contains("data-href=\"/url\""));
    assert!(dom.contains("data-title=\"t\""));

    let md = engine.block_dom2_md(&dom);
    assert!(md.contains("[text](/url \"t\")"), "{md}");
}

#[test]
fn block_ref_span_dom() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("((20210808180117-6v0mkxr \"anchor\"))\n");
    assert!(dom.contains("data-type=\"block-ref\""), "{dom}");
    assert!(dom.contains("data-subtype=\"s\""));
    let md = engine.block_dom2_md(&dom);
    assert!(md.contains("((20210808180117-6v0mkxr \"anchor\"))"), "{md}");
}

#[test]
fn bookmark_and_custom_attrs_round_trip() {
    let engine = editor_engine();
    let dom = "<div data-node-id=\"20210808180117-6v0mkxr\" data-type=\"NodeParagraph\" bookmark=\"important\" custom-x=\"y\" class=\"p\"><div contenteditable=\"true\" spellcheck=\"false\">text</div><div class=\"protyle-attr\" contenteditable=\"false\"></div></div>";
    let md = engine.block_dom2_md(dom);
    assert!(md.contains("bookmark=\"important\""), "{md}");
    assert!(md.contains("custom-x=\"y\""));

    let dom2 = engine.md2_block_dom(&md);
    assert!(dom2.contains("bookmark=\"important\""), "{dom2}");
    assert!(dom2.contains("custom-x=\"y\""));
}

#[test]
fn std_md_has_no_ial_markers() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("# A\n\npara\n\n* l\n");
    let std = engine.block_dom2_std_md(&dom);
    assert!(!std.contains("{: "), "IAL leaked: {std}");
    assert!(std.contains("# A"));
}

#[test]
fn block_dom2_text_extracts_content() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("Hello **bold** world\n");
    let text = engine.block_dom2_content(&dom);
    assert_eq!(text, "Hello bold world");
    assert_eq!(engine.block_dom2_text_len(&dom), "Hello bold world".len());
}

#[test]
fn spin_preserves_ids_and_content() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("spin me\n");
    let id = extract_node_id(&dom);
    let spun = engine.spin_block_dom(&dom);
    assert!(spun.contains(&id), "{spun}");
    assert!(spun.contains("spin me"));
}

#[test]
fn nested_mark_merge_in_dom_parse() {
    let engine = editor_engine();
    // two same-type spans back to back merge, with a zwsp separator on render
    let dom = "<div data-node-id=\"20210808180117-6v0mkxr\" data-type=\"NodeParagraph\" class=\"p\"><div contenteditable=\"true\" spellcheck=\"false\"><span data-type=\"strong\">a</span><span data-type=\"strong\">b</span></div><div class=\"protyle-attr\" contenteditable=\"false\"></div></div>";
    let md = engine.block_dom2_md(dom);
    assert!(md.contains("**a**"), "{md}");
    assert!(md.contains("**b**"));
}
