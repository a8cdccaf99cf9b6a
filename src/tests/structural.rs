use pretty_assertions::assert_eq;

use super::block_dom::extract_node_id;
use super::editor_engine;

fn para(id: &str, text: &str) -> String {
    format!(
        "<div data-node-id=\"{id}\" data-type=\"NodeParagraph\" class=\"p\"><div contenteditable=\"true\" spellcheck=\"false\">{text}</div><div class=\"protyle-attr\" contenteditable=\"false\"></div></div>"
    )
}

#[test]
fn cancel_super_block_lifts_children() {
    let engine = editor_engine();
    let dom = format!(
        "<div data-node-id=\"20210808180117-aaaaaaa\" data-type=\"NodeSuperBlock\" data-sb-layout=\"col\" class=\"sb\">{}{}<div class=\"protyle-attr\" contenteditable=\"false\"></div></div>",
        para("20210808180117-bbbbbbb", "first"),
        para("20210808180117-ccccccc", "second"),
    );
    let out = engine.cancel_super_block(&dom);
    assert!(!out.contains("NodeSuperBlock"), "{out}");
    assert!(out.contains("20210808180117-bbbbbbb"));
    assert!(out.contains("20210808180117-ccccccc"));
    assert!(out.contains("first"));
    assert!(out.contains("second"));
}

#[test]
fn cancel_blockquote_keeps_content() {
    let engine = editor_engine();
    let dom = format!(
        "<div data-node-id=\"20210808180117-aaaaaaa\" data-type=\"NodeBlockquote\" class=\"bq\">{}<div class=\"protyle-attr\" contenteditable=\"false\"></div></div>",
        para("20210808180117-bbbbbbb", "inner")
    );
    let out = engine.cancel_blockquote(&dom);
    assert!(!out.contains("NodeBlockquote"), "{out}");
    assert!(out.contains("inner"));
    assert!(out.contains("20210808180117-bbbbbbb"));
}

#[test]
fn cancel_list_unwraps_items() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("* one\n* two\n");
    let out = engine.cancel_list(&dom);
    assert!(!out.contains("NodeList"), "{out}");
    assert!(out.contains("one"));
    assert!(out.contains("two"));
}

#[test]
fn blocks2ps_and_back() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("## Heading\n");
    let id = extract_node_id(&dom);

    let ps = engine.blocks2ps(&dom);
    assert!(ps.contains("NodeParagraph"), "{ps}");
    assert!(!ps.contains("NodeHeading"));
    assert!(ps.contains(&id), "id lost: {ps}");

    let hs = engine.blocks2hs(&ps, 3);
    assert!(hs.contains("data-subtype=\"h3\""), "{hs}");
    assert!(hs.contains(&id));
}

#[test]
fn ul2tl_reads_task_prefixes() {
    let engine = editor_engine();
    let dom = format!(
        "<div data-node-id=\"20210808180117-aaaaaaa\" data-type=\"NodeList\" data-subtype=\"u\" data-marker=\"*\" class=\"list\"><div data-node-id=\"20210808180117-bbbbbbb\" data-type=\"NodeListItem\" data-subtype=\"u\" data-marker=\"*\" class=\"li\">{}<div class=\"protyle-attr\" contenteditable=\"false\"></div></div><div data-node-id=\"20210808180117-ccccccc\" data-type=\"NodeListItem\" data-subtype=\"u\" data-marker=\"*\" class=\"li\">{}<div class=\"protyle-attr\" contenteditable=\"false\"></div></div><div class=\"protyle-attr\" contenteditable=\"false\"></div></div>",
        para("20210808180117-ddddddd", "[x] done"),
        para("20210808180117-eeeeeee", "[ ] open"),
    );
    let out = engine.ul2tl(&dom);
    assert!(out.contains("data-subtype=\"t\""), "{out}");
    assert_eq!(out.matches("protyle-task--done").count(), 1, "{out}");
}

#[test]
fn ol2tl_matches_ul2tl() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("1. a\n2. b\n");
    let a = engine.ol2tl(&dom);
    let b = engine.ul2tl(&dom);
    assert_eq!(a, b);
}

#[test]
fn list_type_conversions() {
    let engine = editor_engine();
    let ul = engine.md2_block_dom("* a\n* b\n");

    let ol = engine.ul2ol(&ul);
    assert!(ol.contains("data-subtype=\"o\""), "{ol}");
    assert!(ol.contains("data-marker=\"1.\""));
    assert!(ol.contains("data-marker=\"2.\""));

    let back = engine.ol2ul(&ol);
    assert!(back.contains("data-subtype=\"u\""), "{back}");

    let tl = engine.ul2tl(&ul);
    assert!(tl.contains("data-subtype=\"t\""));
    let from_tl = engine.tl2ol(&tl);
    assert!(from_tl.contains("data-subtype=\"o\""));
    assert!(!from_tl.contains("protyle-task--done"));
    let from_tl2 = engine.tl2ul(&tl);
    assert!(from_tl2.contains("data-subtype=\"u\""));
}

#[test]
fn ids_survive_every_structural_op() {
    let engine = editor_engine();
    let dom = engine.md2_block_dom("* a\n* b\n");
    let id = extract_node_id(&dom);
    for out in [
        engine.ul2ol(&dom),
        engine.ul2tl(&dom),
        engine.blocks2ps(&dom),
    ] {
        assert!(out.contains(&id), "id lost in {out}");
    }
}
