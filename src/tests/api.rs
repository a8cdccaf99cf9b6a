use pretty_assertions::assert_eq;

use rustc_hash::FxHashMap;
use typed_arena::Arena;

use crate::nodes::WalkStatus;
use crate::{word_count, Engine, Error};

#[test]
fn engine_surface() {
    let engine = Engine::new();
    assert!(engine.parse_options.gfm_table);
    assert!(engine.parse_options.footnotes);
    assert!(engine.render_options.soft_break_to_hard_break);

    let html = engine.markdown("doc-1", "**hi**\n");
    assert!(html.contains("<strong>hi</strong>"));
}

#[test]
fn is_valid_link_dest() {
    let engine = Engine::new();
    assert!(engine.is_valid_link_dest("https://example.com/x"));
    assert!(!engine.is_valid_link_dest("not a link at all"));
    assert!(!engine.is_valid_link_dest("one https://e.com two\n\nmore\n"));
}

#[test]
fn space_helper() {
    assert_eq!(Engine::new().space("abc中文def"), "abc 中文 def");
}

#[test]
fn word_counts() {
    assert_eq!(word_count("Hello world"), (10, 2));
    assert_eq!(word_count("Hello 世界"), (7, 3));
    assert_eq!(word_count(""), (0, 0));
}

#[test]
fn terms_table() {
    let mut engine = Engine::new();
    assert!(engine.get_terms().contains_key("github"));
    let mut extra = FxHashMap::default();
    extra.insert("vuejs".to_string(), "Vue.js".to_string());
    engine.put_terms(extra);
    assert!(engine.markdown("", "using vuejs here\n").contains("Vue.js"));
}

#[test]
fn emoji_table_round_trip() {
    let mut engine = Engine::new();
    let mut m = FxHashMap::default();
    m.insert("testalias_xq".to_string(), "\u{1F680}".to_string());
    engine.put_emojis(m);
    assert_eq!(
        engine.get_emojis().get("testalias_xq").map(String::as_str),
        Some("\u{1F680}")
    );
    assert!(engine.markdown("", ":testalias_xq:\n").contains("\u{1F680}"));

    assert_eq!(engine.remove_emoji("go \u{1F680} now"), "go  now");
}

#[test]
fn format_node_sync_formats_single_nodes() {
    let arena = Arena::new();
    let po = crate::parser::ParseOptions::default();
    let root = crate::parser::parse_document(&arena, "a **b** c\n", &po);
    let para = root.first_child().unwrap();
    let out = crate::format_node_sync(para, &po, &crate::parser::RenderOptions::default())
        .unwrap();
    assert_eq!(out, "a **b** c");
}

#[test]
fn export_md_node_sync_resolves_refs() {
    let arena = Arena::new();
    let mut po = crate::parser::ParseOptions::default();
    po.block_ref = true;
    let root = crate::parser::parse_document(
        &arena,
        "see ((20210808180117-6v0mkxr \"anchor\")) here\n",
        &po,
    );
    let para = root.first_child().unwrap();
    let out =
        crate::export_md_node_sync(para, &po, &crate::parser::RenderOptions::default()).unwrap();
    assert_eq!(out, "see anchor here");
}

#[test]
fn unknown_renderer_family_errors() {
    let mut engine = Engine::new();
    let err = engine
        .register_renderer("NoSuchFamily", crate::nodes::NodeKind::Paragraph, |_, _| {
            (String::new(), WalkStatus::Continue)
        })
        .unwrap_err();
    assert!(matches!(err, Error::UnknownRenderer(_)));
}

#[test]
fn extension_hooks_override_output() {
    let mut engine = Engine::new();
    engine
        .register_renderer("Md2HTML", crate::nodes::NodeKind::ThematicBreak, |_, entering| {
            if entering {
                ("<hr class=\"custom\" />".to_string(), WalkStatus::Continue)
            } else {
                (String::new(), WalkStatus::Continue)
            }
        })
        .unwrap();
    let out = engine.markdown("", "---\n");
    assert!(out.contains("<hr class=\"custom\" />"), "{out}");
    assert!(!out.contains("<hr />\n"));
}

#[test]
fn text_bundle_rewrites_assets() {
    let engine = Engine::new();
    let (md, originals) = engine.text_bundle(
        "",
        "![a](https://cdn.example.com/img/pic.png)\n",
        vec!["https://cdn.example.com/".to_string()],
    );
    assert!(md.contains("assets/pic.png"), "{md}");
    assert_eq!(originals, vec!["https://cdn.example.com/img/pic.png"]);
}

#[test]
fn sanitize_drops_dangerous_urls() {
    let mut engine = Engine::new();
    engine.render_options.sanitize = true;
    let out = engine.markdown("", "[x](javascript:alert(1))\n");
    assert!(!out.contains("javascript:"), "{out}");
}

#[test]
fn link_base_and_prefix() {
    let mut engine = Engine::new();
    engine.render_options.link_base = "https://base/".to_string();
    let out = engine.markdown("", "[x](rel/path)\n");
    assert!(out.contains("href=\"https://base/rel/path\""), "{out}");
    // absolute URLs are untouched
    let out = engine.markdown("", "[x](https://abs/p)\n");
    assert!(out.contains("href=\"https://abs/p\""));
}

#[test]
fn image_lazy_loading() {
    let mut engine = Engine::new();
    engine.render_options.image_lazy_loading = "data-src".to_string();
    let out = engine.markdown("", "![a](/i.png)\n");
    assert!(out.contains("data-src=\"/i.png\""), "{out}");
    assert!(out.contains("src=\"\""));
}

#[test]
fn preview_renders_like_html() {
    let engine = Engine::new();
    let preview = engine.protyle_preview("# T\n");
    assert!(preview.contains("<h1"), "{preview}");
}
