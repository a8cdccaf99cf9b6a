use pretty_assertions::assert_eq;

use super::{assert_format_idempotent, editor_engine, format, html};
use crate::Engine;

#[test]
fn mark_spans() {
    let engine = editor_engine();
    assert_eq!(engine.format("", "==hi==\n"), "==hi==\n");
    assert!(engine.markdown("", "a ==hi== b\n").contains("<mark>hi</mark>"));
}

#[test]
fn sup_and_sub() {
    let engine = editor_engine();
    assert!(engine.markdown("", "e = mc^2^\n").contains("<sup>2</sup>"));
    assert!(engine.markdown("", "H~2~O\n").contains("<sub>2</sub>"));
    assert_eq!(engine.format("", "x^2^\n"), "x^2^\n");
    assert_eq!(engine.format("", "H~2~O\n"), "H~2~O\n");
}

#[test]
fn sup_rejects_whitespace() {
    let engine = editor_engine();
    assert!(!engine.markdown("", "a ^b c^ d\n").contains("<sup>"));
}

#[test]
fn tags() {
    let engine = editor_engine();
    assert_eq!(engine.format("", "a #tag# b\n"), "a #tag# b\n");
}

#[test]
fn inline_math() {
    let out = html("Euler: $e^{i\\pi}+1=0$ wow\n");
    assert!(out.contains("<span class=\"language-math\">"), "{out}");

    // digits right after the opening dollar read as money, not math
    let out = html("$1 and $2\n");
    assert!(!out.contains("language-math"));
}

#[test]
fn math_blocks() {
    let md = "$$\nx^2 + y^2\n$$\n";
    assert_eq!(format(md), md);
    assert!(html(md).contains("<div class=\"language-math\">x^2 + y^2</div>"));
}

#[test]
fn inline_math_block_promotion() {
    let md = "before $$x+y$$ after\n";
    let out = html(md);
    assert!(out.contains("language-math"), "{out}");
}

#[test]
fn block_refs() {
    let engine = editor_engine();
    let md = "((20210808180117-6v0mkxr \"anchor\"))\n";
    assert_eq!(engine.format("", md), md);
    let dynamic = "((20210808180117-6v0mkxr 'dyn'))\n";
    assert_eq!(engine.format("", dynamic), dynamic);
    let bare = "((20210808180117-6v0mkxr))\n";
    assert_eq!(engine.format("", bare), bare);

    let out = engine.markdown("", md);
    assert!(out.contains("class=\"block-ref\""));
    assert!(out.contains("data-id=\"20210808180117-6v0mkxr\""));
    assert!(out.contains(">anchor<"));
}

#[test]
fn block_ref_invalid_id_stays_text() {
    let engine = editor_engine();
    assert_eq!(engine.format("", "((nope))\n"), "((nope))\n");
    assert!(!engine.markdown("", "((nope))\n").contains("block-ref"));
}

#[test]
fn file_annotation_refs() {
    let engine = editor_engine();
    let md = "<<20210808180117-6v0mkxr \"p. 42\">>\n";
    assert_eq!(engine.format("", md), md);
    assert!(engine
        .markdown("", md)
        .contains("class=\"file-annotation-ref\""));
}

#[test]
fn super_blocks() {
    let engine = editor_engine();
    let md = "{{{row\na\n\nb\n\n}}}\n";
    assert_eq!(engine.format("", md), md);

    let reformatted = engine.format("", "{{{col\nonly one\n}}}\n");
    assert!(reformatted.starts_with("{{{col\n"));
    assert!(reformatted.contains("only one"));
    assert!(reformatted.trim_end().ends_with("}}}"));
}

#[test]
fn git_conflicts() {
    let engine = editor_engine();
    let md = "<<<<<<< HEAD\nours\n=======\ntheirs\n>>>>>>> branch\n";
    assert_eq!(engine.format("", md), md);
}

#[test]
fn yaml_front_matter() {
    let md = "---\ntitle: x\nlayout: post\n---\n\nBody\n";
    assert_eq!(format(md), md);
    // front matter never reaches HTML output
    assert!(!html(md).contains("title: x"));
}

#[test]
fn front_matter_only_opens_documents() {
    let md = "para\n\n---\ntitle: x\n---\n";
    // mid-document it is a thematic break plus paragraphs
    assert!(html(md).contains("<hr />"));
}

#[test]
fn toc_placeholder() {
    let mut engine = Engine::new();
    engine.parse_options.toc = true;
    engine.render_options.toc = true;
    let out = engine.markdown("", "[toc]\n\n# A\n\n## B\n");
    assert!(out.contains("toc-div"), "{out}");
    assert!(out.contains("#a"));
    assert_eq!(engine.format("", "[toc]\n\n# A\n"), "[toc]\n\n# A\n");
}

#[test]
fn heading_ids() {
    let md = "# Hello {#hid}\n";
    assert_eq!(format(md), md);
    assert!(html(md).contains("<h1 id=\"hid\">"));
}

#[test]
fn emoji_aliases() {
    let out = html("I :heart: it\n");
    assert!(out.contains('\u{2764}'), "{out}");
    assert_format_idempotent("I :heart: it\n");
    // unknown aliases stay literal
    assert!(html(":not_an_emoji_xyz:\n").contains(":not_an_emoji_xyz:"));
}

#[test]
fn custom_emoji_images() {
    let mut engine = Engine::new();
    engine
        .parse_options
        .alias_emoji
        .insert("logo".to_string(), "${imgStaticSite}/logo.png".to_string());
    let out = engine.markdown("", ":logo:\n");
    assert!(out.contains("class=\"emoji\""), "{out}");
    assert!(out.contains("/logo.png"));
}

#[test]
fn term_typo_fixing() {
    assert!(html("on github today\n").contains("GitHub"));
}

#[test]
fn cjk_auto_space() {
    assert!(html("中文English\n").contains("中文 English"));
}

#[test]
fn underline_and_kbd_round_trip() {
    let engine = editor_engine();
    let md = engine.html2markdown("<p>press <kbd>Ctrl</kbd> and <u>this</u></p>").unwrap();
    assert!(md.contains("<kbd>Ctrl</kbd>"), "{md}");
    assert!(md.contains("<u>this</u>"));
}

#[test]
fn block_query_embed() {
    let mut engine = editor_engine();
    engine.parse_options.block_ref = true;
    let md = "{{SELECT * FROM blocks}}\n";
    assert_eq!(engine.format("", md), md);
}
