use typed_arena::Arena;

use crate::Engine;

mod api;
mod block_dom;
mod caret;
mod commonmark;
mod extensions;
mod ial;
mod json_render;
mod paste;
mod structural;
mod sv;

pub(crate) fn format(md: &str) -> String {
    Engine::new().format("", md)
}

pub(crate) fn html(md: &str) -> String {
    Engine::new().markdown("", md)
}

/// Formatting a formatted document must be a fixed point.
pub(crate) fn assert_format_idempotent(md: &str) {
    let engine = Engine::new();
    let once = engine.format("", md);
    let twice = engine.format("", &once);
    pretty_assertions::assert_eq!(once, twice, "format not idempotent for {md:?}");
}

/// An engine with every editor extension switched on.
pub(crate) fn editor_engine() -> Engine {
    let mut engine = Engine::new();
    engine.parse_options.mark = true;
    engine.parse_options.sup = true;
    engine.parse_options.sub = true;
    engine.parse_options.tag = true;
    engine.parse_options.block_ref = true;
    engine.parse_options.file_annotation_ref = true;
    engine.parse_options.super_block = true;
    engine.parse_options.git_conflict = true;
    engine.parse_options.kramdown_block_ial = true;
    engine.parse_options.kramdown_span_ial = true;
    engine.render_options.kramdown_block_ial = true;
    engine.render_options.kramdown_span_ial = true;
    engine
}

#[test]
fn walk_visits_every_node_once() {
    let arena = Arena::new();
    let root = crate::parser::parse_document(
        &arena,
        "# h\n\npara *em* text\n",
        &crate::parser::ParseOptions::default(),
    );
    let mut entered = 0;
    let mut left = 0;
    crate::nodes::walk(root, &mut |_, entering| {
        if entering {
            entered += 1;
        } else {
            left += 1;
        }
        crate::nodes::WalkStatus::Continue
    });
    assert_eq!(entered, left);
    assert!(entered > 5);
}
