//! blockdown is a structured Markdown engine for block-based WYSIWYG
//! editors. One in-memory tree backs four transformations: Markdown →
//! AST, AST → Markdown, editor DOM → AST and AST → editor DOM, with a
//! caret sentinel threaded through every one of them so the editor's
//! cursor survives full round trips.
//!
//! ```
//! use blockdown::Engine;
//!
//! let engine = Engine::new();
//! let html = engine.markdown("", "Hello **world**\n");
//! assert!(html.contains("<strong>world</strong>"));
//! ```

pub mod arena_tree;
mod character_set;
mod ctype;
pub mod dom;
pub mod editor;
mod entity;
pub mod nodes;
pub mod parser;
pub mod render;
mod scanners;
mod strings;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use thiserror::Error;
use typed_arena::Arena;

use nodes::{AstNode, ListType, NodeKind, NodeValue};
use parser::{ParseOptions, RenderOptions};
use render::ExtRendererFn;

pub use nodes::{new_node_id, Ast, NodeList, NodeTextMark};
pub use parser::parse_document;

/// Engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The placeholder substituted with the configured emoji site in image
/// aliases.
pub const EMOJI_SITE_PLACEHOLDER: &str = "${imgStaticSite}";

/// Errors the engine can surface. A normal render never errors; these
/// come from the synchronous node helpers and the hook registry.
#[derive(Debug, Error)]
pub enum Error {
    /// A parser or renderer invariant failed inside a synchronous
    /// helper; the panic was contained.
    #[error("PANIC RECOVERED: {0}")]
    ParseRecovered(String),

    /// An extension hook was registered for an unknown renderer family.
    #[error("unknown renderer family [{0}]")]
    UnknownRenderer(String),

    /// The reverse-parser accepted the HTML but found no parseable root.
    #[error("no parseable root in input HTML")]
    MalformedInput,

    /// Optional syntax highlighting is not available; output fell back
    /// to plain emission.
    #[error("syntax highlighter unavailable")]
    HighlighterUnavailable,
}

/// The process-wide emoji alias table, shared by every engine.
static EMOJI_ALIASES: Lazy<Mutex<FxHashMap<String, String>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

pub(crate) fn emoji_table() -> &'static Mutex<FxHashMap<String, String>> {
    &EMOJI_ALIASES
}

static FORMAT_NODE_LOCK: Mutex<()> = Mutex::new(());
static EXPORT_MD_NODE_LOCK: Mutex<()> = Mutex::new(());

/// Formats a single node as Markdown. Serialized process-wide; panics
/// inside the renderer are contained and surfaced as
/// [`Error::ParseRecovered`].
pub fn format_node_sync<'a>(
    node: &'a AstNode<'a>,
    _parse_options: &ParseOptions,
    render_options: &RenderOptions,
) -> Result<String, Error> {
    let _guard = FORMAT_NODE_LOCK.lock().unwrap();
    catch_unwind(AssertUnwindSafe(|| {
        let mut renderer = render::format::FormatRenderer::new(render_options);
        nodes::walk(node, &mut |n, entering| renderer.render_node(n, entering));
        renderer.core.take_output().trim().to_string()
    }))
    .map_err(describe_panic)
}

/// Exports a single node as Markdown, same discipline as
/// [`format_node_sync`].
pub fn export_md_node_sync<'a>(
    node: &'a AstNode<'a>,
    _parse_options: &ParseOptions,
    render_options: &RenderOptions,
) -> Result<String, Error> {
    let _guard = EXPORT_MD_NODE_LOCK.lock().unwrap();
    catch_unwind(AssertUnwindSafe(|| {
        let mut renderer = render::export_md::ExportMdRenderer::new(render_options);
        renderer.render(node).trim().to_string()
    }))
    .map_err(describe_panic)
}

fn describe_panic(e: Box<dyn std::any::Any + Send>) -> Error {
    let msg = if let Some(s) = e.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = e.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    Error::ParseRecovered(msg)
}

/// The engine: a pair of option sets plus per-family extension hooks.
/// One engine serves one tree at a time; engines are cheap and
/// independent.
pub struct Engine {
    pub parse_options: ParseOptions,
    pub render_options: RenderOptions,

    md2_html_ext: FxHashMap<NodeKind, ExtRendererFn>,
    md2_block_dom_ext: FxHashMap<NodeKind, ExtRendererFn>,
    md2_sv_dom_ext: FxHashMap<NodeKind, ExtRendererFn>,
    html2md_ext: FxHashMap<NodeKind, ExtRendererFn>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// A new engine with the stock defaults: GFM, footnotes, heading
    /// IDs, emoji and YAML front matter on; soft-break conversion,
    /// syntax-highlight hints, CJK autospacing and term fixing on.
    pub fn new() -> Engine {
        Engine {
            parse_options: ParseOptions::default(),
            render_options: RenderOptions::default(),
            md2_html_ext: FxHashMap::default(),
            md2_block_dom_ext: FxHashMap::default(),
            md2_sv_dom_ext: FxHashMap::default(),
            html2md_ext: FxHashMap::default(),
        }
    }

    /// Registers an extension hook for one renderer family.
    pub fn register_renderer(
        &mut self,
        family: &str,
        kind: NodeKind,
        func: ExtRendererFn,
    ) -> Result<(), Error> {
        let map = match family {
            "Md2HTML" => &mut self.md2_html_ext,
            "Md2BlockDOM" => &mut self.md2_block_dom_ext,
            "Md2EditorSVDOM" => &mut self.md2_sv_dom_ext,
            "HTML2Md" => &mut self.html2md_ext,
            _ => return Err(Error::UnknownRenderer(family.to_string())),
        };
        map.insert(kind, func);
        Ok(())
    }

    /// Renders Markdown to standard HTML. `name` only labels the text
    /// for diagnostics.
    pub fn markdown(&self, name: &str, markdown: &str) -> String {
        let arena = Arena::new();
        let tree = parser::parse(&arena, name, markdown, &self.parse_options);
        let mut renderer = render::html::HtmlRenderer::new(&self.render_options);
        renderer.core.ext_renderers = self.md2_html_ext.clone();
        renderer.render(tree.root)
    }

    /// Formats (canonicalizes) Markdown.
    pub fn format(&self, name: &str, markdown: &str) -> String {
        let arena = Arena::new();
        let tree = parser::parse(&arena, name, markdown, &self.parse_options);
        let mut renderer = render::format::FormatRenderer::new(&self.render_options);
        renderer.render(tree.root)
    }

    /// Renders Markdown to JSON.
    pub fn render_json(&self, markdown: &str) -> String {
        let arena = Arena::new();
        let root = parser::parse_document(&arena, markdown, &self.parse_options);
        render::json::render_json(root)
    }

    /// TextBundle export: Markdown with matching asset links rewritten,
    /// plus the original destinations.
    pub fn text_bundle(
        &self,
        name: &str,
        markdown: &str,
        link_prefixes: Vec<String>,
    ) -> (String, Vec<String>) {
        let _ = name;
        let arena = Arena::new();
        let root = parser::parse_document(&arena, markdown, &self.parse_options);
        let mut renderer =
            render::textbundle::TextBundleRenderer::new(&self.render_options, link_prefixes);
        renderer.render(root)
    }

    /// Read-only preview HTML.
    pub fn protyle_preview(&self, markdown: &str) -> String {
        let arena = Arena::new();
        let root = parser::parse_document(&arena, markdown, &self.parse_options);
        let mut renderer = render::preview::PreviewRenderer::new(&self.render_options);
        renderer.render(root)
    }

    /// Converts pasted HTML to Markdown.
    pub fn html2markdown(&self, html_str: &str) -> Result<String, Error> {
        let arena = Arena::new();
        let root = dom::html::parse_html(&arena, &self.parse_options, html_str);
        if root.first_child().is_none() {
            if html_str.trim().is_empty() {
                return Ok(String::new());
            }
            return Err(Error::MalformedInput);
        }
        let mut renderer = render::format::FormatRenderer::new(&self.render_options);
        renderer.core.ext_renderers = self.html2md_ext.clone();
        Ok(renderer.render(root))
    }

    /// The plain text of an HTML fragment.
    pub fn html2text(&self, html_str: &str) -> String {
        let arena = Arena::new();
        let root = dom::html::parse_html(&arena, &self.parse_options, html_str);
        nodes::text_content(root).trim().to_string()
    }

    fn editor_parse_options(&self) -> ParseOptions {
        let mut po = self.parse_options.clone();
        po.protyle_wysiwyg = true;
        po.kramdown_block_ial = true;
        po.kramdown_span_ial = true;
        po
    }

    fn editor_render_options(&self) -> RenderOptions {
        let mut ro = self.render_options.clone();
        ro.protyle_wysiwyg = true;
        ro.kramdown_block_ial = true;
        ro.kramdown_span_ial = true;
        ro
    }

    /// Renders Markdown into editor block DOM.
    pub fn md2_block_dom(&self, markdown: &str) -> String {
        if editor::is_caret_blank(markdown) {
            let caret = if markdown.contains(editor::CARET) {
                editor::FRONT_END_CARET
            } else {
                ""
            };
            return format!(
                "<div data-node-id=\"{}\" data-type=\"NodeParagraph\" class=\"p\"><div contenteditable=\"true\" spellcheck=\"false\">{caret}</div><div class=\"protyle-attr\" contenteditable=\"false\">{}</div></div>",
                new_node_id(),
                editor::ZWSP
            );
        }

        let po = self.editor_parse_options();
        let ro = self.editor_render_options();
        let arena = Arena::new();
        let root = parser::parse_document(&arena, markdown, &po);
        let mut renderer = render::block_dom::BlockDomRenderer::new(&ro);
        renderer.core.ext_renderers = self.md2_block_dom_ext.clone();
        renderer.render(root)
    }

    /// Renders Markdown into classic WYSIWYG editor DOM; same
    /// structural family as the block DOM.
    pub fn md2_editor_dom(&self, markdown: &str) -> String {
        let mut po = self.editor_parse_options();
        po.editor_wysiwyg = true;
        let mut ro = self.editor_render_options();
        ro.editor_wysiwyg = true;
        let arena = Arena::new();
        let root = parser::parse_document(&arena, markdown, &po);
        let mut renderer = render::block_dom::BlockDomRenderer::new(&ro);
        renderer.render(root)
    }

    /// Renders Markdown into instant-render editor DOM.
    pub fn md2_editor_ir_dom(&self, markdown: &str) -> String {
        let mut po = self.editor_parse_options();
        po.editor_ir = true;
        let mut ro = self.editor_render_options();
        ro.editor_ir = true;
        let arena = Arena::new();
        let root = parser::parse_document(&arena, markdown, &po);
        let mut renderer = render::block_dom::BlockDomRenderer::new(&ro);
        renderer.render(root)
    }

    /// Converts pasted HTML straight to editor block DOM.
    pub fn html2_block_dom(&self, html_str: &str) -> String {
        match self.html2markdown(html_str) {
            Ok(md) => self.md2_block_dom(&md),
            Err(_) => String::new(),
        }
    }

    /// Renders Markdown into split-view editor DOM.
    pub fn md2_editor_sv_dom(&self, markdown: &str) -> String {
        let mut po = self.parse_options.clone();
        po.editor_sv = true;
        let mut ro = self.render_options.clone();
        ro.editor_sv = true;
        let arena = Arena::new();
        let root = parser::parse_document(&arena, markdown, &po);
        let mut renderer = render::sv::EditorSvRenderer::new(&ro);
        renderer.core.ext_renderers = self.md2_sv_dom_ext.clone();
        renderer.render(root)
    }

    /// Converts editor block DOM to kramdown (IALs included).
    pub fn block_dom2_md(&self, html_str: &str) -> String {
        let po = self.editor_parse_options();
        let ro = self.editor_render_options();
        let arena = Arena::new();
        let root = dom::block_dom::parse_block_dom(&arena, &po, html_str);
        let mut renderer = render::format::FormatRenderer::new(&ro);
        renderer.render(root)
    }

    /// Converts editor block DOM to standard Markdown: no IALs, editor
    /// references resolved to text.
    pub fn block_dom2_std_md(&self, html_str: &str) -> String {
        let po = self.editor_parse_options();
        let mut ro = self.render_options.clone();
        ro.kramdown_block_ial = false;
        ro.kramdown_span_ial = false;
        let arena = Arena::new();
        let root = dom::block_dom::parse_block_dom(&arena, &po, html_str);
        let mut renderer = render::export_md::ExportMdRenderer::new(&ro);
        renderer.render(root)
    }

    /// Converts editor block DOM to standard HTML.
    pub fn block_dom2_html(&self, html_str: &str) -> String {
        let po = self.editor_parse_options();
        let arena = Arena::new();
        let root = dom::block_dom::parse_block_dom(&arena, &po, html_str);
        let mut renderer = render::html::HtmlRenderer::new(&self.render_options);
        renderer.render(root)
    }

    /// The plain textual content of editor block DOM.
    pub fn block_dom2_content(&self, html_str: &str) -> String {
        let po = self.editor_parse_options();
        let arena = Arena::new();
        let root = dom::block_dom::parse_block_dom(&arena, &po, html_str);
        let text = nodes::text_content(root);
        editor::strip_caret(&editor::strip_zwsp(&text))
            .trim()
            .to_string()
    }

    /// The text of editor block DOM, newlines preserved.
    pub fn block_dom2_text(&self, html_str: &str) -> String {
        let po = self.editor_parse_options();
        let arena = Arena::new();
        let root = dom::block_dom::parse_block_dom(&arena, &po, html_str);
        editor::strip_caret(&editor::strip_zwsp(&nodes::text_content(root)))
    }

    /// Character count of the text of editor block DOM.
    pub fn block_dom2_text_len(&self, html_str: &str) -> usize {
        self.block_dom2_text(html_str).chars().count()
    }

    /// Round-trips editor block DOM through Markdown, normalizing the
    /// tree on the way.
    pub fn spin_block_dom(&self, html_str: &str) -> String {
        let mut po = self.editor_parse_options();
        po.spin = true;
        po.text_mark = true;
        let ro = self.editor_render_options();

        let md = {
            let arena = Arena::new();
            let root = dom::block_dom::parse_block_dom(&arena, &po, html_str);
            let mut renderer = render::format::FormatRenderer::new(&ro);
            renderer.render(root)
        };
        // marker separators are an editor artifact; the caret is not
        let md = editor::strip_zwsp(&md);

        let arena = Arena::new();
        let root = parser::parse_document(&arena, &md, &po);
        let mut renderer = render::block_dom::BlockDomRenderer::new(&ro);
        renderer.render(root)
    }

    /// Renders an already-parsed tree as editor block DOM.
    pub fn tree2_block_dom<'a>(&self, root: &'a AstNode<'a>) -> String {
        let ro = self.editor_render_options();
        let mut renderer = render::block_dom::BlockDomRenderer::new(&ro);
        renderer.render(root)
    }

    /// Renders an already-parsed tree as standard HTML.
    pub fn tree2_html<'a>(&self, root: &'a AstNode<'a>) -> String {
        let mut renderer = render::html::HtmlRenderer::new(&self.render_options);
        renderer.render(root)
    }

    /// Renders a single node (and its subtree) as editor block DOM.
    pub fn render_node_block_dom<'a>(&self, node: &'a AstNode<'a>) -> String {
        let ro = self.editor_render_options();
        let mut renderer = render::block_dom::BlockDomRenderer::new(&ro);
        renderer.render(node)
    }

    /// Renders only the inline content of each block: the form used
    /// when a block's text is merged into another block.
    pub fn block_dom2_inline_block_dom(&self, html_str: &str) -> String {
        let po = self.editor_parse_options();
        let ro = self.editor_render_options();
        let arena = Arena::new();
        let root = dom::block_dom::parse_block_dom(&arena, &po, html_str);
        self.render_inline_children(&ro, root)
    }

    /// Parses Markdown and renders only the inline content of its
    /// blocks.
    pub fn inline_md2_block_dom(&self, markdown: &str) -> String {
        let po = self.editor_parse_options();
        let ro = self.editor_render_options();
        let arena = Arena::new();
        let root = parser::parse_document(&arena, markdown, &po);
        self.render_inline_children(&ro, root)
    }

    fn render_inline_children<'a>(
        &self,
        ro: &RenderOptions,
        root: &'a AstNode<'a>,
    ) -> String {
        let mut renderer = render::block_dom::BlockDomRenderer::new(ro);
        let mut out = String::new();
        for block in root.children() {
            if block.data.borrow().value.contains_inlines() {
                for child in block.children() {
                    out.push_str(&renderer.render(child));
                }
            } else if block.data.borrow().value.block()
                && !matches!(block.data.borrow().value, NodeValue::KramdownBlockIAL)
            {
                out.push_str(&renderer.render(block));
            }
        }
        out
    }

    /// Whether `s` parses as a single valid link destination.
    pub fn is_valid_link_dest(&self, s: &str) -> bool {
        let mut po = ParseOptions::default();
        po.gfm_auto_link = true;
        let arena = Arena::new();
        let root = parser::parse_document(&arena, s, &po);
        let para = match root.first_child() {
            Some(p) => p,
            None => return false,
        };
        if root.last_child().map(|l| !l.same_node(para)).unwrap_or(true) {
            return false;
        }
        let first_inline = match para.first_child() {
            Some(f) => f,
            None => return false,
        };
        let is_link = matches!(first_inline.data.borrow().value, NodeValue::Link(..));
        is_link
    }

    /// Inserts spaces between CJK and Western runs.
    pub fn space(&self, text: &str) -> String {
        render::auto_space(text)
    }

    /// The emoji alias table, site placeholder resolved.
    pub fn get_emojis(&self) -> FxHashMap<String, String> {
        let table = emoji_table().lock().unwrap();
        let mut ret =
            FxHashMap::with_capacity_and_hasher(table.len(), Default::default());
        for (k, v) in table
            .iter()
            .chain(self.parse_options.alias_emoji.iter())
        {
            let v = if v.contains(EMOJI_SITE_PLACEHOLDER) {
                v.replace(EMOJI_SITE_PLACEHOLDER, &self.parse_options.emoji_site)
            } else {
                v.clone()
            };
            ret.insert(k.clone(), v);
        }
        ret
    }

    /// Merges aliases into the process-wide table.
    pub fn put_emojis(&mut self, emoji_map: FxHashMap<String, String>) {
        let mut table = emoji_table().lock().unwrap();
        for (k, v) in emoji_map {
            self.parse_options
                .emoji_alias
                .insert(v.clone(), k.clone());
            self.parse_options.alias_emoji.insert(k.clone(), v.clone());
            table.insert(k, v);
        }
    }

    /// Strips emoji codepoints out of `s`.
    pub fn remove_emoji(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            let mut buf = [0u8; 4];
            let cs = c.encode_utf8(&mut buf);
            if emojis::get(cs).is_none() {
                out.push(c);
            }
        }
        out.trim().to_string()
    }

    pub fn get_terms(&self) -> &FxHashMap<String, String> {
        &self.render_options.terms
    }

    pub fn put_terms(&mut self, term_map: FxHashMap<String, String>) {
        for (k, v) in term_map {
            self.render_options.terms.insert(k, v);
        }
    }

    // ------------------------------------------------------------------
    // structural operations: block DOM in, block DOM out, IDs preserved

    fn transform_block_dom(&self, html_str: &str, op: StructuralOp) -> String {
        let po = self.editor_parse_options();
        let ro = self.editor_render_options();
        let arena = Arena::new();
        let root = dom::block_dom::parse_block_dom(&arena, &po, html_str);
        apply_structural_op(&arena, root, op);
        let mut renderer = render::block_dom::BlockDomRenderer::new(&ro);
        renderer.render(root)
    }

    /// Dissolves super blocks, lifting their children to the parent
    /// level with IDs and IALs intact.
    pub fn cancel_super_block(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::CancelSuperBlock)
    }

    /// Dissolves lists, lifting item content out.
    pub fn cancel_list(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::CancelList)
    }

    /// Dissolves blockquotes.
    pub fn cancel_blockquote(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::CancelBlockquote)
    }

    /// Converts headings back to paragraphs, IDs intact.
    pub fn blocks2ps(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::BlocksToParagraphs)
    }

    /// Converts paragraphs to headings of `level`.
    pub fn blocks2hs(&self, html_str: &str, level: u8) -> String {
        self.transform_block_dom(html_str, StructuralOp::BlocksToHeadings(level.clamp(1, 6)))
    }

    /// Ordered list → task list.
    pub fn ol2tl(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::ListTo(ListType::Task))
    }

    /// Unordered list → task list. Identical to [`Engine::ol2tl`] by
    /// design; both normalize whatever list they get.
    pub fn ul2tl(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::ListTo(ListType::Task))
    }

    /// Task list → ordered list.
    pub fn tl2ol(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::ListTo(ListType::Ordered))
    }

    /// Task list → unordered list.
    pub fn tl2ul(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::ListTo(ListType::Bullet))
    }

    /// Ordered list → unordered list.
    pub fn ol2ul(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::ListTo(ListType::Bullet))
    }

    /// Unordered list → ordered list.
    pub fn ul2ol(&self, html_str: &str) -> String {
        self.transform_block_dom(html_str, StructuralOp::ListTo(ListType::Ordered))
    }
}

/// One structural rewrite over a parsed block-DOM tree.
#[derive(Clone, Copy)]
enum StructuralOp {
    CancelSuperBlock,
    CancelList,
    CancelBlockquote,
    BlocksToParagraphs,
    BlocksToHeadings(u8),
    ListTo(ListType),
}

fn apply_structural_op<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>, op: StructuralOp) {
    match op {
        StructuralOp::CancelSuperBlock => {
            let supers: Vec<_> = root
                .descendants()
                .filter(|n| matches!(n.data.borrow().value, NodeValue::SuperBlock))
                .collect();
            for sb in supers {
                let children: Vec<_> = sb.children().collect();
                for child in children {
                    let keep = !matches!(
                        child.data.borrow().value,
                        NodeValue::SuperBlockOpenMarker
                            | NodeValue::SuperBlockLayoutMarker
                            | NodeValue::SuperBlockCloseMarker
                    );
                    if keep {
                        child.detach();
                        sb.insert_before(child);
                    }
                }
                detach_trailing_ial(sb);
                sb.detach();
            }
        }
        StructuralOp::CancelList => {
            let lists: Vec<_> = root
                .children()
                .filter(|n| matches!(n.data.borrow().value, NodeValue::List(..)))
                .collect();
            for list in lists {
                let items: Vec<_> = list.children().collect();
                for item in items {
                    if !matches!(item.data.borrow().value, NodeValue::ListItem(..)) {
                        continue;
                    }
                    let blocks: Vec<_> = item.children().collect();
                    for block in blocks {
                        if matches!(
                            block.data.borrow().value,
                            NodeValue::TaskListItemMarker { .. }
                        ) {
                            continue;
                        }
                        block.detach();
                        list.insert_before(block);
                    }
                }
                detach_trailing_ial(list);
                list.detach();
            }
        }
        StructuralOp::CancelBlockquote => {
            let quotes: Vec<_> = root
                .children()
                .filter(|n| matches!(n.data.borrow().value, NodeValue::Blockquote))
                .collect();
            for bq in quotes {
                let children: Vec<_> = bq.children().collect();
                for child in children {
                    child.detach();
                    bq.insert_before(child);
                }
                detach_trailing_ial(bq);
                bq.detach();
            }
        }
        StructuralOp::BlocksToParagraphs => {
            for n in root.descendants() {
                let mut ast = n.data.borrow_mut();
                if matches!(ast.value, NodeValue::Heading(..)) {
                    ast.value = NodeValue::Paragraph;
                }
            }
        }
        StructuralOp::BlocksToHeadings(level) => {
            for n in root.descendants() {
                let in_item = n
                    .parent()
                    .map(|p| matches!(p.data.borrow().value, NodeValue::ListItem(..)))
                    .unwrap_or(false);
                let mut ast = n.data.borrow_mut();
                if matches!(ast.value, NodeValue::Paragraph) && !in_item {
                    ast.value = NodeValue::Heading(nodes::NodeHeading {
                        level,
                        setext: false,
                    });
                }
            }
        }
        StructuralOp::ListTo(target) => {
            let all: Vec<_> = root.descendants().collect();
            for n in all {
                let is_list_node = {
                    let ast = n.data.borrow();
                    matches!(ast.value, NodeValue::List(..) | NodeValue::ListItem(..))
                };
                if !is_list_node {
                    continue;
                }

                {
                    let mut ast = n.data.borrow_mut();
                    if let NodeValue::List(ref mut nl) | NodeValue::ListItem(ref mut nl) =
                        ast.value
                    {
                        nl.list_type = target;
                        match target {
                            ListType::Ordered => {
                                nl.bullet_char = 0;
                                if nl.start == 0 {
                                    nl.start = 1;
                                }
                            }
                            _ => {
                                if nl.bullet_char == 0 {
                                    nl.bullet_char = b'*';
                                }
                            }
                        }
                    }
                }

                if !matches!(n.data.borrow().value, NodeValue::ListItem(..)) {
                    continue;
                }

                let marker = n.first_child().filter(|c| {
                    matches!(c.data.borrow().value, NodeValue::TaskListItemMarker { .. })
                });
                match (target, marker) {
                    (ListType::Task, None) => {
                        // a literal `[x] `/`[ ] ` prefix carries the state
                        let checked = take_task_prefix(n);
                        let m = arena.alloc(arena_tree::Node::new(std::cell::RefCell::new(
                            Ast::new(NodeValue::TaskListItemMarker {
                                checked: checked.unwrap_or(false),
                            }),
                        )));
                        m.data.borrow_mut().open = false;
                        n.prepend(m);
                    }
                    (ListType::Ordered, Some(m)) | (ListType::Bullet, Some(m)) => {
                        m.detach();
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Removes the attribute-list sibling that trailed a dissolved block.
fn detach_trailing_ial<'a>(node: &'a AstNode<'a>) {
    if let Some(next) = node.next_sibling() {
        if matches!(next.data.borrow().value, NodeValue::KramdownBlockIAL) {
            next.detach();
        }
    }
}


/// Strips a leading `[x] `/`[ ] ` run off a list item's first text and
/// reports the checked state it encoded.
fn take_task_prefix<'a>(item: &'a AstNode<'a>) -> Option<bool> {
    let para = item
        .children()
        .find(|c| matches!(c.data.borrow().value, NodeValue::Paragraph))?;
    let text = para
        .first_child()
        .filter(|t| matches!(t.data.borrow().value, NodeValue::Text))?;
    let mut ast = text.data.borrow_mut();
    let stripped = editor::strip_caret(&ast.tokens);
    let checked = if stripped.starts_with("[x] ") || stripped.starts_with("[X] ") {
        true
    } else if stripped.starts_with("[ ] ") {
        false
    } else {
        return None;
    };
    let had_caret = ast.tokens.contains(editor::CARET);
    let mut rest = stripped[4..].to_string();
    if had_caret {
        rest.insert_str(0, editor::CARET);
    }
    ast.tokens = rest;
    Some(checked)
}

/// Counts runes and words the way the editor's counters do: CJK runs
/// count per character, Western runs per word.
pub fn word_count(s: &str) -> (usize, usize) {
    let mut rune_count = 0;
    let mut word_count = 0;
    for field in s.split_whitespace() {
        let chars: Vec<char> = field.chars().collect();
        if chars.is_empty() {
            continue;
        }
        rune_count += chars.len();
        word_count += 1;
        let mut is_ascii = (chars[0] as u32) < 0x80;
        for &c in &chars[1..] {
            let ascii = (c as u32) < 0x80;
            if ascii != is_ascii || !ascii {
                word_count += 1;
            }
            is_ascii = ascii;
        }
    }
    (rune_count, word_count)
}

#[cfg(test)]
mod tests;
