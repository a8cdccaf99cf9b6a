//! Pasted-HTML → AST: a lenient tag-based reverse parse used by the
//! paste path. Unknown structure degrades to text, never to an error;
//! an unparseable root just yields an empty tree.

use std::cell::RefCell;

use log::debug;
use markup5ever_rcdom::{Handle, NodeData};
use typed_arena::Arena;

use crate::arena_tree::Node;
use crate::dom;
use crate::editor;
use crate::nodes::{
    Ast, AstNode, LinkType, ListDelimType, ListType, NodeCodeBlock, NodeHeading, NodeList,
    NodeValue,
};
use crate::parser::ParseOptions;

pub struct HtmlReader<'a, 'o> {
    arena: &'a Arena<AstNode<'a>>,
    #[allow(dead_code)]
    options: &'o ParseOptions,
}

/// Parses arbitrary pasted HTML into an AST. The result is a plain
/// document tree; callers typically format it to Markdown and re-parse.
pub fn parse_html<'a>(
    arena: &'a Arena<AstNode<'a>>,
    options: &ParseOptions,
    html_str: &str,
) -> &'a AstNode<'a> {
    let reader = HtmlReader { arena, options };
    reader.parse(html_str)
}

#[derive(Clone, Copy)]
struct WalkCtx {
    in_table: bool,
    in_pre: bool,
    in_heading: bool,
}

impl<'a, 'o> HtmlReader<'a, 'o> {
    fn new_node(&self, value: NodeValue) -> &'a AstNode<'a> {
        let mut ast = Ast::new(value);
        ast.open = false;
        self.arena.alloc(Node::new(RefCell::new(ast)))
    }

    fn new_tok(&self, value: NodeValue, tokens: &str) -> &'a AstNode<'a> {
        let node = self.new_node(value);
        node.data.borrow_mut().tokens = tokens.to_string();
        node
    }

    fn parse(&self, html_str: &str) -> &'a AstNode<'a> {
        let s = html_str
            .replace(editor::FRONT_END_CARET_SELF_CLOSE, editor::CARET)
            .replace(editor::FRONT_END_CARET, editor::CARET);

        let root = self.new_node(NodeValue::Document);
        let document = dom::parse_html_fragment(&s);
        let frag = dom::fragment_root(&document);
        let ctx = WalkCtx {
            in_table: false,
            in_pre: false,
            in_heading: false,
        };
        for child in dom::children_of(&frag) {
            self.gen(&child, root, &ctx);
        }

        if root.first_child().is_none() {
            debug!("pasted HTML produced no parseable root");
        }

        super::block_dom::normalize_tree(self.arena, root);
        root
    }

    /// Ensures loose inline output lands inside a paragraph.
    fn inline_tip(&self, tip: &'a AstNode<'a>) -> &'a AstNode<'a> {
        let needs_para = matches!(
            tip.data.borrow().value,
            NodeValue::Document
                | NodeValue::Blockquote
                | NodeValue::ListItem(..)
                | NodeValue::FootnotesDef
        );
        if !needs_para {
            return tip;
        }
        if let Some(last) = tip.last_child() {
            if matches!(last.data.borrow().value, NodeValue::Paragraph) {
                return last;
            }
        }
        let p = self.new_node(NodeValue::Paragraph);
        tip.append(p);
        p
    }

    fn gen(&self, n: &Handle, tip: &'a AstNode<'a>, ctx: &WalkCtx) {
        match n.data {
            NodeData::Text { ref contents } => {
                let raw = contents.borrow().to_string();
                if ctx.in_pre {
                    self.inline_tip(tip)
                        .append(self.new_tok(NodeValue::Text, &raw));
                    return;
                }
                let mut text = crate::strings::normalize_whitespace(&raw);
                if text.trim().is_empty() {
                    return;
                }
                if ctx.in_table {
                    text = text.replace('|', "\\|");
                }
                let target = self.inline_tip(tip);
                if target.first_child().is_none() {
                    text = text.trim_start().to_string();
                }
                target.append(self.new_tok(NodeValue::Text, &text));
            }
            NodeData::Comment { .. } => {}
            NodeData::Element { .. } => self.gen_element(n, tip, ctx),
            _ => {
                for child in dom::children_of(n) {
                    self.gen(&child, tip, ctx);
                }
            }
        }
    }

    fn recurse(&self, n: &Handle, tip: &'a AstNode<'a>, ctx: &WalkCtx) {
        for child in dom::children_of(n) {
            self.gen(&child, tip, ctx);
        }
    }

    fn gen_element(&self, n: &Handle, tip: &'a AstNode<'a>, ctx: &WalkCtx) {
        let name = dom::element_name(n).unwrap_or_default();

        match name.as_str() {
            "p" | "div" | "section" | "article" | "footer" | "header" => {
                if name == "p" {
                    let node = self.new_node(NodeValue::Paragraph);
                    tip.append(node);
                    self.recurse(n, node, ctx);
                } else {
                    self.recurse(n, tip, ctx);
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if ctx.in_table {
                    self.recurse(n, tip, ctx);
                    return;
                }
                let level = name.as_bytes()[1] - b'0';
                let node = self.new_node(NodeValue::Heading(NodeHeading {
                    level,
                    setext: false,
                }));
                tip.append(node);
                let hctx = WalkCtx {
                    in_heading: true,
                    ..*ctx
                };
                self.recurse(n, node, &hctx);
            }
            "blockquote" => {
                let node = self.new_node(NodeValue::Blockquote);
                tip.append(node);
                self.recurse(n, node, ctx);
            }
            "ul" | "ol" => {
                let mut nl = NodeList {
                    list_type: if name == "ol" {
                        ListType::Ordered
                    } else {
                        ListType::Bullet
                    },
                    bullet_char: if name == "ol" { 0 } else { b'*' },
                    start: 1,
                    delimiter: ListDelimType::Period,
                    tight: true,
                    ..Default::default()
                };
                if let Ok(start) = dom::attr_value(n, "start").parse::<usize>() {
                    nl.start = start;
                }
                let node = self.new_node(NodeValue::List(nl));
                tip.append(node);
                self.recurse(n, node, ctx);
            }
            "li" => {
                let parent_list = match tip.data.borrow().value {
                    NodeValue::List(nl) => nl,
                    _ => NodeList {
                        list_type: ListType::Bullet,
                        bullet_char: b'*',
                        start: 1,
                        tight: true,
                        ..Default::default()
                    },
                };
                let node = self.new_node(NodeValue::ListItem(parent_list));
                tip.append(node);
                self.recurse(n, node, ctx);
            }
            "input" => {
                if dom::attr_value(n, "type") == "checkbox" {
                    let checked = {
                        if let NodeData::Element { ref attrs, .. } = n.data {
                            attrs
                                .borrow()
                                .iter()
                                .any(|a| a.name.local.as_ref() == "checked")
                        } else {
                            false
                        }
                    };
                    let item = crate::nodes::containing_block(tip);
                    if let Some(item) = item {
                        let mut cur = Some(item);
                        while let Some(c) = cur {
                            if matches!(c.data.borrow().value, NodeValue::ListItem(..)) {
                                c.prepend(self.new_node(NodeValue::TaskListItemMarker { checked }));
                                set_task(c);
                                if let Some(l) = c.parent() {
                                    set_task(l);
                                }
                                break;
                            }
                            cur = c.parent();
                        }
                    }
                }
            }
            "pre" => {
                if ctx.in_table {
                    // tables cannot hold block code: one code span per line
                    let text = dom::dom_text(n);
                    let target = self.inline_tip(tip);
                    for (i, line) in text.trim_end().split('\n').enumerate() {
                        if i > 0 {
                            target.append(self.new_tok(NodeValue::Text, "<br />"));
                        }
                        let span = self.new_node(NodeValue::CodeSpan { backticks: 1 });
                        target.append(span);
                        span.append(self.new_tok(NodeValue::CodeSpanOpenMarker, "`"));
                        span.append(self.new_tok(NodeValue::CodeSpanContent, line));
                        span.append(self.new_tok(NodeValue::CodeSpanCloseMarker, "`"));
                    }
                    return;
                }

                let mut info = String::new();
                if let Some(code) = dom::find_element(n, "code") {
                    let class = dom::class_value(&code);
                    for piece in class.split_ascii_whitespace() {
                        if let Some(lang) = piece.strip_prefix("language-") {
                            info = lang.to_string();
                            break;
                        }
                    }
                }
                let mut code_text = dom::dom_text(n);
                if !code_text.ends_with('\n') {
                    code_text.push('\n');
                }

                let node = self.new_node(NodeValue::CodeBlock(NodeCodeBlock {
                    is_fenced: true,
                    fence_char: b'`',
                    fence_len: 3,
                    fence_offset: 0,
                    info: info.clone(),
                }));
                tip.append(node);
                node.append(self.new_tok(NodeValue::CodeBlockFenceOpenMarker, "```"));
                node.append(self.new_tok(NodeValue::CodeBlockFenceInfoMarker, &info));
                node.append(self.new_tok(NodeValue::CodeBlockCode, &code_text));
                node.append(self.new_tok(NodeValue::CodeBlockFenceCloseMarker, "```"));
            }
            "code" if !ctx.in_pre => {
                let content = dom::dom_text(n);
                if content.is_empty() {
                    return;
                }
                let target = self.inline_tip(tip);
                let span = self.new_node(NodeValue::CodeSpan { backticks: 1 });
                target.append(span);
                span.append(self.new_tok(NodeValue::CodeSpanOpenMarker, "`"));
                span.append(self.new_tok(NodeValue::CodeSpanContent, &content));
                span.append(self.new_tok(NodeValue::CodeSpanCloseMarker, "`"));
            }
            "hr" => {
                tip.append(self.new_node(NodeValue::ThematicBreak));
            }
            "br" => {
                let target = self.inline_tip(tip);
                if ctx.in_table {
                    target.append(self.new_tok(NodeValue::Text, "<br />"));
                } else {
                    target.append(self.new_node(NodeValue::HardBreak));
                }
            }
            "em" | "i" => self.wrap(n, tip, ctx, NodeValue::Emph, "*"),
            "strong" | "b" => self.wrap(n, tip, ctx, NodeValue::Strong, "**"),
            "del" | "s" | "strike" => self.wrap(n, tip, ctx, NodeValue::Strikethrough, "~~"),
            "mark" => self.wrap(n, tip, ctx, NodeValue::Mark, "=="),
            "sup" => self.wrap(n, tip, ctx, NodeValue::Sup, "^"),
            "sub" => self.wrap(n, tip, ctx, NodeValue::Sub, "~"),
            "u" => self.wrap(n, tip, ctx, NodeValue::Underline, "<u>"),
            "kbd" => self.wrap(n, tip, ctx, NodeValue::Kbd, "<kbd>"),
            "a" => {
                let href = dom::attr_value(n, "href");
                let title = dom::attr_value(n, "title");
                let text = dom::dom_text(n);
                if text.is_empty() && ctx.in_heading {
                    // anchor artifacts inside headings carry nothing
                    return;
                }
                let target = self.inline_tip(tip);
                let link = self.new_node(NodeValue::Link(LinkType::Inline));
                target.append(link);
                link.append(self.new_tok(NodeValue::OpenBracket, "["));
                self.recurse(n, link, ctx);
                link.append(self.new_tok(NodeValue::CloseBracket, "]"));
                link.append(self.new_tok(NodeValue::OpenParen, "("));
                link.append(self.new_tok(NodeValue::LinkDest, &href));
                if !title.is_empty() {
                    link.append(self.new_node(NodeValue::LinkSpace));
                    link.append(self.new_tok(NodeValue::LinkTitle, &title));
                }
                link.append(self.new_tok(NodeValue::CloseParen, ")"));
            }
            "img" => {
                let target = self.inline_tip(tip);
                let class = dom::class_value(n);
                let src = dom::attr_value(n, "src");
                let alt = dom::attr_value(n, "alt");
                if class.contains("emoji") {
                    let node = self.new_node(NodeValue::Emoji);
                    target.append(node);
                    let img = self.new_tok(NodeValue::EmojiImg, &src);
                    img.append(self.new_tok(NodeValue::EmojiAlias, &format!(":{alt}:")));
                    node.append(img);
                    return;
                }
                let image = self.new_node(NodeValue::Image);
                target.append(image);
                image.append(self.new_tok(NodeValue::Bang, "!"));
                image.append(self.new_tok(NodeValue::OpenBracket, "["));
                if !alt.is_empty() {
                    image.append(self.new_tok(NodeValue::Text, &alt));
                }
                image.append(self.new_tok(NodeValue::CloseBracket, "]"));
                image.append(self.new_tok(NodeValue::OpenParen, "("));
                image.append(self.new_tok(NodeValue::LinkDest, &src));
                let title = dom::attr_value(n, "title");
                if !title.is_empty() {
                    image.append(self.new_node(NodeValue::LinkSpace));
                    image.append(self.new_tok(NodeValue::LinkTitle, &title));
                }
                image.append(self.new_tok(NodeValue::CloseParen, ")"));
            }
            "table" => {
                let tctx = WalkCtx {
                    in_table: true,
                    ..*ctx
                };
                let mut aligns = Vec::new();
                if let Some(tr) = dom::find_element(n, "tr") {
                    for cell in dom::children_of(&tr) {
                        if matches!(dom::element_name(&cell).as_deref(), Some("th") | Some("td")) {
                            aligns.push(super::block_dom::parse_align(&dom::attr_value(
                                &cell, "align",
                            )));
                        }
                    }
                }
                if aligns.is_empty() {
                    self.recurse(n, tip, &tctx);
                    return;
                }
                let node = self.new_node(NodeValue::Table(crate::nodes::NodeTable {
                    aligns: aligns.clone(),
                }));
                tip.append(node);
                let mut first_row = true;
                self.gen_table_rows(n, node, &tctx, &aligns, &mut first_row);
            }
            "iframe" | "video" | "audio" => {
                let value = match name.as_str() {
                    "iframe" => NodeValue::IFrame,
                    "video" => NodeValue::Video,
                    _ => NodeValue::Audio,
                };
                let node = self.new_node(value);
                node.data.borrow_mut().tokens = super::block_dom::serialize_simple(n, &name);
                tip.append(node);
            }
            "details" | "summary" | "figure" | "figcaption" => {
                self.recurse(n, tip, ctx);
            }
            "span" => {
                // editor spans keep their inline type in data-type
                let data_type = dom::attr_value(n, "data-type");
                match data_type.split_ascii_whitespace().next() {
                    Some("strong") => self.wrap(n, tip, ctx, NodeValue::Strong, "**"),
                    Some("em") => self.wrap(n, tip, ctx, NodeValue::Emph, "*"),
                    Some("s") => self.wrap(n, tip, ctx, NodeValue::Strikethrough, "~~"),
                    Some("mark") => self.wrap(n, tip, ctx, NodeValue::Mark, "=="),
                    Some("sup") => self.wrap(n, tip, ctx, NodeValue::Sup, "^"),
                    Some("sub") => self.wrap(n, tip, ctx, NodeValue::Sub, "~"),
                    Some("u") => self.wrap(n, tip, ctx, NodeValue::Underline, "<u>"),
                    Some("kbd") => self.wrap(n, tip, ctx, NodeValue::Kbd, "<kbd>"),
                    _ => self.recurse(n, tip, ctx),
                }
            }
            "font" => {
                self.recurse(n, tip, ctx);
            }
            "wbr" => {
                self.inline_tip(tip)
                    .append(self.new_tok(NodeValue::Text, editor::CARET));
            }
            "script" | "style" | "head" | "meta" | "link" | "title" | "colgroup" => {}
            _ => {
                self.recurse(n, tip, ctx);
            }
        }
    }

    fn gen_table_rows(
        &self,
        n: &Handle,
        table: &'a AstNode<'a>,
        ctx: &WalkCtx,
        aligns: &[crate::nodes::TableAlignment],
        first_row: &mut bool,
    ) {
        for child in dom::children_of(n) {
            match dom::element_name(&child).as_deref() {
                Some("thead") | Some("tbody") | Some("tfoot") => {
                    self.gen_table_rows(&child, table, ctx, aligns, first_row);
                }
                Some("tr") => {
                    let row = if *first_row {
                        *first_row = false;
                        let head = self.new_node(NodeValue::TableHead);
                        table.append(head);
                        let row = self.new_node(NodeValue::TableRow);
                        head.append(row);
                        row
                    } else {
                        let row = self.new_node(NodeValue::TableRow);
                        table.append(row);
                        row
                    };
                    let mut col = 0;
                    for cell in dom::children_of(&child) {
                        if !matches!(
                            dom::element_name(&cell).as_deref(),
                            Some("th") | Some("td")
                        ) {
                            continue;
                        }
                        let align = aligns
                            .get(col)
                            .copied()
                            .unwrap_or(crate::nodes::TableAlignment::None);
                        let c = self.new_node(NodeValue::TableCell(align));
                        row.append(c);
                        self.recurse(&cell, c, ctx);
                        col += 1;
                    }
                }
                _ => {}
            }
        }
    }

    fn wrap(
        &self,
        n: &Handle,
        tip: &'a AstNode<'a>,
        ctx: &WalkCtx,
        value: NodeValue,
        marker: &str,
    ) {
        if dom::dom_text(n).trim().is_empty() {
            return;
        }
        let (open, close, close_marker) = match value {
            NodeValue::Emph => (
                NodeValue::EmphOpenMarker,
                NodeValue::EmphCloseMarker,
                marker.to_string(),
            ),
            NodeValue::Strong => (
                NodeValue::StrongOpenMarker,
                NodeValue::StrongCloseMarker,
                marker.to_string(),
            ),
            NodeValue::Strikethrough => (
                NodeValue::StrikethroughOpenMarker,
                NodeValue::StrikethroughCloseMarker,
                marker.to_string(),
            ),
            NodeValue::Mark => (
                NodeValue::MarkOpenMarker,
                NodeValue::MarkCloseMarker,
                marker.to_string(),
            ),
            NodeValue::Sup => (
                NodeValue::SupOpenMarker,
                NodeValue::SupCloseMarker,
                marker.to_string(),
            ),
            NodeValue::Sub => (
                NodeValue::SubOpenMarker,
                NodeValue::SubCloseMarker,
                marker.to_string(),
            ),
            NodeValue::Underline => (
                NodeValue::UnderlineOpenMarker,
                NodeValue::UnderlineCloseMarker,
                "</u>".to_string(),
            ),
            NodeValue::Kbd => (
                NodeValue::KbdOpenMarker,
                NodeValue::KbdCloseMarker,
                "</kbd>".to_string(),
            ),
            _ => return,
        };
        let target = self.inline_tip(tip);
        let node = self.new_node(value);
        target.append(node);
        node.append(self.new_tok(open, marker));
        self.recurse(n, node, ctx);
        node.append(self.new_tok(close, &close_marker));
    }
}

fn set_task<'a>(node: &'a AstNode<'a>) {
    let mut ast = node.data.borrow_mut();
    match ast.value {
        NodeValue::List(ref mut nl) | NodeValue::ListItem(ref mut nl) => {
            nl.list_type = ListType::Task;
        }
        _ => {}
    }
}
