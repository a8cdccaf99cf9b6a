//! Editor block DOM → AST. Walks the structural HTML the block editor
//! emits, dispatching on `data-type` wrappers, and rebuilds the tree
//! with its kramdown IALs and the caret sentinel restored.

use std::cell::RefCell;

use markup5ever_rcdom::{Handle, NodeData};
use typed_arena::Arena;

use crate::arena_tree::Node;
use crate::dom;
use crate::editor;
use crate::nodes::{
    Ast, AstNode, ListDelimType, ListType, NodeAttributeView, NodeCodeBlock, NodeHeading,
    NodeKind, NodeList, NodeTable, NodeTextMark, NodeValue, TableAlignment,
};
use crate::parser::ial::ial_to_string;
use crate::parser::ParseOptions;

pub struct BlockDomReader<'a, 'o> {
    arena: &'a Arena<AstNode<'a>>,
    options: &'o ParseOptions,
}

/// Parses editor block DOM into an AST rooted at a document node.
pub fn parse_block_dom<'a>(
    arena: &'a Arena<AstNode<'a>>,
    options: &ParseOptions,
    html_str: &str,
) -> &'a AstNode<'a> {
    let reader = BlockDomReader { arena, options };
    reader.parse(html_str)
}

impl<'a, 'o> BlockDomReader<'a, 'o> {
    fn new_node(&self, value: NodeValue) -> &'a AstNode<'a> {
        let mut ast = Ast::new(value);
        ast.open = false;
        self.arena.alloc(Node::new(RefCell::new(ast)))
    }

    fn new_text(&self, tokens: &str) -> &'a AstNode<'a> {
        let node = self.new_node(NodeValue::Text);
        node.data.borrow_mut().tokens = tokens.to_string();
        node
    }

    fn parse(&self, html_str: &str) -> &'a AstNode<'a> {
        let mut s = html_str.to_string();
        // keep the caret outside inline close tags so it survives
        for tag in ["strong", "em", "s", "u", "span"] {
            s = s.replace(
                &format!("\n<wbr>\n</{tag}>"),
                &format!("</{tag}>\n<wbr>\n"),
            );
        }
        s = s.replace("`<wbr></span>", "</span>`<wbr>");
        s = s.replace(editor::FRONT_END_CARET_SELF_CLOSE, editor::CARET);
        s = s.replace(editor::FRONT_END_CARET, editor::CARET);

        let start_spaces = s.len() - s.trim_start_matches(' ').len();
        let end_spaces = s.len() - s.trim_end_matches(' ').len();
        let mut s = s.trim().to_string();
        s = format!(
            "{}{}{}",
            "&nbsp;".repeat(start_spaces),
            s,
            "&nbsp;".repeat(end_spaces)
        );
        s = s.replace("\t\n", "\n").replace("    \n", "  \n");

        let root = self.new_node(NodeValue::Document);
        let document = dom::parse_html_fragment(&s);
        let frag = dom::fragment_root(&document);
        for child in dom::children_of(&frag) {
            self.gen_block(&child, root, false);
        }

        normalize_tree(self.arena, root);
        root
    }

    fn gen_block(&self, n: &Handle, tip: &'a AstNode<'a>, in_table: bool) {
        let class = dom::class_value(n);
        if class == "protyle-attr"
            || class.contains("__copy")
            || class.contains("protyle-linenumber__rows")
        {
            return;
        }
        if dom::attr_value(n, "spin") == "1" {
            return;
        }

        if let Some(text) = dom::text_of(n) {
            if !text.trim().is_empty() {
                // loose inline content needs a paragraph wrapper
                let needs_para = matches!(
                    tip.data.borrow().value,
                    NodeValue::Document
                        | NodeValue::Blockquote
                        | NodeValue::ListItem(..)
                        | NodeValue::SuperBlock
                );
                if needs_para {
                    let p = self.new_node(NodeValue::Paragraph);
                    tip.append(p);
                    p.append(self.new_text(&text));
                } else {
                    tip.append(self.new_text(&text));
                }
            }
            return;
        }

        if dom::element_name(n).is_none() {
            return;
        }

        if class.contains("protyle-action") {
            return;
        }

        if dom::attr_value(n, "contenteditable") == "true" {
            for child in dom::children_of(n) {
                self.gen_inline(&child, tip, in_table);
            }
            return;
        }

        let data_type = dom::attr_value(n, "data-type");
        let kind = NodeKind::from_name(&data_type);

        let node_id = dom::attr_value(n, "data-node-id");
        let has_ial = !node_id.is_empty() && !in_table;

        let node = match kind {
            Some(NodeKind::Paragraph) => {
                let node = self.new_node(NodeValue::Paragraph);
                tip.append(node);
                for child in dom::children_of(n) {
                    self.gen_block(&child, node, in_table);
                }
                node
            }
            Some(NodeKind::Heading) => {
                let subtype = dom::attr_value(n, "data-subtype");
                let level = subtype
                    .strip_prefix('h')
                    .and_then(|l| l.parse::<u8>().ok())
                    .unwrap_or(1)
                    .clamp(1, 6);
                let node = self.new_node(NodeValue::Heading(NodeHeading {
                    level,
                    setext: false,
                }));
                tip.append(node);
                for child in dom::children_of(n) {
                    self.gen_block(&child, node, in_table);
                }
                node
            }
            Some(NodeKind::Blockquote) => {
                let node = self.new_node(NodeValue::Blockquote);
                tip.append(node);
                for child in dom::children_of(n) {
                    self.gen_block(&child, node, in_table);
                }
                node
            }
            Some(NodeKind::List) => {
                let mut nl = NodeList::default();
                match dom::attr_value(n, "data-subtype").as_str() {
                    "o" => nl.list_type = ListType::Ordered,
                    "t" => nl.list_type = ListType::Task,
                    _ => nl.list_type = ListType::Bullet,
                }
                let marker = dom::attr_value(n, "data-marker");
                if nl.list_type == ListType::Ordered {
                    nl.start = marker
                        .trim_end_matches(['.', ')'])
                        .parse()
                        .unwrap_or(1);
                    nl.delimiter = if marker.ends_with(')') {
                        ListDelimType::Paren
                    } else {
                        ListDelimType::Period
                    };
                } else {
                    nl.bullet_char = marker.bytes().next().unwrap_or(b'*');
                }
                nl.tight = true;
                let node = self.new_node(NodeValue::List(nl));
                tip.append(node);
                for child in dom::children_of(n) {
                    self.gen_block(&child, node, in_table);
                }
                node
            }
            Some(NodeKind::ListItem) => {
                let mut nl = NodeList::default();
                let marker = dom::attr_value(n, "data-marker");
                match dom::attr_value(n, "data-subtype").as_str() {
                    "o" => {
                        nl.list_type = ListType::Ordered;
                        nl.start = marker.trim_end_matches(['.', ')']).parse().unwrap_or(1);
                        nl.delimiter = if marker.ends_with(')') {
                            ListDelimType::Paren
                        } else {
                            ListDelimType::Period
                        };
                    }
                    "t" => {
                        nl.list_type = ListType::Task;
                        nl.bullet_char = marker.bytes().next().unwrap_or(b'*');
                    }
                    _ => {
                        nl.list_type = ListType::Bullet;
                        nl.bullet_char = marker.bytes().next().unwrap_or(b'*');
                    }
                }
                nl.tight = true;
                let node = self.new_node(NodeValue::ListItem(nl));
                tip.append(node);
                if nl.list_type == ListType::Task {
                    let checked = class.contains("protyle-task--done");
                    let m = self.new_node(NodeValue::TaskListItemMarker { checked });
                    node.append(m);
                }
                for child in dom::children_of(n) {
                    self.gen_block(&child, node, in_table);
                }
                node
            }
            Some(NodeKind::CodeBlock) => self.gen_code_block(n, tip),
            Some(NodeKind::MathBlock) => {
                let content = self.block_content(n);
                let node = self.new_node(NodeValue::MathBlock);
                tip.append(node);
                node.append(self.new_node(NodeValue::MathBlockOpenMarker));
                let c = self.new_node(NodeValue::MathBlockContent);
                c.data.borrow_mut().tokens = content;
                node.append(c);
                node.append(self.new_node(NodeValue::MathBlockCloseMarker));
                node
            }
            Some(NodeKind::HtmlBlock) => {
                let node = self.new_node(NodeValue::HtmlBlock(7));
                node.data.borrow_mut().tokens = self.block_content(n);
                tip.append(node);
                node
            }
            Some(NodeKind::ThematicBreak) => {
                let node = self.new_node(NodeValue::ThematicBreak);
                tip.append(node);
                node
            }
            Some(NodeKind::SuperBlock) => {
                let node = self.new_node(NodeValue::SuperBlock);
                tip.append(node);
                node.append(self.new_node(NodeValue::SuperBlockOpenMarker));
                let layout = self.new_node(NodeValue::SuperBlockLayoutMarker);
                layout.data.borrow_mut().tokens = dom::attr_value(n, "data-sb-layout");
                node.append(layout);
                for child in dom::children_of(n) {
                    self.gen_block(&child, node, in_table);
                }
                node.append(self.new_node(NodeValue::SuperBlockCloseMarker));
                node
            }
            Some(NodeKind::BlockQueryEmbed) => {
                let node = self.new_node(NodeValue::BlockQueryEmbed);
                tip.append(node);
                node.append(self.new_node(NodeValue::OpenBrace));
                let script = self.new_node(NodeValue::BlockQueryEmbedScript);
                let content = dom::attr_value(n, "data-content")
                    .replace('\n', editor::IAL_VAL_ESC_NEWLINE);
                script.data.borrow_mut().tokens = content;
                node.append(script);
                node.append(self.new_node(NodeValue::CloseBrace));
                node
            }
            Some(NodeKind::AttributeView) => {
                let node = self.new_node(NodeValue::AttributeView(NodeAttributeView {
                    av_id: dom::attr_value(n, "data-av-id"),
                    av_type: dom::attr_value(n, "data-av-type"),
                }));
                tip.append(node);
                node
            }
            Some(NodeKind::IFrame) | Some(NodeKind::Video) | Some(NodeKind::Audio)
            | Some(NodeKind::Widget) => {
                let value = match kind.unwrap() {
                    NodeKind::IFrame => NodeValue::IFrame,
                    NodeKind::Video => NodeValue::Video,
                    NodeKind::Audio => NodeValue::Audio,
                    _ => NodeValue::Widget,
                };
                let node = self.new_node(value);
                node.data.borrow_mut().tokens = self.embedded_html(n);
                tip.append(node);
                node
            }
            Some(NodeKind::YamlFrontMatter) => {
                let node = self.new_node(NodeValue::YamlFrontMatter);
                tip.append(node);
                node.append(self.new_node(NodeValue::YamlFrontMatterOpenMarker));
                let c = self.new_node(NodeValue::YamlFrontMatterContent);
                c.data.borrow_mut().tokens = self.block_content(n);
                node.append(c);
                node.append(self.new_node(NodeValue::YamlFrontMatterCloseMarker));
                node
            }
            Some(NodeKind::CustomBlock) => {
                let node = self.new_node(NodeValue::CustomBlock {
                    info: dom::attr_value(n, "data-info"),
                });
                node.data.borrow_mut().tokens = dom::attr_value(n, "data-content");
                tip.append(node);
                node
            }
            Some(NodeKind::GitConflict) => {
                let content = self.block_content(n);
                let node = self.new_node(NodeValue::GitConflict);
                tip.append(node);
                let mut lines: Vec<&str> = content.lines().collect();
                let open = if lines.first().map_or(false, |l| l.starts_with("<<<<<<<")) {
                    lines.remove(0).to_string()
                } else {
                    "<<<<<<< ".to_string()
                };
                let close = if lines.last().map_or(false, |l| l.starts_with(">>>>>>>")) {
                    lines.pop().unwrap().to_string()
                } else {
                    ">>>>>>> ".to_string()
                };
                let o = self.new_node(NodeValue::GitConflictOpenMarker);
                o.data.borrow_mut().tokens = open;
                node.append(o);
                let c = self.new_node(NodeValue::GitConflictContent);
                c.data.borrow_mut().tokens = lines.join("\n");
                node.append(c);
                let e = self.new_node(NodeValue::GitConflictCloseMarker);
                e.data.borrow_mut().tokens = close;
                node.append(e);
                node
            }
            Some(NodeKind::Table) => match self.gen_table(n, tip) {
                Some(node) => node,
                None => return,
            },
            _ => {
                // unknown wrapper: recurse, children may still be blocks
                for child in dom::children_of(n) {
                    self.gen_block(&child, tip, in_table);
                }
                return;
            }
        };

        if has_ial {
            let mut ast = node.data.borrow_mut();
            ast.set_ial_attr("id", &node_id);
            set_block_ial_attrs(n, &mut ast);
            let tokens = ial_to_string(&ast.ial);
            drop(ast);
            let ial_node = self.new_node(NodeValue::KramdownBlockIAL);
            ial_node.data.borrow_mut().tokens = tokens;
            tip.append(ial_node);
        }
    }

    /// The raw content of a block: its `data-content` attribute when
    /// present, the editable text otherwise.
    fn block_content(&self, n: &Handle) -> String {
        let direct = dom::attr_value(n, "data-content");
        if !direct.is_empty() {
            return direct;
        }
        if let Some(holder) = dom::find_element(n, "protyle-html") {
            let v = dom::attr_value(&holder, "data-content");
            if !v.is_empty() {
                return v;
            }
        }
        dom::dom_text(n).trim().to_string()
    }

    fn embedded_html(&self, n: &Handle) -> String {
        for tag in ["iframe", "video", "audio"] {
            if let Some(el) = dom::find_element(n, tag) {
                return serialize_simple(&el, tag);
            }
        }
        self.block_content(n)
    }

    fn gen_code_block(&self, n: &Handle, tip: &'a AstNode<'a>) -> &'a AstNode<'a> {
        let mut info = dom::attr_value(n, "data-subtype");
        let mut code = dom::attr_value(n, "data-content");

        if code.is_empty() {
            // action bar carries the language, the editable div the code
            for child in dom::children_of(n) {
                let class = dom::class_value(&child);
                if class.contains("protyle-action") {
                    let lang = dom::dom_text(&child);
                    if !lang.trim().is_empty() {
                        info = lang.trim().to_string();
                    }
                } else if dom::attr_value(&child, "contenteditable") == "true" {
                    code = dom::dom_text(&child);
                }
            }
        }

        // a caret stranded past the trailing newline folds back in
        if code.ends_with(&format!("\n\n{}", editor::CARET)) {
            code = code
                .trim_end_matches(&format!("\n\n{}", editor::CARET))
                .to_string();
            code.push('\n');
            code.push_str(editor::CARET);
            code.push('\n');
        }

        // literal backtick fences inside the code are held apart with ZWJ
        let mut buf = String::new();
        let lines: Vec<&str> = code.split('\n').collect();
        for (i, line) in lines.iter().enumerate() {
            if line.contains("```") {
                buf.push_str(&line.replace("```", &format!("{}```", editor::ZWJ)));
            } else {
                buf.push_str(&line.replace(editor::ZWJ, ""));
            }
            if i < lines.len() - 1 {
                buf.push('\n');
            }
        }
        if !buf.ends_with('\n') && !buf.is_empty() {
            buf.push('\n');
        }

        let node = self.new_node(NodeValue::CodeBlock(NodeCodeBlock {
            is_fenced: true,
            fence_char: b'`',
            fence_len: 3,
            fence_offset: 0,
            info: info.clone(),
        }));
        tip.append(node);
        let open = self.new_node(NodeValue::CodeBlockFenceOpenMarker);
        open.data.borrow_mut().tokens = "```".to_string();
        node.append(open);
        let im = self.new_node(NodeValue::CodeBlockFenceInfoMarker);
        im.data.borrow_mut().tokens = info;
        node.append(im);
        let c = self.new_node(NodeValue::CodeBlockCode);
        c.data.borrow_mut().tokens = buf;
        node.append(c);
        let close = self.new_node(NodeValue::CodeBlockFenceCloseMarker);
        close.data.borrow_mut().tokens = "```".to_string();
        node.append(close);
        node
    }

    fn gen_table(&self, n: &Handle, tip: &'a AstNode<'a>) -> Option<&'a AstNode<'a>> {
        let table_el = dom::find_element(n, "table")?;
        let thead = dom::find_element(&table_el, "thead")?;
        let head_tr = dom::find_element(&thead, "tr")?;

        let mut aligns = Vec::new();
        for th in dom::children_of(&head_tr) {
            if dom::element_name(&th).as_deref() != Some("th") {
                continue;
            }
            aligns.push(parse_align(&dom::attr_value(&th, "align")));
        }
        if aligns.is_empty() {
            return None;
        }

        let node = self.new_node(NodeValue::Table(NodeTable {
            aligns: aligns.clone(),
        }));
        tip.append(node);

        let head = self.new_node(NodeValue::TableHead);
        node.append(head);
        let hrow = self.new_node(NodeValue::TableRow);
        head.append(hrow);
        let mut col = 0;
        for th in dom::children_of(&head_tr) {
            if dom::element_name(&th).as_deref() != Some("th") {
                continue;
            }
            let cell = self.new_node(NodeValue::TableCell(
                aligns.get(col).copied().unwrap_or(TableAlignment::None),
            ));
            hrow.append(cell);
            for child in dom::children_of(&th) {
                self.gen_inline(&child, cell, true);
            }
            col += 1;
        }

        if let Some(tbody) = dom::find_element(&table_el, "tbody") {
            for tr in dom::children_of(&tbody) {
                if dom::element_name(&tr).as_deref() != Some("tr") {
                    continue;
                }
                let row = self.new_node(NodeValue::TableRow);
                node.append(row);
                let mut col = 0;
                for td in dom::children_of(&tr) {
                    if dom::element_name(&td).as_deref() != Some("td") {
                        continue;
                    }
                    let cell = self.new_node(NodeValue::TableCell(
                        aligns.get(col).copied().unwrap_or(TableAlignment::None),
                    ));
                    row.append(cell);
                    for child in dom::children_of(&td) {
                        self.gen_inline(&child, cell, true);
                    }
                    col += 1;
                }
            }
        }

        Some(node)
    }

    fn gen_inline(&self, n: &Handle, tip: &'a AstNode<'a>, in_table: bool) {
        if let Some(text) = dom::text_of(n) {
            if text.is_empty() {
                return;
            }
            let mut content = text;
            if in_table {
                content = content.replace('\n', "");
                // unescaped pipes would open new columns
                let pieces = crate::strings::split_without_backslash_escape(
                    content.as_bytes(),
                    b'|',
                );
                content = pieces
                    .iter()
                    .map(|p| String::from_utf8_lossy(p).into_owned())
                    .collect::<Vec<_>>()
                    .join("\\|");
            }
            tip.append(self.new_text(&content));
            return;
        }

        let name = match dom::element_name(n) {
            Some(name) => name,
            None => return,
        };
        let class = dom::class_value(n);
        if class == "svg" || class.contains("protyle-action") {
            return;
        }

        match name.as_str() {
            "span" => self.gen_span(n, tip, in_table),
            "br" => {
                if in_table {
                    tip.append(self.new_text("<br />"));
                } else {
                    tip.append(self.new_node(NodeValue::Br));
                }
            }
            "wbr" => {
                tip.append(self.new_text(editor::CARET));
            }
            "em" | "i" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Emph,
                NodeValue::EmphOpenMarker,
                NodeValue::EmphCloseMarker,
                "*",
            ),
            "strong" | "b" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Strong,
                NodeValue::StrongOpenMarker,
                NodeValue::StrongCloseMarker,
                "**",
            ),
            "s" | "del" | "strike" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Strikethrough,
                NodeValue::StrikethroughOpenMarker,
                NodeValue::StrikethroughCloseMarker,
                "~~",
            ),
            "mark" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Mark,
                NodeValue::MarkOpenMarker,
                NodeValue::MarkCloseMarker,
                "==",
            ),
            "sup" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Sup,
                NodeValue::SupOpenMarker,
                NodeValue::SupCloseMarker,
                "^",
            ),
            "sub" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Sub,
                NodeValue::SubOpenMarker,
                NodeValue::SubCloseMarker,
                "~",
            ),
            "u" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Underline,
                NodeValue::UnderlineOpenMarker,
                NodeValue::UnderlineCloseMarker,
                "<u>",
            ),
            "kbd" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Kbd,
                NodeValue::KbdOpenMarker,
                NodeValue::KbdCloseMarker,
                "<kbd>",
            ),
            "code" => {
                let content = dom::dom_text(n);
                let node = self.new_node(NodeValue::CodeSpan { backticks: 1 });
                tip.append(node);
                let om = self.new_node(NodeValue::CodeSpanOpenMarker);
                om.data.borrow_mut().tokens = "`".to_string();
                node.append(om);
                let c = self.new_node(NodeValue::CodeSpanContent);
                c.data.borrow_mut().tokens = content;
                node.append(c);
                let cm = self.new_node(NodeValue::CodeSpanCloseMarker);
                cm.data.borrow_mut().tokens = "`".to_string();
                node.append(cm);
            }
            "img" => self.gen_img(n, tip),
            "a" => {
                let href = dom::attr_value(n, "href");
                let title = dom::attr_value(n, "title");
                let text = dom::dom_text(n);
                if text.is_empty() {
                    // anchor artifact
                    return;
                }
                let link = self.new_node(NodeValue::Link(crate::nodes::LinkType::Inline));
                tip.append(link);
                link.append(self.new_node_tok(NodeValue::OpenBracket, "["));
                for child in dom::children_of(n) {
                    self.gen_inline(&child, link, in_table);
                }
                link.append(self.new_node_tok(NodeValue::CloseBracket, "]"));
                link.append(self.new_node_tok(NodeValue::OpenParen, "("));
                link.append(self.new_node_tok(NodeValue::LinkDest, &href));
                if !title.is_empty() {
                    link.append(self.new_node(NodeValue::LinkSpace));
                    link.append(self.new_node_tok(NodeValue::LinkTitle, &title));
                }
                link.append(self.new_node_tok(NodeValue::CloseParen, ")"));
            }
            _ => {
                for child in dom::children_of(n) {
                    self.gen_inline(&child, tip, in_table);
                }
            }
        }
    }

    fn new_node_tok(&self, value: NodeValue, tokens: &str) -> &'a AstNode<'a> {
        let node = self.new_node(value);
        node.data.borrow_mut().tokens = tokens.to_string();
        node
    }

    fn wrap_simple(
        &self,
        n: &Handle,
        tip: &'a AstNode<'a>,
        in_table: bool,
        value: NodeValue,
        open: NodeValue,
        close: NodeValue,
        marker: &str,
    ) {
        let close_marker = match marker {
            "<u>" => "</u>".to_string(),
            "<kbd>" => "</kbd>".to_string(),
            m => m.to_string(),
        };
        let node = self.new_node(value);
        tip.append(node);
        node.append(self.new_node_tok(open, marker));
        for child in dom::children_of(n) {
            self.gen_inline(&child, node, in_table);
        }
        node.append(self.new_node_tok(close, &close_marker));
    }

    fn gen_img(&self, n: &Handle, tip: &'a AstNode<'a>) {
        let class = dom::class_value(n);
        let src = dom::attr_value(n, "src");
        let alt = dom::attr_value(n, "alt");
        if class.contains("emoji") {
            let node = self.new_node(NodeValue::Emoji);
            tip.append(node);
            let img = self.new_node(NodeValue::EmojiImg);
            img.data.borrow_mut().tokens = src;
            let alias = self.new_node(NodeValue::EmojiAlias);
            alias.data.borrow_mut().tokens = format!(":{alt}:");
            img.append(alias);
            node.append(img);
            return;
        }

        let image = self.new_node(NodeValue::Image);
        tip.append(image);
        image.append(self.new_node_tok(NodeValue::Bang, "!"));
        image.append(self.new_node_tok(NodeValue::OpenBracket, "["));
        if !alt.is_empty() {
            image.append(self.new_text(&alt));
        }
        image.append(self.new_node_tok(NodeValue::CloseBracket, "]"));
        image.append(self.new_node_tok(NodeValue::OpenParen, "("));
        image.append(self.new_node_tok(NodeValue::LinkDest, &src));
        let title = dom::attr_value(n, "title");
        if !title.is_empty() {
            image.append(self.new_node(NodeValue::LinkSpace));
            image.append(self.new_node_tok(NodeValue::LinkTitle, &title));
        }
        image.append(self.new_node_tok(NodeValue::CloseParen, ")"));
    }

    fn gen_span(&self, n: &Handle, tip: &'a AstNode<'a>, in_table: bool) {
        let data_type = dom::attr_value(n, "data-type");
        if data_type.is_empty() {
            for child in dom::children_of(n) {
                self.gen_inline(&child, tip, in_table);
            }
            return;
        }

        let mut types: Vec<String> = data_type
            .split_ascii_whitespace()
            .map(|s| s.to_string())
            .collect();
        types.sort();
        types.dedup();

        if types.len() > 1 || self.options.text_mark && !types.iter().any(|t| t == "text") {
            let mut tm = NodeTextMark {
                types: types.clone(),
                text_content: dom::dom_text(n),
                a_href: dom::attr_value(n, "data-href"),
                a_title: dom::attr_value(n, "data-title"),
                ..Default::default()
            };
            if types.iter().any(|t| t == "block-ref") {
                tm.block_ref_id = dom::attr_value(n, "data-id");
                tm.block_ref_subtype = dom::attr_value(n, "data-subtype");
            }
            if types.iter().any(|t| t == "file-annotation-ref") {
                tm.file_annotation_ref_id = dom::attr_value(n, "data-id");
            }
            if types.iter().any(|t| t == "inline-math") {
                tm.inline_math_content = dom::attr_value(n, "data-content");
            }
            if types.iter().any(|t| t == "inline-memo") {
                tm.inline_memo_content = dom::attr_value(n, "data-memo");
            }
            let node = self.new_node(NodeValue::TextMark(tm));
            tip.append(node);
            return;
        }

        match types[0].as_str() {
            "strong" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Strong,
                NodeValue::StrongOpenMarker,
                NodeValue::StrongCloseMarker,
                "**",
            ),
            "em" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Emph,
                NodeValue::EmphOpenMarker,
                NodeValue::EmphCloseMarker,
                "*",
            ),
            "s" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Strikethrough,
                NodeValue::StrikethroughOpenMarker,
                NodeValue::StrikethroughCloseMarker,
                "~~",
            ),
            "u" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Underline,
                NodeValue::UnderlineOpenMarker,
                NodeValue::UnderlineCloseMarker,
                "<u>",
            ),
            "mark" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Mark,
                NodeValue::MarkOpenMarker,
                NodeValue::MarkCloseMarker,
                "==",
            ),
            "sup" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Sup,
                NodeValue::SupOpenMarker,
                NodeValue::SupCloseMarker,
                "^",
            ),
            "sub" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Sub,
                NodeValue::SubOpenMarker,
                NodeValue::SubCloseMarker,
                "~",
            ),
            "kbd" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Kbd,
                NodeValue::KbdOpenMarker,
                NodeValue::KbdCloseMarker,
                "<kbd>",
            ),
            "tag" => self.wrap_simple(
                n,
                tip,
                in_table,
                NodeValue::Tag,
                NodeValue::TagOpenMarker,
                NodeValue::TagCloseMarker,
                "#",
            ),
            "code" => {
                let content = dom::dom_text(n);
                let node = self.new_node(NodeValue::CodeSpan { backticks: 1 });
                tip.append(node);
                node.append(self.new_node_tok(NodeValue::CodeSpanOpenMarker, "`"));
                node.append(self.new_node_tok(NodeValue::CodeSpanContent, &content));
                node.append(self.new_node_tok(NodeValue::CodeSpanCloseMarker, "`"));
            }
            "inline-math" => {
                let content = dom::attr_value(n, "data-content");
                let node = self.new_node(NodeValue::InlineMath);
                tip.append(node);
                node.append(self.new_node_tok(NodeValue::InlineMathOpenMarker, "$"));
                node.append(self.new_node_tok(NodeValue::InlineMathContent, &content));
                node.append(self.new_node_tok(NodeValue::InlineMathCloseMarker, "$"));
            }
            "a" => {
                let href = dom::attr_value(n, "data-href");
                let title = dom::attr_value(n, "data-title");
                let link = self.new_node(NodeValue::Link(crate::nodes::LinkType::Inline));
                tip.append(link);
                link.append(self.new_node_tok(NodeValue::OpenBracket, "["));
                for child in dom::children_of(n) {
                    self.gen_inline(&child, link, in_table);
                }
                link.append(self.new_node_tok(NodeValue::CloseBracket, "]"));
                link.append(self.new_node_tok(NodeValue::OpenParen, "("));
                link.append(self.new_node_tok(NodeValue::LinkDest, &href));
                if !title.is_empty() {
                    link.append(self.new_node(NodeValue::LinkSpace));
                    link.append(self.new_node_tok(NodeValue::LinkTitle, &title));
                }
                link.append(self.new_node_tok(NodeValue::CloseParen, ")"));
            }
            "block-ref" => {
                let id = dom::attr_value(n, "data-id");
                let subtype = dom::attr_value(n, "data-subtype");
                let text = dom::dom_text(n);
                let node = self.new_node(NodeValue::BlockRef);
                tip.append(node);
                node.append(self.new_node_tok(NodeValue::OpenParen, "("));
                node.append(self.new_node_tok(NodeValue::OpenParen, "("));
                node.append(self.new_node_tok(NodeValue::BlockRefID, &id));
                if !text.is_empty() {
                    node.append(self.new_node(NodeValue::BlockRefSpace));
                    let value = if subtype == "d" {
                        NodeValue::BlockRefDynamicText
                    } else {
                        NodeValue::BlockRefText
                    };
                    node.append(self.new_node_tok(value, &text));
                }
                node.append(self.new_node_tok(NodeValue::CloseParen, ")"));
                node.append(self.new_node_tok(NodeValue::CloseParen, ")"));
            }
            "file-annotation-ref" => {
                let id = dom::attr_value(n, "data-id");
                let text = dom::dom_text(n);
                let node = self.new_node(NodeValue::FileAnnotationRef);
                tip.append(node);
                node.append(self.new_node_tok(NodeValue::FileAnnotationRefID, &id));
                if !text.is_empty() {
                    node.append(self.new_node(NodeValue::FileAnnotationRefSpace));
                    node.append(self.new_node_tok(NodeValue::FileAnnotationRefText, &text));
                }
            }
            "backslash" => {
                let node = self.new_node(NodeValue::Backslash);
                tip.append(node);
                let content = dom::dom_text(n).trim_start_matches('\\').to_string();
                node.append(self.new_node_tok(NodeValue::BackslashContent, &content));
            }
            _ => {
                let text = dom::dom_text(n);
                if !text.is_empty() {
                    tip.append(self.new_text(&text));
                }
            }
        }
    }
}

pub(crate) fn parse_align(align: &str) -> TableAlignment {
    match align {
        "left" => TableAlignment::Left,
        "center" => TableAlignment::Center,
        "right" => TableAlignment::Right,
        _ => TableAlignment::None,
    }
}

/// Copies the editor's block attributes off the wrapper element into the
/// node's attribute list, custom attributes and table colgroup included.
pub(crate) fn set_block_ial_attrs(n: &Handle, ast: &mut Ast) {
    for name in [
        "refcount",
        "bookmark",
        "style",
        "name",
        "memo",
        "alias",
        "fold",
        "heading-fold",
        "parent-fold",
        "updated",
        "linewrap",
        "ligatures",
        "linenumber",
        "breadcrumb",
        "data-export-md",
        "data-export-html",
    ] {
        let v = dom::attr_value(n, name);
        if !v.is_empty() {
            ast.set_ial_attr(name, &crate::entity::unescape_html(&v));
        }
    }

    for (k, v) in dom::custom_attrs(n) {
        ast.set_ial_attr(&k, &crate::entity::unescape_html(&v));
    }

    if dom::attr_value(n, "data-type") == "NodeTable" {
        if let Some(colgroup) = dom::find_element(n, "colgroup") {
            let styles: Vec<String> = dom::children_of(&colgroup)
                .iter()
                .filter(|c| dom::element_name(c).as_deref() == Some("col"))
                .map(|c| dom::attr_value(c, "style"))
                .collect();
            if !styles.is_empty() {
                ast.set_ial_attr("colgroup", &styles.join("|"));
            }
        }
    }
}

pub(crate) fn serialize_simple(el: &Handle, tag: &str) -> String {
    let mut out = format!("<{tag}");
    if let NodeData::Element { ref attrs, .. } = el.data {
        for attr in attrs.borrow().iter() {
            out.push(' ');
            out.push_str(attr.name.local.as_ref());
            out.push_str("=\"");
            out.push_str(&crate::parser::ial::escape_attr_value(&attr.value));
            out.push('"');
        }
    }
    out.push_str(&format!("></{tag}>"));
    out
}

/// Post-parse normalization: fold NBSP into spaces, merge adjacent
/// same-type spans, lift `ul>ul` nests into the preceding item, and
/// keep adjacent same-type decorators apart with a marker separator.
pub(crate) fn normalize_tree<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>) {
    // NBSP fold
    for n in root.descendants() {
        let mut ast = n.data.borrow_mut();
        if matches!(ast.value, NodeValue::Text) && ast.tokens.contains('\u{a0}') {
            ast.tokens = ast.tokens.replace('\u{a0}', " ");
        }
    }

    // ul > ul: the nested list belongs inside the preceding item
    let mut to_wrap = Vec::new();
    for n in root.descendants() {
        if matches!(n.data.borrow().value, NodeValue::List(..)) {
            if let Some(parent) = n.parent() {
                if matches!(parent.data.borrow().value, NodeValue::List(..)) {
                    to_wrap.push(n);
                }
            }
        }
    }
    for list in to_wrap {
        if let Some(prev) = list.previous_sibling() {
            if matches!(prev.data.borrow().value, NodeValue::ListItem(..)) {
                list.detach();
                prev.append(list);
            }
        }
    }

    // merge adjacent same-type code spans and textmarks
    let mut cursor: Vec<&'a AstNode<'a>> = root.descendants().collect();
    for n in cursor.drain(..) {
        let next = match n.next_sibling() {
            Some(nx) => nx,
            None => continue,
        };
        let same_code = {
            let a = n.data.borrow();
            let b = next.data.borrow();
            matches!(a.value, NodeValue::CodeSpan { .. })
                && matches!(b.value, NodeValue::CodeSpan { .. })
        };
        if same_code {
            let extra = next
                .children()
                .find(|c| matches!(c.data.borrow().value, NodeValue::CodeSpanContent))
                .map(|c| c.data.borrow().tokens.clone())
                .unwrap_or_default();
            if let Some(content) = n
                .children()
                .find(|c| matches!(c.data.borrow().value, NodeValue::CodeSpanContent))
            {
                content.data.borrow_mut().tokens.push_str(&extra);
                next.detach();
            }
            continue;
        }

        let same_mark = {
            let a = n.data.borrow();
            let b = next.data.borrow();
            match (&a.value, &b.value) {
                (NodeValue::TextMark(x), NodeValue::TextMark(y)) => {
                    x.sorted_types() == y.sorted_types() && x.a_href == y.a_href
                }
                _ => false,
            }
        };
        if same_mark {
            let extra = match &next.data.borrow().value {
                NodeValue::TextMark(y) => y.text_content.clone(),
                _ => String::new(),
            };
            if let NodeValue::TextMark(ref mut x) = n.data.borrow_mut().value {
                x.text_content.push_str(&extra);
            }
            next.detach();
        }
    }

    // a marker separator keeps `**a**``**b**` from collapsing
    let mut separators = Vec::new();
    for n in root.descendants() {
        if let Some(next) = n.next_sibling() {
            let same_emph = {
                let a = n.data.borrow();
                let b = next.data.borrow();
                let ka = a.value.kind();
                ka == b.value.kind()
                    && matches!(
                        a.value,
                        NodeValue::Strong | NodeValue::Emph | NodeValue::Strikethrough
                    )
            };
            if same_emph {
                separators.push(n);
            }
        }
    }
    for n in separators {
        let sep = arena.alloc(Node::new(RefCell::new(Ast::with_tokens(
            NodeValue::Text,
            editor::ZWSP,
        ))));
        sep.data.borrow_mut().open = false;
        n.insert_after(sep);
    }
}
