//! The Markdown format renderer: emits canonical Markdown that
//! re-parses to the same tree. Serves the editor round trip and, in
//! export mode, persisted export.

use crate::editor;
use crate::nodes::{
    self, AstNode, LinkType, ListType, NodeTextMark, NodeValue, WalkStatus,
};
use crate::parser::RenderOptions;
use crate::render::{text_post, RenderCore};

pub struct FormatRenderer<'o> {
    pub(crate) core: RenderCore<'o>,
    /// Export mode resolves editor references to plain anchors and
    /// strips cursor artifacts.
    pub(crate) export_mode: bool,
}

impl<'o> FormatRenderer<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        FormatRenderer {
            core: RenderCore::new(options),
            export_mode: false,
        }
    }

    pub fn render<'a>(&mut self, root: &'a AstNode<'a>) -> String {
        nodes::walk(root, &mut |node, entering| self.render_node(node, entering));
        let mut out = self.core.take_output();
        while out.ends_with('\n') || out.ends_with(' ') {
            out.pop();
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    fn w(&mut self, s: &str) {
        self.core.write_str(s);
    }

    fn render_children_to_string<'a>(&mut self, node: &'a AstNode<'a>) -> String {
        self.core.push_writer();
        let mut child = node.first_child();
        while let Some(c) = child {
            nodes::walk(c, &mut |n, entering| self.render_node(n, entering));
            child = c.next_sibling();
        }
        self.core.pop_writer()
    }

    fn text_tokens(&self, tokens: &str) -> String {
        let mut t = text_post(self.core.options, tokens);
        if self.export_mode {
            t = editor::strip_caret(&editor::strip_zwsp(&t));
        }
        t
    }

    pub(crate) fn render_node<'a>(&mut self, node: &'a AstNode<'a>, entering: bool) -> WalkStatus {
        if let Some(status) = self.core.ext_render(node, entering) {
            return status;
        }

        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Document => {
                if !entering {
                    self.core.newline();
                }
            }
            NodeValue::Paragraph => {
                if !entering {
                    if in_tight_list(node) {
                        self.core.newline();
                    } else {
                        self.core.blank_line();
                    }
                }
            }
            NodeValue::Text => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    let t = self.text_tokens(&tokens);
                    self.w(&t);
                }
            }
            NodeValue::SoftBreak => {
                if entering {
                    self.w("\n");
                }
            }
            NodeValue::HardBreak => {
                if entering {
                    self.w("\\\n");
                }
            }
            NodeValue::Br => {
                if entering {
                    self.w("\n");
                }
            }
            NodeValue::Heading(nh) => {
                if entering {
                    self.w(&"#".repeat(nh.level as usize));
                    self.w(" ");
                } else {
                    self.core.blank_line();
                }
            }
            NodeValue::HeadingID => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&format!(" {{{tokens}}}"));
                }
            }
            NodeValue::Blockquote => {
                if entering {
                    self.core.push_writer();
                } else {
                    let buf = self.core.pop_writer();
                    let prefixed = prefix_lines(buf.trim_end_matches('\n'), "> ", "> ");
                    self.w(&prefixed);
                    self.core.blank_line();
                }
            }
            NodeValue::List(..) => {
                if !entering {
                    self.core.blank_line();
                }
            }
            NodeValue::ListItem(nl) => {
                if entering {
                    self.core.push_writer();
                } else {
                    let buf = self.core.pop_writer();
                    let marker = item_marker(node, &nl);
                    let indent = " ".repeat(marker.len());
                    let prefixed = prefix_lines(buf.trim_end_matches('\n'), &marker, &indent);
                    self.w(&prefixed);
                    if nl.tight {
                        self.core.newline();
                    } else {
                        self.core.blank_line();
                    }
                }
            }
            NodeValue::TaskListItemMarker { checked } => {
                if entering {
                    self.w(if checked { "[X] " } else { "[ ] " });
                }
            }
            NodeValue::ThematicBreak => {
                if entering {
                    self.w("---");
                    self.core.blank_line();
                }
            }
            NodeValue::CodeBlock(ncb) => {
                if entering {
                    let fence_char = if ncb.fence_char == 0 {
                        '`'
                    } else {
                        ncb.fence_char as char
                    };
                    let fence = fence_char
                        .to_string()
                        .repeat(ncb.fence_len.max(3));
                    let code = code_block_code(node);
                    self.w(&fence);
                    self.w(&ncb.info);
                    self.w("\n");
                    self.w(&code);
                    self.core.newline();
                    self.w(&fence);
                    self.core.blank_line();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::HtmlBlock(..) => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(tokens.trim_end_matches('\n'));
                    self.core.blank_line();
                }
            }
            NodeValue::InlineHtml => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::MathBlock => {
                if entering {
                    self.w("$$\n");
                } else {
                    self.core.newline();
                    self.w("$$");
                    self.core.blank_line();
                }
            }
            NodeValue::MathBlockContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::MathBlockOpenMarker | NodeValue::MathBlockCloseMarker => {}
            NodeValue::InlineMath | NodeValue::CodeSpan { .. } => {}
            NodeValue::InlineMathOpenMarker | NodeValue::InlineMathCloseMarker => {
                if entering {
                    self.w("$");
                }
            }
            NodeValue::InlineMathContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::CodeSpanOpenMarker
            | NodeValue::CodeSpanCloseMarker
            | NodeValue::CodeSpanContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::Emph
            | NodeValue::Strong
            | NodeValue::Strikethrough
            | NodeValue::Mark
            | NodeValue::Sup
            | NodeValue::Sub
            | NodeValue::Underline
            | NodeValue::Kbd
            | NodeValue::Tag => {}
            NodeValue::EmphOpenMarker
            | NodeValue::EmphCloseMarker
            | NodeValue::StrongOpenMarker
            | NodeValue::StrongCloseMarker
            | NodeValue::StrikethroughOpenMarker
            | NodeValue::StrikethroughCloseMarker
            | NodeValue::MarkOpenMarker
            | NodeValue::MarkCloseMarker
            | NodeValue::SupOpenMarker
            | NodeValue::SupCloseMarker
            | NodeValue::SubOpenMarker
            | NodeValue::SubCloseMarker
            | NodeValue::UnderlineOpenMarker
            | NodeValue::UnderlineCloseMarker
            | NodeValue::KbdOpenMarker
            | NodeValue::KbdCloseMarker
            | NodeValue::TagOpenMarker
            | NodeValue::TagCloseMarker => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::Link(link_type) => {
                if entering {
                    match link_type {
                        LinkType::Auto => {
                            let dest = child_tokens(node, |v| {
                                matches!(v, NodeValue::LinkText)
                            });
                            self.w(&format!("<{dest}>"));
                            return WalkStatus::SkipChildren;
                        }
                        LinkType::AutoBare => {
                            let text = child_tokens(node, |v| {
                                matches!(v, NodeValue::LinkText)
                            });
                            self.w(&text);
                            return WalkStatus::SkipChildren;
                        }
                        _ => {}
                    }
                }
            }
            NodeValue::Image => {}
            NodeValue::Bang => {
                if entering {
                    self.w("!");
                }
            }
            NodeValue::OpenBracket => {
                if entering {
                    self.w("[");
                }
            }
            NodeValue::CloseBracket => {
                if entering {
                    self.w("]");
                }
            }
            NodeValue::OpenParen => {
                if entering {
                    self.w("(");
                }
            }
            NodeValue::CloseParen => {
                if entering {
                    self.w(")");
                }
            }
            NodeValue::OpenBrace => {
                if entering {
                    self.w("{");
                }
            }
            NodeValue::CloseBrace => {
                if entering {
                    self.w("}");
                }
            }
            NodeValue::LinkText => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&self.text_tokens(&tokens));
                }
            }
            NodeValue::LinkDest => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    if tokens.contains(' ') && !tokens.starts_with('<') {
                        self.w(&format!("<{tokens}>"));
                    } else {
                        self.w(&tokens);
                    }
                }
            }
            NodeValue::LinkSpace => {
                if entering {
                    self.w(" ");
                }
            }
            NodeValue::LinkTitle => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&format!("\"{tokens}\""));
                }
            }
            NodeValue::LinkRefDefBlock => {}
            NodeValue::LinkRefDef => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                    self.core.newline();
                }
            }
            NodeValue::BlockRef => {
                if self.export_mode {
                    if entering {
                        let text = child_tokens(node, |v| {
                            matches!(
                                v,
                                NodeValue::BlockRefText | NodeValue::BlockRefDynamicText
                            )
                        });
                        let id = child_tokens(node, |v| matches!(v, NodeValue::BlockRefID));
                        if text.is_empty() {
                            self.w(&id);
                        } else {
                            self.w(&editor::strip_caret(&text));
                        }
                    }
                    return WalkStatus::SkipChildren;
                }
            }
            NodeValue::BlockRefID => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::BlockRefSpace => {
                if entering {
                    self.w(" ");
                }
            }
            NodeValue::BlockRefText => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&format!("\"{tokens}\""));
                }
            }
            NodeValue::BlockRefDynamicText => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&format!("'{tokens}'"));
                }
            }
            NodeValue::FileAnnotationRef => {
                if self.export_mode {
                    if entering {
                        let text = child_tokens(node, |v| {
                            matches!(v, NodeValue::FileAnnotationRefText)
                        });
                        self.w(&editor::strip_caret(&text));
                    }
                    return WalkStatus::SkipChildren;
                }
                if entering {
                    self.w("<<");
                } else {
                    self.w(">>");
                }
            }
            NodeValue::FileAnnotationRefID => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::FileAnnotationRefSpace => {
                if entering {
                    self.w(" ");
                }
            }
            NodeValue::FileAnnotationRefText => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&format!("\"{tokens}\""));
                }
            }
            NodeValue::FootnotesRef { .. } => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&format!("[^{tokens}]"));
                }
            }
            NodeValue::FootnotesDefBlock => {}
            NodeValue::FootnotesDef => {
                if entering {
                    self.core.push_writer();
                } else {
                    let label = node.data.borrow().tokens.clone();
                    let buf = self.core.pop_writer();
                    let marker = format!("[^{label}]: ");
                    let prefixed =
                        prefix_lines(buf.trim_end_matches('\n'), &marker, "    ");
                    self.w(&prefixed);
                    self.core.blank_line();
                }
            }
            NodeValue::Table(ref nt) => {
                if entering {
                    self.render_table(node, &nt.aligns);
                    self.core.blank_line();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::TableHead | NodeValue::TableRow | NodeValue::TableCell(..) => {}
            NodeValue::Emoji => {}
            NodeValue::EmojiUnicode => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::EmojiImg => {
                if entering {
                    let alias = child_tokens(node, |v| matches!(v, NodeValue::EmojiAlias));
                    self.w(&alias);
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::EmojiAlias => {}
            NodeValue::HtmlEntity => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::Backslash => {
                if entering {
                    self.w("\\");
                }
            }
            NodeValue::BackslashContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::YamlFrontMatter => {
                if entering {
                    self.w("---\n");
                } else {
                    self.core.newline();
                    self.w("---");
                    self.core.blank_line();
                }
            }
            NodeValue::YamlFrontMatterContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::YamlFrontMatterOpenMarker | NodeValue::YamlFrontMatterCloseMarker => {}
            NodeValue::Toc => {
                if entering {
                    self.w("[toc]");
                    self.core.blank_line();
                }
            }
            NodeValue::KramdownBlockIAL => {
                if entering && self.core.options.kramdown_block_ial {
                    let tokens = node.data.borrow().tokens.clone();
                    // the IAL rides directly under its block
                    let w = self.core.w();
                    while w.ends_with("\n\n") {
                        w.pop();
                    }
                    self.core.newline();
                    self.w(&tokens);
                    self.core.blank_line();
                }
            }
            NodeValue::KramdownSpanIAL => {
                if entering && self.core.options.kramdown_span_ial {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::SuperBlock => {
                if !entering {
                    self.core.blank_line();
                }
            }
            NodeValue::SuperBlockOpenMarker => {
                if entering {
                    self.w("{{{");
                }
            }
            NodeValue::SuperBlockLayoutMarker => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                    self.w("\n");
                }
            }
            NodeValue::SuperBlockCloseMarker => {
                if entering {
                    self.core.newline();
                    self.w("}}}");
                }
            }
            NodeValue::BlockQueryEmbed => {
                if entering {
                    let script = child_tokens(node, |v| {
                        matches!(v, NodeValue::BlockQueryEmbedScript)
                    });
                    let script = script.replace(editor::IAL_VAL_ESC_NEWLINE, "\n");
                    self.w(&format!("{{{{{script}}}}}"));
                    self.core.blank_line();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::BlockQueryEmbedScript => {}
            NodeValue::GitConflict => {
                if !entering {
                    self.core.blank_line();
                }
            }
            NodeValue::GitConflictOpenMarker | NodeValue::GitConflictCloseMarker => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                    self.w("\n");
                }
            }
            NodeValue::GitConflictContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                    self.w("\n");
                }
            }
            NodeValue::CustomBlock { ref info } => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(";;;");
                    self.w(info);
                    self.w("\n");
                    self.w(tokens.trim_end_matches('\n'));
                    self.core.newline();
                    self.w(";;;");
                    self.core.blank_line();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::AttributeView(..) => {
                if entering {
                    self.core.blank_line();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::IFrame | NodeValue::Video | NodeValue::Audio | NodeValue::Widget => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                    self.core.blank_line();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::TextMark(ref tm) => {
                if entering {
                    let md = textmark_to_md(tm);
                    self.w(&md);
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::CodeBlockFenceOpenMarker
            | NodeValue::CodeBlockFenceInfoMarker
            | NodeValue::CodeBlockCode
            | NodeValue::CodeBlockFenceCloseMarker => {}
        }

        WalkStatus::Continue
    }

    fn render_table<'a>(&mut self, table: &'a AstNode<'a>, aligns: &[nodes::TableAlignment]) {
        let mut head_cells: Vec<String> = Vec::new();
        let mut body_rows: Vec<Vec<String>> = Vec::new();

        for child in table.children() {
            let kind = child.data.borrow().value.kind();
            match kind {
                nodes::NodeKind::TableHead => {
                    for row in child.children() {
                        for cell in row.children() {
                            head_cells.push(
                                self.render_children_to_string(cell).trim().to_string(),
                            );
                        }
                    }
                }
                nodes::NodeKind::TableRow => {
                    let mut cells = Vec::new();
                    for cell in child.children() {
                        cells.push(self.render_children_to_string(cell).trim().to_string());
                    }
                    body_rows.push(cells);
                }
                _ => {}
            }
        }

        self.w("|");
        for cell in &head_cells {
            self.w(&format!(" {cell} |"));
        }
        self.w("\n|");
        for align in aligns {
            let d = match align {
                nodes::TableAlignment::None => " --- |",
                nodes::TableAlignment::Left => " :-- |",
                nodes::TableAlignment::Center => " :-: |",
                nodes::TableAlignment::Right => " --: |",
            };
            self.w(d);
        }
        self.w("\n");
        for row in &body_rows {
            self.w("|");
            for cell in row {
                self.w(&format!(" {cell} |"));
            }
            self.w("\n");
        }
    }
}

/// Markdown rendering of a multi-type textmark span.
pub(crate) fn textmark_to_md(tm: &NodeTextMark) -> String {
    let mut types = tm.types.clone();
    types.sort();
    types.dedup();

    let mut content = tm.text_content.clone();
    for t in types.iter().rev() {
        content = match t.as_str() {
            "strong" => format!("**{content}**"),
            "em" => format!("*{content}*"),
            "s" => format!("~~{content}~~"),
            "mark" => format!("=={content}=="),
            "sup" => format!("^{content}^"),
            "sub" => format!("~{content}~"),
            "u" => format!("<u>{content}</u>"),
            "kbd" => format!("<kbd>{content}</kbd>"),
            "tag" => format!("#{content}#"),
            "code" => format!("`{content}`"),
            "a" => format!("[{content}]({})", tm.a_href),
            "inline-math" => format!("${}$", tm.inline_math_content),
            "block-ref" => {
                let quote = if tm.block_ref_subtype == "d" { '\'' } else { '"' };
                format!("(({} {quote}{content}{quote}))", tm.block_ref_id)
            }
            "file-annotation-ref" => {
                format!("<<{} \"{content}\">>", tm.file_annotation_ref_id)
            }
            _ => content,
        };
    }
    content
}

/// The final text of an indented or fenced code block.
fn code_block_code<'a>(node: &'a AstNode<'a>) -> String {
    for child in node.children() {
        let ast = child.data.borrow();
        if matches!(ast.value, NodeValue::CodeBlockCode) {
            return ast.tokens.clone();
        }
    }
    node.data.borrow().tokens.clone()
}

fn child_tokens<'a>(node: &'a AstNode<'a>, pred: impl Fn(&NodeValue) -> bool) -> String {
    for child in node.children() {
        let ast = child.data.borrow();
        if pred(&ast.value) {
            return ast.tokens.clone();
        }
    }
    String::new()
}

/// Whether `node` is a paragraph directly inside a tight list item.
fn in_tight_list<'a>(node: &'a AstNode<'a>) -> bool {
    match node.parent() {
        Some(parent) => match parent.data.borrow().value {
            NodeValue::ListItem(nl) => nl.tight,
            _ => false,
        },
        None => false,
    }
}

/// Applies a first-line marker and a continuation prefix to a block
/// buffer, preserving interior structure.
pub(crate) fn prefix_lines(buf: &str, first: &str, rest: &str) -> String {
    let mut out = String::with_capacity(buf.len() + first.len() * 4);
    for (i, line) in buf.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let prefix = if i == 0 { first } else { rest };
        if line.is_empty() {
            out.push_str(prefix.trim_end());
        } else {
            out.push_str(prefix);
            out.push_str(line);
        }
    }
    out.push('\n');
    out
}

/// The list-item marker text for an item node.
pub(crate) fn item_marker<'a>(item: &'a AstNode<'a>, nl: &nodes::NodeList) -> String {
    match nl.list_type {
        ListType::Bullet | ListType::Task => {
            let c = if nl.bullet_char == 0 {
                b'*'
            } else {
                nl.bullet_char
            };
            format!("{} ", c as char)
        }
        ListType::Ordered => {
            let mut ix = 0;
            let mut prev = item.previous_sibling();
            while let Some(p) = prev {
                if matches!(p.data.borrow().value, NodeValue::ListItem(..)) {
                    ix += 1;
                }
                prev = p.previous_sibling();
            }
            let start = match item.parent().map(|l| l.data.borrow().value.clone()) {
                Some(NodeValue::List(pl)) => pl.start.max(1),
                _ => nl.start.max(1),
            };
            let delim = match nl.delimiter {
                nodes::ListDelimType::Period => '.',
                nodes::ListDelimType::Paren => ')',
            };
            format!("{}{} ", start + ix, delim)
        }
    }
}
