//! Editor block-DOM renderer: emits the structural HTML the block
//! editor consumes, per the block-DOM wire contract (`data-node-id`,
//! `data-type`, kind-specific `data-*`, inline marks as typed spans).

use crate::editor;
use crate::nodes::{
    self, new_node_id, AstNode, LinkType, ListType, NodeValue, TableAlignment, WalkStatus,
};
use crate::parser::RenderOptions;
use crate::render::html::code_tokens;
use crate::render::{escape_html, escape_href, RenderCore};

pub struct BlockDomRenderer<'o> {
    pub(crate) core: RenderCore<'o>,
}

impl<'o> BlockDomRenderer<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        BlockDomRenderer {
            core: RenderCore::new(options),
        }
    }

    pub fn render<'a>(&mut self, root: &'a AstNode<'a>) -> String {
        nodes::walk(root, &mut |node, entering| self.render_node(node, entering));
        self.core.take_output()
    }

    fn w(&mut self, s: &str) {
        self.core.write_str(s);
    }

    /// Emits the caret for the editor.
    fn text(&mut self, tokens: &str) -> String {
        escape_html(tokens).replace(editor::CARET, editor::FRONT_END_CARET)
    }

    fn open_block<'a>(&mut self, node: &'a AstNode<'a>, extra: &[(&str, String)]) {
        let ast = node.data.borrow();
        let id = match ast.id() {
            Some(id) => id.to_string(),
            None => new_node_id(),
        };
        let kind_name = ast.kind().name();
        self.w(&format!("<div data-node-id=\"{id}\" data-type=\"{kind_name}\""));
        for (k, v) in extra {
            self.w(&format!(" {k}=\"{}\"", escape_html(v)));
        }
        for (k, v) in &ast.ial {
            if k == "id" || k == "colgroup" {
                continue;
            }
            self.w(&format!(
                " {k}=\"{}\"",
                crate::parser::ial::escape_attr_value(v)
            ));
        }
        self.w(">");
    }

    fn editable_open(&mut self) {
        let spellcheck = if self.core.options.spellcheck {
            "true"
        } else {
            "false"
        };
        self.w(&format!(
            "<div contenteditable=\"true\" spellcheck=\"{spellcheck}\">"
        ));
    }

    fn close_block(&mut self) {
        self.w(&format!(
            "<div class=\"protyle-attr\" contenteditable=\"false\">{}</div></div>",
            editor::ZWSP
        ));
    }

    pub(crate) fn render_node<'a>(&mut self, node: &'a AstNode<'a>, entering: bool) -> WalkStatus {
        if let Some(status) = self.core.ext_render(node, entering) {
            return status;
        }

        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Document => {}
            NodeValue::Paragraph => {
                if entering {
                    self.open_block(node, &[("class", "p".to_string())]);
                    self.editable_open();
                } else {
                    self.w("</div>");
                    self.close_block();
                }
            }
            NodeValue::Heading(nh) => {
                if entering {
                    self.open_block(
                        node,
                        &[("data-subtype", format!("h{}", nh.level)), ("class", format!("h{}", nh.level))],
                    );
                    self.editable_open();
                } else {
                    self.w("</div>");
                    self.close_block();
                }
            }
            NodeValue::HeadingID => return WalkStatus::SkipChildren,
            NodeValue::Blockquote => {
                if entering {
                    self.open_block(node, &[("class", "bq".to_string())]);
                } else {
                    self.close_block();
                }
            }
            NodeValue::List(nl) => {
                if entering {
                    let subtype = list_subtype(nl.list_type);
                    let marker = list_marker_attr(&nl);
                    self.open_block(
                        node,
                        &[
                            ("data-subtype", subtype.to_string()),
                            ("data-marker", marker),
                            ("class", "list".to_string()),
                        ],
                    );
                } else {
                    self.close_block();
                }
            }
            NodeValue::ListItem(nl) => {
                if entering {
                    let subtype = list_subtype(nl.list_type);
                    let marker = super::format::item_marker(node, &nl)
                        .trim_end()
                        .to_string();
                    let mut class = "li".to_string();
                    if nl.list_type == ListType::Task && item_checked(node) {
                        class.push_str(" protyle-task--done");
                    }
                    self.open_block(
                        node,
                        &[
                            ("data-subtype", subtype.to_string()),
                            ("data-marker", marker),
                            ("class", class),
                        ],
                    );
                } else {
                    self.close_block();
                }
            }
            NodeValue::TaskListItemMarker { .. } => return WalkStatus::SkipChildren,
            NodeValue::ThematicBreak => {
                if entering {
                    self.open_block(node, &[("class", "hr".to_string())]);
                    self.w("<div><hr /></div>");
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::CodeBlock(ncb) => {
                if entering {
                    let code = code_tokens(node);
                    // the sentinel stays raw inside attribute values
                    self.open_block(
                        node,
                        &[
                            ("data-subtype", ncb.info.clone()),
                            ("data-content", code),
                            ("class", "code-block".to_string()),
                        ],
                    );
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::MathBlock => {
                if entering {
                    let content =
                        child_tokens(node, |v| matches!(v, NodeValue::MathBlockContent));
                    self.open_block(
                        node,
                        &[
                            ("data-subtype", "math".to_string()),
                            ("data-content", content),
                            ("class", "render-node".to_string()),
                        ],
                    );
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::HtmlBlock(..) => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.open_block(node, &[("class", "render-node".to_string())]);
                    self.w(&format!(
                        "<protyle-html data-content=\"{}\"></protyle-html>",
                        crate::parser::ial::escape_attr_value(tokens.trim_end_matches('\n'))
                    ));
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::Table(ref nt) => {
                if entering {
                    self.render_table(node, &nt.aligns);
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::SuperBlock => {
                if entering {
                    let layout =
                        child_tokens(node, |v| matches!(v, NodeValue::SuperBlockLayoutMarker));
                    self.open_block(
                        node,
                        &[
                            ("data-sb-layout", layout),
                            ("class", "sb".to_string()),
                        ],
                    );
                } else {
                    self.close_block();
                }
            }
            NodeValue::SuperBlockOpenMarker
            | NodeValue::SuperBlockLayoutMarker
            | NodeValue::SuperBlockCloseMarker => return WalkStatus::SkipChildren,
            NodeValue::BlockQueryEmbed => {
                if entering {
                    let script =
                        child_tokens(node, |v| matches!(v, NodeValue::BlockQueryEmbedScript));
                    let script = script.replace(editor::IAL_VAL_ESC_NEWLINE, "\n");
                    self.open_block(
                        node,
                        &[
                            ("data-content", script),
                            ("class", "render-node".to_string()),
                        ],
                    );
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::AttributeView(ref av) => {
                if entering {
                    self.open_block(
                        node,
                        &[
                            ("data-av-id", av.av_id.clone()),
                            ("data-av-type", av.av_type.clone()),
                        ],
                    );
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::IFrame | NodeValue::Video | NodeValue::Audio | NodeValue::Widget => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.open_block(node, &[("class", "iframe".to_string())]);
                    self.w("<div class=\"iframe-content\">");
                    self.w(&tokens);
                    self.w("</div>");
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::YamlFrontMatter => {
                if entering {
                    let content =
                        child_tokens(node, |v| matches!(v, NodeValue::YamlFrontMatterContent));
                    self.open_block(node, &[("data-content", content)]);
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::GitConflict => {
                if entering {
                    let open =
                        child_tokens(node, |v| matches!(v, NodeValue::GitConflictOpenMarker));
                    let content =
                        child_tokens(node, |v| matches!(v, NodeValue::GitConflictContent));
                    let close =
                        child_tokens(node, |v| matches!(v, NodeValue::GitConflictCloseMarker));
                    self.open_block(
                        node,
                        &[(
                            "data-content",
                            format!("{open}\n{content}\n{close}"),
                        )],
                    );
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::CustomBlock { ref info } => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.open_block(
                        node,
                        &[
                            ("data-info", info.clone()),
                            ("data-content", tokens),
                        ],
                    );
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::Toc => {
                if entering {
                    self.open_block(node, &[("class", "render-node".to_string())]);
                    self.close_block();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::KramdownBlockIAL
            | NodeValue::KramdownSpanIAL
            | NodeValue::LinkRefDefBlock
            | NodeValue::FootnotesDefBlock => return WalkStatus::SkipChildren,

            // inline level
            NodeValue::Text => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    let t = self.text(&tokens);
                    self.w(&t);
                }
            }
            NodeValue::SoftBreak => {
                if entering {
                    self.w("\n");
                }
            }
            NodeValue::HardBreak | NodeValue::Br => {
                if entering {
                    self.w("<br />");
                }
            }
            NodeValue::CodeSpan { .. } => {
                if entering {
                    let content = child_tokens(node, |v| matches!(v, NodeValue::CodeSpanContent));
                    let t = self.text(&content);
                    self.w(&format!("<span data-type=\"code\">{t}</span>"));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::InlineMath => {
                if entering {
                    let content =
                        child_tokens(node, |v| matches!(v, NodeValue::InlineMathContent));
                    self.w(&format!(
                        "<span data-type=\"inline-math\" data-subtype=\"math\" data-content=\"{}\" contenteditable=\"false\" class=\"render-node\"></span>",
                        crate::parser::ial::escape_attr_value(&editor::strip_caret(&content))
                    ));
                    if content.contains(editor::CARET) {
                        self.w(editor::FRONT_END_CARET);
                    }
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::Emph => self.span(entering, "em"),
            NodeValue::Strong => self.span(entering, "strong"),
            NodeValue::Strikethrough => self.span(entering, "s"),
            NodeValue::Mark => self.span(entering, "mark"),
            NodeValue::Sup => self.span(entering, "sup"),
            NodeValue::Sub => self.span(entering, "sub"),
            NodeValue::Underline => self.span(entering, "u"),
            NodeValue::Kbd => self.span(entering, "kbd"),
            NodeValue::Tag => self.span(entering, "tag"),
            NodeValue::Link(link_type) => {
                if entering {
                    let dest = child_tokens(node, |v| matches!(v, NodeValue::LinkDest));
                    let title = child_tokens(node, |v| matches!(v, NodeValue::LinkTitle));
                    let mut attrs = format!(
                        " data-href=\"{}\"",
                        escape_href(&editor::strip_caret(&dest))
                    );
                    if !title.is_empty() {
                        attrs.push_str(&format!(" data-title=\"{}\"", escape_html(&title)));
                    }
                    self.w(&format!("<span data-type=\"a\"{attrs}>"));
                    if matches!(link_type, LinkType::Auto | LinkType::AutoBare) {
                        let text = child_tokens(node, |v| matches!(v, NodeValue::LinkText));
                        let t = self.text(&text);
                        self.w(&t);
                        self.w("</span>");
                        return WalkStatus::SkipChildren;
                    }
                } else {
                    self.w("</span>");
                }
            }
            NodeValue::Image => {
                if entering {
                    let dest = child_tokens(node, |v| matches!(v, NodeValue::LinkDest));
                    let title = child_tokens(node, |v| matches!(v, NodeValue::LinkTitle));
                    let alt = image_alt(node);
                    let mut img = format!(
                        "<img src=\"{}\" alt=\"{}\"",
                        escape_href(&editor::strip_caret(&dest)),
                        escape_html(&alt)
                    );
                    if !title.is_empty() {
                        img.push_str(&format!(" title=\"{}\"", escape_html(&title)));
                    }
                    img.push_str(" />");
                    self.w(&img);
                    if dest.contains(editor::CARET) {
                        self.w(editor::FRONT_END_CARET);
                    }
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::BlockRef => {
                if entering {
                    let id = child_tokens(node, |v| matches!(v, NodeValue::BlockRefID));
                    let is_dynamic = node.children().any(|c| {
                        matches!(c.data.borrow().value, NodeValue::BlockRefDynamicText)
                    });
                    let text = child_tokens(node, |v| {
                        matches!(v, NodeValue::BlockRefText | NodeValue::BlockRefDynamicText)
                    });
                    let subtype = if is_dynamic { "d" } else { "s" };
                    let t = self.text(&text);
                    self.w(&format!(
                        "<span data-type=\"block-ref\" data-id=\"{id}\" data-subtype=\"{subtype}\">{t}</span>"
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::FileAnnotationRef => {
                if entering {
                    let id = child_tokens(node, |v| matches!(v, NodeValue::FileAnnotationRefID));
                    let text =
                        child_tokens(node, |v| matches!(v, NodeValue::FileAnnotationRefText));
                    let t = self.text(&text);
                    self.w(&format!(
                        "<span data-type=\"file-annotation-ref\" data-id=\"{id}\">{t}</span>"
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::FootnotesRef { .. } => {
                if entering {
                    let label = node.data.borrow().tokens.clone();
                    self.w(&format!(
                        "<sup data-type=\"footnotes-ref\" data-id=\"{label}\">{label}</sup>"
                    ));
                }
            }
            NodeValue::TextMark(ref tm) => {
                if entering {
                    let mut attrs = String::new();
                    if !tm.a_href.is_empty() {
                        attrs.push_str(&format!(
                            " data-href=\"{}\"",
                            escape_href(&tm.a_href)
                        ));
                    }
                    if !tm.a_title.is_empty() {
                        attrs.push_str(&format!(" data-title=\"{}\"", escape_html(&tm.a_title)));
                    }
                    if !tm.block_ref_id.is_empty() {
                        attrs.push_str(&format!(
                            " data-id=\"{}\" data-subtype=\"{}\"",
                            tm.block_ref_id,
                            if tm.block_ref_subtype.is_empty() {
                                "s"
                            } else {
                                &tm.block_ref_subtype
                            }
                        ));
                    }
                    if !tm.file_annotation_ref_id.is_empty() {
                        attrs.push_str(&format!(
                            " data-id=\"{}\"",
                            escape_html(&tm.file_annotation_ref_id)
                        ));
                    }
                    if !tm.inline_math_content.is_empty() {
                        attrs.push_str(&format!(
                            " data-subtype=\"math\" data-content=\"{}\"",
                            crate::parser::ial::escape_attr_value(&tm.inline_math_content)
                        ));
                    }
                    if !tm.inline_memo_content.is_empty() {
                        attrs.push_str(&format!(
                            " data-memo=\"{}\"",
                            crate::parser::ial::escape_attr_value(&tm.inline_memo_content)
                        ));
                    }
                    let t = self.text(&tm.text_content);
                    self.w(&format!(
                        "<span data-type=\"{}\"{attrs}>{t}</span>",
                        tm.sorted_types()
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::Emoji => {}
            NodeValue::EmojiUnicode => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&escape_html(&tokens));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::EmojiImg => {
                if entering {
                    let src = node.data.borrow().tokens.clone();
                    let alias = child_tokens(node, |v| matches!(v, NodeValue::EmojiAlias));
                    let alt = alias.trim_matches(':');
                    self.w(&format!(
                        "<img alt=\"{alt}\" class=\"emoji\" src=\"{}\" title=\"{alt}\" />",
                        escape_href(&src)
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::HtmlEntity => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&tokens);
                }
            }
            NodeValue::InlineHtml => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&escape_html(&tokens));
                }
            }
            NodeValue::Backslash => {
                if entering {
                    self.w("<span data-type=\"backslash\">");
                    self.w("\\");
                } else {
                    self.w("</span>");
                }
            }
            NodeValue::BackslashContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&escape_html(&tokens));
                }
            }
            _ => {}
        }

        WalkStatus::Continue
    }

    fn span(&mut self, entering: bool, data_type: &str) {
        if entering {
            self.w(&format!("<span data-type=\"{data_type}\">"));
        } else {
            self.w("</span>");
        }
    }

    fn render_table<'a>(&mut self, node: &'a AstNode<'a>, aligns: &[TableAlignment]) {
        self.open_block(node, &[("class", "table".to_string())]);
        self.w("<div contenteditable=\"false\"><table contenteditable=\"true\" spellcheck=\"false\">");

        if let Some(colgroup) = node.data.borrow().ial_attr("colgroup") {
            self.w("<colgroup>");
            for style in colgroup.split('|') {
                if style.is_empty() {
                    self.w("<col />");
                } else {
                    self.w(&format!("<col style=\"{}\" />", escape_html(style)));
                }
            }
            self.w("</colgroup>");
        }

        for child in node.children() {
            let kind = child.data.borrow().value.kind();
            match kind {
                nodes::NodeKind::TableHead => {
                    self.w("<thead>");
                    for row in child.children() {
                        self.w("<tr>");
                        let mut col = 0;
                        for cell in row.children() {
                            self.table_cell(cell, aligns, col, "th");
                            col += 1;
                        }
                        self.w("</tr>");
                    }
                    self.w("</thead><tbody>");
                }
                nodes::NodeKind::TableRow => {
                    self.w("<tr>");
                    let mut col = 0;
                    for cell in child.children() {
                        self.table_cell(cell, aligns, col, "td");
                        col += 1;
                    }
                    self.w("</tr>");
                }
                _ => {}
            }
        }
        self.w("</tbody></table></div>");
        self.close_block();
    }

    fn table_cell<'a>(
        &mut self,
        cell: &'a AstNode<'a>,
        aligns: &[TableAlignment],
        col: usize,
        tag: &str,
    ) {
        let align = aligns.get(col).copied().unwrap_or(TableAlignment::None);
        let attr = match align {
            TableAlignment::None => String::new(),
            TableAlignment::Left => " align=\"left\"".to_string(),
            TableAlignment::Center => " align=\"center\"".to_string(),
            TableAlignment::Right => " align=\"right\"".to_string(),
        };
        self.w(&format!("<{tag}{attr}>"));
        for child in cell.children() {
            nodes::walk(child, &mut |n, e| self.render_node(n, e));
        }
        self.w(&format!("</{tag}>"));
    }
}

fn list_subtype(t: ListType) -> &'static str {
    match t {
        ListType::Bullet => "u",
        ListType::Ordered => "o",
        ListType::Task => "t",
    }
}

fn list_marker_attr(nl: &nodes::NodeList) -> String {
    match nl.list_type {
        ListType::Ordered => {
            let delim = match nl.delimiter {
                nodes::ListDelimType::Period => '.',
                nodes::ListDelimType::Paren => ')',
            };
            format!("{}{delim}", nl.start.max(1))
        }
        _ => {
            let c = if nl.bullet_char == 0 {
                b'*'
            } else {
                nl.bullet_char
            };
            (c as char).to_string()
        }
    }
}

fn item_checked<'a>(item: &'a AstNode<'a>) -> bool {
    item.children().any(|c| {
        matches!(
            c.data.borrow().value,
            NodeValue::TaskListItemMarker { checked: true }
        )
    })
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

fn image_alt<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    for child in node.children() {
        let ast = child.data.borrow();
        if matches!(ast.value, NodeValue::Text | NodeValue::LinkText) {
            out.push_str(&editor::strip_caret(&ast.tokens));
        }
    }
    out
}
