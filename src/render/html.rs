//! Standard HTML renderer.

use rustc_hash::FxHashMap;

use crate::editor;
use crate::nodes::{
    self, AstNode, LinkType, ListType, NodeValue, TableAlignment, WalkStatus,
};
use crate::parser::RenderOptions;
use crate::render::{escape_href, escape_html, resolve_dest, text_post, RenderCore};

/// Generates unique, URL-safe anchors for headings.
#[derive(Default)]
pub struct Anchorizer {
    seen: FxHashMap<String, usize>,
}

impl Anchorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchorize(&mut self, header: &str) -> String {
        let mut id = String::with_capacity(header.len());
        for c in header.to_lowercase().chars() {
            if c.is_alphanumeric() {
                id.push(c);
            } else if c.is_whitespace() || c == '-' {
                id.push('-');
            }
        }
        while id.contains("--") {
            id = id.replace("--", "-");
        }
        let id = id.trim_matches('-').to_string();

        let count = self.seen.entry(id.clone()).or_insert(0);
        let unique = if *count == 0 {
            id.clone()
        } else {
            format!("{id}-{count}")
        };
        *count += 1;
        unique
    }
}

pub struct HtmlRenderer<'o> {
    pub(crate) core: RenderCore<'o>,
    anchorizer: Anchorizer,
    footnote_defs: Vec<(String, String)>,
}

impl<'o> HtmlRenderer<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        HtmlRenderer {
            core: RenderCore::new(options),
            anchorizer: Anchorizer::new(),
            footnote_defs: Vec::new(),
        }
    }

    pub fn render<'a>(&mut self, root: &'a AstNode<'a>) -> String {
        if self.core.options.toc {
            self.render_toc(root);
        }
        nodes::walk(root, &mut |node, entering| self.render_node(node, entering));
        self.core.take_output()
    }

    fn w(&mut self, s: &str) {
        self.core.write_str(s);
    }

    fn render_toc<'a>(&mut self, root: &'a AstNode<'a>) {
        let mut headings = Vec::new();
        for n in root.descendants() {
            if let NodeValue::Heading(nh) = n.data.borrow().value {
                headings.push((nh.level, nodes::text_content(n)));
            }
        }
        if headings.is_empty() {
            return;
        }
        let mut anchorizer = Anchorizer::new();
        self.w("<div class=\"toc-div\">");
        for (level, text) in headings {
            let text = editor::strip_caret(&text);
            let anchor = anchorizer.anchorize(&text);
            self.w(&format!(
                "<span class=\"toc-h{level}\"><a class=\"toc-a\" href=\"#{anchor}\">{}</a></span><br>",
                escape_html(&text)
            ));
        }
        self.w("</div>\n\n");
    }

    fn render_node<'a>(&mut self, node: &'a AstNode<'a>, entering: bool) -> WalkStatus {
        if let Some(status) = self.core.ext_render(node, entering) {
            return status;
        }

        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Document => {
                if !entering {
                    self.render_footnote_defs();
                }
            }
            NodeValue::Paragraph => {
                let tight = matches!(
                    node.parent().map(|p| p.data.borrow().value.clone()),
                    Some(NodeValue::ListItem(nl)) if nl.tight
                );
                if !tight {
                    if entering {
                        self.core.newline();
                        self.w("<p>");
                    } else {
                        self.w("</p>\n");
                    }
                }
            }
            NodeValue::Text => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    let t = editor::strip_caret(&tokens);
                    self.w(&escape_html(&text_post(self.core.options, &t)));
                }
            }
            NodeValue::SoftBreak => {
                if entering {
                    if self.core.options.soft_break_to_hard_break {
                        self.w("<br />\n");
                    } else {
                        self.w("\n");
                    }
                }
            }
            NodeValue::HardBreak | NodeValue::Br => {
                if entering {
                    self.w("<br />\n");
                }
            }
            NodeValue::Heading(nh) => {
                if entering {
                    self.core.newline();
                    let level = nh.level;
                    let text = editor::strip_caret(&nodes::text_content(node));
                    let custom = heading_custom_id(node);
                    let id = if let Some(custom) = custom {
                        custom.trim_start_matches('#').to_string()
                    } else {
                        self.anchorizer.anchorize(&text)
                    };
                    if self.core.options.heading_id {
                        self.w(&format!("<h{level} id=\"{}\">", escape_html(&id)));
                    } else {
                        self.w(&format!("<h{level}>"));
                    }
                    if self.core.options.heading_anchor {
                        self.w(&format!(
                            "<a id=\"editorAnchor-{0}\" class=\"anchor\" href=\"#{0}\"></a>",
                            escape_html(&id)
                        ));
                    }
                } else {
                    self.w(&format!("</h{}>\n", nh.level));
                }
            }
            NodeValue::HeadingID => return WalkStatus::SkipChildren,
            NodeValue::Blockquote => {
                if entering {
                    self.core.newline();
                    self.w("<blockquote>\n");
                } else {
                    self.core.newline();
                    self.w("</blockquote>\n");
                }
            }
            NodeValue::List(nl) => {
                if entering {
                    self.core.newline();
                    match nl.list_type {
                        ListType::Ordered => {
                            if nl.start > 1 {
                                self.w(&format!("<ol start=\"{}\">\n", nl.start));
                            } else {
                                self.w("<ol>\n");
                            }
                        }
                        _ => self.w("<ul>\n"),
                    }
                } else {
                    match nl.list_type {
                        ListType::Ordered => self.w("</ol>\n"),
                        _ => self.w("</ul>\n"),
                    }
                }
            }
            NodeValue::ListItem(..) => {
                if entering {
                    self.w("<li>");
                } else {
                    self.w("</li>\n");
                }
            }
            NodeValue::TaskListItemMarker { checked } => {
                if entering {
                    let class = &self.core.options.gfm_task_list_item_class;
                    if checked {
                        self.w(&format!(
                            "<input checked=\"\" disabled=\"\" type=\"checkbox\" class=\"{class}\" /> "
                        ));
                    } else {
                        self.w(&format!(
                            "<input disabled=\"\" type=\"checkbox\" class=\"{class}\" /> "
                        ));
                    }
                }
            }
            NodeValue::ThematicBreak => {
                if entering {
                    self.core.newline();
                    self.w("<hr />\n");
                }
            }
            NodeValue::CodeBlock(ncb) => {
                if entering {
                    self.core.newline();
                    let code = code_tokens(node);
                    let code = editor::strip_caret(&code).replace(editor::ZWJ, "");
                    let info = ncb.info.split_whitespace().next().unwrap_or("");
                    if self.core.options.code_syntax_highlight && !info.is_empty() {
                        self.w(&format!(
                            "<pre><code class=\"language-{}\">",
                            escape_html(info)
                        ));
                    } else {
                        self.w("<pre><code>");
                    }
                    self.w(&escape_html(&code));
                    self.w("</code></pre>\n");
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::HtmlBlock(..) => {
                if entering {
                    self.core.newline();
                    let tokens = node.data.borrow().tokens.clone();
                    let tokens = editor::strip_caret(&tokens);
                    if self.core.options.sanitize {
                        self.w(&escape_html(&tokens));
                    } else {
                        self.w(tokens.trim_end_matches('\n'));
                    }
                    self.w("\n");
                }
            }
            NodeValue::InlineHtml => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    if self.core.options.sanitize {
                        self.w(&escape_html(&tokens));
                    } else {
                        self.w(&tokens);
                    }
                }
            }
            NodeValue::MathBlock => {
                if entering {
                    self.core.newline();
                    let content = child_tokens(node, |v| matches!(v, NodeValue::MathBlockContent));
                    self.w(&format!(
                        "<div class=\"language-math\">{}</div>\n",
                        escape_html(&editor::strip_caret(&content))
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::InlineMath => {
                if entering {
                    let content =
                        child_tokens(node, |v| matches!(v, NodeValue::InlineMathContent));
                    self.w(&format!(
                        "<span class=\"language-math\">{}</span>",
                        escape_html(&editor::strip_caret(&content))
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::CodeSpan { .. } => {
                if entering {
                    let content = child_tokens(node, |v| matches!(v, NodeValue::CodeSpanContent));
                    self.w(&format!(
                        "<code>{}</code>",
                        escape_html(&editor::strip_caret(&content))
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::Emph => self.tag(entering, "em"),
            NodeValue::Strong => self.tag(entering, "strong"),
            NodeValue::Strikethrough => self.tag(entering, "del"),
            NodeValue::Mark => self.tag(entering, "mark"),
            NodeValue::Sup => self.tag(entering, "sup"),
            NodeValue::Sub => self.tag(entering, "sub"),
            NodeValue::Underline => self.tag(entering, "u"),
            NodeValue::Kbd => self.tag(entering, "kbd"),
            NodeValue::Tag => self.tag(entering, "em"),
            NodeValue::Link(link_type) => {
                if entering {
                    let dest = child_tokens(node, |v| matches!(v, NodeValue::LinkDest));
                    let title = child_tokens(node, |v| matches!(v, NodeValue::LinkTitle));
                    let url = resolve_dest(self.core.options, &editor::strip_caret(&dest));
                    if title.is_empty() {
                        self.w(&format!("<a href=\"{}\">", escape_href(&url)));
                    } else {
                        self.w(&format!(
                            "<a href=\"{}\" title=\"{}\">",
                            escape_href(&url),
                            escape_html(&title)
                        ));
                    }
                    if matches!(link_type, LinkType::Auto | LinkType::AutoBare) {
                        let text = child_tokens(node, |v| matches!(v, NodeValue::LinkText));
                        self.w(&escape_html(&text));
                        self.w("</a>");
                        return WalkStatus::SkipChildren;
                    }
                } else {
                    self.w("</a>");
                }
            }
            NodeValue::Image => {
                if entering {
                    let dest = child_tokens(node, |v| matches!(v, NodeValue::LinkDest));
                    let title = child_tokens(node, |v| matches!(v, NodeValue::LinkTitle));
                    let alt = image_alt(node);
                    let url = resolve_dest(self.core.options, &editor::strip_caret(&dest));
                    let src_attr = if self.core.options.image_lazy_loading.is_empty() {
                        format!("src=\"{}\"", escape_href(&url))
                    } else {
                        format!(
                            "src=\"\" {}=\"{}\"",
                            self.core.options.image_lazy_loading,
                            escape_href(&url)
                        )
                    };
                    if title.is_empty() {
                        self.w(&format!(
                            "<img {src_attr} alt=\"{}\" />",
                            escape_html(&alt)
                        ));
                    } else {
                        self.w(&format!(
                            "<img {src_attr} alt=\"{}\" title=\"{}\" />",
                            escape_html(&alt),
                            escape_html(&title)
                        ));
                    }
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::BlockRef => {
                if entering {
                    let id = child_tokens(node, |v| matches!(v, NodeValue::BlockRefID));
                    let text = child_tokens(node, |v| {
                        matches!(v, NodeValue::BlockRefText | NodeValue::BlockRefDynamicText)
                    });
                    let shown = if text.is_empty() { id.clone() } else { text };
                    self.w(&format!(
                        "<span class=\"block-ref\" data-id=\"{}\">{}</span>",
                        escape_html(&id),
                        escape_html(&editor::strip_caret(&shown))
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::FileAnnotationRef => {
                if entering {
                    let id = child_tokens(node, |v| matches!(v, NodeValue::FileAnnotationRefID));
                    let text =
                        child_tokens(node, |v| matches!(v, NodeValue::FileAnnotationRefText));
                    self.w(&format!(
                        "<span class=\"file-annotation-ref\" data-id=\"{}\">{}</span>",
                        escape_html(&id),
                        escape_html(&editor::strip_caret(&text))
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::FootnotesRef { num } => {
                if entering {
                    let label = node.data.borrow().tokens.clone();
                    self.w(&format!(
                        "<sup class=\"footnotes-ref\" id=\"footnotes-ref-{label}\"><a href=\"#footnotes-def-{label}\">{num}</a></sup>"
                    ));
                }
            }
            NodeValue::FootnotesDefBlock => {
                if entering {
                    // collected and rendered at document close
                    for def in node.children() {
                        let label = def.data.borrow().tokens.clone();
                        let mut sub = HtmlRenderer::new(self.core.options);
                        for child in def.children() {
                            nodes::walk(child, &mut |n, e| sub.render_node(n, e));
                        }
                        let body = sub.core.take_output();
                        self.footnote_defs.push((label, body));
                    }
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::FootnotesDef => return WalkStatus::SkipChildren,
            NodeValue::Table(..) => {
                if entering {
                    self.core.newline();
                    self.w("<table>\n");
                } else {
                    self.w("</tbody>\n</table>\n");
                }
            }
            NodeValue::TableHead => {
                if entering {
                    self.w("<thead>\n");
                } else {
                    self.w("</thead>\n<tbody>\n");
                }
            }
            NodeValue::TableRow => {
                if entering {
                    self.w("<tr>");
                } else {
                    self.w("</tr>\n");
                }
            }
            NodeValue::TableCell(align) => {
                let in_head = node
                    .parent()
                    .and_then(|r| r.parent())
                    .map(|h| matches!(h.data.borrow().value, NodeValue::TableHead))
                    .unwrap_or(false);
                let tag = if in_head { "th" } else { "td" };
                if entering {
                    match align {
                        TableAlignment::None => self.w(&format!("<{tag}>")),
                        TableAlignment::Left => self.w(&format!("<{tag} align=\"left\">")),
                        TableAlignment::Center => self.w(&format!("<{tag} align=\"center\">")),
                        TableAlignment::Right => self.w(&format!("<{tag} align=\"right\">")),
                    }
                } else {
                    self.w(&format!("</{tag}>"));
                }
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
            NodeValue::Backslash => {}
            NodeValue::BackslashContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&escape_html(&tokens));
                }
            }
            NodeValue::YamlFrontMatter => return WalkStatus::SkipChildren,
            NodeValue::Toc => {
                // rendered up front when enabled
                return WalkStatus::SkipChildren;
            }
            NodeValue::KramdownBlockIAL | NodeValue::KramdownSpanIAL => {
                return WalkStatus::SkipChildren;
            }
            NodeValue::SuperBlock => {
                if self.core.options.super_block {
                    if entering {
                        let layout = child_tokens(node, |v| {
                            matches!(v, NodeValue::SuperBlockLayoutMarker)
                        });
                        self.w(&format!("<div class=\"sb\" data-sb-layout=\"{layout}\">\n"));
                    } else {
                        self.w("</div>\n");
                    }
                }
            }
            NodeValue::BlockQueryEmbed => {
                if entering {
                    let script =
                        child_tokens(node, |v| matches!(v, NodeValue::BlockQueryEmbedScript));
                    self.w(&format!(
                        "<div class=\"block-query-embed\" data-script=\"{}\"></div>\n",
                        escape_html(&script)
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::GitConflict => {
                if entering {
                    let content =
                        child_tokens(node, |v| matches!(v, NodeValue::GitConflictContent));
                    self.w(&format!(
                        "<pre class=\"git-conflict\">{}</pre>\n",
                        escape_html(&content)
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::CustomBlock { ref info } => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.w(&format!(
                        "<div class=\"custom-block\" data-info=\"{}\">{}</div>\n",
                        escape_html(info),
                        escape_html(&tokens)
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::AttributeView(ref av) => {
                if entering {
                    self.w(&format!(
                        "<div data-type=\"NodeAttributeView\" data-av-id=\"{}\" data-av-type=\"{}\"></div>\n",
                        escape_html(&av.av_id),
                        escape_html(&av.av_type)
                    ));
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::IFrame | NodeValue::Video | NodeValue::Audio | NodeValue::Widget => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    if self.core.options.sanitize {
                        self.w(&escape_html(&tokens));
                    } else {
                        self.w(&tokens);
                    }
                    self.w("\n");
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::TextMark(ref tm) => {
                if entering {
                    let mut open = String::new();
                    let mut close = String::new();
                    for t in &tm.types {
                        let (o, c) = match t.as_str() {
                            "strong" => ("<strong>", "</strong>"),
                            "em" => ("<em>", "</em>"),
                            "s" => ("<del>", "</del>"),
                            "mark" => ("<mark>", "</mark>"),
                            "sup" => ("<sup>", "</sup>"),
                            "sub" => ("<sub>", "</sub>"),
                            "u" => ("<u>", "</u>"),
                            "kbd" => ("<kbd>", "</kbd>"),
                            "code" => ("<code>", "</code>"),
                            _ => ("", ""),
                        };
                        open.push_str(o);
                        close.insert_str(0, c);
                    }
                    self.w(&open);
                    self.w(&escape_html(&editor::strip_caret(&tm.text_content)));
                    self.w(&close);
                }
                return WalkStatus::SkipChildren;
            }
            _ => {}
        }

        WalkStatus::Continue
    }

    fn tag(&mut self, entering: bool, name: &str) {
        if entering {
            self.w(&format!("<{name}>"));
        } else {
            self.w(&format!("</{name}>"));
        }
    }

    fn render_footnote_defs(&mut self) {
        if self.footnote_defs.is_empty() {
            return;
        }
        self.w("<div class=\"footnotes-defs-div\"><hr class=\"footnotes-defs-hr\" />\n<ol class=\"footnotes-defs-ol\">");
        let defs = std::mem::take(&mut self.footnote_defs);
        for (label, body) in defs {
            self.w(&format!("<li id=\"footnotes-def-{label}\">"));
            self.w(&body);
            self.w("</li>\n");
        }
        self.w("</ol></div>");
    }
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

pub(crate) fn code_tokens<'a>(node: &'a AstNode<'a>) -> String {
    for child in node.children() {
        let ast = child.data.borrow();
        if matches!(ast.value, NodeValue::CodeBlockCode) {
            return ast.tokens.clone();
        }
    }
    node.data.borrow().tokens.clone()
}

fn heading_custom_id<'a>(node: &'a AstNode<'a>) -> Option<String> {
    for child in node.children() {
        let ast = child.data.borrow();
        if matches!(ast.value, NodeValue::HeadingID) {
            return Some(ast.tokens.clone());
        }
    }
    None
}

/// Plain-text alt of an image: everything between its brackets.
fn image_alt<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    for child in node.children() {
        let ast = child.data.borrow();
        match ast.value {
            NodeValue::Text | NodeValue::LinkText => {
                out.push_str(&editor::strip_caret(&ast.tokens))
            }
            _ => {}
        }
    }
    out
}
