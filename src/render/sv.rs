//! Split-view DOM renderer: line-oriented structural HTML where the
//! Markdown syntax markers stay visible as styled spans and every line
//! ends with exactly one newline sentinel.

use crate::editor;
use crate::nodes::{self, AstNode, LinkType, NodeValue, WalkStatus};
use crate::parser::RenderOptions;
use crate::render::{escape_html, RenderCore};

/// The sentinel closing every rendered line.
pub const NEWLINE_SV: &str =
    "<span data-type=\"newline\"><br/><span style=\"display:none\">\n</span></span>";

const MARKER: &str = "editor-sv__marker";

pub struct EditorSvRenderer<'o> {
    pub(crate) core: RenderCore<'o>,
}

impl<'o> EditorSvRenderer<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        EditorSvRenderer {
            core: RenderCore::new(options),
        }
    }

    pub fn render<'a>(&mut self, root: &'a AstNode<'a>) -> String {
        nodes::walk(root, &mut |node, entering| self.render_node(node, entering));
        let mut out = self.core.take_output();
        if out.is_empty() {
            out = format!("<span data-type=\"text\">{}</span>{NEWLINE_SV}", editor::FRONT_END_CARET);
        }
        out
    }

    fn w(&mut self, s: &str) {
        self.core.write_str(s);
    }

    fn marker(&mut self, class_suffix: &str, text: &str) {
        let class = if class_suffix.is_empty() {
            MARKER.to_string()
        } else {
            format!("{MARKER} {MARKER}--{class_suffix}")
        };
        self.w(&format!(
            "<span class=\"{class}\">{}</span>",
            escape_html(text).replace(editor::CARET, editor::FRONT_END_CARET)
        ));
    }

    /// One newline sentinel, coalescing duplicates against the tail.
    fn sentinel(&mut self) {
        if !self.core.w().ends_with(NEWLINE_SV) {
            self.w(NEWLINE_SV);
        }
    }

    /// A sentinel that may repeat (blank line between blocks).
    fn forced_sentinel(&mut self) {
        self.w(NEWLINE_SV);
    }

    /// Pops the block writer and reinserts it with `marker_html` at the
    /// head of every line.
    fn pop_prefixed(&mut self, marker_html: &str) {
        let buf = self.core.pop_writer();
        let body = match buf.strip_suffix(NEWLINE_SV) {
            Some(b) => b,
            None => buf.as_str(),
        };
        let mut out = String::with_capacity(buf.len() + marker_html.len() * 4);
        out.push_str(marker_html);
        out.push_str(&body.replace(NEWLINE_SV, &format!("{NEWLINE_SV}{marker_html}")));
        out.push_str(NEWLINE_SV);
        self.w(&out);
    }

    fn text_html(&self, tokens: &str) -> String {
        escape_html(tokens).replace(editor::CARET, editor::FRONT_END_CARET)
    }

    fn render_node<'a>(&mut self, node: &'a AstNode<'a>, entering: bool) -> WalkStatus {
        if let Some(status) = self.core.ext_render(node, entering) {
            return status;
        }

        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Document => {
                if !entering {
                    self.sentinel();
                }
            }
            NodeValue::Paragraph => {
                if !entering {
                    self.sentinel();
                    let tight = matches!(
                        node.parent().map(|p| p.data.borrow().value.clone()),
                        Some(NodeValue::ListItem(nl)) if nl.tight
                    );
                    if !tight {
                        self.forced_sentinel();
                    }
                }
            }
            NodeValue::Text | NodeValue::LinkText => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    let t = self.text_html(&tokens);
                    self.w(&format!("<span data-type=\"text\">{t}</span>"));
                }
            }
            NodeValue::SoftBreak => {
                if entering {
                    self.sentinel();
                }
            }
            NodeValue::HardBreak => {
                if entering {
                    self.marker("", "\\");
                    self.sentinel();
                }
            }
            NodeValue::Br => {
                if entering {
                    self.sentinel();
                }
            }
            NodeValue::Heading(nh) => {
                if entering {
                    self.marker("heading", &format!("{} ", "#".repeat(nh.level as usize)));
                } else {
                    self.sentinel();
                    self.forced_sentinel();
                }
            }
            NodeValue::HeadingID => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.marker("heading", &format!(" {{{tokens}}}"));
                }
            }
            NodeValue::Blockquote => {
                if entering {
                    self.core.push_writer();
                } else {
                    let marker_html =
                        format!("<span class=\"{MARKER}\">&gt; </span>");
                    self.pop_prefixed(&marker_html);
                    self.forced_sentinel();
                }
            }
            NodeValue::List(..) => {
                if !entering {
                    self.forced_sentinel();
                }
            }
            NodeValue::ListItem(nl) => {
                if entering {
                    self.core.push_writer();
                } else {
                    let marker_text = super::format::item_marker(node, &nl);
                    // the marker opens the first line; continuations indent
                    let buf = self.core.pop_writer();
                    let body = match buf.strip_suffix(NEWLINE_SV) {
                        Some(b) => b,
                        None => buf.as_str(),
                    };
                    let indent_html = format!(
                        "<span class=\"{MARKER}\">{}</span>",
                        "&nbsp;".repeat(marker_text.len())
                    );
                    self.w(&format!(
                        "<span class=\"{MARKER}\">{}</span>",
                        escape_html(&marker_text)
                    ));
                    self.w(&body.replace(NEWLINE_SV, &format!("{NEWLINE_SV}{indent_html}")));
                    self.w(NEWLINE_SV);
                }
            }
            NodeValue::TaskListItemMarker { checked } => {
                if entering {
                    self.marker("", if checked { "[X] " } else { "[ ] " });
                }
            }
            NodeValue::ThematicBreak => {
                if entering {
                    self.marker("", "---");
                    self.sentinel();
                    self.forced_sentinel();
                }
            }
            NodeValue::CodeBlock(ncb) => {
                if entering {
                    let fence = "```";
                    self.marker("info", &format!("{fence}{}", ncb.info));
                    self.sentinel();
                    let code = code_tokens(node);
                    for line in code.trim_end_matches('\n').split('\n') {
                        let t = self.text_html(line);
                        self.w(&format!("<span data-type=\"text\">{t}</span>"));
                        self.forced_sentinel();
                    }
                    self.marker("info", fence);
                    self.sentinel();
                    self.forced_sentinel();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::MathBlock => {
                if entering {
                    self.marker("info", "$$");
                    self.sentinel();
                    let content =
                        child_tokens(node, |v| matches!(v, NodeValue::MathBlockContent));
                    let t = self.text_html(&content);
                    self.w(&format!("<span data-type=\"text\">{t}</span>"));
                    self.sentinel();
                    self.marker("info", "$$");
                    self.sentinel();
                    self.forced_sentinel();
                }
                return WalkStatus::SkipChildren;
            }
            NodeValue::InlineMathOpenMarker | NodeValue::InlineMathCloseMarker => {
                if entering {
                    self.marker("", "$");
                }
            }
            NodeValue::InlineMathContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    let t = self.text_html(&tokens);
                    self.w(&format!("<span data-type=\"text\">{t}</span>"));
                }
            }
            NodeValue::CodeSpanOpenMarker | NodeValue::CodeSpanCloseMarker => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.marker("", &tokens);
                }
            }
            NodeValue::CodeSpanContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    let t = self.text_html(&tokens);
                    self.w(&format!("<code data-newline=\"1\">{t}</code>"));
                }
            }
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
            | NodeValue::TagOpenMarker
            | NodeValue::TagCloseMarker => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.marker("bi", &tokens);
                }
            }
            NodeValue::UnderlineOpenMarker
            | NodeValue::UnderlineCloseMarker
            | NodeValue::KbdOpenMarker
            | NodeValue::KbdCloseMarker => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.marker("bi", &tokens);
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
            | NodeValue::Tag
            | NodeValue::InlineMath
            | NodeValue::CodeSpan { .. } => {}
            NodeValue::Bang => {
                if entering {
                    self.marker("bracket", "!");
                }
            }
            NodeValue::OpenBracket => {
                if entering {
                    self.marker("bracket", "[");
                }
            }
            NodeValue::CloseBracket => {
                if entering {
                    self.marker("bracket", "]");
                }
            }
            NodeValue::OpenParen => {
                if entering {
                    self.marker("paren", "(");
                }
            }
            NodeValue::CloseParen => {
                if entering {
                    self.marker("paren", ")");
                }
            }
            NodeValue::OpenBrace => {
                if entering {
                    self.marker("brace", "{");
                }
            }
            NodeValue::CloseBrace => {
                if entering {
                    self.marker("brace", "}");
                }
            }
            NodeValue::LinkDest => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.marker("link", &tokens);
                }
            }
            NodeValue::LinkSpace => {
                if entering {
                    self.marker("", " ");
                }
            }
            NodeValue::LinkTitle => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    self.marker("title", &format!("\"{tokens}\""));
                }
            }
            NodeValue::Link(link_type) => {
                if entering
                    && matches!(link_type, LinkType::Auto | LinkType::AutoBare)
                {
                    let text = child_tokens(node, |v| matches!(v, NodeValue::LinkText));
                    if matches!(link_type, LinkType::Auto) {
                        self.marker("bracket", "<");
                        let t = self.text_html(&text);
                        self.w(&format!("<span data-type=\"text\">{t}</span>"));
                        self.marker("bracket", ">");
                    } else {
                        let t = self.text_html(&text);
                        self.w(&format!("<span data-type=\"text\">{t}</span>"));
                    }
                    return WalkStatus::SkipChildren;
                }
            }
            NodeValue::Image => {}
            NodeValue::HtmlBlock(..) | NodeValue::InlineHtml => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    let t = self.text_html(tokens.trim_end_matches('\n'));
                    self.w(&format!("<span data-type=\"text\">{t}</span>"));
                    if matches!(value, NodeValue::HtmlBlock(..)) {
                        self.sentinel();
                        self.forced_sentinel();
                    }
                }
            }
            NodeValue::HtmlEntity => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    let t = self.text_html(&tokens);
                    self.w(&format!("<span data-type=\"text\">{t}</span>"));
                }
            }
            NodeValue::Backslash => {
                if entering {
                    self.marker("", "\\");
                }
            }
            NodeValue::BackslashContent => {
                if entering {
                    let tokens = node.data.borrow().tokens.clone();
                    let t = self.text_html(&tokens);
                    self.w(&format!("<span data-type=\"text\">{t}</span>"));
                }
            }
            _ => {}
        }

        WalkStatus::Continue
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

fn code_tokens<'a>(node: &'a AstNode<'a>) -> String {
    for child in node.children() {
        let ast = child.data.borrow();
        if matches!(ast.value, NodeValue::CodeBlockCode) {
            return ast.tokens.clone();
        }
    }
    node.data.borrow().tokens.clone()
}
