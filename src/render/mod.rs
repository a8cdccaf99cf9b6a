//! Rendering infrastructure shared by the renderer family: a byte
//! writer with a per-node writer stack for prefix rewriting, newline
//! coalescing, per-kind dispatch and extension hooks.

pub mod block_dom;
pub mod export_md;
pub mod format;
pub mod html;
pub mod json;
pub mod preview;
pub mod sv;
pub mod textbundle;

use rustc_hash::FxHashMap;

use crate::nodes::{AstNode, NodeKind, WalkStatus};
use crate::parser::RenderOptions;

/// An extension hook: receives the node and the entering flag, returns
/// replacement output and the walk status to apply.
pub type ExtRendererFn = for<'a> fn(&'a AstNode<'a>, bool) -> (String, WalkStatus);

/// Writer state common to every renderer: the main buffer, the stack of
/// per-node writers for blocks whose output gets a prefix rewrite, and
/// the tail needed for newline coalescing.
pub(crate) struct RenderCore<'o> {
    writers: Vec<String>,
    pub options: &'o RenderOptions,
    pub ext_renderers: FxHashMap<NodeKind, ExtRendererFn>,
}

impl<'o> RenderCore<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        RenderCore {
            writers: vec![String::new()],
            options,
            ext_renderers: FxHashMap::default(),
        }
    }

    pub fn w(&mut self) -> &mut String {
        self.writers.last_mut().unwrap()
    }

    pub fn write_str(&mut self, s: &str) {
        self.w().push_str(s);
    }

    /// Pushes a fresh per-node writer.
    pub fn push_writer(&mut self) {
        self.writers.push(String::new());
    }

    /// Pops the current per-node writer, returning its contents.
    pub fn pop_writer(&mut self) -> String {
        debug_assert!(self.writers.len() > 1);
        self.writers.pop().unwrap_or_default()
    }

    pub fn last_byte(&self) -> u8 {
        self.writers
            .last()
            .and_then(|w| w.as_bytes().last().copied())
            .unwrap_or(b'\n')
    }

    /// A newline unless one just went out.
    pub fn newline(&mut self) {
        if self.last_byte() != b'\n' {
            self.w().push('\n');
        }
    }

    /// Exactly one blank line at the tail of the writer.
    pub fn blank_line(&mut self) {
        self.newline();
        let w = self.w();
        while w.ends_with("\n\n\n") {
            w.pop();
        }
        if !w.ends_with("\n\n") {
            w.push('\n');
        }
    }

    pub fn take_output(&mut self) -> String {
        debug_assert_eq!(self.writers.len(), 1);
        std::mem::take(&mut self.writers[0])
    }

    /// Runs the extension hook for `node`, if one is registered.
    pub fn ext_render<'a>(&mut self, node: &'a AstNode<'a>, entering: bool) -> Option<WalkStatus> {
        let kind = node.data.borrow().value.kind();
        let func = self.ext_renderers.get(&kind).copied()?;
        let (out, status) = func(node, entering);
        self.write_str(&out);
        Some(status)
    }
}

/// Escapes text content for HTML output.
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a URL for emission in an href/src attribute.
pub(crate) fn escape_href(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            '"' => out.push_str("%22"),
            ' ' => out.push_str("%20"),
            '\'' => out.push_str("%27"),
            _ => out.push(c),
        }
    }
    out
}

/// Applies the render-time link policy: prefix, base and sanitization.
pub(crate) fn resolve_dest(options: &RenderOptions, dest: &str) -> String {
    let mut url = dest.to_string();
    if options.sanitize && crate::scanners::dangerous_url(url.as_bytes()) {
        return String::new();
    }
    if !options.link_prefix.is_empty() {
        url = format!("{}{}", options.link_prefix, url);
    } else if !options.link_base.is_empty()
        && !url.contains("://")
        && !url.starts_with("data:")
        && !url.starts_with('#')
        && !url.starts_with('/')
    {
        url = format!("{}{}", options.link_base, url);
    }
    url
}

const CJK_RANGES: &[(u32, u32)] = &[
    (0x2E80, 0x303E),
    (0x3041, 0x33FF),
    (0x3400, 0x4DBF),
    (0x4E00, 0x9FFF),
    (0xF900, 0xFAFF),
    (0xFE30, 0xFE4F),
    (0x20000, 0x2FA1F),
];

fn is_cjk(c: char) -> bool {
    let cp = c as u32;
    CJK_RANGES.iter().any(|&(lo, hi)| cp >= lo && cp <= hi)
}

/// Inserts spaces between CJK and Western runs.
pub(crate) fn auto_space(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if let Some(p) = prev {
            let boundary = (is_cjk(p) && c.is_ascii_alphanumeric())
                || (p.is_ascii_alphanumeric() && is_cjk(c));
            if boundary {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Replaces known term typos, whole words only.
pub(crate) fn fix_term_typo(options: &RenderOptions, text: &str) -> String {
    if options.terms.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            word.push(c);
        } else {
            flush_word(options, &mut out, &mut word);
            out.push(c);
        }
    }
    flush_word(options, &mut out, &mut word);
    out
}

fn flush_word(options: &RenderOptions, out: &mut String, word: &mut String) {
    if word.is_empty() {
        return;
    }
    match options.terms.get(word.as_str()) {
        Some(fixed) => out.push_str(fixed),
        None => out.push_str(word),
    }
    word.clear();
}

/// The text-node post-processing pipeline for renderers that emit prose.
pub(crate) fn text_post(options: &RenderOptions, text: &str) -> String {
    let mut t = text.to_string();
    if options.fix_term_typo {
        t = fix_term_typo(options, &t);
    }
    if options.auto_space {
        t = auto_space(&t);
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RenderOptions;

    #[test]
    fn spacing_and_terms() {
        assert_eq!(auto_space("中文English混排"), "中文 English 混排");
        let options = RenderOptions::default();
        assert_eq!(fix_term_typo(&options, "on Github!"), "on GitHub!");
        assert_eq!(fix_term_typo(&options, "playgithub"), "playgithub");
    }

    #[test]
    fn href_escaping() {
        assert_eq!(escape_href("/a b"), "/a%20b");
        assert_eq!(escape_html("<a>&"), "&lt;a&gt;&amp;");
    }
}
