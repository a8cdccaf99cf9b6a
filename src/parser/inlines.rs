//! The inline parser: a single pass over a block's token buffer with a
//! delimiter-run stack for emphasis families and a bracket stack for
//! links and images. Every syntax predicate skips the caret sentinel so
//! the cursor never changes how the text parses.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use typed_arena::Arena;

use crate::arena_tree::Node;
use crate::character_set::character_set;
use crate::ctype::{is_unicode_punctuation, is_unicode_whitespace, isdigit};
use crate::editor;
use crate::entity;
use crate::nodes::{Ast, AstNode, LinkType, NodeValue};
use crate::parser::{block_ref, ial, ParseOptions};
use crate::scanners;
use crate::strings;

/// A resolved link reference definition.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    pub url: String,
    pub title: String,
}

/// Link reference definitions collected during block parsing, keyed by
/// the case-folded label.
pub struct RefMap {
    map: FxHashMap<String, ResolvedReference>,
}

impl RefMap {
    pub fn new() -> Self {
        RefMap {
            map: FxHashMap::default(),
        }
    }

    /// First definition for a label wins.
    pub fn add(&mut self, normalized_label: &str, url: &str, title: &str) {
        self.map
            .entry(normalized_label.to_string())
            .or_insert_with(|| ResolvedReference {
                url: url.to_string(),
                title: title.to_string(),
            });
    }

    pub fn lookup(&self, label: &str) -> Option<&ResolvedReference> {
        self.map.get(&strings::normalize_label(label))
    }
}

impl Default for RefMap {
    fn default() -> Self {
        Self::new()
    }
}

struct Delimiter<'a> {
    inl: &'a AstNode<'a>,
    delim_char: u8,
    /// Remaining unconsumed run length.
    length: usize,
    orig_length: usize,
    can_open: bool,
    can_close: bool,
}

struct Bracket<'a> {
    inl_text: &'a AstNode<'a>,
    image: bool,
    active: bool,
    /// Delimiter stack height when the bracket was pushed.
    delim_bottom: usize,
}

pub struct Subject<'a, 'o, 'r> {
    arena: &'a Arena<AstNode<'a>>,
    options: &'o ParseOptions,
    refmap: &'r mut RefMap,
    input: String,
    pos: usize,
    delimiters: Vec<Delimiter<'a>>,
    brackets: Vec<Bracket<'a>>,
}

impl<'a, 'o, 'r> Subject<'a, 'o, 'r> {
    pub fn new(
        arena: &'a Arena<AstNode<'a>>,
        options: &'o ParseOptions,
        content: &str,
        refmap: &'r mut RefMap,
    ) -> Self {
        Subject {
            arena,
            options,
            refmap,
            input: content.to_string(),
            pos: 0,
            delimiters: Vec::new(),
            brackets: Vec::new(),
        }
    }

    fn make_inline(&self, value: NodeValue, tokens: &str) -> &'a AstNode<'a> {
        let mut ast = Ast::with_tokens(value, tokens);
        ast.open = false;
        self.arena.alloc(Node::new(RefCell::new(ast)))
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_byte_n(&self, n: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + n).copied()
    }

    /// Parses one inline element, appending to `node`. Returns false at
    /// end of input.
    pub fn parse_inline(&mut self, node: &'a AstNode<'a>) -> bool {
        let c = match self.peek_byte() {
            Some(c) => c,
            None => return false,
        };

        let new_inl: Option<&'a AstNode<'a>> = match c {
            b'\n' | b'\r' => Some(self.handle_newline(node)),
            b'`' => Some(self.handle_backticks()),
            b'\\' => Some(self.handle_backslash()),
            b'&' => Some(self.handle_entity()),
            b'<' => Some(self.handle_pointy_brace()),
            b'[' => {
                if self.options.footnotes && self.input[self.pos..].starts_with("[^") {
                    if let Some(inl) = self.handle_footnote_ref() {
                        return {
                            node.append(inl);
                            !self.eof()
                        };
                    }
                }
                self.pos += 1;
                let inl = self.make_inline(NodeValue::Text, "[");
                self.push_bracket(false, inl);
                Some(inl)
            }
            b']' => self.handle_close_bracket(),
            b'!' => {
                self.pos += 1;
                if self.peek_byte() == Some(b'[') && self.peek_byte_n(1) != Some(b'^') {
                    self.pos += 1;
                    let inl = self.make_inline(NodeValue::Text, "![");
                    self.push_bracket(true, inl);
                    Some(inl)
                } else {
                    Some(self.make_inline(NodeValue::Text, "!"))
                }
            }
            b'*' | b'_' => Some(self.handle_delim(c)),
            b'~' => self.handle_tilde(),
            b'=' if self.options.mark => self.handle_equals(),
            b'^' if self.options.sup => self.handle_sup(),
            b'$' => Some(self.handle_dollars()),
            b'#' if self.options.tag => self.handle_tag(),
            b':' if self.options.emoji => self.handle_emoji(),
            b'{' => self.handle_open_brace(node),
            b'(' if self.options.block_ref => self.handle_block_ref(),
            _ => {
                let start = self.pos;
                let mut end = self.find_special_char();
                if start == end {
                    // special-capable byte with no handler engaged
                    end += 1;
                    while end < self.input.len() && !self.input.is_char_boundary(end) {
                        end += 1;
                    }
                }
                self.pos = end;
                let contents = &self.input[start..end];
                Some(self.make_inline(NodeValue::Text, contents))
            }
        };

        if let Some(inl) = new_inl {
            node.append(inl);
        }

        !self.eof()
    }

    fn is_special_byte(&self, c: u8) -> bool {
        const ALWAYS_SPECIAL: [bool; 256] = character_set!(b"\n\r`\\&<[]!*_$");
        if ALWAYS_SPECIAL[c as usize] {
            return true;
        }
        match c {
            b'~' => self.options.gfm_strikethrough || self.options.sub,
            b'=' => self.options.mark,
            b'^' => self.options.sup,
            b'#' => self.options.tag,
            b':' => self.options.emoji,
            b'{' => self.options.heading_id || self.options.kramdown_span_ial,
            b'(' => self.options.block_ref,
            _ => false,
        }
    }

    fn find_special_char(&self) -> usize {
        let bytes = self.input.as_bytes();
        for n in self.pos..self.input.len() {
            if self.is_special_byte(bytes[n]) {
                return n;
            }
        }
        self.input.len()
    }

    fn handle_newline(&mut self, node: &'a AstNode<'a>) -> &'a AstNode<'a> {
        let nlpos = self.pos;
        let bytes = self.input.as_bytes();
        if bytes[self.pos] == b'\r' {
            self.pos += 1;
        }
        if self.pos < bytes.len() && bytes[self.pos] == b'\n' {
            self.pos += 1;
        }

        // two trailing spaces make a hard break
        let mut hard = false;
        if let Some(last) = node.last_child() {
            let mut ast = last.data.borrow_mut();
            if matches!(ast.value, NodeValue::Text) {
                if ast.tokens.ends_with("  ") {
                    hard = true;
                }
                while ast.tokens.ends_with(' ') {
                    ast.tokens.pop();
                }
                if ast.tokens.is_empty() {
                    drop(ast);
                    last.detach();
                }
            }
        }

        let _ = nlpos;
        self.skip_spaces();
        if hard {
            self.make_inline(NodeValue::HardBreak, "")
        } else {
            self.make_inline(NodeValue::SoftBreak, "")
        }
    }

    fn skip_spaces(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, b: u8) -> usize {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] == b {
            self.pos += 1;
        }
        self.pos - start
    }

    fn handle_backticks(&mut self) -> &'a AstNode<'a> {
        let openticks = self.take_while(b'`');
        let startpos = self.pos;
        let endpos = self.scan_to_closing_backtick(openticks);

        match endpos {
            None => {
                self.pos = startpos;
                self.make_inline(NodeValue::Text, &"`".repeat(openticks))
            }
            Some(endpos) => {
                let raw = &self.input[startpos..endpos - openticks];
                let mut contents = raw.replace(['\n', '\r'], " ");
                // a single surrounding space pair is trimmed, per CommonMark
                if contents.len() >= 2
                    && contents.starts_with(' ')
                    && contents.ends_with(' ')
                    && !contents.bytes().all(|c| c == b' ')
                {
                    contents = contents[1..contents.len() - 1].to_string();
                }

                let marker = "`".repeat(openticks);
                let code = self.make_inline(
                    NodeValue::CodeSpan {
                        backticks: openticks,
                    },
                    "",
                );
                code.append(self.make_inline(NodeValue::CodeSpanOpenMarker, &marker));
                code.append(self.make_inline(NodeValue::CodeSpanContent, &contents));
                code.append(self.make_inline(NodeValue::CodeSpanCloseMarker, &marker));
                code
            }
        }
    }

    fn scan_to_closing_backtick(&mut self, openticklength: usize) -> Option<usize> {
        loop {
            let bytes = self.input.as_bytes();
            while self.pos < bytes.len() && bytes[self.pos] != b'`' {
                self.pos += 1;
            }
            if self.pos >= bytes.len() {
                return None;
            }
            let numticks = self.take_while(b'`');
            if numticks == openticklength {
                return Some(self.pos);
            }
        }
    }

    fn handle_backslash(&mut self) -> &'a AstNode<'a> {
        self.pos += 1;
        match self.peek_byte() {
            Some(c) if crate::ctype::ispunct(c) => {
                self.pos += 1;
                let node = self.make_inline(NodeValue::Backslash, "");
                node.append(self.make_inline(
                    NodeValue::BackslashContent,
                    &(c as char).to_string(),
                ));
                node
            }
            Some(b'\n') | Some(b'\r') => {
                let bytes = self.input.as_bytes();
                if bytes[self.pos] == b'\r' {
                    self.pos += 1;
                }
                if self.pos < bytes.len() && bytes[self.pos] == b'\n' {
                    self.pos += 1;
                }
                self.make_inline(NodeValue::HardBreak, "")
            }
            _ => self.make_inline(NodeValue::Text, "\\"),
        }
    }

    fn handle_entity(&mut self) -> &'a AstNode<'a> {
        self.pos += 1;

        match entity::unescape(&self.input.as_bytes()[self.pos..]) {
            None => self.make_inline(NodeValue::Text, "&"),
            Some((_, consumed)) => {
                let raw = format!("&{}", &self.input[self.pos..self.pos + consumed]);
                self.pos += consumed;
                self.make_inline(NodeValue::HtmlEntity, &raw)
            }
        }
    }

    fn handle_pointy_brace(&mut self) -> &'a AstNode<'a> {
        if self.options.file_annotation_ref && self.input[self.pos..].starts_with("<<") {
            if let Some(m) = block_ref::scan_file_annotation_ref(&self.input[self.pos..]) {
                self.pos += m.len;
                let node = self.make_inline(NodeValue::FileAnnotationRef, "");
                node.append(self.make_inline(NodeValue::FileAnnotationRefID, &m.id));
                if !m.text.is_empty() {
                    node.append(self.make_inline(NodeValue::FileAnnotationRefSpace, ""));
                    let mut text = m.text.clone();
                    if m.had_caret {
                        text.push_str(editor::CARET);
                    }
                    node.append(self.make_inline(NodeValue::FileAnnotationRefText, &text));
                } else if m.had_caret {
                    node.append(self.make_inline(NodeValue::FileAnnotationRefSpace, ""));
                    node.append(
                        self.make_inline(NodeValue::FileAnnotationRefText, editor::CARET),
                    );
                }
                return node;
            }
        }

        self.pos += 1;
        let rest = &self.input.as_bytes()[self.pos..];

        if let Some(matchlen) = scanners::autolink_uri(rest) {
            let url = &self.input[self.pos..self.pos + matchlen - 1];
            self.pos += matchlen;
            let link = self.make_inline(NodeValue::Link(LinkType::Auto), "");
            link.append(self.make_inline(NodeValue::LinkText, url));
            link.append(self.make_inline(NodeValue::LinkDest, url));
            return link;
        }

        if let Some(matchlen) = scanners::autolink_email(rest) {
            let email = &self.input[self.pos..self.pos + matchlen - 1];
            self.pos += matchlen;
            let link = self.make_inline(NodeValue::Link(LinkType::Auto), "");
            link.append(self.make_inline(NodeValue::LinkText, email));
            link.append(self.make_inline(NodeValue::LinkDest, &format!("mailto:{email}")));
            return link;
        }

        if let Some(matchlen) = scanners::html_tag(rest) {
            let contents = format!("<{}", &self.input[self.pos..self.pos + matchlen]);
            self.pos += matchlen;
            return self.make_inline(NodeValue::InlineHtml, &contents);
        }

        self.make_inline(NodeValue::Text, "<")
    }

    /// Computes the char before/after a delimiter run, skipping carets
    /// and zero-width spaces so the cursor doesn't change flanking.
    fn boundary_char_before(&self, mut ix: usize) -> char {
        loop {
            let before = self.input[..ix]
                .chars()
                .rev()
                .find(|_| true)
                .unwrap_or('\n');
            if before == editor::CARET_CHAR || before == '\u{200b}' {
                ix -= before.len_utf8();
                if ix == 0 {
                    return '\n';
                }
            } else {
                return before;
            }
        }
    }

    fn boundary_char_after(&self, mut ix: usize) -> char {
        loop {
            let after = self.input[ix..].chars().next().unwrap_or('\n');
            if after == editor::CARET_CHAR || after == '\u{200b}' {
                ix += after.len_utf8();
            } else {
                return after;
            }
        }
    }

    fn scan_delims(&mut self, c: u8) -> (usize, bool, bool) {
        let before_char = if self.pos == 0 {
            '\n'
        } else {
            self.boundary_char_before(self.pos)
        };

        let numdelims = self.take_while(c);
        let after_char = self.boundary_char_after(self.pos);

        let left_flanking = numdelims > 0
            && !is_unicode_whitespace(after_char)
            && !(is_unicode_punctuation(after_char)
                && !is_unicode_whitespace(before_char)
                && !is_unicode_punctuation(before_char));
        let right_flanking = numdelims > 0
            && !is_unicode_whitespace(before_char)
            && !(is_unicode_punctuation(before_char)
                && !is_unicode_whitespace(after_char)
                && !is_unicode_punctuation(after_char));

        if c == b'_' {
            (
                numdelims,
                left_flanking && (!right_flanking || is_unicode_punctuation(before_char)),
                right_flanking && (!left_flanking || is_unicode_punctuation(after_char)),
            )
        } else {
            (numdelims, left_flanking, right_flanking)
        }
    }

    fn handle_delim(&mut self, c: u8) -> &'a AstNode<'a> {
        let (numdelims, can_open, can_close) = self.scan_delims(c);
        let contents = (c as char).to_string().repeat(numdelims);
        let inl = self.make_inline(NodeValue::Text, &contents);

        if can_open || can_close {
            self.push_delimiter(c, numdelims, can_open, can_close, inl);
        }

        inl
    }

    fn handle_tilde(&mut self) -> Option<&'a AstNode<'a>> {
        let bytes = self.input.as_bytes();
        let mut run = 0;
        while self.pos + run < bytes.len() && bytes[self.pos + run] == b'~' {
            run += 1;
        }

        if run == 1 && self.options.sub {
            if let Some(node) = self.scan_simple_span(
                b'~',
                NodeValue::Sub,
                NodeValue::SubOpenMarker,
                NodeValue::SubCloseMarker,
            ) {
                return Some(node);
            }
        }

        if self.options.gfm_strikethrough && run <= 2 {
            return Some(self.handle_delim(b'~'));
        }

        self.pos += run;
        Some(self.make_inline(NodeValue::Text, &"~".repeat(run)))
    }

    fn handle_equals(&mut self) -> Option<&'a AstNode<'a>> {
        if self.peek_byte_n(1) == Some(b'=') {
            Some(self.handle_delim(b'='))
        } else {
            self.pos += 1;
            Some(self.make_inline(NodeValue::Text, "="))
        }
    }

    fn handle_sup(&mut self) -> Option<&'a AstNode<'a>> {
        self.scan_simple_span(
            b'^',
            NodeValue::Sup,
            NodeValue::SupOpenMarker,
            NodeValue::SupCloseMarker,
        )
        .or_else(|| {
            self.pos += 1;
            Some(self.make_inline(NodeValue::Text, "^"))
        })
    }

    /// `^x^` / `~x~`: a one-character marker pair whose content may not
    /// contain whitespace. The caret sentinel doesn't count.
    fn scan_simple_span(
        &mut self,
        marker: u8,
        value: NodeValue,
        open_marker: NodeValue,
        close_marker: NodeValue,
    ) -> Option<&'a AstNode<'a>> {
        let bytes = self.input.as_bytes();
        let start = self.pos + 1;
        let mut i = start;
        while i < bytes.len() {
            let c = bytes[i];
            if c == marker {
                break;
            }
            if c == b' ' || c == b'\t' || c == b'\n' {
                return None;
            }
            i += 1;
        }
        if i >= bytes.len() || i == start {
            return None;
        }
        let content = &self.input[start..i];
        if editor::strip_caret(content).is_empty() {
            return None;
        }

        self.pos = i + 1;
        let m = (marker as char).to_string();
        let node = self.make_inline(value, "");
        node.append(self.make_inline(open_marker, &m));
        node.append(self.make_inline(NodeValue::Text, content));
        node.append(self.make_inline(close_marker, &m));
        Some(node)
    }

    fn handle_tag(&mut self) -> Option<&'a AstNode<'a>> {
        let node = self.scan_simple_span(
            b'#',
            NodeValue::Tag,
            NodeValue::TagOpenMarker,
            NodeValue::TagCloseMarker,
        );
        node.or_else(|| {
            self.pos += 1;
            Some(self.make_inline(NodeValue::Text, "#"))
        })
    }

    fn handle_emoji(&mut self) -> Option<&'a AstNode<'a>> {
        let bytes = self.input.as_bytes();
        let start = self.pos + 1;
        let mut i = start;
        while i < bytes.len()
            && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'+' | b'-'))
        {
            i += 1;
        }
        if i == start || i >= bytes.len() || bytes[i] != b':' {
            self.pos += 1;
            return Some(self.make_inline(NodeValue::Text, ":"));
        }

        let alias = &self.input[start..i];

        let custom = crate::emoji_table().lock().unwrap().get(alias).cloned();
        let custom = custom.or_else(|| self.options.alias_emoji.get(alias).cloned());

        let rendered = match custom {
            Some(v) => v,
            None => match emojis::get_by_shortcode(alias) {
                Some(e) => e.as_str().to_string(),
                None => {
                    self.pos += 1;
                    return Some(self.make_inline(NodeValue::Text, ":"));
                }
            },
        };

        self.pos = i + 1;
        let node = self.make_inline(NodeValue::Emoji, "");
        if rendered.contains('/') || rendered.contains(".png") || rendered.contains("${") {
            let site = &self.options.emoji_site;
            let src = rendered.replace("${imgStaticSite}", site);
            let img = self.make_inline(NodeValue::EmojiImg, &src);
            img.append(self.make_inline(NodeValue::EmojiAlias, &format!(":{alias}:")));
            node.append(img);
        } else {
            let uni = self.make_inline(NodeValue::EmojiUnicode, &rendered);
            uni.append(self.make_inline(NodeValue::EmojiAlias, &format!(":{alias}:")));
            node.append(uni);
        }
        Some(node)
    }

    fn handle_dollars(&mut self) -> &'a AstNode<'a> {
        let bytes = self.input.as_bytes();
        let startpos = self.pos;
        let mut dollars = 0;
        while startpos + dollars < bytes.len() && bytes[startpos + dollars] == b'$' {
            dollars += 1;
        }

        if dollars >= 2 {
            if self.options.protyle_wysiwyg {
                // no block promotion from inline position in block editor
                self.pos += 1;
                return self.make_inline(NodeValue::Text, "$");
            }

            // $$…$$ inside a paragraph promotes to a math block
            let content_start = startpos + dollars;
            let mut end = content_start;
            let mut matched = false;
            while end < bytes.len() {
                if bytes[end] == b'$' && end + 1 < bytes.len() && bytes[end + 1] == b'$' {
                    matched = true;
                    break;
                }
                end += 1;
            }
            if matched {
                let content = &self.input[content_start..end];
                self.pos = end + 2;
                let node = self.make_inline(NodeValue::MathBlock, "");
                node.append(self.make_inline(NodeValue::MathBlockOpenMarker, ""));
                node.append(self.make_inline(NodeValue::MathBlockContent, content));
                node.append(self.make_inline(NodeValue::MathBlockCloseMarker, ""));
                return node;
            }
        }

        if !self.options.inline_math_allow_digit_after_open_marker
            && startpos + 1 < bytes.len()
            && isdigit(bytes[startpos + 1])
        {
            let mut end = (startpos + 3).min(self.input.len());
            while end < self.input.len() && !self.input.is_char_boundary(end) {
                end += 1;
            }
            self.pos = end;
            return self.make_inline(NodeValue::Text, &self.input[startpos..end]);
        }

        let endrel = self.match_inline_math_end(&bytes[startpos + 1..]);
        if endrel < 1 {
            self.pos += 1;
            return self.make_inline(NodeValue::Text, "$");
        }
        let endpos = startpos + 1 + endrel as usize;

        let content = &self.input[startpos + 1..endpos];
        if self.options.text_mark && content.contains("<span") {
            // an editor-produced span outranks the formula
            self.pos += 1;
            return self.make_inline(NodeValue::Text, "$");
        }
        if editor::strip_caret(content).trim().is_empty() {
            self.pos += 1;
            return self.make_inline(NodeValue::Text, "$");
        }

        self.pos = endpos + 1;
        let node = self.make_inline(NodeValue::InlineMath, "");
        node.append(self.make_inline(NodeValue::InlineMathOpenMarker, "$"));
        node.append(self.make_inline(NodeValue::InlineMathContent, content));
        node.append(self.make_inline(NodeValue::InlineMathCloseMarker, "$"));
        node
    }

    fn match_inline_math_end(&self, tokens: &[u8]) -> i64 {
        let mut pos = 0;
        while pos < tokens.len() {
            if tokens[pos] == b'$' && pos > 0 && tokens[pos - 1] != b'\\' {
                if pos < tokens.len() - 1 {
                    if !isdigit(tokens[pos + 1])
                        || self.options.inline_math_allow_digit_after_open_marker
                    {
                        return pos as i64;
                    }
                } else {
                    return pos as i64;
                }
            } else if tokens[pos] == b'\n' {
                return -1;
            }
            pos += 1;
        }
        -1
    }

    fn handle_open_brace(&mut self, node: &'a AstNode<'a>) -> Option<&'a AstNode<'a>> {
        // span IAL: `{: k="v"}` annotating the preceding inline
        if self.options.kramdown_span_ial && self.input[self.pos..].starts_with("{:") {
            if let Some(end) = self.input[self.pos..].find('}') {
                let raw = &self.input[self.pos..self.pos + end + 1];
                if ial::parse_ial(raw).is_some() {
                    self.pos += end + 1;
                    return Some(self.make_inline(NodeValue::KramdownSpanIAL, raw));
                }
            }
        }

        // heading ID: `{#custom}` at the end of a heading line
        if self.options.heading_id {
            if let Some(parent) = crate::nodes::containing_block(node) {
                if matches!(parent.data.borrow().value, NodeValue::Heading(..)) {
                    if let Some(end) = self.input[self.pos..].find('}') {
                        let after = &self.input[self.pos + end + 1..];
                        if editor::strip_caret(after).trim().is_empty() && end > 1 {
                            let inner =
                                editor::strip_caret(&self.input[self.pos + 1..self.pos + end]);
                            if !inner.trim().is_empty() && !inner.contains(char::is_whitespace) {
                                self.pos += end + 1;
                                if let Some(last) = node.last_child() {
                                    let mut ast = last.data.borrow_mut();
                                    if matches!(ast.value, NodeValue::Text) {
                                        while ast.tokens.ends_with(' ') {
                                            ast.tokens.pop();
                                        }
                                    }
                                }
                                return Some(
                                    self.make_inline(NodeValue::HeadingID, inner.trim()),
                                );
                            }
                        }
                    }
                }
            }
        }

        self.pos += 1;
        Some(self.make_inline(NodeValue::Text, "{"))
    }

    fn handle_block_ref(&mut self) -> Option<&'a AstNode<'a>> {
        if let Some(m) = block_ref::scan_block_ref(&self.input[self.pos..]) {
            self.pos += m.len;
            let node = self.make_inline(NodeValue::BlockRef, "");
            node.append(self.make_inline(NodeValue::OpenParen, "("));
            node.append(self.make_inline(NodeValue::OpenParen, "("));
            node.append(self.make_inline(NodeValue::BlockRefID, &m.id));
            if !m.text.is_empty() || m.had_caret {
                node.append(self.make_inline(NodeValue::BlockRefSpace, ""));
                let mut text = m.text.clone();
                if m.had_caret {
                    text.push_str(editor::CARET);
                }
                let value = if m.subtype == "d" {
                    NodeValue::BlockRefDynamicText
                } else {
                    NodeValue::BlockRefText
                };
                node.append(self.make_inline(value, &text));
            }
            node.append(self.make_inline(NodeValue::CloseParen, ")"));
            node.append(self.make_inline(NodeValue::CloseParen, ")"));
            return Some(node);
        }

        self.pos += 1;
        Some(self.make_inline(NodeValue::Text, "("))
    }

    fn handle_footnote_ref(&mut self) -> Option<&'a AstNode<'a>> {
        let bytes = self.input.as_bytes();
        let start = self.pos + 2;
        let mut i = start;
        while i < bytes.len() && bytes[i] != b']' && bytes[i] != b'\n' {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b']' || i == start {
            return None;
        }
        let label = editor::strip_caret(&self.input[start..i]);
        if label.trim().is_empty() {
            return None;
        }
        self.pos = i + 1;
        Some(self.make_inline(NodeValue::FootnotesRef { num: 0 }, &label))
    }

    fn push_delimiter(
        &mut self,
        c: u8,
        length: usize,
        can_open: bool,
        can_close: bool,
        inl: &'a AstNode<'a>,
    ) {
        self.delimiters.push(Delimiter {
            inl,
            delim_char: c,
            length,
            orig_length: length,
            can_open,
            can_close,
        });
    }

    fn push_bracket(&mut self, image: bool, inl_text: &'a AstNode<'a>) {
        self.brackets.push(Bracket {
            inl_text,
            image,
            active: true,
            delim_bottom: self.delimiters.len(),
        });
    }

    pub fn clear_brackets(&mut self) {
        self.brackets.clear();
    }

    fn handle_close_bracket(&mut self) -> Option<&'a AstNode<'a>> {
        self.pos += 1;

        let brackets_len = self.brackets.len();
        if brackets_len == 0 {
            return Some(self.make_inline(NodeValue::Text, "]"));
        }

        if !self.brackets[brackets_len - 1].active {
            self.brackets.pop();
            return Some(self.make_inline(NodeValue::Text, "]"));
        }

        let is_image = self.brackets[brackets_len - 1].image;
        let after_link_text_pos = self.pos;

        // inline form `](dest "title")`
        let mut dest: Option<String> = None;
        let mut title = String::new();
        let mut link_type = LinkType::Inline;

        if self.peek_byte() == Some(b'(') {
            if let Some((d, t, consumed)) = self.scan_inline_link(&self.input[self.pos..], is_image)
            {
                dest = Some(d);
                title = t;
                self.pos += consumed;
            }
        }

        if dest.is_none() {
            // reference forms
            let mut label: Option<String> = None;
            if self.peek_byte() == Some(b'[') {
                if let Some((lab, consumed)) = scan_link_label(&self.input[self.pos..]) {
                    if lab.is_empty() {
                        // collapsed: the bracket text is the label
                        label = Some(self.bracket_label(brackets_len - 1));
                    } else {
                        label = Some(lab);
                    }
                    self.pos += consumed;
                }
            }
            if label.is_none() {
                // shortcut
                label = Some(self.bracket_label(brackets_len - 1));
            }

            if let Some(lab) = label {
                let stripped = editor::strip_caret(&lab);
                if let Some(resolved) = self.refmap.lookup(&stripped) {
                    dest = Some(resolved.url.clone());
                    title = resolved.title.clone();
                    link_type = LinkType::Ref;
                } else {
                    self.pos = after_link_text_pos;
                }
            }
        }

        let dest = match dest {
            Some(d) => d,
            None => {
                self.brackets.pop();
                return Some(self.make_inline(NodeValue::Text, "]"));
            }
        };

        if is_image && !self.options.data_image && dest.starts_with("data:image") {
            self.brackets.pop();
            return Some(self.make_inline(NodeValue::Text, "]"));
        }

        let bracket = self.brackets.pop().unwrap();
        self.process_emphasis(bracket.delim_bottom);

        let link = self.make_inline(
            if is_image {
                NodeValue::Image
            } else {
                NodeValue::Link(link_type)
            },
            "",
        );

        let opener = bracket.inl_text;
        opener.insert_before(link);
        if is_image {
            link.append(self.make_inline(NodeValue::Bang, "!"));
        }
        {
            let mut ast = opener.data.borrow_mut();
            ast.value = NodeValue::OpenBracket;
            ast.tokens = "[".to_string();
        }
        // move the label content into the link
        let mut cur = Some(opener);
        while let Some(n) = cur {
            let next = n.next_sibling();
            link.append(n);
            cur = next;
        }
        link.append(self.make_inline(NodeValue::CloseBracket, "]"));
        link.append(self.make_inline(NodeValue::OpenParen, "("));
        link.append(self.make_inline(NodeValue::LinkDest, &dest));
        if !title.is_empty() {
            link.append(self.make_inline(NodeValue::LinkSpace, ""));
            link.append(self.make_inline(NodeValue::LinkTitle, &title));
        }
        link.append(self.make_inline(NodeValue::CloseParen, ")"));

        // no links inside links
        if !is_image {
            for b in self.brackets.iter_mut() {
                if !b.image {
                    b.active = false;
                }
            }
        }

        None
    }

    /// The raw label text of a bracket: the plain text of everything
    /// after its `[`.
    fn bracket_label(&self, ix: usize) -> String {
        let mut out = String::new();
        let mut cur = self.brackets[ix].inl_text.next_sibling();
        while let Some(n) = cur {
            let ast = n.data.borrow();
            match ast.value {
                NodeValue::Text => out.push_str(&ast.tokens),
                NodeValue::CodeSpanContent => out.push_str(&ast.tokens),
                _ => {}
            }
            cur = n.next_sibling();
        }
        out
    }

    /// Parses `(dest "title")` after a close bracket; the input starts
    /// at `(`. Returns (dest, title, consumed).
    fn scan_inline_link(&self, s: &str, is_image: bool) -> Option<(String, String, usize)> {
        let bytes = s.as_bytes();
        let mut i = 1;
        i += strings::spnl(&bytes[i..])?;

        let (dest_raw, dest_len) = scan_link_url(&s[i..], is_image && self.options.img_path_allow_space)?;
        let dest = strings::clean_url(&editor::strip_caret(dest_raw));
        let had_caret_in_dest = dest_raw.contains(editor::CARET);
        i += dest_len;

        let mut title = String::new();
        let sp = strings::spnl(&bytes[i..])?;
        let title_start = i + sp;
        if sp > 0
            && title_start < bytes.len()
            && matches!(bytes[title_start], b'"' | b'\'' | b'(')
        {
            let tlen = scanners::link_title(&bytes[title_start..])?;
            title = strings::clean_title(&s[title_start..title_start + tlen]);
            i = title_start + tlen;
            i += strings::spnl(&bytes[i..])?;
        } else {
            i += sp;
        }

        if i >= bytes.len() || bytes[i] != b')' {
            return None;
        }
        i += 1;

        let mut dest = dest;
        if had_caret_in_dest {
            dest.push_str(editor::CARET);
        }
        Some((dest, title, i))
    }

    /// Pairs delimiter runs bottom-up, wrapping matched spans into
    /// emphasis-family nodes with explicit marker children.
    pub fn process_emphasis(&mut self, stack_bottom: usize) {
        let mut closer_ix = stack_bottom;
        while closer_ix < self.delimiters.len() {
            let (can_close, length, cchar0) = {
                let d = &self.delimiters[closer_ix];
                (d.can_close, d.length, d.delim_char)
            };
            if !can_close || length == 0 || (cchar0 == b'=' && length < 2) {
                closer_ix += 1;
                continue;
            }

            let (cchar, corig, ccan_open) = {
                let d = &self.delimiters[closer_ix];
                (d.delim_char, d.orig_length, d.can_open)
            };

            let mut opener_ix = None;
            let mut i = closer_ix;
            while i > stack_bottom {
                i -= 1;
                let op = &self.delimiters[i];
                if op.length == 0 || op.delim_char != cchar || !op.can_open {
                    continue;
                }
                if cchar == b'=' && op.length < 2 {
                    continue;
                }
                // rule of three
                let odd_match = (ccan_open || op.can_close)
                    && corig % 3 != 0
                    && (op.orig_length + corig) % 3 == 0;
                if !odd_match {
                    opener_ix = Some(i);
                    break;
                }
            }

            match opener_ix {
                Some(op_ix) => {
                    closer_ix = self.insert_emph(op_ix, closer_ix);
                }
                None => {
                    closer_ix += 1;
                }
            }
        }

        self.delimiters.truncate(stack_bottom);
    }

    fn insert_emph(&mut self, opener_ix: usize, closer_ix: usize) -> usize {
        let cchar = self.delimiters[opener_ix].delim_char;

        let mut use_delims =
            if self.delimiters[closer_ix].length >= 2 && self.delimiters[opener_ix].length >= 2 {
                2
            } else {
                1
            };
        if cchar == b'=' {
            use_delims = 2;
        }

        let opener_inl = self.delimiters[opener_ix].inl;
        let closer_inl = self.delimiters[closer_ix].inl;

        self.delimiters[opener_ix].length -= use_delims;
        self.delimiters[closer_ix].length -= use_delims;
        {
            let mut ast = opener_inl.data.borrow_mut();
            let newlen = ast.tokens.len() - use_delims;
            ast.tokens.truncate(newlen);
        }
        {
            let mut ast = closer_inl.data.borrow_mut();
            ast.tokens.drain(..use_delims);
        }

        let marker = (cchar as char).to_string().repeat(use_delims);
        let (value, open_marker, close_marker) = match (cchar, use_delims) {
            (b'*', 2) | (b'_', 2) => (
                NodeValue::Strong,
                NodeValue::StrongOpenMarker,
                NodeValue::StrongCloseMarker,
            ),
            (b'*', _) | (b'_', _) => (
                NodeValue::Emph,
                NodeValue::EmphOpenMarker,
                NodeValue::EmphCloseMarker,
            ),
            (b'~', _) => (
                NodeValue::Strikethrough,
                NodeValue::StrikethroughOpenMarker,
                NodeValue::StrikethroughCloseMarker,
            ),
            (b'=', _) => (
                NodeValue::Mark,
                NodeValue::MarkOpenMarker,
                NodeValue::MarkCloseMarker,
            ),
            _ => (
                NodeValue::Emph,
                NodeValue::EmphOpenMarker,
                NodeValue::EmphCloseMarker,
            ),
        };

        let emph = self.make_inline(value, "");
        opener_inl.insert_after(emph);
        emph.append(self.make_inline(open_marker, &marker));
        while let Some(n) = emph.next_sibling() {
            if n.same_node(closer_inl) {
                break;
            }
            emph.append(n);
        }
        emph.append(self.make_inline(close_marker, &marker));

        // delimiters strictly inside the pair can never match again
        for d in self.delimiters[opener_ix + 1..closer_ix].iter_mut() {
            d.length = 0;
        }

        if self.delimiters[opener_ix].length == 0 {
            opener_inl.detach();
        }
        if self.delimiters[closer_ix].length == 0 {
            closer_inl.detach();
            closer_ix + 1
        } else {
            closer_ix
        }
    }
}

/// Parses a `[label]` run; returns the label text and bytes consumed.
fn scan_link_label(s: &str) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() && i < 1001 {
        match bytes[i] {
            b']' if !strings::is_backslash_escaped(bytes, i) => {
                return Some((s[1..i].to_string(), i + 1));
            }
            b'[' if !strings::is_backslash_escaped(bytes, i) => return None,
            b'\n' => return None,
            _ => i += 1,
        }
    }
    None
}

/// Scans a link destination: `<…>` or a balanced-paren bare URL.
/// Returns the raw slice and its length.
fn scan_link_url(s: &str, allow_space: bool) -> Option<(&str, usize)> {
    let bytes = s.as_bytes();
    if bytes.first() == Some(&b'<') {
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'>' if !strings::is_backslash_escaped(bytes, i) => {
                    return Some((&s[..i + 1], i + 1));
                }
                b'\n' | b'<' => return None,
                _ => i += 1,
            }
        }
        return None;
    }

    let mut i = 0;
    let mut nesting: i32 = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'(' if !strings::is_backslash_escaped(bytes, i) => {
                nesting += 1;
                if nesting > 32 {
                    return None;
                }
                i += 1;
            }
            b')' if !strings::is_backslash_escaped(bytes, i) => {
                if nesting == 0 {
                    break;
                }
                nesting -= 1;
                i += 1;
            }
            b' ' | b'\t' if !allow_space => break,
            b'\n' => break,
            0..=0x1f | 0x7f => break,
            _ => i += 1,
        }
    }
    if nesting != 0 {
        return None;
    }

    // with spaces allowed, back off trailing whitespace before `)` or title
    let mut end = i;
    while end > 0 && (bytes[end - 1] == b' ' || bytes[end - 1] == b'\t') {
        end -= 1;
    }
    if end == 0 {
        return None;
    }
    Some((&s[..end], end))
}

/// Merges adjacent plain text nodes and attaches span IALs to the node
/// they follow; runs after emphasis processing restructured the block.
pub fn postprocess_inlines<'a>(node: &'a AstNode<'a>) {
    // attach span IALs
    let mut to_attach: Vec<&'a AstNode<'a>> = Vec::new();
    for n in node.descendants() {
        if matches!(n.data.borrow().value, NodeValue::KramdownSpanIAL) {
            to_attach.push(n);
        }
    }
    for ial_node in to_attach {
        if let Some(prev) = ial_node.previous_sibling() {
            if let Some(attrs) = ial::parse_ial(&ial_node.data.borrow().tokens) {
                let mut past = prev.data.borrow_mut();
                for (k, v) in &attrs {
                    past.set_ial_attr(k, v);
                }
            }
        }
    }

    // merge sibling text runs
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        let mut child = n.first_child();
        while let Some(c) = child {
            let next = c.next_sibling();
            if let Some(nx) = next {
                let both_text = matches!(c.data.borrow().value, NodeValue::Text)
                    && matches!(nx.data.borrow().value, NodeValue::Text);
                if both_text {
                    let extra = nx.data.borrow().tokens.clone();
                    c.data.borrow_mut().tokens.push_str(&extra);
                    nx.detach();
                    continue; // re-check c against its new next sibling
                }
            }
            stack.push(c);
            child = next;
        }
    }
}
