//! The line-driven block parser: opens, continues and closes container
//! and leaf blocks, then hands finished token buffers to the inline
//! parser.

pub mod options;

pub mod inlines;

mod autolink;
mod block_ref;
mod front_matter;
mod git_conflict;
pub mod ial;
mod math;
mod super_block;
mod table;

use std::cell::RefCell;
use std::cmp::min;
use std::str;

use typed_arena::Arena;

use crate::arena_tree::Node;
use crate::editor;
use crate::entity;
use crate::nodes::{
    self, Ast, AstNode, ListDelimType, ListType, NodeCodeBlock, NodeHeading, NodeList, NodeValue,
};
use crate::scanners::{self, SetextChar};
use crate::strings;

pub use options::{ParseOptions, RenderOptions};

use self::inlines::RefMap;

pub const TAB_STOP: usize = 4;
pub const CODE_INDENT: usize = 4;

// Deeply nested lists degrade quadratically; no real document nests
// this far.
const MAX_LIST_DEPTH: usize = 100;

macro_rules! node_matches {
    ($node:expr, $( $pat:pat_param )|+) => {{
        matches!(
            $node.data.borrow().value,
            $( $pat )|+
        )
    }};
}

pub(crate) use node_matches;

/// A parsed document: the root node plus the diagnostic name it was
/// parsed under.
pub struct Tree<'a> {
    pub root: &'a AstNode<'a>,
    pub name: String,
}

/// Parses `buffer` into a named tree.
pub fn parse<'a>(
    arena: &'a Arena<AstNode<'a>>,
    name: &str,
    buffer: &str,
    options: &ParseOptions,
) -> Tree<'a> {
    Tree {
        root: parse_document(arena, buffer, options),
        name: name.to_string(),
    }
}

/// Parses a Markdown document to an AST allocated in `arena`.
pub fn parse_document<'a>(
    arena: &'a Arena<AstNode<'a>>,
    buffer: &str,
    options: &ParseOptions,
) -> &'a AstNode<'a> {
    let root: &'a AstNode<'a> = arena.alloc(Node::new(RefCell::new(Ast::new(NodeValue::Document))));
    let mut parser = Parser::new(arena, root, options);
    parser.feed(buffer);
    parser.finish()
}

pub struct Parser<'a, 'o> {
    arena: &'a Arena<AstNode<'a>>,
    refmap: RefMap,
    root: &'a AstNode<'a>,
    current: &'a AstNode<'a>,
    line_number: usize,
    offset: usize,
    column: usize,
    first_nonspace: usize,
    first_nonspace_column: usize,
    indent: usize,
    blank: bool,
    partially_consumed_tab: bool,
    curline_len: usize,
    last_line_length: usize,
    link_ref_defs: Vec<String>,
    pub(crate) options: &'o ParseOptions,
}

impl<'a, 'o> Parser<'a, 'o> {
    fn new(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>, options: &'o ParseOptions) -> Self {
        Parser {
            arena,
            refmap: RefMap::new(),
            root,
            current: root,
            line_number: 0,
            offset: 0,
            column: 0,
            first_nonspace: 0,
            first_nonspace_column: 0,
            indent: 0,
            blank: false,
            partially_consumed_tab: false,
            curline_len: 0,
            last_line_length: 0,
            link_ref_defs: Vec::new(),
            options,
        }
    }

    fn feed(&mut self, buffer: &str) {
        let bytes = buffer.as_bytes();
        let mut start = 0;
        while start < bytes.len() {
            let mut end = start;
            while end < bytes.len() && !strings::is_line_end_char(bytes[end]) {
                end += 1;
            }
            let mut line = bytes[start..end].to_vec();
            // NUL bytes become the replacement character
            let mut i = 0;
            while i < line.len() {
                if line[i] == 0 {
                    line.splice(i..i + 1, [0xef, 0xbf, 0xbd]);
                    i += 3;
                } else {
                    i += 1;
                }
            }
            line.push(b'\n');
            self.process_line(&line);

            start = end;
            if start < bytes.len() && bytes[start] == b'\r' {
                start += 1;
            }
            if start < bytes.len() && bytes[start] == b'\n' {
                start += 1;
            }
        }
    }

    fn find_first_nonspace(&mut self, line: &[u8]) {
        let mut chars_to_tab = TAB_STOP - (self.column % TAB_STOP);

        if self.first_nonspace <= self.offset {
            self.first_nonspace = self.offset;
            self.first_nonspace_column = self.column;

            loop {
                if self.first_nonspace >= line.len() {
                    break;
                }
                match line[self.first_nonspace] {
                    b' ' => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += 1;
                        chars_to_tab -= 1;
                        if chars_to_tab == 0 {
                            chars_to_tab = TAB_STOP;
                        }
                    }
                    b'\t' => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += chars_to_tab;
                        chars_to_tab = TAB_STOP;
                    }
                    _ => break,
                }
            }
        }

        self.indent = self.first_nonspace_column - self.column;
        self.blank = self.first_nonspace < line.len()
            && strings::is_line_end_char(line[self.first_nonspace]);
    }

    fn process_line(&mut self, line: &[u8]) {
        self.curline_len = line.len();
        self.offset = 0;
        self.column = 0;
        self.first_nonspace = 0;
        self.first_nonspace_column = 0;
        self.indent = 0;
        self.blank = false;
        self.partially_consumed_tab = false;

        if self.line_number == 0 && line.starts_with("\u{feff}".as_bytes()) {
            self.offset += 3;
        }

        self.line_number += 1;

        let mut all_matched = true;
        if let Some(last_matched_container) = self.check_open_blocks(line, &mut all_matched) {
            let mut container = last_matched_container;
            let current = self.current;
            self.open_new_blocks(&mut container, line, all_matched);

            if current.same_node(self.current) {
                self.add_text_to_container(container, last_matched_container, line);
            }
        }

        self.last_line_length = line.len().saturating_sub(1);
        self.curline_len = 0;
    }

    fn check_open_blocks(
        &mut self,
        line: &[u8],
        all_matched: &mut bool,
    ) -> Option<&'a AstNode<'a>> {
        let (new_all_matched, mut container, should_continue) =
            self.check_open_blocks_inner(self.root, line);

        *all_matched = new_all_matched;
        if !*all_matched {
            container = container.parent().unwrap();
        }

        if !should_continue {
            None
        } else {
            Some(container)
        }
    }

    fn check_open_blocks_inner(
        &mut self,
        mut container: &'a AstNode<'a>,
        line: &[u8],
    ) -> (bool, &'a AstNode<'a>, bool) {
        let mut should_continue = true;

        while nodes::last_child_is_open(container) {
            container = container.last_child().unwrap();
            let ast = &mut *container.data.borrow_mut();

            self.find_first_nonspace(line);

            match ast.value {
                NodeValue::Blockquote => {
                    if !self.parse_block_quote_prefix(line) {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::ListItem(ref nl) => {
                    if !self.parse_list_item_prefix(line, container, nl) {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::CodeBlock(..) => {
                    if !self.parse_code_block_prefix(line, container, ast, &mut should_continue) {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::HtmlBlock(block_type) => {
                    if !self.parse_html_block_prefix(block_type) {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::MathBlock => {
                    if !math::parse_math_block_prefix(self, line, container, ast, &mut should_continue)
                    {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::YamlFrontMatter => {
                    if !front_matter::parse_front_matter_prefix(
                        self,
                        line,
                        container,
                        ast,
                        &mut should_continue,
                    ) {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::GitConflict => {
                    if !git_conflict::parse_git_conflict_prefix(
                        self,
                        line,
                        container,
                        ast,
                        &mut should_continue,
                    ) {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::SuperBlock => {
                    if !super_block::parse_super_block_prefix(
                        self,
                        line,
                        container,
                        ast,
                        &mut should_continue,
                    ) {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::FootnotesDef => {
                    if !self.parse_footnote_definition_block_prefix(line) {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::Paragraph => {
                    if self.blank {
                        return (false, container, should_continue);
                    }
                }
                NodeValue::Heading(..) | NodeValue::TableRow | NodeValue::TableCell(..) => {
                    return (false, container, should_continue);
                }
                _ => {}
            }
        }

        (true, container, should_continue)
    }

    fn detect_blockquote(&mut self, line: &[u8], indented: bool) -> bool {
        !indented && line[self.first_nonspace] == b'>'
    }

    fn handle_blockquote(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
    ) -> bool {
        if !self.detect_blockquote(line, indented) {
            return false;
        }

        let offset = self.first_nonspace + 1 - self.offset;
        self.advance_offset(line, offset, false);
        if strings::is_space_or_tab(line[self.offset]) {
            self.advance_offset(line, 1, true);
        }
        *container = self.add_child(*container, NodeValue::Blockquote);

        true
    }

    fn detect_atx_heading(&mut self, line: &[u8], indented: bool, matched: &mut usize) -> bool {
        !indented
            && unwrap_into(
                scanners::atx_heading_start(&line[self.first_nonspace..]),
                matched,
            )
    }

    fn handle_atx_heading(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
    ) -> bool {
        if !self.detect_atx_heading(line, indented, matched) {
            return false;
        }

        let offset = self.offset;
        self.advance_offset(line, self.first_nonspace + *matched - offset, false);

        let mut hashes = 0;
        let mut pos = self.first_nonspace;
        while pos < line.len() && line[pos] == b'#' {
            hashes += 1;
            pos += 1;
        }

        *container = self.add_child(
            *container,
            NodeValue::Heading(NodeHeading {
                level: hashes,
                setext: false,
            }),
        );
        true
    }

    fn detect_code_fence(&mut self, line: &[u8], indented: bool, matched: &mut usize) -> bool {
        !indented
            && unwrap_into(
                scanners::open_code_fence(&line[self.first_nonspace..]),
                matched,
            )
    }

    fn handle_code_fence(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
    ) -> bool {
        if !self.detect_code_fence(line, indented, matched) {
            return false;
        }

        let first_nonspace = self.first_nonspace;
        let offset = self.offset;
        let ncb = NodeCodeBlock {
            is_fenced: true,
            fence_char: line[first_nonspace],
            fence_len: *matched,
            fence_offset: first_nonspace - offset,
            info: String::new(),
        };
        *container = self.add_child(*container, NodeValue::CodeBlock(ncb));
        self.advance_offset(line, first_nonspace + *matched - offset, false);
        true
    }

    fn handle_html_block(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
        matched: &mut u8,
    ) -> bool {
        if indented {
            return false;
        }
        let s = &line[self.first_nonspace..];
        let found = unwrap_into(scanners::html_block_start(s), matched)
            || (!node_matches!(container, NodeValue::Paragraph)
                && s.starts_with(b"<")
                && unwrap_into(scanners::html_block_start_7(s), matched));
        if !found {
            return false;
        }

        *container = self.add_child(*container, NodeValue::HtmlBlock(*matched));
        true
    }

    fn detect_setext_heading(
        &mut self,
        line: &[u8],
        indented: bool,
        container: &'a AstNode<'a>,
        sc: &mut SetextChar,
    ) -> bool {
        self.options.setext
            && !indented
            && node_matches!(container, NodeValue::Paragraph)
            && unwrap_into(
                scanners::setext_heading_line(&line[self.first_nonspace..]),
                sc,
            )
    }

    fn handle_setext_heading(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
        sc: &mut SetextChar,
    ) -> bool {
        if !self.detect_setext_heading(line, indented, *container, sc) {
            return false;
        }

        let has_content = {
            let mut ast = container.data.borrow_mut();
            self.resolve_reference_link_definitions(&mut ast.content)
        };
        if has_content {
            container.data.borrow_mut().value = NodeValue::Heading(NodeHeading {
                level: match sc {
                    SetextChar::Equals => 1,
                    SetextChar::Hyphen => 2,
                },
                setext: true,
            });
            let adv = line.len() - 1 - self.offset;
            self.advance_offset(line, adv, false);
            return true;
        }
        false
    }

    fn detect_thematic_break(&mut self, line: &[u8], indented: bool, matched: &mut usize) -> bool {
        !indented
            && unwrap_into(
                scan_thematic_break(&line[self.first_nonspace..]),
                matched,
            )
    }

    fn handle_thematic_break(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
        all_matched: bool,
    ) -> bool {
        if !self.detect_thematic_break(line, indented, matched) {
            return false;
        }
        // a `---` under a paragraph is a setext heading, handled earlier;
        // here it ends the containing list when all containers matched
        *container = self.add_child(*container, NodeValue::ThematicBreak);
        let adv = line.len() - 1 - self.offset;
        let _ = all_matched;
        self.advance_offset(line, adv, false);
        true
    }

    fn detect_footnote(&mut self, line: &[u8], indented: bool, matched: &mut usize) -> bool {
        if indented || !self.options.footnotes || line.len() <= self.first_nonspace + 3 {
            return false;
        }
        let s = &line[self.first_nonspace..];
        if !s.starts_with(b"[^") {
            return false;
        }
        let mut i = 2;
        while i < s.len() && s[i] != b']' && !strings::is_line_end_char(s[i]) {
            i += 1;
        }
        if i == 2 || i + 1 >= s.len() || s[i] != b']' || s[i + 1] != b':' {
            return false;
        }
        *matched = i + 2;
        true
    }

    fn handle_footnote(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
    ) -> bool {
        if !self.detect_footnote(line, indented, matched) {
            return false;
        }

        let label = str::from_utf8(&line[self.first_nonspace + 2..self.first_nonspace + *matched - 2])
            .unwrap_or("")
            .to_string();
        let offset = self.first_nonspace + *matched - self.offset;
        self.advance_offset(line, offset, false);
        while self.offset < line.len() && strings::is_space_or_tab(line[self.offset]) {
            self.advance_offset(line, 1, true);
        }
        *container = self.add_child(*container, NodeValue::FootnotesDef);
        container.data.borrow_mut().tokens = label;
        true
    }

    fn detect_list(&mut self, line: &[u8], indented: bool, matched: &mut usize, nl: &mut NodeList) -> bool {
        (!indented || node_matches!(self.current, NodeValue::List(..)))
            && self.indent < 4
            && unwrap_into_2(
                parse_list_marker(
                    line,
                    self.first_nonspace,
                    node_matches!(self.current, NodeValue::Paragraph),
                ),
                matched,
                nl,
            )
    }

    fn handle_list(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
        matched: &mut usize,
        depth: usize,
        nl: &mut NodeList,
    ) -> bool {
        if depth >= MAX_LIST_DEPTH || !self.detect_list(line, indented, matched, nl) {
            return false;
        }

        let offset = self.first_nonspace + *matched - self.offset;
        self.advance_offset(line, offset, false);
        let (save_partially_consumed_tab, save_offset, save_column) =
            (self.partially_consumed_tab, self.offset, self.column);

        while self.column - save_column <= 5 && strings::is_space_or_tab(line[self.offset]) {
            self.advance_offset(line, 1, true);
        }

        let i = self.column - save_column;
        if !(1..5).contains(&i) || strings::is_line_end_char(line[self.offset]) {
            nl.padding = *matched + 1;
            self.offset = save_offset;
            self.column = save_column;
            self.partially_consumed_tab = save_partially_consumed_tab;
            if i > 0 {
                self.advance_offset(line, 1, true);
            }
        } else {
            nl.padding = *matched + i;
        }

        nl.marker_offset = self.indent;

        if !node_matches!(container, NodeValue::List(..))
            || !lists_match(&container.data.borrow().value, nl)
        {
            *container = self.add_child(*container, NodeValue::List(*nl));
        }

        *container = self.add_child(*container, NodeValue::ListItem(*nl));
        true
    }

    fn detect_code_block(&mut self, indented: bool, maybe_lazy: bool) -> bool {
        self.options.indent_code_block && indented && !maybe_lazy && !self.blank
    }

    fn handle_code_block(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
        maybe_lazy: bool,
    ) -> bool {
        if !self.detect_code_block(indented, maybe_lazy) {
            return false;
        }

        self.advance_offset(line, CODE_INDENT, true);
        let ncb = NodeCodeBlock {
            is_fenced: false,
            fence_char: 0,
            fence_len: 0,
            fence_offset: 0,
            info: String::new(),
        };
        *container = self.add_child(*container, NodeValue::CodeBlock(ncb));
        true
    }

    fn open_new_blocks(&mut self, container: &mut &'a AstNode<'a>, line: &[u8], all_matched: bool) {
        let mut matched: usize = 0;
        let mut html_kind: u8 = 0;
        let mut nl: NodeList = NodeList::default();
        let mut sc = SetextChar::Equals;
        let mut maybe_lazy = node_matches!(self.current, NodeValue::Paragraph);
        let mut depth = 0;

        while !node_matches!(
            container,
            NodeValue::CodeBlock(..)
                | NodeValue::HtmlBlock(..)
                | NodeValue::MathBlock
                | NodeValue::YamlFrontMatter
                | NodeValue::GitConflict
        ) {
            depth += 1;
            self.find_first_nonspace(line);
            let indented = self.indent >= CODE_INDENT;

            if git_conflict::handle_git_conflict(self, container, line, indented)
                || self.handle_blockquote(container, line, indented)
                || self.handle_atx_heading(container, line, indented, &mut matched)
                || self.handle_code_fence(container, line, indented, &mut matched)
                || self.handle_setext_heading(container, line, indented, &mut sc)
                || self.handle_html_block(container, line, indented, &mut html_kind)
                || front_matter::handle_front_matter(self, container, line, indented)
                || self.handle_thematic_break(container, line, indented, &mut matched, all_matched)
                || self.handle_list(container, line, indented, &mut matched, depth, &mut nl)
                || math::handle_math_block(self, container, line, indented)
                || self.handle_code_block(container, line, indented, maybe_lazy)
                || self.handle_footnote(container, line, indented, &mut matched)
                || ial::handle_block_ial(self, container, line, indented)
                || self.handle_block_query_embed(container, line, indented)
                || super_block::handle_super_block(self, container, line, indented)
            {
                // block opened
            } else {
                break;
            }

            if container.data.borrow().value.accepts_lines() {
                break;
            }

            maybe_lazy = false;
        }
    }

    fn handle_block_query_embed(
        &mut self,
        container: &mut &'a AstNode<'a>,
        line: &[u8],
        indented: bool,
    ) -> bool {
        if indented || !self.options.block_ref {
            return false;
        }
        let s = strings::trim_slice(&line[self.first_nonspace..]);
        let stripped = editor::strip_caret(str::from_utf8(s).unwrap_or(""));
        let t = stripped.as_bytes();
        if t.len() < 4 || !t.starts_with(b"{{") || t.starts_with(b"{{{") || !t.ends_with(b"}}") {
            return false;
        }
        let script = strings::trim_str(&stripped[2..stripped.len() - 2]).to_string();

        let node = self.add_child(*container, NodeValue::BlockQueryEmbed);
        self.add_child_to(node, NodeValue::OpenBrace);
        let script_node = self.add_child_to(node, NodeValue::BlockQueryEmbedScript);
        script_node.data.borrow_mut().tokens = script;
        self.add_child_to(node, NodeValue::CloseBrace);
        *container = node;

        let adv = line.len() - 1 - self.offset;
        self.advance_offset(line, adv, false);
        true
    }

    pub(crate) fn advance_offset(&mut self, line: &[u8], mut count: usize, columns: bool) {
        while count > 0 {
            match line[self.offset] {
                b'\t' => {
                    let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                    if columns {
                        self.partially_consumed_tab = chars_to_tab > count;
                        let chars_to_advance = min(count, chars_to_tab);
                        self.column += chars_to_advance;
                        self.offset += if self.partially_consumed_tab { 0 } else { 1 };
                        count -= chars_to_advance;
                    } else {
                        self.partially_consumed_tab = false;
                        self.column += chars_to_tab;
                        self.offset += 1;
                        count -= 1;
                    }
                }
                _ => {
                    self.partially_consumed_tab = false;
                    self.offset += 1;
                    self.column += 1;
                    count -= 1;
                }
            }
        }
    }

    fn parse_block_quote_prefix(&mut self, line: &[u8]) -> bool {
        let indent = self.indent;
        if indent <= 3 && line[self.first_nonspace] == b'>' {
            self.advance_offset(line, indent + 1, true);

            if strings::is_space_or_tab(line[self.offset]) {
                self.advance_offset(line, 1, true);
            }

            return true;
        }

        false
    }

    fn parse_footnote_definition_block_prefix(&mut self, line: &[u8]) -> bool {
        if self.indent >= 4 {
            self.advance_offset(line, 4, true);
            true
        } else {
            line == b"\n" || line == b"\r\n"
        }
    }

    fn parse_list_item_prefix(
        &mut self,
        line: &[u8],
        container: &'a AstNode<'a>,
        nl: &NodeList,
    ) -> bool {
        if self.indent >= nl.marker_offset + nl.padding {
            self.advance_offset(line, nl.marker_offset + nl.padding, true);
            true
        } else if self.blank && container.first_child().is_some() {
            let offset = self.first_nonspace - self.offset;
            self.advance_offset(line, offset, false);
            true
        } else {
            false
        }
    }

    fn parse_code_block_prefix(
        &mut self,
        line: &[u8],
        container: &'a AstNode<'a>,
        ast: &mut Ast,
        should_continue: &mut bool,
    ) -> bool {
        let (fenced, fence_char, fence_len, fence_offset) = match ast.value {
            NodeValue::CodeBlock(ref ncb) => {
                (ncb.is_fenced, ncb.fence_char, ncb.fence_len, ncb.fence_offset)
            }
            _ => unreachable!(),
        };

        if !fenced {
            if self.indent >= CODE_INDENT {
                self.advance_offset(line, CODE_INDENT, true);
                return true;
            } else if self.blank {
                let offset = self.first_nonspace - self.offset;
                self.advance_offset(line, offset, false);
                return true;
            }
            return false;
        }

        let matched = if self.indent <= 3 && line[self.first_nonspace] == fence_char {
            scanners::close_code_fence(&line[self.first_nonspace..]).unwrap_or(0)
        } else {
            0
        };

        if matched >= fence_len {
            *should_continue = false;
            self.advance_offset(line, matched, false);
            self.current = self.finalize_borrowed(container, ast).unwrap();
            return false;
        }

        let mut i = fence_offset;
        while i > 0 && strings::is_space_or_tab(line[self.offset]) {
            self.advance_offset(line, 1, true);
            i -= 1;
        }
        true
    }

    fn parse_html_block_prefix(&mut self, t: u8) -> bool {
        match t {
            1..=5 => true,
            6 | 7 => !self.blank,
            _ => unreachable!(),
        }
    }

    pub(crate) fn add_child(
        &mut self,
        mut parent: &'a AstNode<'a>,
        value: NodeValue,
    ) -> &'a AstNode<'a> {
        while !nodes::can_contain_type(parent, &value) {
            parent = self.finalize(parent).unwrap();
        }

        let node = self.arena.alloc(Node::new(RefCell::new(Ast::new(value))));
        parent.append(node);
        node
    }

    /// Appends a child without consulting the open-block chain; for
    /// building a leaf's marker children.
    pub(crate) fn add_child_to(
        &mut self,
        parent: &'a AstNode<'a>,
        value: NodeValue,
    ) -> &'a AstNode<'a> {
        let mut ast = Ast::new(value);
        ast.open = false;
        let node = self.arena.alloc(Node::new(RefCell::new(ast)));
        parent.append(node);
        node
    }

    fn add_text_to_container(
        &mut self,
        mut container: &'a AstNode<'a>,
        last_matched_container: &'a AstNode<'a>,
        line: &[u8],
    ) {
        self.find_first_nonspace(line);

        if self.blank {
            if let Some(last_child) = container.last_child() {
                last_child.data.borrow_mut().last_line_blank = true;
            }
        }

        container.data.borrow_mut().last_line_blank = self.blank
            && match container.data.borrow().value {
                NodeValue::Blockquote
                | NodeValue::Heading(..)
                | NodeValue::ThematicBreak
                | NodeValue::SuperBlock => false,
                NodeValue::CodeBlock(ref ncb) => !ncb.is_fenced,
                NodeValue::ListItem(..) => container.first_child().is_some(),
                _ => true,
            };

        let mut tmp = container;
        while let Some(parent) = tmp.parent() {
            parent.data.borrow_mut().last_line_blank = false;
            tmp = parent;
        }

        if !self.current.same_node(last_matched_container)
            && container.same_node(last_matched_container)
            && !self.blank
            && node_matches!(self.current, NodeValue::Paragraph)
        {
            self.add_line(self.current, line);
        } else {
            while !self.current.same_node(last_matched_container) {
                self.current = self.finalize(self.current).unwrap();
            }

            let is_code = node_matches!(container, NodeValue::CodeBlock(..));
            let html_kind = match container.data.borrow().value {
                NodeValue::HtmlBlock(t) => Some(t),
                _ => None,
            };

            if is_code {
                self.add_line(container, line);
            } else if let Some(block_type) = html_kind {
                self.add_line(container, line);

                let matches_end_condition = match block_type {
                    1 => scanners::html_block_end_1(&line[self.first_nonspace..]),
                    2 => scanners::html_block_end_2(&line[self.first_nonspace..]),
                    3 => scanners::html_block_end_3(&line[self.first_nonspace..]),
                    4 => scanners::html_block_end_4(&line[self.first_nonspace..]),
                    5 => scanners::html_block_end_5(&line[self.first_nonspace..]),
                    _ => false,
                };

                if matches_end_condition {
                    container = self.finalize(container).unwrap();
                }
            } else if self.blank {
                // nothing to add
            } else if container.data.borrow().value.accepts_lines() {
                let mut line_vec: Vec<u8> = line.into();
                if let NodeValue::Heading(ref nh) = container.data.borrow().value {
                    if !nh.setext {
                        strings::chop_trailing_hashtags(&mut line_vec);
                    }
                };
                let count = self.first_nonspace - self.offset;

                if self.first_nonspace <= line_vec.len() {
                    self.advance_offset(&line_vec, count, false);
                    self.add_line(container, &line_vec);
                }
            } else {
                container = self.add_child(container, NodeValue::Paragraph);
                let count = self.first_nonspace - self.offset;
                self.advance_offset(line, count, false);
                self.add_line(container, line);
            }

            self.current = container;
        }
    }

    fn add_line(&mut self, node: &'a AstNode<'a>, line: &[u8]) {
        let mut ast = node.data.borrow_mut();
        assert!(ast.open);
        if self.partially_consumed_tab {
            self.offset += 1;
            let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
            for _ in 0..chars_to_tab {
                ast.content.push(' ');
            }
        }
        if self.offset < line.len() {
            ast.content
                .push_str(str::from_utf8(&line[self.offset..]).unwrap_or(""));
        }
    }

    fn finish(&mut self) -> &'a AstNode<'a> {
        self.finalize_document();
        self.root
    }

    fn finalize_document(&mut self) {
        while !self.current.same_node(self.root) {
            self.current = self.finalize(self.current).unwrap();
        }

        self.finalize(self.root);

        self.append_link_ref_defs();
        self.process_inlines();
        if self.options.gfm_auto_link {
            autolink::process_autolinks(self.arena, self.root);
        }
        self.process_tasklist();
        if self.options.footnotes {
            self.process_footnotes();
        }
    }

    fn finalize(&mut self, node: &'a AstNode<'a>) -> Option<&'a AstNode<'a>> {
        self.finalize_borrowed(node, &mut node.data.borrow_mut())
    }

    fn resolve_reference_link_definitions(&mut self, content: &mut String) -> bool {
        if !self.options.link_ref {
            return !strings::is_blank(content.as_bytes());
        }
        let mut seeked = 0;
        {
            let mut seek: &[u8] = content.as_bytes();
            let mut pos = 0;
            while !seek.is_empty()
                && seek[0] == b'['
                && unwrap_into(self.parse_reference_inline(seek), &mut pos)
            {
                seek = &seek[pos..];
                seeked += pos;
            }
        }

        if seeked != 0 {
            *content = content[seeked..].to_string();
        }

        !strings::is_blank(content.as_bytes())
    }

    fn finalize_borrowed(
        &mut self,
        node: &'a AstNode<'a>,
        ast: &mut Ast,
    ) -> Option<&'a AstNode<'a>> {
        assert!(ast.open);
        ast.open = false;

        let parent = node.parent();

        match ast.value {
            NodeValue::Paragraph => {
                let has_content = {
                    let mut content = std::mem::take(&mut ast.content);
                    let has = self.resolve_reference_link_definitions(&mut content);
                    ast.content = content;
                    has
                };
                if !has_content {
                    node.detach();
                } else if self.options.toc && is_toc_paragraph(&ast.content, self.options) {
                    ast.value = NodeValue::Toc;
                    ast.content.clear();
                } else if self.options.gfm_table {
                    table::try_parse_table(self, node, ast);
                }
            }
            NodeValue::CodeBlock(ref mut ncb) => {
                let content = &mut ast.content;
                if !ncb.is_fenced {
                    let mut bytes = std::mem::take(content).into_bytes();
                    strings::remove_trailing_blank_lines(&mut bytes);
                    bytes.push(b'\n');
                    *content = String::from_utf8(bytes).unwrap_or_default();
                } else {
                    let mut pos = 0;
                    let bytes = content.as_bytes();
                    while pos < bytes.len() {
                        if strings::is_line_end_char(bytes[pos]) {
                            break;
                        }
                        pos += 1;
                    }

                    let mut info = entity::unescape_html(&content[..pos]).into_bytes();
                    strings::trim(&mut info);
                    strings::unescape(&mut info);
                    ncb.info = String::from_utf8(info).unwrap_or_default();

                    if pos < content.len() {
                        pos += 1; // the newline after the info string
                    }
                    content.drain(..pos);
                }
                ast.tokens = std::mem::take(content);
            }
            NodeValue::HtmlBlock(..) => {
                ast.tokens = std::mem::take(&mut ast.content);
            }
            NodeValue::List(ref mut nl) => {
                nl.tight = true;
                let mut ch = node.first_child();

                while let Some(item) = ch {
                    if item.data.borrow().last_line_blank && item.next_sibling().is_some() {
                        nl.tight = false;
                        break;
                    }

                    let mut subch = item.first_child();
                    while let Some(subitem) = subch {
                        if (item.next_sibling().is_some() || subitem.next_sibling().is_some())
                            && nodes::ends_with_blank_line(subitem)
                        {
                            nl.tight = false;
                            break;
                        }
                        subch = subitem.next_sibling();
                    }

                    if !nl.tight {
                        break;
                    }

                    ch = item.next_sibling();
                }
                let tight = nl.tight;
                // propagate tightness to the items
                let mut item = node.first_child();
                while let Some(i) = item {
                    if let NodeValue::ListItem(ref mut inl) = i.data.borrow_mut().value {
                        inl.tight = tight;
                    }
                    item = i.next_sibling();
                }
            }
            NodeValue::MathBlock => {
                math::finalize_math_block(self, node, ast);
            }
            NodeValue::YamlFrontMatter => {
                front_matter::finalize_front_matter(self, node, ast);
            }
            NodeValue::GitConflict => {
                git_conflict::finalize_git_conflict(self, node, ast);
            }
            NodeValue::SuperBlock => {
                super_block::finalize_super_block(self, node);
            }
            _ => (),
        }

        parent
    }

    fn process_inlines(&mut self) {
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if node.data.borrow().value.contains_inlines() {
                self.parse_inlines(node);
            }
            let mut child = node.first_child();
            while let Some(c) = child {
                stack.push(c);
                child = c.next_sibling();
            }
        }
    }

    fn parse_inlines(&mut self, node: &'a AstNode<'a>) {
        let content = {
            let mut ast = node.data.borrow_mut();
            let mut content = std::mem::take(&mut ast.content);
            // paragraph-leading spaces survive only when configured
            if !self.options.paragraph_beginning_space
                && matches!(ast.value, NodeValue::Paragraph)
            {
                let bytes = std::mem::take(&mut content).into_bytes();
                let trimmed = strings::trim_slice(&bytes);
                content = String::from_utf8(trimmed.to_vec()).unwrap_or_default();
            } else {
                let mut bytes = content.into_bytes();
                strings::rtrim(&mut bytes);
                content = String::from_utf8(bytes).unwrap_or_default();
            }
            content
        };

        let mut subject =
            inlines::Subject::new(self.arena, self.options, &content, &mut self.refmap);

        while subject.parse_inline(node) {}

        subject.process_emphasis(0);
        subject.clear_brackets();
        inlines::postprocess_inlines(node);
    }

    /// Moves footnote definitions into a trailing definition block and
    /// numbers references in document order.
    fn process_footnotes(&mut self) {
        let mut defs: Vec<&'a AstNode<'a>> = Vec::new();
        for n in self.root.descendants() {
            if node_matches!(n, NodeValue::FootnotesDef) {
                defs.push(n);
            }
        }

        if defs.is_empty() {
            return;
        }

        let mut num = 0;
        for n in self.root.descendants() {
            let mut ast = n.data.borrow_mut();
            let label = ast.tokens.to_ascii_lowercase();
            if let NodeValue::FootnotesRef { num: ref mut refnum } = ast.value {
                if defs
                    .iter()
                    .any(|d| d.data.borrow().tokens.to_ascii_lowercase() == label)
                {
                    num += 1;
                    *refnum = num;
                }
            }
        }

        let def_block = self
            .arena
            .alloc(Node::new(RefCell::new(Ast::new(NodeValue::FootnotesDefBlock))));
        def_block.data.borrow_mut().open = false;
        self.root.append(def_block);
        for def in defs {
            def_block.append(def);
        }
    }

    /// Converts `[ ]`/`[x]` leading paragraph text in list items into
    /// task list item markers.
    fn process_tasklist(&mut self) {
        if !self.options.gfm_task_list_item {
            return;
        }

        for item in self.root.descendants() {
            if !node_matches!(item, NodeValue::ListItem(..)) {
                continue;
            }
            let para = match item.first_child() {
                Some(p) if node_matches!(p, NodeValue::Paragraph) => p,
                _ => continue,
            };
            let text_node = match para.first_child() {
                Some(t) if node_matches!(t, NodeValue::Text) => t,
                _ => continue,
            };

            let checked = {
                let ast = text_node.data.borrow();
                let stripped = editor::strip_caret(&ast.tokens);
                let b = stripped.as_bytes();
                if b.len() >= 3 && b[0] == b'[' && b[2] == b']' {
                    match b[1] {
                        b' ' => {
                            if b.len() == 3 || b[3] == b' ' {
                                Some(false)
                            } else {
                                None
                            }
                        }
                        b'x' | b'X' => {
                            if b.len() == 3 || b[3] == b' ' {
                                Some(true)
                            } else {
                                None
                            }
                        }
                        _ => None,
                    }
                } else {
                    None
                }
            };

            let checked = match checked {
                Some(c) => c,
                None => continue,
            };

            {
                let mut ast = text_node.data.borrow_mut();
                let rest = editor::strip_caret(&ast.tokens);
                let had_caret = ast.tokens.contains(editor::CARET);
                let mut remaining = rest[3..].trim_start().to_string();
                if had_caret {
                    remaining.insert_str(0, editor::CARET);
                }
                ast.tokens = remaining;
            }

            let marker = self
                .arena
                .alloc(Node::new(RefCell::new(Ast::new(NodeValue::TaskListItemMarker {
                    checked,
                }))));
            marker.data.borrow_mut().open = false;
            item.prepend(marker);

            set_list_type(item, ListType::Task);
            if let Some(list) = item.parent() {
                set_list_type(list, ListType::Task);
            }
        }
    }

    fn append_link_ref_defs(&mut self) {
        if self.link_ref_defs.is_empty() {
            return;
        }
        let block = self
            .arena
            .alloc(Node::new(RefCell::new(Ast::new(NodeValue::LinkRefDefBlock))));
        block.data.borrow_mut().open = false;
        for raw in self.link_ref_defs.drain(..) {
            let def = self
                .arena
                .alloc(Node::new(RefCell::new(Ast::with_tokens(NodeValue::LinkRefDef, raw))));
            def.data.borrow_mut().open = false;
            block.append(def);
        }
        self.root.append(block);
    }

    /// Parses one `[label]: dest "title"` definition at the start of
    /// `content`; returns bytes consumed.
    fn parse_reference_inline(&mut self, content: &[u8]) -> Option<usize> {
        let mut pos = 1; // past the `[`
        let mut label_end = None;
        while pos < content.len() && pos < 1001 {
            match content[pos] {
                b']' if !strings::is_backslash_escaped(content, pos) => {
                    label_end = Some(pos);
                    break;
                }
                b'[' if !strings::is_backslash_escaped(content, pos) => return None,
                _ => pos += 1,
            }
        }

        let label_end = label_end?;
        let label = str::from_utf8(&content[1..label_end]).ok()?;
        if label.trim().is_empty() {
            return None;
        }

        pos = label_end + 1;
        if pos >= content.len() || content[pos] != b':' {
            return None;
        }
        pos += 1;
        pos += strings::spnl(&content[pos..])?;

        // destination
        let dest_start = pos;
        if pos < content.len() && content[pos] == b'<' {
            while pos < content.len() && content[pos] != b'>' && content[pos] != b'\n' {
                pos += 1;
            }
            if pos >= content.len() || content[pos] != b'>' {
                return None;
            }
            pos += 1;
        } else {
            while pos < content.len()
                && !strings::is_line_end_char(content[pos])
                && content[pos] != b' '
                && content[pos] != b'\t'
            {
                pos += 1;
            }
        }
        if pos == dest_start {
            return None;
        }
        let dest = str::from_utf8(&content[dest_start..pos]).ok()?.to_string();

        // optional title on the same or next line
        let after_dest = pos;
        let mut title = String::new();
        let mut title_end = pos;
        if let Some(sp) = strings::spnl(&content[pos..]) {
            let title_start = pos + sp;
            if sp > 0 {
                if let Some(tlen) = scanners::link_title(&content[title_start..]) {
                    title = str::from_utf8(&content[title_start..title_start + tlen])
                        .unwrap_or("")
                        .to_string();
                    title_end = title_start + tlen;
                }
            }
        }

        // the rest of the line must be blank
        let mut end = if title.is_empty() { after_dest } else { title_end };
        while end < content.len() && strings::is_space_or_tab(content[end]) {
            end += 1;
        }
        if end < content.len() && !strings::is_line_end_char(content[end]) {
            if title.is_empty() {
                return None;
            }
            // retry without the title
            title.clear();
            end = after_dest;
            while end < content.len() && strings::is_space_or_tab(content[end]) {
                end += 1;
            }
            if end < content.len() && !strings::is_line_end_char(content[end]) {
                return None;
            }
        }
        while end < content.len() && strings::is_line_end_char(content[end]) {
            end += 1;
        }

        let normalized = strings::normalize_label(label);
        if !normalized.is_empty() {
            let raw = str::from_utf8(&content[..end]).unwrap_or("").trim().to_string();
            self.refmap.add(
                &normalized,
                &strings::clean_url(&dest),
                &strings::clean_title(&title),
            );
            self.link_ref_defs.push(raw);
        }

        Some(end)
    }
}

fn set_list_type<'a>(node: &'a AstNode<'a>, lt: ListType) {
    let mut ast = node.data.borrow_mut();
    match ast.value {
        NodeValue::List(ref mut nl) | NodeValue::ListItem(ref mut nl) => nl.list_type = lt,
        _ => {}
    }
}

/// A single-line paragraph reading `[toc]`.
fn is_toc_paragraph(content: &str, options: &ParseOptions) -> bool {
    let mut line = content.trim().to_string();
    if options.editor_mode() {
        line = editor::strip_caret(&line);
    }
    line.eq_ignore_ascii_case("[toc]") && !content.trim_end().contains('\n')
}

// `---` rows double as setext underlines and list bullets; those take
// precedence and are tried first by the caller.
fn scan_thematic_break(line: &[u8]) -> Option<usize> {
    if line.is_empty() {
        return None;
    }
    let ch = line[0];
    if ch != b'*' && ch != b'-' && ch != b'_' {
        return None;
    }
    let mut count = 0;
    let mut i = 0;
    while i < line.len() {
        match line[i] {
            c if c == ch => count += 1,
            b' ' | b'\t' => {}
            b'\n' | b'\r' => break,
            _ => return None,
        }
        i += 1;
    }
    if count >= 3 {
        Some(i)
    } else {
        None
    }
}

fn parse_list_marker(
    line: &[u8],
    mut pos: usize,
    interrupts_paragraph: bool,
) -> Option<(usize, NodeList)> {
    let mut c = line[pos];
    let startpos = pos;

    if c == b'*' || c == b'-' || c == b'+' {
        pos += 1;
        if !crate::ctype::isspace(line[pos]) {
            return None;
        }

        if interrupts_paragraph {
            let mut i = pos;
            while strings::is_space_or_tab(line[i]) {
                i += 1;
            }
            if line[i] == b'\n' {
                return None;
            }
        }

        return Some((
            pos - startpos,
            NodeList {
                list_type: ListType::Bullet,
                marker_offset: 0,
                padding: 0,
                start: 1,
                delimiter: ListDelimType::Period,
                bullet_char: c,
                tight: false,
            },
        ));
    }

    if crate::ctype::isdigit(c) {
        let mut start: usize = 0;
        let mut digits = 0;

        loop {
            start = (10 * start) + (line[pos] - b'0') as usize;
            pos += 1;
            digits += 1;

            if !(digits < 9 && pos < line.len() && crate::ctype::isdigit(line[pos])) {
                break;
            }
        }

        if interrupts_paragraph && start != 1 {
            return None;
        }

        c = line[pos];
        if c != b'.' && c != b')' {
            return None;
        }

        pos += 1;

        if !crate::ctype::isspace(line[pos]) {
            return None;
        }

        if interrupts_paragraph {
            let mut i = pos;
            while strings::is_space_or_tab(line[i]) {
                i += 1;
            }
            if strings::is_line_end_char(line[i]) {
                return None;
            }
        }

        return Some((
            pos - startpos,
            NodeList {
                list_type: ListType::Ordered,
                marker_offset: 0,
                padding: 0,
                start,
                delimiter: if c == b'.' {
                    ListDelimType::Period
                } else {
                    ListDelimType::Paren
                },
                bullet_char: 0,
                tight: false,
            },
        ));
    }

    None
}

fn lists_match(list_value: &NodeValue, item_data: &NodeList) -> bool {
    match list_value {
        NodeValue::List(list_data) => {
            list_data.list_type == item_data.list_type
                && list_data.delimiter == item_data.delimiter
                && list_data.bullet_char == item_data.bullet_char
        }
        _ => false,
    }
}

pub(crate) fn unwrap_into<T>(t: Option<T>, out: &mut T) -> bool {
    match t {
        Some(v) => {
            *out = v;
            true
        }
        _ => false,
    }
}

fn unwrap_into_2<T, U>(tu: Option<(T, U)>, out_t: &mut T, out_u: &mut U) -> bool {
    match tu {
        Some((t, u)) => {
            *out_t = t;
            *out_u = u;
            true
        }
        _ => false,
    }
}
