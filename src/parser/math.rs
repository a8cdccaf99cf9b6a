//! `$$` math blocks.

use crate::editor;
use crate::nodes::{Ast, AstNode, NodeValue};
use crate::parser::Parser;
use crate::strings;

/// Opens a math block on a line whose first nonspace run is `$$`.
pub(crate) fn handle_math_block<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    container: &mut &'a AstNode<'a>,
    line: &[u8],
    indented: bool,
) -> bool {
    if indented {
        return false;
    }
    let s = &line[parser.first_nonspace..];
    if !s.starts_with(b"$$") {
        return false;
    }
    // $$$ and beyond is not a math fence
    if s.starts_with(b"$$$") {
        return false;
    }

    let offset = parser.first_nonspace + 2 - parser.offset;
    parser.advance_offset(line, offset, false);
    *container = parser.add_child(*container, NodeValue::MathBlock);
    true
}

/// A lone `$$` line closes the block; carets ride along into content.
pub(crate) fn parse_math_block_prefix<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    line: &[u8],
    container: &'a AstNode<'a>,
    ast: &mut Ast,
    should_continue: &mut bool,
) -> bool {
    let raw = std::str::from_utf8(&line[parser.first_nonspace..]).unwrap_or("");
    let stripped = editor::strip_caret(raw);
    if stripped.trim() == "$$" {
        if raw.contains(editor::CARET) {
            ast.content.push_str(editor::CARET);
        }
        *should_continue = false;
        let adv = line.len() - 1 - parser.offset;
        parser.advance_offset(line, adv, false);
        parser.current = parser.finalize_borrowed(container, ast).unwrap();
        return false;
    }
    true
}

/// Splits the accumulated buffer into open marker, content and close
/// marker children.
pub(crate) fn finalize_math_block<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    node: &'a AstNode<'a>,
    ast: &mut Ast,
) {
    let mut content = std::mem::take(&mut ast.content);
    while content.ends_with('\n') || content.ends_with('\r') {
        content.pop();
    }
    // single-line form carries its own close marker
    if let Some(stripped) = content.strip_suffix("$$") {
        content = stripped.to_string();
    }

    parser.add_child_to(node, NodeValue::MathBlockOpenMarker);
    let c = parser.add_child_to(node, NodeValue::MathBlockContent);
    c.data.borrow_mut().tokens = strings::trim_str(&content).to_string();
    parser.add_child_to(node, NodeValue::MathBlockCloseMarker);
}
