//! Git conflict marker blocks: everything from `<<<<<<<` through
//! `>>>>>>>` is preserved verbatim as one block.

use crate::nodes::{Ast, AstNode, NodeValue};
use crate::parser::Parser;

pub(crate) fn handle_git_conflict<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    container: &mut &'a AstNode<'a>,
    line: &[u8],
    indented: bool,
) -> bool {
    if indented || !parser.options.git_conflict || parser.indent != 0 {
        return false;
    }
    if !line[parser.first_nonspace..].starts_with(b"<<<<<<< ") {
        return false;
    }

    *container = parser.add_child(*container, NodeValue::GitConflict);
    true
}

pub(crate) fn parse_git_conflict_prefix<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    line: &[u8],
    container: &'a AstNode<'a>,
    ast: &mut Ast,
    should_continue: &mut bool,
) -> bool {
    if line[parser.first_nonspace..].starts_with(b">>>>>>> ") {
        ast.content
            .push_str(std::str::from_utf8(line).unwrap_or(""));
        *should_continue = false;
        let adv = line.len() - 1 - parser.offset;
        parser.advance_offset(line, adv, false);
        parser.current = parser.finalize_borrowed(container, ast).unwrap();
        return false;
    }
    true
}

pub(crate) fn finalize_git_conflict<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    node: &'a AstNode<'a>,
    ast: &mut Ast,
) {
    let content = std::mem::take(&mut ast.content);
    let mut lines: Vec<&str> = content.lines().collect();

    let open = if !lines.is_empty() && lines[0].starts_with("<<<<<<< ") {
        lines.remove(0).to_string()
    } else {
        "<<<<<<< ".to_string()
    };
    let close = if lines.last().map_or(false, |l| l.starts_with(">>>>>>> ")) {
        lines.pop().unwrap().to_string()
    } else {
        ">>>>>>> ".to_string()
    };

    let o = parser.add_child_to(node, NodeValue::GitConflictOpenMarker);
    o.data.borrow_mut().tokens = open;
    let c = parser.add_child_to(node, NodeValue::GitConflictContent);
    c.data.borrow_mut().tokens = lines.join("\n");
    let e = parser.add_child_to(node, NodeValue::GitConflictCloseMarker);
    e.data.borrow_mut().tokens = close;
}
