//! Super blocks: `{{{` + optional `row`/`col` layout, grouping whole
//! blocks until a matching `}}}` line.

use std::cell::RefCell;

use crate::arena_tree::Node;
use crate::editor;
use crate::nodes::{Ast, AstNode, NodeValue};
use crate::parser::Parser;

pub(crate) fn handle_super_block<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    container: &mut &'a AstNode<'a>,
    line: &[u8],
    indented: bool,
) -> bool {
    if indented || !parser.options.super_block {
        return false;
    }

    let s = std::str::from_utf8(&line[parser.first_nonspace..]).unwrap_or("");
    let mut fence_len = 0;
    for c in s.bytes() {
        if c == b'{' {
            fence_len += 1;
        } else {
            break;
        }
    }
    if fence_len != 3 {
        return false;
    }
    let layout = s[3..].trim();
    if !layout.is_empty() && !layout.eq_ignore_ascii_case("row") && !layout.eq_ignore_ascii_case("col")
    {
        return false;
    }

    let node = parser.add_child(*container, NodeValue::SuperBlock);
    parser.add_child_to(node, NodeValue::SuperBlockOpenMarker);
    let lm = parser.add_child_to(node, NodeValue::SuperBlockLayoutMarker);
    lm.data.borrow_mut().tokens = layout.to_string();
    *container = node;

    let adv = line.len() - 1 - parser.offset;
    parser.advance_offset(line, adv, false);
    true
}

/// A `}}}` line closes the nearest super block; anything else continues
/// it. A caret on the close line is pushed back into the last paragraph
/// so the cursor survives the close.
pub(crate) fn parse_super_block_prefix<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    line: &[u8],
    container: &'a AstNode<'a>,
    ast: &mut Ast,
    should_continue: &mut bool,
) -> bool {
    let raw = std::str::from_utf8(&line[parser.first_nonspace..]).unwrap_or("");
    let stripped = editor::strip_caret(raw);
    if stripped.trim() != "}}}" {
        return true;
    }

    let had_caret = raw.contains(editor::CARET);

    while !parser.current.same_node(container) {
        parser.current = parser.finalize(parser.current).unwrap();
    }

    if had_caret {
        let mut target = None;
        let mut child = container.last_child();
        while let Some(c) = child {
            if matches!(c.data.borrow().value, NodeValue::Paragraph) {
                target = Some(c);
                break;
            }
            child = c.previous_sibling();
        }
        match target {
            Some(p) => p.data.borrow_mut().content.push_str(editor::CARET),
            None => {
                let p: &'a AstNode<'a> = parser.arena.alloc(Node::new(RefCell::new(
                    Ast::with_tokens(NodeValue::Paragraph, editor::CARET),
                )));
                {
                    let mut past = p.data.borrow_mut();
                    past.content = editor::CARET.to_string();
                    past.open = false;
                }
                container.append(p);
            }
        }
    }

    parser.add_child_to(container, NodeValue::SuperBlockCloseMarker);

    *should_continue = false;
    let adv = line.len() - 1 - parser.offset;
    parser.advance_offset(line, adv, false);
    parser.current = parser.finalize_borrowed(container, ast).unwrap();
    false
}

/// Any children still open when the close marker lands get finalized.
pub(crate) fn finalize_super_block<'a, 'o>(parser: &mut Parser<'a, 'o>, node: &'a AstNode<'a>) {
    let mut child = node.first_child();
    while let Some(c) = child {
        let open = c.data.borrow().open;
        if open {
            parser.finalize(c);
        }
        child = c.next_sibling();
    }
}
