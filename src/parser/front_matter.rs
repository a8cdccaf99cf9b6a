//! YAML front matter: a `---` fence pair that may only open the
//! document.

use crate::nodes::{Ast, AstNode, NodeValue};
use crate::parser::Parser;

pub(crate) fn handle_front_matter<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    container: &mut &'a AstNode<'a>,
    line: &[u8],
    indented: bool,
) -> bool {
    if indented || !parser.options.yaml_front_matter || parser.line_number != 1 {
        return false;
    }
    let s = std::str::from_utf8(&line[parser.first_nonspace..]).unwrap_or("");
    if s.trim_end() != "---" {
        return false;
    }

    let adv = line.len() - 1 - parser.offset;
    parser.advance_offset(line, adv, false);
    *container = parser.add_child(*container, NodeValue::YamlFrontMatter);
    true
}

pub(crate) fn parse_front_matter_prefix<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    line: &[u8],
    container: &'a AstNode<'a>,
    ast: &mut Ast,
    should_continue: &mut bool,
) -> bool {
    let s = std::str::from_utf8(&line[parser.first_nonspace..]).unwrap_or("");
    let trimmed = s.trim_end();
    if trimmed == "---" || trimmed == "..." {
        *should_continue = false;
        let adv = line.len() - 1 - parser.offset;
        parser.advance_offset(line, adv, false);
        parser.current = parser.finalize_borrowed(container, ast).unwrap();
        return false;
    }
    true
}

pub(crate) fn finalize_front_matter<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    node: &'a AstNode<'a>,
    ast: &mut Ast,
) {
    let mut content = std::mem::take(&mut ast.content);
    while content.ends_with('\n') || content.ends_with('\r') {
        content.pop();
    }

    parser.add_child_to(node, NodeValue::YamlFrontMatterOpenMarker);
    let c = parser.add_child_to(node, NodeValue::YamlFrontMatterContent);
    c.data.borrow_mut().tokens = content;
    parser.add_child_to(node, NodeValue::YamlFrontMatterCloseMarker);
}
