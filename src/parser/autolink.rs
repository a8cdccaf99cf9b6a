//! GFM bare autolinks, applied over finished text nodes: `www.`,
//! `http(s)://`, `ftp://` and plain emails become links.

use std::cell::RefCell;

use typed_arena::Arena;

use crate::arena_tree::Node;
use crate::ctype::{isalnum, isalpha};
use crate::nodes::{Ast, AstNode, LinkType, NodeValue};

/// Rewrites text nodes under `root`, splitting bare links out into link
/// nodes. Text inside links, code and math is left alone.
pub(crate) fn process_autolinks<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>) {
    let mut texts: Vec<&'a AstNode<'a>> = Vec::new();
    for node in root.descendants() {
        if !matches!(node.data.borrow().value, NodeValue::Text) {
            continue;
        }
        let in_excluded = node.ancestors().any(|a| {
            matches!(
                a.data.borrow().value,
                NodeValue::Link(..)
                    | NodeValue::Image
                    | NodeValue::CodeSpan { .. }
                    | NodeValue::InlineMath
                    | NodeValue::BlockRef
                    | NodeValue::FileAnnotationRef
                    | NodeValue::Tag
            )
        });
        if !in_excluded {
            texts.push(node);
        }
    }

    for node in texts {
        split_text_node(arena, node);
    }
}

fn split_text_node<'a>(arena: &'a Arena<AstNode<'a>>, node: &'a AstNode<'a>) {
    let text = node.data.borrow().tokens.clone();
    let mut rest = text.as_str();
    let mut consumed = 0;
    let mut emitted = false;

    while let Some((start, url_len, dest_prefix)) = find_candidate(rest) {
        let url = &rest[start..start + url_len];
        let url = trim_trailing_delims(url);
        if url.is_empty() {
            break;
        }

        let before = &rest[..start];
        if !before.is_empty() {
            let t = arena.alloc(Node::new(RefCell::new(Ast::with_tokens(
                NodeValue::Text,
                before,
            ))));
            node.insert_before(t);
        }

        let link = arena.alloc(Node::new(RefCell::new(Ast::new(NodeValue::Link(
            LinkType::AutoBare,
        )))));
        let link_text = arena.alloc(Node::new(RefCell::new(Ast::with_tokens(
            NodeValue::LinkText,
            url,
        ))));
        let link_dest = arena.alloc(Node::new(RefCell::new(Ast::with_tokens(
            NodeValue::LinkDest,
            format!("{dest_prefix}{url}"),
        ))));
        link.append(link_text);
        link.append(link_dest);
        node.insert_before(link);
        emitted = true;

        consumed += start + url.len();
        rest = &text[consumed..];
    }

    if emitted {
        if rest.is_empty() {
            node.detach();
        } else {
            node.data.borrow_mut().tokens = rest.to_string();
        }
    }
}

/// Finds the earliest autolink candidate: byte offset, length, and the
/// scheme to prepend to the destination.
fn find_candidate(s: &str) -> Option<(usize, usize, &'static str)> {
    let bytes = s.as_bytes();

    let mut best: Option<(usize, usize, &'static str)> = None;

    for (pat, prefix) in [
        ("https://", ""),
        ("http://", ""),
        ("ftp://", ""),
        ("www.", "http://"),
    ] {
        if let Some(ix) = s.find(pat) {
            if !boundary_ok(bytes, ix) {
                continue;
            }
            let len = url_end(&s[ix..]);
            if len > pat.len() && s[ix..ix + len].contains('.') {
                if best.map_or(true, |(bix, ..)| ix < bix) {
                    best = Some((ix, len, prefix));
                }
            }
        }
    }

    if let Some(m) = find_email(s) {
        if best.map_or(true, |(bix, ..)| m.0 < bix) {
            best = Some((m.0, m.1, "mailto:"));
        }
    }

    best
}

fn boundary_ok(bytes: &[u8], ix: usize) -> bool {
    ix == 0 || !(isalnum(bytes[ix - 1]) || bytes[ix - 1] == b'/')
}

fn url_end(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'<' | b'>' | b'"' | b'\'' | b'`' => break,
            _ => i += 1,
        }
    }
    i
}

fn trim_trailing_delims(url: &str) -> &str {
    let mut end = url.len();
    let bytes = url.as_bytes();
    while end > 0 {
        match bytes[end - 1] {
            b'.' | b',' | b';' | b':' | b'!' | b'?' | b'*' | b'_' | b'~' => end -= 1,
            b')' => {
                // keep balanced closing parens
                let opens = url[..end].matches('(').count();
                let closes = url[..end].matches(')').count();
                if closes > opens {
                    end -= 1;
                } else {
                    break;
                }
            }
            _ => break,
        }
    }
    &url[..end]
}

fn find_email(s: &str) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    let at = s.find('@')?;
    if at == 0 {
        return None;
    }

    // local part
    let mut start = at;
    while start > 0 {
        let c = bytes[start - 1];
        if isalnum(c) || matches!(c, b'.' | b'-' | b'_' | b'+') {
            start -= 1;
        } else {
            break;
        }
    }
    if start == at || !boundary_ok(bytes, start) {
        return None;
    }

    // domain
    let mut end = at + 1;
    let mut dot = false;
    while end < bytes.len() {
        let c = bytes[end];
        if isalnum(c) || c == b'-' {
            end += 1;
        } else if c == b'.' && end + 1 < bytes.len() && isalnum(bytes[end + 1]) {
            dot = true;
            end += 1;
        } else {
            break;
        }
    }
    if !dot || end == at + 1 {
        return None;
    }
    if !isalpha(bytes[end - 1]) && !crate::ctype::isdigit(bytes[end - 1]) {
        return None;
    }

    Some((start, end - start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates() {
        let (ix, len, prefix) = find_candidate("see www.example.com, ok").unwrap();
        assert_eq!(ix, 4);
        assert_eq!(prefix, "http://");
        assert_eq!(trim_trailing_delims(&"see www.example.com, ok"[ix..ix + len]), "www.example.com");

        let (ix, _, prefix) = find_candidate("mail me a@b.co.").unwrap();
        assert_eq!(ix, 8);
        assert_eq!(prefix, "mailto:");

        assert!(find_candidate("nothing here").is_none());
        assert!(find_candidate("xhttps://e.com").is_none());
    }
}
