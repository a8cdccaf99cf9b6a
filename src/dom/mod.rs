//! Reverse-parsing support: the editor's structural HTML (and pasted
//! HTML) is parsed with html5ever into an rcdom tree, which the walkers
//! in [`block_dom`] and [`html`] turn back into an AST.

pub mod block_dom;
pub mod html;

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, ns, namespace_url, parse_fragment, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Parses an HTML fragment the way a `<div>` body would.
pub(crate) fn parse_html_fragment(html_str: &str) -> Handle {
    let dom = parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), local_name!("div")),
        vec![],
        false,
    )
    .one(html_str);
    dom.document
}

/// The parsed fragment's effective root: the synthetic `<html>` wrapper
/// if present, otherwise the document itself.
pub(crate) fn fragment_root(document: &Handle) -> Handle {
    for child in document.children.borrow().iter() {
        if let NodeData::Element { ref name, .. } = child.data {
            if name.local.as_ref() == "html" {
                return child.clone();
            }
        }
    }
    document.clone()
}

pub(crate) fn element_name(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.as_ref().to_string()),
        _ => None,
    }
}

pub(crate) fn attr_value(node: &Handle, attr_name: &str) -> String {
    if let NodeData::Element { ref attrs, .. } = node.data {
        for attr in attrs.borrow().iter() {
            if attr.name.local.as_ref() == attr_name {
                return attr.value.to_string();
            }
        }
    }
    String::new()
}

/// All `custom-*` attributes, in document order.
pub(crate) fn custom_attrs(node: &Handle) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let NodeData::Element { ref attrs, .. } = node.data {
        for attr in attrs.borrow().iter() {
            let name = attr.name.local.as_ref();
            if name.starts_with("custom-") {
                out.push((name.to_string(), attr.value.to_string()));
            }
        }
    }
    out
}

pub(crate) fn text_of(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Text { ref contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// The concatenated text of a subtree; `<br>` contributes a newline.
pub(crate) fn dom_text(node: &Handle) -> String {
    let mut out = String::new();
    dom_text_into(node, &mut out);
    out
}

fn dom_text_into(node: &Handle, out: &mut String) {
    match node.data {
        NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
        NodeData::Element { ref name, .. } => {
            if name.local.as_ref() == "br" {
                out.push('\n');
            }
            if name.local.as_ref() == "wbr" {
                out.push_str(crate::editor::CARET);
            }
        }
        _ => {}
    }
    for child in node.children.borrow().iter() {
        dom_text_into(child, out);
    }
}

pub(crate) fn children_of(node: &Handle) -> Vec<Handle> {
    node.children.borrow().iter().cloned().collect()
}

/// First descendant element with the given tag.
pub(crate) fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if element_name(child).as_deref() == Some(tag) {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Whether any ancestor chain within `node`'s subtree contains `tag`;
/// used when walking with an explicit parent stack.
pub(crate) fn class_value(node: &Handle) -> String {
    attr_value(node, "class")
}
