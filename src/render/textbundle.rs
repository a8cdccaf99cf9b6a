//! TextBundle export: Markdown with asset links rewritten under
//! `assets/`, plus the list of original destinations.

use crate::nodes::{AstNode, NodeValue};
use crate::parser::RenderOptions;
use crate::render::format::FormatRenderer;

pub struct TextBundleRenderer<'o> {
    options: &'o RenderOptions,
    link_prefixes: Vec<String>,
}

impl<'o> TextBundleRenderer<'o> {
    pub fn new(options: &'o RenderOptions, link_prefixes: Vec<String>) -> Self {
        TextBundleRenderer {
            options,
            link_prefixes,
        }
    }

    /// Rewrites matching link destinations in place, then formats.
    pub fn render<'a>(&mut self, root: &'a AstNode<'a>) -> (String, Vec<String>) {
        let mut originals = Vec::new();

        for node in root.descendants() {
            let mut ast = node.data.borrow_mut();
            if !matches!(ast.value, NodeValue::LinkDest) {
                continue;
            }
            let dest = ast.tokens.clone();
            for prefix in &self.link_prefixes {
                if let Some(rest) = dest.strip_prefix(prefix.as_str()) {
                    let name = rest.rsplit('/').next().unwrap_or(rest);
                    originals.push(dest.clone());
                    ast.tokens = format!("assets/{name}");
                    break;
                }
            }
        }

        let mut formatter = FormatRenderer::new(self.options);
        (formatter.render(root), originals)
    }
}
