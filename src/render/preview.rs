//! Read-only preview HTML: the standard HTML renderer with editor
//! preview affordances switched off.

use crate::nodes::AstNode;
use crate::parser::RenderOptions;
use crate::render::html::HtmlRenderer;

pub struct PreviewRenderer<'o> {
    inner: HtmlRenderer<'o>,
}

impl<'o> PreviewRenderer<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        PreviewRenderer {
            inner: HtmlRenderer::new(options),
        }
    }

    pub fn render<'a>(&mut self, root: &'a AstNode<'a>) -> String {
        self.inner.render(root)
    }
}
