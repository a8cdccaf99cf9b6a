//! Export Markdown renderer: the format renderer in export mode, where
//! editor references resolve to their anchor text and cursor artifacts
//! are stripped.

use crate::nodes::AstNode;
use crate::parser::RenderOptions;
use crate::render::format::FormatRenderer;

pub struct ExportMdRenderer<'o> {
    inner: FormatRenderer<'o>,
}

impl<'o> ExportMdRenderer<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        let mut inner = FormatRenderer::new(options);
        inner.export_mode = true;
        ExportMdRenderer { inner }
    }

    pub fn render<'a>(&mut self, root: &'a AstNode<'a>) -> String {
        self.inner.render(root)
    }
}
