//! Parse-time and render-time option sets. Every flag is individually
//! settable on the engine; changes take effect on the next call.

use rustc_hash::FxHashMap;

/// Options controlling which syntax extensions the parsers recognize and
/// which editor mode, if any, the engine is serving.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// GFM tables.
    pub gfm_table: bool,
    /// GFM task list items.
    pub gfm_task_list_item: bool,
    /// GFM strikethrough (`~~x~~`, single `~` included).
    pub gfm_strikethrough: bool,
    /// GFM bare autolinks.
    pub gfm_auto_link: bool,
    /// Footnote definitions and references.
    pub footnotes: bool,
    /// `[toc]` placeholder.
    pub toc: bool,
    /// `{#custom-id}` heading IDs.
    pub heading_id: bool,
    /// `---` YAML front matter at document start.
    pub yaml_front_matter: bool,
    /// Setext headings.
    pub setext: bool,
    /// `:alias:` emoji replacement.
    pub emoji: bool,
    /// `==mark==`.
    pub mark: bool,
    /// `^sup^`.
    pub sup: bool,
    /// `~sub~`.
    pub sub: bool,
    /// `((id "text"))` block references.
    pub block_ref: bool,
    /// `<<id "text">>` file annotation references.
    pub file_annotation_ref: bool,
    /// Trailing `{: k="v"}` block attribute lists.
    pub kramdown_block_ial: bool,
    /// Span-level `{: k="v"}` attribute lists.
    pub kramdown_span_ial: bool,
    /// `#tag#`.
    pub tag: bool,
    /// `{{{ row|col … }}}` super blocks.
    pub super_block: bool,
    /// Git conflict marker blocks.
    pub git_conflict: bool,
    /// Link reference definitions.
    pub link_ref: bool,
    /// Four-space indented code blocks.
    pub indent_code_block: bool,
    /// Allow `data:image/…` URLs in image destinations.
    pub data_image: bool,
    /// Parse editor inline spans into textmark nodes.
    pub text_mark: bool,
    /// Spin mode: round-trip normalization of editor DOM.
    pub spin: bool,
    /// Convert simple inline HTML tags (`<b>`, `<kbd>`…) to textmarks.
    pub html_tag_to_text_mark: bool,
    /// Keep paragraph-leading spaces instead of trimming them.
    pub paragraph_beginning_space: bool,
    /// Allow whitespace inside image destinations.
    pub img_path_allow_space: bool,
    /// Allow a digit right after the opening `$`.
    pub inline_math_allow_digit_after_open_marker: bool,

    /// Classic WYSIWYG editor mode.
    pub editor_wysiwyg: bool,
    /// Instant-render editor mode.
    pub editor_ir: bool,
    /// Split-view editor mode.
    pub editor_sv: bool,
    /// Block-editor (Protyle) WYSIWYG mode.
    pub protyle_wysiwyg: bool,

    /// User emoji aliases layered over the built-in shortcode table.
    /// Values containing the site placeholder render as `<img>` aliases.
    pub alias_emoji: FxHashMap<String, String>,
    /// Reverse mapping, unicode → alias.
    pub emoji_alias: FxHashMap<String, String>,
    /// Base URL substituted for the emoji site placeholder.
    pub emoji_site: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            gfm_table: true,
            gfm_task_list_item: true,
            gfm_strikethrough: true,
            gfm_auto_link: true,
            footnotes: true,
            toc: false,
            heading_id: true,
            yaml_front_matter: true,
            setext: true,
            emoji: true,
            mark: false,
            sup: false,
            sub: false,
            block_ref: false,
            file_annotation_ref: false,
            kramdown_block_ial: false,
            kramdown_span_ial: false,
            tag: false,
            super_block: false,
            git_conflict: false,
            link_ref: true,
            indent_code_block: true,
            data_image: true,
            text_mark: false,
            spin: false,
            html_tag_to_text_mark: false,
            paragraph_beginning_space: false,
            img_path_allow_space: false,
            inline_math_allow_digit_after_open_marker: false,
            editor_wysiwyg: false,
            editor_ir: false,
            editor_sv: false,
            protyle_wysiwyg: false,
            alias_emoji: FxHashMap::default(),
            emoji_alias: FxHashMap::default(),
            emoji_site: "https://cdn.jsdelivr.net/npm/vditor/dist/images/emoji".to_string(),
        }
    }
}

impl ParseOptions {
    /// Whether any of the editor modes is active; gates the caret
    /// discipline inside the parsers.
    pub fn editor_mode(&self) -> bool {
        self.editor_wysiwyg || self.editor_ir || self.editor_sv || self.protyle_wysiwyg
    }
}

/// Options controlling the renderers.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Render soft breaks as hard breaks.
    pub soft_break_to_hard_break: bool,
    /// Insert spaces between CJK and Western runs in text.
    pub auto_space: bool,
    /// Fix term typos from the terms table in text.
    pub fix_term_typo: bool,
    /// Emit syntax-highlighting hints on code blocks.
    pub code_syntax_highlight: bool,
    pub code_syntax_highlight_inline_style: bool,
    pub code_syntax_highlight_line_num: bool,
    pub code_syntax_highlight_detect_lang: bool,
    pub code_syntax_highlight_style_name: String,
    /// Render `[toc]` as a table of contents.
    pub toc: bool,
    /// Render heading IDs.
    pub heading_id: bool,
    /// Render heading anchors.
    pub heading_anchor: bool,
    /// Class attached to task list items.
    pub gfm_task_list_item_class: String,
    /// When non-empty, image URLs move to this data attribute.
    pub image_lazy_loading: String,
    /// Two-em-space paragraph indent for Chinese text.
    pub chinese_paragraph_beginning_space: bool,
    /// Keep paragraph-leading spaces in output.
    pub keep_paragraph_beginning_space: bool,
    /// Drop scriptable attributes and dangerous URLs on output.
    pub sanitize: bool,
    /// Emit trailing block `{: …}` attribute lists.
    pub kramdown_block_ial: bool,
    /// Emit span `{: …}` attribute lists.
    pub kramdown_span_ial: bool,
    /// Attribute name the block ID renders under.
    pub kramdown_ial_id_render_name: String,
    /// Render super blocks (off renders children flat).
    pub super_block: bool,
    pub link_base: String,
    pub link_prefix: String,
    /// Emit `data-style` list markers.
    pub render_list_style: bool,
    /// Editor previews for code/math/HTML blocks.
    pub editor_code_block_preview: bool,
    pub editor_math_block_preview: bool,
    pub editor_html_block_preview: bool,
    /// Mark remote images in block DOM.
    pub protyle_mark_net_img: bool,
    /// Emit spellcheck attributes on editable blocks.
    pub spellcheck: bool,
    /// Term replacement table for [`Self::fix_term_typo`].
    pub terms: FxHashMap<String, String>,

    pub editor_wysiwyg: bool,
    pub editor_ir: bool,
    pub editor_sv: bool,
    pub protyle_wysiwyg: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            soft_break_to_hard_break: true,
            auto_space: true,
            fix_term_typo: true,
            code_syntax_highlight: true,
            code_syntax_highlight_inline_style: false,
            code_syntax_highlight_line_num: false,
            code_syntax_highlight_detect_lang: false,
            code_syntax_highlight_style_name: "github".to_string(),
            toc: false,
            heading_id: true,
            heading_anchor: false,
            gfm_task_list_item_class: "vditor-task".to_string(),
            image_lazy_loading: String::new(),
            chinese_paragraph_beginning_space: false,
            keep_paragraph_beginning_space: false,
            sanitize: false,
            kramdown_block_ial: false,
            kramdown_span_ial: false,
            kramdown_ial_id_render_name: "id".to_string(),
            super_block: false,
            link_base: String::new(),
            link_prefix: String::new(),
            render_list_style: false,
            editor_code_block_preview: true,
            editor_math_block_preview: true,
            editor_html_block_preview: true,
            protyle_mark_net_img: false,
            spellcheck: false,
            terms: default_terms(),
            editor_wysiwyg: false,
            editor_ir: false,
            editor_sv: false,
            protyle_wysiwyg: false,
        }
    }
}

/// The stock term-typo table.
pub fn default_terms() -> FxHashMap<String, String> {
    let mut m = FxHashMap::default();
    for (k, v) in [
        ("github", "GitHub"),
        ("Github", "GitHub"),
        ("javascript", "JavaScript"),
        ("Javascript", "JavaScript"),
        ("typescript", "TypeScript"),
        ("Typescript", "TypeScript"),
        ("wifi", "Wi-Fi"),
        ("Wifi", "Wi-Fi"),
        ("macos", "macOS"),
        ("Macos", "macOS"),
        ("MacOS", "macOS"),
        ("ios", "iOS"),
        ("Ios", "iOS"),
        ("IOS", "iOS"),
        ("vscode", "VS Code"),
        ("Vscode", "VS Code"),
    ] {
        m.insert(k.to_string(), v.to_string());
    }
    m
}
