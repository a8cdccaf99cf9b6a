//! The engine's AST: one tagged `NodeValue` per syntactic element, an
//! `Ast` wrapper carrying the literal tokens and block state, and the
//! arena-backed `AstNode` alias the parsers and renderers share.

use std::cell::RefCell;

use crate::arena_tree::Node;

macro_rules! node_kinds {
    ( $( $variant:ident => $name:literal, )* ) => {
        /// A fieldless tag for every node kind; keys renderer dispatch
        /// tables, extension hooks and the editor wire format.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeKind {
            $( $variant, )*
        }

        impl NodeKind {
            /// The wire name, e.g. `NodeHeading` for `data-type`.
            pub fn name(self) -> &'static str {
                match self {
                    $( NodeKind::$variant => $name, )*
                }
            }

            /// The inverse of [`NodeKind::name`].
            pub fn from_name(s: &str) -> Option<NodeKind> {
                match s {
                    $( $name => Some(NodeKind::$variant), )*
                    _ => None,
                }
            }
        }
    };
}

node_kinds! {
    Document => "NodeDocument",
    Paragraph => "NodeParagraph",
    Heading => "NodeHeading",
    HeadingID => "NodeHeadingID",
    Blockquote => "NodeBlockquote",
    List => "NodeList",
    ListItem => "NodeListItem",
    TaskListItemMarker => "NodeTaskListItemMarker",
    ThematicBreak => "NodeThematicBreak",
    HtmlBlock => "NodeHTMLBlock",
    InlineHtml => "NodeInlineHTML",
    CodeBlock => "NodeCodeBlock",
    CodeBlockFenceOpenMarker => "NodeCodeBlockFenceOpenMarker",
    CodeBlockFenceInfoMarker => "NodeCodeBlockFenceInfoMarker",
    CodeBlockCode => "NodeCodeBlockCode",
    CodeBlockFenceCloseMarker => "NodeCodeBlockFenceCloseMarker",
    MathBlock => "NodeMathBlock",
    MathBlockOpenMarker => "NodeMathBlockOpenMarker",
    MathBlockContent => "NodeMathBlockContent",
    MathBlockCloseMarker => "NodeMathBlockCloseMarker",
    InlineMath => "NodeInlineMath",
    InlineMathOpenMarker => "NodeInlineMathOpenMarker",
    InlineMathContent => "NodeInlineMathContent",
    InlineMathCloseMarker => "NodeInlineMathCloseMarker",
    Text => "NodeText",
    TextMark => "NodeTextMark",
    CodeSpan => "NodeCodeSpan",
    CodeSpanOpenMarker => "NodeCodeSpanOpenMarker",
    CodeSpanContent => "NodeCodeSpanContent",
    CodeSpanCloseMarker => "NodeCodeSpanCloseMarker",
    Emph => "NodeEmphasis",
    EmphOpenMarker => "NodeEmphasisOpenMarker",
    EmphCloseMarker => "NodeEmphasisCloseMarker",
    Strong => "NodeStrong",
    StrongOpenMarker => "NodeStrongOpenMarker",
    StrongCloseMarker => "NodeStrongCloseMarker",
    Strikethrough => "NodeStrikethrough",
    StrikethroughOpenMarker => "NodeStrikethroughOpenMarker",
    StrikethroughCloseMarker => "NodeStrikethroughCloseMarker",
    Mark => "NodeMark",
    MarkOpenMarker => "NodeMarkOpenMarker",
    MarkCloseMarker => "NodeMarkCloseMarker",
    Sup => "NodeSup",
    SupOpenMarker => "NodeSupOpenMarker",
    SupCloseMarker => "NodeSupCloseMarker",
    Sub => "NodeSub",
    SubOpenMarker => "NodeSubOpenMarker",
    SubCloseMarker => "NodeSubCloseMarker",
    Underline => "NodeUnderline",
    UnderlineOpenMarker => "NodeUnderlineOpenMarker",
    UnderlineCloseMarker => "NodeUnderlineCloseMarker",
    Kbd => "NodeKbd",
    KbdOpenMarker => "NodeKbdOpenMarker",
    KbdCloseMarker => "NodeKbdCloseMarker",
    Tag => "NodeTag",
    TagOpenMarker => "NodeTagOpenMarker",
    TagCloseMarker => "NodeTagCloseMarker",
    Link => "NodeLink",
    Image => "NodeImage",
    Bang => "NodeBang",
    OpenBracket => "NodeOpenBracket",
    CloseBracket => "NodeCloseBracket",
    OpenParen => "NodeOpenParen",
    CloseParen => "NodeCloseParen",
    OpenBrace => "NodeOpenBrace",
    CloseBrace => "NodeCloseBrace",
    LinkText => "NodeLinkText",
    LinkDest => "NodeLinkDest",
    LinkSpace => "NodeLinkSpace",
    LinkTitle => "NodeLinkTitle",
    LinkRefDefBlock => "NodeLinkRefDefBlock",
    LinkRefDef => "NodeLinkRefDef",
    BlockRef => "NodeBlockRef",
    BlockRefID => "NodeBlockRefID",
    BlockRefSpace => "NodeBlockRefSpace",
    BlockRefText => "NodeBlockRefText",
    BlockRefDynamicText => "NodeBlockRefDynamicText",
    FileAnnotationRef => "NodeFileAnnotationRef",
    FileAnnotationRefID => "NodeFileAnnotationRefID",
    FileAnnotationRefSpace => "NodeFileAnnotationRefSpace",
    FileAnnotationRefText => "NodeFileAnnotationRefText",
    FootnotesDefBlock => "NodeFootnotesDefBlock",
    FootnotesDef => "NodeFootnotesDef",
    FootnotesRef => "NodeFootnotesRef",
    Table => "NodeTable",
    TableHead => "NodeTableHead",
    TableRow => "NodeTableRow",
    TableCell => "NodeTableCell",
    Emoji => "NodeEmoji",
    EmojiUnicode => "NodeEmojiUnicode",
    EmojiImg => "NodeEmojiImg",
    EmojiAlias => "NodeEmojiAlias",
    HtmlEntity => "NodeHTMLEntity",
    Backslash => "NodeBackslash",
    BackslashContent => "NodeBackslashContent",
    SoftBreak => "NodeSoftBreak",
    HardBreak => "NodeHardBreak",
    Br => "NodeBr",
    YamlFrontMatter => "NodeYamlFrontMatter",
    YamlFrontMatterOpenMarker => "NodeYamlFrontMatterOpenMarker",
    YamlFrontMatterContent => "NodeYamlFrontMatterContent",
    YamlFrontMatterCloseMarker => "NodeYamlFrontMatterCloseMarker",
    Toc => "NodeToC",
    KramdownBlockIAL => "NodeKramdownBlockIAL",
    KramdownSpanIAL => "NodeKramdownSpanIAL",
    SuperBlock => "NodeSuperBlock",
    SuperBlockOpenMarker => "NodeSuperBlockOpenMarker",
    SuperBlockLayoutMarker => "NodeSuperBlockLayoutMarker",
    SuperBlockCloseMarker => "NodeSuperBlockCloseMarker",
    BlockQueryEmbed => "NodeBlockQueryEmbed",
    BlockQueryEmbedScript => "NodeBlockQueryEmbedScript",
    GitConflict => "NodeGitConflict",
    GitConflictOpenMarker => "NodeGitConflictOpenMarker",
    GitConflictContent => "NodeGitConflictContent",
    GitConflictCloseMarker => "NodeGitConflictCloseMarker",
    CustomBlock => "NodeCustomBlock",
    AttributeView => "NodeAttributeView",
    IFrame => "NodeIFrame",
    Video => "NodeVideo",
    Audio => "NodeAudio",
    Widget => "NodeWidget",
}

/// Alignment of a table column or cell.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum TableAlignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// The kind of list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListType {
    #[default]
    Bullet,
    Ordered,
    Task,
}

/// The delimiter after an ordered list number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListDelimType {
    #[default]
    Period,
    Paren,
}

/// List/item metadata.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeList {
    pub list_type: ListType,
    pub marker_offset: usize,
    pub padding: usize,
    pub start: usize,
    pub delimiter: ListDelimType,
    pub bullet_char: u8,
    pub tight: bool,
}

/// Code block metadata; content lives in a `CodeBlockCode` child for
/// fenced blocks, in `tokens` for indented ones.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeCodeBlock {
    pub is_fenced: bool,
    pub fence_char: u8,
    pub fence_len: usize,
    pub fence_offset: usize,
    pub info: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeading {
    /// 1 through 6.
    pub level: u8,
    pub setext: bool,
}

/// How a link or image was written down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkType {
    #[default]
    Inline,
    /// Full, collapsed or shortcut reference form.
    Ref,
    /// `<scheme:dest>` pointy autolink.
    Auto,
    /// GFM bare autolink.
    AutoBare,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeTable {
    pub aligns: Vec<TableAlignment>,
}

/// A multi-type inline decoration span, the editor's native inline form.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeTextMark {
    /// Sorted, space-joined on the wire: `strong em s` ….
    pub types: Vec<String>,
    pub text_content: String,
    pub a_href: String,
    pub a_title: String,
    pub block_ref_id: String,
    pub block_ref_subtype: String,
    pub file_annotation_ref_id: String,
    pub inline_math_content: String,
    pub inline_memo_content: String,
}

impl NodeTextMark {
    pub fn has_type(&self, t: &str) -> bool {
        self.types.iter().any(|x| x == t)
    }

    pub fn sorted_types(&self) -> String {
        let mut ts = self.types.clone();
        ts.sort();
        ts.dedup();
        ts.join(" ")
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeAttributeView {
    pub av_id: String,
    pub av_type: String,
}

/// The node kind plus kind-specific metadata. Literal content relevant
/// to a kind lives in [`Ast::tokens`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Document,
    Paragraph,
    Heading(NodeHeading),
    HeadingID,
    Blockquote,
    List(NodeList),
    ListItem(NodeList),
    TaskListItemMarker { checked: bool },
    ThematicBreak,
    HtmlBlock(u8),
    InlineHtml,
    CodeBlock(NodeCodeBlock),
    CodeBlockFenceOpenMarker,
    CodeBlockFenceInfoMarker,
    CodeBlockCode,
    CodeBlockFenceCloseMarker,
    MathBlock,
    MathBlockOpenMarker,
    MathBlockContent,
    MathBlockCloseMarker,
    InlineMath,
    InlineMathOpenMarker,
    InlineMathContent,
    InlineMathCloseMarker,
    Text,
    TextMark(NodeTextMark),
    CodeSpan { backticks: usize },
    CodeSpanOpenMarker,
    CodeSpanContent,
    CodeSpanCloseMarker,
    Emph,
    EmphOpenMarker,
    EmphCloseMarker,
    Strong,
    StrongOpenMarker,
    StrongCloseMarker,
    Strikethrough,
    StrikethroughOpenMarker,
    StrikethroughCloseMarker,
    Mark,
    MarkOpenMarker,
    MarkCloseMarker,
    Sup,
    SupOpenMarker,
    SupCloseMarker,
    Sub,
    SubOpenMarker,
    SubCloseMarker,
    Underline,
    UnderlineOpenMarker,
    UnderlineCloseMarker,
    Kbd,
    KbdOpenMarker,
    KbdCloseMarker,
    Tag,
    TagOpenMarker,
    TagCloseMarker,
    Link(LinkType),
    Image,
    Bang,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    LinkText,
    LinkDest,
    LinkSpace,
    LinkTitle,
    LinkRefDefBlock,
    LinkRefDef,
    BlockRef,
    BlockRefID,
    BlockRefSpace,
    BlockRefText,
    BlockRefDynamicText,
    FileAnnotationRef,
    FileAnnotationRefID,
    FileAnnotationRefSpace,
    FileAnnotationRefText,
    FootnotesDefBlock,
    FootnotesDef,
    FootnotesRef { num: usize },
    Table(NodeTable),
    TableHead,
    TableRow,
    TableCell(TableAlignment),
    Emoji,
    EmojiUnicode,
    EmojiImg,
    EmojiAlias,
    HtmlEntity,
    Backslash,
    BackslashContent,
    SoftBreak,
    HardBreak,
    Br,
    YamlFrontMatter,
    YamlFrontMatterOpenMarker,
    YamlFrontMatterContent,
    YamlFrontMatterCloseMarker,
    Toc,
    KramdownBlockIAL,
    KramdownSpanIAL,
    SuperBlock,
    SuperBlockOpenMarker,
    SuperBlockLayoutMarker,
    SuperBlockCloseMarker,
    BlockQueryEmbed,
    BlockQueryEmbedScript,
    GitConflict,
    GitConflictOpenMarker,
    GitConflictContent,
    GitConflictCloseMarker,
    CustomBlock { info: String },
    AttributeView(NodeAttributeView),
    IFrame,
    Video,
    Audio,
    Widget,
}

impl NodeValue {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeValue::Document => NodeKind::Document,
            NodeValue::Paragraph => NodeKind::Paragraph,
            NodeValue::Heading(..) => NodeKind::Heading,
            NodeValue::HeadingID => NodeKind::HeadingID,
            NodeValue::Blockquote => NodeKind::Blockquote,
            NodeValue::List(..) => NodeKind::List,
            NodeValue::ListItem(..) => NodeKind::ListItem,
            NodeValue::TaskListItemMarker { .. } => NodeKind::TaskListItemMarker,
            NodeValue::ThematicBreak => NodeKind::ThematicBreak,
            NodeValue::HtmlBlock(..) => NodeKind::HtmlBlock,
            NodeValue::InlineHtml => NodeKind::InlineHtml,
            NodeValue::CodeBlock(..) => NodeKind::CodeBlock,
            NodeValue::CodeBlockFenceOpenMarker => NodeKind::CodeBlockFenceOpenMarker,
            NodeValue::CodeBlockFenceInfoMarker => NodeKind::CodeBlockFenceInfoMarker,
            NodeValue::CodeBlockCode => NodeKind::CodeBlockCode,
            NodeValue::CodeBlockFenceCloseMarker => NodeKind::CodeBlockFenceCloseMarker,
            NodeValue::MathBlock => NodeKind::MathBlock,
            NodeValue::MathBlockOpenMarker => NodeKind::MathBlockOpenMarker,
            NodeValue::MathBlockContent => NodeKind::MathBlockContent,
            NodeValue::MathBlockCloseMarker => NodeKind::MathBlockCloseMarker,
            NodeValue::InlineMath => NodeKind::InlineMath,
            NodeValue::InlineMathOpenMarker => NodeKind::InlineMathOpenMarker,
            NodeValue::InlineMathContent => NodeKind::InlineMathContent,
            NodeValue::InlineMathCloseMarker => NodeKind::InlineMathCloseMarker,
            NodeValue::Text => NodeKind::Text,
            NodeValue::TextMark(..) => NodeKind::TextMark,
            NodeValue::CodeSpan { .. } => NodeKind::CodeSpan,
            NodeValue::CodeSpanOpenMarker => NodeKind::CodeSpanOpenMarker,
            NodeValue::CodeSpanContent => NodeKind::CodeSpanContent,
            NodeValue::CodeSpanCloseMarker => NodeKind::CodeSpanCloseMarker,
            NodeValue::Emph => NodeKind::Emph,
            NodeValue::EmphOpenMarker => NodeKind::EmphOpenMarker,
            NodeValue::EmphCloseMarker => NodeKind::EmphCloseMarker,
            NodeValue::Strong => NodeKind::Strong,
            NodeValue::StrongOpenMarker => NodeKind::StrongOpenMarker,
            NodeValue::StrongCloseMarker => NodeKind::StrongCloseMarker,
            NodeValue::Strikethrough => NodeKind::Strikethrough,
            NodeValue::StrikethroughOpenMarker => NodeKind::StrikethroughOpenMarker,
            NodeValue::StrikethroughCloseMarker => NodeKind::StrikethroughCloseMarker,
            NodeValue::Mark => NodeKind::Mark,
            NodeValue::MarkOpenMarker => NodeKind::MarkOpenMarker,
            NodeValue::MarkCloseMarker => NodeKind::MarkCloseMarker,
            NodeValue::Sup => NodeKind::Sup,
            NodeValue::SupOpenMarker => NodeKind::SupOpenMarker,
            NodeValue::SupCloseMarker => NodeKind::SupCloseMarker,
            NodeValue::Sub => NodeKind::Sub,
            NodeValue::SubOpenMarker => NodeKind::SubOpenMarker,
            NodeValue::SubCloseMarker => NodeKind::SubCloseMarker,
            NodeValue::Underline => NodeKind::Underline,
            NodeValue::UnderlineOpenMarker => NodeKind::UnderlineOpenMarker,
            NodeValue::UnderlineCloseMarker => NodeKind::UnderlineCloseMarker,
            NodeValue::Kbd => NodeKind::Kbd,
            NodeValue::KbdOpenMarker => NodeKind::KbdOpenMarker,
            NodeValue::KbdCloseMarker => NodeKind::KbdCloseMarker,
            NodeValue::Tag => NodeKind::Tag,
            NodeValue::TagOpenMarker => NodeKind::TagOpenMarker,
            NodeValue::TagCloseMarker => NodeKind::TagCloseMarker,
            NodeValue::Link(..) => NodeKind::Link,
            NodeValue::Image => NodeKind::Image,
            NodeValue::Bang => NodeKind::Bang,
            NodeValue::OpenBracket => NodeKind::OpenBracket,
            NodeValue::CloseBracket => NodeKind::CloseBracket,
            NodeValue::OpenParen => NodeKind::OpenParen,
            NodeValue::CloseParen => NodeKind::CloseParen,
            NodeValue::OpenBrace => NodeKind::OpenBrace,
            NodeValue::CloseBrace => NodeKind::CloseBrace,
            NodeValue::LinkText => NodeKind::LinkText,
            NodeValue::LinkDest => NodeKind::LinkDest,
            NodeValue::LinkSpace => NodeKind::LinkSpace,
            NodeValue::LinkTitle => NodeKind::LinkTitle,
            NodeValue::LinkRefDefBlock => NodeKind::LinkRefDefBlock,
            NodeValue::LinkRefDef => NodeKind::LinkRefDef,
            NodeValue::BlockRef => NodeKind::BlockRef,
            NodeValue::BlockRefID => NodeKind::BlockRefID,
            NodeValue::BlockRefSpace => NodeKind::BlockRefSpace,
            NodeValue::BlockRefText => NodeKind::BlockRefText,
            NodeValue::BlockRefDynamicText => NodeKind::BlockRefDynamicText,
            NodeValue::FileAnnotationRef => NodeKind::FileAnnotationRef,
            NodeValue::FileAnnotationRefID => NodeKind::FileAnnotationRefID,
            NodeValue::FileAnnotationRefSpace => NodeKind::FileAnnotationRefSpace,
            NodeValue::FileAnnotationRefText => NodeKind::FileAnnotationRefText,
            NodeValue::FootnotesDefBlock => NodeKind::FootnotesDefBlock,
            NodeValue::FootnotesDef => NodeKind::FootnotesDef,
            NodeValue::FootnotesRef { .. } => NodeKind::FootnotesRef,
            NodeValue::Table(..) => NodeKind::Table,
            NodeValue::TableHead => NodeKind::TableHead,
            NodeValue::TableRow => NodeKind::TableRow,
            NodeValue::TableCell(..) => NodeKind::TableCell,
            NodeValue::Emoji => NodeKind::Emoji,
            NodeValue::EmojiUnicode => NodeKind::EmojiUnicode,
            NodeValue::EmojiImg => NodeKind::EmojiImg,
            NodeValue::EmojiAlias => NodeKind::EmojiAlias,
            NodeValue::HtmlEntity => NodeKind::HtmlEntity,
            NodeValue::Backslash => NodeKind::Backslash,
            NodeValue::BackslashContent => NodeKind::BackslashContent,
            NodeValue::SoftBreak => NodeKind::SoftBreak,
            NodeValue::HardBreak => NodeKind::HardBreak,
            NodeValue::Br => NodeKind::Br,
            NodeValue::YamlFrontMatter => NodeKind::YamlFrontMatter,
            NodeValue::YamlFrontMatterOpenMarker => NodeKind::YamlFrontMatterOpenMarker,
            NodeValue::YamlFrontMatterContent => NodeKind::YamlFrontMatterContent,
            NodeValue::YamlFrontMatterCloseMarker => NodeKind::YamlFrontMatterCloseMarker,
            NodeValue::Toc => NodeKind::Toc,
            NodeValue::KramdownBlockIAL => NodeKind::KramdownBlockIAL,
            NodeValue::KramdownSpanIAL => NodeKind::KramdownSpanIAL,
            NodeValue::SuperBlock => NodeKind::SuperBlock,
            NodeValue::SuperBlockOpenMarker => NodeKind::SuperBlockOpenMarker,
            NodeValue::SuperBlockLayoutMarker => NodeKind::SuperBlockLayoutMarker,
            NodeValue::SuperBlockCloseMarker => NodeKind::SuperBlockCloseMarker,
            NodeValue::BlockQueryEmbed => NodeKind::BlockQueryEmbed,
            NodeValue::BlockQueryEmbedScript => NodeKind::BlockQueryEmbedScript,
            NodeValue::GitConflict => NodeKind::GitConflict,
            NodeValue::GitConflictOpenMarker => NodeKind::GitConflictOpenMarker,
            NodeValue::GitConflictContent => NodeKind::GitConflictContent,
            NodeValue::GitConflictCloseMarker => NodeKind::GitConflictCloseMarker,
            NodeValue::CustomBlock { .. } => NodeKind::CustomBlock,
            NodeValue::AttributeView(..) => NodeKind::AttributeView,
            NodeValue::IFrame => NodeKind::IFrame,
            NodeValue::Video => NodeKind::Video,
            NodeValue::Audio => NodeKind::Audio,
            NodeValue::Widget => NodeKind::Widget,
        }
    }

    /// Whether this node is a block-level node.
    pub fn block(&self) -> bool {
        matches!(
            self,
            NodeValue::Document
                | NodeValue::Paragraph
                | NodeValue::Heading(..)
                | NodeValue::Blockquote
                | NodeValue::List(..)
                | NodeValue::ListItem(..)
                | NodeValue::ThematicBreak
                | NodeValue::HtmlBlock(..)
                | NodeValue::CodeBlock(..)
                | NodeValue::MathBlock
                | NodeValue::Table(..)
                | NodeValue::TableHead
                | NodeValue::TableRow
                | NodeValue::TableCell(..)
                | NodeValue::YamlFrontMatter
                | NodeValue::Toc
                | NodeValue::FootnotesDefBlock
                | NodeValue::FootnotesDef
                | NodeValue::LinkRefDefBlock
                | NodeValue::LinkRefDef
                | NodeValue::KramdownBlockIAL
                | NodeValue::SuperBlock
                | NodeValue::BlockQueryEmbed
                | NodeValue::GitConflict
                | NodeValue::CustomBlock { .. }
                | NodeValue::AttributeView(..)
                | NodeValue::IFrame
                | NodeValue::Video
                | NodeValue::Audio
                | NodeValue::Widget
        )
    }

    pub fn accepts_lines(&self) -> bool {
        matches!(
            self,
            NodeValue::Paragraph
                | NodeValue::Heading(..)
                | NodeValue::CodeBlock(..)
                | NodeValue::MathBlock
                | NodeValue::HtmlBlock(..)
                | NodeValue::YamlFrontMatter
                | NodeValue::GitConflict
                | NodeValue::CustomBlock { .. }
        )
    }

    pub fn contains_inlines(&self) -> bool {
        matches!(
            self,
            NodeValue::Paragraph | NodeValue::Heading(..) | NodeValue::TableCell(..)
        )
    }
}

/// One node's payload: the value, its literal tokens, the raw content
/// accumulated while the block is open, and its attribute list.
#[derive(Debug, Clone)]
pub struct Ast {
    pub value: NodeValue,

    /// Literal content relevant to the kind (text, marker bytes, a code
    /// block's body, an ID…).
    pub tokens: String,

    /// Line accumulation buffer while the block is open; drained by
    /// `finalize` and inline parsing.
    pub content: String,

    /// Ordered kramdown attribute list. For block nodes owned by an
    /// editor document the `id` entry is mandatory.
    pub ial: Vec<(String, String)>,

    pub open: bool,
    pub last_line_blank: bool,
}

impl Ast {
    pub fn new(value: NodeValue) -> Self {
        Ast {
            value,
            tokens: String::new(),
            content: String::new(),
            ial: Vec::new(),
            open: true,
            last_line_blank: false,
        }
    }

    pub fn with_tokens(value: NodeValue, tokens: impl Into<String>) -> Self {
        let mut ast = Ast::new(value);
        ast.tokens = tokens.into();
        ast
    }

    pub fn kind(&self) -> NodeKind {
        self.value.kind()
    }

    /// The block's stable ID, from its attribute list.
    pub fn id(&self) -> Option<&str> {
        self.ial_attr("id")
    }

    pub fn ial_attr(&self, name: &str) -> Option<&str> {
        self.ial
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets or replaces an attribute, preserving list order.
    pub fn set_ial_attr(&mut self, name: &str, value: &str) {
        if let Some(kv) = self.ial.iter_mut().find(|(k, _)| k == name) {
            kv.1 = value.to_string();
        } else {
            self.ial.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove_ial_attr(&mut self, name: &str) {
        self.ial.retain(|(k, _)| k != name);
    }
}

/// The working node type; payloads sit behind `RefCell` for interior
/// mutability during tree rewriting.
pub type AstNode<'a> = Node<'a, RefCell<Ast>>;

/// Result of a walk callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    Continue,
    SkipChildren,
    Stop,
}

/// Walks `node` and its descendants, calling `f` entering and leaving
/// each node, per the renderer walk contract.
pub fn walk<'a, F>(node: &'a AstNode<'a>, f: &mut F) -> WalkStatus
where
    F: FnMut(&'a AstNode<'a>, bool) -> WalkStatus,
{
    match f(node, true) {
        WalkStatus::Stop => return WalkStatus::Stop,
        WalkStatus::SkipChildren => return WalkStatus::Continue,
        WalkStatus::Continue => {}
    }

    let mut child = node.first_child();
    while let Some(c) = child {
        // grab the next link before the callback can rewrite the tree
        let next = c.next_sibling();
        if walk(c, f) == WalkStatus::Stop {
            return WalkStatus::Stop;
        }
        child = next;
    }

    match f(node, false) {
        WalkStatus::Stop => WalkStatus::Stop,
        _ => WalkStatus::Continue,
    }
}

pub fn last_child_is_open<'a>(node: &'a AstNode<'a>) -> bool {
    node.last_child().map_or(false, |n| n.data.borrow().open)
}

pub fn can_contain_type<'a>(node: &'a AstNode<'a>, child: &NodeValue) -> bool {
    if let NodeValue::Document = *child {
        return false;
    }

    match node.data.borrow().value {
        NodeValue::Document
        | NodeValue::Blockquote
        | NodeValue::FootnotesDef
        | NodeValue::SuperBlock
        | NodeValue::ListItem(..) => {
            child.block()
                && !matches!(
                    *child,
                    NodeValue::ListItem(..) | NodeValue::TableHead | NodeValue::TableRow
                )
        }

        NodeValue::List(..) => matches!(
            *child,
            NodeValue::ListItem(..) | NodeValue::KramdownBlockIAL
        ),

        NodeValue::Table(..) => matches!(*child, NodeValue::TableHead | NodeValue::TableRow),
        NodeValue::TableHead | NodeValue::TableRow => matches!(*child, NodeValue::TableCell(..)),
        NodeValue::TableCell(..) => !child.block(),

        NodeValue::FootnotesDefBlock => matches!(*child, NodeValue::FootnotesDef),

        ref v if v.contains_inlines() => !child.block(),

        NodeValue::Emph
        | NodeValue::Strong
        | NodeValue::Strikethrough
        | NodeValue::Mark
        | NodeValue::Sup
        | NodeValue::Sub
        | NodeValue::Underline
        | NodeValue::Kbd
        | NodeValue::Tag
        | NodeValue::Link(..)
        | NodeValue::Image
        | NodeValue::BlockRef
        | NodeValue::FileAnnotationRef => !child.block(),

        _ => false,
    }
}

pub fn ends_with_blank_line<'a>(node: &'a AstNode<'a>) -> bool {
    let mut it = Some(node);
    while let Some(cur) = it {
        if cur.data.borrow().last_line_blank {
            return true;
        }
        match cur.data.borrow().value {
            NodeValue::List(..) | NodeValue::ListItem(..) => it = cur.last_child(),
            _ => it = None,
        };
    }
    false
}

pub fn containing_block<'a>(node: &'a AstNode<'a>) -> Option<&'a AstNode<'a>> {
    let mut ch = Some(node);
    while let Some(n) = ch {
        if n.data.borrow().value.block() {
            return Some(n);
        }
        ch = n.parent();
    }
    None
}

/// Concatenates the plain text of `node` and its descendants: text,
/// code, math content and textmark content, in document order.
pub fn text_content<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    for n in node.descendants() {
        let ast = n.data.borrow();
        match &ast.value {
            NodeValue::Text
            | NodeValue::CodeSpanContent
            | NodeValue::InlineMathContent
            | NodeValue::MathBlockContent
            | NodeValue::CodeBlockCode
            | NodeValue::LinkText
            | NodeValue::BlockRefText
            | NodeValue::BlockRefDynamicText
            | NodeValue::FileAnnotationRefText
            | NodeValue::HtmlEntity
            | NodeValue::EmojiUnicode
            | NodeValue::EmojiAlias
            | NodeValue::BackslashContent => out.push_str(&ast.tokens),
            NodeValue::TextMark(tm) => out.push_str(&tm.text_content),
            NodeValue::SoftBreak | NodeValue::HardBreak | NodeValue::Br => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Generates a fresh block ID: wall-clock second stamp plus 7 base62
/// characters.
pub fn new_node_id() -> String {
    use chrono::Local;
    const BASE62: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    let mut id = Local::now().format("%Y%m%d%H%M%S").to_string();
    id.push('-');
    for _ in 0..7 {
        id.push(BASE62[fastrand::usize(..BASE62.len())] as char);
    }
    id
}

/// Whether `s` looks like a block ID: `YYYYMMDDHHMMSS-` plus 7
/// alphanumerics.
pub fn is_node_id_pattern(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 22 {
        return false;
    }
    if !b[..14].iter().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if b[14] != b'-' {
        return false;
    }
    b[15..].iter().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        assert_eq!(NodeKind::Heading.name(), "NodeHeading");
        assert_eq!(NodeKind::from_name("NodeHTMLBlock"), Some(NodeKind::HtmlBlock));
        assert_eq!(NodeKind::from_name("NodeBogus"), None);
    }

    #[test]
    fn node_ids() {
        let id = new_node_id();
        assert!(is_node_id_pattern(&id), "{id}");
        assert!(is_node_id_pattern("20210808180117-6v0mkxr"));
        assert!(!is_node_id_pattern("20210808180117-6v0mkx"));
        assert!(!is_node_id_pattern("2021080818011x-6v0mkxr"));
    }

    #[test]
    fn ial_accessors() {
        let mut ast = Ast::new(NodeValue::Paragraph);
        ast.set_ial_attr("id", "20210808180117-6v0mkxr");
        ast.set_ial_attr("bookmark", "b");
        ast.set_ial_attr("bookmark", "c");
        assert_eq!(ast.id(), Some("20210808180117-6v0mkxr"));
        assert_eq!(ast.ial_attr("bookmark"), Some("c"));
        assert_eq!(ast.ial.len(), 2);
    }
}
