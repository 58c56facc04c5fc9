//! Block tree types.

use serde::{Deserialize, Serialize};

/// Column alignment declared by a table's separator row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// The kind of a block, carrying its kind-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKind {
    /// ATX heading, level 1-6
    Heading { level: u8 },
    Paragraph,
    List {
        ordered: bool,
        /// First item number of an ordered list
        #[serde(default = "default_start")]
        start: u64,
    },
    ListItem,
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        code: String,
    },
    Table {
        #[serde(default)]
        alignments: Vec<Alignment>,
    },
    TableRow,
    TableCell,
    Blockquote,
    ThematicBreak,
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default)]
        alt: String,
    },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Text { text: String },
    Emphasis,
    Strong,
    Strikethrough,
    InlineCode { code: String },
}

const fn default_start() -> u64 {
    1
}

impl BlockKind {
    /// Leaf kinds carry their content as attributes and never own children.
    pub const fn is_leaf(&self) -> bool {
        matches!(
            self,
            Self::Text { .. }
                | Self::InlineCode { .. }
                | Self::CodeBlock { .. }
                | Self::ThematicBreak
                | Self::Image { .. }
        )
    }

    /// True for spans that live inside paragraphs, headings and cells.
    pub const fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::Text { .. }
                | Self::Emphasis
                | Self::Strong
                | Self::Strikethrough
                | Self::InlineCode { .. }
                | Self::Link { .. }
                | Self::Image { .. }
        )
    }

    /// The heading level when it lies outside 1-6.
    pub const fn invalid_heading_level(&self) -> Option<u8> {
        match self {
            Self::Heading { level } if *level < 1 || *level > 6 => Some(*level),
            _ => None,
        }
    }

    /// Whether two kinds are the same variant, ignoring attributes.
    pub fn same_variant(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Heading { .. } => "heading",
            Self::Paragraph => "paragraph",
            Self::List { .. } => "list",
            Self::ListItem => "list_item",
            Self::CodeBlock { .. } => "code_block",
            Self::Table { .. } => "table",
            Self::TableRow => "table_row",
            Self::TableCell => "table_cell",
            Self::Blockquote => "blockquote",
            Self::ThematicBreak => "thematic_break",
            Self::Image { .. } => "image",
            Self::Link { .. } => "link",
            Self::Text { .. } => "text",
            Self::Emphasis => "emphasis",
            Self::Strong => "strong",
            Self::Strikethrough => "strikethrough",
            Self::InlineCode { .. } => "inline_code",
        }
    }
}

/// One node of the document tree.
///
/// A block exclusively owns its children, so the tree is acyclic by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

impl Block {
    pub const fn new(kind: BlockKind, children: Vec<Self>) -> Self {
        Self { kind, children }
    }

    pub const fn leaf(kind: BlockKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::leaf(BlockKind::Text { text: text.into() })
    }

    pub fn heading(level: u8, children: Vec<Self>) -> Self {
        Self::new(BlockKind::Heading { level }, children)
    }

    pub const fn paragraph(children: Vec<Self>) -> Self {
        Self::new(BlockKind::Paragraph, children)
    }

    pub const fn bullet_list(items: Vec<Self>) -> Self {
        Self::new(
            BlockKind::List {
                ordered: false,
                start: 1,
            },
            items,
        )
    }

    pub const fn ordered_list(start: u64, items: Vec<Self>) -> Self {
        Self::new(
            BlockKind::List {
                ordered: true,
                start,
            },
            items,
        )
    }

    pub const fn list_item(children: Vec<Self>) -> Self {
        Self::new(BlockKind::ListItem, children)
    }

    pub fn code_block(language: Option<&str>, code: impl Into<String>) -> Self {
        Self::leaf(BlockKind::CodeBlock {
            language: language.map(ToOwned::to_owned),
            code: code.into(),
        })
    }

    pub const fn blockquote(children: Vec<Self>) -> Self {
        Self::new(BlockKind::Blockquote, children)
    }

    pub const fn strong(children: Vec<Self>) -> Self {
        Self::new(BlockKind::Strong, children)
    }

    pub const fn emphasis(children: Vec<Self>) -> Self {
        Self::new(BlockKind::Emphasis, children)
    }

    pub const fn strikethrough(children: Vec<Self>) -> Self {
        Self::new(BlockKind::Strikethrough, children)
    }

    pub fn inline_code(code: impl Into<String>) -> Self {
        Self::leaf(BlockKind::InlineCode { code: code.into() })
    }

    pub fn link(url: impl Into<String>, title: Option<String>, children: Vec<Self>) -> Self {
        Self::new(
            BlockKind::Link {
                url: url.into(),
                title,
            },
            children,
        )
    }

    pub fn image(url: impl Into<String>, title: Option<String>, alt: impl Into<String>) -> Self {
        Self::leaf(BlockKind::Image {
            url: url.into(),
            title,
            alt: alt.into(),
        })
    }

    pub const fn is_leaf(&self) -> bool {
        self.kind.is_leaf()
    }

    /// Concatenated text content of this subtree, without markup.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            BlockKind::Text { text } => out.push_str(text),
            BlockKind::InlineCode { code } | BlockKind::CodeBlock { code, .. } => {
                out.push_str(code);
            }
            BlockKind::Image { alt, .. } => out.push_str(alt),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Number of blocks in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}
