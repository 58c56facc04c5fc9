//! Markdown codec.
//!
//! This module handles:
//! - Parsing Markdown into a block tree ([`parse`])
//! - Writing a block tree back as canonical Markdown ([`serialize`])
//!
//! Parsing never fails: malformed constructs are kept as paragraph text and
//! reported as [`ParseDegraded`] warnings.

mod block;
mod inline;
mod serialize;

pub use serialize::serialize;

use crate::document::Block;
use crate::error::ParseDegraded;
use block::{BlockParser, Line};

/// Result of parsing Markdown text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    /// Top-level blocks
    pub blocks: Vec<Block>,
    /// Constructs that were normalized to plain text
    pub warnings: Vec<ParseDegraded>,
}

impl Parsed {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Parse Markdown text into a block tree.
///
/// # Example
///
/// ```
/// use mdsync::document::{Block, BlockKind};
/// use mdsync::markdown::parse;
///
/// let parsed = parse("# Title\n\nHello **world**");
/// assert_eq!(parsed.blocks[0].kind, BlockKind::Heading { level: 1 });
/// assert_eq!(parsed.blocks[1].children[1], Block::strong(vec![Block::text("world")]));
/// ```
pub fn parse(text: &str) -> Parsed {
    let _span = tracing::trace_span!("markdown.parse", bytes = text.len()).entered();
    let lines: Vec<Line<'_>> = text
        .lines()
        .enumerate()
        .map(|(idx, text)| Line {
            number: idx + 1,
            text,
        })
        .collect();
    let mut warnings = Vec::new();
    let blocks = BlockParser::new(&mut warnings).parse(&lines);
    Parsed { blocks, warnings }
}

/// Parse and re-serialize `text` into its canonical form.
pub fn normalize(text: &str) -> String {
    serialize(&parse(text).blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Alignment, BlockKind};
    use crate::error::Construct;

    fn blocks(text: &str) -> Vec<Block> {
        let parsed = parse(text);
        assert!(parsed.is_clean(), "unexpected warnings: {:?}", parsed.warnings);
        parsed.blocks
    }

    fn assert_stable(text: &str) {
        let first = parse(text).blocks;
        let again = parse(&serialize(&first)).blocks;
        assert_eq!(again, first, "not stable for {text:?}");
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(blocks("").is_empty());
        assert!(blocks("\n\n   \n").is_empty());
    }

    #[test]
    fn test_title_and_strong_paragraph() {
        assert_eq!(
            blocks("# Title\n\nHello **world**"),
            vec![
                Block::heading(1, vec![Block::text("Title")]),
                Block::paragraph(vec![
                    Block::text("Hello "),
                    Block::strong(vec![Block::text("world")]),
                ]),
            ]
        );
    }

    #[test]
    fn test_heading_levels_and_closing_sequence() {
        let parsed = blocks("# One\n## Two ##\n###### Six\n####### Seven");
        assert_eq!(parsed[0].kind, BlockKind::Heading { level: 1 });
        assert_eq!(parsed[1], Block::heading(2, vec![Block::text("Two")]));
        assert_eq!(parsed[2].kind, BlockKind::Heading { level: 6 });
        assert_eq!(parsed[3], Block::paragraph(vec![Block::text("####### Seven")]));
    }

    #[test]
    fn test_fenced_code_block() {
        let parsed = blocks("```rust\nfn main() {\n    println!(\"hi\");\n}\n```\nafter");
        assert_eq!(
            parsed[0],
            Block::code_block(Some("rust"), "fn main() {\n    println!(\"hi\");\n}")
        );
        assert_eq!(parsed[1], Block::paragraph(vec![Block::text("after")]));
    }

    #[test]
    fn test_unterminated_fence_degrades_to_paragraph() {
        let parsed = parse("```rust\nlet x = 1;");
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].construct, Construct::CodeFence);
        assert_eq!(parsed.warnings[0].line, 1);
        assert_eq!(
            parsed.blocks,
            vec![Block::paragraph(vec![Block::text("```rust\nlet x = 1;")])]
        );
    }

    #[test]
    fn test_table_with_alignments() {
        let parsed = blocks("| Name | Qty |\n|:-----|----:|\n| apples | 12 |\n| pears |");
        let table = &parsed[0];
        assert_eq!(
            table.kind,
            BlockKind::Table {
                alignments: vec![Alignment::Left, Alignment::Right]
            }
        );
        assert_eq!(table.children.len(), 3);
        assert_eq!(table.children[1].children[0].plain_text(), "apples");
        // Short rows are padded to the header width.
        assert_eq!(table.children[2].children.len(), 2);
        assert!(table.children[2].children[1].children.is_empty());
    }

    #[test]
    fn test_malformed_table_is_plain_paragraph() {
        let parsed = parse("|a|b|c|\n|---|---|");
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].construct, Construct::Table);
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].kind, BlockKind::Paragraph);
        assert!(parsed.blocks[0].plain_text().contains("|a|b|c|"));
    }

    #[test]
    fn test_bullet_list_items() {
        let parsed = blocks("- one\n- two\n* three");
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[0].kind,
            BlockKind::List {
                ordered: false,
                start: 1
            }
        );
        assert_eq!(parsed[0].children.len(), 3);
        assert_eq!(parsed[0].children[2].plain_text(), "three");
    }

    #[test]
    fn test_ordered_list_start() {
        let parsed = blocks("3. three\n4. four");
        assert_eq!(
            parsed[0].kind,
            BlockKind::List {
                ordered: true,
                start: 3
            }
        );
    }

    #[test]
    fn test_nested_list_by_indentation() {
        let parsed = blocks("- outer\n  - inner\n  - inner two\n- next");
        let list = &parsed[0];
        assert_eq!(list.children.len(), 2);
        let first = &list.children[0];
        assert_eq!(first.children.len(), 2);
        assert_eq!(first.children[0], Block::paragraph(vec![Block::text("outer")]));
        assert_eq!(first.children[1].children.len(), 2);
    }

    #[test]
    fn test_loose_list_with_continuation_paragraph() {
        let parsed = blocks("- first\n\n  continued\n\n- second");
        let list = &parsed[0];
        assert_eq!(list.children.len(), 2);
        assert_eq!(list.children[0].children.len(), 2);
    }

    #[test]
    fn test_list_ends_at_unindented_paragraph() {
        let parsed = blocks("- item\n\nparagraph");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], Block::paragraph(vec![Block::text("paragraph")]));
    }

    #[test]
    fn test_lazy_continuation_joins_item_paragraph() {
        let parsed = blocks("- item\ncontinued");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].children[0].plain_text(), "item\ncontinued");
    }

    #[test]
    fn test_list_interrupts_paragraph() {
        let parsed = blocks("intro\n- a\n- b");
        assert_eq!(parsed.len(), 2);
        assert!(matches!(parsed[1].kind, BlockKind::List { .. }));
    }

    #[test]
    fn test_blockquote_is_recursive() {
        let parsed = blocks("> quoted **text**\n>\n> > nested");
        let quote = &parsed[0];
        assert_eq!(quote.kind, BlockKind::Blockquote);
        assert_eq!(quote.children.len(), 2);
        assert_eq!(quote.children[1].kind, BlockKind::Blockquote);
    }

    #[test]
    fn test_thematic_breaks() {
        let parsed = blocks("a\n\n---\n\n* * *\n\n___");
        assert_eq!(parsed.len(), 4);
        assert!(
            parsed[1..]
                .iter()
                .all(|b| b.kind == BlockKind::ThematicBreak)
        );
    }

    #[test]
    fn test_serialize_canonical_forms() {
        assert_eq!(normalize("Title\n===\n"), "Title\n===\n");
        assert_eq!(normalize("* a\n+ b"), "- a\n- b\n");
        assert_eq!(normalize("1) a\n2) b"), "1. a\n2. b\n");
        assert_eq!(normalize("__strong__ _em_"), "**strong** *em*\n");
        assert_eq!(normalize("#   Spaced   #"), "# Spaced\n");
    }

    #[test]
    fn test_roundtrip_is_stable_for_fixture_constructs() {
        assert_stable("# Title\n\nHello **world**");
        assert_stable("- a\n  - b\n    1. c\n- d");
        assert_stable("1. x\n\n   para\n2. y");
        assert_stable("> quote\n> - item\n>\n> ```\n> code\n> ```");
        assert_stable("| a | b |\n|:-:|--|\n| `x|y` | **z** |");
        assert_stable("text with \\*stars\\* and \\_under\\_ and \\[brackets\\]");
        assert_stable("***both*** and **_mixed_** and *a*_b_");
        assert_stable("[link](<a b> \"t\") ![img](i.png) `code` ~~gone~~");
        assert_stable("para\n\\# not a heading\n\\- not a list\n1\\. not ordered");
        assert_stable("- ```rust\n  fn x() {}\n\n  more\n  ```\n- next");
        assert_stable("wow![x](y)");
        assert_stable("# C#");
        assert_stable("a|b\n\\-|-");
        assert_stable("1. a\n   - b\n     - c");
        assert_stable("9. a\n10. b\n    - c\n      - d");
        assert_stable("1. ```\n   fn x() {\n       y\n   }\n   ```");
    }

    #[test]
    fn test_ordered_item_content_keeps_nesting_and_code_indent() {
        for text in [
            "1. a\n   - b\n     - c",
            "1. a\n  - b\n    - c",
        ] {
            let parsed = blocks(text);
            let outer = &parsed[0].children[0].children[1];
            assert_eq!(outer.children.len(), 1, "{text:?}");
            let inner = &outer.children[0].children[1];
            assert_eq!(inner.children[0].plain_text(), "c");
        }

        let parsed = blocks("1. ```\n   fn x() {\n       y\n   }\n   ```");
        let code = &parsed[0].children[0].children[0];
        assert_eq!(
            code.kind,
            BlockKind::CodeBlock {
                language: None,
                code: "fn x() {\n    y\n}".to_string()
            }
        );
        assert_eq!(
            serialize(&parsed),
            "1. ```\n  fn x() {\n      y\n  }\n  ```\n"
        );
    }

    #[test]
    fn test_structured_list_item_insert_serializes_indented() {
        let parsed = blocks("- one\n  - nested one");
        let mut list = parsed[0].clone();
        let nested = &mut list.children[0].children[1];
        nested.children.push(Block::list_item(vec![Block::paragraph(vec![Block::text(
            "nested two",
        )])]));
        assert_eq!(
            serialize(&[list]),
            "- one\n  - nested one\n  - nested two\n"
        );
    }
}
