//! Block-level tokenizer: headings, fences, tables, lists, quotes, breaks.

use std::sync::LazyLock;

use regex::Regex;

use super::inline;
use crate::document::{Alignment, Block, BlockKind};
use crate::error::{Construct, ParseDegraded};

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6})(?:[ \t]+(.*))?$").expect("heading pattern is valid")
});
static THEMATIC_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$")
        .expect("thematic break pattern is valid")
});
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-+*])(?:[ \t]+|$)").expect("bullet pattern is valid"));
static ORDERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,9})[.)](?:[ \t]+|$)").expect("ordered marker pattern is valid")
});
static TABLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|?[ \t]*:?-+:?[ \t]*(?:\|[ \t]*:?-+:?[ \t]*)*\|?$")
        .expect("table separator pattern is valid")
});

/// One source line, tagged with its one-based line number in the input.
#[derive(Debug, Clone, Copy)]
pub(super) struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
}

/// Constructs that open a block on a single line (tables need a lookahead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockStart {
    Fence,
    Heading,
    ThematicBreak,
    Quote,
    ListItem,
}

/// Classify a trimmed line by the block it would open.
pub(super) fn block_start(trimmed: &str) -> Option<BlockStart> {
    if fence_open(trimmed).is_some() {
        Some(BlockStart::Fence)
    } else if HEADING.is_match(trimmed) {
        Some(BlockStart::Heading)
    } else if THEMATIC_BREAK.is_match(trimmed) {
        Some(BlockStart::ThematicBreak)
    } else if trimmed.starts_with('>') {
        Some(BlockStart::Quote)
    } else if BULLET.is_match(trimmed) || ORDERED.is_match(trimmed) {
        Some(BlockStart::ListItem)
    } else {
        None
    }
}

pub(super) fn is_table_separator(trimmed: &str) -> bool {
    trimmed.contains('|') && TABLE_SEPARATOR.is_match(trimmed)
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    ordered: bool,
    number: u64,
    /// Leading whitespace before the marker
    indent: usize,
    /// Byte offset in the line where the item content begins
    content_offset: usize,
}

impl Marker {
    /// Lines indented at least this far belong to the item.
    const fn nest_threshold(&self) -> usize {
        self.indent + 2
    }
}

fn indent_of(text: &str) -> usize {
    text.len() - text.trim_start_matches([' ', '\t']).len()
}

fn list_marker(text: &str) -> Option<Marker> {
    let indent = indent_of(text);
    let rest = &text[indent..];
    if THEMATIC_BREAK.is_match(rest.trim_end()) {
        return None;
    }
    let (ordered, number, matched) = if let Some(caps) = BULLET.captures(rest) {
        (false, 1, caps.get(0)?.end())
    } else {
        let caps = ORDERED.captures(rest)?;
        let number = caps.get(1)?.as_str().parse().ok()?;
        (true, number, caps.get(0)?.end())
    };
    Some(Marker {
        ordered,
        number,
        indent,
        content_offset: indent + matched,
    })
}

/// Backtick run length of an opening fence, if `trimmed` is one.
fn fence_open(trimmed: &str) -> Option<usize> {
    let run = trimmed.len() - trimmed.trim_start_matches('`').len();
    if run < 3 || trimmed[run..].contains('`') {
        return None;
    }
    Some(run)
}

fn is_fence_close(trimmed: &str, open: usize) -> bool {
    trimmed.len() >= open && trimmed.bytes().all(|b| b == b'`')
}

/// Splits one table row into cell texts, unescaping `\|`.
fn split_row(trimmed: &str) -> Vec<String> {
    let body = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let body = match body.strip_suffix('|') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => body,
    };
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn alignment(cell: &str) -> Alignment {
    match (cell.starts_with(':'), cell.ends_with(':')) {
        (true, true) => Alignment::Center,
        (true, false) => Alignment::Left,
        (false, true) => Alignment::Right,
        (false, false) => Alignment::None,
    }
}

pub(super) struct BlockParser<'w> {
    warnings: &'w mut Vec<ParseDegraded>,
}

impl<'w> BlockParser<'w> {
    pub(super) const fn new(warnings: &'w mut Vec<ParseDegraded>) -> Self {
        Self { warnings }
    }

    pub(super) fn parse(&mut self, lines: &[Line<'_>]) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let trimmed = lines[i].text.trim();
            if trimmed.is_empty() {
                i += 1;
                continue;
            }
            let (block, next) = match block_start(trimmed) {
                Some(BlockStart::Fence) => self.fenced_code(lines, i),
                Some(BlockStart::Heading) => (heading(trimmed), i + 1),
                Some(BlockStart::ThematicBreak) => (Block::leaf(BlockKind::ThematicBreak), i + 1),
                Some(BlockStart::Quote) => self.blockquote(lines, i),
                Some(BlockStart::ListItem) => self.list(lines, i),
                None => self.table_or_paragraph(lines, i),
            };
            blocks.push(block);
            i = next;
        }
        blocks
    }

    fn degrade(&mut self, line: Line<'_>, construct: Construct, reason: String) {
        tracing::warn!(line = line.number, %construct, %reason, "degraded markdown construct");
        self.warnings.push(ParseDegraded {
            line: line.number,
            construct,
            reason,
        });
    }

    fn fenced_code(&mut self, lines: &[Line<'_>], start: usize) -> (Block, usize) {
        let open_line = lines[start];
        let trimmed = open_line.text.trim();
        let open = fence_open(trimmed).unwrap_or(3);
        let language = trimmed[open..]
            .split_whitespace()
            .next()
            .map(ToOwned::to_owned);

        let close = (start + 1..lines.len()).find(|&j| is_fence_close(lines[j].text.trim(), open));
        let Some(close) = close else {
            self.degrade(open_line, Construct::CodeFence, "unterminated code fence".to_string());
            return paragraph(lines, start);
        };

        let code = lines[start + 1..close]
            .iter()
            .map(|line| line.text)
            .collect::<Vec<_>>()
            .join("\n");
        (
            Block::leaf(BlockKind::CodeBlock { language, code }),
            close + 1,
        )
    }

    fn blockquote(&mut self, lines: &[Line<'_>], start: usize) -> (Block, usize) {
        let mut inner = Vec::new();
        let mut i = start;
        while let Some(line) = lines.get(i) {
            let Some(rest) = line.text.trim_start().strip_prefix('>') else {
                break;
            };
            inner.push(Line {
                number: line.number,
                text: rest.strip_prefix(' ').unwrap_or(rest),
            });
            i += 1;
        }
        (Block::blockquote(self.parse(&inner)), i)
    }

    fn list(&mut self, lines: &[Line<'_>], start: usize) -> (Block, usize) {
        let Some(first) = list_marker(lines[start].text) else {
            return paragraph(lines, start);
        };
        let mut items = Vec::new();
        let mut i = start;

        while let Some(marker) = lines.get(i).and_then(|line| list_marker(line.text)) {
            if marker.ordered != first.ordered {
                break;
            }
            let threshold = marker.nest_threshold();
            let head = lines[i];
            let mut item_lines = vec![Line {
                number: head.number,
                text: &head.text[marker.content_offset.min(head.text.len())..],
            }];
            i += 1;
            // Column that continuation lines are stripped to, fixed by the
            // first indented one: the marker width or anything from two up.
            let mut column = None;

            while let Some(line) = lines.get(i) {
                if line.text.trim().is_empty() {
                    let next = (i + 1..lines.len()).find(|&k| !lines[k].text.trim().is_empty());
                    match next {
                        Some(k) if indent_of(lines[k].text) >= threshold => {
                            item_lines.extend(lines[i..k].iter().map(|blank| Line {
                                number: blank.number,
                                text: "",
                            }));
                            i = k;
                            continue;
                        }
                        _ => break,
                    }
                }
                let indent = indent_of(line.text);
                if indent >= threshold {
                    let column = *column.get_or_insert(indent.min(marker.content_offset));
                    item_lines.push(Line {
                        number: line.number,
                        text: &line.text[indent.min(column)..],
                    });
                    i += 1;
                    continue;
                }
                let trimmed = line.text.trim();
                if block_start(trimmed).is_some() || interrupts_with_table(lines, i) {
                    break;
                }
                // Lazy continuation of the item's paragraph.
                item_lines.push(Line {
                    number: line.number,
                    text: trimmed,
                });
                i += 1;
            }
            items.push(Block::list_item(self.parse(&item_lines)));

            let after_blanks = (i..lines.len())
                .find(|&k| !lines[k].text.trim().is_empty())
                .unwrap_or(lines.len());
            let continues = lines
                .get(after_blanks)
                .and_then(|line| list_marker(line.text))
                .is_some_and(|next| next.ordered == first.ordered && next.indent < threshold);
            if !continues {
                break;
            }
            i = after_blanks;
        }

        let kind = BlockKind::List {
            ordered: first.ordered,
            start: first.number,
        };
        (Block::new(kind, items), i)
    }

    fn table_or_paragraph(&mut self, lines: &[Line<'_>], start: usize) -> (Block, usize) {
        let header_line = lines[start];
        let header = header_line.text.trim();
        let separator = lines.get(start + 1).map(|line| line.text.trim());
        let is_table = |sep: &&str| header.contains('|') && is_table_separator(sep);
        let Some(separator) = separator.filter(is_table) else {
            return paragraph(lines, start);
        };

        let header_cells = split_row(header);
        let separator_cells = split_row(separator);
        if header_cells.len() != separator_cells.len() {
            self.degrade(
                header_line,
                Construct::Table,
                format!(
                    "{} header cells, {} separator cells",
                    header_cells.len(),
                    separator_cells.len()
                ),
            );
            return paragraph(lines, start);
        }

        let width = header_cells.len();
        let alignments = separator_cells.iter().map(|cell| alignment(cell)).collect();
        let mut rows = vec![table_row(header_cells, width)];
        let mut i = start + 2;
        while let Some(line) = lines.get(i) {
            let trimmed = line.text.trim();
            if trimmed.is_empty() || block_start(trimmed).is_some() {
                break;
            }
            rows.push(table_row(split_row(trimmed), width));
            i += 1;
        }
        (Block::new(BlockKind::Table { alignments }, rows), i)
    }
}

fn heading(trimmed: &str) -> Block {
    let Some(caps) = HEADING.captures(trimmed) else {
        return Block::paragraph(inline::parse(trimmed));
    };
    let level = caps.get(1).map_or(1, |m| m.as_str().len());
    let content = caps.get(2).map_or("", |m| strip_closing_hashes(m.as_str().trim()));
    #[allow(clippy::cast_possible_truncation)]
    Block::heading(level as u8, inline::parse(content))
}

/// Drops an optional closing `#` run, which must follow whitespace.
fn strip_closing_hashes(content: &str) -> &str {
    let without = content.trim_end_matches('#');
    if without.is_empty() {
        ""
    } else if without.ends_with([' ', '\t']) {
        without.trim_end()
    } else {
        content
    }
}

fn table_row(mut cells: Vec<String>, width: usize) -> Block {
    cells.resize(width, String::new());
    let cells = cells
        .iter()
        .map(|cell| Block::new(BlockKind::TableCell, inline::parse(cell)))
        .collect();
    Block::new(BlockKind::TableRow, cells)
}

/// Paragraph starting at `start`; the first line is taken unconditionally.
fn paragraph(lines: &[Line<'_>], start: usize) -> (Block, usize) {
    let mut text = lines[start].text.trim().to_string();
    let mut i = start + 1;
    while let Some(line) = lines.get(i) {
        let trimmed = line.text.trim();
        if trimmed.is_empty() || block_start(trimmed).is_some() || interrupts_with_table(lines, i) {
            break;
        }
        text.push('\n');
        text.push_str(trimmed);
        i += 1;
    }
    (Block::paragraph(inline::parse(&text)), i)
}

/// True when line `i` opens a well-formed table.
fn interrupts_with_table(lines: &[Line<'_>], i: usize) -> bool {
    let header = lines[i].text.trim();
    header.contains('|')
        && lines.get(i + 1).is_some_and(|sep| {
            let sep = sep.text.trim();
            is_table_separator(sep) && split_row(sep).len() == split_row(header).len()
        })
}
