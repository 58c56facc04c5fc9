//! Canonical Markdown output.

use unicode_width::UnicodeWidthStr;

use super::block::{block_start, is_table_separator};
use crate::document::{Alignment, Block, BlockKind};

/// List continuation lines are indented by this many spaces.
const LIST_INDENT: &str = "  ";
const MIN_COLUMN_WIDTH: usize = 3;

/// Serialize a block sequence to canonical Markdown.
pub fn serialize(blocks: &[Block]) -> String {
    let mut out = sequence_lines(blocks, false).join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Lines for a block sequence, blank-line separated.
///
/// Inside list items a list directly following a paragraph is kept tight,
/// since a list marker always interrupts a paragraph.
fn sequence_lines(blocks: &[Block], in_item: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for (idx, block) in blocks.iter().enumerate() {
        if idx > 0 {
            let tight = in_item
                && matches!(blocks[idx - 1].kind, BlockKind::Paragraph)
                && matches!(block.kind, BlockKind::List { .. });
            if !tight {
                lines.push(String::new());
            }
        }
        lines.extend(block_lines(block));
    }
    lines
}

fn block_lines(block: &Block) -> Vec<String> {
    match &block.kind {
        BlockKind::Heading { level } => {
            let content = single_line(&inline_string(&block.children));
            let content = escape_closing_hash(content);
            let marker = "#".repeat(usize::from((*level).clamp(1, 6)));
            if content.is_empty() {
                vec![marker]
            } else {
                vec![format!("{marker} {content}")]
            }
        }
        BlockKind::Paragraph => paragraph_lines(&block.children),
        BlockKind::List { ordered, start } => list_lines(&block.children, *ordered, *start),
        BlockKind::ListItem => item_lines(&block.children, "- "),
        BlockKind::CodeBlock { language, code } => code_lines(language.as_deref(), code),
        BlockKind::Table { alignments } => table_lines(&block.children, alignments),
        BlockKind::Blockquote => {
            let inner = sequence_lines(&block.children, false);
            if inner.is_empty() {
                return vec![">".to_string()];
            }
            inner
                .into_iter()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {line}")
                    }
                })
                .collect()
        }
        BlockKind::ThematicBreak => vec!["---".to_string()],
        BlockKind::TableRow | BlockKind::TableCell => {
            vec![single_line(&inline_string(&block.children))]
        }
        // Inline content at block level is written as its own paragraph.
        _ => paragraph_lines(std::slice::from_ref(block)),
    }
}

fn paragraph_lines(children: &[Block]) -> Vec<String> {
    let text = inline_string(children);
    let mut lines: Vec<String> = text.split('\n').map(|line| line.trim().to_string()).collect();
    for i in 0..lines.len() {
        if block_start(&lines[i]).is_some() {
            lines[i] = escape_line_start(&lines[i]);
        }
        if i > 0 && lines[i - 1].contains('|') && is_table_separator(&lines[i]) {
            lines[i] = format!("\\{}", lines[i]);
        }
    }
    lines
}

/// Backslash-escape the character that makes `line` open a block.
fn escape_line_start(line: &str) -> String {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        format!("{}\\{}", &line[..digits], &line[digits..])
    } else {
        format!("\\{line}")
    }
}

/// A trailing `#` run would be read back as a closing sequence.
fn escape_closing_hash(content: String) -> String {
    if content.ends_with('#') {
        let mut escaped = content;
        escaped.pop();
        escaped.push_str("\\#");
        escaped
    } else {
        content
    }
}

fn single_line(text: &str) -> String {
    text.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn list_lines(items: &[Block], ordered: bool, start: u64) -> Vec<String> {
    let mut lines = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let marker = if ordered {
            format!("{}. ", start + idx as u64)
        } else {
            "- ".to_string()
        };
        let children = if matches!(item.kind, BlockKind::ListItem) {
            item.children.as_slice()
        } else {
            std::slice::from_ref(item)
        };
        lines.extend(item_lines(children, &marker));
    }
    lines
}

fn item_lines(children: &[Block], marker: &str) -> Vec<String> {
    let inner = sequence_lines(children, true);
    let mut inner = inner.into_iter();
    let Some(first) = inner.next() else {
        return vec![marker.trim_end().to_string()];
    };
    let mut lines = vec![format!("{marker}{first}").trim_end().to_string()];
    lines.extend(inner.map(|line| {
        if line.is_empty() {
            line
        } else {
            format!("{LIST_INDENT}{line}")
        }
    }));
    lines
}

fn code_lines(language: Option<&str>, code: &str) -> Vec<String> {
    let longest_fence_like = code
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if !trimmed.is_empty() && trimmed.bytes().all(|b| b == b'`') {
                trimmed.len()
            } else {
                0
            }
        })
        .max()
        .unwrap_or(0);
    let fence = "`".repeat((longest_fence_like + 1).max(3));

    let mut lines = vec![format!("{fence}{}", language.unwrap_or_default())];
    if !code.is_empty() {
        lines.extend(code.split('\n').map(ToOwned::to_owned));
    }
    lines.push(fence);
    lines
}

fn table_lines(rows: &[Block], alignments: &[Alignment]) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            row.children
                .iter()
                .map(|cell| single_line(&inline_string(&cell.children)).replace('|', "\\|"))
                .collect()
        })
        .collect();
    let columns = cells
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(alignments.len()))
        .max()
        .unwrap_or(0)
        .max(1);

    let mut widths = vec![MIN_COLUMN_WIDTH; columns];
    for row in &cells {
        for (col, cell) in row.iter().enumerate() {
            widths[col] = widths[col].max(cell.width());
        }
    }

    let format_row = |row: &[String]| {
        let padded: Vec<String> = (0..columns)
            .map(|col| {
                let cell = row.get(col).map_or("", String::as_str);
                format!("{cell}{}", " ".repeat(widths[col] - cell.width()))
            })
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let separator: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(col, &width)| {
            match alignments.get(col).copied().unwrap_or_default() {
                Alignment::None => "-".repeat(width),
                Alignment::Left => format!(":{}", "-".repeat(width - 1)),
                Alignment::Right => format!("{}:", "-".repeat(width - 1)),
                Alignment::Center => format!(":{}:", "-".repeat(width - 2)),
            }
        })
        .collect();

    let mut lines = vec![
        format_row(cells[0].as_slice()),
        format!("| {} |", separator.join(" | ")),
    ];
    lines.extend(cells[1..].iter().map(|row| format_row(row.as_slice())));
    lines
}

/// Inline markup for a run of inline blocks.
fn inline_string(children: &[Block]) -> String {
    let mut out = String::new();
    write_inlines(children, &mut out, false);
    out
}

fn write_inlines(children: &[Block], out: &mut String, in_ambiguous_strong: bool) {
    let mut previous_delimiter: Option<char> = None;
    for (idx, child) in children.iter().enumerate() {
        let at_edge = idx == 0 || idx + 1 == children.len();
        let mut delimiter = None;
        match &child.kind {
            BlockKind::Text { text } => {
                let mut escaped = escape_text(text);
                let before_link =
                    matches!(children.get(idx + 1).map(|b| &b.kind), Some(BlockKind::Link { .. }));
                if before_link && escaped.ends_with('!') {
                    escaped.pop();
                    escaped.push_str("\\!");
                }
                out.push_str(&escaped);
            }
            BlockKind::Emphasis => {
                let wraps_strong = edges_are(&child.children, |k| matches!(k, BlockKind::Strong));
                let underscore = previous_delimiter == Some('*')
                    || wraps_strong
                    || (in_ambiguous_strong && at_edge);
                let d = if underscore { '_' } else { '*' };
                out.push(d);
                write_inlines(&child.children, out, false);
                out.push(d);
                delimiter = Some(d);
            }
            BlockKind::Strong => {
                let d = if previous_delimiter == Some('*') { '_' } else { '*' };
                let ambiguous = edges_are(&child.children, |k| matches!(k, BlockKind::Emphasis));
                out.push(d);
                out.push(d);
                write_inlines(&child.children, out, ambiguous);
                out.push(d);
                out.push(d);
                delimiter = Some(d);
            }
            BlockKind::Strikethrough => {
                out.push_str("~~");
                write_inlines(&child.children, out, false);
                out.push_str("~~");
            }
            BlockKind::InlineCode { code } => out.push_str(&code_span(code)),
            BlockKind::Link { url, title } => {
                out.push('[');
                write_inlines(&child.children, out, false);
                out.push_str("](");
                out.push_str(&destination(url, title.as_deref()));
                out.push(')');
            }
            BlockKind::Image { url, title, alt } => {
                out.push_str("![");
                out.push_str(&escape_text(alt));
                out.push_str("](");
                out.push_str(&destination(url, title.as_deref()));
                out.push(')');
            }
            // Block-level content nested inline is flattened to its text.
            _ => out.push_str(&escape_text(&child.plain_text())),
        }
        previous_delimiter = delimiter;
    }
}

/// True when the first and last of `children` both satisfy `pred`.
fn edges_are(children: &[Block], pred: impl Fn(&BlockKind) -> bool) -> bool {
    match (children.first(), children.last()) {
        (Some(first), Some(last)) => pred(&first.kind) && pred(&last.kind),
        _ => false,
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '~') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn code_span(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    let mut longest = 0;
    let mut current = 0;
    for c in code.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    let fence = "`".repeat(longest + 1);
    let pad = code.starts_with('`')
        || code.ends_with('`')
        || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
    if pad {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn destination(url: &str, title: Option<&str>) -> String {
    let mut out = if url.contains([' ', '(', ')', '<', '>']) {
        format!("<{url}>")
    } else {
        url.to_string()
    };
    if let Some(title) = title {
        out.push_str(" \"");
        out.push_str(&title.replace('\\', "\\\\").replace('"', "\\\""));
        out.push('"');
    }
    out
}
