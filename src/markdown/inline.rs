//! Inline span parsing within a leaf text run.
//!
//! Precedence: code spans, images, links, strong, emphasis, strikethrough,
//! then plain text. Delimiter searches skip over code spans and links so a
//! higher-precedence construct always wins over a lower one that overlaps it.

use crate::document::Block;

/// Parse inline spans of `text` into a sequence of inline blocks.
pub(crate) fn parse(text: &str) -> Vec<Block> {
    let chars: Vec<char> = text.chars().collect();
    Inlines { chars: &chars }.parse(0, chars.len())
}

struct LinkParts {
    label_start: usize,
    label_end: usize,
    url: String,
    title: Option<String>,
    end: usize,
}

struct Inlines<'a> {
    chars: &'a [char],
}

impl Inlines<'_> {
    fn parse(&self, start: usize, end: usize) -> Vec<Block> {
        let mut out = Vec::new();
        let mut text = String::new();
        let mut i = start;

        while i < end {
            let c = self.chars[i];
            match c {
                '\\' if i + 1 < end && self.chars[i + 1].is_ascii_punctuation() => {
                    text.push(self.chars[i + 1]);
                    i += 2;
                }
                '`' => {
                    if let Some((code, next)) = self.code_span(i, end) {
                        flush(&mut text, &mut out);
                        out.push(Block::inline_code(code));
                        i = next;
                    } else {
                        i = self.push_run(&mut text, i, end);
                    }
                }
                '!' if i + 1 < end && self.chars[i + 1] == '[' => {
                    if let Some(link) = self.link(i + 1, end) {
                        flush(&mut text, &mut out);
                        let alt: String = self
                            .parse(link.label_start, link.label_end)
                            .iter()
                            .map(Block::plain_text)
                            .collect();
                        out.push(Block::image(link.url, link.title, alt));
                        i = link.end;
                    } else {
                        text.push('!');
                        i += 1;
                    }
                }
                '[' => {
                    if let Some(link) = self.link(i, end) {
                        flush(&mut text, &mut out);
                        let label = self.parse(link.label_start, link.label_end);
                        out.push(Block::link(link.url, link.title, label));
                        i = link.end;
                    } else {
                        text.push('[');
                        i += 1;
                    }
                }
                '*' | '_' | '~' => {
                    if let Some((block, next)) = self.delimited(i, end) {
                        flush(&mut text, &mut out);
                        out.push(block);
                        i = next;
                    } else {
                        i = self.push_run(&mut text, i, end);
                    }
                }
                _ => {
                    text.push(c);
                    i += 1;
                }
            }
        }
        flush(&mut text, &mut out);
        out
    }

    fn run_len(&self, i: usize, end: usize) -> usize {
        let c = self.chars[i];
        self.chars[i..end].iter().take_while(|&&x| x == c).count()
    }

    /// Copy a delimiter run verbatim into the text buffer.
    fn push_run(&self, text: &mut String, i: usize, end: usize) -> usize {
        let run = self.run_len(i, end);
        text.extend(&self.chars[i..i + run]);
        i + run
    }

    /// A code span opening at `i`: returns its content and the index after it.
    fn code_span(&self, i: usize, end: usize) -> Option<(String, usize)> {
        let open = self.run_len(i, end);
        let mut j = i + open;
        while j < end {
            if self.chars[j] == '`' {
                let run = self.run_len(j, end);
                if run == open {
                    let raw: String = self.chars[i + open..j]
                        .iter()
                        .map(|&c| if c == '\n' { ' ' } else { c })
                        .collect();
                    return Some((strip_code_padding(raw), j + run));
                }
                j += run;
            } else {
                j += 1;
            }
        }
        None
    }

    /// A `[label](destination "title")` construct opening at `i`.
    fn link(&self, i: usize, end: usize) -> Option<LinkParts> {
        let label_end = self.matching_bracket(i, end)?;
        let mut p = label_end + 1;
        if self.chars.get(p) != Some(&'(') || p >= end {
            return None;
        }
        p = self.skip_spaces(p + 1, end);

        let mut url = String::new();
        if self.chars.get(p) == Some(&'<') {
            p += 1;
            while p < end && self.chars[p] != '>' {
                if self.chars[p] == '\n' {
                    return None;
                }
                url.push(self.chars[p]);
                p += 1;
            }
            if p >= end {
                return None;
            }
            p += 1;
        } else {
            let mut depth = 0usize;
            while p < end {
                let c = self.chars[p];
                if c.is_whitespace() {
                    break;
                }
                if c == '\\' && p + 1 < end && self.chars[p + 1].is_ascii_punctuation() {
                    url.push(self.chars[p + 1]);
                    p += 2;
                    continue;
                }
                if c == '(' {
                    depth += 1;
                } else if c == ')' {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                url.push(c);
                p += 1;
            }
        }

        p = self.skip_spaces(p, end);
        let mut title = None;
        if p < end && matches!(self.chars[p], '"' | '\'') {
            let quote = self.chars[p];
            let mut value = String::new();
            p += 1;
            loop {
                if p >= end {
                    return None;
                }
                let c = self.chars[p];
                if c == '\\' && p + 1 < end && self.chars[p + 1].is_ascii_punctuation() {
                    value.push(self.chars[p + 1]);
                    p += 2;
                } else if c == quote {
                    p += 1;
                    break;
                } else {
                    value.push(c);
                    p += 1;
                }
            }
            title = Some(value);
            p = self.skip_spaces(p, end);
        }

        if p >= end || self.chars[p] != ')' {
            return None;
        }
        Some(LinkParts {
            label_start: i + 1,
            label_end,
            url,
            title,
            end: p + 1,
        })
    }

    /// Index of the `]` closing the `[` at `i`, skipping escapes and code spans.
    fn matching_bracket(&self, i: usize, end: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut j = i + 1;
        while j < end {
            match self.chars[j] {
                '\\' => j += 2,
                '`' => {
                    j = self
                        .code_span(j, end)
                        .map_or_else(|| j + self.run_len(j, end), |(_, next)| next);
                }
                '[' => {
                    depth += 1;
                    j += 1;
                }
                ']' if depth == 0 => return Some(j),
                ']' => {
                    depth -= 1;
                    j += 1;
                }
                _ => j += 1,
            }
        }
        None
    }

    fn skip_spaces(&self, mut p: usize, end: usize) -> usize {
        while p < end && matches!(self.chars[p], ' ' | '\t' | '\n') {
            p += 1;
        }
        p
    }

    /// Strong, emphasis or strikethrough opening at `i`.
    fn delimited(&self, i: usize, end: usize) -> Option<(Block, usize)> {
        let c = self.chars[i];
        let run = self.run_len(i, end);
        let after = self.chars.get(i + run).filter(|_| i + run < end)?;
        if after.is_whitespace() {
            return None;
        }
        if c == '_' && i > 0 && self.chars[i - 1].is_alphanumeric() {
            return None;
        }

        let widths: &[usize] = if c == '~' { &[2] } else { &[3, 2, 1] };
        for &n in widths.iter().filter(|&&n| n <= run) {
            let Some(close) = self.find_closer(i + n, end, c, n) else {
                continue;
            };
            let inner = self.parse(i + n, close);
            let block = match (c, n) {
                ('~', _) => Block::strikethrough(inner),
                (_, 3) => Block::emphasis(vec![Block::strong(inner)]),
                (_, 2) => Block::strong(inner),
                _ => Block::emphasis(inner),
            };
            return Some((block, close + n));
        }
        None
    }

    /// Start of a closing delimiter of width `n` for an opener ending at `from`.
    fn find_closer(&self, from: usize, end: usize, c: char, n: usize) -> Option<usize> {
        let mut j = from;
        while j < end {
            let ch = self.chars[j];
            if ch == '\\' {
                j += 2;
                continue;
            }
            if ch == '`' {
                j = self
                    .code_span(j, end)
                    .map_or_else(|| j + self.run_len(j, end), |(_, next)| next);
                continue;
            }
            if ch == '[' {
                if let Some(link) = self.link(j, end) {
                    j = link.end;
                    continue;
                }
            }
            if ch != c {
                j += 1;
                continue;
            }

            let run = self.run_len(j, end);
            let left_ok = j > from && !self.chars[j - 1].is_whitespace();
            let right_ok = c != '_'
                || self
                    .chars
                    .get(j + run)
                    .filter(|_| j + run < end)
                    .is_none_or(|next| !next.is_alphanumeric());
            if left_ok && right_ok {
                match (n, run) {
                    (1, 1) | (2, 2) => return Some(j),
                    (3, r) if r >= 3 => return Some(j),
                    (1 | 2, r) if r >= 3 => return Some(j + r - n),
                    _ => {}
                }
            }
            j += run;
        }
        None
    }
}

fn flush(text: &mut String, out: &mut Vec<Block>) {
    if !text.is_empty() {
        out.push(Block::text(std::mem::take(text)));
    }
}

/// One leading and trailing space are stripped when both are present,
/// unless the span is nothing but spaces.
fn strip_code_padding(raw: String) -> String {
    if raw.len() >= 2 && raw.starts_with(' ') && raw.ends_with(' ') && !raw.trim().is_empty() {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockKind;

    #[test]
    fn test_plain_text_is_single_node() {
        assert_eq!(parse("just words"), vec![Block::text("just words")]);
    }

    #[test]
    fn test_strong_and_emphasis() {
        assert_eq!(
            parse("Hello **world** and *you*"),
            vec![
                Block::text("Hello "),
                Block::strong(vec![Block::text("world")]),
                Block::text(" and "),
                Block::emphasis(vec![Block::text("you")]),
            ]
        );
    }

    #[test]
    fn test_triple_delimiter_is_emphasis_of_strong() {
        assert_eq!(
            parse("***both***"),
            vec![Block::emphasis(vec![Block::strong(vec![Block::text("both")])])]
        );
    }

    #[test]
    fn test_emphasis_nested_in_strong() {
        assert_eq!(
            parse("**a *b* c**"),
            vec![Block::strong(vec![
                Block::text("a "),
                Block::emphasis(vec![Block::text("b")]),
                Block::text(" c"),
            ])]
        );
    }

    #[test]
    fn test_intraword_underscore_is_literal() {
        assert_eq!(parse("snake_case_name"), vec![Block::text("snake_case_name")]);
        assert_eq!(
            parse("_emphasis_"),
            vec![Block::emphasis(vec![Block::text("emphasis")])]
        );
    }

    #[test]
    fn test_code_span_beats_strong() {
        assert_eq!(
            parse("**a `**` b**"),
            vec![Block::strong(vec![
                Block::text("a "),
                Block::inline_code("**"),
                Block::text(" b"),
            ])]
        );
        assert_eq!(
            parse("`**not strong**`"),
            vec![Block::inline_code("**not strong**")]
        );
    }

    #[test]
    fn test_code_span_padding_and_fences() {
        assert_eq!(parse("`` a`b ``"), vec![Block::inline_code("a`b")]);
        assert_eq!(parse("` `"), vec![Block::inline_code(" ")]);
        assert_eq!(parse("`open"), vec![Block::text("`open")]);
    }

    #[test]
    fn test_link_with_title() {
        let parsed = parse(r#"see [the *docs*](https://example.com "Docs") now"#);
        assert_eq!(parsed.len(), 3);
        assert_eq!(
            parsed[1],
            Block::link(
                "https://example.com",
                Some("Docs".to_string()),
                vec![Block::text("the "), Block::emphasis(vec![Block::text("docs")])],
            )
        );
    }

    #[test]
    fn test_link_beats_strong() {
        let parsed = parse("**[a**](u)");
        assert_eq!(
            parsed,
            vec![
                Block::text("**"),
                Block::link("u", None, vec![Block::text("a**")]),
            ]
        );
    }

    #[test]
    fn test_angle_bracket_destination() {
        let parsed = parse("[x](<a b.png>)");
        assert_eq!(parsed, vec![Block::link("a b.png", None, vec![Block::text("x")])]);
    }

    #[test]
    fn test_image() {
        assert_eq!(
            parse("![Alt *text*](image.png)"),
            vec![Block::image("image.png", None, "Alt text")]
        );
    }

    #[test]
    fn test_unclosed_link_is_text() {
        assert_eq!(parse("[not a link"), vec![Block::text("[not a link")]);
        assert_eq!(parse("![nope]"), vec![Block::text("![nope]")]);
    }

    #[test]
    fn test_strikethrough() {
        assert_eq!(
            parse("~~gone~~ and ~single~"),
            vec![
                Block::strikethrough(vec![Block::text("gone")]),
                Block::text(" and ~single~"),
            ]
        );
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(parse(r"\*not em\*"), vec![Block::text("*not em*")]);
        assert_eq!(parse(r"back\slash"), vec![Block::text(r"back\slash")]);
    }

    #[test]
    fn test_whitespace_after_opener_is_literal() {
        assert_eq!(parse("2 * 3 * 4"), vec![Block::text("2 * 3 * 4")]);
    }

    #[test]
    fn test_soft_break_kept_in_text() {
        let parsed = parse("line one\nline *two*");
        assert_eq!(parsed[0], Block::text("line one\nline "));
        assert!(matches!(parsed[1].kind, BlockKind::Emphasis));
    }
}
