//! Inline Markdown markers to formatted runs.

use crate::config::ElementStyle;
use crate::model::{InlineContent, RunProps, TextRun};
use regex::{Captures, Regex};

/// Color and underline applied to hyperlink runs.
pub const LINK_COLOR: &str = "#0000FF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Marker {
    // Declaration order is the tie-break priority for matches that start at
    // the same offset.
    Bold,
    Italic,
    Code,
    Link,
}

struct Span {
    start: usize,
    end: usize,
    marker: Marker,
    text: String,
    url: Option<String>,
}

/// Splits paragraph text into runs for `**bold**`, `*italic*`, `` `code` ``
/// and `[text](url)`.
///
/// Every pattern is matched over the whole text; matches are taken in order
/// of their start offset and a match overlapping an earlier one is dropped.
/// Text between matches becomes plain runs.
///
/// A backslash before ASCII punctuation makes that character literal: an
/// escaped marker never opens or closes a span and the backslash is removed
/// from the output.
pub struct InlineFormatter {
    patterns: Vec<(Marker, Regex)>,
}

impl InlineFormatter {
    /// Create a formatter.
    pub fn new() -> Self {
        Self {
            patterns: vec![
                (Marker::Bold, Regex::new(r"\*\*((?:\\.|[^*\\])+)\*\*").unwrap()),
                (Marker::Italic, Regex::new(r"\*((?:\\.|[^*\\])+)\*").unwrap()),
                (Marker::Code, Regex::new(r"`((?:\\.|[^`\\])+)`").unwrap()),
                (
                    Marker::Link,
                    Regex::new(r"\[((?:\\.|[^\]\\])+)\]\(((?:\\.|[^)\\])+)\)").unwrap(),
                ),
            ],
        }
    }

    /// Format `text` with `base` as the plain run style. Inline code takes
    /// its font and shading from `code`. Newlines become line breaks.
    pub fn format(&self, text: &str, base: &RunProps, code: &ElementStyle) -> Vec<InlineContent> {
        let mut out = Vec::new();
        let mut cursor = 0;

        for span in self.spans(text) {
            push_plain(&mut out, &text[cursor..span.start], base);
            match span.marker {
                Marker::Bold => push_styled(&mut out, &span.text, base.clone().bold()),
                Marker::Italic => push_styled(&mut out, &span.text, base.clone().italic()),
                Marker::Code => {
                    let mut props = RunProps::from(&code.font);
                    props.shading = code.background_color.clone();
                    out.push(InlineContent::Text(TextRun::new(span.text, props)));
                }
                Marker::Link => {
                    let mut props = base.clone();
                    props.color = LINK_COLOR.to_string();
                    props.underline = true;
                    out.push(InlineContent::Link {
                        run: TextRun::new(span.text, props),
                        url: span.url.unwrap_or_default(),
                    });
                }
            }
            cursor = span.end;
        }
        push_plain(&mut out, &text[cursor..], base);
        out
    }

    /// Non-overlapping matches in document order.
    ///
    /// Each step takes the earliest match of any pattern starting at or after
    /// the end of the previous kept span, so a discarded candidate never
    /// hides a later match of the same pattern.
    fn spans(&self, text: &str) -> Vec<Span> {
        let mut kept = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let next = self
                .patterns
                .iter()
                .filter_map(|(marker, re)| next_match(re, text, pos).map(|caps| to_span(*marker, &caps)))
                .min_by_key(|span| (span.start, span.marker));
            match next {
                Some(span) => {
                    pos = span.end;
                    kept.push(span);
                }
                None => break,
            }
        }
        kept
    }
}

/// First match of `re` at or after `from` whose opening marker is not
/// backslash-escaped.
fn next_match<'t>(re: &Regex, text: &'t str, mut from: usize) -> Option<Captures<'t>> {
    while from <= text.len() {
        let caps = re.captures_at(text, from)?;
        let start = caps.get(0)?.start();
        if !is_escaped(text, start) {
            return Some(caps);
        }
        from = start + 1;
    }
    None
}

/// Whether the byte at `pos` follows an odd run of backslashes.
fn is_escaped(text: &str, pos: usize) -> bool {
    text.as_bytes()[..pos].iter().rev().take_while(|&&b| b == b'\\').count() % 2 == 1
}

/// Drop the backslash from every `\<punct>` pair.
pub fn unescape_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

impl Default for InlineFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn to_span(marker: Marker, caps: &Captures) -> Span {
    let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
    Span {
        start: whole.0,
        end: whole.1,
        marker,
        text: caps.get(1).map(|m| unescape_markers(m.as_str())).unwrap_or_default(),
        url: caps.get(2).map(|m| unescape_markers(m.as_str())),
    }
}

fn push_plain(out: &mut Vec<InlineContent>, text: &str, base: &RunProps) {
    push_styled(out, &unescape_markers(text), base.clone());
}

fn push_styled(out: &mut Vec<InlineContent>, text: &str, props: RunProps) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(InlineContent::LineBreak);
        }
        if !line.is_empty() {
            out.push(InlineContent::Text(TextRun::new(line, props.clone())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleConfig;

    fn runs(text: &str) -> Vec<InlineContent> {
        let config = StyleConfig::default();
        let base = RunProps::from(&config.body.font);
        InlineFormatter::new().format(text, &base, &config.code_inline)
    }

    fn texts(content: &[InlineContent]) -> Vec<(String, bool, bool)> {
        content
            .iter()
            .filter_map(|c| match c {
                InlineContent::Text(r) => Some((r.text.clone(), r.props.bold, r.props.italic)),
                InlineContent::Link { run, .. } => Some((run.text.clone(), false, false)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_bold_run() {
        let content = runs("Hello **world**.");
        assert_eq!(
            texts(&content),
            vec![
                ("Hello ".to_string(), false, false),
                ("world".to_string(), true, false),
                (".".to_string(), false, false),
            ]
        );
    }

    #[test]
    fn test_mixed_markers_in_order() {
        let content = runs("*a* then `b` then [c](http://c) then **d**");
        let t = texts(&content);
        assert_eq!(t[0], ("a".to_string(), false, true));
        assert_eq!(t[2].0, "b");
        assert_eq!(t[4].0, "c");
        assert_eq!(t[6], ("d".to_string(), true, false));
        match &content[4] {
            InlineContent::Link { run, url } => {
                assert_eq!(url, "http://c");
                assert!(run.props.underline);
                assert_eq!(run.props.color, LINK_COLOR);
            }
            other => panic!("expected link, got {:?}", other),
        }
    }

    #[test]
    fn test_code_uses_code_style() {
        let config = StyleConfig::default();
        let content = runs("run `cargo test` now");
        let InlineContent::Text(run) = &content[1] else {
            panic!("expected text run");
        };
        assert_eq!(run.props.font_family, config.code_inline.font.family);
        assert_eq!(run.props.shading, config.code_inline.background_color);
    }

    #[test]
    fn test_overlapping_matches_dropped() {
        // The italic match inside the bold span is discarded.
        let content = runs("**bold** and *it*");
        let t = texts(&content);
        assert_eq!(t.len(), 3);
        assert!(t[0].1);
        assert!(t[2].2);
    }

    #[test]
    fn test_bold_then_italic() {
        let content = runs("Hello **world** and *you*.");
        assert_eq!(
            texts(&content),
            vec![
                ("Hello ".to_string(), false, false),
                ("world".to_string(), true, false),
                (" and ".to_string(), false, false),
                ("you".to_string(), false, true),
                (".".to_string(), false, false),
            ]
        );
    }

    #[test]
    fn test_escaped_markers_are_literal() {
        let content = runs(r"Compute 2 \* 3 \* 4 now.");
        assert_eq!(texts(&content), vec![("Compute 2 * 3 * 4 now.".to_string(), false, false)]);

        let content = runs(r"*a\*b* and \[x\](y)");
        assert_eq!(
            texts(&content),
            vec![("a*b".to_string(), false, true), (" and [x](y)".to_string(), false, false)]
        );
    }

    #[test]
    fn test_code_span_keeps_stars() {
        let content = runs(r"Use `a\*b` and *c* here.");
        let t = texts(&content);
        assert_eq!(t[1].0, "a*b");
        assert_eq!(t[3], ("c".to_string(), false, true));
    }

    #[test]
    fn test_unmatched_markers_are_plain() {
        let content = runs("2 * 3 = 6 and a ` tick");
        assert_eq!(texts(&content), vec![("2 * 3 = 6 and a ` tick".to_string(), false, false)]);
    }

    #[test]
    fn test_newlines_become_breaks() {
        let content = runs("one\ntwo");
        assert_eq!(content.len(), 3);
        assert!(matches!(content[1], InlineContent::LineBreak));
    }
}
