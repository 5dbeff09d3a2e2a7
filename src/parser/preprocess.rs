//! Source text normalization applied before Markdown parsing.

use super::ParseOptions;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Normalizes raw Markdown according to [`ParseOptions`].
pub struct Preprocessor {
    options: ParseOptions,
    list_item: Regex,
    fence: Regex,
}

impl Preprocessor {
    /// Create a preprocessor.
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            list_item: Regex::new(r"^\s*(\d+\.|\*|-|\+)\s+").unwrap(),
            fence: Regex::new(r"^\s*(```|~~~)").unwrap(),
        }
    }

    /// Run all enabled steps.
    pub fn process(&self, text: &str) -> String {
        let mut text = if self.options.unescape_newlines {
            text.replace("\\n", "\n")
        } else {
            text.to_string()
        };

        text = text.replace("\r\n", "\n").replace('\r', "\n");

        if self.options.normalize_unicode {
            text = text.nfc().collect();
        }

        if self.options.separate_lists {
            text = self.separate_lists(&text);
        }

        text
    }

    /// Insert a blank line before list items that directly follow a
    /// non-blank, non-list line. Fenced code is left untouched.
    fn separate_lists(&self, text: &str) -> String {
        let mut out: Vec<&str> = Vec::new();
        let mut in_fence = false;
        let mut prev: Option<&str> = None;

        for line in text.split('\n') {
            if self.fence.is_match(line) {
                in_fence = !in_fence;
            } else if !in_fence && self.list_item.is_match(line) {
                if let Some(p) = prev {
                    if !p.trim().is_empty() && !self.list_item.is_match(p) && !is_table_row(p) {
                        out.push("");
                    }
                }
            }
            out.push(line);
            prev = Some(line);
        }

        out.join("\n")
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

fn is_table_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_and_line_endings() {
        let pre = Preprocessor::default();
        assert_eq!(pre.process("a\\nb\r\nc\rd"), "a\nb\nc\nd");
    }

    #[test]
    fn test_raw_keeps_escapes() {
        let pre = Preprocessor::new(ParseOptions::new().raw());
        assert_eq!(pre.process("a\\nb"), "a\\nb");
    }

    #[test]
    fn test_nfc_normalization() {
        let pre = Preprocessor::default();
        // "e" + combining acute accent composes to U+00E9.
        assert_eq!(pre.process("caf\u{0065}\u{0301}"), "caf\u{00e9}");
    }

    #[test]
    fn test_blank_line_before_list() {
        let pre = Preprocessor::default();
        let out = pre.process("Intro:\n- one\n- two\n\nText\n1. first");
        assert_eq!(out, "Intro:\n\n- one\n- two\n\nText\n\n1. first");
    }

    #[test]
    fn test_fenced_code_untouched() {
        let pre = Preprocessor::default();
        let src = "```\nlet x = 1;\n- not a list\n```";
        assert_eq!(pre.process(src), src);
    }
}
