//! Markdown to [`DocumentNode`] tree.

use super::{ParseOptions, Preprocessor};
use crate::model::{DocumentNode, NodeKind, TableData};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag};
use regex::Regex;

/// Markdown parser producing a [`DocumentNode`] tree.
///
/// Parsing never fails: constructs without a node kind of their own
/// degrade to plain paragraphs or are dropped.
pub struct MarkdownParser {
    options: ParseOptions,
    preprocessor: Preprocessor,
    html_tag: Regex,
    html_break: Regex,
}

impl MarkdownParser {
    /// Create a parser with the given options.
    pub fn new(options: ParseOptions) -> Self {
        Self {
            preprocessor: Preprocessor::new(options.clone()),
            options,
            html_tag: Regex::new(r"<[^>]*>").unwrap(),
            html_break: Regex::new(r"(?i)^<br\s*/?>$").unwrap(),
        }
    }

    /// Preprocess and parse Markdown text.
    pub fn parse(&self, text: &str) -> DocumentNode {
        let source = self.preprocessor.process(text);
        self.parse_preprocessed(&source)
    }

    /// Parse text that has already been preprocessed.
    pub fn parse_preprocessed(&self, source: &str) -> DocumentNode {
        let mut builder = TreeBuilder::new(self);
        for event in Parser::new_ext(source, self.options.cmark_options()) {
            builder.handle(event);
        }
        builder.finish()
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

enum InlineKind {
    Strong,
    Emphasis,
    Strikethrough,
    Link(String),
    Image(String),
}

/// One open construct. Every `Start` event pushes exactly one frame and
/// every `End` pops one, so end tags never need to be inspected.
enum Frame {
    Root(Vec<DocumentNode>),
    Heading { level: u8, text: String },
    Paragraph { text: String, images: Vec<DocumentNode>, rich: bool },
    Quote { text: String, children: Vec<DocumentNode> },
    Code { language: Option<String>, text: String },
    Html { text: String },
    List { ordered: bool, start: u64, items: Vec<DocumentNode> },
    Item { text: String, children: Vec<DocumentNode> },
    Table { rows: Vec<Vec<String>> },
    Row { cells: Vec<String> },
    Cell { text: String },
    Inline { kind: InlineKind, text: String },
    Ignored,
}

impl Frame {
    fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            Frame::Heading { text, .. }
            | Frame::Paragraph { text, .. }
            | Frame::Quote { text, .. }
            | Frame::Code { text, .. }
            | Frame::Html { text }
            | Frame::Item { text, .. }
            | Frame::Cell { text }
            | Frame::Inline { text, .. } => Some(text),
            _ => None,
        }
    }
}

struct TreeBuilder<'p> {
    parser: &'p MarkdownParser,
    stack: Vec<Frame>,
}

impl<'p> TreeBuilder<'p> {
    fn new(parser: &'p MarkdownParser) -> Self {
        Self {
            parser,
            stack: vec![Frame::Root(Vec::new())],
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => {
                if self.is_rich() {
                    self.push_text(&escape_markers(&text, TEXT_SPECIALS));
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                let code = if self.is_rich() {
                    format!("`{}`", escape_markers(&code, TEXT_SPECIALS))
                } else {
                    code.to_string()
                };
                self.push_text(&code);
            }
            Event::SoftBreak => {
                if !self.last_char_is_wide() {
                    self.push_text(" ");
                }
            }
            Event::HardBreak => self.push_text("\n"),
            Event::Html(html) => {
                if matches!(self.stack.last(), Some(Frame::Html { .. })) {
                    self.push_text(&html);
                } else {
                    self.inline_html(&html);
                }
            }
            Event::InlineHtml(html) => self.inline_html(&html),
            Event::TaskListMarker(checked) => {
                self.push_text(if checked { "☑ " } else { "☐ " });
            }
            Event::Rule => log::debug!("skipping thematic break"),
            other => log::debug!("skipping unsupported markdown event {:?}", other),
        }
    }

    fn start(&mut self, tag: Tag) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph {
                text: String::new(),
                images: Vec::new(),
                rich: !self.inside_quote(),
            },
            Tag::Heading { level, .. } => Frame::Heading {
                level: heading_level(level),
                text: String::new(),
            },
            Tag::BlockQuote(..) => Frame::Quote {
                text: String::new(),
                children: Vec::new(),
            },
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|lang| lang.to_string()),
                    CodeBlockKind::Indented => None,
                };
                Frame::Code {
                    language,
                    text: String::new(),
                }
            }
            Tag::HtmlBlock => Frame::Html {
                text: String::new(),
            },
            Tag::List(start) => Frame::List {
                ordered: start.is_some(),
                start: start.unwrap_or(1),
                items: Vec::new(),
            },
            Tag::Item => Frame::Item {
                text: String::new(),
                children: Vec::new(),
            },
            Tag::Table(_) => Frame::Table { rows: Vec::new() },
            Tag::TableHead | Tag::TableRow => Frame::Row { cells: Vec::new() },
            Tag::TableCell => Frame::Cell {
                text: String::new(),
            },
            Tag::Strong => self.inline(InlineKind::Strong),
            Tag::Emphasis => self.inline(InlineKind::Emphasis),
            Tag::Strikethrough => self.inline(InlineKind::Strikethrough),
            Tag::Link { dest_url, .. } => self.inline(InlineKind::Link(dest_url.to_string())),
            Tag::Image { dest_url, .. } => self.inline(InlineKind::Image(dest_url.to_string())),
            _ => Frame::Ignored,
        };
        self.stack.push(frame);
    }

    fn inline(&self, kind: InlineKind) -> Frame {
        Frame::Inline {
            kind,
            text: String::new(),
        }
    }

    fn end(&mut self) {
        // The root frame is only taken by `finish`.
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Root(_) | Frame::Ignored => {}
            Frame::Heading { level, text } => {
                self.emit(DocumentNode::heading(level, text.trim()));
            }
            Frame::Paragraph { text, images, .. } => self.end_paragraph(text, images),
            Frame::Quote { text, children } => {
                let mut node = DocumentNode::quote(text.trim());
                node.children = children;
                self.emit(node);
            }
            Frame::Code { language, text } => {
                let code = text.trim_end_matches('\n');
                self.emit(DocumentNode::code_block(language, code));
            }
            Frame::Html { text } => {
                let stripped = self.parser.html_tag.replace_all(&text, "");
                let stripped = stripped.trim();
                if !stripped.is_empty() {
                    self.emit(DocumentNode::paragraph(stripped));
                }
            }
            Frame::List {
                ordered,
                start,
                items,
            } => self.emit(DocumentNode::list(ordered, start, items)),
            Frame::Item { text, children } => {
                let mut item = DocumentNode::list_item(text.trim());
                item.children = children;
                match self.stack.last_mut() {
                    Some(Frame::List { items, .. }) => items.push(item),
                    _ => self.emit(item),
                }
            }
            Frame::Table { rows } => {
                let data = TableData::new(rows, true);
                if !data.is_empty() {
                    self.emit(DocumentNode::table(data));
                }
            }
            Frame::Row { cells } => {
                if let Some(Frame::Table { rows }) = self.stack.last_mut() {
                    rows.push(cells);
                }
            }
            Frame::Cell { text } => {
                if let Some(Frame::Row { cells }) = self.stack.last_mut() {
                    cells.push(text.trim().to_string());
                }
            }
            Frame::Inline { kind, text } => self.end_inline(kind, text),
        }
    }

    fn end_paragraph(&mut self, text: String, images: Vec<DocumentNode>) {
        let text = text.trim();
        match self.stack.last_mut() {
            Some(Frame::Quote {
                text: quote,
                children,
            }) => {
                append_line(quote, text);
                children.extend(images);
            }
            Some(Frame::Item {
                text: item,
                children,
            }) => {
                append_line(item, text);
                children.extend(images);
            }
            _ => {
                if !text.is_empty() {
                    self.emit(DocumentNode::paragraph(text));
                }
                for image in images {
                    self.emit(image);
                }
            }
        }
    }

    fn end_inline(&mut self, kind: InlineKind, text: String) {
        let rich = self.is_rich() && !text.is_empty();
        let rendered = match kind {
            InlineKind::Strong if rich => format!("**{}**", text),
            InlineKind::Emphasis if rich => format!("*{}*", text),
            InlineKind::Link(url) if rich => {
                format!("[{}]({})", text, escape_markers(&url, URL_SPECIALS))
            }
            InlineKind::Image(src) => {
                self.attach_image(DocumentNode::image(src, text));
                return;
            }
            InlineKind::Strong
            | InlineKind::Emphasis
            | InlineKind::Strikethrough
            | InlineKind::Link(_) => text,
        };
        self.push_text(&rendered);
    }

    /// Images become sibling nodes of the paragraph that holds them; where
    /// no node can hold them (headings, cells) the alt text stays inline.
    fn attach_image(&mut self, image: DocumentNode) {
        for frame in self.stack.iter_mut().rev() {
            match frame {
                Frame::Paragraph { images, .. } => {
                    images.push(image);
                    return;
                }
                Frame::Item { children, .. } | Frame::Quote { children, .. } => {
                    children.push(image);
                    return;
                }
                Frame::Root(children) => {
                    children.push(image);
                    return;
                }
                Frame::Inline { .. } | Frame::Ignored => continue,
                _ => break,
            }
        }
        if let NodeKind::Image { alt, .. } = &image.kind {
            let alt = alt.clone();
            self.push_text(&alt);
        }
    }

    fn inline_html(&mut self, html: &str) {
        if self.parser.html_break.is_match(html.trim()) {
            self.push_text("\n");
        }
    }

    fn push_text(&mut self, text: &str) {
        match self.stack.iter_mut().rev().find_map(Frame::text_mut) {
            Some(buf) => buf.push_str(text),
            None => {
                // Loose text at the top level becomes its own paragraph.
                let text = text.trim();
                if !text.is_empty() {
                    self.emit(DocumentNode::paragraph(text));
                }
            }
        }
    }

    /// Add a finished block to the nearest container.
    fn emit(&mut self, node: DocumentNode) {
        for frame in self.stack.iter_mut().rev() {
            match frame {
                Frame::Root(children)
                | Frame::Item { children, .. }
                | Frame::Quote { children, .. } => {
                    children.push(node);
                    return;
                }
                _ => continue,
            }
        }
    }

    /// Whether inline markers should be kept for the innermost text block.
    fn is_rich(&self) -> bool {
        for frame in self.stack.iter().rev() {
            match frame {
                Frame::Inline { .. } | Frame::Ignored => continue,
                Frame::Paragraph { rich, .. } => return *rich,
                Frame::Item { .. } => return true,
                _ => return false,
            }
        }
        false
    }

    fn inside_quote(&self) -> bool {
        self.stack.iter().any(|f| matches!(f, Frame::Quote { .. }))
    }

    fn last_char_is_wide(&mut self) -> bool {
        self.stack
            .iter_mut()
            .rev()
            .find_map(Frame::text_mut)
            .and_then(|buf| buf.chars().last())
            .map(|c| !c.is_ascii())
            .unwrap_or(false)
    }

    fn finish(mut self) -> DocumentNode {
        while self.stack.len() > 1 {
            self.end();
        }
        let children = match self.stack.pop() {
            Some(Frame::Root(children)) => children,
            _ => Vec::new(),
        };
        DocumentNode {
            kind: NodeKind::Document,
            content: String::new(),
            children,
        }
    }
}

/// Characters that would read as inline markers in rich text.
const TEXT_SPECIALS: &[char] = &['\\', '*', '`', '[', ']'];
const URL_SPECIALS: &[char] = &['\\', ')'];

/// Backslash-escape literal characters so the inline formatter keeps them
/// as text.
fn escape_markers(text: &str, specials: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn append_line(buf: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push('\n');
    }
    buf.push_str(text);
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> DocumentNode {
        MarkdownParser::default().parse(text)
    }

    #[test]
    fn test_heading_and_paragraph() {
        let doc = parse("# Title\n\nHello **world**.");
        assert_eq!(doc.children.len(), 2);
        assert_eq!(doc.children[0].kind, NodeKind::Heading { level: 1 });
        assert_eq!(doc.children[0].content, "Title");
        assert_eq!(doc.children[1].kind, NodeKind::Paragraph);
        assert_eq!(doc.children[1].content, "Hello **world**.");
    }

    #[test]
    fn test_inline_markers_rebuilt() {
        let doc = parse("Use `cargo` and *care*, see [docs](https://x.y).");
        assert_eq!(
            doc.children[0].content,
            "Use `cargo` and *care*, see [docs](https://x.y)."
        );
    }

    #[test]
    fn test_literal_markers_escaped() {
        let doc = parse(r"Compute 2 \* 3 \* 4 now.");
        assert_eq!(doc.children[0].content, r"Compute 2 \* 3 \* 4 now.");

        let doc = parse("Use `a*b` and *c* [x](http://h/a_(b))");
        assert_eq!(
            doc.children[0].content,
            r"Use `a\*b` and *c* [x](http://h/a_(b\))"
        );
    }

    #[test]
    fn test_heading_is_plain() {
        let doc = parse("## A **bold** `head`");
        assert_eq!(doc.children[0].content, "A bold head");
    }

    #[test]
    fn test_code_block_language() {
        let doc = parse("```rust\nfn main() {}\n```\n\n    indented\n");
        assert_eq!(
            doc.children[0].kind,
            NodeKind::CodeBlock {
                language: Some("rust".to_string())
            }
        );
        assert_eq!(doc.children[0].content, "fn main() {}");
        assert_eq!(doc.children[1].kind, NodeKind::CodeBlock { language: None });
        assert_eq!(doc.children[1].content, "indented");
    }

    #[test]
    fn test_nested_lists() {
        let doc = parse("- one\n  - inner\n- two\n\n3. three\n4. four");
        let list = &doc.children[0];
        assert_eq!(
            list.kind,
            NodeKind::List {
                ordered: false,
                start: 1
            }
        );
        assert_eq!(list.children.len(), 2);
        assert_eq!(list.children[0].content, "one");
        let inner = &list.children[0].children[0];
        assert!(matches!(inner.kind, NodeKind::List { .. }));
        assert_eq!(inner.children[0].content, "inner");

        let ordered = &doc.children[1];
        assert_eq!(
            ordered.kind,
            NodeKind::List {
                ordered: true,
                start: 3
            }
        );
    }

    #[test]
    fn test_list_after_text_line() {
        let doc = parse("Steps:\n1. first\n2. second");
        assert_eq!(doc.children.len(), 2);
        assert_eq!(doc.children[0].content, "Steps:");
        assert_eq!(doc.children[1].children.len(), 2);
    }

    #[test]
    fn test_table() {
        let doc = parse("| Name | Value |\n|---|---|\n| A | 1 |\n| B |\n");
        let NodeKind::Table(table) = &doc.children[0].kind else {
            panic!("expected table");
        };
        assert_eq!(table.rows, 3);
        assert_eq!(table.cols, 2);
        assert!(table.has_header);
        assert_eq!(table.cell(0, 0), "Name");
        assert_eq!(table.cell(2, 0), "B");
        assert_eq!(table.cell(2, 1), "");
    }

    #[test]
    fn test_quote_joins_paragraphs() {
        let doc = parse("> first **line**\n>\n> second");
        assert_eq!(doc.children.len(), 1);
        assert_eq!(doc.children[0].kind, NodeKind::Quote);
        assert_eq!(doc.children[0].content, "first line\nsecond");
    }

    #[test]
    fn test_image_becomes_sibling() {
        let doc = parse("See below ![chart](img/a.png) here.");
        assert_eq!(doc.children.len(), 2);
        assert_eq!(doc.children[0].content, "See below  here.");
        assert_eq!(
            doc.children[1].kind,
            NodeKind::Image {
                src: "img/a.png".to_string(),
                alt: "chart".to_string()
            }
        );
    }

    #[test]
    fn test_image_only_paragraph() {
        let doc = parse("![](pic.png)");
        assert_eq!(doc.children.len(), 1);
        assert!(matches!(doc.children[0].kind, NodeKind::Image { .. }));
    }

    #[test]
    fn test_html_block_degrades_to_paragraph() {
        let doc = parse("<div align=\"center\">Centered</div>\n");
        assert_eq!(doc.children.len(), 1);
        assert_eq!(doc.children[0].kind, NodeKind::Paragraph);
        assert_eq!(doc.children[0].content, "Centered");
    }

    #[test]
    fn test_soft_break_between_cjk() {
        let doc = parse("第一行\n第二行\nnext");
        assert_eq!(doc.children[0].content, "第一行第二行next");
    }

    #[test]
    fn test_escaped_newlines() {
        let doc = parse("# T\\n\\nbody");
        assert_eq!(doc.children.len(), 2);
        assert_eq!(doc.children[1].content, "body");
    }

    #[test]
    fn test_task_list() {
        let doc = parse("- [x] done\n- [ ] todo");
        assert_eq!(doc.children[0].children[0].content, "☑ done");
        assert_eq!(doc.children[0].children[1].content, "☐ todo");
    }
}
