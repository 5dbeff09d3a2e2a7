//! Styled paragraph and run types.

use crate::config::{Alignment, ElementStyle, FontStyle};
use crate::style::LineSpacing;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A laid-out paragraph ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Runs in the paragraph
    pub content: Vec<InlineContent>,

    /// Paragraph formatting
    pub props: ParagraphProps,
}

impl Paragraph {
    /// Create an empty paragraph with the given formatting.
    pub fn new(props: ParagraphProps) -> Self {
        Self {
            content: Vec::new(),
            props,
        }
    }

    /// Add a text run.
    pub fn add_run(&mut self, run: TextRun) {
        self.content.push(InlineContent::Text(run));
    }

    /// Add a line break.
    pub fn add_line_break(&mut self) {
        self.content.push(InlineContent::LineBreak);
    }

    /// Add an inline picture.
    pub fn add_image(&mut self, image: InlineImage) {
        self.content.push(InlineContent::Image(image));
    }

    /// Get plain text content of the paragraph.
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                InlineContent::Text(run) => run.text.clone(),
                InlineContent::LineBreak => "\n".to_string(),
                InlineContent::Link { run, .. } => run.text.clone(),
                InlineContent::Image(_) => String::new(),
            })
            .collect()
    }

    /// Text runs, skipping breaks and pictures.
    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.content.iter().filter_map(|c| match c {
            InlineContent::Text(run) | InlineContent::Link { run, .. } => Some(run),
            _ => None,
        })
    }

    /// Pictures in the paragraph.
    pub fn images(&self) -> impl Iterator<Item = &InlineImage> {
        self.content.iter().filter_map(|c| match c {
            InlineContent::Image(img) => Some(img),
            _ => None,
        })
    }

    /// Check if the paragraph holds a picture.
    pub fn has_image(&self) -> bool {
        self.images().next().is_some()
    }

    /// Check if the paragraph is empty.
    pub fn is_empty(&self) -> bool {
        !self.has_image() && self.plain_text().trim().is_empty()
    }
}

/// Inline content within a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineContent {
    /// A text run with styling
    Text(TextRun),

    /// A line break
    LineBreak,

    /// A hyperlink to an external URL
    Link {
        run: TextRun,
        url: String,
    },

    /// An inline picture
    Image(InlineImage),
}

/// A run of text with consistent styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub props: RunProps,
}

impl TextRun {
    pub fn new(text: impl Into<String>, props: RunProps) -> Self {
        Self {
            text: text.into(),
            props,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Character formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProps {
    pub font_family: String,
    /// Points
    pub font_size: f64,
    /// Hex color, e.g. "#000000"
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Character shading fill
    pub shading: Option<String>,
}

impl RunProps {
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

impl From<&FontStyle> for RunProps {
    fn from(font: &FontStyle) -> Self {
        Self {
            font_family: font.family.clone(),
            font_size: f64::from(font.size),
            color: font.color.clone(),
            bold: font.bold,
            italic: font.italic,
            underline: font.underline,
            shading: None,
        }
    }
}

impl Default for RunProps {
    fn default() -> Self {
        RunProps::from(&FontStyle::default())
    }
}

/// A picture placed inline in a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineImage {
    /// Local file holding the picture
    pub path: PathBuf,
    pub width_cm: f64,
    pub height_cm: f64,
    pub alt: String,
}

/// A paragraph border edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Border {
    /// Width in points
    pub width: f64,
    pub color: String,
    /// Gap between border and text in points
    pub space: f64,
}

/// Paragraph formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphProps {
    /// Paragraph style id in `styles.xml` (e.g. "Heading1")
    pub style_id: Option<String>,
    pub alignment: Alignment,
    pub line_spacing: LineSpacing,
    /// Points
    pub space_before: f64,
    /// Points
    pub space_after: f64,
    /// Centimeters
    pub left_indent: f64,
    /// Centimeters
    pub right_indent: f64,
    /// Inches; positive for a first-line indent, negative for a hanging one
    pub first_line_indent: f64,
    pub keep_together: bool,
    pub keep_with_next: bool,
    pub page_break_before: bool,
    /// Paragraph shading fill
    pub shading: Option<String>,
    pub left_border: Option<Border>,
    /// Outline level (0 = level 1 heading)
    pub outline_level: Option<u8>,
}

impl ParagraphProps {
    /// Paragraph formatting taken from an element style, without first-line
    /// indent (callers compute that per context).
    pub fn from_style(style: &ElementStyle) -> Self {
        let p = &style.paragraph;
        Self {
            style_id: None,
            alignment: p.alignment,
            line_spacing: LineSpacing::classify(p.line_spacing),
            space_before: p.space_before,
            space_after: p.space_after,
            left_indent: p.left_indent,
            right_indent: p.right_indent,
            first_line_indent: 0.0,
            keep_together: p.keep_together,
            keep_with_next: p.keep_with_next,
            page_break_before: p.page_break_before,
            shading: None,
            left_border: None,
            outline_level: None,
        }
    }

    pub fn with_style_id(mut self, id: impl Into<String>) -> Self {
        self.style_id = Some(id.into());
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }
}

impl Default for ParagraphProps {
    fn default() -> Self {
        Self::from_style(&ElementStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleConfig;

    #[test]
    fn test_plain_text_joins_runs() {
        let mut p = Paragraph::new(ParagraphProps::default());
        p.add_run(TextRun::new("Hello ", RunProps::default()));
        p.content.push(InlineContent::Link {
            run: TextRun::new("link", RunProps::default()),
            url: "https://example.com".to_string(),
        });
        p.add_line_break();
        p.add_run(TextRun::new("end", RunProps::default()));
        assert_eq!(p.plain_text(), "Hello link\nend");
        assert_eq!(p.runs().count(), 3);
    }

    #[test]
    fn test_props_from_style() {
        let config = StyleConfig::default();
        let props = ParagraphProps::from_style(&config.body);
        assert_eq!(props.line_spacing, LineSpacing::Exact(28.0));
        let props = ParagraphProps::from_style(&config.quote);
        assert_eq!(props.line_spacing, LineSpacing::Multiple(1.5));
        assert_eq!(props.left_indent, 0.5);
    }

    #[test]
    fn test_image_paragraph_not_empty() {
        let mut p = Paragraph::new(ParagraphProps::default());
        assert!(p.is_empty());
        p.add_image(InlineImage {
            path: PathBuf::from("chart.png"),
            width_cm: 14.0,
            height_cm: 10.0,
            alt: String::new(),
        });
        assert!(!p.is_empty());
        assert!(p.has_image());
    }
}
