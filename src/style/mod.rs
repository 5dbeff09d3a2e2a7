//! Style resolution.
//!
//! Maps an element kind to its resolved [`ElementStyle`], and derives the
//! values that depend on interpretation rather than on configuration alone:
//! line spacing mode and the effective first-line indent.

pub mod units;

use crate::config::{ElementStyle, StyleConfig, TableStyle};
use serde::{Deserialize, Serialize};

/// Line spacing at or above this value is an exact leading in points.
pub const EXACT_SPACING_THRESHOLD: f64 = 20.0;

/// Content kinds that carry an [`ElementStyle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Heading(u8),
    Body,
    CodeInline,
    CodeBlock,
    Quote,
    Caption,
}

/// Resolve the style for an element kind.
///
/// Headings go through heading-level inheritance; every other kind uses its
/// configured style as-is.
pub fn resolve(kind: ElementKind, config: &StyleConfig) -> ElementStyle {
    match kind {
        ElementKind::Heading(level) => config.headings.get(level),
        ElementKind::Body => config.body.clone(),
        ElementKind::CodeInline => config.code_inline.clone(),
        ElementKind::CodeBlock => config.code_block.clone(),
        ElementKind::Quote => config.quote.clone(),
        ElementKind::Caption => config.caption.clone(),
    }
}

/// Table settings are consumed directly rather than as an element style.
pub fn resolve_table(config: &StyleConfig) -> &TableStyle {
    &config.table
}

/// Interpreted line spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LineSpacing {
    /// Multiple of single spacing
    Multiple(f64),
    /// Exact line height in points
    Exact(f64),
}

impl LineSpacing {
    /// `v >= 20` is an exact leading in points, anything lower a multiplier.
    pub fn classify(value: f64) -> Self {
        if value >= EXACT_SPACING_THRESHOLD {
            LineSpacing::Exact(value)
        } else {
            LineSpacing::Multiple(value)
        }
    }

    /// WordprocessingML `w:line` value and `w:lineRule`.
    pub fn to_ooxml(&self) -> (i64, &'static str) {
        match *self {
            LineSpacing::Multiple(m) => ((m * 240.0).round() as i64, "auto"),
            LineSpacing::Exact(pt) => (units::pt_to_twips(pt), "exact"),
        }
    }
}

impl Default for LineSpacing {
    fn default() -> Self {
        LineSpacing::Multiple(1.0)
    }
}

/// Where a paragraph sits, for first-line indent purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentContext {
    Heading,
    BodyParagraph,
    /// List items, quotes, code, captions
    Other,
}

/// Effective first-line indent in inches.
///
/// Headings never indent. A body paragraph with no configured indent gets
/// two character widths (`size * 2 / 72` inches); any configured indent is
/// converted from centimeters.
pub fn first_line_indent_inches(style: &ElementStyle, context: IndentContext) -> f64 {
    let configured = style.paragraph.first_line_indent;
    match context {
        IndentContext::Heading => 0.0,
        _ if configured != 0.0 => units::cm_to_inches(configured),
        IndentContext::BodyParagraph => f64::from(style.font.size) * 2.0 / 72.0,
        IndentContext::Other => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_spacing_threshold() {
        assert_eq!(LineSpacing::classify(20.0), LineSpacing::Exact(20.0));
        assert_eq!(LineSpacing::classify(28.0), LineSpacing::Exact(28.0));
        assert_eq!(LineSpacing::classify(19.99), LineSpacing::Multiple(19.99));
        assert_eq!(LineSpacing::classify(1.5), LineSpacing::Multiple(1.5));
    }

    #[test]
    fn test_line_spacing_ooxml() {
        assert_eq!(LineSpacing::Multiple(1.5).to_ooxml(), (360, "auto"));
        assert_eq!(LineSpacing::Exact(28.0).to_ooxml(), (560, "exact"));
    }

    #[test]
    fn test_dynamic_indent() {
        let config = StyleConfig::default();
        let body = resolve(ElementKind::Body, &config);
        let inches = first_line_indent_inches(&body, IndentContext::BodyParagraph);
        assert!((inches - 14.0 * 2.0 / 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_configured_indent() {
        let mut body = StyleConfig::default().body;
        body.paragraph.first_line_indent = 0.74;
        let inches = first_line_indent_inches(&body, IndentContext::BodyParagraph);
        assert!((inches - 0.74 / 2.54).abs() < 1e-9);
    }

    #[test]
    fn test_heading_never_indented() {
        let config = StyleConfig::default();
        let mut h2 = resolve(ElementKind::Heading(2), &config);
        assert_eq!(first_line_indent_inches(&h2, IndentContext::Heading), 0.0);
        h2.paragraph.first_line_indent = 1.0;
        assert_eq!(first_line_indent_inches(&h2, IndentContext::Heading), 0.0);
    }

    #[test]
    fn test_other_contexts_without_indent() {
        let config = StyleConfig::default();
        let quote = resolve(ElementKind::Quote, &config);
        assert_eq!(first_line_indent_inches(&quote, IndentContext::Other), 0.0);
    }

    #[test]
    fn test_resolve_kinds() {
        let config = StyleConfig::default();
        assert_eq!(resolve(ElementKind::CodeBlock, &config), config.code_block);
        assert_eq!(resolve(ElementKind::Heading(5), &config), config.headings.default);
        assert_eq!(resolve_table(&config).cell_font_size, 9);
    }
}
