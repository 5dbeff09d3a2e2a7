//! Layout result with statistics.

use crate::model::LayoutDocument;
use serde::{Deserialize, Serialize};

/// Result of laying out a document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResult {
    /// The styled document, ready for serialization
    pub document: LayoutDocument,

    /// Layout statistics
    pub stats: RenderStats,
}

impl RenderResult {
    /// Create a new render result.
    pub fn new(document: LayoutDocument, stats: RenderStats) -> Self {
        Self { document, stats }
    }

    /// Total number of charts placed in the document.
    pub fn chart_count(&self) -> u32 {
        self.stats.charts_anchored + self.stats.charts_appended
    }
}

/// Statistics collected during layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Number of body paragraphs
    pub paragraph_count: u32,

    /// Number of headings
    pub heading_count: u32,

    /// Number of tables
    pub table_count: u32,

    /// Number of embedded Markdown images
    pub image_count: u32,

    /// Images replaced by a text placeholder
    pub missing_image_count: u32,

    /// Number of list items, at every nesting depth
    pub list_item_count: u32,

    /// Number of fenced or indented code blocks
    pub code_block_count: u32,

    /// Number of block quotes
    pub quote_count: u32,

    /// Charts placed next to their anchor paragraph
    pub charts_anchored: u32,

    /// Charts whose anchor never matched, appended at the end
    pub charts_appended: u32,

    /// Charts skipped because their image file was missing
    pub charts_dropped: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,

    /// Character count (excluding whitespace)
    pub char_count: u32,
}

impl RenderStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add word and character counts from text.
    pub fn count_text(&mut self, text: &str) {
        self.word_count += text.split_whitespace().count() as u32;
        self.char_count += text.chars().filter(|c| !c.is_whitespace()).count() as u32;
    }
}
