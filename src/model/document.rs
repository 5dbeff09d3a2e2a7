//! Document-level types of the styled output.

use super::{Paragraph, Table};
use crate::config::PageStyle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A laid-out document: page setup plus an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Page size and margins
    pub page: PageSetup,

    /// Body content in reading order
    pub blocks: Vec<Block>,
}

impl LayoutDocument {
    /// Create a new empty document.
    pub fn new(page: PageSetup) -> Self {
        Self {
            metadata: Metadata::default(),
            page,
            blocks: Vec::new(),
        }
    }

    /// Append a paragraph.
    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    /// Append a table.
    pub fn push_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    /// Paragraphs at the top level, in order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Tables, in order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Number of pictures across all blocks, including table cells.
    pub fn image_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(p) => p.images().count(),
                Block::Table(t) => t
                    .rows
                    .iter()
                    .flat_map(|r| &r.cells)
                    .flat_map(|c| &c.content)
                    .map(|p| p.images().count())
                    .sum(),
            })
            .sum()
    }

    /// Check if the document has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(p) => p.plain_text(),
                Block::Table(t) => t.plain_text(),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A body-level block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// Page geometry in centimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub landscape: bool,
    /// Centered page number in the footer
    pub page_numbers: bool,
}

impl PageSetup {
    /// Page setup from the configured page style.
    pub fn from_style(page: &PageStyle, page_numbers: bool) -> Self {
        let (width, height) = page.dimensions_cm();
        Self {
            width,
            height,
            margin_top: page.margin_top,
            margin_bottom: page.margin_bottom,
            margin_left: page.margin_left,
            margin_right: page.margin_right,
            landscape: width > height,
            page_numbers,
        }
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::from_style(&PageStyle::default(), true)
    }
}

/// Document metadata written to `docProps/core.xml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords, written comma separated
    pub keywords: Vec<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParagraphProps, RunProps, TextRun};

    #[test]
    fn test_page_setup_from_style() {
        let setup = PageSetup::default();
        assert_eq!(setup.width, 21.0);
        assert_eq!(setup.margin_left, 3.0);
        assert!(!setup.landscape);
        assert!(setup.page_numbers);
    }

    #[test]
    fn test_plain_text() {
        let mut doc = LayoutDocument::new(PageSetup::default());
        for text in ["one", "two"] {
            let mut p = Paragraph::new(ParagraphProps::default());
            p.add_run(TextRun::new(text, RunProps::default()));
            doc.push_paragraph(p);
        }
        assert_eq!(doc.plain_text(), "one\n\ntwo");
        assert_eq!(doc.paragraphs().count(), 2);
        assert_eq!(doc.image_count(), 0);
    }
}
