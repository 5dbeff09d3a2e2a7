//! Styled table types.

use super::Paragraph;
use serde::{Deserialize, Serialize};

/// A laid-out table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows in the table
    pub rows: Vec<TableRow>,

    /// Grid column widths in centimeters
    pub column_widths: Vec<f64>,

    /// Border width in points
    pub border_width: f64,

    pub border_color: String,

    /// Cell margin in points
    pub cell_margin: f64,
}

impl Table {
    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of grid columns.
    pub fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total grid width in centimeters.
    pub fn total_width(&self) -> f64 {
        self.column_widths.iter().sum()
    }

    /// Cell at a position.
    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells in the row
    pub cells: Vec<TableCell>,

    /// Whether this is a header row (repeated on each page)
    pub is_header: bool,
}

impl TableRow {
    /// Get plain text representation.
    pub fn plain_text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.plain_text())
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// Vertical merge state of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalMerge {
    /// First cell of a merged run
    Restart,
    /// Continuation, rendered as part of the cell above
    Continue,
}

/// Vertical alignment of cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Cell content (paragraphs)
    pub content: Vec<Paragraph>,

    /// Cell width in centimeters
    pub width: f64,

    pub vertical_merge: Option<VerticalMerge>,

    pub vertical_align: VerticalAlign,

    /// Background fill
    pub shading: Option<String>,
}

impl TableCell {
    /// Create a cell with one paragraph.
    pub fn new(paragraph: Paragraph) -> Self {
        Self {
            content: vec![paragraph],
            width: 0.0,
            vertical_merge: None,
            vertical_align: VerticalAlign::Top,
            shading: None,
        }
    }

    /// Get plain text representation.
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
