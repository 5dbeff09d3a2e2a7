//! Parsed Markdown tree.

use serde::{Deserialize, Serialize};

/// A node of the parsed document tree.
///
/// Built once by the parser and read-only afterwards. `content` holds the
/// node's text; for paragraphs and list items it keeps inline Markdown
/// markers (`**`, `*`, `` ` ``, `[text](url)`) for run formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub kind: NodeKind,
    pub content: String,
    pub children: Vec<DocumentNode>,
}

/// Node kind, with kind-specific attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    Heading {
        /// 1-6
        level: u8,
    },
    Paragraph,
    List {
        ordered: bool,
        /// First number of an ordered list
        start: u64,
    },
    ListItem,
    Table(TableData),
    CodeBlock {
        language: Option<String>,
    },
    Quote,
    Image {
        src: String,
        alt: String,
    },
}

impl DocumentNode {
    /// Create a node with text content and no children.
    pub fn new(kind: NodeKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            children: Vec::new(),
        }
    }

    /// Create an empty document root.
    pub fn document() -> Self {
        Self::new(NodeKind::Document, "")
    }

    /// Create a heading; the level is clamped to 1-6.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(
            NodeKind::Heading {
                level: level.clamp(1, 6),
            },
            text,
        )
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Paragraph, text)
    }

    pub fn quote(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Quote, text)
    }

    pub fn code_block(language: Option<String>, code: impl Into<String>) -> Self {
        Self::new(NodeKind::CodeBlock { language }, code)
    }

    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self::new(
            NodeKind::Image {
                src: src.into(),
                alt: alt.into(),
            },
            "",
        )
    }

    pub fn table(data: TableData) -> Self {
        Self::new(NodeKind::Table(data), "")
    }

    pub fn list(ordered: bool, start: u64, items: Vec<DocumentNode>) -> Self {
        Self {
            kind: NodeKind::List { ordered, start },
            content: String::new(),
            children: items,
        }
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        Self::new(NodeKind::ListItem, text)
    }

    /// Append a child node.
    pub fn push(&mut self, child: DocumentNode) {
        self.children.push(child);
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_child(mut self, child: DocumentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Heading level, if this is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            NodeKind::Heading { level } => Some(level),
            _ => None,
        }
    }

    /// Depth-first iterator over this node and all descendants.
    pub fn descendants(&self) -> Vec<&DocumentNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }

    /// Text of the first level-1 heading, if any.
    pub fn title(&self) -> Option<&str> {
        self.descendants()
            .into_iter()
            .find(|n| n.heading_level() == Some(1))
            .map(|n| n.content.as_str())
    }
}

/// Cell grid of a table node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<String>>,
    /// Whether the first row is a header row
    pub has_header: bool,
}

impl TableData {
    /// Build a table from rows of cells. `rows` and `cols` are derived from
    /// the data; ragged rows read as empty for the missing cells.
    pub fn new(data: Vec<Vec<String>>, has_header: bool) -> Self {
        let cols = data.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            rows: data.len(),
            cols,
            data,
            has_header: has_header && cols > 0,
        }
    }

    /// Cell text; empty for cells a short row does not have.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.data
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Index of the first non-header row.
    pub fn first_data_row(&self) -> usize {
        usize::from(self.has_header).min(self.rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_table_dimensions() {
        let table = TableData::new(vec![row(&["a", "b", "c"]), row(&["d"])], true);
        assert_eq!(table.rows, 2);
        assert_eq!(table.cols, 3);
        assert_eq!(table.cell(1, 0), "d");
        assert_eq!(table.cell(1, 2), "");
        assert_eq!(table.cell(5, 5), "");
        assert_eq!(table.first_data_row(), 1);
    }

    #[test]
    fn test_empty_table() {
        let table = TableData::new(Vec::new(), true);
        assert!(table.is_empty());
        assert!(!table.has_header);
        assert_eq!(table.first_data_row(), 0);
    }

    #[test]
    fn test_heading_level_clamped() {
        assert_eq!(DocumentNode::heading(9, "x").heading_level(), Some(6));
        assert_eq!(DocumentNode::heading(0, "x").heading_level(), Some(1));
        assert_eq!(DocumentNode::paragraph("x").heading_level(), None);
    }

    #[test]
    fn test_title_finds_first_h1() {
        let doc = DocumentNode::document()
            .with_child(DocumentNode::heading(2, "Intro"))
            .with_child(DocumentNode::heading(1, "Report"))
            .with_child(DocumentNode::heading(1, "Other"));
        assert_eq!(doc.title(), Some("Report"));
    }
}
