//! Document model types.
//!
//! Two representations live here: the parsed Markdown tree
//! ([`DocumentNode`]) that the parser produces, and the styled layout
//! document ([`LayoutDocument`]) that the layout engine emits and the
//! package writer serializes.

mod document;
mod node;
mod paragraph;
mod table;

pub use document::{Block, LayoutDocument, Metadata, PageSetup};
pub use node::{DocumentNode, NodeKind, TableData};
pub use paragraph::{
    Border, InlineContent, InlineImage, Paragraph, ParagraphProps, RunProps, TextRun,
};
pub use table::{Table, TableCell, TableRow, VerticalAlign, VerticalMerge};
