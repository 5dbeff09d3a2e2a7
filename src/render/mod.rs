//! Layout and serialization.
//!
//! [`layout_document`] turns a parsed [`DocumentNode`](crate::model::DocumentNode)
//! tree into a styled [`LayoutDocument`](crate::model::LayoutDocument), placing
//! pending charts along the way. [`DocxWriter`] writes the result as a
//! `.docx` package.

mod docx;
mod inline;
mod layout;
mod options;
mod result;
mod table;

pub use docx::{to_docx, DocxWriter};
pub use inline::{InlineFormatter, LINK_COLOR};
pub use layout::{layout_document, LayoutEngine};
pub use options::RenderOptions;
pub use result::{RenderResult, RenderStats};
pub use table::{build_table, column_lengths, display_width, first_column_merges, TableLayout};
