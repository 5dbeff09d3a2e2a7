//! Markdown parsing.
//!
//! Raw text is normalized by the [`Preprocessor`] and then turned into a
//! [`DocumentNode`](crate::model::DocumentNode) tree by [`MarkdownParser`].

mod markdown;
mod options;
mod preprocess;

pub use markdown::MarkdownParser;
pub use options::ParseOptions;
pub use preprocess::Preprocessor;
