//! # mdocx
//!
//! Markdown to Word (`.docx`) conversion with layered style configuration
//! and anchored chart embedding.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mdocx::{convert_str, ConvertOptions};
//!
//! fn main() -> mdocx::Result<()> {
//!     let options = ConvertOptions::new().with_theme("academic");
//!     let bytes = convert_str("# Report\n\nFirst paragraph.", &options)?;
//!     std::fs::write("report.docx", bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Layered styles**: built-in defaults, `config/style.yaml`, a theme, and
//!   request JSON, merged in that order; legacy flat keys are migrated
//! - **Document structure**: headings, paragraphs with inline bold, italic,
//!   code and links, nested lists, quotes, code blocks, images, tables
//! - **Tables**: content-based column widths and merged repeated cells in
//!   the first column
//! - **Charts**: pie, bar and line charts rendered to PNG and placed before
//!   or after the paragraph they refer to
//! - **Batch conversion**: whole directories with a per-file report

pub mod chart;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
pub mod style;

// Re-export commonly used types
pub use chart::{parse_chart_specs, ChartRenderer, ChartSpec, ChartType, RasterChartRenderer};
pub use config::{Alignment, ConfigLoader, ElementStyle, StyleConfig};
pub use convert::{
    convert_directory, convert_file, convert_str, render_str, suggest_filename, BatchReport,
    ConvertOptions, ConvertResult,
};
pub use error::{Error, Result};
pub use model::{DocumentNode, LayoutDocument, NodeKind};
pub use parser::{MarkdownParser, ParseOptions};
pub use render::{DocxWriter, RenderOptions, RenderResult, RenderStats};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse Markdown into a document tree with default options.
///
/// # Example
///
/// ```
/// let root = mdocx::parse_markdown("# Title\n\nBody");
/// assert_eq!(root.title(), Some("Title"));
/// ```
pub fn parse_markdown(markdown: &str) -> DocumentNode {
    MarkdownParser::new(ParseOptions::default()).parse(markdown)
}

/// Builder for converting Markdown documents.
///
/// # Example
///
/// ```no_run
/// use mdocx::Mdocx;
///
/// let result = Mdocx::new()
///     .with_config_dir("./config")
///     .with_theme("business")
///     .with_title("Quarterly report")
///     .convert_file("report.md", None)?;
/// println!("{}", result.output.display());
/// # Ok::<(), mdocx::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mdocx {
    options: ConvertOptions,
}

impl Mdocx {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration directory.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options = self.options.with_config_dir(dir);
        self
    }

    /// Select a theme.
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.options = self.options.with_theme(theme);
        self
    }

    /// Apply request-level style JSON on top of the theme.
    pub fn with_style_json(mut self, json: impl Into<String>) -> Self {
        self.options = self.options.with_style_json(json);
        self
    }

    /// Charts to place.
    pub fn with_charts(mut self, charts: Vec<ChartSpec>) -> Self {
        self.options = self.options.with_charts(charts);
        self
    }

    /// Charts from recognizer output.
    pub fn with_charts_json(mut self, raw: &str) -> Result<Self> {
        self.options = self.options.with_charts_json(raw)?;
        Ok(self)
    }

    /// Use a different chart renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.options = self.options.with_renderer(renderer);
        self
    }

    /// Document title for the package properties.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.options.render = self.options.render.with_title(title);
        self
    }

    /// Document author for the package properties.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.options.render = self.options.render.with_author(author);
        self
    }

    /// Document subject for the package properties.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.options.render = self.options.render.with_subject(subject);
        self
    }

    /// Document keywords for the package properties.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.render = self.options.render.with_keywords(keywords);
        self
    }

    /// Width of embedded Markdown images in centimeters.
    pub fn with_image_width(mut self, cm: f64) -> Self {
        self.options.render = self.options.render.with_image_width(cm);
        self
    }

    /// Upper bound on concurrent chart renders.
    pub fn with_chart_workers(mut self, workers: usize) -> Self {
        self.options.render = self.options.render.with_chart_workers(workers);
        self
    }

    /// Parse input exactly as given, without preprocessing.
    pub fn raw_input(mut self) -> Self {
        self.options.parse = self.options.parse.raw();
        self
    }

    /// The assembled options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// The effective style configuration.
    pub fn config(&self) -> StyleConfig {
        self.options.load_config()
    }

    /// Lay out Markdown without packaging it.
    pub fn layout(&self, markdown: &str) -> Result<RenderResult> {
        render_str(markdown, &self.options)
    }

    /// Convert Markdown text to `.docx` bytes.
    pub fn convert_str(&self, markdown: &str) -> Result<Vec<u8>> {
        convert_str(markdown, &self.options)
    }

    /// Convert a Markdown file.
    pub fn convert_file(
        &self,
        input: impl AsRef<Path>,
        output: Option<&Path>,
    ) -> Result<ConvertResult> {
        convert_file(input, output, &self.options)
    }

    /// Convert every Markdown file under a directory.
    pub fn convert_directory(
        &self,
        input_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<BatchReport> {
        convert_directory(input_dir, output_dir, &self.options)
    }
}
