//! Layout options.

use super::TableLayout;
use std::path::PathBuf;

/// Options for laying out a document tree.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Width of embedded Markdown images in centimeters
    pub image_width_cm: f64,

    /// Directory relative image paths are resolved against
    pub base_dir: Option<PathBuf>,

    /// Add an "图: alt" caption below embedded images
    pub image_captions: bool,

    /// Add a "代码 (lang)" caption above code blocks with a language
    pub code_captions: bool,

    /// Column width allocation constants
    pub table_layout: TableLayout,

    /// Upper bound on concurrent chart renders
    pub chart_workers: usize,

    /// Title written to document properties
    pub title: Option<String>,

    /// Author written to document properties
    pub author: Option<String>,

    pub subject: Option<String>,

    /// Keywords written to document properties
    pub keywords: Vec<String>,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the embedded image width.
    pub fn with_image_width(mut self, cm: f64) -> Self {
        if cm > 0.0 {
            self.image_width_cm = cm;
        }
        self
    }

    /// Resolve relative image paths against this directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Enable or disable image captions.
    pub fn with_image_captions(mut self, enabled: bool) -> Self {
        self.image_captions = enabled;
        self
    }

    /// Enable or disable code block captions.
    pub fn with_code_captions(mut self, enabled: bool) -> Self {
        self.code_captions = enabled;
        self
    }

    /// Set the table width allocation constants.
    pub fn with_table_layout(mut self, layout: TableLayout) -> Self {
        self.table_layout = layout;
        self
    }

    /// Set the chart rendering worker count (at least 1).
    pub fn with_chart_workers(mut self, workers: usize) -> Self {
        self.chart_workers = workers.max(1);
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the document subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the document keywords. Blank entries are dropped.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords
            .into_iter()
            .map(Into::into)
            .map(|k: String| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            image_width_cm: 15.24,
            base_dir: None,
            image_captions: true,
            code_captions: true,
            table_layout: TableLayout::default(),
            chart_workers: 4,
            title: None,
            author: None,
            subject: None,
            keywords: Vec::new(),
        }
    }
}
