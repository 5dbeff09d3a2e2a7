//! Parsing options and configuration.

/// Options for parsing Markdown input.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Turn literal `\n` sequences into real newlines before parsing
    pub unescape_newlines: bool,

    /// Apply Unicode NFC normalization
    pub normalize_unicode: bool,

    /// Insert a blank line before a list item that directly follows a
    /// non-list line, so the list is recognized
    pub separate_lists: bool,

    /// Enable GFM tables
    pub tables: bool,

    /// Enable `~~strikethrough~~`
    pub strikethrough: bool,

    /// Enable `- [ ]` task list markers
    pub task_lists: bool,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the input exactly as given, without any preprocessing.
    pub fn raw(mut self) -> Self {
        self.unescape_newlines = false;
        self.normalize_unicode = false;
        self.separate_lists = false;
        self
    }

    /// Enable or disable `\n` unescaping.
    pub fn with_unescape_newlines(mut self, enabled: bool) -> Self {
        self.unescape_newlines = enabled;
        self
    }

    /// Enable or disable NFC normalization.
    pub fn with_normalize_unicode(mut self, enabled: bool) -> Self {
        self.normalize_unicode = enabled;
        self
    }

    /// Enable or disable blank-line insertion before lists.
    pub fn with_separate_lists(mut self, enabled: bool) -> Self {
        self.separate_lists = enabled;
        self
    }

    /// Enable or disable tables.
    pub fn with_tables(mut self, enabled: bool) -> Self {
        self.tables = enabled;
        self
    }

    pub(crate) fn cmark_options(&self) -> pulldown_cmark::Options {
        use pulldown_cmark::Options;

        let mut options = Options::empty();
        if self.tables {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        options
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            unescape_newlines: true,
            normalize_unicode: true,
            separate_lists: true,
            tables: true,
            strikethrough: true,
            task_lists: true,
        }
    }
}
