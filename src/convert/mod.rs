//! End-to-end conversion pipeline.
//!
//! Markdown text goes through configuration loading, parsing, chart
//! rendering, layout, and packaging:
//!
//! ```no_run
//! use mdocx::convert::{convert_file, ConvertOptions};
//!
//! fn main() -> mdocx::Result<()> {
//!     let options = ConvertOptions::new().with_theme("business");
//!     let result = convert_file("report.md", None, &options)?;
//!     println!("{} ({} paragraphs)", result.output.display(), result.stats.paragraph_count);
//!     Ok(())
//! }
//! ```

use crate::chart::{parse_chart_specs, render_charts, ChartRenderer, ChartSpec, RasterChartRenderer};
use crate::config::{ConfigLoader, StyleConfig};
use crate::error::{Error, Result};
use crate::parser::{MarkdownParser, ParseOptions};
use crate::render::{layout_document, DocxWriter, RenderOptions, RenderResult, RenderStats};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

/// File name used when the Markdown has no usable title.
pub const DEFAULT_FILENAME: &str = "output.docx";

/// Longest title that is turned into a file name.
const MAX_TITLE_CHARS: usize = 200;

/// Title lines are only looked for near the top of the document.
const TITLE_SCAN_LINES: usize = 10;

/// Extensions picked up by directory conversion.
const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Options for a conversion.
#[derive(Clone)]
pub struct ConvertOptions {
    /// Directory holding `style.yaml` and `themes/`
    pub config_dir: PathBuf,

    /// Theme layer; `None` or `"default"` skips it
    pub theme: Option<String>,

    /// Request-level style JSON, applied last
    pub style_json: Option<String>,

    /// Charts to render and place
    pub charts: Vec<ChartSpec>,

    /// Markdown preprocessing and parsing options
    pub parse: ParseOptions,

    /// Layout options
    pub render: RenderOptions,

    /// Chart renderer
    pub renderer: Arc<dyn ChartRenderer>,
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration directory.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    /// Select a theme.
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    /// Set request-level style JSON.
    pub fn with_style_json(mut self, json: impl Into<String>) -> Self {
        self.style_json = Some(json.into());
        self
    }

    /// Set the charts to place.
    pub fn with_charts(mut self, charts: Vec<ChartSpec>) -> Self {
        self.charts = charts;
        self
    }

    /// Parse charts from recognizer output. Invalid entries are skipped;
    /// only an unreadable payload is an error.
    pub fn with_charts_json(mut self, raw: &str) -> Result<Self> {
        self.charts = parse_chart_specs(raw)?;
        Ok(self)
    }

    /// Set parse options.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse = options;
        self
    }

    /// Set layout options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    /// Use a different chart renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// The effective style configuration for these options.
    pub fn load_config(&self) -> StyleConfig {
        ConfigLoader::new(&self.config_dir).load(self.theme.as_deref(), self.style_json.as_deref())
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            theme: None,
            style_json: None,
            charts: Vec::new(),
            parse: ParseOptions::default(),
            render: RenderOptions::default(),
            renderer: Arc::new(RasterChartRenderer::new()),
        }
    }
}

impl fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("config_dir", &self.config_dir)
            .field("theme", &self.theme)
            .field("style_json", &self.style_json)
            .field("charts", &self.charts.len())
            .field("parse", &self.parse)
            .field("render", &self.render)
            .finish_non_exhaustive()
    }
}

/// Result of converting one file.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Written `.docx` file
    pub output: PathBuf,

    /// Layout statistics
    pub stats: RenderStats,

    /// Package size in bytes
    pub bytes_written: usize,
}

/// Outcome of a directory conversion.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Converted files as `(input, result)`
    pub succeeded: Vec<(PathBuf, ConvertResult)>,

    /// Failed files as `(input, error message)`
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    /// Number of files attempted.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Check if every file converted.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Convert Markdown text and lay it out, without packaging.
///
/// Chart images live in a scratch directory that is removed when this
/// returns, so the result is only useful for inspection. Use
/// [`convert_str`] for a complete package.
pub fn render_str(markdown: &str, options: &ConvertOptions) -> Result<RenderResult> {
    let (result, _charts) = render_with_charts(markdown, options)?;
    Ok(result)
}

/// Convert Markdown text to `.docx` bytes.
pub fn convert_str(markdown: &str, options: &ConvertOptions) -> Result<Vec<u8>> {
    let (result, _charts) = render_with_charts(markdown, options)?;
    // Chart images are read here, before the scratch directory is dropped.
    DocxWriter::new().to_bytes(&result.document)
}

/// Convert a Markdown file.
///
/// Without `output` the package is written next to the input, named after
/// the document's first level-1 heading or, failing that, the input's stem.
/// Relative image paths resolve against the input's directory unless the
/// render options name a base directory.
pub fn convert_file(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    options: &ConvertOptions,
) -> Result<ConvertResult> {
    let input = input.as_ref();
    if !input.is_file() {
        return Err(Error::InputNotFound(input.to_path_buf()));
    }
    let markdown = fs::read_to_string(input)?;
    let input_dir = input.parent().unwrap_or_else(|| Path::new(""));

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let name = title_filename(&markdown).unwrap_or_else(|| stem_filename(input));
            input_dir.join(name)
        }
    };

    let mut options = options.clone();
    if options.render.base_dir.is_none() {
        options.render.base_dir = Some(input_dir.to_path_buf());
    }

    let (result, _charts) = render_with_charts(&markdown, &options)?;
    let bytes = DocxWriter::new().to_bytes(&result.document)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, &bytes)?;
    log::info!("Wrote {} ({} bytes)", output.display(), bytes.len());

    Ok(ConvertResult {
        output,
        stats: result.stats,
        bytes_written: bytes.len(),
    })
}

/// Convert every Markdown file under `input_dir`.
///
/// Outputs mirror the input tree under `output_dir` with a `.docx`
/// extension. A failing file is recorded in the report and the batch
/// goes on.
pub fn convert_directory(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<BatchReport> {
    let input_dir = input_dir.as_ref();
    if !input_dir.is_dir() {
        return Err(Error::InputNotFound(input_dir.to_path_buf()));
    }

    let mut report = BatchReport::default();
    for input in markdown_files(input_dir) {
        let output = batch_output_path(input_dir, output_dir.as_ref(), &input);
        match convert_file(&input, Some(&output), options) {
            Ok(result) => report.succeeded.push((input, result)),
            Err(e) => {
                log::warn!("Failed to convert {}: {}", input.display(), e);
                report.failed.push((input, e.to_string()));
            }
        }
    }
    Ok(report)
}

/// Markdown files under a directory, sorted.
pub fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| MARKDOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Where a batch input lands under `output_dir`.
pub fn batch_output_path(input_dir: &Path, output_dir: &Path, input: &Path) -> PathBuf {
    let relative = input.strip_prefix(input_dir).unwrap_or(input);
    output_dir.join(relative).with_extension("docx")
}

/// File name for a document: its first level-1 heading, sanitized, or
/// `output.docx`.
pub fn suggest_filename(markdown: &str) -> String {
    title_filename(markdown).unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Replace characters not allowed in file names and trim the result.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '\n' | '\r' | '\t' => '_',
            c => c,
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches(|c| c == ' ' || c == '.').to_string()
}

fn title_filename(markdown: &str) -> Option<String> {
    let text = markdown.replace("\\n", "\n");
    let title = text
        .lines()
        .take(TITLE_SCAN_LINES)
        .map(str::trim)
        .find(|line| line.starts_with("# "))?
        .trim_start_matches("# ")
        .trim();
    let title = title.split("##").next().unwrap_or(title).trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
        return None;
    }

    let name = sanitize_filename(title);
    (!name.is_empty()).then(|| format!("{}.docx", name))
}

fn stem_filename(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| format!("{}.docx", s.to_string_lossy()))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Load configuration, parse, render charts, and lay out. The returned
/// [`TempDir`] holds the chart images the layout refers to.
fn render_with_charts(markdown: &str, options: &ConvertOptions) -> Result<(RenderResult, TempDir)> {
    let config = options.load_config();
    let root = MarkdownParser::new(options.parse.clone()).parse(markdown);

    let chart_dir = TempDir::new()?;
    let pending = render_charts(
        &options.charts,
        options.renderer.as_ref(),
        &config.chart,
        chart_dir.path(),
        options.render.chart_workers,
    );
    if pending.len() < options.charts.len() {
        log::warn!(
            "{} of {} charts failed to render",
            options.charts.len() - pending.len(),
            options.charts.len()
        );
    }

    let result = layout_document(&root, &config, &options.render, pending);
    log::debug!(
        "Laid out {} blocks, {} charts placed",
        result.document.blocks.len(),
        result.chart_count()
    );
    Ok((result, chart_dir))
}
