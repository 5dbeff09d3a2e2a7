//! Layout of a document tree into styled paragraphs and tables.

use crate::chart::{PendingChart, PendingCharts};
use crate::config::{Alignment, StyleConfig};
use crate::model::{
    Block, Border, DocumentNode, InlineContent, InlineImage, LayoutDocument, Metadata, NodeKind,
    PageSetup, Paragraph, ParagraphProps, RunProps, TableData, TextRun,
};
use crate::style::units::cm_to_inches;
use crate::style::{first_line_indent_inches, resolve, ElementKind, IndentContext, LineSpacing};
use std::path::{Path, PathBuf};

use super::table::build_table;
use super::{InlineFormatter, RenderOptions, RenderResult, RenderStats};

/// Unordered list markers by nesting depth, cycled past the last.
const BULLETS: [&str; 3] = ["•", "◦", "▪"];

/// Hanging indent of a list marker in centimeters, capped at the list indent.
const LIST_HANGING_CM: f64 = 0.63;

/// Height/width ratio for a chart image whose size cannot be read.
const FALLBACK_ASPECT: f64 = 0.75;

/// Lay out a document tree, placing pending charts as anchors match.
pub fn layout_document(
    root: &DocumentNode,
    config: &StyleConfig,
    options: &RenderOptions,
    charts: PendingCharts,
) -> RenderResult {
    LayoutEngine::new(config, options.clone()).layout(root, charts)
}

/// Walks a [`DocumentNode`] tree depth-first and produces a
/// [`LayoutDocument`].
pub struct LayoutEngine<'a> {
    config: &'a StyleConfig,
    options: RenderOptions,
    inline: InlineFormatter,
    document: LayoutDocument,
    charts: PendingCharts,
    stats: RenderStats,
}

impl<'a> LayoutEngine<'a> {
    /// Create a new layout engine.
    pub fn new(config: &'a StyleConfig, options: RenderOptions) -> Self {
        let page = PageSetup::from_style(&config.page, config.enable_page_numbers);
        Self {
            config,
            options,
            inline: InlineFormatter::new(),
            document: LayoutDocument::new(page),
            charts: PendingCharts::new(),
            stats: RenderStats::new(),
        }
    }

    /// Lay out `root`. Charts whose anchor never matches are appended at the
    /// end of the document.
    pub fn layout(mut self, root: &DocumentNode, charts: PendingCharts) -> RenderResult {
        self.charts = charts;
        self.document.metadata = Metadata {
            title: self
                .options
                .title
                .clone()
                .or_else(|| root.title().map(str::to_string)),
            author: self.options.author.clone(),
            subject: self.options.subject.clone(),
            keywords: self.options.keywords.clone(),
            ..Metadata::default()
        };

        self.node(root);
        self.append_remaining_charts();

        RenderResult::new(self.document, self.stats)
    }

    fn node(&mut self, node: &DocumentNode) {
        match &node.kind {
            NodeKind::Document => self.children(node),
            NodeKind::Heading { level } => self.heading(*level, &node.content),
            NodeKind::Paragraph => self.paragraph(&node.content),
            NodeKind::List { ordered, start } => self.list(node, *ordered, *start, 0),
            NodeKind::ListItem => self.list_item(node, BULLETS[0], 0),
            NodeKind::Table(data) => self.table(data),
            NodeKind::CodeBlock { language } => self.code_block(language.as_deref(), &node.content),
            NodeKind::Quote => {
                self.quote(&node.content);
                self.children(node);
            }
            NodeKind::Image { src, alt } => self.image(src, alt),
        }
    }

    fn children(&mut self, node: &DocumentNode) {
        for child in &node.children {
            self.node(child);
        }
    }

    fn heading(&mut self, level: u8, text: &str) {
        let style = resolve(ElementKind::Heading(level), self.config);
        let mut props =
            ParagraphProps::from_style(&style).with_style_id(format!("Heading{}", level));
        props.first_line_indent = first_line_indent_inches(&style, IndentContext::Heading);
        props.outline_level = Some(level.saturating_sub(1));
        props.shading = style.background_color.clone();

        let mut paragraph = Paragraph::new(props);
        push_lines(&mut paragraph, text, &RunProps::from(&style.font));

        self.stats.heading_count += 1;
        self.stats.count_text(text);
        self.document.push_paragraph(paragraph);
    }

    fn paragraph(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let style = resolve(ElementKind::Body, self.config);
        let mut props = ParagraphProps::from_style(&style);
        props.first_line_indent = first_line_indent_inches(&style, IndentContext::BodyParagraph);
        props.shading = style.background_color.clone();

        let mut paragraph = Paragraph::new(props);
        paragraph.content =
            self.inline
                .format(text, &RunProps::from(&style.font), &self.config.code_inline);

        let plain = paragraph.plain_text();
        self.stats.paragraph_count += 1;
        self.stats.count_text(&plain);

        let index = self.document.blocks.len();
        self.document.push_paragraph(paragraph);
        self.place_charts(index, &plain);
    }

    /// Insert charts anchored on the paragraph at `index`: before-charts
    /// ahead of it, after-charts behind it, each group in queue order.
    fn place_charts(&mut self, index: usize, text: &str) {
        let matched = self.charts.take_matches(text);
        if matched.is_empty() {
            return;
        }

        let (before, after): (Vec<PendingChart>, Vec<PendingChart>) =
            matched.into_iter().partition(PendingChart::is_before);

        let mut ahead = Vec::new();
        for chart in &before {
            if let Some(blocks) = self.chart_blocks(chart) {
                self.stats.charts_anchored += 1;
                ahead.extend(blocks);
            }
        }
        let mut behind = Vec::new();
        for chart in &after {
            if let Some(blocks) = self.chart_blocks(chart) {
                self.stats.charts_anchored += 1;
                behind.extend(blocks);
            }
        }

        self.document.blocks.splice(index..index, ahead);
        self.document.blocks.extend(behind);
    }

    fn append_remaining_charts(&mut self) {
        for chart in self.charts.drain_remaining() {
            log::debug!("Chart {:?} has no matching paragraph, appending", chart.title);
            if let Some(blocks) = self.chart_blocks(&chart) {
                self.stats.charts_appended += 1;
                self.document.blocks.extend(blocks);
            }
        }
    }

    /// Picture paragraph plus optional caption, or `None` when the image
    /// file is gone.
    fn chart_blocks(&mut self, chart: &PendingChart) -> Option<Vec<Block>> {
        if !chart.image.is_file() {
            log::debug!("Chart image {} is missing, dropping", chart.image.display());
            self.stats.charts_dropped += 1;
            return None;
        }

        let width = self.config.chart.insert_width;
        let height = picture_height_cm(&chart.image, width).unwrap_or(width * FALLBACK_ASPECT);
        let mut blocks = vec![Block::Paragraph(picture_paragraph(
            chart.image.clone(),
            width,
            height,
            &chart.title,
        ))];
        if self.config.chart.add_title && !chart.title.trim().is_empty() {
            blocks.push(Block::Paragraph(self.caption(&chart.title)));
        }
        Some(blocks)
    }

    fn list(&mut self, node: &DocumentNode, ordered: bool, start: u64, depth: usize) {
        let mut number = start;
        for child in &node.children {
            match &child.kind {
                NodeKind::ListItem => {
                    let marker = if ordered {
                        format!("{}.", number)
                    } else {
                        BULLETS[depth % BULLETS.len()].to_string()
                    };
                    number += 1;
                    self.list_item(child, &marker, depth);
                }
                _ => self.node(child),
            }
        }
    }

    fn list_item(&mut self, item: &DocumentNode, marker: &str, depth: usize) {
        let style = resolve(ElementKind::Body, self.config);
        let indent = self.config.list_indent;

        let mut props = ParagraphProps::from_style(&style);
        props.left_indent = indent + depth as f64 * indent;
        props.first_line_indent = -cm_to_inches(LIST_HANGING_CM.min(indent));

        let base = RunProps::from(&style.font);
        let mut paragraph = Paragraph::new(props);
        paragraph.content = self.inline.format(&item.content, &base, &self.config.code_inline);
        let plain = paragraph.plain_text();
        paragraph.content.insert(
            0,
            InlineContent::Text(TextRun::new(format!("{}\t", marker), base.clone())),
        );

        self.stats.list_item_count += 1;
        self.stats.count_text(&plain);
        self.document.push_paragraph(paragraph);

        for child in &item.children {
            match &child.kind {
                NodeKind::List { ordered, start } => self.list(child, *ordered, *start, depth + 1),
                _ => self.node(child),
            }
        }
    }

    fn table(&mut self, data: &TableData) {
        if data.is_empty() {
            return;
        }
        let table = build_table(data, &self.config.table, &self.options.table_layout);
        self.stats.table_count += 1;
        self.stats.count_text(&table.plain_text());
        self.document.push_table(table);
    }

    fn code_block(&mut self, language: Option<&str>, code: &str) {
        if let Some(lang) = language.filter(|l| !l.trim().is_empty()) {
            if self.options.code_captions {
                let caption = self.caption(&format!("代码 ({})", lang.trim()));
                self.document.push_paragraph(caption);
            }
        }

        let style = resolve(ElementKind::CodeBlock, self.config);
        let mut props = ParagraphProps::from_style(&style);
        props.first_line_indent = first_line_indent_inches(&style, IndentContext::Other);
        props.shading = style.background_color.clone();

        // One run; the writer turns embedded newlines into breaks.
        let mut paragraph = Paragraph::new(props);
        paragraph.add_run(TextRun::new(code, RunProps::from(&style.font)));

        self.stats.code_block_count += 1;
        self.document.push_paragraph(paragraph);
    }

    fn quote(&mut self, text: &str) {
        self.stats.quote_count += 1;
        if text.trim().is_empty() {
            return;
        }

        let style = resolve(ElementKind::Quote, self.config);
        let mut props = ParagraphProps::from_style(&style);
        props.first_line_indent = first_line_indent_inches(&style, IndentContext::Other);
        props.shading = style.background_color.clone();
        props.left_border = Some(Border {
            width: 0.5,
            color: "#CCCCCC".to_string(),
            space: 4.0,
        });

        let mut paragraph = Paragraph::new(props);
        push_lines(&mut paragraph, text, &RunProps::from(&style.font));

        self.stats.count_text(text);
        self.document.push_paragraph(paragraph);
    }

    fn image(&mut self, src: &str, alt: &str) {
        let width = self
            .options
            .image_width_cm
            .min(self.config.page.content_width_cm());

        let embedded = self
            .resolve_image(src)
            .filter(|path| path.is_file())
            .and_then(|path| picture_height_cm(&path, width).map(|height| (path, height)));

        match embedded {
            Some((path, height)) => {
                self.document
                    .push_paragraph(picture_paragraph(path, width, height, alt));
                if self.options.image_captions && !alt.trim().is_empty() {
                    let caption = self.caption(&format!("图: {}", alt.trim()));
                    self.document.push_paragraph(caption);
                }
                self.stats.image_count += 1;
            }
            None => {
                log::debug!("Image {:?} not embedded, writing placeholder", src);
                let label = if alt.trim().is_empty() { src } else { alt.trim() };
                let placeholder = self.caption(&format!("[图片: {}]", label));
                self.document.push_paragraph(placeholder);
                self.stats.missing_image_count += 1;
            }
        }
    }

    /// Local path for an image source; remote and inline data sources have
    /// none.
    fn resolve_image(&self, src: &str) -> Option<PathBuf> {
        let src = src.trim();
        if src.is_empty() || ["http://", "https://", "data:"].iter().any(|p| src.starts_with(p)) {
            return None;
        }
        let path = PathBuf::from(src.strip_prefix("file://").unwrap_or(src));
        match &self.options.base_dir {
            Some(base) if path.is_relative() => Some(base.join(path)),
            _ => Some(path),
        }
    }

    fn caption(&self, text: &str) -> Paragraph {
        let style = resolve(ElementKind::Caption, self.config);
        let mut props = ParagraphProps::from_style(&style);
        props.shading = style.background_color.clone();

        let mut paragraph = Paragraph::new(props);
        push_lines(&mut paragraph, text, &RunProps::from(&style.font));
        paragraph
    }
}

/// Centered paragraph holding one picture.
fn picture_paragraph(path: PathBuf, width_cm: f64, height_cm: f64, alt: &str) -> Paragraph {
    let props = ParagraphProps {
        line_spacing: LineSpacing::Multiple(1.0),
        ..ParagraphProps::default()
    }
    .with_alignment(Alignment::Center);

    let mut paragraph = Paragraph::new(props);
    paragraph.add_image(InlineImage {
        path,
        width_cm,
        height_cm,
        alt: alt.to_string(),
    });
    paragraph
}

/// Picture height at `width_cm`, keeping the file's aspect ratio.
fn picture_height_cm(path: &Path, width_cm: f64) -> Option<f64> {
    match image::image_dimensions(path) {
        Ok((w, h)) if w > 0 && h > 0 => Some(width_cm * f64::from(h) / f64::from(w)),
        Ok(_) => None,
        Err(e) => {
            log::debug!("Cannot read image size of {}: {}", path.display(), e);
            None
        }
    }
}

/// Plain runs with `\n` turned into line breaks.
fn push_lines(paragraph: &mut Paragraph, text: &str, props: &RunProps) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            paragraph.content.push(InlineContent::LineBreak);
        }
        if !line.is_empty() {
            paragraph.add_run(TextRun::new(line, props.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Anchor;
    use crate::model::{VerticalMerge, VerticalAlign};
    use tempfile::TempDir;

    fn png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::new(w, h).save(&path).unwrap();
        path
    }

    fn run(root: &DocumentNode, charts: PendingCharts) -> RenderResult {
        layout_document(root, &StyleConfig::default(), &RenderOptions::default(), charts)
    }

    fn texts(result: &RenderResult) -> Vec<String> {
        result
            .document
            .blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(p) if p.has_image() => "<image>".to_string(),
                Block::Paragraph(p) => p.plain_text(),
                Block::Table(_) => "<table>".to_string(),
            })
            .collect()
    }

    fn pending(dir: &Path, position: &str, title: &str) -> PendingChart {
        PendingChart::new(
            Anchor::parse(position).unwrap(),
            png(dir, &format!("{}.png", title), 40, 30),
            title,
        )
    }

    #[test]
    fn test_heading_and_body_paragraph() {
        let root = DocumentNode::document()
            .with_child(DocumentNode::heading(1, "Title"))
            .with_child(DocumentNode::paragraph("Hello **world**."));
        let result = run(&root, PendingCharts::new());
        let paragraphs: Vec<&Paragraph> = result.document.paragraphs().collect();

        let heading = paragraphs[0];
        assert_eq!(heading.props.style_id.as_deref(), Some("Heading1"));
        assert_eq!(heading.props.outline_level, Some(0));
        assert_eq!(heading.props.first_line_indent, 0.0);

        let body = paragraphs[1];
        let runs: Vec<&TextRun> = body.runs().collect();
        assert_eq!(runs.len(), 3);
        assert!(runs[1].props.bold);
        assert_eq!(runs[1].text, "world");
        assert!((body.props.first_line_indent - 14.0 * 2.0 / 72.0).abs() < 1e-9);
        assert_eq!(body.props.line_spacing, LineSpacing::Exact(28.0));

        assert_eq!(result.document.metadata.title.as_deref(), Some("Title"));
        assert_eq!(result.stats.heading_count, 1);
        assert_eq!(result.stats.paragraph_count, 1);
    }

    #[test]
    fn test_metadata_from_options() {
        let root = DocumentNode::document().with_child(DocumentNode::heading(1, "Heading"));
        let options = RenderOptions::new()
            .with_author("Ops")
            .with_subject("Quarterly sales")
            .with_keywords(["sales", "2024"]);
        let result = layout_document(&root, &StyleConfig::default(), &options, PendingCharts::new());
        let meta = &result.document.metadata;

        assert_eq!(meta.title.as_deref(), Some("Heading"));
        assert_eq!(meta.author.as_deref(), Some("Ops"));
        assert_eq!(meta.subject.as_deref(), Some("Quarterly sales"));
        assert_eq!(meta.keywords, vec!["sales", "2024"]);
    }

    #[test]
    fn test_table_merge_in_layout() {
        let data = TableData::new(
            vec![
                vec!["A".to_string(), "1".to_string()],
                vec!["A".to_string(), "2".to_string()],
                vec!["B".to_string(), "3".to_string()],
            ],
            false,
        );
        let root = DocumentNode::document().with_child(DocumentNode::table(data));
        let result = run(&root, PendingCharts::new());
        let table = result.document.tables().next().unwrap();

        assert_eq!(table.cell(0, 0).unwrap().vertical_merge, Some(VerticalMerge::Restart));
        assert_eq!(table.cell(0, 0).unwrap().vertical_align, VerticalAlign::Center);
        assert_eq!(table.cell(1, 0).unwrap().vertical_merge, Some(VerticalMerge::Continue));
        assert_eq!(table.cell(2, 0).unwrap().vertical_merge, None);
    }

    #[test]
    fn test_chart_after_exact_paragraph() {
        let dir = TempDir::new().unwrap();
        let root = DocumentNode::document()
            .with_child(DocumentNode::paragraph("Hello world."))
            .with_child(DocumentNode::paragraph("Next."));
        let charts = vec![pending(dir.path(), "after:Hello world.", "x")]
            .into_iter()
            .collect();

        let result = run(&root, charts);
        assert_eq!(texts(&result), vec!["Hello world.", "<image>", "Next."]);
        assert_eq!(result.stats.charts_anchored, 1);
    }

    #[test]
    fn test_chart_segment_match_inserts_after_whole_paragraph() {
        let dir = TempDir::new().unwrap();
        let root = DocumentNode::document()
            .with_child(DocumentNode::paragraph("Intro. Hello world. Outro."));
        let charts = vec![pending(dir.path(), "after:Hello world.", "x")]
            .into_iter()
            .collect();

        let result = run(&root, charts);
        assert_eq!(texts(&result), vec!["Intro. Hello world. Outro.", "<image>"]);
    }

    #[test]
    fn test_before_chart_and_caption() {
        let dir = TempDir::new().unwrap();
        let mut config = StyleConfig::default();
        config.chart.add_title = true;
        let root = DocumentNode::document()
            .with_child(DocumentNode::paragraph("First."))
            .with_child(DocumentNode::paragraph("Anchor here."));
        let charts = vec![pending(dir.path(), "before:Anchor here.", "份额")]
            .into_iter()
            .collect();

        let result = layout_document(&root, &config, &RenderOptions::default(), charts);
        assert_eq!(texts(&result), vec!["First.", "<image>", "份额", "Anchor here."]);

        let picture = result.document.paragraphs().nth(1).unwrap();
        let image = picture.images().next().unwrap();
        assert_eq!(image.width_cm, config.chart.insert_width);
        assert!((image.height_cm - config.chart.insert_width * 0.75).abs() < 1e-9);
        assert_eq!(picture.props.alignment, Alignment::Center);
    }

    #[test]
    fn test_unmatched_chart_appended_once() {
        let dir = TempDir::new().unwrap();
        let root = DocumentNode::document()
            .with_child(DocumentNode::paragraph("Nothing relevant."))
            .with_child(DocumentNode::heading(2, "End"));
        let charts: PendingCharts = vec![
            pending(dir.path(), "after:missing anchor", "a"),
            pending(dir.path(), "after:Nothing relevant.", "b"),
        ]
        .into_iter()
        .collect();

        let result = run(&root, charts);
        assert_eq!(
            texts(&result),
            vec!["Nothing relevant.", "<image>", "End", "<image>"]
        );
        assert_eq!(result.stats.charts_anchored, 1);
        assert_eq!(result.stats.charts_appended, 1);
        assert_eq!(result.document.image_count(), 2);
    }

    #[test]
    fn test_missing_chart_file_dropped() {
        let root = DocumentNode::document().with_child(DocumentNode::paragraph("A."));
        let charts = vec![PendingChart::new(
            Anchor::parse("after:A.").unwrap(),
            "/nonexistent/chart.png",
            "gone",
        )]
        .into_iter()
        .collect();

        let result = run(&root, charts);
        assert_eq!(texts(&result), vec!["A."]);
        assert_eq!(result.stats.charts_dropped, 1);
    }

    #[test]
    fn test_nested_list_indent_and_markers() {
        let inner = DocumentNode::list(false, 1, vec![DocumentNode::list_item("inner")]);
        let root = DocumentNode::document().with_child(DocumentNode::list(
            true,
            3,
            vec![
                DocumentNode::list_item("three").with_child(inner),
                DocumentNode::list_item("four"),
            ],
        ));
        let result = run(&root, PendingCharts::new());
        let items: Vec<&Paragraph> = result.document.paragraphs().collect();

        assert_eq!(items[0].plain_text(), "3.\tthree");
        assert_eq!(items[1].plain_text(), "◦\tinner");
        assert_eq!(items[2].plain_text(), "4.\tfour");
        assert!((items[0].props.left_indent - 1.27).abs() < 1e-9);
        assert!((items[1].props.left_indent - 2.54).abs() < 1e-9);
        assert!(items[0].props.first_line_indent < 0.0);
        assert_eq!(result.stats.list_item_count, 3);
    }

    #[test]
    fn test_code_block_caption_and_single_run() {
        let root = DocumentNode::document()
            .with_child(DocumentNode::code_block(Some("rust".to_string()), "fn a() {}\nfn b() {}"));
        let result = run(&root, PendingCharts::new());
        assert_eq!(texts(&result), vec!["代码 (rust)", "fn a() {}\nfn b() {}"]);

        let code = result.document.paragraphs().nth(1).unwrap();
        assert_eq!(code.runs().count(), 1);
        assert_eq!(code.props.shading.as_deref(), Some("#f5f5f5"));
    }

    #[test]
    fn test_quote_border_and_children() {
        let root = DocumentNode::document().with_child(
            DocumentNode::quote("quoted\nsecond").with_child(DocumentNode::paragraph("after")),
        );
        let result = run(&root, PendingCharts::new());
        let quote = result.document.paragraphs().next().unwrap();

        assert!(quote.props.left_border.is_some());
        assert!((quote.props.left_indent - 0.5).abs() < 1e-9);
        assert_eq!(quote.props.first_line_indent, 0.0);
        assert_eq!(texts(&result), vec!["quoted\nsecond", "after"]);
    }

    #[test]
    fn test_image_embedded_or_placeholder() {
        let dir = TempDir::new().unwrap();
        png(dir.path(), "pic.png", 200, 100);
        let root = DocumentNode::document()
            .with_child(DocumentNode::image("pic.png", "示意图"))
            .with_child(DocumentNode::image("https://example.com/x.png", ""));
        let options = RenderOptions::default().with_base_dir(dir.path());

        let result = layout_document(&root, &StyleConfig::default(), &options, PendingCharts::new());
        assert_eq!(
            texts(&result),
            vec!["<image>", "图: 示意图", "[图片: https://example.com/x.png]"]
        );

        let image = result.document.paragraphs().next().unwrap().images().next().unwrap();
        assert!((image.width_cm - 15.24).abs() < 1e-9);
        assert!((image.height_cm - 7.62).abs() < 1e-9);
        assert_eq!(result.stats.image_count, 1);
        assert_eq!(result.stats.missing_image_count, 1);
    }
}
