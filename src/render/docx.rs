//! WordprocessingML package writer.
//!
//! Serializes a [`LayoutDocument`] into the parts of a `.docx` zip
//! container. All formatting is written as direct paragraph and run
//! properties; `styles.xml` only declares the style ids paragraphs refer to
//! (headings with their outline levels, captions, table grid).

use crate::config::ooxml_color;
use crate::error::Result;
use crate::model::{
    Block, InlineContent, InlineImage, LayoutDocument, Metadata, PageSetup, Paragraph,
    ParagraphProps, RunProps, Table, TableCell, TextRun, VerticalAlign, VerticalMerge,
};
use crate::style::units::{
    cm_to_emu, cm_to_twips, inches_to_twips, pt_to_eighths, pt_to_half_points, pt_to_twips,
};
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::fmt::Display;
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const STYLES_RID: &str = "rId1";
const SETTINGS_RID: &str = "rId2";
const FOOTER_RID: &str = "rId3";
const FIRST_DYNAMIC_RID: usize = 4;

/// Writes [`LayoutDocument`]s as `.docx` packages.
#[derive(Debug, Clone, Default)]
pub struct DocxWriter;

impl DocxWriter {
    /// Create a writer.
    pub fn new() -> Self {
        DocxWriter
    }

    /// Write the package to a file, creating parent directories.
    pub fn write_file(&self, doc: &LayoutDocument, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.write(doc, file)?;
        Ok(())
    }

    /// Serialize the package into memory.
    pub fn to_bytes(&self, doc: &LayoutDocument) -> Result<Vec<u8>> {
        let cursor = self.write(doc, Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }

    /// Write the package to any seekable writer and hand the writer back.
    pub fn write<W: Write + Seek>(&self, doc: &LayoutDocument, writer: W) -> Result<W> {
        let footer = doc.page.page_numbers;
        let mut body = BodyWriter::new();
        body.blocks(&doc.blocks)?;

        let parts: Vec<(&str, Vec<u8>)> = vec![
            ("[Content_Types].xml", content_types_xml(&body.media, footer)?),
            ("_rels/.rels", package_rels_xml()?),
            ("docProps/core.xml", core_xml(&doc.metadata)?),
            ("docProps/app.xml", app_xml()?),
            ("word/document.xml", document_xml(body.xml, &doc.page)?),
            ("word/_rels/document.xml.rels", document_rels_xml(&body.media, &body.links, footer)?),
            ("word/styles.xml", styles_xml()?),
            ("word/settings.xml", settings_xml()?),
        ];

        let mut zip = ZipWriter::new(writer);
        let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, xml) in parts {
            zip.start_file(name, opt)?;
            zip.write_all(&xml)?;
        }
        if footer {
            zip.start_file("word/footer1.xml", opt)?;
            zip.write_all(&footer_xml()?)?;
        }
        for (path, media) in &body.media {
            let bytes = std::fs::read(path)?;
            zip.start_file(format!("word/media/{}", media.name), opt)?;
            zip.write_all(&bytes)?;
        }

        Ok(zip.finish()?)
    }
}

/// Serialize a document to `.docx` bytes.
pub fn to_docx(doc: &LayoutDocument) -> Result<Vec<u8>> {
    DocxWriter::new().to_bytes(doc)
}

/// Event-level helpers over a quick-xml writer.
struct Xml {
    writer: quick_xml::Writer<Vec<u8>>,
}

impl Xml {
    fn new() -> Self {
        Self {
            writer: quick_xml::Writer::new(Vec::new()),
        }
    }

    /// A part: the XML declaration followed by whatever `fill` writes.
    fn part(fill: impl FnOnce(&mut Xml) -> Result<()>) -> Result<Vec<u8>> {
        let mut xml = Xml::new();
        xml.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        fill(&mut xml)?;
        Ok(xml.writer.into_inner())
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let tag = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(tag))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let tag = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(tag))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(&clean_text(text))))?;
        Ok(())
    }

    /// `<name attrs>text</name>`
    fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        self.text(text)?;
        self.end(name)
    }

    /// `<name w:val="value"/>`
    fn val(&mut self, name: &str, value: impl Display) -> Result<()> {
        self.empty(name, &[("w:val", value.to_string().as_str())])
    }

    /// `<name w:w="twips" w:type="dxa"/>`
    fn dxa(&mut self, name: &str, twips: i64) -> Result<()> {
        self.empty(name, &[("w:w", twips.to_string().as_str()), ("w:type", "dxa")])
    }

    fn shading(&mut self, fill: &str) -> Result<()> {
        self.empty("w:shd", &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", fill)])
    }
}

/// Control characters other than tab and newlines are not allowed in XML 1.0.
fn clean_text(s: &str) -> Cow<'_, str> {
    let invalid = |c: char| (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r');
    if s.chars().any(invalid) {
        Cow::Owned(s.chars().filter(|&c| !invalid(c)).collect())
    } else {
        Cow::Borrowed(s)
    }
}

struct Media {
    rid: String,
    name: String,
}

/// Builds the `<w:body>` content and collects the relationships it needs.
struct BodyWriter {
    xml: Xml,
    media: IndexMap<PathBuf, Media>,
    links: IndexMap<String, String>,
    next_rid: usize,
    next_drawing: u32,
}

impl BodyWriter {
    fn new() -> Self {
        Self {
            xml: Xml::new(),
            media: IndexMap::new(),
            links: IndexMap::new(),
            next_rid: FIRST_DYNAMIC_RID,
            next_drawing: 1,
        }
    }

    fn rid(&mut self) -> String {
        let rid = format!("rId{}", self.next_rid);
        self.next_rid += 1;
        rid
    }

    fn blocks(&mut self, blocks: &[Block]) -> Result<()> {
        let mut previous_table = false;
        for block in blocks {
            match block {
                Block::Paragraph(p) => {
                    self.paragraph(p, false)?;
                    previous_table = false;
                }
                Block::Table(t) => {
                    // Adjacent tables would fuse into one.
                    if previous_table {
                        self.xml.empty("w:p", &[])?;
                    }
                    self.table(t)?;
                    previous_table = true;
                }
            }
        }
        // The body must not end on a table.
        if previous_table {
            self.xml.empty("w:p", &[])?;
        }
        Ok(())
    }

    fn paragraph(&mut self, p: &Paragraph, props_only: bool) -> Result<()> {
        self.xml.start("w:p", &[])?;
        paragraph_props(&mut self.xml, &p.props)?;
        if !props_only {
            for content in &p.content {
                match content {
                    InlineContent::Text(run) => text_run(&mut self.xml, run)?,
                    InlineContent::LineBreak => {
                        self.xml.start("w:r", &[])?;
                        self.xml.empty("w:br", &[])?;
                        self.xml.end("w:r")?;
                    }
                    InlineContent::Link { run, url } => self.hyperlink(run, url)?,
                    InlineContent::Image(image) => self.picture(image)?,
                }
            }
        }
        self.xml.end("w:p")
    }

    fn hyperlink(&mut self, run: &TextRun, url: &str) -> Result<()> {
        let rid = match self.links.get(url) {
            Some(rid) => rid.clone(),
            None => {
                let rid = self.rid();
                self.links.insert(url.to_string(), rid.clone());
                rid
            }
        };
        self.xml
            .start("w:hyperlink", &[("r:id", rid.as_str()), ("w:history", "1")])?;
        text_run(&mut self.xml, run)?;
        self.xml.end("w:hyperlink")
    }

    fn picture(&mut self, image: &InlineImage) -> Result<()> {
        let rid = match self.media.get(&image.path) {
            Some(media) => media.rid.clone(),
            None => {
                let rid = self.rid();
                let name = format!("image{}.{}", self.media.len() + 1, media_extension(&image.path));
                self.media.insert(
                    image.path.clone(),
                    Media {
                        rid: rid.clone(),
                        name,
                    },
                );
                rid
            }
        };

        let id = self.next_drawing.to_string();
        self.next_drawing += 1;
        let name = format!("Picture {}", id);
        let cx = cm_to_emu(image.width_cm).to_string();
        let cy = cm_to_emu(image.height_cm).to_string();
        let extent = [("cx", cx.as_str()), ("cy", cy.as_str())];

        let x = &mut self.xml;
        x.start("w:r", &[])?;
        x.start("w:drawing", &[])?;
        x.start(
            "wp:inline",
            &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
        )?;
        x.empty("wp:extent", &extent)?;
        x.empty(
            "wp:docPr",
            &[("id", id.as_str()), ("name", name.as_str()), ("descr", image.alt.as_str())],
        )?;
        x.start("wp:cNvGraphicFramePr", &[])?;
        x.empty("a:graphicFrameLocks", &[("noChangeAspect", "1")])?;
        x.end("wp:cNvGraphicFramePr")?;

        x.start("a:graphic", &[])?;
        x.start("a:graphicData", &[("uri", NS_PIC)])?;
        x.start("pic:pic", &[])?;
        x.start("pic:nvPicPr", &[])?;
        x.empty("pic:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
        x.empty("pic:cNvPicPr", &[])?;
        x.end("pic:nvPicPr")?;
        x.start("pic:blipFill", &[])?;
        x.empty("a:blip", &[("r:embed", rid.as_str())])?;
        x.start("a:stretch", &[])?;
        x.empty("a:fillRect", &[])?;
        x.end("a:stretch")?;
        x.end("pic:blipFill")?;
        x.start("pic:spPr", &[])?;
        x.start("a:xfrm", &[])?;
        x.empty("a:off", &[("x", "0"), ("y", "0")])?;
        x.empty("a:ext", &extent)?;
        x.end("a:xfrm")?;
        x.start("a:prstGeom", &[("prst", "rect")])?;
        x.empty("a:avLst", &[])?;
        x.end("a:prstGeom")?;
        x.end("pic:spPr")?;
        x.end("pic:pic")?;
        x.end("a:graphicData")?;
        x.end("a:graphic")?;

        x.end("wp:inline")?;
        x.end("w:drawing")?;
        x.end("w:r")
    }

    fn table(&mut self, table: &Table) -> Result<()> {
        let border = pt_to_eighths(table.border_width).to_string();
        let color = ooxml_color(&table.border_color).unwrap_or_else(|| "000000".to_string());
        let margin = pt_to_twips(table.cell_margin);

        let x = &mut self.xml;
        x.start("w:tbl", &[])?;
        x.start("w:tblPr", &[])?;
        x.val("w:tblStyle", "TableGrid")?;
        x.dxa("w:tblW", cm_to_twips(table.total_width()))?;
        x.val("w:jc", "center")?;
        x.start("w:tblBorders", &[])?;
        for side in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
            x.empty(
                side,
                &[
                    ("w:val", "single"),
                    ("w:sz", border.as_str()),
                    ("w:space", "0"),
                    ("w:color", color.as_str()),
                ],
            )?;
        }
        x.end("w:tblBorders")?;
        x.empty("w:tblLayout", &[("w:type", "fixed")])?;
        x.start("w:tblCellMar", &[])?;
        for side in ["w:top", "w:left", "w:bottom", "w:right"] {
            x.dxa(side, margin)?;
        }
        x.end("w:tblCellMar")?;
        x.end("w:tblPr")?;

        x.start("w:tblGrid", &[])?;
        for width in &table.column_widths {
            x.empty("w:gridCol", &[("w:w", cm_to_twips(*width).to_string().as_str())])?;
        }
        x.end("w:tblGrid")?;

        for row in &table.rows {
            self.xml.start("w:tr", &[])?;
            if row.is_header {
                self.xml.start("w:trPr", &[])?;
                self.xml.empty("w:tblHeader", &[])?;
                self.xml.end("w:trPr")?;
            }
            for cell in &row.cells {
                self.cell(cell)?;
            }
            self.xml.end("w:tr")?;
        }
        self.xml.end("w:tbl")
    }

    fn cell(&mut self, cell: &TableCell) -> Result<()> {
        let x = &mut self.xml;
        x.start("w:tc", &[])?;
        x.start("w:tcPr", &[])?;
        x.dxa("w:tcW", cm_to_twips(cell.width))?;
        match cell.vertical_merge {
            Some(VerticalMerge::Restart) => x.val("w:vMerge", "restart")?,
            Some(VerticalMerge::Continue) => x.empty("w:vMerge", &[])?,
            None => {}
        }
        if let Some(fill) = cell.shading.as_deref().and_then(ooxml_color) {
            x.shading(&fill)?;
        }
        let valign = match cell.vertical_align {
            VerticalAlign::Top => "top",
            VerticalAlign::Center => "center",
            VerticalAlign::Bottom => "bottom",
        };
        x.val("w:vAlign", valign)?;
        x.end("w:tcPr")?;

        // Continuation cells show the restart cell's content.
        let continued = cell.vertical_merge == Some(VerticalMerge::Continue);
        if cell.content.is_empty() {
            self.xml.empty("w:p", &[])?;
        }
        for p in &cell.content {
            self.paragraph(p, continued)?;
        }
        self.xml.end("w:tc")
    }
}

fn paragraph_props(x: &mut Xml, props: &ParagraphProps) -> Result<()> {
    x.start("w:pPr", &[])?;
    if let Some(id) = &props.style_id {
        x.val("w:pStyle", id)?;
    }
    if props.keep_with_next {
        x.empty("w:keepNext", &[])?;
    }
    if props.keep_together {
        x.empty("w:keepLines", &[])?;
    }
    if props.page_break_before {
        x.empty("w:pageBreakBefore", &[])?;
    }
    if let Some(border) = &props.left_border {
        let color = ooxml_color(&border.color).unwrap_or_else(|| "auto".to_string());
        x.start("w:pBdr", &[])?;
        x.empty(
            "w:left",
            &[
                ("w:val", "single"),
                ("w:sz", pt_to_eighths(border.width).to_string().as_str()),
                ("w:space", (border.space.round() as i64).to_string().as_str()),
                ("w:color", color.as_str()),
            ],
        )?;
        x.end("w:pBdr")?;
    }
    if let Some(fill) = props.shading.as_deref().and_then(ooxml_color) {
        x.shading(&fill)?;
    }

    let (line, rule) = props.line_spacing.to_ooxml();
    x.empty(
        "w:spacing",
        &[
            ("w:before", pt_to_twips(props.space_before).to_string().as_str()),
            ("w:after", pt_to_twips(props.space_after).to_string().as_str()),
            ("w:line", line.to_string().as_str()),
            ("w:lineRule", rule),
        ],
    )?;

    let left = cm_to_twips(props.left_indent).to_string();
    let right = cm_to_twips(props.right_indent).to_string();
    let first = inches_to_twips(props.first_line_indent);
    let (special, amount) = if first < 0 {
        ("w:hanging", -first)
    } else {
        ("w:firstLine", first)
    };
    x.empty(
        "w:ind",
        &[
            ("w:left", left.as_str()),
            ("w:right", right.as_str()),
            (special, amount.to_string().as_str()),
        ],
    )?;

    x.val("w:jc", props.alignment.as_ooxml())?;
    if let Some(level) = props.outline_level {
        x.val("w:outlineLvl", level)?;
    }
    x.end("w:pPr")
}

fn run_props(x: &mut Xml, props: &RunProps) -> Result<()> {
    let font = props.font_family.as_str();
    let size = pt_to_half_points(props.font_size);
    x.start("w:rPr", &[])?;
    x.empty(
        "w:rFonts",
        &[("w:ascii", font), ("w:hAnsi", font), ("w:eastAsia", font), ("w:cs", font)],
    )?;
    if props.bold {
        x.empty("w:b", &[])?;
        x.empty("w:bCs", &[])?;
    }
    if props.italic {
        x.empty("w:i", &[])?;
        x.empty("w:iCs", &[])?;
    }
    if let Some(color) = ooxml_color(&props.color) {
        x.val("w:color", color)?;
    }
    x.val("w:sz", size)?;
    x.val("w:szCs", size)?;
    if props.underline {
        x.val("w:u", "single")?;
    }
    if let Some(fill) = props.shading.as_deref().and_then(ooxml_color) {
        x.shading(&fill)?;
    }
    x.end("w:rPr")
}

/// One `<w:r>`; newlines and tabs inside the text become `<w:br/>` and
/// `<w:tab/>` within the same run.
fn text_run(x: &mut Xml, run: &TextRun) -> Result<()> {
    if run.text.is_empty() {
        return Ok(());
    }
    x.start("w:r", &[])?;
    run_props(x, &run.props)?;
    for (i, line) in run.text.split('\n').enumerate() {
        if i > 0 {
            x.empty("w:br", &[])?;
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                x.empty("w:tab", &[])?;
            }
            if !piece.is_empty() {
                x.text_element("w:t", &[("xml:space", "preserve")], piece)?;
            }
        }
    }
    x.end("w:r")
}

fn media_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "jpeg",
        "gif" => "gif",
        "bmp" => "bmp",
        _ => "png",
    }
}

fn media_content_type(ext: &str) -> &'static str {
    match ext {
        "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/png",
    }
}

fn document_xml(body: Xml, page: &PageSetup) -> Result<Vec<u8>> {
    let body = body.writer.into_inner();
    Xml::part(|x| {
        x.start(
            "w:document",
            &[
                ("xmlns:w", NS_W),
                ("xmlns:r", NS_R),
                ("xmlns:wp", NS_WP),
                ("xmlns:a", NS_A),
                ("xmlns:pic", NS_PIC),
            ],
        )?;
        x.start("w:body", &[])?;
        // The body was produced by the same writer type; splice it in as is.
        x.writer.get_mut().extend_from_slice(&body);

        x.start("w:sectPr", &[])?;
        if page.page_numbers {
            x.empty("w:footerReference", &[("w:type", "default"), ("r:id", FOOTER_RID)])?;
        }
        let width = cm_to_twips(page.width).to_string();
        let height = cm_to_twips(page.height).to_string();
        let mut size = vec![("w:w", width.as_str()), ("w:h", height.as_str())];
        if page.landscape {
            size.push(("w:orient", "landscape"));
        }
        x.empty("w:pgSz", &size)?;
        x.empty(
            "w:pgMar",
            &[
                ("w:top", cm_to_twips(page.margin_top).to_string().as_str()),
                ("w:right", cm_to_twips(page.margin_right).to_string().as_str()),
                ("w:bottom", cm_to_twips(page.margin_bottom).to_string().as_str()),
                ("w:left", cm_to_twips(page.margin_left).to_string().as_str()),
                ("w:header", "851"),
                ("w:footer", "992"),
                ("w:gutter", "0"),
            ],
        )?;
        x.empty("w:cols", &[("w:space", "425")])?;
        x.empty("w:docGrid", &[("w:linePitch", "312")])?;
        x.end("w:sectPr")?;

        x.end("w:body")?;
        x.end("w:document")
    })
}

fn content_types_xml(media: &IndexMap<PathBuf, Media>, footer: bool) -> Result<Vec<u8>> {
    const MAIN: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml";

    let mut extensions: Vec<&str> = media
        .values()
        .filter_map(|m| m.name.rsplit('.').next())
        .collect();
    extensions.sort_unstable();
    extensions.dedup();

    let mut overrides = vec![
        ("/word/document.xml", format!("{}.document.main+xml", MAIN)),
        ("/word/styles.xml", format!("{}.styles+xml", MAIN)),
        ("/word/settings.xml", format!("{}.settings+xml", MAIN)),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml".to_string(),
        ),
        (
            "/docProps/app.xml",
            "application/vnd.openxmlformats-officedocument.extended-properties+xml".to_string(),
        ),
    ];
    if footer {
        overrides.push(("/word/footer1.xml", format!("{}.footer+xml", MAIN)));
    }

    Xml::part(|x| {
        x.start(
            "Types",
            &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
        )?;
        x.empty(
            "Default",
            &[
                ("Extension", "rels"),
                ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
            ],
        )?;
        x.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
        for ext in extensions {
            x.empty(
                "Default",
                &[("Extension", ext), ("ContentType", media_content_type(ext))],
            )?;
        }
        for (part, content_type) in &overrides {
            x.empty("Override", &[("PartName", *part), ("ContentType", content_type.as_str())])?;
        }
        x.end("Types")
    })
}

fn relationship(x: &mut Xml, id: &str, kind: &str, target: &str) -> Result<()> {
    x.empty("Relationship", &[("Id", id), ("Type", kind), ("Target", target)])
}

fn package_rels_xml() -> Result<Vec<u8>> {
    Xml::part(|x| {
        x.start("Relationships", &[("xmlns", NS_RELS)])?;
        relationship(
            x,
            "rId1",
            &format!("{}/officeDocument", REL_BASE),
            "word/document.xml",
        )?;
        relationship(
            x,
            "rId2",
            &format!("{}/metadata/core-properties", NS_RELS),
            "docProps/core.xml",
        )?;
        relationship(
            x,
            "rId3",
            &format!("{}/extended-properties", REL_BASE),
            "docProps/app.xml",
        )?;
        x.end("Relationships")
    })
}

fn document_rels_xml(
    media: &IndexMap<PathBuf, Media>,
    links: &IndexMap<String, String>,
    footer: bool,
) -> Result<Vec<u8>> {
    Xml::part(|x| {
        x.start("Relationships", &[("xmlns", NS_RELS)])?;
        relationship(x, STYLES_RID, &format!("{}/styles", REL_BASE), "styles.xml")?;
        relationship(x, SETTINGS_RID, &format!("{}/settings", REL_BASE), "settings.xml")?;
        if footer {
            relationship(x, FOOTER_RID, &format!("{}/footer", REL_BASE), "footer1.xml")?;
        }
        let image = format!("{}/image", REL_BASE);
        for m in media.values() {
            relationship(x, &m.rid, &image, &format!("media/{}", m.name))?;
        }
        let hyperlink = format!("{}/hyperlink", REL_BASE);
        for (url, rid) in links {
            x.empty(
                "Relationship",
                &[
                    ("Id", rid.as_str()),
                    ("Type", hyperlink.as_str()),
                    ("Target", url.as_str()),
                    ("TargetMode", "External"),
                ],
            )?;
        }
        x.end("Relationships")
    })
}

fn core_xml(meta: &Metadata) -> Result<Vec<u8>> {
    let created = meta
        .created
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    let keywords = (!meta.keywords.is_empty()).then(|| meta.keywords.join(", "));

    Xml::part(|x| {
        x.start(
            "cp:coreProperties",
            &[
                (
                    "xmlns:cp",
                    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
                ),
                ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
                ("xmlns:dcterms", "http://purl.org/dc/terms/"),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
            ],
        )?;
        let fields = [
            ("dc:title", meta.title.as_deref()),
            ("dc:subject", meta.subject.as_deref()),
            ("dc:creator", meta.author.as_deref()),
            ("cp:keywords", keywords.as_deref()),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                x.text_element(name, &[], value)?;
            }
        }
        for name in ["dcterms:created", "dcterms:modified"] {
            x.text_element(name, &[("xsi:type", "dcterms:W3CDTF")], &created)?;
        }
        x.end("cp:coreProperties")
    })
}

fn app_xml() -> Result<Vec<u8>> {
    Xml::part(|x| {
        x.start(
            "Properties",
            &[(
                "xmlns",
                "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
            )],
        )?;
        x.text_element("Application", &[], &format!("mdocx {}", crate::VERSION))?;
        x.end("Properties")
    })
}

fn settings_xml() -> Result<Vec<u8>> {
    Xml::part(|x| {
        x.start("w:settings", &[("xmlns:w", NS_W)])?;
        x.val("w:defaultTabStop", 420)?;
        x.val("w:characterSpacingControl", "compressPunctuation")?;
        x.start("w:compat", &[])?;
        x.empty(
            "w:compatSetting",
            &[
                ("w:name", "compatibilityMode"),
                ("w:uri", "http://schemas.microsoft.com/office/word"),
                ("w:val", "15"),
            ],
        )?;
        x.end("w:compat")?;
        x.end("w:settings")
    })
}

/// Centered `PAGE` field.
fn footer_xml() -> Result<Vec<u8>> {
    let field_char = |x: &mut Xml, kind: &str| -> Result<()> {
        x.start("w:r", &[])?;
        x.empty("w:fldChar", &[("w:fldCharType", kind)])?;
        x.end("w:r")
    };
    Xml::part(|x| {
        x.start("w:ftr", &[("xmlns:w", NS_W), ("xmlns:r", NS_R)])?;
        x.start("w:p", &[])?;
        x.start("w:pPr", &[])?;
        x.val("w:jc", "center")?;
        x.end("w:pPr")?;
        field_char(x, "begin")?;
        x.start("w:r", &[])?;
        x.text_element("w:instrText", &[("xml:space", "preserve")], " PAGE ")?;
        x.end("w:r")?;
        field_char(x, "separate")?;
        x.start("w:r", &[])?;
        x.text_element("w:t", &[], "1")?;
        x.end("w:r")?;
        field_char(x, "end")?;
        x.end("w:p")?;
        x.end("w:ftr")
    })
}

/// `<w:style>` header shared by every declared style.
fn style_start(x: &mut Xml, kind: &str, id: &str, name: &str, default: bool) -> Result<()> {
    let mut attrs = vec![("w:type", kind)];
    if default {
        attrs.push(("w:default", "1"));
    }
    attrs.push(("w:styleId", id));
    x.start("w:style", &attrs)?;
    x.val("w:name", name)
}

fn styles_xml() -> Result<Vec<u8>> {
    Xml::part(|x| {
        x.start("w:styles", &[("xmlns:w", NS_W)])?;

        x.start("w:docDefaults", &[])?;
        x.start("w:rPrDefault", &[])?;
        x.start("w:rPr", &[])?;
        x.empty(
            "w:rFonts",
            &[
                ("w:ascii", "Times New Roman"),
                ("w:hAnsi", "Times New Roman"),
                ("w:eastAsia", "宋体"),
                ("w:cs", "Times New Roman"),
            ],
        )?;
        x.val("w:sz", 24)?;
        x.val("w:szCs", 24)?;
        x.empty("w:lang", &[("w:val", "en-US"), ("w:eastAsia", "zh-CN")])?;
        x.end("w:rPr")?;
        x.end("w:rPrDefault")?;
        x.empty("w:pPrDefault", &[])?;
        x.end("w:docDefaults")?;

        style_start(x, "paragraph", "Normal", "Normal", true)?;
        x.empty("w:qFormat", &[])?;
        x.end("w:style")?;

        for level in 1..=6u8 {
            style_start(
                x,
                "paragraph",
                &format!("Heading{}", level),
                &format!("heading {}", level),
                false,
            )?;
            x.val("w:basedOn", "Normal")?;
            x.val("w:next", "Normal")?;
            x.val("w:uiPriority", 9)?;
            x.empty("w:qFormat", &[])?;
            x.start("w:pPr", &[])?;
            x.empty("w:keepNext", &[])?;
            x.val("w:outlineLvl", level - 1)?;
            x.end("w:pPr")?;
            x.end("w:style")?;
        }

        style_start(x, "paragraph", "Caption", "caption", false)?;
        x.val("w:basedOn", "Normal")?;
        x.val("w:next", "Normal")?;
        x.empty("w:qFormat", &[])?;
        x.end("w:style")?;

        style_start(x, "character", "DefaultParagraphFont", "Default Paragraph Font", true)?;
        x.val("w:uiPriority", 1)?;
        x.empty("w:semiHidden", &[])?;
        x.end("w:style")?;

        style_start(x, "table", "TableNormal", "Normal Table", true)?;
        x.empty("w:semiHidden", &[])?;
        x.start("w:tblPr", &[])?;
        x.dxa("w:tblInd", 0)?;
        x.start("w:tblCellMar", &[])?;
        x.dxa("w:top", 0)?;
        x.dxa("w:left", 108)?;
        x.dxa("w:bottom", 0)?;
        x.dxa("w:right", 108)?;
        x.end("w:tblCellMar")?;
        x.end("w:tblPr")?;
        x.end("w:style")?;

        style_start(x, "table", "TableGrid", "Table Grid", false)?;
        x.val("w:basedOn", "TableNormal")?;
        x.val("w:uiPriority", 59)?;
        x.end("w:style")?;

        x.end("w:styles")
    })
}
