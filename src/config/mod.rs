//! Style configuration model.
//!
//! A [`StyleConfig`] starts from built-in house-style defaults and is then
//! overlaid by the system file, a named theme, and request JSON (see
//! [`ConfigLoader`]). Each overlay only touches the keys it names.

mod legacy;
mod loader;
mod overlay;

pub use legacy::{is_legacy, migrate_legacy};
pub use loader::ConfigLoader;
pub use overlay::StyleOverlay;

use serde::{Deserialize, Serialize};

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left-aligned (default)
    #[default]
    Left,
    /// Centered
    Center,
    /// Right-aligned
    Right,
    /// Justified
    Justify,
}

impl Alignment {
    /// Parse an alignment name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Alignment::Left),
            "center" | "centre" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            "justify" | "both" => Some(Alignment::Justify),
            _ => None,
        }
    }

    /// WordprocessingML `w:jc` value.
    pub fn as_ooxml(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Font settings for a kind of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontStyle {
    /// Font family name
    pub family: String,

    /// Size in points
    pub size: u32,

    /// Hex color, e.g. "#000000"
    pub color: String,

    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            family: "微软雅黑".to_string(),
            size: 12,
            color: "#000000".to_string(),
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

impl FontStyle {
    fn with(family: &str, size: u32) -> Self {
        Self {
            family: family.to_string(),
            size,
            ..Self::default()
        }
    }
}

/// Paragraph settings for a kind of content.
///
/// `line_spacing` is read two ways: values of 20 and above are an exact
/// leading in points, smaller values a multiple of single spacing.
/// Indents are in centimeters; a `first_line_indent` of 0 means the indent
/// is computed from the font size for body paragraphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphStyle {
    pub alignment: Alignment,
    pub line_spacing: f64,
    /// Points
    pub space_before: f64,
    /// Points
    pub space_after: f64,
    pub left_indent: f64,
    pub right_indent: f64,
    pub first_line_indent: f64,
    pub keep_together: bool,
    pub keep_with_next: bool,
    pub page_break_before: bool,
}

impl Default for ParagraphStyle {
    fn default() -> Self {
        Self {
            alignment: Alignment::Left,
            line_spacing: 1.15,
            space_before: 0.0,
            space_after: 0.0,
            left_indent: 0.0,
            right_indent: 0.0,
            first_line_indent: 0.0,
            keep_together: false,
            keep_with_next: false,
            page_break_before: false,
        }
    }
}

/// Font, paragraph, and background formatting for one kind of content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementStyle {
    pub font: FontStyle,
    pub paragraph: ParagraphStyle,
    pub background_color: Option<String>,
}

impl ElementStyle {
    /// Overlay `other` onto `self`.
    ///
    /// A field of `other` only wins when it differs from the value a freshly
    /// defaulted [`FontStyle`] / [`ParagraphStyle`] would hold, so a field
    /// deliberately set back to its default value cannot override `self`.
    /// The background color wins whenever `other` has one.
    pub fn merge(&self, other: &ElementStyle) -> ElementStyle {
        let df = FontStyle::default();
        let dp = ParagraphStyle::default();
        let (of, op) = (&other.font, &other.paragraph);

        let mut merged = self.clone();
        let font = &mut merged.font;
        if of.family != df.family {
            font.family = of.family.clone();
        }
        if of.size != df.size {
            font.size = of.size;
        }
        if of.color != df.color {
            font.color = of.color.clone();
        }
        if of.bold != df.bold {
            font.bold = of.bold;
        }
        if of.italic != df.italic {
            font.italic = of.italic;
        }
        if of.underline != df.underline {
            font.underline = of.underline;
        }

        let para = &mut merged.paragraph;
        if op.alignment != dp.alignment {
            para.alignment = op.alignment;
        }
        if op.line_spacing != dp.line_spacing {
            para.line_spacing = op.line_spacing;
        }
        if op.space_before != dp.space_before {
            para.space_before = op.space_before;
        }
        if op.space_after != dp.space_after {
            para.space_after = op.space_after;
        }
        if op.left_indent != dp.left_indent {
            para.left_indent = op.left_indent;
        }
        if op.right_indent != dp.right_indent {
            para.right_indent = op.right_indent;
        }
        if op.first_line_indent != dp.first_line_indent {
            para.first_line_indent = op.first_line_indent;
        }
        if op.keep_together != dp.keep_together {
            para.keep_together = op.keep_together;
        }
        if op.keep_with_next != dp.keep_with_next {
            para.keep_with_next = op.keep_with_next;
        }
        if op.page_break_before != dp.page_break_before {
            para.page_break_before = op.page_break_before;
        }

        if other.background_color.is_some() {
            merged.background_color = other.background_color.clone();
        }
        merged
    }

    /// Check the style's values, returning a description of each problem.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(1..=72).contains(&self.font.size) {
            problems.push(format!("font size {} outside 1-72", self.font.size));
        }
        if !is_hex_color(&self.font.color) {
            problems.push(format!("invalid font color '{}'", self.font.color));
        }
        if let Some(bg) = &self.background_color {
            if !is_hex_color(bg) {
                problems.push(format!("invalid background color '{}'", bg));
            }
        }
        if self.paragraph.line_spacing <= 0.0 {
            problems.push(format!(
                "line spacing {} must be positive",
                self.paragraph.line_spacing
            ));
        }
        problems
    }
}

/// Heading styles: a shared default plus optional per-level overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingStyles {
    pub default: ElementStyle,
    pub h1: Option<ElementStyle>,
    pub h2: Option<ElementStyle>,
    pub h3: Option<ElementStyle>,
    pub h4: Option<ElementStyle>,
    pub h5: Option<ElementStyle>,
    pub h6: Option<ElementStyle>,
}

impl HeadingStyles {
    /// Resolved style for a heading level (clamped to 1-6).
    pub fn get(&self, level: u8) -> ElementStyle {
        match self.level(level) {
            Some(over) => self.default.merge(over),
            None => self.default.clone(),
        }
    }

    /// The override for a level, if any.
    pub fn level(&self, level: u8) -> Option<&ElementStyle> {
        match level.clamp(1, 6) {
            1 => self.h1.as_ref(),
            2 => self.h2.as_ref(),
            3 => self.h3.as_ref(),
            4 => self.h4.as_ref(),
            5 => self.h5.as_ref(),
            _ => self.h6.as_ref(),
        }
    }

    /// Mutable slot holding the override for a level.
    pub fn level_mut(&mut self, level: u8) -> &mut Option<ElementStyle> {
        match level.clamp(1, 6) {
            1 => &mut self.h1,
            2 => &mut self.h2,
            3 => &mut self.h3,
            4 => &mut self.h4,
            5 => &mut self.h5,
            _ => &mut self.h6,
        }
    }
}

impl Default for HeadingStyles {
    fn default() -> Self {
        let base = ElementStyle {
            font: FontStyle {
                bold: true,
                ..FontStyle::with("黑体", 15)
            },
            paragraph: ParagraphStyle {
                line_spacing: 28.0,
                keep_with_next: true,
                ..ParagraphStyle::default()
            },
            background_color: None,
        };
        let h1 = ElementStyle {
            font: FontStyle::with("宋体", 22),
            paragraph: ParagraphStyle {
                alignment: Alignment::Center,
                line_spacing: 1.25,
                keep_with_next: true,
                ..ParagraphStyle::default()
            },
            background_color: None,
        };
        let h2 = ElementStyle {
            font: FontStyle {
                size: 16,
                ..base.font.clone()
            },
            ..base.clone()
        };
        let h3 = base.clone();

        Self {
            default: base,
            h1: Some(h1),
            h2: Some(h2),
            h3: Some(h3),
            h4: None,
            h5: None,
            h6: None,
        }
    }
}

/// Page size, orientation, and margins. Lengths are centimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageStyle {
    /// Named paper size ("A4", "Letter", "Legal", or "custom")
    pub size: String,
    pub width: f64,
    pub height: f64,
    pub orientation: Orientation,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
}

impl PageStyle {
    /// Effective (width, height) in centimeters after applying the named
    /// size and orientation.
    pub fn dimensions_cm(&self) -> (f64, f64) {
        let (w, h) = match self.size.trim().to_ascii_uppercase().as_str() {
            "A4" => (21.0, 29.7),
            "A3" => (29.7, 42.0),
            "A5" => (14.8, 21.0),
            "LETTER" => (21.59, 27.94),
            "LEGAL" => (21.59, 35.56),
            _ => (self.width, self.height),
        };
        match self.orientation {
            Orientation::Portrait => (w.min(h), w.max(h)),
            Orientation::Landscape => (w.max(h), w.min(h)),
        }
    }

    /// Width available to content between the side margins, in centimeters.
    pub fn content_width_cm(&self) -> f64 {
        let (w, _) = self.dimensions_cm();
        (w - self.margin_left - self.margin_right).max(1.0)
    }
}

impl Default for PageStyle {
    fn default() -> Self {
        Self {
            size: "A4".to_string(),
            width: 21.0,
            height: 29.7,
            orientation: Orientation::Portrait,
            margin_top: 2.5,
            margin_bottom: 2.5,
            margin_left: 3.0,
            margin_right: 2.5,
        }
    }
}

/// Table borders, cell text, and fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStyle {
    /// Border width in points
    pub border_width: f64,
    pub border_color: String,
    /// Cell padding in points
    pub cell_padding: f64,
    pub cell_alignment: Alignment,
    pub cell_font_family: String,
    pub cell_font_size: u32,
    pub header_background: String,
    pub header_font_color: String,
    pub header_font_bold: bool,
    /// Fill for every other data row
    pub alternate_row_color: Option<String>,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            border_width: 1.0,
            border_color: "#424242".to_string(),
            cell_padding: 6.0,
            cell_alignment: Alignment::Center,
            cell_font_family: "微软雅黑".to_string(),
            cell_font_size: 9,
            header_background: "#f44336".to_string(),
            header_font_color: "#ffffff".to_string(),
            header_font_bold: true,
            alternate_row_color: Some("#fff3e0".to_string()),
        }
    }
}

/// Chart font sizes in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartFontSizes {
    pub title: u32,
    pub label: u32,
    pub legend: u32,
    pub value: u32,
    pub y_axis: u32,
}

impl Default for ChartFontSizes {
    fn default() -> Self {
        Self {
            title: 14,
            label: 10,
            legend: 10,
            value: 9,
            y_axis: 12,
        }
    }
}

/// Chart rendering and insertion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    /// Rendered width in centimeters
    pub width: f64,
    /// Width of the inserted picture in centimeters
    pub insert_width: f64,
    pub dpi: u32,
    pub background_color: String,
    /// Series / slice palette, cycled when exhausted
    pub colors: Vec<String>,
    pub font_sizes: ChartFontSizes,
    /// Add a caption paragraph with the chart title
    pub add_title: bool,
    /// Pie slices below this percentage get an outside leader line
    pub pie_threshold: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 14.0,
            insert_width: 14.0,
            dpi: 150,
            background_color: "#FFFFFF".to_string(),
            colors: [
                "#2E86AB", "#A23B72", "#F18F01", "#C73E1D", "#6A994E", "#BC4749", "#F77F00",
                "#FCBF49", "#06A77D", "#7209B7", "#3A86FF", "#FF006E",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            font_sizes: ChartFontSizes::default(),
            add_title: false,
            pie_threshold: 8.0,
        }
    }
}

/// Root style configuration for one conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub page: PageStyle,
    pub body: ElementStyle,
    pub headings: HeadingStyles,
    pub code_inline: ElementStyle,
    pub code_block: ElementStyle,
    pub table: TableStyle,
    pub quote: ElementStyle,
    /// Captions under images, code blocks, and charts
    pub caption: ElementStyle,
    /// Per-level list indent in centimeters
    pub list_indent: f64,
    pub chart: ChartStyle,
    pub enable_page_numbers: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            page: PageStyle::default(),
            body: ElementStyle {
                font: FontStyle::with("宋体", 14),
                paragraph: ParagraphStyle {
                    line_spacing: 28.0,
                    first_line_indent: 0.0,
                    ..ParagraphStyle::default()
                },
                background_color: None,
            },
            headings: HeadingStyles::default(),
            code_inline: ElementStyle {
                font: FontStyle {
                    color: "#d32f2f".to_string(),
                    ..FontStyle::with("Consolas", 10)
                },
                paragraph: ParagraphStyle::default(),
                background_color: Some("#f5f5f5".to_string()),
            },
            code_block: ElementStyle {
                font: FontStyle {
                    color: "#333333".to_string(),
                    ..FontStyle::with("Consolas", 9)
                },
                paragraph: ParagraphStyle {
                    line_spacing: 1.2,
                    left_indent: 0.2,
                    ..ParagraphStyle::default()
                },
                background_color: Some("#f5f5f5".to_string()),
            },
            table: TableStyle::default(),
            quote: ElementStyle {
                font: FontStyle {
                    color: "#666666".to_string(),
                    italic: true,
                    ..FontStyle::with("宋体", 10)
                },
                paragraph: ParagraphStyle {
                    line_spacing: 1.5,
                    left_indent: 0.5,
                    ..ParagraphStyle::default()
                },
                background_color: Some("#fff3e0".to_string()),
            },
            caption: ElementStyle {
                font: FontStyle {
                    color: "#666666".to_string(),
                    italic: true,
                    ..FontStyle::with("微软雅黑", 10)
                },
                paragraph: ParagraphStyle {
                    alignment: Alignment::Center,
                    space_before: 3.0,
                    space_after: 6.0,
                    ..ParagraphStyle::default()
                },
                background_color: None,
            },
            list_indent: 1.27,
            chart: ChartStyle::default(),
            enable_page_numbers: true,
        }
    }
}

impl StyleConfig {
    /// Apply a nested-schema mapping onto this configuration.
    ///
    /// Only keys present in `mapping` change; unknown keys and values that
    /// cannot be coerced to the field's type are logged and skipped.
    pub fn apply(&mut self, mapping: &serde_json::Value) {
        StyleOverlay::from_value(mapping).apply_to(self);
    }

    /// Return a copy with `mapping` applied.
    pub fn with_overlay(mut self, mapping: &serde_json::Value) -> Self {
        self.apply(mapping);
        self
    }

    /// Check every element style, returning `section: problem` strings.
    pub fn validate(&self) -> Vec<String> {
        let mut sections: Vec<(String, ElementStyle)> = vec![
            ("body".to_string(), self.body.clone()),
            ("code_inline".to_string(), self.code_inline.clone()),
            ("code_block".to_string(), self.code_block.clone()),
            ("quote".to_string(), self.quote.clone()),
            ("caption".to_string(), self.caption.clone()),
        ];
        for level in 1..=6u8 {
            sections.push((format!("headings.h{}", level), self.headings.get(level)));
        }

        let mut problems: Vec<String> = sections
            .iter()
            .flat_map(|(name, style)| {
                style
                    .validate()
                    .into_iter()
                    .map(move |p| format!("{}: {}", name, p))
            })
            .collect();

        if self.list_indent < 0.0 {
            problems.push(format!("list_indent: {} must not be negative", self.list_indent));
        }
        if self.chart.dpi == 0 {
            problems.push("chart: dpi must be positive".to_string());
        }
        problems
    }

    /// Serialize the configuration as YAML.
    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// `#RGB` or `#RRGGBB`.
pub fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize a hex color to the six-digit uppercase form WordprocessingML
/// expects (no leading `#`). Invalid input yields `None`.
pub fn ooxml_color(s: &str) -> Option<String> {
    if !is_hex_color(s) {
        return None;
    }
    let hex = &s[1..];
    let full = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect::<String>()
    } else {
        hex.to_string()
    };
    Some(full.to_ascii_uppercase())
}
