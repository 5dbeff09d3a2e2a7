//! Option-based overlays read from a nested configuration mapping.
//!
//! Every field is an `Option`: `Some` replaces the value of the layer below,
//! `None` leaves it alone. Values are coerced leniently (numeric strings,
//! integral floats, "yes"/"no"); anything that cannot be coerced is logged
//! and treated as absent.

use super::{
    Alignment, ChartFontSizes, ChartStyle, ElementStyle, FontStyle, Orientation, PageStyle,
    ParagraphStyle, StyleConfig, TableStyle,
};
use serde_json::{Map, Value};

pub(crate) fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

pub(crate) fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub(crate) fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A named sub-mapping with typed, logged field access.
struct Section<'a> {
    path: String,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Section<'a> {
    fn new(path: impl Into<String>, value: Option<&'a Value>) -> Self {
        let path = path.into();
        let map = match value {
            Some(Value::Object(map)) => Some(map),
            Some(Value::Null) | None => None,
            Some(other) => {
                log::warn!("config: '{}' should be a mapping, got {}", path, other);
                None
            }
        };
        Self { path, map }
    }

    fn is_present(&self) -> bool {
        self.map.is_some()
    }

    fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map
            .and_then(|m| m.get(key))
            .filter(|v| !v.is_null())
    }

    fn child(&self, key: &str) -> Section<'a> {
        Section::new(format!("{}.{}", self.path, key), self.raw(key))
    }

    fn typed<T>(&self, key: &str, kind: &str, f: impl Fn(&Value) -> Option<T>) -> Option<T> {
        let value = self.raw(key)?;
        let parsed = f(value);
        if parsed.is_none() {
            log::warn!(
                "config: ignoring {}.{}: expected {}, got {}",
                self.path,
                key,
                kind,
                value
            );
        }
        parsed
    }

    fn int(&self, key: &str) -> Option<u32> {
        self.typed(key, "a non-negative integer", |v| {
            coerce_int(v).and_then(|i| u32::try_from(i).ok())
        })
    }

    fn float(&self, key: &str) -> Option<f64> {
        self.typed(key, "a number", coerce_float)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.typed(key, "a boolean", coerce_bool)
    }

    fn string(&self, key: &str) -> Option<String> {
        self.typed(key, "a string", |v| v.as_str().map(|s| s.trim().to_string()))
    }

    fn alignment(&self, key: &str) -> Option<Alignment> {
        self.typed(key, "left/center/right/justify", |v| {
            v.as_str().and_then(Alignment::parse)
        })
    }

    fn string_list(&self, key: &str) -> Option<Vec<String>> {
        self.typed(key, "a list of strings", |v| {
            v.as_array()?
                .iter()
                .map(|item| item.as_str().map(|s| s.trim().to_string()))
                .collect()
        })
    }

    /// Key present with an explicit null.
    fn is_null(&self, key: &str) -> bool {
        matches!(self.map.and_then(|m| m.get(key)), Some(Value::Null))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontOverlay {
    pub family: Option<String>,
    pub size: Option<u32>,
    pub color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

impl FontOverlay {
    fn read(section: &Section) -> Self {
        Self {
            family: section.string("family"),
            size: section.int("size"),
            color: section.string("color"),
            bold: section.bool("bold"),
            italic: section.bool("italic"),
            underline: section.bool("underline"),
        }
    }

    pub fn apply_to(&self, font: &mut FontStyle) {
        if let Some(v) = &self.family {
            font.family = v.clone();
        }
        if let Some(v) = self.size {
            font.size = v;
        }
        if let Some(v) = &self.color {
            font.color = v.clone();
        }
        if let Some(v) = self.bold {
            font.bold = v;
        }
        if let Some(v) = self.italic {
            font.italic = v;
        }
        if let Some(v) = self.underline {
            font.underline = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphOverlay {
    pub alignment: Option<Alignment>,
    pub line_spacing: Option<f64>,
    pub space_before: Option<f64>,
    pub space_after: Option<f64>,
    pub left_indent: Option<f64>,
    pub right_indent: Option<f64>,
    pub first_line_indent: Option<f64>,
    pub keep_together: Option<bool>,
    pub keep_with_next: Option<bool>,
    pub page_break_before: Option<bool>,
}

impl ParagraphOverlay {
    fn read(section: &Section) -> Self {
        Self {
            alignment: section.alignment("alignment"),
            line_spacing: section.float("line_spacing"),
            space_before: section.float("space_before"),
            space_after: section.float("space_after"),
            left_indent: section.float("left_indent"),
            right_indent: section.float("right_indent"),
            first_line_indent: section.float("first_line_indent"),
            keep_together: section.bool("keep_together"),
            keep_with_next: section.bool("keep_with_next"),
            page_break_before: section.bool("page_break_before"),
        }
    }

    pub fn apply_to(&self, para: &mut ParagraphStyle) {
        if let Some(v) = self.alignment {
            para.alignment = v;
        }
        if let Some(v) = self.line_spacing {
            para.line_spacing = v;
        }
        if let Some(v) = self.space_before {
            para.space_before = v;
        }
        if let Some(v) = self.space_after {
            para.space_after = v;
        }
        if let Some(v) = self.left_indent {
            para.left_indent = v;
        }
        if let Some(v) = self.right_indent {
            para.right_indent = v;
        }
        if let Some(v) = self.first_line_indent {
            para.first_line_indent = v;
        }
        if let Some(v) = self.keep_together {
            para.keep_together = v;
        }
        if let Some(v) = self.keep_with_next {
            para.keep_with_next = v;
        }
        if let Some(v) = self.page_break_before {
            para.page_break_before = v;
        }
    }
}

/// Overlay for an [`ElementStyle`]. `background_color` is `Some(None)` when
/// the mapping explicitly clears it with `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementOverlay {
    pub font: FontOverlay,
    pub paragraph: ParagraphOverlay,
    pub background_color: Option<Option<String>>,
}

impl ElementOverlay {
    fn read(section: &Section) -> Option<Self> {
        if !section.is_present() {
            return None;
        }
        let background_color = if section.is_null("background_color") {
            Some(None)
        } else {
            section.string("background_color").map(Some)
        };
        Some(Self {
            font: FontOverlay::read(&section.child("font")),
            paragraph: ParagraphOverlay::read(&section.child("paragraph")),
            background_color,
        })
    }

    pub fn apply_to(&self, style: &mut ElementStyle) {
        self.font.apply_to(&mut style.font);
        self.paragraph.apply_to(&mut style.paragraph);
        if let Some(bg) = &self.background_color {
            style.background_color = bg.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOverlay {
    pub size: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub orientation: Option<Orientation>,
    pub margin_top: Option<f64>,
    pub margin_bottom: Option<f64>,
    pub margin_left: Option<f64>,
    pub margin_right: Option<f64>,
}

impl PageOverlay {
    fn read(section: &Section) -> Option<Self> {
        if !section.is_present() {
            return None;
        }
        Some(Self {
            size: section.string("size"),
            width: section.float("width"),
            height: section.float("height"),
            orientation: section.typed("orientation", "portrait/landscape", |v| {
                match v.as_str()?.trim().to_ascii_lowercase().as_str() {
                    "portrait" => Some(Orientation::Portrait),
                    "landscape" => Some(Orientation::Landscape),
                    _ => None,
                }
            }),
            margin_top: section.float("margin_top"),
            margin_bottom: section.float("margin_bottom"),
            margin_left: section.float("margin_left"),
            margin_right: section.float("margin_right"),
        })
    }

    pub fn apply_to(&self, page: &mut PageStyle) {
        if let Some(v) = &self.size {
            page.size = v.clone();
        }
        if let Some(v) = self.width {
            page.width = v;
        }
        if let Some(v) = self.height {
            page.height = v;
        }
        if let Some(v) = self.orientation {
            page.orientation = v;
        }
        if let Some(v) = self.margin_top {
            page.margin_top = v;
        }
        if let Some(v) = self.margin_bottom {
            page.margin_bottom = v;
        }
        if let Some(v) = self.margin_left {
            page.margin_left = v;
        }
        if let Some(v) = self.margin_right {
            page.margin_right = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableOverlay {
    pub border_width: Option<f64>,
    pub border_color: Option<String>,
    pub cell_padding: Option<f64>,
    pub cell_alignment: Option<Alignment>,
    pub cell_font_family: Option<String>,
    pub cell_font_size: Option<u32>,
    pub header_background: Option<String>,
    pub header_font_color: Option<String>,
    pub header_font_bold: Option<bool>,
    pub alternate_row_color: Option<Option<String>>,
}

impl TableOverlay {
    fn read(section: &Section) -> Option<Self> {
        if !section.is_present() {
            return None;
        }
        let alternate_row_color = if section.is_null("alternate_row_color") {
            Some(None)
        } else {
            section.string("alternate_row_color").map(Some)
        };
        Some(Self {
            border_width: section.float("border_width"),
            border_color: section.string("border_color"),
            cell_padding: section.float("cell_padding"),
            cell_alignment: section.alignment("cell_alignment"),
            cell_font_family: section.string("cell_font_family"),
            cell_font_size: section.int("cell_font_size"),
            header_background: section.string("header_background"),
            header_font_color: section.string("header_font_color"),
            header_font_bold: section.bool("header_font_bold"),
            alternate_row_color,
        })
    }

    pub fn apply_to(&self, table: &mut TableStyle) {
        if let Some(v) = self.border_width {
            table.border_width = v;
        }
        if let Some(v) = &self.border_color {
            table.border_color = v.clone();
        }
        if let Some(v) = self.cell_padding {
            table.cell_padding = v;
        }
        if let Some(v) = self.cell_alignment {
            table.cell_alignment = v;
        }
        if let Some(v) = &self.cell_font_family {
            table.cell_font_family = v.clone();
        }
        if let Some(v) = self.cell_font_size {
            table.cell_font_size = v;
        }
        if let Some(v) = &self.header_background {
            table.header_background = v.clone();
        }
        if let Some(v) = &self.header_font_color {
            table.header_font_color = v.clone();
        }
        if let Some(v) = self.header_font_bold {
            table.header_font_bold = v;
        }
        if let Some(v) = &self.alternate_row_color {
            table.alternate_row_color = v.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartOverlay {
    pub width: Option<f64>,
    pub insert_width: Option<f64>,
    pub dpi: Option<u32>,
    pub background_color: Option<String>,
    pub colors: Option<Vec<String>>,
    pub font_title: Option<u32>,
    pub font_label: Option<u32>,
    pub font_legend: Option<u32>,
    pub font_value: Option<u32>,
    pub font_y_axis: Option<u32>,
    pub add_title: Option<bool>,
    pub pie_threshold: Option<f64>,
}

impl ChartOverlay {
    fn read(section: &Section) -> Option<Self> {
        if !section.is_present() {
            return None;
        }
        let sizes = section.child("font_sizes");
        Some(Self {
            width: section.float("width"),
            insert_width: section.float("insert_width"),
            dpi: section.int("dpi"),
            background_color: section.string("background_color"),
            // An empty palette would leave nothing to cycle through.
            colors: section.string_list("colors").filter(|c| !c.is_empty()),
            font_title: sizes.int("title"),
            font_label: sizes.int("label"),
            font_legend: sizes.int("legend"),
            font_value: sizes.int("value"),
            font_y_axis: sizes.int("y_axis"),
            add_title: section.bool("add_title"),
            pie_threshold: section.float("pie_threshold"),
        })
    }

    pub fn apply_to(&self, chart: &mut ChartStyle) {
        if let Some(v) = self.width {
            chart.width = v;
        }
        if let Some(v) = self.insert_width {
            chart.insert_width = v;
        }
        if let Some(v) = self.dpi {
            chart.dpi = v;
        }
        if let Some(v) = &self.background_color {
            chart.background_color = v.clone();
        }
        if let Some(v) = &self.colors {
            chart.colors = v.clone();
        }
        let sizes: &mut ChartFontSizes = &mut chart.font_sizes;
        if let Some(v) = self.font_title {
            sizes.title = v;
        }
        if let Some(v) = self.font_label {
            sizes.label = v;
        }
        if let Some(v) = self.font_legend {
            sizes.legend = v;
        }
        if let Some(v) = self.font_value {
            sizes.value = v;
        }
        if let Some(v) = self.font_y_axis {
            sizes.y_axis = v;
        }
        if let Some(v) = self.add_title {
            chart.add_title = v;
        }
        if let Some(v) = self.pie_threshold {
            chart.pie_threshold = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadingsOverlay {
    pub default: Option<ElementOverlay>,
    /// Index 0 is h1.
    pub levels: [Option<ElementOverlay>; 6],
}

impl HeadingsOverlay {
    fn read(section: &Section) -> Option<Self> {
        if !section.is_present() {
            return None;
        }
        let mut levels: [Option<ElementOverlay>; 6] = Default::default();
        for (i, slot) in levels.iter_mut().enumerate() {
            *slot = ElementOverlay::read(&section.child(&format!("h{}", i + 1)));
        }
        Some(Self {
            default: ElementOverlay::read(&section.child("default")),
            levels,
        })
    }

    fn apply_to(&self, config: &mut StyleConfig) {
        if let Some(over) = &self.default {
            over.apply_to(&mut config.headings.default);
        }
        for (i, over) in self.levels.iter().enumerate() {
            let Some(over) = over else { continue };
            let slot = config.headings.level_mut(i as u8 + 1);
            let style = slot.get_or_insert_with(ElementStyle::default);
            over.apply_to(style);
        }
    }
}

/// A parsed configuration layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleOverlay {
    pub page: Option<PageOverlay>,
    pub body: Option<ElementOverlay>,
    pub headings: Option<HeadingsOverlay>,
    pub code_inline: Option<ElementOverlay>,
    pub code_block: Option<ElementOverlay>,
    pub table: Option<TableOverlay>,
    pub quote: Option<ElementOverlay>,
    pub caption: Option<ElementOverlay>,
    pub list_indent: Option<f64>,
    pub chart: Option<ChartOverlay>,
    pub enable_page_numbers: Option<bool>,
}

impl StyleOverlay {
    /// Read an overlay from a nested mapping. A non-mapping value yields an
    /// empty overlay.
    pub fn from_value(value: &Value) -> Self {
        let root = Section::new("config", Some(value));
        if !root.is_present() {
            return Self::default();
        }
        Self {
            page: PageOverlay::read(&root.child("page")),
            body: ElementOverlay::read(&root.child("body")),
            headings: HeadingsOverlay::read(&root.child("headings")),
            code_inline: ElementOverlay::read(&root.child("code_inline")),
            code_block: ElementOverlay::read(&root.child("code_block")),
            table: TableOverlay::read(&root.child("table")),
            quote: ElementOverlay::read(&root.child("quote")),
            caption: ElementOverlay::read(&root.child("caption")),
            list_indent: root.float("list_indent"),
            chart: ChartOverlay::read(&root.child("chart")),
            enable_page_numbers: root.bool("enable_page_numbers"),
        }
    }

    /// True when the overlay would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every present field onto `config`.
    pub fn apply_to(&self, config: &mut StyleConfig) {
        if let Some(o) = &self.page {
            o.apply_to(&mut config.page);
        }
        if let Some(o) = &self.body {
            o.apply_to(&mut config.body);
        }
        if let Some(o) = &self.headings {
            o.apply_to(config);
        }
        if let Some(o) = &self.code_inline {
            o.apply_to(&mut config.code_inline);
        }
        if let Some(o) = &self.code_block {
            o.apply_to(&mut config.code_block);
        }
        if let Some(o) = &self.table {
            o.apply_to(&mut config.table);
        }
        if let Some(o) = &self.quote {
            o.apply_to(&mut config.quote);
        }
        if let Some(o) = &self.caption {
            o.apply_to(&mut config.caption);
        }
        if let Some(v) = self.list_indent {
            config.list_indent = v;
        }
        if let Some(o) = &self.chart {
            o.apply_to(&mut config.chart);
        }
        if let Some(v) = self.enable_page_numbers {
            config.enable_page_numbers = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coercions() {
        assert_eq!(coerce_int(&json!("16")), Some(16));
        assert_eq!(coerce_int(&json!(16.0)), Some(16));
        assert_eq!(coerce_int(&json!(16.5)), None);
        assert_eq!(coerce_float(&json!("1.5")), Some(1.5));
        assert_eq!(coerce_float(&json!(2)), Some(2.0));
        assert_eq!(coerce_bool(&json!("true")), Some(true));
        assert_eq!(coerce_bool(&json!("No")), Some(false));
        assert_eq!(coerce_bool(&json!(1)), Some(true));
        assert_eq!(coerce_bool(&json!("maybe")), None);
    }

    #[test]
    fn test_apply_only_present_keys() {
        let mut config = StyleConfig::default();
        config.apply(&json!({"body": {"font": {"size": 12}}}));
        assert_eq!(config.body.font.size, 12);
        assert_eq!(config.body.font.family, "宋体");
        assert_eq!(config.body.paragraph.line_spacing, 28.0);
    }

    #[test]
    fn test_apply_can_set_default_values() {
        let mut config = StyleConfig::default();
        config.apply(&json!({"headings": {"default": {"font": {"bold": false}}}}));
        assert!(!config.headings.default.font.bold);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let overlay = json!({
            "page": {"orientation": "landscape", "margin_left": 2},
            "headings": {"h4": {"font": {"color": "#112233"}}},
            "chart": {"dpi": "200", "font_sizes": {"title": 18}},
            "list_indent": 0.8
        });
        let once = StyleConfig::default().with_overlay(&overlay);
        let twice = once.clone().with_overlay(&overlay);
        assert_eq!(once, twice);
        assert_eq!(once.page.orientation, Orientation::Landscape);
        assert_eq!(once.chart.dpi, 200);
        assert_eq!(once.chart.font_sizes.title, 18);
        assert_eq!(once.chart.font_sizes.label, 10);
    }

    #[test]
    fn test_new_heading_override_starts_from_default() {
        let config =
            StyleConfig::default().with_overlay(&json!({"headings": {"h5": {"font": {"size": 13}}}}));
        let h5 = config.headings.level(5).unwrap();
        assert_eq!(h5.font.size, 13);
        assert_eq!(h5.font.family, FontStyle::default().family);

        let resolved = config.headings.get(5);
        assert_eq!(resolved.font.size, 13);
        assert_eq!(resolved.font.family, config.headings.default.font.family);
    }

    #[test]
    fn test_malformed_fields_are_skipped() {
        let config = StyleConfig::default().with_overlay(&json!({
            "body": {"font": {"size": "large", "color": "#123456"}},
            "quote": "not a mapping",
            "list_indent": [1, 2]
        }));
        assert_eq!(config.body.font.size, 14);
        assert_eq!(config.body.font.color, "#123456");
        assert_eq!(config.quote, StyleConfig::default().quote);
        assert_eq!(config.list_indent, 1.27);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let overlay = StyleOverlay::from_value(&json!({"unknown": 1, "body": {"mystery": true}}));
        let mut config = StyleConfig::default();
        overlay.apply_to(&mut config);
        assert_eq!(config, StyleConfig::default());
    }

    #[test]
    fn test_null_clears_background() {
        let config = StyleConfig::default()
            .with_overlay(&json!({"quote": {"background_color": null}}));
        assert_eq!(config.quote.background_color, None);
    }

    #[test]
    fn test_non_mapping_root_is_empty() {
        assert!(StyleOverlay::from_value(&json!([1, 2, 3])).is_empty());
        assert!(StyleOverlay::from_value(&Value::Null).is_empty());
    }
}
