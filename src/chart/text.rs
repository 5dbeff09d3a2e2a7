//! Chart text.
//!
//! Faces come from the system font database, strings are shaped with
//! rustybuzz and the glyph outlines are filled as tiny-skia paths. Without
//! any usable face text is skipped and the shapes are drawn alone.

use rustybuzz::ttf_parser::{GlyphId, OutlineBuilder};
use std::sync::OnceLock;
use tiny_skia::{Color, FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Transform};

/// Families able to show CJK labels, most preferred first.
const FAMILIES: &[&str] = &[
    "WenQuanYi Micro Hei",
    "WenQuanYi Zen Hei",
    "Noto Sans CJK SC",
    "Noto Sans SC",
    "Source Han Sans SC",
    "SimHei",
    "Microsoft YaHei",
    "PingFang SC",
    "STHeiti",
    "Arial Unicode MS",
];

struct FontSource {
    db: fontdb::Database,
    face: Option<fontdb::ID>,
}

fn font_source() -> &'static FontSource {
    static SOURCE: OnceLock<FontSource> = OnceLock::new();
    SOURCE.get_or_init(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let families: Vec<fontdb::Family> = FAMILIES
            .iter()
            .map(|&name| fontdb::Family::Name(name))
            .chain([fontdb::Family::SansSerif])
            .collect();
        let query = fontdb::Query {
            families: &families,
            ..fontdb::Query::default()
        };
        let face = db
            .query(&query)
            .or_else(|| db.faces().next().map(|info| info.id));

        match face.and_then(|id| db.face(id)) {
            Some(info) => log::debug!("Chart text uses {:?}", info.families),
            None => log::warn!("No system font found, charts are drawn without text"),
        }
        FontSource { db, face }
    })
}

/// Horizontal placement of a string relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    Center,
    End,
}

/// A shaped string: outline in pixels with the pen starting at the origin
/// and the baseline at y = 0.
struct Shaped {
    path: Option<Path>,
    width: f32,
}

/// Draws text at point sizes for a given output resolution.
#[derive(Debug, Clone, Copy)]
pub struct TextPainter {
    px_per_pt: f32,
}

impl TextPainter {
    pub fn new(dpi: u32) -> Self {
        Self {
            px_per_pt: dpi.max(1) as f32 / 72.0,
        }
    }

    /// Pixel height of a point size.
    pub fn px(&self, pt: u32) -> f32 {
        pt as f32 * self.px_per_pt
    }

    /// Advance width in pixels, or `None` without a usable face.
    pub fn measure(&self, text: &str, pt: u32) -> Option<f32> {
        shape(text, self.px(pt)).map(|s| s.width)
    }

    /// Draw `text` with its baseline at `y`. Returns the drawn width.
    pub fn draw(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        (x, y): (f32, f32),
        pt: u32,
        align: Align,
        color: Color,
    ) -> Option<f32> {
        let shaped = shape(text, self.px(pt))?;
        let left = match align {
            Align::Start => x,
            Align::Center => x - shaped.width / 2.0,
            Align::End => x - shaped.width,
        };
        if let Some(path) = &shaped.path {
            let mut paint = Paint::default();
            paint.set_color(color);
            paint.anti_alias = true;
            pixmap.fill_path(
                path,
                &paint,
                FillRule::Winding,
                Transform::from_translate(left, y),
                None,
            );
        }
        Some(shaped.width)
    }

    /// Draw `text` centered on `center` over a filled box.
    pub fn draw_boxed(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        center: (f32, f32),
        pt: u32,
        color: Color,
        background: Color,
    ) -> Option<f32> {
        let size = self.px(pt);
        let width = self.measure(text, pt)?;
        let pad = size * 0.3;
        if let Some(rect) = Rect::from_xywh(
            center.0 - width / 2.0 - pad,
            center.1 - size / 2.0 - pad,
            width + pad * 2.0,
            size + pad * 2.0,
        ) {
            let mut paint = Paint::default();
            paint.set_color(background);
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
        // Cap height sits about 0.7 em above the baseline.
        let baseline = center.1 + size * 0.35;
        self.draw(pixmap, text, (center.0, baseline), pt, Align::Center, color)
    }
}

fn shape(text: &str, size: f32) -> Option<Shaped> {
    let source = font_source();
    let id = source.face?;
    source
        .db
        .with_face_data(id, |data, index| {
            let face = rustybuzz::Face::from_slice(data, index)?;
            let scale = size / face.units_per_em().max(1) as f32;

            let mut buffer = rustybuzz::UnicodeBuffer::new();
            buffer.push_str(text);
            let glyphs = rustybuzz::shape(&face, &[], buffer);

            let mut outline = GlyphOutline {
                builder: PathBuilder::new(),
                scale,
                origin: (0.0, 0.0),
            };
            let mut pen = 0.0f32;
            for (info, pos) in glyphs.glyph_infos().iter().zip(glyphs.glyph_positions()) {
                outline.origin = (pen + pos.x_offset as f32, pos.y_offset as f32);
                face.outline_glyph(GlyphId(info.glyph_id as u16), &mut outline);
                pen += pos.x_advance as f32;
            }

            Some(Shaped {
                path: outline.builder.finish(),
                width: pen * scale,
            })
        })
        .flatten()
}

/// Collects glyph outlines in font units into one pixel-space path.
struct GlyphOutline {
    builder: PathBuilder,
    scale: f32,
    origin: (f32, f32),
}

impl GlyphOutline {
    /// Font units are y-up, pixels y-down.
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (self.origin.0 + x) * self.scale,
            -(self.origin.1 + y) * self.scale,
        )
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Compact number for value and axis labels.
pub fn format_value(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        let text = format!("{:.2}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_follows_dpi() {
        let painter = TextPainter::new(144);
        assert_eq!(painter.px(10), 20.0);
    }

    #[test]
    fn test_glyph_outline_flips_y() {
        let mut outline = GlyphOutline {
            builder: PathBuilder::new(),
            scale: 0.5,
            origin: (100.0, 0.0),
        };
        assert_eq!(outline.map(0.0, 200.0), (50.0, -100.0));

        outline.move_to(0.0, 0.0);
        outline.line_to(100.0, 0.0);
        outline.line_to(100.0, 100.0);
        outline.close();
        let bounds = outline.builder.finish().unwrap().bounds();
        assert_eq!(bounds.left(), 50.0);
        assert_eq!(bounds.right(), 100.0);
        assert_eq!(bounds.top(), -50.0);
    }

    #[test]
    fn test_text_width_grows_with_size() {
        // Hosts without fonts measure nothing; that is not an error.
        let painter = TextPainter::new(150);
        if let (Some(small), Some(large)) = (painter.measure("Sales", 9), painter.measure("Sales", 18)) {
            assert!(small > 0.0);
            assert!(large > small * 1.5);
        }
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(1.5), "1.5");
        assert_eq!(format_value(0.126), "0.13");
        assert_eq!(format_value(2.10), "2.1");
    }
}
