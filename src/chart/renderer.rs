//! Chart rasterization.

use super::text::{format_value, Align, TextPainter};
use super::{ChartData, ChartSpec, ChartType, PendingChart, PendingCharts};
use crate::config::{ooxml_color, ChartFontSizes, ChartStyle};
use crate::error::{Error, Result};
use crate::style::units::cm_to_pixels;
use rayon::prelude::*;
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

/// Renders one chart specification to an image file.
pub trait ChartRenderer: Send + Sync {
    /// Render `spec` into `out_dir` and return the written file.
    fn render(&self, spec: &ChartSpec, style: &ChartStyle, out_dir: &Path) -> Result<PathBuf>;
}

/// PNG renderer: pie wedges with percentage labels (leader lines for small
/// slices), grouped bars and polylines with value labels and a labelled
/// value axis. Every chart gets a title and a named color-key legend; text
/// sizes come from the chart style's `font_sizes`.
#[derive(Debug, Default)]
pub struct RasterChartRenderer {
    counter: AtomicUsize,
}

const FALLBACK_RGB: [u8; 3] = [0x2E, 0x86, 0xAB];
const AXIS_RGB: [u8; 3] = [0x42, 0x42, 0x42];
const LEADER_RGB: [u8; 3] = [0x61, 0x61, 0x61];
const TEXT_RGB: [u8; 3] = [0x21, 0x21, 0x21];

impl RasterChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pixel size of the canvas for a chart.
    pub fn canvas_size(spec: &ChartSpec, style: &ChartStyle) -> (u32, u32) {
        let height_cm = match spec.chart_type {
            ChartType::Pie => {
                let n = spec.data.categories().len() as f64;
                (6.0 + n * 0.5).clamp(8.0, 12.0)
            }
            ChartType::Bar | ChartType::Line => style.width * 0.6,
        };
        (
            cm_to_pixels(style.width, style.dpi).max(1),
            cm_to_pixels(height_cm, style.dpi).max(1),
        )
    }

    fn draw(&self, spec: &ChartSpec, style: &ChartStyle) -> Result<Pixmap> {
        let (width, height) = Self::canvas_size(spec, style);
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            Error::Chart(format!("failed to create {}x{} canvas", width, height))
        })?;
        pixmap.fill(parse_color(&style.background_color).unwrap_or(Color::WHITE));

        let palette = Palette::new(&style.colors);
        let labels = Labels {
            text: TextPainter::new(style.dpi),
            sizes: &style.font_sizes,
        };
        let top = labels.title(&mut pixmap, &spec.title);
        match spec.chart_type {
            ChartType::Pie => {
                draw_pie(&mut pixmap, &spec.data, &palette, &labels, top, style.pie_threshold)?
            }
            ChartType::Bar => draw_bars(&mut pixmap, &spec.data, &palette, &labels, top)?,
            ChartType::Line => draw_lines(&mut pixmap, &spec.data, &palette, &labels, top)?,
        }
        Ok(pixmap)
    }
}

impl ChartRenderer for RasterChartRenderer {
    fn render(&self, spec: &ChartSpec, style: &ChartStyle, out_dir: &Path) -> Result<PathBuf> {
        let pixmap = self.draw(spec, style)?;
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = out_dir.join(format!("chart_{:03}.png", index));
        pixmap
            .save_png(&path)
            .map_err(|e| Error::Chart(format!("PNG encoding failed: {}", e)))?;
        log::debug!("Rendered chart {:?} to {}", spec.title, path.display());
        Ok(path)
    }
}

/// Render every spec on a bounded worker pool and queue the results in spec
/// order. A spec that fails to render is logged and left out.
pub fn render_charts(
    specs: &[ChartSpec],
    renderer: &dyn ChartRenderer,
    style: &ChartStyle,
    out_dir: &Path,
    workers: usize,
) -> PendingCharts {
    let render_one = |spec: &ChartSpec| -> Option<PendingChart> {
        let rendered = spec
            .anchor()
            .and_then(|anchor| Ok((anchor, renderer.render(spec, style, out_dir)?)));
        match rendered {
            Ok((anchor, image)) => Some(PendingChart::new(anchor, image, spec.title.clone())),
            Err(e) => {
                log::warn!("Skipping chart {:?}: {}", spec.title, e);
                None
            }
        }
    };

    let results: Vec<Option<PendingChart>> = if workers <= 1 || specs.len() <= 1 {
        specs.iter().map(&render_one).collect()
    } else {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers.min(specs.len()))
            .build()
        {
            Ok(pool) => pool.install(|| specs.par_iter().map(&render_one).collect()),
            Err(e) => {
                log::warn!("Chart worker pool unavailable, rendering serially: {}", e);
                specs.iter().map(&render_one).collect()
            }
        }
    };

    results.into_iter().flatten().collect()
}

struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    fn new(hex: &[String]) -> Self {
        let colors: Vec<Color> = hex.iter().filter_map(|c| parse_color(c)).collect();
        Self { colors }
    }

    /// Colors cycle when there are more slices or series than entries.
    fn get(&self, index: usize) -> Color {
        if self.colors.is_empty() {
            rgb(FALLBACK_RGB)
        } else {
            self.colors[index % self.colors.len()]
        }
    }
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::from_rgba8(r, g, b, 0xFF)
}

fn parse_color(hex: &str) -> Option<Color> {
    let hex = ooxml_color(hex)?;
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(rgb([channel(0)?, channel(2)?, channel(4)?]))
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

fn fill_rect(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, color: Color) {
    if let Some(rect) = Rect::from_xywh(x, y, w, h) {
        pixmap.fill_rect(rect, &paint(color), Transform::identity(), None);
    }
}

fn stroke_line(pixmap: &mut Pixmap, points: &[(f32, f32)], width: f32, color: Color) {
    let Some(&(x0, y0)) = points.first() else {
        return;
    };
    let mut pb = PathBuilder::new();
    pb.move_to(x0, y0);
    for &(x, y) in &points[1..] {
        pb.line_to(x, y);
    }
    if let Some(path) = pb.finish() {
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
    }
}

/// Text drawing at the configured font sizes.
struct Labels<'a> {
    text: TextPainter,
    sizes: &'a ChartFontSizes,
}

impl Labels<'_> {
    /// Centered title; returns the band it occupies at the top.
    fn title(&self, pixmap: &mut Pixmap, title: &str) -> f32 {
        let title = title.trim();
        if title.is_empty() {
            return 0.0;
        }
        let size = self.text.px(self.sizes.title);
        let center = pixmap.width() as f32 / 2.0;
        self.text
            .draw(pixmap, title, (center, size * 1.4), self.sizes.title, Align::Center, rgb(TEXT_RGB))
            .map_or(0.0, |_| size * 2.0)
    }

    /// Category names centered below the x axis.
    fn categories(&self, pixmap: &mut Pixmap, names: &[String], xs: &[f32], bottom: f32) {
        let y = bottom + self.text.px(self.sizes.label) * 1.3;
        for (name, &x) in names.iter().zip(xs) {
            self.text
                .draw(pixmap, name, (x, y), self.sizes.label, Align::Center, rgb(TEXT_RGB));
        }
    }

    /// A value just above (or below, for negatives) the point `(x, y)`.
    fn value(&self, pixmap: &mut Pixmap, value: f64, (x, y): (f32, f32)) {
        let gap = self.text.px(self.sizes.value) * 0.4;
        let baseline = if value < 0.0 {
            y + self.text.px(self.sizes.value) + gap
        } else {
            y - gap
        };
        self.text.draw(
            pixmap,
            &format_value(value),
            (x, baseline),
            self.sizes.value,
            Align::Center,
            rgb(TEXT_RGB),
        );
    }
}

/// Color keys stacked at the right edge, each followed by its name.
fn draw_legend(pixmap: &mut Pixmap, names: &[String], palette: &Palette, labels: &Labels) {
    let w = pixmap.width() as f32;
    let h = pixmap.height() as f32;
    let size = labels.text.px(labels.sizes.legend).clamp(4.0, 48.0);
    let x = w * 0.8;
    let step = size * 1.6;
    let total = names.len() as f32 * step;
    let mut y = ((h - total) / 2.0).max(size);
    for (i, name) in names.iter().enumerate() {
        fill_rect(pixmap, x, y, size, size, palette.get(i));
        labels.text.draw(
            pixmap,
            name,
            (x + size * 1.4, y + size * 0.85),
            labels.sizes.legend,
            Align::Start,
            rgb(TEXT_RGB),
        );
        y += step;
    }
}

fn draw_pie(
    pixmap: &mut Pixmap,
    data: &ChartData,
    palette: &Palette,
    labels: &Labels,
    top: f32,
    threshold: f64,
) -> Result<()> {
    let values: Vec<f64> = match data {
        ChartData::Single(values) => values.values().map(|v| v.max(0.0)).collect(),
        ChartData::Multi(_) => {
            return Err(Error::Chart("pie charts take a single series".to_string()))
        }
    };
    let total: f64 = values.iter().sum();
    if values.is_empty() || total <= 0.0 {
        return Err(Error::Chart("pie values must not all be zero".to_string()));
    }

    let w = pixmap.width() as f32;
    let h = pixmap.height() as f32;
    let (cx, cy) = (w * 0.4, (h + top) / 2.0);
    let radius = (w * 0.3).min((h - top) * 0.4).max(1.0);
    let label_px = labels.text.px(labels.sizes.label);

    // Start at 12 o'clock, counterclockwise.
    let mut start = PI / 2.0;
    for (i, value) in values.iter().enumerate() {
        let share = (value / total) as f32;
        if share <= 0.0 {
            continue;
        }
        let sweep = share * 2.0 * PI;
        let point = |angle: f32, r: f32| (cx + r * angle.cos(), cy - r * angle.sin());

        let mut pb = PathBuilder::new();
        pb.move_to(cx, cy);
        let steps = ((sweep.to_degrees() / 2.0).ceil() as usize).max(1);
        for step in 0..=steps {
            let (x, y) = point(start + sweep * step as f32 / steps as f32, radius);
            pb.line_to(x, y);
        }
        pb.close();
        if let Some(path) = pb.finish() {
            pixmap.fill_path(&path, &paint(palette.get(i)), FillRule::Winding, Transform::identity(), None);
        }

        let mid = start + sweep / 2.0;
        let percent = format!("{:.0}%", f64::from(share) * 100.0);
        if f64::from(share) * 100.0 < threshold {
            let right = mid.cos() >= 0.0;
            let from = point(mid, radius * 0.95);
            let elbow = point(mid, radius * 1.15);
            let end = (elbow.0 + if right { 12.0 } else { -12.0 }, elbow.1);
            stroke_line(pixmap, &[from, elbow, end], 1.5, rgb(LEADER_RGB));

            let (x, align) = if right {
                (end.0 + 4.0, Align::Start)
            } else {
                (end.0 - 4.0, Align::End)
            };
            labels.text.draw(
                pixmap,
                &percent,
                (x, end.1 + label_px * 0.35),
                labels.sizes.label,
                align,
                rgb(TEXT_RGB),
            );
        } else {
            labels.text.draw_boxed(
                pixmap,
                &percent,
                point(mid, radius * 0.6),
                labels.sizes.label,
                Color::WHITE,
                Color::from_rgba8(0, 0, 0, 0xB3),
            );
        }
        start += sweep;
    }

    draw_legend(pixmap, &data.categories(), palette, labels);
    Ok(())
}

struct PlotArea {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    min: f64,
    max: f64,
}

impl PlotArea {
    fn new(pixmap: &Pixmap, series: &[(String, Vec<f64>)], title_band: f32) -> Result<Self> {
        let values = series.iter().flat_map(|(_, v)| v.iter().copied());
        let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if max - min <= 0.0 {
            return Err(Error::Chart("chart values must not all be zero".to_string()));
        }
        let w = pixmap.width() as f32;
        let h = pixmap.height() as f32;
        let top = (h * 0.08).max(title_band);
        let bottom = h * 0.86;
        Ok(Self {
            left: w * 0.12,
            top,
            width: w * 0.64,
            height: (bottom - top).max(1.0),
            min,
            max: max * 1.1,
        })
    }

    fn bottom(&self) -> f32 {
        self.top + self.height
    }

    fn y(&self, value: f64) -> f32 {
        let t = ((value - self.min) / (self.max - self.min)) as f32;
        self.top + self.height * (1.0 - t)
    }

    /// Axes with five labelled ticks on the value axis.
    fn draw_axes(&self, pixmap: &mut Pixmap, labels: &Labels) {
        let zero = self.y(0.0);
        let axis = rgb(AXIS_RGB);
        stroke_line(pixmap, &[(self.left, self.top), (self.left, self.bottom())], 1.5, axis);
        stroke_line(pixmap, &[(self.left, zero), (self.left + self.width, zero)], 1.5, axis);

        let px = labels.text.px(labels.sizes.y_axis);
        for i in 0..=4 {
            let value = self.min + (self.max - self.min) * f64::from(i) / 4.0;
            let y = self.y(value);
            stroke_line(pixmap, &[(self.left - 4.0, y), (self.left, y)], 1.0, axis);
            labels.text.draw(
                pixmap,
                &format_value(value),
                (self.left - 6.0, y + px * 0.35),
                labels.sizes.y_axis,
                Align::End,
                rgb(TEXT_RGB),
            );
        }
    }
}

fn draw_bars(
    pixmap: &mut Pixmap,
    data: &ChartData,
    palette: &Palette,
    labels: &Labels,
    top: f32,
) -> Result<()> {
    let series = data.series();
    let categories = data.categories();
    let area = PlotArea::new(pixmap, &series, top)?;

    let group = area.width / categories.len().max(1) as f32;
    let bar = group * 0.8 / series.len().max(1) as f32;
    let zero = area.y(0.0);

    for (s, (_, values)) in series.iter().enumerate() {
        // A single series cycles colors per bar, several series per series.
        for (c, value) in values.iter().enumerate() {
            let color = if series.len() == 1 { palette.get(c) } else { palette.get(s) };
            let x = area.left + group * c as f32 + group * 0.1 + bar * s as f32;
            let y = area.y(*value);
            fill_rect(pixmap, x, y.min(zero), bar * 0.9, (zero - y).abs(), color);
            labels.value(pixmap, *value, (x + bar * 0.45, y));
        }
    }

    area.draw_axes(pixmap, labels);
    let centers: Vec<f32> = (0..categories.len())
        .map(|c| area.left + group * (c as f32 + 0.5))
        .collect();
    labels.categories(pixmap, &categories, &centers, area.bottom());

    let keys = if series.len() == 1 {
        categories
    } else {
        series.into_iter().map(|(name, _)| name).collect()
    };
    draw_legend(pixmap, &keys, palette, labels);
    Ok(())
}

fn draw_lines(
    pixmap: &mut Pixmap,
    data: &ChartData,
    palette: &Palette,
    labels: &Labels,
    top: f32,
) -> Result<()> {
    let series = data.series();
    let categories = data.categories();
    let area = PlotArea::new(pixmap, &series, top)?;
    let step = if categories.len() > 1 {
        area.width / (categories.len() - 1) as f32
    } else {
        0.0
    };
    let marker = (pixmap.height() as f32 * 0.012).max(2.0);

    for (s, (_, values)) in series.iter().enumerate() {
        let points: Vec<(f32, f32)> = values
            .iter()
            .enumerate()
            .map(|(c, v)| (area.left + step * c as f32, area.y(*v)))
            .collect();
        let color = palette.get(s);
        stroke_line(pixmap, &points, 2.5, color);
        for (&(x, y), value) in points.iter().zip(values) {
            if let Some(dot) = PathBuilder::from_circle(x, y, marker) {
                pixmap.fill_path(&dot, &paint(color), FillRule::Winding, Transform::identity(), None);
            }
            labels.value(pixmap, *value, (x, y - marker));
        }
    }

    area.draw_axes(pixmap, labels);
    let xs: Vec<f32> = (0..categories.len())
        .map(|c| area.left + step * c as f32)
        .collect();
    labels.categories(pixmap, &categories, &xs, area.bottom());

    let names: Vec<String> = series.into_iter().map(|(name, _)| name).collect();
    draw_legend(pixmap, &names, palette, labels);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::parse_chart_specs;
    use tempfile::TempDir;

    fn spec(json: &str) -> ChartSpec {
        parse_chart_specs(json).unwrap().remove(0)
    }

    #[test]
    fn test_parse_color() {
        let color = parse_color("#FF8000").unwrap();
        assert_eq!(color.to_color_u8().red(), 0xFF);
        assert_eq!(color.to_color_u8().green(), 0x80);
        assert!(parse_color("nope").is_none());
    }

    #[test]
    fn test_pie_canvas_height_scales_with_slices() {
        let style = ChartStyle::default();
        let few = spec(r#"[{"type":"pie","position":"after:a","data":{"x":1}}]"#);
        let (w, h) = RasterChartRenderer::canvas_size(&few, &style);
        assert_eq!(w, cm_to_pixels(14.0, 150));
        assert_eq!(h, cm_to_pixels(8.0, 150));
    }

    #[test]
    fn test_render_each_chart_type() {
        let dir = TempDir::new().unwrap();
        let renderer = RasterChartRenderer::new();
        let style = ChartStyle::default();

        for json in [
            r#"[{"type":"pie","position":"after:a","data":{"x":1,"y":30,"z":69}}]"#,
            r#"[{"type":"bar","position":"after:a","data":{"x":1,"y":-2}}]"#,
            r#"[{"type":"line","position":"after:a","data":{"s1":{"q1":1,"q2":2},"s2":{"q1":3}}}]"#,
        ] {
            let path = renderer.render(&spec(json), &style, dir.path()).unwrap();
            let (w, _) = image::image_dimensions(&path).unwrap();
            assert_eq!(w, cm_to_pixels(style.width, style.dpi));
        }
    }

    #[test]
    fn test_title_and_labels_follow_font_sizes() {
        let bar = r#"[{"type":"bar","title":"Revenue","position":"after:a","data":{"q1":3,"q2":5}}]"#;
        let untitled = r#"[{"type":"bar","position":"after:a","data":{"q1":3,"q2":5}}]"#;
        let renderer = RasterChartRenderer::new();
        let style = ChartStyle::default();
        let mut large = ChartStyle::default();
        large.font_sizes.title = 28;
        large.font_sizes.label = 20;

        let plain = renderer.draw(&spec(untitled), &style).unwrap();
        let titled = renderer.draw(&spec(bar), &style).unwrap();
        let bigger = renderer.draw(&spec(bar), &large).unwrap();
        assert_eq!(plain.width(), titled.width());

        // Text needs a system font; shapes are drawn either way.
        if TextPainter::new(style.dpi).measure("Revenue", 14).is_some() {
            assert_ne!(plain.data(), titled.data());
            assert_ne!(titled.data(), bigger.data());
        }
    }

    #[test]
    fn test_pie_with_small_slice_and_large_labels() {
        let dir = TempDir::new().unwrap();
        let mut style = ChartStyle::default();
        style.font_sizes.label = 30;
        style.font_sizes.legend = 30;
        let pie = spec(r#"[{"type":"pie","title":"份额","position":"after:a","data":{"甲":97,"乙":3}}]"#);
        let path = RasterChartRenderer::new().render(&pie, &style, dir.path()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_zero_pie_is_error() {
        let dir = TempDir::new().unwrap();
        let zero = spec(r#"[{"type":"pie","position":"after:a","data":{"x":0,"y":0}}]"#);
        let result = RasterChartRenderer::new().render(&zero, &ChartStyle::default(), dir.path());
        assert!(matches!(result, Err(Error::Chart(_))));
    }

    #[test]
    fn test_render_charts_keeps_order_and_skips_failures() {
        let dir = TempDir::new().unwrap();
        let specs = parse_chart_specs(
            r#"[{"type":"pie","title":"one","position":"after:a","data":{"x":1}},
                {"type":"pie","title":"bad","position":"after:b","data":{"x":0}},
                {"type":"bar","title":"three","position":"before:c","data":{"x":2}}]"#,
        )
        .unwrap();

        let pending = render_charts(
            &specs,
            &RasterChartRenderer::new(),
            &ChartStyle::default(),
            dir.path(),
            4,
        );
        let titles: Vec<&str> = pending.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "three"]);
        assert!(pending.iter().all(|c| c.image.exists()));
    }
}
