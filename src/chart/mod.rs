//! Data charts: specifications, rendering and anchored placement.
//!
//! Chart specifications arrive as JSON produced by an external recognizer.
//! Each one names the paragraph it belongs to (`after:<text>` or
//! `before:<text>`). Charts are rendered to PNG files up front, queued in
//! [`PendingCharts`], and placed by the layout engine as it meets matching
//! paragraphs.

mod placement;
mod renderer;
mod text;

pub use placement::{match_anchor, segments, MatchKind, PendingChart, PendingCharts};
pub use renderer::{render_charts, ChartRenderer, RasterChartRenderer};
pub use text::{Align, TextPainter};

use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Chart kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Pie,
    Bar,
    Line,
}

/// Chart values: one series of `label -> value`, or named series of
/// `category -> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartData {
    Single(IndexMap<String, f64>),
    Multi(IndexMap<String, IndexMap<String, f64>>),
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Single(values) => values.is_empty(),
            ChartData::Multi(series) => series.values().all(IndexMap::is_empty),
        }
    }

    /// Category labels in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        match self {
            ChartData::Single(values) => values.keys().cloned().collect(),
            ChartData::Multi(series) => {
                let seen: IndexSet<&String> = series.values().flat_map(IndexMap::keys).collect();
                seen.into_iter().cloned().collect()
            }
        }
    }

    /// Series as `(name, values per category)`; categories a series lacks
    /// read as 0. A single series is named after nothing.
    pub fn series(&self) -> Vec<(String, Vec<f64>)> {
        let categories = self.categories();
        match self {
            ChartData::Single(values) => vec![(String::new(), values.values().copied().collect())],
            ChartData::Multi(series) => series
                .iter()
                .map(|(name, values)| {
                    let row = categories
                        .iter()
                        .map(|c| values.get(c).copied().unwrap_or(0.0))
                        .collect();
                    (name.clone(), row)
                })
                .collect(),
        }
    }

    fn all_finite(&self) -> bool {
        match self {
            ChartData::Single(values) => values.values().all(|v| v.is_finite()),
            ChartData::Multi(series) => series
                .values()
                .all(|values| values.values().all(|v| v.is_finite())),
        }
    }
}

/// Which side of the anchor paragraph a chart goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    After,
    Before,
}

/// Parsed `position` of a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub mode: AnchorMode,
    /// Paragraph text to look for
    pub text: String,
}

impl Anchor {
    /// Parse `after:<text>` or `before:<text>`. The text is trimmed and must
    /// not be empty.
    pub fn parse(position: &str) -> Option<Self> {
        let position = position.trim();
        let (mode, rest) = if let Some(rest) = position.strip_prefix("after:") {
            (AnchorMode::After, rest)
        } else if let Some(rest) = position.strip_prefix("before:") {
            (AnchorMode::Before, rest)
        } else {
            return None;
        };

        let text = rest.trim();
        if text.is_empty() {
            return None;
        }
        Some(Anchor {
            mode,
            text: text.to_string(),
        })
    }
}

/// One chart to render and place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,

    #[serde(default)]
    pub title: String,

    /// `after:<paragraph text>` or `before:<paragraph text>`
    pub position: String,

    pub data: ChartData,
}

impl ChartSpec {
    /// The parsed anchor, or a chart error for a malformed position.
    pub fn anchor(&self) -> Result<Anchor> {
        Anchor::parse(&self.position).ok_or_else(|| {
            Error::Chart(format!(
                "position must be \"after:<text>\" or \"before:<text>\", got {:?}",
                self.position
            ))
        })
    }

    /// Check position and data.
    pub fn validate(&self) -> Result<()> {
        self.anchor()?;
        if self.data.is_empty() {
            return Err(Error::Chart(format!("chart {:?} has no data", self.title)));
        }
        if !self.data.all_finite() {
            return Err(Error::Chart(format!(
                "chart {:?} has non-finite values",
                self.title
            )));
        }
        Ok(())
    }
}

/// Parse recognizer output into chart specifications.
///
/// A surrounding ```` ```json ```` (or bare ```` ``` ````) fence is removed.
/// The payload may be `{"charts": [...]}` or a bare array. Elements are
/// checked one by one; invalid elements are logged and skipped. Only a
/// payload that is not JSON of either shape is an error.
pub fn parse_chart_specs(raw: &str) -> Result<Vec<ChartSpec>> {
    let text = strip_fence(raw.trim());
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::Chart(format!("chart JSON is invalid: {}", e)))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("charts") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(Error::Chart(
                    "chart JSON must hold a \"charts\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(Error::Chart(
                "chart JSON must be an object or an array".to_string(),
            ))
        }
    };

    let mut specs = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let spec = match serde_json::from_value::<ChartSpec>(item) {
            Ok(spec) => spec,
            Err(e) => {
                log::warn!("Skipping chart #{}: {}", index, e);
                continue;
            }
        };
        match spec.validate() {
            Ok(()) => specs.push(spec),
            Err(e) => log::warn!("Skipping chart #{}: {}", index, e),
        }
    }
    Ok(specs)
}

fn strip_fence(text: &str) -> &str {
    let (open, skip) = if let Some(i) = text.find("```json") {
        (i, "```json".len())
    } else if let Some(i) = text.find("```") {
        (i, "```".len())
    } else {
        return text;
    };

    let body = &text[open + skip..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_parse() {
        let anchor = Anchor::parse("after: 市场份额如下。").unwrap();
        assert_eq!(anchor.mode, AnchorMode::After);
        assert_eq!(anchor.text, "市场份额如下。");

        assert_eq!(Anchor::parse("before:x").unwrap().mode, AnchorMode::Before);
        assert!(Anchor::parse("after:   ").is_none());
        assert!(Anchor::parse("near:x").is_none());
    }

    #[test]
    fn test_parse_wrapped_object_in_fence() {
        let raw = "Here you go:\n```json\n{\"charts\": [{\"type\": \"pie\", \"title\": \"份额\", \
                   \"position\": \"after:X\", \"data\": {\"B\": 40, \"A\": 60}}]}\n```";
        let specs = parse_chart_specs(raw).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].chart_type, ChartType::Pie);
        // Source order is kept.
        assert_eq!(specs[0].data.categories(), vec!["B", "A"]);
    }

    #[test]
    fn test_parse_bare_array_and_multi_series() {
        let raw = r#"[{"type": "bar", "title": "t", "position": "before:Y",
                      "data": {"2023": {"Q1": 1, "Q2": 2}, "2024": {"Q2": 3, "Q3": 4}}}]"#;
        let specs = parse_chart_specs(raw).unwrap();
        assert_eq!(specs.len(), 1);

        let data = &specs[0].data;
        assert_eq!(data.categories(), vec!["Q1", "Q2", "Q3"]);
        assert_eq!(
            data.series(),
            vec![
                ("2023".to_string(), vec![1.0, 2.0, 0.0]),
                ("2024".to_string(), vec![0.0, 3.0, 4.0]),
            ]
        );
    }

    #[test]
    fn test_invalid_elements_skipped() {
        let raw = r#"{"charts": [
            {"type": "pie", "title": "ok", "position": "after:A", "data": {"x": 1}},
            {"type": "pie", "title": "bad position", "position": "A", "data": {"x": 1}},
            {"type": "pie", "title": "empty", "position": "after:A", "data": {}},
            {"type": "radar", "title": "unknown", "position": "after:A", "data": {"x": 1}}
        ]}"#;
        let specs = parse_chart_specs(raw).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].title, "ok");
    }

    #[test]
    fn test_malformed_payload_is_error() {
        assert!(parse_chart_specs("not json").is_err());
        assert!(parse_chart_specs(r#"{"items": []}"#).is_err());
        assert!(parse_chart_specs("  ").unwrap().is_empty());
    }
}
