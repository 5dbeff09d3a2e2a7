//! Migration of the flat `text_style` / `graph_style` schema.

use super::overlay::{coerce_bool, coerce_float, coerce_int};
use serde_json::{Map, Value};

/// Whether a mapping uses the legacy flat schema.
pub fn is_legacy(value: &Value) -> bool {
    value
        .as_object()
        .map(|m| m.contains_key("text_style") || m.contains_key("graph_style"))
        .unwrap_or(false)
}

#[derive(Clone, Copy)]
enum Kind {
    Str,
    Int,
    Float,
    Bool,
    /// Passed through unchanged (lists, nested mappings)
    Raw,
}

const BODY_KEYS: &[(&str, &[&str], Kind)] = &[
    ("font_family", &["body", "font", "family"], Kind::Str),
    ("font_size", &["body", "font", "size"], Kind::Int),
    ("font_color", &["body", "font", "color"], Kind::Str),
    ("line_spacing", &["body", "paragraph", "line_spacing"], Kind::Float),
    ("paper_size", &["page", "size"], Kind::Str),
];

const HEADING_SUFFIXES: &[(&str, &[&str], Kind)] = &[
    ("font_family", &["font", "family"], Kind::Str),
    ("font_size", &["font", "size"], Kind::Int),
    ("font_color", &["font", "color"], Kind::Str),
    ("bold", &["font", "bold"], Kind::Bool),
    ("line_spacing", &["paragraph", "line_spacing"], Kind::Float),
];

const CHART_KEYS: &[(&str, &str, Kind)] = &[
    ("chart_width", "width", Kind::Float),
    ("chart_insert_width", "insert_width", Kind::Float),
    ("chart_dpi", "dpi", Kind::Int),
    ("background_color", "background_color", Kind::Str),
    ("colors", "colors", Kind::Raw),
    ("font_sizes", "font_sizes", Kind::Raw),
    ("add_chart_title", "add_title", Kind::Bool),
    ("pie_threshold", "pie_threshold", Kind::Float),
];

const MARGINS: [&str; 4] = ["margin_top", "margin_bottom", "margin_left", "margin_right"];

/// Translate a legacy flat mapping into the nested schema.
///
/// Only keys present in the legacy mapping produce nested entries. A value
/// that cannot be coerced fails that field alone. Heading levels 1-3 read
/// `heading{N}_*` keys; levels 4-6 share the `heading_*` keys. Top-level
/// keys other than `text_style` / `graph_style` are carried over as-is.
pub fn migrate_legacy(value: &Value) -> Value {
    let Some(root) = value.as_object() else {
        return value.clone();
    };

    let mut out = Map::new();
    for (key, v) in root {
        if key != "text_style" && key != "graph_style" {
            out.insert(key.clone(), v.clone());
        }
    }

    if let Some(text) = root.get("text_style").and_then(Value::as_object) {
        for (key, path, kind) in BODY_KEYS {
            if let Some(v) = convert(text, key, *kind) {
                insert_path(&mut out, path, v);
            }
        }

        if let Some(v) = convert(text, "page_margins", Kind::Float) {
            for margin in MARGINS {
                insert_path(&mut out, &["page", margin], v.clone());
            }
        }

        for level in 1..=6u8 {
            let prefix = if level <= 3 {
                format!("heading{}_", level)
            } else {
                "heading_".to_string()
            };
            let h = format!("h{}", level);
            for (suffix, sub, kind) in HEADING_SUFFIXES {
                let key = format!("{}{}", prefix, suffix);
                if let Some(v) = convert(text, &key, *kind) {
                    let mut path = vec!["headings", h.as_str()];
                    path.extend_from_slice(sub);
                    insert_path(&mut out, &path, v);
                }
            }
        }
    }

    if let Some(graph) = root.get("graph_style").and_then(Value::as_object) {
        for (key, target, kind) in CHART_KEYS {
            if let Some(v) = convert(graph, key, *kind) {
                insert_path(&mut out, &["chart", *target], v);
            }
        }
    }

    Value::Object(out)
}

fn convert(map: &Map<String, Value>, key: &str, kind: Kind) -> Option<Value> {
    let raw = map.get(key).filter(|v| !v.is_null())?;
    let converted = match kind {
        Kind::Str => raw.as_str().map(|s| Value::from(s.trim())),
        Kind::Int => coerce_int(raw).map(Value::from),
        Kind::Float => coerce_float(raw).map(Value::from),
        Kind::Bool => coerce_bool(raw).map(Value::from),
        Kind::Raw => Some(raw.clone()),
    };
    if converted.is_none() {
        log::warn!("legacy config: skipping '{}' with unusable value {}", key, raw);
    }
    converted
}

fn insert_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = root;
    for key in parents {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(last.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_legacy() {
        assert!(is_legacy(&json!({"text_style": {}})));
        assert!(is_legacy(&json!({"graph_style": {}})));
        assert!(!is_legacy(&json!({"body": {}})));
        assert!(!is_legacy(&json!("text_style")));
    }

    #[test]
    fn test_string_values_are_coerced() {
        let nested = migrate_legacy(&json!({
            "text_style": {"font_size": "16", "heading2_bold": "true"}
        }));
        assert_eq!(nested["body"]["font"]["size"], json!(16));
        assert_eq!(nested["headings"]["h2"]["font"]["bold"], json!(true));
    }

    #[test]
    fn test_absent_keys_stay_absent() {
        let nested = migrate_legacy(&json!({"text_style": {"heading2_font_size": 16}}));
        assert_eq!(nested["headings"]["h2"]["font"]["size"], json!(16));
        assert!(nested["headings"]["h2"]["font"].get("family").is_none());
        assert!(nested.get("body").is_none());
        assert!(nested["headings"].get("h1").is_none());
    }

    #[test]
    fn test_shared_prefix_for_lower_levels() {
        let nested = migrate_legacy(&json!({
            "text_style": {"heading_font_family": "楷体", "heading3_font_family": "仿宋"}
        }));
        assert_eq!(nested["headings"]["h3"]["font"]["family"], json!("仿宋"));
        for h in ["h4", "h5", "h6"] {
            assert_eq!(nested["headings"][h]["font"]["family"], json!("楷体"));
        }
    }

    #[test]
    fn test_page_margins_fan_out() {
        let nested = migrate_legacy(&json!({"text_style": {"page_margins": "2"}}));
        for margin in MARGINS {
            assert_eq!(nested["page"][margin], json!(2.0));
        }
    }

    #[test]
    fn test_malformed_field_skipped_alone() {
        let nested = migrate_legacy(&json!({
            "text_style": {"font_size": "big", "font_family": "黑体"}
        }));
        assert!(nested["body"]["font"].get("size").is_none());
        assert_eq!(nested["body"]["font"]["family"], json!("黑体"));
    }

    #[test]
    fn test_graph_style() {
        let nested = migrate_legacy(&json!({
            "graph_style": {
                "chart_width": "12",
                "chart_dpi": 300.0,
                "add_chart_title": 1,
                "colors": ["#000000"]
            }
        }));
        assert_eq!(nested["chart"]["width"], json!(12.0));
        assert_eq!(nested["chart"]["dpi"], json!(300));
        assert_eq!(nested["chart"]["add_title"], json!(true));
        assert_eq!(nested["chart"]["colors"], json!(["#000000"]));
    }
}
