//! Integration tests for layered configuration and the shipped config files.

use mdocx::config::{Alignment, ConfigLoader, StyleConfig};
use mdocx::style::{resolve, ElementKind, LineSpacing};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_shipped_themes_listed() {
    let loader = ConfigLoader::new(shipped_config_dir());
    assert_eq!(loader.list_themes(), vec!["academic", "business"]);
}

#[test]
fn test_shipped_system_file_parses() {
    let loader = ConfigLoader::new(shipped_config_dir());
    let config = loader.load(None, None);

    assert!(config.validate().is_empty());
    assert_eq!(config.body.paragraph.alignment, Alignment::Justify);
    assert_eq!(config.headings.get(1).font.size, 22);
    assert_eq!(config.headings.get(1).paragraph.alignment, Alignment::Center);
    assert_eq!(config.list_indent, 1.27);
}

#[test]
fn test_academic_theme() {
    let config = ConfigLoader::new(shipped_config_dir()).load(Some("academic"), None);

    assert_eq!(config.body.font.family, "Times New Roman");
    assert_eq!(config.body.font.size, 12);
    assert_eq!(
        LineSpacing::classify(config.body.paragraph.line_spacing),
        LineSpacing::Multiple(2.0)
    );
    assert_eq!(config.quote.background_color, None);
    assert_eq!(config.table.alternate_row_color, None);
    assert_eq!(config.headings.get(4).font.family, "Times New Roman");
}

#[test]
fn test_business_theme() {
    let config = ConfigLoader::new(shipped_config_dir()).load(Some("business"), None);

    assert_eq!(config.body.font.family, "Calibri");
    assert_eq!(config.headings.get(3).font.color, "#2F5597");
    assert_eq!(config.chart.colors[0], "#2F5597");
    assert_eq!(config.chart.colors.len(), 6);
}

#[test]
fn test_request_json_beats_theme() {
    let request = r#"{"body": {"font": {"size": 15}}, "enable_page_numbers": false}"#;
    let config = ConfigLoader::new(shipped_config_dir()).load(Some("business"), Some(request));

    assert_eq!(config.body.font.size, 15);
    assert_eq!(config.body.font.family, "Calibri");
    assert!(!config.enable_page_numbers);
}

#[test]
fn test_legacy_request_json_is_migrated() {
    let request = r#"{"text_style": {"font_size": "16", "heading2_bold": "true"}}"#;
    let config = ConfigLoader::load_layers(None, None, Some(request));

    assert_eq!(config.body.font.size, 16);
    let h2 = config.headings.level(2).expect("h2 override");
    assert!(h2.font.bold);
}

#[test]
fn test_legacy_yaml_layer_is_migrated() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("style.yaml"),
        "text_style:\n  font_family: Arial\n  line_spacing: '1.5'\n",
    )
    .unwrap();

    let config = ConfigLoader::new(dir.path()).load(None, None);
    assert_eq!(config.body.font.family, "Arial");
    assert_eq!(config.body.paragraph.line_spacing, 1.5);
    assert_eq!(config.body.font.size, StyleConfig::default().body.font.size);
}

#[test]
fn test_overlay_application_is_idempotent() {
    let mapping = json!({
        "body": {"font": {"size": 11}},
        "headings": {"h2": {"font": {"color": "#123456"}}},
        "table": {"header_background": "#000000"}
    });
    let once = StyleConfig::default().with_overlay(&mapping);
    let twice = once.clone().with_overlay(&mapping);
    assert_eq!(once, twice);
}

#[test]
fn test_heading_inherits_default() {
    let config = StyleConfig::default().with_overlay(&json!({
        "headings": {
            "default": {"font": {"family": "Georgia"}},
            "h4": {"font": {"size": 13}}
        }
    }));

    let h4 = resolve(ElementKind::Heading(4), &config);
    assert_eq!(h4.font.family, "Georgia");
    assert_eq!(h4.font.size, 13);
    assert!(h4.font.bold);
}

#[test]
fn test_effective_config_yaml_round_trip() {
    let config = ConfigLoader::new(shipped_config_dir()).load(Some("academic"), None);
    let yaml = config.to_yaml().unwrap();
    let parsed: StyleConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, config);
}
