//! Layered configuration loading.

use super::{is_legacy, migrate_legacy, StyleConfig};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Theme name that means "no theme layer".
pub const DEFAULT_THEME: &str = "default";

/// Loads a [`StyleConfig`] from built-in defaults, the system file, a named
/// theme, and request JSON, in that order of increasing priority.
///
/// A layer that is missing or fails to parse is logged and contributes
/// nothing; conversion always gets a usable configuration.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at a configuration directory containing
    /// `style.yaml` and `themes/`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// The configuration directory.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the system-wide style file.
    pub fn system_file(&self) -> PathBuf {
        self.config_dir.join("style.yaml")
    }

    /// Directory holding theme files.
    pub fn themes_dir(&self) -> PathBuf {
        self.config_dir.join("themes")
    }

    /// Path of a named theme file.
    pub fn theme_file(&self, name: &str) -> PathBuf {
        self.themes_dir().join(format!("{}.yaml", name))
    }

    /// Names of the themes available under `themes/`, sorted.
    pub fn list_themes(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.themes_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Build the effective configuration.
    ///
    /// `theme` of `None`, `""`, or `"default"` skips the theme layer. A
    /// missing system file is not an error.
    pub fn load(&self, theme: Option<&str>, request_json: Option<&str>) -> StyleConfig {
        let system = self.system_file();
        let system = system.exists().then_some(system);

        let theme_file = theme
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != DEFAULT_THEME)
            .map(|t| {
                let path = self.theme_file(t);
                if !path.exists() {
                    log::warn!("theme '{}' not found at {}", t, path.display());
                }
                path
            });

        Self::load_layers(system.as_deref(), theme_file.as_deref(), request_json)
    }

    /// Apply explicit layers onto the built-in defaults.
    pub fn load_layers(
        system_file: Option<&Path>,
        theme_file: Option<&Path>,
        request_json: Option<&str>,
    ) -> StyleConfig {
        let mut config = StyleConfig::default();

        for path in [system_file, theme_file].into_iter().flatten() {
            if let Some(layer) = read_yaml_layer(path) {
                log::debug!("applying config layer {}", path.display());
                config.apply(&layer);
            }
        }

        if let Some(raw) = request_json {
            if let Some(layer) = parse_request_json(raw) {
                log::debug!("applying request config layer");
                config.apply(&layer);
            }
        }

        for problem in config.validate() {
            log::warn!("style config: {}", problem);
        }
        config
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new("config")
    }
}

/// Read a YAML file into a nested mapping, migrating legacy keys.
fn read_yaml_layer(path: &Path) -> Option<Value> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("cannot read config file {}: {}", path.display(), e);
            return None;
        }
    };
    if text.trim().is_empty() {
        return None;
    }
    match serde_yaml::from_str::<Value>(&text) {
        Ok(value) => Some(normalize_layer(value)),
        Err(e) => {
            log::warn!("invalid YAML in {}: {}", path.display(), e);
            None
        }
    }
}

/// Parse request-level JSON, tolerating escaped newlines/tabs, non-breaking
/// spaces, and the legacy flat schema.
pub(crate) fn parse_request_json(raw: &str) -> Option<Value> {
    let cleaned = raw
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace('\u{a0}', " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => Some(normalize_layer(value)),
        Err(e) => {
            log::warn!("invalid style JSON: {}", e);
            None
        }
    }
}

fn normalize_layer(value: Value) -> Value {
    if is_legacy(&value) {
        log::debug!("migrating legacy style schema");
        migrate_legacy(&value)
    } else {
        value
    }
}
