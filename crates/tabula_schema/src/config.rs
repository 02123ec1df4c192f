//! Details configuration
//!
//! Read from the `[display]`, `[export]` and `[import]` sections of
//! `~/.tabula/config.toml`. Every key is optional.

use crate::defaults::*;
use crate::delimited::DelimitedFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailsConfig {
    #[serde(default)]
    pub display: DisplayOptions,

    #[serde(default)]
    pub export: ExportOptions,

    #[serde(default)]
    pub import: ImportOptions,
}

impl DetailsConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from a TOML file, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Separators used by the record projections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    #[serde(default = "default_key_separator")]
    pub key_separator: String,

    #[serde(default = "default_label_separator")]
    pub label_separator: String,

    #[serde(default = "default_record_separator")]
    pub record_separator: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            key_separator: default_key_separator(),
            label_separator: default_label_separator(),
            record_separator: default_record_separator(),
        }
    }
}

/// Value-to-text export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Quote every comma-separated cell; when off, only cells that need it
    #[serde(default = "default_quote_text")]
    pub quote_text: bool,

    /// strftime patterns for date-time, date-only and time-only values
    #[serde(default = "default_date_time_format")]
    pub date_time_format: String,

    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default = "default_time_format")]
    pub time_format: String,

    #[serde(default = "default_tab_replacement")]
    pub tab_replacement: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            quote_text: default_quote_text(),
            date_time_format: default_date_time_format(),
            date_format: default_date_format(),
            time_format: default_time_format(),
            tab_replacement: default_tab_replacement(),
        }
    }
}

/// Text-to-table import settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// First row holds column names
    #[serde(default)]
    pub has_header: bool,

    #[serde(default)]
    pub format: DelimitedFormat,
}

fn default_key_separator() -> String {
    DEFAULT_KEY_SEPARATOR.to_string()
}

fn default_label_separator() -> String {
    DEFAULT_LABEL_SEPARATOR.to_string()
}

fn default_record_separator() -> String {
    DEFAULT_RECORD_SEPARATOR.to_string()
}

fn default_quote_text() -> bool {
    true
}

fn default_date_time_format() -> String {
    DEFAULT_EXPORT_DATE_TIME_FORMAT.to_string()
}

fn default_date_format() -> String {
    DEFAULT_EXPORT_DATE_FORMAT.to_string()
}

fn default_time_format() -> String {
    DEFAULT_EXPORT_TIME_FORMAT.to_string()
}

fn default_tab_replacement() -> String {
    DEFAULT_TAB_REPLACEMENT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DetailsConfig::from_toml_str("").unwrap();
        assert_eq!(config, DetailsConfig::default());
        assert_eq!(config.display.key_separator, DEFAULT_KEY_SEPARATOR);
        assert_eq!(config.export.date_format, "%Y-%m-%d");
        assert!(config.export.quote_text);
        assert!(!config.import.has_header);
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
[display]
label_separator = " / "

[export]
quote_text = false
date_format = "%d.%m.%Y"

[import]
has_header = true
format = "tsv"
"#;
        let config = DetailsConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.display.label_separator, " / ");
        assert_eq!(config.display.key_separator, DEFAULT_KEY_SEPARATOR);
        assert!(!config.export.quote_text);
        assert_eq!(config.export.date_format, "%d.%m.%Y");
        assert_eq!(config.export.time_format, DEFAULT_EXPORT_TIME_FORMAT);
        assert!(config.import.has_header);
        assert_eq!(config.import.format, DelimitedFormat::Tab);
    }

    #[test]
    fn test_invalid_toml() {
        let err = DetailsConfig::from_toml_str("[display\nkey_separator=").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert_eq!(
            DetailsConfig::load_or_default(&path).unwrap(),
            DetailsConfig::default()
        );

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[export]\ntab_replacement = \" \"").unwrap();
        let config = DetailsConfig::load_or_default(&path).unwrap();
        assert_eq!(config.export.tab_replacement, " ");
        assert!(DetailsConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
