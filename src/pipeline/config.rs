use crate::error::ConfigError;
use crate::layout::LayoutConfig;
use crate::parser::ParseOptions;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Tunables for one [`Pipeline`](super::Pipeline).
///
/// Every field has a default, so an empty TOML document is a valid config:
///
/// ```toml
/// [parser]
/// max_document_bytes = 4194304
///
/// [layout]
/// column_width = 180.0
/// row_height = 110.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub parser: ParseOptions,
    pub layout: LayoutConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Environment variables take precedence over file values. Values that do
    /// not parse are ignored.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(bytes) = env_parse::<usize>("FLOWBRIDGE_MAX_DOCUMENT_BYTES") {
            self.parser.max_document_bytes = bytes;
        }
        if let Some(width) = env_parse::<f64>("FLOWBRIDGE_COLUMN_WIDTH") {
            self.layout.column_width = width;
        }
        if let Some(height) = env_parse::<f64>("FLOWBRIDGE_ROW_HEIGHT") {
            self.layout.row_height = height;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parser.max_document_bytes == 0 {
            return Err(ConfigError::Invalid(
                "parser.max_document_bytes must be positive".to_string(),
            ));
        }
        self.layout
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("layout: {}", e)))
    }

    /// Documentation for the supported environment variables.
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "FLOWBRIDGE_MAX_DOCUMENT_BYTES - Override the parser's document size limit (default: 8388608)",
            "FLOWBRIDGE_COLUMN_WIDTH - Override the layout column width (default: 160)",
            "FLOWBRIDGE_ROW_HEIGHT - Override the layout row height (default: 100)",
        ]
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(PipelineConfig::from_toml_str("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = PipelineConfig::from_toml_str("[layout]\ncolumn_width = 200.0\n").unwrap();
        assert_eq!(config.layout.column_width, 200.0);
        assert_eq!(config.layout.row_height, LayoutConfig::default().row_height);
        assert_eq!(config.parser, ParseOptions::default());
    }

    #[test]
    fn test_too_narrow_columns_are_rejected() {
        let err = PipelineConfig::from_toml_str("[layout]\ncolumn_width = 50.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
