//! Configuration for the mapping compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (mapper.toml)
//! - Environment variables (MAPPER__*)
//!
//! ## Example config file (mapper.toml):
//! ```toml
//! [compiler]
//! hoist_shared = true
//! min_hoist_cost = 2
//!
//! [output]
//! format = "pretty"
//! include_diagnostics = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::compiler::CompilerOptions;

/// File names searched in the working directory, lowest priority first
const CONFIG_LOCATIONS: [&str; 3] = ["mapper.toml", ".mapper.toml", "config/mapper.toml"];

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Hoisting settings
    #[serde(default)]
    pub compiler: CompilerOptions,

    /// How compiled output is written
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Write diagnostics and unbuilt nodes next to the IR
    #[serde(default)]
    pub include_diagnostics: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pretty,
            include_diagnostics: false,
        }
    }
}

impl OutputFormat {
    /// Serialize a value in this format
    pub fn render<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self {
            Self::Pretty => serde_json::to_string_pretty(value),
            Self::Compact => serde_json::to_string(value),
        }
    }
}

impl MapperConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in CONFIG_LOCATIONS {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(dirs) = directories::ProjectDirs::from("dev", "schema-mapper", "mapper") {
            let xdg_config = dirs.config_dir().join("mapper.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // MAPPER__COMPILER__MIN_HOIST_COST=3
        builder = builder.add_source(
            Environment::with_prefix("MAPPER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MapperConfig::default();
        assert!(config.compiler.hoist_shared);
        assert_eq!(config.compiler.min_hoist_cost, 2);
        assert_eq!(config.output.format, OutputFormat::Pretty);
        assert!(!config.output.include_diagnostics);
    }

    #[test]
    fn test_serialize_config() {
        let config = MapperConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[compiler]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("format = \"pretty\""));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");

        let mut config = MapperConfig::default();
        config.compiler.min_hoist_cost = 6;
        config.output.format = OutputFormat::Compact;
        config.save(&path).unwrap();

        let loaded = MapperConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.compiler.min_hoist_cost, 6);
        assert_eq!(loaded.output.format, OutputFormat::Compact);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[output]\ninclude_diagnostics = true\n").unwrap();

        let loaded = MapperConfig::load_from(Some(&path)).unwrap();
        assert!(loaded.output.include_diagnostics);
        assert!(loaded.compiler.hoist_shared);
        assert_eq!(loaded.compiler.min_hoist_cost, 2);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MapperConfig::load_from(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_render_formats() {
        let value = serde_json::json!({ "a": 1 });
        assert_eq!(OutputFormat::Compact.render(&value).unwrap(), "{\"a\":1}");
        assert!(OutputFormat::Pretty.render(&value).unwrap().contains('\n'));
    }
}
