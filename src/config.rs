//! Configuration management for the schema compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (typeschema.toml)
//! - Environment variables (TYPESCHEMA__*)
//!
//! ## Example config file (typeschema.toml):
//! ```toml
//! field_visibility = "protected"
//!
//! [naming]
//! generic_separator = "_"
//! inner_class_separator = "."
//! duplicate_resolution = "error"
//!
//! [[decorators]]
//! package = "com.acme.billing"
//! prefix = "Billing"
//!
//! [[custom_schemas]]
//! type = "org.joda.money.Money"
//! replacement = "com.acme.MoneyView"
//!
//! [json_view]
//! default_inclusion = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Visibility;

/// Main configuration for a compilation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Least visible field level still exposed as a property
    #[serde(default)]
    pub field_visibility: Visibility,

    /// Media types that carry streams natively (no array wrapping)
    #[serde(default = "default_stream_media_types")]
    pub stream_media_types: Vec<String>,

    /// Schema naming settings
    #[serde(default)]
    pub naming: NamingConfig,

    /// View filtering settings
    #[serde(default)]
    pub json_view: JsonViewConfig,

    /// Per-package name decorations
    #[serde(default)]
    pub decorators: Vec<PackageDecorator>,

    /// Type substitution table
    #[serde(default)]
    pub custom_schemas: Vec<CustomSchema>,
}

/// Naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Token placed around generic arguments in mangled names
    #[serde(default = "default_generic_separator")]
    pub generic_separator: String,

    /// Token replacing nested-type markers and joining generic arguments
    #[serde(default = "default_inner_class_separator")]
    pub inner_class_separator: String,

    /// Drop both separators entirely
    #[serde(default)]
    pub empty_separators: bool,

    /// What to do when two origins compete for one name
    #[serde(default)]
    pub duplicate_resolution: DuplicateResolution,
}

/// Duplicate schema name policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateResolution {
    /// Append a numeric suffix
    #[default]
    Auto,
    /// Fail the pass
    Error,
}

/// Prefix/postfix applied to every schema name of one package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDecorator {
    pub package: String,

    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub postfix: Option<String>,
}

/// One entry of the type substitution table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomSchema {
    /// Qualified name, optionally with generic arguments (`a.Box<b.Item>`)
    #[serde(rename = "type")]
    pub type_name: String,

    /// Type reference compiled instead
    pub replacement: String,
}

/// View filtering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonViewConfig {
    /// Whether members without any view are included when a view is active
    #[serde(default = "default_true")]
    pub default_inclusion: bool,
}

// Default value functions
fn default_generic_separator() -> String {
    "_".to_string()
}

fn default_inner_class_separator() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

fn default_stream_media_types() -> Vec<String> {
    vec![
        "text/event-stream".to_string(),
        "application/x-json-stream".to_string(),
    ]
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            generic_separator: default_generic_separator(),
            inner_class_separator: default_inner_class_separator(),
            empty_separators: false,
            duplicate_resolution: DuplicateResolution::Auto,
        }
    }
}

impl Default for JsonViewConfig {
    fn default() -> Self {
        Self {
            default_inclusion: true,
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            field_visibility: Visibility::default(),
            stream_media_types: default_stream_media_types(),
            naming: NamingConfig::default(),
            json_view: JsonViewConfig::default(),
            decorators: Vec::new(),
            custom_schemas: Vec::new(),
        }
    }
}

impl NamingConfig {
    /// Effective generic separator
    pub fn generic_separator(&self) -> &str {
        if self.empty_separators {
            ""
        } else {
            &self.generic_separator
        }
    }

    /// Effective inner-class separator
    pub fn inner_class_separator(&self) -> &str {
        if self.empty_separators {
            ""
        } else {
            &self.inner_class_separator
        }
    }
}

impl CompilerConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "typeschema.toml",
            ".typeschema.toml",
            "config/typeschema.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "typeschema", "typeschema") {
            let xdg_config = config_dir.config_dir().join("typeschema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // TYPESCHEMA__NAMING__GENERIC_SEPARATOR=-
        builder = builder.add_source(
            Environment::with_prefix("TYPESCHEMA")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Decorator configured for a package, if any
    pub fn decorator_for(&self, package: &str) -> Option<&PackageDecorator> {
        self.decorators.iter().find(|d| d.package == package)
    }

    /// Replacement configured for a substitution key
    pub fn custom_schema(&self, key: &str) -> Option<&str> {
        self.custom_schemas
            .iter()
            .find(|c| c.type_name == key)
            .map(|c| c.replacement.as_str())
    }

    /// Whether a media type already conveys a stream of items
    pub fn is_stream_media_type(&self, media_type: &str) -> bool {
        self.stream_media_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(media_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.naming.generic_separator(), "_");
        assert_eq!(config.naming.inner_class_separator(), ".");
        assert_eq!(config.naming.duplicate_resolution, DuplicateResolution::Auto);
        assert_eq!(config.field_visibility, Visibility::Public);
        assert!(config.json_view.default_inclusion);
        assert!(config.is_stream_media_type("text/event-stream"));
        assert!(!config.is_stream_media_type("application/json"));
    }

    #[test]
    fn test_empty_separators() {
        let naming = NamingConfig {
            empty_separators: true,
            ..NamingConfig::default()
        };
        assert_eq!(naming.generic_separator(), "");
        assert_eq!(naming.inner_class_separator(), "");
    }

    #[test]
    fn test_serialize_config() {
        let config = CompilerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[naming]"));
        assert!(toml_str.contains("[json_view]"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
field_visibility = "private"

[naming]
generic_separator = "Of"
duplicate_resolution = "error"

[[decorators]]
package = "com.acme.billing"
prefix = "Billing"

[[custom_schemas]]
type = "org.joda.money.Money"
replacement = "com.acme.MoneyView"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = CompilerConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.naming.generic_separator(), "Of");
        assert_eq!(config.naming.inner_class_separator(), ".");
        assert_eq!(config.naming.duplicate_resolution, DuplicateResolution::Error);
        assert_eq!(config.field_visibility, Visibility::Private);
        assert_eq!(
            config.decorator_for("com.acme.billing").and_then(|d| d.prefix.as_deref()),
            Some("Billing")
        );
        assert_eq!(config.custom_schema("org.joda.money.Money"), Some("com.acme.MoneyView"));
        assert!(config.custom_schema("org.joda.money.CurrencyUnit").is_none());
    }

    #[test]
    fn test_save_round_trips_naming() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typeschema.toml");
        let path = path.to_str().unwrap();

        let mut config = CompilerConfig::default();
        config.naming.generic_separator = "__".to_string();
        config.save(path).unwrap();

        let loaded = CompilerConfig::load_from(Some(path)).unwrap();
        assert_eq!(loaded.naming.generic_separator(), "__");
    }
}
