//! Policy configuration for the consistency engine
//!
//! The engine itself never reads files or the environment; callers build an
//! [`EngineConfig`] (usually `EngineConfig::default()`) and hand it over.
//! For orchestrators that want file-based overrides, [`EngineConfig::load`]
//! layers:
//! - Default values
//! - Config file (schema-doctor.toml)
//! - Environment variables (SCHEMA_DOCTOR__*)
//!
//! ## Example config file (schema-doctor.toml):
//! ```toml
//! [validation]
//! enum_suffix = "Enum"
//! suggest_similar = true
//!
//! [repair]
//! catalog_min_references = 3
//!
//! [repair.identifier]
//! name = "id"
//! min_references = 1
//!
//! [dedupe]
//! indent_width = 2
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration for the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Integrity validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Auto-repair policy
    #[serde(default)]
    pub repair: RepairConfig,

    /// Duplicate symbol resolution settings
    #[serde(default)]
    pub dedupe: DedupeConfig,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Scalar range keywords that never need a declaration
    #[serde(default = "default_builtin_types")]
    pub builtin_types: Vec<String>,

    /// Naming convention that marks a range as an enum reference
    #[serde(default = "default_enum_suffix")]
    pub enum_suffix: String,

    /// Append "did you mean" hints to undefined-reference messages
    #[serde(default = "default_true")]
    pub suggest_similar: bool,
}

/// Auto-repair policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Distinct referencing classes needed before a catalog slot is added
    #[serde(default = "default_catalog_min_references")]
    pub catalog_min_references: usize,

    /// The identifier slot synthesized when referenced but undeclared
    #[serde(default)]
    pub identifier: IdentifierSlot,

    /// Descriptive/temporal slots synthesized when widely referenced
    #[serde(default = "default_catalog")]
    pub catalog: Vec<CatalogSlot>,
}

/// Definition template for the identifier slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierSlot {
    #[serde(default = "default_identifier_name")]
    pub name: String,

    #[serde(default = "default_string_range")]
    pub range: String,

    #[serde(default = "default_identifier_description")]
    pub description: String,

    /// Distinct referencing classes needed before the slot is added
    #[serde(default = "default_identifier_min_references")]
    pub min_references: usize,
}

/// Definition template for one catalog slot (always optional)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSlot {
    pub name: String,
    pub range: String,
    pub description: String,
}

/// Duplicate resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Spaces per nesting level
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_builtin_types() -> Vec<String> {
    [
        "string",
        "integer",
        "boolean",
        "float",
        "double",
        "decimal",
        "time",
        "date",
        "datetime",
        "date_or_datetime",
        "uriorcurie",
        "curie",
        "uri",
        "ncname",
        "objectidentifier",
        "nodeidentifier",
        "jsonpointer",
        "jsonpath",
        "sparqlpath",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_enum_suffix() -> String {
    "Enum".to_string()
}

fn default_identifier_name() -> String {
    "id".to_string()
}

fn default_string_range() -> String {
    "string".to_string()
}

fn default_identifier_description() -> String {
    "Unique identifier".to_string()
}

fn default_identifier_min_references() -> usize {
    1
}

fn default_catalog_min_references() -> usize {
    2
}

fn default_catalog() -> Vec<CatalogSlot> {
    let slot = |name: &str, range: &str, description: &str| CatalogSlot {
        name: name.to_string(),
        range: range.to_string(),
        description: description.to_string(),
    };
    vec![
        slot("name", "string", "Name"),
        slot("description", "string", "Description"),
        slot("created_at", "datetime", "Creation timestamp"),
        slot("updated_at", "datetime", "Last update timestamp"),
    ]
}

fn default_indent_width() -> usize {
    2
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            builtin_types: default_builtin_types(),
            enum_suffix: default_enum_suffix(),
            suggest_similar: true,
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            catalog_min_references: default_catalog_min_references(),
            identifier: IdentifierSlot::default(),
            catalog: default_catalog(),
        }
    }
}

impl Default for IdentifierSlot {
    fn default() -> Self {
        Self {
            name: default_identifier_name(),
            range: default_string_range(),
            description: default_identifier_description(),
            min_references: default_identifier_min_references(),
        }
    }
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file, layered over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-doctor.toml",
            ".schema-doctor.toml",
            "config/schema-doctor.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "schema-doctor") {
            let xdg_config = dirs.config_dir().join("schema-doctor.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SCHEMA_DOCTOR__REPAIR__CATALOG_MIN_REFERENCES=3
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_DOCTOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
