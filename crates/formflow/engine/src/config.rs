//! Configuration for the Formflow engine

use crate::validator::ValidationPolicy;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormflowConfig {
    /// Engine behaviour
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Roles allowed to create and change templates and definitions
    #[serde(default = "default_admin_roles")]
    pub admin_roles: Vec<String>,

    /// Reject definitions with duplicate `(from, to)` rules
    #[serde(default = "default_true")]
    pub reject_duplicate_rules: bool,

    /// Reject rules that name states missing from the definition
    #[serde(default = "default_true")]
    pub require_known_states: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admin_roles: default_admin_roles(),
            reject_duplicate_rules: true,
            require_known_states: true,
        }
    }
}

impl EngineConfig {
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            reject_duplicate_rules: self.reject_duplicate_rules,
            require_known_states: self.require_known_states,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_admin_roles() -> Vec<String> {
    vec!["Admin".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl FormflowConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `FORMFLOW__*` environment variables (e.g. `FORMFLOW__LOGGING__LEVEL`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&FormflowConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FORMFLOW")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("engine.admin_roles")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FormflowConfig::default();
        assert_eq!(config.engine.admin_roles, vec!["Admin"]);
        assert!(config.engine.reject_duplicate_rules);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_policy_follows_engine_config() {
        let engine = EngineConfig {
            reject_duplicate_rules: false,
            ..Default::default()
        };
        let policy = engine.validation_policy();
        assert!(!policy.reject_duplicate_rules);
        assert!(policy.require_known_states);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: FormflowConfig =
            serde_json::from_str(r#"{ "engine": { "admin_roles": ["Ops"] } }"#).unwrap();
        assert_eq!(config.engine.admin_roles, vec!["Ops"]);
        assert!(config.engine.require_known_states);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = FormflowConfig::load(None).unwrap();
        assert_eq!(config.engine.admin_roles, vec!["Admin"]);
    }
}
