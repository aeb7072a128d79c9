//! Console configuration.
//!
//! Supports YAML/TOML configuration files, `KYCDESK__*` environment
//! overrides, and defaults matching the intake flow's conventions.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Settings shared by the directory and gate layers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Record-store collection holding verification records.
    pub records_collection: String,

    /// Record-store collection holding the administrator registry.
    pub admin_registry: String,

    /// Blob-store root under which evidence paths are keyed.
    pub storage_root: String,

    /// Maximum number of `(owner, category)` entries the evidence cache
    /// keeps before evicting.
    pub evidence_cache_capacity: u64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            records_collection: "users".to_string(),
            admin_registry: "admins".to_string(),
            storage_root: "users".to_string(),
            evidence_cache_capacity: 256,
        }
    }
}

impl ConsoleSettings {
    /// Load configuration with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by `KYCDESK_CONFIG`
    /// 3. `./config/kycdesk.{yaml,toml,...}`
    /// 4. Hardcoded defaults (lowest priority)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Ok(config_path) = std::env::var("KYCDESK_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/kycdesk").required(false))
            .add_source(
                Environment::with_prefix("KYCDESK")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: ConsoleSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.records_collection.is_empty() {
            return Err(ConfigError::Message(
                "records_collection must not be empty".to_string(),
            ));
        }
        if self.admin_registry.is_empty() {
            return Err(ConfigError::Message(
                "admin_registry must not be empty".to_string(),
            ));
        }
        if self.storage_root.is_empty() {
            return Err(ConfigError::Message(
                "storage_root must not be empty".to_string(),
            ));
        }
        if self.evidence_cache_capacity == 0 {
            return Err(ConfigError::Message(
                "evidence_cache_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_intake_conventions() {
        let settings = ConsoleSettings::default();
        assert_eq!(settings.records_collection, "users");
        assert_eq!(settings.admin_registry, "admins");
        assert_eq!(settings.storage_root, "users");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn empty_names_are_rejected() {
        let settings = ConsoleSettings {
            admin_registry: String::new(),
            ..ConsoleSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = ConsoleSettings {
            evidence_cache_capacity: 0,
            ..ConsoleSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
