use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;

use crate::domain::errors::ConfigError;

use super::models::Config;

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults.
    /// 2. `config.yaml` in the current directory, if present.
    /// 3. Environment variables (`OPSCONDUCTOR_` prefix, `__` nesting
    ///    separator), highest priority.
    pub fn load() -> Result<Config> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("config.yaml"))
            .merge(Env::prefixed("OPSCONDUCTOR_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        apply_bare_env_overrides(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("OPSCONDUCTOR_").split("__"))
            .extract()
            .context(format!(
                "failed to load config from {}",
                path.as_ref().display()
            ))?;

        apply_bare_env_overrides(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: config.logging.level.clone(),
            });
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.format".to_string(),
                value: config.logging.format.clone(),
            });
        }

        if config.database.host.is_empty() {
            return Err(ConfigError::MissingField("database.host".to_string()));
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections".to_string(),
                value: "0".to_string(),
            });
        }

        if config.scheduler.max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.max_workers".to_string(),
                value: "0".to_string(),
            });
        }

        if config.snmp_trap.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "snmp_trap.workers".to_string(),
                value: "0".to_string(),
            });
        }

        if config.snmp_trap.queue_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "snmp_trap.queue_size".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}

/// Applies the bare (unprefixed) deployment environment variables on top
/// of whatever the `OPSCONDUCTOR_`-prefixed figment merge produced.
/// These are the deployment-facing names operators actually set
/// (`LOG_LEVEL`, `PG_HOST`, `SNMP_TRAP_PORT`, ...); the `OPSCONDUCTOR_`
/// prefix form stays available for the generic nested-override case figment
/// covers out of the box.
fn apply_bare_env_overrides(config: &mut Config) {
    use std::env::var;

    if let Ok(v) = var("LOG_LEVEL") {
        config.logging.level = v.to_lowercase();
    }
    if let Ok(v) = var("PG_HOST") {
        config.database.host = v;
    }
    if let Ok(v) = var("PG_PORT") {
        if let Ok(port) = v.parse() {
            config.database.port = port;
        }
    }
    if let Ok(v) = var("PG_DATABASE") {
        config.database.database = v;
    }
    if let Ok(v) = var("PG_USER") {
        config.database.user = v;
    }
    if let Ok(v) = var("PG_PASSWORD") {
        config.database.password = v;
    }
    if let Ok(v) = var("SNMP_TRAP_HOST") {
        config.snmp_trap.host = v;
    }
    if let Ok(v) = var("SNMP_TRAP_PORT") {
        if let Ok(port) = v.parse() {
            config.snmp_trap.port = port;
        }
    }
    if let Ok(v) = var("SNMP_TRAP_QUEUE_SIZE") {
        if let Ok(n) = v.parse() {
            config.snmp_trap.queue_size = n;
        }
    }
    if let Ok(v) = var("SNMP_TRAP_WORKERS") {
        if let Ok(n) = v.parse() {
            config.snmp_trap.workers = n;
        }
    }
    if let Ok(v) = var("SNMP_TRAP_COMMUNITIES") {
        config.snmp_trap.communities = v.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(v) = var("SNMP_TRAP_VALIDATE_COMMUNITY") {
        if let Ok(b) = v.parse() {
            config.snmp_trap.validate_community = b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("default config should validate");
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_zero_scheduler_workers() {
        let mut config = Config::default();
        config.scheduler.max_workers = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_trap_queue_size() {
        let mut config = Config::default();
        config.snmp_trap.queue_size = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }
}
