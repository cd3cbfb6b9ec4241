use serde::{Deserialize, Serialize};

/// Root process configuration, merged by [`super::loader::ConfigLoader`]
/// from defaults, an optional YAML file, and environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
    pub snmp_trap: SnmpTrapConfig,
    pub alerts: AlertsConfig,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            scheduler: SchedulerConfig::default(),
            snmp_trap: SnmpTrapConfig::default(),
            alerts: AlertsConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "opsconductor".to_string(),
            user: "opsconductor".to_string(),
            password: String::new(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub tick_interval_seconds: u64,
    pub max_workers: usize,
    pub stale_timeout_minutes: i64,
    pub stale_check_interval_seconds: u64,
    pub rule_evaluator_interval_seconds: u64,
    pub ttl_expirer_interval_seconds: u64,
    pub mapping_cache_refresh_interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: 5,
            max_workers: 4,
            stale_timeout_minutes: 30,
            stale_check_interval_seconds: 60,
            rule_evaluator_interval_seconds: 60,
            ttl_expirer_interval_seconds: 60,
            mapping_cache_refresh_interval_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8089,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpTrapConfig {
    pub host: String,
    pub port: u16,
    pub queue_size: usize,
    pub workers: usize,
    pub communities: Vec<String>,
    pub validate_community: bool,
}

impl Default for SnmpTrapConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 162,
            queue_size: 10_000,
            workers: 4,
            communities: vec!["public".to_string()],
            validate_community: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    pub default_ttl_hours: i64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            default_ttl_hours: 24,
        }
    }
}
