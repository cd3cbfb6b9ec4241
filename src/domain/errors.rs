//! Domain and infrastructure error types for OpsConductor.
//!
//! Each enum groups errors from one component, per the error taxonomy in
//! the design notes: validation errors are rejected at the boundary and
//! never retried, transient errors may be retried by the caller, and
//! storage conflicts convert to an update rather than propagating.

use thiserror::Error;

/// Errors raised while constructing or validating a [`crate::domain::models::NormalizedAlert`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing device_ip: could not resolve an IPv4 address for this alert")]
    MissingDeviceIp,

    #[error("invalid severity for clear alert: is_clear requires severity = clear")]
    ClearSeverityMismatch,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Errors raised by a connector during its lifecycle or poll/webhook handling.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("connector not configured: {0}")]
    NotConfigured(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("transient I/O error: {0}")]
    Transient(String),

    #[error("connection test failed: {0}")]
    TestFailed(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl ConnectorError {
    /// Transient errors are worth a retry on the next poll tick; everything
    /// else (bad config, auth) will keep failing until an operator acts.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::AuthenticationFailed(_))
    }
}

/// Errors from SNMP trap decode/routing/handling.
#[derive(Error, Debug)]
pub enum SnmpError {
    #[error("failed to decode PDU: {0}")]
    DecodeFailed(String),

    #[error("unknown community string")]
    UnknownCommunity,

    #[error("trap queue full, dropping datagram")]
    QueueFull,

    #[error("no mapping for trap OID {0}")]
    UnmappedTrap(String),
}

/// Errors from the alert manager's process/acknowledge/resolve operations.
#[derive(Error, Debug)]
pub enum AlertManagerError {
    #[error("alert not found: {0}")]
    NotFound(i64),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors from the rule evaluator's cooldown/condition/auto-resolve passes.
#[derive(Error, Debug)]
pub enum RuleEvaluatorError {
    #[error("rule not found: {0}")]
    RuleNotFound(i64),

    #[error("malformed condition_config for rule {rule_id}: {source}")]
    MalformedConfig {
        rule_id: i64,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    AlertManager(#[from] AlertManagerError),
}

/// Errors from the scheduler/executor substrate.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("execution not found: {0}")]
    ExecutionNotFound(i64),

    #[error("unknown task_name: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Errors from database access, independent of the specific repository.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),

    #[error("row not found")]
    RowNotFound,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

impl DatabaseError {
    /// Connection and transaction failures are worth retrying; constraint
    /// violations represent real conflicts and should not be retried blindly.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::RowNotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(db_err.message().to_string())
            }
            other => Self::QueryFailed(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors raised while loading or validating process configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("environment variable error: {0}")]
    EnvVarError(String),
}
