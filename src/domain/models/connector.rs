use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connector lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectorStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "disconnected" => Some(Self::Disconnected),
            "connecting" => Some(Self::Connecting),
            "connected" => Some(Self::Connected),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A registered connector instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorRecord {
    pub id: i64,
    pub connector_type: String,
    pub config: serde_json::Value,
    pub enabled: bool,
    pub status: ConnectorStatus,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub alerts_received: i64,
    pub last_error: Option<String>,
}

/// The outcome of [`crate::domain::ports::connector::Connector::test_connection`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    pub details: serde_json::Value,
}

/// Per-connector-instance configuration fields. Every source reads the
/// subset it needs; unused fields stay `None`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectorConfig {
    pub url: Option<String>,
    pub api_token: Option<String>,
    pub username: Option<String>,
    pub passhash: Option<String>,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default)]
    pub poll_interval_seconds: u64,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub community: Vec<String>,
    pub snmp_version: Option<u8>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Vendor tag carried onto the normalized payload, e.g. `"ciena"`,
    /// `"eaton"`, used by [`crate::services::normalizers::snmp_poll::SnmpPollNormalizer`].
    pub vendor: Option<String>,
    /// Fixed OID table an `SnmpPollConnector` walks every tick.
    #[serde(default)]
    pub oid_table: Vec<SnmpOidEntry>,
}

/// One polled object in a vendor SNMP poller's fixed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpOidEntry {
    pub object_type: String,
    pub object_id: String,
    pub metric: String,
    pub oid: String,
}

const fn default_true() -> bool {
    true
}
const fn default_timeout() -> u64 {
    5
}
const fn default_retries() -> u32 {
    1
}
