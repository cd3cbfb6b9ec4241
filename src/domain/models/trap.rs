use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::severity::Severity;

/// A decoded SNMP PDU, version-normalized.
#[derive(Debug, Clone)]
pub struct DecodedTrap {
    pub source_addr: std::net::SocketAddr,
    pub community: String,
    /// Canonicalized trap OID: for v1, `enterprise.0.specific_trap` (or the
    /// mapped standard-trap OID); for v2c, the `snmpTrapOID` varbind value.
    pub trap_oid: String,
    pub varbinds: BTreeMap<String, String>,
}

/// The vendor-specific, typed event a trap handler produces from a
/// [`DecodedTrap`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapEvent {
    pub id: i64,
    pub trap_oid: String,
    pub source_addr: String,
    pub vendor: String,
    pub event_type: String,
    pub severity: Severity,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub description: String,
    pub alarm_id: String,
    pub is_clear: bool,
    pub cleared_event_id: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

impl TrapEvent {
    /// Synthesize an `alarm_id` when the vendor payload carries none:
    /// `"{source_ip}:{object}:{description[:50]}"`.
    pub fn synthesize_alarm_id(source_ip: &str, object: &str, description: &str) -> String {
        let truncated: String = description.chars().take(50).collect();
        format!("{source_ip}:{object}:{truncated}")
    }
}

/// An unconditional raw-PDU audit row: written even when no event is
/// emitted, so every received trap stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapLogEntry {
    pub id: i64,
    pub source_addr: String,
    pub trap_oid: String,
    pub raw_varbinds: serde_json::Value,
    pub event_id: Option<i64>,
    pub received_at: DateTime<Utc>,
}

/// Counters flushed to `trap_receiver_status` every 10s.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrapReceiverStatus {
    pub traps_received: u64,
    pub traps_processed: u64,
    pub traps_errors: u64,
    pub queue_depth: u64,
    pub last_trap_at: Option<DateTime<Utc>>,
    pub is_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_alarm_id_truncated_to_50_chars() {
        let long_desc = "x".repeat(80);
        let id = TrapEvent::synthesize_alarm_id("10.2.2.2", "link:3", &long_desc);
        assert_eq!(id, format!("10.2.2.2:link:3:{}", "x".repeat(50)));
    }
}
