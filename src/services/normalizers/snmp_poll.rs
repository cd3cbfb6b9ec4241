//! Normalizer for the generic vendor SNMP poller (`SnmpPollConnector`):
//! the poller walks a fixed OID table on an interval and reports
//! per-object operational state, which this normalizer turns into
//! raise/clear `NormalizedAlert`s the same way the trap pipeline does for
//! unsolicited traps.
//!
//! `device_ip` is expected pre-resolved on the payload, same contract as
//! [`super::prtg::PrtgNormalizer`]. One instance per vendor connector type
//! (`ciena_snmp`, `eaton_snmp`, ...); the vendor tag itself travels on the
//! payload so a single impl serves every vendor poller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::models::{Category, NewNormalizedAlert, NormalizedAlert, Severity};
use crate::domain::ports::Normalizer;
use crate::services::mapping_cache::MappingCache;

pub struct SnmpPollNormalizer {
    connector_type: String,
    mapping_cache: Arc<MappingCache>,
}

impl SnmpPollNormalizer {
    pub fn new(connector_type: impl Into<String>, mapping_cache: Arc<MappingCache>) -> Self {
        Self {
            connector_type: connector_type.into(),
            mapping_cache,
        }
    }
}

impl Normalizer for SnmpPollNormalizer {
    fn connector_type(&self) -> &str {
        &self.connector_type
    }

    fn normalize(&self, raw: Value) -> Option<NormalizedAlert> {
        let device_ip = raw.get("device_ip").and_then(Value::as_str)?;
        let vendor = raw.get("vendor").and_then(Value::as_str).unwrap_or("snmp");
        let object_type = raw
            .get("object_type")
            .and_then(Value::as_str)
            .unwrap_or("device");
        let object_id = raw.get("object_id").and_then(Value::as_str).unwrap_or("?");
        let metric = raw.get("metric").and_then(Value::as_str).unwrap_or("state");
        let value = raw.get("value").and_then(Value::as_str)?;

        let is_clear = value.eq_ignore_ascii_case("up") || value.eq_ignore_ascii_case("normal");

        let severity = self
            .mapping_cache
            .severity_for(&self.connector_type, metric, value)
            .unwrap_or_else(|| embedded_severity(value, is_clear));

        let category = self
            .mapping_cache
            .category_for(&self.connector_type, "object_type", object_type)
            .unwrap_or(Category::Network);

        let alert_type = format!("{vendor}_{object_type}_{metric}");
        let title = format!("{vendor} {object_type} {object_id}: {metric} = {value}");
        let message = title.clone();

        let occurred_at = raw
            .get("occurred_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let correlation_key = format!("{vendor}:{object_type}:{object_id}:{metric}");

        let input = NewNormalizedAlert {
            source_system: self.connector_type.clone(),
            source_alert_id: format!("{object_type}:{object_id}"),
            device_ip: device_ip.to_string(),
            device_name: None,
            severity,
            category,
            alert_type,
            title,
            message,
            occurred_at,
            is_clear,
            raw_data: raw.clone(),
            correlation_key: Some(correlation_key),
        };

        match NormalizedAlert::new(input) {
            Ok(alert) => Some(alert),
            Err(err) => {
                tracing::warn!(error = %err, object_id, "snmp poll normalization rejected");
                None
            }
        }
    }
}

fn embedded_severity(value: &str, is_clear: bool) -> Severity {
    if is_clear {
        return Severity::Clear;
    }
    match value.to_lowercase().as_str() {
        "down" | "failed" | "critical" => Severity::Critical,
        "degraded" | "minor" => Severity::Minor,
        "warning" => Severity::Warning,
        _ => Severity::Major,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ValueMappingRow;
    use crate::domain::ports::MappingRepository;
    use async_trait::async_trait;
    use serde_json::json;

    struct EmptyMappingRepository;

    #[async_trait]
    impl MappingRepository for EmptyMappingRepository {
        async fn load_severity_mappings(
            &self,
        ) -> Result<Vec<ValueMappingRow>, crate::domain::errors::DatabaseError> {
            Ok(vec![])
        }
        async fn load_category_mappings(
            &self,
        ) -> Result<Vec<ValueMappingRow>, crate::domain::errors::DatabaseError> {
            Ok(vec![])
        }
        async fn load_trap_mappings(
            &self,
        ) -> Result<Vec<crate::domain::models::TrapMappingRow>, crate::domain::errors::DatabaseError>
        {
            Ok(vec![])
        }
    }

    fn normalizer() -> SnmpPollNormalizer {
        SnmpPollNormalizer::new(
            "ciena_snmp",
            Arc::new(MappingCache::new(Arc::new(EmptyMappingRepository))),
        )
    }

    #[test]
    fn port_down_is_major_network() {
        let raw = json!({
            "device_ip": "10.3.3.3", "vendor": "ciena", "object_type": "port",
            "object_id": "1/1/1", "metric": "oper_status", "value": "down",
        });
        let alert = normalizer().normalize(raw).unwrap();
        assert_eq!(alert.severity, Severity::Major);
        assert_eq!(alert.category, Category::Network);
        assert!(!alert.is_clear);
    }

    #[test]
    fn port_up_clears_and_shares_fingerprint_with_down() {
        let down = json!({
            "device_ip": "10.3.3.3", "vendor": "ciena", "object_type": "port",
            "object_id": "1/1/1", "metric": "oper_status", "value": "down",
        });
        let up = json!({
            "device_ip": "10.3.3.3", "vendor": "ciena", "object_type": "port",
            "object_id": "1/1/1", "metric": "oper_status", "value": "up",
        });
        let down = normalizer().normalize(down).unwrap();
        let up = normalizer().normalize(up).unwrap();
        assert_eq!(down.fingerprint, up.fingerprint);
        assert!(up.is_clear);
        assert_eq!(up.severity, Severity::Clear);
    }
}
