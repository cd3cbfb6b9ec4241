//! Normalizer for PRTG Network Monitor payloads (webhook and poll shapes):
//! severity/category lookup tables, dispatch on `sensorid` vs `objid`, and
//! alert-type/timestamp parsing.
//!
//! `device_ip` is expected to already be resolved by the caller
//! (`adapters::connectors::prtg::PrtgConnector`, via
//! `services::ip_resolution::IpResolver`) and carried on the payload under
//! `device_ip`; this keeps [`Normalizer::normalize`] synchronous, as its
//! trait signature requires.
//!
//! PRTG alerts correlate on `prtg_sensor_{sensor_id}` regardless of
//! raise/clear, not on `source_alert_id`, so a sensor's down/up pair
//! always collapses onto one fingerprint.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::domain::models::{Category, NewNormalizedAlert, NormalizedAlert, Severity};
use crate::domain::ports::Normalizer;
use crate::services::mapping_cache::MappingCache;

pub struct PrtgNormalizer {
    mapping_cache: Arc<MappingCache>,
}

impl PrtgNormalizer {
    pub fn new(mapping_cache: Arc<MappingCache>) -> Self {
        Self { mapping_cache }
    }
}

impl Normalizer for PrtgNormalizer {
    fn connector_type(&self) -> &str {
        "prtg"
    }

    fn normalize(&self, raw: Value) -> Option<NormalizedAlert> {
        let sensor_id = raw
            .get("sensorid")
            .or_else(|| raw.get("objid"))
            .and_then(Value::as_i64)?;

        let device_ip = raw.get("device_ip").and_then(Value::as_str);
        let Some(device_ip) = device_ip else {
            tracing::warn!(sensor_id, "prtg payload missing resolved device_ip, dropping");
            return None;
        };

        let device_name = raw
            .get("device")
            .and_then(Value::as_str)
            .map(str::to_string);

        let status_id = raw.get("statusid").and_then(Value::as_i64);
        let status_text = raw
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");

        let severity = self.resolve_severity(status_id, status_text);
        let sensor_name = raw
            .get("sensor")
            .or_else(|| raw.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("sensor");
        let category = self.resolve_category(sensor_name);

        let status_slug = status_text.to_lowercase().replace(' ', "_");
        let sensor_slug = sensor_name.to_lowercase().replace(' ', "_");
        let alert_type = format!("prtg_{sensor_slug}_{status_slug}");

        let is_clear = severity == Severity::Clear || status_text.eq_ignore_ascii_case("up");

        let message = raw
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(status_text)
            .to_string();
        let title = format!("{sensor_name}: {status_text}");

        let occurred_at = raw
            .get("datetime")
            .and_then(Value::as_str)
            .and_then(parse_prtg_datetime)
            .unwrap_or_else(Utc::now);

        let source_alert_id = sensor_id.to_string();
        let correlation_key = format!("prtg_sensor_{sensor_id}");

        let input = NewNormalizedAlert {
            source_system: "prtg".to_string(),
            source_alert_id,
            device_ip: device_ip.to_string(),
            device_name,
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
                tracing::warn!(sensor_id, error = %err, "prtg normalization rejected");
                None
            }
        }
    }
}

impl PrtgNormalizer {
    fn resolve_severity(&self, status_id: Option<i64>, status_text: &str) -> Severity {
        if let Some(id) = status_id {
            if let Some(mapped) = self
                .mapping_cache
                .severity_for("prtg", "statusid", &id.to_string())
            {
                return mapped;
            }
        }
        if let Some(mapped) = self
            .mapping_cache
            .severity_for("prtg", "status", status_text)
        {
            return mapped;
        }
        status_id
            .and_then(severity_from_status_code)
            .or_else(|| severity_from_status_text(status_text))
            .unwrap_or_default()
    }

    fn resolve_category(&self, sensor_name: &str) -> Category {
        if let Some(mapped) = self
            .mapping_cache
            .category_for("prtg", "sensor", sensor_name)
        {
            return mapped;
        }
        category_from_sensor_name(sensor_name).unwrap_or_default()
    }
}

/// Embedded fallback table used only when no `severity_mappings` row
/// exists for this status code. PRTG status IDs: 3=Up, 4=Warning,
/// 5=Down, 10=Unusual, 13=Down(Acknowledged), 14=Down(Partial).
fn severity_from_status_code(status_id: i64) -> Option<Severity> {
    match status_id {
        3 => Some(Severity::Clear),
        4 => Some(Severity::Warning),
        5 => Some(Severity::Critical),
        10 => Some(Severity::Minor),
        13 | 14 => Some(Severity::Major),
        _ => None,
    }
}

fn severity_from_status_text(status_text: &str) -> Option<Severity> {
    match status_text.to_lowercase().as_str() {
        "up" => Some(Severity::Clear),
        "warning" => Some(Severity::Warning),
        "down" => Some(Severity::Critical),
        "unusual" => Some(Severity::Minor),
        "down (acknowledged)" | "down (partial)" | "paused" => Some(Severity::Major),
        _ => None,
    }
}

fn category_from_sensor_name(sensor_name: &str) -> Option<Category> {
    let lowered = sensor_name.to_lowercase();
    let pairs: &[(&str, Category)] = &[
        ("ping", Category::Network),
        ("port", Category::Network),
        ("snmp traffic", Category::Network),
        ("interface", Category::Network),
        ("cpu", Category::Compute),
        ("memory", Category::Compute),
        ("process", Category::Compute),
        ("disk", Category::Storage),
        ("free space", Category::Storage),
        ("http", Category::Application),
        ("service", Category::Application),
        ("http transaction", Category::Application),
        ("power", Category::Power),
        ("temperature", Category::Environment),
        ("humidity", Category::Environment),
        ("wifi", Category::Wireless),
        ("rtsp", Category::Video),
    ];
    pairs
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, category)| *category)
}

/// PRTG's notification templates emit several date formats depending on
/// locale/version; tries the common ones and falls back to "now" rather
/// than dropping the alert, per `_parse_datetime` in the original.
fn parse_prtg_datetime(raw: &str) -> Option<DateTime<Utc>> {
    const FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M:%S"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
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

    fn normalizer() -> PrtgNormalizer {
        PrtgNormalizer::new(Arc::new(MappingCache::new(Arc::new(EmptyMappingRepository))))
    }

    #[test]
    fn s1_scenario_raise_is_critical_network() {
        let raw = json!({
            "sensorid": 42,
            "deviceid": 7,
            "device": "sw1",
            "sensor": "Ping",
            "status": "Down",
            "statusid": 5,
            "message": "ping",
            "datetime": "01/06/2026 21:00:00",
            "host": "10.1.1.1",
            "device_ip": "10.1.1.1",
        });
        let alert = normalizer().normalize(raw).expect("should normalize");
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.category, Category::Network);
        assert_eq!(alert.alert_type, "prtg_ping_down");
        assert!(!alert.is_clear);
    }

    #[test]
    fn s1_scenario_clear_shares_fingerprint_with_raise() {
        let raise = json!({
            "sensorid": 42, "device": "sw1", "sensor": "Ping",
            "status": "Down", "statusid": 5, "message": "ping",
            "device_ip": "10.1.1.1",
        });
        let clear = json!({
            "sensorid": 42, "device": "sw1", "sensor": "Ping",
            "status": "Up", "statusid": 3, "message": "ping restored",
            "device_ip": "10.1.1.1",
        });
        let raised = normalizer().normalize(raise).unwrap();
        let cleared = normalizer().normalize(clear).unwrap();
        assert_eq!(raised.fingerprint, cleared.fingerprint);
        assert!(cleared.is_clear);
        assert_eq!(cleared.severity, Severity::Clear);
    }

    #[test]
    fn missing_device_ip_is_dropped() {
        let raw = json!({"sensorid": 42, "status": "Down", "statusid": 5});
        assert!(normalizer().normalize(raw).is_none());
    }
}
