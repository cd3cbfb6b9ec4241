use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::errors::ValidationError;
use crate::domain::models::category::Category;
use crate::domain::models::severity::Severity;

/// The canonical alert shape every connector/normalizer produces.
///
/// Immutable after construction: the only way to build one is
/// [`NormalizedAlert::new`], which enforces the shape every connector must
/// agree on and derives the fingerprint so callers can never hand-roll a
/// fingerprint that skips the `"{source}:{correlation_key}"` convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedAlert {
    pub source_system: String,
    pub source_alert_id: String,
    pub device_ip: String,
    pub device_name: Option<String>,
    pub severity: Severity,
    pub category: Category,
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub is_clear: bool,
    pub raw_data: serde_json::Value,
    pub fingerprint: String,
}

/// Inputs to [`NormalizedAlert::new`]. Kept separate from the value object
/// itself so the constructor has somewhere to validate before committing to
/// an immutable value.
pub struct NewNormalizedAlert {
    pub source_system: String,
    pub source_alert_id: String,
    pub device_ip: String,
    pub device_name: Option<String>,
    pub severity: Severity,
    pub category: Category,
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub is_clear: bool,
    pub raw_data: serde_json::Value,
    /// Overrides the default correlation key (`alert_type`) so a raise and
    /// its matching clear collapse onto the same fingerprint. Set by a
    /// mapping row's `correlation_key`.
    pub correlation_key: Option<String>,
}

impl NormalizedAlert {
    /// Construct a `NormalizedAlert`, validating that `is_clear` requires
    /// `severity == Clear` and that `device_ip` is already a syntactically
    /// valid IPv4 address (resolution happens earlier, in
    /// `services::ip_resolution`).
    pub fn new(input: NewNormalizedAlert) -> Result<Self, ValidationError> {
        if input.is_clear && input.severity != Severity::Clear {
            return Err(ValidationError::ClearSeverityMismatch);
        }
        if input.device_ip.trim().is_empty() {
            return Err(ValidationError::MissingDeviceIp);
        }
        if input.device_ip.parse::<std::net::Ipv4Addr>().is_err() {
            return Err(ValidationError::InvalidValue {
                field: "device_ip",
                value: input.device_ip,
            });
        }

        let correlation_key = input
            .correlation_key
            .unwrap_or_else(|| input.alert_type.clone());
        let fingerprint = compute_fingerprint(&input.source_system, &correlation_key);

        Ok(Self {
            source_system: input.source_system,
            source_alert_id: input.source_alert_id,
            device_ip: input.device_ip,
            device_name: input.device_name,
            severity: input.severity,
            category: input.category,
            alert_type: input.alert_type,
            title: input.title,
            message: input.message,
            occurred_at: input.occurred_at,
            is_clear: input.is_clear,
            raw_data: input.raw_data,
            fingerprint,
        })
    }
}

/// `sha256("{source}:{correlation_key}")`. A raise and its clear share a
/// fingerprint whenever they share a correlation key.
pub fn compute_fingerprint(source: &str, correlation_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b":");
    hasher.update(correlation_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(is_clear: bool, severity: Severity) -> NewNormalizedAlert {
        NewNormalizedAlert {
            source_system: "prtg".to_string(),
            source_alert_id: "42".to_string(),
            device_ip: "10.1.1.1".to_string(),
            device_name: Some("sw1".to_string()),
            severity,
            category: Category::Network,
            alert_type: "prtg_ping_down".to_string(),
            title: "Ping Down".to_string(),
            message: "ping".to_string(),
            occurred_at: Utc::now(),
            is_clear,
            raw_data: serde_json::json!({}),
            correlation_key: None,
        }
    }

    #[test]
    fn rejects_clear_with_non_clear_severity() {
        let err = NormalizedAlert::new(base(true, Severity::Critical)).unwrap_err();
        assert_eq!(err, ValidationError::ClearSeverityMismatch);
    }

    #[test]
    fn rejects_non_ipv4_device_ip() {
        let mut input = base(false, Severity::Critical);
        input.device_ip = "not-an-ip".to_string();
        let err = NormalizedAlert::new(input).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_empty_device_ip() {
        let mut input = base(false, Severity::Critical);
        input.device_ip = String::new();
        let err = NormalizedAlert::new(input).unwrap_err();
        assert_eq!(err, ValidationError::MissingDeviceIp);
    }

    #[test]
    fn fingerprint_defaults_to_alert_type() {
        let alert = NormalizedAlert::new(base(false, Severity::Critical)).unwrap();
        assert_eq!(
            alert.fingerprint,
            compute_fingerprint("prtg", "prtg_ping_down")
        );
    }

    #[test]
    fn correlation_key_override_links_raise_and_clear() {
        let mut raise = base(false, Severity::Critical);
        raise.correlation_key = Some("link:3".to_string());
        let raise = NormalizedAlert::new(raise).unwrap();

        let mut clear = base(true, Severity::Clear);
        clear.correlation_key = Some("link:3".to_string());
        let clear = NormalizedAlert::new(clear).unwrap();

        assert_eq!(raise.fingerprint, clear.fingerprint);
    }

    #[test]
    fn different_correlation_keys_yield_different_fingerprints() {
        let mut a = base(false, Severity::Critical);
        a.correlation_key = Some("link:3".to_string());
        let a = NormalizedAlert::new(a).unwrap();

        let mut b = base(false, Severity::Critical);
        b.correlation_key = Some("link:4".to_string());
        let b = NormalizedAlert::new(b).unwrap();

        assert_ne!(a.fingerprint, b.fingerprint);
    }
}
