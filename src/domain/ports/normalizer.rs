use crate::domain::models::NormalizedAlert;

/// One normalizer per connector type. Returns `None` (not an error) when
/// the payload is intentionally dropped — e.g. an unmapped SNMP trap OID.
pub trait Normalizer: Send + Sync {
    fn connector_type(&self) -> &str;

    fn normalize(&self, raw: serde_json::Value) -> Option<NormalizedAlert>;
}
