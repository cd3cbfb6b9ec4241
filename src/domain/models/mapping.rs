use serde::{Deserialize, Serialize};

/// A row from `severity_mappings` or `category_mappings`: overrides the
/// normalizer's default for a specific `(connector_type, source_field,
/// source_value)` triple.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ValueMappingRow {
    pub connector_type: String,
    pub source_field: String,
    pub source_value: String,
    pub target: String,
}

/// A row from `snmp_trap_mappings`: overrides defaults for a trap OID.
/// Absence of a row for a given OID means the trap is dropped (the
/// "unmapped SNMP trap" policy).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrapMappingRow {
    pub trap_oid: String,
    pub alert_type: String,
    pub is_clear: bool,
    /// When set, overrides the default correlation key (`alert_type`) so a
    /// raise and its clear fingerprint to the same value.
    pub correlation_key: Option<String>,
    pub vendor: String,
    pub description: String,
}
