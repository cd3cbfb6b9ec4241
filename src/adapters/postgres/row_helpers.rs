//! Shared row-mapping helpers for Postgres adapters: closed-enumeration
//! columns are stored as their `as_str()` text and parsed back with
//! `from_str`, falling back to a safe default rather than failing the row
//! map outright.

use crate::domain::models::{AlertStatus, Category, ConnectorStatus, Severity};

pub fn severity_or_default(s: &str) -> Severity {
    Severity::from_str(s).unwrap_or_default()
}

pub fn category_or_default(s: &str) -> Category {
    Category::from_str(s).unwrap_or_default()
}

pub fn alert_status_or_active(s: &str) -> AlertStatus {
    AlertStatus::from_str(s).unwrap_or(AlertStatus::Active)
}

pub fn connector_status_or_disconnected(s: &str) -> ConnectorStatus {
    ConnectorStatus::from_str(s).unwrap_or(ConnectorStatus::Disconnected)
}
