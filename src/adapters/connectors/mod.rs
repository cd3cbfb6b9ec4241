//! Concrete [`crate::domain::ports::Connector`] implementations, one module
//! per `connector_type`, plus the [`registry::ConnectorRegistry`] that
//! instantiates them from persisted `connectors` rows.

pub mod http_util;
pub mod prtg;
pub mod registry;
pub mod snmp_poll;

pub use registry::ConnectorRegistry;
