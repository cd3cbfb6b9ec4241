pub mod connectors;
pub mod http;
pub mod notifications;
pub mod postgres;
pub mod snmp;
