//! OpsConductor: alert ingestion, correlation, and scheduling core for
//! network/infrastructure monitoring.
//!
//! Hexagonal layout: `domain` holds the value objects, ports (traits), and
//! error taxonomy; `adapters` implements those ports against Postgres,
//! SNMP, HTTP connectors, and notification channels; `services` holds the
//! business logic sitting between the two; `infrastructure` is the ambient
//! stack (config loading, logging) that every binary needs regardless of
//! which ports are wired up.

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;
