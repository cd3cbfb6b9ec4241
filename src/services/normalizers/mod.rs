//! Per-connector-type implementations of `domain::ports::normalizer::Normalizer`.

pub mod prtg;
pub mod snmp_poll;

pub use prtg::PrtgNormalizer;
pub use snmp_poll::SnmpPollNormalizer;
