//! Maps a persisted `connectors.connector_type` to a running
//! [`Connector`] instance: connectors are configuration-driven, not
//! hardcoded, so this is a config-keyed factory producing trait objects
//! behind an `Arc`. Unlike a one-shot startup registry, it can also
//! materialize connectors instantiated after boot (e.g. the webhook HTTP
//! route looking up the connector for an inbound payload).

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::ConnectorError;
use crate::domain::models::ConnectorConfig;
use crate::domain::ports::{Connector, PollingConnector, WebhookConnector};
use crate::services::ip_resolution::IpResolver;
use crate::services::mapping_cache::MappingCache;
use crate::services::normalizers::snmp_poll::SnmpPollNormalizer;
use crate::services::normalizers::PrtgNormalizer;

use super::prtg::PrtgConnector;
use super::snmp_poll::SnmpPollConnector;

/// Any connector type known to the registry, collapsed to the capability
/// shape the caller asked for. `poll_interval_seconds`/`connector_type`
/// dispatch through [`Connector`] directly; this only exists because a
/// single concrete type (e.g. `PrtgConnector`) can implement both
/// [`PollingConnector`] and [`WebhookConnector`] and callers need to recover
/// whichever capability they need without downcasting.
pub enum BuiltConnector {
    Polling(Arc<dyn PollingConnector>),
    Webhook(Arc<dyn WebhookConnector>),
    Dual {
        polling: Arc<dyn PollingConnector>,
        webhook: Arc<dyn WebhookConnector>,
    },
}

impl BuiltConnector {
    pub fn as_connector(&self) -> &dyn Connector {
        match self {
            Self::Polling(c) => c.as_ref(),
            Self::Webhook(c) => c.as_ref(),
            Self::Dual { polling, .. } => polling.as_ref(),
        }
    }

    pub fn as_polling(&self) -> Option<Arc<dyn PollingConnector>> {
        match self {
            Self::Polling(c) => Some(c.clone()),
            Self::Dual { polling, .. } => Some(polling.clone()),
            Self::Webhook(_) => None,
        }
    }

    pub fn as_webhook(&self) -> Option<Arc<dyn WebhookConnector>> {
        match self {
            Self::Webhook(c) => Some(c.clone()),
            Self::Dual { webhook, .. } => Some(webhook.clone()),
            Self::Polling(_) => None,
        }
    }
}

/// `connector_type` prefixes routed to the generic vendor SNMP poller
/// rather than a dedicated connector struct; these read `vendor`/
/// `oid_table` out of the instance config instead.
const SNMP_POLL_TYPES: &[&str] = &["ciena_snmp", "eaton_snmp", "generic_snmp"];

pub struct ConnectorRegistry {
    mapping_cache: Arc<MappingCache>,
    ip_resolver: Arc<IpResolver>,
}

impl ConnectorRegistry {
    pub fn new(mapping_cache: Arc<MappingCache>, ip_resolver: Arc<IpResolver>) -> Self {
        Self {
            mapping_cache,
            ip_resolver,
        }
    }

    /// Instantiates (but does not `start`) a connector for `connector_type`
    /// with the given instance config.
    pub fn build(
        &self,
        connector_type: &str,
        config: ConnectorConfig,
    ) -> Result<BuiltConnector, ConnectorError> {
        match connector_type {
            "prtg" => {
                let normalizer = Arc::new(PrtgNormalizer::new(self.mapping_cache.clone()));
                let connector = Arc::new(PrtgConnector::new(
                    config,
                    normalizer,
                    self.ip_resolver.clone(),
                )?);
                Ok(BuiltConnector::Dual {
                    polling: connector.clone(),
                    webhook: connector,
                })
            }
            snmp_type if SNMP_POLL_TYPES.contains(&snmp_type) => {
                let normalizer = Arc::new(SnmpPollNormalizer::new(
                    snmp_type.to_string(),
                    self.mapping_cache.clone(),
                ));
                let connector = Arc::new(SnmpPollConnector::new(
                    snmp_type.to_string(),
                    config,
                    normalizer,
                    self.ip_resolver.clone(),
                ));
                Ok(BuiltConnector::Polling(connector))
            }
            other => Err(ConnectorError::NotConfigured(format!(
                "unknown connector_type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DatabaseError;
    use crate::domain::models::{TrapMappingRow, ValueMappingRow};
    use crate::domain::ports::MappingRepository;
    use async_trait::async_trait;

    struct EmptyMappingRepository;
    #[async_trait]
    impl MappingRepository for EmptyMappingRepository {
        async fn load_severity_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError> {
            Ok(vec![])
        }
        async fn load_category_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError> {
            Ok(vec![])
        }
        async fn load_trap_mappings(&self) -> Result<Vec<TrapMappingRow>, DatabaseError> {
            Ok(vec![])
        }
    }

    fn registry() -> ConnectorRegistry {
        let mapping_cache = Arc::new(MappingCache::new(Arc::new(EmptyMappingRepository)));
        ConnectorRegistry::new(mapping_cache, Arc::new(IpResolver::new(10)))
    }

    #[test]
    fn builds_prtg_as_dual_capability() {
        let config = ConnectorConfig {
            url: Some("http://prtg.example".to_string()),
            api_token: Some("tok".to_string()),
            ..Default::default()
        };
        let built = registry().build("prtg", config).unwrap();
        assert!(built.as_polling().is_some());
        assert!(built.as_webhook().is_some());
    }

    #[test]
    fn builds_snmp_poll_as_polling_only() {
        let config = ConnectorConfig {
            bind_address: Some("10.0.0.1".to_string()),
            community: vec!["public".to_string()],
            ..Default::default()
        };
        let built = registry().build("ciena_snmp", config).unwrap();
        assert!(built.as_polling().is_some());
        assert!(built.as_webhook().is_none());
    }

    #[test]
    fn unknown_connector_type_errors() {
        assert!(registry().build("bogus", ConnectorConfig::default()).is_err());
    }
}
