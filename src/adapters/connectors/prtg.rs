//! PRTG Network Monitor connector: dual poll+webhook mode. Polling falls
//! back from `getstatus.json` to `table.json` when the compact endpoint
//! doesn't return what's needed.
//!
//! `poll`/`handle_webhook` serialize on an internal `tokio::sync::Mutex`
//! so this connector never calls `AlertManager::process_alert` twice in
//! parallel for its own stream; the lock is never shared with another
//! connector instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::ConnectorError;
use crate::domain::models::{ConnectionTestResult, ConnectorConfig, ConnectorStatus, NormalizedAlert};
use crate::domain::ports::{Connector, Normalizer, PollingConnector, WebhookConnector};
use crate::services::ip_resolution::IpResolver;
use crate::services::normalizers::prtg::PrtgNormalizer;

use super::http_util::{build_client, get_with_fallback};

pub struct PrtgConnector {
    config: ConnectorConfig,
    http: Client,
    normalizer: Arc<PrtgNormalizer>,
    ip_resolver: Arc<IpResolver>,
    status: RwLock<ConnectorStatus>,
    last_error: RwLock<Option<String>>,
    started: AtomicBool,
    stream_lock: Mutex<()>,
    cancel: CancellationToken,
}

impl PrtgConnector {
    pub fn new(
        config: ConnectorConfig,
        normalizer: Arc<PrtgNormalizer>,
        ip_resolver: Arc<IpResolver>,
    ) -> Result<Self, ConnectorError> {
        let http = build_client(&config)?;
        Ok(Self {
            config,
            http,
            normalizer,
            ip_resolver,
            status: RwLock::new(ConnectorStatus::Disconnected),
            last_error: RwLock::new(None),
            started: AtomicBool::new(false),
            stream_lock: Mutex::new(()),
            cancel: CancellationToken::new(),
        })
    }

    fn base_url(&self) -> Result<&str, ConnectorError> {
        self.config
            .url
            .as_deref()
            .ok_or_else(|| ConnectorError::NotConfigured("prtg connector missing url".to_string()))
    }

    fn auth_query(&self) -> Result<String, ConnectorError> {
        if let Some(token) = &self.config.api_token {
            return Ok(format!("apitoken={token}"));
        }
        match (&self.config.username, &self.config.passhash) {
            (Some(user), Some(passhash)) => Ok(format!("username={user}&passhash={passhash}")),
            _ => Err(ConnectorError::NotConfigured(
                "prtg connector requires api_token or username+passhash".to_string(),
            )),
        }
    }

    async fn set_status(&self, status: ConnectorStatus, error: Option<String>) {
        *self.status.write().await = status;
        *self.last_error.write().await = error;
    }

    /// Resolve `device_ip`/`device` into the payload shape the normalizer
    /// expects (a `device_ip` field already carrying a resolved IPv4).
    async fn enrich_and_normalize(&self, mut raw: serde_json::Value) -> Option<NormalizedAlert> {
        let device_ip_field = raw.get("host").and_then(serde_json::Value::as_str);
        let device_name_field = raw.get("device").and_then(serde_json::Value::as_str);

        let resolved = self.ip_resolver.resolve(device_ip_field, device_name_field).await;
        let Some(resolved) = resolved else {
            tracing::warn!("prtg payload could not resolve device_ip, dropping");
            return None;
        };
        if let serde_json::Value::Object(map) = &mut raw {
            map.insert("device_ip".to_string(), serde_json::Value::String(resolved));
        }
        self.normalizer.normalize(raw)
    }
}

#[async_trait]
impl Connector for PrtgConnector {
    fn connector_type(&self) -> &str {
        "prtg"
    }

    async fn start(&self) -> Result<(), ConnectorError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.base_url()?;
        self.auth_query()?;
        self.set_status(ConnectorStatus::Connected, None).await;
        Ok(())
    }

    async fn stop(&self) {
        self.cancel.cancel();
        self.started.store(false, Ordering::SeqCst);
        self.set_status(ConnectorStatus::Disconnected, None).await;
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        let (base, auth) = match (self.base_url(), self.auth_query()) {
            (Ok(base), Ok(auth)) => (base, auth),
            (Err(err), _) | (_, Err(err)) => {
                return ConnectionTestResult {
                    success: false,
                    message: err.to_string(),
                    details: serde_json::json!({}),
                }
            }
        };

        let url = format!("{base}/api/getstatus.json?{auth}");
        match get_with_fallback(&self.http, &url, &format!("{base}/api/table.json?{auth}")).await {
            Ok(details) => ConnectionTestResult {
                success: true,
                message: "connected".to_string(),
                details,
            },
            Err(err) => ConnectionTestResult {
                success: false,
                message: err.to_string(),
                details: serde_json::json!({}),
            },
        }
    }
}

#[async_trait]
impl PollingConnector for PrtgConnector {
    async fn poll(&self) -> Result<Vec<NormalizedAlert>, ConnectorError> {
        let _serialize = self.stream_lock.lock().await;

        let base = self.base_url()?;
        let auth = self.auth_query()?;
        let table_url = format!(
            "{base}/api/table.json?content=sensors&columns=objid,sensor,device,status,message,lastvalue,lastup&{auth}"
        );
        let getstatus_url = format!("{base}/api/getstatus.json?{auth}");

        let body = tokio::select! {
            result = get_with_fallback(&self.http, &table_url, &getstatus_url) => result?,
            () = self.cancel.cancelled() => {
                return Err(ConnectorError::Transient("poll cancelled".to_string()));
            }
        };

        let sensors = body
            .get("sensors")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut alerts = Vec::with_capacity(sensors.len());
        for raw in sensors {
            if let Some(alert) = self.enrich_and_normalize(raw).await {
                alerts.push(alert);
            }
        }
        Ok(alerts)
    }

    fn poll_interval_seconds(&self) -> u64 {
        self.config.poll_interval_seconds
    }
}

#[async_trait]
impl WebhookConnector for PrtgConnector {
    async fn handle_webhook(
        &self,
        payload: serde_json::Value,
    ) -> Result<Option<NormalizedAlert>, ConnectorError> {
        let _serialize = self.stream_lock.lock().await;
        Ok(self.enrich_and_normalize(payload).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ValueMappingRow;
    use crate::domain::ports::MappingRepository;
    use crate::services::mapping_cache::MappingCache;
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

    fn connector() -> PrtgConnector {
        let mapping_cache = Arc::new(MappingCache::new(Arc::new(EmptyMappingRepository)));
        let config = ConnectorConfig {
            url: Some("http://prtg.example".to_string()),
            api_token: Some("tok".to_string()),
            poll_interval_seconds: 60,
            ..Default::default()
        };
        PrtgConnector::new(
            config,
            Arc::new(PrtgNormalizer::new(mapping_cache)),
            Arc::new(IpResolver::new(10)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let connector = connector();
        connector.start().await.unwrap();
        connector.start().await.unwrap();
        assert_eq!(*connector.status.read().await, ConnectorStatus::Connected);
    }

    #[tokio::test]
    async fn missing_url_fails_start() {
        let mapping_cache = Arc::new(MappingCache::new(Arc::new(EmptyMappingRepository)));
        let connector = PrtgConnector::new(
            ConnectorConfig::default(),
            Arc::new(PrtgNormalizer::new(mapping_cache)),
            Arc::new(IpResolver::new(10)),
        )
        .unwrap();
        assert!(connector.start().await.is_err());
    }

    #[tokio::test]
    async fn webhook_with_resolvable_ip_normalizes() {
        let connector = connector();
        let payload = json!({
            "sensorid": 42, "device": "sw1", "sensor": "Ping",
            "status": "Down", "statusid": 5, "message": "ping",
            "host": "10.1.1.1 (sw1)",
        });
        let alert = connector.handle_webhook(payload).await.unwrap();
        assert!(alert.is_some());
        assert_eq!(alert.unwrap().device_ip, "10.1.1.1");
    }

    #[tokio::test]
    async fn webhook_with_unresolvable_ip_drops() {
        let connector = connector();
        let payload = json!({
            "sensorid": 42, "status": "Down", "statusid": 5, "message": "ping",
        });
        let alert = connector.handle_webhook(payload).await.unwrap();
        assert!(alert.is_none());
    }
}
