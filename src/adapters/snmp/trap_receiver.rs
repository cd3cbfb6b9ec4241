//! UDP listener, bounded queue, and fixed worker pool: a plain
//! `tokio::net::UdpSocket` recv loop feeds a bounded `mpsc` channel that a
//! fixed-size pool of worker tasks drains, keeping exactly one task for the
//! trap listener and N fixed worker tasks for decode/persist/bridge work.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::domain::models::{
    Category, DecodedTrap, NewNormalizedAlert, NormalizedAlert, RequestContext, Severity,
    TrapEvent, TrapLogEntry, TrapMappingRow, TrapReceiverStatus,
};
use crate::domain::ports::TrapRepository;
use crate::services::alert_manager::AlertManager;
use crate::services::mapping_cache::MappingCache;

use super::ber::decode_trap;
use super::router::TrapRouter;
use super::vendor::{CienaTrapHandler, GenericTrapHandler, HandledTrap, TrapHandler};

const STATUS_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
const QUEUE_RECV_TIMEOUT: Duration = Duration::from_secs(1);
/// Max UDP datagram this receiver accepts; SNMP traps are small, generous
/// headroom is cheap and avoids a truncated-read edge case.
const MAX_DATAGRAM_BYTES: usize = 65_507;

pub struct TrapReceiverConfig {
    pub host: String,
    pub port: u16,
    pub queue_size: usize,
    pub workers: usize,
    pub communities: Vec<String>,
    pub validate_community: bool,
}

#[derive(Default)]
struct Counters {
    traps_received: AtomicU64,
    traps_processed: AtomicU64,
    traps_errors: AtomicU64,
}

pub struct TrapReceiver {
    repo: Arc<dyn TrapRepository>,
    alert_manager: Arc<AlertManager>,
    mapping_cache: Arc<MappingCache>,
    config: TrapReceiverConfig,
    counters: Counters,
    last_trap_at: Mutex<Option<DateTime<Utc>>>,
}

impl TrapReceiver {
    pub fn new(
        repo: Arc<dyn TrapRepository>,
        alert_manager: Arc<AlertManager>,
        mapping_cache: Arc<MappingCache>,
        config: TrapReceiverConfig,
    ) -> Self {
        Self {
            repo,
            alert_manager,
            mapping_cache,
            config,
            counters: Counters::default(),
            last_trap_at: Mutex::new(None),
        }
    }

    /// Binds the UDP socket and runs the listener + worker pool + status
    /// flusher until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> std::io::Result<()> {
        let socket = Arc::new(UdpSocket::bind((self.config.host.as_str(), self.config.port)).await?);
        tracing::info!(host = %self.config.host, port = self.config.port, "snmp trap receiver listening");

        let (tx, rx) = mpsc::channel::<(DecodedTrap, SocketAddr)>(self.config.queue_size);
        let rx = Arc::new(Mutex::new(rx));

        let mut worker_handles = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers.max(1) {
            let receiver = self.clone();
            let rx = rx.clone();
            worker_handles.push(tokio::spawn(async move {
                receiver.worker_loop(worker_id, rx).await;
            }));
        }

        let status_receiver = self.clone();
        let status_cancel = cancel.clone();
        let status_handle = tokio::spawn(async move {
            status_receiver.status_flush_loop(status_cancel).await;
        });

        let mut buf = vec![0u8; MAX_DATAGRAM_BYTES];
        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, source_addr)) => self.accept_datagram(&buf[..len], source_addr, &tx).await,
                        Err(err) => {
                            tracing::warn!(error = %err, "snmp trap receiver recv error");
                            self.counters.traps_errors.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                () = cancel.cancelled() => {
                    tracing::info!("snmp trap receiver shutting down");
                    break;
                }
            }
        }

        drop(tx);
        for handle in worker_handles {
            let _ = handle.await;
        }
        let _ = status_handle.await;
        let _ = self.repo.flush_status(&self.status_snapshot(false).await).await;
        Ok(())
    }

    async fn accept_datagram(
        &self,
        datagram: &[u8],
        source_addr: SocketAddr,
        tx: &mpsc::Sender<(DecodedTrap, SocketAddr)>,
    ) {
        self.counters.traps_received.fetch_add(1, Ordering::Relaxed);
        *self.last_trap_at.lock().await = Some(Utc::now());

        let decoded = match decode_trap(datagram, source_addr) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::debug!(%source_addr, error = %err, "dropping undecodable trap datagram");
                self.counters.traps_errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        if self.config.validate_community && !self.config.communities.contains(&decoded.community) {
            tracing::debug!(%source_addr, "dropping trap with unrecognized community string");
            self.counters.traps_errors.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match tx.try_send((decoded, source_addr)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(%source_addr, "trap queue full, dropping datagram");
                self.counters.traps_errors.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    async fn worker_loop(
        self: Arc<Self>,
        worker_id: usize,
        rx: Arc<Mutex<mpsc::Receiver<(DecodedTrap, SocketAddr)>>>,
    ) {
        tracing::info!(worker_id, "snmp trap worker started");
        loop {
            let next = {
                let mut guard = rx.lock().await;
                tokio::time::timeout(QUEUE_RECV_TIMEOUT, guard.recv()).await
            };
            match next {
                Ok(Some((trap, source_addr))) => self.process_trap(trap, source_addr).await,
                Ok(None) => break,
                Err(_elapsed) => continue,
            }
        }
        tracing::info!(worker_id, "snmp trap worker stopped");
    }

    /// Routes, handles, persists, and bridges one decoded trap into the
    /// alert pipeline. The event is stored before the raw-PDU log row so
    /// the log can carry the resolved `event_id` in a single insert.
    ///
    /// Mapping-miss policy: a vendor handler that doesn't recognize the
    /// trap OID (`event_type == "unknown"`) falls through to
    /// `snmp_trap_mappings` via the mapping cache. A hit there synthesizes
    /// a [`HandledTrap`] from the row; a miss drops the trap silently — a
    /// `trap_log` row is still written for audit, but no `trap_events` row
    /// is created, and the drop counts as `traps_processed`, not
    /// `traps_errors` (the trap was successfully decoded and routed, just
    /// intentionally not actioned).
    async fn process_trap(&self, trap: DecodedTrap, source_addr: SocketAddr) {
        let vendor = TrapRouter::route(&trap);
        let handled = dispatch_handler(vendor, &trap);

        let handled = if handled.event_type == "unknown" {
            match self.mapping_cache.trap_mapping(&trap.trap_oid) {
                Some(mapping) => handled_from_mapping(&trap, source_addr, &mapping),
                None => {
                    tracing::debug!(trap_oid = %trap.trap_oid, %source_addr, "no snmp_trap_mappings row for trap oid, dropping");
                    self.log_unmapped_trap(&trap, source_addr).await;
                    return;
                }
            }
        } else {
            handled
        };

        let event = match self.store_event(&trap, source_addr, vendor, handled).await {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(error = %err, "failed to persist trap event");
                self.counters.traps_errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let raw_varbinds = serde_json::to_value(&trap.varbinds).unwrap_or(serde_json::Value::Null);
        let log_entry = TrapLogEntry {
            id: 0,
            source_addr: source_addr.to_string(),
            trap_oid: trap.trap_oid.clone(),
            raw_varbinds,
            event_id: Some(event.id),
            received_at: Utc::now(),
        };
        if let Err(err) = self.repo.insert_log(&log_entry).await {
            tracing::error!(error = %err, "failed to persist trap log");
            self.counters.traps_errors.fetch_add(1, Ordering::Relaxed);
        }

        self.counters.traps_processed.fetch_add(1, Ordering::Relaxed);

        self.bridge_to_alert_manager(event).await;
    }

    /// Writes the audit-only `trap_log` row for a mapping-miss trap (no
    /// `trap_events` row, no alert).
    async fn log_unmapped_trap(&self, trap: &DecodedTrap, source_addr: SocketAddr) {
        let raw_varbinds = serde_json::to_value(&trap.varbinds).unwrap_or(serde_json::Value::Null);
        let log_entry = TrapLogEntry {
            id: 0,
            source_addr: source_addr.to_string(),
            trap_oid: trap.trap_oid.clone(),
            raw_varbinds,
            event_id: None,
            received_at: Utc::now(),
        };
        if let Err(err) = self.repo.insert_log(&log_entry).await {
            tracing::error!(error = %err, "failed to persist trap log for unmapped trap");
            self.counters.traps_errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.counters.traps_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Inserts the normalized [`TrapEvent`], deduplicating against an
    /// already-uncleared alarm with the same `alarm_id` and, for clears,
    /// resolving which prior event it clears.
    async fn store_event(
        &self,
        trap: &DecodedTrap,
        source_addr: SocketAddr,
        vendor: &str,
        handled: HandledTrap,
    ) -> Result<TrapEvent, crate::domain::errors::DatabaseError> {
        if !handled.is_clear {
            if let Some(existing) = self.repo.find_uncleared_by_alarm_id(&handled.alarm_id).await? {
                tracing::debug!(alarm_id = %handled.alarm_id, "duplicate uncleared alarm, skipping insert");
                return Ok(existing);
            }
        }

        let cleared_event_id = if handled.is_clear {
            self.repo
                .find_uncleared_by_alarm_id(&handled.alarm_id)
                .await?
                .map(|existing| existing.id)
        } else {
            None
        };

        let event = TrapEvent {
            id: 0,
            trap_oid: trap.trap_oid.clone(),
            source_addr: source_addr.ip().to_string(),
            vendor: vendor.to_string(),
            event_type: handled.event_type,
            severity: handled.severity,
            object_type: handled.object_type,
            object_id: handled.object_id,
            description: handled.description,
            alarm_id: handled.alarm_id,
            is_clear: handled.is_clear,
            cleared_event_id,
            occurred_at: Utc::now(),
        };
        let inserted = self.repo.insert_event(&event).await?;

        if let Some(cleared_id) = cleared_event_id {
            self.repo.mark_cleared(cleared_id, inserted.id).await?;
        }

        Ok(inserted)
    }

    /// Bridges a persisted [`TrapEvent`] into a [`NormalizedAlert`] and
    /// hands it to [`AlertManager::process_alert`]: `source_system =
    /// "snmp"`, `correlation_key = alarm_id`, so a raise and its matching
    /// clear collapse onto one fingerprint (`sha256("snmp:{alarm_id}")`).
    ///
    /// Severity is forced to [`Severity::Clear`] whenever `is_clear` is
    /// set, overriding the vendor handler's own severity (e.g. Ciena link-up
    /// reports `Info`): [`NormalizedAlert::new`] requires `is_clear =>
    /// severity == Clear`, the same normalization every other normalizer in
    /// this codebase applies (see `services::normalizers::prtg`).
    async fn bridge_to_alert_manager(&self, event: TrapEvent) {
        let severity = if event.is_clear { Severity::Clear } else { event.severity };
        let input = NewNormalizedAlert {
            source_system: "snmp".to_string(),
            source_alert_id: event.alarm_id.clone(),
            device_ip: event.source_addr.clone(),
            device_name: None,
            severity,
            category: Category::Network,
            alert_type: event.event_type.clone(),
            title: format!("{} ({})", event.description, event.vendor),
            message: event.description.clone(),
            occurred_at: event.occurred_at,
            is_clear: event.is_clear,
            raw_data: serde_json::json!({
                "trap_oid": event.trap_oid,
                "vendor": event.vendor,
                "object_type": event.object_type,
                "object_id": event.object_id,
            }),
            correlation_key: Some(event.alarm_id.clone()),
        };

        let alert = match NormalizedAlert::new(input) {
            Ok(alert) => alert,
            Err(err) => {
                tracing::warn!(alarm_id = %event.alarm_id, error = %err, "trap event failed normalization");
                return;
            }
        };

        let ctx = RequestContext::system(format!("snmp-trap:{}", event.source_addr));
        if let Err(err) = self.alert_manager.process_alert(alert, &ctx).await {
            tracing::error!(alarm_id = %event.alarm_id, error = %err, "failed to process trap-derived alert");
        }
    }

    async fn status_flush_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(STATUS_FLUSH_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let status = self.status_snapshot(true).await;
                    if let Err(err) = self.repo.flush_status(&status).await {
                        tracing::warn!(error = %err, "failed to flush trap receiver status");
                    }
                }
                () = cancel.cancelled() => break,
            }
        }
    }

    async fn status_snapshot(&self, is_running: bool) -> TrapReceiverStatus {
        TrapReceiverStatus {
            traps_received: self.counters.traps_received.load(Ordering::Relaxed),
            traps_processed: self.counters.traps_processed.load(Ordering::Relaxed),
            traps_errors: self.counters.traps_errors.load(Ordering::Relaxed),
            queue_depth: 0,
            last_trap_at: *self.last_trap_at.lock().await,
            is_running,
        }
    }
}

/// `"ciena"` routes to the dedicated handler; every other vendor tag
/// (`standard`/`cisco`/`juniper`/`linux`/`hp`/`dell`/`generic`) routes to
/// the generic one.
fn dispatch_handler(vendor: &str, trap: &DecodedTrap) -> HandledTrap {
    if vendor == "ciena" {
        CienaTrapHandler.handle(trap)
    } else {
        GenericTrapHandler.handle(trap)
    }
}

/// Synthesizes a [`HandledTrap`] from a `snmp_trap_mappings` row for a
/// trap OID no vendor handler recognized. `correlation_key` becomes the
/// `alarm_id` so [`TrapReceiver::bridge_to_alert_manager`] fingerprints the
/// raise/clear pair together, same as every vendor-handled trap.
fn handled_from_mapping(trap: &DecodedTrap, source_addr: SocketAddr, mapping: &TrapMappingRow) -> HandledTrap {
    let alarm_id = mapping
        .correlation_key
        .clone()
        .unwrap_or_else(|| format!("{}:{}", source_addr.ip(), trap.trap_oid));
    HandledTrap {
        event_type: mapping.alert_type.clone(),
        severity: if mapping.is_clear { Severity::Clear } else { Severity::Warning },
        object_type: None,
        object_id: None,
        description: mapping.description.clone(),
        alarm_id,
        is_clear: mapping.is_clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DatabaseError;
    use crate::domain::models::{Category, Severity, TrapMappingRow, ValueMappingRow};
    use crate::domain::ports::{AlertRepository, MappingRepository, NotificationRepository};
    use crate::services::notification_fanout::NotificationFanout;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeTrapRepo {
        events: StdMutex<Vec<TrapEvent>>,
        logs: StdMutex<Vec<TrapLogEntry>>,
    }

    #[async_trait]
    impl TrapRepository for FakeTrapRepo {
        async fn insert_log(&self, entry: &TrapLogEntry) -> Result<TrapLogEntry, DatabaseError> {
            let mut inserted = entry.clone();
            inserted.id = self.logs.lock().unwrap().len() as i64 + 1;
            self.logs.lock().unwrap().push(inserted.clone());
            Ok(inserted)
        }
        async fn find_uncleared_by_alarm_id(
            &self,
            alarm_id: &str,
        ) -> Result<Option<TrapEvent>, DatabaseError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.alarm_id == alarm_id && !e.is_clear && e.cleared_event_id.is_none())
                .cloned())
        }
        async fn insert_event(&self, event: &TrapEvent) -> Result<TrapEvent, DatabaseError> {
            let mut inserted = event.clone();
            inserted.id = self.events.lock().unwrap().len() as i64 + 1;
            self.events.lock().unwrap().push(inserted.clone());
            Ok(inserted)
        }
        async fn mark_cleared(&self, event_id: i64, cleared_by: i64) -> Result<(), DatabaseError> {
            if let Some(e) = self.events.lock().unwrap().iter_mut().find(|e| e.id == event_id) {
                e.cleared_event_id = Some(cleared_by);
            }
            Ok(())
        }
        async fn flush_status(&self, _status: &TrapReceiverStatus) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeMappingRepo {
        trap: Vec<TrapMappingRow>,
    }

    #[async_trait]
    impl MappingRepository for FakeMappingRepo {
        async fn load_severity_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError> {
            Ok(vec![])
        }
        async fn load_category_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError> {
            Ok(vec![])
        }
        async fn load_trap_mappings(&self) -> Result<Vec<TrapMappingRow>, DatabaseError> {
            Ok(self.trap.clone())
        }
    }

    #[derive(Default)]
    struct FakeAlertRepo {
        live: StdMutex<Vec<crate::domain::models::StoredAlert>>,
        next_id: StdMutex<i64>,
    }

    #[async_trait]
    impl AlertRepository for FakeAlertRepo {
        async fn find_live_by_fingerprint(
            &self,
            fingerprint: &str,
        ) -> Result<Option<crate::domain::models::StoredAlert>, DatabaseError> {
            Ok(self.live.lock().unwrap().iter().find(|a| a.fingerprint == fingerprint).cloned())
        }
        async fn get(&self, id: i64) -> Result<Option<crate::domain::models::StoredAlert>, DatabaseError> {
            Ok(self.live.lock().unwrap().iter().find(|a| a.id == id).cloned())
        }
        async fn insert(
            &self,
            alert: &crate::domain::models::StoredAlert,
        ) -> Result<crate::domain::models::StoredAlert, DatabaseError> {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let mut inserted = alert.clone();
            inserted.id = *next;
            self.live.lock().unwrap().push(inserted.clone());
            Ok(inserted)
        }
        async fn bump_occurrence(&self, _id: i64) -> Result<(), DatabaseError> {
            Ok(())
        }
        async fn acknowledge(&self, _id: i64, _by: &str) -> Result<(), DatabaseError> {
            Ok(())
        }
        async fn archive(
            &self,
            id: i64,
            _status: crate::domain::models::AlertStatus,
        ) -> Result<(), DatabaseError> {
            self.live.lock().unwrap().retain(|a| a.id != id);
            Ok(())
        }
        async fn find_expired(&self) -> Result<Vec<crate::domain::models::StoredAlert>, DatabaseError> {
            Ok(vec![])
        }
        async fn find_live_by_rule(&self, _rule_id: i64) -> Result<Vec<crate::domain::models::StoredAlert>, DatabaseError> {
            Ok(vec![])
        }
        async fn last_triggered_at_for_rule(
            &self,
            _rule_id: i64,
        ) -> Result<Option<DateTime<Utc>>, DatabaseError> {
            Ok(None)
        }
    }

    struct FakeNotificationRepo;
    #[async_trait]
    impl NotificationRepository for FakeNotificationRepo {
        async fn find_matching_rules(
            &self,
            _trigger_type: &str,
            _severity: Severity,
            _category: Category,
        ) -> Result<Vec<crate::domain::models::NotificationRule>, DatabaseError> {
            Ok(vec![])
        }
        async fn get_channel(
            &self,
            _id: i64,
        ) -> Result<Option<crate::domain::models::NotificationChannel>, DatabaseError> {
            Ok(None)
        }
        async fn record_delivery(
            &self,
            _alert_id: i64,
            _channel_id: i64,
            _status: &str,
        ) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    fn receiver(trap_repo: Arc<FakeTrapRepo>, trap_mappings: Vec<TrapMappingRow>) -> TrapReceiver {
        let alert_repo = Arc::new(FakeAlertRepo::default());
        let notifier = Arc::new(NotificationFanout::new(Arc::new(FakeNotificationRepo), vec![]));
        let alert_manager = Arc::new(AlertManager::new(alert_repo, notifier, chrono::Duration::hours(24)));
        let mapping_cache = Arc::new(MappingCache::new(Arc::new(FakeMappingRepo { trap: trap_mappings })));
        TrapReceiver::new(
            trap_repo,
            alert_manager,
            mapping_cache,
            TrapReceiverConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                queue_size: 10,
                workers: 1,
                communities: vec!["public".to_string()],
                validate_community: false,
            },
        )
    }

    fn trap(trap_oid: &str) -> DecodedTrap {
        DecodedTrap {
            source_addr: "192.0.2.5:1234".parse().unwrap(),
            community: "public".to_string(),
            trap_oid: trap_oid.to_string(),
            varbinds: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn unmapped_unknown_trap_logs_without_event() {
        let trap_repo = Arc::new(FakeTrapRepo::default());
        let receiver = receiver(trap_repo.clone(), vec![]);
        receiver.mapping_cache.refresh().await.unwrap();

        receiver
            .process_trap(trap("1.3.6.1.4.1.99999.0.1"), "192.0.2.5:1234".parse().unwrap())
            .await;

        assert_eq!(trap_repo.logs.lock().unwrap().len(), 1);
        assert!(trap_repo.logs.lock().unwrap()[0].event_id.is_none());
        assert!(trap_repo.events.lock().unwrap().is_empty());
        assert_eq!(receiver.counters.traps_processed.load(Ordering::Relaxed), 1);
        assert_eq!(receiver.counters.traps_errors.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn mapped_unknown_trap_synthesizes_event_from_mapping_row() {
        let trap_repo = Arc::new(FakeTrapRepo::default());
        let mapping = TrapMappingRow {
            trap_oid: "1.3.6.1.4.1.99999.0.1".to_string(),
            alert_type: "custom_alarm".to_string(),
            is_clear: false,
            correlation_key: Some("custom:42".to_string()),
            vendor: "acme".to_string(),
            description: "custom alarm raised".to_string(),
        };
        let receiver = receiver(trap_repo.clone(), vec![mapping]);
        receiver.mapping_cache.refresh().await.unwrap();

        receiver
            .process_trap(trap("1.3.6.1.4.1.99999.0.1"), "192.0.2.5:1234".parse().unwrap())
            .await;

        assert_eq!(trap_repo.logs.lock().unwrap().len(), 1);
        assert!(trap_repo.logs.lock().unwrap()[0].event_id.is_some());
        let events = trap_repo.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "custom_alarm");
        assert_eq!(events[0].alarm_id, "custom:42");
    }
}
