//! Read-mostly cache over `severity_mappings`/`category_mappings`/
//! `snmp_trap_mappings`.
//!
//! Uses a read-mostly `RwLock<Arc<Snapshot>>` pattern for shared state
//! read far more often than written. Reads never block on a refresh in
//! progress: a reader takes the `std::sync::RwLock` only long enough to
//! clone the `Arc`, never across an `.await`. Refresh is single-flight via
//! a `try_lock` on an async mutex — a refresh already in flight
//! short-circuits a concurrent caller rather than issuing a second
//! redundant set of queries.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex as AsyncMutex;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{Category, Severity, TrapMappingRow};
use crate::domain::ports::MappingRepository;

type ValueMapKey = (String, String, String);

#[derive(Debug, Default)]
struct Snapshot {
    severity: HashMap<ValueMapKey, Severity>,
    category: HashMap<ValueMapKey, Category>,
    trap: HashMap<String, TrapMappingRow>,
}

pub struct MappingCache {
    repo: Arc<dyn MappingRepository>,
    snapshot: RwLock<Arc<Snapshot>>,
    refresh_lock: AsyncMutex<()>,
}

impl MappingCache {
    pub fn new(repo: Arc<dyn MappingRepository>) -> Self {
        Self {
            repo,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            refresh_lock: AsyncMutex::new(()),
        }
    }

    /// Loads all three tables and atomically swaps the snapshot. Readers
    /// mid-flight may see either the old or new snapshot; that's
    /// acceptable since a mapping change is not linearizability-sensitive.
    pub async fn refresh(&self) -> Result<(), DatabaseError> {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            tracing::debug!("mapping cache refresh already in flight, skipping");
            return Ok(());
        };

        let severity_rows = self.repo.load_severity_mappings().await?;
        let category_rows = self.repo.load_category_mappings().await?;
        let trap_rows = self.repo.load_trap_mappings().await?;

        let mut severity = HashMap::with_capacity(severity_rows.len());
        for row in severity_rows {
            if let Some(target) = Severity::from_str(&row.target) {
                severity.insert(
                    (row.connector_type, row.source_field, row.source_value),
                    target,
                );
            } else {
                tracing::warn!(target = %row.target, "severity mapping row has unparseable target, ignoring");
            }
        }

        let mut category = HashMap::with_capacity(category_rows.len());
        for row in category_rows {
            if let Some(target) = Category::from_str(&row.target) {
                category.insert(
                    (row.connector_type, row.source_field, row.source_value),
                    target,
                );
            } else {
                tracing::warn!(target = %row.target, "category mapping row has unparseable target, ignoring");
            }
        }

        let trap = trap_rows
            .into_iter()
            .map(|row| (row.trap_oid.clone(), row))
            .collect();

        let next = Arc::new(Snapshot {
            severity,
            category,
            trap,
        });

        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
        Ok(())
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Looked up synchronously so `domain::ports::Normalizer::normalize`
    /// (a non-async trait method) can consult it directly.
    pub fn severity_for(&self, connector_type: &str, source_field: &str, source_value: &str) -> Option<Severity> {
        self.current()
            .severity
            .get(&(
                connector_type.to_string(),
                source_field.to_string(),
                source_value.to_string(),
            ))
            .copied()
    }

    pub fn category_for(&self, connector_type: &str, source_field: &str, source_value: &str) -> Option<Category> {
        self.current()
            .category
            .get(&(
                connector_type.to_string(),
                source_field.to_string(),
                source_value.to_string(),
            ))
            .copied()
    }

    pub fn trap_mapping(&self, trap_oid: &str) -> Option<TrapMappingRow> {
        self.current().trap.get(trap_oid).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::domain::models::ValueMappingRow;

    struct FakeMappingRepository {
        severity: Vec<ValueMappingRow>,
        category: Vec<ValueMappingRow>,
        trap: Vec<TrapMappingRow>,
    }

    #[async_trait]
    impl MappingRepository for FakeMappingRepository {
        async fn load_severity_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError> {
            Ok(self.severity.clone())
        }
        async fn load_category_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError> {
            Ok(self.category.clone())
        }
        async fn load_trap_mappings(&self) -> Result<Vec<TrapMappingRow>, DatabaseError> {
            Ok(self.trap.clone())
        }
    }

    fn value_row(connector_type: &str, field: &str, value: &str, target: &str) -> ValueMappingRow {
        ValueMappingRow {
            connector_type: connector_type.to_string(),
            source_field: field.to_string(),
            source_value: value.to_string(),
            target: target.to_string(),
        }
    }

    #[tokio::test]
    async fn refresh_populates_lookups() {
        let repo = Arc::new(FakeMappingRepository {
            severity: vec![value_row("prtg", "statusid", "5", "critical")],
            category: vec![value_row("prtg", "sensor", "ping", "network")],
            trap: vec![TrapMappingRow {
                trap_oid: "1.3.6.1.6.3.1.1.5.3".to_string(),
                alert_type: "link_down".to_string(),
                is_clear: false,
                correlation_key: Some("link:3".to_string()),
                vendor: "ciena".to_string(),
                description: "link down".to_string(),
            }],
        });
        let cache = MappingCache::new(repo);
        cache.refresh().await.unwrap();

        assert_eq!(
            cache.severity_for("prtg", "statusid", "5"),
            Some(Severity::Critical)
        );
        assert_eq!(
            cache.category_for("prtg", "sensor", "ping"),
            Some(Category::Network)
        );
        assert!(cache.trap_mapping("1.3.6.1.6.3.1.1.5.3").is_some());
        assert!(cache.trap_mapping("1.3.6.1.6.3.1.1.5.99").is_none());
    }

    #[tokio::test]
    async fn unparseable_target_is_dropped_not_panicked() {
        let repo = Arc::new(FakeMappingRepository {
            severity: vec![value_row("prtg", "statusid", "5", "not-a-severity")],
            category: vec![],
            trap: vec![],
        });
        let cache = MappingCache::new(repo);
        cache.refresh().await.unwrap();
        assert_eq!(cache.severity_for("prtg", "statusid", "5"), None);
    }
}
