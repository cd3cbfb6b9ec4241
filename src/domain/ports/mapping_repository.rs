use async_trait::async_trait;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{TrapMappingRow, ValueMappingRow};

/// Read port behind the mapping cache. The cache itself
/// (`services::mapping_cache`) owns refresh cadence and the atomic-snapshot
/// guarantee; this port only knows how to load a full table.
#[async_trait]
pub trait MappingRepository: Send + Sync {
    async fn load_severity_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError>;

    async fn load_category_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError>;

    async fn load_trap_mappings(&self) -> Result<Vec<TrapMappingRow>, DatabaseError>;
}
