use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{TrapMappingRow, ValueMappingRow};
use crate::domain::ports::MappingRepository;

#[derive(Clone)]
pub struct PgMappingRepository {
    pool: PgPool,
}

impl PgMappingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PgMappingRepository {
    async fn load_severity_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError> {
        let rows: Vec<ValueMappingRow> = sqlx::query_as(
            "SELECT connector_type, source_field, source_value, target FROM severity_mappings",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn load_category_mappings(&self) -> Result<Vec<ValueMappingRow>, DatabaseError> {
        let rows: Vec<ValueMappingRow> = sqlx::query_as(
            "SELECT connector_type, source_field, source_value, target FROM category_mappings",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn load_trap_mappings(&self) -> Result<Vec<TrapMappingRow>, DatabaseError> {
        let rows: Vec<TrapMappingRow> = sqlx::query_as(
            "SELECT trap_oid, alert_type, is_clear, correlation_key, vendor, description FROM snmp_trap_mappings",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
