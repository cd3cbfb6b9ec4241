use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::models::JobDefinition;
use crate::domain::ports::JobDefinitionRepository;

#[derive(Clone)]
pub struct PgJobDefinitionRepository {
    pool: PgPool,
}

impl PgJobDefinitionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct JobDefinitionRow {
    id: i64,
    name: String,
    description: Option<String>,
    definition: serde_json::Value,
    enabled: bool,
}

fn row_to_definition(row: JobDefinitionRow) -> JobDefinition {
    JobDefinition {
        id: row.id,
        name: row.name,
        description: row.description,
        definition: row.definition,
        enabled: row.enabled,
    }
}

#[async_trait]
impl JobDefinitionRepository for PgJobDefinitionRepository {
    async fn get(&self, id: i64) -> Result<Option<JobDefinition>, DatabaseError> {
        let row: Option<JobDefinitionRow> =
            sqlx::query_as("SELECT * FROM job_definitions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(row_to_definition))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<JobDefinition>, DatabaseError> {
        let row: Option<JobDefinitionRow> =
            sqlx::query_as("SELECT * FROM job_definitions WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(row_to_definition))
    }

    async fn list_enabled(&self) -> Result<Vec<JobDefinition>, DatabaseError> {
        let rows: Vec<JobDefinitionRow> =
            sqlx::query_as("SELECT * FROM job_definitions WHERE enabled = true")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(row_to_definition).collect())
    }
}
