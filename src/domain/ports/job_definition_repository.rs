use async_trait::async_trait;

use crate::domain::errors::DatabaseError;
use crate::domain::models::JobDefinition;

/// Persistence port for `job_definitions`.
#[async_trait]
pub trait JobDefinitionRepository: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<JobDefinition>, DatabaseError>;

    async fn get_by_name(&self, name: &str) -> Result<Option<JobDefinition>, DatabaseError>;

    async fn list_enabled(&self) -> Result<Vec<JobDefinition>, DatabaseError>;
}
