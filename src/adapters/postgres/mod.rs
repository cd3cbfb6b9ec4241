pub mod alert_repository;
pub mod alert_rule_repository;
pub mod connection;
pub mod connector_repository;
pub mod execution_repository;
pub mod job_definition_repository;
pub mod mapping_repository;
pub mod migrations;
pub mod notification_repository;
pub mod row_helpers;
pub mod scheduler_job_repository;
pub mod system_log_repository;
pub mod trap_repository;

pub use alert_repository::PgAlertRepository;
pub use alert_rule_repository::PgAlertRuleRepository;
pub use connector_repository::PgConnectorRepository;
pub use execution_repository::PgExecutionRepository;
pub use job_definition_repository::PgJobDefinitionRepository;
pub use mapping_repository::PgMappingRepository;
pub use migrations::{all_embedded_migrations, Migrator};
pub use notification_repository::PgNotificationRepository;
pub use scheduler_job_repository::PgSchedulerJobRepository;
pub use system_log_repository::PgSystemLogRepository;
pub use trap_repository::PgTrapRepository;
