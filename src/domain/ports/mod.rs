//! Domain ports (interfaces) for OpsConductor.

pub mod alert_repository;
pub mod alert_rule_repository;
pub mod connector;
pub mod connector_repository;
pub mod execution_repository;
pub mod job_definition_repository;
pub mod mapping_repository;
pub mod normalizer;
pub mod notification_driver;
pub mod notification_repository;
pub mod scheduler_job_repository;
pub mod system_log_repository;
pub mod trap_repository;
pub mod worker_count_probe;

pub use alert_repository::AlertRepository;
pub use alert_rule_repository::AlertRuleRepository;
pub use connector::{Connector, PollingConnector, WebhookConnector};
pub use connector_repository::ConnectorRepository;
pub use execution_repository::ExecutionRepository;
pub use job_definition_repository::JobDefinitionRepository;
pub use mapping_repository::MappingRepository;
pub use normalizer::Normalizer;
pub use notification_driver::NotificationDriver;
pub use notification_repository::NotificationRepository;
pub use scheduler_job_repository::SchedulerJobRepository;
pub use system_log_repository::SystemLogRepository;
pub use trap_repository::TrapRepository;
pub use worker_count_probe::WorkerCountProbe;
