pub mod alert_rule;
pub mod category;
pub mod connector;
pub mod context;
pub mod execution;
pub mod job_definition;
pub mod mapping;
pub mod normalized_alert;
pub mod notification;
pub mod scheduler_job;
pub mod severity;
pub mod stored_alert;
pub mod trap;

pub use alert_rule::{
    AlertRule, ConditionType, ErrorRateConfig, JobFailureConfig, LongRunningJobConfig,
    WorkerCountConfig,
};
pub use category::Category;
pub use connector::{
    ConnectionTestResult, ConnectorConfig, ConnectorRecord, ConnectorStatus, SnmpOidEntry,
};
pub use context::RequestContext;
pub use execution::{Execution, ExecutionStatus, ExecutionStep, Progress, StepStatus};
pub use job_definition::JobDefinition;
pub use mapping::{TrapMappingRow, ValueMappingRow};
pub use normalized_alert::{compute_fingerprint, NewNormalizedAlert, NormalizedAlert};
pub use notification::{
    DeliveryResult, NotificationChannel, NotificationHistoryEntry, NotificationRule,
};
pub use scheduler_job::{ScheduleType, SchedulerJob};
pub use severity::Severity;
pub use stored_alert::{AlertStatus, StoredAlert};
pub use trap::{DecodedTrap, TrapEvent, TrapLogEntry, TrapReceiverStatus};
