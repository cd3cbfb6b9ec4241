//! Business-logic services sitting between `domain::ports` and
//! `adapters::*`: the mapping cache, IP resolution, normalizers, alert
//! manager, notification fan-out, rule evaluator, and scheduler substrate.

pub mod alert_manager;
pub mod connector_loop;
pub mod ip_resolution;
pub mod mapping_cache;
pub mod normalizers;
pub mod notification_fanout;
pub mod rule_evaluator;
pub mod scheduler;
pub mod task_handlers;
pub mod worker_pool;

pub use alert_manager::AlertManager;
pub use ip_resolution::IpResolver;
pub use mapping_cache::MappingCache;
pub use notification_fanout::NotificationFanout;
pub use rule_evaluator::RuleEvaluator;
pub use scheduler::Scheduler;
pub use worker_pool::WorkerPool;
