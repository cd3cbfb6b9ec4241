//! OpsConductor daemon entry point.
//!
//! Bootstrap shape: config load, pool connect, migrate, construct
//! repositories/services, then run until a shutdown signal. There is no
//! interactive command surface here, only a `--config` override and the
//! process lifetime itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use opsconductor::adapters::connectors::ConnectorRegistry;
use opsconductor::adapters::http::webhook_server::{WebhookServer, WebhookServerConfig};
use opsconductor::adapters::notifications::{EmailDriver, SlackDriver, WebhookDriver};
use opsconductor::adapters::postgres::{
    self, all_embedded_migrations, Migrator, PgAlertRepository, PgAlertRuleRepository,
    PgConnectorRepository, PgExecutionRepository, PgJobDefinitionRepository, PgMappingRepository,
    PgNotificationRepository, PgSchedulerJobRepository, PgSystemLogRepository, PgTrapRepository,
};
use opsconductor::adapters::snmp::trap_receiver::{TrapReceiver, TrapReceiverConfig};
use opsconductor::domain::models::{ConnectorConfig, RequestContext};
use opsconductor::domain::ports::{ConnectorRepository, NotificationDriver, WorkerCountProbe};
use opsconductor::infrastructure::config::ConfigLoader;
use opsconductor::infrastructure::logging::LoggerHandle;
use opsconductor::services::alert_manager::AlertManager;
use opsconductor::services::connector_loop::run_polling_connector;
use opsconductor::services::ip_resolution::IpResolver;
use opsconductor::services::mapping_cache::MappingCache;
use opsconductor::services::notification_fanout::NotificationFanout;
use opsconductor::services::rule_evaluator::RuleEvaluator;
use opsconductor::services::scheduler::Scheduler;
use opsconductor::services::task_handlers::{
    AlertsEvaluateHandler, DiscoveryScanChunkHandler, JobRunHandler, WorkflowRunHandler,
};
use opsconductor::services::worker_pool::WorkerPool;

/// Alert ingestion, correlation, and scheduling core for network/
/// infrastructure monitoring.
#[derive(Parser, Debug)]
#[command(name = "opsconductord", version, about)]
struct Cli {
    /// Path to a YAML config file, merged under env-var overrides.
    #[arg(long, env = "OPSCONDUCTOR_CONFIG_FILE")]
    config: Option<std::path::PathBuf>,
}

/// The rule evaluator's `worker_count` condition only ever compares against
/// the pool's configured size (matching [`WorkerPool`]'s own
/// [`WorkerCountProbe`] impl, which reports `max_workers` rather than a live
/// count), so this probe is handed a plain copy of that config value instead
/// of a second `Arc` onto the pool itself — sidesteps a construction-order
/// cycle (`WorkerPool` needs the rule-evaluate handler, which needs
/// `RuleEvaluator`, which needs the probe) without changing either type's
/// observable behavior.
struct ConfiguredWorkerCountProbe(usize);

#[async_trait]
impl WorkerCountProbe for ConfiguredWorkerCountProbe {
    async fn observed_worker_count(&self) -> Option<usize> {
        Some(self.0)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path).context("failed to load configuration")?,
        None => ConfigLoader::load().context("failed to load configuration")?,
    };

    let _logger = LoggerHandle::init(&config.logging).context("failed to initialize logging")?;
    tracing::info!("opsconductord starting up");

    let pool = postgres::connection::create_pool(&config.database)
        .await
        .context("failed to create database pool")?;
    postgres::connection::verify_connection(&pool)
        .await
        .context("database connection check failed")?;

    let applied = Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("failed to run database migrations")?;
    tracing::info!(applied, "database migrations up to date");

    let alert_repo = Arc::new(PgAlertRepository::new(pool.clone()));
    let alert_rule_repo = Arc::new(PgAlertRuleRepository::new(pool.clone()));
    let connector_repo = Arc::new(PgConnectorRepository::new(pool.clone()));
    let execution_repo = Arc::new(PgExecutionRepository::new(pool.clone()));
    let job_definition_repo = Arc::new(PgJobDefinitionRepository::new(pool.clone()));
    let mapping_repo = Arc::new(PgMappingRepository::new(pool.clone()));
    let notification_repo = Arc::new(PgNotificationRepository::new(pool.clone()));
    let scheduler_job_repo = Arc::new(PgSchedulerJobRepository::new(pool.clone()));
    let system_log_repo = Arc::new(PgSystemLogRepository::new(pool.clone()));
    let trap_repo = Arc::new(PgTrapRepository::new(pool));

    let mapping_cache = Arc::new(MappingCache::new(mapping_repo));
    mapping_cache
        .refresh()
        .await
        .context("failed to load initial mapping cache")?;
    let ip_resolver = Arc::new(IpResolver::new(1_000));

    let drivers: Vec<Arc<dyn NotificationDriver>> = vec![
        Arc::new(WebhookDriver::new()),
        Arc::new(SlackDriver::new()),
        Arc::new(EmailDriver::new()),
    ];
    let notifier = Arc::new(NotificationFanout::new(notification_repo, drivers));

    let default_ttl = chrono::Duration::hours(config.alerts.default_ttl_hours);
    let alert_manager = Arc::new(AlertManager::new(alert_repo.clone(), notifier, default_ttl));

    let worker_probe: Arc<dyn WorkerCountProbe> =
        Arc::new(ConfiguredWorkerCountProbe(config.scheduler.max_workers));
    let rule_evaluator = Arc::new(RuleEvaluator::new(
        alert_rule_repo,
        alert_repo,
        system_log_repo,
        execution_repo.clone(),
        worker_probe,
        alert_manager.clone(),
        default_ttl,
    ));

    let mut worker_pool = WorkerPool::new(execution_repo, config.scheduler.max_workers, "scheduler");
    worker_pool.register_handler("opsconductor.job.run", Arc::new(JobRunHandler::new(job_definition_repo)));
    worker_pool.register_handler("opsconductor.workflow.run", Arc::new(WorkflowRunHandler));
    worker_pool.register_handler(
        "opsconductor.alerts.evaluate",
        Arc::new(AlertsEvaluateHandler::new(rule_evaluator.clone())),
    );
    worker_pool.register_handler(
        "opsconductor.discovery.scan_chunk",
        Arc::new(DiscoveryScanChunkHandler::new(ip_resolver.clone())),
    );
    let worker_pool = Arc::new(worker_pool);

    let cancel = CancellationToken::new();

    let scheduler = Arc::new(Scheduler::new(
        scheduler_job_repo,
        worker_pool,
        Duration::from_secs(config.scheduler.tick_interval_seconds.max(1)),
        chrono::Duration::minutes(config.scheduler.stale_timeout_minutes),
        Duration::from_secs(config.scheduler.stale_check_interval_seconds.max(1)),
        cancel.clone(),
    ));

    let connector_registry = ConnectorRegistry::new(mapping_cache.clone(), ip_resolver.clone());
    let enabled_connectors = connector_repo
        .list_enabled()
        .await
        .context("failed to load enabled connectors")?;

    let mut webhook_connectors = HashMap::new();
    let mut connector_tasks = Vec::new();
    for record in enabled_connectors {
        let instance_config: ConnectorConfig = match serde_json::from_value(record.config.clone()) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::error!(connector_id = record.id, error = %err, "invalid connector config, skipping");
                continue;
            }
        };
        let built = match connector_registry.build(&record.connector_type, instance_config) {
            Ok(built) => built,
            Err(err) => {
                tracing::error!(connector_id = record.id, connector_type = %record.connector_type, error = %err, "failed to build connector, skipping");
                continue;
            }
        };

        if let Some(webhook) = built.as_webhook() {
            webhook_connectors.insert(record.id, webhook);
        }
        if let Some(polling) = built.as_polling() {
            connector_tasks.push(tokio::spawn(run_polling_connector(
                record.id,
                polling,
                connector_repo.clone(),
                alert_manager.clone(),
                cancel.clone(),
            )));
        }
    }

    let trap_receiver = Arc::new(TrapReceiver::new(
        trap_repo,
        alert_manager.clone(),
        mapping_cache.clone(),
        TrapReceiverConfig {
            host: config.snmp_trap.host.clone(),
            port: config.snmp_trap.port,
            queue_size: config.snmp_trap.queue_size,
            workers: config.snmp_trap.workers,
            communities: config.snmp_trap.communities.clone(),
            validate_community: config.snmp_trap.validate_community,
        },
    ));
    let trap_cancel = cancel.clone();
    let trap_handle = tokio::spawn(async move {
        if let Err(err) = trap_receiver.run(trap_cancel).await {
            tracing::error!(error = %err, "trap receiver exited with an error");
        }
    });

    let webhook_server = WebhookServer::new(
        WebhookServerConfig {
            host: config.http.host.clone(),
            port: config.http.port,
        },
        webhook_connectors,
        alert_manager.clone(),
    );
    let webhook_cancel = cancel.clone();
    let webhook_handle = tokio::spawn(async move {
        if let Err(err) = webhook_server
            .serve_with_shutdown(async move { webhook_cancel.cancelled().await })
            .await
        {
            tracing::error!(error = %err, "webhook server exited with an error");
        }
    });

    let scheduler_handle = tokio::spawn(scheduler.run());

    let rule_evaluator_handle = tokio::spawn(run_rule_evaluator_loop(
        rule_evaluator,
        Duration::from_secs(config.scheduler.rule_evaluator_interval_seconds.max(1)),
        cancel.clone(),
    ));

    let ttl_expirer_handle = tokio::spawn(run_ttl_expirer_loop(
        alert_manager,
        Duration::from_secs(config.scheduler.ttl_expirer_interval_seconds.max(1)),
        cancel.clone(),
    ));

    let mapping_refresh_handle = tokio::spawn(run_mapping_cache_refresh_loop(
        mapping_cache,
        Duration::from_secs(config.scheduler.mapping_cache_refresh_interval_seconds.max(1)),
        cancel.clone(),
    ));

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    tracing::info!("shutdown signal received, stopping all subsystems");
    cancel.cancel();

    for task in connector_tasks {
        let _ = task.await;
    }
    let _ = trap_handle.await;
    let _ = webhook_handle.await;
    let _ = scheduler_handle.await;
    let _ = rule_evaluator_handle.await;
    let _ = ttl_expirer_handle.await;
    let _ = mapping_refresh_handle.await;

    tracing::info!("opsconductord shut down cleanly");
    Ok(())
}

/// Runs as its own task: the rule-evaluator tick loop.
async fn run_rule_evaluator_loop(rule_evaluator: Arc<RuleEvaluator>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let ctx = RequestContext::system("rule-evaluator-tick");
                if let Err(err) = rule_evaluator.tick(&ctx).await {
                    tracing::error!(error = %err, "rule evaluator tick failed");
                }
            }
            () = cancel.cancelled() => break,
        }
    }
}

/// Runs as its own task: the TTL-expirer tick loop.
async fn run_ttl_expirer_loop(alert_manager: Arc<AlertManager>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let ctx = RequestContext::system("ttl-expirer-tick");
                match alert_manager.expire_ttl(&ctx).await {
                    Ok(count) if count > 0 => tracing::info!(count, "expired alerts past TTL"),
                    Ok(_) => {}
                    Err(err) => tracing::error!(error = %err, "TTL expiry pass failed"),
                }
            }
            () = cancel.cancelled() => break,
        }
    }
}

/// Runs as its own task: the mapping-cache refresher.
async fn run_mapping_cache_refresh_loop(mapping_cache: Arc<MappingCache>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = mapping_cache.refresh().await {
                    tracing::error!(error = %err, "mapping cache refresh failed");
                }
            }
            () = cancel.cancelled() => break,
        }
    }
}
