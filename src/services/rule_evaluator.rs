//! Rule evaluator: per enabled rule, a cooldown check, then a
//! condition-type-specific evaluation, then (once every rule has run) a
//! walk that auto-resolves alerts whose triggering condition is no longer
//! true.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;

use crate::domain::errors::RuleEvaluatorError;
use crate::domain::models::{
    AlertRule, AlertStatus, Category, ConditionType, ErrorRateConfig, JobFailureConfig,
    LongRunningJobConfig, NewNormalizedAlert, NormalizedAlert, RequestContext, Severity,
    WorkerCountConfig,
};
use crate::domain::ports::{
    AlertRepository, AlertRuleRepository, ExecutionRepository, SystemLogRepository,
    WorkerCountProbe,
};
use crate::services::alert_manager::AlertManager;

/// Stand-in device for rule-synthesized alerts, which have no physical
/// device of their own but must satisfy `NormalizedAlert::new`'s non-empty
/// valid-IPv4 `device_ip` invariant.
const SYSTEM_DEVICE_IP: &str = "0.0.0.0";

pub struct RuleEvaluator {
    rule_repo: Arc<dyn AlertRuleRepository>,
    alert_repo: Arc<dyn AlertRepository>,
    log_repo: Arc<dyn SystemLogRepository>,
    execution_repo: Arc<dyn ExecutionRepository>,
    worker_probe: Arc<dyn WorkerCountProbe>,
    alert_manager: Arc<AlertManager>,
    default_ttl: Duration,
}

impl RuleEvaluator {
    pub fn new(
        rule_repo: Arc<dyn AlertRuleRepository>,
        alert_repo: Arc<dyn AlertRepository>,
        log_repo: Arc<dyn SystemLogRepository>,
        execution_repo: Arc<dyn ExecutionRepository>,
        worker_probe: Arc<dyn WorkerCountProbe>,
        alert_manager: Arc<AlertManager>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            rule_repo,
            alert_repo,
            log_repo,
            execution_repo,
            worker_probe,
            alert_manager,
            default_ttl,
        }
    }

    /// One evaluator tick: evaluate every enabled rule, then auto-resolve
    /// alerts whose rule condition is no longer true.
    pub async fn tick(&self, ctx: &RequestContext) -> Result<(), RuleEvaluatorError> {
        let rules = self.rule_repo.list_enabled().await?;

        for rule in &rules {
            if let Err(err) = self.evaluate_rule(rule, ctx).await {
                tracing::error!(
                    request_id = %ctx.request_id,
                    rule_id = rule.id,
                    rule = %rule.name,
                    error = %err,
                    "rule evaluation failed"
                );
            }
        }

        for rule in &rules {
            if let Err(err) = self.auto_resolve_rule(rule, ctx).await {
                tracing::error!(
                    request_id = %ctx.request_id,
                    rule_id = rule.id,
                    rule = %rule.name,
                    error = %err,
                    "rule auto-resolve failed"
                );
            }
        }

        Ok(())
    }

    async fn evaluate_rule(
        &self,
        rule: &AlertRule,
        ctx: &RequestContext,
    ) -> Result<(), RuleEvaluatorError> {
        if self.in_cooldown(rule).await? {
            tracing::debug!(request_id = %ctx.request_id, rule_id = rule.id, "rule in cooldown, skipping");
            return Ok(());
        }

        if !self.condition_met(rule).await? {
            return Ok(());
        }

        let alert = self.synthesize_alert(rule)?;
        let stored = crate::domain::models::StoredAlert::from_rule_raise(&alert, self.default_ttl, rule.id);

        match self
            .alert_repo
            .find_live_by_fingerprint(&alert.fingerprint)
            .await?
        {
            Some(existing) => {
                self.alert_repo.bump_occurrence(existing.id).await?;
                tracing::debug!(request_id = %ctx.request_id, rule_id = rule.id, alert_id = existing.id, "rule alert occurrence bumped");
            }
            None => {
                let inserted = self.alert_repo.insert(&stored).await?;
                tracing::info!(request_id = %ctx.request_id, rule_id = rule.id, alert_id = inserted.id, "rule alert raised");
                self.alert_manager.notify_raised(&inserted, ctx).await;
            }
        }

        Ok(())
    }

    async fn in_cooldown(&self, rule: &AlertRule) -> Result<bool, RuleEvaluatorError> {
        let Some(last) = self.alert_repo.last_triggered_at_for_rule(rule.id).await? else {
            return Ok(false);
        };
        let cooldown = Duration::minutes(rule.cooldown_minutes);
        Ok(last + cooldown > Utc::now())
    }

    async fn condition_met(&self, rule: &AlertRule) -> Result<bool, RuleEvaluatorError> {
        match rule.condition_type {
            ConditionType::ErrorRate | ConditionType::ErrorCount => {
                let config: ErrorRateConfig = parse_config(rule)?;
                let count = self
                    .log_repo
                    .count_by_levels_in_window(&config.levels, Duration::minutes(config.time_window_minutes))
                    .await?;
                Ok(count >= config.threshold)
            }
            ConditionType::JobFailureCount => {
                let config: JobFailureConfig = parse_config(rule)?;
                let count = self
                    .execution_repo
                    .count_failed_in_window(Duration::minutes(config.time_window_minutes))
                    .await?;
                Ok(count >= config.threshold)
            }
            ConditionType::WorkerCount => {
                let config: WorkerCountConfig = parse_config(rule)?;
                let observed = self.worker_probe.observed_worker_count().await.unwrap_or(0);
                Ok((observed as i64) < config.min_workers)
            }
            ConditionType::LongRunningJob => {
                let config: LongRunningJobConfig = parse_config(rule)?;
                let count = self
                    .execution_repo
                    .count_running_longer_than(Duration::minutes(config.max_duration_minutes))
                    .await?;
                Ok(count > 0)
            }
        }
    }

    fn synthesize_alert(&self, rule: &AlertRule) -> Result<NormalizedAlert, RuleEvaluatorError> {
        let alert_key = rule.alert_key();
        let title = format!("Rule triggered: {}", rule.name);
        let message = format!(
            "Rule \"{}\" ({}) condition met",
            rule.name,
            rule.condition_type.as_str()
        );

        let input = NewNormalizedAlert {
            source_system: "rule_evaluator".to_string(),
            source_alert_id: alert_key.clone(),
            device_ip: SYSTEM_DEVICE_IP.to_string(),
            device_name: None,
            severity: rule.severity,
            category: rule.category,
            alert_type: alert_key.clone(),
            title,
            message,
            occurred_at: Utc::now(),
            is_clear: false,
            raw_data: Value::Null,
            correlation_key: Some(alert_key),
        };

        Ok(NormalizedAlert::new(input)?)
    }

    /// After every rule has been evaluated, re-check each rule's condition
    /// against its currently-live alerts and archive any that are no longer
    /// true.
    async fn auto_resolve_rule(
        &self,
        rule: &AlertRule,
        ctx: &RequestContext,
    ) -> Result<(), RuleEvaluatorError> {
        let live = self.alert_repo.find_live_by_rule(rule.id).await?;
        if live.is_empty() {
            return Ok(());
        }
        if self.condition_met(rule).await? {
            return Ok(());
        }
        for alert in live {
            // acknowledged alerts are left for manual resolution unless
            // the rule opts into auto-resolving them.
            if alert.status == AlertStatus::Acknowledged && !rule.auto_resolve_acknowledged {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    rule_id = rule.id,
                    alert_id = alert.id,
                    "rule alert acknowledged, skipping auto-resolve per rule option"
                );
                continue;
            }
            self.alert_repo.archive(alert.id, AlertStatus::Resolved).await?;
            tracing::info!(
                request_id = %ctx.request_id,
                rule_id = rule.id,
                alert_id = alert.id,
                "rule alert auto-resolved, condition no longer true"
            );
        }
        Ok(())
    }
}

fn parse_config<T: serde::de::DeserializeOwned>(rule: &AlertRule) -> Result<T, RuleEvaluatorError> {
    serde_json::from_value(rule.condition_config.clone()).map_err(|source| {
        RuleEvaluatorError::MalformedConfig {
            rule_id: rule.id,
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DatabaseError;
    use crate::domain::models::{Execution, ExecutionStatus, Progress, StoredAlert};
    use crate::domain::ports::NotificationRepository;
    use crate::services::notification_fanout::NotificationFanout;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeRuleRepo(Vec<AlertRule>);
    #[async_trait]
    impl AlertRuleRepository for FakeRuleRepo {
        async fn list_enabled(&self) -> Result<Vec<AlertRule>, DatabaseError> {
            Ok(self.0.clone())
        }
        async fn get(&self, id: i64) -> Result<Option<AlertRule>, DatabaseError> {
            Ok(self.0.iter().find(|r| r.id == id).cloned())
        }
    }

    #[derive(Default)]
    struct FakeAlertRepo {
        live: Mutex<Vec<StoredAlert>>,
        next_id: Mutex<i64>,
        last_triggered: Mutex<Option<chrono::DateTime<Utc>>>,
        archived: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl AlertRepository for FakeAlertRepo {
        async fn find_live_by_fingerprint(
            &self,
            fingerprint: &str,
        ) -> Result<Option<StoredAlert>, DatabaseError> {
            Ok(self
                .live
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.fingerprint == fingerprint)
                .cloned())
        }
        async fn get(&self, id: i64) -> Result<Option<StoredAlert>, DatabaseError> {
            Ok(self.live.lock().unwrap().iter().find(|a| a.id == id).cloned())
        }
        async fn insert(&self, alert: &StoredAlert) -> Result<StoredAlert, DatabaseError> {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let mut inserted = alert.clone();
            inserted.id = *next;
            self.live.lock().unwrap().push(inserted.clone());
            Ok(inserted)
        }
        async fn bump_occurrence(&self, _id: i64) -> Result<(), DatabaseError> {
            Ok(())
        }
        async fn acknowledge(&self, _id: i64, _by: &str) -> Result<(), DatabaseError> {
            Ok(())
        }
        async fn archive(&self, id: i64, _status: AlertStatus) -> Result<(), DatabaseError> {
            self.live.lock().unwrap().retain(|a| a.id != id);
            self.archived.lock().unwrap().push(id);
            Ok(())
        }
        async fn find_expired(&self) -> Result<Vec<StoredAlert>, DatabaseError> {
            Ok(vec![])
        }
        async fn find_live_by_rule(&self, rule_id: i64) -> Result<Vec<StoredAlert>, DatabaseError> {
            Ok(self
                .live
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.rule_id == Some(rule_id))
                .cloned()
                .collect())
        }
        async fn last_triggered_at_for_rule(
            &self,
            _rule_id: i64,
        ) -> Result<Option<chrono::DateTime<Utc>>, DatabaseError> {
            Ok(*self.last_triggered.lock().unwrap())
        }
    }

    struct FakeLogRepo(i64);
    #[async_trait]
    impl SystemLogRepository for FakeLogRepo {
        async fn count_by_levels_in_window(
            &self,
            _levels: &[String],
            _window: Duration,
        ) -> Result<i64, DatabaseError> {
            Ok(self.0)
        }
    }

    struct FakeExecutionRepo {
        failed: i64,
        long_running: i64,
    }
    #[async_trait]
    impl ExecutionRepository for FakeExecutionRepo {
        async fn insert(&self, execution: &Execution) -> Result<Execution, DatabaseError> {
            Ok(execution.clone())
        }
        async fn get(&self, _id: i64) -> Result<Option<Execution>, DatabaseError> {
            Ok(None)
        }
        async fn mark_started(&self, _id: i64, _worker: &str) -> Result<(), DatabaseError> {
            Ok(())
        }
        async fn update_progress(&self, _id: i64, _progress: &Progress) -> Result<(), DatabaseError> {
            Ok(())
        }
        async fn mark_terminal(
            &self,
            _id: i64,
            _status: ExecutionStatus,
            _result: Option<Value>,
            _error_message: Option<String>,
        ) -> Result<(), DatabaseError> {
            Ok(())
        }
        async fn find_stale(&self, _stale_timeout: Duration) -> Result<Vec<Execution>, DatabaseError> {
            Ok(vec![])
        }
        async fn count_failed_in_window(&self, _window: Duration) -> Result<i64, DatabaseError> {
            Ok(self.failed)
        }
        async fn count_running_longer_than(&self, _max_duration: Duration) -> Result<i64, DatabaseError> {
            Ok(self.long_running)
        }
    }

    struct FakeWorkerProbe(Option<usize>);
    #[async_trait]
    impl WorkerCountProbe for FakeWorkerProbe {
        async fn observed_worker_count(&self) -> Option<usize> {
            self.0
        }
    }

    struct FakeNotificationRepo;
    #[async_trait]
    impl NotificationRepository for FakeNotificationRepo {
        async fn find_matching_rules(
            &self,
            _trigger_type: &str,
            _severity: Severity,
            _category: Category,
        ) -> Result<Vec<crate::domain::models::NotificationRule>, DatabaseError> {
            Ok(vec![])
        }
        async fn get_channel(
            &self,
            _id: i64,
        ) -> Result<Option<crate::domain::models::NotificationChannel>, DatabaseError> {
            Ok(None)
        }
        async fn record_delivery(
            &self,
            _alert_id: i64,
            _channel_id: i64,
            _result: crate::domain::models::DeliveryResult,
            _error_message: Option<String>,
        ) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    fn error_rate_rule() -> AlertRule {
        AlertRule {
            id: 1,
            name: "high_error_rate".to_string(),
            enabled: true,
            severity: Severity::Critical,
            category: Category::Application,
            condition_type: ConditionType::ErrorRate,
            condition_config: serde_json::json!({"threshold": 5, "time_window_minutes": 10, "levels": ["ERROR"]}),
            cooldown_minutes: 30,
            auto_resolve_acknowledged: true,
        }
    }

    fn evaluator(
        alert_repo: Arc<FakeAlertRepo>,
        log_count: i64,
        failed: i64,
        long_running: i64,
        workers: Option<usize>,
    ) -> RuleEvaluator {
        evaluator_with_rule(alert_repo, error_rate_rule(), log_count, failed, long_running, workers)
    }

    fn evaluator_with_rule(
        alert_repo: Arc<FakeAlertRepo>,
        rule: AlertRule,
        log_count: i64,
        failed: i64,
        long_running: i64,
        workers: Option<usize>,
    ) -> RuleEvaluator {
        let notifier = Arc::new(NotificationFanout::new(Arc::new(FakeNotificationRepo), vec![]));
        let alert_manager = Arc::new(AlertManager::new(
            alert_repo.clone(),
            notifier,
            Duration::hours(24),
        ));
        RuleEvaluator::new(
            Arc::new(FakeRuleRepo(vec![rule])),
            alert_repo,
            Arc::new(FakeLogRepo(log_count)),
            Arc::new(FakeExecutionRepo { failed, long_running }),
            Arc::new(FakeWorkerProbe(workers)),
            alert_manager,
            Duration::hours(24),
        )
    }

    #[tokio::test]
    async fn triggers_and_raises_when_threshold_met() {
        let alert_repo = Arc::new(FakeAlertRepo::default());
        let eval = evaluator(alert_repo.clone(), 10, 0, 0, Some(3));
        eval.tick(&RequestContext::system("rule_evaluator")).await.unwrap();
        assert_eq!(alert_repo.live.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn does_not_trigger_below_threshold() {
        let alert_repo = Arc::new(FakeAlertRepo::default());
        let eval = evaluator(alert_repo.clone(), 1, 0, 0, Some(3));
        eval.tick(&RequestContext::system("rule_evaluator")).await.unwrap();
        assert!(alert_repo.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cooldown_suppresses_retrigger() {
        let alert_repo = Arc::new(FakeAlertRepo::default());
        *alert_repo.last_triggered.lock().unwrap() = Some(Utc::now());
        let eval = evaluator(alert_repo.clone(), 10, 0, 0, Some(3));
        eval.tick(&RequestContext::system("rule_evaluator")).await.unwrap();
        assert!(alert_repo.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn auto_resolves_when_condition_clears() {
        let alert_repo = Arc::new(FakeAlertRepo::default());
        let rule = error_rate_rule();
        let alert = NormalizedAlert::new(NewNormalizedAlert {
            source_system: "rule_evaluator".to_string(),
            source_alert_id: rule.alert_key(),
            device_ip: SYSTEM_DEVICE_IP.to_string(),
            device_name: None,
            severity: Severity::Critical,
            category: Category::Application,
            alert_type: rule.alert_key(),
            title: "t".to_string(),
            message: "m".to_string(),
            occurred_at: Utc::now(),
            is_clear: false,
            raw_data: Value::Null,
            correlation_key: Some(rule.alert_key()),
        })
        .unwrap();
        let stored = StoredAlert::from_rule_raise(&alert, Duration::hours(24), rule.id);
        alert_repo.insert(&stored).await.unwrap();

        let eval = evaluator(alert_repo.clone(), 0, 0, 0, Some(3));
        eval.tick(&RequestContext::system("rule_evaluator")).await.unwrap();
        assert!(alert_repo.live.lock().unwrap().is_empty());
        assert_eq!(alert_repo.archived.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn acknowledged_alert_left_alone_when_rule_opts_out() {
        let alert_repo = Arc::new(FakeAlertRepo::default());
        let mut rule = error_rate_rule();
        rule.auto_resolve_acknowledged = false;
        let alert = NormalizedAlert::new(NewNormalizedAlert {
            source_system: "rule_evaluator".to_string(),
            source_alert_id: rule.alert_key(),
            device_ip: SYSTEM_DEVICE_IP.to_string(),
            device_name: None,
            severity: Severity::Critical,
            category: Category::Application,
            alert_type: rule.alert_key(),
            title: "t".to_string(),
            message: "m".to_string(),
            occurred_at: Utc::now(),
            is_clear: false,
            raw_data: Value::Null,
            correlation_key: Some(rule.alert_key()),
        })
        .unwrap();
        let mut stored = StoredAlert::from_rule_raise(&alert, Duration::hours(24), rule.id);
        stored.status = AlertStatus::Acknowledged;
        alert_repo.insert(&stored).await.unwrap();

        // condition no longer true (log_count = 0), but the alert is
        // acknowledged and the rule opts out of auto-resolving those.
        let eval = evaluator_with_rule(alert_repo.clone(), rule, 0, 0, 0, Some(3));
        eval.tick(&RequestContext::system("rule_evaluator")).await.unwrap();
        assert_eq!(alert_repo.live.lock().unwrap().len(), 1);
        assert!(alert_repo.archived.lock().unwrap().is_empty());
    }
}
