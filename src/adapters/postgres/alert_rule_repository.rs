//! Postgres adapter for [`AlertRuleRepository`], backing `services::rule_evaluator`.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{AlertRule, ConditionType};
use crate::domain::ports::AlertRuleRepository;

use super::row_helpers::{category_or_default, severity_or_default};

#[derive(Clone)]
pub struct PgAlertRuleRepository {
    pool: PgPool,
}

impl PgAlertRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AlertRuleRow {
    id: i64,
    name: String,
    enabled: bool,
    severity: String,
    category: String,
    condition_type: String,
    condition_config: serde_json::Value,
    cooldown_minutes: i64,
    auto_resolve_acknowledged: bool,
}

fn row_to_rule(row: AlertRuleRow) -> AlertRule {
    AlertRule {
        id: row.id,
        name: row.name,
        enabled: row.enabled,
        severity: severity_or_default(&row.severity),
        category: category_or_default(&row.category),
        condition_type: ConditionType::from_str(&row.condition_type)
            .unwrap_or(ConditionType::ErrorRate),
        condition_config: row.condition_config,
        cooldown_minutes: row.cooldown_minutes,
        auto_resolve_acknowledged: row.auto_resolve_acknowledged,
    }
}

#[async_trait]
impl AlertRuleRepository for PgAlertRuleRepository {
    async fn list_enabled(&self) -> Result<Vec<AlertRule>, DatabaseError> {
        let rows: Vec<AlertRuleRow> =
            sqlx::query_as("SELECT * FROM alert_rules WHERE enabled = true")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(row_to_rule).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<AlertRule>, DatabaseError> {
        let row: Option<AlertRuleRow> = sqlx::query_as("SELECT * FROM alert_rules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_rule))
    }
}
