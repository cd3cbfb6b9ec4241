use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::errors::DatabaseError;
use crate::domain::models::{
    Category, DeliveryResult, NotificationChannel, NotificationRule, Severity,
};
use crate::domain::ports::NotificationRepository;

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRuleRow {
    id: i64,
    trigger_type: String,
    severity_filter: Option<Vec<String>>,
    category_filter: Option<Vec<String>>,
    channel_ids: Vec<i64>,
    enabled: bool,
}

fn row_to_rule(row: NotificationRuleRow) -> NotificationRule {
    NotificationRule {
        id: row.id,
        trigger_type: row.trigger_type,
        severity_filter: row
            .severity_filter
            .map(|v| v.iter().filter_map(|s| Severity::from_str(s)).collect()),
        category_filter: row
            .category_filter
            .map(|v| v.iter().filter_map(|s| Category::from_str(s)).collect()),
        channel_ids: row.channel_ids,
        enabled: row.enabled,
    }
}

#[derive(sqlx::FromRow)]
struct NotificationChannelRow {
    id: i64,
    name: String,
    channel_type: String,
    config: serde_json::Value,
    enabled: bool,
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn find_matching_rules(
        &self,
        trigger_type: &str,
        severity: Severity,
        category: Category,
    ) -> Result<Vec<NotificationRule>, DatabaseError> {
        // Filters are NULL-or-contains; pushing the containment check to
        // SQL avoids loading disabled/irrelevant rules.
        let rows: Vec<NotificationRuleRow> = sqlx::query_as(
            "SELECT * FROM notification_rules
             WHERE enabled = true
               AND trigger_type = $1
               AND (severity_filter IS NULL OR $2 = ANY(severity_filter))
               AND (category_filter IS NULL OR $3 = ANY(category_filter))",
        )
        .bind(trigger_type)
        .bind(severity.as_str())
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_rule).collect())
    }

    async fn get_channel(&self, id: i64) -> Result<Option<NotificationChannel>, DatabaseError> {
        let row: Option<NotificationChannelRow> =
            sqlx::query_as("SELECT * FROM notification_channels WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|r| NotificationChannel {
            id: r.id,
            name: r.name,
            channel_type: r.channel_type,
            config: r.config,
            enabled: r.enabled,
        }))
    }

    async fn record_delivery(
        &self,
        alert_id: i64,
        channel_id: i64,
        result: DeliveryResult,
        error_message: Option<String>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO notification_history (alert_id, channel_id, result, error_message)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(alert_id)
        .bind(channel_id)
        .bind(result.as_str())
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
