//! Runs one [`PollingConnector`] to completion-or-cancellation: `start`,
//! then tick/poll/feed/sleep until `stop`. `stop()` preempts the poll-loop
//! sleep well within two poll intervals, via the same `tokio::select!`
//! racing-an-interval-tick-against-a-cancellation-signal shape
//! `services::scheduler::Scheduler` uses for its own dispatch loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::models::RequestContext;
use crate::domain::ports::{ConnectorRepository, PollingConnector};
use crate::services::alert_manager::AlertManager;

/// Drives one connector's poll cycle until `cancel` fires. Intended to be
/// spawned as its own task per connector instance.
pub async fn run_polling_connector(
    connector_id: i64,
    connector: Arc<dyn PollingConnector>,
    connector_repo: Arc<dyn ConnectorRepository>,
    alert_manager: Arc<AlertManager>,
    cancel: CancellationToken,
) {
    if let Err(err) = connector.as_ref().start().await {
        tracing::error!(connector_id, error = %err, "connector failed to start");
        let _ = connector_repo
            .update_status(
                connector_id,
                crate::domain::models::ConnectorStatus::Error,
                Some(err.to_string()),
            )
            .await;
        return;
    }

    let interval = Duration::from_secs(connector.poll_interval_seconds().max(1));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poll_once(connector_id, connector.as_ref(), &connector_repo, &alert_manager).await;
            }
            () = cancel.cancelled() => {
                tracing::info!(connector_id, "connector loop shutting down");
                break;
            }
        }
    }

    connector.as_ref().stop().await;
}

async fn poll_once(
    connector_id: i64,
    connector: &dyn PollingConnector,
    connector_repo: &Arc<dyn ConnectorRepository>,
    alert_manager: &Arc<AlertManager>,
) {
    let ctx = RequestContext::system(format!("connector:{connector_id}"));
    match connector.poll().await {
        Ok(alerts) => {
            let count = alerts.len();
            for alert in alerts {
                if let Err(err) = alert_manager.process_alert(alert, &ctx).await {
                    tracing::error!(connector_id, error = %err, "failed to process polled alert");
                }
            }
            if let Err(err) = connector_repo
                .record_poll(connector_id, count as i64)
                .await
            {
                tracing::warn!(connector_id, error = %err, "failed to record poll");
            }
        }
        Err(err) => {
            tracing::warn!(connector_id, error = %err, "connector poll failed");
            let _ = connector_repo
                .update_status(
                    connector_id,
                    crate::domain::models::ConnectorStatus::Error,
                    Some(err.to_string()),
                )
                .await;
        }
    }
}
