//! Batch job that moves open orders one step along their lifecycle.
//!
//! Each order is read, checked against [`next_status`] and written back with a
//! compare-and-set on its current status. A failed write is recorded in the
//! summary and the scan goes on with the next order.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, timeout_at};
use uuid::Uuid;

use crate::{
    dto::admin::{
        AutoUpdateData, AutoUpdateSummary, Interruption, OrderUpdateFailure, StatusTransition,
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    repository::{NotificationStore, OrderStore},
    response::ApiReport,
    services::notification_service::notify_status_change,
    state::AppState,
    status_rules::{OrderSignals, StatusThresholds, next_status},
};

#[derive(Debug, Clone, Copy)]
pub struct AutoUpdateOptions {
    /// Clock used for every elapsed-time check and written as the new
    /// `status_changed_at`.
    pub now: DateTime<Utc>,
    pub thresholds: StatusThresholds,
    pub page_size: u64,
    pub deadline: Instant,
}

impl AutoUpdateOptions {
    pub fn from_state(state: &AppState, now: DateTime<Utc>, timeout: Option<Duration>) -> Self {
        Self {
            now,
            thresholds: state.config.thresholds,
            page_size: state.config.auto_update_page_size,
            deadline: Instant::now() + timeout.unwrap_or(state.config.batch_timeout),
        }
    }
}

pub async fn trigger_auto_update(
    state: &AppState,
    user: &AuthUser,
    timeout: Option<Duration>,
) -> AppResult<ApiReport<AutoUpdateData>> {
    ensure_admin(user)?;

    let options = AutoUpdateOptions::from_state(state, Utc::now(), timeout);
    let result = run(state.orders.as_ref(), state.notifications.as_ref(), options).await?;

    tracing::info!(admin_id = %user.user_id, "order status auto-update triggered");
    Ok(ApiReport::new(
        "Order status auto-update completed successfully",
        AutoUpdateData { result },
    ))
}

/// Runs one pass over every open order.
///
/// Fails only when the first page of orders cannot be read. Later read
/// failures and the deadline stop the scan and are reported through
/// `interrupted`.
pub async fn run(
    orders: &dyn OrderStore,
    notifications: &dyn NotificationStore,
    options: AutoUpdateOptions,
) -> AppResult<AutoUpdateSummary> {
    let page_size = options.page_size.max(1);
    let mut summary = AutoUpdateSummary::default();
    let mut after: Option<Uuid> = None;
    let mut first_page = true;

    'scan: loop {
        if Instant::now() >= options.deadline {
            summary.interrupted = Some(Interruption::DeadlineExceeded);
            break;
        }

        let page = match timeout_at(options.deadline, orders.open_orders(after, page_size)).await {
            Ok(Ok(page)) => page,
            Ok(Err(err)) if first_page => return Err(err),
            Ok(Err(err)) => {
                tracing::error!(error = ?err, examined = summary.examined, "order scan failed");
                summary.interrupted = Some(Interruption::ScanFailed);
                break;
            }
            Err(_) => {
                summary.interrupted = Some(Interruption::DeadlineExceeded);
                break;
            }
        };
        first_page = false;

        let Some(last) = page.last().map(|order| order.id) else {
            break;
        };
        let full_page = page.len() as u64 >= page_size;

        for order in page {
            if Instant::now() >= options.deadline {
                summary.interrupted = Some(Interruption::DeadlineExceeded);
                break 'scan;
            }
            summary.examined += 1;

            let elapsed = options.now - order.status_changed_at;
            let signals = OrderSignals::observed(&order);
            let Some(target) = next_status(order.status, elapsed, signals, &options.thresholds)
            else {
                summary.unchanged += 1;
                continue;
            };

            match orders
                .transition(order.id, order.status, target, options.now)
                .await
            {
                Ok(Some(updated)) => {
                    summary.advanced += 1;
                    summary.transitions.push(StatusTransition {
                        order_id: order.id,
                        from: order.status,
                        to: target,
                    });
                    notify_status_change(notifications, &updated).await;
                }
                // Someone else moved or removed the order since it was read.
                Ok(None) => summary.unchanged += 1,
                Err(err) => {
                    tracing::warn!(error = ?err, order_id = %order.id, "order status update failed");
                    summary.failures.push(OrderUpdateFailure {
                        order_id: order.id,
                        reason: "status update failed".into(),
                    });
                }
            }
        }

        if !full_page {
            break;
        }
        after = Some(last);
    }

    tracing::info!(
        examined = summary.examined,
        advanced = summary.advanced,
        unchanged = summary.unchanged,
        failed = summary.failures.len(),
        interrupted = ?summary.interrupted,
        "order status auto-update finished"
    );
    Ok(summary)
}
