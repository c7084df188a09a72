//! Admin broadcasts: one notification per active user.

use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, timeout_at};
use uuid::Uuid;

use crate::{
    dto::notifications::{FanoutResult, PromotionRequest, SystemNotificationRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::NotificationType,
    repository::{NewNotification, NotificationStore, UserDirectory},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<Uuid>,
}

impl Broadcast {
    /// Title and message must be non-blank; both are stored trimmed.
    pub fn new(
        kind: NotificationType,
        title: &str,
        message: &str,
        related_id: Option<Uuid>,
    ) -> AppResult<Self> {
        let title = title.trim();
        let message = message.trim();
        if title.is_empty() || message.is_empty() {
            return Err(AppError::BadRequest(
                "Title and message are required".into(),
            ));
        }
        Ok(Self {
            kind,
            title: title.to_string(),
            message: message.to_string(),
            related_id,
        })
    }
}

pub async fn send_promotion(
    state: &AppState,
    user: &AuthUser,
    payload: PromotionRequest,
    timeout: Option<Duration>,
) -> AppResult<ApiResponse<FanoutResult>> {
    ensure_admin(user)?;
    let broadcast = Broadcast::new(
        NotificationType::Promotion,
        &payload.title,
        &payload.message,
        payload.related_id,
    )?;

    let result = broadcast_to_users(state, user, broadcast, timeout).await?;
    Ok(ApiResponse::success(
        format!("Promotion sent to {} users", result.count),
        result,
        Some(Meta::empty()),
    ))
}

pub async fn send_system_notification(
    state: &AppState,
    user: &AuthUser,
    payload: SystemNotificationRequest,
    timeout: Option<Duration>,
) -> AppResult<ApiResponse<FanoutResult>> {
    ensure_admin(user)?;
    let broadcast = Broadcast::new(
        NotificationType::System,
        &payload.title,
        &payload.message,
        None,
    )?;

    let result = broadcast_to_users(state, user, broadcast, timeout).await?;
    Ok(ApiResponse::success(
        format!("System notification sent to {} users", result.count),
        result,
        Some(Meta::empty()),
    ))
}

async fn broadcast_to_users(
    state: &AppState,
    user: &AuthUser,
    broadcast: Broadcast,
    timeout: Option<Duration>,
) -> AppResult<FanoutResult> {
    let deadline = Instant::now() + timeout.unwrap_or(state.config.batch_timeout);
    let kind = broadcast.kind;

    let result = fan_out(
        state.users.as_ref(),
        state.notifications.as_ref(),
        broadcast,
        state.config.fanout_page_size,
        deadline,
    )
    .await?;

    tracing::info!(
        admin_id = %user.user_id,
        kind = ?kind,
        count = result.count,
        completed = result.completed,
        "broadcast delivered"
    );
    Ok(result)
}

/// Walks the user directory page by page and writes one notification per user.
///
/// Each page is persisted with a single insert, so the returned count always
/// matches what is stored. A failed insert aborts the remaining pages and is
/// returned as an error; pages written before it stay written. The deadline
/// is checked between pages, and hitting it returns the partial count with
/// `completed = false`.
pub async fn fan_out(
    users: &dyn UserDirectory,
    notifications: &dyn NotificationStore,
    broadcast: Broadcast,
    page_size: u64,
    deadline: Instant,
) -> AppResult<FanoutResult> {
    let page_size = page_size.max(1);
    let created_at = Utc::now();
    let mut delivered = 0u64;
    let mut after: Option<Uuid> = None;

    loop {
        if Instant::now() >= deadline {
            tracing::warn!(delivered, "broadcast deadline exceeded");
            return Ok(FanoutResult {
                count: delivered,
                completed: false,
            });
        }

        let page = match timeout_at(deadline, users.active_user_ids(after, page_size)).await {
            Ok(page) => page.inspect_err(|err| {
                tracing::error!(error = ?err, delivered, "loading broadcast recipients failed");
            })?,
            Err(_) => {
                tracing::warn!(delivered, "broadcast deadline exceeded");
                return Ok(FanoutResult {
                    count: delivered,
                    completed: false,
                });
            }
        };

        let Some(last) = page.last().copied() else {
            break;
        };
        let full_page = page.len() as u64 >= page_size;

        let rows = page
            .into_iter()
            .map(|user_id| NewNotification {
                user_id,
                notification_type: broadcast.kind,
                title: broadcast.title.clone(),
                message: broadcast.message.clone(),
                related_id: broadcast.related_id,
                created_at,
            })
            .collect();

        delivered += notifications.insert_many(rows).await.inspect_err(|err| {
            tracing::error!(error = ?err, delivered, "broadcast aborted");
        })?;

        if !full_page {
            break;
        }
        after = Some(last);
    }

    Ok(FanoutResult {
        count: delivered,
        completed: true,
    })
}
