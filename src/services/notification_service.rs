use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::notifications::{AffectedCount, NotificationList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Notification, NotificationType, Order},
    repository::{NewNotification, NotificationFilter, NotificationStore},
    response::{ApiResponse, Meta},
    routes::params::NotificationListQuery,
    state::AppState,
};

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    query: NotificationListQuery,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = NotificationFilter {
        user_id: user.user_id,
        unread_only: query.unread_only.unwrap_or(false),
        limit: limit as u64,
        offset: offset as u64,
    };

    let (items, total) = state.notifications.list(filter).await?;
    let unread_count = state.notifications.count_unread(user.user_id).await?;

    Ok(ApiResponse::success(
        "Ok",
        NotificationList {
            items,
            unread_count,
        },
        Some(Meta::new(page, limit, total as i64)),
    ))
}

pub async fn mark_as_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let notification = state
        .notifications
        .mark_read(user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Notification marked as read",
        notification,
        Some(Meta::empty()),
    ))
}

pub async fn mark_all_as_read(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AffectedCount>> {
    let count = state.notifications.mark_all_read(user.user_id).await?;
    Ok(ApiResponse::success(
        "All notifications marked as read",
        AffectedCount { count },
        Some(Meta::empty()),
    ))
}

pub async fn delete_notification(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<AffectedCount>> {
    if !state.notifications.delete(user.user_id, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Notification deleted",
        AffectedCount { count: 1 },
        Some(Meta::empty()),
    ))
}

pub async fn clear_all(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AffectedCount>> {
    let count = state.notifications.clear_all(user.user_id).await?;
    Ok(ApiResponse::success(
        "All notifications cleared",
        AffectedCount { count },
        Some(Meta::empty()),
    ))
}

/// Tells the owner their order moved. Failures are logged, never propagated:
/// the status change has already been committed.
pub async fn notify_status_change(store: &dyn NotificationStore, order: &Order) {
    let row = NewNotification {
        user_id: order.user_id,
        notification_type: NotificationType::OrderStatus,
        title: "Order status updated".into(),
        message: format!(
            "Your order #{} is now {}",
            order.short_id(),
            order.status.as_str().to_lowercase()
        ),
        related_id: Some(order.id),
        created_at: Utc::now(),
    };
    if let Err(err) = store.insert(row).await {
        tracing::warn!(error = %err, order_id = %order.id, "status notification failed");
    }
}

pub async fn notify_payment(store: &dyn NotificationStore, order: &Order) {
    let row = NewNotification {
        user_id: order.user_id,
        notification_type: NotificationType::Payment,
        title: "Payment received".into(),
        message: format!(
            "We received your payment of {} for order #{}",
            order.total_amount,
            order.short_id()
        ),
        related_id: Some(order.id),
        created_at: Utc::now(),
    };
    if let Err(err) = store.insert(row).await {
        tracing::warn!(error = %err, order_id = %order.id, "payment notification failed");
    }
}
