use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::{AssignTrackingRequest, OrderList, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::{notification_service::notify_status_change, order_service::order_filter},
    state::AppState,
    status_rules::can_transition,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, filter) = order_filter(&query, None)?;
    let (orders, total) = state.orders.list(filter).await?;

    let meta = Meta::new(page, limit, total as i64);
    Ok(ApiResponse::success("Orders", OrderList { items: orders }, Some(meta)))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let target = payload
        .status
        .parse::<OrderStatus>()
        .map_err(|_| AppError::BadRequest("Invalid order status".into()))?;

    let existing = state.orders.find(id).await?.ok_or(AppError::NotFound)?;
    if !can_transition(existing.status, target) {
        return Err(AppError::BadRequest(format!(
            "Cannot change order status from {} to {}",
            existing.status, target
        )));
    }

    let order = state
        .orders
        .transition(existing.id, existing.status, target, Utc::now())
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("Order status changed concurrently, please retry".into())
        })?;

    notify_status_change(state.notifications.as_ref(), &order).await;

    tracing::info!(
        admin_id = %user.user_id,
        order_id = %order.id,
        from = %existing.status,
        to = %order.status,
        "order status updated"
    );

    Ok(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    ))
}

/// Records the shipment signal the auto-updater uses to move processing
/// orders to shipped.
pub async fn assign_tracking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AssignTrackingRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let tracking_number = payload.tracking_number.trim();
    if tracking_number.is_empty() {
        return Err(AppError::BadRequest("tracking_number is required".into()));
    }

    let existing = state.orders.find(id).await?.ok_or(AppError::NotFound)?;
    if existing.status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "Cannot assign tracking to a {} order",
            existing.status.as_str().to_lowercase()
        )));
    }

    let order = state
        .orders
        .assign_tracking(existing.id, tracking_number.to_string(), Utc::now())
        .await?
        .ok_or_else(|| AppError::BadRequest("Order is no longer open".into()))?;

    Ok(ApiResponse::success(
        "Tracking number assigned",
        order,
        Some(Meta::empty()),
    ))
}
