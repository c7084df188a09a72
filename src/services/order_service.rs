use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderStatus},
    repository::{NewOrder, NewOrderItem, OrderFilter},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::notification_service::notify_payment,
    state::AppState,
};

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let (items, total_amount) = validate_items(payload)?;

    let created = state
        .orders
        .create(NewOrder {
            user_id: user.user_id,
            total_amount,
            items,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %created.order.id,
        total_amount,
        "order created"
    );

    Ok(ApiResponse::success(
        "Order created",
        created,
        Some(Meta::empty()),
    ))
}

pub async fn list_user_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, filter) = order_filter(&query, Some(user.user_id))?;
    let (orders, total) = state.orders.list(filter).await?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total as i64)),
    ))
}

/// Owners see their own orders, admins see any. Anything else is a 404 so
/// order ids do not leak.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_visible_order(state, user, id).await?;
    let items = state.orders.items(order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = find_visible_order(state, user, id).await?;

    if !user.is_admin() && !matches!(order.status, OrderStatus::Pending | OrderStatus::Cancelled)
    {
        return Err(AppError::BadRequest(
            "Only pending or cancelled orders can be deleted".into(),
        ));
    }

    if !state.orders.delete(order.id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(user_id = %user.user_id, order_id = %order.id, "order deleted");
    Ok(ApiResponse::success(
        "Order deleted",
        order,
        Some(Meta::empty()),
    ))
}

/// Records that the owner paid. The auto-updater picks the payment up as the
/// signal to start processing.
pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = state
        .orders
        .find(id)
        .await?
        .filter(|order| order.user_id == user.user_id)
        .ok_or(AppError::NotFound)?;

    if order.status == OrderStatus::Cancelled {
        return Err(AppError::BadRequest("Cancelled orders cannot be paid".into()));
    }
    if order.is_paid() {
        return Err(AppError::BadRequest("Order already paid".into()));
    }

    let order = state
        .orders
        .record_payment(order.id, Utc::now())
        .await?
        .ok_or_else(|| AppError::BadRequest("Order already paid".into()))?;

    notify_payment(state.notifications.as_ref(), &order).await;

    Ok(ApiResponse::success(
        "Payment recorded",
        order,
        Some(Meta::empty()),
    ))
}

pub(crate) async fn find_visible_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<Order> {
    state
        .orders
        .find(id)
        .await?
        .filter(|order| user.is_admin() || order.user_id == user.user_id)
        .ok_or(AppError::NotFound)
}

/// Turns list query parameters into a store filter. Returns `(page, per_page, filter)`.
pub(crate) fn order_filter(
    query: &OrderListQuery,
    user_id: Option<Uuid>,
) -> AppResult<(i64, i64, OrderFilter)> {
    let (page, limit, offset) = query.pagination().normalize();
    let status = match query.status.as_deref().map(str::trim) {
        Some(status) if !status.is_empty() => Some(
            status
                .parse::<OrderStatus>()
                .map_err(|_| AppError::BadRequest("Invalid order status".into()))?,
        ),
        _ => None,
    };

    Ok((
        page,
        limit,
        OrderFilter {
            user_id,
            status,
            sort_order: query.sort_order.unwrap_or(SortOrder::Desc),
            limit: limit as u64,
            offset: offset as u64,
        },
    ))
}

fn validate_items(payload: CreateOrderRequest) -> AppResult<(Vec<NewOrderItem>, i64)> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order must contain at least one item".into()));
    }

    let mut total: i64 = 0;
    let mut items = Vec::with_capacity(payload.items.len());
    for item in payload.items {
        let name = item.product_name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Every item needs a product_name".into()));
        }
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("Item quantity must be positive".into()));
        }
        if item.price < 0 {
            return Err(AppError::BadRequest("Item price cannot be negative".into()));
        }

        total = item
            .price
            .checked_mul(item.quantity as i64)
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;

        items.push(NewOrderItem {
            product_id: item.product_id,
            product_name: name.to_string(),
            quantity: item.quantity,
            price: item.price,
        });
    }

    Ok((items, total))
}
