use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};

use crate::{
    dto::{
        admin::AutoUpdateData,
        notifications::{FanoutResult, PromotionRequest, StatsData, SystemNotificationRequest},
    },
    error::AppResult,
    middleware::{auth::AdminUser, json::AppJson},
    response::{ApiReport, ApiResponse},
    routes::params::BatchQuery,
    services::{fanout_service, order_status_updater, report_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications/promotion", post(send_promotion))
        .route("/notifications/system", post(send_system_notification))
        .route("/notifications/stats", get(notification_stats))
        .route("/orders/auto-update", post(trigger_order_status_update))
}

#[utoipa::path(
    post,
    path = "/api/admin/notifications/promotion",
    params(
        ("timeout_ms" = Option<u64>, Query, description = "Deadline for the broadcast in milliseconds")
    ),
    request_body = PromotionRequest,
    responses(
        (status = 200, description = "Promotion sent to every active user", body = ApiResponse<FanoutResult>),
        (status = 400, description = "Title and message are required"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn send_promotion(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(batch): Query<BatchQuery>,
    AppJson(payload): AppJson<PromotionRequest>,
) -> AppResult<Json<ApiResponse<FanoutResult>>> {
    let resp = fanout_service::send_promotion(&state, &user, payload, batch.timeout()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/notifications/system",
    params(
        ("timeout_ms" = Option<u64>, Query, description = "Deadline for the broadcast in milliseconds")
    ),
    request_body = SystemNotificationRequest,
    responses(
        (status = 200, description = "System notification sent to every active user", body = ApiResponse<FanoutResult>),
        (status = 400, description = "Title and message are required"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn send_system_notification(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(batch): Query<BatchQuery>,
    AppJson(payload): AppJson<SystemNotificationRequest>,
) -> AppResult<Json<ApiResponse<FanoutResult>>> {
    let resp =
        fanout_service::send_system_notification(&state, &user, payload, batch.timeout()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/notifications/stats",
    responses(
        (status = 200, description = "Notification counters", body = ApiReport<StatsData>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn notification_stats(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> AppResult<Json<ApiReport<StatsData>>> {
    let resp = report_service::notification_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/auto-update",
    params(
        ("timeout_ms" = Option<u64>, Query, description = "Deadline for the run in milliseconds")
    ),
    responses(
        (status = 200, description = "Run summary", body = ApiReport<AutoUpdateData>),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn trigger_order_status_update(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(batch): Query<BatchQuery>,
) -> AppResult<Json<ApiReport<AutoUpdateData>>> {
    let resp = order_status_updater::trigger_auto_update(&state, &user, batch.timeout()).await?;
    Ok(Json(resp))
}
