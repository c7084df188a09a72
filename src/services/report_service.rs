use crate::{
    dto::notifications::StatsData,
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    response::ApiReport,
    state::AppState,
};

/// Read-only notification counters for the admin dashboard.
pub async fn notification_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiReport<StatsData>> {
    ensure_admin(user)?;
    let stats = state.notifications.stats().await?;
    Ok(ApiReport::new("Notification stats", StatsData { stats }))
}
