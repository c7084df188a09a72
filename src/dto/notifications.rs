use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Notification, NotificationStats};

/// Body of a promotion broadcast. Missing fields deserialize as empty and are
/// rejected by validation with a 400.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PromotionRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "relatedId", alias = "related_id")]
    pub related_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SystemNotificationRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FanoutResult {
    /// Notifications persisted, one per recipient.
    pub count: u64,
    /// False when the deadline cut the broadcast short.
    pub completed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub items: Vec<Notification>,
    pub unread_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AffectedCount {
    pub count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsData {
    pub stats: NotificationStats,
}
