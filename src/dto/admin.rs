use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::OrderStatus;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusTransition {
    pub order_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderUpdateFailure {
    pub order_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Interruption {
    DeadlineExceeded,
    ScanFailed,
}

/// Outcome of one auto-update run. `examined = advanced + unchanged + failures`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct AutoUpdateSummary {
    pub examined: u64,
    pub advanced: u64,
    pub unchanged: u64,
    pub failures: Vec<OrderUpdateFailure>,
    pub transitions: Vec<StatusTransition>,
    pub interrupted: Option<Interruption>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AutoUpdateData {
    pub result: AutoUpdateSummary,
}
