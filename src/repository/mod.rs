//! Store seams used by the services.
//!
//! Every trait method is a single read or a single-row (or single-statement)
//! write; batch operations are composed by the services on top of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    dto::orders::OrderWithItems,
    error::AppResult,
    models::{Notification, NotificationStats, NotificationType, Order, OrderItem, OrderStatus},
    routes::params::SortOrder,
};

mod orm;

pub use orm::OrmStore;

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub total_amount: i64,
    pub items: Vec<NewOrderItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub sort_order: SortOrder,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct NotificationFilter {
    pub user_id: Uuid,
    pub unread_only: bool,
    pub limit: u64,
    pub offset: u64,
}

/// Directory of registered users, enumerated in id order.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Active user ids strictly greater than `after`, at most `limit` of them.
    async fn active_user_ids(&self, after: Option<Uuid>, limit: u64) -> AppResult<Vec<Uuid>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persists all rows in one statement; returns how many were written.
    async fn insert_many(&self, rows: Vec<NewNotification>) -> AppResult<u64>;

    async fn insert(&self, row: NewNotification) -> AppResult<Notification>;

    /// One page of a user's notifications, newest first, plus the total match count.
    async fn list(&self, filter: NotificationFilter) -> AppResult<(Vec<Notification>, u64)>;

    async fn count_unread(&self, user_id: Uuid) -> AppResult<u64>;

    /// `None` when the notification does not exist or belongs to someone else.
    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<Notification>>;

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<bool>;

    async fn clear_all(&self, user_id: Uuid) -> AppResult<u64>;

    async fn stats(&self) -> AppResult<NotificationStats>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: NewOrder) -> AppResult<OrderWithItems>;

    async fn find(&self, id: Uuid) -> AppResult<Option<Order>>;

    async fn items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>>;

    async fn list(&self, filter: OrderFilter) -> AppResult<(Vec<Order>, u64)>;

    /// Non-terminal orders with id greater than `after`, in id order.
    async fn open_orders(&self, after: Option<Uuid>, limit: u64) -> AppResult<Vec<Order>>;

    /// Compare-and-set on the current status. `None` when the order is gone or
    /// no longer in `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Order>>;

    /// Marks an unpaid, non-cancelled order as paid. `None` if that no longer holds.
    async fn record_payment(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Order>>;

    /// Sets the tracking number of an open order. `None` if the order is terminal or gone.
    async fn assign_tracking(
        &self,
        id: Uuid,
        tracking_number: String,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Order>>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}
