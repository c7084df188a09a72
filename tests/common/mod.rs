//! In-memory stores and fixtures shared by the integration tests.
#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use order_notify_api::{
    config::AppConfig,
    dto::orders::OrderWithItems,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, issue_token},
    models::{
        Notification, NotificationStats, NotificationType, Order, OrderItem, OrderStatus, Role,
        PAYMENT_PAID, PAYMENT_UNPAID,
    },
    repository::{
        NewNotification, NewOrder, NotificationFilter, NotificationStore, OrderFilter, OrderStore,
        UserDirectory,
    },
    routes::params::SortOrder,
    state::AppState,
    status_rules::StatusThresholds,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

#[derive(Default)]
struct Inner {
    users: BTreeMap<Uuid, bool>,
    notifications: Vec<Notification>,
    orders: BTreeMap<Uuid, Order>,
    items: Vec<OrderItem>,
}

/// Store backing every trait with plain collections, plus knobs to inject faults.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    failing_transitions: Mutex<HashSet<Uuid>>,
    fail_notification_inserts: AtomicBool,
    /// Successful `insert_many` calls left before every later one fails.
    insert_many_budget: Mutex<Option<usize>>,
    /// Successful `open_orders` calls left before every later one fails.
    open_orders_budget: Mutex<Option<usize>>,
    user_page_delay: Mutex<Option<Duration>>,
    pub user_page_reads: AtomicUsize,
}

fn store_failure(what: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!("injected {what} failure"))
}

fn take_budget(budget: &Mutex<Option<usize>>) -> bool {
    let mut budget = budget.lock().unwrap();
    match budget.as_mut() {
        None => true,
        Some(0) => false,
        Some(left) => {
            *left -= 1;
            true
        }
    }
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self) -> Uuid {
        self.add_user_with(true)
    }

    pub fn add_user_with(&self, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().users.insert(id, active);
        id
    }

    pub fn add_order(&self, user_id: Uuid, status: OrderStatus, age: TimeDelta) -> Order {
        let changed_at = Utc::now() - age;
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            total_amount: 10_000,
            status,
            payment_status: PAYMENT_UNPAID.into(),
            paid_at: None,
            tracking_number: None,
            tracking_assigned_at: None,
            status_changed_at: changed_at,
            created_at: changed_at,
            updated_at: changed_at,
        };
        self.inner
            .lock()
            .unwrap()
            .orders
            .insert(order.id, order.clone());
        order
    }

    pub fn update_order(&self, id: Uuid, change: impl FnOnce(&mut Order)) {
        let mut inner = self.inner.lock().unwrap();
        change(inner.orders.get_mut(&id).expect("order exists"));
    }

    pub fn order(&self, id: Uuid) -> Order {
        self.inner.lock().unwrap().orders[&id].clone()
    }

    pub fn add_notification(&self, user_id: Uuid, kind: NotificationType, is_read: bool) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            notification_type: kind,
            title: "Hello".into(),
            message: "World".into(),
            related_id: None,
            is_read,
            created_at: Utc::now(),
        };
        let id = notification.id;
        self.inner.lock().unwrap().notifications.push(notification);
        id
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().unwrap().notifications.clone()
    }

    pub fn notifications_of(&self, kind: NotificationType) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.notification_type == kind)
            .collect()
    }

    pub fn fail_transition_for(&self, order_id: Uuid) {
        self.failing_transitions.lock().unwrap().insert(order_id);
    }

    pub fn fail_notification_inserts(&self) {
        self.fail_notification_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_insert_many_after(&self, successes: usize) {
        *self.insert_many_budget.lock().unwrap() = Some(successes);
    }

    pub fn fail_open_orders_after(&self, successes: usize) {
        *self.open_orders_budget.lock().unwrap() = Some(successes);
    }

    pub fn delay_user_pages(&self, delay: Duration) {
        *self.user_page_delay.lock().unwrap() = Some(delay);
    }

    fn to_notification(row: NewNotification) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: row.user_id,
            notification_type: row.notification_type,
            title: row.title,
            message: row.message,
            related_id: row.related_id,
            is_read: false,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn active_user_ids(&self, after: Option<Uuid>, limit: u64) -> AppResult<Vec<Uuid>> {
        self.user_page_reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.user_page_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .filter(|(id, active)| **active && after.is_none_or(|after| **id > after))
            .map(|(id, _)| *id)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_many(&self, rows: Vec<NewNotification>) -> AppResult<u64> {
        if self.fail_notification_inserts.load(Ordering::SeqCst)
            || !take_budget(&self.insert_many_budget)
        {
            return Err(store_failure("notification insert"));
        }
        let count = rows.len() as u64;
        let mut inner = self.inner.lock().unwrap();
        inner
            .notifications
            .extend(rows.into_iter().map(Self::to_notification));
        Ok(count)
    }

    async fn insert(&self, row: NewNotification) -> AppResult<Notification> {
        if self.fail_notification_inserts.load(Ordering::SeqCst) {
            return Err(store_failure("notification insert"));
        }
        let notification = Self::to_notification(row);
        self.inner
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn list(&self, filter: NotificationFilter) -> AppResult<(Vec<Notification>, u64)> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == filter.user_id && (!filter.unread_only || !n.is_read))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_unread(&self, user_id: Uuid) -> AppResult<u64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<Notification>> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut count = 0;
        for n in inner
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            count += 1;
        }
        Ok(count)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.notifications.len();
        inner
            .notifications
            .retain(|n| !(n.id == id && n.user_id == user_id));
        Ok(inner.notifications.len() < before)
    }

    async fn clear_all(&self, user_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.notifications.len();
        inner.notifications.retain(|n| n.user_id != user_id);
        Ok((before - inner.notifications.len()) as u64)
    }

    async fn stats(&self) -> AppResult<NotificationStats> {
        let inner = self.inner.lock().unwrap();
        Ok(NotificationStats::from_groups(
            inner
                .notifications
                .iter()
                .map(|n| (n.notification_type, n.is_read, 1)),
        ))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, order: NewOrder) -> AppResult<OrderWithItems> {
        let created = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            payment_status: PAYMENT_UNPAID.into(),
            paid_at: None,
            tracking_number: None,
            tracking_assigned_at: None,
            status_changed_at: order.created_at,
            created_at: order.created_at,
            updated_at: order.created_at,
        };
        let items: Vec<OrderItem> = order
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id: created.id,
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                price: item.price,
                created_at: order.created_at,
            })
            .collect();

        let mut inner = self.inner.lock().unwrap();
        inner.orders.insert(created.id, created.clone());
        inner.items.extend(items.iter().cloned());
        Ok(OrderWithItems {
            order: created,
            items,
        })
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.inner.lock().unwrap().orders.get(&id).cloned())
    }

    async fn items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list(&self, filter: OrderFilter) -> AppResult<(Vec<Order>, u64)> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| filter.user_id.is_none_or(|user_id| o.user_id == user_id))
            .filter(|o| filter.status.is_none_or(|status| o.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| match filter.sort_order {
            SortOrder::Asc => a.created_at.cmp(&b.created_at),
            SortOrder::Desc => b.created_at.cmp(&a.created_at),
        });
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn open_orders(&self, after: Option<Uuid>, limit: u64) -> AppResult<Vec<Order>> {
        if !take_budget(&self.open_orders_budget) {
            return Err(store_failure("order scan"));
        }
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .orders
            .values()
            .filter(|o| !o.status.is_terminal() && after.is_none_or(|after| o.id > after))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Order>> {
        if self.failing_transitions.lock().unwrap().contains(&id) {
            return Err(store_failure("order update"));
        }
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .orders
            .get_mut(&id)
            .filter(|o| o.status == from)
            .map(|o| {
                o.status = to;
                o.status_changed_at = at;
                o.updated_at = at;
                o.clone()
            }))
    }

    async fn record_payment(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Order>> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .orders
            .get_mut(&id)
            .filter(|o| !o.is_paid() && o.status != OrderStatus::Cancelled)
            .map(|o| {
                o.payment_status = PAYMENT_PAID.into();
                o.paid_at = Some(at);
                o.updated_at = at;
                o.clone()
            }))
    }

    async fn assign_tracking(
        &self,
        id: Uuid,
        tracking_number: String,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Order>> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .orders
            .get_mut(&id)
            .filter(|o| !o.status.is_terminal())
            .map(|o| {
                o.tracking_number = Some(tracking_number);
                o.tracking_assigned_at = Some(at);
                o.updated_at = at;
                o.clone()
            }))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.items.retain(|item| item.order_id != id);
        Ok(inner.orders.remove(&id).is_some())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
        fanout_page_size: 2,
        auto_update_page_size: 2,
        batch_timeout: Duration::from_secs(30),
        thresholds: StatusThresholds::default(),
    }
}

pub fn test_state(store: &Arc<MemoryStore>) -> AppState {
    state_with_config(store, test_config())
}

pub fn state_with_config(store: &Arc<MemoryStore>, config: AppConfig) -> AppState {
    AppState::with_stores(config, store.clone(), store.clone(), store.clone())
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Admin,
    }
}

pub fn customer(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::User,
    }
}

pub fn bearer(user: &AuthUser) -> String {
    let token = issue_token(user.user_id, user.role, JWT_SECRET, TimeDelta::hours(1))
        .expect("token issued");
    format!("Bearer {token}")
}
