use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use crate::{
    dto::orders::OrderWithItems,
    entity::{
        notifications::{
            ActiveModel as NotificationActive, Column as NotifCol, Entity as Notifications,
            Model as NotificationModel,
        },
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        users::{Column as UserCol, Entity as Users},
    },
    error::AppResult,
    models::{
        Notification, NotificationStats, NotificationType, Order, OrderItem, OrderStatus,
        PAYMENT_PAID, PAYMENT_UNPAID,
    },
    routes::params::SortOrder,
};

use super::{
    NewNotification, NewOrder, NotificationFilter, NotificationStore, OrderFilter, OrderStore,
    UserDirectory,
};

/// Postgres-backed implementation of every store trait.
#[derive(Debug, Clone)]
pub struct OrmStore {
    orm: DatabaseConnection,
}

impl OrmStore {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

fn fixed(at: DateTime<Utc>) -> DateTimeWithTimeZone {
    at.into()
}

#[async_trait]
impl UserDirectory for OrmStore {
    async fn active_user_ids(&self, after: Option<Uuid>, limit: u64) -> AppResult<Vec<Uuid>> {
        let mut condition = Condition::all().add(UserCol::IsActive.eq(true));
        if let Some(after) = after {
            condition = condition.add(UserCol::Id.gt(after));
        }

        let ids = Users::find()
            .select_only()
            .column(UserCol::Id)
            .filter(condition)
            .order_by_asc(UserCol::Id)
            .limit(limit)
            .into_tuple::<Uuid>()
            .all(&self.orm)
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl NotificationStore for OrmStore {
    async fn insert_many(&self, rows: Vec<NewNotification>) -> AppResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let count = rows.len() as u64;
        let models = rows.into_iter().map(notification_active);
        Notifications::insert_many(models).exec(&self.orm).await?;
        Ok(count)
    }

    async fn insert(&self, row: NewNotification) -> AppResult<Notification> {
        let model = notification_active(row).insert(&self.orm).await?;
        Ok(notification_from_entity(model))
    }

    async fn list(&self, filter: NotificationFilter) -> AppResult<(Vec<Notification>, u64)> {
        let mut condition = Condition::all().add(NotifCol::UserId.eq(filter.user_id));
        if filter.unread_only {
            condition = condition.add(NotifCol::IsRead.eq(false));
        }

        let finder = Notifications::find()
            .filter(condition)
            .order_by_desc(NotifCol::CreatedAt)
            .order_by_desc(NotifCol::Id);

        let total = finder.clone().count(&self.orm).await?;
        let items = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(notification_from_entity)
            .collect();

        Ok((items, total))
    }

    async fn count_unread(&self, user_id: Uuid) -> AppResult<u64> {
        let count = Notifications::find()
            .filter(NotifCol::UserId.eq(user_id))
            .filter(NotifCol::IsRead.eq(false))
            .count(&self.orm)
            .await?;
        Ok(count)
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<Notification>> {
        let existing = Notifications::find_by_id(id)
            .filter(NotifCol::UserId.eq(user_id))
            .one(&self.orm)
            .await?;
        let existing = match existing {
            Some(n) => n,
            None => return Ok(None),
        };

        if existing.is_read {
            return Ok(Some(notification_from_entity(existing)));
        }

        let mut active: NotificationActive = existing.into();
        active.is_read = Set(true);
        let updated = active.update(&self.orm).await?;
        Ok(Some(notification_from_entity(updated)))
    }

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = Notifications::update_many()
            .col_expr(NotifCol::IsRead, Expr::value(true))
            .filter(NotifCol::UserId.eq(user_id))
            .filter(NotifCol::IsRead.eq(false))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = Notifications::delete_many()
            .filter(NotifCol::Id.eq(id))
            .filter(NotifCol::UserId.eq(user_id))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn clear_all(&self, user_id: Uuid) -> AppResult<u64> {
        let result = Notifications::delete_many()
            .filter(NotifCol::UserId.eq(user_id))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected)
    }

    async fn stats(&self) -> AppResult<NotificationStats> {
        // A single grouped query keeps total, unread and per-type counts in one snapshot.
        let groups = Notifications::find()
            .select_only()
            .column(NotifCol::NotificationType)
            .column(NotifCol::IsRead)
            .column_as(Expr::col(NotifCol::Id).count(), "count")
            .group_by(NotifCol::NotificationType)
            .group_by(NotifCol::IsRead)
            .into_tuple::<(NotificationType, bool, i64)>()
            .all(&self.orm)
            .await?;
        Ok(NotificationStats::from_groups(groups))
    }
}

#[async_trait]
impl OrderStore for OrmStore {
    async fn create(&self, order: NewOrder) -> AppResult<OrderWithItems> {
        let txn = self.orm.begin().await?;
        let created_at = fixed(order.created_at);

        let model = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(order.user_id),
            total_amount: Set(order.total_amount),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PAYMENT_UNPAID.into()),
            paid_at: Set(None),
            tracking_number: Set(None),
            tracking_assigned_at: Set(None),
            status_changed_at: Set(created_at),
            created_at: Set(created_at),
            updated_at: Set(created_at),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            let row = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(model.id),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name),
                quantity: Set(item.quantity),
                price: Set(item.price),
                created_at: Set(created_at),
            }
            .insert(&txn)
            .await?;
            items.push(order_item_from_entity(row));
        }

        txn.commit().await?;

        Ok(OrderWithItems {
            order: order_from_entity(model),
            items,
        })
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Order>> {
        let order = Orders::find_by_id(id).one(&self.orm).await?;
        Ok(order.map(order_from_entity))
    }

    async fn items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_item_from_entity)
            .collect();
        Ok(items)
    }

    async fn list(&self, filter: OrderFilter) -> AppResult<(Vec<Order>, u64)> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status));
        }

        let mut finder = Orders::find().filter(condition);
        finder = match filter.sort_order {
            SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
            SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
        };

        let total = finder.clone().count(&self.orm).await?;
        let orders = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect();

        Ok((orders, total))
    }

    async fn open_orders(&self, after: Option<Uuid>, limit: u64) -> AppResult<Vec<Order>> {
        let mut condition =
            Condition::all().add(OrderCol::Status.is_not_in(OrderStatus::TERMINAL));
        if let Some(after) = after {
            condition = condition.add(OrderCol::Id.gt(after));
        }

        let orders = Orders::find()
            .filter(condition)
            .order_by_asc(OrderCol::Id)
            .limit(limit)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect();
        Ok(orders)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Order>> {
        let at = fixed(at);
        let updated = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(to))
            .col_expr(OrderCol::StatusChangedAt, Expr::value(at))
            .col_expr(OrderCol::UpdatedAt, Expr::value(at))
            .filter(OrderCol::Id.eq(id))
            .filter(OrderCol::Status.eq(from))
            .exec_with_returning(&self.orm)
            .await?;

        Ok(updated.into_iter().next().map(order_from_entity))
    }

    async fn record_payment(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Order>> {
        let at = fixed(at);
        let updated = Orders::update_many()
            .col_expr(OrderCol::PaymentStatus, Expr::value(PAYMENT_PAID))
            .col_expr(OrderCol::PaidAt, Expr::value(Some(at)))
            .col_expr(OrderCol::UpdatedAt, Expr::value(at))
            .filter(OrderCol::Id.eq(id))
            .filter(OrderCol::PaymentStatus.eq(PAYMENT_UNPAID))
            .filter(OrderCol::Status.ne(OrderStatus::Cancelled))
            .exec_with_returning(&self.orm)
            .await?;

        Ok(updated.into_iter().next().map(order_from_entity))
    }

    async fn assign_tracking(
        &self,
        id: Uuid,
        tracking_number: String,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Order>> {
        let at = fixed(at);
        let updated = Orders::update_many()
            .col_expr(OrderCol::TrackingNumber, Expr::value(Some(tracking_number)))
            .col_expr(OrderCol::TrackingAssignedAt, Expr::value(Some(at)))
            .col_expr(OrderCol::UpdatedAt, Expr::value(at))
            .filter(OrderCol::Id.eq(id))
            .filter(OrderCol::Status.is_not_in(OrderStatus::TERMINAL))
            .exec_with_returning(&self.orm)
            .await?;

        Ok(updated.into_iter().next().map(order_from_entity))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let txn = self.orm.begin().await?;
        OrderItems::delete_many()
            .filter(OrderItemCol::OrderId.eq(id))
            .exec(&txn)
            .await?;
        let result = Orders::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

fn notification_active(row: NewNotification) -> NotificationActive {
    NotificationActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(row.user_id),
        notification_type: Set(row.notification_type),
        title: Set(row.title),
        message: Set(row.message),
        related_id: Set(row.related_id),
        is_read: Set(false),
        created_at: Set(fixed(row.created_at)),
    }
}

fn notification_from_entity(model: NotificationModel) -> Notification {
    Notification {
        id: model.id,
        user_id: model.user_id,
        notification_type: model.notification_type,
        title: model.title,
        message: model.message,
        related_id: model.related_id,
        is_read: model.is_read,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status: model.status,
        payment_status: model.payment_status,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        tracking_number: model.tracking_number,
        tracking_assigned_at: model.tracking_assigned_at.map(|dt| dt.with_timezone(&Utc)),
        status_changed_at: model.status_changed_at.with_timezone(&Utc),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
