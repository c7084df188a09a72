mod common;

use chrono::TimeDelta;
use common::{MemoryStore, admin, customer, test_state};
use order_notify_api::{
    dto::orders::{
        AssignTrackingRequest, CreateOrderItem, CreateOrderRequest, UpdateOrderStatusRequest,
    },
    error::AppError,
    models::{NotificationType, OrderStatus},
    routes::params::{OrderListQuery, SortOrder},
    services::{admin_service, order_service},
};
use uuid::Uuid;

fn request(lines: &[(i32, i64)]) -> CreateOrderRequest {
    CreateOrderRequest {
        items: lines
            .iter()
            .map(|&(quantity, price)| CreateOrderItem {
                product_id: Uuid::new_v4(),
                product_name: "Ferris Plush".into(),
                quantity,
                price,
            })
            .collect(),
    }
}

#[tokio::test]
async fn create_and_fetch_order_with_items() {
    let store = MemoryStore::new();
    let user_id = store.add_user();
    let state = test_state(&store);

    let created = order_service::create_order(&state, &customer(user_id), request(&[(2, 1_500), (1, 300)]))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(created.order.total_amount, 3_300);
    assert_eq!(created.order.status, OrderStatus::Pending);
    assert_eq!(created.items.len(), 2);

    let fetched = order_service::get_order(&state, &customer(user_id), created.order.id)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(fetched.order, created.order);
    assert_eq!(fetched.items.len(), 2);
}

#[tokio::test]
async fn other_customers_cannot_see_an_order() {
    let store = MemoryStore::new();
    let owner = store.add_user();
    let stranger = store.add_user();
    let order = store.add_order(owner, OrderStatus::Pending, TimeDelta::zero());
    let state = test_state(&store);

    let err = order_service::get_order(&state, &customer(stranger), order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    assert!(order_service::get_order(&state, &admin(), order.id).await.is_ok());
}

#[tokio::test]
async fn user_listing_filters_by_owner_and_status() {
    let store = MemoryStore::new();
    let alice = store.add_user();
    let bob = store.add_user();
    store.add_order(alice, OrderStatus::Pending, TimeDelta::hours(3));
    store.add_order(alice, OrderStatus::Shipped, TimeDelta::hours(2));
    store.add_order(bob, OrderStatus::Pending, TimeDelta::hours(1));
    let state = test_state(&store);

    let all = order_service::list_user_orders(&state, &customer(alice), OrderListQuery::default())
        .await
        .unwrap();
    assert_eq!(all.meta.unwrap().total, Some(2));

    let pending = order_service::list_user_orders(
        &state,
        &customer(alice),
        OrderListQuery {
            status: Some("pending".into()),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(pending.items.len(), 1);
    assert_eq!(pending.items[0].user_id, alice);
}

#[tokio::test]
async fn admin_listing_sees_everyone_customers_do_not() {
    let store = MemoryStore::new();
    let alice = store.add_user();
    let bob = store.add_user();
    store.add_order(alice, OrderStatus::Pending, TimeDelta::zero());
    store.add_order(bob, OrderStatus::Pending, TimeDelta::zero());
    let state = test_state(&store);

    let resp = admin_service::list_all_orders(&state, &admin(), OrderListQuery::default())
        .await
        .unwrap();
    assert_eq!(resp.data.unwrap().items.len(), 2);

    let err = admin_service::list_all_orders(&state, &customer(alice), OrderListQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn owners_delete_only_pending_or_cancelled_orders() {
    let store = MemoryStore::new();
    let owner = store.add_user();
    let pending = store.add_order(owner, OrderStatus::Pending, TimeDelta::zero());
    let shipped = store.add_order(owner, OrderStatus::Shipped, TimeDelta::zero());
    let state = test_state(&store);

    order_service::delete_order(&state, &customer(owner), pending.id)
        .await
        .unwrap();
    let err = order_service::delete_order(&state, &customer(owner), shipped.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    order_service::delete_order(&state, &admin(), shipped.id)
        .await
        .unwrap();
    let err = order_service::get_order(&state, &admin(), shipped.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn paying_records_signal_and_notifies_owner() {
    let store = MemoryStore::new();
    let owner = store.add_user();
    let order = store.add_order(owner, OrderStatus::Pending, TimeDelta::hours(1));
    let state = test_state(&store);

    let paid = order_service::pay_order(&state, &customer(owner), order.id)
        .await
        .unwrap()
        .data
        .unwrap();
    assert!(paid.is_paid());
    assert!(paid.paid_at.is_some());
    assert_eq!(store.notifications_of(NotificationType::Payment).len(), 1);

    let err = order_service::pay_order(&state, &customer(owner), order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Order already paid"));
}

#[tokio::test]
async fn cancelled_orders_cannot_be_paid() {
    let store = MemoryStore::new();
    let owner = store.add_user();
    let order = store.add_order(owner, OrderStatus::Cancelled, TimeDelta::zero());
    let state = test_state(&store);

    let err = order_service::pay_order(&state, &customer(owner), order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn manual_status_update_follows_transition_rules() {
    let store = MemoryStore::new();
    let owner = store.add_user();
    let order = store.add_order(owner, OrderStatus::Processing, TimeDelta::hours(1));
    let state = test_state(&store);

    let backwards = admin_service::update_order_status(
        &state,
        &admin(),
        order.id,
        UpdateOrderStatusRequest {
            status: "PENDING".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(backwards, AppError::BadRequest(_)));

    let unknown = admin_service::update_order_status(
        &state,
        &admin(),
        order.id,
        UpdateOrderStatusRequest {
            status: "LOST".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(unknown, AppError::BadRequest(_)));

    let updated = admin_service::update_order_status(
        &state,
        &admin(),
        order.id,
        UpdateOrderStatusRequest {
            status: "cancelled".into(),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(updated.status, OrderStatus::Cancelled);

    let rows = store.notifications_of(NotificationType::OrderStatus);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, owner);
}

#[tokio::test]
async fn tracking_requires_admin_and_an_open_order() {
    let store = MemoryStore::new();
    let owner = store.add_user();
    let open = store.add_order(owner, OrderStatus::Processing, TimeDelta::hours(1));
    let closed = store.add_order(owner, OrderStatus::Delivered, TimeDelta::hours(1));
    let state = test_state(&store);
    let tracking = || AssignTrackingRequest {
        tracking_number: " 1Z999 ".into(),
    };

    let err = admin_service::assign_tracking(&state, &customer(owner), open.id, tracking())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = admin_service::assign_tracking(&state, &admin(), closed.id, tracking())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let order = admin_service::assign_tracking(&state, &admin(), open.id, tracking())
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(order.tracking_number.as_deref(), Some("1Z999"));
    assert!(order.tracking_assigned_at.is_some());
}
