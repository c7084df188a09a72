use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{AutoUpdateData, AutoUpdateSummary, Interruption, OrderUpdateFailure, StatusTransition},
        notifications::{
            AffectedCount, FanoutResult, NotificationList, PromotionRequest, StatsData,
            SystemNotificationRequest,
        },
        orders::{
            AssignTrackingRequest, CreateOrderItem, CreateOrderRequest, OrderList, OrderWithItems,
            UpdateOrderStatusRequest,
        },
    },
    models::{
        Notification, NotificationStats, NotificationType, NotificationTypeCounts, Order,
        OrderItem, OrderStatus,
    },
    response::{ApiReport, ApiResponse, Meta},
    routes::{admin, health, notifications, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        admin::send_promotion,
        admin::send_system_notification,
        admin::notification_stats,
        admin::trigger_order_status_update,
        notifications::list_notifications,
        notifications::mark_as_read,
        notifications::mark_all_as_read,
        notifications::delete_notification,
        notifications::clear_all,
        orders::create_order,
        orders::list_user_orders,
        orders::list_all_orders,
        orders::get_order,
        orders::delete_order,
        orders::update_order_status,
        orders::pay_order,
        orders::assign_tracking
    ),
    components(
        schemas(
            Notification,
            NotificationType,
            NotificationStats,
            NotificationTypeCounts,
            Order,
            OrderItem,
            OrderStatus,
            PromotionRequest,
            SystemNotificationRequest,
            FanoutResult,
            NotificationList,
            AffectedCount,
            StatsData,
            AutoUpdateData,
            AutoUpdateSummary,
            StatusTransition,
            OrderUpdateFailure,
            Interruption,
            CreateOrderItem,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            AssignTrackingRequest,
            OrderList,
            OrderWithItems,
            params::OrderListQuery,
            params::NotificationListQuery,
            params::BatchQuery,
            Meta,
            ApiResponse<FanoutResult>,
            ApiReport<StatsData>,
            ApiReport<AutoUpdateData>,
            ApiResponse<NotificationList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<Order>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Notifications", description = "Notification endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Admin broadcast, reporting and batch endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
