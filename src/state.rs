use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    middleware::rate_limit::RateLimits,
    repository::{NotificationStore, OrderStore, OrmStore, UserDirectory},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserDirectory>,
    pub notifications: Arc<dyn NotificationStore>,
    pub orders: Arc<dyn OrderStore>,
    pub limits: RateLimits,
}

impl AppState {
    /// State backed by Postgres through SeaORM.
    pub fn new(orm: DatabaseConnection, config: AppConfig) -> Self {
        let store = Arc::new(OrmStore::new(orm));
        Self::with_stores(config, store.clone(), store.clone(), store)
    }

    pub fn with_stores(
        config: AppConfig,
        users: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users,
            notifications,
            orders,
            limits: RateLimits::default(),
        }
    }
}
