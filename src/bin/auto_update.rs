//! One auto-update pass, for cron or other external schedulers.

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_notify_api::{
    config::AppConfig,
    db::create_orm_conn,
    services::order_status_updater::{self, AutoUpdateOptions},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,order_notify_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    let state = AppState::new(orm, config);

    let options = AutoUpdateOptions::from_state(&state, Utc::now(), None);
    let summary = order_status_updater::run(
        state.orders.as_ref(),
        state.notifications.as_ref(),
        options,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
