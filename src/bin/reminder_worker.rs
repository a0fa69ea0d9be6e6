//! Runs the abandoned-checkout reminder polling loop against `PostgreSQL`.
//!
//! Usage:
//!
//! ```text
//! reminder_worker
//! ```
//!
//! Configuration comes from the environment (and a `.env` file when present).
//! `ATELIER_DATABASE_URL` and the `NOTIFICATION_WEBHOOK_*` variables
//! must be set. The loop runs until the process receives Ctrl-C.

use std::sync::Arc;

use atelier::config::{AppConfig, ConfigError};
use atelier::order::adapters::{
    postgres::{OrderPgPool, PostgresOrderRepository},
    webhook::WebhookNotificationGateway,
};
use atelier::reminder::{
    adapters::postgres::PostgresReminderTaskRepository, services::ReminderScheduler,
};
use atelier::telemetry;
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use secrecy::ExposeSecret;
use tracing::info;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(config.log_format)?;

    let pool = build_pool(&config)?;
    let webhook = config
        .notification_webhook
        .clone()
        .ok_or_else(|| ConfigError::MissingEnvVar("NOTIFICATION_WEBHOOK_URL".to_owned()))?;

    let scheduler = ReminderScheduler::new(
        Arc::new(PostgresOrderRepository::new(pool.clone())),
        Arc::new(PostgresReminderTaskRepository::new(pool)),
        Arc::new(WebhookNotificationGateway::new(webhook)?),
        Arc::new(DefaultClock),
        config.reminders,
    );

    let started = scheduler.start_polling();
    info!(started, "reminder worker running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    scheduler.stop_polling().await;
    Ok(())
}

fn build_pool(config: &AppConfig) -> Result<OrderPgPool, BoxError> {
    let url = config.require_database_url()?;
    let manager = ConnectionManager::<PgConnection>::new(url.expose_secret());
    Ok(Pool::builder().build(manager)?)
}
