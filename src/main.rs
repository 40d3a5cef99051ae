//! ThemeVault backend entry point.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use themevault::adapters::email::LogMailer;
use themevault::adapters::http::{app_router, BillingAppState, JwtAuthenticator};
use themevault::adapters::postgres::{
    PostgresEarlyAdopterPool, PostgresLicenseStore, PostgresSubscriptionStore,
    PostgresUserDirectory, PostgresWebhookLedger,
};
use themevault::config::AppConfig;
use themevault::domain::billing::WebhookVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let subscription_store = Arc::new(PostgresSubscriptionStore::new(pool.clone()));
    let state = BillingAppState {
        verifier: WebhookVerifier::new(config.billing.webhook_secret.clone()),
        ledger: Arc::new(PostgresWebhookLedger::new(pool.clone())),
        subscriptions: subscription_store.clone(),
        downloads: subscription_store,
        licenses: Arc::new(PostgresLicenseStore::new(pool.clone())),
        slot_pool: Arc::new(PostgresEarlyAdopterPool::new(pool.clone())),
        users: Arc::new(PostgresUserDirectory::new(pool)),
        mailer: Arc::new(LogMailer::new(&config.email)),
    };
    let auth = Arc::new(JwtAuthenticator::new(&config.auth.jwt_secret));

    let app = app_router(state, auth, &config.server.cors_origins_list());
    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "themevault listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
