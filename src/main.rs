//! todo-billing service entry point.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use todo_billing::adapters::email::{ResendConfig, ResendNotifier};
use todo_billing::adapters::http::{billing_router, BillingAppState};
use todo_billing::adapters::postgres::{
    PostgresProcessedEventLedger, PostgresUserSubscriptionStore,
};
use todo_billing::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use todo_billing::application::HandlePaymentWebhookHandler;
use todo_billing::config::{AppConfig, LogFormat, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.server)?;

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    if !config.payment.has_webhook_secret() {
        error!("Stripe webhook secret is not configured; webhooks will be rejected");
    }
    if config.payment.is_test_mode() && config.is_production() {
        warn!("Stripe test-mode key in production environment");
    }

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("connecting to postgres")?;
    info!("Postgres connection pool established");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running migrations")?;
        info!("Migrations applied");
    }

    let payment_provider = StripePaymentAdapter::new(
        StripeConfig::new(config.payment.stripe_api_key.clone())
            .with_base_url(config.payment.api_base_url.clone()),
    );
    let notifier = ResendNotifier::new(
        ResendConfig::new(config.email.resend_api_key.clone(), config.email.from_header())
            .with_base_url(config.email.api_base_url.clone()),
    );

    let handler = HandlePaymentWebhookHandler::new(
        Arc::new(PostgresProcessedEventLedger::new(pool.clone())),
        Arc::new(PostgresUserSubscriptionStore::new(pool)),
        Arc::new(payment_provider),
        Arc::new(notifier),
        config.webhook_settings(),
    );

    let app = router(BillingAppState::new(Arc::new(handler)), &config.server);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, environment = ?config.server.environment, "todo-billing listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn router(state: BillingAppState, server: &ServerConfig) -> Router {
    billing_router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(server.request_timeout()))
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

fn init_tracing(server: &ServerConfig) -> anyhow::Result<()> {
    // RUST_LOG wins over the configured directive
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .context("parsing log filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    match server.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
