//! Server entry point.

use anyhow::Context;
use lodging::booking::BookingService;
use lodging::config::Config;
use lodging::identity::IdentityWebhook;
use lodging::notify::{BookingMailer, ConsoleMailer, SmtpMailer};
use lodging::payments::webhook::PaymentWebhook;
use lodging::payments::StripeClient;
use lodging::server::{build_router, AppState};
use lodging::store::postgres::PostgresStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting lodging server");

    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .idle_timeout(Duration::from_secs(config.postgres.idle_timeout))
        .connect(&config.postgres.url)
        .await
        .context("connecting to postgres")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    let store = Arc::new(PostgresStore::new(pool.clone()));
    let payments = Arc::new(StripeClient::new(&config.payments)?);

    let mailer: Arc<dyn BookingMailer> = if config.mail.smtp_host.is_empty() {
        tracing::info!("no SMTP host configured, logging confirmations to console");
        Arc::new(ConsoleMailer)
    } else {
        Arc::new(SmtpMailer::new(
            &config.mail.smtp_host,
            &config.mail.smtp_user,
            &config.mail.smtp_password,
            config.mail.sender.clone(),
        )?)
    };

    let booking_service = Arc::new(BookingService::new(
        store.clone(),
        store.clone(),
        payments.clone(),
        mailer,
    ));
    let payment_webhook = Arc::new(PaymentWebhook::new(
        config.payments.webhook_secret.clone(),
        config.payments.webhook_tolerance,
        payments,
        store.clone(),
    ));
    let identity_webhook = Arc::new(IdentityWebhook::new(
        config.identity.webhook_secret.clone(),
        config.identity.webhook_tolerance,
        store.clone(),
    ));

    let state = AppState {
        bookings: booking_service,
        rooms: store.clone(),
        users: store,
        payment_webhook,
        identity_webhook,
        db: Some(pool),
    };

    let app = build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    tracing::info!("shut down cleanly");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c"),
        () = terminate => tracing::info!("received terminate signal"),
    }
}
