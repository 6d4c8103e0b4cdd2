use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bridge::clients::{SpondClient, WhatsAppClient};
use bridge::config::AppConfig;
use bridge::pollers::{start_invite_polling_task, InvitePollerConfig};
use bridge::repository::SqliteIdentityStore;
use bridge::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bridge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let identities = Arc::new(SqliteIdentityStore::open(&config.database_path).await?);
    tracing::info!("Identity store at {}", config.database_path);

    let events = Arc::new(SpondClient::new(config.spond.clone())?);
    let messenger = Arc::new(WhatsAppClient::new(config.whatsapp.clone())?);

    let state = AppState::new(
        events,
        messenger,
        identities,
        config.verify_token.clone(),
        config.days_ahead,
    );

    if let Some(poll_interval) = config.invite_poll_interval {
        let dispatcher = state.dispatcher.clone();
        let poller_config = InvitePollerConfig {
            poll_interval,
            days_ahead: config.days_ahead,
        };
        tokio::spawn(async move {
            start_invite_polling_task(dispatcher, poller_config).await;
        });
    }

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Bridge listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
