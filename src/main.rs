use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agency_backend::{
    config::{init_config, Config, LogFormat},
    database::{
        memory::MemoryDocumentStore, pool::create_pool, postgres::PgDocumentStore,
        store::DocumentStore,
    },
    routes,
    services::{
        notification_service::NotificationService,
        slack_service::{LogNotifier, Notifier, SlackNotifier},
    },
    utils::time::SystemClock,
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = init_config()?;
    init_tracing(config.log_format);

    let store = open_store(config).await?;
    let notifier = build_notifier(config)?;
    let app_state = AppState::new(config, store, notifier, Arc::new(SystemClock));

    spawn_notification_worker(app_state.notification_service.clone());

    let app = routes::app(app_state, config);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Using PostgreSQL document store");
            Ok(Arc::new(PgDocumentStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory document store");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}

fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    match (config.slack_enabled, config.slack_bot_token.as_ref()) {
        (true, Some(token)) => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()?;
            info!("Slack notifications enabled");
            Ok(Arc::new(SlackNotifier::new(client, token.clone())))
        }
        _ => {
            info!("Slack notifications disabled, logging only");
            Ok(Arc::new(LogNotifier))
        }
    }
}

fn spawn_notification_worker(notifications: NotificationService) {
    tokio::spawn(async move {
        loop {
            match notifications.run_once().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::time::sleep(Duration::from_millis(1000)).await;
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Notification worker error");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}
