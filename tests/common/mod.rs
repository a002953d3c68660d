#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use agency_backend::{
    config::{Config, Environment, LogFormat},
    database::{memory::MemoryDocumentStore, store::DocumentStore},
    error::Result,
    middleware::auth::Claims,
    models::notification::ProgressMessage,
    routes,
    services::slack_service::Notifier,
    utils::time::ManualClock,
    AppState,
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use chrono::{TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use url::Url;

pub const JWT_SECRET: &str = "test_secret_key";

/// Keeps every message it is asked to deliver.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, ProgressMessage)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, channel: &str, message: &ProgressMessage) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), message.clone()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryDocumentStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: None,
        jwt_secret: JWT_SECRET.into(),
        environment: Environment::Production,
        app_base_url: Url::parse("http://localhost:3000").unwrap(),
        slack_enabled: false,
        slack_bot_token: None,
        public_rps: 1000,
        internal_rps: 1000,
        notification_max_attempts: 3,
        cors_allowed_origins: vec![],
        log_format: LogFormat::Pretty,
    }
}

/// App wired to an in-memory store and a clock fixed at 2024-01-01 12:00 UTC.
pub fn setup_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryDocumentStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
    ));
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(&config, store.clone(), notifier.clone(), clock.clone());
    let router = routes::app(state.clone(), &config);
    TestApp {
        router,
        state,
        store,
        clock,
        notifier,
    }
}

pub async fn seed(store: &MemoryDocumentStore, collection: &str, id: &str, data: JsonValue) {
    store.create(collection, id, &data).await.unwrap();
}

pub fn token(sub: &str, role: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        role: Some(role.to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn send(router: &Router, req: Request<Body>) -> (Response<Body>, JsonValue) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let (parts, body) = resp.into_parts();
    let bytes = to_bytes(body, 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (Response::from_parts(parts, Body::empty()), json)
}
