pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::store::DocumentStore;
use crate::services::{
    api_key_service::ApiKeyService, export_service::ExportService, match_service::MatchService,
    notification_service::NotificationService, slack_service::Notifier,
};
use crate::utils::time::Clock;

#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub match_service: MatchService,
    pub api_key_service: ApiKeyService,
    pub export_service: ExportService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let notification_service = NotificationService::new(
            store.clone(),
            notifier,
            clock.clone(),
            config.app_base_url.as_str(),
            config.notification_max_attempts,
        );
        let match_service =
            MatchService::new(store.clone(), clock.clone(), notification_service.clone());
        let api_key_service = ApiKeyService::new(store.clone(), clock.clone());
        let export_service = ExportService::new(store, clock);

        Self {
            jwt_secret: config.jwt_secret.clone(),
            match_service,
            api_key_service,
            export_service,
            notification_service,
        }
    }
}
