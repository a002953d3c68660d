pub mod admin;
pub mod docs;
pub mod health;
pub mod matches;
pub mod public;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::{api_key, auth, cors, rate_limit};
use crate::AppState;

/// The full HTTP surface. Each group carries its own burst guard and
/// authentication layer.
pub fn app(state: AppState, config: &Config) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health))
        .route("/api/openapi.json", get(docs::openapi_json));

    let public_api = Router::new()
        .route("/api/public/jobs/export", get(public::export_jobs))
        .route("/api/public/jobs/:id", get(public::get_job))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api_key::require_api_key,
        ))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.public_rps),
            rate_limit::rps_middleware,
        ));

    let pipeline_api = Router::new()
        .route("/api/pipeline/statuses", get(matches::list_statuses))
        .route(
            "/api/matches",
            get(matches::list_matches).post(matches::create_match),
        )
        .route("/api/matches/stats", get(matches::match_stats))
        .route(
            "/api/matches/:id",
            get(matches::get_match).delete(matches::delete_match),
        )
        .route(
            "/api/matches/:id/transitions",
            post(matches::transition_match),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_operator,
        ))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.internal_rps),
            rate_limit::rps_middleware,
        ));

    let admin_api = Router::new()
        .route("/api/admin/api-keys", post(admin::create_api_key))
        .route(
            "/api/admin/api-keys/:key",
            get(admin::get_api_key).patch(admin::update_api_key),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.internal_rps),
            rate_limit::rps_middleware,
        ));

    base_routes
        .merge(public_api)
        .merge(pipeline_api)
        .merge(admin_api)
        .with_state(state)
        .layer(cors::cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
