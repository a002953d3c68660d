//! `X-API-Key` gate for the public job feed.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::Error;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Verifies the presented key and makes the resolved
/// [`ClientInfo`](crate::models::api_key::ClientInfo) available to handlers.
/// Quota accounting is left to the handlers, since not every gated route
/// is metered.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    let client = state
        .api_key_service
        .verify(presented)
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid API key or credentials".to_string()))?;

    tracing::debug!(client = %client.client_name, plan = client.plan.as_str(), "api key accepted");
    req.extensions_mut().insert(client);
    Ok(next.run(req).await)
}
