use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::api_key_dto::{ApiKeyResponse, CreateApiKeyPayload, UpdateApiKeyPayload},
    error::Result,
    middleware::auth::Claims,
    utils::extract::AppJson,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/admin/api-keys",
    request_body = CreateApiKeyPayload,
    responses(
        (status = 201, description = "API key issued", body = ApiKeyResponse),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller is not an admin")
    )
)]
#[axum::debug_handler]
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateApiKeyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let key = state
        .api_key_service
        .provision(payload.into(), &claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiKeyResponse::from(key))))
}

#[utoipa::path(
    get,
    path = "/api/admin/api-keys/{key}",
    params(
        ("key" = String, Path, description = "API key")
    ),
    responses(
        (status = 200, description = "API key with usage counters", body = ApiKeyResponse),
        (status = 404, description = "API key not found")
    )
)]
#[axum::debug_handler]
pub async fn get_api_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let key = state.api_key_service.get(&key).await?;
    Ok(Json(ApiKeyResponse::from(key)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/api-keys/{key}",
    params(
        ("key" = String, Path, description = "API key")
    ),
    request_body = UpdateApiKeyPayload,
    responses(
        (status = 200, description = "API key updated", body = ApiKeyResponse),
        (status = 404, description = "API key not found")
    )
)]
#[axum::debug_handler]
pub async fn update_api_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    AppJson(payload): AppJson<UpdateApiKeyPayload>,
) -> Result<impl IntoResponse> {
    let key = state
        .api_key_service
        .set_active(&key, payload.is_active)
        .await?;
    Ok(Json(ApiKeyResponse::from(key)))
}
