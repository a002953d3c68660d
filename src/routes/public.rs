use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::public_dto::{ExportOptions, ExportQuery, PublicEnvelope},
    error::{Error, Result},
    models::api_key::ClientInfo,
    utils::extract::AppQuery,
    AppState,
};

const EXPORT_CACHE_CONTROL: &str = "public, max-age=21600";
const JOB_CACHE_CONTROL: &str = "public, max-age=600";

#[utoipa::path(
    get,
    path = "/api/public/jobs/export",
    params(
        ("X-API-Key" = String, Header, description = "Client API key"),
        ("includeCompanies" = Option<String>, Query, description = "Include the company summary unless `false`"),
        ("includeStores" = Option<String>, Query, description = "Include the store summary unless `false`"),
        ("limit" = Option<String>, Query, description = "Maximum number of jobs, clamped to 1..=50")
    ),
    responses(
        (status = 200, description = "Active public jobs", body = crate::dto::public_dto::PublicJobsExport),
        (status = 400, description = "Malformed limit"),
        (status = 401, description = "Missing, unknown or inactive API key"),
        (status = 429, description = "Daily quota exhausted")
    )
)]
#[axum::debug_handler]
pub async fn export_jobs(
    State(state): State<AppState>,
    Extension(client): Extension<ClientInfo>,
    AppQuery(query): AppQuery<ExportQuery>,
) -> Result<impl IntoResponse> {
    let options = ExportOptions::try_from(query)?;

    if !state.api_key_service.check_rate_limit(&client).await? {
        return Err(Error::RateLimited {
            retry_after_secs: state.api_key_service.retry_after_secs(),
        });
    }

    let export = state.export_service.export_public_jobs(options).await?;
    tracing::info!(
        client = %client.client_name,
        jobs = export.total_count,
        "public jobs exported"
    );
    Ok((
        [(header::CACHE_CONTROL, EXPORT_CACHE_CONTROL)],
        Json(PublicEnvelope::ok(export)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/public/jobs/{id}",
    params(
        ("X-API-Key" = String, Header, description = "Client API key"),
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job found", body = crate::dto::public_dto::PublicJobDetail),
        (status = 401, description = "Missing, unknown or inactive API key"),
        (status = 404, description = "Job absent, inactive or not public")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let job = state.export_service.public_job(&id).await?;
    Ok((
        [(header::CACHE_CONTROL, JOB_CACHE_CONTROL)],
        Json(PublicEnvelope::ok(job)),
    ))
}
