use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::match_dto::{
        CreateMatchPayload, MatchListQuery, MatchListResponse, MatchResponse,
        MatchStatsResponse, PipelineStatusResponse, TransitionPayload, TransitionResponse,
    },
    error::Result,
    middleware::auth::Claims,
    models::{matches::Transition, status::MatchStatus},
    utils::extract::{AppJson, AppQuery},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/pipeline/statuses",
    responses(
        (status = 200, description = "Pipeline statuses with labels and allowed transitions", body = [PipelineStatusResponse])
    )
)]
pub async fn list_statuses() -> impl IntoResponse {
    let statuses: Vec<PipelineStatusResponse> = MatchStatus::ALL
        .iter()
        .copied()
        .map(PipelineStatusResponse::from)
        .collect();
    Json(statuses)
}

#[utoipa::path(
    post,
    path = "/api/matches",
    request_body = CreateMatchPayload,
    responses(
        (status = 201, description = "Match created", body = MatchResponse),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateMatchPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let m = state
        .match_service
        .create(payload.into(), &claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(MatchResponse::from(m))))
}

#[utoipa::path(
    get,
    path = "/api/matches",
    params(
        ("candidate_id" = Option<String>, Query, description = "Filter by candidate"),
        ("job_id" = Option<String>, Query, description = "Filter by job"),
        ("company_id" = Option<String>, Query, description = "Filter by company"),
        ("status" = Option<MatchStatus>, Query, description = "Filter by status")
    ),
    responses(
        (status = 200, description = "Matches, most recently updated first", body = MatchListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_matches(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MatchListQuery>,
) -> Result<impl IntoResponse> {
    let matches = state.match_service.list(&query.into()).await?;
    let items: Vec<MatchResponse> = matches.into_iter().map(MatchResponse::from).collect();
    Ok(Json(MatchListResponse {
        total: items.len(),
        items,
    }))
}

#[utoipa::path(
    get,
    path = "/api/matches/stats",
    responses(
        (status = 200, description = "Counts per status and average score", body = MatchStatsResponse)
    )
)]
#[axum::debug_handler]
pub async fn match_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.match_service.stats().await?;
    Ok(Json(MatchStatsResponse::from(stats)))
}

#[utoipa::path(
    get,
    path = "/api/matches/{id}",
    params(
        ("id" = String, Path, description = "Match ID")
    ),
    responses(
        (status = 200, description = "Match found", body = MatchResponse),
        (status = 404, description = "Match not found")
    )
)]
#[axum::debug_handler]
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let m = state.match_service.get(&id).await?;
    Ok(Json(MatchResponse::from(m)))
}

#[utoipa::path(
    delete,
    path = "/api/matches/{id}",
    params(
        ("id" = String, Path, description = "Match ID")
    ),
    responses(
        (status = 204, description = "Match deleted"),
        (status = 404, description = "Match not found"),
        (status = 412, description = "Match has progressed past `suggested`")
    )
)]
#[axum::debug_handler]
pub async fn delete_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.match_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/transitions",
    params(
        ("id" = String, Path, description = "Match ID")
    ),
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Transition applied", body = TransitionResponse),
        (status = 400, description = "Transition not allowed or event date missing"),
        (status = 404, description = "Match not found"),
        (status = 409, description = "Concurrent modification")
    )
)]
#[axum::debug_handler]
pub async fn transition_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<TransitionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let transition = Transition {
        target: payload.status,
        actor: claims.sub,
        description: payload.description,
        notes: payload.notes,
        event_date: payload.event_date,
    };
    let (m, entry) = state.match_service.apply_transition(&id, transition).await?;
    Ok(Json(TransitionResponse {
        match_: MatchResponse::from(m),
        entry: entry.into(),
    }))
}
