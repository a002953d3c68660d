use axum::Json;
use utoipa::OpenApi;

use crate::dto::api_key_dto::{ApiKeyResponse, CreateApiKeyPayload, UpdateApiKeyPayload};
use crate::dto::match_dto::{
    CreateMatchPayload, MatchListResponse, MatchResponse, MatchStatsResponse,
    PipelineStatusResponse, TimelineEntryResponse, TransitionPayload, TransitionResponse,
};
use crate::dto::public_dto::{
    CompanySummary, PublicJob, PublicJobCompany, PublicJobDetail, PublicJobStore,
    PublicJobsExport, PublicSalary, PublicWorkingHours, StoreSummary,
};
use crate::models::api_key::ApiKeyPlan;
use crate::models::status::MatchStatus;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::public::export_jobs,
        crate::routes::public::get_job,
        crate::routes::matches::list_statuses,
        crate::routes::matches::create_match,
        crate::routes::matches::list_matches,
        crate::routes::matches::match_stats,
        crate::routes::matches::get_match,
        crate::routes::matches::delete_match,
        crate::routes::matches::transition_match,
        crate::routes::admin::create_api_key,
        crate::routes::admin::get_api_key,
        crate::routes::admin::update_api_key,
    ),
    components(schemas(
        MatchStatus,
        CreateMatchPayload,
        TransitionPayload,
        MatchResponse,
        TimelineEntryResponse,
        TransitionResponse,
        MatchListResponse,
        MatchStatsResponse,
        PipelineStatusResponse,
        ApiKeyPlan,
        CreateApiKeyPayload,
        UpdateApiKeyPayload,
        ApiKeyResponse,
        PublicJobsExport,
        PublicJob,
        PublicSalary,
        PublicWorkingHours,
        PublicJobCompany,
        PublicJobStore,
        CompanySummary,
        StoreSummary,
        PublicJobDetail,
    )),
    tags(
        (name = "agency-backend", description = "Match pipeline and public job feed")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
