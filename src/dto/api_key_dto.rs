use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::api_key::{ApiKey, ApiKeyPlan};
use crate::services::api_key_service::NewApiKey;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateApiKeyPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub client_name: String,
    pub plan: ApiKeyPlan,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<CreateApiKeyPayload> for NewApiKey {
    fn from(p: CreateApiKeyPayload) -> Self {
        Self {
            name: p.name,
            client_name: p.client_name,
            plan: p.plan,
            allowed_origins: p.allowed_origins,
            notes: p.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateApiKeyPayload {
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiKeyResponse {
    pub key: String,
    pub name: String,
    pub client_name: String,
    pub is_active: bool,
    pub plan: String,
    pub daily_quota: u32,
    pub request_count: u32,
    pub last_reset_date: String,
    pub allowed_origins: Vec<String>,
    pub total_requests: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub notes: Option<String>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(k: ApiKey) -> Self {
        Self {
            daily_quota: k.quota(),
            key: k.key,
            name: k.name,
            client_name: k.client_name,
            is_active: k.is_active,
            plan: k.plan,
            request_count: k.request_count,
            last_reset_date: k.last_reset_date,
            allowed_origins: k.allowed_origins,
            total_requests: k.total_requests,
            created_at: k.created_at,
            last_used_at: k.last_used_at,
            created_by: k.created_by,
            notes: k.notes,
        }
    }
}
