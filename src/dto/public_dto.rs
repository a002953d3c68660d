use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

pub const MAX_EXPORT_LIMIT: usize = 50;

/// Raw query string of the export endpoint. Values stay strings so that
/// `includeCompanies=0` and friends keep their "anything but false" meaning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub include_companies: Option<String>,
    pub include_stores: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_companies: bool,
    pub include_stores: bool,
    pub limit: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_companies: true,
            include_stores: true,
            limit: MAX_EXPORT_LIMIT,
        }
    }
}

impl TryFrom<ExportQuery> for ExportOptions {
    type Error = Error;

    fn try_from(q: ExportQuery) -> Result<Self> {
        let limit = match q.limit.as_deref().map(str::trim) {
            None | Some("") => MAX_EXPORT_LIMIT,
            Some(raw) => {
                let parsed: i64 = raw
                    .parse()
                    .map_err(|_| Error::BadRequest(format!("limit must be a number, got `{}`", raw)))?;
                parsed.clamp(1, MAX_EXPORT_LIMIT as i64) as usize
            }
        };
        Ok(Self {
            include_companies: q.include_companies.as_deref() != Some("false"),
            include_stores: q.include_stores.as_deref() != Some("false"),
            limit,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicSalary {
    #[serde(rename = "type")]
    pub kind: String,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicWorkingHours {
    pub note: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicJobCompany {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicJobStore {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Public projection of an active job. Internal fields never leave here.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicJob {
    pub id: String,
    pub title: String,
    pub description: String,
    pub employment_type: String,
    pub salary: PublicSalary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<PublicWorkingHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holidays: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welfare: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_process: Option<String>,
    pub company: PublicJobCompany,
    pub stores: Vec<PublicJobStore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifications: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefits: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_points: Option<String>,
    pub status: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub job_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub id: String,
    pub name: String,
    pub company_id: String,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub job_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicJobsExport {
    pub exported_at: String,
    pub total_count: usize,
    pub jobs: Vec<PublicJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companies: Option<Vec<CompanySummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stores: Option<Vec<StoreSummary>>,
}

/// Reduced view served by the single-job endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicJobDetail {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    pub status: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicEnvelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> PublicEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
