use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::models::status::MatchStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot move match from `{from}` to `{to}`")]
    InvalidTransition { from: MatchStatus, to: MatchStatus },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Daily rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed document {collection}/{id}: {reason}")]
    MalformedDocument {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) | Error::Validation(_) | Error::InvalidTransition { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Config(_)
            | Error::MalformedDocument { .. }
            | Error::Database(_)
            | Error::Json(_)
            | Error::Reqwest(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code carried in every error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadRequest(_) => "BAD_REQUEST",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::InvalidTransition { .. } => "INVALID_TRANSITION",
            Error::Unauthorized(_) => "UNAUTHORIZED",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::PreconditionFailed(_) => "PRECONDITION_FAILED",
            Error::RateLimited { .. } => "TOO_MANY_REQUESTS",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = self.code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            if crate::config::expose_internal_errors() {
                self.to_string()
            } else {
                "An internal error occurred".to_string()
            }
        } else {
            match &self {
                Error::Unauthorized(reason) => reason.clone(),
                Error::RateLimited { .. } => {
                    "Daily rate limit exceeded. Please try again tomorrow.".to_string()
                }
                other => other.to_string(),
            }
        };

        let mut error = json!({ "code": code, "message": message });
        if let Error::InvalidTransition { from, to } = &self {
            error["details"] = json!({ "current": from, "attempted": to });
        }

        let body = Json(json!({ "success": false, "error": error }));
        let mut response = (status, body).into_response();

        if let Error::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: Error) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn rate_limited_carries_retry_after() {
        let (status, headers, body) = body_of(Error::RateLimited { retry_after_secs: 120 }).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(headers.get(header::RETRY_AFTER).unwrap(), "120");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "TOO_MANY_REQUESTS");
    }

    #[tokio::test]
    async fn internal_details_are_hidden_without_development_env() {
        let (status, _, body) = body_of(Error::Internal("pool exhausted".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn unauthorized_keeps_its_reason() {
        let (status, _, body) = body_of(Error::Unauthorized("invalid_token".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "invalid_token");
    }

    #[tokio::test]
    async fn invalid_transition_names_both_statuses() {
        let (status, _, body) = body_of(Error::InvalidTransition {
            from: MatchStatus::Rejected,
            to: MatchStatus::Applied,
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"]["current"], "rejected");
        assert_eq!(body["error"]["details"]["attempted"], "applied");
    }
}
