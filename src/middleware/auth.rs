use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::AppState;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_RECRUITER: &str = "recruiter";

/// Staff identity carried in the bearer token. `sub` becomes the actor
/// recorded on timeline entries and provisioned keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

/// Admins and recruiters: the match pipeline endpoints.
pub async fn require_operator(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(&state.jwt_secret, req, next, &[ROLE_ADMIN, ROLE_RECRUITER]).await
}

/// Admins only: API key administration.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(&state.jwt_secret, req, next, &[ROLE_ADMIN]).await
}

pub async fn require_roles(secret: &str, mut req: Request, next: Next, allowed: &[&str]) -> Response {
    let claims = match bearer_claims(secret, &req) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let role = claims.role.clone().unwrap_or_default();
    if !allowed.is_empty() && !allowed.iter().any(|r| r.eq_ignore_ascii_case(&role)) {
        tracing::debug!(sub = %claims.sub, role = %role, "role not allowed");
        return Error::Forbidden("Insufficient role".to_string()).into_response();
    }

    req.extensions_mut().insert(claims);
    next.run(req).await
}

fn bearer_claims(secret: &str, req: &Request) -> Result<Claims, Error> {
    let auth = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("missing_authorization".to_string()))?
        .to_str()
        .map_err(|_| Error::Unauthorized("bad_authorization".to_string()))?;
    let token = auth
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("unsupported_scheme".to_string()))?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| Error::Unauthorized("invalid_token".to_string()))
}
