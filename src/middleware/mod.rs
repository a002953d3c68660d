pub mod api_key;
pub mod auth;
pub mod cors;
pub mod rate_limit;
