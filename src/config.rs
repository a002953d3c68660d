use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub environment: Environment,
    pub app_base_url: Url,
    pub slack_enabled: bool,
    pub slack_bot_token: Option<String>,
    pub public_rps: u32,
    pub internal_rps: u32,
    pub notification_max_attempts: u32,
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let environment = match get_env_or("APP_ENV", "production").to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Environment::Development,
            "production" | "prod" => Environment::Production,
            other => {
                return Err(Error::Config(format!("Invalid value for APP_ENV: {}", other)));
            }
        };

        let log_format = match get_env_or("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            other => {
                return Err(Error::Config(format!("Invalid value for LOG_FORMAT: {}", other)));
            }
        };

        let base_url = get_env_or("APP_BASE_URL", "http://localhost:3000");
        let app_base_url = Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid value for APP_BASE_URL: {}", e)))?;

        let slack_enabled = get_env_parse_or("SLACK_ENABLED", false)?;
        let slack_bot_token = env::var("SLACK_BOT_TOKEN").ok().filter(|t| !t.is_empty());
        if slack_enabled && slack_bot_token.is_none() {
            return Err(Error::Config(
                "SLACK_BOT_TOKEN is required when SLACK_ENABLED=true".to_string(),
            ));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            jwt_secret: get_env("JWT_SECRET")?,
            environment,
            app_base_url,
            slack_enabled,
            slack_bot_token,
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            internal_rps: get_env_parse_or("INTERNAL_RPS", 100)?,
            notification_max_attempts: get_env_parse_or("NOTIFICATION_MAX_ATTEMPTS", 3)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            log_format,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<&'static Config> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(get_config())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

/// Whether error responses may carry internal details. Falls back to hiding
/// them when the process never loaded a configuration (tests, tooling).
pub fn expose_internal_errors() -> bool {
    CONFIG
        .get()
        .map(|c| c.environment.is_development())
        .unwrap_or(false)
}
