use std::env;

use crate::error::CleanupError;

pub const DEFAULT_COMPUTE_API_URL: &str = "https://compute.googleapis.com/compute/v1";
pub const DEFAULT_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_id: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub compute_api_url: String,
    pub metadata_token_url: String,
    pub access_token: Option<String>,
    pub http_timeout_secs: u64,
    pub trigger_token: Option<String>,
    pub sweep_interval_secs: Option<u64>,
    pub max_trigger_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CleanupError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CleanupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let project_id = non_empty("PROJECT_ID")
            .or_else(|| non_empty("GOOGLE_CLOUD_PROJECT"))
            .ok_or_else(|| {
                CleanupError::configuration("PROJECT_ID (or GOOGLE_CLOUD_PROJECT) must be set")
            })?;

        Ok(Self {
            project_id,
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_key(&lookup, "PORT").unwrap_or(8080),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            compute_api_url: non_empty("COMPUTE_API_URL")
                .unwrap_or_else(|| DEFAULT_COMPUTE_API_URL.into()),
            metadata_token_url: non_empty("METADATA_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_METADATA_TOKEN_URL.into()),
            access_token: non_empty("ACCESS_TOKEN"),
            http_timeout_secs: parse_key(&lookup, "HTTP_TIMEOUT_SECS").unwrap_or(30),
            trigger_token: non_empty("TRIGGER_TOKEN"),
            sweep_interval_secs: parse_key::<_, u64>(&lookup, "SWEEP_INTERVAL_SECS")
                .filter(|secs| *secs > 0),
            max_trigger_bytes: parse_key(&lookup, "MAX_TRIGGER_BYTES").unwrap_or(1_048_576),
        })
    }

    /// Config suitable for tests and local runs against a fake backend.
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            host: "127.0.0.1".into(),
            port: 0,
            log_level: "info".into(),
            compute_api_url: DEFAULT_COMPUTE_API_URL.into(),
            metadata_token_url: DEFAULT_METADATA_TOKEN_URL.into(),
            access_token: None,
            http_timeout_secs: 30,
            trigger_token: None,
            sweep_interval_secs: None,
            max_trigger_bytes: 1_048_576,
        }
    }
}

fn parse_key<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
