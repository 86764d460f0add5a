use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::CleanupError;

// Refresh this long before the server-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where the bearer token for the Compute API comes from.
pub enum TokenSource {
    Static(String),
    MetadataServer {
        url: String,
        cached: RwLock<Option<(String, Instant)>>,
    },
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

impl TokenSource {
    pub fn metadata_server(url: impl Into<String>) -> Self {
        TokenSource::MetadataServer {
            url: url.into(),
            cached: RwLock::new(None),
        }
    }

    pub async fn token(&self, http: &reqwest::Client) -> Result<String, CleanupError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::MetadataServer { url, cached } => {
                if let Some((token, expires_at)) = cached.read().await.as_ref() {
                    if Instant::now() < *expires_at {
                        return Ok(token.clone());
                    }
                }

                let fetched = fetch_metadata_token(http, url).await?;
                let lifetime = Duration::from_secs(fetched.expires_in).saturating_sub(EXPIRY_MARGIN);
                *cached.write().await =
                    Some((fetched.access_token.clone(), Instant::now() + lifetime));
                tracing::debug!(expires_in = fetched.expires_in, "Fetched access token");
                Ok(fetched.access_token)
            }
        }
    }
}

async fn fetch_metadata_token(
    http: &reqwest::Client,
    url: &str,
) -> Result<MetadataToken, CleanupError> {
    let config_error = |message: String| CleanupError::configuration(message);

    let resp = http
        .get(url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| config_error(format!("cannot reach metadata server: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(config_error(format!(
            "metadata server refused token request (status={status}): {body}"
        )));
    }

    resp.json::<MetadataToken>()
        .await
        .map_err(|e| config_error(format!("invalid token response: {e}")))
}
