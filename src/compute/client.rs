use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{InstanceMutator, InventorySource, TokenSource};
use crate::config::AppConfig;
use crate::error::CleanupError;
use crate::models::instance::{zone_name, Instance, Inventory};

const PAGE_SIZE: u32 = 500;
const MAX_PAGES: u32 = 1_000;

/// Compute Engine REST adapter for listing and deleting instances.
pub struct ComputeClient {
    http: reqwest::Client,
    base_url: String,
    token: TokenSource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedInstanceList {
    #[serde(default)]
    items: HashMap<String, InstancesScopedList>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstancesScopedList {
    #[serde(default)]
    instances: Vec<ApiInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInstance {
    name: String,
    zone: Option<String>,
    #[serde(default)]
    creation_timestamp: String,
    metadata: Option<ApiMetadata>,
}

#[derive(Debug, Deserialize)]
struct ApiMetadata {
    #[serde(default)]
    items: Vec<ApiMetadataItem>,
}

#[derive(Debug, Deserialize)]
struct ApiMetadataItem {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiOperation {
    name: Option<String>,
}

impl ApiInstance {
    fn into_instance(self, scope: &str) -> Instance {
        let zone = self
            .zone
            .as_deref()
            .map(zone_name)
            .unwrap_or_else(|| zone_name(scope))
            .to_string();
        let metadata = self
            .metadata
            .map(|m| {
                m.items
                    .into_iter()
                    .map(|item| (item.key, item.value.unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();

        Instance {
            name: self.name,
            zone,
            creation_timestamp: self.creation_timestamp,
            metadata,
        }
    }
}

impl ComputeClient {
    pub fn new(
        base_url: impl Into<String>,
        token: TokenSource,
        timeout: Duration,
    ) -> Result<Self, CleanupError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("instance-reaper/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .map_err(|e| CleanupError::configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, CleanupError> {
        let token = match &config.access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::metadata_server(config.metadata_token_url.clone()),
        };
        Self::new(
            config.compute_api_url.clone(),
            token,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    async fn fetch_page(
        &self,
        project_id: &str,
        page_token: Option<&str>,
    ) -> Result<AggregatedInstanceList, CleanupError> {
        let transport = |status: Option<u16>, message: String| CleanupError::Transport {
            project: project_id.to_string(),
            zone: None,
            status,
            message,
        };

        let token = self
            .token
            .token(&self.http)
            .await
            .map_err(|e| e.with_target(project_id, None, None))?;
        let url = format!("{}/projects/{}/aggregated/instances", self.base_url, project_id);

        let mut req = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("maxResults", PAGE_SIZE)]);
        if let Some(page_token) = page_token {
            req = req.query(&[("pageToken", page_token)]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| transport(None, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(transport(
                Some(status.as_u16()),
                format!("instance listing failed (status={status}): {body}"),
            ));
        }

        resp.json::<AggregatedInstanceList>()
            .await
            .map_err(|e| transport(None, format!("invalid instance listing: {e}")))
    }
}

#[async_trait]
impl InventorySource for ComputeClient {
    async fn list_all_instances(&self, project_id: &str) -> Result<Inventory, CleanupError> {
        let mut inventory = Inventory::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self.fetch_page(project_id, page_token.as_deref()).await?;
            pages += 1;

            for (scope, scoped) in page.items {
                for api_instance in scoped.instances {
                    let instance = api_instance.into_instance(&scope);
                    inventory
                        .entry(instance.zone.clone())
                        .or_default()
                        .push(instance);
                }
            }

            let Some(next) = page.next_page_token.filter(|t| !t.is_empty()) else {
                break;
            };
            if page_token.as_deref() == Some(next.as_str()) || pages >= MAX_PAGES {
                return Err(CleanupError::Transport {
                    project: project_id.to_string(),
                    zone: None,
                    status: None,
                    message: format!(
                        "instance listing did not terminate after {pages} pages (next page token {next:?})"
                    ),
                });
            }
            page_token = Some(next);
        }

        tracing::debug!(
            project = %project_id,
            pages,
            zones = inventory.len(),
            instances = inventory.values().map(Vec::len).sum::<usize>(),
            "Listed instances"
        );

        Ok(inventory)
    }
}

#[async_trait]
impl InstanceMutator for ComputeClient {
    async fn delete_instance(
        &self,
        project_id: &str,
        zone: &str,
        instance_name: &str,
    ) -> Result<(), CleanupError> {
        let failure = |status: Option<u16>, message: String| CleanupError::MutationFailure {
            project: project_id.to_string(),
            zone: zone.to_string(),
            instance: instance_name.to_string(),
            status,
            message,
        };

        let token = self
            .token
            .token(&self.http)
            .await
            .map_err(|e| e.with_target(project_id, Some(zone), Some(instance_name)))?;
        let url = format!(
            "{}/projects/{}/zones/{}/instances/{}",
            self.base_url, project_id, zone, instance_name
        );

        let resp = self
            .http
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| failure(None, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(failure(
                Some(status.as_u16()),
                format!("delete rejected (status={status}): {body}"),
            ));
        }

        // The operation runs asynchronously on the provider side; it is not awaited.
        let operation = resp.json::<ApiOperation>().await.ok().and_then(|op| op.name);
        tracing::info!(
            project = %project_id,
            zone = %zone,
            instance = %instance_name,
            operation = operation.as_deref().unwrap_or("unknown"),
            "Delete requested"
        );

        Ok(())
    }
}
