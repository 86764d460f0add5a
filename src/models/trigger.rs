use serde::{Deserialize, Serialize};

use super::instance::InstanceRef;

/// Pub/Sub push delivery. Only used to tag logs; the sweep never reads it.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: Option<PushMessage>,
    pub subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub message_id: Option<String>,
    pub publish_time: Option<String>,
}

impl PushEnvelope {
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.message_id.as_deref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub project: String,
    pub zones_scanned: usize,
    pub examined: usize,
    /// Instances that declared a usable TTL.
    pub with_ttl: usize,
    pub deleted: Vec<InstanceRef>,
}

impl SweepSummary {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            zones_scanned: 0,
            examined: 0,
            with_ttl: 0,
            deleted: Vec::new(),
        }
    }
}
