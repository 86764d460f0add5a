use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupErrorKind {
    Configuration,
    Transport,
    DataIntegrity,
    MutationFailure,
}

/// Everything that can stop a sweep. Each variant carries the project, zone and
/// instance it concerns so callers never have to parse messages.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CleanupError {
    #[error("Configuration error{}: {message}", target_suffix(.project, .zone, .instance))]
    Configuration {
        project: Option<String>,
        zone: Option<String>,
        instance: Option<String>,
        message: String,
    },

    #[error("Transport error for project {project}{}: {message}", zone_suffix(.zone))]
    Transport {
        project: String,
        zone: Option<String>,
        status: Option<u16>,
        message: String,
    },

    #[error(
        "Instance {instance} in zone {zone} of project {project} has invalid creation timestamp {value:?}: {message}"
    )]
    DataIntegrity {
        project: String,
        zone: String,
        instance: String,
        value: String,
        message: String,
    },

    #[error("Failed to delete instance {instance} in zone {zone} of project {project}: {message}")]
    MutationFailure {
        project: String,
        zone: String,
        instance: String,
        status: Option<u16>,
        message: String,
    },
}

fn zone_suffix(zone: &Option<String>) -> String {
    zone.as_deref()
        .map(|z| format!(" (zone {z})"))
        .unwrap_or_default()
}

fn target_suffix(
    project: &Option<String>,
    zone: &Option<String>,
    instance: &Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(instance) = instance {
        parts.push(format!("instance {instance}"));
    }
    if let Some(zone) = zone {
        parts.push(format!("zone {zone}"));
    }
    if let Some(project) = project {
        parts.push(format!("project {project}"));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl CleanupError {
    pub fn configuration(message: impl Into<String>) -> Self {
        CleanupError::Configuration {
            project: None,
            zone: None,
            instance: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> CleanupErrorKind {
        match self {
            CleanupError::Configuration { .. } => CleanupErrorKind::Configuration,
            CleanupError::Transport { .. } => CleanupErrorKind::Transport,
            CleanupError::DataIntegrity { .. } => CleanupErrorKind::DataIntegrity,
            CleanupError::MutationFailure { .. } => CleanupErrorKind::MutationFailure,
        }
    }

    /// Whether the next scheduled run has a chance of succeeding without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CleanupError::Transport { .. } | CleanupError::MutationFailure { .. }
        )
    }

    /// Fill in whatever project, zone and instance context the error is still missing.
    /// Kind and existing context are preserved.
    pub fn with_target(self, project_id: &str, zone: Option<&str>, instance: Option<&str>) -> Self {
        match self {
            CleanupError::Configuration {
                project,
                zone: err_zone,
                instance: err_instance,
                message,
            } => CleanupError::Configuration {
                project: project.or_else(|| Some(project_id.to_string())),
                zone: err_zone.or_else(|| zone.map(str::to_string)),
                instance: err_instance.or_else(|| instance.map(str::to_string)),
                message,
            },
            CleanupError::DataIntegrity {
                project,
                zone,
                instance,
                value,
                message,
            } => CleanupError::DataIntegrity {
                project: if project.is_empty() {
                    project_id.to_string()
                } else {
                    project
                },
                zone,
                instance,
                value,
                message,
            },
            other => other,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Cleanup(#[from] CleanupError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, None),
            AppError::Cleanup(e) => {
                let status = match e.kind() {
                    CleanupErrorKind::Configuration | CleanupErrorKind::DataIntegrity => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    CleanupErrorKind::Transport | CleanupErrorKind::MutationFailure => {
                        StatusCode::BAD_GATEWAY
                    }
                };
                (status, Some(e.kind()))
            }
        };
        let message = self.to_string();

        tracing::error!(status = %status, kind = ?kind, error = %message);

        let body = json!({
            "data": null,
            "error": {
                "code": status.as_u16(),
                "kind": kind,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
