//! Container descriptors returned by the inspect endpoint.

use serde::Deserialize;

use crate::error::DockerError;

/// The subset of `GET /containers/{id}/json` the watchdog reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    /// Container name as reported by the daemon (leading `/` included).
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "State")]
    pub state: ContainerState,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContainerState {
    /// "created", "running", "restarting", "exited", ...
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Running", default)]
    pub running: bool,
    #[serde(rename = "Restarting", default)]
    pub restarting: bool,
}

impl ContainerSummary {
    /// Name without the leading slash.
    pub fn display_name(&self) -> &str {
        self.name.trim_start_matches('/')
    }
}

/// Check that `id` is a container name or id the daemon could accept.
///
/// Names match `[a-zA-Z0-9][a-zA-Z0-9_.-]*`; ids are hex and match too.
/// The identifier ends up in a request path, so nothing else is allowed.
pub fn validate_container_id(id: &str) -> Result<(), DockerError> {
    let mut chars = id.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(DockerError::InvalidContainerId(id.to_string()))
    }
}
