use crate::{CameraError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenConfig {
    /// Give up on the open handshake after this many milliseconds.
    pub open_timeout_ms: Option<u64>,
    /// Name of the queue callbacks are dispatched on.
    pub queue_name: String,
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            open_timeout_ms: None,
            queue_name: "camera-queue".to_string(),
        }
    }
}

impl OpenConfig {
    pub fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout_ms.map(Duration::from_millis)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| CameraError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CameraError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }
}
