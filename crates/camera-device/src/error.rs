use crate::CameraId;
use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = CameraError> = core::result::Result<T, E>;

/// Platform error code: the camera is already opened by a higher-priority client.
pub const ERROR_CAMERA_IN_USE: i32 = 1;
/// Platform error code: the system-wide limit of open cameras was reached.
pub const ERROR_MAX_CAMERAS_IN_USE: i32 = 2;
/// Platform error code: camera access is disabled by device policy.
pub const ERROR_CAMERA_DISABLED: i32 = 3;
/// Platform error code: the camera device hit a fatal error.
pub const ERROR_CAMERA_DEVICE: i32 = 4;
/// Platform error code: the camera service hit a fatal error.
pub const ERROR_CAMERA_SERVICE: i32 = 5;

/// Classified reason attached to open failures and late disconnects.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraDeviceError {
    CameraInUse,
    MaxCamerasInUse,
    DisabledByPolicy,
    DeviceError,
    ServiceError,
    Disconnected,
    Unknown(i32),
}

impl CameraDeviceError {
    /// Map a platform error code. Total: unrecognised codes become `Unknown`.
    pub fn from_platform_code(code: i32) -> Self {
        match code {
            ERROR_CAMERA_IN_USE => Self::CameraInUse,
            ERROR_MAX_CAMERAS_IN_USE => Self::MaxCamerasInUse,
            ERROR_CAMERA_DISABLED => Self::DisabledByPolicy,
            ERROR_CAMERA_DEVICE => Self::DeviceError,
            ERROR_CAMERA_SERVICE => Self::ServiceError,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::CameraInUse => "camera-already-in-use",
            Self::MaxCamerasInUse => "too-many-open-cameras",
            Self::DisabledByPolicy => "camera-is-disabled-by-policy",
            Self::DeviceError => "unknown-camera-device-error",
            Self::ServiceError => "unknown-fatal-camera-service-error",
            Self::Disconnected => "camera-has-been-disconnected",
            Self::Unknown(_) => "unknown-camera-error",
        }
    }
}

impl fmt::Display for CameraDeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "{} ({code})", self.code()),
            _ => f.write_str(self.code()),
        }
    }
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CameraError {
    #[error("camera {camera_id} could not be opened: {reason}")]
    CannotBeOpened {
        camera_id: CameraId,
        reason: CameraDeviceError,
    },
    #[error("camera {camera_id} has been disconnected: {reason}")]
    Disconnected {
        camera_id: CameraId,
        reason: CameraDeviceError,
    },
    #[error("camera {camera_id} rejected the open request: {message}")]
    Access { camera_id: CameraId, message: String },
    #[error("camera {camera_id} did not open within {timeout_ms} ms")]
    Timeout { camera_id: CameraId, timeout_ms: u64 },
    #[error("camera {camera_id} failed to close: {message}")]
    Close { camera_id: CameraId, message: String },
    #[error("config error: {0}")]
    Config(String),
}

impl CameraError {
    pub fn cannot_be_opened(camera_id: &CameraId, reason: CameraDeviceError) -> Self {
        Self::CannotBeOpened {
            camera_id: camera_id.clone(),
            reason,
        }
    }

    pub fn disconnected(camera_id: &CameraId, reason: CameraDeviceError) -> Self {
        Self::Disconnected {
            camera_id: camera_id.clone(),
            reason,
        }
    }

    pub fn camera_id(&self) -> Option<&CameraId> {
        match self {
            Self::CannotBeOpened { camera_id, .. }
            | Self::Disconnected { camera_id, .. }
            | Self::Access { camera_id, .. }
            | Self::Timeout { camera_id, .. }
            | Self::Close { camera_id, .. } => Some(camera_id),
            Self::Config(_) => None,
        }
    }

    pub fn reason(&self) -> Option<CameraDeviceError> {
        match self {
            Self::CannotBeOpened { reason, .. } | Self::Disconnected { reason, .. } => {
                Some(*reason)
            }
            _ => None,
        }
    }

    /// Coarse error domain, "session" for handshake and lifecycle failures.
    pub fn domain(&self) -> &'static str {
        match self {
            Self::CannotBeOpened { .. } | Self::Disconnected { .. } | Self::Timeout { .. } => {
                "session"
            }
            Self::Access { .. } | Self::Close { .. } => "device",
            Self::Config(_) => "config",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::CannotBeOpened { .. } => "camera-cannot-be-opened",
            Self::Disconnected { .. } => "camera-has-been-disconnected",
            Self::Access { .. } => "camera-access-rejected",
            Self::Timeout { .. } => "camera-open-timeout",
            Self::Close { .. } => "camera-close-failed",
            Self::Config(_) => "invalid-config",
        }
    }
}
