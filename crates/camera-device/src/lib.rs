//! camera-device: async open handshake for callback-driven camera platforms
//!
//! Platforms report a camera's lifecycle through callbacks (opened,
//! disconnected, error). [`open_camera`] turns that into one awaitable call
//! that yields the device or a classified [`CameraError`], and keeps
//! forwarding later disconnects to a caller handler for the device's lifetime.
//! The default build enables a `mock` platform so binaries and tests run
//! without camera hardware.

mod types;
pub use types::{CameraId, Timestamp};

mod error;
pub use error::{
    CameraDeviceError, CameraError, Result, ERROR_CAMERA_DEVICE, ERROR_CAMERA_DISABLED,
    ERROR_CAMERA_IN_USE, ERROR_CAMERA_SERVICE, ERROR_MAX_CAMERAS_IN_USE,
};

mod traits;
pub use traits::{CameraDevice, CameraManager};

mod queue;
pub use queue::CameraQueue;

mod close;
pub use close::TryClose;

mod sink;
pub use sink::{DeviceEvent, DisconnectHandler, OpenOutcome, PendingOpen, Resolution, StateSink};

mod config;
pub use config::OpenConfig;

mod open;
pub use open::{open_camera, open_camera_with};

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{MockBehavior, MockCameraDevice, MockCameraManager, MockEvent, RecordedEvent};
