use crate::CameraDevice;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info};

/// Best-effort release of a camera.
pub trait TryClose {
    /// Close the device, logging and swallowing any failure. Safe to call on a
    /// device that is already closing or closed.
    fn try_close(&self);
}

impl<D: CameraDevice> TryClose for D {
    fn try_close(&self) {
        let camera_id = self.id();
        info!(%camera_id, "closing camera");
        match catch_unwind(AssertUnwindSafe(|| self.close())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(%camera_id, error = %e, "failed to close camera"),
            Err(_) => error!(%camera_id, "camera close panicked"),
        }
    }
}
