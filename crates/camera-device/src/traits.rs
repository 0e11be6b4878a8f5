use crate::{CameraId, CameraQueue, Result, StateSink};

/// An opened hardware camera handle.
///
/// Clones refer to the same underlying device. The clone handed out by
/// [`open_camera`](crate::open_camera) is the owning one; the platform sink only
/// keeps the clones it receives with each lifecycle event.
pub trait CameraDevice: Clone + Send + Sync + 'static {
    fn id(&self) -> &CameraId;

    /// Release the device. May fail, e.g. when it is already closed.
    fn close(&self) -> Result<()>;
}

/// Platform side of the open handshake.
pub trait CameraManager: Send + Sync {
    type Device: CameraDevice;

    /// Request the camera and report its lifecycle to `sink`, dispatched on `queue`.
    ///
    /// At most one of opened/disconnected/error resolves the attempt; further
    /// disconnected/error notifications may follow for the device's lifetime.
    fn open_device(
        &self,
        camera_id: &CameraId,
        queue: &CameraQueue,
        sink: StateSink<Self::Device>,
    ) -> Result<()>;
}
