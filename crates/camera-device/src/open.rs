use crate::{
    CameraDevice, CameraDeviceError, CameraError, CameraId, CameraManager, CameraQueue,
    OpenConfig, OpenOutcome, Result, StateSink, TryClose,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Receiving end of an open attempt. If dropped while a device is sitting
/// undelivered in the channel, that device is closed.
struct OpenWaiter<D: CameraDevice> {
    rx: oneshot::Receiver<OpenOutcome<D>>,
}

impl<D: CameraDevice> Drop for OpenWaiter<D> {
    fn drop(&mut self) {
        self.rx.close();
        if let Ok(Ok(device)) = self.rx.try_recv() {
            warn!(camera_id = %device.id(), "camera opened but the caller stopped waiting");
            device.try_close();
        }
    }
}

/// Open a camera and wait for the platform to answer.
///
/// Resolves with the device on the first `opened` event, or fails with
/// [`CameraError::CannotBeOpened`] if a disconnect or error arrives first.
/// After success, `on_disconnected` receives a [`CameraError::Disconnected`]
/// for every later disconnect or error, and the device is closed each time.
///
/// Dropping the returned future cancels the attempt. A device that was
/// already delivered but not yet picked up is closed on drop; events arriving
/// later take the post-open path, so a device the platform created anyway is
/// still closed.
pub async fn open_camera<M, F>(
    manager: &M,
    camera_id: impl Into<CameraId>,
    queue: &CameraQueue,
    on_disconnected: F,
) -> Result<M::Device>
where
    M: CameraManager + ?Sized,
    F: Fn(&M::Device, CameraError) + Send + Sync + 'static,
{
    let camera_id = camera_id.into();
    info!(%camera_id, queue = queue.name(), "opening camera");

    let (sink, rx) = StateSink::new(camera_id.clone(), Arc::new(on_disconnected));
    let mut waiter = OpenWaiter { rx };
    manager
        .open_device(&camera_id, queue, sink)
        .inspect_err(|e| error!(%camera_id, error = %e, "open request rejected"))?;

    match (&mut waiter.rx).await {
        Ok(outcome) => outcome,
        // The platform dropped every handle to the sink without answering.
        Err(_) => {
            error!(%camera_id, "camera service dropped the open request");
            Err(CameraError::cannot_be_opened(
                &camera_id,
                CameraDeviceError::ServiceError,
            ))
        }
    }
}

/// [`open_camera`] with the deadline from `config` applied.
///
/// When the deadline passes the attempt is cancelled and fails with
/// [`CameraError::Timeout`].
pub async fn open_camera_with<M, F>(
    manager: &M,
    camera_id: impl Into<CameraId>,
    queue: &CameraQueue,
    config: &OpenConfig,
    on_disconnected: F,
) -> Result<M::Device>
where
    M: CameraManager + ?Sized,
    F: Fn(&M::Device, CameraError) + Send + Sync + 'static,
{
    let camera_id = camera_id.into();
    let Some(timeout_ms) = config.open_timeout_ms else {
        return open_camera(manager, camera_id, queue, on_disconnected).await;
    };

    match tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        open_camera(manager, camera_id.clone(), queue, on_disconnected),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => {
            warn!(%camera_id, timeout_ms, "camera open timed out");
            Err(CameraError::Timeout {
                camera_id,
                timeout_ms,
            })
        }
    }
}
