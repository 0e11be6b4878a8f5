use crate::{CameraDevice, CameraDeviceError, CameraError, CameraId, TryClose};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Outcome of an open attempt as seen by the waiting caller.
pub type OpenOutcome<D> = Result<D, CameraError>;

/// Handler for disconnects and errors reported after the open attempt has
/// been answered.
pub type DisconnectHandler<D> = Arc<dyn Fn(&D, CameraError) + Send + Sync>;

/// Lifecycle notification delivered by the platform.
#[derive(Clone, Debug)]
pub enum DeviceEvent<D> {
    Opened(D),
    Disconnected(D),
    /// Device plus the raw platform error code.
    Error(D, i32),
}

impl<D> DeviceEvent<D> {
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceEvent::Opened(_) => "opened",
            DeviceEvent::Disconnected(_) => "disconnected",
            DeviceEvent::Error(..) => "error",
        }
    }

    pub fn device(&self) -> &D {
        match self {
            DeviceEvent::Opened(d) | DeviceEvent::Disconnected(d) | DeviceEvent::Error(d, _) => d,
        }
    }
}

/// What happened to an outcome handed to [`PendingOpen::resolve`].
#[derive(Debug)]
pub enum Resolution<D> {
    /// The waiting caller received it.
    Delivered,
    /// The caller stopped waiting before anything was delivered.
    Abandoned(OpenOutcome<D>),
    /// An earlier outcome already answered the attempt.
    AlreadyResolved(OpenOutcome<D>),
}

impl<D> Resolution<D> {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Resolution::Delivered)
    }
}

/// Single-assignment slot for one in-flight open attempt.
pub struct PendingOpen<D> {
    tx: Mutex<Option<oneshot::Sender<OpenOutcome<D>>>>,
}

impl<D> PendingOpen<D> {
    pub fn new() -> (Self, oneshot::Receiver<OpenOutcome<D>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// True while nothing was delivered and the caller is still waiting.
    pub fn is_active(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Complete the attempt. Only the first call can deliver; later calls and
    /// calls after the caller went away hand the outcome back.
    pub fn resolve(&self, outcome: OpenOutcome<D>) -> Resolution<D> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match tx {
            Some(tx) => match tx.send(outcome) {
                Ok(()) => Resolution::Delivered,
                Err(outcome) => Resolution::Abandoned(outcome),
            },
            None => Resolution::AlreadyResolved(outcome),
        }
    }
}

struct SinkInner<D> {
    camera_id: CameraId,
    pending: PendingOpen<D>,
    on_disconnected: DisconnectHandler<D>,
}

/// Callback sink registered with the platform for one open attempt.
///
/// The first terminal event answers the pending open. The sink stays live for
/// the device's lifetime; every disconnect or error after that is forwarded to
/// the disconnect handler, and the device is closed each time.
pub struct StateSink<D> {
    inner: Arc<SinkInner<D>>,
}

impl<D> Clone for StateSink<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: CameraDevice> StateSink<D> {
    pub fn new(
        camera_id: CameraId,
        on_disconnected: DisconnectHandler<D>,
    ) -> (Self, oneshot::Receiver<OpenOutcome<D>>) {
        let (pending, rx) = PendingOpen::new();
        let sink = Self {
            inner: Arc::new(SinkInner {
                camera_id,
                pending,
                on_disconnected,
            }),
        };
        (sink, rx)
    }

    pub fn camera_id(&self) -> &CameraId {
        &self.inner.camera_id
    }

    /// Whether the open attempt is still waiting for its first event.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.is_active()
    }

    pub fn notify(&self, event: DeviceEvent<D>) {
        let camera_id = &self.inner.camera_id;
        match event {
            DeviceEvent::Opened(device) => {
                info!(%camera_id, "camera opened");
                match self.inner.pending.resolve(Ok(device)) {
                    Resolution::Delivered => {}
                    Resolution::Abandoned(outcome) => {
                        warn!(%camera_id, "camera opened after the caller stopped waiting");
                        if let Ok(device) = outcome {
                            device.try_close();
                        }
                    }
                    Resolution::AlreadyResolved(_) => {
                        warn!(%camera_id, "ignoring repeated opened event");
                    }
                }
            }
            DeviceEvent::Disconnected(device) => {
                info!(%camera_id, "camera disconnected");
                self.fail(&device, CameraDeviceError::Disconnected);
            }
            DeviceEvent::Error(device, code) => {
                let reason = CameraDeviceError::from_platform_code(code);
                error!(%camera_id, code, %reason, "camera error");
                self.fail(&device, reason);
            }
        }
    }

    pub fn opened(&self, device: D) {
        self.notify(DeviceEvent::Opened(device));
    }

    pub fn disconnected(&self, device: D) {
        self.notify(DeviceEvent::Disconnected(device));
    }

    pub fn error(&self, device: D, code: i32) {
        self.notify(DeviceEvent::Error(device, code));
    }

    fn fail(&self, device: &D, reason: CameraDeviceError) {
        let camera_id = &self.inner.camera_id;
        let outcome = Err(CameraError::cannot_be_opened(camera_id, reason));
        if !self.inner.pending.resolve(outcome).is_delivered() {
            (self.inner.on_disconnected)(device, CameraError::disconnected(camera_id, reason));
        }
        device.try_close();
    }
}
