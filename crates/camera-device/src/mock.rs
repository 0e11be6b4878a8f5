use crate::{
    CameraDevice, CameraError, CameraId, CameraManager, CameraQueue, DeviceEvent, Result,
    StateSink, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
struct DeviceState {
    id: CameraId,
    closed: AtomicBool,
    close_attempts: AtomicUsize,
}

/// In-process camera handle. Clones share state.
#[derive(Clone, Debug)]
pub struct MockCameraDevice {
    state: Arc<DeviceState>,
}

impl MockCameraDevice {
    pub fn new(id: impl Into<CameraId>) -> Self {
        Self {
            state: Arc::new(DeviceState {
                id: id.into(),
                closed: AtomicBool::new(false),
                close_attempts: AtomicUsize::new(0),
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn close_attempts(&self) -> usize {
        self.state.close_attempts.load(Ordering::SeqCst)
    }
}

impl CameraDevice for MockCameraDevice {
    fn id(&self) -> &CameraId {
        &self.state.id
    }

    fn close(&self) -> Result<()> {
        self.state.close_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.closed.swap(true, Ordering::SeqCst) {
            return Err(CameraError::Close {
                camera_id: self.state.id.clone(),
                message: "already closed".to_string(),
            });
        }
        Ok(())
    }
}

/// How the mock platform answers an open request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MockBehavior {
    OpenAfter {
        #[serde(default)]
        delay_ms: u64,
    },
    DisconnectAfter {
        #[serde(default)]
        delay_ms: u64,
    },
    ErrorAfter {
        #[serde(default)]
        delay_ms: u64,
        code: i32,
    },
    /// Fail synchronously, as a missing permission would.
    Reject { message: String },
    /// Never answer.
    Silent,
}

impl Default for MockBehavior {
    fn default() -> Self {
        MockBehavior::OpenAfter { delay_ms: 0 }
    }
}

/// Lifecycle event the mock can deliver to a registered sink.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MockEvent {
    Opened,
    Disconnected,
    Error(i32),
}

impl MockEvent {
    fn into_device_event(self, device: MockCameraDevice) -> DeviceEvent<MockCameraDevice> {
        match self {
            MockEvent::Opened => DeviceEvent::Opened(device),
            MockEvent::Disconnected => DeviceEvent::Disconnected(device),
            MockEvent::Error(code) => DeviceEvent::Error(device, code),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecordedEvent {
    pub ts: Timestamp,
    pub kind: &'static str,
}

type EventLog = Arc<Mutex<HashMap<CameraId, Vec<RecordedEvent>>>>;

struct Registration {
    device: MockCameraDevice,
    tx: mpsc::UnboundedSender<(Duration, MockEvent)>,
}

/// Scriptable camera platform. Events for one device are delivered in order
/// on the queue passed to `open_device`.
#[derive(Default)]
pub struct MockCameraManager {
    behaviors: Mutex<HashMap<CameraId, MockBehavior>>,
    registrations: Mutex<HashMap<CameraId, Registration>>,
    log: EventLog,
}

impl MockCameraManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(self, camera_id: impl Into<CameraId>, behavior: MockBehavior) -> Self {
        self.set_behavior(camera_id, behavior);
        self
    }

    pub fn set_behavior(&self, camera_id: impl Into<CameraId>, behavior: MockBehavior) {
        self.behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(camera_id.into(), behavior);
    }

    /// Device created for the latest open request of `camera_id`.
    pub fn device(&self, camera_id: &CameraId) -> Option<MockCameraDevice> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(camera_id)
            .map(|r| r.device.clone())
    }

    /// Events delivered so far for `camera_id`, oldest first.
    pub fn events(&self, camera_id: &CameraId) -> Vec<RecordedEvent> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(camera_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Queue an event for a requested camera. Returns false if it was never requested.
    pub fn emit(&self, camera_id: &CameraId, event: MockEvent) -> bool {
        self.emit_after(camera_id, Duration::ZERO, event)
    }

    pub fn emit_after(&self, camera_id: &CameraId, delay: Duration, event: MockEvent) -> bool {
        let registrations = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match registrations.get(camera_id) {
            Some(reg) => reg.tx.send((delay, event)).is_ok(),
            None => false,
        }
    }

    pub fn emit_opened(&self, camera_id: &CameraId) -> bool {
        self.emit(camera_id, MockEvent::Opened)
    }

    pub fn emit_disconnected(&self, camera_id: &CameraId) -> bool {
        self.emit(camera_id, MockEvent::Disconnected)
    }

    pub fn emit_error(&self, camera_id: &CameraId, code: i32) -> bool {
        self.emit(camera_id, MockEvent::Error(code))
    }

    fn behavior(&self, camera_id: &CameraId) -> MockBehavior {
        self.behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(camera_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl CameraManager for MockCameraManager {
    type Device = MockCameraDevice;

    fn open_device(
        &self,
        camera_id: &CameraId,
        queue: &CameraQueue,
        sink: StateSink<MockCameraDevice>,
    ) -> Result<()> {
        let first = match self.behavior(camera_id) {
            MockBehavior::Reject { message } => {
                return Err(CameraError::Access {
                    camera_id: camera_id.clone(),
                    message,
                })
            }
            MockBehavior::OpenAfter { delay_ms } => Some((delay_ms, MockEvent::Opened)),
            MockBehavior::DisconnectAfter { delay_ms } => Some((delay_ms, MockEvent::Disconnected)),
            MockBehavior::ErrorAfter { delay_ms, code } => Some((delay_ms, MockEvent::Error(code))),
            MockBehavior::Silent => None,
        };

        let device = MockCameraDevice::new(camera_id.clone());
        let (tx, mut rx) = mpsc::unbounded_channel::<(Duration, MockEvent)>();
        if let Some((delay_ms, event)) = first {
            let _ = tx.send((Duration::from_millis(delay_ms), event));
        }

        let driver_device = device.clone();
        let log = Arc::clone(&self.log);
        let id = camera_id.clone();
        queue.spawn(async move {
            while let Some((delay, event)) = rx.recv().await {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let event = event.into_device_event(driver_device.clone());
                log.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(id.clone())
                    .or_default()
                    .push(RecordedEvent {
                        ts: Timestamp::now(),
                        kind: event.kind(),
                    });
                sink.notify(event);
            }
        });

        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(camera_id.clone(), Registration { device, tx });
        Ok(())
    }
}
