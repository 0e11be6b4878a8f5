use camera_device::{
    open_camera, open_camera_with, CameraDevice, CameraDeviceError, CameraError, CameraId,
    CameraManager, CameraQueue, MockBehavior, MockCameraDevice, MockCameraManager, OpenConfig,
    StateSink, ERROR_CAMERA_IN_USE, ERROR_MAX_CAMERAS_IN_USE,
};
use std::time::Duration;
use tokio::sync::mpsc;

type Forwarded = mpsc::UnboundedReceiver<(CameraId, CameraError)>;

fn forwarder() -> (
    impl Fn(&MockCameraDevice, CameraError) + Send + Sync + 'static,
    Forwarded,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |device: &MockCameraDevice, err: CameraError| {
        let _ = tx.send((device.id().clone(), err));
    };
    (handler, rx)
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn queue() -> CameraQueue {
    CameraQueue::current("camera-test").unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn opens_then_forwards_late_error() {
    let manager = MockCameraManager::new()
        .with_behavior("cam0", MockBehavior::OpenAfter { delay_ms: 5 });
    let (handler, mut forwarded) = forwarder();

    let device = open_camera(&manager, "cam0", &queue(), handler)
        .await
        .unwrap();
    assert_eq!(device.id().as_str(), "cam0");
    assert!(!device.is_closed());

    let cam0 = CameraId::from("cam0");
    assert!(manager.emit_error(&cam0, ERROR_MAX_CAMERAS_IN_USE));

    let (id, err) = forwarded.recv().await.unwrap();
    assert_eq!(id, cam0);
    assert_eq!(
        err,
        CameraError::Disconnected {
            camera_id: cam0.clone(),
            reason: CameraDeviceError::MaxCamerasInUse,
        }
    );
    wait_until(|| device.is_closed()).await;
    assert_eq!(device.close_attempts(), 1);
    assert!(forwarded.try_recv().is_err());
}

#[tokio::test]
async fn disconnect_before_open_fails() {
    let manager = MockCameraManager::new()
        .with_behavior("cam1", MockBehavior::DisconnectAfter { delay_ms: 0 });
    let (handler, mut forwarded) = forwarder();

    let err = open_camera(&manager, "cam1", &queue(), handler)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CameraError::CannotBeOpened {
            camera_id: "cam1".into(),
            reason: CameraDeviceError::Disconnected,
        }
    );

    let device = manager.device(&"cam1".into()).unwrap();
    wait_until(|| device.close_attempts() == 1).await;
    assert!(forwarded.try_recv().is_err());
}

#[tokio::test]
async fn error_before_open_maps_reason() {
    let manager = MockCameraManager::new()
        .with_behavior(
            "cam2",
            MockBehavior::ErrorAfter {
                delay_ms: 1,
                code: ERROR_CAMERA_IN_USE,
            },
        )
        .with_behavior(
            "cam3",
            MockBehavior::ErrorAfter {
                delay_ms: 0,
                code: 77,
            },
        );

    let err = open_camera(&manager, "cam2", &queue(), |_: &MockCameraDevice, _| {})
        .await
        .unwrap_err();
    assert_eq!(err.reason(), Some(CameraDeviceError::CameraInUse));
    assert_eq!(err.code(), "camera-cannot-be-opened");

    let err = open_camera(&manager, "cam3", &queue(), |_: &MockCameraDevice, _| {})
        .await
        .unwrap_err();
    assert_eq!(err.reason(), Some(CameraDeviceError::Unknown(77)));
}

#[tokio::test]
async fn cancelled_open_still_closes_device() {
    let manager = MockCameraManager::new().with_behavior("cam4", MockBehavior::Silent);
    let (handler, mut forwarded) = forwarder();
    let cam4 = CameraId::from("cam4");
    let q = queue();

    tokio::select! {
        _ = open_camera(&manager, cam4.clone(), &q, handler) => {
            panic!("silent camera must not answer");
        }
        _ = tokio::time::sleep(Duration::from_millis(10)) => {}
    }

    assert!(manager.emit_opened(&cam4));
    assert!(manager.emit_disconnected(&cam4));

    let device = manager.device(&cam4).unwrap();
    wait_until(|| manager.events(&cam4).len() == 2).await;
    wait_until(|| device.close_attempts() == 2).await;
    assert!(device.is_closed());

    let (_, err) = forwarded.recv().await.unwrap();
    assert_eq!(err.reason(), Some(CameraDeviceError::Disconnected));
    assert!(forwarded.try_recv().is_err());
}

#[tokio::test]
async fn cancel_after_delivery_closes_device() {
    let manager = MockCameraManager::new().with_behavior("cam11", MockBehavior::Silent);
    let (handler, mut forwarded) = forwarder();
    let cam11 = CameraId::from("cam11");
    let q = queue();

    let mut open = Box::pin(open_camera(&manager, cam11.clone(), &q, handler));
    assert!(
        tokio::time::timeout(Duration::from_millis(5), &mut open)
            .await
            .is_err()
    );

    // The device lands in the channel, but the caller never polls again.
    assert!(manager.emit_opened(&cam11));
    wait_until(|| manager.events(&cam11).len() == 1).await;
    let device = manager.device(&cam11).unwrap();
    assert_eq!(device.close_attempts(), 0);

    drop(open);
    assert!(device.is_closed());
    assert_eq!(device.close_attempts(), 1);
    assert!(forwarded.try_recv().is_err());
}

#[tokio::test]
async fn aborted_open_task_observes_cancellation() {
    let manager = std::sync::Arc::new(
        MockCameraManager::new().with_behavior("cam5", MockBehavior::Silent),
    );
    let task_manager = manager.clone();
    let q = queue();
    let task = tokio::spawn(async move {
        open_camera(&*task_manager, "cam5", &q, |_: &MockCameraDevice, _| {}).await
    });

    let cam5 = CameraId::from("cam5");
    wait_until(|| manager.device(&cam5).is_some()).await;
    task.abort();
    let joined = task.await;
    assert!(joined.unwrap_err().is_cancelled());

    assert!(manager.emit_error(&cam5, ERROR_MAX_CAMERAS_IN_USE));
    let device = manager.device(&cam5).unwrap();
    wait_until(|| device.is_closed()).await;
}

#[tokio::test]
async fn timeout_cancels_attempt() {
    let manager = MockCameraManager::new().with_behavior("cam6", MockBehavior::Silent);
    let config = OpenConfig {
        open_timeout_ms: Some(20),
        ..OpenConfig::default()
    };

    let err = open_camera_with(&manager, "cam6", &queue(), &config, |_: &MockCameraDevice, _| {})
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CameraError::Timeout {
            camera_id: "cam6".into(),
            timeout_ms: 20,
        }
    );

    let cam6 = CameraId::from("cam6");
    assert!(manager.emit_opened(&cam6));
    let device = manager.device(&cam6).unwrap();
    wait_until(|| device.is_closed()).await;
}

#[tokio::test]
async fn open_with_config_without_timeout_opens() {
    let manager = MockCameraManager::new();
    let device = open_camera_with(
        &manager,
        "cam7",
        &queue(),
        &OpenConfig::default(),
        |_: &MockCameraDevice, _| {},
    )
    .await
    .unwrap();
    assert_eq!(device.id().as_str(), "cam7");
}

#[tokio::test]
async fn rejected_request_fails_synchronously() {
    let manager = MockCameraManager::new().with_behavior(
        "cam8",
        MockBehavior::Reject {
            message: "permission denied".into(),
        },
    );
    let err = open_camera(&manager, "cam8", &queue(), |_: &MockCameraDevice, _| {})
        .await
        .unwrap_err();
    assert!(matches!(err, CameraError::Access { .. }));
    assert!(manager.device(&"cam8".into()).is_none());
}

#[tokio::test]
async fn every_late_event_is_forwarded() {
    let manager = MockCameraManager::new();
    let (handler, mut forwarded) = forwarder();
    let device = open_camera(&manager, "cam9", &queue(), handler)
        .await
        .unwrap();

    let cam9 = CameraId::from("cam9");
    assert!(manager.emit_opened(&cam9));
    assert!(manager.emit_disconnected(&cam9));
    assert!(manager.emit_error(&cam9, 4));
    assert!(manager.emit_disconnected(&cam9));

    let mut reasons = Vec::new();
    for _ in 0..3 {
        let (_, err) = forwarded.recv().await.unwrap();
        reasons.push(err.reason());
    }
    assert_eq!(
        reasons,
        vec![
            Some(CameraDeviceError::Disconnected),
            Some(CameraDeviceError::DeviceError),
            Some(CameraDeviceError::Disconnected),
        ]
    );
    wait_until(|| device.close_attempts() == 3).await;
    assert_eq!(manager.events(&cam9).len(), 5);
}

/// Platform that loses the request without ever answering.
struct ForgetfulManager;

impl CameraManager for ForgetfulManager {
    type Device = MockCameraDevice;

    fn open_device(
        &self,
        _camera_id: &CameraId,
        _queue: &CameraQueue,
        sink: StateSink<MockCameraDevice>,
    ) -> camera_device::Result<()> {
        drop(sink);
        Ok(())
    }
}

#[tokio::test]
async fn dropped_sink_fails_open() {
    let err = open_camera(&ForgetfulManager, "cam10", &queue(), |_: &MockCameraDevice, _| {})
        .await
        .unwrap_err();
    assert_eq!(err.reason(), Some(CameraDeviceError::ServiceError));
}
