use anyhow::{Context, Result};
use camera_device::{
    open_camera_with, CameraDevice, CameraDeviceError, CameraId, CameraQueue, MockBehavior,
    MockCameraManager, MockEvent, OpenConfig,
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "camera",
    version,
    about = "Exercise the camera open handshake against a scripted mock platform",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a camera and report the outcome as JSON
    Open {
        /// Camera id to open
        #[arg(long, default_value = "cam0")]
        id: String,
        /// YAML script with open config and per-camera mock behaviors
        #[arg(long)]
        script: Option<String>,
        /// Override the open timeout from the script
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Inject a disconnect after a successful open
        #[arg(long)]
        then_disconnect: bool,
        /// Inject a platform error code after a successful open
        #[arg(long)]
        then_error: Option<i32>,
        /// How long to keep listening for forwarded disconnects
        #[arg(long, default_value_t = 50)]
        linger_ms: u64,
    },
    /// Print how platform error codes are classified
    Codes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Script {
    config: OpenConfig,
    cameras: HashMap<String, MockBehavior>,
}

impl Script {
    fn load(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
        serde_yaml::from_str(&text).with_context(|| format!("parse {path}"))
    }
}

#[derive(Serialize)]
struct ErrorReport {
    domain: &'static str,
    code: &'static str,
    reason: Option<CameraDeviceError>,
    message: String,
}

#[derive(Serialize)]
struct OpenReport {
    camera_id: CameraId,
    opened: bool,
    error: Option<ErrorReport>,
    forwarded: Vec<ErrorReport>,
    closed: Option<bool>,
}

#[derive(Serialize)]
struct CodeRow {
    platform_code: i32,
    reason: CameraDeviceError,
    code: &'static str,
}

fn report(err: &camera_device::CameraError) -> ErrorReport {
    ErrorReport {
        domain: err.domain(),
        code: err.code(),
        reason: err.reason(),
        message: err.to_string(),
    }
}

async fn run_open(
    id: String,
    script: Option<String>,
    timeout_ms: Option<u64>,
    late_events: Vec<MockEvent>,
    linger: Duration,
) -> Result<()> {
    let script = match script {
        Some(path) => Script::load(&path)?,
        None => Script::default(),
    };
    let mut config = script.config;
    if timeout_ms.is_some() {
        config.open_timeout_ms = timeout_ms;
    }

    let manager = MockCameraManager::new();
    for (camera, behavior) in script.cameras {
        manager.set_behavior(camera, behavior);
    }
    let queue = CameraQueue::current(&config.queue_name)?;
    let camera_id = CameraId::from(id);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = open_camera_with(
        &manager,
        camera_id.clone(),
        &queue,
        &config,
        move |device: &camera_device::MockCameraDevice, err| {
            info!(camera_id = %device.id(), error = %err, "forwarded disconnect");
            let _ = tx.send(err);
        },
    )
    .await;

    let mut out = OpenReport {
        camera_id: camera_id.clone(),
        opened: result.is_ok(),
        error: result.as_ref().err().map(report),
        forwarded: Vec::new(),
        closed: None,
    };

    if result.is_ok() {
        for event in late_events {
            manager.emit(&camera_id, event);
        }
    }

    // Collect whatever the platform forwards until it goes quiet.
    while let Ok(Some(err)) = tokio::time::timeout(linger, rx.recv()).await {
        out.forwarded.push(report(&err));
    }
    out.closed = manager.device(&camera_id).map(|d| d.is_closed());

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn print_codes() -> Result<()> {
    let rows: Vec<CodeRow> = (0..=6)
        .map(|platform_code| {
            let reason = CameraDeviceError::from_platform_code(platform_code);
            CodeRow {
                platform_code,
                reason,
                code: reason.code(),
            }
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Open {
            id,
            script,
            timeout_ms,
            then_disconnect,
            then_error,
            linger_ms,
        } => {
            let mut late_events = Vec::new();
            if then_disconnect {
                late_events.push(MockEvent::Disconnected);
            }
            if let Some(code) = then_error {
                late_events.push(MockEvent::Error(code));
            }
            run_open(
                id,
                script,
                timeout_ms,
                late_events,
                Duration::from_millis(linger_ms),
            )
            .await?;
        }
        Commands::Codes => print_codes()?,
    }
    Ok(())
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
