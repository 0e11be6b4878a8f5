use crate::{CameraError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Execution context on which platform callbacks are dispatched.
#[derive(Clone, Debug)]
pub struct CameraQueue {
    name: Arc<str>,
    handle: Handle,
}

impl CameraQueue {
    pub fn new(name: &str, handle: Handle) -> Self {
        Self {
            name: Arc::from(name),
            handle,
        }
    }

    /// Bind a queue to the runtime the caller is running on.
    pub fn current(name: &str) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| CameraError::Config(format!("queue {name}: {e}")))?;
        Ok(Self::new(name, handle))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
