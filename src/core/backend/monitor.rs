use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::backend::ccusage::CcusageBackend;
use crate::core::backend::BackendError;

/// Something the monitor can poll on a schedule.
#[async_trait]
pub trait PollSource: Send + Sync + 'static {
    /// Read fresh each iteration so settings changes apply on the next tick.
    async fn poll_interval(&self) -> Duration;

    async fn poll(&self) -> Result<(), BackendError>;
}

#[async_trait]
impl PollSource for CcusageBackend {
    async fn poll_interval(&self) -> Duration {
        self.current_settings().await.frequency().interval()
    }

    async fn poll(&self) -> Result<(), BackendError> {
        self.refresh_and_publish().await.map(|_| ())
    }
}

/// Start the background polling loop. The first poll happens one interval
/// after start, since the UI performs its own initial load.
///
/// Failures are logged and the loop keeps going. Abort the handle to stop.
pub fn spawn<S: PollSource>(source: Arc<S>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let interval = source.poll_interval().await;
            tokio::time::sleep(interval).await;
            match source.poll().await {
                Ok(()) => debug!("published usage update"),
                Err(e) => warn!("{}", e),
            }
        }
    })
}
