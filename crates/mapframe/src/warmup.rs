//! The `warmUp` operation.
//!
//! Warm-up pre-provisions one disposable map surface so the vendor
//! stack pays its one-time initialization cost before the first real
//! map view is requested. The surface hangs in the host's view tree
//! under an operation-scoped tag while the backend brings it up, then
//! is detached and dropped. Each call generates its own tag, so
//! concurrent warm-ups never collide.

use crate::backend::MapBackend;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;
use view_host::{Surface, SurfaceError, SurfaceHost};

const TAG_PREFIX: &str = "mapframe.warmup";

/// Warm-up failure
#[derive(Debug, thiserror::Error)]
pub enum WarmUpError {
    #[error("No window attached; warm-up needs a live surface host")]
    NoSurfaceHost,
    #[error("Failed to create warm-up surface: {0}")]
    Create(anyhow::Error),
    #[error("Failed to attach warm-up surface: {0}")]
    Attach(anyhow::Error),
    #[error("Surface never became ready: {0}")]
    NotReady(#[from] SurfaceError),
    #[error("Backend did not signal ready within {0:?}")]
    ReadyTimeout(Duration),
    #[error("Warm-up cancelled")]
    Cancelled,
    #[error("Surface teardown failed: {0}")]
    Teardown(anyhow::Error),
    #[error("Warm-up task ended without reporting an outcome")]
    Aborted,
}

/// Everything one warm-up call needs, captured when it starts.
pub(crate) struct WarmUpRequest {
    pub surfaces: Arc<dyn SurfaceHost>,
    pub backend: Arc<dyn MapBackend>,
    pub ready_timeout: Option<Duration>,
}

/// The in-flight surface of a single call. Never shared between calls
/// and never outlives its `run`.
struct PendingWarmUp {
    tag: String,
    surface: Arc<dyn Surface>,
}

impl WarmUpRequest {
    /// Create, attach, await readiness, detach. The surface is torn down
    /// whatever the outcome; only the first error is reported.
    pub(crate) async fn run(
        self,
        mut cancel: oneshot::Receiver<()>,
    ) -> Result<(), WarmUpError> {
        let surface = self.backend.create_surface().map_err(WarmUpError::Create)?;
        let tag = format!("{TAG_PREFIX}.{}", Uuid::new_v4());
        self.surfaces
            .attach(&tag, Arc::clone(&surface))
            .map_err(WarmUpError::Attach)?;
        let pending = PendingWarmUp { tag, surface };
        debug!(tag = %pending.tag, "warm-up surface attached");

        let outcome = tokio::select! {
            result = ready_with_timeout(&pending.surface, self.ready_timeout) => result,
            _ = cancelled(&mut cancel) => Err(WarmUpError::Cancelled),
        };

        let teardown = self.surfaces.detach(&pending.tag);
        match outcome {
            Ok(()) => {
                teardown.map_err(WarmUpError::Teardown)?;
                debug!(tag = %pending.tag, "warm-up complete");
                Ok(())
            }
            Err(err) => {
                if let Err(teardown_err) = teardown {
                    warn!(tag = %pending.tag, error = %teardown_err, "teardown failed after warm-up error");
                }
                Err(err)
            }
        }
    }
}

async fn ready_with_timeout(
    surface: &Arc<dyn Surface>,
    limit: Option<Duration>,
) -> Result<(), WarmUpError> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, surface.wait_ready()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(WarmUpError::ReadyTimeout(limit)),
        },
        None => Ok(surface.wait_ready().await?),
    }
}

/// Resolves only on an explicit cancel. A dropped sender means the
/// caller let go of the handle, which detaches rather than cancels.
async fn cancelled(cancel: &mut oneshot::Receiver<()>) {
    if cancel.await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Handle to an in-flight warm-up.
///
/// Dropping the handle detaches from the operation; it keeps running to
/// completion on its own.
pub struct WarmUpHandle {
    cancel: Option<oneshot::Sender<()>>,
    done: oneshot::Receiver<Result<(), WarmUpError>>,
}

impl WarmUpHandle {
    pub(crate) fn new(
        cancel: oneshot::Sender<()>,
        done: oneshot::Receiver<Result<(), WarmUpError>>,
    ) -> Self {
        Self {
            cancel: Some(cancel),
            done,
        }
    }

    /// Ask the operation to stop. The outcome, cancelled or otherwise,
    /// still arrives through [`WarmUpHandle::wait`].
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the operation to finish.
    pub async fn wait(self) -> Result<(), WarmUpError> {
        match self.done.await {
            Ok(result) => result,
            Err(_) => Err(WarmUpError::Aborted),
        }
    }
}
