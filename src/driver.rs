//! Driver spawns and manages the acquisition worker task

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::diagnostics::Diagnostics;
use crate::recovery::RecoverySupervisor;
use crate::source::FrameSource;

/// Handle to a running acquisition task.
///
/// The task owns the frame source for its whole run and hands it back on a
/// clean shutdown, so the same source can be restarted later.
pub(crate) struct WorkerHandle<S> {
    cancel: CancellationToken,
    join: JoinHandle<S>,
}

impl<S> WorkerHandle<S> {
    /// Request cancellation without waiting for the task to finish.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the task and recover the frame source.
    ///
    /// Cancels, then waits up to `grace` for the task to observe the token.
    /// A task that overruns the grace period is aborted and reaped; the
    /// source is lost in that case, as it is when the task panicked.
    pub(crate) async fn shutdown(mut self, grace: Duration) -> Option<S> {
        self.cancel.cancel();

        match timeout(grace, &mut self.join).await {
            Ok(Ok(source)) => Some(source),
            Ok(Err(e)) => {
                warn!("Acquisition task failed during shutdown: {}", e);
                None
            }
            Err(_) => {
                warn!("Acquisition task ignored cancellation for {:?}, aborting", grace);
                self.join.abort();
                let _ = (&mut self.join).await;
                None
            }
        }
    }
}

/// Driver spawns and manages the acquisition worker task
///
/// The task polls the frame source, lets the recovery supervisor act on
/// stalls, then paces itself with a short sleep. Frames surface through the
/// callback installed on the source, not through the task itself.
pub(crate) struct Driver;

impl Driver {
    /// Spawn the acquisition task for the given source.
    ///
    /// The poll interval is read every iteration, so changes through the
    /// shared cell take effect on the next cycle.
    pub(crate) fn spawn<S>(
        source: S,
        supervisor: RecoverySupervisor,
        diagnostics: Arc<dyn Diagnostics>,
        poll_interval_ms: Arc<AtomicU64>,
    ) -> WorkerHandle<S>
    where
        S: FrameSource,
    {
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        let join = tokio::spawn(async move {
            Self::acquisition_task(source, supervisor, diagnostics, poll_interval_ms, cancel_task)
                .await
        });

        WorkerHandle { cancel, join }
    }

    /// Acquisition task - polls the source and supervises link recovery
    async fn acquisition_task<S>(
        mut source: S,
        mut supervisor: RecoverySupervisor,
        diagnostics: Arc<dyn Diagnostics>,
        poll_interval_ms: Arc<AtomicU64>,
        cancel: CancellationToken,
    ) -> S
    where
        S: FrameSource,
    {
        info!("Acquisition task started");
        let mut polls = 0u64;
        let mut recoveries = 0u64;

        loop {
            // Check for cancellation between cycles
            if cancel.is_cancelled() {
                info!("Acquisition task cancelled");
                break;
            }

            // Use select to allow cancellation during source.poll()
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Acquisition task cancelled during poll");
                    break;
                }
                _ = source.poll() => {}
            }
            polls += 1;

            if supervisor.check(&mut source, diagnostics.as_ref()) {
                recoveries += 1;
            }

            let pace = Duration::from_millis(poll_interval_ms.load(Ordering::Relaxed));
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Acquisition task cancelled while pacing");
                    break;
                }
                _ = sleep(pace) => {}
            }
        }

        info!(
            "Acquisition task ended ({} polls, {} link recoveries)",
            polls, recoveries
        );
        source
    }
}
