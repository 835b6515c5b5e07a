//! Continuously running meter acquisition pipeline
//!
//! [`MeterAcquisition`] ties the pieces together: it owns a frame source,
//! installs the per-frame handling chain as the source's callback, and runs
//! the polling worker that keeps frames flowing and the link healthy.
//!
//! ## Lifecycle
//!
//! The pipeline is built stopped. [`start`](MeterAcquisition::start) hands it
//! a delivery queue, applies the active link candidate to the source, and
//! spawns the worker. [`stop`](MeterAcquisition::stop) cancels the worker and
//! takes the source back, so a later `start` resumes with the same source and
//! the same candidate index. Both calls are idempotent. A worker that ignores
//! cancellation past the grace period is aborted; the source is lost then and
//! `start` reports it unavailable.
//!
//! ## Delivery
//!
//! Decoded readings leave the pipeline twice: packaged onto the delivery
//! queue for the transmission side, and published to a watch cache that
//! [`latest_reading`](MeterAcquisition::latest_reading) and
//! [`reading_updates`](MeterAcquisition::reading_updates) observe. The cache
//! keeps the last reading across stop and start.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::decode::DecoderRegistry;
use crate::diagnostics::{AcquisitionStats, Diagnostics, StatsSnapshot};
use crate::driver::{Driver, WorkerHandle};
use crate::error::{AcquireError, Result};
use crate::handler::FrameHandler;
use crate::packaging::Packager;
use crate::queue::DeliveryQueue;
use crate::recovery::{DEFAULT_STALL_WINDOW, RecoverySupervisor, StallClock};
use crate::source::FrameSource;
use crate::types::{FrameKind, LinkConfig, Reading};


/// Default pause between worker iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long `stop` waits for the worker to observe cancellation.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Forwards diagnostic events to the built-in stats and an extra observer.
struct Fanout {
    stats: Arc<AcquisitionStats>,
    observer: Arc<dyn Diagnostics>,
}

impl Diagnostics for Fanout {
    fn frame_decoded(&self) {
        self.stats.frame_decoded();
        self.observer.frame_decoded();
    }

    fn frame_failed(&self, kind: FrameKind, bytes: &[u8]) {
        self.stats.frame_failed(kind, bytes);
        self.observer.frame_failed(kind, bytes);
    }

    fn link_configured(&self, index: usize, config: &LinkConfig) {
        self.stats.link_configured(index, config);
        self.observer.link_configured(index, config);
    }
}

/// Meter data acquisition pipeline.
///
/// Owns the frame source while stopped and lends it to the worker task while
/// running. All tuning knobs live in shared atomics, so they can be adjusted
/// while the worker runs and take effect on its next iteration.
pub struct MeterAcquisition<S> {
    source: Option<S>,
    worker: Option<WorkerHandle<S>>,
    registry: Arc<DecoderRegistry>,
    packager: Arc<dyn Packager>,
    diagnostics: Arc<dyn Diagnostics>,
    stats: Arc<AcquisitionStats>,
    clock: Arc<StallClock>,
    stall_window_ms: Arc<AtomicU64>,
    poll_interval_ms: Arc<AtomicU64>,
    active_index: Arc<AtomicUsize>,
    readings_tx: Arc<watch::Sender<Option<Reading>>>,
    readings_rx: watch::Receiver<Option<Reading>>,
}

impl<S> MeterAcquisition<S>
where
    S: FrameSource,
{
    /// Create a stopped pipeline around a source, decoders, and a packager.
    pub fn new(source: S, registry: DecoderRegistry, packager: impl Packager + 'static) -> Self {
        Self::build(source, registry, Arc::new(packager), None)
    }

    /// Like [`new`](MeterAcquisition::new), with an extra diagnostics
    /// observer that receives every event alongside the built-in stats.
    pub fn with_diagnostics(
        source: S,
        registry: DecoderRegistry,
        packager: impl Packager + 'static,
        observer: Arc<dyn Diagnostics>,
    ) -> Self {
        Self::build(source, registry, Arc::new(packager), Some(observer))
    }

    fn build(
        source: S,
        registry: DecoderRegistry,
        packager: Arc<dyn Packager>,
        observer: Option<Arc<dyn Diagnostics>>,
    ) -> Self {
        let stats = Arc::new(AcquisitionStats::new());
        let diagnostics: Arc<dyn Diagnostics> = match observer {
            Some(observer) => Arc::new(Fanout { stats: stats.clone(), observer }),
            None => stats.clone(),
        };
        let (readings_tx, readings_rx) = watch::channel(None);

        Self {
            source: Some(source),
            worker: None,
            registry: Arc::new(registry),
            packager,
            diagnostics,
            stats,
            clock: Arc::new(StallClock::new()),
            stall_window_ms: Arc::new(AtomicU64::new(DEFAULT_STALL_WINDOW.as_millis() as u64)),
            poll_interval_ms: Arc::new(AtomicU64::new(DEFAULT_POLL_INTERVAL.as_millis() as u64)),
            active_index: Arc::new(AtomicUsize::new(0)),
            readings_tx: Arc::new(readings_tx),
            readings_rx,
        }
    }

    /// Start acquiring into the given delivery queue.
    ///
    /// Applies the active link candidate, installs the handling chain, and
    /// spawns the worker. Starting an already running pipeline is a no-op. A
    /// failed initial configuration does not fail the start; the recovery
    /// supervisor retries on its own schedule.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::SourceUnavailable`] when the source was lost
    /// by an earlier forced shutdown.
    pub fn start(&mut self, queue: Arc<DeliveryQueue>) -> Result<()> {
        if self.worker.is_some() {
            debug!("Acquisition already running");
            return Ok(());
        }

        let mut source = self.source.take().ok_or(AcquireError::SourceUnavailable)?;

        let count = source.candidate_count();
        let index =
            if count > 1 { self.active_index.load(Ordering::Relaxed) % count } else { 0 };
        self.active_index.store(index, Ordering::Relaxed);

        let config = source.candidate(index);
        self.diagnostics.link_configured(index, &config);
        if let Err(e) = source.configure(&config) {
            // Degraded start: the supervisor rotates candidates once the
            // stall window elapses.
            warn!("Initial link configuration failed: {}", e);
        }

        let handler = FrameHandler::new(
            self.registry.clone(),
            self.packager.clone(),
            queue,
            self.diagnostics.clone(),
            self.clock.clone(),
            self.readings_tx.clone(),
        );
        source.set_frame_callback(handler.into_callback());

        // Fresh stall timer, so a restart is not judged by downtime.
        self.clock.mark();

        let supervisor = RecoverySupervisor::new(
            self.clock.clone(),
            self.stall_window_ms.clone(),
            self.active_index.clone(),
        );
        self.worker = Some(Driver::spawn(
            source,
            supervisor,
            self.diagnostics.clone(),
            self.poll_interval_ms.clone(),
        ));

        info!("Acquisition started with candidate {} ({})", index, config);
        Ok(())
    }

    /// Stop the worker and reclaim the frame source.
    ///
    /// Stopping an already stopped pipeline is a no-op. When the worker has
    /// to be aborted, the source is lost and a later
    /// [`start`](MeterAcquisition::start) fails.
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            debug!("Acquisition already stopped");
            return;
        };

        match worker.shutdown(STOP_GRACE).await {
            Some(source) => {
                self.source = Some(source);
                info!("Acquisition stopped");
            }
            None => warn!("Frame source lost during stop"),
        }
    }

    /// Whether the worker task is running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Set the silence span after which the supervisor rotates the link.
    ///
    /// Takes effect on the worker's next supervision pass.
    pub fn set_stall_window(&self, window: Duration) {
        let millis = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self.stall_window_ms.store(millis, Ordering::Relaxed);
    }

    /// The current stall window.
    pub fn stall_window(&self) -> Duration {
        Duration::from_millis(self.stall_window_ms.load(Ordering::Relaxed))
    }

    /// Set the pause between worker iterations.
    ///
    /// Takes effect on the worker's next iteration.
    pub fn set_poll_interval(&self, interval: Duration) {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.poll_interval_ms.store(millis, Ordering::Relaxed);
    }

    /// The current pause between worker iterations.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.load(Ordering::Relaxed))
    }

    /// Index of the link candidate the pipeline currently runs on.
    pub fn active_candidate(&self) -> usize {
        self.active_index.load(Ordering::Relaxed)
    }

    /// The most recently decoded reading, if any.
    ///
    /// Survives stop and start; cleared only by dropping the pipeline.
    pub fn latest_reading(&self) -> Option<Reading> {
        self.readings_rx.borrow().clone()
    }

    /// Get decoded readings as a stream.
    ///
    /// Emits the cached reading immediately (if any), then every subsequent
    /// decode. Slow consumers see the newest reading, not every intermediate
    /// one; the delivery queue is the lossless path.
    pub fn reading_updates(&self) -> impl Stream<Item = Reading> + 'static {
        WatchStream::new(self.readings_rx.clone()).filter_map(|opt| async move { opt })
    }

    /// Snapshot of the built-in acquisition counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<S> Drop for MeterAcquisition<S> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            debug!("Dropping acquisition, cancelling worker");
            // Cancel the task on drop for clean shutdown
            worker.cancel();
        }
    }
}
