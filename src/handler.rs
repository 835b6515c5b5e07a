//! Per-frame handling chain behind the frame callback

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::decode::DecoderRegistry;
use crate::diagnostics::Diagnostics;
use crate::packaging::Packager;
use crate::queue::DeliveryQueue;
use crate::recovery::StallClock;
use crate::source::FrameCallback;
use crate::types::{DeliveryPackage, FrameView, Reading, unix_time_ms};

/// Runs dispatch, packaging, and enqueueing for each completed frame.
///
/// Installed into the frame source as the completion callback, so everything
/// here executes synchronously inside the source's poll step. Nothing in the
/// chain blocks unboundedly: the queue push is the only wait and it is capped
/// by the queue's push wait.
pub(crate) struct FrameHandler {
    registry: Arc<DecoderRegistry>,
    packager: Arc<dyn Packager>,
    queue: Arc<DeliveryQueue>,
    diagnostics: Arc<dyn Diagnostics>,
    clock: Arc<StallClock>,
    readings: Arc<watch::Sender<Option<Reading>>>,
}

impl FrameHandler {
    pub(crate) fn new(
        registry: Arc<DecoderRegistry>,
        packager: Arc<dyn Packager>,
        queue: Arc<DeliveryQueue>,
        diagnostics: Arc<dyn Diagnostics>,
        clock: Arc<StallClock>,
        readings: Arc<watch::Sender<Option<Reading>>>,
    ) -> Self {
        Self { registry, packager, queue, diagnostics, clock, readings }
    }

    /// Box the handler as the callback handed to the frame source.
    pub(crate) fn into_callback(self) -> FrameCallback {
        Box::new(move |frame| self.on_frame(frame))
    }

    fn on_frame(&self, frame: FrameView<'_>) {
        let reading = match self.registry.dispatch(frame) {
            Ok(reading) => reading,
            Err(failure) => {
                debug!("Discarding {} byte {} frame: {}", frame.len(), frame.kind(), failure);
                // The sink copies the bytes; the source reuses this buffer
                // once the callback returns.
                self.diagnostics.frame_failed(frame.kind(), frame.bytes());
                return;
            }
        };

        self.diagnostics.frame_decoded();
        self.clock.mark();
        trace!("Decoded {} frame from meter {}", frame.kind(), reading.meter_id);

        // Publish the reading even if packaging fails below; the cache tracks
        // decodes, not deliveries.
        let _ = self.readings.send(Some(reading.clone()));

        let payload = match self.packager.package(&reading) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Reading dropped, packaging failed: {}", e);
                return;
            }
        };

        let package = DeliveryPackage { payload, accepted_at_ms: unix_time_ms() };
        match self.queue.push(package) {
            Ok(Some(_)) => warn!("Delivery queue full, dropped oldest package"),
            Ok(None) => trace!("Package queued ({} waiting)", self.queue.len()),
            Err(e) => warn!("Reading dropped, queue busy: {}", e),
        }
    }
}
