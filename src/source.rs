//! Frame source trait for link-layer receivers

use crate::Result;
use crate::types::{FrameView, LinkConfig};

/// Callback invoked for every completed frame.
///
/// The source calls this synchronously from within [`FrameSource::poll`],
/// never deferred: one frame is fully handled before the next poll step, and
/// the pipeline relies on that ordering. The [`FrameView`] borrows the
/// source's buffer, so implementations of the callback must copy out anything
/// they keep.
pub type FrameCallback = Box<dyn FnMut(FrameView<'_>) + Send>;

/// Trait for link-layer frame receivers.
///
/// A frame source owns the physical transport (typically a serial port), the
/// byte-level reassembly state, and the frame-completion timing. The pipeline
/// drives it through [`poll`](FrameSource::poll) and reconfigures it through
/// [`configure`](FrameSource::configure) when the recovery supervisor rotates
/// link candidates.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Reinitialize the link with the given candidate settings.
    ///
    /// Called once at start and again on every recovery rotation. Failure is
    /// reported but never fatal: the pipeline keeps polling and the
    /// supervisor retries after the next stall window.
    fn configure(&mut self, config: &LinkConfig) -> Result<()>;

    /// The candidate at `index`.
    ///
    /// Callers only pass indices below
    /// [`candidate_count`](FrameSource::candidate_count); implementations may
    /// panic otherwise, like slice indexing.
    fn candidate(&self, index: usize) -> LinkConfig;

    /// Number of link candidates this source can be configured with.
    ///
    /// Must be at least 1.
    fn candidate_count(&self) -> usize;

    /// Register the frame-completion callback, replacing any prior one.
    ///
    /// Installed before the first poll; the source invokes it synchronously
    /// from `poll` for each completed frame.
    fn set_frame_callback(&mut self, callback: FrameCallback);

    /// Drive the receiver one step.
    ///
    /// Consumes whatever bytes are pending and invokes the frame callback
    /// once per completed frame. Implementations must not block longer than
    /// roughly the worker's poll interval, and must tolerate being cancelled
    /// at an await point during shutdown.
    async fn poll(&mut self);
}
