//! Stall detection and link candidate rotation

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::diagnostics::Diagnostics;
use crate::source::FrameSource;

/// Default stall window before the supervisor rotates link candidates.
pub const DEFAULT_STALL_WINDOW: Duration = Duration::from_secs(30);

/// Shared timestamp of the last successful decode or recovery action.
///
/// The frame handler marks it on every accepted reading; the supervisor reads
/// it once per loop iteration and marks it again whenever recovery fires.
/// Backed by a monotonic anchor plus an atomic millisecond offset, so the
/// per-frame write is a single store with no locking.
#[derive(Debug)]
pub struct StallClock {
    epoch: Instant,
    marked_ms: AtomicU64,
}

impl StallClock {
    /// Create a clock marked at the current instant.
    pub fn new() -> Self {
        Self { epoch: Instant::now(), marked_ms: AtomicU64::new(0) }
    }

    /// Record that progress happened now.
    pub fn mark(&self) {
        self.marked_ms.store(self.elapsed_ms(), Ordering::Release);
    }

    /// Time elapsed since the last [`mark`](StallClock::mark).
    pub fn since_mark(&self) -> Duration {
        let marked = self.marked_ms.load(Ordering::Acquire);
        Duration::from_millis(self.elapsed_ms().saturating_sub(marked))
    }

    fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl Default for StallClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotates the link configuration when decoding stalls.
///
/// There is no persistent stalled state: the condition is derived fresh on
/// every [`check`](RecoverySupervisor::check) by comparing the stall clock
/// against the window. The active candidate index is written only from here
/// (and at start), wrapping around the source's candidate set.
pub struct RecoverySupervisor {
    clock: Arc<StallClock>,
    stall_window_ms: Arc<AtomicU64>,
    active_index: Arc<AtomicUsize>,
}

impl RecoverySupervisor {
    /// Create a supervisor over a shared clock, window, and candidate index.
    pub fn new(
        clock: Arc<StallClock>,
        stall_window_ms: Arc<AtomicU64>,
        active_index: Arc<AtomicUsize>,
    ) -> Self {
        Self { clock, stall_window_ms, active_index }
    }

    /// The current stall window.
    pub fn stall_window(&self) -> Duration {
        Duration::from_millis(self.stall_window_ms.load(Ordering::Relaxed))
    }

    /// Index of the most recently applied link candidate.
    pub fn active_index(&self) -> usize {
        self.active_index.load(Ordering::Relaxed)
    }

    /// Evaluate the stall condition and rotate the link if it holds.
    ///
    /// Called once per worker iteration. When no decode has succeeded within
    /// the stall window, advances to the next candidate (wrapping), records
    /// the new index in diagnostics, and reconfigures the source. The clock
    /// is re-marked whenever the window elapsed, whether or not
    /// reconfiguration succeeded and even with a single candidate, so retries
    /// stay paced by the window. Returns whether a stall was detected.
    pub fn check<S>(&mut self, source: &mut S, diagnostics: &dyn Diagnostics) -> bool
    where
        S: FrameSource + ?Sized,
    {
        let window = self.stall_window();
        if self.clock.since_mark() <= window {
            return false;
        }

        let candidates = source.candidate_count();
        if candidates > 1 {
            let index = (self.active_index.load(Ordering::Relaxed) + 1) % candidates;
            self.active_index.store(index, Ordering::Relaxed);
            let config = source.candidate(index);

            warn!(
                "No reading within {:?}, switching link to candidate {} ({})",
                window, index, config
            );
            diagnostics.link_configured(index, &config);

            if let Err(e) = source.configure(&config) {
                warn!("Link reconfiguration failed: {}", e);
            }
        } else {
            debug!("No reading within {:?}, single link candidate kept", window);
        }

        self.clock.mark();
        true
    }
}
