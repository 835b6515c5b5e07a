//! Fire-and-forget acquisition health reporting

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::types::{FrameKind, LinkConfig};

/// Cap on the retained faulty-frame snapshot, in bytes.
const FAULTY_SNAPSHOT_LIMIT: usize = 512;

/// Sink for acquisition health events.
///
/// Every method is fire-and-forget: implementations must not block the frame
/// callback, and nothing reported here feeds back into control flow. The
/// frame bytes passed to [`frame_failed`](Diagnostics::frame_failed) borrow
/// the source's buffer and must be copied if kept.
pub trait Diagnostics: Send + Sync {
    /// A frame decoded successfully.
    fn frame_decoded(&self);

    /// A frame was discarded, with the raw bytes that failed to decode.
    fn frame_failed(&self, kind: FrameKind, bytes: &[u8]);

    /// The link was (re)configured with the candidate at `index`.
    fn link_configured(&self, index: usize, config: &LinkConfig);
}

/// Raw bytes of the most recent frame that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultySnapshot {
    /// Declared format of the failed frame.
    pub kind: FrameKind,
    /// Frame bytes, truncated to the first 512.
    pub bytes: Vec<u8>,
}

/// Point-in-time copy of [`AcquisitionStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames decoded successfully since construction.
    pub frames_decoded: u64,
    /// Frames discarded since construction.
    pub frames_failed: u64,
    /// Index of the most recently applied link candidate.
    pub active_config_index: usize,
    /// The most recent faulty frame, if any frame has failed.
    pub last_faulty_frame: Option<FaultySnapshot>,
}

/// In-memory diagnostics sink backed by atomic counters.
///
/// This is the sink [`crate::MeterAcquisition::new`] installs by default.
/// Counters use relaxed ordering; only the faulty-frame snapshot sits behind
/// a mutex.
#[derive(Debug, Default)]
pub struct AcquisitionStats {
    frames_decoded: AtomicU64,
    frames_failed: AtomicU64,
    active_config_index: AtomicUsize,
    last_faulty_frame: Mutex<Option<FaultySnapshot>>,
}

impl AcquisitionStats {
    /// Create a sink with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out the current counter values and faulty-frame snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
            active_config_index: self.active_config_index.load(Ordering::Relaxed),
            last_faulty_frame: self.last_faulty_frame.lock().clone(),
        }
    }
}

impl Diagnostics for AcquisitionStats {
    fn frame_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    fn frame_failed(&self, kind: FrameKind, bytes: &[u8]) {
        self.frames_failed.fetch_add(1, Ordering::Relaxed);
        let copied = bytes[..bytes.len().min(FAULTY_SNAPSHOT_LIMIT)].to_vec();
        *self.last_faulty_frame.lock() = Some(FaultySnapshot { kind, bytes: copied });
    }

    fn link_configured(&self, index: usize, _config: &LinkConfig) {
        self.active_config_index.store(index, Ordering::Relaxed);
    }
}
