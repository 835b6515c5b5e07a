//! Frame types for the acquisition pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire format of a completed frame, as declared by the frame source.
///
/// The discriminant selects which decoder handles the frame. Formats the
/// pipeline knows about but ships no decoder for (M-Bus sub-metering) surface
/// as decode failures, never as crashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKind {
    /// Structured binary frame (HDLC/DLMS push telegram).
    Hdlc,
    /// Plain-text telegram terminated by a checksum line.
    Ascii,
    /// Wired M-Bus frame from a sub-meter.
    MBus,
}

impl FrameKind {
    /// Short lowercase name used in logs and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            FrameKind::Hdlc => "hdlc",
            FrameKind::Ascii => "ascii",
            FrameKind::MBus => "mbus",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Borrowed view of one complete frame.
///
/// This is the unit handed to the frame callback. The frame source owns the
/// underlying buffer and may reuse it as soon as the callback returns, which
/// is why the view borrows instead of owning: anything that must outlive the
/// callback (diagnostics snapshots, decoded fields) has to be copied out.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    kind: FrameKind,
    bytes: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Wrap a completed frame for delivery to the callback.
    pub fn new(kind: FrameKind, bytes: &'a [u8]) -> Self {
        Self { kind, bytes }
    }

    /// Wire format declared by the source.
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Raw frame bytes, valid only for the duration of the callback.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the frame carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
