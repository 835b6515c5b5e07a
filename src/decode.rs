//! Decoder dispatch for completed frames

use std::collections::HashMap;
use thiserror::Error;

use crate::types::{FrameKind, FrameView, Reading, unix_time_ms};

/// Trait for protocol-specific frame decoders.
///
/// One decoder handles one wire format. Decoders parse the frame bytes into a
/// [`Reading`] and reject anything malformed by returning `None`; they never
/// panic on bad input. The acceptance timestamp is stamped by the dispatch
/// layer, so decoders leave `timestamp_ms` alone.
pub trait MeterDecoder: Send + Sync {
    /// Attempt to decode `frame` into a reading.
    ///
    /// Returns `None` when the bytes do not form a valid frame of this
    /// decoder's format (bad checksum, truncation, garbage between frames).
    fn decode(&self, frame: FrameView<'_>) -> Option<Reading>;
}

/// Why a frame produced no reading.
///
/// These are expected, frequent events on a noisy or misconfigured link.
/// They are reported to the diagnostics sink rather than through
/// [`crate::AcquireError`], and the frame is discarded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    /// No decoder is registered for this frame format. Covers formats the
    /// pipeline knows about but does not implement, like M-Bus sub-metering.
    #[error("No decoder registered for {0} frames")]
    Unsupported(FrameKind),

    /// The registered decoder rejected the frame bytes.
    #[error("The {0} decoder rejected the frame")]
    Rejected(FrameKind),
}

impl DecodeFailure {
    /// The frame format involved in the failure.
    pub fn kind(&self) -> FrameKind {
        match self {
            DecodeFailure::Unsupported(kind) => *kind,
            DecodeFailure::Rejected(kind) => *kind,
        }
    }
}

/// Maps frame formats to decoders and normalizes the decode outcome.
///
/// New formats plug in through [`register`](DecoderRegistry::register)
/// without touching the dispatch core. The registry is immutable once the
/// pipeline starts, so dispatch needs no locking.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: HashMap<FrameKind, Box<dyn MeterDecoder>>,
}

impl DecoderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `decoder` for frames of `kind`, replacing any prior one.
    pub fn register(&mut self, kind: FrameKind, decoder: impl MeterDecoder + 'static) {
        self.decoders.insert(kind, Box::new(decoder));
    }

    /// Whether a decoder is registered for `kind`.
    pub fn supports(&self, kind: FrameKind) -> bool {
        self.decoders.contains_key(&kind)
    }

    /// Decode one completed frame.
    ///
    /// Selects the decoder matching the frame's declared format and stamps
    /// the reading with the current time on success. The timestamp marks
    /// decode completion, not wire arrival.
    pub fn dispatch(&self, frame: FrameView<'_>) -> Result<Reading, DecodeFailure> {
        let decoder =
            self.decoders.get(&frame.kind()).ok_or(DecodeFailure::Unsupported(frame.kind()))?;
        let mut reading = decoder.decode(frame).ok_or(DecodeFailure::Rejected(frame.kind()))?;
        reading.timestamp_ms = unix_time_ms();
        Ok(reading)
    }
}
