//! Transmit-ready delivery packages

use std::fmt;

use crate::error::{AcquireError, Result};

/// Upper bound on a serialized reading payload in bytes.
///
/// Serialized readings for current telegram shapes stay well below this;
/// anything larger indicates a packaging bug and is rejected at construction.
pub const PAYLOAD_CAPACITY: usize = 1024;

/// Fixed-capacity payload buffer for one serialized reading.
///
/// The buffer is inline rather than heap-allocated so packages can move
/// through the delivery queue without touching the allocator.
#[derive(Clone)]
pub struct PackagePayload {
    bytes: [u8; PAYLOAD_CAPACITY],
    len: usize,
}

impl PackagePayload {
    /// Copy `data` into a fresh payload buffer.
    ///
    /// Returns [`AcquireError::PayloadOverflow`] when `data` exceeds
    /// [`PAYLOAD_CAPACITY`].
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        if data.len() > PAYLOAD_CAPACITY {
            return Err(AcquireError::PayloadOverflow {
                size: data.len(),
                capacity: PAYLOAD_CAPACITY,
            });
        }
        let mut bytes = [0u8; PAYLOAD_CAPACITY];
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self { bytes, len: data.len() })
    }

    /// The payload bytes, excluding unused buffer tail.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for PackagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackagePayload").field("len", &self.len).finish()
    }
}

impl PartialEq for PackagePayload {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for PackagePayload {}

/// One serialized reading queued for transmission.
///
/// Created on every successful decode; ownership transfers into the delivery
/// queue on push and out to the consumer on pop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPackage {
    /// Wire-ready payload produced by the packager.
    pub payload: PackagePayload,

    /// Unix time in milliseconds at which the package was accepted for delivery.
    pub accepted_at_ms: u64,
}
