//! Packaging trait for the serialization/signing boundary

use crate::Result;
use crate::types::{PackagePayload, Reading};

/// Trait for turning a reading into its transmit-ready payload.
///
/// Production deployments sign readings into a compact token here; tests use
/// plain JSON. Packaging failure is a one-shot loss: the pipeline reports it
/// and drops the reading rather than retrying.
pub trait Packager: Send + Sync {
    /// Produce the wire payload for `reading`.
    fn package(&self, reading: &Reading) -> Result<PackagePayload>;
}
