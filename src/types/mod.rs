//! Core types for the acquisition pipeline.
//!
//! This module provides the data structures that flow between the pipeline
//! stages:
//!
//! - [`FrameView`] is the borrowed unit a frame source hands to the callback
//! - [`Reading`] is the structured decode result, stamped at acceptance time
//! - [`DeliveryPackage`] is the fixed-size serialized form queued for uplink
//! - [`LinkConfig`] is one physical-layer candidate cycled during recovery
//!
//! Owned types derive `serde` so downstream consumers can persist or forward
//! them; [`FrameView`] borrows its bytes and intentionally does not.

mod frame;
mod link;
mod package;
mod reading;

// Re-export all public types
pub use frame::{FrameKind, FrameView};
pub use link::{DEFAULT_LINK_CANDIDATES, LineFraming, LinkConfig};
pub use package::{DeliveryPackage, PAYLOAD_CAPACITY, PackagePayload};
pub use reading::{Reading, unix_time_ms};
