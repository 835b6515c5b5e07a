//! Continuous data acquisition for utility meters.
//!
//! Meterflow reads framed meter reports from a configurable link, decodes
//! them into normalized readings, and queues the packaged results for a
//! transmission layer, recovering on its own when the link goes quiet.
//!
//! # Features
//!
//! - **Continuous acquisition**: a worker task polls the source and never
//!   stops on bad input
//! - **Link recovery**: silent links rotate through candidate configurations
//!   automatically
//! - **Bounded delivery**: a fixed-capacity queue that sheds the oldest
//!   package, never the producer
//! - **Pluggable edges**: frame sources, decoders, and packagers are traits
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use meterflow::{
//!     DEFAULT_LINK_CANDIDATES, DecoderRegistry, DeliveryQueue, FrameCallback, FrameKind,
//!     FrameSource, FrameView, LinkConfig, MeterAcquisition, MeterDecoder, Packager,
//!     PackagePayload, Reading,
//! };
//!
//! struct P1Port {
//!     callback: Option<FrameCallback>,
//! }
//!
//! #[async_trait::async_trait]
//! impl FrameSource for P1Port {
//!     fn configure(&mut self, _config: &LinkConfig) -> meterflow::Result<()> {
//!         // Reopen the serial line with the requested parameters.
//!         Ok(())
//!     }
//!
//!     fn candidate(&self, index: usize) -> LinkConfig {
//!         DEFAULT_LINK_CANDIDATES[index]
//!     }
//!
//!     fn candidate_count(&self) -> usize {
//!         DEFAULT_LINK_CANDIDATES.len()
//!     }
//!
//!     fn set_frame_callback(&mut self, callback: FrameCallback) {
//!         self.callback = Some(callback);
//!     }
//!
//!     async fn poll(&mut self) {
//!         // Read the line and run the callback for each completed frame.
//!     }
//! }
//!
//! struct TelegramDecoder;
//!
//! impl MeterDecoder for TelegramDecoder {
//!     fn decode(&self, frame: FrameView<'_>) -> Option<Reading> {
//!         // Telegram parsing lives here.
//!         let _ = frame.bytes();
//!         None
//!     }
//! }
//!
//! struct JsonPackager;
//!
//! impl Packager for JsonPackager {
//!     fn package(&self, reading: &Reading) -> meterflow::Result<PackagePayload> {
//!         let bytes = serde_json::to_vec(reading).map_err(|e| {
//!             meterflow::AcquireError::packaging_failed_with_source(
//!                 "JSON encoding failed",
//!                 Box::new(e),
//!             )
//!         })?;
//!         PackagePayload::from_slice(&bytes)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> meterflow::Result<()> {
//!     let mut registry = DecoderRegistry::new();
//!     registry.register(FrameKind::Ascii, TelegramDecoder);
//!
//!     let source = P1Port { callback: None };
//!     let mut acquisition = MeterAcquisition::new(source, registry, JsonPackager);
//!
//!     let queue = Arc::new(DeliveryQueue::new(32));
//!     acquisition.start(queue.clone())?;
//!
//!     loop {
//!         let package = queue.recv().await;
//!         // Hand the payload to the transmission side.
//!         let _ = package.payload.as_bytes();
//!     }
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Acquisition pipeline
pub mod acquisition;
pub mod decode;
pub mod diagnostics;
mod driver;
mod handler;
pub mod packaging;
pub mod queue;
pub mod recovery;
pub mod source;

// Core exports
pub use error::*;
pub use types::*;

// Pipeline exports
pub use acquisition::{DEFAULT_POLL_INTERVAL, MeterAcquisition};
pub use decode::{DecodeFailure, DecoderRegistry, MeterDecoder};
pub use diagnostics::{AcquisitionStats, Diagnostics, FaultySnapshot, StatsSnapshot};
pub use packaging::Packager;
pub use queue::{DEFAULT_PUSH_WAIT, DeliveryQueue};
pub use recovery::{DEFAULT_STALL_WINDOW, RecoverySupervisor, StallClock};
pub use source::{FrameCallback, FrameSource};
