//! Error types for the acquisition pipeline.
//!
//! Everything here implements `std::error::Error` and carries structured
//! context. Per-frame decode failures are not part of this enum. They are
//! routine on noisy links and travel through the diagnostics sink as
//! [`crate::decode::DecodeFailure`] rather than error returns.
//!
//! ## Error Categories
//!
//! - **Link Errors**: the serial link could not be (re)initialized
//! - **Packaging Errors**: a reading could not be serialized for transmission
//! - **Queue Errors**: the delivery queue lock was not acquired in time
//! - **Lifecycle Errors**: the pipeline lost its frame source after a forced
//!   shutdown
//!
//! ## Transience
//!
//! Errors classify themselves so callers know whether waiting helps:
//!
//! ```rust
//! use meterflow::{AcquireError, LineFraming, LinkConfig};
//!
//! let error = AcquireError::link_failed(
//!     LinkConfig::new(115_200, LineFraming::EightN1),
//!     "port busy",
//! );
//! assert!(error.is_transient());
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::types::LinkConfig;

/// Result type alias for acquisition operations.
pub type Result<T, E = AcquireError> = std::result::Result<T, E>;

/// Main error type for acquisition operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AcquireError {
    #[error("Failed to initialize meter link at {config}: {reason}")]
    Link {
        config: LinkConfig,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to package reading: {reason}")]
    Packaging {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Delivery queue lock not acquired within {waited:?}")]
    QueueBusy { waited: Duration },

    #[error("Payload of {size} bytes exceeds package capacity of {capacity}")]
    PayloadOverflow { size: usize, capacity: usize },

    #[error("Frame source is no longer available after a forced worker shutdown")]
    SourceUnavailable,
}

impl AcquireError {
    /// Returns whether this error is expected to clear on its own.
    ///
    /// Transient errors are handled by the pipeline's normal pacing (the
    /// recovery supervisor retries link candidates on the stall window, queue
    /// contention resolves within a push wait). Non-transient errors need a
    /// code or deployment change.
    pub fn is_transient(&self) -> bool {
        match self {
            AcquireError::Link { .. } => true,
            AcquireError::QueueBusy { .. } => true,
            AcquireError::Packaging { .. } => false,
            AcquireError::PayloadOverflow { .. } => false,
            AcquireError::SourceUnavailable => false,
        }
    }

    /// Helper constructor for link initialization failures.
    pub fn link_failed(config: LinkConfig, reason: impl Into<String>) -> Self {
        AcquireError::Link { config, reason: reason.into(), source: None }
    }

    /// Helper constructor for link failures wrapping an underlying error.
    pub fn link_failed_with_source(
        config: LinkConfig,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        AcquireError::Link { config, reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for packaging failures.
    pub fn packaging_failed(reason: impl Into<String>) -> Self {
        AcquireError::Packaging { reason: reason.into(), source: None }
    }

    /// Helper constructor for packaging failures wrapping an underlying error.
    pub fn packaging_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        AcquireError::Packaging { reason: reason.into(), source: Some(source) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineFraming, PAYLOAD_CAPACITY};

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_format_correctly_with_arbitrary_context(
                reason in ".*",
                baud in 300u32..1_000_000u32,
                waited_ms in 1u64..10_000u64,
                size in (PAYLOAD_CAPACITY + 1)..(PAYLOAD_CAPACITY * 4)
            ) {
                let config = LinkConfig::new(baud, LineFraming::EightN1);
                let link_error = AcquireError::link_failed(config, reason.clone());
                let packaging_error = AcquireError::packaging_failed(reason.clone());
                let busy_error = AcquireError::QueueBusy {
                    waited: Duration::from_millis(waited_ms),
                };
                let overflow_error = AcquireError::PayloadOverflow {
                    size,
                    capacity: PAYLOAD_CAPACITY,
                };

                // All messages should contain their context
                let link_msg = link_error.to_string();
                prop_assert!(link_msg.contains(&reason));
                prop_assert!(link_msg.contains(&baud.to_string()));

                let packaging_msg = packaging_error.to_string();
                prop_assert!(packaging_msg.contains(&reason));

                let overflow_msg = overflow_error.to_string();
                prop_assert!(overflow_msg.contains(&size.to_string()));
                prop_assert!(overflow_msg.contains(&PAYLOAD_CAPACITY.to_string()));

                // No message should be empty
                prop_assert!(!link_msg.is_empty());
                prop_assert!(!packaging_msg.is_empty());
                prop_assert!(!busy_error.to_string().is_empty());
                prop_assert!(!overflow_msg.is_empty());
            }

            #[test]
            fn source_chaining_preserves_underlying_messages(
                base_message in "[a-zA-Z0-9 ]+",
                reason in "[a-zA-Z0-9 ]+"
            ) {
                let base: Box<dyn std::error::Error + Send + Sync> =
                    Box::new(std::io::Error::other(base_message.clone()));
                let wrapped = AcquireError::packaging_failed_with_source(reason, base);

                let source = std::error::Error::source(&wrapped)
                    .expect("wrapped error should expose its source");
                prop_assert!(source.to_string().contains(&base_message));
            }
        }
    }

    #[test]
    fn error_constructors_validation() {
        let config = LinkConfig::new(9_600, LineFraming::SevenE1);

        let link_error = AcquireError::link_failed(config, "no response");
        assert!(matches!(link_error, AcquireError::Link { .. }));

        let packaging_error = AcquireError::packaging_failed("signing key missing");
        assert!(matches!(packaging_error, AcquireError::Packaging { .. }));
    }

    #[test]
    fn error_traits_validation() {
        // Compile-time check: AcquireError must be Send + Sync + 'static
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<AcquireError>();

        // Runtime check: Error trait is implemented
        let error = AcquireError::SourceUnavailable;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn transience_classification() {
        let config = LinkConfig::new(115_200, LineFraming::EightN1);

        assert!(AcquireError::link_failed(config, "port busy").is_transient());
        assert!(AcquireError::QueueBusy { waited: Duration::from_millis(100) }.is_transient());

        assert!(!AcquireError::packaging_failed("bad key").is_transient());
        assert!(
            !AcquireError::PayloadOverflow { size: 2048, capacity: PAYLOAD_CAPACITY }
                .is_transient()
        );
        assert!(!AcquireError::SourceUnavailable.is_transient());
    }
}
