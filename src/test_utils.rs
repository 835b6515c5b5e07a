//! Test utilities shared by unit tests, integration-style tests, and benches
//!
//! This module provides a scriptable frame source, a line-oriented test
//! decoder, and small factories for readings and packages.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::decode::MeterDecoder;
use crate::error::{AcquireError, Result};
use crate::source::{FrameCallback, FrameSource};
use crate::types::{
    DeliveryPackage, FrameKind, FrameView, LinkConfig, PackagePayload, Reading, unix_time_ms,
};

enum ScriptStep {
    Frame { kind: FrameKind, bytes: Vec<u8> },
    Idle,
}

/// Frame source driven by a prearranged script.
///
/// Each poll consumes one step: a frame step runs the installed callback with
/// the scripted bytes, an idle step (or an exhausted script) produces
/// nothing. Configure calls are recorded in a shared log so tests can watch
/// recovery behavior while the worker owns the source.
pub struct ScriptedSource {
    candidates: Vec<LinkConfig>,
    script: VecDeque<ScriptStep>,
    configured: Arc<Mutex<Vec<LinkConfig>>>,
    callback: Option<FrameCallback>,
    fail_configure: bool,
}

impl ScriptedSource {
    /// Create a source offering the given candidate configurations.
    pub fn new(candidates: &[LinkConfig]) -> Self {
        assert!(!candidates.is_empty(), "scripted source needs at least one candidate");
        Self {
            candidates: candidates.to_vec(),
            script: VecDeque::new(),
            configured: Arc::new(Mutex::new(Vec::new())),
            callback: None,
            fail_configure: false,
        }
    }

    /// Append a frame step delivering `bytes` as a `kind` frame.
    pub fn queue_frame(&mut self, kind: FrameKind, bytes: impl Into<Vec<u8>>) {
        self.script.push_back(ScriptStep::Frame { kind, bytes: bytes.into() });
    }

    /// Append `cycles` polls that produce no frame.
    pub fn queue_idle(&mut self, cycles: usize) {
        for _ in 0..cycles {
            self.script.push_back(ScriptStep::Idle);
        }
    }

    /// Make every subsequent configure call fail.
    pub fn fail_configure(&mut self, fail: bool) {
        self.fail_configure = fail;
    }

    /// Shared log of every configuration applied to this source.
    pub fn configure_log(&self) -> Arc<Mutex<Vec<LinkConfig>>> {
        self.configured.clone()
    }
}

#[async_trait::async_trait]
impl FrameSource for ScriptedSource {
    fn configure(&mut self, config: &LinkConfig) -> Result<()> {
        self.configured.lock().push(*config);
        if self.fail_configure {
            return Err(AcquireError::link_failed(*config, "scripted configure failure"));
        }
        Ok(())
    }

    fn candidate(&self, index: usize) -> LinkConfig {
        self.candidates[index]
    }

    fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    fn set_frame_callback(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
    }

    async fn poll(&mut self) {
        match self.script.pop_front() {
            Some(ScriptStep::Frame { kind, bytes }) => {
                if let Some(callback) = self.callback.as_mut() {
                    callback(FrameView::new(kind, &bytes));
                }
            }
            Some(ScriptStep::Idle) | None => {}
        }
    }
}

/// Decoder for the semicolon text format produced by [`encode_text_frame`].
pub struct TextReadingDecoder;

impl MeterDecoder for TextReadingDecoder {
    fn decode(&self, frame: FrameView<'_>) -> Option<Reading> {
        let text = std::str::from_utf8(frame.bytes()).ok()?;
        let mut fields = text.trim_end().split(';');

        let meter_id = fields.next()?.to_string();
        if meter_id.is_empty() {
            return None;
        }
        let energy_import_t1_wh = fields.next()?.parse().ok()?;
        let energy_import_t2_wh = fields.next()?.parse().ok()?;
        let energy_export_t1_wh = fields.next()?.parse().ok()?;
        let energy_export_t2_wh = fields.next()?.parse().ok()?;
        let power_w = fields.next()?.parse().ok()?;
        let gas = fields.next()?;
        let gas_dm3 = if gas.is_empty() { None } else { Some(gas.parse().ok()?) };
        if fields.next().is_some() {
            return None;
        }

        Some(Reading {
            meter_id,
            energy_import_t1_wh,
            energy_import_t2_wh,
            energy_export_t1_wh,
            energy_export_t2_wh,
            power_w,
            gas_dm3,
            timestamp_ms: 0,
        })
    }
}

/// Encode a reading in the semicolon text format understood by
/// [`TextReadingDecoder`].
///
/// The format is `meter_id;import_t1;import_t2;export_t1;export_t2;power;gas`
/// with an empty last field when the reading carries no gas counter.
pub fn encode_text_frame(reading: &Reading) -> Vec<u8> {
    let gas = reading.gas_dm3.map(|v| v.to_string()).unwrap_or_default();
    format!(
        "{};{};{};{};{};{};{}",
        reading.meter_id,
        reading.energy_import_t1_wh,
        reading.energy_import_t2_wh,
        reading.energy_export_t1_wh,
        reading.energy_export_t2_wh,
        reading.power_w,
        gas
    )
    .into_bytes()
}

/// Build a plausible reading with values derived from `seed`.
pub fn sample_reading(seed: u64) -> Reading {
    Reading {
        meter_id: format!("METER-{:04}", seed),
        energy_import_t1_wh: 1_000_000 + seed * 13,
        energy_import_t2_wh: 2_000_000 + seed * 7,
        energy_export_t1_wh: 40_000 + seed * 3,
        energy_export_t2_wh: 9_000 + seed,
        power_w: 240 + seed as i32,
        gas_dm3: Some(500_000 + seed * 11),
        timestamp_ms: 0,
    }
}

/// Build a delivery package whose payload is the single byte `tag`.
pub fn sample_package(tag: u8) -> DeliveryPackage {
    let payload = PackagePayload::from_slice(&[tag]).expect("one byte fits the payload");
    DeliveryPackage { payload, accepted_at_ms: unix_time_ms() }
}

/// Packager encoding readings as JSON.
#[cfg(test)]
pub struct JsonPackager;

#[cfg(test)]
impl crate::packaging::Packager for JsonPackager {
    fn package(&self, reading: &Reading) -> Result<PackagePayload> {
        let bytes = serde_json::to_vec(reading).map_err(|e| {
            AcquireError::packaging_failed_with_source("JSON encoding failed", Box::new(e))
        })?;
        PackagePayload::from_slice(&bytes)
    }
}

/// Decode a payload produced by [`JsonPackager`] back into a reading.
#[cfg(test)]
pub fn unpackage_json(bytes: &[u8]) -> Reading {
    serde_json::from_slice(bytes).expect("payload should hold a JSON reading")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_LINK_CANDIDATES, LineFraming};

    #[test]
    fn text_frame_survives_encode_and_decode() {
        let reading = sample_reading(42);
        let bytes = encode_text_frame(&reading);

        let decoded = TextReadingDecoder
            .decode(FrameView::new(FrameKind::Ascii, &bytes))
            .expect("encoded frame should decode");

        assert_eq!(decoded.meter_id, reading.meter_id);
        assert_eq!(decoded.energy_import_t1_wh, reading.energy_import_t1_wh);
        assert_eq!(decoded.gas_dm3, reading.gas_dm3);
    }

    #[test]
    fn text_frame_without_gas_decodes_to_none_gas() {
        let mut reading = sample_reading(1);
        reading.gas_dm3 = None;
        let bytes = encode_text_frame(&reading);

        let decoded = TextReadingDecoder
            .decode(FrameView::new(FrameKind::Ascii, &bytes))
            .expect("gasless frame should decode");
        assert_eq!(decoded.gas_dm3, None);
    }

    #[test]
    fn malformed_text_frames_are_rejected() {
        let cases: &[&[u8]] = &[
            b"",
            b";1;2;3;4;5;6",
            b"METER-1;not-a-number;2;3;4;5;6",
            b"METER-1;1;2;3;4;5;6;extra",
            b"\xFF\xFE",
        ];

        for bytes in cases {
            assert!(
                TextReadingDecoder.decode(FrameView::new(FrameKind::Ascii, bytes)).is_none(),
                "{:?} should be rejected",
                bytes
            );
        }
    }

    #[tokio::test]
    async fn scripted_source_replays_steps_in_order() {
        let mut source = ScriptedSource::new(&[LinkConfig::new(115_200, LineFraming::EightN1)]);
        source.queue_frame(FrameKind::Ascii, b"first".to_vec());
        source.queue_idle(1);
        source.queue_frame(FrameKind::Hdlc, b"second".to_vec());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        source.set_frame_callback(Box::new(move |frame| {
            sink.lock().push((frame.kind(), frame.bytes().to_vec()));
        }));

        for _ in 0..4 {
            source.poll().await;
        }

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (FrameKind::Ascii, b"first".to_vec()));
        assert_eq!(seen[1], (FrameKind::Hdlc, b"second".to_vec()));
    }

    #[test]
    fn configure_log_records_applied_configs() {
        let mut source = ScriptedSource::new(DEFAULT_LINK_CANDIDATES);
        let log = source.configure_log();

        let first = source.candidate(0);
        source.configure(&first).unwrap();
        source.fail_configure(true);
        let second = source.candidate(1);
        assert!(source.configure(&second).is_err());

        assert_eq!(*log.lock(), vec![first, second]);
    }
}
