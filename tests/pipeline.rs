//! End-to-end pipeline tests written against the public API only.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use meterflow::{
    DEFAULT_LINK_CANDIDATES, DecoderRegistry, DeliveryQueue, FrameCallback, FrameKind,
    FrameSource, FrameView, LinkConfig, MeterAcquisition, MeterDecoder, Packager, PackagePayload,
    Reading,
};
use tokio::time::timeout;

/// Source that emits prearranged telegrams, one per poll.
struct LoopbackSource {
    frames: VecDeque<Vec<u8>>,
    callback: Option<FrameCallback>,
    configured: Arc<Mutex<Vec<LinkConfig>>>,
}

impl LoopbackSource {
    fn new(frames: &[&[u8]]) -> Self {
        Self {
            frames: frames.iter().map(|bytes| bytes.to_vec()).collect(),
            callback: None,
            configured: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn configured(&self) -> Arc<Mutex<Vec<LinkConfig>>> {
        self.configured.clone()
    }
}

#[async_trait::async_trait]
impl FrameSource for LoopbackSource {
    fn configure(&mut self, config: &LinkConfig) -> meterflow::Result<()> {
        self.configured.lock().unwrap().push(*config);
        Ok(())
    }

    fn candidate(&self, index: usize) -> LinkConfig {
        DEFAULT_LINK_CANDIDATES[index]
    }

    fn candidate_count(&self) -> usize {
        DEFAULT_LINK_CANDIDATES.len()
    }

    fn set_frame_callback(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
    }

    async fn poll(&mut self) {
        if let Some(bytes) = self.frames.pop_front() {
            if let Some(callback) = self.callback.as_mut() {
                callback(FrameView::new(FrameKind::Ascii, &bytes));
            }
        }
    }
}

/// Decoder for `meter_id,power_w` telegrams.
struct CsvDecoder;

impl MeterDecoder for CsvDecoder {
    fn decode(&self, frame: FrameView<'_>) -> Option<Reading> {
        let text = std::str::from_utf8(frame.bytes()).ok()?;
        let (id, power) = text.split_once(',')?;
        if id.is_empty() {
            return None;
        }
        Some(Reading {
            meter_id: id.to_string(),
            power_w: power.trim().parse().ok()?,
            ..Reading::default()
        })
    }
}

struct JsonPackager;

impl Packager for JsonPackager {
    fn package(&self, reading: &Reading) -> meterflow::Result<PackagePayload> {
        let bytes = serde_json::to_vec(reading).map_err(|e| {
            meterflow::AcquireError::packaging_failed_with_source(
                "JSON encoding failed",
                Box::new(e),
            )
        })?;
        PackagePayload::from_slice(&bytes)
    }
}

fn csv_registry() -> DecoderRegistry {
    let mut registry = DecoderRegistry::new();
    registry.register(FrameKind::Ascii, CsvDecoder);
    registry
}

#[tokio::test]
async fn telegrams_come_out_as_packaged_readings() {
    let _ = tracing_subscriber::fmt::try_init();

    let source = LoopbackSource::new(&[b"EM42,350", b"EM42,420"]);
    let mut acquisition = MeterAcquisition::new(source, csv_registry(), JsonPackager);
    acquisition.set_poll_interval(Duration::from_millis(5));

    let queue = Arc::new(DeliveryQueue::new(8));
    acquisition.start(queue.clone()).expect("start should succeed");
    assert!(acquisition.is_running());

    let package =
        timeout(Duration::from_secs(2), queue.recv()).await.expect("first package should arrive");
    let reading: Reading = serde_json::from_slice(package.payload.as_bytes()).expect("valid JSON");
    assert_eq!(reading.meter_id, "EM42");
    assert_eq!(reading.power_w, 350);
    assert!(reading.timestamp_ms > 0);

    let package =
        timeout(Duration::from_secs(2), queue.recv()).await.expect("second package should arrive");
    let reading: Reading = serde_json::from_slice(package.payload.as_bytes()).expect("valid JSON");
    assert_eq!(reading.power_w, 420);

    acquisition.stop().await;
    assert!(!acquisition.is_running());

    let cached = acquisition.latest_reading().expect("latest reading should be cached");
    assert_eq!(cached.power_w, 420);
    assert_eq!(acquisition.stats().frames_decoded, 2);
}

#[tokio::test]
async fn silent_link_walks_the_candidate_list() {
    let _ = tracing_subscriber::fmt::try_init();

    let source = LoopbackSource::new(&[]);
    let configured = source.configured();

    let mut acquisition = MeterAcquisition::new(source, csv_registry(), JsonPackager);
    acquisition.set_poll_interval(Duration::from_millis(5));
    acquisition.set_stall_window(Duration::from_millis(40));

    acquisition.start(Arc::new(DeliveryQueue::new(4))).expect("start should succeed");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while configured.lock().unwrap().len() < 3 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    acquisition.stop().await;

    let applied = configured.lock().unwrap().clone();
    assert!(applied.len() >= 3, "expected rotations, saw {:?}", applied);
    assert_eq!(applied[0], DEFAULT_LINK_CANDIDATES[0]);
    assert_eq!(applied[1], DEFAULT_LINK_CANDIDATES[1]);
    assert_eq!(applied[2], DEFAULT_LINK_CANDIDATES[2]);
}

#[tokio::test]
async fn undecodable_telegram_does_not_break_the_stream() {
    let _ = tracing_subscriber::fmt::try_init();

    let source = LoopbackSource::new(&[b"\xFF\xFE\xFD", b"EM7,120"]);
    let mut acquisition = MeterAcquisition::new(source, csv_registry(), JsonPackager);
    acquisition.set_poll_interval(Duration::from_millis(5));

    let queue = Arc::new(DeliveryQueue::new(4));
    acquisition.start(queue.clone()).expect("start should succeed");

    let package = timeout(Duration::from_secs(2), queue.recv())
        .await
        .expect("the good telegram should still arrive");
    let reading: Reading = serde_json::from_slice(package.payload.as_bytes()).expect("valid JSON");
    assert_eq!(reading.meter_id, "EM7");

    acquisition.stop().await;

    let snapshot = acquisition.stats();
    assert_eq!(snapshot.frames_decoded, 1);
    assert_eq!(snapshot.frames_failed, 1);
    let faulty = snapshot.last_faulty_frame.expect("bad telegram should be snapshotted");
    assert_eq!(faulty.bytes, b"\xFF\xFE\xFD".to_vec());
}
