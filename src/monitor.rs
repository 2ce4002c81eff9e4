/// Frame consumer: decodes tag advertisements and keeps the latest sensor values
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};

use crate::bluetooth::decoder::{DecodeTrace, PayloadDecoder, MIKROTIK_MANUFACTURER_ID};
use crate::models::{AdvertisementFrame, IntervalSummary, TagReading};
use crate::sensors::{sensor_states, SensorState};
use crate::utils::{format_datetime, summarize_interval};

/// Latest known state of one tag
#[derive(Debug, Clone)]
pub struct TagSnapshot {
    pub reading: TagReading,
    pub states: Vec<SensorState>,
    pub updated: OffsetDateTime,
    pub frames: u64,
}

#[derive(Debug)]
pub struct TagMonitor {
    tags: HashMap<String, String>,
    decoder: PayloadDecoder,
    latest: HashMap<String, TagSnapshot>,
    interval: HashMap<String, Vec<TagReading>>,
    rejected: u64,
}

impl TagMonitor {
    /// `tags` maps normalised MAC addresses to display names
    pub fn new(tags: HashMap<String, String>) -> Self {
        let decoder = PayloadDecoder::new().with_trace(|event| match event {
            DecodeTrace::Received { data } => debug!(
                "Raw advertisement data: {} ({} bytes)",
                hex::encode(data),
                data.len()
            ),
            DecodeTrace::Decoded(record) => debug!("Parsed values: {:?}", record),
            DecodeTrace::Rejected(e) => debug!("Payload rejected: {}", e),
        });

        TagMonitor {
            tags,
            decoder,
            latest: HashMap::new(),
            interval: HashMap::new(),
            rejected: 0,
        }
    }

    /// Decode one frame and update the tag's values
    ///
    /// Returns the refreshed snapshot, or `None` when the frame was ignored
    /// (unknown tag, foreign manufacturer ID) or failed to decode. In both
    /// cases the previous values stay as they were.
    pub fn handle_frame(&mut self, frame: AdvertisementFrame) -> Option<&TagSnapshot> {
        if frame.manufacturer_id != MIKROTIK_MANUFACTURER_ID {
            debug!(
                "Ignoring manufacturer ID {:#06x} from {}",
                frame.manufacturer_id, frame.address
            );
            return None;
        }

        let Some(name) = self.tags.get(&frame.address).cloned() else {
            debug!("Ignoring frame from unconfigured device {}", frame.address);
            return None;
        };

        let record = match self.decoder.decode(&frame.data) {
            Ok(record) => record,
            Err(e) => {
                self.rejected += 1;
                warn!("Skipping frame from {} ({}): {}", name, frame.address, e);
                return None;
            }
        };

        let reading = TagReading {
            address: frame.address.clone(),
            name,
            record,
            rssi: frame.rssi,
            received_at: frame.received_at,
        };
        let frames = self
            .latest
            .get(&frame.address)
            .map_or(1, |snapshot| snapshot.frames + 1);

        self.interval
            .entry(frame.address.clone())
            .or_default()
            .push(reading.clone());
        self.latest.insert(
            frame.address.clone(),
            TagSnapshot {
                states: sensor_states(&reading),
                reading,
                updated: OffsetDateTime::now_utc(),
                frames,
            },
        );

        self.latest.get(&frame.address)
    }

    pub fn latest(&self, address: &str) -> Option<&TagSnapshot> {
        self.latest.get(address)
    }

    pub fn rejected_frames(&self) -> u64 {
        self.rejected
    }

    /// Drain the readings collected since the previous call into summaries
    pub fn take_summaries(&mut self) -> HashMap<String, IntervalSummary> {
        let readings = std::mem::take(&mut self.interval);
        summarize_interval(&readings)
    }
}

/// Consume frames until the channel closes, logging a summary every
/// `summary_interval`. Returns the monitor so callers can inspect final state.
pub async fn run_monitor(
    mut rx: mpsc::Receiver<AdvertisementFrame>,
    mut monitor: TagMonitor,
    summary_interval: Duration,
) -> TagMonitor {
    info!("Starting MikroTik tag monitor");
    let mut ticker = interval_at(Instant::now() + summary_interval, summary_interval);

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    info!("Frame channel closed, stopping monitor");
                    break;
                };
                if let Some(snapshot) = monitor.handle_frame(frame) {
                    log_snapshot(snapshot);
                }
            }
            _ = ticker.tick() => {
                log_summaries(&monitor.take_summaries());
            }
        }
    }

    monitor
}

fn log_snapshot(snapshot: &TagSnapshot) {
    let record = &snapshot.reading.record;
    info!(
        "Received data from {}: temp={:?}°C, battery={:?}%, total_acc={:?}, uptime={}",
        snapshot.reading.name,
        record.temperature_celsius,
        record.battery_percent,
        record.total_acceleration,
        record.uptime
    );
    for state in &snapshot.states {
        debug!(
            "  {} = {}{}",
            state.name,
            state.value,
            state.unit.map(|u| format!(" {}", u)).unwrap_or_default()
        );
    }
}

fn log_summaries(summaries: &HashMap<String, IntervalSummary>) {
    // Warning if no data collected
    if summaries.is_empty() {
        warn!("No data collected during this interval!");
        return;
    }

    for summary in summaries.values() {
        info!(
            "Summary for {} at {}:",
            summary.name,
            format_datetime(&summary.time)
        );
        match summary.average_temperature {
            Some(t) => info!("  Average temperature: {:.2}°C", t),
            None => info!("  Average temperature: unavailable"),
        }
        if let Some(a) = summary.average_total_acceleration {
            info!("  Average total acceleration: {:.3}", a);
        }
        if let Some(a) = summary.peak_total_acceleration {
            info!("  Peak total acceleration: {:.3}", a);
        }
        if let Some(b) = summary.last_battery {
            info!("  Battery: {}%", b);
        }
        if let Some(rssi) = summary.last_rssi {
            info!("  RSSI: {} dBm", rssi);
        }
        info!("  Uptime: {}", summary.last_uptime);
        info!(
            "  Events: {} impact, {} tilt, {} free fall",
            summary.impact_events, summary.tilt_events, summary.free_fall_events
        );
        info!("  Based on {} samples", summary.samples);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{SensorKind, SensorValue};
    use pretty_assertions::assert_eq;

    const FORKLIFT: &str = "AA:BB:CC:DD:EE:FF";

    fn monitor() -> TagMonitor {
        let mut tags = HashMap::new();
        tags.insert(FORKLIFT.to_string(), "Forklift".to_string());
        TagMonitor::new(tags)
    }

    fn frame(address: &str, manufacturer_id: u16, data: Vec<u8>) -> AdvertisementFrame {
        AdvertisementFrame {
            address: address.to_string(),
            manufacturer_id,
            data,
            rssi: Some(-68),
            received_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn payload(battery: u8) -> Vec<u8> {
        let mut data = vec![0u8; 18];
        data[17] = battery;
        data
    }

    #[test]
    fn valid_frame_updates_snapshot() {
        let mut monitor = monitor();
        let snapshot = monitor
            .handle_frame(frame(FORKLIFT, MIKROTIK_MANUFACTURER_ID, payload(64)))
            .unwrap();

        assert_eq!(snapshot.frames, 1);
        assert_eq!(snapshot.reading.name, "Forklift");
        assert_eq!(snapshot.reading.record.battery_percent, Some(64));
        let rssi = snapshot
            .states
            .iter()
            .find(|s| s.kind == SensorKind::Rssi)
            .unwrap();
        assert_eq!(rssi.value, SensorValue::Integer(-68));

        monitor.handle_frame(frame(FORKLIFT, MIKROTIK_MANUFACTURER_ID, payload(63)));
        let latest = monitor.latest(FORKLIFT).unwrap();
        assert_eq!(latest.frames, 2);
        assert_eq!(latest.reading.record.battery_percent, Some(63));
    }

    #[test]
    fn foreign_frames_are_ignored() {
        let mut monitor = monitor();
        assert!(monitor
            .handle_frame(frame("11:22:33:44:55:66", MIKROTIK_MANUFACTURER_ID, payload(50)))
            .is_none());
        assert!(monitor
            .handle_frame(frame(FORKLIFT, 0x0499, payload(50)))
            .is_none());
        assert!(monitor.latest(FORKLIFT).is_none());
        assert_eq!(monitor.rejected_frames(), 0);
    }

    #[test]
    fn decode_failure_keeps_previous_values() {
        let mut monitor = monitor();
        monitor.handle_frame(frame(FORKLIFT, MIKROTIK_MANUFACTURER_ID, payload(70)));
        assert!(monitor
            .handle_frame(frame(FORKLIFT, MIKROTIK_MANUFACTURER_ID, vec![0u8; 24]))
            .is_none());

        assert_eq!(monitor.rejected_frames(), 1);
        let latest = monitor.latest(FORKLIFT).unwrap();
        assert_eq!(latest.frames, 1);
        assert_eq!(latest.reading.record.battery_percent, Some(70));
    }

    #[test]
    fn summaries_drain_the_interval() {
        let mut monitor = monitor();
        monitor.handle_frame(frame(FORKLIFT, MIKROTIK_MANUFACTURER_ID, payload(70)));
        monitor.handle_frame(frame(FORKLIFT, MIKROTIK_MANUFACTURER_ID, payload(69)));

        let summaries = monitor.take_summaries();
        assert_eq!(summaries[FORKLIFT].samples, 2);
        assert_eq!(summaries[FORKLIFT].last_battery, Some(69));
        assert!(monitor.take_summaries().is_empty());
        // Latest values survive the drain
        assert!(monitor.latest(FORKLIFT).is_some());
    }

    #[tokio::test]
    async fn run_monitor_consumes_until_channel_closes() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_monitor(rx, monitor(), Duration::from_secs(3600)));

        tx.send(frame(FORKLIFT, MIKROTIK_MANUFACTURER_ID, payload(55)))
            .await
            .unwrap();
        tx.send(frame(FORKLIFT, MIKROTIK_MANUFACTURER_ID, vec![1, 2, 3]))
            .await
            .unwrap();
        drop(tx);

        let monitor = handle.await.unwrap();
        assert_eq!(monitor.rejected_frames(), 1);
        assert_eq!(
            monitor.latest(FORKLIFT).unwrap().reading.record.battery_percent,
            Some(55)
        );
    }
}
