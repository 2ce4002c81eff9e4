/// Utility functions for data processing and formatting
use std::collections::HashMap;
use time::{format_description, OffsetDateTime};

use crate::models::{IntervalSummary, TagReading};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Summarise the readings collected for each tag during one interval
///
/// Temperature is averaged over the samples where it was in range only, so a
/// burst of out-of-range frames does not drag the average towards zero.
/// Acceleration figures use the total acceleration of each sample. Battery,
/// uptime and RSSI are taken from the most recent sample.
///
/// # Arguments
/// * `readings` - HashMap mapping tag MAC addresses to readings in arrival order
///
/// # Returns
/// HashMap mapping tag MAC addresses to their summaries; tags with no
/// readings are left out
pub fn summarize_interval(
    readings: &HashMap<String, Vec<TagReading>>,
) -> HashMap<String, IntervalSummary> {
    let mut summaries = HashMap::new();

    for (address, samples) in readings {
        // Skip tags with no data
        let Some(last) = samples.last() else {
            continue;
        };

        let temperatures: Vec<f64> = samples
            .iter()
            .filter_map(|r| r.record.temperature_celsius)
            .collect();
        let totals: Vec<f64> = samples
            .iter()
            .filter_map(|r| r.record.total_acceleration)
            .collect();

        let summary = IntervalSummary {
            name: last.name.clone(),
            samples: samples.len(),
            average_temperature: mean(&temperatures).map(|t| round_to(t, 2)),
            average_total_acceleration: mean(&totals).map(|a| round_to(a, 3)),
            peak_total_acceleration: totals.iter().copied().reduce(f64::max),
            last_battery: last.record.battery_percent,
            last_uptime: last.record.uptime,
            last_rssi: last.rssi,
            impact_events: samples
                .iter()
                .filter(|r| r.record.flags.any_impact())
                .count(),
            tilt_events: samples.iter().filter(|r| r.record.flags.tilt).count(),
            free_fall_events: samples.iter().filter(|r| r.record.flags.free_fall).count(),
            time: OffsetDateTime::now_utc(),
        };

        summaries.insert(address.clone(), summary);
    }

    summaries
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
