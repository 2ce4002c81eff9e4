use std::fmt;
use time::OffsetDateTime;

const SECONDS_PER_MINUTE: u32 = 60;
const SECONDS_PER_HOUR: u32 = 3600;
const SECONDS_PER_DAY: u32 = 24 * SECONDS_PER_HOUR;

/// One decoded tag advertisement.
///
/// Acceleration axes are nullable in the model, but the decoder replaces
/// out-of-range axes with `0.0` instead of dropping them, so a decoded record
/// always carries all three axes and a total.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub payload_version: u8,
    pub encryption_flag: u8,
    pub salt: u16,
    pub acceleration_x: Option<f64>,
    pub acceleration_y: Option<f64>,
    pub acceleration_z: Option<f64>,
    pub total_acceleration: Option<f64>,
    pub temperature_celsius: Option<f64>,
    pub battery_percent: Option<u8>,
    pub uptime: Uptime,
    pub flags: MotionFlags,
}

/// Tag uptime as reported in the payload, with a day/hour/minute/second view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uptime {
    pub total_seconds: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Uptime {
    pub fn from_seconds(total_seconds: u32) -> Self {
        let mut rest = total_seconds;
        let days = rest / SECONDS_PER_DAY;
        rest %= SECONDS_PER_DAY;
        let hours = rest / SECONDS_PER_HOUR;
        rest %= SECONDS_PER_HOUR;
        let minutes = rest / SECONDS_PER_MINUTE;
        let seconds = rest % SECONDS_PER_MINUTE;

        Uptime {
            total_seconds,
            days,
            hours,
            minutes,
            seconds,
        }
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Event bits of the payload's flag byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionFlags {
    pub reed_switch: bool,
    pub tilt: bool,
    pub free_fall: bool,
    pub impact_x: bool,
    pub impact_y: bool,
    pub impact_z: bool,
}

impl MotionFlags {
    pub const REED_SWITCH: u8 = 0x01;
    pub const TILT: u8 = 0x02;
    pub const FREE_FALL: u8 = 0x04;
    pub const IMPACT_X: u8 = 0x08;
    pub const IMPACT_Y: u8 = 0x10;
    pub const IMPACT_Z: u8 = 0x20;

    /// Bits 0x40 and 0x80 carry no meaning and are dropped.
    pub fn from_bits(bits: u8) -> Self {
        MotionFlags {
            reed_switch: bits & Self::REED_SWITCH != 0,
            tilt: bits & Self::TILT != 0,
            free_fall: bits & Self::FREE_FALL != 0,
            impact_x: bits & Self::IMPACT_X != 0,
            impact_y: bits & Self::IMPACT_Y != 0,
            impact_z: bits & Self::IMPACT_Z != 0,
        }
    }

    pub fn any_impact(&self) -> bool {
        self.impact_x || self.impact_y || self.impact_z
    }
}

/// Manufacturer data for one device, as handed over by the scanner
#[derive(Debug, Clone)]
pub struct AdvertisementFrame {
    pub address: String,
    pub manufacturer_id: u16,
    pub data: Vec<u8>,
    pub rssi: Option<i16>,
    pub received_at: OffsetDateTime,
}

/// A successfully decoded frame from a configured tag
#[derive(Debug, Clone)]
pub struct TagReading {
    pub address: String,
    pub name: String,
    pub record: MeasurementRecord,
    pub rssi: Option<i16>,
    pub received_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct IntervalSummary {
    pub name: String,
    pub samples: usize,
    /// Mean over samples whose temperature was in range; `None` if there were none.
    pub average_temperature: Option<f64>,
    pub average_total_acceleration: Option<f64>,
    pub peak_total_acceleration: Option<f64>,
    pub last_battery: Option<u8>,
    pub last_uptime: Uptime,
    pub last_rssi: Option<i16>,
    pub impact_events: usize,
    pub tilt_events: usize,
    pub free_fall_events: usize,
    pub time: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uptime_splits_into_days_hours_minutes_seconds() {
        let uptime = Uptime::from_seconds(90065);
        assert_eq!(
            uptime,
            Uptime {
                total_seconds: 90065,
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 5,
            }
        );
        assert_eq!(uptime.to_string(), "1d 1h 1m 5s");
    }

    #[test]
    fn uptime_zero_and_max() {
        assert_eq!(Uptime::from_seconds(0).to_string(), "0d 0h 0m 0s");
        // u32::MAX = 49710 days 6:28:15
        assert_eq!(Uptime::from_seconds(u32::MAX).to_string(), "49710d 6h 28m 15s");
    }

    #[test]
    fn flag_bits_map_to_named_events() {
        assert_eq!(
            MotionFlags::from_bits(0x3F),
            MotionFlags {
                reed_switch: true,
                tilt: true,
                free_fall: true,
                impact_x: true,
                impact_y: true,
                impact_z: true,
            }
        );
        assert_eq!(MotionFlags::from_bits(0x00), MotionFlags::default());
        assert_eq!(
            MotionFlags::from_bits(0x09),
            MotionFlags {
                reed_switch: true,
                impact_x: true,
                ..MotionFlags::default()
            }
        );
    }

    #[test]
    fn unused_flag_bits_are_ignored() {
        assert_eq!(MotionFlags::from_bits(0xC0), MotionFlags::default());
        assert_eq!(MotionFlags::from_bits(0xC2), MotionFlags::from_bits(0x02));
    }

    #[test]
    fn any_impact_checks_all_axes() {
        assert!(!MotionFlags::from_bits(0x07).any_impact());
        assert!(MotionFlags::from_bits(0x10).any_impact());
        assert!(MotionFlags::from_bits(0x20).any_impact());
    }
}
