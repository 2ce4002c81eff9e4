//! Decode the manufacturer data advertised by MikroTik BLE tags
//!
//! A tag broadcasts an 18-byte payload under Bluetooth manufacturer ID 0x094F
//! carrying acceleration, temperature, battery, uptime and event flags. The
//! decoder in [`bluetooth::decoder`] is a pure function over that payload; the
//! rest of the crate scans for configured tags with BlueZ, turns decoded
//! records into named sensor values and logs periodic summaries.
//!
//! # Example
//!
//! ```rust
//! let mut data = [0u8; 18];
//! data[10] = 0x19; // 25.0 °C
//! data[17] = 80; // battery %
//!
//! let record = mikrotik_tag_monitor::decode_tag_data(&data).unwrap();
//! assert_eq!(record.temperature_celsius, Some(25.0));
//! assert_eq!(record.battery_percent, Some(80));
//! ```

pub mod bluetooth;
pub mod config;
pub mod models;
pub mod monitor;
pub mod sensors;
pub mod utils;

pub use bluetooth::decoder::{
    decode_tag_data, DecodeError, DecodeTrace, PayloadDecoder, MIKROTIK_MANUFACTURER_ID,
    PAYLOAD_LEN,
};
pub use config::{ConfigError, MonitorConfig};
pub use models::{AdvertisementFrame, MeasurementRecord, MotionFlags, TagReading, Uptime};
pub use monitor::{run_monitor, TagMonitor, TagSnapshot};
pub use sensors::{sensor_states, SensorKind, SensorState, SensorValue};
