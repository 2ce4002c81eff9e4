/// MikroTik BLE tag manufacturer data decoding
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{MeasurementRecord, MotionFlags, Uptime};

// MikroTik tag protocol constants
pub const MIKROTIK_MANUFACTURER_ID: u16 = 0x094F; // MikroTik manufacturer ID
pub const PAYLOAD_LEN: usize = 18;

const ACCELERATION_RANGE: RangeInclusive<f64> = -16.0..=16.0; // g
const TEMPERATURE_RANGE: RangeInclusive<f64> = -50.0..=100.0; // °C
const BATTERY_MAX_PERCENT: u8 = 100;
const FIXED_POINT_SCALE: f64 = 256.0; // 8.8 fixed point

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid payload length: expected {expected} bytes, got {actual} bytes")]
    InvalidLength { actual: usize, expected: usize },

    #[error("malformed payload ({len} bytes, {hex}): {reason}")]
    MalformedPayload {
        reason: String,
        len: usize,
        hex: String,
    },
}

/// Events reported to an installed trace hook
#[derive(Debug)]
pub enum DecodeTrace<'a> {
    Received { data: &'a [u8] },
    Decoded(&'a MeasurementRecord),
    Rejected(&'a DecodeError),
}

pub type TraceHook = Arc<dyn Fn(&DecodeTrace<'_>) + Send + Sync>;

/// Stateless decoder for the 18-byte tag payload.
///
/// Cloning is cheap and a single instance can be shared between threads; the
/// only state is the optional trace hook.
#[derive(Clone, Default)]
pub struct PayloadDecoder {
    trace: Option<TraceHook>,
}

impl fmt::Debug for PayloadDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadDecoder")
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

impl PayloadDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DecodeTrace<'_>) + Send + Sync + 'static,
    {
        self.trace = Some(Arc::new(hook));
        self
    }

    /// Decode MikroTik tag manufacturer data into a measurement record
    ///
    /// The payload is 18 bytes, little-endian:
    /// - Byte 0: Payload version
    /// - Byte 1: Encryption flag (passed through, never decrypted)
    /// - Bytes 2-3: Salt
    /// - Bytes 4-9: Acceleration X, Y, Z (signed 8.8 fixed point, g)
    /// - Bytes 10-11: Temperature (signed 8.8 fixed point, °C)
    /// - Bytes 12-15: Uptime in seconds
    /// - Byte 16: Event flags
    /// - Byte 17: Battery (%)
    ///
    /// The 16-bit fixed point words are byte-swapped after the little-endian
    /// read, so on the wire they effectively sit high byte first.
    ///
    /// # Arguments
    /// * `data` - Manufacturer data for ID 0x094F from a BLE advertisement
    ///
    /// # Returns
    /// The decoded record, or a `DecodeError` the caller should treat as
    /// "no update this cycle"
    pub fn decode(&self, data: &[u8]) -> Result<MeasurementRecord, DecodeError> {
        self.emit(&DecodeTrace::Received { data });

        let result = decode_fields(data);
        match &result {
            Ok(record) => self.emit(&DecodeTrace::Decoded(record)),
            Err(e) => self.emit(&DecodeTrace::Rejected(e)),
        }
        result
    }

    fn emit(&self, event: &DecodeTrace<'_>) {
        if let Some(hook) = &self.trace {
            hook(event);
        }
    }
}

/// Decode without a trace hook
pub fn decode_tag_data(data: &[u8]) -> Result<MeasurementRecord, DecodeError> {
    decode_fields(data)
}

fn decode_fields(data: &[u8]) -> Result<MeasurementRecord, DecodeError> {
    if data.len() != PAYLOAD_LEN {
        return Err(DecodeError::InvalidLength {
            actual: data.len(),
            expected: PAYLOAD_LEN,
        });
    }

    let mut reader = FieldReader::new(data);
    let payload_version = reader.u8()?;
    let encryption_flag = reader.u8()?;
    let salt = reader.u16_le()?;
    let acc_x_raw = reader.u16_le()?;
    let acc_y_raw = reader.u16_le()?;
    let acc_z_raw = reader.u16_le()?;
    let temperature_raw = reader.u16_le()?;
    let uptime_raw = reader.u32_le()?;
    let flag = reader.u8()?;
    let battery = reader.u8()?;

    let acceleration_x = Some(convert_acceleration(acc_x_raw));
    let acceleration_y = Some(convert_acceleration(acc_y_raw));
    let acceleration_z = Some(convert_acceleration(acc_z_raw));

    Ok(MeasurementRecord {
        payload_version,
        encryption_flag,
        salt,
        acceleration_x,
        acceleration_y,
        acceleration_z,
        total_acceleration: total_acceleration(acceleration_x, acceleration_y, acceleration_z),
        temperature_celsius: convert_temperature(temperature_raw),
        battery_percent: convert_battery(battery),
        uptime: Uptime::from_seconds(uptime_raw),
        flags: MotionFlags::from_bits(flag),
    })
}

/// Swap the two octets of a 16-bit word
pub fn swap_octets(word: u16) -> u16 {
    word.swap_bytes()
}

/// Byte-swap a little-endian word and read it as signed 8.8 fixed point.
///
/// Reinterpreting the swapped word as `i16` is the same as subtracting
/// 0x10000 from values above 0x7FFF.
pub fn fixed_point_8_8(word: u16) -> f64 {
    swap_octets(word) as i16 as f64 / FIXED_POINT_SCALE
}

/// Axis acceleration in g. Values outside ±16 g become 0.0, not absent.
pub fn convert_acceleration(word: u16) -> f64 {
    let acceleration = fixed_point_8_8(word);
    if ACCELERATION_RANGE.contains(&acceleration) {
        acceleration
    } else {
        0.0
    }
}

/// Temperature in °C, absent outside -50..=100.
pub fn convert_temperature(word: u16) -> Option<f64> {
    let temperature = fixed_point_8_8(word);
    TEMPERATURE_RANGE.contains(&temperature).then_some(temperature)
}

/// Battery percentage, absent above 100. The byte is unsigned, so there is
/// no lower bound to check.
pub fn convert_battery(value: u8) -> Option<u8> {
    (value <= BATTERY_MAX_PERCENT).then_some(value)
}

/// Euclidean norm of the three axes, defined only when every axis is present
pub fn total_acceleration(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Option<f64> {
    Some((x? * x? + y? * y? + z? * z?).sqrt())
}

/// Bounds-checked little-endian cursor over a payload
struct FieldReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        FieldReader { data, offset: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes: [u8; N] = self
            .data
            .get(self.offset..self.offset + N)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| DecodeError::MalformedPayload {
                reason: format!(
                    "cannot read {} bytes at offset {}",
                    N, self.offset
                ),
                len: self.data.len(),
                hex: hex::encode(self.data),
            })?;
        self.offset += N;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        let [byte] = self.take::<1>()?;
        Ok(byte)
    }

    fn u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    fn u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take::<4>()?))
    }
}
