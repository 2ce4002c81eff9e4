/// Named sensor values exposed for each configured tag
use std::fmt;

use crate::models::TagReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Temperature,
    Battery,
    SignalStrength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Temperature,
    Battery,
    Rssi,
    AccelerationX,
    AccelerationY,
    AccelerationZ,
    TotalAcceleration,
    Uptime,
    FlagReedSwitch,
    FlagAccelTilt,
    FlagAccelFreeFall,
    FlagImpactX,
    FlagImpactY,
    FlagImpactZ,
}

impl SensorKind {
    /// Every sensor a tag exposes, in registration order
    pub const ALL: [SensorKind; 14] = [
        SensorKind::Temperature,
        SensorKind::Battery,
        SensorKind::Rssi,
        SensorKind::AccelerationX,
        SensorKind::AccelerationY,
        SensorKind::AccelerationZ,
        SensorKind::TotalAcceleration,
        SensorKind::Uptime,
        SensorKind::FlagReedSwitch,
        SensorKind::FlagAccelTilt,
        SensorKind::FlagAccelFreeFall,
        SensorKind::FlagImpactX,
        SensorKind::FlagImpactY,
        SensorKind::FlagImpactZ,
    ];

    pub fn attribute(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Battery => "battery",
            SensorKind::Rssi => "rssi",
            SensorKind::AccelerationX => "acceleration_x",
            SensorKind::AccelerationY => "acceleration_y",
            SensorKind::AccelerationZ => "acceleration_z",
            SensorKind::TotalAcceleration => "total_acceleration",
            SensorKind::Uptime => "uptime",
            SensorKind::FlagReedSwitch => "flag_reed_switch",
            SensorKind::FlagAccelTilt => "flag_accel_tilt",
            SensorKind::FlagAccelFreeFall => "flag_accel_free_fall",
            SensorKind::FlagImpactX => "flag_impact_x",
            SensorKind::FlagImpactY => "flag_impact_y",
            SensorKind::FlagImpactZ => "flag_impact_z",
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            SensorKind::Temperature => Some("°C"),
            SensorKind::Battery => Some("%"),
            SensorKind::Rssi => Some("dBm"),
            SensorKind::AccelerationX
            | SensorKind::AccelerationY
            | SensorKind::AccelerationZ
            | SensorKind::TotalAcceleration => Some("m/s²"),
            _ => None,
        }
    }

    pub fn device_class(&self) -> Option<DeviceClass> {
        match self {
            SensorKind::Temperature => Some(DeviceClass::Temperature),
            SensorKind::Battery => Some(DeviceClass::Battery),
            SensorKind::Rssi => Some(DeviceClass::SignalStrength),
            _ => None,
        }
    }

    /// Pick this sensor's value out of a reading
    pub fn value(&self, reading: &TagReading) -> SensorValue {
        let record = &reading.record;
        match self {
            SensorKind::Temperature => record.temperature_celsius.into(),
            SensorKind::Battery => record.battery_percent.map(i64::from).into(),
            // RSSI comes from the radio, not from the payload
            SensorKind::Rssi => reading.rssi.map(i64::from).into(),
            SensorKind::AccelerationX => record.acceleration_x.into(),
            SensorKind::AccelerationY => record.acceleration_y.into(),
            SensorKind::AccelerationZ => record.acceleration_z.into(),
            SensorKind::TotalAcceleration => record.total_acceleration.into(),
            SensorKind::Uptime => SensorValue::Text(record.uptime.to_string()),
            SensorKind::FlagReedSwitch => SensorValue::Bool(record.flags.reed_switch),
            SensorKind::FlagAccelTilt => SensorValue::Bool(record.flags.tilt),
            SensorKind::FlagAccelFreeFall => SensorValue::Bool(record.flags.free_fall),
            SensorKind::FlagImpactX => SensorValue::Bool(record.flags.impact_x),
            SensorKind::FlagImpactY => SensorValue::Bool(record.flags.impact_y),
            SensorKind::FlagImpactZ => SensorValue::Bool(record.flags.impact_z),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Float(f64),
    Integer(i64),
    Bool(bool),
    Text(String),
    Unavailable,
}

impl From<Option<f64>> for SensorValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(SensorValue::Unavailable, SensorValue::Float)
    }
}

impl From<Option<i64>> for SensorValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(SensorValue::Unavailable, SensorValue::Integer)
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Float(v) => write!(f, "{:.3}", v),
            SensorValue::Integer(v) => write!(f, "{}", v),
            SensorValue::Bool(true) => f.write_str("on"),
            SensorValue::Bool(false) => f.write_str("off"),
            SensorValue::Text(v) => f.write_str(v),
            SensorValue::Unavailable => f.write_str("unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorState {
    pub kind: SensorKind,
    pub unique_id: String,
    pub name: String,
    pub value: SensorValue,
    pub unit: Option<&'static str>,
}

/// Build the full set of sensor states for one reading
pub fn sensor_states(reading: &TagReading) -> Vec<SensorState> {
    SensorKind::ALL
        .iter()
        .map(|kind| SensorState {
            kind: *kind,
            unique_id: format!("{}_{}", reading.address, kind.attribute()),
            name: format!("{} {}", reading.name, title_case(kind.attribute())),
            value: kind.value(reading),
            unit: kind.unit(),
        })
        .collect()
}

/// "flag_accel_tilt" -> "Flag Accel Tilt"
fn title_case(attribute: &str) -> String {
    attribute
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
