use mikrotik_tag_monitor::{
    decode_tag_data, DecodeError, MeasurementRecord, MotionFlags, PayloadDecoder, Uptime,
    PAYLOAD_LEN,
};
use pretty_assertions::assert_eq;

/// All-zero payload except battery = 50 and the tilt flag
fn idle_tag() -> [u8; 18] {
    let mut data = [0u8; 18];
    data[16] = 0x02;
    data[17] = 50;
    data
}

#[test]
fn idle_tag_decodes_end_to_end() {
    let record = decode_tag_data(&idle_tag()).unwrap();

    assert_eq!(
        record,
        MeasurementRecord {
            payload_version: 0,
            encryption_flag: 0,
            salt: 0,
            acceleration_x: Some(0.0),
            acceleration_y: Some(0.0),
            acceleration_z: Some(0.0),
            total_acceleration: Some(0.0),
            temperature_celsius: Some(0.0),
            battery_percent: Some(50),
            uptime: Uptime::from_seconds(0),
            flags: MotionFlags {
                tilt: true,
                ..MotionFlags::default()
            },
        }
    );
    assert_eq!(record.uptime.to_string(), "0d 0h 0m 0s");
}

#[test]
fn every_other_length_is_invalid() {
    for len in (0..64).filter(|len| *len != PAYLOAD_LEN) {
        let data = vec![0xA5u8; len];
        assert_eq!(
            decode_tag_data(&data),
            Err(DecodeError::InvalidLength {
                actual: len,
                expected: 18
            })
        );
    }
}

#[test]
fn any_eighteen_bytes_decode() {
    // Walk a spread of byte patterns through every position
    for seed in 0u8..=255 {
        let data: Vec<u8> = (0..18u8)
            .map(|i| seed.wrapping_mul(31).wrapping_add(i.wrapping_mul(17)))
            .collect();
        let record = decode_tag_data(&data).unwrap();

        let axes = [
            record.acceleration_x.unwrap(),
            record.acceleration_y.unwrap(),
            record.acceleration_z.unwrap(),
        ];
        assert!(axes.iter().all(|a| (-16.0..=16.0).contains(a)));
        assert!(record.total_acceleration.is_some());
        if let Some(t) = record.temperature_celsius {
            assert!((-50.0..=100.0).contains(&t));
        }
        if let Some(b) = record.battery_percent {
            assert!(b <= 100);
        }
    }
}

#[test]
fn decoding_is_deterministic() {
    let data = [
        0x01, 0x00, 0x34, 0x12, 0x00, 0x01, 0xFF, 0x00, 0x03, 0x80, 0x19, 0x80, 0xD1, 0x5F,
        0x01, 0x00, 0x29, 0x64,
    ];
    let decoder = PayloadDecoder::new();
    let first = decoder.decode(&data).unwrap();
    let second = decoder.decode(&data).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, decode_tag_data(&data).unwrap());
    assert_eq!(
        first.temperature_celsius.map(f64::to_bits),
        second.temperature_celsius.map(f64::to_bits)
    );

    assert_eq!(first.salt, 0x1234);
    assert_eq!(first.acceleration_x, Some(0.00390625));
    assert_eq!(first.acceleration_y, Some(-1.0));
    assert_eq!(first.acceleration_z, Some(3.5));
    assert_eq!(first.temperature_celsius, Some(25.5));
    assert_eq!(first.uptime.total_seconds, 90065);
    assert_eq!(first.uptime.to_string(), "1d 1h 1m 5s");
    assert_eq!(
        first.flags,
        MotionFlags {
            reed_switch: true,
            impact_x: true,
            impact_z: true,
            ..MotionFlags::default()
        }
    );
    assert_eq!(first.battery_percent, Some(100));
}

#[test]
fn three_four_five_triangle() {
    let mut data = [0u8; 18];
    data[4] = 0x03;
    data[6] = 0x04;
    let record = decode_tag_data(&data).unwrap();
    assert_eq!(record.total_acceleration, Some(5.0));
}

#[test]
fn out_of_range_values_are_sanitised_not_rejected() {
    let mut data = idle_tag();
    data[4] = 0x20; // 32 g on x
    data[10] = 0x7F; // 127 °C
    data[17] = 101;
    let record = decode_tag_data(&data).unwrap();

    // Acceleration is replaced by zero; temperature and battery disappear
    assert_eq!(record.acceleration_x, Some(0.0));
    assert_eq!(record.temperature_celsius, None);
    assert_eq!(record.battery_percent, None);
    assert_eq!(record.total_acceleration, Some(0.0));
}
