pub mod decoder;
pub mod scanner;

pub use decoder::{
    decode_tag_data, DecodeError, DecodeTrace, PayloadDecoder, MIKROTIK_MANUFACTURER_ID,
    PAYLOAD_LEN,
};
pub use scanner::{run_scanner, scan_for_tags};
