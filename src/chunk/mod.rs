mod stream;
mod reader;
mod writer;

pub use stream::*;
pub use reader::*;
pub use writer::*;

use crate::{Error, Result};
use crate::protocol::MAX_CHUNK_STREAM_ID;

/// Encode the 1-3 byte basic header for `cs_id`.
pub fn encode_basic_header(fmt: u8, cs_id: u32) -> Result<Vec<u8>> {
    let fmt_bits = (fmt & 0x03) << 6;
    match cs_id {
        2..=63 => Ok(vec![fmt_bits | cs_id as u8]),
        64..=319 => Ok(vec![fmt_bits, (cs_id - 64) as u8]),
        // Marker 1 and little-endian id - 64, matching what the reader accepts (DESIGN.md)
        320..=MAX_CHUNK_STREAM_ID => {
            let id = cs_id - 64;
            Ok(vec![fmt_bits | 1, (id & 0xFF) as u8, (id >> 8) as u8])
        }
        _ => Err(Error::chunk(format!("Invalid chunk stream id: {}", cs_id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header_widths() {
        assert_eq!(encode_basic_header(0, 3).unwrap(), vec![0x03]);
        assert_eq!(encode_basic_header(3, 63).unwrap(), vec![0xFF]);
        assert_eq!(encode_basic_header(1, 64).unwrap(), vec![0x40, 0x00]);
        assert_eq!(encode_basic_header(0, 319).unwrap(), vec![0x00, 0xFF]);
        assert_eq!(encode_basic_header(0, 320).unwrap(), vec![0x01, 0x00, 0x01]);
        assert_eq!(encode_basic_header(2, 65599).unwrap(), vec![0x81, 0xFF, 0xFF]);
    }

    #[test]
    fn test_basic_header_range() {
        assert!(encode_basic_header(0, 0).is_err());
        assert!(encode_basic_header(0, 1).is_err());
        assert!(encode_basic_header(0, 65600).is_err());
    }
}
