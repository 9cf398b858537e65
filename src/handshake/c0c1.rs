use crate::{ByteBuffer, Error, Result};
use crate::utils::{current_timestamp, generate_random_bytes};

/// RTMP version carried in C0/S0
pub const RTMP_VERSION: u8 = 3;

/// Size of C1, C2, S1 and S2
pub const HANDSHAKE_SIZE: usize = 1536;

/// Random block following the two 4-byte time fields
pub const RANDOM_SIZE: usize = HANDSHAKE_SIZE - 8;

/// Client hello (C0 + C1)
#[derive(Debug, Clone)]
pub struct C0C1 {
    /// RTMP version (C0)
    pub version: u8,

    /// Client time (C1)
    pub timestamp: u32,

    /// Should be zero; not enforced
    pub zero: u32,

    pub random_data: Vec<u8>,
}

impl C0C1 {
    /// Parse C0+C1, rejecting anything but version 3
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 1 + HANDSHAKE_SIZE {
            return Err(Error::handshake(format!(
                "C0+C1 too short: {} bytes, expected {}",
                data.len(),
                1 + HANDSHAKE_SIZE
            )));
        }

        let version = data[0];
        if version != RTMP_VERSION {
            return Err(Error::handshake(format!(
                "Unsupported RTMP version: {}, expected {}",
                version, RTMP_VERSION
            )));
        }

        let mut buffer = ByteBuffer::new(data[1..1 + HANDSHAKE_SIZE].to_vec());
        let timestamp = buffer.read_u32_be()?;
        let zero = buffer.read_u32_be()?;
        let random_data = buffer.read_bytes(RANDOM_SIZE)?;

        Ok(C0C1 {
            version,
            timestamp,
            zero,
            random_data,
        })
    }

    /// Build a fresh hello for the client side
    pub fn create_client() -> Self {
        C0C1 {
            version: RTMP_VERSION,
            timestamp: current_timestamp(),
            zero: 0,
            random_data: generate_random_bytes(RANDOM_SIZE),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = ByteBuffer::with_capacity(1 + HANDSHAKE_SIZE);
        buffer.write_u8(self.version)?;
        buffer.write_u32_be(self.timestamp)?;
        buffer.write_u32_be(self.zero)?;
        buffer.write_bytes(&self.random_data)?;
        Ok(buffer.into_vec())
    }
}
