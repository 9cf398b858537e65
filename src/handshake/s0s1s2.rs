use crate::{ByteBuffer, Error, Result};
use crate::handshake::c0c1::{C0C1, HANDSHAKE_SIZE, RANDOM_SIZE, RTMP_VERSION};
use crate::utils::{current_timestamp, generate_random_bytes};

/// Server reply (S0 + S1 + S2)
#[derive(Debug, Clone)]
pub struct S0S1S2 {
    /// RTMP version (S0)
    pub version: u8,

    pub s1_timestamp: u32,
    pub s1_zero: u32,
    pub s1_random: Vec<u8>,

    /// Echo of the C1 time
    pub s2_timestamp: u32,

    /// Server time when C1 arrived
    pub s2_timestamp2: u32,

    /// Echo of the C1 random block
    pub s2_random_echo: Vec<u8>,
}

impl S0S1S2 {
    /// Answer a parsed C0+C1
    pub fn generate(c0c1: &C0C1) -> Self {
        let now = current_timestamp();
        S0S1S2 {
            version: RTMP_VERSION,
            s1_timestamp: now,
            s1_zero: 0,
            s1_random: generate_random_bytes(RANDOM_SIZE),
            s2_timestamp: c0c1.timestamp,
            s2_timestamp2: now,
            s2_random_echo: c0c1.random_data.clone(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = ByteBuffer::with_capacity(1 + HANDSHAKE_SIZE * 2);
        buffer.write_u8(self.version)?;

        buffer.write_u32_be(self.s1_timestamp)?;
        buffer.write_u32_be(self.s1_zero)?;
        buffer.write_bytes(&self.s1_random)?;

        buffer.write_u32_be(self.s2_timestamp)?;
        buffer.write_u32_be(self.s2_timestamp2)?;
        buffer.write_bytes(&self.s2_random_echo)?;
        Ok(buffer.into_vec())
    }

    /// Parse S0+S1+S2 on the client side
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 1 + HANDSHAKE_SIZE * 2 {
            return Err(Error::handshake(format!(
                "S0+S1+S2 too short: {} bytes",
                data.len()
            )));
        }

        let mut buffer = ByteBuffer::new(data.to_vec());
        let version = buffer.read_u8()?;
        if version != RTMP_VERSION {
            return Err(Error::handshake(format!("Unsupported server version: {}", version)));
        }

        Ok(S0S1S2 {
            version,
            s1_timestamp: buffer.read_u32_be()?,
            s1_zero: buffer.read_u32_be()?,
            s1_random: buffer.read_bytes(RANDOM_SIZE)?,
            s2_timestamp: buffer.read_u32_be()?,
            s2_timestamp2: buffer.read_u32_be()?,
            s2_random_echo: buffer.read_bytes(RANDOM_SIZE)?,
        })
    }
}

/// Client acknowledgement of S1
#[derive(Debug, Clone)]
pub struct C2 {
    pub timestamp: u32,
    pub timestamp2: u32,
    pub random_echo: Vec<u8>,
}

impl C2 {
    /// Echo S1 back to the server
    pub fn from_s1(s0s1s2: &S0S1S2) -> Self {
        C2 {
            timestamp: s0s1s2.s1_timestamp,
            timestamp2: current_timestamp(),
            random_echo: s0s1s2.s1_random.clone(),
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HANDSHAKE_SIZE {
            return Err(Error::handshake(format!("C2 too short: {} bytes", data.len())));
        }

        let mut buffer = ByteBuffer::new(data[..HANDSHAKE_SIZE].to_vec());
        Ok(C2 {
            timestamp: buffer.read_u32_be()?,
            timestamp2: buffer.read_u32_be()?,
            random_echo: buffer.read_bytes(RANDOM_SIZE)?,
        })
    }

    /// Whether C2 echoes the random block of S1
    pub fn matches(&self, s0s1s2: &S0S1S2) -> bool {
        self.random_echo == s0s1s2.s1_random
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = ByteBuffer::with_capacity(HANDSHAKE_SIZE);
        buffer.write_u32_be(self.timestamp)?;
        buffer.write_u32_be(self.timestamp2)?;
        buffer.write_bytes(&self.random_echo)?;
        Ok(buffer.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_flow() {
        let c0c1 = C0C1::create_client();

        let s0s1s2 = S0S1S2::generate(&c0c1);
        assert_eq!(s0s1s2.s2_timestamp, c0c1.timestamp);
        assert_eq!(s0s1s2.s2_random_echo, c0c1.random_data);

        let bytes = s0s1s2.encode().unwrap();
        assert_eq!(bytes.len(), 1 + HANDSHAKE_SIZE * 2);
        let parsed = S0S1S2::parse(&bytes).unwrap();
        assert_eq!(parsed.s1_random, s0s1s2.s1_random);

        let c2 = C2::from_s1(&parsed);
        let c2 = C2::parse(&c2.encode().unwrap()).unwrap();
        assert!(c2.matches(&s0s1s2));
    }

    #[test]
    fn test_c2_mismatch() {
        let s0s1s2 = S0S1S2::generate(&C0C1::create_client());
        let c2 = C2 {
            timestamp: 0,
            timestamp2: 0,
            random_echo: vec![0; RANDOM_SIZE],
        };
        assert!(!c2.matches(&s0s1s2));
    }
}
