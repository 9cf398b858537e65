use std::io::{Cursor, Result as IoResult, Error as IoError, ErrorKind};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

/// Largest value a 24-bit header field can carry.
pub const U24_MAX: u32 = 0x00FF_FFFF;

/// Decode a big-endian 24-bit unsigned field.
pub fn u24_be(bytes: &[u8; 3]) -> u32 {
    BigEndian::read_u24(bytes)
}

/// Decode a big-endian 24-bit two's complement field.
pub fn i24_be(bytes: &[u8; 3]) -> i32 {
    BigEndian::read_i24(bytes)
}

/// Encode `value` as a big-endian 24-bit two's complement field.
pub fn put_i24_be(value: i32) -> [u8; 3] {
    let mut out = [0u8; 3];
    BigEndian::write_i24(&mut out, value.clamp(-0x80_0000, 0x7F_FFFF));
    out
}

/// Cursor over an owned byte vector, reading from the front and appending on write.
pub struct ByteBuffer {
    buffer: Vec<u8>,
    cursor: usize,
}

fn short_read() -> IoError {
    IoError::new(ErrorKind::UnexpectedEof, "Not enough bytes")
}

impl ByteBuffer {
    /// Create a new ByteBuffer from bytes
    pub fn new(data: Vec<u8>) -> Self {
        ByteBuffer {
            buffer: data,
            cursor: 0,
        }
    }

    /// Create an empty ByteBuffer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        ByteBuffer {
            buffer: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Get current cursor position
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Set cursor position
    pub fn set_position(&mut self, pos: usize) -> IoResult<()> {
        if pos > self.buffer.len() {
            return Err(IoError::new(ErrorKind::InvalidInput, "Position out of bounds"));
        }
        self.cursor = pos;
        Ok(())
    }

    /// Get remaining bytes from current position
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Check if buffer has at least n bytes remaining
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Read bytes into buffer
    pub fn read_bytes(&mut self, len: usize) -> IoResult<Vec<u8>> {
        if !self.has_remaining(len) {
            return Err(short_read());
        }
        let bytes = self.buffer[self.cursor..self.cursor + len].to_vec();
        self.cursor += len;
        Ok(bytes)
    }

    /// Write bytes to buffer
    pub fn write_bytes(&mut self, data: &[u8]) -> IoResult<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Peek at the next byte without consuming it
    pub fn peek_u8(&self) -> Option<u8> {
        self.buffer.get(self.cursor).copied()
    }

    /// Read u8
    pub fn read_u8(&mut self) -> IoResult<u8> {
        let value = self.peek_u8().ok_or_else(short_read)?;
        self.cursor += 1;
        Ok(value)
    }

    /// Write u8
    pub fn write_u8(&mut self, value: u8) -> IoResult<()> {
        self.buffer.push(value);
        Ok(())
    }

    /// Read u16 (big endian)
    pub fn read_u16_be(&mut self) -> IoResult<u16> {
        if !self.has_remaining(2) {
            return Err(short_read());
        }
        let mut cursor = Cursor::new(&self.buffer[self.cursor..]);
        let value = cursor.read_u16::<BigEndian>()?;
        self.cursor += 2;
        Ok(value)
    }

    /// Write u16 (big endian)
    pub fn write_u16_be(&mut self, value: u16) -> IoResult<()> {
        self.buffer.write_u16::<BigEndian>(value)
    }

    /// Read i16 (big endian)
    pub fn read_i16_be(&mut self) -> IoResult<i16> {
        if !self.has_remaining(2) {
            return Err(short_read());
        }
        let mut cursor = Cursor::new(&self.buffer[self.cursor..]);
        let value = cursor.read_i16::<BigEndian>()?;
        self.cursor += 2;
        Ok(value)
    }

    /// Write i16 (big endian)
    pub fn write_i16_be(&mut self, value: i16) -> IoResult<()> {
        self.buffer.write_i16::<BigEndian>(value)
    }

    /// Read u24 (big endian)
    pub fn read_u24_be(&mut self) -> IoResult<u32> {
        if !self.has_remaining(3) {
            return Err(short_read());
        }
        let mut cursor = Cursor::new(&self.buffer[self.cursor..]);
        let value = cursor.read_u24::<BigEndian>()?;
        self.cursor += 3;
        Ok(value)
    }

    /// Write the low 24 bits of value (big endian)
    pub fn write_u24_be(&mut self, value: u32) -> IoResult<()> {
        self.buffer.write_u24::<BigEndian>(value & U24_MAX)
    }

    /// Read u32 (big endian)
    pub fn read_u32_be(&mut self) -> IoResult<u32> {
        if !self.has_remaining(4) {
            return Err(short_read());
        }
        let mut cursor = Cursor::new(&self.buffer[self.cursor..]);
        let value = cursor.read_u32::<BigEndian>()?;
        self.cursor += 4;
        Ok(value)
    }

    /// Write u32 (big endian)
    pub fn write_u32_be(&mut self, value: u32) -> IoResult<()> {
        self.buffer.write_u32::<BigEndian>(value)
    }

    /// Read u32 (little endian), used by message stream ids
    pub fn read_u32_le(&mut self) -> IoResult<u32> {
        if !self.has_remaining(4) {
            return Err(short_read());
        }
        let mut cursor = Cursor::new(&self.buffer[self.cursor..]);
        let value = cursor.read_u32::<LittleEndian>()?;
        self.cursor += 4;
        Ok(value)
    }

    /// Write u32 (little endian)
    pub fn write_u32_le(&mut self, value: u32) -> IoResult<()> {
        self.buffer.write_u32::<LittleEndian>(value)
    }

    /// Read f64 (big endian)
    pub fn read_f64_be(&mut self) -> IoResult<f64> {
        if !self.has_remaining(8) {
            return Err(short_read());
        }
        let mut cursor = Cursor::new(&self.buffer[self.cursor..]);
        let value = cursor.read_f64::<BigEndian>()?;
        self.cursor += 8;
        Ok(value)
    }

    /// Write f64 (big endian)
    pub fn write_f64_be(&mut self, value: f64) -> IoResult<()> {
        self.buffer.write_f64::<BigEndian>(value)
    }

    /// Consume the buffer, returning the underlying bytes
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    /// Get slice of underlying buffer
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get length of buffer
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_u8() {
        let mut buffer = ByteBuffer::with_capacity(10);
        buffer.write_u8(0x42).unwrap();
        buffer.write_u8(0x84).unwrap();

        buffer.set_position(0).unwrap();
        assert_eq!(buffer.read_u8().unwrap(), 0x42);
        assert_eq!(buffer.read_u8().unwrap(), 0x84);
    }

    #[test]
    fn test_u24_and_little_endian() {
        let mut buffer = ByteBuffer::with_capacity(16);
        buffer.write_u24_be(0x123456).unwrap();
        buffer.write_u32_le(1).unwrap();
        assert_eq!(&buffer.as_slice()[..7], &[0x12, 0x34, 0x56, 0x01, 0x00, 0x00, 0x00]);

        assert_eq!(buffer.read_u24_be().unwrap(), 0x123456);
        assert_eq!(buffer.read_u32_le().unwrap(), 1);
        assert!(!buffer.has_remaining(1));
    }

    #[test]
    fn test_u24_free_functions() {
        assert_eq!(u24_be(&[0x00, 0x01, 0x00]), 256);
        assert_eq!(i24_be(&put_i24_be(-40)), -40);
        assert_eq!(i24_be(&[0xFF, 0xFF, 0xFF]), -1);
    }

    #[test]
    fn test_remaining_bytes() {
        let data = vec![1, 2, 3, 4, 5];
        let mut buffer = ByteBuffer::new(data);

        assert_eq!(buffer.remaining(), 5);
        buffer.read_u8().unwrap();
        assert_eq!(buffer.remaining(), 4);
        assert_eq!(buffer.read_bytes(2).unwrap(), vec![2, 3]);
        assert_eq!(buffer.remaining(), 2);
    }

    #[test]
    fn test_boundary_checks() {
        let data = vec![1, 2];
        let mut buffer = ByteBuffer::new(data);

        assert!(buffer.read_u16_be().is_ok());
        assert!(buffer.read_u32_be().is_err());
        assert!(buffer.read_u8().is_err());
        assert!(buffer.read_bytes(1).is_err());
    }
}
