use std::collections::HashMap;
use crate::amf::amf0::{markers, Amf0Value};
use crate::{ByteBuffer, Error, Result};

pub struct Amf0Encoder {
    buffer: ByteBuffer,
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Amf0Encoder {
    pub fn new() -> Self {
        Amf0Encoder {
            buffer: ByteBuffer::with_capacity(256),
        }
    }

    /// Append one value, choosing the wire kind from the variant
    pub fn encode(&mut self, value: &Amf0Value) -> Result<()> {
        match value {
            Amf0Value::Number(n) => self.encode_number(*n),
            Amf0Value::Boolean(b) => {
                self.buffer.write_u8(markers::BOOLEAN)?;
                self.buffer.write_u8(u8::from(*b))?;
                Ok(())
            }
            Amf0Value::String(s) => self.encode_string(s),
            Amf0Value::LongString(s) => self.encode_long_string(s),
            Amf0Value::Object(obj) => {
                self.buffer.write_u8(markers::OBJECT)?;
                self.write_properties(obj)
            }
            Amf0Value::Null => Ok(self.buffer.write_u8(markers::NULL)?),
            Amf0Value::Undefined => Ok(self.buffer.write_u8(markers::UNDEFINED)?),
            Amf0Value::EcmaArray(obj) => {
                self.buffer.write_u8(markers::ECMA_ARRAY)?;
                self.buffer.write_u32_be(obj.len() as u32)?;
                self.write_properties(obj)
            }
            Amf0Value::StrictArray(arr) => {
                self.buffer.write_u8(markers::STRICT_ARRAY)?;
                self.buffer.write_u32_be(arr.len() as u32)?;
                arr.iter().try_for_each(|v| self.encode(v))
            }
            Amf0Value::Date(millis, timezone) => {
                self.buffer.write_u8(markers::DATE)?;
                self.buffer.write_f64_be(*millis)?;
                self.buffer.write_i16_be(*timezone)?;
                Ok(())
            }
        }
    }

    /// Append every value in order
    pub fn encode_all<'v>(&mut self, values: impl IntoIterator<Item = &'v Amf0Value>) -> Result<()> {
        values.into_iter().try_for_each(|v| self.encode(v))
    }

    fn encode_number(&mut self, value: f64) -> Result<()> {
        self.buffer.write_u8(markers::NUMBER)?;
        self.buffer.write_f64_be(value)?;
        Ok(())
    }

    /// Short form up to 65535 bytes, long form beyond
    fn encode_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        match u16::try_from(bytes.len()) {
            Ok(len) => {
                self.buffer.write_u8(markers::STRING)?;
                self.buffer.write_u16_be(len)?;
                self.buffer.write_bytes(bytes)?;
                Ok(())
            }
            Err(_) => self.encode_long_string(value),
        }
    }

    fn encode_long_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let len = u32::try_from(bytes.len()).map_err(|_| Error::amf_encode("String longer than 4 GiB"))?;
        self.buffer.write_u8(markers::LONG_STRING)?;
        self.buffer.write_u32_be(len)?;
        self.buffer.write_bytes(bytes)?;
        Ok(())
    }

    fn write_properties(&mut self, obj: &HashMap<String, Amf0Value>) -> Result<()> {
        for (key, value) in obj {
            if key.is_empty() {
                return Err(Error::amf_encode("Object keys must not be empty"));
            }
            let len = u16::try_from(key.len())
                .map_err(|_| Error::amf_encode(format!("Object key too long: {} bytes", key.len())))?;
            self.buffer.write_u16_be(len)?;
            self.buffer.write_bytes(key.as_bytes())?;
            self.encode(value)?;
        }
        self.buffer.write_u16_be(0)?;
        self.buffer.write_u8(markers::OBJECT_END)?;
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.into_vec()
    }
}

/// Encode a sequence of values into one AMF0 body.
pub fn encode_all(values: &[Amf0Value]) -> Result<Vec<u8>> {
    let mut encoder = Amf0Encoder::new();
    encoder.encode_all(values)?;
    Ok(encoder.into_bytes())
}
