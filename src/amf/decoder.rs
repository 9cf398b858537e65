use std::collections::HashMap;
use crate::amf::amf0::{markers, Amf0Value};
use crate::{ByteBuffer, Error, Result};

/// Nesting limit for objects and arrays.
const MAX_DEPTH: usize = 64;

fn truncated(what: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |_| Error::amf_decode(format!("Truncated {}", what))
}

pub struct Amf0Decoder<'a> {
    buffer: &'a mut ByteBuffer,
    depth: usize,
}

impl<'a> Amf0Decoder<'a> {
    pub fn new(buffer: &'a mut ByteBuffer) -> Self {
        Amf0Decoder { buffer, depth: 0 }
    }

    /// Check if decoder has remaining data to decode
    pub fn has_remaining(&self) -> bool {
        self.buffer.remaining() > 0
    }

    /// Decode every value up to the end of the buffer.
    ///
    /// End of input is only clean between values; running out inside one is an error.
    pub fn decode_all(&mut self) -> Result<Vec<Amf0Value>> {
        let mut values = Vec::new();
        while self.has_remaining() {
            values.push(self.decode()?);
        }
        Ok(values)
    }

    /// Decode a single value, driven by its leading marker
    pub fn decode(&mut self) -> Result<Amf0Value> {
        let marker = self.buffer.read_u8().map_err(truncated("value marker"))?;
        match marker {
            markers::NUMBER => self.read_number().map(Amf0Value::Number),
            markers::BOOLEAN => self.decode_boolean(),
            markers::STRING => self.read_short_string().map(Amf0Value::String),
            markers::OBJECT => self.nested(|d| d.read_properties().map(Amf0Value::Object)),
            markers::NULL => Ok(Amf0Value::Null),
            markers::UNDEFINED => Ok(Amf0Value::Undefined),
            markers::ECMA_ARRAY => self.nested(Self::decode_ecma_array),
            markers::STRICT_ARRAY => self.nested(Self::decode_strict_array),
            markers::DATE => self.decode_date(),
            markers::LONG_STRING => self.decode_long_string(),
            markers::AVMPLUS_OBJECT => Err(Error::amf_decode("AMF3 values are not supported")),
            _ => Err(Error::amf_decode(format!("Unsupported AMF0 marker: 0x{:02x}", marker))),
        }
    }

    fn nested<F>(&mut self, f: F) -> Result<Amf0Value>
    where
        F: FnOnce(&mut Self) -> Result<Amf0Value>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(Error::amf_decode("Value nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn read_number(&mut self) -> Result<f64> {
        self.buffer.read_f64_be().map_err(truncated("number"))
    }

    fn decode_boolean(&mut self) -> Result<Amf0Value> {
        let value = self.buffer.read_u8().map_err(truncated("boolean"))? != 0;
        Ok(Amf0Value::Boolean(value))
    }

    fn read_utf8(&mut self, len: usize, what: &str) -> Result<String> {
        let bytes = self.buffer.read_bytes(len).map_err(truncated(what))?;
        String::from_utf8(bytes)
            .map_err(|e| Error::amf_decode(format!("Invalid UTF-8 in {}: {}", what, e)))
    }

    fn read_short_string(&mut self) -> Result<String> {
        let len = self.buffer.read_u16_be().map_err(truncated("string length"))? as usize;
        self.read_utf8(len, "string")
    }

    /// Key/value pairs up to the empty key and end marker
    fn read_properties(&mut self) -> Result<HashMap<String, Amf0Value>> {
        let mut object = HashMap::new();
        loop {
            let key_len = self.buffer.read_u16_be().map_err(truncated("property name"))? as usize;
            if key_len == 0 {
                let end = self.buffer.read_u8().map_err(truncated("object end"))?;
                if end != markers::OBJECT_END {
                    return Err(Error::amf_decode(format!(
                        "Corrupt object: expected end marker, found 0x{:02x}",
                        end
                    )));
                }
                return Ok(object);
            }
            let key = self.read_utf8(key_len, "property name")?;
            let value = self.decode()?;
            object.insert(key, value);
        }
    }

    fn decode_ecma_array(&mut self) -> Result<Amf0Value> {
        // The count is advisory; the terminator is authoritative
        let _count = self.buffer.read_u32_be().map_err(truncated("array count"))?;
        self.read_properties().map(Amf0Value::EcmaArray)
    }

    fn decode_strict_array(&mut self) -> Result<Amf0Value> {
        let count = self.buffer.read_u32_be().map_err(truncated("array count"))? as usize;
        // Every element takes at least one byte
        if count > self.buffer.remaining() {
            return Err(Error::amf_decode("Truncated strict array"));
        }
        let mut array = Vec::with_capacity(count);
        for _ in 0..count {
            array.push(self.decode()?);
        }
        Ok(Amf0Value::StrictArray(array))
    }

    fn decode_date(&mut self) -> Result<Amf0Value> {
        let millis = self.read_number()?;
        let timezone = self.buffer.read_i16_be().map_err(truncated("date"))?;
        Ok(Amf0Value::Date(millis, timezone))
    }

    fn decode_long_string(&mut self) -> Result<Amf0Value> {
        let len = self.buffer.read_u32_be().map_err(truncated("long string length"))? as usize;
        self.read_utf8(len, "long string").map(Amf0Value::LongString)
    }
}

/// Decode a complete AMF0 body into its ordered values.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Amf0Value>> {
    let mut buffer = ByteBuffer::new(bytes.to_vec());
    Amf0Decoder::new(&mut buffer).decode_all()
}
