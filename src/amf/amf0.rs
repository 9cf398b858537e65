use std::collections::HashMap;

/// AMF0 data types
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    Number(f64),                              // 0x00
    Boolean(bool),                            // 0x01
    String(String),                           // 0x02
    Object(HashMap<String, Amf0Value>),       // 0x03
    Null,                                     // 0x05
    Undefined,                                // 0x06
    EcmaArray(HashMap<String, Amf0Value>),    // 0x08
    StrictArray(Vec<Amf0Value>),              // 0x0A
    Date(f64, i16),                           // 0x0B
    LongString(String),                       // 0x0C
}

// AMF0 type markers
pub mod markers {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0A;
    pub const DATE: u8 = 0x0B;
    pub const LONG_STRING: u8 = 0x0C;
    /// Switch to AMF3 for the following value. Not supported.
    pub const AVMPLUS_OBJECT: u8 = 0x11;
}

/// Object encoding advertised in `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectEncoding {
    #[default]
    Amf0,
    Amf3,
}

impl ObjectEncoding {
    /// Map the numeric `objectEncoding` field. Unknown values fall back to AMF0.
    pub fn from_number(value: f64) -> Self {
        if value == 3.0 {
            ObjectEncoding::Amf3
        } else {
            ObjectEncoding::Amf0
        }
    }

    pub fn as_number(&self) -> f64 {
        match self {
            ObjectEncoding::Amf0 => 0.0,
            ObjectEncoding::Amf3 => 3.0,
        }
    }
}

impl Amf0Value {
    /// Build an object from key/value pairs
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Amf0Value)>,
    {
        Amf0Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a string value
    pub fn string(value: impl Into<String>) -> Self {
        Amf0Value::String(value.into())
    }

    /// Extract number value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract string reference
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) | Amf0Value::LongString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract boolean value
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract object reference
    pub fn as_object(&self) -> Option<&HashMap<String, Amf0Value>> {
        match self {
            Amf0Value::Object(obj) | Amf0Value::EcmaArray(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get property from object
    pub fn get_property(&self, key: &str) -> Option<&Amf0Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Check if null or undefined
    pub fn is_null(&self) -> bool {
        matches!(self, Amf0Value::Null | Amf0Value::Undefined)
    }

    /// Short kind name for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Amf0Value::Number(_) => "number",
            Amf0Value::Boolean(_) => "boolean",
            Amf0Value::String(_) => "string",
            Amf0Value::Object(_) => "object",
            Amf0Value::Null => "null",
            Amf0Value::Undefined => "undefined",
            Amf0Value::EcmaArray(_) => "ecma array",
            Amf0Value::StrictArray(_) => "strict array",
            Amf0Value::Date(..) => "date",
            Amf0Value::LongString(_) => "long string",
        }
    }
}

impl From<f64> for Amf0Value {
    fn from(value: f64) -> Self {
        Amf0Value::Number(value)
    }
}

impl From<bool> for Amf0Value {
    fn from(value: bool) -> Self {
        Amf0Value::Boolean(value)
    }
}

impl From<&str> for Amf0Value {
    fn from(value: &str) -> Self {
        Amf0Value::String(value.to_string())
    }
}

impl From<String> for Amf0Value {
    fn from(value: String) -> Self {
        Amf0Value::String(value)
    }
}
