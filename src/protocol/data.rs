use crate::{Error, Result};
use crate::amf::{decode_all, encode_all, Amf0Value};
use crate::protocol::constants::MSG_TYPE_DATA_AMF3;
use std::collections::HashMap;

/// A data message such as `@setDataFrame` or `onMetaData`.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpData {
    pub data_type: String,
    pub values: Vec<Amf0Value>,
}

impl RtmpData {
    /// Create onMetaData message
    pub fn on_metadata(metadata: HashMap<String, Amf0Value>) -> Self {
        RtmpData {
            data_type: "onMetaData".to_string(),
            values: vec![Amf0Value::EcmaArray(metadata)],
        }
    }

    /// Encode data message to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut values = Vec::with_capacity(1 + self.values.len());
        values.push(Amf0Value::String(self.data_type.clone()));
        values.extend(self.values.iter().cloned());
        encode_all(&values)
    }

    /// Decode data message from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut values = decode_all(data)?;
        if values.is_empty() {
            return Err(Error::amf_decode("Empty data message"));
        }
        let data_type = match values.remove(0) {
            Amf0Value::String(s) | Amf0Value::LongString(s) => s,
            other => {
                return Err(Error::amf_decode(format!(
                    "Data type must be string, got {}",
                    other.kind()
                )));
            }
        };
        Ok(RtmpData { data_type, values })
    }

    /// Decode by message type; AMF3 data carries a leading format byte
    pub fn decode_message(message_type: u8, payload: &[u8]) -> Result<Self> {
        if message_type == MSG_TYPE_DATA_AMF3 {
            RtmpData::decode(payload.get(1..).unwrap_or_default())
        } else {
            RtmpData::decode(payload)
        }
    }

    /// Metadata object carried by `onMetaData` or `@setDataFrame onMetaData`
    pub fn metadata(&self) -> Option<&HashMap<String, Amf0Value>> {
        match self.data_type.as_str() {
            "onMetaData" => self.values.first().and_then(|v| v.as_object()),
            "@setDataFrame" => match self.values.first().and_then(|v| v.as_string()) {
                Some("onMetaData") => self.values.get(1).and_then(|v| v.as_object()),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_round_trip() {
        let mut meta = HashMap::new();
        meta.insert("width".to_string(), Amf0Value::Number(1920.0));
        let data = RtmpData::on_metadata(meta);
        let decoded = RtmpData::decode(&data.encode().unwrap()).unwrap();
        assert_eq!(decoded, data);
        assert_eq!(
            decoded.metadata().and_then(|m| m.get("width")).and_then(|v| v.as_number()),
            Some(1920.0)
        );
    }

    #[test]
    fn test_set_data_frame_metadata() {
        let body = encode_all(&[
            Amf0Value::string("@setDataFrame"),
            Amf0Value::string("onMetaData"),
            Amf0Value::object([("fps", Amf0Value::Number(30.0))]),
        ])
        .unwrap();
        let data = RtmpData::decode(&body).unwrap();
        assert!(data.metadata().is_some_and(|m| m.contains_key("fps")));
    }

    #[test]
    fn test_rejects_non_string_type() {
        let body = encode_all(&[Amf0Value::Null]).unwrap();
        assert!(RtmpData::decode(&body).is_err());
        assert!(RtmpData::decode(&[]).is_err());
    }
}
