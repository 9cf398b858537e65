use crate::{Error, Result};
use crate::amf::{decode_all, encode_all, Amf0Value};
use crate::protocol::constants::MSG_TYPE_COMMAND_AMF3;
use crate::protocol::{RtmpHeader, RtmpPacket};

/// A NetConnection or NetStream invocation: name, transaction id, command object, arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpCommand {
    pub name: String,
    pub transaction_id: f64,
    pub command_object: Amf0Value,
    pub arguments: Vec<Amf0Value>,
}

impl RtmpCommand {
    /// Create new command with a null command object
    pub fn new(name: impl Into<String>, transaction_id: f64) -> Self {
        RtmpCommand {
            name: name.into(),
            transaction_id,
            command_object: Amf0Value::Null,
            arguments: Vec::new(),
        }
    }

    /// Append an argument
    pub fn arg(mut self, value: impl Into<Amf0Value>) -> Self {
        self.arguments.push(value.into());
        self
    }

    /// Create connect command
    pub fn connect(app: &str, tc_url: &str) -> Self {
        let mut cmd = RtmpCommand::new("connect", 1.0);
        cmd.command_object = Amf0Value::object([
            ("app", Amf0Value::from(app)),
            ("type", Amf0Value::from("nonprivate")),
            ("flashVer", Amf0Value::from("FMLE/3.0 (compatible; FMSc/1.0)")),
            ("tcUrl", Amf0Value::from(tc_url)),
        ]);
        cmd
    }

    /// Create createStream command
    pub fn create_stream(transaction_id: f64) -> Self {
        RtmpCommand::new("createStream", transaction_id)
    }

    /// Create publish command
    pub fn publish(transaction_id: f64, stream_name: &str, publish_type: &str) -> Self {
        RtmpCommand::new("publish", transaction_id)
            .arg(stream_name)
            .arg(publish_type)
    }

    /// Create play command
    pub fn play(transaction_id: f64, stream_name: &str) -> Self {
        RtmpCommand::new("play", transaction_id).arg(stream_name)
    }

    /// Create deleteStream command
    pub fn delete_stream(transaction_id: f64, stream_id: u32) -> Self {
        RtmpCommand::new("deleteStream", transaction_id).arg(stream_id as f64)
    }

    /// Create `_result` response
    pub fn result(transaction_id: f64, properties: Amf0Value, information: Amf0Value) -> Self {
        let mut cmd = RtmpCommand::new("_result", transaction_id);
        cmd.command_object = properties;
        cmd.arguments.push(information);
        cmd
    }

    /// Encode command to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut values = Vec::with_capacity(3 + self.arguments.len());
        values.push(Amf0Value::String(self.name.clone()));
        values.push(Amf0Value::Number(self.transaction_id));
        values.push(self.command_object.clone());
        values.extend(self.arguments.iter().cloned());
        encode_all(&values)
    }

    /// Encode into a command message on the given chunk and message stream
    pub fn to_packet(&self, chunk_stream_id: u32, stream_id: u32) -> Result<RtmpPacket> {
        let payload = self.encode()?;
        Ok(RtmpPacket::new(RtmpHeader::command(chunk_stream_id, stream_id), payload))
    }

    /// Decode command from an AMF0 body
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut values = decode_all(data)?.into_iter();

        let name = match values.next() {
            Some(Amf0Value::String(s)) | Some(Amf0Value::LongString(s)) => s,
            Some(other) => {
                return Err(Error::amf_decode(format!(
                    "Command name must be string, got {}",
                    other.kind()
                )));
            }
            None => return Err(Error::amf_decode("Empty command message")),
        };

        // Some peers omit the transaction id on notifications
        let transaction_id = match values.next() {
            Some(Amf0Value::Number(n)) => n,
            Some(other) => {
                return Err(Error::amf_decode(format!(
                    "Transaction ID must be number, got {}",
                    other.kind()
                )));
            }
            None => 0.0,
        };

        let command_object = values.next().unwrap_or(Amf0Value::Null);

        Ok(RtmpCommand {
            name,
            transaction_id,
            command_object,
            arguments: values.collect(),
        })
    }

    /// Decode a command message body by its type id.
    ///
    /// AMF3 command messages are accepted in their AMF0-compatible form:
    /// a leading format byte followed by AMF0 values.
    pub fn decode_message(message_type: u8, payload: &[u8]) -> Result<Self> {
        if message_type == MSG_TYPE_COMMAND_AMF3 {
            match payload.split_first() {
                Some((&0, body)) => RtmpCommand::decode(body),
                Some((format, _)) => Err(Error::amf_decode(format!(
                    "AMF3 command body format {} is not supported",
                    format
                ))),
                None => Err(Error::amf_decode("Empty command message")),
            }
        } else {
            RtmpCommand::decode(payload)
        }
    }

    /// Argument at `index` as a string
    pub fn string_arg(&self, index: usize, what: &str) -> Result<&str> {
        match self.arguments.get(index) {
            Some(value) => value.as_string().ok_or_else(|| {
                Error::amf_decode(format!(
                    "{}: expected {} to be a string, got {}",
                    self.name,
                    what,
                    value.kind()
                ))
            }),
            None => Err(Error::amf_decode(format!("{}: missing {}", self.name, what))),
        }
    }

    /// Optional string argument at `index`
    pub fn optional_string_arg(&self, index: usize, what: &str) -> Result<Option<&str>> {
        match self.arguments.get(index) {
            None => Ok(None),
            Some(value) if value.is_null() => Ok(None),
            Some(_) => self.string_arg(index, what).map(Some),
        }
    }

    /// Argument at `index` as a number
    pub fn number_arg(&self, index: usize, what: &str) -> Result<f64> {
        match self.arguments.get(index) {
            Some(value) => value.as_number().ok_or_else(|| {
                Error::amf_decode(format!(
                    "{}: expected {} to be a number, got {}",
                    self.name,
                    what,
                    value.kind()
                ))
            }),
            None => Err(Error::amf_decode(format!("{}: missing {}", self.name, what))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::*;

    #[test]
    fn test_connect_command() {
        let cmd = RtmpCommand::connect("live", "rtmp://localhost/live");
        assert_eq!(cmd.name, "connect");
        assert_eq!(cmd.transaction_id, 1.0);
        assert_eq!(
            cmd.command_object.get_property("app").and_then(|v| v.as_string()),
            Some("live")
        );
    }

    #[test]
    fn test_command_round_trip() {
        let original = RtmpCommand::publish(3.0, "cam1", "live");
        let decoded = RtmpCommand::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.string_arg(0, "stream name").unwrap(), "cam1");
        assert_eq!(decoded.optional_string_arg(1, "type").unwrap(), Some("live"));
        assert_eq!(decoded.optional_string_arg(2, "extra").unwrap(), None);
    }

    #[test]
    fn test_argument_kind_mismatch() {
        let cmd = RtmpCommand::new("publish", 3.0).arg(5.0);
        assert!(matches!(cmd.string_arg(0, "stream name"), Err(Error::AmfDecode(_))));
        assert!(cmd.number_arg(1, "stream id").is_err());
        assert_eq!(cmd.number_arg(0, "stream id").unwrap(), 5.0);
    }

    #[test]
    fn test_decode_rejects_non_string_name() {
        let body = encode_all(&[Amf0Value::Number(1.0)]).unwrap();
        assert!(RtmpCommand::decode(&body).is_err());
        assert!(RtmpCommand::decode(&[]).is_err());
    }

    #[test]
    fn test_amf3_command_body() {
        let mut body = vec![0x00];
        body.extend(RtmpCommand::create_stream(2.0).encode().unwrap());
        let cmd = RtmpCommand::decode_message(MSG_TYPE_COMMAND_AMF3, &body).unwrap();
        assert_eq!(cmd.name, "createStream");
        assert_eq!(cmd.transaction_id, 2.0);

        body[0] = 0x11;
        assert!(RtmpCommand::decode_message(MSG_TYPE_COMMAND_AMF3, &body).is_err());
    }

    #[test]
    fn test_result_packet() {
        let packet = RtmpCommand::result(2.0, Amf0Value::Null, Amf0Value::Number(1.0))
            .to_packet(5, 1)
            .unwrap();
        assert_eq!(packet.header.message_type, MSG_TYPE_COMMAND_AMF0);
        assert_eq!(packet.header.chunk_stream_id, 5);
        assert_eq!(packet.header.message_stream_id, 1);

        let decoded = RtmpCommand::decode(&packet.payload).unwrap();
        assert_eq!(decoded.name, "_result");
        assert_eq!(decoded.transaction_id, 2.0);
        assert!(decoded.command_object.is_null());
        assert_eq!(decoded.arguments, vec![Amf0Value::Number(1.0)]);
    }
}
