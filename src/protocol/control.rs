use crate::{ByteBuffer, Error, Result};
use crate::protocol::constants::*;
use crate::protocol::{RtmpHeader, RtmpPacket};
use crate::utils::U24_MAX;

/// Protocol control messages (type ids 1, 2, 3, 5, 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SetChunkSize(u32),
    Abort(u32),
    Acknowledgement(u32),
    WindowAckSize(u32),
    SetPeerBandwidth { size: u32, limit_type: u8 },
}

fn short(what: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |_| Error::protocol(format!("Truncated {} message", what))
}

impl ControlMessage {
    /// Decode a protocol control payload
    pub fn decode(message_type: u8, payload: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(payload.to_vec());
        match message_type {
            MSG_TYPE_SET_CHUNK_SIZE => {
                let raw = buffer.read_u32_be().map_err(short("set chunk size"))?;
                if raw & 0x8000_0000 != 0 {
                    return Err(Error::protocol("Chunk size with top bit set"));
                }
                if raw == 0 {
                    return Err(Error::protocol("Chunk size of zero"));
                }
                // A chunk can never exceed the largest message
                Ok(ControlMessage::SetChunkSize(raw.min(U24_MAX)))
            }
            MSG_TYPE_ABORT => Ok(ControlMessage::Abort(
                buffer.read_u32_be().map_err(short("abort"))?,
            )),
            MSG_TYPE_ACK => Ok(ControlMessage::Acknowledgement(
                buffer.read_u32_be().map_err(short("acknowledgement"))?,
            )),
            MSG_TYPE_WINDOW_ACK => Ok(ControlMessage::WindowAckSize(
                buffer.read_u32_be().map_err(short("window ack size"))?,
            )),
            MSG_TYPE_SET_PEER_BW => {
                let size = buffer.read_u32_be().map_err(short("set peer bandwidth"))?;
                let limit_type = buffer.read_u8().map_err(short("set peer bandwidth"))?;
                Ok(ControlMessage::SetPeerBandwidth { size, limit_type })
            }
            other => Err(Error::protocol(format!("Not a control message type: {}", other))),
        }
    }

    pub fn message_type(&self) -> u8 {
        match self {
            ControlMessage::SetChunkSize(_) => MSG_TYPE_SET_CHUNK_SIZE,
            ControlMessage::Abort(_) => MSG_TYPE_ABORT,
            ControlMessage::Acknowledgement(_) => MSG_TYPE_ACK,
            ControlMessage::WindowAckSize(_) => MSG_TYPE_WINDOW_ACK,
            ControlMessage::SetPeerBandwidth { .. } => MSG_TYPE_SET_PEER_BW,
        }
    }

    /// Encode onto chunk stream 2, message stream 0
    pub fn to_packet(&self) -> Result<RtmpPacket> {
        let mut buffer = ByteBuffer::with_capacity(5);
        match *self {
            ControlMessage::SetChunkSize(v)
            | ControlMessage::Abort(v)
            | ControlMessage::Acknowledgement(v)
            | ControlMessage::WindowAckSize(v) => buffer.write_u32_be(v)?,
            ControlMessage::SetPeerBandwidth { size, limit_type } => {
                buffer.write_u32_be(size)?;
                buffer.write_u8(limit_type)?;
            }
        }
        Ok(RtmpPacket::new(RtmpHeader::control(self.message_type()), buffer.into_vec()))
    }
}

/// User control events (type id 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEvent {
    StreamBegin(u32),
    StreamEof(u32),
    StreamDry(u32),
    SetBufferLength { stream_id: u32, buffer_ms: u32 },
    StreamIsRecorded(u32),
    PingRequest(u32),
    PingResponse(u32),
    Unknown(u16),
}

impl UserControlEvent {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(payload.to_vec());
        let event_type = buffer.read_u16_be().map_err(short("user control"))?;
        let mut field = || buffer.read_u32_be().map_err(short("user control"));
        Ok(match event_type {
            EVENT_STREAM_BEGIN => UserControlEvent::StreamBegin(field()?),
            EVENT_STREAM_EOF => UserControlEvent::StreamEof(field()?),
            EVENT_STREAM_DRY => UserControlEvent::StreamDry(field()?),
            EVENT_SET_BUFFER_LENGTH => {
                let stream_id = field()?;
                let buffer_ms = field()?;
                UserControlEvent::SetBufferLength { stream_id, buffer_ms }
            }
            EVENT_STREAM_IS_RECORDED => UserControlEvent::StreamIsRecorded(field()?),
            EVENT_PING_REQUEST => UserControlEvent::PingRequest(field()?),
            EVENT_PING_RESPONSE => UserControlEvent::PingResponse(field()?),
            other => UserControlEvent::Unknown(other),
        })
    }

    pub fn event_type(&self) -> u16 {
        match self {
            UserControlEvent::StreamBegin(_) => EVENT_STREAM_BEGIN,
            UserControlEvent::StreamEof(_) => EVENT_STREAM_EOF,
            UserControlEvent::StreamDry(_) => EVENT_STREAM_DRY,
            UserControlEvent::SetBufferLength { .. } => EVENT_SET_BUFFER_LENGTH,
            UserControlEvent::StreamIsRecorded(_) => EVENT_STREAM_IS_RECORDED,
            UserControlEvent::PingRequest(_) => EVENT_PING_REQUEST,
            UserControlEvent::PingResponse(_) => EVENT_PING_RESPONSE,
            UserControlEvent::Unknown(t) => *t,
        }
    }

    /// Encode onto chunk stream 2, message stream 0
    pub fn to_packet(&self) -> Result<RtmpPacket> {
        let mut buffer = ByteBuffer::with_capacity(10);
        buffer.write_u16_be(self.event_type())?;
        match *self {
            UserControlEvent::StreamBegin(v)
            | UserControlEvent::StreamEof(v)
            | UserControlEvent::StreamDry(v)
            | UserControlEvent::StreamIsRecorded(v)
            | UserControlEvent::PingRequest(v)
            | UserControlEvent::PingResponse(v) => buffer.write_u32_be(v)?,
            UserControlEvent::SetBufferLength { stream_id, buffer_ms } => {
                buffer.write_u32_be(stream_id)?;
                buffer.write_u32_be(buffer_ms)?;
            }
            UserControlEvent::Unknown(t) => {
                return Err(Error::UnsupportedEvent(t));
            }
        }
        Ok(RtmpPacket::new(RtmpHeader::control(MSG_TYPE_USER_CONTROL), buffer.into_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_packets() {
        let packet = ControlMessage::SetPeerBandwidth { size: 2500000, limit_type: PEER_BW_LIMIT_DYNAMIC }
            .to_packet()
            .unwrap();
        assert_eq!(packet.header.chunk_stream_id, CHUNK_STREAM_PROTOCOL);
        assert_eq!(packet.header.message_stream_id, 0);
        assert_eq!(packet.payload, vec![0x00, 0x26, 0x25, 0xA0, 0x02]);

        let decoded = ControlMessage::decode(packet.header.message_type, &packet.payload).unwrap();
        assert_eq!(decoded, ControlMessage::SetPeerBandwidth { size: 2500000, limit_type: 2 });
    }

    #[test]
    fn test_set_chunk_size_validation() {
        let decode = |v: u32| ControlMessage::decode(MSG_TYPE_SET_CHUNK_SIZE, &v.to_be_bytes());
        assert_eq!(decode(4096).unwrap(), ControlMessage::SetChunkSize(4096));
        assert_eq!(decode(0x7FFF_FFFF).unwrap(), ControlMessage::SetChunkSize(0xFF_FFFF));
        assert!(decode(0).is_err());
        assert!(decode(0x8000_0000).is_err());
        assert!(ControlMessage::decode(MSG_TYPE_SET_CHUNK_SIZE, &[0, 1]).is_err());
    }

    #[test]
    fn test_stream_begin_layout() {
        let packet = UserControlEvent::StreamBegin(1).to_packet().unwrap();
        assert_eq!(packet.header.message_type, MSG_TYPE_USER_CONTROL);
        assert_eq!(packet.payload, vec![0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_user_control_decode() {
        let payload = [0, 3, 0, 0, 0, 1, 0, 0, 0x0B, 0xB8];
        assert_eq!(
            UserControlEvent::decode(&payload).unwrap(),
            UserControlEvent::SetBufferLength { stream_id: 1, buffer_ms: 3000 }
        );
        assert_eq!(UserControlEvent::decode(&[0, 31]).unwrap(), UserControlEvent::Unknown(31));
        assert!(UserControlEvent::decode(&[0, 7, 0]).is_err());
    }
}
