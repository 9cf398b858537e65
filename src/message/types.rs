use crate::protocol::constants::*;
use crate::protocol::RtmpPacket;

/// Coarse routing class of an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Protocol control messages (1, 2, 3, 5, 6)
    Control(ControlType),

    /// User control events (4)
    UserControl,

    Audio,
    Video,

    /// Command (AMF0, or AMF3 with a leading format byte)
    Command,

    /// Data (AMF0, or AMF3 with a leading format byte)
    Data,

    Aggregate,

    /// Shared object (AMF0/AMF3)
    SharedObject,

    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    SetChunkSize,
    Abort,
    Acknowledgement,
    WindowAcknowledgement,
    SetPeerBandwidth,
}

impl MessageType {
    /// Classify a message type id
    pub fn from_id(id: u8) -> Self {
        match id {
            MSG_TYPE_SET_CHUNK_SIZE => MessageType::Control(ControlType::SetChunkSize),
            MSG_TYPE_ABORT => MessageType::Control(ControlType::Abort),
            MSG_TYPE_ACK => MessageType::Control(ControlType::Acknowledgement),
            MSG_TYPE_WINDOW_ACK => MessageType::Control(ControlType::WindowAcknowledgement),
            MSG_TYPE_SET_PEER_BW => MessageType::Control(ControlType::SetPeerBandwidth),
            MSG_TYPE_USER_CONTROL => MessageType::UserControl,
            MSG_TYPE_AUDIO => MessageType::Audio,
            MSG_TYPE_VIDEO => MessageType::Video,
            MSG_TYPE_COMMAND_AMF0 | MSG_TYPE_COMMAND_AMF3 => MessageType::Command,
            MSG_TYPE_DATA_AMF0 | MSG_TYPE_DATA_AMF3 => MessageType::Data,
            MSG_TYPE_AGGREGATE => MessageType::Aggregate,
            MSG_TYPE_SHARED_OBJECT_AMF0 | MSG_TYPE_SHARED_OBJECT_AMF3 => MessageType::SharedObject,
            _ => MessageType::Unknown(id),
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, MessageType::Control(_) | MessageType::UserControl)
    }

    pub fn is_media(&self) -> bool {
        matches!(self, MessageType::Audio | MessageType::Video)
    }
}

/// Classify a reassembled packet
pub fn classify_message(packet: &RtmpPacket) -> MessageType {
    MessageType::from_id(packet.message_type())
}
