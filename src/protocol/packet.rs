use crate::protocol::constants::*;

/// A reassembled logical message.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpPacket {
    pub header: RtmpHeader,
    pub payload: Vec<u8>,
}

impl RtmpPacket {
    /// Create new packet; the header length follows the payload
    pub fn new(mut header: RtmpHeader, payload: Vec<u8>) -> Self {
        header.message_length = payload.len() as u32;
        RtmpPacket { header, payload }
    }

    /// Get message type
    pub fn message_type(&self) -> u8 {
        self.header.message_type
    }

    /// Get message stream ID
    pub fn message_stream_id(&self) -> u32 {
        self.header.message_stream_id
    }

    /// Get timestamp
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Check if this is an audio packet
    pub fn is_audio(&self) -> bool {
        self.header.message_type == MSG_TYPE_AUDIO
    }

    /// Check if this is a video packet
    pub fn is_video(&self) -> bool {
        self.header.message_type == MSG_TYPE_VIDEO
    }

    /// Audio or video
    pub fn is_media(&self) -> bool {
        self.is_audio() || self.is_video()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpHeader {
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type: u8,
    pub message_stream_id: u32,
    pub chunk_stream_id: u32,
}

impl RtmpHeader {
    /// Create new header
    pub fn new(
        timestamp: u32,
        message_length: u32,
        message_type: u8,
        message_stream_id: u32,
        chunk_stream_id: u32,
    ) -> Self {
        RtmpHeader {
            timestamp,
            message_length,
            message_type,
            message_stream_id,
            chunk_stream_id,
        }
    }

    /// Header for protocol control and user control messages
    pub fn control(message_type: u8) -> Self {
        RtmpHeader::new(0, 0, message_type, CONTROL_STREAM_ID, CHUNK_STREAM_PROTOCOL)
    }

    /// Header for audio message
    pub fn audio(timestamp: u32, stream_id: u32) -> Self {
        RtmpHeader::new(timestamp, 0, MSG_TYPE_AUDIO, stream_id, CHUNK_STREAM_AUDIO)
    }

    /// Header for video message
    pub fn video(timestamp: u32, stream_id: u32) -> Self {
        RtmpHeader::new(timestamp, 0, MSG_TYPE_VIDEO, stream_id, CHUNK_STREAM_VIDEO)
    }

    /// Header for an AMF0 command on the given chunk and message stream
    pub fn command(chunk_stream_id: u32, stream_id: u32) -> Self {
        RtmpHeader::new(0, 0, MSG_TYPE_COMMAND_AMF0, stream_id, chunk_stream_id)
    }
}

pub fn make_audio_packet(data: Vec<u8>, timestamp: u32, stream_id: u32) -> RtmpPacket {
    RtmpPacket::new(RtmpHeader::audio(timestamp, stream_id), data)
}

pub fn make_video_packet(data: Vec<u8>, timestamp: u32, stream_id: u32) -> RtmpPacket {
    RtmpPacket::new(RtmpHeader::video(timestamp, stream_id), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_creation() {
        let header = RtmpHeader::new(1000, 0, MSG_TYPE_AUDIO, 1, CHUNK_STREAM_AUDIO);
        let packet = RtmpPacket::new(header, vec![0x01, 0x02, 0x03]);

        assert!(packet.is_audio());
        assert!(!packet.is_video());
        assert!(packet.is_media());
        assert_eq!(packet.timestamp(), 1000);
        assert_eq!(packet.message_stream_id(), 1);
        assert_eq!(packet.header.message_length, 3);
    }

    #[test]
    fn test_media_helpers_use_media_chunk_streams() {
        let audio = make_audio_packet(vec![0xAF, 0x01], 40, 1);
        let video = make_video_packet(vec![0x17, 0x01], 40, 1);
        assert_eq!(audio.header.chunk_stream_id, CHUNK_STREAM_AUDIO);
        assert_eq!(video.header.chunk_stream_id, CHUNK_STREAM_VIDEO);
        assert_eq!(RtmpHeader::control(MSG_TYPE_WINDOW_ACK).chunk_stream_id, CHUNK_STREAM_PROTOCOL);
    }
}
