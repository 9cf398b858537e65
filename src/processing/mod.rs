mod audio;
mod video;

pub use audio::*;
pub use video::*;

use crate::protocol::{RtmpPacket, MSG_TYPE_AUDIO, MSG_TYPE_VIDEO};
use crate::{Error, Result};

/// A media payload split into its FLV tag header and codec data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaTag<'a> {
    Audio(AudioTagHeader, &'a [u8]),
    Video(VideoTagHeader, &'a [u8]),
}

impl MediaTag<'_> {
    /// Tag header followed by the untouched body
    pub fn encode(&self) -> Vec<u8> {
        let (mut out, body) = match self {
            MediaTag::Audio(header, body) => (header.encode(), body),
            MediaTag::Video(header, body) => (header.encode(), body),
        };
        out.extend_from_slice(body);
        out
    }

    /// Codec configuration record rather than a frame
    pub fn is_sequence_header(&self) -> bool {
        match self {
            MediaTag::Audio(header, _) => header.is_sequence_header(),
            MediaTag::Video(header, _) => header.is_sequence_header(),
        }
    }

    pub fn codec_name(&self) -> &'static str {
        match self {
            MediaTag::Audio(header, _) => header.codec().name(),
            MediaTag::Video(header, _) => header.codec().name(),
        }
    }
}

/// Turns a published media message into the packet handed to viewers.
pub trait PayloadTransform: Send + Sync {
    fn transform(&self, packet: &RtmpPacket) -> Result<RtmpPacket>;
}

/// Parses the FLV tag header of each audio or video message and rebuilds the payload from it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlvTagTransform;

impl FlvTagTransform {
    pub fn decode<'a>(&self, packet: &'a RtmpPacket) -> Result<MediaTag<'a>> {
        match packet.message_type() {
            MSG_TYPE_AUDIO => {
                let (header, body) = AudioTagHeader::parse(&packet.payload)?;
                Ok(MediaTag::Audio(header, body))
            }
            MSG_TYPE_VIDEO => {
                let (header, body) = VideoTagHeader::parse(&packet.payload)?;
                Ok(MediaTag::Video(header, body))
            }
            other => Err(Error::stream(format!("Not a media message: type {}", other))),
        }
    }
}

impl PayloadTransform for FlvTagTransform {
    fn transform(&self, packet: &RtmpPacket) -> Result<RtmpPacket> {
        let payload = self.decode(packet)?.encode();
        Ok(RtmpPacket::new(packet.header, payload))
    }
}
