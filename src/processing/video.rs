use crate::utils::{i24_be, put_i24_be};
use crate::{Error, Result};

/// FLV codec id 7
pub const CODEC_ID_AVC: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// Sorenson H.263
    H263,
    ScreenVideo,
    /// On2 VP6
    Vp6,
    Vp6Alpha,
    ScreenVideo2,
    /// H.264 AVC
    H264,
    Unknown(u8),
}

impl VideoCodec {
    pub fn from_codec_id(id: u8) -> Self {
        match id {
            2 => VideoCodec::H263,
            3 => VideoCodec::ScreenVideo,
            4 => VideoCodec::Vp6,
            5 => VideoCodec::Vp6Alpha,
            6 => VideoCodec::ScreenVideo2,
            CODEC_ID_AVC => VideoCodec::H264,
            _ => VideoCodec::Unknown(id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::H263 => "H.263",
            VideoCodec::ScreenVideo => "Screen",
            VideoCodec::Vp6 => "VP6",
            VideoCodec::Vp6Alpha => "VP6-Alpha",
            VideoCodec::ScreenVideo2 => "Screen-v2",
            VideoCodec::H264 => "H.264",
            VideoCodec::Unknown(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Keyframe,
    InterFrame,
    DisposableInterFrame,
    GeneratedKeyframe,
    VideoInfo,
    Reserved(u8),
}

impl FrameType {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => FrameType::Keyframe,
            2 => FrameType::InterFrame,
            3 => FrameType::DisposableInterFrame,
            4 => FrameType::GeneratedKeyframe,
            5 => FrameType::VideoInfo,
            other => FrameType::Reserved(other),
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, FrameType::Keyframe | FrameType::GeneratedKeyframe)
    }
}

/// Leading bytes of an FLV video tag body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTagHeader {
    /// 4 bits
    pub frame_type: u8,
    /// 4 bits
    pub codec_id: u8,
    /// Present only for AVC
    pub avc_packet_type: Option<u8>,
    /// Signed 24-bit offset, AVC only
    pub composition_time: i32,
}

impl VideoTagHeader {
    /// Split a video payload into its tag header and the codec data after it
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8])> {
        let (&first, rest) = data
            .split_first()
            .ok_or_else(|| Error::stream("Empty video payload"))?;

        let codec_id = first & 0x0F;
        let mut header = VideoTagHeader {
            frame_type: first >> 4,
            codec_id,
            avc_packet_type: None,
            composition_time: 0,
        };

        if codec_id != CODEC_ID_AVC {
            return Ok((header, rest));
        }
        if rest.len() < 4 {
            return Err(Error::stream(format!(
                "AVC video payload too short: {} bytes",
                data.len()
            )));
        }
        header.avc_packet_type = Some(rest[0]);
        header.composition_time = i24_be(&[rest[1], rest[2], rest[3]]);
        Ok((header, &rest[4..]))
    }

    pub fn encode(&self) -> Vec<u8> {
        let first = (self.frame_type << 4) | (self.codec_id & 0x0F);
        match self.avc_packet_type {
            Some(packet_type) if self.codec_id == CODEC_ID_AVC => {
                let mut out = vec![first, packet_type];
                out.extend_from_slice(&put_i24_be(self.composition_time));
                out
            }
            _ => vec![first],
        }
    }

    pub fn codec(&self) -> VideoCodec {
        VideoCodec::from_codec_id(self.codec_id)
    }

    pub fn frame(&self) -> FrameType {
        FrameType::from_bits(self.frame_type)
    }

    /// AVCDecoderConfigurationRecord
    pub fn is_sequence_header(&self) -> bool {
        self.avc_packet_type == Some(0)
    }
}
