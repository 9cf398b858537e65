use crate::{Error, Result};

/// FLV sound format 10
pub const SOUND_FORMAT_AAC: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Pcm,
    Adpcm,
    Mp3,
    PcmLittleEndian,
    Nellymoser16kHz,
    Nellymoser8kHz,
    Nellymoser,
    G711ALaw,
    G711MuLaw,
    Aac,
    Speex,
    Mp38kHz,
    DeviceSpecific,
    Reserved(u8),
}

impl AudioCodec {
    /// Parse from sound format field
    pub fn from_sound_format(format: u8) -> Self {
        match format {
            0 => AudioCodec::Pcm,
            1 => AudioCodec::Adpcm,
            2 => AudioCodec::Mp3,
            3 => AudioCodec::PcmLittleEndian,
            4 => AudioCodec::Nellymoser16kHz,
            5 => AudioCodec::Nellymoser8kHz,
            6 => AudioCodec::Nellymoser,
            7 => AudioCodec::G711ALaw,
            8 => AudioCodec::G711MuLaw,
            SOUND_FORMAT_AAC => AudioCodec::Aac,
            11 => AudioCodec::Speex,
            14 => AudioCodec::Mp38kHz,
            15 => AudioCodec::DeviceSpecific,
            other => AudioCodec::Reserved(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioCodec::Pcm => "PCM",
            AudioCodec::Adpcm => "ADPCM",
            AudioCodec::Mp3 => "MP3",
            AudioCodec::PcmLittleEndian => "PCM-LE",
            AudioCodec::Nellymoser16kHz => "Nellymoser-16kHz",
            AudioCodec::Nellymoser8kHz => "Nellymoser-8kHz",
            AudioCodec::Nellymoser => "Nellymoser",
            AudioCodec::G711ALaw => "G.711-A",
            AudioCodec::G711MuLaw => "G.711-mu",
            AudioCodec::Aac => "AAC",
            AudioCodec::Speex => "Speex",
            AudioCodec::Mp38kHz => "MP3-8kHz",
            AudioCodec::DeviceSpecific => "Device",
            AudioCodec::Reserved(_) => "Reserved",
        }
    }
}

/// Leading bytes of an FLV audio tag body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTagHeader {
    /// 4 bits
    pub sound_format: u8,
    /// 2 bits
    pub sound_rate: u8,
    /// 1 bit
    pub sound_size: u8,
    /// 1 bit
    pub sound_type: u8,
    /// Present only for AAC
    pub aac_packet_type: Option<u8>,
}

impl AudioTagHeader {
    /// Split an audio payload into its tag header and the codec data after it
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8])> {
        let (&first, rest) = data
            .split_first()
            .ok_or_else(|| Error::stream("Empty audio payload"))?;

        let sound_format = first >> 4;
        let mut header = AudioTagHeader {
            sound_format,
            sound_rate: (first >> 2) & 0x03,
            sound_size: (first >> 1) & 0x01,
            sound_type: first & 0x01,
            aac_packet_type: None,
        };

        if sound_format != SOUND_FORMAT_AAC {
            return Ok((header, rest));
        }
        let (&packet_type, body) = rest
            .split_first()
            .ok_or_else(|| Error::stream("AAC audio payload missing packet type"))?;
        header.aac_packet_type = Some(packet_type);
        Ok((header, body))
    }

    pub fn encode(&self) -> Vec<u8> {
        let first = (self.sound_format << 4)
            | ((self.sound_rate & 0x03) << 2)
            | ((self.sound_size & 0x01) << 1)
            | (self.sound_type & 0x01);
        match self.aac_packet_type {
            Some(packet_type) if self.sound_format == SOUND_FORMAT_AAC => vec![first, packet_type],
            _ => vec![first],
        }
    }

    pub fn codec(&self) -> AudioCodec {
        AudioCodec::from_sound_format(self.sound_format)
    }

    /// AAC AudioSpecificConfig
    pub fn is_sequence_header(&self) -> bool {
        self.aac_packet_type == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aac() {
        let payload = [0xAF, 0x01, 0x21, 0x10];
        let (header, body) = AudioTagHeader::parse(&payload).unwrap();
        assert_eq!(header.codec(), AudioCodec::Aac);
        assert_eq!(header.sound_rate, 3);
        assert_eq!(header.sound_size, 1);
        assert_eq!(header.sound_type, 1);
        assert_eq!(header.aac_packet_type, Some(1));
        assert!(!header.is_sequence_header());
        assert_eq!(body, &[0x21, 0x10]);
        assert_eq!(header.encode(), vec![0xAF, 0x01]);
    }

    #[test]
    fn test_parse_mp3() {
        let payload = [0x2E, 0xFF, 0xFB];
        let (header, body) = AudioTagHeader::parse(&payload).unwrap();
        assert_eq!(header.codec(), AudioCodec::Mp3);
        assert_eq!(header.aac_packet_type, None);
        assert_eq!(body, &[0xFF, 0xFB]);
        assert_eq!(header.encode(), vec![0x2E]);
    }

    #[test]
    fn test_truncated() {
        assert!(AudioTagHeader::parse(&[]).is_err());
        assert!(AudioTagHeader::parse(&[0xAF]).is_err());
    }
}
