use crate::{ByteBuffer, Error, Result};
use crate::chunk::encode_basic_header;
use crate::chunk::stream::{ChunkStreamStatus, ChunkStreamTable};
use crate::protocol::{RtmpHeader, RtmpPacket, DEFAULT_CHUNK_SIZE};
use crate::utils::U24_MAX;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Send side of the chunk stream: splits messages into header-compressed chunks.
pub struct ChunkWriter {
    /// Last header sent per chunk stream
    statuses: ChunkStreamTable,

    /// Current chunk size for writing
    chunk_size: usize,
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkWriter {
    /// Create new chunk writer
    pub fn new() -> Self {
        ChunkWriter {
            statuses: ChunkStreamTable::new(),
            chunk_size: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Set outgoing chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Send-side status for `cs_id`
    pub fn status(&self, cs_id: u32) -> Option<&ChunkStreamStatus> {
        self.statuses.get(cs_id)
    }

    /// Write packet as chunks
    pub async fn write_packet<W: AsyncWrite + Unpin>(
        &mut self,
        packet: &RtmpPacket,
        writer: &mut W,
    ) -> Result<()> {
        let bytes = self.encode_packet(packet)?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Encode one message as a chunk sequence and record it as the new baseline
    pub fn encode_packet(&mut self, packet: &RtmpPacket) -> Result<Vec<u8>> {
        let cs_id = packet.header.chunk_stream_id;
        let length = u32::try_from(packet.payload.len())
            .ok()
            .filter(|len| *len <= U24_MAX)
            .ok_or_else(|| Error::chunk(format!("Message too long: {} bytes", packet.payload.len())))?;
        let header = RtmpHeader {
            message_length: length,
            ..packet.header
        };

        let prev = self.statuses.get(cs_id).copied();
        let fmt = select_format(prev.as_ref(), &header);
        let status = match (fmt, prev) {
            (1 | 2, Some(prev)) => {
                let delta = header.timestamp.wrapping_sub(prev.header.timestamp);
                // 0xFFFFFF is the escape value, so it is itself sent extended (DESIGN.md, open questions)
                ChunkStreamStatus::new(header, delta, delta >= U24_MAX)
            }
            (3, Some(prev)) => ChunkStreamStatus { header, ..prev },
            _ => ChunkStreamStatus::new(header, header.timestamp, header.timestamp >= U24_MAX),
        };

        let mut out = ByteBuffer::with_capacity(packet.payload.len() + 18);
        out.write_bytes(&encode_basic_header(fmt, cs_id)?)?;

        let field = if status.extended_timestamp { U24_MAX } else { status.timestamp_delta };
        match fmt {
            0 => {
                out.write_u24_be(field)?;
                out.write_u24_be(length)?;
                out.write_u8(header.message_type)?;
                out.write_u32_le(header.message_stream_id)?;
            }
            1 => {
                out.write_u24_be(field)?;
                out.write_u24_be(length)?;
                out.write_u8(header.message_type)?;
            }
            2 => out.write_u24_be(field)?,
            _ => {}
        }
        if status.extended_timestamp {
            out.write_u32_be(status.timestamp_delta)?;
        }

        let mut pieces = packet.payload.chunks(self.chunk_size);
        if let Some(first) = pieces.next() {
            out.write_bytes(first)?;
        }
        let continuation = encode_basic_header(3, cs_id)?;
        for piece in pieces {
            out.write_bytes(&continuation)?;
            if status.extended_timestamp {
                out.write_u32_be(status.timestamp_delta)?;
            }
            out.write_bytes(piece)?;
        }

        self.statuses.update(cs_id, status);
        Ok(out.into_vec())
    }
}

/// Pick the smallest header type that lets the peer rebuild `header`
fn select_format(prev: Option<&ChunkStreamStatus>, header: &RtmpHeader) -> u8 {
    let Some(prev) = prev else {
        return 0;
    };
    // Deltas only move forward
    if prev.header.message_stream_id != header.message_stream_id
        || header.timestamp < prev.header.timestamp
    {
        return 0;
    }
    if prev.header.message_length != header.message_length
        || prev.header.message_type != header.message_type
    {
        return 1;
    }
    if header.timestamp.wrapping_sub(prev.header.timestamp) != prev.timestamp_delta {
        return 2;
    }
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MSG_TYPE_AUDIO, MSG_TYPE_VIDEO};

    fn packet(timestamp: u32, len: usize, message_type: u8, stream_id: u32) -> RtmpPacket {
        RtmpPacket::new(
            RtmpHeader::new(timestamp, 0, message_type, stream_id, 6),
            vec![0xAB; len],
        )
    }

    fn fmt_of(bytes: &[u8]) -> u8 {
        bytes[0] >> 6
    }

    #[test]
    fn test_header_type_minimality() {
        let mut writer = ChunkWriter::new();

        let first = writer.encode_packet(&packet(0, 10, MSG_TYPE_VIDEO, 1)).unwrap();
        assert_eq!(fmt_of(&first), 0);
        assert_eq!(first.len(), 1 + 11 + 10);

        // Same stream, length, type and delta
        let second = writer.encode_packet(&packet(0, 10, MSG_TYPE_VIDEO, 1)).unwrap();
        assert_eq!(fmt_of(&second), 3);
        assert_eq!(second.len(), 1 + 10);

        // Only the delta changes
        let third = writer.encode_packet(&packet(40, 10, MSG_TYPE_VIDEO, 1)).unwrap();
        assert_eq!(fmt_of(&third), 2);
        assert_eq!(third.len(), 1 + 3 + 10);

        // Same delta again
        let fourth = writer.encode_packet(&packet(80, 10, MSG_TYPE_VIDEO, 1)).unwrap();
        assert_eq!(fmt_of(&fourth), 3);

        // Length changes
        let fifth = writer.encode_packet(&packet(120, 12, MSG_TYPE_VIDEO, 1)).unwrap();
        assert_eq!(fmt_of(&fifth), 1);
        assert_eq!(fifth.len(), 1 + 7 + 12);

        // Type changes
        let sixth = writer.encode_packet(&packet(160, 12, MSG_TYPE_AUDIO, 1)).unwrap();
        assert_eq!(fmt_of(&sixth), 1);

        // Message stream changes
        let seventh = writer.encode_packet(&packet(200, 12, MSG_TYPE_AUDIO, 2)).unwrap();
        assert_eq!(fmt_of(&seventh), 0);
    }

    #[test]
    fn test_backwards_timestamp_uses_full_header() {
        let mut writer = ChunkWriter::new();
        writer.encode_packet(&packet(1000, 4, MSG_TYPE_VIDEO, 1)).unwrap();
        let bytes = writer.encode_packet(&packet(500, 4, MSG_TYPE_VIDEO, 1)).unwrap();
        assert_eq!(fmt_of(&bytes), 0);
    }

    #[test]
    fn test_continuation_chunks() {
        let mut writer = ChunkWriter::new();
        writer.set_chunk_size(4);
        let bytes = writer.encode_packet(&packet(0, 10, MSG_TYPE_VIDEO, 1)).unwrap();
        // 12 header bytes, then 4 + (1 + 4) + (1 + 2)
        assert_eq!(bytes.len(), 12 + 4 + 5 + 3);
        assert_eq!(bytes[12 + 4], 0xC6);
        assert_eq!(bytes[12 + 4 + 5], 0xC6);
    }

    #[test]
    fn test_extended_timestamp_layout() {
        let mut writer = ChunkWriter::new();
        writer.set_chunk_size(4);
        let bytes = writer.encode_packet(&packet(0x0100_0000, 6, MSG_TYPE_VIDEO, 1)).unwrap();
        assert_eq!(&bytes[1..4], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[12..16], &[0x01, 0x00, 0x00, 0x00]);
        // Continuation chunk repeats the extended field
        assert_eq!(bytes[20], 0xC6);
        assert_eq!(&bytes[21..25], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(bytes.len(), 1 + 11 + 4 + 4 + 1 + 4 + 2);
    }

    #[test]
    fn test_escape_value_is_sent_extended() {
        let mut writer = ChunkWriter::new();
        let bytes = writer.encode_packet(&packet(0x00FF_FFFF, 2, MSG_TYPE_VIDEO, 1)).unwrap();
        assert_eq!(&bytes[1..4], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[12..16], &[0x00, 0xFF, 0xFF, 0xFF]);
        assert_eq!(bytes.len(), 1 + 11 + 4 + 2);
    }

    #[test]
    fn test_timestamp_below_escape_is_inline() {
        let mut writer = ChunkWriter::new();
        let bytes = writer.encode_packet(&packet(0x00FF_FFFE, 2, MSG_TYPE_VIDEO, 1)).unwrap();
        assert_eq!(&bytes[1..4], &[0xFF, 0xFF, 0xFE]);
        assert_eq!(bytes.len(), 1 + 11 + 2);
    }

    #[test]
    fn test_rejects_invalid_chunk_stream_id() {
        let mut writer = ChunkWriter::new();
        let mut p = packet(0, 1, MSG_TYPE_VIDEO, 1);
        p.header.chunk_stream_id = 65600;
        assert!(matches!(writer.encode_packet(&p), Err(Error::Chunk(_))));
        assert!(writer.status(65600).is_none());
    }
}
