use crate::{Error, Result};
use crate::chunk::stream::{ChunkStreamStatus, ChunkStreamTable, PartialMessage};
use crate::protocol::{RtmpHeader, RtmpPacket, DEFAULT_CHUNK_SIZE};
use crate::utils::{u24_be, U24_MAX};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::warn;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Receive side of the chunk stream: turns chunks back into messages.
pub struct ChunkReader {
    /// Last header received per chunk stream
    statuses: ChunkStreamTable,

    /// Messages waiting for more chunks
    partials: HashMap<u32, PartialMessage>,

    /// Current chunk size for reading
    chunk_size: usize,
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_array<R, const N: usize>(reader: &mut R, what: &str) -> Result<[u8; N]>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = [0u8; N];
    reader
        .read_exact(&mut bytes)
        .await
        .map_err(|e| Error::chunk(format!("Failed to read {}: {}", what, e)))?;
    Ok(bytes)
}

impl ChunkReader {
    /// Create new chunk reader
    pub fn new() -> Self {
        ChunkReader {
            statuses: ChunkStreamTable::new(),
            partials: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Set incoming chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Drop the partially received message on `cs_id`
    pub fn abort(&mut self, cs_id: u32) -> bool {
        self.partials.remove(&cs_id).is_some()
    }

    /// Receive-side status for `cs_id`
    pub fn status(&self, cs_id: u32) -> Option<&ChunkStreamStatus> {
        self.statuses.get(cs_id)
    }

    /// Read chunks until one message is complete
    pub async fn read_message<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<RtmpPacket> {
        loop {
            if let Some(packet) = self.read_chunk(reader).await? {
                return Ok(packet);
            }
        }
    }

    /// Read next chunk from stream, returning the message it completes, if any.
    ///
    /// End of stream before the first byte of a chunk surfaces as `Error::Io`;
    /// anywhere else it is a framing error.
    pub async fn read_chunk<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<RtmpPacket>> {
        let first = reader.read_u8().await?;
        let fmt = first >> 6;
        let cs_id = match first & 0x3F {
            0 => {
                let [b] = read_array::<_, 1>(reader, "chunk stream id").await?;
                b as u32 + 64
            }
            1 => {
                let bytes = read_array::<_, 2>(reader, "chunk stream id").await?;
                bytes[0] as u32 + bytes[1] as u32 * 256 + 64
            }
            n => n as u32,
        };

        let continuing = self.partials.contains_key(&cs_id);
        let status = self.read_message_header(fmt, cs_id, continuing, reader).await?;

        if fmt != 3 && continuing {
            warn!(
                "New message header on chunk stream {} before the previous message completed, discarding it",
                cs_id
            );
            self.partials.remove(&cs_id);
        }
        self.statuses.update(cs_id, status);

        let partial = self
            .partials
            .entry(cs_id)
            .or_insert_with(|| PartialMessage::new(status.header));

        let size = partial.remaining().min(self.chunk_size);
        let mut data = vec![0u8; size];
        reader
            .read_exact(&mut data)
            .await
            .map_err(|e| Error::chunk(format!("Failed to read chunk data: {}", e)))?;
        partial.append(&data);

        if partial.is_complete() {
            Ok(self.partials.remove(&cs_id).map(PartialMessage::into_packet))
        } else {
            Ok(None)
        }
    }

    /// Read the message header for `fmt` and resolve it against the previous status
    async fn read_message_header<R: AsyncRead + Unpin>(
        &mut self,
        fmt: u8,
        cs_id: u32,
        continuing: bool,
        reader: &mut R,
    ) -> Result<ChunkStreamStatus> {
        let prev = self.statuses.get(cs_id).copied();
        let require_prev = || {
            prev.ok_or_else(|| {
                Error::chunk(format!(
                    "Type {} header on chunk stream {} without a previous header",
                    fmt, cs_id
                ))
            })
        };

        match fmt {
            0 => {
                let bytes = read_array::<_, 11>(reader, "type 0 header").await?;
                let (timestamp, extended) =
                    read_timestamp_field(reader, u24_be(&[bytes[0], bytes[1], bytes[2]])).await?;
                let header = RtmpHeader::new(
                    timestamp,
                    BigEndian::read_u24(&bytes[3..6]),
                    bytes[6],
                    LittleEndian::read_u32(&bytes[7..11]),
                    cs_id,
                );
                Ok(ChunkStreamStatus::new(header, timestamp, extended))
            }
            1 => {
                let prev = require_prev()?;
                let bytes = read_array::<_, 7>(reader, "type 1 header").await?;
                let (delta, extended) =
                    read_timestamp_field(reader, u24_be(&[bytes[0], bytes[1], bytes[2]])).await?;
                let header = RtmpHeader::new(
                    prev.header.timestamp.wrapping_add(delta),
                    BigEndian::read_u24(&bytes[3..6]),
                    bytes[6],
                    prev.header.message_stream_id,
                    cs_id,
                );
                Ok(ChunkStreamStatus::new(header, delta, extended))
            }
            2 => {
                let prev = require_prev()?;
                let bytes = read_array::<_, 3>(reader, "type 2 header").await?;
                let (delta, extended) = read_timestamp_field(reader, u24_be(&bytes)).await?;
                let header = RtmpHeader {
                    timestamp: prev.header.timestamp.wrapping_add(delta),
                    ..prev.header
                };
                Ok(ChunkStreamStatus::new(header, delta, extended))
            }
            _ => {
                let prev = require_prev()?;
                // An escaped timestamp is repeated on every type 3 chunk that follows it
                let delta = if prev.extended_timestamp {
                    BigEndian::read_u32(&read_array::<_, 4>(reader, "extended timestamp").await?)
                } else {
                    prev.timestamp_delta
                };
                if continuing {
                    return Ok(prev);
                }
                let header = RtmpHeader {
                    timestamp: prev.header.timestamp.wrapping_add(delta),
                    ..prev.header
                };
                Ok(ChunkStreamStatus::new(header, delta, prev.extended_timestamp))
            }
        }
    }
}

/// Resolve a 24-bit timestamp field, reading the extended field if it is escaped
async fn read_timestamp_field<R: AsyncRead + Unpin>(reader: &mut R, field: u32) -> Result<(u32, bool)> {
    // Always the escape; writers send 0xFFFFFF itself as an extended field (DESIGN.md)
    if field == U24_MAX {
        let bytes = read_array::<_, 4>(reader, "extended timestamp").await?;
        Ok((BigEndian::read_u32(&bytes), true))
    } else {
        Ok((field, false))
    }
}
