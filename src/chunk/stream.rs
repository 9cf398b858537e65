use std::collections::HashMap;
use crate::protocol::{RtmpHeader, RtmpPacket};

/// Last header seen on one chunk stream, in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkStreamStatus {
    /// Full header of the most recent message
    pub header: RtmpHeader,

    /// Delta applied to produce `header.timestamp`; a type 0 header counts its
    /// absolute timestamp as the delta
    pub timestamp_delta: u32,

    /// Whether the timestamp field was escaped into an extended timestamp
    pub extended_timestamp: bool,
}

impl ChunkStreamStatus {
    pub fn new(header: RtmpHeader, timestamp_delta: u32, extended_timestamp: bool) -> Self {
        ChunkStreamStatus {
            header,
            timestamp_delta,
            extended_timestamp,
        }
    }
}

/// Per-CSID status map. Entries are created on first use and never removed.
#[derive(Debug, Default)]
pub struct ChunkStreamTable {
    statuses: HashMap<u32, ChunkStreamStatus>,
}

impl ChunkStreamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cs_id: u32) -> Option<&ChunkStreamStatus> {
        self.statuses.get(&cs_id)
    }

    pub fn update(&mut self, cs_id: u32, status: ChunkStreamStatus) {
        self.statuses.insert(cs_id, status);
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// A message whose chunks are still arriving.
#[derive(Debug)]
pub struct PartialMessage {
    header: RtmpHeader,
    payload: Vec<u8>,
}

/// Upper bound for the up-front allocation of a partial message
const INITIAL_CAPACITY_LIMIT: usize = 64 * 1024;

impl PartialMessage {
    pub fn new(header: RtmpHeader) -> Self {
        let length = header.message_length as usize;
        PartialMessage {
            header,
            payload: Vec::with_capacity(length.min(INITIAL_CAPACITY_LIMIT)),
        }
    }

    /// Bytes still missing
    pub fn remaining(&self) -> usize {
        (self.header.message_length as usize).saturating_sub(self.payload.len())
    }

    pub fn append(&mut self, data: &[u8]) {
        self.payload.extend_from_slice(data);
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    pub fn into_packet(self) -> RtmpPacket {
        RtmpPacket::new(self.header, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MSG_TYPE_VIDEO;

    #[test]
    fn test_partial_message_assembly() {
        let header = RtmpHeader::new(0, 5, MSG_TYPE_VIDEO, 1, 6);
        let mut partial = PartialMessage::new(header);
        partial.append(&[1, 2, 3]);
        assert_eq!(partial.remaining(), 2);
        assert!(!partial.is_complete());
        partial.append(&[4, 5]);
        assert!(partial.is_complete());

        let packet = partial.into_packet();
        assert_eq!(packet.payload, vec![1, 2, 3, 4, 5]);
        assert_eq!(packet.header.message_length, 5);
    }

    #[test]
    fn test_status_table() {
        let mut table = ChunkStreamTable::new();
        assert!(table.get(3).is_none());
        let status = ChunkStreamStatus::new(RtmpHeader::new(10, 0, 20, 0, 3), 10, false);
        table.update(3, status);
        assert_eq!(table.get(3), Some(&status));
        assert_eq!(table.len(), 1);
    }
}
