use crate::protocol::CONTROL_STREAM_ID;
use crate::{Error, Result};

/// Message stream ids allocated on a connection, strictly increasing.
///
/// The control stream 0 is always first and is never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIds {
    ids: Vec<u32>,
}

impl Default for StreamIds {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamIds {
    pub fn new() -> Self {
        StreamIds {
            ids: vec![CONTROL_STREAM_ID],
        }
    }

    /// Allocate the largest id plus one
    pub fn allocate(&mut self) -> Result<u32> {
        let last = self.ids.last().copied().unwrap_or(CONTROL_STREAM_ID);
        let next = last
            .checked_add(1)
            .ok_or_else(|| Error::stream("Message stream ids exhausted"))?;
        self.ids.push(next);
        Ok(next)
    }

    /// Remove `id`; false if it was never allocated or is the control stream
    pub fn remove(&mut self, id: u32) -> bool {
        if id == CONTROL_STREAM_ID {
            return false;
        }
        match self.ids.binary_search(&id) {
            Ok(index) => {
                self.ids.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    pub fn only_control_remains(&self) -> bool {
        self.ids.len() <= 1
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.ids
    }
}
