//! Per-stream progress through the device's current buffer window

use crate::error::{IoDevError, Result};
use crate::stream::StreamId;

#[derive(Debug, Clone, Copy)]
struct StreamOffset {
    id: StreamId,
    offset: usize,
}

/// Tracks how far into the hardware window each stream has written or read.
///
/// The device can only commit as many frames as every stream agrees on, which
/// is the minimum offset. Committing that amount rebases every offset.
#[derive(Debug)]
pub struct BufferShare {
    buf_size: usize,
    offsets: Vec<StreamOffset>,
}

impl BufferShare {
    pub fn new(buf_size: usize) -> Self {
        Self {
            buf_size,
            offsets: Vec::new(),
        }
    }

    pub fn buf_size(&self) -> usize {
        self.buf_size
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.offsets.iter().any(|o| o.id == id)
    }

    pub fn add_id(&mut self, id: StreamId) -> Result<()> {
        if self.contains(id) {
            return Err(IoDevError::InvalidArgument(format!(
                "Stream {} already tracked",
                id
            )));
        }
        self.offsets.push(StreamOffset { id, offset: 0 });
        Ok(())
    }

    pub fn rm_id(&mut self, id: StreamId) -> Result<()> {
        let pos = self
            .offsets
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| IoDevError::InvalidArgument(format!("Stream {} not tracked", id)))?;
        self.offsets.remove(pos);
        Ok(())
    }

    /// Adds `frames` to the stream's offset.
    pub fn offset_update(&mut self, id: StreamId, frames: usize) -> Result<()> {
        let entry = self
            .offsets
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| IoDevError::InvalidArgument(format!("Stream {} not tracked", id)))?;
        entry.offset += frames;
        Ok(())
    }

    /// Offset of `id`, or 0 for an unknown stream.
    pub fn id_offset(&self, id: StreamId) -> usize {
        self.offsets
            .iter()
            .find(|o| o.id == id)
            .map_or(0, |o| o.offset)
    }

    /// Returns the number of frames every stream has reached and subtracts it
    /// from each offset.
    pub fn new_write_point(&mut self) -> usize {
        let Some(min) = self.offsets.iter().map(|o| o.offset).min() else {
            return 0;
        };
        for entry in self.offsets.iter_mut() {
            entry.offset -= min;
        }
        min
    }

    pub fn max_offset(&self) -> usize {
        self.offsets.iter().map(|o| o.offset).max().unwrap_or(0)
    }
}
