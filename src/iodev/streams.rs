use super::{Device, DeviceState};
use crate::backend::Backend;
use crate::buffer_share::BufferShare;
use crate::error::{IoDevError, Result};
use crate::stream::{DevStream, StreamId};

impl<B: Backend> Device<B> {
    pub fn streams(&self) -> &[DevStream] {
        &self.streams
    }

    pub fn stream(&self, id: StreamId) -> Option<&DevStream> {
        self.streams.iter().find(|s| s.id == id)
    }

    pub fn stream_mut(&mut self, id: StreamId) -> Option<&mut DevStream> {
        self.streams.iter_mut().find(|s| s.id == id)
    }

    /// Attaches a stream. Capture streams take part in scheduling at once;
    /// playback streams wait for [`Device::start_stream`] on their first fetch.
    pub fn add_stream(&mut self, stream: DevStream) -> Result<()> {
        if self.stream(stream.id).is_some() {
            return Err(IoDevError::InvalidArgument(format!(
                "Stream {} already attached to device {}",
                stream.id, self.info.idx
            )));
        }

        if self.buf_state.is_none() {
            let share = BufferShare::new(self.buffer_size);
            log::debug!(
                "Device {} tracking stream offsets over {} frames",
                self.info.idx,
                share.buf_size()
            );
            self.buf_state = Some(share);
        }

        let id = stream.id;
        log::debug!(
            "Device {} attaching stream {} (cb_threshold {})",
            self.info.idx,
            id,
            stream.cb_threshold
        );
        self.streams.push(stream);

        if !self.direction.is_output() {
            self.start_stream(id)?;
        }
        Ok(())
    }

    /// Lets an attached stream take part in scheduling.
    pub fn start_stream(&mut self, id: StreamId) -> Result<()> {
        let Some(pos) = self.streams.iter().position(|s| s.id == id) else {
            return Err(IoDevError::InvalidArgument(format!(
                "Stream {} not attached to device {}",
                id, self.info.idx
            )));
        };
        if self.streams[pos].running {
            return Ok(());
        }

        if !self.streams[pos].trigger_only {
            let buffer_size = self.buffer_size;
            self.buf_state
                .get_or_insert_with(|| BufferShare::new(buffer_size))
                .add_id(id)?;
        }

        let stream = &mut self.streams[pos];
        stream.running = true;
        let threshold = stream.cb_threshold;
        self.min_cb_level = self.min_cb_level.min(threshold);
        self.max_cb_level = self.max_cb_level.max(threshold);
        self.largest_cb_level = self.largest_cb_level.max(threshold);

        log::debug!(
            "Device {} started stream {}: min_cb_level {}, max_cb_level {}",
            self.info.idx,
            id,
            self.min_cb_level,
            self.max_cb_level
        );
        Ok(())
    }

    /// Detaches a stream, returning it, or `None` if it was not attached.
    ///
    /// The stream stays detached even if the device then fails to enter
    /// no-stream mode; the device is left in `NormalRun` and the failure is
    /// logged.
    pub fn rm_stream(&mut self, id: StreamId) -> Result<Option<DevStream>> {
        let Some(pos) = self.streams.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        let removed = self.streams.remove(pos);

        if let Some(buf_state) = self.buf_state.as_mut() {
            if buf_state.contains(id) {
                buf_state.rm_id(id)?;
            }
        }

        self.min_cb_level = self.buffer_size / 2;
        self.max_cb_level = 0;
        for stream in self.streams.iter().filter(|s| s.running) {
            self.min_cb_level = self.min_cb_level.min(stream.cb_threshold);
            self.max_cb_level = self.max_cb_level.max(stream.cb_threshold);
        }

        if self.streams.is_empty() {
            self.buf_state = None;
            if self.direction.is_output() && self.state == DeviceState::NormalRun {
                if let Err(e) = self.no_stream(true) {
                    log::error!(
                        "Device {} failed to enter no-stream after removing stream {}: {}",
                        self.info.idx,
                        id,
                        e
                    );
                }
            }
        } else {
            let earliest = self
                .streams
                .iter()
                .filter(|s| s.running)
                .filter_map(|s| s.next_cb_ts)
                .min();
            if let Some(earliest) = earliest {
                for stream in self.streams.iter_mut().filter(|s| !s.running) {
                    stream.next_cb_ts = Some(earliest);
                }
            }
        }

        log::debug!(
            "Device {} removed stream {}: {} left, min_cb_level {}, max_cb_level {}",
            self.info.idx,
            id,
            self.streams.len(),
            self.min_cb_level,
            self.max_cb_level
        );
        Ok(Some(removed))
    }

    /// Frames `id` has moved through the current window.
    pub fn stream_offset(&self, id: StreamId) -> usize {
        self.buf_state.as_ref().map_or(0, |b| b.id_offset(id))
    }

    pub fn stream_offset_update(&mut self, id: StreamId, frames: usize) -> Result<()> {
        match self.buf_state.as_mut() {
            Some(buf_state) => buf_state.offset_update(id, frames),
            None => Err(IoDevError::InvalidState(format!(
                "Device {} has no streams to update",
                self.info.idx
            ))),
        }
    }

    /// Frames every stream has reached, rebasing their offsets past them.
    pub fn new_write_point(&mut self) -> usize {
        self.buf_state.as_mut().map_or(0, |b| b.new_write_point())
    }

    pub fn max_stream_offset(&self) -> usize {
        self.buf_state.as_ref().map_or(0, |b| b.max_offset())
    }
}
