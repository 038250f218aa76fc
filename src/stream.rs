//! Client streams attached to a device

use std::time::Instant;

pub type StreamId = u32;

/// A client stream as seen by the device it is attached to.
#[derive(Debug, Clone)]
pub struct DevStream {
    pub id: StreamId,
    /// Frames the client wants per wake-up
    pub cb_threshold: usize,
    /// Set once the stream takes part in scheduling
    pub running: bool,
    /// Only wakes its client; never moves samples
    pub trigger_only: bool,
    /// When the client is next due to be serviced
    pub next_cb_ts: Option<Instant>,
    /// Frames the client currently has ready to render
    pub playback_frames: usize,
    /// Captured frames handed to this stream so far
    pub frames_consumed: u64,
}

impl DevStream {
    pub fn new(id: StreamId, cb_threshold: usize) -> Self {
        Self {
            id,
            cb_threshold,
            running: false,
            trigger_only: false,
            next_cb_ts: None,
            playback_frames: 0,
            frames_consumed: 0,
        }
    }

    pub fn trigger_only(mut self, trigger_only: bool) -> Self {
        self.trigger_only = trigger_only;
        self
    }

    pub fn next_cb_ts(mut self, ts: Instant) -> Self {
        self.next_cb_ts = Some(ts);
        self
    }

    pub fn has_data_ready(&self) -> bool {
        self.playback_frames > 0
    }
}
