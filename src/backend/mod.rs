//! Hardware backend interface
//!
//! A backend drives one concrete endpoint (an ALSA PCM, a Bluetooth link, a
//! virtual sink). The device core calls it once per callback to map a window
//! of the hardware ring buffer, fill or drain it, and commit it.
//!
//! Every backend implements the required operations. The optional ones have
//! default bodies returning [`IoDevError::UnsupportedOperation`]; a backend
//! that overrides one must also declare it in [`Backend::capabilities`] so the
//! core picks the specialised path instead of its generic fallback.

pub mod null;

use crate::error::{IoDevError, Result};
use crate::format::{AudioFormat, SampleFormat};
use std::time::Instant;

pub use null::NullBackend;

/// Ring buffer geometry reported by [`Backend::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferGeometry {
    /// Total frames the hardware buffer holds
    pub buffer_size: usize,
    /// Frames the hardware keeps queued and never plays out
    pub min_buffer_level: usize,
}

/// Which optional operations a backend implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub start: bool,
    pub no_stream: bool,
    pub output_underrun: bool,
    pub is_free_running: bool,
    pub num_underruns: bool,
    pub num_severe_underruns: bool,
    pub update_channel_layout: bool,
    pub valid_frames: bool,
    pub set_mute: bool,
}

fn unsupported(op: &str) -> IoDevError {
    IoDevError::UnsupportedOperation(format!("Backend has no {} operation", op))
}

pub trait Backend: Send {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Rates the hardware accepts, in preference order. Empty until opened.
    fn supported_rates(&self) -> &[usize];

    fn supported_channel_counts(&self) -> &[usize];

    fn supported_formats(&self) -> &[SampleFormat];

    /// Opens the hardware and refreshes the supported sets.
    fn open(&mut self) -> Result<()>;

    /// Applies the negotiated format.
    fn configure(&mut self, format: &AudioFormat) -> Result<BufferGeometry>;

    fn close(&mut self) -> Result<()>;

    /// Frames currently queued in hardware, with the time they were sampled.
    /// An output backend that detects the hardware ran dry may return
    /// [`IoDevError::Underrun`]; the device recovers and asks again.
    fn frames_queued(&mut self) -> Result<(usize, Instant)>;

    /// Maps a window of up to `frames` frames and returns its actual length.
    fn get_buffer(&mut self, frames: usize) -> Result<usize>;

    /// Bytes of the window mapped by the last [`Backend::get_buffer`].
    fn area(&mut self) -> &mut [u8];

    /// Commits `frames` frames of the mapped window.
    fn put_buffer(&mut self, frames: usize) -> Result<()>;

    fn start(&mut self) -> Result<()> {
        Err(unsupported("start"))
    }

    /// Enters or leaves the backend's own no-stream mode.
    fn no_stream(&mut self, _enable: bool) -> Result<()> {
        Err(unsupported("no_stream"))
    }

    /// Backend-specific recovery when output ran dry.
    fn output_underrun(&mut self) -> Result<()> {
        Err(unsupported("output_underrun"))
    }

    /// Whether the device keeps playing queued zeros without service.
    fn is_free_running(&self) -> Result<bool> {
        Err(unsupported("is_free_running"))
    }

    fn num_underruns(&self) -> Result<u32> {
        Err(unsupported("num_underruns"))
    }

    fn num_severe_underruns(&self) -> Result<u32> {
        Err(unsupported("num_severe_underruns"))
    }

    /// Fills in the hardware channel layout for the negotiated format.
    fn update_channel_layout(&mut self, _format: &mut AudioFormat) -> Result<()> {
        Err(unsupported("update_channel_layout"))
    }

    /// Queued frames that hold real samples rather than padding.
    fn valid_frames(&mut self) -> Result<(usize, Instant)> {
        Err(unsupported("valid_frames"))
    }

    fn set_mute(&mut self, _mute: bool) -> Result<()> {
        Err(unsupported("set_mute"))
    }
}
