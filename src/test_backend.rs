//! Scriptable backend and collaborators for exercising the device core

use crate::backend::{Backend, BufferGeometry, Capabilities};
use crate::config::IoDevConfig;
use crate::dsp::{DspPipeline, ExtDspModule};
use crate::error::{IoDevError, Result};
use crate::format::{AudioFormat, Direction, SampleFormat};
use crate::iodev::{Device, DeviceInfo};
use crate::monitor::DeviceMonitor;
use crate::rate_estimator::RateEstimator;
use crate::volume::VolumeCurve;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Backend whose every answer is set by the test and every call is recorded.
pub struct FakeBackend {
    pub caps: Capabilities,
    pub rates: Vec<usize>,
    pub channel_counts: Vec<usize>,
    pub formats: Vec<SampleFormat>,
    pub geometry: BufferGeometry,

    /// Level reported by `frames_queued`
    pub queued: usize,
    pub valid: usize,
    /// Frames added to every `get_buffer` answer beyond what was asked
    pub get_buffer_extra: usize,
    /// Caps every `get_buffer` answer
    pub get_buffer_limit: Option<usize>,
    /// Bytes handed out by `area`; tests preload samples here
    pub area: Vec<u8>,
    pub frame_bytes: usize,
    mapped: usize,

    pub fail_close: bool,
    pub fail_update_channel_layout: bool,
    pub fail_no_stream: bool,
    /// Next `frames_queued` reports an underrun instead of a level
    pub underrun_on_query: bool,
    pub free_running: bool,
    pub underruns: u32,
    pub severe_underruns: u32,

    pub open_calls: usize,
    pub configure_calls: usize,
    pub close_calls: usize,
    pub start_calls: usize,
    pub output_underrun_calls: usize,
    pub update_channel_layout_calls: usize,
    pub no_stream_calls: Vec<bool>,
    pub set_mute_calls: Vec<bool>,
    pub get_buffer_calls: Vec<usize>,
    pub put_buffer_calls: Vec<usize>,
    /// Bytes of every committed window, in order
    pub committed: Vec<u8>,
    pub configured_format: Option<AudioFormat>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            caps: Capabilities::default(),
            rates: Vec::new(),
            channel_counts: Vec::new(),
            formats: Vec::new(),
            geometry: BufferGeometry {
                buffer_size: 1024,
                min_buffer_level: 0,
            },
            queued: 0,
            valid: 0,
            get_buffer_extra: 0,
            get_buffer_limit: None,
            area: vec![0; 8192 * 8],
            frame_bytes: 4,
            mapped: 0,
            fail_close: false,
            fail_update_channel_layout: false,
            fail_no_stream: false,
            underrun_on_query: false,
            free_running: false,
            underruns: 0,
            severe_underruns: 0,
            open_calls: 0,
            configure_calls: 0,
            close_calls: 0,
            start_calls: 0,
            output_underrun_calls: 0,
            update_channel_layout_calls: 0,
            no_stream_calls: Vec::new(),
            set_mute_calls: Vec::new(),
            get_buffer_calls: Vec::new(),
            put_buffer_calls: Vec::new(),
            committed: Vec::new(),
            configured_format: None,
        }
    }

    pub fn with_caps(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.geometry.buffer_size = buffer_size;
        self
    }

    pub fn with_min_buffer_level(mut self, level: usize) -> Self {
        self.geometry.min_buffer_level = level;
        self
    }

    pub fn total_put(&self) -> usize {
        self.put_buffer_calls.iter().sum()
    }

    /// Committed bytes as little-endian i16 samples.
    pub fn committed_i16(&self) -> Vec<i16> {
        self.committed
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    /// Writes `samples` to the start of the area.
    pub fn preload_i16(&mut self, samples: &[i16]) {
        for (chunk, sample) in self.area.chunks_exact_mut(2).zip(samples) {
            chunk.copy_from_slice(&sample.to_le_bytes());
        }
    }
}

impl Backend for FakeBackend {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn supported_rates(&self) -> &[usize] {
        &self.rates
    }

    fn supported_channel_counts(&self) -> &[usize] {
        &self.channel_counts
    }

    fn supported_formats(&self) -> &[SampleFormat] {
        &self.formats
    }

    fn open(&mut self) -> Result<()> {
        self.open_calls += 1;
        Ok(())
    }

    fn configure(&mut self, format: &AudioFormat) -> Result<BufferGeometry> {
        self.configure_calls += 1;
        self.frame_bytes = format.frame_bytes();
        self.configured_format = Some(*format);
        Ok(self.geometry)
    }

    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        if self.fail_close {
            return Err(IoDevError::Backend("close failed".to_string()));
        }
        Ok(())
    }

    fn frames_queued(&mut self) -> Result<(usize, Instant)> {
        if std::mem::take(&mut self.underrun_on_query) {
            return Err(IoDevError::Underrun);
        }
        Ok((self.queued, Instant::now()))
    }

    fn get_buffer(&mut self, frames: usize) -> Result<usize> {
        self.get_buffer_calls.push(frames);
        let mut mapped = frames + self.get_buffer_extra;
        if let Some(limit) = self.get_buffer_limit {
            mapped = mapped.min(limit);
        }
        self.mapped = mapped;
        Ok(mapped)
    }

    fn area(&mut self) -> &mut [u8] {
        let len = (self.mapped * self.frame_bytes).min(self.area.len());
        &mut self.area[..len]
    }

    fn put_buffer(&mut self, frames: usize) -> Result<()> {
        self.put_buffer_calls.push(frames);
        let len = (frames * self.frame_bytes).min(self.area.len());
        self.committed.extend_from_slice(&self.area[..len]);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.start_calls += 1;
        Ok(())
    }

    fn no_stream(&mut self, enable: bool) -> Result<()> {
        self.no_stream_calls.push(enable);
        if self.fail_no_stream {
            return Err(IoDevError::Backend("no-stream failed".to_string()));
        }
        Ok(())
    }

    fn output_underrun(&mut self) -> Result<()> {
        self.output_underrun_calls += 1;
        Ok(())
    }

    fn is_free_running(&self) -> Result<bool> {
        Ok(self.free_running)
    }

    fn num_underruns(&self) -> Result<u32> {
        Ok(self.underruns)
    }

    fn num_severe_underruns(&self) -> Result<u32> {
        Ok(self.severe_underruns)
    }

    fn update_channel_layout(&mut self, format: &mut AudioFormat) -> Result<()> {
        self.update_channel_layout_calls += 1;
        if self.fail_update_channel_layout {
            return Err(IoDevError::Backend("no channel map".to_string()));
        }
        format.channel_layout.reverse();
        Ok(())
    }

    fn valid_frames(&mut self) -> Result<(usize, Instant)> {
        Ok((self.valid, Instant::now()))
    }

    fn set_mute(&mut self, mute: bool) -> Result<()> {
        self.set_mute_calls.push(mute);
        Ok(())
    }
}

/// Every optional operation.
pub fn all_caps() -> Capabilities {
    Capabilities {
        start: true,
        no_stream: true,
        output_underrun: true,
        is_free_running: true,
        num_underruns: true,
        num_severe_underruns: true,
        update_channel_layout: true,
        valid_frames: true,
        set_mute: true,
    }
}

pub fn stereo_s16(rate: usize) -> AudioFormat {
    AudioFormat::new(SampleFormat::I16, rate, 2)
}

/// Device at index 0 over `backend`, with its monitor.
pub fn device(direction: Direction, backend: FakeBackend) -> (Device<FakeBackend>, DeviceMonitor) {
    device_with_config(direction, backend, IoDevConfig::default())
}

pub fn device_with_config(
    direction: Direction,
    backend: FakeBackend,
    config: IoDevConfig,
) -> (Device<FakeBackend>, DeviceMonitor) {
    let _ = env_logger::builder().is_test(true).try_init();
    let monitor = DeviceMonitor::new(config.notification_queue_depth);
    let device = Device::new(
        DeviceInfo::new(0, "fake"),
        direction,
        backend,
        config,
        monitor.handle(),
    );
    (device, monitor)
}

#[derive(Debug, Default)]
pub struct RateState {
    pub rate: f64,
    pub frames_added: Vec<i64>,
    pub resets: Vec<f64>,
    pub checks: Vec<usize>,
}

/// Rate estimator reporting a fixed rate and recording what it is told.
#[derive(Clone, Default)]
pub struct FakeRateEstimator {
    pub state: Arc<Mutex<RateState>>,
}

impl FakeRateEstimator {
    pub fn with_rate(rate: f64) -> Self {
        let est = Self::default();
        est.state.lock().unwrap().rate = rate;
        est
    }
}

impl RateEstimator for FakeRateEstimator {
    fn add_frames(&mut self, frames: i64) {
        self.state.lock().unwrap().frames_added.push(frames);
    }

    fn check(&mut self, level: usize, _now: Instant) -> bool {
        self.state.lock().unwrap().checks.push(level);
        true
    }

    fn rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    fn reset(&mut self, rate: f64) {
        let mut state = self.state.lock().unwrap();
        state.resets.push(rate);
        state.rate = rate;
    }
}

/// Records the frame counts it is run over and adds a fixed offset to each byte.
#[derive(Clone, Default)]
pub struct FakeDsp {
    pub frames: Arc<Mutex<Vec<usize>>>,
    pub add: u8,
}

impl DspPipeline for FakeDsp {
    fn apply(&mut self, buf: &mut [u8], _format: &AudioFormat, frames: usize) -> Result<()> {
        self.frames.lock().unwrap().push(frames);
        for b in buf.iter_mut() {
            *b = b.wrapping_add(self.add);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeExtDsp {
    pub configured: Arc<Mutex<Vec<(usize, usize, usize)>>>,
}

impl ExtDspModule for FakeExtDsp {
    fn configure(&mut self, buffer_size: usize, num_channels: usize, rate: usize) {
        self.configured
            .lock()
            .unwrap()
            .push((buffer_size, num_channels, rate));
    }

    fn run(&mut self, _buf: &mut [u8], _format: &AudioFormat, _frames: usize) -> Result<()> {
        Ok(())
    }
}

/// Curve with explicit values at a handful of indexes and 1.0 elsewhere.
pub struct SparseCurve(pub Vec<(usize, f32)>);

impl VolumeCurve for SparseCurve {
    fn scaler(&self, volume: usize) -> f32 {
        self.0
            .iter()
            .find(|(idx, _)| *idx == volume)
            .map_or(1.0, |(_, s)| *s)
    }
}
