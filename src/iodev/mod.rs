//! The device core
//!
//! A [`Device`] owns one endpoint in one direction. It is driven from a single
//! audio thread: once per callback the thread asks how long it may sleep,
//! fetches or renders samples through the backend, and lets the device apply
//! gain, ramps and DSP on the way. Anything that must happen on another thread
//! (reopening the device, republishing mute state) is posted to the
//! [`DeviceMonitor`](crate::monitor::DeviceMonitor) instead.
//!
//! The implementation is split by concern:
//! - `state`: open/close/start and the run-state machine
//! - `streams`: stream attachment and callback-level bookkeeping
//! - `output` / `input`: the per-callback buffer paths
//! - `wake`: sleep scheduling and rate tracking
//! - `ramp`: gain ramp presets
//! - `recovery`: underruns and reset requests

mod input;
mod output;
mod ramp;
mod recovery;
mod state;
mod streams;
mod wake;

pub use ramp::RampRequest;
pub use wake::fill_time_from_frames;

use crate::backend::Backend;
use crate::buffer_share::BufferShare;
use crate::config::IoDevConfig;
use crate::dsp::{DspContext, ExtDspModule};
use crate::error::{IoDevError, Result};
use crate::events::IoDevEvent;
use crate::format::{AudioFormat, Direction};
use crate::loopback::Loopback;
use crate::monitor::MonitorHandle;
use crate::ramp::Ramp;
use crate::rate_estimator::RateEstimator;
use crate::stream::DevStream;
use crate::volume::ActiveNode;
use std::time::Instant;

/// Run state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Closed,
    /// Opened but not yet started; waiting for the first samples
    Open,
    /// Streams are feeding the device
    NormalRun,
    /// Open with nothing to play; the device is kept fed with silence
    NoStreamRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub idx: u32,
    pub name: String,
}

impl DeviceInfo {
    pub fn new(idx: u32, name: impl Into<String>) -> Self {
        Self {
            idx,
            name: name.into(),
        }
    }
}

/// Called with the device index around the backend close.
pub type CloseHook = Box<dyn FnMut(u32) + Send>;

pub struct Device<B: Backend> {
    info: DeviceInfo,
    direction: Direction,
    config: IoDevConfig,
    backend: B,
    monitor: MonitorHandle,

    state: DeviceState,
    format: Option<AudioFormat>,
    buffer_size: usize,
    min_buffer_level: usize,
    min_cb_level: usize,
    max_cb_level: usize,
    largest_cb_level: usize,
    highest_hw_level: usize,
    open_ts: Option<Instant>,

    streams: Vec<DevStream>,
    buf_state: Option<BufferShare>,

    ramp: Option<Ramp>,
    active_node: Option<ActiveNode>,
    software_volume_needed: bool,

    dsp: Option<DspContext>,
    ext_dsp: Option<Box<dyn ExtDspModule>>,
    rate_est: Option<Box<dyn RateEstimator>>,
    loopbacks: Vec<Loopback>,
    pre_close_hooks: Vec<CloseHook>,
    post_close_hooks: Vec<CloseHook>,

    input_frames_read: usize,
    input_dsp_offset: usize,

    reset_request_pending: bool,
    num_underruns: u32,
    last_severe_underruns: u32,
}

impl<B: Backend> Device<B> {
    pub fn new(
        info: DeviceInfo,
        direction: Direction,
        backend: B,
        config: IoDevConfig,
        monitor: MonitorHandle,
    ) -> Self {
        let ramp = config.enable_ramp.then(Ramp::new);
        Self {
            info,
            direction,
            config,
            backend,
            monitor,
            state: DeviceState::Closed,
            format: None,
            buffer_size: 0,
            min_buffer_level: 0,
            min_cb_level: 0,
            max_cb_level: 0,
            largest_cb_level: 0,
            highest_hw_level: 0,
            open_ts: None,
            streams: Vec::new(),
            buf_state: None,
            ramp,
            active_node: None,
            software_volume_needed: false,
            dsp: None,
            ext_dsp: None,
            rate_est: None,
            loopbacks: Vec::new(),
            pre_close_hooks: Vec::new(),
            post_close_hooks: Vec::new(),
            input_frames_read: 0,
            input_dsp_offset: 0,
            reset_request_pending: false,
            num_underruns: 0,
            last_severe_underruns: 0,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != DeviceState::Closed
    }

    /// Negotiated format; `None` while closed.
    pub fn format(&self) -> Option<&AudioFormat> {
        self.format.as_ref()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn min_buffer_level(&self) -> usize {
        self.min_buffer_level
    }

    pub fn min_cb_level(&self) -> usize {
        self.min_cb_level
    }

    pub fn max_cb_level(&self) -> usize {
        self.max_cb_level
    }

    pub fn largest_cb_level(&self) -> usize {
        self.largest_cb_level
    }

    pub fn highest_hw_level(&self) -> usize {
        self.highest_hw_level
    }

    pub fn open_ts(&self) -> Option<Instant> {
        self.open_ts
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn ramp(&self) -> Option<&Ramp> {
        self.ramp.as_ref()
    }

    pub fn active_node(&self) -> Option<&ActiveNode> {
        self.active_node.as_ref()
    }

    pub fn set_active_node(&mut self, node: Option<ActiveNode>) {
        log::debug!("Device {} active node: {:?}", self.info.idx, node);
        self.active_node = node;
    }

    /// Marks the whole device as needing software volume, whatever the node says.
    pub fn set_software_volume_needed(&mut self, needed: bool) {
        self.software_volume_needed = needed;
    }

    pub fn set_dsp_context(&mut self, dsp: Option<DspContext>) {
        self.dsp = dsp;
    }

    pub fn dsp_context(&self) -> Option<&DspContext> {
        self.dsp.as_ref()
    }

    /// Frames of latency added by the DSP pipeline.
    pub fn dsp_delay(&self) -> usize {
        self.dsp.as_ref().map_or(0, |dsp| dsp.delay())
    }

    /// Attaches an external processing stage; it is configured immediately if
    /// the device is open, and again on every open.
    pub fn set_ext_dsp_module(&mut self, module: Option<Box<dyn ExtDspModule>>) {
        self.ext_dsp = module;
        self.configure_ext_dsp();
    }

    pub fn set_rate_estimator(&mut self, estimator: Option<Box<dyn RateEstimator>>) {
        self.rate_est = estimator;
    }

    pub fn add_loopback(&mut self, loopback: Loopback) {
        self.loopbacks.push(loopback);
    }

    pub fn add_pre_close_hook(&mut self, hook: CloseHook) {
        self.pre_close_hooks.push(hook);
    }

    pub fn add_post_close_hook(&mut self, hook: CloseHook) {
        self.post_close_hooks.push(hook);
    }

    fn configure_ext_dsp(&mut self) {
        let Some(format) = self.format.filter(|_| self.is_open()) else {
            return;
        };
        if let Some(module) = self.ext_dsp.as_mut() {
            module.configure(self.buffer_size, format.num_channels, format.frame_rate);
        }
    }

    /// Format of an open device, or `InvalidState`.
    fn open_format(&self) -> Result<AudioFormat> {
        self.format
            .filter(|_| self.is_open())
            .ok_or_else(|| IoDevError::InvalidState(format!("Device {} is not open", self.info.idx)))
    }

    fn require_direction(&self, direction: Direction, op: &str) -> Result<()> {
        if self.direction == direction {
            Ok(())
        } else {
            Err(IoDevError::InvalidArgument(format!(
                "{} is not valid on a {:?} device",
                op, self.direction
            )))
        }
    }

    /// Posts an event to the control thread. Delivery failure is logged, not
    /// propagated, since the audio thread has no way to act on it.
    fn notify(&self, event: IoDevEvent) {
        if let Err(e) = self.monitor.notify(event) {
            log::error!("Device {}: {}", self.info.idx, e);
        }
    }
}

impl<B: Backend> std::fmt::Debug for Device<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("info", &self.info)
            .field("direction", &self.direction)
            .field("state", &self.state)
            .field("format", &self.format)
            .field("buffer_size", &self.buffer_size)
            .field("min_cb_level", &self.min_cb_level)
            .field("max_cb_level", &self.max_cb_level)
            .field("streams", &self.streams.len())
            .finish()
    }
}
