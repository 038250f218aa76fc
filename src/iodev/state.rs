use super::ramp::RampRequest;
use super::{Device, DeviceState};
use crate::backend::Backend;
use crate::error::{IoDevError, Result};
use crate::format::{AudioFormat, Direction};
use crate::negotiate;
use crate::volume::SystemState;
use std::time::Instant;

impl<B: Backend> Device<B> {
    /// Opens the device for a first stream wanting `cb_level` frames per
    /// callback at `requested`.
    pub fn open(&mut self, cb_level: usize, requested: &AudioFormat) -> Result<()> {
        if self.is_open() {
            return Err(IoDevError::InvalidState(format!(
                "Device {} is already open",
                self.info.idx
            )));
        }

        self.backend.open()?;
        let configured = self
            .negotiate_format(requested)
            .and_then(|format| Ok((format, self.backend.configure(&format)?)));
        let (format, geometry) = match configured {
            Ok(configured) => configured,
            Err(e) => {
                log::error!("Device {} failed to configure: {}", self.info.idx, e);
                if let Err(close_err) = self.backend.close() {
                    log::warn!(
                        "Device {} close after failed open: {}",
                        self.info.idx,
                        close_err
                    );
                }
                return Err(e);
            }
        };

        self.format = Some(format);
        self.buffer_size = geometry.buffer_size;
        self.min_buffer_level = geometry.min_buffer_level;

        let scaled = if requested.frame_rate == 0 {
            cb_level
        } else {
            cb_level * format.frame_rate / requested.frame_rate
        };
        self.min_cb_level = scaled.min(self.buffer_size / 2);
        self.max_cb_level = 0;
        self.largest_cb_level = 0;
        self.highest_hw_level = 0;
        self.reset_request_pending = false;
        self.open_ts = Some(Instant::now());
        self.input_frames_read = 0;
        self.input_dsp_offset = 0;
        if let Some(est) = self.rate_est.as_mut() {
            est.reset(format.frame_rate as f64);
        }

        self.state = match self.direction {
            Direction::Output if self.backend.capabilities().start => DeviceState::Open,
            Direction::Output => DeviceState::NoStreamRun,
            Direction::Input => DeviceState::NormalRun,
        };
        self.configure_ext_dsp();

        log::info!(
            "Device {} ({}) opened: {} Hz, {} ch, {:?}, buffer {} frames, min_cb_level {}, state {:?}",
            self.info.idx,
            self.info.name,
            format.frame_rate,
            format.num_channels,
            format.sample_format,
            self.buffer_size,
            self.min_cb_level,
            self.state
        );
        Ok(())
    }

    fn negotiate_format(&mut self, requested: &AudioFormat) -> Result<AudioFormat> {
        let mut format = *requested;

        if !self.backend.supported_rates().is_empty() {
            format.frame_rate = negotiate::best_rate(
                self.backend.supported_rates(),
                requested.frame_rate,
                self.config.min_exact_rate,
            )?;
        }
        if !self.backend.supported_channel_counts().is_empty() {
            format.num_channels = negotiate::best_channels(
                self.backend.supported_channel_counts(),
                requested.num_channels,
                self.config.preferred_channels,
            )?;
        }
        if !self.backend.supported_formats().is_empty() {
            format.sample_format =
                negotiate::best_format(self.backend.supported_formats(), requested.sample_format)?;
        }
        format.trim_channel_layout();

        if self.backend.capabilities().update_channel_layout {
            if let Err(e) = self.backend.update_channel_layout(&mut format) {
                log::warn!(
                    "Device {} has no channel layout ({}), using default",
                    self.info.idx,
                    e
                );
                format.set_default_channel_layout();
            }
        }

        if format != *requested {
            log::debug!(
                "Device {} negotiated {:?} for requested {:?}",
                self.info.idx,
                format,
                requested
            );
        }
        Ok(format)
    }

    pub fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }

        for loopback in self.loopbacks.iter_mut() {
            loopback.control(false);
        }
        let idx = self.info.idx;
        for hook in self.pre_close_hooks.iter_mut() {
            hook(idx);
        }

        if let Err(e) = self.backend.close() {
            log::error!("Device {} failed to close: {}", idx, e);
            for loopback in self.loopbacks.iter_mut() {
                loopback.control(true);
            }
            return Err(e);
        }

        self.state = DeviceState::Closed;
        if let Some(ramp) = self.ramp.as_mut() {
            ramp.reset();
        }
        if let (Some(est), Some(format)) = (self.rate_est.as_mut(), self.format) {
            est.reset(format.frame_rate as f64);
        }
        self.format = None;

        for hook in self.post_close_hooks.iter_mut() {
            hook(idx);
        }
        log::info!("Device {} ({}) closed", idx, self.info.name);
        Ok(())
    }

    /// Starts an opened device that needs an explicit start.
    pub fn start(&mut self) -> Result<()> {
        if !self.is_open() {
            return Err(IoDevError::InvalidState(format!(
                "Cannot start closed device {}",
                self.info.idx
            )));
        }
        if !self.backend.capabilities().start {
            return Err(IoDevError::UnsupportedOperation(format!(
                "Device {} has no start operation",
                self.info.idx
            )));
        }
        self.backend.start()?;
        self.state = DeviceState::NormalRun;
        log::debug!("Device {} started", self.info.idx);
        Ok(())
    }

    /// Pushes the system mute state to hardware that can mute itself.
    pub fn set_mute(&mut self, system: &SystemState) -> Result<()> {
        if !self.is_open() || !self.backend.capabilities().set_mute {
            return Ok(());
        }
        let mute = match self.direction {
            Direction::Output => system.mute,
            Direction::Input => system.capture_mute,
        };
        self.backend.set_mute(mute)
    }

    /// Enters (`true`) or leaves no-stream playback.
    pub fn no_stream(&mut self, enable: bool) -> Result<()> {
        if !matches!(self.state, DeviceState::NormalRun | DeviceState::NoStreamRun) {
            return Err(IoDevError::InvalidState(format!(
                "Device {} cannot change no-stream mode in {:?}",
                self.info.idx, self.state
            )));
        }

        if self.backend.capabilities().no_stream {
            self.backend.no_stream(enable)?;
        } else {
            self.default_no_stream_playback(enable)?;
        }

        let next = if enable {
            DeviceState::NoStreamRun
        } else {
            DeviceState::NormalRun
        };
        if next != self.state {
            log::debug!("Device {}: {:?} -> {:?}", self.info.idx, self.state, next);
        }
        self.state = next;
        Ok(())
    }

    /// A stream has samples for an output device that is not yet running.
    pub fn output_sample_ready(&mut self, system: &SystemState) -> Result<()> {
        self.require_direction(Direction::Output, "output_sample_ready")?;
        match self.state {
            DeviceState::Open => {
                self.fill_odev_zeros(self.min_cb_level)?;
                self.start()?;
            }
            DeviceState::NoStreamRun => self.no_stream(false)?,
            state => {
                return Err(IoDevError::InvalidState(format!(
                    "Device {} got samples in {:?}",
                    self.info.idx, state
                )));
            }
        }

        if self.ramp.is_some() && !self.output_should_mute(system) {
            self.start_ramp(RampRequest::UpStartPlayback)?;
        }
        Ok(())
    }
}
