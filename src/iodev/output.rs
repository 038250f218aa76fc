use super::{Device, DeviceState};
use crate::backend::Backend;
use crate::dsp::ChannelRemix;
use crate::error::{IoDevError, Result};
use crate::format::Direction;
use crate::loopback::LoopbackKind;
use crate::mix;
use crate::ramp::RampAction;
use crate::volume::SystemState;
use std::time::Instant;

/// First `bytes` of a mapped window.
pub(super) fn window(area: &mut [u8], bytes: usize) -> Result<&mut [u8]> {
    let len = area.len();
    area.get_mut(..bytes).ok_or_else(|| {
        IoDevError::Backend(format!(
            "Mapped window holds {} bytes, {} needed",
            len, bytes
        ))
    })
}

impl<B: Backend> Device<B> {
    /// Queued frames, excluding the hardware floor for output devices.
    pub fn frames_queued(&mut self) -> Result<(usize, Instant)> {
        let (level, ts) = match self.backend.frames_queued() {
            Err(IoDevError::Underrun) if self.direction.is_output() => {
                log::warn!("Device {} backend reported an underrun", self.info.idx);
                self.output_underrun()?;
                self.backend.frames_queued()?
            }
            queued => queued?,
        };
        self.highest_hw_level = self.highest_hw_level.max(level);
        match self.direction {
            Direction::Output => Ok((level.saturating_sub(self.min_buffer_level), ts)),
            Direction::Input => Ok((level, ts)),
        }
    }

    /// Room left for writing (output) or frames ready to read (input), given
    /// the level returned by [`Device::frames_queued`].
    pub fn buffer_avail(&self, level: usize) -> usize {
        match self.direction {
            Direction::Output => self
                .buffer_size
                .saturating_sub(self.min_buffer_level + level),
            Direction::Input => level,
        }
    }

    /// Queued frames holding real samples, where the backend can tell.
    pub fn valid_frames(&mut self) -> Result<(usize, Instant)> {
        if self.backend.capabilities().valid_frames {
            self.backend.valid_frames()
        } else {
            self.frames_queued()
        }
    }

    pub fn software_volume_needed(&self) -> bool {
        self.software_volume_needed
            || self
                .active_node
                .as_ref()
                .is_some_and(|node| node.software_volume_needed)
    }

    /// System volume attenuated by the active node's volume.
    pub fn adjusted_volume(&self, system: &SystemState) -> usize {
        self.active_node
            .as_ref()
            .map_or(system.volume, |node| node.adjusted_volume(system.volume))
    }

    pub fn is_zero_volume(&self, system: &SystemState) -> bool {
        self.adjusted_volume(system) == 0
    }

    pub fn output_should_mute(&self, system: &SystemState) -> bool {
        system.mute || self.is_zero_volume(system)
    }

    /// Linear gain applied in software for the current volume.
    pub fn software_volume_scaler(&self, system: &SystemState) -> f32 {
        let volume = self.adjusted_volume(system);
        match &self.active_node {
            Some(node) => node.curve_scaler(system.softvol_curve.as_ref(), volume),
            None => system.softvol_curve.scaler(volume),
        }
    }

    /// Maps up to `frames` frames of the hardware buffer for rendering.
    pub fn get_output_buffer(&mut self, frames: usize) -> Result<usize> {
        self.open_format()?;
        let mapped = self.backend.get_buffer(frames)?;
        if mapped > frames {
            log::error!(
                "Device {} backend mapped {} frames for a request of {}",
                self.info.idx,
                mapped,
                frames
            );
            return Err(IoDevError::OverrunFromBackend {
                requested: frames,
                returned: mapped,
            });
        }
        Ok(mapped)
    }

    /// Bytes of the window mapped by the last get call.
    pub fn output_area(&mut self) -> &mut [u8] {
        self.backend.area()
    }

    /// Finishes `nframes` mixed frames in the mapped window and commits them.
    ///
    /// Taps and DSP run first, then gain: silence when muted, a ramp when one
    /// is in flight, the software volume otherwise. `is_non_empty` reports
    /// whether the mix held anything but silence.
    pub fn put_output_buffer(
        &mut self,
        nframes: usize,
        is_non_empty: Option<&mut bool>,
        remix: Option<&mut dyn ChannelRemix>,
        system: &SystemState,
    ) -> Result<()> {
        let format = self.open_format()?;
        let should_mute = self.output_should_mute(system);
        let softvol_needed = self.software_volume_needed();
        let softvol_scaler = if softvol_needed {
            self.software_volume_scaler(system)
        } else {
            1.0
        };

        let buf = window(self.backend.area(), nframes * format.frame_bytes())?;

        if let Some(non_empty) = is_non_empty {
            *non_empty = !mix::is_silent(buf, format.sample_format)?;
        }

        for loopback in self
            .loopbacks
            .iter_mut()
            .filter(|l| l.kind() == LoopbackKind::PostMixPreDsp)
        {
            loopback.run(buf, nframes, &format);
        }

        if let Some(dsp) = self.dsp.as_ref() {
            dsp.apply(buf, &format, nframes)?;
        }
        if let Some(ext) = self.ext_dsp.as_mut() {
            ext.run(buf, &format, nframes)?;
        }

        for loopback in self
            .loopbacks
            .iter_mut()
            .filter(|l| l.kind() == LoopbackKind::PostDsp)
        {
            loopback.run(buf, nframes, &format);
        }

        let action = self
            .ramp
            .as_ref()
            .map_or(RampAction::None, |ramp| ramp.current_action());
        match action {
            RampAction::Partial {
                scaler,
                increment,
                target,
            } => {
                mix::scale_buffer_increment(
                    buf,
                    format.sample_format,
                    format.num_channels,
                    scaler * softvol_scaler,
                    increment * softvol_scaler,
                    target * softvol_scaler,
                )?;
                if let Some(ramp) = self.ramp.as_mut() {
                    ramp.advance(nframes)?;
                }
            }
            _ if should_mute => mix::mute_buffer(buf, format.sample_format)?,
            _ if softvol_needed => mix::scale_buffer(buf, format.sample_format, softvol_scaler)?,
            _ => {}
        }
        if action == RampAction::Invalid {
            log::error!("Device {} ramp is invalid, ignoring it", self.info.idx);
        }

        if let Some(remix) = remix {
            remix.convert(buf, &format, nframes)?;
        }

        if let Some(est) = self.rate_est.as_mut() {
            est.add_frames(nframes as i64);
        }
        self.backend.put_buffer(nframes)
    }

    /// Writes `frames` frames of silence to an output device.
    pub fn fill_odev_zeros(&mut self, frames: usize) -> Result<()> {
        self.require_direction(Direction::Output, "fill_odev_zeros")?;
        let format = self.open_format()?;

        let mut remaining = frames;
        while remaining > 0 {
            let mapped = self.get_output_buffer(remaining)?;
            if mapped == 0 {
                log::warn!(
                    "Device {} has no room for {} frames of silence",
                    self.info.idx,
                    remaining
                );
                break;
            }
            let buf = window(self.backend.area(), mapped * format.frame_bytes())?;
            mix::mute_buffer(buf, format.sample_format)?;
            self.backend.put_buffer(mapped)?;
            remaining -= mapped;
        }
        Ok(())
    }

    /// Keeps an output device with no streams fed with silence, holding
    /// about two callbacks' worth queued.
    pub fn default_no_stream_playback(&mut self, enable: bool) -> Result<()> {
        if !enable {
            return Ok(());
        }

        let (mut queued, _) = self.frames_queued()?;
        if queued == 0 {
            self.output_underrun()?;
            queued = self.frames_queued()?.0;
        }

        let target = 2 * self.min_cb_level;
        if queued <= target {
            let fill = (target - queued).min(self.buffer_avail(queued));
            self.fill_odev_zeros(fill)?;
        }
        Ok(())
    }

    /// Moves an output device toward running before streams write to it.
    pub fn prepare_output_before_write_samples(&mut self, system: &SystemState) -> Result<()> {
        self.require_direction(Direction::Output, "prepare_output_before_write_samples")?;

        let ready = self.streams.iter().any(|s| s.has_data_ready());
        match self.state {
            DeviceState::Open | DeviceState::NoStreamRun if ready => {
                self.output_sample_ready(system)
            }
            DeviceState::NoStreamRun => self.no_stream(true),
            _ => Ok(()),
        }
    }
}
