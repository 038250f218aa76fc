use super::Device;
use super::output::window;
use crate::backend::Backend;
use crate::config::duration_to_frames;
use crate::error::{IoDevError, Result};
use crate::format::Direction;
use crate::mix;
use crate::volume::{SystemState, db_to_scaler};
use std::time::Duration;

impl<B: Backend> Device<B> {
    /// Maps up to `frames` captured frames and runs them through DSP.
    ///
    /// Frames already processed on an earlier call (those still held back
    /// because some stream had not consumed them) are not processed again.
    pub fn get_input_buffer(&mut self, frames: usize, system: &SystemState) -> Result<usize> {
        self.require_direction(Direction::Input, "get_input_buffer")?;
        let format = self.open_format()?;

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
        self.input_frames_read = mapped;

        let frame_bytes = format.frame_bytes();
        let buf = window(self.backend.area(), mapped * frame_bytes)?;
        if mapped > self.input_dsp_offset {
            let fresh = &mut buf[self.input_dsp_offset * frame_bytes..];
            let fresh_frames = mapped - self.input_dsp_offset;
            if let Some(dsp) = self.dsp.as_ref() {
                dsp.apply(fresh, &format, fresh_frames)?;
            }
            if let Some(ext) = self.ext_dsp.as_mut() {
                ext.run(fresh, &format, fresh_frames)?;
            }
        }

        if system.capture_mute {
            mix::mute_buffer(buf, format.sample_format)?;
        }
        Ok(mapped)
    }

    /// Bytes of the captured window mapped by the last get call.
    pub fn input_area(&mut self) -> &mut [u8] {
        self.backend.area()
    }

    /// Releases the frames every stream has consumed and returns how many.
    pub fn put_input_buffer(&mut self) -> Result<usize> {
        self.require_direction(Direction::Input, "put_input_buffer")?;

        let released = if self.streams.is_empty() {
            self.input_frames_read
        } else {
            self.new_write_point()
        };

        self.backend.put_buffer(released)?;

        self.input_dsp_offset =
            self.input_frames_read.max(self.input_dsp_offset) - released;
        for stream in self.streams.iter_mut().filter(|s| s.running) {
            stream.frames_consumed += released as u64;
        }
        if let Some(est) = self.rate_est.as_mut() {
            est.add_frames(-(released as i64));
        }
        Ok(released)
    }

    /// Discards `duration` worth of queued capture, returning the frames dropped.
    pub fn drop_frames_by_time(&mut self, duration: Duration) -> Result<usize> {
        let format = self.open_format()?;
        let rate = self
            .rate_est
            .as_ref()
            .map_or(format.frame_rate as f64, |est| est.rate());

        let (queued, _) = self.frames_queued()?;
        let frames = duration_to_frames(duration, rate).min(queued);
        if frames == 0 {
            return Ok(0);
        }

        let mapped = self.backend.get_buffer(frames)?;
        if mapped > frames {
            return Err(IoDevError::OverrunFromBackend {
                requested: frames,
                returned: mapped,
            });
        }
        self.backend.put_buffer(mapped)?;
        if let Some(est) = self.rate_est.as_mut() {
            est.add_frames(-(mapped as i64));
        }
        log::debug!("Device {} dropped {} frames", self.info.idx, mapped);
        Ok(mapped)
    }

    /// Linear capture gain to apply in software.
    pub fn software_gain_scaler(&self, system: &SystemState) -> f32 {
        if !self.software_volume_needed() {
            return 1.0;
        }
        let node_gain = self.active_node.as_ref().map_or(0, |n| n.capture_gain);
        db_to_scaler(system.capture_gain + node_gain)
    }

    /// Largest software gain the active node supports, in 0.01 dB.
    pub fn maximum_software_gain(&self) -> i64 {
        self.active_node.as_ref().map_or(0, |n| n.max_software_gain)
    }
}
