use super::Device;
use crate::backend::Backend;
use crate::config::duration_to_frames;
use crate::error::{IoDevError, Result};
use crate::events::IoDevEvent;
use crate::ramp::RampCallback;
use crate::volume::SystemState;

/// Fades a device can be asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampRequest {
    /// Fade in after unmuting
    UpUnmute,
    /// Fade out before muting
    DownMute,
    /// Fade in when playback (re)starts
    UpStartPlayback,
}

impl<B: Backend> Device<B> {
    /// Starts one of the preset fades. Ignored while closed or without a ramp.
    pub fn start_ramp(&mut self, request: RampRequest) -> Result<()> {
        let Some(format) = self.format.filter(|_| self.is_open()) else {
            return Ok(());
        };
        let Some(ramp) = self.ramp.as_mut() else {
            return Ok(());
        };
        let rate = format.frame_rate as f64;
        let dev_idx = self.info.idx;

        let (from, to, duration, callback): (f32, f32, _, Option<RampCallback>) = match request {
            RampRequest::UpUnmute => (0.0, 1.0, self.config.unmute_ramp, None),
            RampRequest::UpStartPlayback => (0.0, 1.0, self.config.new_stream_ramp, None),
            RampRequest::DownMute => {
                let monitor = self.monitor.clone();
                let callback: RampCallback = Box::new(move || {
                    if let Err(e) = monitor.set_device_mute_state(dev_idx) {
                        log::error!("Device {} mute ramp done, but {}", dev_idx, e);
                    }
                });
                (1.0, 0.0, self.config.mute_ramp, Some(callback))
            }
        };

        ramp.start(true, from, to, duration_to_frames(duration, rate), callback)?;
        log::debug!("Device {} started {:?} ramp", dev_idx, request);

        if request == RampRequest::UpUnmute {
            self.notify(IoDevEvent::MuteStateChanged { dev_idx });
        }
        Ok(())
    }

    /// Ramps across a software volume change so the audible level moves
    /// smoothly from `old_volume` to `new_volume`.
    pub fn start_volume_ramp(
        &mut self,
        old_volume: usize,
        new_volume: usize,
        system: &SystemState,
    ) -> Result<()> {
        if !self.is_open() || self.ramp.is_none() || old_volume == new_volume {
            return Ok(());
        }
        let Some(format) = self.format else {
            return Ok(());
        };

        let curve = system.softvol_curve.as_ref();
        let (old_scaler, new_scaler) = match &self.active_node {
            Some(node) => (
                node.curve_scaler(curve, old_volume),
                node.curve_scaler(curve, new_volume),
            ),
            None => (curve.scaler(old_volume), curve.scaler(new_volume)),
        };
        if new_scaler == 0.0 {
            return Err(IoDevError::InvalidArgument(format!(
                "Cannot ramp to silent volume {}",
                new_volume
            )));
        }

        let frames = duration_to_frames(self.config.volume_change_ramp, format.frame_rate as f64);
        if let Some(ramp) = self.ramp.as_mut() {
            ramp.start(false, old_scaler / new_scaler, 1.0, frames, None)?;
        }
        log::debug!(
            "Device {} volume ramp {} -> {}",
            self.info.idx,
            old_volume,
            new_volume
        );
        Ok(())
    }
}
