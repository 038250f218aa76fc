//! Gain ramp engine
//!
//! A ramp is a linear fade of a per-frame scaler from a start value to a
//! target over a fixed number of frames. Starting a ramp while another is in
//! flight picks up from the scaler currently being applied, so the output never
//! jumps. Volume ramps compound onto the in-flight scaler; mute ramps replace
//! it.

use crate::error::{IoDevError, Result};

/// Invoked once when a ramp runs to completion.
pub type RampCallback = Box<dyn FnMut() + Send>;

/// What the renderer should do with the next block of frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RampAction {
    /// No ramp in flight; apply unity gain.
    None,
    /// Scale starting at `scaler`, adding `increment` per frame, never passing
    /// `target`.
    Partial {
        scaler: f32,
        increment: f32,
        target: f32,
    },
    /// The ramp's bookkeeping is corrupt.
    Invalid,
}

#[derive(Default)]
pub struct Ramp {
    active: bool,
    ramped_frames: i64,
    duration_frames: i64,
    increment: f32,
    start_scaler: f32,
    target: f32,
    callback: Option<RampCallback>,
}

impl Ramp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Drops any ramp in flight without firing its callback.
    pub fn reset(&mut self) {
        self.active = false;
        self.ramped_frames = 0;
        self.duration_frames = 0;
        self.increment = 0.0;
        self.start_scaler = 1.0;
        self.target = 1.0;
        self.callback = None;
    }

    /// Starts a ramp from `from` to `to` over `duration_frames` frames.
    pub fn start(
        &mut self,
        mute_ramp: bool,
        from: f32,
        to: f32,
        duration_frames: usize,
        callback: Option<RampCallback>,
    ) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if duration_frames == 0 {
            return Err(IoDevError::InvalidArgument(
                "Ramp duration must be at least one frame".to_string(),
            ));
        }

        let start_scaler = match self.current_action() {
            RampAction::None => from,
            RampAction::Partial { scaler, .. } if mute_ramp => scaler,
            RampAction::Partial { scaler, .. } => scaler * from,
            RampAction::Invalid => {
                return Err(IoDevError::InvalidArgument(
                    "Cannot start a ramp over an invalid one".to_string(),
                ));
            }
        };

        self.start_scaler = start_scaler;
        self.target = to;
        self.duration_frames = duration_frames as i64;
        self.increment = (to - start_scaler) / duration_frames as f32;
        self.ramped_frames = 0;
        self.callback = callback;
        self.active = true;

        log::debug!(
            "Ramp started: {} -> {} over {} frames (mute ramp: {})",
            start_scaler,
            to,
            duration_frames,
            mute_ramp
        );
        Ok(())
    }

    /// Records that `frames` more frames were rendered with the current action.
    pub fn advance(&mut self, frames: usize) -> Result<()> {
        if !self.active {
            return Err(IoDevError::InvalidState("No ramp in flight".to_string()));
        }

        self.ramped_frames += frames as i64;
        if self.ramped_frames >= self.duration_frames {
            self.active = false;
            if let Some(mut callback) = self.callback.take() {
                callback();
            }
        }
        Ok(())
    }

    pub fn current_action(&self) -> RampAction {
        if !self.active {
            return RampAction::None;
        }
        if self.ramped_frames < 0 {
            return RampAction::Invalid;
        }
        RampAction::Partial {
            scaler: self.start_scaler + self.ramped_frames as f32 * self.increment,
            increment: self.increment,
            target: self.target,
        }
    }
}

impl std::fmt::Debug for Ramp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ramp")
            .field("active", &self.active)
            .field("ramped_frames", &self.ramped_frames)
            .field("duration_frames", &self.duration_frames)
            .field("increment", &self.increment)
            .field("start_scaler", &self.start_scaler)
            .field("target", &self.target)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
