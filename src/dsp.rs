//! Collaborators that transform samples on their way through a device

use crate::error::{IoDevError, Result};
use crate::format::AudioFormat;
use std::sync::{Arc, Mutex};

/// A loaded DSP graph for one device direction.
pub trait DspPipeline: Send {
    /// Processes `frames` interleaved frames of `buf` in place.
    fn apply(&mut self, buf: &mut [u8], format: &AudioFormat, frames: usize) -> Result<()>;

    /// Frames of latency the pipeline adds.
    fn delay(&self) -> usize {
        0
    }
}

/// Processing stage supplied from outside the device, e.g. by a client that
/// post-processes everything a device renders.
pub trait ExtDspModule: Send {
    fn configure(&mut self, buffer_size: usize, num_channels: usize, rate: usize);

    fn run(&mut self, buf: &mut [u8], format: &AudioFormat, frames: usize) -> Result<()>;
}

/// Converts the rendered channel mix to the hardware's channel arrangement.
pub trait ChannelRemix {
    fn convert(&mut self, buf: &mut [u8], format: &AudioFormat, frames: usize) -> Result<()>;
}

/// Shared slot holding a device's pipeline.
///
/// The control thread swaps pipelines in while the audio thread is running, so
/// the pipeline sits behind a mutex. The audio thread never waits on it: if the
/// slot is busy the block passes through unprocessed.
#[derive(Clone)]
pub struct DspContext {
    purpose: &'static str,
    pipeline: Arc<Mutex<Option<Box<dyn DspPipeline>>>>,
}

impl DspContext {
    pub fn new(purpose: &'static str) -> Self {
        Self {
            purpose,
            pipeline: Arc::new(Mutex::new(None)),
        }
    }

    pub fn purpose(&self) -> &'static str {
        self.purpose
    }

    /// Installs a pipeline, or clears the slot with `None`.
    pub fn set_pipeline(&self, pipeline: Option<Box<dyn DspPipeline>>) -> Result<()> {
        let mut slot = self
            .pipeline
            .lock()
            .map_err(|e| IoDevError::Backend(format!("DSP pipeline lock poisoned: {}", e)))?;
        *slot = pipeline;
        log::debug!(
            "DSP pipeline for {} {}",
            self.purpose,
            if slot.is_some() { "loaded" } else { "cleared" }
        );
        Ok(())
    }

    pub fn has_pipeline(&self) -> bool {
        self.pipeline.try_lock().map(|p| p.is_some()).unwrap_or(false)
    }

    /// Runs the pipeline over `frames` frames; passes through if there is none.
    pub fn apply(&self, buf: &mut [u8], format: &AudioFormat, frames: usize) -> Result<()> {
        let Ok(mut slot) = self.pipeline.try_lock() else {
            log::warn!("DSP pipeline for {} busy, passing through", self.purpose);
            return Ok(());
        };
        match slot.as_mut() {
            Some(pipeline) => pipeline.apply(buf, format, frames),
            None => Ok(()),
        }
    }

    pub fn delay(&self) -> usize {
        self.pipeline
            .try_lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|p| p.delay()))
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for DspContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DspContext")
            .field("purpose", &self.purpose)
            .field("has_pipeline", &self.has_pipeline())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SampleFormat;

    struct Invert;

    impl DspPipeline for Invert {
        fn apply(&mut self, buf: &mut [u8], _format: &AudioFormat, _frames: usize) -> Result<()> {
            for b in buf.iter_mut() {
                *b = !*b;
            }
            Ok(())
        }

        fn delay(&self) -> usize {
            32
        }
    }

    #[test]
    fn test_empty_context_passes_through() {
        let ctx = DspContext::new("playback");
        let fmt = AudioFormat::new(SampleFormat::U8, 48000, 1);
        let mut buf = vec![1u8, 2, 3];
        ctx.apply(&mut buf, &fmt, 3).unwrap();
        assert_eq!(buf, vec![1, 2, 3]);
        assert_eq!(ctx.delay(), 0);
    }

    #[test]
    fn test_pipeline_applies_and_clears() {
        let ctx = DspContext::new("playback");
        let fmt = AudioFormat::new(SampleFormat::U8, 48000, 1);
        ctx.set_pipeline(Some(Box::new(Invert))).unwrap();
        assert!(ctx.has_pipeline());
        assert_eq!(ctx.delay(), 32);

        let mut buf = vec![0u8, 0xff];
        ctx.apply(&mut buf, &fmt, 2).unwrap();
        assert_eq!(buf, vec![0xff, 0]);

        ctx.set_pipeline(None).unwrap();
        ctx.apply(&mut buf, &fmt, 2).unwrap();
        assert_eq!(buf, vec![0xff, 0]);
    }

    #[test]
    fn test_busy_pipeline_passes_through() {
        let ctx = DspContext::new("capture");
        let fmt = AudioFormat::new(SampleFormat::U8, 48000, 1);
        ctx.set_pipeline(Some(Box::new(Invert))).unwrap();

        let other = ctx.clone();
        let _held = other.pipeline.lock().unwrap();
        let mut buf = vec![7u8];
        ctx.apply(&mut buf, &fmt, 1).unwrap();
        assert_eq!(buf, vec![7]);
    }
}
