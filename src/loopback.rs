//! Taps that observe rendered audio

use crate::format::AudioFormat;

/// Where in the render path a tap reads samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackKind {
    /// After streams are mixed, before the DSP pipeline
    PostMixPreDsp,
    /// After the DSP pipeline, before gain and remix
    PostDsp,
}

pub type LoopbackHook = Box<dyn FnMut(&[u8], usize, &AudioFormat) + Send>;
pub type LoopbackControl = Box<dyn FnMut(bool) + Send>;

/// A consumer of rendered audio, such as a monitor stream.
pub struct Loopback {
    kind: LoopbackKind,
    hook: LoopbackHook,
    control: Option<LoopbackControl>,
}

impl Loopback {
    pub fn new(kind: LoopbackKind, hook: LoopbackHook) -> Self {
        Self {
            kind,
            hook,
            control: None,
        }
    }

    /// Called with `false` when the device closes.
    pub fn with_control(mut self, control: LoopbackControl) -> Self {
        self.control = Some(control);
        self
    }

    pub fn kind(&self) -> LoopbackKind {
        self.kind
    }

    pub(crate) fn run(&mut self, buf: &[u8], frames: usize, format: &AudioFormat) {
        (self.hook)(buf, frames, format);
    }

    pub(crate) fn control(&mut self, enabled: bool) {
        if let Some(control) = self.control.as_mut() {
            control(enabled);
        }
    }
}

impl std::fmt::Debug for Loopback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loopback")
            .field("kind", &self.kind)
            .field("has_control", &self.control.is_some())
            .finish()
    }
}
