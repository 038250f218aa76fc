//! Volume curves, active node settings, and the system-wide audio state

use std::sync::Arc;

/// Highest volume index; 100 is full scale.
pub const MAX_VOLUME: usize = 100;

/// Maps a volume index in `0..=100` to a linear amplitude scaler.
pub trait VolumeCurve: Send + Sync {
    fn scaler(&self, volume: usize) -> f32;
}

/// Half-decibel steps below full scale, with index 0 fully silent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftvolCurve;

impl VolumeCurve for SoftvolCurve {
    fn scaler(&self, volume: usize) -> f32 {
        let volume = volume.min(MAX_VOLUME);
        if volume == 0 {
            return 0.0;
        }
        let db = (volume as f32 - MAX_VOLUME as f32) * 0.5;
        10f32.powf(db / 20.0)
    }
}

/// Explicit per-index scalers, as shipped in a board's tuning file.
#[derive(Debug, Clone)]
pub struct TableCurve {
    scalers: Vec<f32>,
}

impl TableCurve {
    /// `scalers[i]` is the scaler for index `i`; indexes past the end use the last entry.
    pub fn new(scalers: Vec<f32>) -> Self {
        Self { scalers }
    }
}

impl VolumeCurve for TableCurve {
    fn scaler(&self, volume: usize) -> f32 {
        match self.scalers.get(volume) {
            Some(scaler) => *scaler,
            None => self.scalers.last().copied().unwrap_or(1.0),
        }
    }
}

/// System-wide state the device reads on every callback.
#[derive(Clone)]
pub struct SystemState {
    pub mute: bool,
    pub capture_mute: bool,
    /// Output volume index, 0..=100
    pub volume: usize,
    /// Capture gain in 0.01 dB
    pub capture_gain: i64,
    /// Curve used when the active node has none of its own
    pub softvol_curve: Arc<dyn VolumeCurve>,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            mute: false,
            capture_mute: false,
            volume: MAX_VOLUME,
            capture_gain: 0,
            softvol_curve: Arc::new(SoftvolCurve),
        }
    }
}

impl SystemState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    pub fn capture_mute(mut self, mute: bool) -> Self {
        self.capture_mute = mute;
        self
    }

    pub fn volume(mut self, volume: usize) -> Self {
        self.volume = volume.min(MAX_VOLUME);
        self
    }

    pub fn capture_gain(mut self, gain: i64) -> Self {
        self.capture_gain = gain;
        self
    }

    pub fn softvol_curve(mut self, curve: Arc<dyn VolumeCurve>) -> Self {
        self.softvol_curve = curve;
        self
    }
}

impl std::fmt::Debug for SystemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemState")
            .field("mute", &self.mute)
            .field("capture_mute", &self.capture_mute)
            .field("volume", &self.volume)
            .field("capture_gain", &self.capture_gain)
            .finish()
    }
}

/// The jack or endpoint currently selected on a device.
#[derive(Clone, Default)]
pub struct ActiveNode {
    /// Node volume, 0..=100, applied on top of the system volume
    pub volume: usize,
    /// Node capture gain in 0.01 dB
    pub capture_gain: i64,
    /// Whether volume or gain must be applied in software for this node
    pub software_volume_needed: bool,
    /// Node-specific curve, overriding the system one
    pub volume_curve: Option<Arc<dyn VolumeCurve>>,
    /// Largest software gain the node supports, in 0.01 dB
    pub max_software_gain: i64,
}

impl ActiveNode {
    pub fn new(volume: usize) -> Self {
        Self {
            volume: volume.min(MAX_VOLUME),
            ..Default::default()
        }
    }

    pub fn capture_gain(mut self, gain: i64) -> Self {
        self.capture_gain = gain;
        self
    }

    pub fn software_volume_needed(mut self, needed: bool) -> Self {
        self.software_volume_needed = needed;
        self
    }

    pub fn volume_curve(mut self, curve: Arc<dyn VolumeCurve>) -> Self {
        self.volume_curve = Some(curve);
        self
    }

    pub fn max_software_gain(mut self, gain: i64) -> Self {
        self.max_software_gain = gain;
        self
    }

    /// Combined volume index; the node volume attenuates the system volume.
    pub fn adjusted_volume(&self, system_volume: usize) -> usize {
        (system_volume + self.volume).saturating_sub(MAX_VOLUME)
    }

    /// Scaler for `volume` on this node's curve, or on `fallback` if it has none.
    pub fn curve_scaler(&self, fallback: &dyn VolumeCurve, volume: usize) -> f32 {
        match &self.volume_curve {
            Some(curve) => curve.scaler(volume),
            None => fallback.scaler(volume),
        }
    }
}

impl std::fmt::Debug for ActiveNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveNode")
            .field("volume", &self.volume)
            .field("capture_gain", &self.capture_gain)
            .field("software_volume_needed", &self.software_volume_needed)
            .field("has_volume_curve", &self.volume_curve.is_some())
            .field("max_software_gain", &self.max_software_gain)
            .finish()
    }
}

/// Converts a gain in 0.01 dB to a linear scaler.
pub fn db_to_scaler(gain: i64) -> f32 {
    10f32.powf(gain as f32 / 2000.0)
}
