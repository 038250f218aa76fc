//! Configuration for a device core

use std::time::Duration;

/// Tunables shared by every device the core drives.
///
/// Durations are wall-clock; they are converted to frames at the device's
/// negotiated rate whenever they are used.
#[derive(Debug, Clone)]
pub struct IoDevConfig {
    /// Length of the fade-in applied when the device is unmuted
    pub unmute_ramp: Duration,
    /// Length of the fade-out applied before the device is muted
    pub mute_ramp: Duration,
    /// Length of the fade-in applied when playback (re)starts
    pub new_stream_ramp: Duration,
    /// Length of the compensating ramp applied on a volume change
    pub volume_change_ramp: Duration,
    /// Wake-up margin while streams are attached but none has data ready
    pub normal_run_wake_margin: Duration,
    /// Wake-up margin while no stream is attached
    pub no_stream_wake_margin: Duration,
    /// Channel count tried when the requested count is unsupported
    pub preferred_channels: usize,
    /// Exact rate matches below this rate are not accepted outright
    pub min_exact_rate: usize,
    /// Capacity of the notification channel to the control thread
    pub notification_queue_depth: usize,
    /// Whether devices get a gain ramp
    pub enable_ramp: bool,
}

impl Default for IoDevConfig {
    fn default() -> Self {
        Self {
            unmute_ramp: Duration::from_millis(500),
            mute_ramp: Duration::from_millis(100),
            new_stream_ramp: Duration::from_millis(10),
            volume_change_ramp: Duration::from_millis(100),
            normal_run_wake_margin: Duration::from_millis(1),
            no_stream_wake_margin: Duration::from_millis(5),
            preferred_channels: 2,
            min_exact_rate: 44100,
            notification_queue_depth: 32,
            enable_ramp: true,
        }
    }
}

impl IoDevConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unmute_ramp(mut self, duration: Duration) -> Self {
        self.unmute_ramp = duration;
        self
    }

    pub fn mute_ramp(mut self, duration: Duration) -> Self {
        self.mute_ramp = duration;
        self
    }

    pub fn new_stream_ramp(mut self, duration: Duration) -> Self {
        self.new_stream_ramp = duration;
        self
    }

    pub fn volume_change_ramp(mut self, duration: Duration) -> Self {
        self.volume_change_ramp = duration;
        self
    }

    pub fn normal_run_wake_margin(mut self, margin: Duration) -> Self {
        self.normal_run_wake_margin = margin;
        self
    }

    pub fn no_stream_wake_margin(mut self, margin: Duration) -> Self {
        self.no_stream_wake_margin = margin;
        self
    }

    pub fn preferred_channels(mut self, channels: usize) -> Self {
        self.preferred_channels = channels;
        self
    }

    pub fn min_exact_rate(mut self, rate: usize) -> Self {
        self.min_exact_rate = rate;
        self
    }

    pub fn notification_queue_depth(mut self, depth: usize) -> Self {
        self.notification_queue_depth = depth;
        self
    }

    pub fn enable_ramp(mut self, enable: bool) -> Self {
        self.enable_ramp = enable;
        self
    }
}

/// Converts a wall-clock duration to a frame count at `rate`, rounding down.
pub fn duration_to_frames(duration: Duration, rate: f64) -> usize {
    (duration.as_nanos() as f64 * rate / 1_000_000_000.0) as usize
}
