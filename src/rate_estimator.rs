//! Measures the rate a device actually consumes or produces frames at

use std::time::{Duration, Instant};

pub trait RateEstimator: Send {
    /// Records frames moved to (positive) or from (negative) the device.
    fn add_frames(&mut self, frames: i64);

    /// Samples the hardware level. Returns true when a new rate was computed.
    fn check(&mut self, level: usize, now: Instant) -> bool;

    fn rate(&self) -> f64;

    /// Forgets all history and assumes `rate`.
    fn reset(&mut self, rate: f64);
}

/// Least-squares fit of frames moved against time, over fixed windows.
#[derive(Debug, Clone)]
pub struct LinearRateEstimator {
    window: Duration,
    smooth_factor: f64,
    window_start: Option<Instant>,
    window_frames: i64,
    points: Vec<(f64, f64)>,
    estimated_rate: f64,
}

impl LinearRateEstimator {
    pub fn new(rate: f64, window: Duration, smooth_factor: f64) -> Self {
        Self {
            window,
            smooth_factor: smooth_factor.clamp(0.0, 1.0),
            window_start: None,
            window_frames: 0,
            points: Vec::new(),
            estimated_rate: rate,
        }
    }

    fn slope(&self) -> Option<f64> {
        let n = self.points.len() as f64;
        if self.points.len() < 2 {
            return None;
        }
        let (sum_x, sum_y) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        let (mean_x, mean_y) = (sum_x / n, sum_y / n);
        let (cov, var) = self.points.iter().fold((0.0, 0.0), |(c, v), (x, y)| {
            (c + (x - mean_x) * (y - mean_y), v + (x - mean_x) * (x - mean_x))
        });
        if var == 0.0 { None } else { Some(cov / var) }
    }
}

impl RateEstimator for LinearRateEstimator {
    fn add_frames(&mut self, frames: i64) {
        self.window_frames += frames;
    }

    fn check(&mut self, level: usize, now: Instant) -> bool {
        let start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);
        self.points
            .push((elapsed.as_secs_f64(), (self.window_frames - level as i64) as f64));

        if elapsed < self.window {
            return false;
        }
        let Some(slope) = self.slope() else {
            return false;
        };

        self.estimated_rate =
            self.smooth_factor * self.estimated_rate + (1.0 - self.smooth_factor) * slope.abs();
        self.window_start = Some(now);
        self.window_frames = 0;
        self.points.clear();
        log::debug!("Estimated device rate: {:.2}", self.estimated_rate);
        true
    }

    fn rate(&self) -> f64 {
        self.estimated_rate
    }

    fn reset(&mut self, rate: f64) {
        self.estimated_rate = rate;
        self.window_start = None;
        self.window_frames = 0;
        self.points.clear();
    }
}
