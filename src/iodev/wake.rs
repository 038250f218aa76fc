use super::{Device, DeviceState};
use crate::backend::Backend;
use crate::config::duration_to_frames;
use crate::error::Result;
use crate::format::Direction;
use std::time::{Duration, Instant};

/// Time it takes to play `frames` frames at `rate`.
pub fn fill_time_from_frames(frames: usize, rate: usize) -> Duration {
    if rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frames as f64 / rate as f64)
}

impl<B: Backend> Device<B> {
    /// Frames the device can play before the audio thread must wake again,
    /// along with the level it was computed from and when that was sampled.
    pub fn frames_to_play_in_sleep(&mut self) -> Result<(usize, usize, Instant)> {
        let format = self.open_format()?;
        let (level, ts) = self.frames_queued()?;
        let rate = format.frame_rate as f64;

        let frames = if !self.streams.is_empty() {
            let data_ready = self.streams.iter().any(|s| s.has_data_ready());
            if data_ready && level > self.min_cb_level {
                level - self.min_cb_level
            } else {
                level.saturating_sub(duration_to_frames(self.config.normal_run_wake_margin, rate))
            }
        } else {
            let margin = duration_to_frames(self.config.no_stream_wake_margin, rate);
            if level > margin { level - margin } else { level }
        };

        Ok((frames, level, ts))
    }

    /// Whether the audio thread must wake for this output device.
    pub fn odev_should_wake(&self) -> bool {
        if self.direction != Direction::Output {
            return false;
        }
        if self.backend.capabilities().is_free_running
            && self.backend.is_free_running().unwrap_or(false)
        {
            return false;
        }
        matches!(
            self.state,
            DeviceState::NormalRun | DeviceState::NoStreamRun
        )
    }

    /// Feeds a level sample to the rate estimator. An output device that has
    /// run dry restarts estimation at the nominal rate.
    pub fn update_rate(&mut self, level: usize, ts: Instant) -> bool {
        let Some(est) = self.rate_est.as_mut() else {
            return false;
        };
        if self.direction == Direction::Output && level == 0 {
            if let Some(format) = self.format {
                est.reset(format.frame_rate as f64);
            }
            return false;
        }
        est.check(level, ts)
    }

    /// Measured rate over nominal rate; 1.0 when nothing is measured.
    pub fn est_rate_ratio(&self) -> f64 {
        match (self.rate_est.as_ref(), self.format) {
            (Some(est), Some(format)) if format.frame_rate > 0 => {
                est.rate() / format.frame_rate as f64
            }
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Capabilities;
    use crate::stream::DevStream;
    use crate::test_backend::*;
    use proptest::prelude::*;

    #[test]
    fn test_fill_time_from_frames() {
        assert_eq!(fill_time_from_frames(12000, 48000), Duration::from_millis(250));
        assert_eq!(fill_time_from_frames(100, 0), Duration::ZERO);
    }

    #[test]
    fn test_frames_to_play_in_sleep() {
        let (mut dev, _mon) = device(Direction::Output, FakeBackend::new());
        dev.open(512, &stereo_s16(48000)).unwrap();
        dev.no_stream(false).unwrap();
        dev.add_stream(DevStream::new(1, 512)).unwrap();
        dev.start_stream(1).unwrap();
        assert_eq!(dev.min_cb_level(), 512);

        dev.stream_mut(1).unwrap().playback_frames = 100;
        dev.backend_mut().queued = 562;
        let (frames, level, _) = dev.frames_to_play_in_sleep().unwrap();
        assert_eq!((frames, level), (50, 562));

        dev.stream_mut(1).unwrap().playback_frames = 0;
        assert_eq!(dev.frames_to_play_in_sleep().unwrap().0, 514);
        dev.backend_mut().queued = 1074;
        assert_eq!(dev.frames_to_play_in_sleep().unwrap().0, 1026);
        dev.backend_mut().queued = 256;
        assert_eq!(dev.frames_to_play_in_sleep().unwrap().0, 208);
        dev.backend_mut().queued = 20;
        assert_eq!(dev.frames_to_play_in_sleep().unwrap().0, 0);

        dev.backend_mut().queued = 512;
        dev.rm_stream(1).unwrap();
        let (frames, level, _) = dev.frames_to_play_in_sleep().unwrap();
        assert_eq!(level, 512);
        assert_eq!(frames, 512 - 240);

        dev.backend_mut().queued = 100;
        assert_eq!(dev.frames_to_play_in_sleep().unwrap().0, 100);
    }

    #[test]
    fn test_odev_should_wake() {
        let backend = FakeBackend::new().with_caps(Capabilities {
            start: true,
            is_free_running: true,
            ..Default::default()
        });
        let (mut dev, _mon) = device(Direction::Output, backend);
        assert!(!dev.odev_should_wake());
        dev.open(240, &stereo_s16(48000)).unwrap();
        assert!(!dev.odev_should_wake());

        dev.start().unwrap();
        assert!(dev.odev_should_wake());
        dev.backend_mut().free_running = true;
        assert!(!dev.odev_should_wake());
        dev.backend_mut().free_running = false;
        assert!(dev.odev_should_wake());

        let (mut dev, _mon) = device(Direction::Input, FakeBackend::new());
        dev.open(240, &stereo_s16(48000)).unwrap();
        assert!(!dev.odev_should_wake());
    }

    #[test]
    fn test_update_rate() {
        let (mut dev, _mon) = device(Direction::Output, FakeBackend::new());
        assert!(!dev.update_rate(100, Instant::now()));

        let est = FakeRateEstimator::with_rate(48000.0);
        dev.set_rate_estimator(Some(Box::new(est.clone())));
        dev.open(240, &stereo_s16(48000)).unwrap();

        assert!(!dev.update_rate(0, Instant::now()));
        assert!(dev.update_rate(300, Instant::now()));
        let state = est.state.lock().unwrap();
        assert_eq!(state.resets, vec![48000.0, 48000.0]);
        assert_eq!(state.checks, vec![300]);
    }

    #[test]
    fn test_est_rate_ratio() {
        let (mut dev, _mon) = device(Direction::Output, FakeBackend::new());
        assert_eq!(dev.est_rate_ratio(), 1.0);
        let est = FakeRateEstimator::with_rate(48000.0);
        dev.set_rate_estimator(Some(Box::new(est.clone())));
        dev.open(240, &stereo_s16(48000)).unwrap();
        est.state.lock().unwrap().rate = 48480.0;
        assert!((dev.est_rate_ratio() - 1.01).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_sleep_never_exceeds_queued(
            queued in 0usize..4096,
            min_buffer_level in 0usize..256,
            streams in proptest::collection::vec((1usize..1024, any::<bool>()), 0..4),
        ) {
            let backend = FakeBackend::new()
                .with_buffer_size(4096)
                .with_min_buffer_level(min_buffer_level);
            let (mut dev, _mon) = device(Direction::Output, backend);
            dev.open(240, &stereo_s16(48000)).unwrap();
            for (i, (threshold, ready)) in streams.iter().enumerate() {
                let id = i as u32;
                dev.add_stream(DevStream::new(id, *threshold)).unwrap();
                dev.start_stream(id).unwrap();
                if let Some(stream) = dev.stream_mut(id) {
                    stream.playback_frames = if *ready { *threshold } else { 0 };
                }
            }

            dev.backend_mut().queued = queued;
            let (frames, level, _) = dev.frames_to_play_in_sleep().unwrap();
            prop_assert_eq!(level, queued.saturating_sub(min_buffer_level));
            prop_assert!(frames <= level);
        }
    }
}
