use iodev::{
    AudioFormat, Device, DeviceInfo, DeviceMonitor, DevStream, Direction, IoDevConfig,
    LinearRateEstimator, NullBackend, SampleFormat, SystemState, fill_time_from_frames,
};
use std::time::{Duration, Instant};

const CALLBACK_FRAMES: usize = 480;

/// Drives a null sink the way an audio thread would: wake, render a 440 Hz
/// tone, commit it, then sleep until the next callback is due.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = IoDevConfig::default();
    let monitor = DeviceMonitor::new(config.notification_queue_depth);
    let mut dev = Device::new(
        DeviceInfo::new(0, "null sink"),
        Direction::Output,
        NullBackend::new(Direction::Output),
        config,
        monitor.handle(),
    );
    dev.set_rate_estimator(Some(Box::new(LinearRateEstimator::new(
        48000.0,
        Duration::from_secs(1),
        0.3,
    ))));

    dev.open(CALLBACK_FRAMES, &AudioFormat::new(SampleFormat::I16, 48000, 2))?;
    let format = *dev.format().ok_or_else(|| anyhow::anyhow!("device did not open"))?;
    println!(
        "Opened {} at {} Hz, {} channels, buffer {} frames",
        dev.info().name,
        format.frame_rate,
        format.num_channels,
        dev.buffer_size()
    );

    dev.add_stream(DevStream::new(1, CALLBACK_FRAMES))?;
    dev.start_stream(1)?;
    if let Some(stream) = dev.stream_mut(1) {
        stream.playback_frames = CALLBACK_FRAMES;
    }

    let system = SystemState::new().volume(75);
    let frequency = 440.0f32;
    let mut phase = 0.0f32;
    let deadline = Instant::now() + Duration::from_secs(2);

    while Instant::now() < deadline {
        dev.prepare_output_before_write_samples(&system)?;

        let (level, ts) = dev.frames_queued()?;
        let frames = dev.get_output_buffer(dev.buffer_avail(level).min(CALLBACK_FRAMES))?;
        let bytes = frames * format.frame_bytes();
        for frame in dev.output_area()[..bytes].chunks_exact_mut(format.frame_bytes()) {
            let sample = ((phase * std::f32::consts::TAU).sin() * 0.1 * i16::MAX as f32) as i16;
            for channel in frame.chunks_exact_mut(2) {
                channel.copy_from_slice(&sample.to_le_bytes());
            }
            phase = (phase + frequency / format.frame_rate as f32).fract();
        }
        let mut non_empty = false;
        dev.put_output_buffer(frames, Some(&mut non_empty), None, &system)?;

        if dev.update_rate(level, ts) {
            println!("Estimated rate ratio: {:.5}", dev.est_rate_ratio());
        }
        for event in monitor.poll_events() {
            if event.dev_idx() == dev.info().idx {
                println!("Event: {:?}", event);
            }
        }

        let (sleep_frames, level, _) = dev.frames_to_play_in_sleep()?;
        let sleep = fill_time_from_frames(sleep_frames, format.frame_rate);
        log::debug!(
            "Wrote {} frames (non-empty: {}), level {}, sleeping {:?}",
            frames,
            non_empty,
            level,
            sleep
        );
        std::thread::sleep(sleep);
    }

    println!("Underruns: {}", dev.num_underruns());
    dev.close()?;
    println!("Closed {}", dev.info().name);
    Ok(())
}
