//! Virtual endpoint with no hardware behind it
//!
//! Output is discarded and capture yields silence. The buffer level moves with
//! the wall clock at the configured rate, so the device core schedules against
//! it exactly as it would against a real sound card.

use super::{Backend, BufferGeometry, Capabilities};
use crate::config::duration_to_frames;
use crate::error::{IoDevError, Result};
use crate::format::{AudioFormat, Direction, SampleFormat};
use std::time::Instant;

const NULL_RATES: [usize; 2] = [48000, 44100];
const NULL_CHANNELS: [usize; 2] = [2, 1];
const NULL_FORMATS: [SampleFormat; 2] = [SampleFormat::I16, SampleFormat::F32];
const DEFAULT_BUFFER_FRAMES: usize = 4096;

pub struct NullBackend {
    direction: Direction,
    buffer_frames: usize,
    is_open: bool,
    started: bool,
    rate: usize,
    frame_bytes: usize,
    area: Vec<u8>,
    mapped_frames: usize,
    level: usize,
    anchor: Instant,
    clock_frames: usize,
    underruns: u32,
}

impl NullBackend {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            is_open: false,
            started: false,
            rate: 0,
            frame_bytes: 0,
            area: Vec::new(),
            mapped_frames: 0,
            level: 0,
            anchor: Instant::now(),
            clock_frames: 0,
            underruns: 0,
        }
    }

    pub fn with_buffer_frames(mut self, frames: usize) -> Self {
        self.buffer_frames = frames;
        self
    }

    /// Moves the level by however many frames the virtual clock has ticked.
    fn tick(&mut self, now: Instant) {
        if !self.started || self.rate == 0 {
            return;
        }
        let clock = duration_to_frames(now.saturating_duration_since(self.anchor), self.rate as f64);
        let elapsed = clock - self.clock_frames;
        self.clock_frames = clock;

        match self.direction {
            Direction::Output => {
                if elapsed > self.level && self.level > 0 {
                    self.underruns += 1;
                    log::debug!("Null sink drained dry, underruns: {}", self.underruns);
                }
                self.level = self.level.saturating_sub(elapsed);
            }
            Direction::Input => {
                self.level = (self.level + elapsed).min(self.buffer_frames);
            }
        }
    }

    fn available(&self) -> usize {
        match self.direction {
            Direction::Output => self.buffer_frames - self.level,
            Direction::Input => self.level,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(IoDevError::Backend("Null device is not open".to_string()))
        }
    }
}

impl Backend for NullBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            start: self.direction.is_output(),
            num_underruns: true,
            ..Default::default()
        }
    }

    fn supported_rates(&self) -> &[usize] {
        &NULL_RATES
    }

    fn supported_channel_counts(&self) -> &[usize] {
        &NULL_CHANNELS
    }

    fn supported_formats(&self) -> &[SampleFormat] {
        &NULL_FORMATS
    }

    fn open(&mut self) -> Result<()> {
        self.is_open = true;
        Ok(())
    }

    fn configure(&mut self, format: &AudioFormat) -> Result<BufferGeometry> {
        self.ensure_open()?;
        self.rate = format.frame_rate;
        self.frame_bytes = format.frame_bytes();
        self.area = vec![0; self.buffer_frames * self.frame_bytes];
        self.level = 0;
        self.clock_frames = 0;
        self.anchor = Instant::now();
        // Capture has nothing to start; the clock runs from configuration.
        self.started = !self.direction.is_output();
        log::info!(
            "Null {:?} device configured: {} Hz, {} bytes per frame, {} frames",
            self.direction,
            self.rate,
            self.frame_bytes,
            self.buffer_frames
        );
        Ok(BufferGeometry {
            buffer_size: self.buffer_frames,
            min_buffer_level: 0,
        })
    }

    fn close(&mut self) -> Result<()> {
        self.is_open = false;
        self.started = false;
        self.level = 0;
        self.mapped_frames = 0;
        Ok(())
    }

    fn frames_queued(&mut self) -> Result<(usize, Instant)> {
        self.ensure_open()?;
        let now = Instant::now();
        self.tick(now);
        Ok((self.level, now))
    }

    fn get_buffer(&mut self, frames: usize) -> Result<usize> {
        self.ensure_open()?;
        self.tick(Instant::now());
        self.mapped_frames = frames.min(self.available());
        Ok(self.mapped_frames)
    }

    fn area(&mut self) -> &mut [u8] {
        let len = self.mapped_frames * self.frame_bytes;
        &mut self.area[..len]
    }

    fn put_buffer(&mut self, frames: usize) -> Result<()> {
        if frames > self.mapped_frames {
            return Err(IoDevError::InvalidArgument(format!(
                "Committing {} frames of a {} frame window",
                frames, self.mapped_frames
            )));
        }
        match self.direction {
            Direction::Output => self.level += frames,
            Direction::Input => self.level -= frames,
        }
        self.mapped_frames = 0;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.anchor = Instant::now();
        self.clock_frames = 0;
        self.started = true;
        Ok(())
    }

    fn num_underruns(&self) -> Result<u32> {
        Ok(self.underruns)
    }
}
