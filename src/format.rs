//! Audio format description

pub use cpal::SampleFormat;

/// Number of channel positions a layout can describe.
pub const CH_MAX: usize = 11;

/// Per-position channel index; `-1` means the position is unused.
pub type ChannelLayout = [i8; CH_MAX];

/// Direction of a device: render to hardware or capture from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Output,
    Input,
}

impl Direction {
    pub fn is_output(self) -> bool {
        matches!(self, Self::Output)
    }
}

/// Interleaved PCM format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    pub sample_format: SampleFormat,
    pub frame_rate: usize,
    pub num_channels: usize,
    pub channel_layout: ChannelLayout,
}

impl AudioFormat {
    /// Creates a format with the default layout for `num_channels`.
    pub fn new(sample_format: SampleFormat, frame_rate: usize, num_channels: usize) -> Self {
        Self {
            sample_format,
            frame_rate,
            num_channels,
            channel_layout: default_channel_layout(num_channels),
        }
    }

    pub fn sample_bytes(&self) -> usize {
        self.sample_format.sample_size()
    }

    pub fn frame_bytes(&self) -> usize {
        self.sample_bytes() * self.num_channels
    }

    pub fn set_default_channel_layout(&mut self) {
        self.channel_layout = default_channel_layout(self.num_channels);
    }

    /// Clears layout positions that point at channels the format no longer has.
    pub fn trim_channel_layout(&mut self) {
        for slot in self.channel_layout.iter_mut() {
            if *slot >= 0 && *slot as usize >= self.num_channels {
                *slot = -1;
            }
        }
    }
}

/// Layout mapping position `i` to channel `i` for the first `num_channels` positions.
pub fn default_channel_layout(num_channels: usize) -> ChannelLayout {
    let mut layout = [-1; CH_MAX];
    for (i, slot) in layout.iter_mut().enumerate().take(num_channels) {
        *slot = i as i8;
    }
    layout
}
