//! Audio I/O device core: the per-device layer between an audio server's
//! streams and a hardware backend.

pub mod backend;
pub mod buffer_share;
pub mod config;
pub mod dsp;
pub mod error;
pub mod events;
pub mod format;
pub mod iodev;
pub mod loopback;
pub mod mix;
pub mod monitor;
pub mod negotiate;
pub mod ramp;
pub mod rate_estimator;
pub mod stream;
pub mod volume;

#[cfg(test)]
mod test_backend;

pub use backend::{Backend, BufferGeometry, Capabilities, NullBackend};
pub use config::IoDevConfig;
pub use dsp::{ChannelRemix, DspContext, DspPipeline, ExtDspModule};
pub use error::{IoDevError, Result};
pub use events::IoDevEvent;
pub use format::{AudioFormat, Direction, SampleFormat};
pub use iodev::{Device, DeviceInfo, DeviceState, RampRequest, fill_time_from_frames};
pub use loopback::{Loopback, LoopbackKind};
pub use monitor::{DeviceMonitor, MonitorHandle};
pub use rate_estimator::{LinearRateEstimator, RateEstimator};
pub use stream::{DevStream, StreamId};
pub use volume::{ActiveNode, SoftvolCurve, SystemState, TableCurve, VolumeCurve};
