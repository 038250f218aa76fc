//! In-place gain operations on interleaved little-endian PCM

use crate::error::{IoDevError, Result};
use crate::format::SampleFormat;
use cpal::{FromSample, Sample};

trait PcmSample: Sample + FromSample<f32> {
    const BYTES: usize;
    fn read(bytes: &[u8]) -> Self;
    fn write(self, bytes: &mut [u8]);
}

macro_rules! impl_pcm_sample {
    ($($t:ty),*) => {
        $(
            impl PcmSample for $t {
                const BYTES: usize = std::mem::size_of::<$t>();

                fn read(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }

                fn write(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_pcm_sample!(i8, u8, i16, u16, i32, f32, f64);

macro_rules! dispatch {
    ($format:expr, $func:ident($($arg:expr),*)) => {
        match $format {
            SampleFormat::I8 => $func::<i8>($($arg),*),
            SampleFormat::U8 => $func::<u8>($($arg),*),
            SampleFormat::I16 => $func::<i16>($($arg),*),
            SampleFormat::U16 => $func::<u16>($($arg),*),
            SampleFormat::I32 => $func::<i32>($($arg),*),
            SampleFormat::F32 => $func::<f32>($($arg),*),
            SampleFormat::F64 => $func::<f64>($($arg),*),
            other => {
                return Err(IoDevError::UnsupportedOperation(format!(
                    "Sample format {:?} cannot be processed",
                    other
                )))
            }
        }
    };
}

fn silence<S: PcmSample>(buf: &mut [u8]) {
    for chunk in buf.chunks_exact_mut(S::BYTES) {
        S::EQUILIBRIUM.write(chunk);
    }
}

fn all_equilibrium<S: PcmSample>(buf: &[u8]) -> bool {
    buf.chunks_exact(S::BYTES)
        .all(|chunk| S::read(chunk) == S::EQUILIBRIUM)
}

fn scale<S: PcmSample>(buf: &mut [u8], scaler: f32)
where
    f32: FromSample<S>,
{
    for chunk in buf.chunks_exact_mut(S::BYTES) {
        let sample = S::read(chunk);
        S::from_sample(f32::from_sample(sample) * scaler).write(chunk);
    }
}

fn scale_increment<S: PcmSample>(
    buf: &mut [u8],
    channels: usize,
    mut scaler: f32,
    increment: f32,
    target: f32,
) where
    f32: FromSample<S>,
{
    for frame in buf.chunks_exact_mut(S::BYTES * channels) {
        for chunk in frame.chunks_exact_mut(S::BYTES) {
            let sample = S::read(chunk);
            S::from_sample(f32::from_sample(sample) * scaler).write(chunk);
        }
        scaler += increment;
        if (increment > 0.0 && scaler > target) || (increment < 0.0 && scaler < target) {
            scaler = target;
        }
    }
}

/// Overwrites `buf` with silence for `format`.
pub fn mute_buffer(buf: &mut [u8], format: SampleFormat) -> Result<()> {
    dispatch!(format, silence(buf));
    Ok(())
}

/// Whether every sample in `buf` is silence for `format`.
pub fn is_silent(buf: &[u8], format: SampleFormat) -> Result<bool> {
    Ok(dispatch!(format, all_equilibrium(buf)))
}

/// Multiplies every sample by `scaler`.
pub fn scale_buffer(buf: &mut [u8], format: SampleFormat, scaler: f32) -> Result<()> {
    dispatch!(format, scale(buf, scaler));
    Ok(())
}

/// Multiplies frame `i` by `scaler + i * increment`, stopping at `target`.
pub fn scale_buffer_increment(
    buf: &mut [u8],
    format: SampleFormat,
    channels: usize,
    scaler: f32,
    increment: f32,
    target: f32,
) -> Result<()> {
    if channels == 0 {
        return Err(IoDevError::InvalidArgument(
            "Cannot scale a zero-channel buffer".to_string(),
        ));
    }
    dispatch!(
        format,
        scale_increment(buf, channels, scaler, increment, target)
    );
    Ok(())
}
