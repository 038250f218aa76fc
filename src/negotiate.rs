//! Picks the device format closest to what a client asked for

use crate::error::{IoDevError, Result};
use crate::format::SampleFormat;

/// Chooses a rate from `supported`.
///
/// An exact match is taken only when it is at least `min_exact_rate`. Failing
/// that, the first supported rate that is an integer multiple or divisor of the
/// request wins, then the first supported rate.
pub fn best_rate(supported: &[usize], requested: usize, min_exact_rate: usize) -> Result<usize> {
    let first = *supported
        .first()
        .ok_or_else(|| IoDevError::InvalidArgument("No supported rates".to_string()))?;

    if requested >= min_exact_rate && supported.contains(&requested) {
        return Ok(requested);
    }

    if requested > 0 {
        let multiple = supported
            .iter()
            .copied()
            .find(|&rate| rate > 0 && (rate % requested == 0 || requested % rate == 0));
        if let Some(rate) = multiple {
            return Ok(rate);
        }
    }

    Ok(first)
}

/// Chooses a channel count: exact, then `preferred`, then the first supported.
pub fn best_channels(supported: &[usize], requested: usize, preferred: usize) -> Result<usize> {
    let first = *supported
        .first()
        .ok_or_else(|| IoDevError::InvalidArgument("No supported channel counts".to_string()))?;

    if supported.contains(&requested) {
        Ok(requested)
    } else if supported.contains(&preferred) {
        Ok(preferred)
    } else {
        Ok(first)
    }
}

/// Chooses a sample encoding: exact, then the first supported.
pub fn best_format(supported: &[SampleFormat], requested: SampleFormat) -> Result<SampleFormat> {
    if supported.contains(&requested) {
        return Ok(requested);
    }
    supported
        .first()
        .copied()
        .ok_or_else(|| IoDevError::InvalidArgument("No supported sample formats".to_string()))
}
