//! Uniform random integers over a closed range.

use rand::Rng;
use thiserror::Error;

/// Errors produced by the dice generator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DiceError {
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: i64, max: i64 },
}

/// Draw a value uniformly from `min..=max` using the thread-local generator.
pub fn random_in_range(min: i64, max: i64) -> Result<i64, DiceError> {
    random_in_range_with(&mut rand::thread_rng(), min, max)
}

/// Draw a value uniformly from `min..=max` using the given generator.
pub fn random_in_range_with<R: Rng + ?Sized>(
    rng: &mut R,
    min: i64,
    max: i64,
) -> Result<i64, DiceError> {
    if min > max {
        return Err(DiceError::InvalidRange { min, max });
    }
    Ok(rng.gen_range(min..=max))
}
