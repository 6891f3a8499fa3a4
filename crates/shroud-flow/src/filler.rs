#![forbid(unsafe_code)]

use alloc::vec::Vec;

use rand::Rng;
use rand_core::{CryptoRng, RngCore};
use shroud_core::{ShroudError, ShroudResult, CONTENT_TYPE_APPLICATION_DATA};

/// Uniform length in `[min, max]`. A fixed range draws no randomness.
pub fn sample_len<R: RngCore + CryptoRng + ?Sized>(
    min: usize,
    max: usize,
    rng: &mut R,
) -> ShroudResult<usize> {
    if min == max {
        return Ok(min);
    }
    if min > max {
        return Err(ShroudError::InvalidConfig("min_len > max_len"));
    }
    Ok(rng.gen_range(min..=max))
}

/// Builds a filler inner plaintext: `L` random bytes followed by the
/// application-data content type, exactly as a genuine record frames its content.
pub fn generate_filler<R: RngCore + CryptoRng + ?Sized>(
    min: usize,
    max: usize,
    rng: &mut R,
) -> ShroudResult<Vec<u8>> {
    let len = sample_len(min, max, rng)?;

    let mut inner = alloc::vec![0u8; len + 1];
    rng.try_fill_bytes(&mut inner[..len])
        .map_err(|_| ShroudError::RngFailure)?;
    inner[len] = CONTENT_TYPE_APPLICATION_DATA;
    Ok(inner)
}
