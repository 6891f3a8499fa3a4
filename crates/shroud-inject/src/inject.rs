use log::trace;
use rand_core::{CryptoRng, RngCore};

use shroud_cipher::seal_record;
use shroud_core::{ShroudError, ShroudResult};
use shroud_flow::{generate_filler, FillerConfig};
use shroud_hal::SessionAdapter;

/// Seals and emits one filler record under the session's write lock.
///
/// Returns the filler payload length. The write sequence advances only after
/// the transport accepted the record.
pub fn inject_one<R: RngCore + CryptoRng + ?Sized>(
    session: &dyn SessionAdapter,
    config: &FillerConfig,
    rng: &mut R,
) -> ShroudResult<usize> {
    let mut payload_len = 0;
    session.with_write_path(&mut |path| {
        let cipher = path.current_write_cipher().ok_or(ShroudError::CipherUnavailable)?;
        let seq = path.current_write_nonce();

        let inner = generate_filler(config.min_len, config.max_len, rng)?;
        let len = inner.len() - 1;
        let record = seal_record(cipher, &seq, inner)?;

        path.inject_raw_record(&record)?;
        path.advance_write_sequence();

        trace!("filler record: seq={} payload={} wire={}", u64::from_be_bytes(seq), len, record.len());
        payload_len = len;
        Ok(())
    })?;
    Ok(payload_len)
}
