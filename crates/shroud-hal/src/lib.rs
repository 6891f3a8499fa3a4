#![forbid(unsafe_code)]

use shroud_cipher::{RecordCipher, SequenceBytes};
use shroud_core::ShroudResult;

/// Write direction of a live secure session.
///
/// An implementor is only ever handed out under the session's write lock, so
/// the cipher, the sequence number and the wire all stay consistent across
/// genuine writes and injected records.
pub trait WritePath {
    /// Live write cipher. `None` before the handshake completes or after teardown.
    fn current_write_cipher(&self) -> Option<&RecordCipher>;

    /// Sequence number the next record will be sealed under. Does not advance it.
    fn current_write_nonce(&self) -> SequenceBytes;

    /// Emits a complete record on the wire, bypassing application write buffering.
    fn inject_raw_record(&mut self, record: &[u8]) -> ShroudResult<()>;

    /// Advances the shared write sequence by one.
    fn advance_write_sequence(&mut self);
}

/// The session-side collaborator consumed by the injection controller.
pub trait SessionAdapter: Send + Sync {
    /// Runs `op` with exclusive access to the write direction. Genuine writes
    /// must take the same serialization point.
    fn with_write_path(
        &self,
        op: &mut dyn FnMut(&mut dyn WritePath) -> ShroudResult<()>,
    ) -> ShroudResult<()>;

    /// True once a write cipher is installed.
    fn has_write_cipher(&self) -> bool {
        let mut present = false;
        let _ = self.with_write_path(&mut |path| {
            present = path.current_write_cipher().is_some();
            Ok(())
        });
        present
    }
}
