use std::sync::Mutex;

use shroud_cipher::{seq_to_bytes, RecordCipher, SequenceBytes, TrafficKeys};
use shroud_core::{ShroudError, ShroudResult};
use shroud_hal::{SessionAdapter, WritePath};

struct Loopback {
    cipher: Option<RecordCipher>,
    seq: u64,
    wire: Vec<u8>,
}

impl WritePath for Loopback {
    fn current_write_cipher(&self) -> Option<&RecordCipher> { self.cipher.as_ref() }
    fn current_write_nonce(&self) -> SequenceBytes { seq_to_bytes(self.seq) }
    fn inject_raw_record(&mut self, record: &[u8]) -> ShroudResult<()> {
        self.wire.extend_from_slice(record);
        Ok(())
    }
    fn advance_write_sequence(&mut self) { self.seq += 1; }
}

struct LoopbackSession(Mutex<Loopback>);

impl SessionAdapter for LoopbackSession {
    fn with_write_path(
        &self,
        op: &mut dyn FnMut(&mut dyn WritePath) -> ShroudResult<()>,
    ) -> ShroudResult<()> {
        let mut guard = self.0.lock().unwrap();
        op(&mut *guard)
    }
}

#[test]
fn test_trait_object_safety() {
    let session = LoopbackSession(Mutex::new(Loopback { cipher: None, seq: 7, wire: Vec::new() }));
    let obj: &dyn SessionAdapter = &session;

    assert!(!obj.has_write_cipher());
    obj.with_write_path(&mut |path| {
        assert_eq!(path.current_write_nonce(), seq_to_bytes(7));
        path.inject_raw_record(&[0x17, 0x03, 0x03, 0x00, 0x00])?;
        path.advance_write_sequence();
        Ok(())
    })
    .unwrap();

    let inner = session.0.lock().unwrap();
    assert_eq!(inner.seq, 8);
    assert_eq!(inner.wire.len(), 5);
}

#[test]
fn test_error_propagates_out_of_write_path() {
    let keys = TrafficKeys { key: [1; 32], iv: [2; 12] };
    let session = LoopbackSession(Mutex::new(Loopback {
        cipher: Some(RecordCipher::new(&keys)),
        seq: 0,
        wire: Vec::new(),
    }));

    assert!(session.has_write_cipher());
    let res = session.with_write_path(&mut |_| Err(ShroudError::Transport("closed".into())));
    assert_eq!(res, Err(ShroudError::Transport("closed".into())));
}
