use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info};

use shroud_cipher::{open_record, seal_record, seq_to_bytes, RecordCipher, SequenceBytes, TrafficKeys};
use shroud_core::{
    RecordHeader, ShroudError, ShroudResult, CONTENT_TYPE_APPLICATION_DATA, MAX_PLAINTEXT_LEN,
};
use shroud_hal::{SessionAdapter, WritePath};

pub mod relay;

fn transport_err(e: io::Error) -> ShroudError {
    ShroudError::Transport(e.to_string())
}

/// Write half of a session: wire, cipher and sequence behind one lock.
struct WriteState {
    stream: TcpStream,
    cipher: Option<RecordCipher>,
    seq: u64,
}

impl WritePath for WriteState {
    fn current_write_cipher(&self) -> Option<&RecordCipher> {
        self.cipher.as_ref()
    }

    fn current_write_nonce(&self) -> SequenceBytes {
        seq_to_bytes(self.seq)
    }

    fn inject_raw_record(&mut self, record: &[u8]) -> ShroudResult<()> {
        self.stream.write_all(record).map_err(transport_err)
    }

    fn advance_write_sequence(&mut self) {
        self.seq += 1;
    }
}

/// Record-protected session over a TCP stream.
///
/// Genuine writes go through [`TcpSession::send`]; injected records go
/// through the [`SessionAdapter`] impl. Both take the same lock.
pub struct TcpSession {
    write: Mutex<WriteState>,
    peer: String,
}

impl TcpSession {
    pub fn new(stream: TcpStream) -> anyhow::Result<Self> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| "?".into());
        Ok(Self {
            write: Mutex::new(WriteState { stream, cipher: None, seq: 0 }),
            peer,
        })
    }

    pub fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::new(stream)
    }

    fn lock_write(&self) -> MutexGuard<'_, WriteState> {
        self.write.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handshake completion: installs the write keys and restarts the sequence.
    pub fn install_cipher(&self, keys: &TrafficKeys) {
        let mut state = self.lock_write();
        state.cipher = Some(RecordCipher::new(keys));
        state.seq = 0;
        info!("session {}: write cipher installed", self.peer);
    }

    /// Teardown: the write direction becomes unusable.
    pub fn clear_cipher(&self) {
        self.lock_write().cipher = None;
        info!("session {}: write cipher cleared", self.peer);
    }

    pub fn write_sequence(&self) -> u64 {
        self.lock_write().seq
    }

    /// Genuine application write. Splits `data` into records of at most
    /// 2^14 bytes of content.
    pub fn send(&self, data: &[u8]) -> ShroudResult<()> {
        let mut state = self.lock_write();
        for chunk in data.chunks(MAX_PLAINTEXT_LEN) {
            let mut inner = Vec::with_capacity(chunk.len() + 1);
            inner.extend_from_slice(chunk);
            inner.push(CONTENT_TYPE_APPLICATION_DATA);

            let seq = state.current_write_nonce();
            let cipher = state.cipher.as_ref().ok_or(ShroudError::CipherUnavailable)?;
            let record = seal_record(cipher, &seq, inner)?;
            state.inject_raw_record(&record)?;
            state.advance_write_sequence();
        }
        debug!("session {}: sent {} bytes", self.peer, data.len());
        Ok(())
    }

    /// Half-closes the write direction so the peer sees end of stream.
    pub fn shutdown(&self) -> ShroudResult<()> {
        self.lock_write().stream.shutdown(Shutdown::Write).map_err(transport_err)
    }

    pub fn try_clone_reader(&self) -> anyhow::Result<TcpStream> {
        Ok(self.lock_write().stream.try_clone()?)
    }
}

impl SessionAdapter for TcpSession {
    fn with_write_path(
        &self,
        op: &mut dyn FnMut(&mut dyn WritePath) -> ShroudResult<()>,
    ) -> ShroudResult<()> {
        let mut state = self.lock_write();
        op(&mut *state)
    }
}

/// Receiving side: reads whole records and opens them in sequence.
pub struct RecordReader<R> {
    inner: R,
    cipher: RecordCipher,
    seq: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R, keys: &TrafficKeys) -> Self {
        Self { inner, cipher: RecordCipher::new(keys), seq: 0 }
    }

    pub fn records_read(&self) -> u64 {
        self.seq
    }

    /// Next record's inner content type and content. `None` on clean end of stream.
    pub fn read_record(&mut self) -> ShroudResult<Option<(u8, Vec<u8>)>> {
        let mut header_buf = [0u8; RecordHeader::SIZE];
        match self.inner.read_exact(&mut header_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(transport_err(e)),
        }
        let header = RecordHeader::from_bytes(&header_buf)?;

        let mut record = vec![0u8; RecordHeader::SIZE + header.length as usize];
        record[..RecordHeader::SIZE].copy_from_slice(&header_buf);
        self.inner
            .read_exact(&mut record[RecordHeader::SIZE..])
            .map_err(transport_err)?;

        let opened = open_record(&self.cipher, &seq_to_bytes(self.seq), &record)?;
        self.seq += 1;
        Ok(Some(opened))
    }
}
