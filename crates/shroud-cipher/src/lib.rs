#![forbid(unsafe_code)]

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Key, Nonce, Tag,
};
use hkdf::Hkdf;
use sha2::Sha256;
use shroud_core::{RecordHeader, ShroudError, ShroudResult, MAX_PLAINTEXT_LEN};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Big-endian record sequence number as handed out by the session.
pub type SequenceBytes = [u8; 8];

/// Write (or read) traffic key material for one direction.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TrafficKeys {
    pub key: [u8; KEY_LEN],
    pub iv: [u8; IV_LEN],
}

impl TrafficKeys {
    /// HKDF-SHA-256 expansion of a shared secret into one direction's key and IV.
    /// `label` separates the two directions.
    pub fn derive(secret: &[u8], label: &[u8]) -> ShroudResult<Self> {
        let hk = Hkdf::<Sha256>::new(None, secret);
        let mut keys = Self { key: [0u8; KEY_LEN], iv: [0u8; IV_LEN] };

        let mut info = Vec::with_capacity(label.len() + 4);
        info.extend_from_slice(label);
        info.extend_from_slice(b" key");
        hk.expand(&info, &mut keys.key).map_err(|_| ShroudError::CryptoFailure)?;

        info.truncate(label.len());
        info.extend_from_slice(b" iv");
        hk.expand(&info, &mut keys.iv).map_err(|_| ShroudError::CryptoFailure)?;
        Ok(keys)
    }
}

/// Per-direction record protection.
pub struct RecordCipher {
    cipher: ChaCha20Poly1305,
    iv: [u8; IV_LEN],
}

impl Drop for RecordCipher {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}

impl RecordCipher {
    pub fn new(keys: &TrafficKeys) -> Self {
        let key = Key::from_slice(&keys.key);
        Self {
            cipher: ChaCha20Poly1305::new(key),
            iv: keys.iv,
        }
    }

    // Per-record nonce: the sequence number left-padded to the IV length, XORed with the IV.
    fn construct_nonce(&self, seq: &SequenceBytes) -> Nonce {
        let mut nonce_bytes = self.iv;
        for (b, s) in nonce_bytes[IV_LEN - seq.len()..].iter_mut().zip(seq.iter()) {
            *b ^= s;
        }
        *Nonce::from_slice(&nonce_bytes)
    }

    /// Encrypts `buffer` in place and appends the tag.
    pub fn seal(&self, seq: &SequenceBytes, aad: &[u8], buffer: &mut Vec<u8>) -> ShroudResult<()> {
        let nonce = self.construct_nonce(seq);
        let tag = self
            .cipher
            .encrypt_in_place_detached(&nonce, aad, buffer)
            .map_err(|_| ShroudError::CryptoFailure)?;
        buffer.extend_from_slice(tag.as_slice());
        Ok(())
    }

    /// Verifies and decrypts `buffer` (ciphertext || tag) in place, truncating the tag.
    pub fn open(&self, seq: &SequenceBytes, aad: &[u8], buffer: &mut Vec<u8>) -> ShroudResult<()> {
        if buffer.len() < TAG_LEN {
            return Err(ShroudError::WireFormat);
        }
        let split = buffer.len() - TAG_LEN;
        let tag = Tag::clone_from_slice(&buffer[split..]);
        buffer.truncate(split);
        let nonce = self.construct_nonce(seq);
        self.cipher
            .decrypt_in_place_detached(&nonce, aad, buffer, &tag)
            .map_err(|_| ShroudError::AuthFail)
    }
}

/// Protects an inner plaintext (content || content type) as one application-data record.
///
/// The length field is fixed before sealing so the header authenticated as AAD
/// is byte-identical to the header put on the wire.
pub fn seal_record(
    cipher: &RecordCipher,
    seq: &SequenceBytes,
    inner_plaintext: Vec<u8>,
) -> ShroudResult<Vec<u8>> {
    if inner_plaintext.len() > MAX_PLAINTEXT_LEN + 1 {
        return Err(ShroudError::RecordOverflow);
    }
    let header = RecordHeader::application_data(inner_plaintext.len() + TAG_LEN)?;
    let aad = header.to_bytes();

    let mut body = inner_plaintext;
    cipher.seal(seq, &aad, &mut body)?;
    if body.len() != header.length as usize {
        return Err(ShroudError::CryptoFailure);
    }

    let mut record = Vec::with_capacity(RecordHeader::SIZE + body.len());
    record.extend_from_slice(&aad);
    record.extend_from_slice(&body);
    Ok(record)
}

/// Opens one complete record. Returns the inner content type and the content
/// with zero padding removed.
pub fn open_record(
    cipher: &RecordCipher,
    seq: &SequenceBytes,
    record: &[u8],
) -> ShroudResult<(u8, Vec<u8>)> {
    let header = RecordHeader::from_bytes(record)?;
    if record.len() != RecordHeader::SIZE + header.length as usize {
        return Err(ShroudError::WireFormat);
    }
    let aad = &record[..RecordHeader::SIZE];
    let mut body = record[RecordHeader::SIZE..].to_vec();
    cipher.open(seq, aad, &mut body)?;

    while body.last() == Some(&0) {
        body.pop();
    }
    let content_type = body.pop().ok_or(ShroudError::WireFormat)?;
    Ok((content_type, body))
}

pub fn seq_to_bytes(seq: u64) -> SequenceBytes {
    seq.to_be_bytes()
}
