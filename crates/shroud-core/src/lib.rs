#![forbid(unsafe_code)]

//! Record-layer constants, the outer record header and the shared error type.

/// Outer (and inner) content type for application data.
pub const CONTENT_TYPE_APPLICATION_DATA: u8 = 0x17;

/// Frozen `legacy_record_version` carried by every TLS 1.3 record.
pub const LEGACY_RECORD_VERSION: u16 = 0x0303;

/// Largest plaintext a single record may carry (2^14).
pub const MAX_PLAINTEXT_LEN: usize = 16_384;

/// Largest ciphertext a single record may carry (2^14 + 256).
pub const MAX_CIPHERTEXT_LEN: usize = MAX_PLAINTEXT_LEN + 256;

/// Filler payloads leave one byte of the plaintext budget for the inner content type.
pub const MAX_FILLER_LEN: usize = MAX_PLAINTEXT_LEN;

pub type ShroudResult<T> = Result<T, ShroudError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShroudError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("injection already running")]
    AlreadyRunning,
    #[error("no write cipher installed on session")]
    CipherUnavailable,
    #[error("random source failure")]
    RngFailure,
    #[error("record sealing failed")]
    CryptoFailure,
    #[error("record authentication failed")]
    AuthFail,
    #[error("malformed record")]
    WireFormat,
    #[error("record exceeds length limit")]
    RecordOverflow,
    #[error("transport write failed: {0}")]
    Transport(String),
    #[error("failed to spawn injection worker: {0}")]
    Spawn(String),
}

impl ShroudError {
    /// Conditions that end a background injection run.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            ShroudError::CipherUnavailable
                | ShroudError::RngFailure
                | ShroudError::CryptoFailure
                | ShroudError::RecordOverflow
                | ShroudError::Transport(_)
        )
    }
}

/// The 5-byte outer record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: u8,
    pub version: u16,
    pub length: u16,
}

impl RecordHeader {
    pub const SIZE: usize = 5;

    /// Application-data header for a ciphertext of `ciphertext_len` bytes.
    pub fn application_data(ciphertext_len: usize) -> ShroudResult<Self> {
        if ciphertext_len > MAX_CIPHERTEXT_LEN {
            return Err(ShroudError::RecordOverflow);
        }
        Ok(Self {
            content_type: CONTENT_TYPE_APPLICATION_DATA,
            version: LEGACY_RECORD_VERSION,
            length: ciphertext_len as u16,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.content_type;
        buf[1..3].copy_from_slice(&self.version.to_be_bytes());
        buf[3..5].copy_from_slice(&self.length.to_be_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> ShroudResult<Self> {
        if buf.len() < Self::SIZE {
            return Err(ShroudError::WireFormat);
        }
        let header = Self {
            content_type: buf[0],
            version: u16::from_be_bytes([buf[1], buf[2]]),
            length: u16::from_be_bytes([buf[3], buf[4]]),
        };
        if header.content_type != CONTENT_TYPE_APPLICATION_DATA
            || header.version != LEGACY_RECORD_VERSION
        {
            return Err(ShroudError::WireFormat);
        }
        if header.length as usize > MAX_CIPHERTEXT_LEN {
            return Err(ShroudError::RecordOverflow);
        }
        Ok(header)
    }
}
