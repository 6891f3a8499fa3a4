use std::io::Read;

use log::{debug, info};

use shroud_cipher::TrafficKeys;
use shroud_core::ShroudResult;

use crate::RecordReader;

/// HKDF label for the connecting side's write direction.
pub const CLIENT_WRITE_LABEL: &[u8] = b"shroud c2s";

pub fn client_write_keys(secret: &[u8]) -> ShroudResult<TrafficKeys> {
    TrafficKeys::derive(secret, CLIENT_WRITE_LABEL)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveSummary {
    pub records: u64,
    pub bytes: u64,
}

/// Reads and opens records until end of stream, handing each content to `on_record`.
///
/// Filler and genuine records are indistinguishable here; the application
/// protocol above is what discards filler.
pub fn drain<R: Read>(
    reader: &mut RecordReader<R>,
    mut on_record: impl FnMut(u8, &[u8]),
) -> ShroudResult<ReceiveSummary> {
    let mut summary = ReceiveSummary::default();
    while let Some((content_type, content)) = reader.read_record()? {
        summary.records += 1;
        summary.bytes += content.len() as u64;
        debug!("record #{}: type={:#04x} len={}", summary.records, content_type, content.len());
        on_record(content_type, &content);
    }
    info!("stream closed: {} records, {} content bytes", summary.records, summary.bytes);
    Ok(summary)
}
