use shroud_core::{RecordHeader, ShroudError, CONTENT_TYPE_APPLICATION_DATA};

#[test]
fn test_parse_live_header() {
    let header = RecordHeader::from_bytes(&[0x17, 0x03, 0x03, 0x05, 0x7d, 0xAA]).unwrap();
    assert_eq!(header.content_type, CONTENT_TYPE_APPLICATION_DATA);
    assert_eq!(header.length, 1405);
}

#[test]
fn test_reject_foreign_headers() {
    // Handshake record
    assert_eq!(RecordHeader::from_bytes(&[0x16, 0x03, 0x03, 0, 1]), Err(ShroudError::WireFormat));
    // TLS 1.0 version field
    assert_eq!(RecordHeader::from_bytes(&[0x17, 0x03, 0x01, 0, 1]), Err(ShroudError::WireFormat));
    // Truncated
    assert_eq!(RecordHeader::from_bytes(&[0x17, 0x03]), Err(ShroudError::WireFormat));
    // Length beyond 2^14 + 256
    assert_eq!(RecordHeader::from_bytes(&[0x17, 0x03, 0x03, 0x41, 0x01]), Err(ShroudError::RecordOverflow));
}
