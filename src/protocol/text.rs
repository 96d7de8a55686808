//! Fixed-width string fields
//!
//! Every string on the wire occupies exactly 64 bytes: ASCII, left-justified,
//! padded with spaces.

use bytes::{BufMut, BytesMut};

use super::STRING_LENGTH;

/// Append `value` as a 64-byte space-padded field
///
/// Non-ASCII characters become `?` and anything past 64 characters is cut.
pub fn write_string(buf: &mut BytesMut, value: &str) {
    let mut written = 0;
    for c in value.chars().take(STRING_LENGTH) {
        buf.put_u8(if c.is_ascii() { c as u8 } else { b'?' });
        written += 1;
    }
    buf.put_bytes(b' ', STRING_LENGTH - written);
}

/// Read a 64-byte field, stripping trailing padding
pub fn read_string(field: &[u8]) -> String {
    let text: String = field
        .iter()
        .take(STRING_LENGTH)
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect();

    // some clients pad with NUL instead of spaces
    text.trim_end_matches([' ', '\0']).to_string()
}
