//! Little-endian binary codec used inside snapshots.
//!
//! Fixed-width fields use [`byteorder`]; strings are a `u32` length
//! prefix followed by raw bytes.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, VfsError};

/// Writes a `u8`.
pub fn write_u8(dest: &mut impl Write, v: u8) -> Result<()> {
    dest.write_u8(v).map_err(|e| VfsError::IoError(e.to_string()))
}

/// Writes a `u32`, little-endian.
pub fn write_u32(dest: &mut impl Write, v: u32) -> Result<()> {
    dest.write_u32::<LittleEndian>(v).map_err(|e| VfsError::IoError(e.to_string()))
}

/// Writes an `i64`, little-endian.
pub fn write_i64(dest: &mut impl Write, v: i64) -> Result<()> {
    dest.write_i64::<LittleEndian>(v).map_err(|e| VfsError::IoError(e.to_string()))
}

/// Writes a length-prefixed string. Fails if `s` is longer than `u32::MAX` bytes.
pub fn write_str(dest: &mut impl Write, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    if bytes.len() > u32::MAX as usize {
        return Err(VfsError::DecodeError(format!(
            "string of {} bytes exceeds u32 length prefix",
            bytes.len()
        )));
    }
    write_u32(dest, bytes.len() as u32)?;
    dest.write_all(bytes).map_err(|e| VfsError::IoError(e.to_string()))
}

/// Reads a `u8`, failing with [`VfsError::DecodeError`] on premature end.
pub fn read_u8(src: &mut impl Read) -> Result<u8> {
    src.read_u8().map_err(|e| VfsError::DecodeError(format!("unexpected eof: {e}")))
}

/// Reads a `u32`, little-endian.
pub fn read_u32(src: &mut impl Read) -> Result<u32> {
    src.read_u32::<LittleEndian>().map_err(|e| VfsError::DecodeError(format!("unexpected eof: {e}")))
}

/// Reads an `i64`, little-endian.
pub fn read_i64(src: &mut impl Read) -> Result<i64> {
    src.read_i64::<LittleEndian>().map_err(|e| VfsError::DecodeError(format!("unexpected eof: {e}")))
}

/// Reads a length-prefixed string.
pub fn read_str(src: &mut impl Read) -> Result<String> {
    let len = read_u32(src)? as usize;
    let mut buf = vec![0u8; len];
    src.read_exact(&mut buf).map_err(|e| VfsError::DecodeError(format!("unexpected eof: {e}")))?;
    String::from_utf8(buf).map_err(|e| VfsError::DecodeError(format!("invalid utf8: {e}")))
}

/// Writes a length-prefixed raw byte blob, unlike [`write_str`] this does
/// not require valid UTF-8 — used for nested AST payloads, which are
/// binary themselves.
pub fn write_bytes_field(dest: &mut impl Write, bytes: &[u8]) -> Result<()> {
    if bytes.len() > u32::MAX as usize {
        return Err(VfsError::DecodeError(format!("byte field of {} bytes exceeds u32 length prefix", bytes.len())));
    }
    write_u32(dest, bytes.len() as u32)?;
    dest.write_all(bytes).map_err(|e| VfsError::IoError(e.to_string()))
}

/// Reads a length-prefixed raw byte blob written by [`write_bytes_field`].
pub fn read_bytes_field(src: &mut impl Read) -> Result<Vec<u8>> {
    let len = read_u32(src)? as usize;
    let mut buf = vec![0u8; len];
    src.read_exact(&mut buf).map_err(|e| VfsError::DecodeError(format!("unexpected eof: {e}")))?;
    Ok(buf)
}

/// Fails with [`VfsError::DecodeError`] (`TrailingBytes`) if the reader is not exhausted.
pub fn expect_eof(src: &mut impl Read) -> Result<()> {
    let mut buf = [0u8; 1];
    match src.read(&mut buf) {
        Ok(0) => Ok(()),
        Ok(_) => Err(VfsError::DecodeError("trailing bytes after composite payload".into())),
        Err(e) => Err(VfsError::DecodeError(format!("eof probe failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_primitives() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 7).unwrap();
        write_u32(&mut buf, 0xdead_beef).unwrap();
        write_i64(&mut buf, -42).unwrap();
        write_str(&mut buf, "hello").unwrap();

        let mut cur = Cursor::new(buf);
        assert_eq!(read_u8(&mut cur).unwrap(), 7);
        assert_eq!(read_u32(&mut cur).unwrap(), 0xdead_beef);
        assert_eq!(read_i64(&mut cur).unwrap(), -42);
        assert_eq!(read_str(&mut cur).unwrap(), "hello");
        expect_eof(&mut cur).unwrap();
    }

    #[test]
    fn premature_eof_is_decode_error() {
        let mut cur = Cursor::new(Vec::<u8>::new());
        assert!(matches!(read_u32(&mut cur), Err(VfsError::DecodeError(_))));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 1).unwrap();
        buf.push(0xff);
        let mut cur = Cursor::new(buf);
        read_u8(&mut cur).unwrap();
        assert!(matches!(expect_eof(&mut cur), Err(VfsError::DecodeError(_))));
    }

    #[test]
    fn string_too_long_is_encode_error() {
        // Can't actually allocate u32::MAX+1 bytes in a test; exercise the
        // boundary check logic directly would require unsafe length
        // spoofing, so this simply documents the contract via a small
        // string that succeeds.
        let mut buf = Vec::new();
        assert!(write_str(&mut buf, "ok").is_ok());
    }
}
