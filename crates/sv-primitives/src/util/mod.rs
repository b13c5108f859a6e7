//! Binary serialization helpers.
//!
//! `VarInt` plus cursor-style `WireReader`/`WireWriter` types for the
//! little-endian wire format used by transactions.

use crate::PrimitivesError;

/// A protocol variable-length integer.
///
/// Encodes as 1, 3, 5 or 9 bytes depending on magnitude, prefixed with
/// 0xfd/0xfe/0xff for the wider forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Decode a VarInt from the front of `data`.
    ///
    /// Returns the value and the number of bytes consumed, or an error if
    /// the slice is too short for the indicated width.
    pub fn from_slice(data: &[u8]) -> Result<(Self, usize), PrimitivesError> {
        let mut rd = WireReader::new(data);
        let v = rd.read_varint()?;
        Ok((v, data.len() - rd.remaining()))
    }

    /// Wire-format length of this value: 1, 3, 5 or 9.
    pub fn length(&self) -> usize {
        match self.0 {
            0..=0xfc => 1,
            0xfd..=0xffff => 3,
            0x1_0000..=0xffff_ffff => 5,
            _ => 9,
        }
    }

    /// Encode into a new byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        match self.0 {
            v @ 0..=0xfc => out.push(v as u8),
            v @ 0xfd..=0xffff => {
                out.push(0xfd);
                out.extend_from_slice(&(v as u16).to_le_bytes());
            }
            v @ 0x1_0000..=0xffff_ffff => {
                out.push(0xfe);
                out.extend_from_slice(&(v as u32).to_le_bytes());
            }
            v => {
                out.push(0xff);
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        out
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VarInt {
    fn from(v: u64) -> Self {
        VarInt(v)
    }
}

impl From<usize> for VarInt {
    fn from(v: usize) -> Self {
        VarInt(v as u64)
    }
}

/// Cursor over a byte slice reading little-endian protocol data.
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        WireReader { data, pos: 0 }
    }

    /// Read `n` bytes and advance.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        if self.data.len() - self.pos < n {
            return Err(PrimitivesError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, PrimitivesError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, PrimitivesError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, PrimitivesError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, PrimitivesError> {
        let b = self.read_bytes(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }

    pub fn read_varint(&mut self) -> Result<VarInt, PrimitivesError> {
        match self.read_u8()? {
            0xff => Ok(VarInt(self.read_u64_le()?)),
            0xfe => Ok(VarInt(self.read_u32_le()? as u64)),
            0xfd => Ok(VarInt(self.read_u16_le()? as u64)),
            b => Ok(VarInt(b as u64)),
        }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Growable buffer writing little-endian protocol data.
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        WireWriter { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        WireWriter { buf: Vec::with_capacity(capacity) }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    pub fn write_u16_le(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn write_u32_le(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn write_varint(&mut self, varint: VarInt) {
        self.buf.extend_from_slice(&varint.to_bytes());
    }

    /// VarInt length prefix followed by the bytes themselves.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(VarInt::from(bytes.len()));
        self.write_bytes(bytes);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for WireWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_encoding_boundaries() {
        let cases: Vec<(u64, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (252, vec![0xfc]),
            (253, vec![0xfd, 0xfd, 0x00]),
            (65535, vec![0xfd, 0xff, 0xff]),
            (65536, vec![0xfe, 0x00, 0x00, 0x01, 0x00]),
            (4294967295, vec![0xfe, 0xff, 0xff, 0xff, 0xff]),
            (4294967296, vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]),
            (u64::MAX, vec![0xff; 9]),
        ];

        for (value, expected) in cases {
            let vi = VarInt(value);
            assert_eq!(vi.to_bytes(), expected, "encoding of {}", value);
            assert_eq!(vi.length(), expected.len(), "length of {}", value);

            let (decoded, consumed) = VarInt::from_slice(&expected).unwrap();
            assert_eq!(decoded, vi, "round trip of {}", value);
            assert_eq!(consumed, expected.len());
        }
    }

    #[test]
    fn varint_truncated_input() {
        assert!(VarInt::from_slice(&[]).is_err());
        assert!(VarInt::from_slice(&[0xfd, 0x01]).is_err());
        assert!(VarInt::from_slice(&[0xfe, 0x01, 0x02]).is_err());
        assert!(VarInt::from_slice(&[0xff, 0x01, 0x02, 0x03]).is_err());
    }

    #[test]
    fn reader_writer_roundtrip() {
        let mut w = WireWriter::new();
        w.write_u8(0x42);
        w.write_u16_le(0x1234);
        w.write_u32_le(0xDEADBEEF);
        w.write_u64_le(0x0102030405060708);
        w.write_varint(VarInt(300));
        w.write_var_bytes(b"hello");

        let data = w.into_bytes();
        let mut r = WireReader::new(&data);

        assert_eq!(r.read_u8().unwrap(), 0x42);
        assert_eq!(r.read_u16_le().unwrap(), 0x1234);
        assert_eq!(r.read_u32_le().unwrap(), 0xDEADBEEF);
        assert_eq!(r.read_u64_le().unwrap(), 0x0102030405060708);
        assert_eq!(r.read_varint().unwrap(), VarInt(300));
        let len = r.read_varint().unwrap().value() as usize;
        assert_eq!(r.read_bytes(len).unwrap(), b"hello");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn reader_eof() {
        let mut r = WireReader::new(&[0x01]);
        assert!(r.read_u8().is_ok());
        assert!(r.read_u8().is_err());
        assert!(WireReader::new(&[0x01, 0x02]).read_u32_le().is_err());
    }
}
