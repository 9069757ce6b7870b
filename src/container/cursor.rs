use crate::error::{Error, Result};

/// Bounds-checked little-endian reader over a container's bytes.
///
/// Every read names the structure being read so a short file reports what
/// was cut off.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn bit_position(&self) -> usize {
        self.pos * 8
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Everything not yet read
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Bytes between `start` and the current position
    pub fn since(&self, start: usize) -> &'a [u8] {
        &self.data[start.min(self.pos)..self.pos]
    }

    pub fn bytes(&mut self, n: usize, what: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated { what, needed: n, available: self.remaining() });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn skip(&mut self, n: usize, what: &'static str) -> Result<()> {
        self.bytes(n, what).map(|_| ())
    }

    pub fn u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.bytes(1, what)?[0])
    }

    pub fn u16_le(&mut self, what: &'static str) -> Result<u16> {
        let b = self.bytes(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u24_le(&mut self, what: &'static str) -> Result<u32> {
        let b = self.bytes(3, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    pub fn u32_le(&mut self, what: &'static str) -> Result<u32> {
        let b = self.bytes(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u32_be(&mut self, what: &'static str) -> Result<u32> {
        let b = self.bytes(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64_le(&mut self, what: &'static str) -> Result<u64> {
        let b = self.bytes(8, what)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    /// Little-endian unsigned integer of 0 to 8 bytes
    pub fn uint_le(&mut self, size: usize, what: &'static str) -> Result<u64> {
        let b = self.bytes(size.min(8), what)?;
        Ok(b.iter().rev().fold(0u64, |acc, &byte| (acc << 8) | byte as u64))
    }

    /// Zero-terminated byte string, without its terminator
    pub fn until_nul(&mut self, what: &'static str) -> Result<&'a [u8]> {
        let rest = self.rest();
        let Some(end) = memchr::memchr(0, rest) else {
            return Err(Error::Truncated { what, needed: rest.len() + 1, available: rest.len() });
        };
        self.pos += end + 1;
        Ok(&rest[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.u8("a").unwrap(), 0x01);
        assert_eq!(cursor.u16_le("b").unwrap(), 0x0302);
        assert_eq!(cursor.u24_le("c").unwrap(), 0x060504);
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.uint_le(2, "d").unwrap(), 0x0807);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_big_endian_read() {
        let mut cursor = ByteCursor::new(&[0x11, 0xE6, 0x03, 0x98]);
        assert_eq!(cursor.u32_be("adler").unwrap(), 0x11E6_0398);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_truncated_names_structure() {
        let mut cursor = ByteCursor::new(&[0xAA, 0xBB]);
        match cursor.u32_le("trailer") {
            Err(Error::Truncated { what, needed, available }) => {
                assert_eq!(what, "trailer");
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        // A failed read does not move the cursor
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_until_nul() {
        let data = b"name.txt\0rest";
        let mut cursor = ByteCursor::new(data);
        assert_eq!(cursor.until_nul("FNAME").unwrap(), b"name.txt");
        assert_eq!(cursor.rest(), b"rest");
        assert_eq!(cursor.since(0), b"name.txt\0");
        assert!(cursor.until_nul("FCOMMENT").is_err());
    }
}
