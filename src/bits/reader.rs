use crate::error::InflateError;

/// Bit-level reader over an in-memory DEFLATE stream
///
/// DEFLATE packs fields LSB-first: the first bit of the stream is the low bit
/// of the first byte, and a multi-bit field's first bit is its least
/// significant bit. Whole bytes are pulled from the input only when needed, so
/// at most 7 bits are ever held back between calls.
pub struct BitReader<'a> {
    input: &'a [u8],
    /// Bytes pulled from `input` so far
    consumed: usize,
    /// Bits pulled but not yet handed out (low bits first)
    buffer: u32,
    /// Number of valid bits in buffer (0-7 between calls)
    bits_available: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, consumed: 0, buffer: 0, bits_available: 0 }
    }

    /// Take `n` bits (0-24) in LSB-first order.
    ///
    /// Fails with [`InflateError::InputExhausted`] when the input ends first.
    pub fn take_bits(&mut self, n: u8) -> Result<u32, InflateError> {
        debug_assert!(n <= 24, "Cannot take more than 24 bits at once");

        let mut value = self.buffer as u64;
        let mut have = self.bits_available;
        while have < n {
            let byte = *self.input.get(self.consumed).ok_or(InflateError::InputExhausted)?;
            value |= (byte as u64) << have;
            self.consumed += 1;
            have += 8;
        }

        self.buffer = (value >> n) as u32;
        self.bits_available = have - n;
        Ok((value & ((1u64 << n) - 1)) as u32)
    }

    /// Take a single bit
    #[inline]
    pub fn take_bit(&mut self) -> Result<u32, InflateError> {
        self.take_bits(1)
    }

    /// Drop the unread bits of the current byte.
    ///
    /// Returns `(value, count)` of the discarded bits so callers can report them.
    pub fn align_to_byte(&mut self) -> (u32, u8) {
        let discarded = (self.buffer, self.bits_available);
        self.buffer = 0;
        self.bits_available = 0;
        discarded
    }

    /// Take `n` whole bytes straight from the input. Only valid when aligned.
    ///
    /// Returns `None` without consuming anything if fewer than `n` remain.
    pub fn take_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        debug_assert_eq!(self.bits_available, 0, "take_bytes requires byte alignment");
        let end = self.consumed.checked_add(n)?;
        let bytes = self.input.get(self.consumed..end)?;
        self.consumed = end;
        Some(bytes)
    }

    /// Current position in bits from the start of the input
    #[inline]
    pub fn bit_position(&self) -> usize {
        self.consumed * 8 - self.bits_available as usize
    }

    /// Whole bytes pulled from the input, including a partially used last byte
    pub fn bytes_consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes not yet pulled from the input
    pub fn bytes_remaining(&self) -> usize {
        self.input.len() - self.consumed
    }

    /// Length of the whole input in bytes
    pub fn input_len(&self) -> usize {
        self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_bits() {
        // Binary: 11010011 10101010 = 0xD3 0xAA
        let data = [0xD3, 0xAA];
        let mut reader = BitReader::new(&data);

        // bits 0-2: 011
        assert_eq!(reader.take_bits(3).unwrap(), 0b011);
        // bits 3-7: 11010
        assert_eq!(reader.take_bits(5).unwrap(), 0b11010);
        assert_eq!(reader.take_bits(8).unwrap(), 0xAA);
    }

    #[test]
    fn test_take_bit() {
        let data = [0b10110001];
        let mut reader = BitReader::new(&data);

        let bits: Vec<u32> = (0..8).map(|_| reader.take_bit().unwrap()).collect();
        assert_eq!(bits, vec![1, 0, 0, 0, 1, 1, 0, 1]);
    }

    #[test]
    fn test_take_zero_bits() {
        let data: [u8; 0] = [];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.take_bits(0).unwrap(), 0);
        assert_eq!(reader.bit_position(), 0);
    }

    #[test]
    fn test_never_buffers_a_whole_byte() {
        let data = [0xFF, 0x00, 0x5A];
        let mut reader = BitReader::new(&data);

        reader.take_bits(3).unwrap();
        assert_eq!(reader.bytes_consumed(), 1);
        reader.take_bits(5).unwrap();
        assert_eq!(reader.bytes_consumed(), 1);
        reader.take_bits(9).unwrap();
        assert_eq!(reader.bytes_consumed(), 3);
        assert_eq!(reader.bit_position(), 17);
    }

    #[test]
    fn test_align_to_byte() {
        let data = [0xFF, 0xAB];
        let mut reader = BitReader::new(&data);

        reader.take_bits(3).unwrap();
        assert_eq!(reader.align_to_byte(), (0b11111, 5));
        assert_eq!(reader.bit_position(), 8);
        assert_eq!(reader.take_bits(8).unwrap(), 0xAB);
    }

    #[test]
    fn test_take_bytes() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.take_bytes(2), Some(&data[..2]));
        assert_eq!(reader.take_bytes(2), None);
        assert_eq!(reader.bytes_remaining(), 1);
        assert_eq!(reader.take_bytes(1), Some(&data[2..]));
    }

    #[test]
    fn test_cross_byte_boundary() {
        let data = [0xFF, 0x00];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.take_bits(12).unwrap(), 0x0FF);
    }

    #[test]
    fn test_input_exhausted() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);

        reader.take_bits(6).unwrap();
        assert_eq!(reader.take_bits(3), Err(InflateError::InputExhausted));
    }
}
