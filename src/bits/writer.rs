/// Bit-level writer for assembling DEFLATE streams by hand
///
/// Header fields and extra bits are packed LSB-first; Huffman codes are
/// written most significant bit first, as DEFLATE stores them. Used to build
/// test vectors for the decoder, including deliberately malformed ones.
pub struct BitWriter {
    output: Vec<u8>,
    /// Current byte being built
    current_byte: u8,
    /// Bits written to current byte (0-7)
    bits_in_byte: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self { output: Vec::new(), current_byte: 0, bits_in_byte: 0 }
    }

    /// Write the low `n` bits (0-32) of `value` in LSB-first order
    pub fn write_bits(&mut self, value: u32, n: u8) -> &mut Self {
        debug_assert!(n <= 32);

        for i in 0..n {
            self.current_byte |= (((value >> i) & 1) as u8) << self.bits_in_byte;
            self.bits_in_byte += 1;
            if self.bits_in_byte == 8 {
                self.output.push(self.current_byte);
                self.current_byte = 0;
                self.bits_in_byte = 0;
            }
        }
        self
    }

    /// Write an `n`-bit Huffman code, most significant bit first
    pub fn write_code(&mut self, code: u32, n: u8) -> &mut Self {
        self.write_bits(reverse_bits(code, n), n)
    }

    /// Write a 3-bit block header
    pub fn write_block_header(&mut self, last: bool, block_type: u8) -> &mut Self {
        self.write_bits(last as u32, 1).write_bits(block_type as u32, 2)
    }

    /// Pad to byte boundary with zero bits
    pub fn align_to_byte(&mut self) -> &mut Self {
        if self.bits_in_byte > 0 {
            self.output.push(self.current_byte);
            self.current_byte = 0;
            self.bits_in_byte = 0;
        }
        self
    }

    /// Write a 16-bit little-endian value
    pub fn write_u16_le(&mut self, value: u16) -> &mut Self {
        self.write_bits(value as u32, 16)
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.write_bits(b as u32, 8);
        }
        self
    }

    /// Number of bits written so far
    pub fn bit_len(&self) -> usize {
        self.output.len() * 8 + self.bits_in_byte as usize
    }

    /// Zero-pad the last byte and return the output
    pub fn finish(&mut self) -> Vec<u8> {
        self.align_to_byte();
        std::mem::take(&mut self.output)
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reverse the bottom `n` bits of `value`
pub fn reverse_bits(value: u32, n: u8) -> u32 {
    let mut result = 0u32;
    let mut v = value;
    for _ in 0..n {
        result = (result << 1) | (v & 1);
        v >>= 1;
    }
    result
}
