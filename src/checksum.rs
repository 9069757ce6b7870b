//! Running checksums fed with decoded output.

/// A 32-bit checksum updated incrementally as output is produced
pub trait RunningChecksum {
    fn update(&mut self, bytes: &[u8]);

    /// Checksum of everything seen so far
    fn value(&self) -> u32;

    /// Short algorithm name for reports
    fn name(&self) -> &'static str;
}

/// Largest prime below 65536
const ADLER_MOD: u32 = 65521;

/// Bytes that can be summed before `b` may overflow 32 bits
const ADLER_NMAX: usize = 5552;

/// Adler-32 (RFC 1950), the zlib trailer checksum
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Adler-32 of a complete buffer
    pub fn checksum(bytes: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(bytes);
        adler.value()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningChecksum for Adler32 {
    fn update(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(ADLER_NMAX) {
            for &byte in chunk {
                self.a += byte as u32;
                self.b += self.a;
            }
            self.a %= ADLER_MOD;
            self.b %= ADLER_MOD;
        }
    }

    fn value(&self) -> u32 {
        (self.b << 16) | self.a
    }

    fn name(&self) -> &'static str {
        "adler32"
    }
}

impl RunningChecksum for crc32fast::Hasher {
    fn update(&mut self, bytes: &[u8]) {
        crc32fast::Hasher::update(self, bytes);
    }

    fn value(&self) -> u32 {
        self.clone().finalize()
    }

    fn name(&self) -> &'static str {
        "crc32"
    }
}
