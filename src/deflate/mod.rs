//! DEFLATE (RFC 1951) decoder with bit-level reporting.
//!
//! Decoding is split the way the format is: [`inflate`] reads block headers
//! and stored blocks, `dynamic` reads the code description of a dynamic
//! block, and `codes` turns literal/length/distance symbols into output.

mod codes;
mod dynamic;
pub mod inflate;
pub mod output;
pub mod stats;
pub mod tables;

pub use inflate::{BlockType, InflateConfig, Inflated, Inflater};
pub use output::Destination;
pub use stats::SymbolStats;

use crate::report::NullReporter;

/// Status-code entry point.
///
/// `dest_len` holds the space available in `dest` (ignored when `dest` is
/// `None`, which only measures) and `source_len` the input available in
/// `source`. Returns 0 on success, with `dest_len` set to the bytes
/// produced and `source_len` to the bytes consumed. Any other return leaves
/// both untouched; see [`InflateError::status`](crate::error::InflateError::status)
/// for the meaning of each code.
pub fn decode(
    dest: Option<&mut [u8]>,
    dest_len: &mut usize,
    source: &[u8],
    source_len: &mut usize,
) -> i32 {
    let input = &source[..(*source_len).min(source.len())];
    let destination = match dest {
        Some(buf) => {
            let capacity = (*dest_len).min(buf.len());
            Destination::Slice(&mut buf[..capacity])
        }
        None => Destination::Measure,
    };

    match Inflater::default().inflate(input, destination, &mut NullReporter, None) {
        Ok(done) => {
            *dest_len = done.produced;
            *source_len = done.consumed;
            0
        }
        Err(failure) => failure.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stored() {
        let source = [0x01, 0x01, 0x00, 0xFE, 0xFF, 0x0A, 0xEE];
        let mut buf = [0u8; 8];
        let mut dest_len = buf.len();
        let mut source_len = source.len();

        assert_eq!(decode(Some(&mut buf), &mut dest_len, &source, &mut source_len), 0);
        assert_eq!(dest_len, 1);
        assert_eq!(source_len, 6);
        assert_eq!(buf[0], 0x0A);
    }

    #[test]
    fn test_decode_measure_then_real() {
        let source = [0x01, 0x03, 0x00, 0xFC, 0xFF, 1, 2, 3];
        let mut dest_len = 0;
        let mut source_len = source.len();
        assert_eq!(decode(None, &mut dest_len, &source, &mut source_len), 0);
        assert_eq!((dest_len, source_len), (3, 8));

        let mut buf = vec![0u8; dest_len];
        let mut real_source_len = source.len();
        assert_eq!(decode(Some(&mut buf), &mut dest_len, &source, &mut real_source_len), 0);
        assert_eq!(dest_len, 3);
        assert_eq!(real_source_len, source_len);
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_decode_failure_leaves_lengths() {
        let source = [0x07];
        let mut dest_len = 17;
        let mut source_len = 1;
        assert_eq!(decode(None, &mut dest_len, &source, &mut source_len), -1);
        assert_eq!((dest_len, source_len), (17, 1));
    }

    #[test]
    fn test_decode_respects_lengths() {
        // Input length shorter than the buffer: the stored payload is cut off
        let source = [0x01, 0x01, 0x00, 0xFE, 0xFF, 0x0A];
        let mut source_len = 5;
        let mut buf = [0u8; 4];
        let mut dest_len = 4;
        assert_eq!(decode(Some(&mut buf), &mut dest_len, &source, &mut source_len), 2);

        // Output space of zero
        let mut source_len = source.len();
        let mut dest_len = 0;
        assert_eq!(decode(Some(&mut buf), &mut dest_len, &source, &mut source_len), 1);
        assert_eq!(dest_len, 0);
    }
}
