use crate::checksum::RunningChecksum;
use crate::error::InflateError;

/// Where decoded bytes go
pub enum Destination<'a> {
    /// Count output bytes without storing them
    Measure,
    /// Fixed-size buffer; running out of room fails the decode
    Slice(&'a mut [u8]),
    /// Growable buffer; output is appended after any existing contents
    Vec(&'a mut Vec<u8>),
}

enum Sink<'a> {
    Measure,
    Slice(&'a mut [u8]),
    /// Buffer plus its length before this decode started
    Vec(&'a mut Vec<u8>, usize),
}

/// Output side of a single decode
///
/// Back-references only reach bytes produced by this decode. Checks on
/// distances are applied the same way whether or not bytes are stored.
pub(crate) struct Output<'a> {
    sink: Sink<'a>,
    produced: usize,
    checksum: Option<&'a mut dyn RunningChecksum>,
}

impl<'a> Output<'a> {
    pub fn new(destination: Destination<'a>, checksum: Option<&'a mut dyn RunningChecksum>) -> Self {
        let sink = match destination {
            Destination::Measure => Sink::Measure,
            Destination::Slice(buf) => Sink::Slice(buf),
            Destination::Vec(vec) => {
                let base = vec.len();
                Sink::Vec(vec, base)
            }
        };
        Self { sink, produced: 0, checksum }
    }

    /// Bytes produced so far, stored or not
    pub fn produced(&self) -> usize {
        self.produced
    }

    pub fn is_materialized(&self) -> bool {
        !matches!(self.sink, Sink::Measure)
    }

    /// Stored output of this decode (empty when measuring)
    pub fn written(&self) -> &[u8] {
        match &self.sink {
            Sink::Measure => &[],
            Sink::Slice(buf) => &buf[..self.produced],
            Sink::Vec(vec, base) => &vec[*base..],
        }
    }

    fn reserve(&mut self, n: usize) -> Result<(), InflateError> {
        match &mut self.sink {
            Sink::Slice(buf) if buf.len() - self.produced < n => Err(InflateError::OutputExhausted),
            Sink::Vec(vec, _) => {
                vec.reserve(n);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn push(&mut self, byte: u8) {
        match &mut self.sink {
            Sink::Measure => {}
            Sink::Slice(buf) => buf[self.produced] = byte,
            Sink::Vec(vec, _) => vec.push(byte),
        }
        self.produced += 1;
    }

    fn history(&self, distance: usize) -> u8 {
        self.written()[self.produced - distance]
    }

    fn checksum_tail(&mut self, n: usize) {
        if let Some(checksum) = self.checksum.as_deref_mut() {
            let tail = match &self.sink {
                Sink::Measure => return,
                Sink::Slice(buf) => &buf[self.produced - n..self.produced],
                Sink::Vec(vec, _) => &vec[vec.len() - n..],
            };
            checksum.update(tail);
        }
    }

    /// Emit one literal byte
    pub fn write_literal(&mut self, byte: u8) -> Result<(), InflateError> {
        self.reserve(1)?;
        self.push(byte);
        self.checksum_tail(1);
        Ok(())
    }

    /// Emit the payload of a stored block
    pub fn write_stored(&mut self, bytes: &[u8]) -> Result<(), InflateError> {
        self.reserve(bytes.len())?;
        match &mut self.sink {
            Sink::Measure => {}
            Sink::Slice(buf) => buf[self.produced..self.produced + bytes.len()].copy_from_slice(bytes),
            Sink::Vec(vec, _) => vec.extend_from_slice(bytes),
        }
        self.produced += bytes.len();
        self.checksum_tail(bytes.len());
        Ok(())
    }

    /// Copy `length` bytes from `distance` bytes back.
    ///
    /// Copies one byte at a time, front to back, so a distance shorter than
    /// the length repeats the pattern. With `allow_too_far`, history before
    /// the start of output reads as zero instead of failing.
    pub fn copy_match(
        &mut self,
        distance: usize,
        length: usize,
        allow_too_far: bool,
    ) -> Result<(), InflateError> {
        if distance > self.produced && !allow_too_far {
            return Err(InflateError::DistanceTooFar { distance, available: self.produced });
        }
        self.reserve(length)?;

        if !self.is_materialized() {
            self.produced += length;
            return Ok(());
        }
        for _ in 0..length {
            let byte = if distance > self.produced { 0 } else { self.history(distance) };
            self.push(byte);
        }
        self.checksum_tail(length);
        Ok(())
    }

    /// Drop everything this decode wrote to a growable buffer
    pub fn discard(&mut self) {
        if let Sink::Vec(vec, base) = &mut self.sink {
            vec.truncate(*base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Adler32;

    #[test]
    fn test_overlapping_copy_repeats_pattern() {
        let mut vec = Vec::new();
        let mut out = Output::new(Destination::Vec(&mut vec), None);
        out.write_literal(b'a').unwrap();
        out.write_literal(b'b').unwrap();
        out.copy_match(2, 5, false).unwrap();
        assert_eq!(out.written(), b"abababa");
        assert_eq!(out.produced(), 7);
    }

    #[test]
    fn test_distance_too_far() {
        let mut out = Output::new(Destination::Measure, None);
        out.write_literal(0).unwrap();
        assert_eq!(
            out.copy_match(2, 3, false),
            Err(InflateError::DistanceTooFar { distance: 2, available: 1 })
        );
    }

    #[test]
    fn test_distance_too_far_allowed_reads_zero() {
        let mut vec = Vec::new();
        let mut out = Output::new(Destination::Vec(&mut vec), None);
        out.write_literal(7).unwrap();
        out.copy_match(3, 4, true).unwrap();
        assert_eq!(out.written(), &[7, 0, 0, 7, 0]);
    }

    #[test]
    fn test_slice_exhaustion() {
        let mut buf = [0u8; 4];
        let mut out = Output::new(Destination::Slice(&mut buf), None);
        out.write_stored(b"abc").unwrap();
        assert_eq!(out.copy_match(1, 2, false), Err(InflateError::OutputExhausted));
        out.write_literal(b'd').unwrap();
        assert_eq!(out.write_literal(b'e'), Err(InflateError::OutputExhausted));
        assert_eq!(out.written(), b"abcd");
    }

    #[test]
    fn test_measure_counts_only() {
        let mut out = Output::new(Destination::Measure, None);
        out.write_stored(&[1, 2, 3]).unwrap();
        out.copy_match(3, 258, false).unwrap();
        assert_eq!(out.produced(), 261);
        assert!(out.written().is_empty());
        assert!(!out.is_materialized());
    }

    #[test]
    fn test_vec_appends_and_discards() {
        let mut vec = b"keep".to_vec();
        {
            let mut out = Output::new(Destination::Vec(&mut vec), None);
            out.write_literal(b'x').unwrap();
            // History does not reach into earlier contents
            assert!(out.copy_match(2, 1, false).is_err());
            out.discard();
        }
        assert_eq!(vec, b"keep");
    }

    #[test]
    fn test_checksum_sees_materialized_bytes() {
        let mut adler = Adler32::new();
        let mut vec = Vec::new();
        {
            let mut out = Output::new(Destination::Vec(&mut vec), Some(&mut adler));
            out.write_stored(b"Wiki").unwrap();
            out.write_literal(b'p').unwrap();
            out.write_stored(b"edia").unwrap();
        }
        assert_eq!(adler.value(), Adler32::checksum(b"Wikipedia"));
    }
}
