use crate::report::{Reporter, Value};

/// Symbol counters for one Huffman-coded block
///
/// The end-of-block symbol is counted with the literals, since it comes from
/// the literal/length code. Bit totals include extra bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SymbolStats {
    pub literal_count: u64,
    pub literal_bits: u64,
    pub length_count: u64,
    pub length_bits: u64,
    pub distance_count: u64,
    pub distance_bits: u64,
    /// Bytes produced by the block
    pub decoded_bytes: u64,
}

impl SymbolStats {
    pub fn record_literal(&mut self, code_bits: usize) {
        self.literal_count += 1;
        self.literal_bits += code_bits as u64;
        self.decoded_bytes += 1;
    }

    pub fn record_end_of_block(&mut self, code_bits: usize) {
        self.literal_count += 1;
        self.literal_bits += code_bits as u64;
    }

    pub fn record_match(&mut self, length_bits: usize, distance_bits: usize, length: usize) {
        self.length_count += 1;
        self.length_bits += length_bits as u64;
        self.distance_count += 1;
        self.distance_bits += distance_bits as u64;
        self.decoded_bytes += length as u64;
    }

    pub fn encoded_symbols(&self) -> u64 {
        self.literal_count + self.length_count + self.distance_count
    }

    pub fn encoded_bits(&self) -> u64 {
        self.literal_bits + self.length_bits + self.distance_bits
    }

    pub fn decoded_bits(&self) -> u64 {
        self.decoded_bytes * 8
    }

    /// Decoded bits per encoded bit
    pub fn compression_ratio(&self) -> Option<f64> {
        match self.encoded_bits() {
            0 => None,
            encoded => Some(self.decoded_bits() as f64 / encoded as f64),
        }
    }

    /// Fraction of the decoded size saved by the encoding
    pub fn space_saving(&self) -> Option<f64> {
        match self.decoded_bits() {
            0 => None,
            decoded => Some(1.0 - self.encoded_bits() as f64 / decoded as f64),
        }
    }

    pub fn report(&self, reporter: &mut dyn Reporter) {
        reporter.emit_stat("literal_huffman_symbol_count", Value::from(self.literal_count));
        reporter.emit_stat("length_huffman_symbol_count", Value::from(self.length_count));
        reporter.emit_stat("distance_huffman_symbol_count", Value::from(self.distance_count));
        reporter.emit_stat("encoded_symbol_total_count", Value::from(self.encoded_symbols()));
        reporter.emit_stat("decoded_literal_total_count", Value::from(self.decoded_bytes));
        reporter.emit_stat("literal_huffman_symbol_bits", Value::from(self.literal_bits));
        reporter.emit_stat("length_symbol_bits", Value::from(self.length_bits));
        reporter.emit_stat("distance_symbol_bits", Value::from(self.distance_bits));
        reporter.emit_stat("encoded_symbol_total_bits", Value::from(self.encoded_bits()));
        reporter.emit_stat("decoded_literal_total_bits", Value::from(self.decoded_bits()));
        if let Some(ratio) = self.compression_ratio() {
            reporter.emit_stat("compression_ratio", Value::from(ratio));
        }
        if let Some(saving) = self.space_saving() {
            reporter.emit_stat("space_saving", Value::from(saving));
        }
    }
}
