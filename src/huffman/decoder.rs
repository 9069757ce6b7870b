use crate::bits::BitReader;
use crate::error::InflateError;
use crate::report::{Field, Reporter, ScopeKind, Value};
use thiserror::Error;

/// Longest code length DEFLATE allows
pub const MAX_BITS: usize = 15;

/// A set of code lengths claims more codes than the bit space holds
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("over-subscribed Huffman code at length {length}")]
pub struct Oversubscribed {
    pub length: usize,
}

/// Canonical Huffman code, decoded one bit at a time
///
/// Only the number of codes of each length and the symbols in canonical
/// order are kept; code values are implied by canonical construction.
#[derive(Clone, Debug)]
pub struct HuffmanTable {
    /// Number of symbols of each code length (index 0 counts unused symbols)
    count: [u16; MAX_BITS + 1],
    /// Used symbols ordered by code length, then by symbol value
    symbols: Vec<u16>,
    /// Code length of every symbol, kept for reverse lookups
    lengths: Vec<u8>,
    /// Codes left unassigned after the longest length (0 = complete)
    left: i32,
}

impl HuffmanTable {
    /// Build a table from per-symbol code lengths (0 = symbol unused).
    ///
    /// Over-subscribed lengths are rejected. Incomplete codes are accepted;
    /// use [`is_complete`](Self::is_complete) and
    /// [`unused_codes`](Self::unused_codes) to judge them.
    pub fn build(lengths: &[u8]) -> Result<Self, Oversubscribed> {
        let mut count = [0u16; MAX_BITS + 1];
        for &len in lengths {
            debug_assert!(len as usize <= MAX_BITS);
            count[len as usize] += 1;
        }

        let mut table =
            Self { count, symbols: Vec::new(), lengths: lengths.to_vec(), left: 0 };

        // No codes: complete, but decoding will always fail
        if count[0] as usize == lengths.len() {
            return Ok(table);
        }

        // One possible code of zero length, doubling with each extra bit
        let mut left: i32 = 1;
        for (length, &n) in count.iter().enumerate().skip(1) {
            left <<= 1;
            left -= n as i32;
            if left < 0 {
                return Err(Oversubscribed { length });
            }
        }

        // Offset of the first symbol of each length in the canonical order
        let mut offsets = [0usize; MAX_BITS + 1];
        for len in 1..MAX_BITS {
            offsets[len + 1] = offsets[len] + count[len] as usize;
        }

        let encoded = lengths.len() - count[0] as usize;
        table.symbols = vec![0; encoded];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len != 0 {
                table.symbols[offsets[len as usize]] = symbol as u16;
                offsets[len as usize] += 1;
            }
        }

        table.left = left;
        Ok(table)
    }

    /// Decode one symbol, consuming exactly the bits of its code.
    ///
    /// Fails with [`InflateError::RanOutOfCodes`] when the bits read match no
    /// code within [`MAX_BITS`], which only an incomplete code allows.
    pub fn decode(&self, bits: &mut BitReader<'_>) -> Result<u16, InflateError> {
        let mut code: i32 = 0; // bits read so far, MSB first
        let mut first: i32 = 0; // first code of the current length
        let mut index: i32 = 0; // index of the first code of this length in symbols

        for len in 1..=MAX_BITS {
            code |= bits.take_bit()? as i32;
            let count = self.count[len] as i32;
            if code - count < first {
                return Ok(self.symbols[(index + (code - first)) as usize]);
            }
            index += count;
            first += count;
            first <<= 1;
            code <<= 1;
        }
        Err(InflateError::RanOutOfCodes)
    }

    /// Total symbols in the alphabet, used or not
    pub fn total_symbols(&self) -> usize {
        self.lengths.len()
    }

    /// Symbols that were assigned a code
    pub fn encoded_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// Symbols with code length zero
    pub fn unused_symbols(&self) -> usize {
        self.count[0] as usize
    }

    /// Number of codes of a given length
    pub fn count(&self, length: usize) -> usize {
        self.count.get(length).copied().unwrap_or(0) as usize
    }

    /// Codes of the longest length left unassigned (0 for a complete code)
    pub fn unused_codes(&self) -> i32 {
        self.left
    }

    pub fn is_complete(&self) -> bool {
        self.left == 0
    }

    /// A complete code, or an incomplete one whose only codes are one bit long.
    ///
    /// DEFLATE allows the latter so a block can use a single distance (or
    /// no distances at all).
    pub fn is_usable(&self) -> bool {
        self.is_complete() || self.encoded_symbols() == self.count[1] as usize
    }

    /// Position of `symbol` in canonical order, if it has a code
    pub fn index_of(&self, symbol: u16) -> Option<usize> {
        self.symbols.iter().position(|&s| s == symbol)
    }

    /// Code length assigned to `symbol` (0 if unused or out of range)
    pub fn code_length(&self, symbol: u16) -> u8 {
        self.lengths.get(symbol as usize).copied().unwrap_or(0)
    }

    /// Canonical code value assigned to `symbol`, MSB first
    pub fn code(&self, symbol: u16) -> Option<u32> {
        let len = self.code_length(symbol) as usize;
        if len == 0 {
            return None;
        }
        let index = self.index_of(symbol)?;

        // First code and first canonical index of each length
        let mut code = 0u32;
        let mut start = 0usize;
        for l in 1..len {
            code = (code + self.count[l] as u32) << 1;
            start += self.count[l] as usize;
        }
        Some(code + (index - start) as u32)
    }

    /// Describe the table: symbol totals, plus every code when verbose
    pub fn report(&self, reporter: &mut dyn Reporter) {
        reporter.emit_stat("total_symbol_num", Value::from(self.total_symbols()));
        reporter.emit_stat("encoded_symbol_num", Value::from(self.encoded_symbols()));
        reporter.emit_stat("not_used_symbol_num", Value::from(self.unused_symbols()));

        if !reporter.is_verbose() {
            return;
        }
        reporter.enter_scope("items", ScopeKind::List);
        for (index, &symbol) in self.symbols.iter().enumerate() {
            let len = self.code_length(symbol);
            let code = self.code(symbol).unwrap_or(0);
            reporter.enter_scope("item", ScopeKind::Object);
            reporter.emit_stat("index", Value::from(index));
            reporter.emit_stat("symbol_value", Value::from(symbol));
            reporter.emit_field(Field::new("encoded_value", code).sized(len as usize).describe(
                format_args!(
                    "symbol {} encoded to {} (b'{:0width$b})",
                    symbol,
                    code,
                    code,
                    width = len as usize
                ),
            ));
            reporter.exit_scope();
        }
        reporter.exit_scope();
    }
}
