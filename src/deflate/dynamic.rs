use super::inflate::Decoder;
use super::tables::{
    CODE_LENGTH_CODES, CODE_LENGTH_ORDER, END_OF_BLOCK, MAX_DISTANCE_CODES,
    MAX_LITERAL_LENGTH_CODES,
};
use crate::error::InflateError;
use crate::huffman::HuffmanTable;
use crate::report::{Field, Reporter, ScopeKind, Value};

impl Decoder<'_> {
    /// Dynamic block: read the code description, build both tables, decode.
    pub(super) fn dynamic(&mut self) -> Result<(), InflateError> {
        let (nlen, ndist, ncode) = self.dynamic_counts()?;

        let code_lengths = self.code_length_code(ncode)?;
        let lengths = self.literal_distance_lengths(&code_lengths, nlen, ndist)?;

        // An end-of-block code is required to leave the block
        if lengths[END_OF_BLOCK as usize] == 0 {
            return Err(InflateError::MissingEndOfBlock);
        }

        // Incomplete codes are only allowed for a single length-1 code
        let literal_length = HuffmanTable::build(&lengths[..nlen])
            .ok()
            .filter(HuffmanTable::is_usable)
            .ok_or(InflateError::InvalidLiteralLengths)?;
        self.report.enter_scope("extracted_literal_length_huffman_table", ScopeKind::Object);
        literal_length.report(&mut self.report);
        self.report.exit_scope();

        let distance = HuffmanTable::build(&lengths[nlen..])
            .ok()
            .filter(HuffmanTable::is_usable)
            .ok_or(InflateError::InvalidDistanceLengths)?;
        self.report.enter_scope("extracted_distance_huffman_table", ScopeKind::Object);
        distance.report(&mut self.report);
        self.report.exit_scope();

        let stats = self.codes(&literal_length, &distance)?;
        stats.report(&mut self.report);
        Ok(())
    }

    /// HLIT, HDIST and HCLEN, as symbol counts
    fn dynamic_counts(&mut self) -> Result<(usize, usize, usize), InflateError> {
        let pos = self.bits.bit_position();
        let hlit = self.bits.take_bits(5)?;
        let hdist = self.bits.take_bits(5)?;
        let hclen = self.bits.take_bits(4)?;
        let (nlen, ndist, ncode) = (hlit as usize + 257, hdist as usize + 1, hclen as usize + 4);

        self.report.emit_field(Field::new("HLIT", hlit).at(pos, 5).describe(format_args!(
            "{} ({} + 257) of Literal/Length codes",
            nlen, hlit
        )));
        self.report.emit_field(Field::new("HDIST", hdist).at(pos + 5, 5).describe(format_args!(
            "{} ({} + 1) of Distance codes",
            ndist, hdist
        )));
        self.report.emit_field(Field::new("HCLEN", hclen).at(pos + 10, 4).describe(format_args!(
            "{} ({} + 4) of Code Length codes stored in CODE_LENGTH_TABLE",
            ncode, hclen
        )));

        if nlen > MAX_LITERAL_LENGTH_CODES || ndist > MAX_DISTANCE_CODES {
            return Err(InflateError::BadCounts { nlen, ndist });
        }
        Ok((nlen, ndist, ncode))
    }

    /// Read the 3-bit code length code lengths and build their table.
    /// Lengths past `ncode` in the permuted order are zero.
    fn code_length_code(&mut self, ncode: usize) -> Result<HuffmanTable, InflateError> {
        let verbose = self.report.is_verbose();
        let mut lengths = [0u8; CODE_LENGTH_CODES];

        if verbose {
            self.report.enter_scope("CODE_LENGTH_TABLE", ScopeKind::List);
        }
        for (index, &symbol) in CODE_LENGTH_ORDER.iter().enumerate() {
            if index >= ncode {
                if verbose {
                    self.report.emit_field(
                        Field::new("code_length", 0u8)
                            .describe(format_args!("code length {} not used", symbol)),
                    );
                }
                continue;
            }
            let pos = self.bits.bit_position();
            let len = self.bits.take_bits(3)? as u8;
            lengths[symbol] = len;
            if verbose {
                let field = Field::new("code_length", len).at(pos, 3);
                match len {
                    0 => self.report.emit_field(
                        field.describe(format_args!("code length {} stored but not used", symbol)),
                    ),
                    _ => self.report.emit_field(
                        field.describe(format_args!("code length {} encoded to {} bits", symbol, len)),
                    ),
                }
            }
        }
        if verbose {
            self.report.exit_scope();
        }
        self.report.emit_stat("code_length_table_bits", Value::from(ncode * 3));

        self.report.enter_scope("extracted_code_length_huffman_table", ScopeKind::Object);
        // Require a complete code here
        let table = HuffmanTable::build(&lengths)
            .ok()
            .filter(HuffmanTable::is_complete)
            .ok_or(InflateError::IncompleteCodeLengthCodes)?;
        table.report(&mut self.report);
        self.report.exit_scope();
        Ok(table)
    }

    /// Decode the run-length coded literal/length and distance code lengths
    fn literal_distance_lengths(
        &mut self,
        code_lengths: &HuffmanTable,
        nlen: usize,
        ndist: usize,
    ) -> Result<Vec<u8>, InflateError> {
        let verbose = self.report.is_verbose();
        let total = nlen + ndist;
        let mut lengths = vec![0u8; total];
        let start = self.bits.bit_position();

        if verbose {
            self.report.enter_scope("LITERAL_LENGTH_DISTANCE_TABLE", ScopeKind::List);
        }
        let mut index = 0;
        while index < total {
            let pos = self.bits.bit_position();
            let symbol = code_lengths.decode(&mut self.bits)?;

            if symbol < 16 {
                lengths[index] = symbol as u8;
                if verbose {
                    let width = self.bits.bit_position() - pos;
                    let (alphabet, n) = alphabet_position(index, nlen);
                    self.report.emit_field(Field::new("code_length", symbol).at(pos, width).describe(
                        format_args!("{} symbol {} encoded to {} bits", alphabet, n, symbol),
                    ));
                }
                index += 1;
                continue;
            }

            let (len, repeat) = match symbol {
                // Repeat last length 3..6 times
                16 => {
                    if index == 0 {
                        return Err(InflateError::RepeatWithoutLength);
                    }
                    (lengths[index - 1], 3 + self.bits.take_bits(2)? as usize)
                }
                // Repeat zero 3..10 times
                17 => (0, 3 + self.bits.take_bits(3)? as usize),
                // Repeat zero 11..138 times
                _ => (0, 11 + self.bits.take_bits(7)? as usize),
            };
            if index + repeat > total {
                return Err(InflateError::TooManyLengths { index, repeat, total });
            }
            if verbose {
                let width = self.bits.bit_position() - pos;
                let (alphabet, n) = alphabet_position(index, nlen);
                self.report.emit_field(Field::new("repeat", symbol).at(pos, width).describe(
                    format_args!(
                        "{} symbol {} code length {} (repeat length code {} for {} times)",
                        alphabet, n, symbol, len, repeat
                    ),
                ));
            }
            lengths[index..index + repeat].fill(len);
            index += repeat;
        }
        if verbose {
            self.report.exit_scope();
        }
        self.report.emit_stat(
            "literal_length_distance_table_bits",
            Value::from(self.bits.bit_position() - start),
        );
        Ok(lengths)
    }
}

/// Which alphabet a combined length index belongs to, and its symbol there
fn alphabet_position(index: usize, nlen: usize) -> (&'static str, usize) {
    if index < nlen {
        ("literal_length", index)
    } else {
        ("distance", index - nlen)
    }
}
