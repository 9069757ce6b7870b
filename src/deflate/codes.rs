use super::inflate::Decoder;
use super::stats::SymbolStats;
use super::tables::{distance_code, length_code, END_OF_BLOCK};
use crate::error::InflateError;
use crate::huffman::HuffmanTable;
use crate::report::{Field, Reporter, ScopeKind};

impl Decoder<'_> {
    /// Decode literals and length/distance pairs until end of block.
    pub(super) fn codes(
        &mut self,
        literal_length: &HuffmanTable,
        distance: &HuffmanTable,
    ) -> Result<SymbolStats, InflateError> {
        let verbose = self.report.is_verbose();
        let mut stats = SymbolStats::default();

        if verbose {
            self.report.enter_scope("ENCODED_BIT_STREAM", ScopeKind::List);
        }
        loop {
            let pos = self.bits.bit_position();
            let symbol = literal_length.decode(&mut self.bits)?;
            let code_bits = self.bits.bit_position() - pos;

            if symbol < END_OF_BLOCK {
                if verbose {
                    self.report.emit_field(
                        Field::new("literal", symbol)
                            .at(pos, code_bits)
                            .describe(format_args!("0x{:02x}", symbol)),
                    );
                }
                self.out.write_literal(symbol as u8)?;
                stats.record_literal(code_bits);
                continue;
            }

            if symbol == END_OF_BLOCK {
                if verbose {
                    self.report.emit_field(
                        Field::new("end_of_block", symbol)
                            .at(pos, code_bits)
                            .describe(format_args!("end of block")),
                    );
                }
                stats.record_end_of_block(code_bits);
                break;
            }

            // Length, then distance
            let (base, extra) = length_code(symbol).ok_or(InflateError::InvalidLengthSymbol(symbol))?;
            let extra_pos = self.bits.bit_position();
            let length = base as usize + self.bits.take_bits(extra)? as usize;
            if verbose {
                self.report.emit_field(
                    Field::new("length", symbol)
                        .at(pos, code_bits)
                        .describe(format_args!("length base {} + {} extra bits", base, extra)),
                );
                self.report.emit_field(
                    Field::new("length_extra", (length - base as usize) as u64)
                        .at(extra_pos, extra as usize)
                        .describe(format_args!("length {}", length)),
                );
            }

            let dist_pos = self.bits.bit_position();
            let dist_symbol = distance.decode(&mut self.bits)?;
            let dist_code_bits = self.bits.bit_position() - dist_pos;
            let (dist_base, dist_extra) =
                distance_code(dist_symbol).ok_or(InflateError::InvalidDistanceSymbol(dist_symbol))?;
            let dist_extra_pos = self.bits.bit_position();
            let dist = dist_base as usize + self.bits.take_bits(dist_extra)? as usize;
            if verbose {
                self.report.emit_field(
                    Field::new("distance", dist_symbol).at(dist_pos, dist_code_bits).describe(
                        format_args!("distance base {} + {} extra bits", dist_base, dist_extra),
                    ),
                );
                self.report.emit_field(
                    Field::new("distance_extra", (dist - dist_base as usize) as u64)
                        .at(dist_extra_pos, dist_extra as usize)
                        .describe(format_args!("distance {}", dist)),
                );
            }

            self.out.copy_match(dist, length, self.config.allow_distance_too_far)?;
            stats.record_match(
                code_bits + extra as usize,
                dist_code_bits + dist_extra as usize,
                length,
            );
        }
        if verbose {
            self.report.exit_scope();
        }
        Ok(stats)
    }
}
