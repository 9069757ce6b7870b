use super::output::{Destination, Output};
use crate::bits::BitReader;
use crate::checksum::RunningChecksum;
use crate::error::{InflateError, InflateFailure};
use crate::huffman::fixed_tables;
use crate::report::{Field, NullReporter, Reporter, ScopeKind, ScopeTracker, Value};
use serde::Serialize;
use tracing::{debug, warn};

/// Decoder options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InflateConfig {
    /// Treat history before the start of output as zero bytes instead of
    /// failing with a distance-too-far error. Off by default; not standard
    /// DEFLATE behavior.
    pub allow_distance_too_far: bool,
}

/// Outcome of a successful decode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Inflated {
    /// Bytes of output produced
    pub produced: usize,
    /// Bytes of input consumed; anything after belongs to the container
    pub consumed: usize,
    /// DEFLATE blocks decoded
    pub blocks: usize,
}

/// Block type from the 2-bit BTYPE field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockType {
    Stored,
    Fixed,
    Dynamic,
}

impl BlockType {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Stored),
            1 => Some(Self::Fixed),
            2 => Some(Self::Dynamic),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Stored => "no compression (aka Stored Block)",
            Self::Fixed => "compressed with fixed Huffman codes",
            Self::Dynamic => "compressed with dynamic Huffman codes",
        }
    }
}

/// State of one top-level decode, dropped when it returns
pub(crate) struct Decoder<'a> {
    pub(crate) bits: BitReader<'a>,
    pub(crate) out: Output<'a>,
    pub(crate) report: ScopeTracker<'a>,
    pub(crate) config: InflateConfig,
}

impl Decoder<'_> {
    /// Decode blocks until the last one, or until the input is used up
    /// exactly at a block boundary.
    fn run(&mut self) -> Result<usize, InflateError> {
        self.report.enter_scope("DEFLATE_BLOCK", ScopeKind::List);
        let mut blocks = 0;
        loop {
            let last = self.block(blocks)?;
            blocks += 1;
            if last || self.bits.bit_position() == self.bits.input_len() * 8 {
                break;
            }
        }
        self.report.exit_scope();

        self.report.enter_scope("BLOCK_SUMMARY", ScopeKind::Object);
        self.report.emit_stat("block_num", Value::from(blocks));
        self.report.emit_stat("decompressed_bytes", Value::from(self.out.produced()));
        self.report.exit_scope();
        Ok(blocks)
    }

    /// Read one block header and dispatch on its type. Returns BFINAL.
    fn block(&mut self, index: usize) -> Result<bool, InflateError> {
        let start = self.bits.bit_position();
        let produced = self.out.produced();
        self.report.enter_scope("block", ScopeKind::Object);
        self.report.emit_stat("BLOCK_BIT_POSITION", Value::from(start));

        let last = self.bits.take_bit()? == 1;
        self.report.emit_field(Field::new("BFINAL", last as u8).at(start, 1).describe(format_args!(
            "last block marker = {}",
            if last { "yes" } else { "no" }
        )));

        let raw_type = self.bits.take_bits(2)?;
        let field = Field::new("BTYPE", raw_type).at(start + 1, 2);
        let Some(block_type) = BlockType::from_bits(raw_type) else {
            self.report.emit_field(field.describe(format_args!("invalid block type (type == 3)")));
            return Err(InflateError::InvalidBlockType);
        };
        self.report.emit_field(field.describe(format_args!("{}", block_type.description())));

        match block_type {
            BlockType::Stored => self.stored()?,
            BlockType::Fixed => self.fixed()?,
            BlockType::Dynamic => self.dynamic()?,
        }

        let end = self.bits.bit_position();
        let block_bytes = self.out.produced() - produced;
        self.report.emit_stat("DECOMPRESSED_BYTES", Value::from(block_bytes));
        if self.report.is_verbose() && self.out.is_materialized() {
            let data = &self.out.written()[produced..];
            self.report.emit_stat("DECOMPRESSED_DATA", Value::Bytes(data));
        }
        self.report.emit_stat("BLOCK_BIT_SIZE", Value::from(end - start));
        self.report.exit_scope();

        debug!(
            block = index,
            block_type = ?block_type,
            last,
            bit_position = start,
            bit_size = end - start,
            output_bytes = block_bytes,
            "decoded block"
        );
        Ok(last)
    }

    /// Stored block: byte-aligned LEN, NLEN, then LEN raw bytes
    fn stored(&mut self) -> Result<(), InflateError> {
        let (pad, pad_bits) = self.bits.align_to_byte();
        let aligned = self.bits.bit_position();
        self.report.emit_field(
            Field::new("RESERVED", pad)
                .at(aligned - pad_bits as usize, pad_bits as usize)
                .describe(format_args!("reserved bits for byte align")),
        );

        if self.bits.bytes_remaining() < 4 {
            return Err(InflateError::IncompleteStoredBlock);
        }
        let len = self.bits.take_bits(16)? as u16;
        let nlen = self.bits.take_bits(16)? as u16;
        self.report.emit_field(
            Field::new("LEN", len)
                .at(aligned, 16)
                .describe(format_args!("uncompressed data length (bytes)")),
        );
        self.report.emit_field(
            Field::new("NLEN", nlen)
                .at(aligned + 16, 16)
                .describe(format_args!("complement of LEN (65535 - {})", len)),
        );
        if len != !nlen {
            return Err(InflateError::StoredLengthMismatch { len, nlen });
        }

        let data = self.bits.take_bytes(len as usize).ok_or(InflateError::IncompleteStoredBlock)?;
        self.out.write_stored(data)?;
        if self.report.is_verbose() {
            self.report.emit_field(Field::new("RAW_DATA", data).at(aligned + 32, data.len() * 8));
        }
        Ok(())
    }

    /// Fixed block: symbols coded with the predefined tables
    fn fixed(&mut self) -> Result<(), InflateError> {
        let tables = fixed_tables();

        self.report.enter_scope("extracted_literal_length_huffman_table", ScopeKind::Object);
        tables.literal_length.report(&mut self.report);
        self.report.exit_scope();
        self.report.enter_scope("extracted_distance_huffman_table", ScopeKind::Object);
        tables.distance.report(&mut self.report);
        self.report.exit_scope();

        let stats = self.codes(&tables.literal_length, &tables.distance)?;
        stats.report(&mut self.report);
        Ok(())
    }
}

/// Top-level DEFLATE decoder
#[derive(Clone, Copy, Debug, Default)]
pub struct Inflater {
    config: InflateConfig,
}

impl Inflater {
    pub fn new(config: InflateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InflateConfig {
        &self.config
    }

    /// Decode one DEFLATE stream from the start of `input`.
    ///
    /// Input after the last block is left alone and reported through
    /// [`Inflated::consumed`]. On failure nothing is salvaged: a `Vec`
    /// destination is truncated back to its original length and the error
    /// says how far decoding got, for diagnosis only.
    pub fn inflate<'a>(
        &self,
        input: &'a [u8],
        destination: Destination<'a>,
        reporter: &'a mut dyn Reporter,
        checksum: Option<&'a mut dyn RunningChecksum>,
    ) -> Result<Inflated, InflateFailure> {
        let mut decoder = Decoder {
            bits: BitReader::new(input),
            out: Output::new(destination, checksum),
            report: ScopeTracker::new(reporter),
            config: self.config,
        };

        match decoder.run() {
            Ok(blocks) => Ok(Inflated {
                produced: decoder.out.produced(),
                consumed: decoder.bits.bytes_consumed(),
                blocks,
            }),
            Err(error) => {
                decoder.report.unwind_to(0);
                decoder.out.discard();
                let failure = InflateFailure {
                    error,
                    produced: decoder.out.produced(),
                    consumed: decoder.bits.bytes_consumed(),
                };
                warn!(
                    status = failure.status(),
                    bit_position = decoder.bits.bit_position(),
                    "inflate failed: {}",
                    error
                );
                Err(failure)
            }
        }
    }

    /// Decode into a fresh buffer, with no report
    pub fn inflate_to_vec(&self, input: &[u8]) -> Result<(Vec<u8>, Inflated), InflateFailure> {
        let mut output = Vec::new();
        let inflated = self.inflate(input, Destination::Vec(&mut output), &mut NullReporter, None)?;
        Ok((output, inflated))
    }

    /// Decode without storing output, to learn the decoded size
    pub fn measure(&self, input: &[u8]) -> Result<Inflated, InflateFailure> {
        self.inflate(input, Destination::Measure, &mut NullReporter, None)
    }
}
