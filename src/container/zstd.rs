//! Zstandard frames (RFC 8878), framing only: headers and block headers
//! are decoded, compressed payloads are skipped.

use super::{report_unused, ByteCursor, Findings, ZSTD_MAGIC};
use crate::error::{Error, Result};
use crate::report::{Field, Reporter, ScopeKind, Value};
use tracing::debug;

const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFF_FFF0;
const SKIPPABLE_MAGIC_BASE: u32 = 0x184D_2A50;

/// Magic numbers 0x184D2A50 through 0x184D2A5F start skippable frames
pub fn is_skippable_magic(magic: u32) -> bool {
    magic & SKIPPABLE_MAGIC_MASK == SKIPPABLE_MAGIC_BASE
}

/// Decoded frame header descriptor byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeaderDescriptor(pub u8);

impl FrameHeaderDescriptor {
    pub fn dictionary_id_flag(&self) -> u8 {
        self.0 & 0x3
    }

    pub fn content_checksum(&self) -> bool {
        self.0 & 0x4 != 0
    }

    pub fn single_segment(&self) -> bool {
        self.0 & 0x20 != 0
    }

    pub fn content_size_flag(&self) -> u8 {
        self.0 >> 6
    }

    pub fn dictionary_id_size(&self) -> usize {
        [0, 1, 2, 4][self.dictionary_id_flag() as usize]
    }

    pub fn content_size_size(&self) -> usize {
        match self.content_size_flag() {
            0 if self.single_segment() => 1,
            0 => 0,
            1 => 2,
            2 => 4,
            _ => 8,
        }
    }
}

/// Window size from the window descriptor byte
pub fn window_size(descriptor: u8) -> u64 {
    let exponent = (descriptor >> 3) as u32;
    let mantissa = (descriptor & 0x7) as u64;
    let base = 1u64 << (10 + exponent);
    base + (base / 8) * mantissa
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Raw,
    Rle,
    Compressed,
    Reserved,
}

impl BlockType {
    fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Self::Raw,
            1 => Self::Rle,
            2 => Self::Compressed,
            _ => Self::Reserved,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Raw => "raw block",
            Self::Rle => "RLE block",
            Self::Compressed => "compressed block",
            Self::Reserved => "Reserved",
        }
    }
}

fn frame_header(cursor: &mut ByteCursor<'_>, report: &mut dyn Reporter) -> Result<FrameHeaderDescriptor> {
    report.enter_scope("FRAME_HEADER", ScopeKind::Object);
    let base = cursor.bit_position();
    let fhd = FrameHeaderDescriptor(cursor.u8("zstd frame header")?);

    report.enter_scope("FRAME_HEADER_DESCRIPTOR", ScopeKind::Object);
    report.emit_field(
        Field::new("DICTIONARY_ID_FLAG", fhd.dictionary_id_flag())
            .at(base, 2)
            .describe(format_args!("DID_Field_Size = {}", fhd.dictionary_id_size())),
    );
    report.emit_field(Field::new("CONTENT_CHECKSUM_FLAG", fhd.content_checksum() as u8).at(base + 2, 1));
    report.emit_field(Field::new("RESERVED", (fhd.0 >> 3) & 1).at(base + 3, 1).describe(format_args!("must be 0")));
    report.emit_field(Field::new("UNUSED", (fhd.0 >> 4) & 1).at(base + 4, 1));
    report.emit_field(Field::new("SINGLE_SEGMENT_FLAG", fhd.single_segment() as u8).at(base + 5, 1).describe(
        format_args!(
            "{}",
            if fhd.single_segment() {
                "data must be regenerated within a single continuous memory segment"
            } else {
                "data don't need be regenerated within a single continuous memory segment"
            }
        ),
    ));
    report.emit_field(
        Field::new("FRAME_CONTENT_SIZE_FLAG", fhd.content_size_flag())
            .at(base + 6, 2)
            .describe(format_args!("FCS_Field_Size = {}", fhd.content_size_size())),
    );
    report.exit_scope();

    if !fhd.single_segment() {
        let pos = cursor.bit_position();
        let wd = cursor.u8("zstd window descriptor")?;
        report.enter_scope("WINDOW_DESCRIPTOR", ScopeKind::Object);
        report.emit_field(Field::new("MANTISSA", wd & 0x7).at(pos, 3));
        report.emit_field(Field::new("EXPONENT", wd >> 3).at(pos + 3, 5));
        report.emit_stat("window_size", Value::from(window_size(wd)));
        report.exit_scope();
    }

    let did_size = fhd.dictionary_id_size();
    if did_size > 0 {
        let pos = cursor.bit_position();
        let id = cursor.uint_le(did_size, "zstd dictionary id")?;
        report.emit_field(Field::new("DICTIONARY_ID", id).at(pos, did_size * 8));
    }

    let fcs_size = fhd.content_size_size();
    if fcs_size > 0 {
        let pos = cursor.bit_position();
        let raw = cursor.uint_le(fcs_size, "zstd frame content size")?;
        let size = if fcs_size == 2 { raw + 256 } else { raw };
        let field = Field::new("FRAME_CONTENT_SIZE", raw).at(pos, fcs_size * 8);
        if fcs_size == 2 {
            report.emit_field(field.describe(format_args!(
                "The original (uncompressed) size is (256+{})={}",
                raw, size
            )));
        } else {
            report.emit_field(field.describe(format_args!("The original (uncompressed) size is {}", size)));
        }
    }
    report.exit_scope();
    Ok(fhd)
}

/// Walk the blocks of one frame; returns how many there were
fn blocks(cursor: &mut ByteCursor<'_>, report: &mut dyn Reporter) -> Result<usize> {
    report.enter_scope("ZSTD_BLOCK", ScopeKind::List);
    let mut count = 0;
    loop {
        let start = cursor.position();
        let header = cursor.u24_le("zstd block header")?;
        let last = header & 1 != 0;
        let block_type = BlockType::from_bits(header >> 1);
        let size = (header >> 3) as usize;

        report.enter_scope("block", ScopeKind::Object);
        report.emit_stat("BLOCK_BIT_POSITION", Value::from(start * 8));
        report.emit_field(Field::new("LAST_BLOCK", last as u8).at(start * 8, 1));
        report.emit_field(
            Field::new("BLOCK_TYPE", (header >> 1) & 0x3)
                .at(start * 8 + 1, 2)
                .describe(format_args!("{}", block_type.description())),
        );
        let payload = match block_type {
            BlockType::Rle => {
                report.emit_field(
                    Field::new("BLOCK_SIZE", size)
                        .at(start * 8 + 3, 21)
                        .describe(format_args!("repeat time {}", size)),
                );
                1
            }
            BlockType::Reserved => {
                return Err(Error::ReservedBlockType { format: "zstd", offset: start });
            }
            _ => {
                report.emit_field(Field::new("BLOCK_SIZE", size).at(start * 8 + 3, 21));
                size
            }
        };
        cursor.skip(payload, "zstd block data")?;
        report.emit_stat("BLOCK_BIT_SIZE", Value::from((payload + 3) * 8));
        report.exit_scope();

        debug!(block = count, ?block_type, size, last, "zstd block");
        count += 1;
        if last {
            break;
        }
    }
    report.exit_scope();
    Ok(count)
}

fn frame(cursor: &mut ByteCursor<'_>, magic_pos: usize, report: &mut dyn Reporter) -> Result<()> {
    report.emit_field(Field::new("MAGIC_NUMBER", ZSTD_MAGIC).at(magic_pos, 32).describe(format_args!(
        "0x{:08x}",
        ZSTD_MAGIC
    )));
    let fhd = frame_header(cursor, report)?;
    let count = blocks(cursor, report)?;
    report.emit_stat("block_num", Value::from(count));
    if fhd.content_checksum() {
        let pos = cursor.bit_position();
        let checksum = cursor.u32_le("zstd content checksum")?;
        report.emit_field(
            Field::new("CONTENT_CHECKSUM", checksum)
                .at(pos, 32)
                .describe(format_args!("low 32 bits of xxh64 of the decoded content (not verified)")),
        );
    }
    Ok(())
}

fn skippable(cursor: &mut ByteCursor<'_>, magic: u32, magic_pos: usize, report: &mut dyn Reporter) -> Result<()> {
    report.enter_scope("SKIPPABLE_FRAME", ScopeKind::Object);
    report.emit_field(
        Field::new("MAGIC_NUMBER", magic)
            .at(magic_pos, 32)
            .describe(format_args!("skippable frame {}", magic & 0xF)),
    );
    let pos = cursor.bit_position();
    let size = cursor.u32_le("skippable frame size")?;
    report.emit_field(Field::new("FRAME_SIZE", size).at(pos, 32).describe(format_args!("{} user data bytes", size)));
    cursor.skip(size as usize, "skippable frame data")?;
    report.exit_scope();
    Ok(())
}

pub(crate) fn dump(data: &[u8], report: &mut dyn Reporter) -> Result<Findings> {
    let mut cursor = ByteCursor::new(data);
    let mut frames = 0usize;

    report.enter_scope("FRAME", ScopeKind::List);
    loop {
        let magic_pos = cursor.bit_position();
        let magic = cursor.u32_le("zstd magic number")?;
        report.enter_scope("frame", ScopeKind::Object);
        if magic == ZSTD_MAGIC {
            frame(&mut cursor, magic_pos, report)?;
        } else if is_skippable_magic(magic) {
            skippable(&mut cursor, magic, magic_pos, report)?;
        } else {
            return Err(Error::InvalidMagic { format: "zstd", found: magic });
        }
        report.exit_scope();
        frames += 1;

        let next = cursor.rest().get(..4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        if !next.is_some_and(|m| m == ZSTD_MAGIC || is_skippable_magic(m)) {
            break;
        }
    }
    report.exit_scope();
    report.emit_stat("frame_num", Value::from(frames));

    let found = Findings { trailing_bytes: cursor.remaining(), ..Default::default() };
    report_unused(report, found.trailing_bytes);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{inspect, Format, InspectConfig};

    fn block_header(last: bool, block_type: u32, size: u32) -> [u8; 3] {
        let v = (size << 3) | (block_type << 1) | last as u32;
        [v as u8, (v >> 8) as u8, (v >> 16) as u8]
    }

    /// Frame with a window descriptor, 2-byte content size, a raw block, an
    /// RLE block, and a content checksum
    fn sample_frame() -> Vec<u8> {
        let mut data = ZSTD_MAGIC.to_le_bytes().to_vec();
        data.push(0b0100_0100);
        data.push(0x00);
        data.extend_from_slice(&44u16.to_le_bytes());
        data.extend_from_slice(&block_header(false, 0, 4));
        data.extend_from_slice(b"raw!");
        data.extend_from_slice(&block_header(true, 1, 296));
        data.push(b'z');
        data.extend_from_slice(&0x0BAD_F00Du32.to_le_bytes());
        data
    }

    #[test]
    fn test_window_size() {
        assert_eq!(window_size(0x00), 1024);
        assert_eq!(window_size(0x01), 1024 + 128);
        assert_eq!(window_size(0x58), 1 << 21);
        assert_eq!(window_size(0xFF), (1u64 << 41) + (1u64 << 38) * 7);
    }

    #[test]
    fn test_descriptor_sizes() {
        let fhd = FrameHeaderDescriptor(0b0010_0000);
        assert!(fhd.single_segment());
        assert_eq!(fhd.content_size_size(), 1);
        assert_eq!(FrameHeaderDescriptor(0).content_size_size(), 0);
        assert_eq!(FrameHeaderDescriptor(0xC3).content_size_size(), 8);
        assert_eq!(FrameHeaderDescriptor(0x03).dictionary_id_size(), 4);
    }

    #[test]
    fn test_frame_report() {
        let inspection = inspect(&sample_frame(), &InspectConfig::default()).unwrap();
        assert_eq!(inspection.format, Format::Zstd);
        assert!(inspection.outcome.is_none());

        let root = &inspection.report["ZSTD_FORMAT"];
        let frame = &root["FRAME"][0];
        let header = &frame["FRAME_HEADER"];
        assert_eq!(header["FRAME_HEADER_DESCRIPTOR"]["FRAME_CONTENT_SIZE_FLAG"]["value"], 1);
        assert_eq!(header["FRAME_HEADER_DESCRIPTOR"]["CONTENT_CHECKSUM_FLAG"]["value"], 1);
        assert_eq!(header["WINDOW_DESCRIPTOR"]["window_size"], 1024);
        assert_eq!(header["FRAME_CONTENT_SIZE"]["value"], 44);
        assert_eq!(
            header["FRAME_CONTENT_SIZE"]["description"],
            "The original (uncompressed) size is (256+44)=300"
        );

        let blocks = frame["ZSTD_BLOCK"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["BLOCK_TYPE"]["description"], "raw block");
        assert_eq!(blocks[0]["BLOCK_BIT_SIZE"], 7 * 8);
        assert_eq!(blocks[1]["BLOCK_TYPE"]["description"], "RLE block");
        assert_eq!(blocks[1]["BLOCK_SIZE"]["value"], 296);
        assert_eq!(blocks[1]["BLOCK_BIT_SIZE"], 4 * 8);
        assert_eq!(blocks[1]["LAST_BLOCK"]["value"], 1);
        assert_eq!(frame["CONTENT_CHECKSUM"]["value"], 0x0BAD_F00D);
        assert_eq!(root["frame_num"], 1);
        assert_eq!(inspection.trailing_bytes, 0);
    }

    #[test]
    fn test_skippable_then_frame() {
        let mut data = 0x184D_2A53u32.to_le_bytes().to_vec();
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(b"usr");
        data.extend_from_slice(&sample_frame());
        data.push(0xFF);

        let inspection = inspect(&data, &InspectConfig::default()).unwrap();
        assert_eq!(inspection.format, Format::Zstd);
        let frames = inspection.report["ZSTD_FORMAT"]["FRAME"].as_array().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["SKIPPABLE_FRAME"]["FRAME_SIZE"]["value"], 3);
        assert!(frames[1]["FRAME_HEADER"].is_object());
        assert_eq!(inspection.trailing_bytes, 1);
    }

    #[test]
    fn test_reserved_block_type() {
        let mut data = ZSTD_MAGIC.to_le_bytes().to_vec();
        data.push(0b0010_0000);
        data.push(5);
        data.extend_from_slice(&block_header(true, 3, 0));
        assert!(matches!(
            inspect(&data, &InspectConfig::default()),
            Err(Error::ReservedBlockType { format: "zstd", offset: 6 })
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut data = sample_frame();
        data.truncate(12);
        assert!(matches!(
            inspect(&data, &InspectConfig::default()),
            Err(Error::Truncated { what: "zstd block data", .. })
        ));
    }
}
