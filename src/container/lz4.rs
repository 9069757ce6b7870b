//! LZ4 frame format. Only the framing is walked; block payloads are
//! reported by position and size and never decompressed.

use super::{report_unused, ByteCursor, Findings, LZ4_MAGIC};
use crate::error::{Error, Result};
use crate::report::{Field, Reporter, ScopeKind, Value};
use tracing::{debug, warn};

const FLG_DICT_ID: u8 = 1 << 0;
const FLG_CONTENT_CHECKSUM: u8 = 1 << 2;
const FLG_CONTENT_SIZE: u8 = 1 << 3;
const FLG_BLOCK_CHECKSUM: u8 = 1 << 4;
const FLG_BLOCK_INDEPENDENCE: u8 = 1 << 5;

/// High bit of a block size: the block is stored uncompressed
const BLOCK_UNCOMPRESSED: u32 = 1 << 31;

/// Frame options from the FLG and BD bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub flg: u8,
    pub bd: u8,
}

impl FrameDescriptor {
    pub fn version(&self) -> u8 {
        self.flg >> 6
    }

    pub fn has(&self, flag: u8) -> bool {
        self.flg & flag != 0
    }

    /// Largest block size in bytes, if the BD code is defined
    pub fn block_max_size(&self) -> Option<usize> {
        match (self.bd >> 4) & 0x7 {
            code @ 4..=7 => Some(1 << (8 + 2 * code as usize)),
            _ => None,
        }
    }
}

fn block_max_description(code: u8) -> &'static str {
    match code {
        4 => "64KB",
        5 => "256KB",
        6 => "1MB",
        7 => "4MB",
        _ => "invalid",
    }
}

fn flag_field<'a>(report: &mut dyn Reporter, name: &'a str, flg: u8, bit: u8, on: &'a str, off: &'a str) {
    let set = flg & (1 << bit) != 0;
    report.emit_field(
        Field::new(name, set as u8)
            .at(32 + bit as usize, 1)
            .describe(format_args!("{}", if set { on } else { off })),
    );
}

fn frame_descriptor(cursor: &mut ByteCursor<'_>, report: &mut dyn Reporter) -> Result<FrameDescriptor> {
    report.enter_scope("FRAME_DESCRIPTOR", ScopeKind::Object);
    let flg = cursor.u8("lz4 frame descriptor")?;
    let bd = cursor.u8("lz4 frame descriptor")?;
    let fd = FrameDescriptor { flg, bd };

    report.enter_scope("FLG", ScopeKind::Object);
    flag_field(report, "DICT_ID_FLAG", flg, 0, "dictionary id is present", "dictionary id is not present");
    report.emit_field(Field::new("RESERVED", (flg >> 1) & 1).at(33, 1).describe(format_args!("must be 0")));
    flag_field(
        report,
        "CONTENT_CHECKSUM_FLAG",
        flg,
        2,
        "a 32-bit content checksum follows the end mark",
        "no content checksum",
    );
    flag_field(
        report,
        "CONTENT_SIZE_FLAG",
        flg,
        3,
        "uncompressed size is stored in the header",
        "uncompressed size is not stored",
    );
    flag_field(
        report,
        "BLOCK_CHECKSUM_FLAG",
        flg,
        4,
        "each data block will be followed by a 4-bytes checksum",
        "each data block will not be followed by a 4-bytes checksum",
    );
    flag_field(
        report,
        "BLOCK_INDEPENDENCE_FLAG",
        flg,
        5,
        "blocks are independent",
        "each block depends on previous ones (up to the 64 KB window)",
    );
    let version = fd.version();
    report.emit_field(Field::new("VERSION", version).at(38, 2).describe(format_args!(
        "{}",
        if version == 1 { "01" } else { "must be 01" }
    )));
    report.exit_scope();
    if version != 1 {
        warn!(version, "unexpected lz4 frame version");
    }

    report.enter_scope("BD", ScopeKind::Object);
    report.emit_field(Field::new("RESERVED", bd & 0x0f).at(40, 4));
    let code = (bd >> 4) & 0x7;
    report.emit_field(
        Field::new("BLOCK_MAXSIZE", code).at(44, 3).describe(format_args!("{}", block_max_description(code))),
    );
    report.emit_field(Field::new("RESERVED_HIGH", bd >> 7).at(47, 1));
    report.exit_scope();

    if fd.has(FLG_CONTENT_SIZE) {
        let pos = cursor.bit_position();
        let size = cursor.u64_le("lz4 content size")?;
        report.emit_field(
            Field::new("CONTENT_SIZE", size).at(pos, 64).describe(format_args!("{} bytes uncompressed", size)),
        );
    }
    if fd.has(FLG_DICT_ID) {
        let pos = cursor.bit_position();
        let id = cursor.u32_le("lz4 dictionary id")?;
        report.emit_field(Field::new("DICTIONARY_ID", id).at(pos, 32));
    }
    let pos = cursor.bit_position();
    let hc = cursor.u8("lz4 header checksum")?;
    report.emit_field(
        Field::new("HEADER_CHECKSUM", hc)
            .at(pos, 8)
            .describe(format_args!("second byte of xxh32 over the descriptor (not verified)")),
    );
    report.exit_scope();
    Ok(fd)
}

pub(crate) fn dump(data: &[u8], report: &mut dyn Reporter) -> Result<Findings> {
    let mut cursor = ByteCursor::new(data);
    let magic = cursor.u32_le("lz4 magic number")?;
    if magic != LZ4_MAGIC {
        return Err(Error::InvalidMagic { format: "lz4", found: magic });
    }
    report.emit_field(Field::new("MAGIC_NUMBER", magic).at(0, 32).describe(format_args!("0x{:08x}", magic)));

    let fd = frame_descriptor(&mut cursor, report)?;
    let max_size = fd.block_max_size();

    report.enter_scope("LZ4_BLOCK", ScopeKind::List);
    let mut blocks = 0usize;
    let end_pos = loop {
        let pos = cursor.bit_position();
        let word = cursor.u32_le("lz4 block size")?;
        if word == 0 {
            break pos;
        }
        let size = (word & !BLOCK_UNCOMPRESSED) as usize;
        let uncompressed = word & BLOCK_UNCOMPRESSED != 0;

        report.enter_scope("block", ScopeKind::Object);
        report.emit_stat("BLOCK_BIT_POSITION", Value::from(pos));
        report.emit_stat("BLOCK_BIT_SIZE", Value::from((size + 4) * 8));
        report.emit_stat("COMPRESSED_FLAG", Value::Text(if uncompressed { "UNCOMPRESSED" } else { "COMPRESSED" }));
        report.emit_stat("BLOCK_SIZE", Value::from(size));
        cursor.skip(size, "lz4 block data")?;
        if fd.has(FLG_BLOCK_CHECKSUM) {
            let pos = cursor.bit_position();
            let checksum = cursor.u32_le("lz4 block checksum")?;
            report.emit_field(Field::new("BLOCK_CHECKSUM", checksum).at(pos, 32));
        }
        report.exit_scope();

        if max_size.is_some_and(|max| size > max) {
            warn!(block = blocks, size, "lz4 block larger than the frame's maximum block size");
        }
        debug!(block = blocks, size, uncompressed, "lz4 block");
        blocks += 1;
    };
    report.exit_scope();

    report.emit_field(Field::new("END_MARK", 0u32).at(end_pos, 32).describe(format_args!("end of blocks")));
    if fd.has(FLG_CONTENT_CHECKSUM) {
        let pos = cursor.bit_position();
        let checksum = cursor.u32_le("lz4 content checksum")?;
        report.emit_field(
            Field::new("CONTENT_CHECKSUM", checksum)
                .at(pos, 32)
                .describe(format_args!("xxh32 of the decoded content (not verified)")),
        );
    }
    report.emit_stat("block_num", Value::from(blocks));
    if !fd.has(FLG_BLOCK_INDEPENDENCE) {
        debug!("lz4 blocks are linked");
    }

    let found = Findings { trailing_bytes: cursor.remaining(), ..Default::default() };
    report_unused(report, found.trailing_bytes);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{inspect, Format, InspectConfig};

    /// Frame with content size and block checksums, two blocks, and a
    /// content checksum
    fn sample_frame() -> Vec<u8> {
        let mut data = LZ4_MAGIC.to_le_bytes().to_vec();
        data.push(0b0110_1100 | FLG_BLOCK_CHECKSUM);
        data.push(0x40);
        data.extend_from_slice(&7u64.to_le_bytes());
        data.push(0xA5);
        // Uncompressed block of 3 bytes, then its checksum
        data.extend_from_slice(&(3 | BLOCK_UNCOMPRESSED).to_le_bytes());
        data.extend_from_slice(b"abc");
        data.extend_from_slice(&0x1111_1111u32.to_le_bytes());
        // Compressed block of 2 bytes
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0x40, 0x64]);
        data.extend_from_slice(&0x2222_2222u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        data
    }

    #[test]
    fn test_frame_descriptor_fields() {
        let inspection = inspect(&sample_frame(), &InspectConfig::default()).unwrap();
        assert_eq!(inspection.format, Format::Lz4);
        assert!(inspection.outcome.is_none());

        let root = &inspection.report["LZ4_FORMAT"];
        let fd = &root["FRAME_DESCRIPTOR"];
        assert_eq!(fd["FLG"]["VERSION"]["value"], 1);
        assert_eq!(fd["FLG"]["BLOCK_INDEPENDENCE_FLAG"]["value"], 1);
        assert_eq!(fd["FLG"]["BLOCK_CHECKSUM_FLAG"]["value"], 1);
        assert_eq!(fd["FLG"]["CONTENT_SIZE_FLAG"]["value"], 1);
        assert_eq!(fd["FLG"]["CONTENT_CHECKSUM_FLAG"]["value"], 1);
        assert_eq!(fd["FLG"]["DICT_ID_FLAG"]["value"], 0);
        assert_eq!(fd["BD"]["BLOCK_MAXSIZE"]["description"], "64KB");
        assert_eq!(fd["CONTENT_SIZE"]["value"], 7);
        assert_eq!(fd["HEADER_CHECKSUM"]["value"], 0xA5);
        assert_eq!(fd["HEADER_CHECKSUM"]["bit_offset"], 14 * 8);
    }

    #[test]
    fn test_blocks_and_end_mark() {
        let data = sample_frame();
        let inspection = inspect(&data, &InspectConfig::default()).unwrap();
        let root = &inspection.report["LZ4_FORMAT"];
        let blocks = root["LZ4_BLOCK"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["BLOCK_BIT_POSITION"], 15 * 8);
        assert_eq!(blocks[0]["COMPRESSED_FLAG"], "UNCOMPRESSED");
        assert_eq!(blocks[0]["BLOCK_BIT_SIZE"], 7 * 8);
        assert_eq!(blocks[0]["BLOCK_CHECKSUM"]["value"], 0x1111_1111);
        assert_eq!(blocks[1]["COMPRESSED_FLAG"], "COMPRESSED");
        assert_eq!(blocks[1]["BLOCK_BIT_POSITION"], (15 + 11) * 8);
        assert_eq!(root["END_MARK"]["bit_offset"], (15 + 11 + 10) * 8);
        assert_eq!(root["CONTENT_CHECKSUM"]["value"], 0xDEAD_BEEFu32);
        assert_eq!(root["block_num"], 2);
        assert_eq!(inspection.trailing_bytes, 0);
    }

    #[test]
    fn test_block_max_size() {
        assert_eq!(FrameDescriptor { flg: 0x40, bd: 0x40 }.block_max_size(), Some(64 * 1024));
        assert_eq!(FrameDescriptor { flg: 0x40, bd: 0x70 }.block_max_size(), Some(4 * 1024 * 1024));
        assert_eq!(FrameDescriptor { flg: 0x40, bd: 0x30 }.block_max_size(), None);
    }

    #[test]
    fn test_truncated_block() {
        let mut data = sample_frame();
        data.truncate(20);
        let config = InspectConfig { format: Some(Format::Lz4), ..Default::default() };
        assert!(matches!(
            inspect(&data, &config),
            Err(Error::Truncated { what: "lz4 block data", needed: 3, available: 1 })
        ));
    }

    #[test]
    fn test_wrong_magic() {
        let config = InspectConfig { format: Some(Format::Lz4), ..Default::default() };
        assert!(matches!(
            inspect(&[1, 2, 3, 4, 5], &config),
            Err(Error::InvalidMagic { format: "lz4", found: 0x0403_0201 })
        ));
    }
}
