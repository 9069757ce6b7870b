//! zlib (RFC 1950): two header bytes, an optional dictionary id, a DEFLATE
//! stream, and a big-endian Adler-32 of the decoded data.

use super::{inflate_stream, report_checksum, report_unused, ByteCursor, ChecksumCheck, Findings, InspectConfig};
use crate::checksum::{Adler32, RunningChecksum};
use crate::error::{Error, Result};
use crate::report::{Field, Reporter, ScopeKind};
use tracing::warn;

const CM_DEFLATE: u8 = 8;
const CM_RESERVED: u8 = 15;
const MAX_CINFO: u8 = 7;

const FDICT: u8 = 1 << 5;

/// Whether `data` starts with a plausible zlib header
pub fn is_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => {
            cmf & 0x0f == CM_DEFLATE && cmf >> 4 <= MAX_CINFO && header_check(*cmf, *flg)
        }
        _ => false,
    }
}

fn header_check(cmf: u8, flg: u8) -> bool {
    ((cmf as u16) << 8 | flg as u16) % 31 == 0
}

fn level_description(level: u8) -> &'static str {
    match level {
        0 => "fastest",
        1 => "fast",
        2 => "default",
        _ => "maximum compression, slowest",
    }
}

fn header(cursor: &mut ByteCursor<'_>, report: &mut dyn Reporter) -> Result<()> {
    report.enter_scope("ZLIB_HEADER", ScopeKind::Object);
    let cmf = cursor.u8("zlib header")?;
    let flg = cursor.u8("zlib header")?;

    let method = cmf & 0x0f;
    let field = Field::new("COMPRESSION_METHOD", method).at(0, 4);
    match method {
        CM_DEFLATE => report.emit_field(field.describe(format_args!("DEFLATE"))),
        CM_RESERVED => {
            report.emit_field(field.describe(format_args!("Reserved")));
            return Err(Error::UnsupportedCompressionMethod(method));
        }
        _ => {
            report.emit_field(field.describe(format_args!("Invalid")));
            return Err(Error::UnsupportedCompressionMethod(method));
        }
    }

    let info = cmf >> 4;
    report.emit_field(
        Field::new("COMPRESSION_INFO", info)
            .at(4, 4)
            .describe(format_args!("Window size: {} Bytes", 1u32 << (info + 8))),
    );
    if info > MAX_CINFO {
        return Err(Error::InvalidZlibWindow(info));
    }

    report.enter_scope("FLAGS", ScopeKind::Object);
    let check_ok = header_check(cmf, flg);
    report.emit_field(Field::new("FCHECK", flg & 0x1f).at(8, 5).describe(format_args!(
        "{}",
        if check_ok { "check success" } else { "check failed" }
    )));
    if !check_ok {
        warn!(cmf, flg, "zlib header check bits are wrong");
    }
    let dict = flg & FDICT != 0;
    report.emit_field(Field::new("FDICT", dict as u8).at(13, 1).describe(format_args!(
        "{}",
        if dict { "dictionary preset" } else { "dictionary not preset" }
    )));
    let level = flg >> 6;
    report.emit_field(
        Field::new("FLEVEL", level).at(14, 2).describe(format_args!("{}", level_description(level))),
    );
    report.exit_scope();

    if dict {
        let pos = cursor.bit_position();
        let id = cursor.u32_be("zlib dictionary id")?;
        report.emit_field(
            Field::new("DICTID", id).at(pos, 32).describe(format_args!("Adler-32 of the preset dictionary")),
        );
        warn!(dictionary = id, "preset dictionary is not available; back-references into it will fail");
    }
    report.exit_scope();
    Ok(())
}

pub(crate) fn dump(data: &[u8], config: &InspectConfig, report: &mut dyn Reporter) -> Result<Findings> {
    let mut cursor = ByteCursor::new(data);
    header(&mut cursor, report)?;

    let mut adler = Adler32::new();
    let mut out = Vec::new();
    let outcome = inflate_stream(cursor.rest(), config, report, &mut adler, &mut out);

    let mut found = Findings::default();
    if let Ok(done) = &outcome {
        cursor.skip(done.consumed, "deflate stream")?;
        let pos = cursor.bit_position();
        let expected = cursor.u32_be("zlib trailer")?;
        let calculated = config.materialize.then(|| adler.value());
        report_checksum(report, pos, expected, calculated);
        if let Some(calculated) = calculated {
            found.checks.push(ChecksumCheck { name: adler.name(), expected, calculated });
            found.decompressed = Some(out);
        }
        found.trailing_bytes = cursor.remaining();
        report_unused(report, found.trailing_bytes);
    }
    found.outcome = Some(outcome);
    Ok(found)
}
