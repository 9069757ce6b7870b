//! gzip (RFC 1952): one or more members, each a header, a DEFLATE stream,
//! and a CRC-32 / ISIZE trailer.

use super::{
    inflate_stream, report_checksum, report_unused, ByteCursor, ChecksumCheck, Findings, InspectConfig,
    GZIP_MAGIC,
};
use crate::checksum::RunningChecksum;
use crate::deflate::Inflated;
use crate::error::{Error, InflateFailure, Result};
use crate::report::{Field, Reporter, ScopeKind, Value};
use tracing::{debug, warn};

/// Gzip header flags (RFC 1952)
const FTEXT: u8 = 1 << 0;
const FHCRC: u8 = 1 << 1;
const FEXTRA: u8 = 1 << 2;
const FNAME: u8 = 1 << 3;
const FCOMMENT: u8 = 1 << 4;
const FRESERVED: u8 = 0xE0;

const CM_DEFLATE: u8 = 8;

/// Stored header CRC and the one computed over the header bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderCrc {
    pub stored: u16,
    pub calculated: u16,
}

/// Parsed gzip member header
#[derive(Debug, Clone)]
pub struct GzipHeader<'a> {
    pub compression_method: u8,
    pub flags: u8,
    pub mtime: u32,
    pub extra_flags: u8,
    pub os: u8,
    pub extra: Option<&'a [u8]>,
    /// Raw file name, without its terminator
    pub filename: Option<&'a [u8]>,
    pub comment: Option<&'a [u8]>,
    pub header_crc: Option<HeaderCrc>,
    /// Header size in bytes
    pub len: usize,
}

impl<'a> GzipHeader<'a> {
    /// Read a header at the cursor. Only the magic bytes and truncation are
    /// checked here; see [`GzipHeader::validate`] for the rest.
    pub fn parse(cursor: &mut ByteCursor<'a>) -> Result<Self> {
        let start = cursor.position();
        let magic = cursor.u16_le("gzip header")?;
        if magic != u16::from_le_bytes(GZIP_MAGIC) {
            return Err(Error::InvalidGzipMagic(magic.swap_bytes()));
        }
        let compression_method = cursor.u8("gzip header")?;
        let flags = cursor.u8("gzip header")?;
        let mtime = cursor.u32_le("gzip header")?;
        let extra_flags = cursor.u8("gzip header")?;
        let os = cursor.u8("gzip header")?;

        let extra = if flags & FEXTRA != 0 {
            let xlen = cursor.u16_le("gzip extra length")? as usize;
            Some(cursor.bytes(xlen, "gzip extra field")?)
        } else {
            None
        };
        let filename = if flags & FNAME != 0 { Some(cursor.until_nul("gzip file name")?) } else { None };
        let comment = if flags & FCOMMENT != 0 { Some(cursor.until_nul("gzip comment")?) } else { None };

        let header_crc = if flags & FHCRC != 0 {
            let calculated = crc32fast::hash(cursor.since(start)) as u16;
            let stored = cursor.u16_le("gzip header crc")?;
            Some(HeaderCrc { stored, calculated })
        } else {
            None
        };

        Ok(GzipHeader {
            compression_method,
            flags,
            mtime,
            extra_flags,
            os,
            extra,
            filename,
            comment,
            header_crc,
            len: cursor.position() - start,
        })
    }

    /// Reject headers that cannot be decoded
    pub fn validate(&self) -> Result<()> {
        if self.compression_method > CM_DEFLATE {
            return Err(Error::UnsupportedCompressionMethod(self.compression_method));
        }
        if self.flags & FRESERVED != 0 {
            return Err(Error::GzipReservedFlags(self.flags & FRESERVED));
        }
        if let Some(crc) = self.header_crc.filter(|crc| crc.stored != crc.calculated) {
            return Err(Error::GzipHeaderCrcMismatch { expected: crc.stored, found: crc.calculated });
        }
        Ok(())
    }

    pub fn is_text(&self) -> bool {
        self.flags & FTEXT != 0
    }

    pub fn filename_str(&self) -> Option<String> {
        self.filename.map(latin1)
    }

    pub fn comment_str(&self) -> Option<String> {
        self.comment.map(latin1)
    }

    /// Emit every header field; `base` is the bit offset of the member
    pub fn report(&self, base: usize, report: &mut dyn Reporter) {
        report.emit_field(Field::new("ID1", GZIP_MAGIC[0]).at(base, 8).describe(format_args!("fixed value")));
        report.emit_field(Field::new("ID2", GZIP_MAGIC[1]).at(base + 8, 8).describe(format_args!("fixed value")));
        report.emit_field(
            Field::new("COMPRESSION_METHOD", self.compression_method)
                .at(base + 16, 8)
                .describe(format_args!("{}", method_description(self.compression_method))),
        );

        report.enter_scope("FILE_FLAGS", ScopeKind::Object);
        let flag = |bit: u8| (self.flags & bit != 0) as u8;
        let present = |bit: u8| if self.flags & bit != 0 { "present" } else { "not present" };
        report.emit_field(Field::new("FTEXT", flag(FTEXT)).at(base + 24, 1).describe(format_args!(
            "{}",
            if self.is_text() { "ASCII text" } else { "binary data" }
        )));
        report.emit_field(
            Field::new("FHCRC", flag(FHCRC))
                .at(base + 25, 1)
                .describe(format_args!("CRC16 for the gzip header is {}", present(FHCRC))),
        );
        report.emit_field(
            Field::new("FEXTRA", flag(FEXTRA))
                .at(base + 26, 1)
                .describe(format_args!("optional extra fields are {}", present(FEXTRA))),
        );
        report.emit_field(
            Field::new("FNAME", flag(FNAME))
                .at(base + 27, 1)
                .describe(format_args!("original file name is {}", present(FNAME))),
        );
        report.emit_field(
            Field::new("FCOMMENT", flag(FCOMMENT))
                .at(base + 28, 1)
                .describe(format_args!("zero-terminated file comment is {}", present(FCOMMENT))),
        );
        let reserved = self.flags >> 5;
        report.emit_field(Field::new("RESERVED", reserved).at(base + 29, 3).describe(format_args!(
            "{}",
            if reserved != 0 { "reserved bits should be 0!" } else { "reserved" }
        )));
        report.exit_scope();

        let mtime = Field::new("MTIME", self.mtime).at(base + 32, 32);
        if self.mtime == 0 {
            report.emit_field(mtime.describe(format_args!("no time stamp is available")));
        } else {
            report.emit_field(mtime.describe(format_args!("{}", utc_date(self.mtime))));
        }
        report.emit_field(
            Field::new("XFL", self.extra_flags)
                .at(base + 64, 8)
                .describe(format_args!("{}", xfl_description(self.extra_flags))),
        );
        report.emit_field(
            Field::new("OS", self.os).at(base + 72, 8).describe(format_args!("{}", os_name(self.os))),
        );

        let mut pos = base + 80;
        if let Some(extra) = self.extra {
            report.emit_field(
                Field::new("XLEN", extra.len()).at(pos, 16).describe(format_args!("bytes of extra field")),
            );
            pos += 16;
            report.emit_field(Field::new("EXTRA", extra).at(pos, extra.len() * 8));
            pos += extra.len() * 8;
        }
        if let Some(name) = self.filename {
            let text = latin1(name);
            report.emit_field(Field::new("FNAME", text.as_str()).at(pos, (name.len() + 1) * 8));
            pos += (name.len() + 1) * 8;
        }
        if let Some(comment) = self.comment {
            let text = latin1(comment);
            report.emit_field(Field::new("FCOMMENT", text.as_str()).at(pos, (comment.len() + 1) * 8));
            pos += (comment.len() + 1) * 8;
        }
        if let Some(crc) = self.header_crc {
            let field = Field::new("FHCRC", crc.stored).at(pos, 16);
            if crc.stored == crc.calculated {
                report.emit_field(field.describe(format_args!("check success")));
            } else {
                report.emit_field(
                    field.describe(format_args!("check failed, calculated 0x{:04x}", crc.calculated)),
                );
            }
        }
    }
}

/// Decode a header string: UTF-8 if it is valid, else ISO-8859-1
fn latin1(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn method_description(method: u8) -> &'static str {
    match method {
        CM_DEFLATE => "DEFLATE",
        m if m < CM_DEFLATE => "Reserved",
        _ => "Invalid",
    }
}

fn xfl_description(xfl: u8) -> &'static str {
    match xfl {
        2 => "maximum compression, slowest algorithm",
        4 => "fastest algorithm",
        _ => "compression flags",
    }
}

fn os_name(os: u8) -> &'static str {
    match os {
        0 => "FAT filesystem (MS-DOS, OS/2, NT/Win32)",
        1 => "Amiga",
        2 => "VMS (or OpenVMS)",
        3 => "Unix",
        4 => "VM/CMS",
        5 => "Atari TOS",
        6 => "HPFS filesystem (OS/2, NT)",
        7 => "Macintosh",
        8 => "Z-System",
        9 => "CP/M",
        10 => "TOPS-20",
        11 => "NTFS filesystem (NT)",
        12 => "QDOS",
        13 => "Acorn RISCOS",
        _ => "unknown OS",
    }
}

/// `YYYY-MM-DD HH:MM:SS UTC` for seconds since the Unix epoch
pub fn utc_date(secs: u32) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;

    // Proleptic Gregorian calendar from a day count, in 400-year eras
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + (month <= 2) as i64;

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        year,
        month,
        day,
        rem / 3_600,
        rem % 3_600 / 60,
        rem % 60
    )
}

/// One member: header, DEFLATE stream, trailer. The inner result is the
/// decode outcome; the outer one is for framing errors.
fn member(
    cursor: &mut ByteCursor<'_>,
    config: &InspectConfig,
    report: &mut dyn Reporter,
    out: &mut Vec<u8>,
    checks: &mut Vec<ChecksumCheck>,
) -> Result<std::result::Result<Inflated, InflateFailure>> {
    let base = cursor.bit_position();
    let header = GzipHeader::parse(cursor)?;
    report.enter_scope("GZIP_HEADER", ScopeKind::Object);
    header.report(base, report);
    report.exit_scope();
    header.validate()?;
    if header.compression_method != CM_DEFLATE {
        warn!(method = header.compression_method, "reserved gzip compression method, decoding as DEFLATE");
    }
    debug!(
        header_bytes = header.len,
        filename = header.filename_str().as_deref(),
        "gzip member header"
    );

    let mut crc = crc32fast::Hasher::new();
    let done = match inflate_stream(cursor.rest(), config, report, &mut crc, out) {
        Ok(done) => done,
        Err(failure) => return Ok(Err(failure)),
    };
    cursor.skip(done.consumed, "deflate stream")?;

    let pos = cursor.bit_position();
    let expected = cursor.u32_le("gzip trailer")?;
    let calculated = config.materialize.then(|| crc.value());
    report_checksum(report, pos, expected, calculated);
    if let Some(calculated) = calculated {
        checks.push(ChecksumCheck { name: crc.name(), expected, calculated });
    }

    let pos = cursor.bit_position();
    let isize = cursor.u32_le("gzip trailer")?;
    let produced = done.produced as u32;
    report.emit_field(
        Field::new("INPUT_SIZE", isize)
            .at(pos, 32)
            .describe(format_args!("{} bytes decoded (mod 2^32)", produced)),
    );
    checks.push(ChecksumCheck { name: "isize", expected: isize, calculated: produced });
    Ok(Ok(done))
}

pub(crate) fn dump(data: &[u8], config: &InspectConfig, report: &mut dyn Reporter) -> Result<Findings> {
    let mut cursor = ByteCursor::new(data);
    let mut found = Findings::default();
    let mut out = Vec::new();
    let mut total = Inflated::default();
    let mut members = 0usize;

    report.enter_scope("GZIP_MEMBER", ScopeKind::List);
    loop {
        report.enter_scope("member", ScopeKind::Object);
        let outcome = member(&mut cursor, config, report, &mut out, &mut found.checks)?;
        report.exit_scope();
        members += 1;

        match outcome {
            Ok(done) => {
                total.produced += done.produced;
                total.consumed += done.consumed;
                total.blocks += done.blocks;
            }
            Err(failure) => {
                report.exit_scope();
                found.outcome = Some(Err(failure));
                return Ok(found);
            }
        }
        if !cursor.rest().starts_with(&GZIP_MAGIC) {
            break;
        }
    }
    report.exit_scope();

    report.emit_stat("member_num", Value::from(members));
    found.trailing_bytes = cursor.remaining();
    report_unused(report, found.trailing_bytes);
    if config.materialize {
        found.decompressed = Some(out);
    }
    found.outcome = Some(Ok(total));
    Ok(found)
}
