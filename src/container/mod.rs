//! Container formats wrapped around compressed streams.
//!
//! Each format module walks its framing with a [`ByteCursor`], reports
//! every header field, and hands any DEFLATE payload to the
//! [`Inflater`](crate::deflate::Inflater). [`inspect`] picks the module.

pub mod cursor;
pub mod deflate;
pub mod gzip;
pub mod lz4;
pub mod zlib;
pub mod zstd;

pub use cursor::ByteCursor;

use crate::checksum::RunningChecksum;
use crate::deflate::{Destination, InflateConfig, Inflated, Inflater};
use crate::error::{Error, InflateFailure, Result};
use crate::report::{Field, JsonReporter, Reporter, ScopeKind, ScopeTracker, Value};
use serde::Serialize;
use serde_json::Value as Json;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Gzip magic bytes (ID1, ID2)
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// LZ4 frame magic, little-endian
pub const LZ4_MAGIC: u32 = 0x184D_2204;
/// Zstandard frame magic, little-endian
pub const ZSTD_MAGIC: u32 = 0xFD2F_B528;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Deflate,
    Zlib,
    Gzip,
    Lz4,
    Zstd,
}

impl Format {
    /// Guess the format from the leading bytes; anything unrecognized is
    /// taken to be a raw DEFLATE stream.
    ///
    /// A raw stream whose first two bytes happen to pass the zlib header
    /// check is detected as zlib; set [`InspectConfig::format`] to decode it
    /// as raw DEFLATE.
    pub fn detect(data: &[u8]) -> Self {
        let magic = data.get(..4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        if data.starts_with(&GZIP_MAGIC) {
            Self::Gzip
        } else if magic == Some(LZ4_MAGIC) {
            Self::Lz4
        } else if magic == Some(ZSTD_MAGIC) || magic.is_some_and(zstd::is_skippable_magic) {
            Self::Zstd
        } else if zlib::is_header(data) {
            Self::Zlib
        } else {
            Self::Deflate
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Deflate => "deflate",
            Self::Zlib => "zlib",
            Self::Gzip => "gzip",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
        }
    }

    /// Name of the top-level report scope
    pub fn scope_name(&self) -> &'static str {
        match self {
            Self::Deflate => "DEFLATE_FORMAT",
            Self::Zlib => "ZLIB_FORMAT",
            Self::Gzip => "GZIP_FORMAT",
            Self::Lz4 => "LZ4_FORMAT",
            Self::Zstd => "ZSTD_FORMAT",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "deflate" | "raw" => Ok(Self::Deflate),
            "zlib" => Ok(Self::Zlib),
            "gzip" | "gz" => Ok(Self::Gzip),
            "lz4" => Ok(Self::Lz4),
            "zstd" | "zst" => Ok(Self::Zstd),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

/// A checksum or size stored in the file next to the value computed from
/// the decoded output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChecksumCheck {
    pub name: &'static str,
    pub expected: u32,
    pub calculated: u32,
}

impl ChecksumCheck {
    pub fn matches(&self) -> bool {
        self.expected == self.calculated
    }
}

/// Inspection options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InspectConfig {
    /// Container format; `None` detects it from the magic number
    pub format: Option<Format>,
    /// Leading bytes to ignore before parsing
    pub skip: usize,
    /// Report every symbol and table entry
    pub verbose: bool,
    /// Keep decoded output and compute checksums over it. When false the
    /// decoder only measures.
    pub materialize: bool,
    pub inflate: InflateConfig,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            format: None,
            skip: 0,
            verbose: false,
            materialize: true,
            inflate: InflateConfig::default(),
        }
    }
}

/// Result of inspecting one input
#[derive(Debug)]
pub struct Inspection {
    pub format: Format,
    /// Report tree; `Null` when the events went to a caller's reporter
    pub report: Json,
    /// Decoded bytes, when materialized and the decode got that far
    pub decompressed: Option<Vec<u8>>,
    /// Result of the DEFLATE decode, if the format carries one. For
    /// multi-member gzip this is the total, or the first failure.
    pub outcome: Option<std::result::Result<Inflated, InflateFailure>>,
    pub checks: Vec<ChecksumCheck>,
    /// Bytes after the end of the container
    pub trailing_bytes: usize,
}

impl Inspection {
    pub fn failure(&self) -> Option<&InflateFailure> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().err())
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &ChecksumCheck> {
        self.checks.iter().filter(|check| !check.matches())
    }

    /// Decoded without error and every stored checksum agreed
    pub fn is_success(&self) -> bool {
        self.failure().is_none() && self.mismatches().next().is_none()
    }
}

/// What a format module found, besides the report events
#[derive(Debug, Default)]
pub(crate) struct Findings {
    pub decompressed: Option<Vec<u8>>,
    pub outcome: Option<std::result::Result<Inflated, InflateFailure>>,
    pub checks: Vec<ChecksumCheck>,
    pub trailing_bytes: usize,
}

/// Inspect `data`, collecting the report as JSON.
///
/// Malformed container headers are errors. A DEFLATE payload that fails to
/// decode is not: the failure is kept in [`Inspection::outcome`] together
/// with the report up to the failing block.
pub fn inspect(data: &[u8], config: &InspectConfig) -> Result<Inspection> {
    let mut reporter = JsonReporter::new(config.verbose);
    let mut inspection = inspect_with(data, config, &mut reporter)?;
    inspection.report = reporter.finish();
    Ok(inspection)
}

/// Inspect `data`, sending report events to `reporter`
pub fn inspect_with(
    data: &[u8],
    config: &InspectConfig,
    reporter: &mut dyn Reporter,
) -> Result<Inspection> {
    let data = data.get(config.skip..).filter(|d| !d.is_empty()).ok_or(Error::EmptyInput(config.skip))?;
    let format = config.format.unwrap_or_else(|| Format::detect(data));
    debug!(%format, bytes = data.len(), skip = config.skip, "inspecting input");

    let mut report = ScopeTracker::new(reporter);
    report.enter_scope(format.scope_name(), ScopeKind::Object);
    let found = match format {
        Format::Deflate => deflate::dump(data, config, &mut report),
        Format::Zlib => zlib::dump(data, config, &mut report),
        Format::Gzip => gzip::dump(data, config, &mut report),
        Format::Lz4 => lz4::dump(data, &mut report),
        Format::Zstd => zstd::dump(data, &mut report),
    };
    report.unwind_to(0);
    let found = found?;

    for check in found.checks.iter().filter(|check| !check.matches()) {
        warn!(
            check = check.name,
            expected = check.expected,
            calculated = check.calculated,
            "stored value does not match decoded output"
        );
    }
    if found.trailing_bytes > 0 {
        warn!(bytes = found.trailing_bytes, "unused bytes after end of {}", format);
    }

    Ok(Inspection {
        format,
        report: Json::Null,
        decompressed: found.decompressed,
        outcome: found.outcome,
        checks: found.checks,
        trailing_bytes: found.trailing_bytes,
    })
}

/// Decode one DEFLATE stream at the start of `input`, appending to `out`
/// and feeding `checksum` when output is materialized.
pub(crate) fn inflate_stream(
    input: &[u8],
    config: &InspectConfig,
    report: &mut dyn Reporter,
    checksum: &mut dyn RunningChecksum,
    out: &mut Vec<u8>,
) -> std::result::Result<Inflated, InflateFailure> {
    let inflater = Inflater::new(config.inflate);
    if config.materialize {
        inflater.inflate(input, Destination::Vec(out), report, Some(checksum))
    } else {
        inflater.inflate(input, Destination::Measure, report, None)
    }
}

/// Report a stored checksum at `bit_offset`, and the calculated one when
/// there is one
pub(crate) fn report_checksum(
    report: &mut dyn Reporter,
    bit_offset: usize,
    expected: u32,
    calculated: Option<u32>,
) {
    report.emit_field(
        Field::new("CHECKSUM_IN_FILE", expected).at(bit_offset, 32).describe(format_args!("0x{:08x}", expected)),
    );
    if let Some(calculated) = calculated {
        let verdict = if calculated == expected { "check success" } else { "check failed" };
        report.emit_field(
            Field::new("CHECKSUM_CALCULATED", calculated)
                .sized(32)
                .describe(format_args!("0x{:08x}, {}", calculated, verdict)),
        );
    }
}

/// Report bytes left over after the container ends
pub(crate) fn report_unused(report: &mut dyn Reporter, bytes: usize) {
    report.emit_stat("UNUSED_BYTES", Value::from(bytes));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_magic() {
        assert_eq!(Format::detect(&[0x1f, 0x8b, 0x08, 0x00]), Format::Gzip);
        assert_eq!(Format::detect(&[0x78, 0x9c, 0x03, 0x00]), Format::Zlib);
        assert_eq!(Format::detect(&[0x78, 0x01]), Format::Zlib);
        assert_eq!(Format::detect(&[0x04, 0x22, 0x4d, 0x18, 0x60]), Format::Lz4);
        assert_eq!(Format::detect(&[0x28, 0xb5, 0x2f, 0xfd, 0x00]), Format::Zstd);
        assert_eq!(Format::detect(&[0x52, 0x2a, 0x4d, 0x18]), Format::Zstd);
        // Header check fails, so not zlib
        assert_eq!(Format::detect(&[0x78, 0x9d]), Format::Deflate);
        assert_eq!(Format::detect(&[0x03, 0x00]), Format::Deflate);
        assert_eq!(Format::detect(&[]), Format::Deflate);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("GZIP".parse::<Format>().unwrap(), Format::Gzip);
        assert_eq!("raw".parse::<Format>().unwrap(), Format::Deflate);
        assert!(matches!("bzip2".parse::<Format>(), Err(Error::UnknownFormat(_))));
        assert_eq!(Format::Zstd.to_string(), "zstd");
    }

    #[test]
    fn test_skip_and_empty_input() {
        let data = [0xEE, 0xEE, 0x01, 0x01, 0x00, 0xFE, 0xFF, 0x41];
        let config = InspectConfig { skip: 2, ..Default::default() };
        let inspection = inspect(&data, &config).unwrap();
        assert_eq!(inspection.format, Format::Deflate);
        assert_eq!(inspection.decompressed.as_deref(), Some(&b"A"[..]));
        assert!(inspection.is_success());

        let config = InspectConfig { skip: data.len(), ..Default::default() };
        assert!(matches!(inspect(&data, &config), Err(Error::EmptyInput(8))));
    }

    #[test]
    fn test_forced_format() {
        // Valid stored block, but forced through the zlib path
        let data = [0x01, 0x01, 0x00, 0xFE, 0xFF, 0x41];
        let config = InspectConfig { format: Some(Format::Zlib), ..Default::default() };
        assert!(inspect(&data, &config).is_err());
    }

    #[test]
    fn test_raw_stream_with_zlib_looking_start() {
        // Non-final stored block of "z" whose first two bytes read as a zlib
        // header, then an empty final stored block
        let data = [0x78, 0x01, 0x00, 0xFE, 0xFF, b'z', 0x01, 0x00, 0x00, 0xFF, 0xFF];
        assert_eq!(Format::detect(&data), Format::Zlib);

        let config = InspectConfig { format: Some(Format::Deflate), ..Default::default() };
        let inspection = inspect(&data, &config).unwrap();
        assert_eq!(inspection.format, Format::Deflate);
        assert_eq!(inspection.decompressed.as_deref(), Some(&b"z"[..]));
        assert!(inspection.is_success());
        assert_eq!(inspection.trailing_bytes, 0);
    }

    #[test]
    fn test_header_error_still_balances_caller_scopes() {
        let mut reporter = JsonReporter::new(false);
        let config = InspectConfig { format: Some(Format::Gzip), ..Default::default() };
        assert!(inspect_with(&[0x1f, 0x8b, 0x09], &config, &mut reporter).is_err());
        reporter.emit_stat("after", Value::Bool(true));
        let tree = reporter.finish();
        assert_eq!(tree["after"], true);
        assert!(tree["GZIP_FORMAT"].is_object());
    }

    #[test]
    fn test_checksum_check() {
        let check = ChecksumCheck { name: "adler32", expected: 1, calculated: 1 };
        assert!(check.matches());
        assert!(!ChecksumCheck { calculated: 2, ..check }.matches());
    }
}
