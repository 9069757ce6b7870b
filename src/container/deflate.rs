//! Raw DEFLATE stream with no framing.

use super::{inflate_stream, report_unused, Findings, InspectConfig};
use crate::checksum::{Adler32, RunningChecksum};
use crate::error::Result;
use crate::report::{Field, Reporter};

pub(crate) fn dump(data: &[u8], config: &InspectConfig, report: &mut dyn Reporter) -> Result<Findings> {
    let mut adler = Adler32::new();
    let mut out = Vec::new();
    let outcome = inflate_stream(data, config, report, &mut adler, &mut out);

    let mut found = Findings::default();
    if let Ok(done) = &outcome {
        if config.materialize {
            let value = adler.value();
            report.emit_field(
                Field::new("CHECKSUM_CALCULATED", value)
                    .sized(32)
                    .describe(format_args!("Adler-32 of decoded data: 0x{:08x}", value)),
            );
            found.decompressed = Some(out);
        }
        found.trailing_bytes = data.len() - done.consumed;
        report_unused(report, found.trailing_bytes);
    }
    found.outcome = Some(outcome);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use crate::container::{inspect, Format, InspectConfig};
    use crate::error::InflateError;

    #[test]
    fn test_raw_stream_with_trailing_bytes() {
        let data = [0x01, 0x02, 0x00, 0xFD, 0xFF, b'h', b'i', 0xAA, 0xBB];
        let inspection = inspect(&data, &InspectConfig::default()).unwrap();
        assert_eq!(inspection.format, Format::Deflate);
        assert_eq!(inspection.decompressed.as_deref(), Some(&b"hi"[..]));
        assert_eq!(inspection.trailing_bytes, 2);
        assert!(inspection.checks.is_empty());

        let root = &inspection.report["DEFLATE_FORMAT"];
        assert_eq!(root["UNUSED_BYTES"], 2);
        // Adler-32 of "hi"
        assert_eq!(root["CHECKSUM_CALCULATED"]["value"], 0x013B_00D2);
        assert_eq!(root["DEFLATE_BLOCK"][0]["LEN"]["value"], 2);
    }

    #[test]
    fn test_measure_only_skips_checksum() {
        let data = [0x01, 0x02, 0x00, 0xFD, 0xFF, b'h', b'i'];
        let config = InspectConfig { materialize: false, ..Default::default() };
        let inspection = inspect(&data, &config).unwrap();
        assert!(inspection.decompressed.is_none());
        assert_eq!(inspection.outcome.unwrap().unwrap().produced, 2);
        assert!(inspection.report["DEFLATE_FORMAT"].get("CHECKSUM_CALCULATED").is_none());
    }

    #[test]
    fn test_decode_failure_is_kept() {
        let inspection = inspect(&[0x07], &InspectConfig::default()).unwrap();
        let failure = inspection.failure().unwrap();
        assert_eq!(failure.error, InflateError::InvalidBlockType);
        assert!(!inspection.is_success());
        assert!(inspection.decompressed.is_none());
        assert_eq!(inspection.report["DEFLATE_FORMAT"]["DEFLATE_BLOCK"][0]["BTYPE"]["value"], 3);
    }
}
