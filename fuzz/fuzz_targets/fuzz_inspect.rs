#![no_main]

use libfuzzer_sys::fuzz_target;
use zinspect::{inspect, Format, InspectConfig};

fuzz_target!(|data: &[u8]| {
    // Every container path, forced and detected; errors are fine, panics are not
    let formats =
        [None, Some(Format::Deflate), Some(Format::Zlib), Some(Format::Gzip), Some(Format::Lz4), Some(Format::Zstd)];
    for format in formats {
        for verbose in [false, true] {
            let config = InspectConfig { format, verbose, ..Default::default() };
            if let Ok(inspection) = inspect(data, &config) {
                if let (Some(out), Some(Ok(done))) = (&inspection.decompressed, &inspection.outcome) {
                    assert_eq!(out.len(), done.produced);
                }
            }
        }
    }
});
