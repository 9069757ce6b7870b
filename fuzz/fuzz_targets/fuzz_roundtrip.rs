#![no_main]

use flate2::write::DeflateEncoder;
use flate2::Compression;
use libfuzzer_sys::fuzz_target;
use std::io::Write;
use zinspect::{Destination, Inflater, JsonReporter};

fuzz_target!(|data: &[u8]| {
    // Limit data size to avoid slowdowns
    let data = if data.len() > 64 * 1024 { &data[..64 * 1024] } else { data };

    let level = Compression::new(data.first().map_or(6, |b| u32::from(b % 10)));
    let mut encoder = DeflateEncoder::new(Vec::new(), level);
    if encoder.write_all(data).is_err() {
        return;
    }
    let compressed = match encoder.finish() {
        Ok(d) => d,
        Err(_) => return,
    };

    // Valid streams must decode to the input, with the report enabled
    let mut reporter = JsonReporter::new(data.len() < 1024);
    let mut out = Vec::new();
    let done = Inflater::default()
        .inflate(&compressed, Destination::Vec(&mut out), &mut reporter, None)
        .expect("decode of encoder output");
    assert_eq!(out, data, "Round-trip mismatch");
    assert_eq!(done.consumed, compressed.len());
    let tree = reporter.finish();
    assert_eq!(tree["BLOCK_SUMMARY"]["decompressed_bytes"], data.len());
});
