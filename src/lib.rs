//! Bit-level inspection of DEFLATE streams and the containers that carry
//! them.
//!
//! The core is a DEFLATE (RFC 1951) decoder that reports every header field,
//! code table and symbol it reads to a [`Reporter`]. Around it,
//! [`container`] walks zlib, gzip, LZ4 and Zstandard framing.
//!
//! ```no_run
//! use zinspect::{inspect, InspectConfig};
//!
//! let data = std::fs::read("file.gz")?;
//! let inspection = inspect(&data, &InspectConfig::default())?;
//! println!("{}", serde_json::to_string_pretty(&inspection.report)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bits;
pub mod checksum;
pub mod container;
pub mod deflate;
pub mod error;
pub mod huffman;
pub mod report;

pub use checksum::{Adler32, RunningChecksum};
pub use container::{inspect, inspect_with, ChecksumCheck, Format, InspectConfig, Inspection};
pub use deflate::{decode, Destination, InflateConfig, Inflated, Inflater};
pub use error::{Error, InflateError, InflateFailure, Result};
pub use report::{JsonReporter, LogReporter, NullReporter, Reporter};

/// Decode a complete raw DEFLATE stream with default settings
pub fn inflate(input: &[u8]) -> Result<Vec<u8>> {
    let (output, _) = Inflater::default().inflate_to_vec(input)?;
    Ok(output)
}
