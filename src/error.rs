use thiserror::Error;

/// Failure causes of a single DEFLATE decode.
///
/// Each variant maps to a stable status code (see [`InflateError::status`]):
/// positive codes mean the input or output ran out and the whole decode may
/// be retried with more of either, negative codes mean the data is malformed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InflateError {
    // Resource exhaustion
    #[error("available inflate data did not terminate")]
    InputExhausted,

    #[error("incomplete stored block")]
    IncompleteStoredBlock,

    #[error("output space exhausted before completing inflate")]
    OutputExhausted,

    // Block framing
    #[error("invalid block type (type == 3)")]
    InvalidBlockType,

    #[error("stored block length did not match one's complement: LEN={len}, NLEN={nlen}")]
    StoredLengthMismatch { len: u16, nlen: u16 },

    // Dynamic block code description
    #[error("too many length or distance codes: {nlen} literal/length, {ndist} distance")]
    BadCounts { nlen: usize, ndist: usize },

    #[error("code lengths codes incomplete")]
    IncompleteCodeLengthCodes,

    #[error("repeat lengths with no first length")]
    RepeatWithoutLength,

    #[error("repeat more than specified lengths: {repeat} at index {index} of {total}")]
    TooManyLengths { index: usize, repeat: usize, total: usize },

    #[error("invalid literal/length code lengths")]
    InvalidLiteralLengths,

    #[error("invalid distance code lengths")]
    InvalidDistanceLengths,

    #[error("missing end-of-block code")]
    MissingEndOfBlock,

    // Compressed data
    #[error("decoder ran out of codes")]
    RanOutOfCodes,

    #[error("invalid literal/length symbol: {0}")]
    InvalidLengthSymbol(u16),

    #[error("invalid distance symbol: {0}")]
    InvalidDistanceSymbol(u16),

    #[error("distance too far back: {distance} with only {available} bytes of output")]
    DistanceTooFar { distance: usize, available: usize },
}

impl InflateError {
    /// Stable status code for this failure.
    ///
    /// ```text
    ///   2  available inflate data did not terminate
    ///   1  output space exhausted before completing inflate
    ///  -1  invalid block type (type == 3)
    ///  -2  stored block length did not match one's complement
    ///  -3  dynamic block code description: too many length or distance codes
    ///  -4  dynamic block code description: code lengths codes incomplete
    ///  -5  dynamic block code description: repeat lengths with no first length
    ///  -6  dynamic block code description: repeat more than specified lengths
    ///  -7  dynamic block code description: invalid literal/length code lengths
    ///  -8  dynamic block code description: invalid distance code lengths
    ///  -9  dynamic block code description: missing end-of-block code
    /// -10  invalid literal/length or distance code in fixed or dynamic block
    /// -11  distance is too far back in fixed or dynamic block
    /// ```
    pub fn status(&self) -> i32 {
        match self {
            Self::InputExhausted | Self::IncompleteStoredBlock => 2,
            Self::OutputExhausted => 1,
            Self::InvalidBlockType => -1,
            Self::StoredLengthMismatch { .. } => -2,
            Self::BadCounts { .. } => -3,
            Self::IncompleteCodeLengthCodes => -4,
            Self::RepeatWithoutLength => -5,
            Self::TooManyLengths { .. } => -6,
            Self::InvalidLiteralLengths => -7,
            Self::InvalidDistanceLengths => -8,
            Self::MissingEndOfBlock => -9,
            Self::RanOutOfCodes | Self::InvalidLengthSymbol(_) | Self::InvalidDistanceSymbol(_) => {
                -10
            }
            Self::DistanceTooFar { .. } => -11,
        }
    }

    /// Whether a retry from the start with more input or output space could succeed
    pub fn is_retryable(&self) -> bool {
        self.status() > 0
    }
}

/// A failed top-level decode, with how far it got before stopping.
///
/// `produced` and `consumed` are for debugging deflators only; a decode is
/// never resumed from them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{error} (status {status}, after {consumed} input bytes and {produced} output bytes)", status = .error.status())]
pub struct InflateFailure {
    pub error: InflateError,
    pub produced: usize,
    pub consumed: usize,
}

impl InflateFailure {
    pub fn status(&self) -> i32 {
        self.error.status()
    }
}

#[derive(Error, Debug)]
pub enum Error {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Framing errors
    #[error("{what} truncated: need {needed} bytes, {available} available")]
    Truncated { what: &'static str, needed: usize, available: usize },

    #[error("Invalid {format} magic: 0x{found:08x}")]
    InvalidMagic { format: &'static str, found: u32 },

    // Gzip header errors
    #[error("Invalid gzip magic bytes: expected 0x1f8b, got 0x{0:04x}")]
    InvalidGzipMagic(u16),

    #[error("Unsupported compression method: {0} (only DEFLATE/8 supported)")]
    UnsupportedCompressionMethod(u8),

    #[error("Gzip reserved flag bits set: 0x{0:02x}")]
    GzipReservedFlags(u8),

    #[error("Gzip header CRC mismatch: expected 0x{expected:04x}, got 0x{found:04x}")]
    GzipHeaderCrcMismatch { expected: u16, found: u16 },

    // Zlib header errors
    #[error("Invalid zlib window size: CINFO={0} (max 7)")]
    InvalidZlibWindow(u8),

    #[error("Reserved {format} block type at byte {offset}")]
    ReservedBlockType { format: &'static str, offset: usize },

    // DEFLATE errors
    #[error("DEFLATE decode failed: {0}")]
    Inflate(#[from] InflateFailure),

    #[error("Input is empty after skipping {0} bytes")]
    EmptyInput(usize),

    #[error("Unknown format: {0} (expected deflate, zlib, gzip, lz4 or zstd)")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
