use super::decoder::HuffmanTable;
use std::sync::OnceLock;

/// Literal/length symbols covered by the fixed code (286 and 287 never occur)
pub const FIXED_LITERAL_LENGTH_CODES: usize = 288;
/// Distance symbols covered by the fixed code
pub const FIXED_DISTANCE_CODES: usize = 30;

/// Fixed Huffman literal/length code lengths (RFC 1951 section 3.2.6)
pub fn fixed_literal_lengths() -> [u8; FIXED_LITERAL_LENGTH_CODES] {
    let mut lengths = [0u8; FIXED_LITERAL_LENGTH_CODES];
    lengths[0..=143].fill(8); // 0-143: 8 bits
    lengths[144..=255].fill(9); // 144-255: 9 bits
    lengths[256..=279].fill(7); // 256-279: 7 bits
    lengths[280..=287].fill(8); // 280-287: 8 bits
    lengths
}

/// Fixed Huffman distance code lengths (all 5 bits)
pub fn fixed_distance_lengths() -> [u8; FIXED_DISTANCE_CODES] {
    [5u8; FIXED_DISTANCE_CODES]
}

/// The pair of tables used by every fixed-code block
pub struct FixedTables {
    pub literal_length: HuffmanTable,
    pub distance: HuffmanTable,
}

/// Fixed tables, built on first use and shared by all threads afterwards
pub fn fixed_tables() -> &'static FixedTables {
    static TABLES: OnceLock<FixedTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let literal_length =
            HuffmanTable::build(&fixed_literal_lengths()).expect("fixed lengths are complete");
        let distance =
            HuffmanTable::build(&fixed_distance_lengths()).expect("fixed lengths are not over-subscribed");
        FixedTables { literal_length, distance }
    })
}
