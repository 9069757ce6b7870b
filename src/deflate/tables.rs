/// Largest literal/length code count a dynamic block may declare
pub const MAX_LITERAL_LENGTH_CODES: usize = 286;
/// Largest distance code count a dynamic block may declare
pub const MAX_DISTANCE_CODES: usize = 30;
/// Symbols in the code length alphabet
pub const CODE_LENGTH_CODES: usize = 19;
/// Literal/length symbol that ends a block
pub const END_OF_BLOCK: u16 = 256;

/// Length codes 257-285: base length and extra bits
/// Index by (code - 257)
pub const LENGTH_TABLE: [(u16, u8); 29] = [
    // (base_length, extra_bits)
    (3, 0),   // 257
    (4, 0),   // 258
    (5, 0),   // 259
    (6, 0),   // 260
    (7, 0),   // 261
    (8, 0),   // 262
    (9, 0),   // 263
    (10, 0),  // 264
    (11, 1),  // 265
    (13, 1),  // 266
    (15, 1),  // 267
    (17, 1),  // 268
    (19, 2),  // 269
    (23, 2),  // 270
    (27, 2),  // 271
    (31, 2),  // 272
    (35, 3),  // 273
    (43, 3),  // 274
    (51, 3),  // 275
    (59, 3),  // 276
    (67, 4),  // 277
    (83, 4),  // 278
    (99, 4),  // 279
    (115, 4), // 280
    (131, 5), // 281
    (163, 5), // 282
    (195, 5), // 283
    (227, 5), // 284
    (258, 0), // 285
];

/// Distance codes 0-29: base distance and extra bits
pub const DISTANCE_TABLE: [(u16, u8); 30] = [
    // (base_distance, extra_bits)
    (1, 0),      // 0
    (2, 0),      // 1
    (3, 0),      // 2
    (4, 0),      // 3
    (5, 1),      // 4
    (7, 1),      // 5
    (9, 2),      // 6
    (13, 2),     // 7
    (17, 3),     // 8
    (25, 3),     // 9
    (33, 4),     // 10
    (49, 4),     // 11
    (65, 5),     // 12
    (97, 5),     // 13
    (129, 6),    // 14
    (193, 6),    // 15
    (257, 7),    // 16
    (385, 7),    // 17
    (513, 8),    // 18
    (769, 8),    // 19
    (1025, 9),   // 20
    (1537, 9),   // 21
    (2049, 10),  // 22
    (3073, 10),  // 23
    (4097, 11),  // 24
    (6145, 11),  // 25
    (8193, 12),  // 26
    (12289, 12), // 27
    (16385, 13), // 28
    (24577, 13), // 29
];

/// Order of code length alphabet for dynamic Huffman blocks
pub const CODE_LENGTH_ORDER: [usize; CODE_LENGTH_CODES] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// Base length and extra bit count for a length symbol (257-285)
pub fn length_code(symbol: u16) -> Option<(u16, u8)> {
    let index = symbol.checked_sub(257)?;
    LENGTH_TABLE.get(index as usize).copied()
}

/// Base distance and extra bit count for a distance symbol (0-29)
pub fn distance_code(symbol: u16) -> Option<(u16, u8)> {
    DISTANCE_TABLE.get(symbol as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_code() {
        assert_eq!(length_code(257), Some((3, 0)));
        assert_eq!(length_code(265), Some((11, 1)));
        assert_eq!(length_code(285), Some((258, 0)));
        assert_eq!(length_code(256), None);
        assert_eq!(length_code(286), None);
        assert_eq!(length_code(287), None);
    }

    #[test]
    fn test_distance_code() {
        assert_eq!(distance_code(0), Some((1, 0)));
        assert_eq!(distance_code(4), Some((5, 1)));
        assert_eq!(distance_code(29), Some((24577, 13)));
        assert_eq!(distance_code(30), None);
    }

    #[test]
    fn test_ranges_are_contiguous() {
        // Each base follows the last value reachable from the previous code
        for pair in LENGTH_TABLE[..28].windows(2) {
            let (base, extra) = pair[0];
            assert_eq!(base + (1 << extra), pair[1].0);
        }
        for pair in DISTANCE_TABLE.windows(2) {
            let (base, extra) = pair[0];
            assert_eq!(base + (1 << extra), pair[1].0);
        }
        let (base, extra) = DISTANCE_TABLE[29];
        assert_eq!(base as u32 + (1u32 << extra) - 1, 32768);
    }
}
