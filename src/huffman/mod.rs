pub mod decoder;
pub mod tables;

pub use decoder::{HuffmanTable, Oversubscribed, MAX_BITS};
pub use tables::{fixed_tables, FixedTables};
