//! Structured report sink.
//!
//! Decoders describe what they read as a tree of named scopes and fields.
//! They only ever talk to the [`Reporter`] trait; how (or whether) the tree
//! is rendered is up to the implementation.

pub mod json;
pub mod log;

pub use json::JsonReporter;
pub use log::LogReporter;

use std::fmt;

/// Shape of a scope's children
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// Children are keyed by name
    Object,
    /// Children are kept in emission order, names are informational
    List,
}

/// Raw value of a reported field
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<'a> {
    Unsigned(u64),
    Float(f64),
    Bool(bool),
    Text(&'a str),
    Bytes(&'a [u8]),
}

impl From<u64> for Value<'_> {
    fn from(v: u64) -> Self {
        Value::Unsigned(v)
    }
}

impl From<u32> for Value<'_> {
    fn from(v: u32) -> Self {
        Value::Unsigned(v as u64)
    }
}

impl From<u16> for Value<'_> {
    fn from(v: u16) -> Self {
        Value::Unsigned(v as u64)
    }
}

impl From<u8> for Value<'_> {
    fn from(v: u8) -> Self {
        Value::Unsigned(v as u64)
    }
}

impl From<usize> for Value<'_> {
    fn from(v: usize) -> Self {
        Value::Unsigned(v as u64)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Text(v)
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Bytes(v)
    }
}

/// One decoded field: where it sits in the stream, its raw value, and an
/// optional human-readable interpretation.
///
/// The description is kept as unformatted [`fmt::Arguments`] so a sink that
/// drops it never pays for formatting.
#[derive(Clone, Copy, Debug)]
pub struct Field<'a> {
    pub name: &'a str,
    pub bit_offset: Option<usize>,
    pub bit_width: Option<usize>,
    pub value: Value<'a>,
    pub description: Option<fmt::Arguments<'a>>,
}

impl<'a> Field<'a> {
    pub fn new(name: &'a str, value: impl Into<Value<'a>>) -> Self {
        Self { name, bit_offset: None, bit_width: None, value: value.into(), description: None }
    }

    /// Place the field at `bit_offset`, spanning `bit_width` bits
    pub fn at(mut self, bit_offset: usize, bit_width: usize) -> Self {
        self.bit_offset = Some(bit_offset);
        self.bit_width = Some(bit_width);
        self
    }

    /// Field with a width but no meaningful absolute position
    pub fn sized(mut self, bit_width: usize) -> Self {
        self.bit_width = Some(bit_width);
        self
    }

    pub fn describe(mut self, description: fmt::Arguments<'a>) -> Self {
        self.description = Some(description);
        self
    }
}

/// Event sink for decoders
pub trait Reporter {
    fn enter_scope(&mut self, name: &str, kind: ScopeKind);

    fn exit_scope(&mut self);

    fn emit_field(&mut self, field: Field<'_>);

    /// Summary counter or derived statistic (no stream position)
    fn emit_stat(&mut self, name: &str, value: Value<'_>);

    /// Whether per-symbol and per-table-entry events are wanted
    fn is_verbose(&self) -> bool {
        false
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn enter_scope(&mut self, name: &str, kind: ScopeKind) {
        (**self).enter_scope(name, kind)
    }

    fn exit_scope(&mut self) {
        (**self).exit_scope()
    }

    fn emit_field(&mut self, field: Field<'_>) {
        (**self).emit_field(field)
    }

    fn emit_stat(&mut self, name: &str, value: Value<'_>) {
        (**self).emit_stat(name, value)
    }

    fn is_verbose(&self) -> bool {
        (**self).is_verbose()
    }
}

/// Reporter that discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn enter_scope(&mut self, _name: &str, _kind: ScopeKind) {}

    fn exit_scope(&mut self) {}

    fn emit_field(&mut self, _field: Field<'_>) {}

    fn emit_stat(&mut self, _name: &str, _value: Value<'_>) {}
}

/// Reporter wrapper that remembers how deep it is, so an aborted decode can
/// close whatever scopes it left open.
pub struct ScopeTracker<'r> {
    inner: &'r mut dyn Reporter,
    depth: usize,
}

impl<'r> ScopeTracker<'r> {
    pub fn new(inner: &'r mut dyn Reporter) -> Self {
        Self { inner, depth: 0 }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Close scopes until only `depth` remain open
    pub fn unwind_to(&mut self, depth: usize) {
        while self.depth > depth {
            self.exit_scope();
        }
    }
}

impl Reporter for ScopeTracker<'_> {
    fn enter_scope(&mut self, name: &str, kind: ScopeKind) {
        self.depth += 1;
        self.inner.enter_scope(name, kind);
    }

    fn exit_scope(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
            self.inner.exit_scope();
        }
    }

    fn emit_field(&mut self, field: Field<'_>) {
        self.inner.emit_field(field);
    }

    fn emit_stat(&mut self, name: &str, value: Value<'_>) {
        self.inner.emit_stat(name, value);
    }

    fn is_verbose(&self) -> bool {
        self.inner.is_verbose()
    }
}

/// Render bytes as `0x..` groups of 16, one string per group
pub fn hex_rows(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(16)
        .map(|row| row.iter().map(|b| format!("0x{:02x}", b)).collect::<Vec<_>>().join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_builder() {
        let field = Field::new("LEN", 5u16).at(8, 16);
        assert_eq!(field.name, "LEN");
        assert_eq!(field.bit_offset, Some(8));
        assert_eq!(field.bit_width, Some(16));
        assert_eq!(field.value, Value::Unsigned(5));
        assert!(field.description.is_none());
    }

    #[test]
    fn test_scope_tracker_unwinds() {
        let mut json = JsonReporter::new(false);
        {
            let mut tracker = ScopeTracker::new(&mut json);
            tracker.enter_scope("outer", ScopeKind::Object);
            tracker.enter_scope("inner", ScopeKind::List);
            assert_eq!(tracker.depth(), 2);
            tracker.unwind_to(0);
            assert_eq!(tracker.depth(), 0);
        }
        json.emit_stat("after", Value::Unsigned(1));
        let tree = json.finish();
        assert_eq!(tree["after"], 1);
        assert!(tree["outer"]["inner"].is_array());
    }

    #[test]
    fn test_hex_rows() {
        let bytes: Vec<u8> = (0..18).collect();
        let rows = hex_rows(&bytes);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("0x00 0x01"));
        assert_eq!(rows[1], "0x10 0x11");
    }
}
