use super::{Field, Reporter, ScopeKind, Value};

/// Reporter that forwards every event to `tracing` at TRACE level, prefixed
/// with its scope path.
pub struct LogReporter {
    verbose: bool,
    path: Vec<String>,
}

impl LogReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose, path: Vec::new() }
    }

    fn path(&self) -> String {
        self.path.join("/")
    }
}

impl Reporter for LogReporter {
    fn enter_scope(&mut self, name: &str, _kind: ScopeKind) {
        self.path.push(name.to_string());
    }

    fn exit_scope(&mut self) {
        self.path.pop();
    }

    fn emit_field(&mut self, field: Field<'_>) {
        let description = field.description.map(|d| d.to_string()).unwrap_or_default();
        tracing::trace!(
            scope = %self.path(),
            field = field.name,
            bit_offset = ?field.bit_offset,
            bit_size = ?field.bit_width,
            value = ?field.value,
            description = description.as_str(),
            "field"
        );
    }

    fn emit_stat(&mut self, name: &str, value: Value<'_>) {
        tracing::trace!(scope = %self.path(), stat = name, value = ?value, "stat");
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}
