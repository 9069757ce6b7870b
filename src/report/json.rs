use super::{hex_rows, Field, Reporter, ScopeKind, Value};
use serde_json::{Map, Value as Json};

/// Reporter that builds an in-memory JSON tree.
///
/// A field becomes `{"bit_offset", "bit_size", "value", "description"}`
/// under its name. Inside a list scope, each field or stat is appended as its
/// own object carrying a `"name"` key instead.
pub struct JsonReporter {
    verbose: bool,
    /// Open scopes, outermost first. The root object is never popped.
    stack: Vec<(String, Json)>,
}

impl JsonReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose, stack: vec![(String::new(), Json::Object(Map::new()))] }
    }

    /// Close any scopes still open and return the tree
    pub fn finish(mut self) -> Json {
        while self.stack.len() > 1 {
            self.exit_scope();
        }
        self.stack.pop().map(|(_, v)| v).unwrap_or(Json::Null)
    }

    fn insert(&mut self, name: &str, value: Json) {
        let Some((_, parent)) = self.stack.last_mut() else { return };
        match parent {
            Json::Object(map) => {
                map.insert(name.to_string(), value);
            }
            Json::Array(items) => {
                let value = match value {
                    Json::Object(mut map) => {
                        map.insert("name".to_string(), Json::String(name.to_string()));
                        Json::Object(map)
                    }
                    other => {
                        let mut map = Map::new();
                        map.insert(name.to_string(), other);
                        Json::Object(map)
                    }
                };
                items.push(value);
            }
            _ => {}
        }
    }
}

fn to_json(value: Value<'_>) -> Json {
    match value {
        Value::Unsigned(v) => Json::from(v),
        Value::Float(v) => Json::from(v),
        Value::Bool(v) => Json::Bool(v),
        Value::Text(v) => Json::String(v.to_string()),
        Value::Bytes(v) => Json::from(hex_rows(v)),
    }
}

impl Reporter for JsonReporter {
    fn enter_scope(&mut self, name: &str, kind: ScopeKind) {
        let empty = match kind {
            ScopeKind::Object => Json::Object(Map::new()),
            ScopeKind::List => Json::Array(Vec::new()),
        };
        self.stack.push((name.to_string(), empty));
    }

    fn exit_scope(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        if let Some((name, value)) = self.stack.pop() {
            match self.stack.last_mut() {
                Some((_, Json::Array(items))) => items.push(value),
                _ => self.insert(&name, value),
            }
        }
    }

    fn emit_field(&mut self, field: Field<'_>) {
        let mut map = Map::new();
        if let Some(offset) = field.bit_offset {
            map.insert("bit_offset".to_string(), Json::from(offset));
        }
        if let Some(width) = field.bit_width {
            map.insert("bit_size".to_string(), Json::from(width));
        }
        map.insert("value".to_string(), to_json(field.value));
        if let Some(description) = field.description {
            map.insert("description".to_string(), Json::String(description.to_string()));
        }
        self.insert(field.name, Json::Object(map));
    }

    fn emit_stat(&mut self, name: &str, value: Value<'_>) {
        self.insert(name, to_json(value));
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}
