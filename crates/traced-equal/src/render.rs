//! Textual rendering of values for trace lines.
//!
//! Values render in a compact literal form: `[]string{"x", "y"}`, `[]string(nil)`,
//! `map[string]int{"a":1}`, `Item{Name:"a"}`. References never expand, they
//! render as `(*T)(@id)`, and a slice or map nested inside itself renders its
//! inner occurrence as `T{...}`. Rendering always terminates.

use std::fmt::{self, Write};

use indexmap::IndexMap;

use crate::value::{
    ArrayValue, CallableValue, MapKey, MapValue, RecordValue, RefValue, Scalar, SliceValue,
    StorageId, Value, VariantValue,
};

#[derive(Default)]
struct Renderer {
    active: Vec<StorageId>,
}

impl Renderer {
    fn value(&mut self, f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
        match value {
            Value::Invalid => f.write_str("<invalid>"),
            Value::Scalar(s) => write!(f, "{s}"),
            Value::Array(a) => self.array(f, a),
            Value::Slice(s) => self.slice(f, s),
            Value::Map(m) => self.map(f, m),
            Value::Record(r) => self.record(f, r),
            Value::Variant(v) => self.variant(f, v),
            Value::Ref(r) => reference(f, r),
            Value::Callable(c) => callable(f, c),
        }
    }

    fn items(&mut self, f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
        f.write_char('{')?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.value(f, item)?;
        }
        f.write_char('}')
    }

    fn array(&mut self, f: &mut fmt::Formatter<'_>, a: &ArrayValue) -> fmt::Result {
        write!(f, "[{}]{}", a.len(), a.elem())?;
        self.items(f, a.items())
    }

    fn slice(&mut self, f: &mut fmt::Formatter<'_>, s: &SliceValue) -> fmt::Result {
        write!(f, "[]{}", s.elem())?;
        let (Some(id), Some(items)) = (s.storage(), s.items()) else {
            return f.write_str("(nil)");
        };
        if self.active.contains(&id) {
            return f.write_str("{...}");
        }
        self.active.push(id);
        let result = self.items(f, &items);
        self.active.pop();
        result
    }

    fn map(&mut self, f: &mut fmt::Formatter<'_>, m: &MapValue) -> fmt::Result {
        write!(f, "map[{}]{}", m.key_type(), m.value_type())?;
        let (Some(id), Some(entries)) = (m.storage(), m.entries()) else {
            return f.write_str("(nil)");
        };
        if self.active.contains(&id) {
            return f.write_str("{...}");
        }
        self.active.push(id);
        let result = self.entries(f, &entries);
        self.active.pop();
        result
    }

    fn entries(
        &mut self,
        f: &mut fmt::Formatter<'_>,
        entries: &IndexMap<MapKey, Value>,
    ) -> fmt::Result {
        f.write_char('{')?;
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}:")?;
            self.value(f, value)?;
        }
        f.write_char('}')
    }

    fn record(&mut self, f: &mut fmt::Formatter<'_>, r: &RecordValue) -> fmt::Result {
        write!(f, "{}{{", r.record_type().name())?;
        for (i, (name, value)) in r.fields().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}:")?;
            self.value(f, value)?;
        }
        f.write_char('}')
    }

    fn variant(&mut self, f: &mut fmt::Formatter<'_>, v: &VariantValue) -> fmt::Result {
        match v.payload() {
            Some(payload) => self.value(f, payload),
            None => write!(f, "{}(nil)", v.name()),
        }
    }
}

fn reference(f: &mut fmt::Formatter<'_>, r: &RefValue) -> fmt::Result {
    match r.storage() {
        Some(id) => write!(f, "(*{})({id})", r.target_type()),
        None => write!(f, "(*{})(nil)", r.target_type()),
    }
}

fn callable(f: &mut fmt::Formatter<'_>, c: &CallableValue) -> fmt::Result {
    if c.is_nil() {
        write!(f, "({})(nil)", c.signature())
    } else {
        write!(f, "({})(<func>)", c.signature())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Uint(n) => write!(f, "{n}"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{b}"),
            MapKey::Int(n) => write!(f, "{n}"),
            MapKey::Uint(n) => write!(f, "{n}"),
            MapKey::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Renderer::default().value(f, self)
    }
}

impl fmt::Display for SliceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Renderer::default().slice(f, self)
    }
}
