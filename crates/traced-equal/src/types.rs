//! Static type descriptors.
//!
//! Every [`Value`](crate::Value) reports a [`Type`]; two values are only ever
//! compared structurally when their types are equal.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Structural category of a value, one per arm of [`Value`](crate::Value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Invalid,
    Scalar,
    Array,
    Slice,
    Map,
    Record,
    Variant,
    Ref,
    Callable,
}

impl Kind {
    /// Kinds whose comparison consults the cycle guard.
    pub fn is_guarded(self) -> bool {
        matches!(self, Kind::Array | Kind::Slice | Kind::Map | Kind::Record)
    }
}

/// A nominal record type: name plus declared fields in order.
///
/// Record types compare and hash by name and field names only, so a type
/// whose fields mention the type itself stays finite to compare. Such a
/// recursive type, built with [`RecordType::recursive`], holds a strong
/// reference to itself and is never freed.
pub struct RecordType {
    name: String,
    fields: OnceLock<Vec<(String, Type)>>,
}

impl RecordType {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (S, Type)>,
    ) -> Arc<Self> {
        Self::recursive(name, |_| fields)
    }

    /// Declares a record type whose field types may refer to the type being
    /// declared; `fields` receives that type.
    ///
    /// ```
    /// use traced_equal::{RecordType, Type};
    ///
    /// let node = RecordType::recursive("Node", |node| {
    ///     [("Value", Type::Int), ("Next", Type::reference(node.clone()))]
    /// });
    /// assert_eq!(node.field_type(1).map(ToString::to_string).as_deref(), Some("*Node"));
    /// ```
    pub fn recursive<S, I>(name: impl Into<String>, fields: impl FnOnce(&Type) -> I) -> Arc<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Type)>,
    {
        let rt = Arc::new(Self {
            name: name.into(),
            fields: OnceLock::new(),
        });
        let this = Type::Record(Arc::clone(&rt));
        let declared = fields(&this)
            .into_iter()
            .map(|(name, ty)| (name.into(), ty))
            .collect();
        // The cell was created empty just above.
        let _ = rt.fields.set(declared);
        rt
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(name, type)` pairs in declared order.
    pub fn fields(&self) -> &[(String, Type)] {
        self.fields.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields().iter().position(|(f, _)| f == name)
    }

    pub fn field_type(&self, index: usize) -> Option<&Type> {
        self.fields().get(index).map(|(_, ty)| ty)
    }

    fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields().iter().map(|(name, _)| name.as_str())
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.field_names().eq(other.field_names())
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for name in self.field_names() {
            name.hash(state);
        }
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Field types print in literal form so recursive types terminate.
        let mut s = f.debug_struct("RecordType");
        s.field("name", &self.name);
        for (name, ty) in self.fields() {
            s.field(name, &format_args!("{ty}"));
        }
        s.finish()
    }
}

/// Static type of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int,
    Uint,
    Float,
    Str,
    /// Fixed-length sequence: element type and length.
    Array(Box<Type>, usize),
    Slice(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Record(Arc<RecordType>),
    /// Named interface type wrapping a dynamically typed payload.
    Variant(Arc<str>),
    Ref(Box<Type>),
    /// Callable type, identified by its signature text.
    Callable(Arc<str>),
}

impl Type {
    /// The empty interface, `interface {}`.
    pub fn any() -> Type {
        Type::Variant(Arc::from("interface {}"))
    }

    pub fn array(elem: Type, len: usize) -> Type {
        Type::Array(Box::new(elem), len)
    }

    pub fn slice(elem: Type) -> Type {
        Type::Slice(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn reference(target: Type) -> Type {
        Type::Ref(Box::new(target))
    }

    pub fn callable(signature: &str) -> Type {
        Type::Callable(Arc::from(signature))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Type::Bool | Type::Int | Type::Uint | Type::Float | Type::Str => Kind::Scalar,
            Type::Array(..) => Kind::Array,
            Type::Slice(_) => Kind::Slice,
            Type::Map(..) => Kind::Map,
            Type::Record(_) => Kind::Record,
            Type::Variant(_) => Kind::Variant,
            Type::Ref(_) => Kind::Ref,
            Type::Callable(_) => Kind::Callable,
        }
    }

    /// Whether values of this type may key a map.
    pub fn is_hashable(&self) -> bool {
        matches!(self, Type::Bool | Type::Int | Type::Uint | Type::Str)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Uint => f.write_str("uint"),
            Type::Float => f.write_str("float64"),
            Type::Str => f.write_str("string"),
            Type::Array(elem, len) => write!(f, "[{len}]{elem}"),
            Type::Slice(elem) => write!(f, "[]{elem}"),
            Type::Map(key, value) => write!(f, "map[{key}]{value}"),
            Type::Record(rt) => f.write_str(rt.name()),
            Type::Variant(name) => f.write_str(name),
            Type::Ref(target) => write!(f, "*{target}"),
            Type::Callable(sig) => f.write_str(sig),
        }
    }
}
