//! The value model.
//!
//! [`Value`] is a closed enum with one arm per [`Kind`]. Heap-backed parts
//! (slice backing stores, map tables, reference targets) live in [`Storage`]
//! cells, so cloning a `Value` shares them the way references are shared.
//! Each cell carries a [`StorageId`] assigned at allocation; that id is the
//! identity token used for cycle detection.
//!
//! Reference cycles built through [`RefValue::store`] or [`SliceValue::set`]
//! are never freed, same as any `Rc` cycle.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ValueError;
use crate::types::{Kind, RecordType, Type};

static NEXT_STORAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one [`Storage`] allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageId(u64);

impl StorageId {
    fn next() -> Self {
        StorageId(NEXT_STORAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Shared, interior-mutable cell with a stable identity.
pub struct Storage<T> {
    id: StorageId,
    cell: Rc<RefCell<T>>,
}

impl<T> Storage<T> {
    pub fn new(value: T) -> Self {
        Self {
            id: StorageId::next(),
            cell: Rc::new(RefCell::new(value)),
        }
    }

    pub fn id(&self) -> StorageId {
        self.id
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.cell.borrow()
    }

    fn borrow_mut(&self) -> RefMut<'_, T> {
        self.cell.borrow_mut()
    }

    fn replace(&self, value: T) -> T {
        self.cell.replace(value)
    }
}

impl<T> Clone for Storage<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Storage({})", self.id)
    }
}

// ── Scalars and keys ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub fn ty(&self) -> Type {
        match self {
            Scalar::Bool(_) => Type::Bool,
            Scalar::Int(_) => Type::Int,
            Scalar::Uint(_) => Type::Uint,
            Scalar::Float(_) => Type::Float,
            Scalar::Str(_) => Type::Str,
        }
    }
}

/// A map key. Keys match by their native `Eq`, never by deep equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Str(String),
}

impl MapKey {
    pub fn ty(&self) -> Type {
        match self {
            MapKey::Bool(_) => Type::Bool,
            MapKey::Int(_) => Type::Int,
            MapKey::Uint(_) => Type::Uint,
            MapKey::Str(_) => Type::Str,
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::Str(s.to_string())
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        MapKey::Str(s)
    }
}

impl From<i64> for MapKey {
    fn from(n: i64) -> Self {
        MapKey::Int(n)
    }
}

impl From<u64> for MapKey {
    fn from(n: u64) -> Self {
        MapKey::Uint(n)
    }
}

impl From<bool> for MapKey {
    fn from(b: bool) -> Self {
        MapKey::Bool(b)
    }
}

fn check_item(expected: &Type, item: &Value) -> Result<(), ValueError> {
    if item.ty().as_ref() == Some(expected) {
        Ok(())
    } else {
        Err(ValueError::ElementType {
            expected: expected.clone(),
            found: type_name(item),
        })
    }
}

fn type_name(value: &Value) -> String {
    value
        .ty()
        .map_or_else(|| "invalid".to_string(), |ty| ty.to_string())
}

// ── Sequences ────────────────────────────────────────────────────────────

/// Fixed-length sequence stored inline.
#[derive(Debug, Clone)]
pub struct ArrayValue {
    elem: Type,
    items: Vec<Value>,
}

impl ArrayValue {
    pub fn new(elem: Type, items: Vec<Value>) -> Result<Self, ValueError> {
        for item in &items {
            check_item(&elem, item)?;
        }
        Ok(Self { elem, items })
    }

    pub fn elem(&self) -> &Type {
        &self.elem
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

/// Variable-length view into a shared backing store, or nil.
///
/// A nil slice and a present empty slice are distinct values.
#[derive(Debug, Clone)]
pub struct SliceValue {
    elem: Type,
    data: Option<Storage<Vec<Value>>>,
    start: usize,
    len: usize,
}

impl SliceValue {
    pub fn nil(elem: Type) -> Self {
        Self {
            elem,
            data: None,
            start: 0,
            len: 0,
        }
    }

    pub fn new(elem: Type, items: Vec<Value>) -> Result<Self, ValueError> {
        for item in &items {
            check_item(&elem, item)?;
        }
        Ok(Self::from_vec(elem, items))
    }

    pub(crate) fn from_vec(elem: Type, items: Vec<Value>) -> Self {
        let len = items.len();
        Self {
            elem,
            data: Some(Storage::new(items)),
            start: 0,
            len,
        }
    }

    pub fn elem(&self) -> &Type {
        &self.elem
    }

    pub fn is_nil(&self) -> bool {
        self.data.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of this view into its backing store.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn storage(&self) -> Option<StorageId> {
        self.data.as_ref().map(Storage::id)
    }

    /// Both views start at the same element of the same backing store.
    pub fn same_storage(&self, other: &SliceValue) -> bool {
        match (self.storage(), other.storage()) {
            (Some(a), Some(b)) => a == b && self.start == other.start,
            _ => false,
        }
    }

    /// Borrows the viewed elements; `None` for a nil slice.
    pub fn items(&self) -> Option<Ref<'_, [Value]>> {
        let (start, end) = (self.start, self.start + self.len);
        self.data
            .as_ref()
            .map(|data| Ref::map(data.borrow(), |items| &items[start..end]))
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items()?.get(index).cloned()
    }

    /// Overwrites one element; the write is visible through every aliasing view.
    pub fn set(&self, index: usize, value: Value) -> Result<Value, ValueError> {
        check_item(&self.elem, &value)?;
        let data = match &self.data {
            Some(data) if index < self.len => data,
            _ => {
                return Err(ValueError::OutOfRange {
                    start: index,
                    end: index + 1,
                    len: self.len,
                })
            }
        };
        let old = std::mem::replace(&mut data.borrow_mut()[self.start + index], value);
        Ok(old)
    }

    /// A view of `range` sharing this slice's backing store.
    pub fn subslice(&self, range: Range<usize>) -> Result<SliceValue, ValueError> {
        if range.start > range.end || range.end > self.len {
            return Err(ValueError::OutOfRange {
                start: range.start,
                end: range.end,
                len: self.len,
            });
        }
        Ok(Self {
            elem: self.elem.clone(),
            data: self.data.clone(),
            start: self.start + range.start,
            len: range.end - range.start,
        })
    }
}

// ── Maps ─────────────────────────────────────────────────────────────────

/// Associative table with insertion-ordered iteration, or nil.
#[derive(Debug, Clone)]
pub struct MapValue {
    key: Type,
    value: Type,
    data: Option<Storage<IndexMap<MapKey, Value>>>,
}

impl MapValue {
    pub fn nil(key: Type, value: Type) -> Result<Self, ValueError> {
        if !key.is_hashable() {
            return Err(ValueError::UnhashableKey(key));
        }
        Ok(Self {
            key,
            value,
            data: None,
        })
    }

    /// An empty, non-nil map.
    pub fn new(key: Type, value: Type) -> Result<Self, ValueError> {
        let mut map = Self::nil(key, value)?;
        map.data = Some(Storage::new(IndexMap::new()));
        Ok(map)
    }

    pub fn from_entries(
        key: Type,
        value: Type,
        entries: impl IntoIterator<Item = (MapKey, Value)>,
    ) -> Result<Self, ValueError> {
        let map = Self::new(key, value)?;
        for (k, v) in entries {
            map.insert(k, v)?;
        }
        Ok(map)
    }

    pub(crate) fn from_table(key: Type, value: Type, table: IndexMap<MapKey, Value>) -> Self {
        Self {
            key,
            value,
            data: Some(Storage::new(table)),
        }
    }

    pub fn key_type(&self) -> &Type {
        &self.key
    }

    pub fn value_type(&self) -> &Type {
        &self.value
    }

    pub fn is_nil(&self) -> bool {
        self.data.is_none()
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn storage(&self) -> Option<StorageId> {
        self.data.as_ref().map(Storage::id)
    }

    pub fn same_storage(&self, other: &MapValue) -> bool {
        match (self.storage(), other.storage()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Borrows the table; `None` for a nil map.
    pub fn entries(&self) -> Option<Ref<'_, IndexMap<MapKey, Value>>> {
        self.data.as_ref().map(Storage::borrow)
    }

    pub fn get(&self, key: &MapKey) -> Option<Value> {
        self.entries()?.get(key).cloned()
    }

    /// Inserts or replaces an entry, returning the previous value.
    pub fn insert(&self, key: MapKey, value: Value) -> Result<Option<Value>, ValueError> {
        let data = self.data.as_ref().ok_or(ValueError::NilMap)?;
        if key.ty() != self.key {
            return Err(ValueError::KeyType {
                expected: self.key.clone(),
                found: key.ty(),
            });
        }
        if value.ty().as_ref() != Some(&self.value) {
            return Err(ValueError::ValueType {
                expected: self.value.clone(),
                found: type_name(&value),
            });
        }
        Ok(data.borrow_mut().insert(key, value))
    }
}

// ── Records ──────────────────────────────────────────────────────────────

/// Instance of a [`RecordType`]; field values follow the declared order.
#[derive(Debug, Clone)]
pub struct RecordValue {
    ty: Arc<RecordType>,
    fields: Vec<Value>,
}

impl RecordValue {
    pub fn new(ty: Arc<RecordType>, fields: Vec<Value>) -> Result<Self, ValueError> {
        if ty.fields().len() != fields.len() {
            return Err(ValueError::FieldCount {
                record: ty.name().to_string(),
                expected: ty.fields().len(),
                found: fields.len(),
            });
        }
        for (index, value) in fields.iter().enumerate() {
            check_field(&ty, index, value)?;
        }
        Ok(Self { ty, fields })
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    /// `(name, value)` pairs in declared order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.ty
            .fields()
            .iter()
            .map(|(name, _)| name.as_str())
            .zip(self.fields.iter())
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).map(|i| &self.fields[i])
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<Value, ValueError> {
        let index = self
            .ty
            .field_index(name)
            .ok_or_else(|| ValueError::UnknownField {
                record: self.ty.name().to_string(),
                field: name.to_string(),
            })?;
        check_field(&self.ty, index, &value)?;
        Ok(std::mem::replace(&mut self.fields[index], value))
    }
}

fn check_field(ty: &RecordType, index: usize, value: &Value) -> Result<(), ValueError> {
    let (name, expected) = &ty.fields()[index];
    if value.ty().as_ref() == Some(expected) {
        return Ok(());
    }
    Err(ValueError::FieldType {
        record: ty.name().to_string(),
        field: name.clone(),
        expected: expected.clone(),
        found: type_name(value),
    })
}

// ── Variants, references, callables ──────────────────────────────────────

/// An interface-typed wrapper around a dynamically typed payload.
#[derive(Debug, Clone)]
pub struct VariantValue {
    name: Arc<str>,
    payload: Option<Box<Value>>,
}

impl VariantValue {
    /// Wraps `payload` in the interface named `name`; an invalid payload is nil.
    pub fn new(name: &str, payload: Option<Value>) -> Self {
        Self {
            name: Arc::from(name),
            payload: payload.filter(Value::is_valid).map(Box::new),
        }
    }

    pub fn any(payload: Value) -> Self {
        Self::new("interface {}", Some(payload))
    }

    pub fn nil_any() -> Self {
        Self::new("interface {}", None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_nil(&self) -> bool {
        self.payload.is_none()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_deref()
    }
}

/// Reference to a shared [`Value`] cell, or nil.
#[derive(Debug, Clone)]
pub struct RefValue {
    target: Type,
    cell: Option<Storage<Value>>,
}

impl RefValue {
    pub fn nil(target: Type) -> Self {
        Self { target, cell: None }
    }

    pub fn new(target: Type, value: Value) -> Result<Self, ValueError> {
        check_item(&target, &value)?;
        Ok(Self {
            target,
            cell: Some(Storage::new(value)),
        })
    }

    pub fn target_type(&self) -> &Type {
        &self.target
    }

    pub fn is_nil(&self) -> bool {
        self.cell.is_none()
    }

    pub fn storage(&self) -> Option<StorageId> {
        self.cell.as_ref().map(Storage::id)
    }

    /// Borrows the pointed-to value; `None` for a nil reference.
    pub fn target(&self) -> Option<Ref<'_, Value>> {
        self.cell.as_ref().map(Storage::borrow)
    }

    pub fn load(&self) -> Option<Value> {
        self.target().map(|v| v.clone())
    }

    /// Replaces the pointed-to value, returning the previous one.
    ///
    /// Rejects a value that leads back to this cell through interface
    /// payloads, references, and records or arrays outside any cell only.
    /// Comparison never marks those as visited, so such a cycle would not
    /// terminate.
    pub fn store(&self, value: Value) -> Result<Value, ValueError> {
        let cell = self.cell.as_ref().ok_or(ValueError::NilReference)?;
        check_item(&self.target, &value)?;
        if reaches_unguarded(&value, cell.id(), true) {
            return Err(ValueError::UnguardedCycle(Type::reference(self.target.clone())));
        }
        Ok(cell.replace(value))
    }
}

/// Whether `value` leads to the cell `id` without passing a value the cycle
/// guard tracks. `placed` is true for a value sitting directly in a cell.
///
/// Slices and maps always carry an identity, as do records and arrays at a
/// place, so the walk stops at them. Cells already stored hold no unguarded
/// cycle, so the walk is finite.
fn reaches_unguarded(value: &Value, id: StorageId, placed: bool) -> bool {
    match value {
        Value::Variant(v) => v
            .payload()
            .is_some_and(|payload| reaches_unguarded(payload, id, false)),
        Value::Ref(r) => match (r.storage(), r.target()) {
            (Some(cell), _) if cell == id => true,
            (_, Some(target)) => reaches_unguarded(&target, id, true),
            _ => false,
        },
        Value::Record(r) if !placed => r.fields.iter().any(|f| reaches_unguarded(f, id, false)),
        Value::Array(a) if !placed => a.items.iter().any(|e| reaches_unguarded(e, id, false)),
        _ => false,
    }
}

type Func = Rc<dyn Fn(&[Value]) -> Value>;

/// A callable. Only nil-ness is observable to comparison.
#[derive(Clone)]
pub struct CallableValue {
    signature: Arc<str>,
    func: Option<Func>,
}

impl CallableValue {
    pub fn nil(signature: &str) -> Self {
        Self {
            signature: Arc::from(signature),
            func: None,
        }
    }

    pub fn new(signature: &str, func: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self {
            signature: Arc::from(signature),
            func: Some(Rc::new(func)),
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn is_nil(&self) -> bool {
        self.func.is_none()
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, ValueError> {
        let func = self.func.as_ref().ok_or(ValueError::NilCallable)?;
        Ok(func(args))
    }
}

impl fmt::Debug for CallableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableValue")
            .field("signature", &self.signature)
            .field("nil", &self.is_nil())
            .finish()
    }
}

// ── Value ────────────────────────────────────────────────────────────────

/// Any comparable value. `Invalid` is the untyped absent value.
#[derive(Debug, Clone)]
pub enum Value {
    Invalid,
    Scalar(Scalar),
    Array(ArrayValue),
    Slice(SliceValue),
    Map(MapValue),
    Record(RecordValue),
    Variant(VariantValue),
    Ref(RefValue),
    Callable(CallableValue),
}

impl Value {
    /// Wraps `payload` in `interface {}`.
    pub fn any(payload: Value) -> Value {
        Value::Variant(VariantValue::any(payload))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Invalid => Kind::Invalid,
            Value::Scalar(_) => Kind::Scalar,
            Value::Array(_) => Kind::Array,
            Value::Slice(_) => Kind::Slice,
            Value::Map(_) => Kind::Map,
            Value::Record(_) => Kind::Record,
            Value::Variant(_) => Kind::Variant,
            Value::Ref(_) => Kind::Ref,
            Value::Callable(_) => Kind::Callable,
        }
    }

    /// Static type; `None` only for [`Value::Invalid`].
    pub fn ty(&self) -> Option<Type> {
        let ty = match self {
            Value::Invalid => return None,
            Value::Scalar(s) => s.ty(),
            Value::Array(a) => Type::array(a.elem.clone(), a.len()),
            Value::Slice(s) => Type::slice(s.elem.clone()),
            Value::Map(m) => Type::map(m.key.clone(), m.value.clone()),
            Value::Record(r) => Type::Record(Arc::clone(&r.ty)),
            Value::Variant(v) => Type::Variant(Arc::clone(&v.name)),
            Value::Ref(r) => Type::reference(r.target.clone()),
            Value::Callable(c) => Type::Callable(Arc::clone(&c.signature)),
        };
        Some(ty)
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid)
    }

    /// Whether this is the nil form of a nilable kind.
    pub fn is_nil(&self) -> bool {
        match self {
            Value::Slice(s) => s.is_nil(),
            Value::Map(m) => m.is_nil(),
            Value::Variant(v) => v.is_nil(),
            Value::Ref(r) => r.is_nil(),
            Value::Callable(c) => c.is_nil(),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Scalar::Int(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Scalar(Scalar::Uint(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Scalar(Scalar::Float(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::Str(s))
    }
}

impl From<ArrayValue> for Value {
    fn from(a: ArrayValue) -> Self {
        Value::Array(a)
    }
}

impl From<SliceValue> for Value {
    fn from(s: SliceValue) -> Self {
        Value::Slice(s)
    }
}

impl From<MapValue> for Value {
    fn from(m: MapValue) -> Self {
        Value::Map(m)
    }
}

impl From<RecordValue> for Value {
    fn from(r: RecordValue) -> Self {
        Value::Record(r)
    }
}

impl From<VariantValue> for Value {
    fn from(v: VariantValue) -> Self {
        Value::Variant(v)
    }
}

impl From<RefValue> for Value {
    fn from(r: RefValue) -> Self {
        Value::Ref(r)
    }
}

impl From<CallableValue> for Value {
    fn from(c: CallableValue) -> Self {
        Value::Callable(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> SliceValue {
        SliceValue::new(Type::Str, items.iter().map(|s| Value::from(*s)).collect()).unwrap()
    }

    #[test]
    fn storage_ids_are_unique_and_shared_by_clones() {
        let a = Storage::new(1);
        let b = Storage::new(1);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn slice_rejects_mistyped_elements() {
        let err = SliceValue::new(Type::Str, vec![Value::from(1i64)]).unwrap_err();
        assert_eq!(
            err,
            ValueError::ElementType {
                expected: Type::Str,
                found: "int".to_string()
            }
        );
    }

    #[test]
    fn nil_and_empty_slices_differ_only_in_nilness() {
        let nil = SliceValue::nil(Type::Str);
        let empty = strings(&[]);
        assert!(nil.is_nil());
        assert!(!empty.is_nil());
        assert_eq!(nil.len(), empty.len());
    }

    #[test]
    fn subslices_alias_their_backing_store() {
        let s = strings(&["a", "b", "c"]);
        let tail = s.subslice(1..3).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.storage(), s.storage());
        assert!(!tail.same_storage(&s));
        assert!(tail.same_storage(&s.subslice(1..2).unwrap()));

        tail.set(0, Value::from("z")).unwrap();
        assert!(matches!(s.get(1), Some(Value::Scalar(Scalar::Str(ref v))) if v == "z"));
        assert!(matches!(
            s.subslice(2..4),
            Err(ValueError::OutOfRange { start: 2, end: 4, len: 3 })
        ));
    }

    #[test]
    fn map_insert_checks_nil_and_types() {
        let nil = MapValue::nil(Type::Str, Type::Int).unwrap();
        assert!(matches!(
            nil.insert("a".into(), Value::from(1i64)),
            Err(ValueError::NilMap)
        ));

        let map = MapValue::new(Type::Str, Type::Int).unwrap();
        assert!(matches!(
            map.insert(MapKey::Int(1), Value::from(1i64)),
            Err(ValueError::KeyType { .. })
        ));
        assert!(matches!(
            map.insert("a".into(), Value::from("x")),
            Err(ValueError::ValueType { .. })
        ));
        assert!(matches!(map.insert("a".into(), Value::from(1i64)), Ok(None)));
        assert_eq!(map.len(), 1);

        assert_eq!(
            MapValue::new(Type::slice(Type::Int), Type::Int).unwrap_err(),
            ValueError::UnhashableKey(Type::slice(Type::Int))
        );
    }

    fn item() -> Arc<RecordType> {
        RecordType::new("Item", [("Name", Type::Str), ("Count", Type::Int)])
    }

    #[test]
    fn record_field_count_and_lookup() {
        let ty = item();
        assert!(matches!(
            RecordValue::new(ty.clone(), vec![Value::from("a")]),
            Err(ValueError::FieldCount { expected: 2, found: 1, .. })
        ));
        let mut rec = RecordValue::new(ty, vec![Value::from("a"), Value::from(2i64)]).unwrap();
        assert!(matches!(rec.field("Count"), Some(Value::Scalar(Scalar::Int(2)))));
        assert!(rec.set("Missing", Value::from(1i64)).is_err());
        rec.set("Name", Value::from("b")).unwrap();
        let names: Vec<&str> = rec.fields().map(|(name, _)| name).collect();
        assert_eq!(names, ["Name", "Count"]);
    }

    #[test]
    fn record_fields_reject_mistyped_and_invalid_values() {
        let err = RecordValue::new(item(), vec![Value::from(1i64), Value::from(2i64)]).unwrap_err();
        assert_eq!(
            err,
            ValueError::FieldType {
                record: "Item".to_string(),
                field: "Name".to_string(),
                expected: Type::Str,
                found: "int".to_string(),
            }
        );
        assert!(matches!(
            RecordValue::new(item(), vec![Value::from("a"), Value::Invalid]),
            Err(ValueError::FieldType { ref field, ref found, .. }) if field == "Count" && found == "invalid"
        ));

        let mut rec = RecordValue::new(item(), vec![Value::from("a"), Value::from(2i64)]).unwrap();
        assert!(matches!(
            rec.set("Count", Value::from("2")),
            Err(ValueError::FieldType { .. })
        ));
        assert!(matches!(rec.set("Name", Value::Invalid), Err(ValueError::FieldType { .. })));
        assert!(matches!(rec.field("Count"), Some(Value::Scalar(Scalar::Int(2)))));
    }

    #[test]
    fn store_rejects_cycles_through_references_and_interfaces() {
        let r = RefValue::new(Type::any(), Value::any(Value::from(1i64))).unwrap();
        let err = r.store(Value::any(r.clone().into())).unwrap_err();
        assert_eq!(err, ValueError::UnguardedCycle(Type::reference(Type::any())));

        // Through a second cell and a record outside any cell.
        let holder = RecordType::new("Holder", [("Ref", Type::reference(Type::any()))]);
        let s = RefValue::new(Type::any(), Value::any(Value::from(2i64))).unwrap();
        let wrapped = RecordValue::new(holder, vec![r.clone().into()]).unwrap();
        s.store(Value::any(wrapped.into())).unwrap();
        assert!(matches!(
            r.store(Value::any(s.clone().into())),
            Err(ValueError::UnguardedCycle(_))
        ));
        assert!(matches!(r.load(), Some(Value::Variant(_))));
    }

    #[test]
    fn store_accepts_cycles_through_guarded_values() {
        let node = RecordType::recursive("Node", |node| [("Next", Type::reference(node.clone()))]);
        let target = Type::Record(node.clone());
        let nil = RecordValue::new(node.clone(), vec![RefValue::nil(target.clone()).into()]).unwrap();
        let r = RefValue::new(target, nil.into()).unwrap();
        let looped = RecordValue::new(node, vec![r.clone().into()]).unwrap();
        assert!(r.store(looped.into()).is_ok());

        let s = SliceValue::new(Type::any(), vec![Value::any(1i64.into())]).unwrap();
        let cell = RefValue::new(Type::slice(Type::any()), s.clone().into()).unwrap();
        assert!(s.set(0, Value::any(cell.into())).is_ok());
    }

    #[test]
    fn kind_and_nil_follow_the_arm() {
        let nil_slice = Value::Slice(SliceValue::nil(Type::Str));
        assert_eq!(nil_slice.kind(), Kind::Slice);
        assert!(nil_slice.is_nil());
        assert!(!Value::Slice(strings(&[])).is_nil());

        assert_eq!(Value::Invalid.kind(), Kind::Invalid);
        assert!(!Value::Invalid.is_nil());
        assert_eq!(Value::from(1i64).kind(), Kind::Scalar);
        assert!(!Value::from(1i64).is_nil());

        let nil_map = Value::Map(MapValue::nil(Type::Str, Type::Int).unwrap());
        assert_eq!(nil_map.kind(), Kind::Map);
        assert!(nil_map.is_nil());

        let any = Value::Variant(VariantValue::nil_any());
        assert_eq!(any.kind(), Kind::Variant);
        assert!(any.is_nil());

        let r = Value::Ref(RefValue::nil(Type::Int));
        assert_eq!(r.kind(), Kind::Ref);
        assert!(r.is_nil());

        let f = Value::Callable(CallableValue::new("func()", |_| Value::Invalid));
        assert_eq!(f.kind(), Kind::Callable);
        assert!(!f.is_nil());

        let arr = Value::Array(ArrayValue::new(Type::Int, vec![]).unwrap());
        assert_eq!(arr.kind(), Kind::Array);
        assert!(!arr.is_nil());
    }

    #[test]
    fn nil_reference_and_callable_errors() {
        let r = RefValue::nil(Type::Int);
        assert!(matches!(
            r.store(Value::from(1i64)),
            Err(ValueError::NilReference)
        ));
        assert!(r.target().is_none());

        let f = CallableValue::nil("func()");
        assert!(matches!(f.call(&[]), Err(ValueError::NilCallable)));
        let g = CallableValue::new("func() int", |_| Value::from(7i64));
        assert!(matches!(g.call(&[]), Ok(Value::Scalar(Scalar::Int(7)))));
    }

    #[test]
    fn invalid_payload_makes_nil_variant() {
        assert!(VariantValue::new("interface {}", Some(Value::Invalid)).is_nil());
        assert_eq!(Value::any(Value::from(1i64)).ty(), Some(Type::any()));
        assert_eq!(Value::Invalid.ty(), None);
    }
}
