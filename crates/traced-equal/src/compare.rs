//! The recursive comparator.
//!
//! [`deep_equal`] walks two values in lockstep and writes one or more trace
//! lines per decision. Each call owns a fresh comparison state, so independent
//! comparisons never share state.

use crate::identity::{identity_of, CycleGuard, Place, Shortcut};
use crate::trace::TraceWriter;
use crate::types::Type;
use crate::value::{
    ArrayValue, CallableValue, MapValue, RecordValue, RefValue, Scalar, SliceValue, Value,
    VariantValue,
};

/// Deeply compares two values and explains the verdict.
///
/// Scalars compare by value; arrays, slices, maps, records, variants and
/// references compare by content. Map keys match with the key type's own
/// equality while map values compare deeply. A nil slice or map never equals
/// a present empty one. Callables are equal only when both are nil. Cyclic
/// values terminate: a pair already under comparison is assumed equal.
///
/// Returns `(equal, trace)`. The trace is empty when either input is
/// [`Value::Invalid`] or the two static types differ, and non-empty otherwise.
///
/// # Examples
///
/// ```
/// use traced_equal::{deep_equal, SliceValue, Type, Value};
///
/// let a = SliceValue::new(Type::Str, vec!["x".into(), "y".into()]).unwrap();
/// let b = SliceValue::new(Type::Str, vec!["x".into(), "z".into()]).unwrap();
///
/// let (equal, trace) = deep_equal(&Value::Slice(a), &Value::Slice(b));
/// assert!(!equal);
/// assert!(trace.contains("\"y\" != \"z\""));
/// ```
pub fn deep_equal(a: &Value, b: &Value) -> (bool, String) {
    if !a.is_valid() || !b.is_valid() {
        return (a.is_valid() == b.is_valid(), String::new());
    }
    if a.ty() != b.ty() {
        return (false, String::new());
    }
    let mut cmp = Comparison::new();
    let equal = cmp.compare(Operand::detached(a), Operand::detached(b));
    let trace = cmp.trace.into_string();
    log::debug!(
        "deep_equal verdict={equal} lines={} visited={}",
        trace.lines().count(),
        cmp.guard.len()
    );
    (equal, trace)
}

/// One side of a comparison step: a value and where it lives, if anywhere.
struct Operand<'a> {
    value: &'a Value,
    place: Option<Place>,
}

impl<'a> Operand<'a> {
    fn detached(value: &'a Value) -> Self {
        Self { value, place: None }
    }

    fn at(value: &'a Value, place: Option<Place>) -> Self {
        Self { value, place }
    }
}

fn child(place: &Option<Place>, index: usize) -> Option<Place> {
    place.as_ref().map(|p| p.child(index))
}

struct Comparison {
    guard: CycleGuard,
    trace: TraceWriter,
}

impl Comparison {
    fn new() -> Self {
        Self {
            guard: CycleGuard::new(),
            trace: TraceWriter::new(),
        }
    }

    fn compare(&mut self, a: Operand<'_>, b: Operand<'_>) -> bool {
        self.trace.enter();
        let equal = self.step(a, b);
        self.trace.leave();
        equal
    }

    fn step(&mut self, a: Operand<'_>, b: Operand<'_>) -> bool {
        let (Some(ty), Some(other)) = (a.value.ty(), b.value.ty()) else {
            self.trace
                .line(format_args!("Invalid value: {} {}", a.value, b.value));
            return a.value.is_valid() == b.value.is_valid();
        };
        if ty != other {
            self.trace
                .line(format_args!("Types differ: {ty} vs {other}"));
            return false;
        }

        if ty.kind().is_guarded() {
            let ids = (
                identity_of(a.value, a.place.as_ref()),
                identity_of(b.value, b.place.as_ref()),
            );
            if let (Some(ia), Some(ib)) = ids {
                match self.guard.try_short_circuit(ia, ib, &ty) {
                    Shortcut::Identical => {
                        self.trace.line(format_args!("  Same identity, so equal"));
                        return true;
                    }
                    Shortcut::AlreadyVisited => {
                        self.trace
                            .line(format_args!("  Already visited, so equal"));
                        return true;
                    }
                    Shortcut::Fresh => {}
                }
            }
        }

        match (a.value, b.value) {
            (Value::Array(x), Value::Array(y)) => self.arrays(&ty, x, y, &a.place, &b.place),
            (Value::Slice(x), Value::Slice(y)) => self.slices(&ty, x, y),
            (Value::Variant(x), Value::Variant(y)) => self.variants(&ty, x, y),
            (Value::Ref(x), Value::Ref(y)) => self.references(&ty, x, y),
            (Value::Record(x), Value::Record(y)) => self.records(&ty, x, y, &a.place, &b.place),
            (Value::Map(x), Value::Map(y)) => self.maps(&ty, x, y),
            (Value::Callable(x), Value::Callable(y)) => self.callables(&ty, x, y),
            (Value::Scalar(x), Value::Scalar(y)) => self.scalars(x, y),
            // Equal types imply equal kinds.
            _ => {
                self.trace.line(format_args!("Kinds differ for {ty}"));
                false
            }
        }
    }

    fn arrays(
        &mut self,
        ty: &Type,
        x: &ArrayValue,
        y: &ArrayValue,
        px: &Option<Place>,
        py: &Option<Place>,
    ) -> bool {
        self.trace
            .line(format_args!("Comparing arrays of type: {ty}"));
        for (i, (ex, ey)) in x.items().iter().zip(y.items()).enumerate() {
            if !self.compare(Operand::at(ex, child(px, i)), Operand::at(ey, child(py, i))) {
                return false;
            }
        }
        true
    }

    fn slices(&mut self, ty: &Type, x: &SliceValue, y: &SliceValue) -> bool {
        self.trace
            .line(format_args!("Comparing slices of type: {ty}"));
        if x.is_nil() != y.is_nil() {
            self.trace.line(format_args!("  {x} != {y}"));
            self.trace
                .line(format_args!("  One of the slices is nil, so not equal"));
            return false;
        }
        if x.len() != y.len() {
            self.trace.line(format_args!(
                "  Lengths differ ({} vs {}), so not equal",
                x.len(),
                y.len()
            ));
            return false;
        }
        if x.same_storage(y) {
            self.trace.line(format_args!("  Same storage, so equal"));
            return true;
        }
        let (Some(ix), Some(iy), Some(sx), Some(sy)) =
            (x.items(), y.items(), x.storage(), y.storage())
        else {
            self.trace
                .line(format_args!("  Both slices are nil, so equal"));
            return true;
        };
        for (i, (ex, ey)) in ix.iter().zip(iy.iter()).enumerate() {
            let px = Place::root(sx).child(x.start() + i);
            let py = Place::root(sy).child(y.start() + i);
            if !self.compare(Operand::at(ex, Some(px)), Operand::at(ey, Some(py))) {
                return false;
            }
        }
        true
    }

    fn variants(&mut self, ty: &Type, x: &VariantValue, y: &VariantValue) -> bool {
        self.trace
            .line(format_args!("Comparing variants of type: {ty}"));
        match (x.payload(), y.payload()) {
            (Some(px), Some(py)) => self.compare(Operand::detached(px), Operand::detached(py)),
            (None, None) => {
                self.trace
                    .line(format_args!("  Both variants are nil, so equal"));
                true
            }
            _ => {
                self.trace
                    .line(format_args!("  One of the variants is nil, so not equal"));
                false
            }
        }
    }

    fn references(&mut self, ty: &Type, x: &RefValue, y: &RefValue) -> bool {
        self.trace
            .line(format_args!("Comparing references of type: {ty}"));
        let invalid = Value::Invalid;
        let (left, right) = (x.target(), y.target());
        let a = Operand::at(left.as_deref().unwrap_or(&invalid), x.storage().map(Place::root));
        let b = Operand::at(right.as_deref().unwrap_or(&invalid), y.storage().map(Place::root));
        self.compare(a, b)
    }

    fn records(
        &mut self,
        ty: &Type,
        x: &RecordValue,
        y: &RecordValue,
        px: &Option<Place>,
        py: &Option<Place>,
    ) -> bool {
        self.trace
            .line(format_args!("Comparing records of type: {ty}"));
        for (i, ((name, fx), (_, fy))) in x.fields().zip(y.fields()).enumerate() {
            self.trace.label(format_args!("  {name}: "));
            if !self.compare(Operand::at(fx, child(px, i)), Operand::at(fy, child(py, i))) {
                return false;
            }
        }
        true
    }

    fn maps(&mut self, ty: &Type, x: &MapValue, y: &MapValue) -> bool {
        self.trace
            .line(format_args!("Comparing maps of type: {ty}"));
        if x.is_nil() != y.is_nil() {
            self.trace
                .line(format_args!("  One of the maps is nil, so not equal"));
            return false;
        }
        if x.len() != y.len() {
            self.trace.line(format_args!(
                "  Lengths differ ({} vs {}), so not equal",
                x.len(),
                y.len()
            ));
            return false;
        }
        if x.same_storage(y) {
            self.trace.line(format_args!("  Same storage, so equal"));
            return true;
        }
        let (Some(ex), Some(ey)) = (x.entries(), y.entries()) else {
            self.trace
                .line(format_args!("  Both maps are nil, so equal"));
            return true;
        };
        let invalid = Value::Invalid;
        for (key, vx) in ex.iter() {
            self.trace.label(format_args!("{key}: "));
            let vy = ey.get(key).unwrap_or(&invalid);
            if !self.compare(Operand::detached(vx), Operand::detached(vy)) {
                return false;
            }
        }
        true
    }

    fn callables(&mut self, ty: &Type, x: &CallableValue, y: &CallableValue) -> bool {
        self.trace
            .line(format_args!("Comparing callables of type: {ty}"));
        if x.is_nil() && y.is_nil() {
            self.trace
                .line(format_args!("  Both callables are nil, so equal"));
            return true;
        }
        self.trace
            .line(format_args!("  Not both callables are nil, so not equal"));
        false
    }

    fn scalars(&mut self, x: &Scalar, y: &Scalar) -> bool {
        if x == y {
            self.trace.line(format_args!("{x} == {y}"));
            true
        } else {
            self.trace.line(format_args!("{x} != {y}"));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordType;
    use crate::value::MapKey;

    fn strings(items: &[&str]) -> Value {
        SliceValue::new(Type::Str, items.iter().map(|s| Value::from(*s)).collect())
            .unwrap()
            .into()
    }

    #[test]
    fn top_level_shortcuts_write_no_trace() {
        assert_eq!(deep_equal(&Value::Invalid, &Value::Invalid), (true, String::new()));
        assert_eq!(deep_equal(&Value::Invalid, &Value::from(1i64)), (false, String::new()));
        assert_eq!(deep_equal(&Value::from(1i64), &Value::from(1u64)), (false, String::new()));
    }

    #[test]
    fn scalar_trace_is_unindented() {
        assert_eq!(deep_equal(&"a".into(), &"a".into()), (true, "\"a\" == \"a\"\n".to_string()));
        assert_eq!(deep_equal(&1i64.into(), &2i64.into()), (false, "1 != 2\n".to_string()));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        let (equal, _) = deep_equal(&f64::NAN.into(), &f64::NAN.into());
        assert!(!equal);
    }

    #[test]
    fn detached_slice_against_itself_short_circuits() {
        let s = strings(&["x"]);
        let (equal, trace) = deep_equal(&s, &s.clone());
        assert!(equal);
        assert_eq!(trace, "  Same identity, so equal\n");
    }

    #[test]
    fn subslices_of_one_store_compare_by_content() {
        let s = SliceValue::new(Type::Int, vec![1i64.into(), 1i64.into(), 2i64.into()]).unwrap();
        let a = s.subslice(0..1).unwrap();
        let b = s.subslice(1..2).unwrap();
        let (equal, trace) = deep_equal(&a.into(), &b.into());
        assert!(equal);
        assert_eq!(trace, "Comparing slices of type: []int\n  1 == 1\n");
    }

    #[test]
    fn nested_types_differ_inside_variant() {
        let a = Value::any(1i64.into());
        let b = Value::any("1".into());
        let (equal, trace) = deep_equal(&a, &b);
        assert!(!equal);
        assert_eq!(
            trace,
            "Comparing variants of type: interface {}\n  Types differ: int vs string\n"
        );
    }

    #[test]
    fn missing_map_key_fails_through_invalid() {
        let a = MapValue::from_entries(Type::Str, Type::Int, [(MapKey::from("a"), Value::from(1i64))])
            .unwrap();
        let b = MapValue::from_entries(Type::Str, Type::Int, [(MapKey::from("b"), Value::from(1i64))])
            .unwrap();
        let (equal, trace) = deep_equal(&a.into(), &b.into());
        assert!(!equal);
        assert_eq!(
            trace,
            "Comparing maps of type: map[string]int\n\"a\": Invalid value: 1 <invalid>\n"
        );
    }

    #[test]
    fn nil_references_are_equal() {
        let node = RecordType::recursive("Node", |node| [("Next", Type::reference(node.clone()))]);
        let target = Type::Record(node);
        let a = Value::Ref(RefValue::nil(target.clone()));
        let b = Value::Ref(RefValue::nil(target));
        let (equal, trace) = deep_equal(&a, &b);
        assert!(equal);
        assert_eq!(
            trace,
            "Comparing references of type: *Node\n  Invalid value: <invalid> <invalid>\n"
        );
    }
}
