//! traced-equal - Deep equality that explains itself.
//!
//! [`deep_equal`] compares two [`Value`]s structurally and returns, next to
//! the verdict, an indented trace of every comparison it made. When an
//! equality assertion fails the trace points at the exact field, element or
//! map entry that diverged.
//!
//! ```
//! use traced_equal::{deep_equal, RecordType, RecordValue, SliceValue, Type, Value};
//!
//! let item = RecordType::new("Item", [("Name", Type::Str), ("Tags", Type::slice(Type::Str))]);
//! let make = |tag: &str| -> Value {
//!     let tags = SliceValue::new(Type::Str, vec!["x".into(), tag.into()]).unwrap();
//!     RecordValue::new(item.clone(), vec!["a".into(), tags.into()])
//!         .unwrap()
//!         .into()
//! };
//!
//! let (equal, trace) = deep_equal(&make("y"), &make("z"));
//! assert!(!equal);
//! assert_eq!(
//!     trace,
//!     "Comparing records of type: Item\n  \
//!      Name: \"a\" == \"a\"\n  \
//!      Tags: Comparing slices of type: []string\n    \
//!      \"x\" == \"x\"\n    \
//!      \"y\" != \"z\"\n"
//! );
//! ```

mod assert;
mod compare;
mod error;
mod identity;
mod json;
mod render;
mod trace;
mod types;
mod value;

pub use compare::deep_equal;
pub use error::ValueError;
pub use identity::{CycleGuard, Identity, Place, Shortcut};
pub use trace::TraceWriter;
pub use types::{Kind, RecordType, Type};
pub use value::{
    ArrayValue, CallableValue, MapKey, MapValue, RecordValue, RefValue, Scalar, SliceValue,
    Storage, StorageId, Value, VariantValue,
};
