use thiserror::Error;

use crate::types::Type;

/// Rejection of a malformed value while it is being built.
///
/// The comparison itself never fails; every structural problem is caught here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("element of type {found} does not fit a container of {expected}")]
    ElementType { expected: Type, found: String },
    #[error("record {record} declares {expected} fields, got {found}")]
    FieldCount {
        record: String,
        expected: usize,
        found: usize,
    },
    #[error("field {record}.{field} of type {expected} cannot hold {found}")]
    FieldType {
        record: String,
        field: String,
        expected: Type,
        found: String,
    },
    #[error("record {record} has no field {field}")]
    UnknownField { record: String, field: String },
    #[error("map key of type {found} does not fit key type {expected}")]
    KeyType { expected: Type, found: Type },
    #[error("map value of type {found} does not fit value type {expected}")]
    ValueType { expected: Type, found: String },
    #[error("type {0} cannot key a map")]
    UnhashableKey(Type),
    #[error("assignment to entry in nil map")]
    NilMap,
    #[error("store through nil reference")]
    NilReference,
    #[error("call of nil callable")]
    NilCallable,
    #[error("storing into this {0} would close a cycle through references and interfaces only")]
    UnguardedCycle(Type),
    #[error("slice bounds [{start}:{end}] out of range with length {len}")]
    OutOfRange { start: usize, end: usize, len: usize },
}
