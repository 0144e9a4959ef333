//! Conversion of JSON documents into the value model.
//!
//! Every JSON value becomes an `interface {}` variant: arrays are
//! `[]interface {}` slices, objects are `map[string]interface {}` maps keyed in
//! document order, and `null` is a nil variant. Integers that fit `i64` become
//! `int`, larger positive ones `uint`, everything else `float64`.

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::types::Type;
use crate::value::{MapKey, MapValue, Scalar, SliceValue, Value, VariantValue};

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        let payload = match json {
            Json::Null => return Value::Variant(VariantValue::nil_any()),
            Json::Bool(b) => Value::Scalar(Scalar::Bool(*b)),
            Json::Number(n) => Value::Scalar(if let Some(i) = n.as_i64() {
                Scalar::Int(i)
            } else if let Some(u) = n.as_u64() {
                Scalar::Uint(u)
            } else {
                Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
            }),
            Json::String(s) => Value::Scalar(Scalar::Str(s.clone())),
            Json::Array(items) => {
                Value::Slice(SliceValue::from_vec(Type::any(), items.iter().map(Value::from).collect()))
            }
            Json::Object(obj) => {
                let table: IndexMap<MapKey, Value> = obj
                    .iter()
                    .map(|(k, v)| (MapKey::Str(k.clone()), Value::from(v)))
                    .collect();
                Value::Map(MapValue::from_table(Type::Str, Type::any(), table))
            }
        };
        Value::any(payload)
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::from(&json)
    }
}
