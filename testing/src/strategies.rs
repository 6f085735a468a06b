//! Property-based testing strategies for JSON data.
//!
//! Floats are restricted to multiples of 1/8 so that every generated number
//! survives a text round trip exactly.

use jsondata_core::{JsonBean, JsonMap};
use proptest::prelude::*;
use serde_json::Value;

/// Object keys, including characters that need escaping.
pub fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_.]{0,11}",
        ".{0,8}",
    ]
}

/// Any JSON scalar.
pub fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        (-1_000_000_i32..1_000_000).prop_map(|n| Value::from(f64::from(n) / 8.0)),
        ".{0,16}".prop_map(Value::String),
    ]
}

/// Any JSON value, nested up to a few levels.
pub fn arb_json() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((arb_key(), inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Any JSON object.
pub fn arb_map() -> impl Strategy<Value = JsonMap> {
    prop::collection::vec((arb_key(), arb_json()), 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

/// A [`JsonBean`] holding any JSON object.
pub fn arb_bean() -> impl Strategy<Value = JsonBean> {
    arb_map().prop_map(JsonBean::from)
}
