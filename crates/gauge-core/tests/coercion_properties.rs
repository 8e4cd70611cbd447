//! # Coercion Property Tests
//!
//! Coercion must be NEVER-stable and idempotent for every target kind:
//!
//! 1. If coercing an input yields `NEVER`, coercing the same input again
//!    still yields `NEVER`.
//! 2. A successfully coerced value is a fixed point: coercing it again
//!    returns the identical value.

use gauge_core::coerce;
use gauge_core::{Coerced, Value};
use proptest::prelude::*;

/// Strategy for arbitrary values, including the extended kinds.
fn any_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>().prop_map(Value::Number),
        (-1_000_000i64..1_000_000).prop_map(Value::from),
        any::<i64>().prop_map(|n| Value::bigint(i128::from(n))),
        "[a-z0-9 .+-]{0,12}".prop_map(Value::from),
        prop_oneof![
            Just("true"),
            Just("false"),
            Just("0x1f"),
            Just("2024-02-29"),
            Just("2024-02-29T12:30:00Z"),
            Just("Infinity"),
        ]
        .prop_map(Value::from),
        (0i64..4_000_000_000_000).prop_map(|ms| {
            Value::Date(chrono::DateTime::from_timestamp_millis(ms).unwrap_or_default())
        }),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::vec(("[a-c]", inner.clone()), 0..3)
                .prop_map(|entries| Value::object(entries)),
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::set),
            prop::collection::vec((inner.clone(), inner), 0..3).prop_map(Value::map),
        ]
    })
}

type CoerceFn = fn(&Value) -> Coerced;

const TARGETS: [(&str, CoerceFn); 8] = [
    ("number", coerce::number),
    ("string", coerce::string),
    ("boolean", coerce::boolean),
    ("bigint", coerce::bigint),
    ("date", coerce::date),
    ("array", coerce::array),
    ("set", coerce::set),
    ("map", coerce::map),
];

proptest! {
    /// Coercion failure is stable across repeated attempts.
    #[test]
    fn never_is_stable(value in any_value()) {
        for (name, coerce_fn) in TARGETS {
            if coerce_fn(&value).is_none() {
                prop_assert!(coerce_fn(&value).is_none(), "{name} flipped for {value:?}");
            }
        }
    }

    /// A coerced value coerces to itself.
    #[test]
    fn coerced_value_is_fixed_point(value in any_value()) {
        for (name, coerce_fn) in TARGETS {
            if let Some(coerced) = coerce_fn(&value) {
                let again = coerce_fn(&coerced);
                prop_assert!(
                    again.as_ref().is_some_and(|v| v.same(&coerced)),
                    "{name}: {value:?} -> {coerced:?} -> {again:?}"
                );
            }
        }
    }

    /// Coercion never produces a value of the wrong kind.
    #[test]
    fn coerced_kind_matches_target(value in any_value()) {
        use gauge_core::ValueKind;
        let expected = [
            ValueKind::Number,
            ValueKind::String,
            ValueKind::Boolean,
            ValueKind::BigInt,
            ValueKind::Date,
            ValueKind::Array,
            ValueKind::Set,
            ValueKind::Map,
        ];
        for ((name, coerce_fn), kind) in TARGETS.iter().zip(expected) {
            if let Some(coerced) = coerce_fn(&value) {
                prop_assert_eq!(coerced.kind(), kind, "{}", name);
            }
        }
    }
}

#[test]
fn test_primitive_identity_preserved() {
    let s = Value::from("text");
    assert!(coerce::string(&s).unwrap().same(&s));
    let n = Value::from(3.25);
    assert!(coerce::number(&n).unwrap().same(&n));
    let b = Value::Bool(true);
    assert!(coerce::boolean(&b).unwrap().same(&b));
}
