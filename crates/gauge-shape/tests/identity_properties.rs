//! # Identity Properties
//!
//! A primitive shape without operations returns a valid input as the very
//! same value, with or without coercion. Coercion only applies to inputs
//! of another kind, so it must never touch an input that already matches.

use gauge_core::{ApplyOptions, Symbol, Value};
use gauge_shape::Shape;
use proptest::prelude::*;

/// A valid input for each primitive shape, paired with that shape.
fn primitive_case() -> impl Strategy<Value = (Shape, Value)> {
    prop_oneof![
        "[ -~]{0,16}".prop_map(|s| (Shape::string(), Value::from(s))),
        (-1e12f64..1e12f64).prop_map(|n| (Shape::number(), Value::from(n))),
        any::<i64>().prop_map(|n| (Shape::bigint(), Value::bigint(i128::from(n)))),
        any::<bool>().prop_map(|b| (Shape::boolean(), Value::Bool(b))),
        (0i64..4_000_000_000_000).prop_map(|ms| {
            let date = chrono::DateTime::from_timestamp_millis(ms).unwrap_or_default();
            (Shape::date(), Value::Date(date))
        }),
        "[a-z]{1,6}".prop_map(|d| (Shape::symbol(), Value::Symbol(Symbol::new(d)))),
    ]
}

/// Literal-matching shapes built around the input itself.
fn literal_shapes(input: &Value) -> [Shape; 2] {
    [
        Shape::constant(input.clone()),
        Shape::enumeration([Value::Null, input.clone(), Value::from("decoy")]),
    ]
}

proptest! {
    #[test]
    fn primitive_shapes_return_input(case in primitive_case(), coerce in any::<bool>()) {
        let (shape, input) = case;
        let options = ApplyOptions::new().coerce(coerce);
        let output = shape.parse_with(input.clone(), &options).unwrap();
        prop_assert!(output.same(&input));
        prop_assert_eq!(shape.accepts(&input).ok(), Some(true));
    }

    #[test]
    fn literal_shapes_return_input(case in primitive_case(), coerce in any::<bool>()) {
        let (_, input) = case;
        let options = ApplyOptions::new().coerce(coerce);
        for shape in literal_shapes(&input) {
            let output = shape.parse_with(input.clone(), &options).unwrap();
            prop_assert!(output.same(&input));
        }
    }
}

#[test]
fn test_symbol_identity_not_description() {
    let tag = Symbol::new("tag");
    let shape = Shape::constant(Value::Symbol(tag.clone()));
    assert!(shape.parse(Value::Symbol(tag)).is_ok());
    assert!(shape.parse(Value::Symbol(Symbol::new("tag"))).is_err());
}
