//! # Leaf Shapes
//!
//! Scalar shapes (`string`, `number`, `bigint`, `boolean`, `date`,
//! `symbol`), literal shapes (`const`, `enum`) and the trivial `any` and
//! `never` shapes, together with the built-in constraint shortcuts.
//!
//! Coercible leaves accept an input of another kind when coercion is
//! enabled, either per parse through [`ApplyOptions::coerce`] or per shape
//! through [`Shape::coerce`].

use chrono::{DateTime, Utc};
use regex::Regex;

use gauge_core::coerce;
use gauge_core::{ApplyOptions, Coerced, Outcome, Value, ValueKind};

use crate::inputs::Inputs;
use crate::operation::{Constraint, OperationOptions};
use crate::shape::{type_issue, Shape, ShapeKind};

/// Whether a shape coerces inputs of other kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoerceMode {
    /// Follow [`ApplyOptions::coerce`].
    #[default]
    Default,
    /// Always coerce.
    Always,
    /// Never coerce.
    Never,
}

impl CoerceMode {
    pub(crate) fn enabled(self, options: &ApplyOptions) -> bool {
        match self {
            Self::Default => options.coerce,
            Self::Always => true,
            Self::Never => false,
        }
    }

    /// The effective flag when only the parse-level setting is known.
    pub(crate) fn resolve(self, coerce: bool) -> bool {
        match self {
            Self::Default => coerce,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafType {
    String,
    Number,
    BigInt,
    Boolean,
    Date,
    Symbol,
}

impl LeafType {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::BigInt => "bigint",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Symbol => "symbol",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Self::String, Value::String(_))
            | (Self::BigInt, Value::BigInt(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Date, Value::Date(_))
            | (Self::Symbol, Value::Symbol(_)) => true,
            (Self::Number, Value::Number(n)) => !n.is_nan(),
            _ => false,
        }
    }

    fn coerce(self, value: &Value) -> Coerced {
        match self {
            Self::String => coerce::string(value),
            Self::Number => coerce::number(value),
            Self::BigInt => coerce::bigint(value),
            Self::Boolean => coerce::boolean(value),
            Self::Date => coerce::date(value),
            Self::Symbol => None,
        }
    }

    fn kind(self) -> ValueKind {
        match self {
            Self::String => ValueKind::String,
            Self::Number => ValueKind::Number,
            Self::BigInt => ValueKind::BigInt,
            Self::Boolean => ValueKind::Boolean,
            Self::Date => ValueKind::Date,
            Self::Symbol => ValueKind::Symbol,
        }
    }

    /// Kinds the coercion function can turn into this type.
    fn coercible_kinds(self) -> &'static [ValueKind] {
        use ValueKind as K;
        match self {
            Self::String | Self::Number => &[
                K::String,
                K::Number,
                K::Boolean,
                K::BigInt,
                K::Date,
                K::Null,
                K::Undefined,
                K::Array,
            ],
            Self::Boolean => &[
                K::Boolean,
                K::String,
                K::Number,
                K::Null,
                K::Undefined,
                K::Array,
            ],
            Self::BigInt => &[
                K::BigInt,
                K::String,
                K::Number,
                K::Boolean,
                K::Null,
                K::Undefined,
                K::Array,
            ],
            Self::Date => &[K::Date, K::String, K::Number, K::Array],
            Self::Symbol => &[K::Symbol],
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Leaf {
    pub(crate) ty: LeafType,
    pub(crate) coerce: CoerceMode,
}

impl Leaf {
    pub(crate) fn apply(&self, input: &Value, options: &ApplyOptions) -> Outcome {
        if self.ty.matches(input) {
            return Outcome::Unchanged;
        }
        if self.coerce.enabled(options) {
            if let Some(coerced) = self.ty.coerce(input) {
                if self.ty.matches(&coerced) {
                    return Outcome::from_output(input, coerced);
                }
            }
        }
        type_issue(input, self.ty.name())
    }

    pub(crate) fn inputs(&self, coerce: bool) -> Inputs {
        if self.coerce.resolve(coerce) {
            Inputs::kinds(self.ty.coercible_kinds().iter().copied())
        } else {
            Inputs::kinds([self.ty.kind()])
        }
    }
}

fn leaf(ty: LeafType) -> Shape {
    Shape::from_kind(ShapeKind::Leaf(Leaf {
        ty,
        coerce: CoerceMode::Default,
    }))
}

impl Shape {
    /// Accepts every value.
    pub fn any() -> Shape {
        Shape::from_kind(ShapeKind::Any)
    }

    /// Rejects every value.
    pub fn never() -> Shape {
        Shape::from_kind(ShapeKind::Never)
    }

    /// UTF-8 strings.
    pub fn string() -> Shape {
        leaf(LeafType::String)
    }

    /// Numbers other than `NaN`.
    pub fn number() -> Shape {
        leaf(LeafType::Number)
    }

    /// BigInts.
    pub fn bigint() -> Shape {
        leaf(LeafType::BigInt)
    }

    /// `true` or `false`.
    pub fn boolean() -> Shape {
        leaf(LeafType::Boolean)
    }

    /// Valid dates.
    pub fn date() -> Shape {
        leaf(LeafType::Date)
    }

    /// Symbols of any description.
    pub fn symbol() -> Shape {
        leaf(LeafType::Symbol)
    }

    /// Accepts exactly `value` (SameValueZero).
    pub fn constant(value: impl Into<Value>) -> Shape {
        Shape::from_kind(ShapeKind::Const(value.into()))
    }

    /// Exactly `null`.
    pub fn null() -> Shape {
        Shape::constant(Value::Null)
    }

    /// Exactly `undefined`.
    pub fn undefined() -> Shape {
        Shape::constant(Value::Undefined)
    }

    /// Accepts any of `values`.
    pub fn enumeration(values: impl IntoIterator<Item = Value>) -> Shape {
        Shape::from_kind(ShapeKind::Enum(values.into_iter().collect()))
    }

    // ─── Coercion ───────────────────────────────────────────────────────

    /// Always coerce, regardless of [`ApplyOptions::coerce`].
    pub fn coerce(&self) -> Shape {
        self.with_coerce_mode(CoerceMode::Always)
    }

    /// Never coerce, regardless of [`ApplyOptions::coerce`].
    pub fn no_coerce(&self) -> Shape {
        self.with_coerce_mode(CoerceMode::Never)
    }

    fn with_coerce_mode(&self, mode: CoerceMode) -> Shape {
        let kind = match self.kind() {
            ShapeKind::Leaf(leaf) => ShapeKind::Leaf(Leaf {
                ty: leaf.ty,
                coerce: mode,
            }),
            ShapeKind::Array(array) => ShapeKind::Array(array.with_coerce(mode)),
            ShapeKind::Set(set) => ShapeKind::Set(set.with_coerce(mode)),
            ShapeKind::Map(map) => ShapeKind::Map(map.with_coerce(mode)),
            _ => return self.clone(),
        };
        self.with_kind(kind)
    }

    /// Coerce `value` to this shape's kind, or `NEVER` if the shape is not
    /// coercible or the value cannot be converted.
    pub fn coerce_value(&self, value: &Value) -> Coerced {
        match self.kind() {
            ShapeKind::Leaf(leaf) => leaf.ty.coerce(value),
            ShapeKind::Array(_) => coerce::array(value),
            ShapeKind::Set(_) => coerce::set(value),
            ShapeKind::Map(_) => coerce::map(value),
            _ => None,
        }
    }

    // ─── Constraints ────────────────────────────────────────────────────

    /// Minimum string length (chars) or array length.
    pub fn min_length(&self, min: usize) -> Shape {
        self.constrain(Constraint::MinLength(min), OperationOptions::default())
    }

    /// Maximum string length (chars) or array length.
    pub fn max_length(&self, max: usize) -> Shape {
        self.constrain(Constraint::MaxLength(max), OperationOptions::default())
    }

    /// Exact string or array length.
    pub fn length(&self, len: usize) -> Shape {
        self.min_length(len).max_length(len)
    }

    /// At least one char or element.
    pub fn non_empty(&self) -> Shape {
        self.min_length(1)
    }

    /// Strings matching `re`.
    pub fn regex(&self, re: Regex) -> Shape {
        self.constrain(Constraint::Regex(re), OperationOptions::default())
    }

    /// Integral numbers.
    pub fn int(&self) -> Shape {
        self.constrain(Constraint::Integer, OperationOptions::default())
    }

    /// Finite numbers.
    pub fn finite(&self) -> Shape {
        self.constrain(Constraint::Finite, OperationOptions::default())
    }

    /// Numbers greater than `bound`.
    pub fn gt(&self, bound: f64) -> Shape {
        self.constrain(Constraint::GreaterThan(bound), OperationOptions::default())
    }

    /// Numbers greater than or equal to `bound`.
    pub fn gte(&self, bound: f64) -> Shape {
        self.constrain(Constraint::GreaterThanOrEqual(bound), OperationOptions::default())
    }

    /// Numbers less than `bound`.
    pub fn lt(&self, bound: f64) -> Shape {
        self.constrain(Constraint::LessThan(bound), OperationOptions::default())
    }

    /// Numbers less than or equal to `bound`.
    pub fn lte(&self, bound: f64) -> Shape {
        self.constrain(Constraint::LessThanOrEqual(bound), OperationOptions::default())
    }

    /// Numbers divisible by `divisor`.
    pub fn multiple_of(&self, divisor: f64) -> Shape {
        self.constrain(Constraint::MultipleOf(divisor), OperationOptions::default())
    }

    /// BigInts of at least `min`.
    pub fn min_bigint(&self, min: i128) -> Shape {
        self.constrain(Constraint::MinBigInt(min), OperationOptions::default())
    }

    /// BigInts of at most `max`.
    pub fn max_bigint(&self, max: i128) -> Shape {
        self.constrain(Constraint::MaxBigInt(max), OperationOptions::default())
    }

    /// Minimum set or map size.
    pub fn min_size(&self, min: usize) -> Shape {
        self.constrain(Constraint::MinSize(min), OperationOptions::default())
    }

    /// Maximum set or map size.
    pub fn max_size(&self, max: usize) -> Shape {
        self.constrain(Constraint::MaxSize(max), OperationOptions::default())
    }

    /// Dates no earlier than `min`.
    pub fn min_date(&self, min: DateTime<Utc>) -> Shape {
        self.constrain(Constraint::MinDate(min), OperationOptions::default())
    }

    /// Dates no later than `max`.
    pub fn max_date(&self, max: DateTime<Utc>) -> Shape {
        self.constrain(Constraint::MaxDate(max), OperationOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::{Code, Nonce, Symbol};

    fn run(shape: &Shape, input: Value, options: &ApplyOptions) -> Outcome {
        shape.apply(&input, options, &Nonce::next()).unwrap()
    }

    fn first_code(outcome: &Outcome) -> Option<Code> {
        match outcome {
            Outcome::Issues(issues) => issues.first().map(|i| i.code.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_string_accepts_strings_only_without_coercion() {
        let opts = ApplyOptions::default();
        assert_eq!(run(&Shape::string(), Value::from("x"), &opts), Outcome::Unchanged);
        let outcome = run(&Shape::string(), Value::from(1), &opts);
        let Outcome::Issues(issues) = outcome else {
            panic!("expected issues");
        };
        assert_eq!(issues[0].code, Code::Type);
        assert_eq!(issues[0].param, Some(Value::from("string")));
    }

    #[test]
    fn test_number_rejects_nan() {
        let outcome = run(&Shape::number(), Value::Number(f64::NAN), &ApplyOptions::default());
        assert_eq!(first_code(&outcome), Some(Code::Type));
    }

    #[test]
    fn test_coercion_from_parse_options() {
        let opts = ApplyOptions::new().coerce(true);
        assert_eq!(
            run(&Shape::number(), Value::from("42"), &opts),
            Outcome::Replaced(Value::from(42))
        );
        assert_eq!(
            run(&Shape::string(), Value::array([Value::from(7)]), &opts),
            Outcome::Replaced(Value::from("7"))
        );
        assert_eq!(
            first_code(&run(&Shape::number(), Value::from("  "), &opts)),
            Some(Code::Type)
        );
    }

    #[test]
    fn test_shape_level_coerce_overrides_options() {
        let opts = ApplyOptions::default();
        assert_eq!(
            run(&Shape::boolean().coerce(), Value::from("true"), &opts),
            Outcome::Replaced(Value::Bool(true))
        );
        let strict = Shape::boolean().no_coerce();
        assert_eq!(
            first_code(&run(&strict, Value::from("true"), &ApplyOptions::new().coerce(true))),
            Some(Code::Type)
        );
    }

    #[test]
    fn test_const_and_enum_use_same_value_zero() {
        let opts = ApplyOptions::default();
        assert_eq!(run(&Shape::constant(f64::NAN), Value::Number(f64::NAN), &opts), Outcome::Unchanged);
        assert_eq!(run(&Shape::constant(0.0), Value::Number(-0.0), &opts), Outcome::Unchanged);
        let colors = Shape::enumeration([Value::from("red"), Value::from("green")]);
        assert_eq!(run(&colors, Value::from("green"), &opts), Outcome::Unchanged);
        let outcome = run(&colors, Value::from("blue"), &opts);
        let Outcome::Issues(issues) = outcome else {
            panic!("expected issues");
        };
        assert_eq!(issues[0].code, Code::Enum);
        assert_eq!(issues[0].param, Some(Value::array([Value::from("red"), Value::from("green")])));
    }

    #[test]
    fn test_symbol_never_coerces() {
        let opts = ApplyOptions::new().coerce(true);
        let sym = Value::from(Symbol::new("tag"));
        assert_eq!(run(&Shape::symbol(), sym, &opts), Outcome::Unchanged);
        assert_eq!(first_code(&run(&Shape::symbol(), Value::from("tag"), &opts)), Some(Code::Type));
    }

    #[test]
    fn test_constraint_shortcuts() {
        let opts = ApplyOptions::default();
        let name = Shape::string().min_length(2).max_length(4);
        assert_eq!(first_code(&run(&name, Value::from("a"), &opts)), Some(Code::StringMinLength));
        assert_eq!(first_code(&run(&name, Value::from("abcde"), &opts)), Some(Code::StringMaxLength));
        assert_eq!(run(&name, Value::from("abc"), &opts), Outcome::Unchanged);

        let port = Shape::number().int().gte(1.0).lte(65535.0);
        assert_eq!(first_code(&run(&port, Value::from(1.5), &opts)), Some(Code::NumberInteger));
        assert_eq!(first_code(&run(&port, Value::from(0), &opts)), Some(Code::NumberGreaterThanOrEqual));

        let big = Shape::bigint().min_bigint(10);
        assert_eq!(first_code(&run(&big, Value::bigint(9), &opts)), Some(Code::BigIntMin));
    }

    #[test]
    fn test_coerce_value_for_non_coercible_shape_is_never() {
        assert!(Shape::any().coerce_value(&Value::from(1)).is_none());
        assert_eq!(Shape::number().coerce_value(&Value::from("2")), Some(Value::from(2)));
    }

    #[test]
    fn test_builders_do_not_mutate_receiver() {
        let base = Shape::string();
        let constrained = base.min_length(3);
        assert!(base.operations().is_empty());
        assert_eq!(constrained.operations().len(), 1);
    }
}
