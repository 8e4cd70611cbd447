//! # Value Model — Dynamic Input Values
//!
//! Defines [`Value`], the dynamically-typed value every shape consumes and
//! produces. Scalars are plain data; containers (`Array`, `Object`, `Map`,
//! `Set`) are shared handles with reference identity, so the same container
//! can appear at several positions of a document, including inside itself.
//!
//! ## Identity vs Structure
//!
//! - [`Value::same`] is SameValueZero: scalars compare by value (`NaN` equals
//!   `NaN`, `+0` equals `-0`), containers and symbols compare by identity.
//!   The engine uses it to decide between `Unchanged` and `Replaced`.
//! - `PartialEq` is structural and exists for assertions. Comparing two
//!   *distinct* cyclic containers does not terminate.
//!
//! ## Mutation
//!
//! Container handles expose mutators so callers can build documents
//! (including cyclic ones). The engine itself never mutates an input
//! container; it copies on write.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Maximum nesting rendered by `Debug` before eliding with `...`.
const DEBUG_DEPTH_LIMIT: usize = 16;

thread_local! {
    static DEBUG_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// A dynamically-typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value (missing object key, omitted argument).
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// IEEE-754 double, the only number representation.
    Number(f64),
    /// Arbitrary-sign integer outside the `Number` domain.
    BigInt(i128),
    /// UTF-8 string.
    String(Arc<str>),
    /// Unique symbol, compared by identity.
    Symbol(Symbol),
    /// A valid UTC instant with millisecond precision.
    Date(DateTime<Utc>),
    /// Ordered list.
    Array(Array),
    /// Plain key/value object with insertion-ordered string keys.
    Object(Object),
    /// Keyed collection with arbitrary keys.
    Map(MapValue),
    /// Collection of unique values.
    Set(SetValue),
}

/// The kind of a [`Value`], used for type checks and union lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// `true` or `false`.
    Boolean,
    /// Finite or non-finite double.
    Number,
    /// Integer outside the number domain.
    BigInt,
    /// UTF-8 string.
    String,
    /// Unique symbol.
    Symbol,
    /// UTC instant.
    Date,
    /// Ordered list.
    Array,
    /// Plain keyed object.
    Object,
    /// Keyed collection with arbitrary keys.
    Map,
    /// Collection of unique values.
    Set,
}

impl ValueKind {
    /// Every kind, in declaration order.
    pub const ALL: [ValueKind; 12] = [
        ValueKind::Undefined,
        ValueKind::Null,
        ValueKind::Boolean,
        ValueKind::Number,
        ValueKind::BigInt,
        ValueKind::String,
        ValueKind::Symbol,
        ValueKind::Date,
        ValueKind::Array,
        ValueKind::Object,
        ValueKind::Map,
        ValueKind::Set,
    ];

    /// Dense index of this kind, suitable for table lookups.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name used in issue params (e.g. `"string"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::BigInt => "bigint",
            Self::String => "string",
            Self::Symbol => "symbol",
            Self::Date => "date",
            Self::Array => "array",
            Self::Object => "object",
            Self::Map => "map",
            Self::Set => "set",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Undefined => ValueKind::Undefined,
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Number(_) => ValueKind::Number,
            Self::BigInt(_) => ValueKind::BigInt,
            Self::String(_) => ValueKind::String,
            Self::Symbol(_) => ValueKind::Symbol,
            Self::Date(_) => ValueKind::Date,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
            Self::Map(_) => ValueKind::Map,
            Self::Set(_) => ValueKind::Set,
        }
    }

    /// Build a string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::String(s.into())
    }

    /// Build a bigint value.
    pub fn bigint(n: i128) -> Self {
        Self::BigInt(n)
    }

    /// Build a new array from the given elements.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(Array::new(items.into_iter().collect()))
    }

    /// Build a new object from key/value pairs. Later duplicates win.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Object(Object::from_entries(
            entries.into_iter().map(|(k, v)| (k.into(), v)),
        ))
    }

    /// Build a new map from key/value pairs. Later duplicates win.
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::Map(MapValue::from_entries(entries))
    }

    /// Build a new set, dropping duplicates.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(SetValue::from_values(items))
    }

    /// Whether this value is `Undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Whether this value is `Null` or `Undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    /// Whether this value is a container with reference identity.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Array(_) | Self::Object(_) | Self::Map(_) | Self::Set(_)
        )
    }

    /// Returns the string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the array handle if this is an array.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the object handle if this is an object.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Property lookup on objects; `Undefined` for anything else or a
    /// missing key.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Self::Object(o) => o.get(key).unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// SameValueZero comparison.
    ///
    /// Scalars compare by value with `NaN == NaN` and `+0 == -0`. Dates
    /// compare by instant. Containers and symbols compare by identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a.ptr_eq(b),
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            (Self::Set(a), Self::Set(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Convert into a `serde_json::Value`.
    ///
    /// Undefined becomes null, bigints and symbols become strings, dates
    /// become ISO-8601 strings, maps become arrays of `[key, value]` pairs
    /// and sets become arrays.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Undefined | Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::BigInt(n) => serde_json::Value::String(n.to_string()),
            Self::String(s) => serde_json::Value::String(s.to_string()),
            Self::Symbol(s) => serde_json::Value::String(s.to_string()),
            Self::Date(d) => serde_json::Value::String(iso_string(d)),
            Self::Array(a) => serde_json::Value::Array(a.to_vec().iter().map(Value::to_json).collect()),
            Self::Object(o) => serde_json::Value::Object(
                o.entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.to_json()))
                    .collect(),
            ),
            Self::Map(m) => serde_json::Value::Array(
                m.entries()
                    .into_iter()
                    .map(|(k, v)| serde_json::Value::Array(vec![k.to_json(), v.to_json()]))
                    .collect(),
            ),
            Self::Set(s) => serde_json::Value::Array(s.values().iter().map(Value::to_json).collect()),
        }
    }
}

/// Render a date the way `Date.prototype.toISOString` does.
pub fn iso_string(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b) || a.to_vec() == b.to_vec(),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b) || a.entries() == b.entries(),
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b) || a.entries() == b.entries(),
            (Self::Set(a), Self::Set(b)) => a.ptr_eq(b) || a.values() == b.values(),
            _ => self.same(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::BigInt(n) => write!(f, "{n}n"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "Date({})", iso_string(d)),
            Self::Array(a) => nested(f, |f| f.debug_list().entries(a.to_vec()).finish()),
            Self::Object(o) => nested(f, |f| {
                f.debug_map()
                    .entries(o.entries().into_iter().map(|(k, v)| (k, v)))
                    .finish()
            }),
            Self::Map(m) => nested(f, |f| {
                f.write_str("Map")?;
                f.debug_map().entries(m.entries()).finish()
            }),
            Self::Set(s) => nested(f, |f| {
                f.write_str("Set")?;
                f.debug_set().entries(s.values()).finish()
            }),
        }
    }
}

/// Depth-limited container rendering so cyclic values can be printed.
fn nested(
    f: &mut fmt::Formatter<'_>,
    render: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    let depth = DEBUG_DEPTH.with(|d| d.get());
    if depth >= DEBUG_DEPTH_LIMIT {
        return f.write_str("...");
    }
    DEBUG_DEPTH.with(|d| d.set(depth + 1));
    let result = render(f);
    DEBUG_DEPTH.with(|d| d.set(depth));
    result
}

// ─── Container Handles ───────────────────────────────────────────────

/// Shared, identity-bearing array handle.
#[derive(Clone, Default)]
pub struct Array(Arc<RwLock<Vec<Value>>>);

impl Array {
    /// Wrap a vector in a new handle.
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Element at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Append an element in place.
    pub fn push(&self, value: Value) {
        self.0.write().push(value);
    }

    /// Overwrite the element at `index` in place; out-of-range is a no-op.
    pub fn set(&self, index: usize, value: Value) {
        if let Some(slot) = self.0.write().get_mut(index) {
            *slot = value;
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Shared, identity-bearing object handle.
#[derive(Clone, Default)]
pub struct Object(Arc<RwLock<IndexMap<String, Value>>>);

impl Object {
    /// An empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs; later duplicates win.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self(Arc::new(RwLock::new(entries.into_iter().collect())))
    }

    /// Number of own keys.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the object has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Value under `key`, if present.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    /// Whether `key` is an own key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Snapshot of the entries in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Insert or overwrite a key in place.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.0.write().insert(key.into(), value);
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Shared, identity-bearing map handle. Keys are unique under
/// [`Value::same`].
#[derive(Clone, Default)]
pub struct MapValue(Arc<RwLock<Vec<(Value, Value)>>>);

impl MapValue {
    /// Build from pairs; a repeated key overwrites the earlier value but
    /// keeps its position.
    pub fn from_entries(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut pairs: Vec<(Value, Value)> = Vec::new();
        for (key, value) in entries {
            upsert(&mut pairs, key, value);
        }
        Self(Arc::new(RwLock::new(pairs)))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Value under `key`, if present.
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0
            .read()
            .iter()
            .find(|(k, _)| k.same(key))
            .map(|(_, v)| v.clone())
    }

    /// Snapshot of the entries in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0.read().clone()
    }

    /// Insert or overwrite in place.
    pub fn insert(&self, key: Value, value: Value) {
        upsert(&mut self.0.write(), key, value);
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &MapValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn upsert(pairs: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match pairs.iter_mut().find(|(k, _)| k.same(&key)) {
        Some(slot) => slot.1 = value,
        None => pairs.push((key, value)),
    }
}

/// Shared, identity-bearing set handle. Members are unique under
/// [`Value::same`].
#[derive(Clone, Default)]
pub struct SetValue(Arc<RwLock<Vec<Value>>>);

impl SetValue {
    /// Build from values, dropping duplicates and keeping first occurrences.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self(Arc::new(RwLock::new(dedup(values))))
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Whether `value` is a member.
    pub fn contains(&self, value: &Value) -> bool {
        self.0.read().iter().any(|v| v.same(value))
    }

    /// Snapshot of the members in insertion order.
    pub fn values(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Add a member in place; duplicates are ignored.
    pub fn add(&self, value: Value) {
        let mut members = self.0.write();
        if !members.iter().any(|v| v.same(&value)) {
            members.push(value);
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &SetValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Remove duplicates under [`Value::same`], keeping first occurrences.
pub fn dedup(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for value in values {
        if !out.iter().any(|v| v.same(&value)) {
            out.push(value);
        }
    }
    out
}

/// A unique symbol. Two symbols are the same only if they come from the
/// same [`Symbol::new`] call.
#[derive(Clone)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Create a fresh symbol with a description.
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self(description.into())
    }

    /// The symbol's description.
    pub fn description(&self) -> &str {
        &self.0
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Symbol) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ─── Conversions ─────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Self::Symbol(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Array::new(items))
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Self::Array(a)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s.into()),
            serde_json::Value::Array(items) => {
                Self::Array(Array::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Self::Object(Object::from_entries(
                map.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined | Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => number_to_json(*n).serialize(serializer),
            Self::BigInt(n) => serializer.serialize_str(&n.to_string()),
            Self::String(s) => serializer.serialize_str(s),
            Self::Symbol(s) => serializer.serialize_str(&s.to_string()),
            Self::Date(d) => serializer.serialize_str(&iso_string(d)),
            Self::Array(a) => {
                let items = a.to_vec();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in &items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(o) => {
                let entries = o.entries();
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in &entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Map(m) => {
                let entries = m.entries();
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for (k, v) in &entries {
                    seq.serialize_element(&[k, v])?;
                }
                seq.end()
            }
            Self::Set(s) => {
                let values = s.values();
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for v in &values {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_value_zero_numbers() {
        assert!(Value::Number(f64::NAN).same(&Value::Number(f64::NAN)));
        assert!(Value::Number(0.0).same(&Value::Number(-0.0)));
        assert!(!Value::Number(1.0).same(&Value::Number(2.0)));
    }

    #[test]
    fn test_containers_compare_by_identity() {
        let a = Value::array([Value::from(1)]);
        let b = Value::array([Value::from(1)]);
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_symbols_are_unique() {
        let a = Symbol::new("tag");
        let b = Symbol::new("tag");
        assert!(Value::from(a.clone()).same(&Value::from(a.clone())));
        assert!(!Value::from(a).same(&Value::from(b)));
    }

    #[test]
    fn test_from_json_preserves_key_order() {
        let value = Value::from(json!({"b": 1, "a": [true, null]}));
        let obj = value.as_object().unwrap();
        assert_eq!(obj.keys(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(
            obj.get("a").unwrap(),
            Value::array([Value::Bool(true), Value::Null])
        );
    }

    #[test]
    fn test_to_json_renders_extended_kinds() {
        let date = DateTime::from_timestamp_millis(0).unwrap();
        let value = Value::object([
            ("big", Value::bigint(12)),
            ("when", Value::Date(date)),
            ("tags", Value::set([Value::from("a"), Value::from("a")])),
            ("gone", Value::Undefined),
        ]);
        assert_eq!(
            value.to_json(),
            json!({
                "big": "12",
                "when": "1970-01-01T00:00:00.000Z",
                "tags": ["a"],
                "gone": null
            })
        );
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let value = Value::from(json!({"n": 1.5, "list": [1, "two"]}));
        let serialized = serde_json::to_value(&value).unwrap();
        assert_eq!(serialized, value.to_json());
    }

    #[test]
    fn test_map_and_set_dedupe() {
        let map = MapValue::from_entries([
            (Value::from("k"), Value::from(1)),
            (Value::from("k"), Value::from(2)),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Value::from("k")), Some(Value::from(2)));

        let set = SetValue::from_values([Value::from(1), Value::from(1.0), Value::from(2)]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_debug_handles_cycles() {
        let obj = Object::new();
        obj.insert("self", Value::Object(obj.clone()));
        let rendered = format!("{:?}", Value::Object(obj));
        assert!(rendered.contains("..."));
    }

    #[test]
    fn test_get_on_non_object_is_undefined() {
        assert!(Value::from(1).get("a").is_undefined());
        assert!(Value::object([("a", Value::Null)]).get("b").is_undefined());
    }
}
