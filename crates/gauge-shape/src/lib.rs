//! # gauge-shape — Shape Engine for gauge
//!
//! Shapes describe valid values. Applying a shape to a [`Value`] validates
//! it, optionally coerces it, and returns either the (possibly replaced)
//! value or the list of [`Issue`](gauge_core::Issue)s explaining why it is
//! invalid.
//!
//! ## Modules
//!
//! - [`shape`] — the [`Shape`] handle, derived facts and apply dispatch.
//! - [`operation`] — checks, refinements and alterations attached to shapes.
//! - [`leaf`] — scalar, literal and trivial shapes plus constraint shortcuts.
//! - [`array`], [`object`], [`record`], [`collection`] — containers.
//! - [`union`] — first-match unions with kind and discriminator lookup.
//! - [`intersection`] — all-match intersections with output merging.
//! - [`lazy`] — deferred, recursive shapes with cycle detection.
//! - [`combinator`] — replace, deny, catch, pipe and convert.
//! - [`parse`] — `parse`, `try_parse`, `accepts` and their async forms.
//!
//! ## Example
//!
//! ```
//! use gauge_shape::Shape;
//! use gauge_core::Value;
//!
//! let user = Shape::object([
//!     ("name", Shape::string().min_length(1)),
//!     ("age", Shape::number().int().gte(0.0).optional()),
//! ]);
//!
//! let input = Value::object([("name", Value::from("Ada"))]);
//! assert_eq!(user.parse(input.clone()).unwrap(), input);
//! ```

pub mod array;
pub mod collection;
pub mod combinator;
mod cow;
mod inputs;
pub mod intersection;
pub mod lazy;
pub mod leaf;
pub mod object;
pub mod operation;
pub mod parse;
pub mod record;
pub mod shape;
pub mod union;

pub use gauge_core::{ApplyOptions, Error, Issue, Outcome, Validated, Value};
pub use intersection::merge_values;
pub use leaf::CoerceMode;
pub use object::KeysMode;
pub use operation::{Constraint, Operation, OperationKind, OperationOptions};
pub use shape::Shape;
