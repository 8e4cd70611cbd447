#![deny(missing_docs)]

//! # gauge-core — Foundational Types for gauge
//!
//! This crate is the leaf of the gauge workspace. It defines the data that
//! flows through the shape engine and the conversions the engine relies on,
//! without knowing anything about shapes.
//!
//! ## Modules
//!
//! - [`value`] — the dynamic [`Value`] model. Containers are shared handles
//!   with identity, so documents may share or even contain themselves.
//! - [`issue`] — [`Issue`], [`PathKey`], the tri-state [`Outcome`] and the
//!   non-throwing [`Validated`] result.
//! - [`error`] — [`Error`] and [`ValidationError`].
//! - [`options`] — [`ApplyOptions`] and the per-parse [`Nonce`].
//! - [`coerce`] — per-kind coercion functions and the [`NEVER`] marker.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `gauge-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod coerce;
pub mod error;
pub mod issue;
pub mod options;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use coerce::{Coerced, NEVER};
pub use error::{Error, ValidationError};
pub use issue::{prefix_path, Code, Issue, Outcome, PathKey, Validated};
pub use options::{ApplyOptions, Nonce};
pub use value::{Array, MapValue, Object, SetValue, Symbol, Value, ValueKind};
