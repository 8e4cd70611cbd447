//! # Shape Core
//!
//! A [`Shape`] is an immutable, cheaply clonable handle to a node that
//! describes what a value must look like. Every node carries:
//!
//! - its [`ShapeKind`] (a closed enum of leaf, container and combinator
//!   shapes);
//! - an ordered slice of [`Operation`]s run after the type phase;
//! - a memo of derived facts (`is_async` and the accepted input kinds),
//!   computed on first use.
//!
//! Builder methods never mutate a node. Adding an operation or changing a
//! setting produces a new node with a fresh memo, so derived facts always
//! describe the node they are stored on.
//!
//! ## Apply
//!
//! [`Shape::apply`] is the synchronous entry point used by containers and
//! combinators. [`Shape::apply_async`] returns a boxed future; shapes that
//! are not async resolve it immediately from the synchronous path.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use futures::future::{self, BoxFuture, FutureExt};

use gauge_core::{ApplyOptions, Code, Error, Issue, Nonce, Outcome, Value};

use crate::array::ArrayKind;
use crate::collection::{MapKind, SetKind};
use crate::combinator::{Converter, Fallback};
use crate::inputs::Inputs;
use crate::intersection;
use crate::lazy::{self, LazyKind};
use crate::leaf::Leaf;
use crate::object::ObjectKind;
use crate::operation::{self, Callback, Constraint, Operation, OperationOptions};
use crate::record::RecordKind;
use crate::union::UnionKind;

/// Immutable description of valid values.
#[derive(Clone)]
pub struct Shape(pub(crate) Arc<ShapeNode>);

pub(crate) struct ShapeNode {
    pub(crate) kind: ShapeKind,
    pub(crate) operations: Arc<[Operation]>,
    memo: Memo,
}

/// Derived facts, indexed by the coerce flag where it matters.
#[derive(Default)]
struct Memo {
    is_async: OnceLock<bool>,
    inputs: [OnceLock<Inputs>; 2],
}

/// Every kind of shape the engine knows.
#[derive(Clone)]
pub(crate) enum ShapeKind {
    Any,
    Never,
    Leaf(Leaf),
    Const(Value),
    Enum(Vec<Value>),
    Array(ArrayKind),
    Object(ObjectKind),
    Record(RecordKind),
    Map(MapKind),
    Set(SetKind),
    Union(UnionKind),
    Intersection(Vec<Shape>),
    Lazy(LazyKind),
    Replace {
        base: Shape,
        search: Value,
        replacement: Value,
    },
    Deny {
        base: Shape,
        denied: Value,
    },
    Catch {
        base: Shape,
        fallback: Fallback,
    },
    Pipe {
        input: Shape,
        output: Shape,
    },
    Convert(Converter),
}

impl ShapeKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Never => "never",
            Self::Leaf(leaf) => leaf.ty.name(),
            Self::Const(_) => "const",
            Self::Enum(_) => "enum",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Record(_) => "record",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::Union(_) => "union",
            Self::Intersection(_) => "intersection",
            Self::Lazy(_) => "lazy",
            Self::Replace { .. } => "replace",
            Self::Deny { .. } => "deny",
            Self::Catch { .. } => "catch",
            Self::Pipe { .. } => "pipe",
            Self::Convert(_) => "convert",
        }
    }
}

/// A single type issue at the root.
pub(crate) fn type_issue(input: &Value, expected: &str) -> Outcome {
    Outcome::Issues(vec![
        Issue::new(Code::Type, input.clone()).with_param(expected)
    ])
}

impl Shape {
    pub(crate) fn from_kind(kind: ShapeKind) -> Self {
        Self::build(kind, Arc::from(Vec::new()))
    }

    fn build(kind: ShapeKind, operations: Arc<[Operation]>) -> Self {
        Self(Arc::new(ShapeNode {
            kind,
            operations,
            memo: Memo::default(),
        }))
    }

    pub(crate) fn kind(&self) -> &ShapeKind {
        &self.0.kind
    }

    /// Same operations, different kind.
    pub(crate) fn with_kind(&self, kind: ShapeKind) -> Self {
        Self::build(kind, Arc::clone(&self.0.operations))
    }

    /// Same kind, one more operation.
    pub(crate) fn with_operation(&self, operation: Operation) -> Self {
        let mut operations = self.0.operations.to_vec();
        operations.push(operation);
        Self::build(self.0.kind.clone(), Arc::from(operations))
    }

    /// Whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The operations attached to this shape, in order.
    pub fn operations(&self) -> &[Operation] {
        &self.0.operations
    }

    // ─── Operations ─────────────────────────────────────────────────────

    /// Add a check that returns zero or more issues.
    pub fn check<F>(&self, check: F) -> Shape
    where
        F: Fn(&Value, &ApplyOptions) -> Result<Vec<Issue>, Error> + Send + Sync + 'static,
    {
        self.check_with(check, OperationOptions::default())
    }

    /// [`Shape::check`] with explicit options.
    pub fn check_with<F>(&self, check: F, options: OperationOptions) -> Shape
    where
        F: Fn(&Value, &ApplyOptions) -> Result<Vec<Issue>, Error> + Send + Sync + 'static,
    {
        self.with_operation(Operation::new(Callback::Check(Arc::new(check)), options))
    }

    /// Add a predicate; a `false` result raises a `predicate` issue.
    pub fn refine<F>(&self, predicate: F) -> Shape
    where
        F: Fn(&Value, &ApplyOptions) -> bool + Send + Sync + 'static,
    {
        self.refine_with(predicate, OperationOptions::default())
    }

    /// [`Shape::refine`] with explicit options.
    pub fn refine_with<F>(&self, predicate: F, options: OperationOptions) -> Shape
    where
        F: Fn(&Value, &ApplyOptions) -> bool + Send + Sync + 'static,
    {
        self.with_operation(Operation::new(Callback::Refine(Arc::new(predicate)), options))
    }

    /// Add an alteration that replaces the value.
    pub fn alter<F>(&self, alter: F) -> Shape
    where
        F: Fn(Value, &ApplyOptions) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.alter_with(alter, OperationOptions::default())
    }

    /// [`Shape::alter`] with explicit options. `force` has no effect on
    /// alterations.
    pub fn alter_with<F>(&self, alter: F, options: OperationOptions) -> Shape
    where
        F: Fn(Value, &ApplyOptions) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.with_operation(Operation::new(Callback::Alter(Arc::new(alter)), options))
    }

    /// Add an async check. The shape becomes async.
    pub fn check_async<F, Fut>(&self, check: F) -> Shape
    where
        F: Fn(Value, ApplyOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Issue>, Error>> + Send + 'static,
    {
        self.check_async_with(check, OperationOptions::default())
    }

    /// [`Shape::check_async`] with explicit options.
    pub fn check_async_with<F, Fut>(&self, check: F, options: OperationOptions) -> Shape
    where
        F: Fn(Value, ApplyOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Issue>, Error>> + Send + 'static,
    {
        let callback = Callback::CheckAsync(Arc::new(move |value, options| {
            check(value, options).boxed()
        }));
        self.with_operation(Operation::new(callback, options))
    }

    /// Add an async alteration. The shape becomes async.
    pub fn alter_async<F, Fut>(&self, alter: F) -> Shape
    where
        F: Fn(Value, ApplyOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        let callback = Callback::AlterAsync(Arc::new(move |value, options| {
            alter(value, options).boxed()
        }));
        self.with_operation(Operation::new(callback, OperationOptions::default()))
    }

    /// Add a built-in constraint.
    pub fn constrain(&self, constraint: Constraint, options: OperationOptions) -> Shape {
        self.with_operation(Operation::new(Callback::Constraint(constraint), options))
    }

    // ─── Derived Facts ──────────────────────────────────────────────────

    /// Whether applying this shape requires the async entry points.
    pub fn is_async(&self) -> bool {
        if let Some(is_async) = self.0.memo.is_async.get() {
            return *is_async;
        }
        let is_async = self.0.operations.iter().any(Operation::is_async) || self.kind_is_async();
        // Answers computed while a lazy shape is being visited may be
        // partial, so only top-level answers are memoized.
        if !lazy::is_visiting() {
            let _ = self.0.memo.is_async.set(is_async);
        }
        is_async
    }

    fn kind_is_async(&self) -> bool {
        match &self.0.kind {
            ShapeKind::Any
            | ShapeKind::Never
            | ShapeKind::Leaf(_)
            | ShapeKind::Const(_)
            | ShapeKind::Enum(_) => false,
            ShapeKind::Array(array) => array.shapes().any(Shape::is_async),
            ShapeKind::Object(object) => object.shapes().any(Shape::is_async),
            ShapeKind::Record(record) => record.shapes().any(Shape::is_async),
            ShapeKind::Map(map) => map.key.is_async() || map.value.is_async(),
            ShapeKind::Set(set) => set.value.is_async(),
            ShapeKind::Union(union) => union.branches.iter().any(Shape::is_async),
            ShapeKind::Intersection(branches) => branches.iter().any(Shape::is_async),
            ShapeKind::Lazy(lazy) => lazy.is_async(),
            ShapeKind::Replace { base, .. }
            | ShapeKind::Deny { base, .. }
            | ShapeKind::Catch { base, .. } => base.is_async(),
            ShapeKind::Pipe { input, output } => input.is_async() || output.is_async(),
            ShapeKind::Convert(converter) => converter.is_async(),
        }
    }

    /// The input kinds and literals this shape can accept.
    pub(crate) fn inputs(&self, coerce: bool) -> Inputs {
        let slot = &self.0.memo.inputs[usize::from(coerce)];
        if let Some(inputs) = slot.get() {
            return inputs.clone();
        }
        let inputs = self.kind_inputs(coerce);
        let _ = slot.set(inputs.clone());
        inputs
    }

    fn kind_inputs(&self, coerce: bool) -> Inputs {
        match &self.0.kind {
            ShapeKind::Any
            | ShapeKind::Lazy(_)
            | ShapeKind::Catch { .. }
            | ShapeKind::Convert(_) => Inputs::any(),
            ShapeKind::Never => Inputs::none(),
            ShapeKind::Leaf(leaf) => leaf.inputs(coerce),
            ShapeKind::Const(value) => Inputs::literals([value.clone()]),
            ShapeKind::Enum(values) => Inputs::literals(values.iter().cloned()),
            ShapeKind::Array(array) => array.inputs(coerce),
            ShapeKind::Object(_) | ShapeKind::Record(_) => {
                Inputs::kinds([gauge_core::ValueKind::Object])
            }
            ShapeKind::Map(map) => map.inputs(coerce),
            ShapeKind::Set(set) => set.inputs(coerce),
            ShapeKind::Union(union) => {
                Inputs::merge(union.branches.iter().map(|branch| branch.inputs(coerce)))
            }
            ShapeKind::Intersection(branches) => branches
                .iter()
                .map(|branch| branch.inputs(coerce))
                .find(|inputs| !inputs.is_any())
                .unwrap_or_else(Inputs::any),
            ShapeKind::Replace { base, search, .. } => Inputs::merge([
                base.inputs(coerce),
                Inputs::literals([search.clone()]),
            ]),
            ShapeKind::Deny { base, .. } => base.inputs(coerce),
            ShapeKind::Pipe { input, .. } => input.inputs(coerce),
        }
    }

    // ─── Apply ──────────────────────────────────────────────────────────

    /// Apply the shape synchronously.
    ///
    /// Returns [`Error::AsyncShape`] if the shape needs async evaluation.
    pub fn apply(&self, input: &Value, options: &ApplyOptions, nonce: &Nonce) -> Result<Outcome, Error> {
        if self.is_async() {
            tracing::debug!(shape = self.0.kind.name(), "async shape applied synchronously");
            return Err(Error::AsyncShape);
        }
        self.apply_sync(input, options, nonce)
    }

    pub(crate) fn apply_sync(
        &self,
        input: &Value,
        options: &ApplyOptions,
        nonce: &Nonce,
    ) -> Result<Outcome, Error> {
        let outcome = self.apply_kind(input, options, nonce)?;
        operation::apply_operations(&self.0.operations, input, outcome, options)
    }

    /// Type phase of a synchronous apply.
    fn apply_kind(&self, input: &Value, options: &ApplyOptions, nonce: &Nonce) -> Result<Outcome, Error> {
        let outcome = match &self.0.kind {
            ShapeKind::Any => Outcome::Unchanged,
            ShapeKind::Never => type_issue(input, "never"),
            ShapeKind::Leaf(leaf) => leaf.apply(input, options),
            ShapeKind::Const(value) => {
                if input.same(value) {
                    Outcome::Unchanged
                } else {
                    Outcome::Issues(vec![
                        Issue::new(Code::Const, input.clone()).with_param(value.clone())
                    ])
                }
            }
            ShapeKind::Enum(values) => {
                if values.iter().any(|value| input.same(value)) {
                    Outcome::Unchanged
                } else {
                    Outcome::Issues(vec![Issue::new(Code::Enum, input.clone())
                        .with_param(Value::array(values.iter().cloned()))])
                }
            }
            ShapeKind::Array(array) => array.apply(input, options, nonce)?,
            ShapeKind::Object(object) => object.apply(input, options, nonce)?,
            ShapeKind::Record(record) => record.apply(input, options, nonce)?,
            ShapeKind::Map(map) => map.apply(input, options, nonce)?,
            ShapeKind::Set(set) => set.apply(input, options, nonce)?,
            ShapeKind::Union(union) => union.apply(input, options, nonce)?,
            ShapeKind::Intersection(branches) => intersection::apply(branches, input, options, nonce)?,
            ShapeKind::Lazy(lazy) => lazy.apply(input, options, nonce)?,
            ShapeKind::Replace {
                base,
                search,
                replacement,
            } => {
                if input.same(search) {
                    Outcome::from_output(input, replacement.clone())
                } else {
                    base.apply_sync(input, options, nonce)?
                }
            }
            ShapeKind::Deny { base, denied } => {
                if input.same(denied) {
                    crate::combinator::denied_issue(input, denied)
                } else {
                    crate::combinator::deny_output(base.apply_sync(input, options, nonce)?, denied)
                }
            }
            ShapeKind::Catch { base, fallback } => {
                fallback.recover(input, base.apply_sync(input, options, nonce)?)
            }
            ShapeKind::Pipe {
                input: first,
                output: second,
            } => match first.apply_sync(input, options, nonce)? {
                issues @ Outcome::Issues(_) => issues,
                Outcome::Unchanged => second.apply_sync(input, options, nonce)?,
                Outcome::Replaced(value) => {
                    let next = second.apply_sync(&value, options, nonce)?;
                    match next.into_value(&value) {
                        Ok(output) => Outcome::from_output(input, output),
                        Err(issues) => Outcome::Issues(issues),
                    }
                }
            },
            ShapeKind::Convert(converter) => converter.apply(input, options)?,
        };
        Ok(outcome)
    }

    /// Apply the shape, awaiting async operations and members.
    pub fn apply_async<'a>(
        &'a self,
        input: Value,
        options: &'a ApplyOptions,
        nonce: &'a Nonce,
    ) -> BoxFuture<'a, Result<Outcome, Error>> {
        if !self.is_async() {
            return future::ready(self.apply_sync(&input, options, nonce)).boxed();
        }
        async move {
            let outcome = self.apply_kind_async(&input, options, nonce).await?;
            operation::apply_operations_async(&self.0.operations, &input, outcome, options).await
        }
        .boxed()
    }

    /// Type phase of an async apply.
    async fn apply_kind_async(
        &self,
        input: &Value,
        options: &ApplyOptions,
        nonce: &Nonce,
    ) -> Result<Outcome, Error> {
        let outcome = match &self.0.kind {
            ShapeKind::Array(array) => array.apply_async(input, options, nonce).await?,
            ShapeKind::Object(object) => object.apply_async(input, options, nonce).await?,
            ShapeKind::Record(record) => record.apply_async(input, options, nonce).await?,
            ShapeKind::Map(map) => map.apply_async(input, options, nonce).await?,
            ShapeKind::Set(set) => set.apply_async(input, options, nonce).await?,
            ShapeKind::Union(union) => union.apply_async(input, options, nonce).await?,
            ShapeKind::Intersection(branches) => {
                intersection::apply_async(branches, input, options, nonce).await?
            }
            ShapeKind::Lazy(lazy) => lazy.apply_async(input, options, nonce).await?,
            ShapeKind::Replace {
                base,
                search,
                replacement,
            } => {
                if input.same(search) {
                    Outcome::from_output(input, replacement.clone())
                } else {
                    base.apply_async(input.clone(), options, nonce).await?
                }
            }
            ShapeKind::Deny { base, denied } => {
                if input.same(denied) {
                    crate::combinator::denied_issue(input, denied)
                } else {
                    let outcome = base.apply_async(input.clone(), options, nonce).await?;
                    crate::combinator::deny_output(outcome, denied)
                }
            }
            ShapeKind::Catch { base, fallback } => {
                let outcome = base.apply_async(input.clone(), options, nonce).await?;
                fallback.recover(input, outcome)
            }
            ShapeKind::Pipe {
                input: first,
                output: second,
            } => match first.apply_async(input.clone(), options, nonce).await? {
                issues @ Outcome::Issues(_) => issues,
                Outcome::Unchanged => second.apply_async(input.clone(), options, nonce).await?,
                Outcome::Replaced(value) => {
                    let next = second.apply_async(value.clone(), options, nonce).await?;
                    match next.into_value(&value) {
                        Ok(output) => Outcome::from_output(input, output),
                        Err(issues) => Outcome::Issues(issues),
                    }
                }
            },
            ShapeKind::Convert(converter) => converter.apply_async(input, options).await?,
            _ => self.apply_kind(input, options, nonce)?,
        };
        Ok(outcome)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("kind", &self.0.kind.name())
            .field("operations", &self.0.operations.len())
            .finish()
    }
}
