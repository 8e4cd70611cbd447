//! # Lazy Shapes
//!
//! A lazy shape defers to the shape returned by a provider, resolved once
//! on first use. Lazy shapes are how recursive schemas are expressed.
//!
//! ## Cycle Detection
//!
//! Recursive schemas may meet cyclic documents. Each lazy node keeps, per
//! [`Nonce`], the stack of container inputs it is currently applying the
//! resolved shape to. Re-entering with a container already on the stack
//! (by identity) means the document loops back on itself; instead of
//! recursing forever the lazy node returns its placeholder, which by
//! default is the input itself. Scalars cannot form cycles and are never
//! tracked.
//!
//! Async containers run their members under forked nonces, so a lookup
//! walks the nonce's lineage. Siblings never see each other's entries: a
//! container reached twice through different members is validated twice,
//! not mistaken for a cycle.
//!
//! Clones of a lazy node (for example after adding an operation) share the
//! resolved shape and the stacks.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use gauge_core::{ApplyOptions, Error, Nonce, Outcome, Value};

use crate::shape::{Shape, ShapeKind};

type Provider = Arc<dyn Fn() -> Shape + Send + Sync>;

#[derive(Clone)]
pub(crate) struct LazyKind {
    provider: Provider,
    resolved: Arc<OnceLock<Shape>>,
    placeholder: Option<Value>,
    stacks: Arc<Mutex<HashMap<u64, Vec<Value>>>>,
}

thread_local! {
    /// Lazy nodes whose `is_async` answer is being computed on this thread.
    static VISITING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Whether an `is_async` computation is passing through a lazy node.
pub(crate) fn is_visiting() -> bool {
    VISITING.with(|visiting| !visiting.borrow().is_empty())
}

impl LazyKind {
    fn id(&self) -> usize {
        Arc::as_ptr(&self.resolved) as usize
    }

    pub(crate) fn shape(&self) -> &Shape {
        self.resolved.get_or_init(|| {
            tracing::debug!("resolving lazy shape");
            (self.provider)()
        })
    }

    /// A lazy node already being visited contributes nothing; the rest of
    /// the cycle decides.
    pub(crate) fn is_async(&self) -> bool {
        let id = self.id();
        let entered = VISITING.with(|visiting| {
            let mut visiting = visiting.borrow_mut();
            if visiting.contains(&id) {
                false
            } else {
                visiting.push(id);
                true
            }
        });
        if !entered {
            return false;
        }
        let is_async = self.shape().is_async();
        VISITING.with(|visiting| {
            visiting.borrow_mut().pop();
        });
        is_async
    }

    /// Push `input` onto the nonce's stack. Returns `false` if it is already
    /// on the stack of the nonce or one of its ancestors.
    fn enter(&self, input: &Value, nonce: &Nonce) -> bool {
        let mut stacks = self.stacks.lock();
        let recurring = nonce.lineage().any(|id| {
            stacks
                .get(&id)
                .is_some_and(|stack| stack.iter().any(|seen| seen.same(input)))
        });
        if recurring {
            return false;
        }
        stacks.entry(nonce.get()).or_default().push(input.clone());
        true
    }

    fn exit(&self, input: &Value, nonce: &Nonce) {
        let mut stacks = self.stacks.lock();
        if let Some(stack) = stacks.get_mut(&nonce.get()) {
            if let Some(position) = stack.iter().rposition(|seen| seen.same(input)) {
                stack.remove(position);
            }
            if stack.is_empty() {
                stacks.remove(&nonce.get());
            }
        }
    }

    fn placeholder(&self, input: &Value) -> Outcome {
        tracing::trace!("cyclic input, substituting placeholder");
        match &self.placeholder {
            Some(value) => Outcome::from_output(input, value.clone()),
            None => Outcome::Unchanged,
        }
    }

    pub(crate) fn apply(&self, input: &Value, options: &ApplyOptions, nonce: &Nonce) -> Result<Outcome, Error> {
        if !input.is_container() {
            return self.shape().apply_sync(input, options, nonce);
        }
        if !self.enter(input, nonce) {
            return Ok(self.placeholder(input));
        }
        let result = self.shape().apply_sync(input, options, nonce);
        self.exit(input, nonce);
        result
    }

    pub(crate) async fn apply_async(
        &self,
        input: &Value,
        options: &ApplyOptions,
        nonce: &Nonce,
    ) -> Result<Outcome, Error> {
        if !input.is_container() {
            return self.shape().apply_async(input.clone(), options, nonce).await;
        }
        if !self.enter(input, nonce) {
            return Ok(self.placeholder(input));
        }
        let result = self.shape().apply_async(input.clone(), options, nonce).await;
        self.exit(input, nonce);
        result
    }

    /// Number of parses with live stacks.
    #[cfg(test)]
    fn live_stacks(&self) -> usize {
        self.stacks.lock().len()
    }
}

impl Shape {
    /// A shape resolved from `provider` on first use.
    pub fn lazy<F>(provider: F) -> Shape
    where
        F: Fn() -> Shape + Send + Sync + 'static,
    {
        Shape::from_kind(ShapeKind::Lazy(LazyKind {
            provider: Arc::new(provider),
            resolved: Arc::new(OnceLock::new()),
            placeholder: None,
            stacks: Arc::new(Mutex::new(HashMap::new())),
        }))
    }

    /// Set the value a lazy shape returns for cyclic inputs. Other shapes
    /// are returned as they are.
    pub fn circular(&self, placeholder: impl Into<Value>) -> Shape {
        match self.kind() {
            ShapeKind::Lazy(lazy) => self.with_kind(ShapeKind::Lazy(LazyKind {
                placeholder: Some(placeholder.into()),
                ..lazy.clone()
            })),
            _ => self.clone(),
        }
    }
}
