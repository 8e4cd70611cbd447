//! # Apply Options and Nonces
//!
//! [`ApplyOptions`] is the per-parse configuration threaded through every
//! shape. It derives `Serialize`/`Deserialize` with field defaults so parse
//! settings can live in JSON or YAML configuration next to the documents
//! they govern.
//!
//! A [`Nonce`] identifies one top-level parse. Public entry points allocate
//! it; every nested apply call receives it explicitly.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::value::Value;

static NEXT_NONCE: AtomicU64 = AtomicU64::new(1);

/// Options for a single parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// Collect every reachable issue instead of stopping at the first.
    pub verbose: bool,
    /// Let coercible shapes convert inputs of other kinds.
    pub coerce: bool,
    /// Opaque value handed to user callbacks. Never read by the engine.
    #[serde(skip_serializing_if = "Value::is_undefined")]
    pub context: Value,
}

impl ApplyOptions {
    /// Default options: fast mode, no coercion, no context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable verbose mode.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable or disable coercion.
    pub fn coerce(mut self, coerce: bool) -> Self {
        self.coerce = coerce;
        self
    }

    /// Attach a context value.
    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Identifier of one top-level parse.
///
/// Concurrent members of an async parse run under [`Nonce::fork`]ed
/// nonces. A fork has its own id and remembers its parent, so state keyed
/// by nonce can be split per branch while still seeing what the branch's
/// ancestors recorded. Equality and hashing use the id only.
#[derive(Debug, Clone)]
pub struct Nonce {
    id: u64,
    parent: Option<Arc<Nonce>>,
}

impl Nonce {
    /// Allocate a fresh nonce, unique within the process.
    pub fn next() -> Self {
        Self {
            id: NEXT_NONCE.fetch_add(1, Ordering::Relaxed),
            parent: None,
        }
    }

    /// A fresh child nonce for one concurrent branch of this parse.
    pub fn fork(&self) -> Self {
        Self {
            parent: Some(Arc::new(self.clone())),
            ..Self::next()
        }
    }

    /// The raw counter value.
    pub fn get(&self) -> u64 {
        self.id
    }

    /// Ids of this nonce and its ancestors, innermost first.
    pub fn lineage(&self) -> impl Iterator<Item = u64> + '_ {
        std::iter::successors(Some(self), |nonce| nonce.parent.as_deref()).map(|nonce| nonce.id)
    }
}

impl PartialEq for Nonce {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Nonce {}

impl Hash for Nonce {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Nonce {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Nonce {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_unique() {
        let a = Nonce::next();
        let b = Nonce::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_fork_keeps_lineage() {
        let root = Nonce::next();
        let left = root.fork();
        let right = root.fork();
        let nested = left.fork();
        assert_ne!(left, right);
        assert_eq!(nested.lineage().collect::<Vec<_>>(), vec![nested.get(), left.get(), root.get()]);
        assert!(!right.lineage().any(|id| id == left.get()));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: ApplyOptions = serde_json::from_str(r#"{"coerce": true}"#).unwrap();
        assert!(opts.coerce);
        assert!(!opts.verbose);
        assert!(opts.context.is_undefined());
    }

    #[test]
    fn test_options_from_yaml_with_context() {
        let yaml = "verbose: true\ncontext:\n  tenant: acme\n";
        let opts: ApplyOptions = serde_yaml::from_str(yaml).unwrap();
        assert!(opts.verbose);
        assert_eq!(opts.context.get("tenant"), Value::from("acme"));
    }

    #[test]
    fn test_builder_methods() {
        let opts = ApplyOptions::new().verbose(true).coerce(true);
        assert!(opts.verbose && opts.coerce);
    }
}
