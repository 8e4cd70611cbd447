//! # Accepted Inputs
//!
//! Every shape can describe, ahead of time, which inputs it could possibly
//! accept: any value, values of certain kinds, or specific literals. Unions
//! use this to skip branches that cannot match and to detect discriminator
//! keys.
//!
//! The description may over-approximate (claiming `Any` is always safe) but
//! must never exclude an input the shape would accept.

use gauge_core::{Value, ValueKind};

/// One accepted input.
#[derive(Debug, Clone)]
pub(crate) enum Input {
    /// Any value at all.
    Any,
    /// Any value of this kind.
    Kind(ValueKind),
    /// Exactly this value (by SameValueZero).
    Literal(Value),
}

/// Normalized set of accepted inputs.
#[derive(Debug, Clone, Default)]
pub(crate) struct Inputs(Vec<Input>);

impl Inputs {
    pub(crate) fn any() -> Self {
        Self(vec![Input::Any])
    }

    /// Accepts nothing.
    pub(crate) fn none() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn kinds(kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        let mut inputs = Self::none();
        for kind in kinds {
            inputs.push(Input::Kind(kind));
        }
        inputs
    }

    pub(crate) fn literals(values: impl IntoIterator<Item = Value>) -> Self {
        let mut inputs = Self::none();
        for value in values {
            inputs.push(Input::Literal(value));
        }
        inputs
    }

    /// Union of several input sets.
    pub(crate) fn merge(sets: impl IntoIterator<Item = Inputs>) -> Self {
        let mut inputs = Self::none();
        for set in sets {
            for input in set.0 {
                inputs.push(input);
            }
        }
        inputs
    }

    /// Add an input, keeping the set normalized: `Any` absorbs everything
    /// and a kind absorbs literals of that kind.
    fn push(&mut self, input: Input) {
        if self.is_any() {
            return;
        }
        match input {
            Input::Any => self.0 = vec![Input::Any],
            Input::Kind(kind) => {
                if self.accepts_kind_exactly(kind) {
                    return;
                }
                self.0.retain(|existing| match existing {
                    Input::Literal(value) => value.kind() != kind,
                    _ => true,
                });
                self.0.push(Input::Kind(kind));
            }
            Input::Literal(value) => {
                let covered = self.0.iter().any(|existing| match existing {
                    Input::Kind(kind) => *kind == value.kind(),
                    Input::Literal(other) => other.same(&value),
                    Input::Any => true,
                });
                if !covered {
                    self.0.push(Input::Literal(value));
                }
            }
        }
    }

    fn accepts_kind_exactly(&self, kind: ValueKind) -> bool {
        self.0
            .iter()
            .any(|input| matches!(input, Input::Kind(k) if *k == kind))
    }

    pub(crate) fn is_any(&self) -> bool {
        matches!(self.0.as_slice(), [Input::Any])
    }

    /// Whether some value of `kind` might be accepted.
    pub(crate) fn accepts_kind(&self, kind: ValueKind) -> bool {
        self.0.iter().any(|input| match input {
            Input::Any => true,
            Input::Kind(k) => *k == kind,
            Input::Literal(value) => value.kind() == kind,
        })
    }

    /// The literal values, if the set consists only of literals.
    pub(crate) fn literal_values(&self) -> Option<Vec<Value>> {
        if self.0.is_empty() {
            return None;
        }
        self.0
            .iter()
            .map(|input| match input {
                Input::Literal(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of the accepted kinds, in `ValueKind` order.
    pub(crate) fn kind_names(&self) -> Vec<&'static str> {
        ValueKind::ALL
            .into_iter()
            .filter(|kind| self.accepts_kind(*kind))
            .map(ValueKind::as_str)
            .collect()
    }
}
