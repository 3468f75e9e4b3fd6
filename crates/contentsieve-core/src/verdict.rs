//! Three-state decision values returned by filter callbacks.
//!
//! A callback that refuses to decide must be distinguishable from one that
//! decides a value is unsafe. [`Verdict::Abstain`] hands the decision back to
//! the caller's default policy; [`Verdict::Drop`] removes the value. An empty
//! replacement string is a valid [`Verdict::Replace`].

use serde::{Deserialize, Serialize};

/// Outcome of a single policy decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict<T> {
    /// No opinion; apply the caller's default (usually: strip)
    Abstain,
    /// Use this value in place of the original
    Replace(T),
    /// The value is unsafe in this context and must be removed
    Drop,
}

impl<T> Verdict<T> {
    /// Whether the callback abstained.
    pub fn is_abstain(&self) -> bool {
        matches!(self, Verdict::Abstain)
    }

    /// Whether the callback asked for removal.
    pub fn is_drop(&self) -> bool {
        matches!(self, Verdict::Drop)
    }

    /// Borrow the replacement, if any.
    pub fn replacement(&self) -> Option<&T> {
        match self {
            Verdict::Replace(v) => Some(v),
            _ => None,
        }
    }

    /// Convert into the replacement, treating both abstain and drop as absent.
    ///
    /// This is the fail-closed reading: only an explicit replacement survives.
    pub fn into_replacement(self) -> Option<T> {
        match self {
            Verdict::Replace(v) => Some(v),
            _ => None,
        }
    }

    /// Map the replacement value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Verdict<U> {
        match self {
            Verdict::Abstain => Verdict::Abstain,
            Verdict::Replace(v) => Verdict::Replace(f(v)),
            Verdict::Drop => Verdict::Drop,
        }
    }

    /// Consult a fallback when this verdict abstained.
    pub fn or_else<F: FnOnce() -> Verdict<T>>(self, f: F) -> Verdict<T> {
        match self {
            Verdict::Abstain => f(),
            other => other,
        }
    }

    /// Build a verdict from an option where absence means "unsafe".
    pub fn drop_if_none(value: Option<T>) -> Self {
        match value {
            Some(v) => Verdict::Replace(v),
            None => Verdict::Drop,
        }
    }
}

impl<T> Default for Verdict<T> {
    fn default() -> Self {
        Verdict::Abstain
    }
}

impl<T> std::fmt::Display for Verdict<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Abstain => write!(f, "abstain"),
            Verdict::Replace(_) => write!(f, "replace"),
            Verdict::Drop => write!(f, "drop"),
        }
    }
}
