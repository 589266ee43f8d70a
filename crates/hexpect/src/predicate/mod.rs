//! Composable predicates over actual values.
//!
//! A predicate receives the whole actual sub-value at its position in the
//! expectation tree (or nothing, when the field is absent) and decides on its
//! own whether it matches. The matcher never looks inside a predicate.
//!
//! # Module Structure
//!
//! - `typed` - Type-checked constructors (`boolean`, `int`, `float`, `string`,
//!   `map`, `slice`, `one_of`) and presence helpers
//! - `pattern` - Regex predicate built on `string()`

mod pattern;
mod typed;

pub use pattern::regex;
pub use typed::{boolean, float, int, map, one_of, optional, present, slice, string};

use crate::failure::Mismatch;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type CheckFn = dyn Fn(Option<&Value>) -> Result<(), Mismatch> + Send + Sync;

/// A deferred check over an actual value.
///
/// Cloning is cheap; clones share the same closure.
#[derive(Clone)]
pub struct Predicate {
    label: Arc<str>,
    check: Arc<CheckFn>,
}

impl Predicate {
    /// Wrap a closure as a predicate. The label shows up in `Debug` output.
    pub fn new<F>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<(), Mismatch> + Send + Sync + 'static,
    {
        Self {
            label: Arc::from(label.into()),
            check: Arc::new(check),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the predicate against an actual value (`None` when absent).
    pub fn check(&self, actual: Option<&Value>) -> Result<(), Mismatch> {
        (self.check)(actual)
    }

    /// Both predicates must pass. `next` only runs when `self` passes.
    pub fn then(self, next: Predicate) -> Predicate {
        let label = format!("{} and {}", self.label, next.label);
        Predicate::new(label, move |actual| {
            self.check(actual)?;
            next.check(actual)
        })
    }

    /// Try `self`, falling back to `next` when it fails.
    ///
    /// When both fail, both diagnostics are kept.
    pub fn or(self, next: Predicate) -> Predicate {
        let label = format!("{} or {}", self.label, next.label);
        Predicate::new(label, move |actual| match self.check(actual) {
            Ok(()) => Ok(()),
            Err(first) => next.check(actual).map_err(|second| Mismatch::Either {
                first: Box::new(first),
                second: Box::new(second),
            }),
        })
    }

    /// Shared identity check, used for equality of expectation trees.
    pub fn ptr_eq(&self, other: &Predicate) -> bool {
        Arc::ptr_eq(&self.check, &other.check)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.label)
    }
}

/// User-supplied predicate. An `Err(message)` becomes a failure at the
/// predicate's position.
pub fn func<F>(label: impl Into<String>, check: F) -> Predicate
where
    F: Fn(Option<&Value>) -> Result<(), String> + Send + Sync + 'static,
{
    Predicate::new(label, move |actual| check(actual).map_err(Mismatch::Custom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn positive() -> Predicate {
        func("positive", |actual| match actual.and_then(Value::as_i64) {
            Some(n) if n > 0 => Ok(()),
            _ => Err("expected a positive number".to_string()),
        })
    }

    #[test]
    fn test_func_predicate() {
        let p = positive();
        assert!(p.check(Some(&json!(3))).is_ok());
        assert_eq!(
            p.check(Some(&json!(-1))).unwrap_err(),
            Mismatch::Custom("expected a positive number".into())
        );
        assert!(p.check(None).is_err());
    }

    #[test]
    fn test_then_short_circuits() {
        let p = int([]).then(positive());
        assert!(p.check(Some(&json!(5))).is_ok());
        // type check fails first, the custom message is never produced
        assert_eq!(
            p.check(Some(&json!("5"))).unwrap_err().to_string(),
            "expected int, got string"
        );
        assert_eq!(
            p.check(Some(&json!(-5))).unwrap_err().to_string(),
            "expected a positive number"
        );
    }

    #[test]
    fn test_or_falls_back() {
        let p = int([1]).or(string(["one"]));
        assert!(p.check(Some(&json!(1))).is_ok());
        assert!(p.check(Some(&json!("one"))).is_ok());

        let err = p.check(Some(&json!("two"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"expected int, got string, or expected "one", got "two""#
        );
    }

    #[test]
    fn test_debug_shows_label() {
        let p = int([]).then(positive());
        assert_eq!(format!("{p:?}"), "Predicate(int and positive)");
    }

    #[test]
    fn test_clones_share_identity() {
        let p = positive();
        let q = p.clone();
        assert!(p.ptr_eq(&q));
        assert!(!p.ptr_eq(&positive()));
    }
}
