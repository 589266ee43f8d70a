//! Type-checked predicate constructors.
//!
//! The scalar constructors apply exactly the same rule as a literal of the
//! same type in an expectation tree, so the two are interchangeable.

use super::Predicate;
use crate::coerce::{self, check_scalar, Allowed};
use crate::failure::Mismatch;
use serde_json::Value;

fn label_for<T: std::fmt::Debug>(kind: &str, values: &[T]) -> String {
    if values.is_empty() {
        kind.to_string()
    } else {
        format!("{kind} in {values:?}")
    }
}

/// A bool, optionally restricted to `values`.
pub fn boolean(values: impl IntoIterator<Item = bool>) -> Predicate {
    let values: Vec<bool> = values.into_iter().collect();
    Predicate::new(label_for("bool", &values), move |actual| {
        check_scalar(Allowed::Bool(&values), actual)
    })
}

/// An integer (integral floats included), optionally restricted to `values`.
pub fn int(values: impl IntoIterator<Item = i64>) -> Predicate {
    let values: Vec<i64> = values.into_iter().collect();
    Predicate::new(label_for("int", &values), move |actual| {
        check_scalar(Allowed::Int(&values), actual)
    })
}

/// A float (losslessly convertible integers included), optionally restricted to `values`.
pub fn float(values: impl IntoIterator<Item = f64>) -> Predicate {
    let values: Vec<f64> = values.into_iter().collect();
    Predicate::new(label_for("float", &values), move |actual| {
        check_scalar(Allowed::Float(&values), actual)
    })
}

/// A string, optionally restricted to `values`.
pub fn string<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Predicate {
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    Predicate::new(label_for("string", &values), move |actual| {
        check_scalar(Allowed::String(&values), actual)
    })
}

/// Any JSON object. Chain with `then` to inspect its contents.
pub fn map() -> Predicate {
    Predicate::new("map", |actual| match coerce::present(actual) {
        Some(Value::Object(_)) => Ok(()),
        Some(other) => Err(Mismatch::TypeMismatch {
            expected: "object",
            actual: coerce::type_name(Some(other)),
        }),
        None => Err(Mismatch::Missing {
            expected: "object".to_string(),
        }),
    })
}

/// Any JSON array. Chain with `then` to inspect its elements.
pub fn slice() -> Predicate {
    Predicate::new("slice", |actual| match coerce::present(actual) {
        Some(Value::Array(_)) => Ok(()),
        Some(other) => Err(Mismatch::TypeMismatch {
            expected: "array",
            actual: coerce::type_name(Some(other)),
        }),
        None => Err(Mismatch::Missing {
            expected: "array".to_string(),
        }),
    })
}

fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => {
            a == b || matches!((coerce::as_f64(a), coerce::as_f64(b)), (Some(x), Some(y)) if x == y)
        }
        _ => a == b,
    }
}

/// The actual value must equal one of `values`, whatever its type.
pub fn one_of(values: impl IntoIterator<Item = Value>) -> Predicate {
    let values: Vec<Value> = values.into_iter().collect();
    let label = format!("one of {}", Value::Array(values.clone()));
    Predicate::new(label, move |actual| {
        let Some(value) = coerce::present(actual) else {
            return Err(Mismatch::Missing {
                expected: format!("one of {}", Value::Array(values.clone())),
            });
        };
        if values.iter().any(|allowed| json_equal(allowed, value)) {
            Ok(())
        } else {
            Err(Mismatch::ValueMismatch {
                allowed: values.clone(),
                actual: value.clone(),
            })
        }
    })
}

/// Absent (or null) passes; anything else must satisfy `inner`.
pub fn optional(inner: Predicate) -> Predicate {
    let label = format!("optional {}", inner.label());
    Predicate::new(label, move |actual| match coerce::present(actual) {
        None => Ok(()),
        some => inner.check(some),
    })
}

/// Anything except absent or null.
pub fn present() -> Predicate {
    Predicate::new("present", |actual| match coerce::present(actual) {
        Some(_) => Ok(()),
        None => Err(Mismatch::Missing {
            expected: "a value".to_string(),
        }),
    })
}
