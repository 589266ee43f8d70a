//! Numeric coercions and type probing shared by the matcher, the scalar
//! predicates and bound references.
//!
//! Upstream JSON decoders disagree on how numbers come out (some produce
//! floats for everything), so integer and float expectations accept the other
//! representation as long as the conversion is lossless.
//!
//! Unsigned integers above `i64::MAX` have no integer representation here and
//! are treated as floats throughout.

use crate::failure::Mismatch;
use serde_json::Value;

/// Scalar type an expectation can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    String,
}

impl ScalarKind {
    /// Name used in failure messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
        }
    }
}

/// Dynamic type name of an actual value.
///
/// Absent values are reported as `nothing`.
pub fn type_name(actual: Option<&Value>) -> &'static str {
    match actual {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(n)) if is_float(n) => "float",
        Some(Value::Number(_)) => "int",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Floats, plus unsigned integers too large for an `i64`.
fn is_float(n: &serde_json::Number) -> bool {
    n.is_f64() || (n.is_u64() && n.as_i64().is_none())
}

/// Treat JSON `null` the same as a missing value.
#[inline]
pub fn present(actual: Option<&Value>) -> Option<&Value> {
    actual.filter(|v| !v.is_null())
}

/// Convert a float to an integer only when no information is lost.
pub fn float_to_int(f: f64) -> Option<i64> {
    // i64::MAX is not representable as f64; 2^63 is the first value out of range.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !f.is_finite() || f.trunc() != f || f >= LIMIT || f < -LIMIT {
        return None;
    }
    let i = f as i64;
    (i as f64 == f).then_some(i)
}

/// Convert an integer to a float only when it survives the round trip.
pub fn int_to_float(i: i64) -> Option<f64> {
    let f = i as f64;
    float_to_int(f).filter(|back| *back == i).map(|_| f)
}

/// Read a JSON value as an `i64`, accepting integral floats.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_int)),
        _ => None,
    }
}

/// Read a JSON value as an `f64`, accepting integers that convert losslessly.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) if is_float(n) => n.as_f64(),
        Value::Number(n) => n.as_i64().and_then(int_to_float),
        _ => None,
    }
}

/// Render a float for messages the way JSON would.
pub(crate) fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(f.to_string()))
}

/// Allow-list for a scalar check, borrowed from whatever node owns it.
#[derive(Debug, Clone, Copy)]
pub enum Allowed<'a> {
    Bool(&'a [bool]),
    Int(&'a [i64]),
    Float(&'a [f64]),
    String(&'a [String]),
}

impl Allowed<'_> {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Allowed::Bool(_) => ScalarKind::Bool,
            Allowed::Int(_) => ScalarKind::Int,
            Allowed::Float(_) => ScalarKind::Float,
            Allowed::String(_) => ScalarKind::String,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Allowed::Bool(v) => v.is_empty(),
            Allowed::Int(v) => v.is_empty(),
            Allowed::Float(v) => v.is_empty(),
            Allowed::String(v) => v.is_empty(),
        }
    }

    fn as_values(&self) -> Vec<Value> {
        match self {
            Allowed::Bool(v) => v.iter().map(|b| Value::Bool(*b)).collect(),
            Allowed::Int(v) => v.iter().map(|i| Value::from(*i)).collect(),
            Allowed::Float(v) => v.iter().map(|f| float_value(*f)).collect(),
            Allowed::String(v) => v.iter().map(|s| Value::String(s.clone())).collect(),
        }
    }
}

/// The scalar rule: type check with lossless numeric coercion, then an
/// optional allow-list check. An empty allow-list accepts any value of the type.
pub fn check_scalar(allowed: Allowed<'_>, actual: Option<&Value>) -> Result<(), Mismatch> {
    let kind = allowed.kind();
    let Some(value) = present(actual) else {
        return Err(Mismatch::Missing {
            expected: kind.name().to_string(),
        });
    };

    let type_mismatch = || Mismatch::TypeMismatch {
        expected: kind.name(),
        actual: type_name(Some(value)),
    };

    let matched = match allowed {
        Allowed::Bool(list) => {
            let b = value.as_bool().ok_or_else(type_mismatch)?;
            list.is_empty() || list.contains(&b)
        }
        Allowed::Int(list) => {
            let i = as_i64(value).ok_or_else(type_mismatch)?;
            list.is_empty() || list.contains(&i)
        }
        Allowed::Float(list) => {
            let f = as_f64(value).ok_or_else(type_mismatch)?;
            list.is_empty() || list.contains(&f)
        }
        Allowed::String(list) => {
            let s = value.as_str().ok_or_else(type_mismatch)?;
            list.is_empty() || list.iter().any(|allowed| allowed == s)
        }
    };

    if matched || allowed.is_empty() {
        Ok(())
    } else {
        Err(Mismatch::ValueMismatch {
            allowed: allowed.as_values(),
            actual: value.clone(),
        })
    }
}
