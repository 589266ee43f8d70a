//! Recursive comparison of an expectation tree against an actual value.
//!
//! Matching never stops at the first problem: objects and arrays collect every
//! nested failure so a single run shows every discrepancy. Predicates and
//! bound references are atomic and produce at most one failure each.
//!
//! Two disciplines are supported:
//! - subset (`exact = false`): extra object keys and trailing array elements are ignored
//! - exact (`exact = true`): key sets and array lengths must match exactly

use crate::coerce::{self, check_scalar, Allowed};
use crate::failure::{Failure, Mismatch, PathSegment};
use crate::value::Expected;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

/// Compare `expected` against `actual` (`None` when the value is absent).
///
/// An empty result means the value matches.
pub fn match_value(expected: &Expected, actual: Option<&Value>, exact: bool) -> Vec<Failure> {
    let mut failures = Vec::new();
    visit(expected, actual, exact, &mut failures);
    failures
}

fn visit(expected: &Expected, actual: Option<&Value>, exact: bool, out: &mut Vec<Failure>) {
    trace!(kind = expected.kind(), actual = coerce::type_name(actual), "matching node");

    let result = match expected {
        Expected::Null => match coerce::present(actual) {
            None => Ok(()),
            Some(value) => Err(Mismatch::Unexpected {
                actual: value.clone(),
            }),
        },
        Expected::Bool(list) => check_scalar(Allowed::Bool(list), actual),
        Expected::Int(list) => check_scalar(Allowed::Int(list), actual),
        Expected::Float(list) => check_scalar(Allowed::Float(list), actual),
        Expected::String(list) => check_scalar(Allowed::String(list), actual),
        Expected::Predicate(predicate) => predicate.check(actual),
        Expected::Bound(binding) => binding.check(actual),
        Expected::Object(fields) => {
            match_object(fields, actual, exact, out);
            return;
        }
        Expected::Array(items) => {
            match_array(items, actual, exact, out);
            return;
        }
    };

    if let Err(cause) = result {
        out.push(Failure::new(cause));
    }
}

fn container_mismatch(expected: &'static str, actual: Option<&Value>) -> Mismatch {
    match coerce::present(actual) {
        None => Mismatch::Missing {
            expected: expected.to_string(),
        },
        Some(value) => Mismatch::TypeMismatch {
            expected,
            actual: coerce::type_name(Some(value)),
        },
    }
}

/// Run `visit` for a child and nest its failures under `segment`.
fn visit_child(
    segment: PathSegment,
    expected: &Expected,
    actual: Option<&Value>,
    exact: bool,
    out: &mut Vec<Failure>,
) {
    let mut nested = Vec::new();
    visit(expected, actual, exact, &mut nested);
    out.extend(nested.into_iter().map(|f| f.within(segment.clone())));
}

fn match_object(
    fields: &BTreeMap<String, Expected>,
    actual: Option<&Value>,
    exact: bool,
    out: &mut Vec<Failure>,
) {
    let Some(Value::Object(actual_fields)) = coerce::present(actual) else {
        out.push(Failure::new(container_mismatch("object", actual)));
        return;
    };

    if exact {
        if let Some(cause) = key_set_mismatch(fields, actual_fields) {
            out.push(Failure::new(cause));
        }
    }

    // BTreeMap order keeps multi-failure output stable between runs.
    for (key, expected) in fields {
        visit_child(
            PathSegment::Key(key.clone()),
            expected,
            actual_fields.get(key),
            exact,
            out,
        );
    }
}

fn key_set_mismatch(
    expected: &BTreeMap<String, Expected>,
    actual: &Map<String, Value>,
) -> Option<Mismatch> {
    let missing: Vec<String> = expected
        .keys()
        .filter(|k| !actual.contains_key(k.as_str()))
        .cloned()
        .collect();
    let mut unexpected: Vec<String> = actual
        .keys()
        .filter(|k| !expected.contains_key(k.as_str()))
        .cloned()
        .collect();
    unexpected.sort();

    if missing.is_empty() && unexpected.is_empty() {
        None
    } else {
        Some(Mismatch::KeySet {
            missing,
            unexpected,
        })
    }
}

fn match_array(items: &[Expected], actual: Option<&Value>, exact: bool, out: &mut Vec<Failure>) {
    let Some(Value::Array(actual_items)) = coerce::present(actual) else {
        out.push(Failure::new(container_mismatch("array", actual)));
        return;
    };

    if actual_items.len() < items.len() {
        out.push(Failure::new(Mismatch::TooFewElements {
            expected: items.len(),
            actual: actual_items.len(),
        }));
    } else if exact && actual_items.len() != items.len() {
        out.push(Failure::new(Mismatch::LengthMismatch {
            expected: items.len(),
            actual: actual_items.len(),
        }));
    }

    // Missing trailing elements are already covered by TooFewElements.
    for (index, (expected, actual)) in items.iter().zip(actual_items).enumerate() {
        visit_child(PathSegment::Index(index), expected, Some(actual), exact, out);
    }
}
