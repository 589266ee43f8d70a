//! Regex predicate.

use super::{string, Predicate};
use crate::failure::Mismatch;
use crate::value::BuildError;
use regex::Regex;
use std::sync::Arc;

/// A string matching `pattern`.
///
/// The pattern is compiled here, so an invalid regex is reported when the
/// expectation is built rather than when it is matched.
pub fn regex(pattern: &str) -> Result<Predicate, BuildError> {
    let compiled = Arc::new(Regex::new(pattern)?);
    let source = pattern.to_string();
    let check = Predicate::new(format!("matches {pattern:?}"), move |actual| {
        // string() already rejected anything that is not a string
        let text = actual.and_then(|v| v.as_str()).unwrap_or_default();
        if compiled.is_match(text) {
            Ok(())
        } else {
            Err(Mismatch::Pattern {
                pattern: source.clone(),
                actual: text.to_string(),
            })
        }
    });
    Ok(string(Vec::<String>::new()).then(check))
}
