//! Structured match failures and their field paths.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// One step in a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Why a single node did not match.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Mismatch {
    #[error("expected {expected}, got nothing")]
    Missing { expected: String },

    #[error("expected nothing, got {actual}")]
    Unexpected { actual: Value },

    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("expected {}, got {actual}", render_allowed(.allowed))]
    ValueMismatch { allowed: Vec<Value>, actual: Value },

    #[error("object keys differ: {}", render_key_set(.missing, .unexpected))]
    KeySet {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("expected at least {expected} elements, got {actual}")]
    TooFewElements { expected: usize, actual: usize },

    #[error("expected exactly {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("{actual:?} does not match pattern {pattern:?}")]
    Pattern { pattern: String, actual: String },

    #[error("binding {name:?} holds {bound}, cannot be used as {requested}")]
    BindingConflict {
        name: String,
        bound: &'static str,
        requested: &'static str,
    },

    #[error("{first}, or {second}")]
    Either {
        first: Box<Mismatch>,
        second: Box<Mismatch>,
    },

    #[error("{0}")]
    Custom(String),
}

fn render_allowed(allowed: &[Value]) -> String {
    match allowed {
        [single] => single.to_string(),
        many => {
            let items: Vec<String> = many.iter().map(Value::to_string).collect();
            format!("one of [{}]", items.join(", "))
        }
    }
}

fn render_key_set(missing: &[String], unexpected: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing [{}]", missing.join(", ")));
    }
    if !unexpected.is_empty() {
        parts.push(format!("unexpected [{}]", unexpected.join(", ")));
    }
    parts.join(", ")
}

/// A mismatch located somewhere inside the actual value.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// Root-to-leaf path of the node that failed.
    pub path: Vec<PathSegment>,
    pub cause: Mismatch,
}

impl Failure {
    /// Failure at the current node (empty path).
    pub fn new(cause: Mismatch) -> Self {
        Self {
            path: Vec::new(),
            cause,
        }
    }

    /// Nest this failure under `segment`.
    ///
    /// Failures propagate outward, so each enclosing node prepends its own segment.
    pub fn within(mut self, segment: impl Into<PathSegment>) -> Self {
        self.path.insert(0, segment.into());
        self
    }

    /// Render the path as `a.b[0].c`.
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathSegment::Index(index) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    pub fn message(&self) -> String {
        self.cause.to_string()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.cause)
        } else {
            write!(f, "{}: {}", self.path_string(), self.cause)
        }
    }
}

impl Serialize for Failure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Failure", 2)?;
        state.serialize_field("path", &self.path_string())?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}
