//! The expectation tree.
//!
//! An [`Expected`] node describes what one position of an actual value should
//! look like. Literal nodes are checked by the matcher, predicate nodes check
//! themselves, and bound nodes read or write a slot in a [`Values`] registry.
//!
//! [`Values`]: crate::binding::Values

use crate::binding::Binding;
use crate::predicate::Predicate;
use serde_json::Value;
use std::collections::BTreeMap;

/// Errors raised while building an expectation tree.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("duplicate object key {0:?}")]
    DuplicateKey(String),
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// One node of an expectation tree.
///
/// Scalar variants hold an allow-list: a literal is a one-element list and an
/// empty list accepts any value of the type.
#[derive(Debug, Clone)]
pub enum Expected {
    /// Nothing may be present here (absent or JSON null).
    Null,
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    String(Vec<String>),
    Object(BTreeMap<String, Expected>),
    Array(Vec<Expected>),
    Predicate(Predicate),
    Bound(Binding),
}

impl Expected {
    /// Start building an object node.
    pub fn object() -> ObjectBuilder {
        ObjectBuilder::default()
    }

    pub fn array(items: impl IntoIterator<Item = impl Into<Expected>>) -> Self {
        Expected::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn bools(values: impl IntoIterator<Item = bool>) -> Self {
        Expected::Bool(values.into_iter().collect())
    }

    pub fn ints(values: impl IntoIterator<Item = i64>) -> Self {
        Expected::Int(values.into_iter().collect())
    }

    pub fn floats(values: impl IntoIterator<Item = f64>) -> Self {
        Expected::Float(values.into_iter().collect())
    }

    pub fn strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Expected::String(values.into_iter().map(Into::into).collect())
    }

    pub fn any_bool() -> Self {
        Expected::Bool(Vec::new())
    }

    pub fn any_int() -> Self {
        Expected::Int(Vec::new())
    }

    pub fn any_float() -> Self {
        Expected::Float(Vec::new())
    }

    pub fn any_string() -> Self {
        Expected::String(Vec::new())
    }

    /// Short name of the node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Expected::Null => "nothing",
            Expected::Bool(_) => "bool",
            Expected::Int(_) => "int",
            Expected::Float(_) => "float",
            Expected::String(_) => "string",
            Expected::Object(_) => "object",
            Expected::Array(_) => "array",
            Expected::Predicate(_) => "predicate",
            Expected::Bound(_) => "binding",
        }
    }
}

impl PartialEq for Expected {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expected::Null, Expected::Null) => true,
            (Expected::Bool(a), Expected::Bool(b)) => a == b,
            (Expected::Int(a), Expected::Int(b)) => a == b,
            (Expected::Float(a), Expected::Float(b)) => a == b,
            (Expected::String(a), Expected::String(b)) => a == b,
            (Expected::Object(a), Expected::Object(b)) => a == b,
            (Expected::Array(a), Expected::Array(b)) => a == b,
            (Expected::Predicate(a), Expected::Predicate(b)) => a.ptr_eq(b),
            (Expected::Bound(a), Expected::Bound(b)) => a.same_slot(b),
            _ => false,
        }
    }
}

/// Builds an object node, rejecting re-declared keys.
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    fields: BTreeMap<String, Expected>,
    duplicate: Option<String>,
}

impl ObjectBuilder {
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Expected>) -> Self {
        let key = key.into();
        if self.fields.contains_key(&key) {
            self.duplicate.get_or_insert(key);
        } else {
            self.fields.insert(key, value.into());
        }
        self
    }

    pub fn build(self) -> Result<Expected, BuildError> {
        match self.duplicate {
            Some(key) => Err(BuildError::DuplicateKey(key)),
            None => Ok(Expected::Object(self.fields)),
        }
    }
}

impl TryFrom<Vec<(String, Expected)>> for Expected {
    type Error = BuildError;

    fn try_from(fields: Vec<(String, Expected)>) -> Result<Self, Self::Error> {
        fields
            .into_iter()
            .fold(Expected::object(), |builder, (k, v)| builder.field(k, v))
            .build()
    }
}

impl From<bool> for Expected {
    fn from(value: bool) -> Self {
        Expected::Bool(vec![value])
    }
}

impl From<i64> for Expected {
    fn from(value: i64) -> Self {
        Expected::Int(vec![value])
    }
}

impl From<i32> for Expected {
    fn from(value: i32) -> Self {
        Expected::Int(vec![i64::from(value)])
    }
}

impl From<u32> for Expected {
    fn from(value: u32) -> Self {
        Expected::Int(vec![i64::from(value)])
    }
}

impl From<f64> for Expected {
    fn from(value: f64) -> Self {
        Expected::Float(vec![value])
    }
}

impl From<&str> for Expected {
    fn from(value: &str) -> Self {
        Expected::String(vec![value.to_string()])
    }
}

impl From<String> for Expected {
    fn from(value: String) -> Self {
        Expected::String(vec![value])
    }
}

impl From<Vec<Expected>> for Expected {
    fn from(items: Vec<Expected>) -> Self {
        Expected::Array(items)
    }
}

impl From<Predicate> for Expected {
    fn from(predicate: Predicate) -> Self {
        Expected::Predicate(predicate)
    }
}

impl From<Binding> for Expected {
    fn from(binding: Binding) -> Self {
        Expected::Bound(binding)
    }
}

/// A decoded JSON document becomes a tree of literals.
impl From<Value> for Expected {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Expected::Null,
            Value::Bool(b) => Expected::Bool(vec![b]),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Expected::Int(vec![i]),
                None => Expected::Float(vec![n.as_f64().unwrap_or(f64::NAN)]),
            },
            Value::String(s) => Expected::String(vec![s]),
            Value::Array(items) => Expected::Array(items.into_iter().map(Expected::from).collect()),
            Value::Object(fields) => Expected::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Expected::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for Expected {
    fn from(value: &Value) -> Self {
        Expected::from(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate;
    use serde_json::json;

    #[test]
    fn test_object_builder() {
        let expected = Expected::object()
            .field("id", 7)
            .field("name", "widget")
            .field("tags", Expected::array(["a", "b"]))
            .build()
            .unwrap();

        let Expected::Object(fields) = expected else {
            panic!("expected an object node");
        };
        assert_eq!(fields["id"], Expected::Int(vec![7]));
        assert_eq!(fields["name"], Expected::String(vec!["widget".into()]));
        assert_eq!(
            fields["tags"],
            Expected::Array(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_duplicate_key_is_rejected_at_build_time() {
        let err = Expected::object()
            .field("id", 1)
            .field("id", 2)
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), r#"duplicate object key "id""#);

        let err = Expected::try_from(vec![
            ("a".to_string(), Expected::from(1)),
            ("a".to_string(), Expected::from(1)),
        ])
        .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateKey(k) if k == "a"));
    }

    #[test]
    fn test_from_json_literal_tree() {
        let expected = Expected::from(json!({"k": 1, "f": 1.5, "n": null, "l": [true]}));
        let want = Expected::object()
            .field("k", 1)
            .field("f", 1.5)
            .field("n", Expected::Null)
            .field("l", vec![Expected::from(true)])
            .build()
            .unwrap();
        assert_eq!(expected, want);
    }

    #[test]
    fn test_predicate_nodes_compare_by_identity() {
        let p = predicate::int([]);
        assert_eq!(Expected::from(p.clone()), Expected::from(p));
        assert_ne!(
            Expected::from(predicate::int([])),
            Expected::from(predicate::int([]))
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Expected::Null.kind(), "nothing");
        assert_eq!(Expected::any_float().kind(), "float");
        assert_eq!(Expected::from(predicate::present()).kind(), "predicate");
    }
}
