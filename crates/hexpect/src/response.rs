//! The HTTP exchange as seen by the matcher.
//!
//! Whatever client or in-process handler produced the response, the matcher
//! only needs its status, its headers as an ordered multimap and its raw body.

use crate::failure::{Failure, Mismatch};
use crate::matcher::match_value;
use crate::value::Expected;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::debug;

/// Ordered multimap of header names to values.
///
/// Names keep the spelling of their first occurrence and are compared
/// case-insensitively. Appending to an existing name adds a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Values for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// First value for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowercased names mapped to arrays of values, the shape the matcher sees.
    fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .entries
            .iter()
            .map(|(name, values)| {
                let values = values.iter().cloned().map(Value::String).collect();
                (name.to_ascii_lowercase(), Value::Array(values))
            })
            .collect();
        Value::Object(fields)
    }

    fn to_expected(&self) -> Expected {
        Expected::Object(
            self.entries
                .iter()
                .map(|(name, values)| {
                    let values = values.iter().map(|v| Expected::from(v.as_str())).collect();
                    (name.to_ascii_lowercase(), Expected::Array(values))
                })
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Decode a raw body: a JSON object, else a JSON array, else the raw text.
///
/// An empty body decodes to nothing.
pub fn decode_body(raw: &[u8]) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(raw) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => Some(Value::String(String::from_utf8_lossy(raw).into_owned())),
    }
}

/// A response received from the system under test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActualResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl ActualResponse {
    pub fn new(status: u16, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// The body in the generic JSON value space.
    pub fn decoded_body(&self) -> Option<Value> {
        decode_body(&self.body)
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// What a body should be.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyExpectation {
    /// Literal text, compared with the raw body.
    Text(String),
    /// An expectation tree, compared with the decoded body.
    Value(Expected),
}

impl From<Expected> for BodyExpectation {
    fn from(expected: Expected) -> Self {
        BodyExpectation::Value(expected)
    }
}

/// Everything a single test case asserts about a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expectation {
    pub status: Option<u16>,
    pub headers: Option<Headers>,
    pub headers_exact: bool,
    pub body: Option<BodyExpectation>,
    pub body_exact: bool,
}

impl Expectation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn headers(mut self, headers: Headers, exact: bool) -> Self {
        self.headers = Some(headers);
        self.headers_exact = exact;
        self
    }

    pub fn body(mut self, body: impl Into<BodyExpectation>, exact: bool) -> Self {
        self.body = Some(body.into());
        self.body_exact = exact;
        self
    }

    pub fn text_body(self, text: impl Into<String>) -> Self {
        self.body(BodyExpectation::Text(text.into()), false)
    }

    /// Every mismatch between this expectation and `actual`. Empty means pass.
    ///
    /// Paths are rooted at `status`, `headers` or `body`.
    pub fn check(&self, actual: &ActualResponse) -> Vec<Failure> {
        let mut failures = Vec::new();

        if let Some(status) = self.status {
            if status != actual.status {
                failures.push(
                    Failure::new(Mismatch::ValueMismatch {
                        allowed: vec![Value::from(status)],
                        actual: Value::from(actual.status),
                    })
                    .within("status"),
                );
            }
        }

        if let Some(headers) = &self.headers {
            let actual_headers = actual.headers.to_json();
            failures.extend(
                match_value(
                    &headers.to_expected(),
                    Some(&actual_headers),
                    self.headers_exact,
                )
                .into_iter()
                .map(|f| f.within("headers")),
            );
        }

        match &self.body {
            Some(BodyExpectation::Text(text)) => {
                let body = actual.text();
                let trimmed = body.trim_end_matches(['\r', '\n']);
                if trimmed != text.trim_end_matches(['\r', '\n']) {
                    failures.push(
                        Failure::new(Mismatch::ValueMismatch {
                            allowed: vec![Value::String(text.clone())],
                            actual: Value::String(trimmed.to_string()),
                        })
                        .within("body"),
                    );
                }
            }
            Some(BodyExpectation::Value(expected)) => {
                let decoded = actual.decoded_body();
                failures.extend(
                    match_value(expected, decoded.as_ref(), self.body_exact)
                        .into_iter()
                        .map(|f| f.within("body")),
                );
            }
            None => {}
        }

        debug!(
            status = actual.status,
            failures = failures.len(),
            "checked response"
        );
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Values;
    use serde_json::json;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> ActualResponse {
        ActualResponse::new(
            status,
            headers.iter().copied().collect(),
            body.as_bytes().to_vec(),
        )
    }

    fn messages(failures: &[Failure]) -> Vec<String> {
        failures.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_headers_multimap() {
        let mut headers = Headers::new();
        headers.append("X-Id", "a");
        headers.append("Content-Type", "text/plain");
        headers.append("x-id", "b");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("X-ID"), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(headers.first("content-type"), Some("text/plain"));
        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["X-Id", "Content-Type"]);
    }

    #[test]
    fn test_decode_order() {
        assert_eq!(decode_body(br#"{"a":1}"#), Some(json!({"a": 1})));
        assert_eq!(decode_body(b"[1,2]"), Some(json!([1, 2])));
        // scalars stay raw text
        assert_eq!(decode_body(b"42"), Some(json!("42")));
        assert_eq!(decode_body(b"\"quoted\""), Some(json!("\"quoted\"")));
        assert_eq!(decode_body(b"{broken"), Some(json!("{broken")));
        assert_eq!(decode_body(b""), None);
    }

    #[test]
    fn test_full_expectation_passes() {
        let expectation = Expectation::new()
            .status(200)
            .headers([("Content-Type", "application/json")].into_iter().collect(), false)
            .body(Expected::from(json!({"id": 1})), false);
        let actual = response(
            200,
            &[("content-type", "application/json"), ("date", "today")],
            r#"{"id": 1, "name": "x"}"#,
        );
        assert!(expectation.check(&actual).is_empty());
    }

    #[test]
    fn test_every_section_reports() {
        let expectation = Expectation::new()
            .status(201)
            .headers([("X-Trace", "abc")].into_iter().collect(), false)
            .body(Expected::from(json!({"id": 1})), true);
        let actual = response(200, &[("x-trace", "def")], r#"{"id": 2, "extra": true}"#);

        assert_eq!(
            messages(&expectation.check(&actual)),
            vec![
                "status: expected 201, got 200",
                r#"headers.x-trace[0]: expected "abc", got "def""#,
                "body: object keys differ: unexpected [extra]",
                "body.id: expected 1, got 2",
            ]
        );
    }

    #[test]
    fn test_exact_headers() {
        let expected: Headers = [("X-A", "1")].into_iter().collect();
        let actual = response(200, &[("x-a", "1"), ("x-b", "2")], "");

        assert!(Expectation::new()
            .headers(expected.clone(), false)
            .check(&actual)
            .is_empty());
        assert_eq!(
            messages(&Expectation::new().headers(expected, true).check(&actual)),
            vec!["headers: object keys differ: unexpected [x-b]"]
        );
    }

    #[test]
    fn test_repeated_header_values() {
        let expected: Headers = [("Set-Cookie", "a=1")].into_iter().collect();
        let actual = response(200, &[("set-cookie", "a=1"), ("set-cookie", "b=2")], "");
        assert!(Expectation::new()
            .headers(expected.clone(), false)
            .check(&actual)
            .is_empty());
        assert_eq!(
            messages(&Expectation::new().headers(expected, true).check(&actual)),
            vec!["headers.set-cookie: expected exactly 1 elements, got 2"]
        );
    }

    #[test]
    fn test_text_body() {
        let expectation = Expectation::new().text_body("hello\nworld");
        assert!(expectation
            .check(&response(200, &[], "hello\nworld\n"))
            .is_empty());
        assert_eq!(
            messages(&expectation.check(&response(200, &[], "bye"))),
            vec![r#"body: expected "hello\nworld", got "bye""#]
        );
    }

    #[test]
    fn test_missing_body() {
        let expectation = Expectation::new().body(Expected::from(json!({"id": 1})), false);
        assert_eq!(
            messages(&expectation.check(&response(204, &[], ""))),
            vec!["body: expected object, got nothing"]
        );
    }

    #[test]
    fn test_binding_flows_between_responses() {
        let values = Values::new();
        let create = Expectation::new().status(201).body(
            Expected::object()
                .field("id", values.bind_string("user_id"))
                .build()
                .unwrap(),
            false,
        );
        let fetch = Expectation::new().status(200).body(
            Expected::object()
                .field("id", values.bind_string("user_id"))
                .build()
                .unwrap(),
            false,
        );

        assert!(create
            .check(&response(201, &[], r#"{"id": "u-1"}"#))
            .is_empty());
        assert_eq!(values.get_string("user_id"), "u-1");
        assert!(fetch.check(&response(200, &[], r#"{"id": "u-1"}"#)).is_empty());
        assert_eq!(
            messages(&fetch.check(&response(200, &[], r#"{"id": "u-2"}"#))),
            vec![r#"body.id: expected "u-1", got "u-2""#]
        );
    }
}
