//! Recorded responses: a JSON capture of a response to check offline.
//!
//! ```json
//! {
//!   "status": 200,
//!   "headers": {"Content-Type": "application/json", "Set-Cookie": ["a=1", "b=2"]},
//!   "body": {"id": 1}
//! }
//! ```
//!
//! A string body is taken as raw text, any other JSON body is re-encoded, and
//! a missing or null body is empty.

use anyhow::Context;
use hexpect::{ActualResponse, Headers};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordedResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValues>,
    #[serde(default)]
    pub body: Value,
}

impl RecordedResponse {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recorded response {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid recorded response {}", path.display()))
    }

    pub fn into_actual(self) -> ActualResponse {
        let mut headers = Headers::new();
        for (name, values) in self.headers {
            match values {
                HeaderValues::One(value) => headers.append(name, value),
                HeaderValues::Many(values) => {
                    for value in values {
                        headers.append(name.clone(), value);
                    }
                }
            }
        }

        let body = match self.body {
            Value::Null => Vec::new(),
            Value::String(text) => text.into_bytes(),
            other => other.to_string().into_bytes(),
        };

        ActualResponse::new(self.status, headers, body)
    }
}
