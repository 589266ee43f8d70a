//! Golden files: a line-oriented text encoding of an expected response.
//!
//! ```text
//! 200
//! --- headers exact
//! Content-Type: application/json
//! --- body json
//! {"id": 1}
//! ```
//!
//! The first non-blank line is the status code. An optional `--- headers`
//! block of `Name: value` lines follows, then an optional `--- body` block
//! that runs to the end of the file. `--- body json` decodes the block as
//! JSON; `exact` switches the block to exact matching (for bodies only in
//! combination with `json`).
//!
//! Trailing blank lines of a text body are not kept, and a text body cannot
//! contain a line that reads as a `--- headers` or `--- body` directive.
//! [`GoldenDocument::validate`] reports documents that would not survive a
//! write followed by a read; [`store`] refuses them.

mod parser;
mod writer;

pub use parser::{parse, ParseError, ParseErrorKind};

use parser::directive_words;

use crate::response::{BodyExpectation, Expectation, Headers};
use crate::value::Expected;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Body block of a golden file.
#[derive(Debug, Clone, PartialEq)]
pub enum GoldenBody {
    /// `--- body`: literal text.
    Text(String),
    /// `--- body json`: decoded JSON.
    Json(Value),
}

impl GoldenBody {
    /// A text body in the form the parser reads back: trailing blank lines
    /// dropped, line endings as `\n`.
    pub fn text(text: impl AsRef<str>) -> Self {
        let mut lines: Vec<&str> = text.as_ref().lines().collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        GoldenBody::Text(lines.join("\n"))
    }
}

/// Why a document cannot be written as a golden file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unrepresentable {
    #[error("header {name:?} with value {value:?} cannot be written as a header line")]
    Header { name: String, value: String },
    #[error("text body line {line} reads as a directive: {text:?}")]
    DirectiveInBody { line: usize, text: String },
    #[error("text body has trailing blank lines or carriage returns")]
    TextNotNormalized,
}

/// A parsed golden file.
#[derive(Debug, Clone, PartialEq)]
pub struct GoldenDocument {
    pub status: u16,
    pub headers: Option<Headers>,
    pub headers_exact: bool,
    pub body: Option<GoldenBody>,
    pub body_exact: bool,
}

impl GoldenDocument {
    /// A document with only a status line.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: None,
            headers_exact: false,
            body: None,
            body_exact: false,
        }
    }

    /// The runtime expectation described by this document.
    pub fn expectation(&self) -> Expectation {
        let body = self.body.as_ref().map(|body| match body {
            GoldenBody::Text(text) => BodyExpectation::Text(text.clone()),
            GoldenBody::Json(value) => BodyExpectation::Value(Expected::from(value)),
        });
        Expectation {
            status: Some(self.status),
            headers: self.headers.clone(),
            headers_exact: self.headers_exact,
            body,
            body_exact: self.body_exact,
        }
    }

    /// Check that writing this document and parsing it back gives it back.
    pub fn validate(&self) -> Result<(), Unrepresentable> {
        if let Some(headers) = &self.headers {
            for (name, values) in headers.iter() {
                let bad_name = name.is_empty()
                    || name.contains(|c: char| c == ':' || c.is_whitespace())
                    || name.starts_with("---");
                for value in values {
                    let bad_value = value.trim() != value.as_str() || value.contains(['\n', '\r']);
                    if bad_name || bad_value {
                        return Err(Unrepresentable::Header {
                            name: name.to_string(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }

        if let Some(GoldenBody::Text(text)) = &self.body {
            for (index, line) in text.lines().enumerate() {
                if let Some((keyword, _)) = directive_words(line) {
                    if keyword == "headers" || keyword == "body" {
                        return Err(Unrepresentable::DirectiveInBody {
                            line: index + 1,
                            text: line.to_string(),
                        });
                    }
                }
            }
            if GoldenBody::text(text) != GoldenBody::Text(text.clone()) {
                return Err(Unrepresentable::TextNotNormalized);
            }
        }

        Ok(())
    }
}

/// Why a golden file could not be loaded or stored.
#[derive(Debug, thiserror::Error)]
pub enum GoldenError {
    #[error("golden file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("golden file {path:?}: {source}")]
    Unrepresentable {
        path: PathBuf,
        #[source]
        source: Unrepresentable,
    },
    #[error("golden file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GoldenError {
    pub fn path(&self) -> &Path {
        match self {
            GoldenError::Parse { path, .. }
            | GoldenError::Unrepresentable { path, .. }
            | GoldenError::Io { path, .. } => path,
        }
    }

    /// The parse error, when the file was readable.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            GoldenError::Parse { source, .. } => Some(source),
            GoldenError::Unrepresentable { .. } | GoldenError::Io { .. } => None,
        }
    }
}

/// Parse in-memory text, naming it `name` in errors.
pub fn parse_named(name: impl Into<PathBuf>, text: &str) -> Result<GoldenDocument, GoldenError> {
    parse(text).map_err(|source| GoldenError::Parse {
        path: name.into(),
        source,
    })
}

/// Read and parse a golden file. Files are re-read on every call.
pub fn load(path: impl AsRef<Path>) -> Result<GoldenDocument, GoldenError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| GoldenError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_named(path, &text)?;
    debug!(path = %path.display(), status = document.status, "loaded golden file");
    Ok(document)
}

/// Serialize `document` to `path`. Nothing is written when the document
/// fails [`GoldenDocument::validate`].
pub fn store(path: impl AsRef<Path>, document: &GoldenDocument) -> Result<(), GoldenError> {
    let path = path.as_ref();
    document
        .validate()
        .map_err(|source| GoldenError::Unrepresentable {
            path: path.to_path_buf(),
            source,
        })?;
    std::fs::write(path, document.to_string()).map_err(|source| GoldenError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl fmt::Display for GoldenDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writer::write_document(f, self)
    }
}
