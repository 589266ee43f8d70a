//! Golden file parser.
//!
//! A small line state machine: `Status -> (Headers) -> (Body)`. Parsing is
//! fail-fast; the first structural problem aborts the document.

use super::{GoldenBody, GoldenDocument};
use crate::response::Headers;
use serde_json::Value;
use std::fmt;

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("missing status line")]
    MissingStatus,
    #[error("invalid status {0:?}")]
    InvalidStatus(String),
    #[error("unexpected line {0:?}")]
    UnexpectedLine(String),
    #[error("duplicate \"--- {0}\" directive")]
    DuplicateDirective(&'static str),
    #[error("\"--- headers\" directive must precede \"--- body\"")]
    HeadersAfterBody,
    #[error("unknown directive {0:?}")]
    UnknownDirective(String),
    #[error("unknown option {option:?} in \"--- {directive}\" directive")]
    UnknownOption {
        directive: &'static str,
        option: String,
    },
    #[error("\"exact\" requires \"json\" in \"--- body\" directive")]
    ExactWithoutJson,
    #[error("invalid header line {0:?}")]
    InvalidHeaderLine(String),
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
}

/// A parse failure, with the 1-based line it was found on when it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: Option<usize>,
    pub kind: ParseErrorKind,
}

impl ParseError {
    fn at(line: usize, kind: ParseErrorKind) -> Self {
        Self {
            line: Some(line),
            kind,
        }
    }

    fn document(kind: ParseErrorKind) -> Self {
        Self { line: None, kind }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Status,
    AfterStatus,
    Headers,
    Body,
}

#[derive(Debug)]
enum Directive {
    Headers { exact: bool },
    Body { json: bool, exact: bool },
}

/// Split a `--- keyword options...` line. `None` for ordinary lines.
pub(super) fn directive_words(line: &str) -> Option<(String, Vec<String>)> {
    let rest = line.trim().strip_prefix("---")?;
    let mut words = rest.split_whitespace().map(str::to_ascii_lowercase);
    let keyword = words.next().unwrap_or_default();
    Some((keyword, words.collect()))
}

fn parse_directive(keyword: &str, options: &[String]) -> Result<Directive, ParseErrorKind> {
    let (name, allowed): (&'static str, &[&str]) = match keyword {
        "headers" => ("headers", &["exact"]),
        "body" => ("body", &["json", "exact"]),
        other => {
            return Err(ParseErrorKind::UnknownDirective(
                format!("--- {other}").trim_end().to_string(),
            ))
        }
    };
    if let Some(option) = options.iter().find(|o| !allowed.contains(&o.as_str())) {
        return Err(ParseErrorKind::UnknownOption {
            directive: name,
            option: option.clone(),
        });
    }
    let has = |flag: &str| options.iter().any(|o| o == flag);

    if name == "headers" {
        Ok(Directive::Headers {
            exact: has("exact"),
        })
    } else {
        let (json, exact) = (has("json"), has("exact"));
        if exact && !json {
            return Err(ParseErrorKind::ExactWithoutJson);
        }
        Ok(Directive::Body { json, exact })
    }
}

fn parse_status(line: &str) -> Result<u16, ParseError> {
    let text = line.trim();
    let invalid = || ParseError::document(ParseErrorKind::InvalidStatus(text.to_string()));
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    text.parse().map_err(|_| invalid())
}

fn parse_header(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, value.trim()))
}

/// Parse golden file text.
pub fn parse(text: &str) -> Result<GoldenDocument, ParseError> {
    let mut state = State::Status;
    let mut document = GoldenDocument::new(0);
    let mut body_lines: Vec<&str> = Vec::new();
    let mut body_json = false;
    let mut body_line = 0;

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;

        if state == State::Status {
            if !line.trim().is_empty() {
                document.status = parse_status(line)?;
                state = State::AfterStatus;
            }
            continue;
        }

        let words = directive_words(line);

        if state == State::Body {
            // Inside the body only the two real directives are special;
            // everything else, blank lines included, is body text.
            match words.as_ref().map(|(keyword, _)| keyword.as_str()) {
                Some("headers") => return Err(ParseError::at(number, ParseErrorKind::HeadersAfterBody)),
                Some("body") => {
                    return Err(ParseError::at(
                        number,
                        ParseErrorKind::DuplicateDirective("body"),
                    ))
                }
                _ => body_lines.push(line),
            }
            continue;
        }

        if let Some((keyword, options)) = words {
            match parse_directive(&keyword, &options).map_err(|kind| ParseError::at(number, kind))? {
                Directive::Headers { exact } => {
                    if document.headers.is_some() {
                        return Err(ParseError::at(
                            number,
                            ParseErrorKind::DuplicateDirective("headers"),
                        ));
                    }
                    document.headers = Some(Headers::new());
                    document.headers_exact = exact;
                    state = State::Headers;
                }
                Directive::Body { json, exact } => {
                    body_json = json;
                    body_line = number;
                    document.body_exact = exact;
                    state = State::Body;
                }
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        match (state, document.headers.as_mut()) {
            (State::Headers, Some(headers)) => {
                let (name, value) = parse_header(line).ok_or_else(|| {
                    ParseError::at(number, ParseErrorKind::InvalidHeaderLine(line.to_string()))
                })?;
                headers.append(name, value);
            }
            _ => {
                return Err(ParseError::at(
                    number,
                    ParseErrorKind::UnexpectedLine(line.to_string()),
                ))
            }
        }
    }

    if state == State::Status {
        return Err(ParseError::document(ParseErrorKind::MissingStatus));
    }

    if state == State::Body {
        while body_lines.last().is_some_and(|l| l.trim().is_empty()) {
            body_lines.pop();
        }
        let text = body_lines.join("\n");
        document.body = Some(if body_json {
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                ParseError::at(body_line, ParseErrorKind::InvalidJson(e.to_string()))
            })?;
            GoldenBody::Json(value)
        } else {
            GoldenBody::Text(text)
        });
    }

    Ok(document)
}
