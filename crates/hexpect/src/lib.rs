//! Declarative assertions over HTTP responses.
//!
//! A test case describes the response it expects as an [`Expected`] tree:
//! literal values, allow-lists, composable [`Predicate`]s and named
//! [`Binding`]s that capture a value from one response and assert it in the
//! next. [`match_value`] compares the tree against decoded JSON and reports
//! every discrepancy with the path of the field that failed.
//!
//! Expectations can also be kept on disk as golden files (see [`golden`]).
//!
//! # Example
//!
//! ```
//! use hexpect::{predicate, ActualResponse, Expectation, Expected, Values};
//!
//! let values = Values::new();
//! let created = Expectation::new().status(201).body(
//!     Expected::object()
//!         .field("id", values.bind_string("user_id"))
//!         .field("email", predicate::regex(r"@example\.com$").unwrap())
//!         .build()
//!         .unwrap(),
//!     false,
//! );
//!
//! let response = ActualResponse::new(
//!     201,
//!     Default::default(),
//!     r#"{"id": "u-1", "email": "ada@example.com"}"#,
//! );
//! assert!(created.check(&response).is_empty());
//! assert_eq!(values.get_string("user_id"), "u-1");
//! ```

pub mod binding;
pub mod coerce;
pub mod failure;
pub mod golden;
pub mod matcher;
pub mod predicate;
pub mod response;
pub mod value;

pub use binding::{Binding, SlotKind, Values};
pub use failure::{Failure, Mismatch, PathSegment};
pub use golden::{GoldenBody, GoldenDocument, GoldenError};
pub use matcher::match_value;
pub use predicate::Predicate;
pub use response::{ActualResponse, BodyExpectation, Expectation, Headers};
pub use value::{BuildError, Expected};
