//! Interpreter-independent core of the script fetch bridge.
//!
//! # Overview
//! Turns decoded `(url, options)` arguments into a validated
//! `RequestDescriptor`, carries it through a `Transport`, and returns a
//! `ResponseDescriptor` ready to be serialized back into the script.
//!
//! # Design
//! - Nothing here knows about the interpreter; the edge crate owns the
//!   stack-to-struct decoding and the struct-to-value encoding.
//! - `Transport` is immutable configuration. Each call builds its own
//!   request and response, so sequential calls never share state.
//! - Request errors and network errors are split by `FetchError::kind`;
//!   `Transport::exchange` folds network errors into the response.

pub mod descriptor;
pub mod error;
pub mod transport;
pub mod types;

pub use descriptor::{parse_url, status_text, HeaderMultiMap, RequestDescriptor, ResponseDescriptor};
pub use error::{FetchError, FetchErrorKind};
pub use transport::{Handler, Origin, Transport, MAX_REDIRECTS};
pub use types::{HeaderValues, RequestOptions};
