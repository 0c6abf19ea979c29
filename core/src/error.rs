//! Error types for building and executing fetch requests.
//!
//! # Design
//! Errors fall into two families. Request errors (bad method, URL or header)
//! mean the call itself was malformed and are raised back into the script.
//! Network errors (transport, body read, redirect, handler panic) mean the request was
//! well formed but no usable response came back; the bridge embeds those in
//! the response's `errors` list instead of raising. `FetchError::kind` is the
//! single place that decides which family a variant belongs to.
//!
//! Network messages always start with `"<METHOD> <url>: "` so the failing
//! host is visible to the script without any extra context.

use thiserror::Error;

/// Which side of the failure policy an error falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The request could not be constructed. Raised as a script error.
    Request,
    /// The round trip failed. Embedded in the response object.
    Network,
}

/// Errors produced while constructing or executing a request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The method is not a valid HTTP token.
    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    /// The URL (or configured origin) could not be parsed.
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A header name or value is not valid on the wire.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// Connection, DNS or protocol failure.
    #[error("{method} {url}: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// The response arrived but its payload could not be read.
    #[error("{method} {url}: reading body: {source}")]
    Body {
        method: String,
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// A redirect could not be followed: a bad `Location` or too many hops.
    #[error("{method} {url}: redirect: {reason}")]
    Redirect {
        method: String,
        url: String,
        reason: String,
    },

    /// An in-process handler panicked while serving the request.
    #[error("{method} {url}: handler panicked")]
    HandlerPanicked { method: String, url: String },
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidMethod(_)
            | FetchError::InvalidUrl { .. }
            | FetchError::InvalidHeader { .. } => FetchErrorKind::Request,
            FetchError::Transport { .. }
            | FetchError::Body { .. }
            | FetchError::Redirect { .. }
            | FetchError::HandlerPanicked { .. } => FetchErrorKind::Network,
        }
    }

    pub fn is_network(&self) -> bool {
        self.kind() == FetchErrorKind::Network
    }
}
