//! Error type for the interpreter edge.
//!
//! # Design
//! `BridgeError` covers everything that can go wrong between the call frame
//! and the core: option decoding, request construction, response encoding,
//! and failures while loading or driving the script runtime. Inside the
//! bridge call every variant is turned into a thrown script `Error`; a
//! pending `Js` exception is re-raised as-is so the script sees the original.

use std::io;
use std::path::PathBuf;

use fetch_core::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The options argument is not a valid `{method?, headers?, body?}`.
    #[error("invalid fetch options: {0}")]
    Options(String),

    /// The request could not be constructed from the decoded arguments.
    #[error(transparent)]
    Request(#[from] FetchError),

    /// The response could not be serialized for the interpreter.
    #[error("encoding response: {0}")]
    Encode(#[source] serde_json::Error),

    /// Script code raised an uncaught exception.
    #[error("script error: {0}")]
    Script(String),

    /// A queued promise job raised an exception.
    #[error("pending job: {0}")]
    Job(String),

    /// The script artifact ran but did not define the fetch entry point.
    #[error("script artifact does not define `{0}`")]
    MissingEntryPoint(&'static str),

    #[error("reading script artifact {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Js(#[from] rquickjs::Error),
}
