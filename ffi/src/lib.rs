//! QuickJS edge of the fetch bridge.
//!
//! # Overview
//! Gives scripts a browser-style `fetch(url, init)` that returns a promise.
//! The promise machinery lives in a script artifact (`js/fetch.js` by
//! default); underneath it calls one synchronous host function,
//! `fetch.hostFetchSync(url, options)`, which performs a single blocking
//! round trip through a `fetch_core::Transport`.
//!
//! # Design
//! - `decode` and `encode` are the only code that converts between
//!   interpreter values and core types.
//! - `bridge` holds the host function; it throws for malformed arguments and
//!   returns failed round trips as data (`errors` list, empty body).
//! - `engine::FetchRuntime` registers timers, the artifact and the bridge in
//!   that order, and drives jobs and timers on the caller's thread.
//!
//! ```no_run
//! use fetch_core::Transport;
//! use fetch_ffi::{FetchRuntime, ScriptArtifact};
//!
//! # fn main() -> Result<(), fetch_ffi::BridgeError> {
//! let rt = FetchRuntime::new(&ScriptArtifact::bundled(), Transport::origin("http://127.0.0.1:3000")?)?;
//! rt.eval("fetch('/').then(function (r) { return r.text(); }).then(console.log);")?;
//! rt.run_until_idle()?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod console;
pub mod decode;
pub mod encode;
pub mod engine;
pub mod error;
pub mod script;
pub mod timers;

pub use bridge::{bridge_function, fetch_sync, BRIDGE_FUNCTION};
pub use engine::{register, FetchRuntime, ENTRY_POINT};
pub use error::BridgeError;
pub use script::ScriptArtifact;
