//! The script artifact that defines the public fetch API.
//!
//! # Design
//! The artifact is an explicit value: callers load it once (bundled, from a
//! file, or from a string) and hand it to `FetchRuntime::new`. Nothing is
//! cached process-wide, so two runtimes may run different artifacts.

use std::fs;
use std::path::Path;

use crate::error::BridgeError;

const BUNDLED_FETCH_JS: &str = include_str!("../js/fetch.js");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptArtifact {
    name: String,
    source: String,
}

impl ScriptArtifact {
    /// The fetch implementation shipped with this crate.
    pub fn bundled() -> Self {
        Self::from_source("fetch.js", BUNDLED_FETCH_JS)
    }

    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| BridgeError::Artifact {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_source(path.display().to_string(), source))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}
