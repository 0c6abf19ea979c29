//! Wire DTOs for the options structure scripts pass to the bridge.
//!
//! # Design
//! `RequestOptions` is the serde shape of the second bridge argument after it
//! has been flattened to JSON on the interpreter side. Every field is
//! optional; defaults are applied later by `RequestDescriptor::new` so that
//! the DTO stays a faithful picture of what the script sent. Unknown fields
//! (`mode`, `credentials`, ...) are ignored so browser-style option objects
//! decode without complaint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Options accepted by the bridge: `{method?, headers?, body?}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, HeaderValues>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// A header given either as a single string or as a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            HeaderValues::One(value) => vec![value],
            HeaderValues::Many(values) => values,
        }
    }
}
