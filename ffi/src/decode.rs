//! Request Decoder: call-frame arguments to a `RequestDescriptor`.
//!
//! # Design
//! The options value is flattened with the interpreter's own
//! `JSON.stringify` and deserialized into `RequestOptions` in one step, so
//! the rest of the bridge only ever sees typed data. Decoding is
//! all-or-nothing and touches no state besides the interpreter's JSON
//! machinery.

use fetch_core::{RequestDescriptor, RequestOptions};
use rquickjs::{Ctx, Value};

use crate::error::BridgeError;

/// Decode `(url, options)` into a validated request.
pub fn decode_request<'js>(
    ctx: &Ctx<'js>,
    url: &str,
    options: Option<Value<'js>>,
) -> Result<RequestDescriptor, BridgeError> {
    let options = decode_options(ctx, options)?;
    Ok(RequestDescriptor::new(url, options)?)
}

/// Decode the options argument. `undefined` and `null` mean "no options".
pub fn decode_options<'js>(
    ctx: &Ctx<'js>,
    options: Option<Value<'js>>,
) -> Result<RequestOptions, BridgeError> {
    let Some(value) = options.filter(|v| !v.is_undefined() && !v.is_null()) else {
        return Ok(RequestOptions::default());
    };

    let Some(json) = ctx.json_stringify(value)? else {
        return Err(BridgeError::Options(
            "options must be a JSON-serializable object".to_string(),
        ));
    };
    let json = json.to_string()?;

    serde_json::from_str(&json).map_err(|e| BridgeError::Options(e.to_string()))
}
