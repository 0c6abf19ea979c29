//! Response Encoder: `ResponseDescriptor` to a plain script object.

use fetch_core::ResponseDescriptor;
use rquickjs::{Ctx, Value};

use crate::error::BridgeError;

/// Serialize `response` to JSON and parse it back as an interpreter value,
/// giving `{url, method, headers, body, status, statusText[, errors]}`.
pub fn encode_response<'js>(
    ctx: &Ctx<'js>,
    response: &ResponseDescriptor,
) -> Result<Value<'js>, BridgeError> {
    let json = serde_json::to_string(response).map_err(BridgeError::Encode)?;
    Ok(ctx.json_parse(json)?)
}
