//! Bridge Call: the single host function scripts use to fetch.
//!
//! # Design
//! The function is typed at the boundary as
//! `(url: string-coercible, options?: object) -> object`; the interpreter
//! binding does the frame bookkeeping, so every exit path yields exactly one
//! result value or one thrown error and never leaves extra values behind.
//!
//! - Decode, request-construction and encode failures throw an `Error`
//!   carrying the message.
//! - Transport and body-read failures do not throw. They come back as a
//!   normal response object with a non-empty `errors` list and an empty body.
//!
//! The call blocks the interpreter thread for the whole round trip.

use std::sync::Arc;

use fetch_core::Transport;
use rquickjs::convert::Coerced;
use rquickjs::function::Opt;
use rquickjs::{Ctx, Exception, Function, Value};

use crate::decode::decode_request;
use crate::encode::encode_response;
use crate::error::BridgeError;

/// Property name of the bridge on the script's fetch entry point.
pub const BRIDGE_FUNCTION: &str = "hostFetchSync";

/// Decode, round trip, encode. Returns the encoded response value.
pub fn fetch_sync<'js>(
    ctx: &Ctx<'js>,
    transport: &Transport,
    url: &str,
    options: Option<Value<'js>>,
) -> Result<Value<'js>, BridgeError> {
    let request = decode_request(ctx, url, options)?;

    let span = tracing::debug_span!("fetch", method = %request.method(), url = %request.url());
    let _enter = span.enter();

    let response = transport.exchange(&request)?;
    tracing::debug!(
        status = response.status,
        failed = response.is_failure(),
        "fetch finished"
    );

    encode_response(ctx, &response)
}

/// Build the host function bound to `transport`.
pub fn bridge_function<'js>(
    ctx: &Ctx<'js>,
    transport: Arc<Transport>,
) -> rquickjs::Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, url: Coerced<String>, options: Opt<Value<'js>>| -> rquickjs::Result<Value<'js>> {
            fetch_sync(&ctx, &transport, &url.0, options.0).map_err(|err| raise(&ctx, err))
        },
    )?
    .with_name(BRIDGE_FUNCTION)
}

fn raise(ctx: &Ctx<'_>, err: BridgeError) -> rquickjs::Error {
    match err {
        BridgeError::Js(err) => err,
        other => {
            tracing::debug!(error = %other, "fetch raised");
            Exception::throw_message(ctx, &other.to_string())
        }
    }
}
