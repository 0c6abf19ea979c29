//! Transport strategies: how a `RequestDescriptor` becomes a response.
//!
//! # Design
//! `Transport` is a closed set of variants chosen once at registration time
//! and never mutated afterwards, so one value can back any number of
//! sequential bridge calls (and, being `Send + Sync`, several interpreters).
//!
//! - `Direct` sends the request unchanged through a `ureq::Agent`.
//! - `OriginRewrite` replaces scheme and host with a fixed origin first,
//!   sandboxing every script URL to one backend.
//! - `HandlerDispatch` calls an in-process `Handler` with no network I/O.
//!
//! Every variant reports the URL it actually used and passes method,
//! headers and body through untouched. Network requests are sent with
//! `http_status_as_error(false)` so 4xx/5xx come back as data, and with
//! redirects disabled in the agent: `follow` walks each hop itself so the
//! origin rewrite applies to every one of them.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use http::uri::{Authority, PathAndQuery, Scheme};
use http::Uri;
use ureq::{Agent, AsSendBody};

use crate::descriptor::{resolve_location, RequestDescriptor, ResponseDescriptor};
use crate::error::FetchError;

/// An in-process request handler used by `Transport::HandlerDispatch`.
///
/// Implemented for any `Fn(http::Request<String>) -> http::Response<String>`.
pub trait Handler: Send + Sync {
    fn serve(&self, request: http::Request<String>) -> http::Response<String>;
}

impl<F> Handler for F
where
    F: Fn(http::Request<String>) -> http::Response<String> + Send + Sync,
{
    fn serve(&self, request: http::Request<String>) -> http::Response<String> {
        self(request)
    }
}

/// A fixed `scheme://host[:port]` that rewritten requests are sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    scheme: Scheme,
    authority: Authority,
}

impl Origin {
    /// Point `url` at this origin, keeping its path and query.
    pub fn apply(&self, url: &Uri) -> Result<Uri, FetchError> {
        let mut parts = url.clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Uri::from_parts(parts).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl FromStr for Origin {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: s.to_string(),
            reason,
        };
        let uri: Uri = s.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
        let parts = uri.into_parts();
        match (parts.scheme, parts.authority) {
            (Some(scheme), Some(authority)) => Ok(Self { scheme, authority }),
            _ => Err(invalid("origin needs a scheme and a host".to_string())),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// How the bridge carries a request to a response.
#[derive(Clone)]
pub enum Transport {
    Direct(Agent),
    OriginRewrite { origin: Origin, agent: Agent },
    HandlerDispatch(Arc<dyn Handler>),
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Direct(_) => f.write_str("Direct"),
            Transport::OriginRewrite { origin, .. } => {
                f.debug_tuple("OriginRewrite").field(&origin.to_string()).finish()
            }
            Transport::HandlerDispatch(_) => f.write_str("HandlerDispatch"),
        }
    }
}

impl Transport {
    /// Real network, default agent, no timeout.
    pub fn direct() -> Self {
        Transport::Direct(network_agent(None))
    }

    /// Real network with a global per-request timeout.
    pub fn direct_with_timeout(timeout: Duration) -> Self {
        Transport::Direct(network_agent(Some(timeout)))
    }

    /// Real network through a caller-configured agent.
    pub fn with_agent(agent: Agent) -> Self {
        Transport::Direct(agent)
    }

    /// Send every request to `origin` (e.g. `"http://127.0.0.1:8080"`).
    pub fn origin(origin: &str) -> Result<Self, FetchError> {
        Ok(Transport::OriginRewrite {
            origin: origin.parse()?,
            agent: network_agent(None),
        })
    }

    pub fn origin_with_agent(origin: Origin, agent: Agent) -> Self {
        Transport::OriginRewrite { origin, agent }
    }

    /// Dispatch requests to `handler` in-process.
    pub fn handler<H>(handler: H) -> Self
    where
        H: Handler + 'static,
    {
        Transport::HandlerDispatch(Arc::new(handler))
    }

    /// Perform one round trip. Every failure, request or network, comes
    /// back through the same `Err` channel.
    pub fn round_trip(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor, FetchError> {
        match self {
            Transport::Direct(agent) => follow(agent, request.clone(), None),
            Transport::OriginRewrite { origin, agent } => {
                let rewritten = request.with_url(origin.apply(request.url())?);
                follow(agent, rewritten, Some(origin))
            }
            Transport::HandlerDispatch(handler) => dispatch(handler.as_ref(), request),
        }
    }

    /// Perform one round trip, folding network failures into the response.
    ///
    /// Only request errors are returned as `Err`; transport, body, redirect
    /// and handler failures produce a `ResponseDescriptor` whose `errors` list is
    /// non-empty.
    pub fn exchange(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor, FetchError> {
        match self.round_trip(request) {
            Ok(response) => Ok(response),
            Err(err) if err.is_network() => {
                tracing::warn!(method = %request.method(), url = %request.url(), error = %err, "fetch failed");
                Ok(ResponseDescriptor::failed(request, &err))
            }
            Err(err) => Err(err),
        }
    }
}

/// Redirect hops followed before a request is abandoned.
pub const MAX_REDIRECTS: usize = 10;

/// A `ureq` agent that returns 4xx/5xx as data, sends any method token and
/// leaves redirects to the transport, with an optional global per-request
/// timeout.
pub fn network_agent(timeout: Option<Duration>) -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .allow_non_standard_methods(true)
        .max_redirects(0)
        .max_redirects_will_error(false)
        .timeout_global(timeout)
        .build()
        .new_agent()
}

/// Send `request`, following redirects hop by hop so every hop goes
/// through `origin` when one is set. The response reports the last hop.
fn follow(
    agent: &Agent,
    mut request: RequestDescriptor,
    origin: Option<&Origin>,
) -> Result<ResponseDescriptor, FetchError> {
    for _ in 0..=MAX_REDIRECTS {
        let mut response = send(agent, &request)?;
        let status = response.status();

        let location = match redirect_location(&response) {
            Some(location) => location,
            None => {
                let body = read_body(&request, &mut response)?;
                return Ok(ResponseDescriptor::from_parts(
                    &request,
                    status,
                    response.headers(),
                    &body,
                ));
            }
        };

        let redirect_error = |reason: String| FetchError::Redirect {
            method: request.method().to_string(),
            url: request.url().to_string(),
            reason,
        };
        let mut next = resolve_location(request.url(), &location)
            .map_err(|e| redirect_error(e.to_string()))?;
        if let Some(origin) = origin {
            next = origin.apply(&next).map_err(|e| redirect_error(e.to_string()))?;
        }

        tracing::debug!(%status, from = %request.url(), to = %next, "following redirect");
        request = request.redirected(status, next);
    }

    Err(FetchError::Redirect {
        method: request.method().to_string(),
        url: request.url().to_string(),
        reason: format!("stopped after {MAX_REDIRECTS} redirects"),
    })
}

fn redirect_location(response: &http::Response<ureq::Body>) -> Option<String> {
    if !matches!(response.status().as_u16(), 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    response
        .headers()
        .get(http::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn send(agent: &Agent, request: &RequestDescriptor) -> Result<http::Response<ureq::Body>, FetchError> {
    let http_request = request.to_http()?;
    let sent = if request.body().is_empty() {
        agent.run(per_request(agent, http_request.map(|_| ())))
    } else {
        agent.run(per_request(agent, http_request))
    };
    sent.map_err(|source| FetchError::Transport {
        method: request.method().to_string(),
        url: request.url().to_string(),
        source,
    })
}

// Caller-supplied agents may follow redirects or reject custom methods on
// their own; these settings hold for every request regardless.
fn per_request<S: AsSendBody>(agent: &Agent, request: http::Request<S>) -> http::Request<S> {
    agent
        .configure_request(request)
        .http_status_as_error(false)
        .allow_non_standard_methods(true)
        .max_redirects(0)
        .max_redirects_will_error(false)
        .build()
}

fn read_body(
    request: &RequestDescriptor,
    response: &mut http::Response<ureq::Body>,
) -> Result<Vec<u8>, FetchError> {
    response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(|source| FetchError::Body {
            method: request.method().to_string(),
            url: request.url().to_string(),
            source,
        })
}

fn dispatch(handler: &dyn Handler, request: &RequestDescriptor) -> Result<ResponseDescriptor, FetchError> {
    let http_request = request.to_http()?;
    let response = panic::catch_unwind(AssertUnwindSafe(|| handler.serve(http_request))).map_err(|_| {
        FetchError::HandlerPanicked {
            method: request.method().to_string(),
            url: request.url().to_string(),
        }
    })?;

    let (parts, body) = response.into_parts();
    Ok(ResponseDescriptor::from_parts(
        request,
        parts.status,
        &parts.headers,
        body.as_bytes(),
    ))
}
