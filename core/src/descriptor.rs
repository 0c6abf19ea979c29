//! Request and response descriptors for one bridge round trip.
//!
//! # Design
//! `RequestDescriptor` is validated once, at construction, and never mutated
//! afterwards; the origin-rewrite transport derives a new descriptor instead
//! of editing the caller's. `ResponseDescriptor` is the plain-data result
//! that gets serialized straight back into the interpreter.
//!
//! Headers use a name -> ordered values map on both sides. Request header
//! names keep the casing the script used; response header names are
//! reported as the transport delivered them.

use std::collections::BTreeMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use url::{Position, Url};

use crate::error::FetchError;
use crate::types::RequestOptions;

/// Header name -> every value sent or received for it, in order.
pub type HeaderMultiMap = BTreeMap<String, Vec<String>>;

/// A validated request, owned by exactly one bridge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    url: Uri,
    method: Method,
    headers: HeaderMultiMap,
    body: String,
}

impl RequestDescriptor {
    /// Build a request from the bridge's `(url, options)` arguments.
    ///
    /// Unset method defaults to `GET`, unset headers to none and unset body
    /// to the empty string. Relative URLs are accepted here; whether they can
    /// be sent is up to the transport.
    pub fn new(url: &str, options: RequestOptions) -> Result<Self, FetchError> {
        let method = match options.method {
            Some(method) => parse_method(method)?,
            None => Method::GET,
        };
        let url = parse_url(url)?;

        let headers: HeaderMultiMap = options
            .headers
            .unwrap_or_default()
            .into_iter()
            .map(|(name, values)| (name, values.into_vec()))
            .collect();
        header_map(&headers)?;

        Ok(Self {
            url,
            method,
            headers,
            body: options.body.unwrap_or_default(),
        })
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMultiMap {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// A copy of this request aimed at a different URL.
    pub fn with_url(&self, url: Uri) -> Self {
        Self {
            url,
            ..self.clone()
        }
    }

    /// The request to send after `status` redirected this one to `url`.
    ///
    /// 301, 302 and 303 turn anything but `GET`/`HEAD` into a bodiless
    /// `GET`; 307 and 308 resend method and body unchanged. Credentials are
    /// dropped when the redirect leaves the current host.
    pub fn redirected(&self, status: StatusCode, url: Uri) -> Self {
        let mut next = self.with_url(url);
        let rewrites_method = matches!(status.as_u16(), 301 | 302 | 303);
        if rewrites_method && next.method != Method::GET && next.method != Method::HEAD {
            next.method = Method::GET;
            next.body.clear();
            next.headers.retain(|name, _| {
                !name.eq_ignore_ascii_case("content-type") && !name.eq_ignore_ascii_case("content-length")
            });
        }
        if next.url.authority() != self.url.authority() {
            next.headers.retain(|name, _| {
                !CREDENTIAL_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
            });
        }
        next
    }

    /// Convert to an `http::Request` for a transport to send.
    pub fn to_http(&self) -> Result<http::Request<String>, FetchError> {
        let mut request = http::Request::new(self.body.clone());
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.url.clone();
        *request.headers_mut() = header_map(&self.headers)?;
        Ok(request)
    }
}

/// The outcome of one round trip, serialized as
/// `{url, method, headers, body, status, statusText[, errors]}`.
///
/// A failed round trip still yields a descriptor: `errors` carries the
/// failure messages, `body` is empty and `status` is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescriptor {
    pub url: String,
    pub method: String,
    pub headers: HeaderMultiMap,
    pub body: String,
    pub status: u16,
    pub status_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ResponseDescriptor {
    /// Assemble a response for `request` from what the transport returned.
    /// The body is decoded as text; invalid UTF-8 is replaced, not rejected.
    pub fn from_parts(
        request: &RequestDescriptor,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Self {
        Self {
            url: request.url().to_string(),
            method: request.method().to_string(),
            headers: header_multimap(headers),
            body: String::from_utf8_lossy(body).into_owned(),
            status: status.as_u16(),
            status_text: status_text(status),
            errors: Vec::new(),
        }
    }

    /// A response that records a network-level failure.
    pub fn failed(request: &RequestDescriptor, err: &FetchError) -> Self {
        Self {
            url: request.url().to_string(),
            method: request.method().to_string(),
            headers: HeaderMultiMap::new(),
            body: String::new(),
            status: 0,
            status_text: String::new(),
            errors: vec![err.to_string()],
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.errors.is_empty()
    }
}

const CREDENTIAL_HEADERS: [&str; 3] = ["authorization", "cookie", "www-authenticate"];

/// Methods matched case-insensitively and sent upper-case, as browsers do.
const NORMALIZED_METHODS: [Method; 6] = [
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::POST,
    Method::PUT,
];

fn parse_method(raw: String) -> Result<Method, FetchError> {
    let method = match Method::from_bytes(raw.as_bytes()) {
        Ok(method) => method,
        Err(_) => return Err(FetchError::InvalidMethod(raw)),
    };
    Ok(NORMALIZED_METHODS
        .iter()
        .find(|known| known.as_str().eq_ignore_ascii_case(method.as_str()))
        .cloned()
        .unwrap_or(method))
}

/// Parse a script URL.
///
/// Anything with a scheme is absolute. Anything else is a reference
/// relative to the root (`"users"` and `"?q=1"` become `"/users"` and
/// `"/?q=1"`). Characters not allowed in a URI are percent-encoded and
/// fragments are dropped.
pub fn parse_url(raw: &str) -> Result<Uri, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    if raw.trim().is_empty() {
        return Err(invalid("empty url".to_string()));
    }

    let text = match Url::parse(raw) {
        Ok(url) => url[..Position::AfterQuery].to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(RELATIVE_BASE).map_err(|e| invalid(e.to_string()))?;
            let joined = base.join(raw).map_err(|e| invalid(e.to_string()))?;
            joined[Position::BeforePath..Position::AfterQuery].to_string()
        }
        Err(e) => return Err(invalid(e.to_string())),
    };
    text.parse()
        .map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))
}

/// Resolve a redirect `Location` against the URL that produced it.
pub fn resolve_location(base: &Uri, location: &str) -> Result<Uri, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: location.to_string(),
        reason,
    };
    let base = Url::parse(&base.to_string()).map_err(|e| invalid(e.to_string()))?;
    let next = base.join(location).map_err(|e| invalid(e.to_string()))?;
    next[..Position::AfterQuery]
        .parse()
        .map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))
}

// Only used to resolve relative references; never sent anywhere.
const RELATIVE_BASE: &str = "http://relative.invalid/";

/// `"<code> <reason>"`, e.g. `"404 Not Found"`. Codes without a standard
/// reason phrase render as the bare number.
pub fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

/// Flatten an `http::HeaderMap` into a name -> values map, keeping every
/// value of repeated headers in arrival order.
pub fn header_multimap(headers: &HeaderMap) -> HeaderMultiMap {
    let mut out = HeaderMultiMap::new();
    for (name, value) in headers {
        let value = match value.to_str() {
            Ok(text) => text.to_string(),
            Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
        };
        out.entry(name.as_str().to_string()).or_default().push(value);
    }
    out
}

fn header_map(headers: &HeaderMultiMap) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (name, values) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        for value in values {
            let header_value =
                HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            map.append(header_name.clone(), header_value);
        }
    }
    Ok(map)
}
