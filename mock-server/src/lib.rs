use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    extract::Query,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub const HELLO_BODY: &str = "Hello, client\n";
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/json", get(json))
        .route("/echo", any(echo))
        .route("/redirect", any(redirect))
        .route("/large", get(large))
        .fallback(not_found)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn hello() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html; charset=UTF-8")], HELLO_BODY)
}

async fn json() -> impl IntoResponse {
    let mut body = serde_json::json!({ "hello": "world" }).to_string();
    body.push('\n');
    ([(header::CONTENT_TYPE, "text/json")], body)
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(Echo {
        method: method.to_string(),
        uri: uri.to_string(),
        headers: seen,
        body,
    })
}

/// Query of `/redirect`. Without `to` the route redirects to itself.
#[derive(Debug, Deserialize)]
pub struct RedirectParams {
    pub to: Option<String>,
    pub status: Option<u16>,
}

async fn redirect(uri: Uri, Query(params): Query<RedirectParams>) -> impl IntoResponse {
    let status = params
        .status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(StatusCode::is_redirection)
        .unwrap_or(StatusCode::FOUND);
    let location = params.to.unwrap_or_else(|| uri.to_string());
    (status, [(header::LOCATION, location)])
}

#[derive(Debug, Deserialize)]
pub struct LargeParams {
    pub bytes: usize,
}

/// `bytes` repetitions of `a`.
async fn large(Query(params): Query<LargeParams>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "a".repeat(params.bytes))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        NOT_FOUND_BODY,
    )
}
