//! End-to-end tests of the script-facing fetch API.
//!
//! # Design
//! Each test builds a `FetchRuntime` with the bundled artifact and one
//! transport, evaluates a script that records outcomes into a global
//! `results` object, drives the runtime until idle and inspects `results`
//! through JSON. Network-backed tests start the mock server on a random port.

use std::net::SocketAddr;

use fetch_core::{ResponseDescriptor, Transport};
use fetch_ffi::{FetchRuntime, ScriptArtifact};
use mock_server::{Echo, HELLO_BODY, NOT_FOUND_BODY};

const UNRESOLVABLE_HOST: &str = "sdfsdfjsdlkgjsldg.sdfgsdg";

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn runtime(transport: Transport) -> FetchRuntime {
    let rt = FetchRuntime::new(&ScriptArtifact::bundled(), transport).unwrap();
    rt.eval("var results = {};").unwrap();
    rt
}

/// Evaluate `script`, run until idle and return the `results` global.
fn run(rt: &FetchRuntime, script: &str) -> serde_json::Value {
    rt.eval(script).unwrap();
    rt.run_until_idle().unwrap();
    rt.with(|ctx| {
        let json: String = ctx.eval("JSON.stringify(results)").unwrap();
        serde_json::from_str(&json).unwrap()
    })
}

fn not_found_handler() -> Transport {
    Transport::handler(|_req: http::Request<String>| {
        http::Response::builder()
            .status(404)
            .header("Content-Type", "text/html; charset=UTF-8")
            .body(NOT_FOUND_BODY.to_string())
            .unwrap()
    })
}

// ---------------------------------------------------------------------------
// Globals
// ---------------------------------------------------------------------------

#[test]
fn globals_are_installed() {
    let rt = runtime(Transport::direct());
    rt.with(|ctx| {
        for (expr, expected) in [
            ("typeof fetch", "function"),
            ("typeof fetch.hostFetchSync", "function"),
            ("typeof fetch.Promise", "function"),
            ("typeof setTimeout", "function"),
            ("typeof clearTimeout", "function"),
        ] {
            let got: String = ctx.eval(expr).unwrap();
            assert_eq!(got, expected, "{expr}");
        }
    });
}

// ---------------------------------------------------------------------------
// Bridge call, synchronous
// ---------------------------------------------------------------------------

#[test]
fn bridge_call_returns_exactly_one_plain_object() {
    let addr = start_server();
    let rt = runtime(Transport::direct());
    let url = format!("http://{addr}/");

    let raw: String = rt.with(|ctx| {
        ctx.eval(format!(
            "JSON.stringify(fetch.hostFetchSync({url:?}, {{headers: {{}}}}))"
        ))
        .unwrap()
    });
    let resp: ResponseDescriptor = serde_json::from_str(&raw).unwrap();

    assert_eq!(resp.method, "GET");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.status_text, "200 OK");
    assert_eq!(resp.body, HELLO_BODY);
    assert_eq!(resp.headers["content-type"], vec!["text/html; charset=UTF-8"]);
    assert!(resp.errors.is_empty());
}

#[test]
fn loopback_echo_reproduces_method_headers_and_body() {
    let rt = runtime(Transport::handler(|req: http::Request<String>| {
        let mut builder = http::Response::builder().status(200);
        for (name, value) in req.headers() {
            builder = builder.header(name, value);
        }
        builder
            .header("x-echo-method", req.method().as_str())
            .body(req.body().clone())
            .unwrap()
    }));

    let raw: String = rt.with(|ctx| {
        ctx.eval(
            r#"JSON.stringify(fetch.hostFetchSync("/loop", {
                method: "PATCH",
                headers: {"x-one": "1", "x-many": ["a", "b"]},
                body: "{\"k\":\"v\"}"
            }))"#,
        )
        .unwrap()
    });
    let resp: ResponseDescriptor = serde_json::from_str(&raw).unwrap();

    assert_eq!(resp.method, "PATCH");
    assert_eq!(resp.headers["x-echo-method"], vec!["PATCH"]);
    assert_eq!(resp.headers["x-one"], vec!["1"]);
    assert_eq!(resp.headers["x-many"], vec!["a", "b"]);
    assert_eq!(resp.body, r#"{"k":"v"}"#);
}

// ---------------------------------------------------------------------------
// Promise API
// ---------------------------------------------------------------------------

#[test]
fn handler_404_resolves_with_status_text_and_headers() {
    let rt = runtime(not_found_handler());
    let results = run(
        &rt,
        r#"
        fetch("/").then(function (resp) {
            results.status = resp.status;
            results.statusText = resp.statusText;
            results.ok = resp.ok;
            results.contentType = resp.headers.get("Content-Type");
            return resp.text();
        }).then(function (body) {
            results.body = body;
        });
        "#,
    );

    assert_eq!(results["status"], 404);
    assert_eq!(results["statusText"], "404 Not Found");
    assert_eq!(results["ok"], false);
    assert_eq!(results["contentType"], "text/html; charset=UTF-8");
    assert_eq!(results["body"], NOT_FOUND_BODY);
}

#[test]
fn origin_rewrite_reports_resolved_url() {
    let addr = start_server();
    let rt = runtime(Transport::origin(&format!("http://{addr}")).unwrap());
    let results = run(
        &rt,
        r#"
        fetch("/x").then(function (resp) {
            results.url = resp.url;
            results.status = resp.status;
            return resp.text();
        }).then(function (body) {
            results.body = body;
        });
        "#,
    );

    assert_eq!(results["url"], format!("http://{addr}/x"));
    assert_eq!(results["status"], 404);
    assert_eq!(results["body"], NOT_FOUND_BODY);
}

#[test]
fn unresolvable_host_rejects_with_hostname_in_message() {
    let rt = runtime(Transport::direct());
    let results = run(
        &rt,
        &format!(
            r#"
            fetch("http://{UNRESOLVABLE_HOST}")
                .then(function () {{ results.resolved = true; }})
                .catch(function (err) {{ results.message = err.message; }});
            "#
        ),
    );

    assert!(results.get("resolved").is_none());
    let message = results["message"].as_str().unwrap();
    assert!(message.contains(UNRESOLVABLE_HOST), "{message}");
}

#[test]
fn json_handler_body_parses_to_same_pairs() {
    let rt = runtime(Transport::handler(|_req: http::Request<String>| {
        let body = serde_json::json!({ "hello": "world", "count": 3 }).to_string();
        http::Response::builder()
            .header("Content-Type", "text/json")
            .body(body)
            .unwrap()
    }));
    let results = run(
        &rt,
        r#"
        fetch("/").then(function (resp) { return resp.json(); })
            .then(function (data) {
                results.isObject = typeof data === "object";
                results.data = data;
            });
        "#,
    );

    assert_eq!(results["isObject"], true);
    assert_eq!(results["data"], serde_json::json!({ "hello": "world", "count": 3 }));
}

#[test]
fn json_from_mock_server_over_origin() {
    let addr = start_server();
    let rt = runtime(Transport::origin(&format!("http://{addr}")).unwrap());
    let results = run(
        &rt,
        r#"
        fetch("/json").then(function (resp) { return resp.json(); })
            .then(function (data) { results.data = data; });
        "#,
    );

    assert_eq!(results["data"], serde_json::json!({ "hello": "world" }));
}

#[test]
fn sequential_calls_are_independent_when_second_errors() {
    let addr = start_server();
    let rt = runtime(Transport::direct());
    let results = run(
        &rt,
        &format!(
            r#"
            fetch("http://{addr}/")
                .then(function (resp) {{ return resp.text(); }})
                .then(function (body) {{
                    results.first = body;
                    return fetch("http://{UNRESOLVABLE_HOST}/");
                }})
                .catch(function (err) {{ results.second = err.message; }})
                .then(function () {{ return fetch("http://{addr}/"); }})
                .then(function (resp) {{ return resp.text(); }})
                .then(function (body) {{ results.third = body; }});
            "#
        ),
    );

    assert_eq!(results["first"], HELLO_BODY);
    assert!(results["second"].as_str().unwrap().contains(UNRESOLVABLE_HOST));
    assert_eq!(results["third"], HELLO_BODY);
}

#[test]
fn echo_over_network_preserves_request() {
    let addr = start_server();
    let rt = runtime(Transport::direct());
    let results = run(
        &rt,
        &format!(
            r#"
            fetch("http://{addr}/echo?q=1", {{
                method: "POST",
                headers: new Headers({{"X-Trace": "abc"}}),
                body: "payload"
            }}).then(function (resp) {{ return resp.json(); }})
              .then(function (echo) {{ results.echo = echo; }});
            "#
        ),
    );

    let echo: Echo = serde_json::from_value(results["echo"].clone()).unwrap();
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.uri, "/echo?q=1");
    assert_eq!(echo.body, "payload");
    assert_eq!(echo.headers["x-trace"], vec!["abc"]);
}

#[test]
fn bad_options_reject_the_promise() {
    let rt = runtime(not_found_handler());
    let results = run(
        &rt,
        r#"
        fetch("/", {method: "NOT VALID"})
            .catch(function (err) { results.message = err.message; });
        "#,
    );

    assert_eq!(results["message"], r#"invalid method "NOT VALID""#);
}

#[test]
fn body_can_only_be_read_once() {
    let rt = runtime(not_found_handler());
    let results = run(
        &rt,
        r#"
        fetch("/").then(function (resp) {
            return resp.text().then(function () { return resp.text(); });
        }).catch(function (err) {
            results.name = err.name;
        });
        "#,
    );

    assert_eq!(results["name"], "TypeError");
}

#[test]
fn panicking_handler_rejects_without_poisoning_the_runtime() {
    let rt = runtime(Transport::handler(|req: http::Request<String>| {
        if req.uri().path() == "/boom" {
            panic!("handler blew up");
        }
        http::Response::new("fine".to_string())
    }));
    let results = run(
        &rt,
        r#"
        fetch("/boom")
            .catch(function (err) { results.first = err.message; })
            .then(function () { return fetch("/ok"); })
            .then(function (resp) { return resp.text(); })
            .then(function (body) { results.second = body; });
        "#,
    );

    assert_eq!(results["first"], "GET /boom: handler panicked");
    assert_eq!(results["second"], "fine");
}

#[test]
fn lowercase_and_extension_methods_reach_the_server() {
    let addr = start_server();
    let rt = runtime(Transport::origin(&format!("http://{addr}")).unwrap());
    let results = run(
        &rt,
        r#"
        fetch("/echo", {method: "post", body: "x"})
            .then(function (resp) { return resp.json(); })
            .then(function (echo) {
                results.lower = echo.method;
                return fetch("/echo", {method: "PROPFIND"});
            })
            .then(function (resp) { return resp.json(); })
            .then(function (echo) { results.custom = echo.method; })
            .catch(function (err) { results.error = err.message; });
        "#,
    );

    assert!(results.get("error").is_none(), "{results}");
    assert_eq!(results["lower"], "POST");
    assert_eq!(results["custom"], "PROPFIND");
}

#[test]
fn scheme_less_and_unencoded_urls_stay_on_the_origin() {
    let addr = start_server();
    let rt = runtime(Transport::origin(&format!("http://{addr}")).unwrap());
    let results = run(
        &rt,
        r#"
        fetch("users")
            .then(function (resp) {
                results.usersUrl = resp.url;
                results.usersStatus = resp.status;
                return fetch("/echo?q=a b");
            })
            .then(function (resp) { return resp.json(); })
            .then(function (echo) { results.echoUri = echo.uri; })
            .catch(function (err) { results.error = err.message; });
        "#,
    );

    assert!(results.get("error").is_none(), "{results}");
    assert_eq!(results["usersUrl"], format!("http://{addr}/users"));
    assert_eq!(results["usersStatus"], 404);
    assert_eq!(results["echoUri"], "/echo?q=a%20b");
}

#[test]
fn redirects_under_origin_never_leave_it() {
    let addr = start_server();
    let rt = runtime(Transport::origin(&format!("http://{addr}")).unwrap());
    let results = run(
        &rt,
        r#"
        fetch("/redirect?to=http://outside.invalid/json")
            .then(function (resp) {
                results.url = resp.url;
                return resp.json();
            })
            .then(function (data) { results.data = data; })
            .catch(function (err) { results.error = err.message; });
        "#,
    );

    assert!(results.get("error").is_none(), "{results}");
    assert_eq!(results["url"], format!("http://{addr}/json"));
    assert_eq!(results["data"], serde_json::json!({ "hello": "world" }));
}
