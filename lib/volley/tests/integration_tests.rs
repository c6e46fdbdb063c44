//! Integration tests for `Agent` on `HyperTransport` using wiremock.
//!
//! The agent is blocking, so each test owns a tokio runtime that only
//! drives the mock server; requests are sent from the test thread.

use std::time::Duration;

use assert2::{check, let_assert};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::runtime::Runtime;
use volley::{
    Agent, Args, ContentType, DEFAULT_USER_AGENT, Error, FileUpload, HyperTransport, Method,
    TransportExt,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{
        body_json, body_string, body_string_contains, header, header_regex, method, path,
        query_param,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

struct Harness {
    runtime: Runtime,
    server: MockServer,
}

impl Harness {
    fn start() -> Self {
        let runtime = Runtime::new().expect("runtime");
        let server = runtime.block_on(MockServer::start());
        Self { runtime, server }
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server.uri())
    }

    fn received(&self) -> Vec<wiremock::Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }
}

fn transport() -> HyperTransport {
    HyperTransport::new().expect("transport")
}

#[test]
fn test_get_merges_call_query_with_agent_query() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "1"))
            .and(query_param("r", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": 3}))),
    );

    let transport = transport();
    let mut response = Agent::new(&transport)
        .query(&json!({"r": "2"}))
        .get(&harness.url("/search"), &json!({"q": "1"}));

    check!(response.get_error().is_none());
    check!(response.status_code() == 200);
    let hits: serde_json::Value = response.json().expect("json");
    check!(hits == json!({"hits": 3}));

    let received = harness.received();
    let_assert!([request] = received.as_slice());
    check!(request.url.query() == Some("q=1&r=2"));
}

#[test]
fn test_post_request_with_json_body() {
    let harness = Harness::start();
    let input = User {
        id: 0,
        name: "Bob".to_string(),
    };
    let output = User {
        id: 42,
        name: "Bob".to_string(),
    };
    harness.mount(
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(&input))
            .respond_with(ResponseTemplate::new(201).set_body_json(&output)),
    );

    let transport = transport();
    let mut response = Agent::new(&transport).post(&harness.url("/users"), &input);

    check!(response.status_code() == 201);
    check!(response.is_ok());
    let user: User = response.json().expect("json");
    check!(user == output);
}

#[test]
fn test_form_body() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("PATCH"))
            .and(path("/settings"))
            .and(header("Content-Type", "application/x-www-form-urlencoded"))
            .and(body_string("remember=true&user=alice"))
            .respond_with(ResponseTemplate::new(204)),
    );

    let transport = transport();
    let response = Agent::new(&transport)
        .content_type(ContentType::FormUrlEncoded)
        .patch(&harness.url("/settings"), &json!({"user": "alice", "remember": true}));

    check!(response.status_code() == 204);
    check!(response.get_error().is_none());
}

#[test]
fn test_http_error_status_keeps_body() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/not-found"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found")),
    );

    let transport = transport();
    let mut response = Agent::new(&transport).get(&harness.url("/not-found"), &());

    check!(response.status_code() == 404);
    let_assert!(Some(errors) = response.get_error());
    check!(errors.status() == Some(404));
    insta::assert_snapshot!(response.error(), @"http status code 404");
    check!(response.text() == "Not Found");
}

#[test]
fn test_headers_cookies_and_user_agent() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/api/data"))
            .and(header("Authorization", "Bearer token123"))
            .and(header("X-Custom-Header", "custom-value"))
            .and(header("Cookie", "session=abc; theme=dark"))
            .and(header("User-Agent", "volley-tests/1.0"))
            .respond_with(ResponseTemplate::new(200)),
    );

    let transport = transport();
    let response = Agent::new(&transport)
        .header("Authorization", "Bearer token123")
        .header("X-Custom-Header", "custom-value")
        .cookie(("session", "abc"))
        .cookie(("theme", "dark"))
        .user_agent("volley-tests/1.0")
        .get(&harness.url("/api/data"), &());

    check!(response.status_code() == 200);
    check!(response.get_error().is_none());
}

#[test]
fn test_default_user_agent_is_sent() {
    let harness = Harness::start();
    harness.mount(Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)));

    let transport = transport();
    let response = Agent::new(&transport).get(&harness.url("/"), &());
    check!(response.is_ok());

    let received = harness.received();
    let_assert!([request] = received.as_slice());
    let user_agent = request
        .headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok());
    check!(user_agent == Some(DEFAULT_USER_AGENT));
}

#[test]
fn test_put_file_sends_multipart() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("PUT"))
            .and(path("/upload"))
            .and(header_regex("Content-Type", "^multipart/form-data; boundary=.+"))
            .and(body_string_contains("name=\"title\""))
            .and(body_string_contains(
                "name=\"file1\"; filename=\"notes.txt\"",
            ))
            .and(body_string_contains("some notes"))
            .respond_with(ResponseTemplate::new(200)),
    );

    let transport = transport();
    let response = Agent::new(&transport).put_file(
        &harness.url("/upload"),
        FileUpload::bytes("notes.txt", "some notes"),
        &json!({"title": "Notes"}),
    );

    check!(response.status_code() == 200);
    check!(response.get_error().is_none());
}

#[test]
fn test_post_file_is_sent_as_put() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("PUT"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200)),
    );

    let transport = transport();
    let response = Agent::new(&transport).post_file(&harness.url("/upload"), vec![1_u8, 2, 3], &());

    check!(response.status_code() == 200);
}

#[test]
fn test_verbs() {
    let harness = Harness::start();
    for verb in ["HEAD", "OPTIONS", "PUT", "DELETE"] {
        harness.mount(
            Mock::given(method(verb))
                .and(path("/items/1"))
                .respond_with(ResponseTemplate::new(204)),
        );
    }

    let transport = transport().with_logging();
    let url = harness.url("/items/1");

    check!(Agent::new(&transport).head(&url, &()).status_code() == 204);
    check!(Agent::new(&transport).options(&url, &()).status_code() == 204);
    check!(Agent::new(&transport).put(&url, &json!({"name": "x"})).status_code() == 204);
    check!(Agent::new(&transport).del(&url, &()).status_code() == 204);
    check!(harness.received().len() == 4);
}

#[test]
fn test_extension_method() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("PROPFIND"))
            .and(path("/dav/"))
            .and(header("Depth", "1"))
            .respond_with(ResponseTemplate::new(207).set_body_string("<multistatus/>")),
    );

    let transport = transport();
    let method: Method = "PROPFIND".parse().expect("extension method");
    let mut response = Agent::new(&transport)
        .header("Depth", "1")
        .send(method, &harness.url("/dav/"), Args::new());

    check!(response.status_code() == 207);
    check!(response.text() == "<multistatus/>");
}

#[test]
fn test_struct_query_and_body_keep_declaration_order() {
    #[derive(Serialize)]
    struct Measure {
        zone: &'static str,
        ratio: f32,
    }

    let harness = Harness::start();
    harness.mount(
        Mock::given(method("POST"))
            .and(path("/measures"))
            .and(body_string(r#"{"zone":"b","ratio":0.1}"#))
            .respond_with(ResponseTemplate::new(201)),
    );

    let transport = transport();
    let response = Agent::new(&transport)
        .query(&Measure { zone: "a", ratio: 0.5 })
        .post(&harness.url("/measures"), &Measure { zone: "b", ratio: 0.1 });

    check!(response.status_code() == 201);
    let received = harness.received();
    let_assert!([request] = received.as_slice());
    check!(request.url.query() == Some("zone=a&ratio=0.5"));
}

#[test]
fn test_response_headers_and_cached_body() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/with-headers"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Request-Id", "abc123")
                    .set_body_string("payload"),
            ),
    );

    let transport = transport();
    let mut response = Agent::new(&transport).get(&harness.url("/with-headers"), &());

    check!(response.header("x-request-id") == Some("abc123"));
    check!(!response.is_read());
    let first = response.read_all_body().expect("body");
    let second = response.read_all_body().expect("cached body");
    check!(first == second);
    check!(response.text() == "payload");
    check!(response.is_read());
}

#[test]
fn test_proxy_receives_absolute_form_request() {
    let proxy = Harness::start();
    proxy.mount(
        Mock::given(method("GET"))
            .and(path("/proxied"))
            .and(header("Host", "example.invalid"))
            .respond_with(ResponseTemplate::new(200).set_body_string("via proxy")),
    );

    let transport = transport();
    let mut response = Agent::new(&transport)
        .proxy(proxy.server.uri())
        .get("http://example.invalid/proxied", &());

    check!(response.get_error().is_none());
    check!(response.text() == "via proxy");
}

#[test]
fn test_https_through_proxy_is_rejected() {
    let transport = transport();
    let response = Agent::new(&transport)
        .proxy("http://127.0.0.1:3128")
        .get("https://example.com/", &());

    check!(response.status_code() == 0);
    check!(response.error().contains("only http targets"));
}

#[test]
fn test_timeout() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5))),
    );

    let transport = HyperTransport::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .expect("transport");
    let mut response = Agent::new(&transport).get(&harness.url("/slow"), &());

    check!(response.status_code() == 0);
    check!(response.body().is_empty());
    check!(response.errors().iter().any(Error::is_timeout));
}

#[test]
fn test_connection_error() {
    let transport = transport();
    let response = Agent::new(&transport).get("http://127.0.0.1:1", &());

    check!(response.status_code() == 0);
    check!(response.request().is_some());
    check!(response.errors().iter().any(Error::is_connection));
}

#[test]
fn test_invalid_url_never_reaches_the_network() {
    let harness = Harness::start();
    let transport = transport();
    let response = Agent::new(&transport).get("::not a url::", &());

    check!(response.status_code() == 0);
    check!(response.request().is_none());
    let_assert!(Some(errors) = response.get_error());
    check!(matches!(errors.errors(), [Error::InvalidUrl(_)]));
    check!(harness.received().is_empty());
}
