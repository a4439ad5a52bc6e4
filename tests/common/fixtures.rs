//! Mock archive and canned save request records

use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Origin used by mock-backed tests
pub const ORIGIN: &str = "https://gitlab.example.org/group/project";

const SAVE_PATH: &str = r"^/api/1/origin/save/";

/// Replays a list of responses, repeating the last one once exhausted
pub struct Sequence {
    responses: Vec<ResponseTemplate>,
    next: AtomicUsize,
}

impl Sequence {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(!responses.is_empty(), "sequence needs a response");
        Self {
            responses,
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.responses[index.min(self.responses.len() - 1)].clone()
    }
}

/// Start a mock archive whose quota probe always reports spare capacity
pub async fn start_archive() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1/ping/"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-ratelimit-remaining", "100"))
        .mount(&server)
        .await;
    server
}

/// API root of a mock archive
pub fn api_root(server: &MockServer) -> String {
    format!("{}/api/1/", server.uri())
}

/// Answer save endpoint calls made with `http_method` from `responses`, in order
pub async fn mount_save(server: &MockServer, http_method: &str, responses: Vec<ResponseTemplate>) {
    Mock::given(method(http_method))
        .and(path_regex(SAVE_PATH))
        .respond_with(Sequence::new(responses))
        .mount(server)
        .await;
}

/// Number of save endpoint calls made with `http_method`
pub async fn count_save_calls(server: &MockServer, http_method: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| {
            r.method.as_str() == http_method && r.url.path().starts_with("/api/1/origin/save/")
        })
        .count()
}

/// Save request record as the archive would send it
pub fn save_record(id: u64, request_status: &str, task_status: &str) -> Value {
    let visit_status = if task_status == "succeeded" {
        json!("full")
    } else {
        Value::Null
    };
    json!({
        "id": id,
        "origin_url": ORIGIN,
        "visit_type": "git",
        "save_request_date": "2024-05-02T10:00:00+00:00",
        "save_request_status": request_status,
        "save_task_status": task_status,
        "loading_task_id": id + 1000,
        "visit_date": null,
        "visit_status": visit_status,
        "note": null,
    })
}

/// 200 response carrying `body` as JSON
pub fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// 429 response whose quota resets `reset_in` seconds from now
pub fn throttled(reset_in: i64) -> ResponseTemplate {
    let reset = chrono::Utc::now().timestamp() + reset_in;
    ResponseTemplate::new(429)
        .insert_header("x-ratelimit-remaining", "0")
        .insert_header("x-ratelimit-reset", reset.to_string().as_str())
}
