//! Shared test helpers for driving SwhClient against a mock archive.

use crate::SwhClient;
use crate::config::{Config, PollConfig};
use crate::rate_limiter::HEADER_REMAINING;
use crate::sleeper::RecordingSleeper;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub(crate) const ORIGIN: &str = "https://github.com/example/repo";

const SAVE_PATH: &str = r"^/api/1/origin/save/";

/// Replays a list of responses, repeating the last one once exhausted
pub(crate) struct Sequence {
    responses: Vec<ResponseTemplate>,
    next: AtomicUsize,
}

impl Sequence {
    pub(crate) fn new(responses: Vec<ResponseTemplate>) -> Self {
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

/// Mock archive with an always-available quota probe
pub(crate) struct MockArchive {
    pub(crate) server: MockServer,
}

impl MockArchive {
    pub(crate) async fn start() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/1/ping/"))
            .respond_with(ResponseTemplate::new(200).insert_header(HEADER_REMAINING, "100"))
            .mount(&server)
            .await;
        Self { server }
    }

    pub(crate) fn api_root(&self) -> String {
        format!("{}/api/1/", self.server.uri())
    }

    /// Answer submissions with `responses`, in order
    pub(crate) async fn on_submit(&self, responses: Vec<ResponseTemplate>) {
        Mock::given(method("POST"))
            .and(path_regex(SAVE_PATH))
            .respond_with(Sequence::new(responses))
            .mount(&self.server)
            .await;
    }

    /// Answer status checks with `responses`, in order
    pub(crate) async fn on_poll(&self, responses: Vec<ResponseTemplate>) {
        Mock::given(method("GET"))
            .and(path_regex(SAVE_PATH))
            .respond_with(Sequence::new(responses))
            .mount(&self.server)
            .await;
    }

    /// Requests received on the save endpoint with `http_method`
    pub(crate) async fn save_requests(&self, http_method: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| {
                r.method.as_str() == http_method && r.url.path().starts_with("/api/1/origin/save/")
            })
            .collect()
    }

    /// Number of quota probes received
    pub(crate) async fn probes(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/api/1/ping/")
            .count()
    }
}

/// Save request record as the archive would send it
pub(crate) fn record(task_id: u64, request_status: &str, task_status: &str) -> Value {
    let visit_status = if task_status == "succeeded" {
        json!("full")
    } else {
        Value::Null
    };
    json!({
        "id": task_id,
        "origin_url": ORIGIN,
        "visit_type": "git",
        "save_request_status": request_status,
        "save_task_status": task_status,
        "loading_task_id": task_id,
        "visit_status": visit_status,
        "note": null,
    })
}

pub(crate) fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Config pointing at `archive` with small, attempt-bounded polling
pub(crate) fn test_config(archive: &MockArchive) -> Config {
    let poll = PollConfig {
        interval: Duration::from_secs(1),
        max_attempts: Some(10),
        max_duration: None,
    };
    Config {
        api_root: archive.api_root(),
        request_timeout: Duration::from_secs(5),
        acceptance: poll.clone(),
        completion: poll,
        ..Config::default()
    }
}

pub(crate) fn client_with(config: Config) -> (SwhClient, RecordingSleeper) {
    let sleeper = RecordingSleeper::default();
    let client = SwhClient::with_sleeper(config, Arc::new(sleeper.clone())).unwrap();
    (client, sleeper)
}

pub(crate) fn client_for(archive: &MockArchive) -> (SwhClient, RecordingSleeper) {
    client_with(test_config(archive))
}
