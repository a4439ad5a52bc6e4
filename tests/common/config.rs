//! Test configuration helpers for loading .env credentials and building clients

use std::sync::Arc;
use std::time::Duration;
use swh_save::{Config, PollConfig, RecordingSleeper, SaveRequest, SwhClient};

/// Environment variable holding the archive bearer token
pub const TOKEN_VAR: &str = "SWH_AUTH_TOKEN";

/// Environment variable overriding the origin saved by live tests
pub const ORIGIN_VAR: &str = "SWH_TEST_ORIGIN";

/// Origin saved by live tests unless overridden
pub const DEFAULT_LIVE_ORIGIN: &str = "https://github.com/SoftwareHeritage/swh-model";

/// Load the archive token from the environment (or .env)
pub fn load_token() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var(TOKEN_VAR).ok().filter(|t| !t.is_empty())
}

/// Check if live credentials are available
pub fn has_live_credentials() -> bool {
    load_token().is_some()
}

/// Save request for the live origin, authenticated when a token is available
pub fn live_request() -> SaveRequest {
    dotenvy::dotenv().ok();
    let origin = std::env::var(ORIGIN_VAR).unwrap_or_else(|_| DEFAULT_LIVE_ORIGIN.to_string());
    let request = SaveRequest::new(origin);
    match load_token() {
        Some(token) => request.with_auth_token(token),
        None => request,
    }
}

/// Config for the real archive with short, bounded polling
pub fn live_config() -> Config {
    let poll = PollConfig {
        interval: Duration::from_secs(10),
        max_attempts: Some(6),
        max_duration: Some(Duration::from_secs(120)),
    };
    Config {
        acceptance: poll.clone(),
        completion: poll,
        ..Config::default()
    }
}

/// Config pointing at a mock archive, bounded by attempts only
pub fn mock_config(api_root: String) -> Config {
    let poll = PollConfig {
        interval: Duration::from_secs(1),
        max_attempts: Some(10),
        max_duration: None,
    };
    Config {
        api_root,
        request_timeout: Duration::from_secs(5),
        acceptance: poll.clone(),
        completion: poll,
        ..Config::default()
    }
}

/// Client whose waits return immediately and are recorded
pub fn recording_client(config: Config) -> (SwhClient, RecordingSleeper) {
    let sleeper = RecordingSleeper::default();
    let client = SwhClient::with_sleeper(config, Arc::new(sleeper.clone()))
        .expect("test config should be valid");
    (client, sleeper)
}
