//! Rate limit probing and backoff
//!
//! Before every request to the save endpoint the client pings the API and
//! reads the `X-RateLimit-*` headers. When the quota is used up (or the ping
//! itself is throttled) it waits until the advertised reset time plus a safety
//! margin. Nothing is cached between probes: each call sees the quota as it is
//! right now.

use crate::endpoint;
use crate::error::{Error, Phase, Result};
use crate::sleeper::{self, Sleeper};
use crate::types::RateLimitStatus;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Header carrying the number of requests left in the window
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
/// Header carrying the epoch second at which the window resets
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Quota prober shared by all requests of a client
#[derive(Clone)]
pub struct RateLimiter {
    http: reqwest::Client,
    ping_url: String,
    safety_margin: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl RateLimiter {
    /// Create a limiter probing `<api_root>ping/`
    pub fn new(
        http: reqwest::Client,
        api_root: &str,
        safety_margin: Duration,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            http,
            ping_url: endpoint::ping_url(api_root),
            safety_margin,
            sleeper,
        }
    }

    /// Probe the quota and wait if it is exhausted
    ///
    /// Returns the delay that was waited, or `None` when the quota allowed the
    /// request to go ahead immediately. Transport failures are reported as
    /// connectivity errors of `phase`, since the probe stands in for the
    /// request that follows it.
    pub async fn check(
        &self,
        auth_token: Option<&str>,
        phase: Phase,
        origin_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Duration>> {
        let mut request = self.http.get(&self.ping_url);
        if let Some(token) = auth_token {
            request = request.bearer_auth(token);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled {
                    origin_url: origin_url.to_string(),
                });
            }
            response = request.send() => response.map_err(|source| Error::Connectivity {
                phase,
                origin_url: origin_url.to_string(),
                source,
            })?,
        };

        let status = read_headers(response.headers());

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::info!("Rate limit exceeded. Backing off.");
            return self.back_off(&status, origin_url, cancel).await.map(Some);
        }

        match status.remaining {
            Some(0) => self.back_off(&status, origin_url, cancel).await.map(Some),
            Some(remaining) => {
                tracing::debug!(remaining, "Rate limit quota available");
                Ok(None)
            }
            None => {
                tracing::debug!(
                    status = %response.status(),
                    "Quota probe carried no rate limit headers, proceeding"
                );
                Ok(None)
            }
        }
    }

    /// Wait until the quota described by `status` has been reset
    ///
    /// Returns the delay that was waited.
    pub async fn back_off(
        &self,
        status: &RateLimitStatus,
        origin_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Duration> {
        if status.reset_epoch_seconds.is_none() {
            tracing::warn!("No rate limit reset time advertised, waiting the safety margin only");
        }
        let now = chrono::Utc::now().timestamp();
        let delay = backoff_delay(status.reset_epoch_seconds, now, self.safety_margin);
        tracing::info!(
            wait_secs = delay.as_secs(),
            "Rate limit exceeded. Waiting before retrying."
        );
        sleeper::pause(self.sleeper.as_ref(), delay, cancel, origin_url).await?;
        Ok(delay)
    }
}

/// Read the rate limit headers of a response
///
/// Headers that are missing or not integers are reported as `None`.
pub fn read_headers(headers: &HeaderMap) -> RateLimitStatus {
    fn parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
    }

    RateLimitStatus {
        remaining: parse(headers, HEADER_REMAINING),
        reset_epoch_seconds: parse(headers, HEADER_RESET),
    }
}

/// Time to wait for a quota resetting at `reset_epoch`
///
/// `reset - now + margin`, where a reset time already in the past (or
/// unknown) counts as "now", so the wait is never shorter than the margin.
pub fn backoff_delay(reset_epoch: Option<i64>, now_epoch: i64, margin: Duration) -> Duration {
    let until_reset = reset_epoch
        .map(|reset| reset.saturating_sub(now_epoch).max(0))
        .unwrap_or(0);
    Duration::from_secs(until_reset.unsigned_abs()) + margin
}
