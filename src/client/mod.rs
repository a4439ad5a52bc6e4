//! Save request orchestration split into focused submodules.
//!
//! The `SwhClient` struct and its methods are organized by phase:
//! - [`submit`] - Submission of the save request and throttled restarts
//! - [`polling`] - Acceptance and completion polling loops
//!
//! A run moves through `submitted -> acceptance pending -> accepted ->
//! task in progress -> succeeded`, ending early on the first error. Every
//! request to the API is preceded by a quota probe.

mod polling;
mod submit;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::Config;
use crate::endpoint;
use crate::error::{Error, Phase, Result};
use crate::rate_limiter::{self, RateLimiter};
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::types::{Event, RateLimitStatus, SaveOptions, SaveOutcome, SaveRequest, TaskPayload};
use reqwest::Method;
use reqwest::header::ACCEPT;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Client for the Software Heritage save API
///
/// Each call to [`save`](SwhClient::save) is an independent run; the client
/// holds no per-run state, so one instance can drive several saves
/// concurrently.
#[derive(Clone)]
pub struct SwhClient {
    /// Static configuration
    config: Arc<Config>,
    /// HTTP client shared with the rate limiter
    http: reqwest::Client,
    /// Quota prober run before every request
    rate_limiter: RateLimiter,
    /// Delay implementation for poll intervals
    sleeper: Arc<dyn Sleeper>,
    /// Broadcast channel for progress events
    event_tx: broadcast::Sender<Event>,
}

/// Status and body of one save endpoint response
struct Reply {
    status: u16,
    body: String,
    rate_limit: RateLimitStatus,
}

impl SwhClient {
    /// Create a client that waits with the tokio timer
    pub fn new(config: Config) -> Result<Self> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Create a client that waits through `sleeper`
    pub fn with_sleeper(config: Config, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;
        let rate_limiter = RateLimiter::new(
            http.clone(),
            &config.api_root,
            config.rate_limit.safety_margin,
            sleeper.clone(),
        );
        let (event_tx, _rx) = broadcast::channel(config.event_capacity);

        Ok(Self {
            config: Arc::new(config),
            http,
            rate_limiter,
            sleeper,
            event_tx,
        })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to progress events of all runs on this client
    ///
    /// Events sent before subscribing are not replayed. A receiver that falls
    /// more than `event_capacity` events behind loses the oldest ones.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Ask the archive to save an origin and follow the request to its end
    ///
    /// With [`SaveOptions::submit_only`] the run returns as soon as the
    /// submission was accepted by the API. Otherwise it waits for the request
    /// to be accepted and for the loading task to finish, bounded by the
    /// polling limits of the configuration and by `options.cancel`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use swh_save::{Config, SaveOptions, SaveRequest, SwhClient};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = SwhClient::new(Config::default())?;
    /// let request = SaveRequest::new("https://github.com/rust-lang/rust");
    /// let outcome = client.save(&request, SaveOptions::default()).await?;
    /// println!("visit status: {:?}", outcome.visit_status());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn save(&self, request: &SaveRequest, options: SaveOptions) -> Result<SaveOutcome> {
        let span = tracing::info_span!(
            "swh_save",
            origin = %request.origin_url(),
            visit_type = %request.visit_type(),
        );
        let result = self.run(request, &options).instrument(span).await;

        match &result {
            Ok(SaveOutcome::Succeeded { visit_status, .. }) => self.emit(Event::Succeeded {
                origin_url: request.origin_url().to_string(),
                visit_status: visit_status.clone(),
            }),
            Ok(SaveOutcome::Submitted { .. }) => {}
            Err(error) => {
                tracing::error!(error = %error, code = error.error_code(), "Save failed");
                self.emit(Event::Failed {
                    origin_url: request.origin_url().to_string(),
                    error: error.to_string(),
                });
            }
        }
        result
    }

    async fn run(&self, request: &SaveRequest, options: &SaveOptions) -> Result<SaveOutcome> {
        let submitted = self.submit_with_restarts(request, &options.cancel).await?;
        if options.submit_only {
            return Ok(SaveOutcome::Submitted {
                record: submitted.record,
            });
        }

        let accepted = self
            .await_acceptance(
                request,
                &submitted.key,
                submitted.record,
                submitted.raw,
                &options.cancel,
            )
            .await?;
        tracing::debug!(task_id = ?accepted.task_id, "Following loading task");
        self.await_completion(request, &submitted.key, &options.cancel)
            .await
    }

    fn save_url(&self, request: &SaveRequest) -> String {
        endpoint::save_url(
            &self.config.api_root,
            request.visit_type(),
            request.origin_url(),
        )
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Back off after a 429 from the save endpoint
    async fn throttle(
        &self,
        request: &SaveRequest,
        reset_epoch: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<Duration> {
        let status = RateLimitStatus {
            remaining: Some(0),
            reset_epoch_seconds: reset_epoch,
        };
        let waited = self
            .rate_limiter
            .back_off(&status, request.origin_url(), cancel)
            .await?;
        self.emit(Event::Throttled {
            origin_url: request.origin_url().to_string(),
            wait_secs: waited.as_secs(),
        });
        Ok(waited)
    }

    /// Probe the quota, then send one request to the save endpoint
    async fn call(
        &self,
        method: Method,
        request: &SaveRequest,
        phase: Phase,
        cancel: &CancellationToken,
    ) -> Result<Reply> {
        let origin_url = request.origin_url();

        if let Some(waited) = self
            .rate_limiter
            .check(request.auth_token(), phase, origin_url, cancel)
            .await?
        {
            self.emit(Event::Throttled {
                origin_url: origin_url.to_string(),
                wait_secs: waited.as_secs(),
            });
        }

        let url = self.save_url(request);
        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");
        if let Some(token) = request.auth_token() {
            tracing::debug!("Making authenticated requests (authorization token)");
            builder = builder.bearer_auth(token);
        } else {
            tracing::debug!("Making anonymous requests");
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let rate_limit = rate_limiter::read_headers(response.headers());
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(Reply {
                status,
                body,
                rate_limit,
            })
        };

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled {
                    origin_url: origin_url.to_string(),
                });
            }
            reply = exchange => reply.map_err(|source| Error::Connectivity {
                phase,
                origin_url: origin_url.to_string(),
                source,
            })?,
        };

        tracing::debug!(%method, %url, status = reply.status, "Save endpoint responded");
        Ok(reply)
    }
}

/// Decode a save endpoint body into a single record or a list of them
fn decode_payload(body: &str, origin_url: &str) -> Result<TaskPayload> {
    serde_json::from_str(body).map_err(|e| Error::InvalidResponse {
        origin_url: origin_url.to_string(),
        message: e.to_string(),
        body: body.to_string(),
    })
}
