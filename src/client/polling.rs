//! Acceptance and completion polling loops.

use super::{SwhClient, decode_payload};
use crate::classify::{
    Acceptance, Completion, classify_request_status, classify_status, classify_task_status,
};
use crate::config::PollConfig;
use crate::error::{Error, Phase, PollPhase, Result};
use crate::matcher::{TaskKey, find_task_record};
use crate::sleeper;
use crate::types::{Event, SaveOutcome, SaveRequest, TaskRecord};
use reqwest::Method;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Attempt and time budget of one polling loop
struct PollBudget<'a> {
    config: &'a PollConfig,
    phase: PollPhase,
    started: Instant,
    attempts: u32,
}

impl<'a> PollBudget<'a> {
    fn new(config: &'a PollConfig, phase: PollPhase) -> Self {
        Self {
            config,
            phase,
            started: Instant::now(),
            attempts: 0,
        }
    }

    /// Claim the next poll, failing once either limit is reached
    fn next_attempt(&mut self, origin_url: &str) -> Result<u32> {
        let elapsed = self.started.elapsed();
        let out_of_attempts = self
            .config
            .max_attempts
            .is_some_and(|max| self.attempts >= max);
        let out_of_time = self.config.max_duration.is_some_and(|max| elapsed >= max);

        if out_of_attempts || out_of_time {
            return Err(Error::PollTimeout {
                phase: self.phase,
                origin_url: origin_url.to_string(),
                attempts: self.attempts,
                elapsed,
            });
        }
        self.attempts += 1;
        Ok(self.attempts)
    }
}

impl SwhClient {
    /// Poll until the save request leaves the `pending` state
    ///
    /// Starts from the submission record; returns the first accepted record.
    pub(super) async fn await_acceptance(
        &self,
        request: &SaveRequest,
        key: &TaskKey,
        mut record: TaskRecord,
        mut raw: String,
        cancel: &CancellationToken,
    ) -> Result<TaskRecord> {
        let origin_url = request.origin_url();
        let mut budget = PollBudget::new(&self.config.acceptance, PollPhase::Acceptance);

        loop {
            match classify_request_status(&record, &raw)? {
                Acceptance::Accepted => {
                    tracing::info!("Save request accepted");
                    self.emit(Event::RequestAccepted {
                        origin_url: origin_url.to_string(),
                    });
                    return Ok(record);
                }
                Acceptance::Pending => {
                    let attempt = budget.next_attempt(origin_url)?;
                    let interval = self.config.acceptance.interval;
                    tracing::info!(
                        attempt,
                        wait_ms = interval.as_millis() as u64,
                        "The save request is still pending, waiting before checking again"
                    );
                    self.emit(Event::RequestPending {
                        origin_url: origin_url.to_string(),
                        attempt,
                    });
                    sleeper::pause(self.sleeper.as_ref(), interval, cancel, origin_url).await?;
                    (record, raw) = self.fetch_record(request, key, cancel).await?;
                }
            }
        }
    }

    /// Poll until the loading task succeeds or fails
    pub(super) async fn await_completion(
        &self,
        request: &SaveRequest,
        key: &TaskKey,
        cancel: &CancellationToken,
    ) -> Result<SaveOutcome> {
        let origin_url = request.origin_url();
        let mut budget = PollBudget::new(&self.config.completion, PollPhase::Completion);

        loop {
            let (record, raw) = self.fetch_record(request, key, cancel).await?;
            match classify_task_status(&record, &raw)? {
                Completion::Succeeded => {
                    tracing::info!(
                        visit_status = record.visit_status.as_deref().unwrap_or("unknown"),
                        "Saving has succeeded"
                    );
                    return Ok(SaveOutcome::Succeeded {
                        visit_status: record.visit_status.clone(),
                        record,
                    });
                }
                Completion::InProgress(status) => {
                    let attempt = budget.next_attempt(origin_url)?;
                    let interval = self.config.completion.interval;
                    tracing::info!(
                        attempt,
                        task_status = %status,
                        wait_ms = interval.as_millis() as u64,
                        "The save task is not finished, waiting before checking again"
                    );
                    self.emit(Event::TaskProgress {
                        origin_url: origin_url.to_string(),
                        status,
                        attempt,
                    });
                    sleeper::pause(self.sleeper.as_ref(), interval, cancel, origin_url).await?;
                }
            }
        }
    }

    /// Fetch the current state of the tracked save request
    ///
    /// A throttled `GET` is re-issued after backing off; the save is not
    /// resubmitted since the request already exists.
    async fn fetch_record(
        &self,
        request: &SaveRequest,
        key: &TaskKey,
        cancel: &CancellationToken,
    ) -> Result<(TaskRecord, String)> {
        let origin_url = request.origin_url();
        let max_throttled = self.config.rate_limit.max_throttle_restarts;
        let mut throttled = 0;

        loop {
            let reply = self
                .call(Method::GET, request, Phase::Progress, cancel)
                .await?;

            match classify_status(
                reply.status,
                origin_url,
                &reply.body,
                reply.rate_limit.reset_epoch_seconds,
            ) {
                Ok(()) => {}
                Err(Error::RateLimited { reset_epoch, .. }) if throttled < max_throttled => {
                    throttled += 1;
                    tracing::warn!(throttled, "Status check throttled, retrying after backoff");
                    self.throttle(request, reset_epoch, cancel).await?;
                    continue;
                }
                Err(e) => return Err(e),
            }

            let payload = decode_payload(&reply.body, origin_url)?;
            let record = find_task_record(payload, key, origin_url, &reply.body)?;
            return Ok((record, reply.body));
        }
    }
}
