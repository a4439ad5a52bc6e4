//! Submission of the save request.

use super::{SwhClient, decode_payload};
use crate::classify::classify_status;
use crate::error::{Error, Phase, Result};
use crate::matcher::TaskKey;
use crate::types::{Event, SaveRequest, TaskPayload, TaskRecord};
use reqwest::Method;
use tokio_util::sync::CancellationToken;

/// Record returned by a successful submission
pub(super) struct Submitted {
    /// Decoded record
    pub(super) record: TaskRecord,
    /// Raw response body
    pub(super) raw: String,
    /// Identity used to find the record in later list responses
    pub(super) key: TaskKey,
}

impl SwhClient {
    /// Submit the save request, starting over whenever the API throttles it
    ///
    /// A 429 on submission means the archive refused the `POST` before
    /// creating anything, so resubmitting cannot duplicate the request. The
    /// number of restarts is bounded by `rate_limit.max_throttle_restarts`.
    pub(super) async fn submit_with_restarts(
        &self,
        request: &SaveRequest,
        cancel: &CancellationToken,
    ) -> Result<Submitted> {
        let max_restarts = self.config.rate_limit.max_throttle_restarts;
        let mut restarts = 0;

        loop {
            match self.submit(request, cancel).await {
                Err(Error::RateLimited { reset_epoch, .. }) if restarts < max_restarts => {
                    restarts += 1;
                    tracing::warn!(
                        restart = restarts,
                        max_restarts,
                        "Save request throttled, starting over after backoff"
                    );
                    self.throttle(request, reset_epoch, cancel).await?;
                    self.emit(Event::Resubmitting {
                        origin_url: request.origin_url().to_string(),
                        restart: restarts,
                    });
                }
                other => return other,
            }
        }
    }

    /// One submission attempt
    async fn submit(&self, request: &SaveRequest, cancel: &CancellationToken) -> Result<Submitted> {
        let origin_url = request.origin_url();
        let reply = self
            .call(Method::POST, request, Phase::Submission, cancel)
            .await?;

        classify_status(
            reply.status,
            origin_url,
            &reply.body,
            reply.rate_limit.reset_epoch_seconds,
        )?;

        // The API answers a POST with exactly the record it created
        let record = match decode_payload(&reply.body, origin_url)? {
            TaskPayload::One(record) => record,
            TaskPayload::Many(_) => {
                return Err(Error::InvalidResponse {
                    origin_url: origin_url.to_string(),
                    message: "expected a single save request record".to_string(),
                    body: reply.body,
                });
            }
        };
        let key = TaskKey::for_record(&record);

        tracing::info!(
            task_id = ?record.task_id,
            request_status = %record.save_request_status,
            "Save request submitted"
        );
        self.emit(Event::Submitted {
            origin_url: origin_url.to_string(),
            task_id: record.task_id.clone(),
            request_status: record.save_request_status.clone(),
        });

        Ok(Submitted {
            record,
            raw: reply.body,
            key,
        })
    }
}
