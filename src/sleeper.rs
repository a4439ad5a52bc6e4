//! Delay abstraction used for backoff and poll intervals
//!
//! All waiting in a save run goes through a [`Sleeper`], so embedders can
//! substitute their own timing (e.g. [`RecordingSleeper`] in tests) and every
//! wait can be raced against a cancellation token.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Something that can wait for a duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and remembers every requested delay
///
/// # Examples
///
/// ```
/// use swh_save::sleeper::{RecordingSleeper, Sleeper};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let sleeper = RecordingSleeper::default();
/// sleeper.sleep(Duration::from_secs(60)).await;
/// assert_eq!(sleeper.delays(), vec![Duration::from_secs(60)]);
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Delays requested so far, in order
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|delays| delays.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

/// Wait for `duration` unless `cancel` fires first
pub(crate) async fn pause(
    sleeper: &dyn Sleeper,
    duration: Duration,
    cancel: &CancellationToken,
    origin_url: &str,
) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled {
            origin_url: origin_url.to_string(),
        }),
        _ = sleeper.sleep(duration) => Ok(()),
    }
}
