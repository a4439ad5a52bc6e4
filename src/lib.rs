//! # swh-save
//!
//! Client for asking the Software Heritage archive to save a source code
//! origin and following the request until the archive has loaded it.
//!
//! ## Design Philosophy
//!
//! swh-save is designed to be:
//! - **Rate-limit aware** - The API quota is probed before every request and
//!   throttled calls back off until the quota resets
//! - **Bounded** - Acceptance and completion polling stop at configurable
//!   attempt and time limits, and every wait honours a cancellation token
//! - **Library-first** - No CLI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to progress events
//!
//! ## Quick Start
//!
//! ```no_run
//! use swh_save::{Config, SaveOptions, SaveRequest, SwhClient, VisitType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SwhClient::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = client.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let request = SaveRequest::new("https://hg.example.org/project")
//!         .with_visit_type(VisitType::Hg)
//!         .with_auth_token(std::env::var("SWH_AUTH_TOKEN").unwrap_or_default());
//!     let outcome = client.save(&request, SaveOptions::default()).await?;
//!     println!("Saved with visit status {:?}", outcome.visit_status());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Response status classification
pub mod classify;
/// Save orchestration (decomposed into focused submodules)
pub mod client;
/// Configuration types
pub mod config;
/// Save endpoint URL construction
pub mod endpoint;
/// Error types
pub mod error;
/// Lookup of the tracked record in API responses
pub mod matcher;
/// Quota probing and backoff
pub mod rate_limiter;
/// Delay abstraction for waits
pub mod sleeper;
/// Core types
pub mod types;

pub use client::SwhClient;
pub use config::{Config, PollConfig, RateLimitConfig};
pub use error::{Error, Phase, PollPhase, Result};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
pub use types::{
    Event, RateLimitStatus, SaveOptions, SaveOutcome, SaveRequest, SaveRequestStatus,
    SaveTaskStatus, TaskId, TaskPayload, TaskRecord, VisitType,
};
