//! Configuration types for swh-save

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public Software Heritage API root
pub const DEFAULT_API_ROOT: &str = "https://archive.softwareheritage.org/api/1/";

/// Main configuration for [`SwhClient`](crate::SwhClient)
///
/// Every field has a default, so an empty JSON/TOML document is a valid
/// configuration that talks to the public archive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// API root, including the version segment (default: public archive)
    #[serde(default = "default_api_root")]
    pub api_root: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Capacity of the event broadcast channel (default: 64)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Rate limit handling
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Polling while the save request awaits acceptance
    #[serde(default)]
    pub acceptance: PollConfig,

    /// Polling while the loading task runs
    #[serde(default)]
    pub completion: PollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            event_capacity: default_event_capacity(),
            rate_limit: RateLimitConfig::default(),
            acceptance: PollConfig::default(),
            completion: PollConfig::default(),
        }
    }
}

impl Config {
    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api_root).map_err(|e| Error::Config {
            message: format!("api_root {:?} is not a valid URL: {e}", self.api_root),
            key: Some("api_root".to_string()),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("api_root must use http or https, got {}", parsed.scheme()),
                key: Some("api_root".to_string()),
            });
        }
        if self.event_capacity == 0 {
            return Err(Error::Config {
                message: "event_capacity must be at least 1".to_string(),
                key: Some("event_capacity".to_string()),
            });
        }
        self.acceptance.validate("acceptance")?;
        self.completion.validate("completion")?;
        Ok(())
    }
}

/// Rate limit handling configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Extra wait added on top of the advertised reset time (default: 2 seconds)
    #[serde(default = "default_safety_margin", with = "duration_serde")]
    pub safety_margin: Duration,

    /// How many times a throttled request is retried before giving up (default: 5)
    ///
    /// For submissions this bounds full restarts of the save; for polls it
    /// bounds re-issues of the same `GET`.
    #[serde(default = "default_max_throttle_restarts")]
    pub max_throttle_restarts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            safety_margin: default_safety_margin(),
            max_throttle_restarts: default_max_throttle_restarts(),
        }
    }
}

/// Bounds for one polling loop
///
/// At least one of `max_attempts` and `max_duration` must be set; a loop with
/// neither would poll a stuck task forever.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between polls (default: 1 second)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Maximum number of re-polls (None = no attempt limit)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Maximum time spent in the loop (default: 1 hour, None = no time limit)
    #[serde(
        default = "default_poll_max_duration",
        with = "optional_duration_serde"
    )]
    pub max_duration: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_attempts: None,
            max_duration: default_poll_max_duration(),
        }
    }
}

impl PollConfig {
    fn validate(&self, key: &str) -> Result<()> {
        if self.max_attempts.is_none() && self.max_duration.is_none() {
            return Err(Error::Config {
                message: format!("{key} polling needs max_attempts or max_duration"),
                key: Some(key.to_string()),
            });
        }
        Ok(())
    }
}

fn default_api_root() -> String {
    DEFAULT_API_ROOT.to_string()
}

fn default_user_agent() -> String {
    format!("swh-save/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_event_capacity() -> usize {
    64
}

fn default_safety_margin() -> Duration {
    Duration::from_secs(2)
}

fn default_max_throttle_restarts() -> u32 {
    5
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_poll_max_duration() -> Option<Duration> {
    Some(Duration::from_secs(3600))
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
