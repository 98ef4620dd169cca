//! Harness configuration.
//!
//! Resolution order, later wins:
//!
//! 1. built-in defaults
//! 2. a YAML file ([`HarnessConfig::from_yaml_file`])
//! 3. `BLOGPROBE_*` environment variables ([`HarnessConfig::apply_env`])
//! 4. command-line flags (applied by the CLI through the `with_*` builders)

use crate::result::{HarnessError, HarnessResult};
use crate::wait::{
    PollPolicy, DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default application URL (Vite dev server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173";

/// Default backend API root
pub const DEFAULT_API_URL: &str = "http://localhost:3003/api";

/// Default per-scenario deadline (30 seconds)
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 30_000;

/// Configuration shared by every scenario of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Application root the browser navigates to
    pub base_url: String,
    /// Backend API root for reset/seed calls
    pub api_url: String,
    /// Auto-wait budget for clicks and fills
    pub action_timeout_ms: u64,
    /// Default budget for `expect` assertions
    pub expect_timeout_ms: u64,
    /// Deadline for one whole scenario including setup
    pub scenario_timeout_ms: u64,
    /// First polling interval
    pub poll_interval_ms: u64,
    /// Polling interval ceiling
    pub max_poll_interval_ms: u64,
    /// Polling backoff multiplier
    pub poll_backoff: f64,
    /// Scenarios in flight at once
    pub workers: usize,
    /// Skip remaining scenarios after the first failure
    pub fail_fast: bool,
    /// Run the browser without a window
    pub headless: bool,
    /// Explicit chromium executable
    pub chromium_path: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            action_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            expect_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            scenario_timeout_ms: DEFAULT_SCENARIO_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            poll_backoff: DEFAULT_BACKOFF_FACTOR,
            workers: 1,
            fail_fast: false,
            headless: true,
            chromium_path: None,
        }
    }
}

impl HarnessConfig {
    /// Load a configuration from a YAML file; absent keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read and a YAML error if it
    /// does not parse.
    pub fn from_yaml_file(path: &Path) -> HarnessResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse a configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns a YAML error on malformed input or unknown keys.
    pub fn from_yaml_str(text: &str) -> HarnessResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Render as YAML
    ///
    /// # Errors
    ///
    /// Returns a YAML error if serialization fails.
    pub fn to_yaml(&self) -> HarnessResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `BLOGPROBE_*` overrides from the process environment
    ///
    /// # Errors
    ///
    /// Returns a config error naming the variable that does not parse.
    pub fn apply_env(self) -> HarnessResult<Self> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply `BLOGPROBE_*` overrides from an arbitrary lookup
    ///
    /// # Errors
    ///
    /// Returns a config error naming the variable that does not parse.
    pub fn apply_vars<F>(mut self, lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> HarnessResult<T> {
            value
                .trim()
                .parse()
                .map_err(|_| HarnessError::config(format!("{key}={value:?} is not valid")))
        }

        if let Some(v) = lookup("BLOGPROBE_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("BLOGPROBE_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("BLOGPROBE_ACTION_TIMEOUT_MS") {
            self.action_timeout_ms = parse("BLOGPROBE_ACTION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("BLOGPROBE_EXPECT_TIMEOUT_MS") {
            self.expect_timeout_ms = parse("BLOGPROBE_EXPECT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("BLOGPROBE_SCENARIO_TIMEOUT_MS") {
            self.scenario_timeout_ms = parse("BLOGPROBE_SCENARIO_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("BLOGPROBE_WORKERS") {
            self.workers = parse("BLOGPROBE_WORKERS", &v)?;
        }
        if let Some(v) = lookup("BLOGPROBE_FAIL_FAST") {
            self.fail_fast = parse("BLOGPROBE_FAIL_FAST", &v)?;
        }
        if let Some(v) = lookup("BLOGPROBE_HEADLESS") {
            self.headless = parse("BLOGPROBE_HEADLESS", &v)?;
        }
        if let Some(v) = lookup("BLOGPROBE_CHROMIUM_PATH") {
            self.chromium_path = Some(PathBuf::from(v));
        }
        Ok(self)
    }

    /// Reject values the runner cannot work with
    ///
    /// # Errors
    ///
    /// Returns a config error describing the first invalid value.
    pub fn validate(&self) -> HarnessResult<()> {
        for (name, url) in [("base_url", &self.base_url), ("api_url", &self.api_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(HarnessError::config(format!(
                    "{name} must be an http(s) URL, got {url:?}"
                )));
            }
        }
        if self.workers == 0 {
            return Err(HarnessError::config("workers must be at least 1"));
        }
        if self.scenario_timeout_ms == 0 {
            return Err(HarnessError::config("scenario_timeout_ms must be positive"));
        }
        if !self.poll_backoff.is_finite() || self.poll_backoff < 1.0 {
            return Err(HarnessError::config("poll_backoff must be >= 1.0"));
        }
        Ok(())
    }

    /// Set the application URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the backend API root
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the action and expect timeouts
    #[must_use]
    pub const fn with_step_timeout(mut self, ms: u64) -> Self {
        self.action_timeout_ms = ms;
        self.expect_timeout_ms = ms;
        self
    }

    /// Set the per-scenario deadline
    #[must_use]
    pub const fn with_scenario_timeout(mut self, ms: u64) -> Self {
        self.scenario_timeout_ms = ms;
        self
    }

    /// Set the number of scenarios in flight
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable or disable fail-fast
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run headless or headed
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the poll intervals
    #[must_use]
    pub const fn with_poll_interval(mut self, interval_ms: u64, max_interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self.max_poll_interval_ms = max_interval_ms;
        self
    }

    fn policy(&self, timeout_ms: u64) -> PollPolicy {
        PollPolicy::new(timeout_ms)
            .with_interval(self.poll_interval_ms)
            .with_max_interval(self.max_poll_interval_ms)
            .with_backoff(self.poll_backoff)
    }

    /// Poll policy for actions
    #[must_use]
    pub fn action_policy(&self) -> PollPolicy {
        self.policy(self.action_timeout_ms)
    }

    /// Poll policy for assertions
    #[must_use]
    pub fn expect_policy(&self) -> PollPolicy {
        self.policy(self.expect_timeout_ms)
    }
}
