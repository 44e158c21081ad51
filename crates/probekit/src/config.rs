//! Runtime configuration for the harness

use std::env;
use std::time::Duration;

/// Set (non-empty) when unmet dependencies must fail instead of skip
pub const MANDATORY_ENV: &str = "CI_PROBEKIT_FUNCTIONAL_TESTS";

/// Set (non-empty) to skip slow checks such as readiness probes
pub const SHORT_ENV: &str = "PROBEKIT_SHORT";

/// Configuration shared by every case of a [`Runner`](crate::Runner)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Unreachable dependencies fail the case instead of skipping it
    pub mandatory: bool,
    /// Reduced run, readiness probes skip
    pub short: bool,
    /// Per-candidate bound on name resolution
    pub resolve_timeout: Duration,
    /// Overall bound on connection attempts
    pub connect_deadline: Duration,
    /// Pause between connection attempts
    pub retry_interval: Duration,
    /// Bound on a whole HTTP exchange
    pub request_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            mandatory: flag(MANDATORY_ENV),
            short: flag(SHORT_ENV),
            resolve_timeout: millis("PROBEKIT_RESOLVE_TIMEOUT_MS", 100),
            connect_deadline: millis("PROBEKIT_CONNECT_DEADLINE_MS", 1000),
            retry_interval: millis("PROBEKIT_RETRY_INTERVAL_MS", 100),
            request_timeout: millis("PROBEKIT_REQUEST_TIMEOUT_MS", 30_000),
        }
    }

    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn with_short(mut self, short: bool) -> Self {
        self.short = short;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_connect_deadline(mut self, deadline: Duration) -> Self {
        self.connect_deadline = deadline;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// How the mandatory flag is reported in messages
    pub(crate) fn mandatory_label(&self) -> String {
        let state = if self.mandatory { "set" } else { "not set" };
        format!("{} is {}", MANDATORY_ENV, state)
    }
}

fn flag(name: &str) -> bool {
    env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
}

fn millis(name: &str, default: u64) -> Duration {
    let ms = env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default);
    Duration::from_millis(ms)
}
