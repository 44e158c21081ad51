//! Readiness of external services
//!
//! A dependency is looked up under a list of candidate names, then dialed
//! until it accepts connections. When it never becomes ready the case is
//! skipped, or failed when [`MANDATORY_ENV`](crate::config::MANDATORY_ENV)
//! is set.

use crate::runner::{Abort, TestCase};
use std::fmt;
use std::future::Future;
use std::net::Ipv6Addr;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, trace};

/// A dependency reachable under one of several names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessTarget {
    /// Name used in messages
    pub name: String,
    /// Host names tried in order, the first resolving one wins
    pub candidates: Vec<String>,
    pub port: u16,
}

impl ReadinessTarget {
    pub fn new<I, C>(name: impl Into<String>, candidates: I, port: u16) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            name: name.into(),
            candidates: candidates.into_iter().map(Into::into).collect(),
            port,
        }
    }
}

/// Why a single attempt did not succeed
#[derive(Debug)]
pub enum AttemptError<E> {
    Failed(E),
    TimedOut(Duration),
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Failed(e) => write!(f, "{}", e),
            AttemptError::TimedOut(after) => write!(f, "timed out after {:?}", after),
        }
    }
}

/// Attempts ran out before one succeeded
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: usize,
    pub last_error: Option<AttemptError<E>>,
}

impl<E: fmt::Display> fmt::Display for Exhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.last_error {
            Some(e) => write!(f, "gave up after {} attempts: {}", self.attempts, e),
            None => write!(f, "gave up after {} attempts", self.attempts),
        }
    }
}

/// Retry loop bounded per attempt, overall and in number of attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundedRetry {
    pub attempt_timeout: Option<Duration>,
    pub deadline: Option<Duration>,
    pub interval: Duration,
    pub max_attempts: Option<usize>,
}

impl BoundedRetry {
    /// Call `attempt` with the attempt number until it succeeds or a bound
    /// is reached
    pub async fn run<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let deadline = self.deadline.map(|d| Instant::now() + d);
        let mut attempts = 0;
        let mut last_error = None;
        loop {
            let out_of_attempts = self.max_attempts.is_some_and(|max| attempts >= max);
            let out_of_time = deadline.is_some_and(|d| Instant::now() >= d);
            if out_of_attempts || out_of_time {
                return Err(Exhausted {
                    attempts,
                    last_error,
                });
            }

            // The attempt ends at its own timeout or at the deadline, whichever comes first
            let started = Instant::now();
            let bound = match (self.attempt_timeout.map(|t| started + t), deadline) {
                (Some(own), Some(overall)) => Some(own.min(overall)),
                (own, overall) => own.or(overall),
            };
            let future = attempt(attempts);
            attempts += 1;
            let result = match bound {
                Some(at) => match timeout_at(at, future).await {
                    Ok(result) => result.map_err(AttemptError::Failed),
                    Err(_) => Err(AttemptError::TimedOut(at.saturating_duration_since(started))),
                },
                None => future.await.map_err(AttemptError::Failed),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    trace!("attempt {} failed", attempts);
                    last_error = Some(e);
                }
            }

            if !self.interval.is_zero() && !self.max_attempts.is_some_and(|max| attempts >= max) {
                sleep(self.interval).await;
            }
        }
    }
}

/// `host:port`, IPv6 literals bracketed
fn join_host_port(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

async fn resolve(candidate: &str) -> std::io::Result<()> {
    let mut addrs = lookup_host((candidate, 0)).await?;
    match addrs.next() {
        Some(addr) => {
            trace!("{} resolves to {}", candidate, addr.ip());
            Ok(())
        }
        None => Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no address for {}", candidate),
        )),
    }
}

/// Wait for `target` to accept connections and return its `host:port`
///
/// Short runs skip. A dependency that cannot be resolved or that does not
/// accept connections before the deadline skips the case, or fails it when
/// the run is mandatory.
pub async fn check_external_service(
    case: &TestCase,
    target: &ReadinessTarget,
) -> Result<String, Abort> {
    let config = case.config();
    if config.short {
        return Err(case.skip(format!("Skip test with real {} in short mode", target.name)));
    }
    let unmet = |message: String| {
        if config.mandatory {
            case.fatal(message)
        } else {
            case.skip(message)
        }
    };

    let resolution = BoundedRetry {
        attempt_timeout: Some(config.resolve_timeout),
        max_attempts: Some(target.candidates.len()),
        ..BoundedRetry::default()
    };
    let candidates = &target.candidates;
    let found = resolution
        .run(move |i| async move {
            let candidate = candidates[i].as_str();
            resolve(candidate).await.map(|()| candidate)
        })
        .await
        .map_err(|e| {
            debug!("{}: {}", target.name, e);
            unmet(format!(
                "{} cannot be resolved ({})",
                target.name,
                config.mandatory_label()
            ))
        })?;

    let server = join_host_port(found, target.port);
    let connection = BoundedRetry {
        deadline: Some(config.connect_deadline),
        interval: config.retry_interval,
        ..BoundedRetry::default()
    };
    let mandatory = config.mandatory;
    let address = server.as_str();
    connection
        .run(move |_| async move {
            let result = TcpStream::connect(address).await;
            if let Err(e) = &result {
                if mandatory {
                    case.log(format!("connect() error:\n{}", e));
                }
            }
            result.map(drop)
        })
        .await
        .map_err(|e| {
            debug!("{}: {}", target.name, e);
            unmet(format!(
                "{} is not running ({})",
                target.name,
                config.mandatory_label()
            ))
        })?;

    debug!("{} is ready at {}", target.name, server);
    Ok(server)
}
