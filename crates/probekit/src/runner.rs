//! Named sub-cases with failure recording, skips and cleanups
//!
//! A [`Runner`] executes sub-cases one after the other. Each sub-case gets
//! a [`TestCase`] handle to record non-fatal failures and register cleanup
//! actions; it ends by returning a [`CaseResult`], where [`Abort`] carries
//! a fatal failure or a skip. A panic inside a sub-case is recorded as a
//! failure of that sub-case only.

use crate::config::HarnessConfig;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, info_span, warn, Instrument};

/// Early end of a sub-case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abort {
    /// Failure that stops the sub-case
    Fatal(String),
    /// Precondition not met, the sub-case neither passes nor fails
    Skip(String),
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abort::Fatal(message) => write!(f, "fatal: {}", message),
            Abort::Skip(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// What a sub-case body returns
pub type CaseResult = Result<(), Abort>;

/// Final state of a sub-case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(Vec<String>),
    Skipped(String),
}

/// Record of one finished sub-case
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub name: String,
    pub outcome: Outcome,
    pub logs: Vec<String>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    pub fn skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped(_))
    }

    pub fn failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }

    /// Recorded failure messages, empty unless failed
    pub fn failures(&self) -> &[String] {
        match &self.outcome {
            Outcome::Failed(messages) => messages,
            _ => &[],
        }
    }

    pub fn print_summary(&self) {
        match &self.outcome {
            Outcome::Passed => println!("✅ {} - PASS", self.name),
            Outcome::Skipped(reason) => println!("⏭️  {} - SKIP ({})", self.name, reason),
            Outcome::Failed(messages) => {
                println!("❌ {} - FAIL ({} failures)", self.name, messages.len());
                for message in messages {
                    for line in message.lines() {
                        println!("   {}", line);
                    }
                }
            }
        }
    }
}

type Cleanup = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

#[derive(Default)]
struct CaseState {
    failures: Vec<String>,
    logs: Vec<String>,
    skipped: Option<String>,
    cleanups: Vec<Cleanup>,
}

struct CaseInner {
    name: String,
    config: Arc<HarnessConfig>,
    state: Mutex<CaseState>,
}

impl Drop for CaseInner {
    fn drop(&mut self) {
        // Cleanups of a case dropped without `finish` still run
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let pending = std::mem::take(&mut state.cleanups);
        for cleanup in pending.into_iter().rev() {
            if let Err(message) = run_cleanup(cleanup) {
                warn!("{}: {}", self.name, message);
            }
        }
    }
}

/// Handle on a running sub-case
///
/// Clones share the same state and can be moved to other tasks.
#[derive(Clone)]
pub struct TestCase {
    inner: Arc<CaseInner>,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.inner.name)
            .field("failed", &self.failed())
            .finish()
    }
}

impl TestCase {
    pub fn new(name: impl Into<String>, config: impl Into<Arc<HarnessConfig>>) -> Self {
        Self {
            inner: Arc::new(CaseInner {
                name: name.into(),
                config: config.into(),
                state: Mutex::new(CaseState::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.inner.config
    }

    fn state(&self) -> MutexGuard<'_, CaseState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a message to the report
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}: {}", self.name(), message);
        self.state().logs.push(message);
    }

    /// Record a failure and keep going
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}: {}", self.name(), message);
        self.state().failures.push(message);
    }

    /// Failure ending the sub-case, to be returned with `?` or `Err`
    pub fn fatal(&self, message: impl Into<String>) -> Abort {
        Abort::Fatal(message.into())
    }

    /// Skip ending the sub-case, to be returned with `?` or `Err`
    pub fn skip(&self, reason: impl Into<String>) -> Abort {
        Abort::Skip(reason.into())
    }

    /// Whether a failure has been recorded so far
    pub fn failed(&self) -> bool {
        !self.state().failures.is_empty()
    }

    /// Register an action run when the sub-case ends, last registered first
    pub fn cleanup<F>(&self, action: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.state().cleanups.push(Box::new(action));
    }

    /// Record how the body ended, run cleanups and build the report
    pub fn finish(self, result: CaseResult) -> CaseReport {
        match result {
            Ok(()) => {}
            Err(Abort::Fatal(message)) => {
                warn!("{}: {}", self.name(), message);
                self.state().failures.push(message);
            }
            Err(Abort::Skip(reason)) => self.state().skipped = Some(reason),
        }

        let pending = std::mem::take(&mut self.state().cleanups);
        for cleanup in pending.into_iter().rev() {
            if let Err(message) = run_cleanup(cleanup) {
                self.error(message);
            }
        }

        let mut state = self.state();
        let outcome = if !state.failures.is_empty() {
            Outcome::Failed(std::mem::take(&mut state.failures))
        } else if let Some(reason) = state.skipped.take() {
            Outcome::Skipped(reason)
        } else {
            Outcome::Passed
        };
        CaseReport {
            name: self.inner.name.clone(),
            outcome,
            logs: std::mem::take(&mut state.logs),
        }
    }
}

fn run_cleanup(cleanup: Cleanup) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(cleanup)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(panic) => Err(format!("cleanup panicked: {}", panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn panicked(panic: Box<dyn Any + Send>) -> CaseResult {
    Err(Abort::Fatal(format!("panicked: {}", panic_message(&*panic))))
}

/// Runs sub-cases and keeps their reports
#[derive(Debug)]
pub struct Runner {
    config: Arc<HarnessConfig>,
    reports: Vec<CaseReport>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

impl Runner {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config: Arc::new(config),
            reports: Vec::new(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Handle for a new sub-case sharing this runner's configuration
    pub fn case(&self, name: impl Into<String>) -> TestCase {
        TestCase::new(name, Arc::clone(&self.config))
    }

    /// Run an async sub-case
    pub async fn run<F, Fut>(&mut self, name: impl Into<String>, body: F) -> &CaseReport
    where
        F: FnOnce(TestCase) -> Fut,
        Fut: Future<Output = CaseResult>,
    {
        let case = self.case(name);
        let handle = case.clone();
        let span = info_span!("case", name = %case.name());
        let result = AssertUnwindSafe(async move { body(handle).await })
            .catch_unwind()
            .instrument(span)
            .await
            .unwrap_or_else(panicked);
        self.record(case.finish(result))
    }

    /// Run a blocking sub-case
    pub fn run_sync<F>(&mut self, name: impl Into<String>, body: F) -> &CaseReport
    where
        F: FnOnce(&TestCase) -> CaseResult,
    {
        let case = self.case(name);
        let span = info_span!("case", name = %case.name());
        let result = span
            .in_scope(|| panic::catch_unwind(AssertUnwindSafe(|| body(&case))))
            .unwrap_or_else(panicked);
        self.record(case.finish(result))
    }

    fn record(&mut self, report: CaseReport) -> &CaseReport {
        match &report.outcome {
            Outcome::Passed => info!("{}: passed", report.name),
            Outcome::Skipped(reason) => info!("{}: skipped ({})", report.name, reason),
            Outcome::Failed(messages) => {
                info!("{}: failed ({} failures)", report.name, messages.len())
            }
        }
        let index = self.reports.len();
        self.reports.push(report);
        &self.reports[index]
    }

    pub fn reports(&self) -> &[CaseReport] {
        &self.reports
    }

    /// Reports of failed sub-cases
    pub fn failures(&self) -> Vec<&CaseReport> {
        self.reports.iter().filter(|r| r.failed()).collect()
    }

    /// Whether no sub-case failed; skipped sub-cases do not count
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(|r| !r.failed())
    }

    /// Print summary of all reports
    pub fn print_summary(&self) {
        println!("\n=== Probe Summary ===");
        for report in &self.reports {
            report.print_summary();
        }

        let passed = self.reports.iter().filter(|r| r.passed()).count();
        let skipped = self.reports.iter().filter(|r| r.skipped()).count();
        let total = self.reports.len();
        println!();
        println!("Results: {}/{} passed, {} skipped", passed, total, skipped);

        if self.all_passed() {
            println!("✅ All cases passed!");
        } else {
            println!("❌ {} cases failed", self.failures().len());
        }
    }
}
