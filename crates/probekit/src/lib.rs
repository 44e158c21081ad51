//! Black-box test harness for network services
//!
//! This crate drives tables of test cases against a running service and
//! reports each entry as its own sub-case.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ ┌──────────────┐
//! │   Endpoint   │ │    Decode    │ │  Readiness   │ │  Lifecycle   │
//! │    Probe     │ │   Harness    │ │    Probe     │ │    Guard     │
//! └──────┬───────┘ └──────┬───────┘ └──────┬───────┘ └──────┬───────┘
//!        │                │                │                │
//!        └────────────────┴───────┬────────┴────────────────┘
//!                                 │
//!                          ┌──────▼──────┐      ┌──────────────┐
//!                          │   Runner    │      │ Diff Engine  │
//!                          │  TestCase   │      │(probekit-diff│
//!                          └─────────────┘      └──────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use probekit::{check_endpoints, EndpointCase, HarnessConfig, Runner};
//!
//! let mut runner = Runner::new(HarnessConfig::from_env());
//! check_endpoints(&mut runner, addr, &[EndpointCase {
//!     url: "/api/v0/info".to_string(),
//!     json_output: Some(json!({"version": "dev"})),
//!     ..Default::default()
//! }]).await;
//! runner.print_summary();
//! assert!(runner.all_passed());
//! ```

pub mod config;
pub mod decode;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod readiness;
pub mod runner;

pub use config::{HarnessConfig, MANDATORY_ENV, SHORT_ENV};
pub use decode::{check_configuration_decode, DecodeCase};
pub use http::{check_endpoints, EndpointCase, EndpointProbe, JSON_CONTENT_TYPE};
pub use lifecycle::{start_stop, Component, Starter, Stopper};
pub use readiness::{check_external_service, BoundedRetry, ReadinessTarget};
pub use runner::{Abort, CaseReport, CaseResult, Outcome, Runner, TestCase};

// Re-export the diff entry points for convenience
pub use probekit_diff::{diff, diff_with, DiffOption};
