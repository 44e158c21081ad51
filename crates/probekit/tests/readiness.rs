//! Readiness probe against real sockets

use probekit::logging::init_test_tracing;
use probekit::{check_external_service, Abort, HarnessConfig, Outcome, ReadinessTarget, Runner};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

fn config(mandatory: bool) -> HarnessConfig {
    init_test_tracing();
    HarnessConfig::from_env()
        .with_mandatory(mandatory)
        .with_short(false)
        .with_resolve_timeout(Duration::from_millis(500))
        .with_connect_deadline(Duration::from_millis(300))
        .with_retry_interval(Duration::from_millis(20))
}

fn unresolvable() -> ReadinessTarget {
    ReadinessTarget::new("kafka", ["kafka.invalid", "broker.invalid"], 9092)
}

#[tokio::test]
async fn test_unresolvable_is_skipped_when_not_mandatory() {
    let mut runner = Runner::new(config(false));
    let report = runner
        .run("kafka", |case| async move {
            check_external_service(&case, &unresolvable()).await?;
            panic!("not reached");
        })
        .await;
    assert_eq!(
        report.outcome,
        Outcome::Skipped(
            "kafka cannot be resolved (CI_PROBEKIT_FUNCTIONAL_TESTS is not set)".to_string()
        )
    );
    assert!(runner.all_passed());
}

#[tokio::test]
async fn test_unresolvable_fails_when_mandatory() {
    let mut runner = Runner::new(config(true));
    let report = runner
        .run("kafka", |case| async move {
            check_external_service(&case, &unresolvable()).await?;
            Ok(())
        })
        .await;
    assert_eq!(
        report.failures(),
        ["kafka cannot be resolved (CI_PROBEKIT_FUNCTIONAL_TESTS is set)"]
    );
}

#[tokio::test]
async fn test_first_resolving_candidate_is_used() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let target = ReadinessTarget::new("clickhouse", ["clickhouse.invalid", "127.0.0.1"], port);

    let case = Runner::new(config(true)).case("clickhouse");
    let server = check_external_service(&case, &target).await.unwrap();
    assert_eq!(server, format!("127.0.0.1:{}", port));
}

#[tokio::test]
async fn test_ipv6_literal_is_bracketed() {
    let Ok(listener) = TcpListener::bind("[::1]:0").await else {
        // No IPv6 loopback on this host
        return;
    };
    let port = listener.local_addr().unwrap().port();
    let case = Runner::new(config(true)).case("ipv6");
    let server = check_external_service(&case, &ReadinessTarget::new("svc", ["::1"], port))
        .await
        .unwrap();
    assert_eq!(server, format!("[::1]:{}", port));
}

#[tokio::test]
async fn test_closed_port_gives_up_at_deadline() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let target = ReadinessTarget::new("redis", ["127.0.0.1"], port);

    let started = Instant::now();
    let case = Runner::new(config(false)).case("redis");
    let err = check_external_service(&case, &target).await.unwrap_err();
    assert_eq!(
        err,
        Abort::Skip("redis is not running (CI_PROBEKIT_FUNCTIONAL_TESTS is not set)".to_string())
    );
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(5));

    let mut runner = Runner::new(config(true));
    let report = runner
        .run("redis", |case| async move {
            check_external_service(&case, &target).await.map(drop)
        })
        .await;
    assert_eq!(
        report.failures(),
        ["redis is not running (CI_PROBEKIT_FUNCTIONAL_TESTS is set)"]
    );
    assert!(report.logs.iter().any(|l| l.starts_with("connect() error:\n")));
}

#[tokio::test]
async fn test_short_mode_skips() {
    let case = Runner::new(config(true).with_short(true)).case("kafka");
    let err = check_external_service(&case, &unresolvable()).await.unwrap_err();
    assert_eq!(
        err,
        Abort::Skip("Skip test with real kafka in short mode".to_string())
    );
}
