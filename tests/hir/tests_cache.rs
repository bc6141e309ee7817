//! Memoization of analyses across concurrent requests.

use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use semcache::Position;
use semcache::hir::{AnalysisError, CacheError, FailurePolicy};
use semcache::ide::LoadError;
use semcache::testing::StubAnalyzer;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

use crate::helpers::host_helpers::*;
use crate::helpers::source_fixtures::*;

fn no_program() -> AnalysisError {
    AnalysisError::NoProgramProduced {
        import_path: "example.com/ws/app".into(),
        dir: ws_path("app"),
    }
}

// =============================================================================
// EXACTLY ONCE
// =============================================================================

#[test]
fn test_concurrent_requests_share_one_analysis() {
    const THREADS: usize = 8;
    let stub = Arc::new(
        StubAnalyzer::new()
            .with_source(app_workspace())
            .with_latency(Duration::from_millis(50)),
    );
    let host = Arc::new(stub_host(config(), app_workspace(), stub.clone()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let host = Arc::clone(&host);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let file = if i % 2 == 0 { "app/main.go" } else { "app/extra.go" };
                barrier.wait();
                host.load_program(&ws_path(file), Position::new(0, 0))
                    .unwrap()
            })
        })
        .collect();
    let loaded: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(stub.calls_for(&loaded[0].unit.key()), 1);
    assert_eq!(stub.calls(), 1);
    for other in &loaded[1..] {
        assert!(Arc::ptr_eq(&loaded[0].analysis, &other.analysis));
    }
    let stats = host.cache().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, THREADS as u64 - 1);
}

#[test]
fn test_fast_key_is_not_blocked_by_slow_key() {
    let source = workspace(&[
        ("slow/slow.go", "package slow\n"),
        ("fast/fast.go", "package fast\n"),
    ]);
    let (started_tx, started_rx) = mpsc::channel();
    let stub = Arc::new(
        StubAnalyzer::new()
            .with_source(source.clone())
            .with_latency_for("slow", Duration::from_millis(500))
            .with_start_signal(started_tx),
    );
    let host = Arc::new(stub_host(config(), source, stub.clone()));
    let (done_tx, done_rx) = mpsc::channel();

    let slow = {
        let host = Arc::clone(&host);
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            host.load_program(&ws_path("slow/slow.go"), Position::new(0, 0))
                .unwrap();
            done_tx.send("slow").unwrap();
        })
    };
    assert_eq!(started_rx.recv().unwrap(), "slow");
    host.load_program(&ws_path("fast/fast.go"), Position::new(0, 0))
        .unwrap();
    done_tx.send("fast").unwrap();

    slow.join().unwrap();
    let order: Vec<&str> = done_rx.try_iter().collect();
    assert_eq!(order, vec!["fast", "slow"]);
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn test_sticky_failure_is_replayed() {
    let stub = Arc::new(StubAnalyzer::failing(no_program()));
    let host = stub_host(
        config().with_failure_policy(FailurePolicy::Sticky),
        app_workspace(),
        stub.clone(),
    );
    let path = ws_path("app/main.go");

    for _ in 0..3 {
        let err = host.load_program(&path, Position::new(0, 0)).unwrap_err();
        assert!(matches!(err, LoadError::Analysis(CacheError::Failed(_))));
    }
    assert_eq!(stub.calls(), 1);
}

#[test]
fn test_retry_failure_recomputes() {
    let stub = Arc::new(StubAnalyzer::failing(no_program()));
    let host = stub_host(
        config().with_failure_policy(FailurePolicy::Retry),
        app_workspace(),
        stub.clone(),
    );
    let path = ws_path("app/main.go");

    for _ in 0..3 {
        let err = host.load_program(&path, Position::new(0, 0)).unwrap_err();
        assert!(matches!(err, LoadError::Analysis(CacheError::Failed(e)) if e == no_program()));
    }
    assert_eq!(stub.calls(), 3);
    assert!(host.cache().is_empty());
}

#[test]
fn test_panicking_analysis_is_isolated() {
    let source = app_workspace();
    let stub = Arc::new(StubAnalyzer::panicking());
    let host = stub_host(config(), source.clone(), stub.clone());

    let err = host
        .load_program(&ws_path("app/main.go"), Position::new(0, 0))
        .unwrap_err();
    assert!(matches!(err, LoadError::Analysis(CacheError::Panicked)));
    assert!(host.cache().is_empty());

    // The key is retried on the next request.
    host.load_program(&ws_path("app/main.go"), Position::new(0, 0))
        .unwrap_err();
    assert_eq!(stub.calls(), 2);
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[test]
fn test_cancelled_waiter_leaves_computation_running() {
    let source = app_workspace();
    let (started_tx, started_rx) = mpsc::channel();
    let stub = Arc::new(
        StubAnalyzer::new()
            .with_source(source.clone())
            .with_latency(Duration::from_millis(300))
            .with_start_signal(started_tx),
    );
    let host = Arc::new(stub_host(config(), source, stub.clone()));
    let path = ws_path("app/main.go");

    let owner = {
        let host = Arc::clone(&host);
        let path = path.clone();
        thread::spawn(move || host.load_program(&path, Position::new(0, 0)))
    };
    started_rx.recv().unwrap();

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
        })
    };
    let err = host
        .load_program_cancellable(&path, Position::new(0, 0), &token)
        .unwrap_err();
    assert!(matches!(err, LoadError::Cancelled));
    canceller.join().unwrap();

    let loaded = owner.join().unwrap().unwrap();
    assert!(host.cache().contains(&loaded.unit.key()));
    assert_eq!(stub.calls(), 1);
}

// =============================================================================
// TRACING
// =============================================================================

#[test]
#[traced_test]
fn test_miss_runs_inside_request_span() {
    let (host, _) = script_host(app_workspace());
    host.load_program(&ws_path("app/main.go"), Position::new(0, 0))
        .unwrap();
    host.load_program(&ws_path("app/main.go"), Position::new(1, 0))
        .unwrap();

    assert!(logs_contain("load_program"));
    assert!(logs_contain("analysis cache miss"));
    assert!(logs_contain("unit=example.com/ws/app [app] /ws/app"));
    assert!(logs_contain("analysis cache hit"));
}
