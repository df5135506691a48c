//! End-to-end simulator runs

use plateful_core::{PlatefulConfig, PlatefulError, RetryPolicy};
use plateful_sim::{run_simulator, SimulatorConfig, Violation};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn small(seed: u64, concurrency: usize) -> SimulatorConfig {
    SimulatorConfig {
        seed,
        users: 8,
        operations: 150,
        concurrency,
        app: PlatefulConfig::new().with_retry(RetryPolicy::default().with_max_attempts(50)),
        ..SimulatorConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_workload_keeps_invariants() {
    let report = run_simulator(small(7, 8)).await.unwrap();
    assert!(report.passed(), "{}", report.generate_text());
    assert_eq!(report.stats.operations_attempted, 150);
    assert!(report.stats.operations_rejected > 0);
    assert!(report.generate_text().contains("=== Result: PASS ==="));
}

#[tokio::test]
async fn sequential_runs_are_reproducible() {
    let a = run_simulator(small(99, 1)).await.unwrap();
    let b = run_simulator(small(99, 1)).await.unwrap();
    assert!(a.passed());
    assert_eq!(a.stats.operations_succeeded, b.stats.operations_succeeded);
    assert_eq!(a.stats.follow_edges, b.stats.follow_edges);
    assert_eq!(a.stats.review_likes, b.stats.review_likes);
    assert_eq!(a.stats.conflicts_retried, 0);
}

#[tokio::test]
async fn report_serializes_for_machine_consumers() {
    let report = run_simulator(small(3, 2)).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["config"]["seed"], 3);
    assert!(json["violations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn failing_report_renders_violations() {
    let mut report = run_simulator(small(5, 1)).await.unwrap();
    report.violations.push(Violation::SelfEdge {
        user: "user-0001".into(),
    });
    assert!(!report.passed());
    let text = report.generate_text();
    assert!(text.contains("=== Violations ==="));
    assert!(text.contains("=== Result: FAIL ==="));
}

#[tokio::test]
async fn invalid_service_config_is_refused() {
    let config = SimulatorConfig {
        app: PlatefulConfig::new().with_feed_limit(0),
        ..small(1, 1)
    };
    assert!(run_simulator(config).await.is_err());
}

#[tokio::test]
async fn too_few_users_is_an_error() {
    for users in [0, 1] {
        let result = run_simulator(SimulatorConfig {
            users,
            ..small(1, 1)
        })
        .await;
        assert!(matches!(result, Err(PlatefulError::Config(_))));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn any_seed_passes_the_audit(seed in any::<u64>()) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let report = runtime
            .block_on(run_simulator(SimulatorConfig { operations: 80, ..small(seed, 4) }))
            .unwrap();
        prop_assert!(report.passed(), "{}", report.generate_text());
    }
}
