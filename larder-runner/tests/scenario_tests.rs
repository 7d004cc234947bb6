use larder_core::{ErrorKind, Inventory, LayerSet, ManualClock, ResourceKey};
use larder_runner::{read_jobs, InventoryCommand, InventoryJob, JobDefaults, JobRunner, Outcome};
use larder_storage::Composer;
use larder_test_utils::assertions::assert_access_denied;
use larder_test_utils::fixtures::{chain_with, config_with};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn error_kind(outcome: &Outcome) -> Option<ErrorKind> {
    match outcome {
        Outcome::Error { kind, .. } => Some(*kind),
        _ => None,
    }
}

#[test]
fn cache_scenario_on_composed_chain() {
    let clock = Arc::new(ManualClock::new());
    let layers = LayerSet {
        lazy: false,
        guard: false,
        cache: true,
    };
    let chain = Composer::new(config_with(&[("A", 10)], layers).with_ttl(Duration::from_millis(1500)))
        .with_clock(clock.clone())
        .build()
        .unwrap();
    let a = ResourceKey::new("A");
    let reads = || chain.store().map(|s| s.read_calls()).unwrap_or(0);

    assert_eq!(chain.get(&a).unwrap(), 10);
    assert_eq!(reads(), 1);
    assert_eq!(chain.get(&a).unwrap(), 10);
    assert_eq!(reads(), 1);

    chain.increase(&a, 3).unwrap();
    assert_eq!(chain.get(&a).unwrap(), 13);
    assert_eq!(reads(), 2);

    clock.advance(Duration::from_millis(1600));
    assert_eq!(chain.get(&a).unwrap(), 13);
    assert_eq!(reads(), 3);

    let stats = chain.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 3);
    assert_eq!(stats.expirations, 1);
}

#[test]
fn guard_scenario_on_composed_chain() {
    let layers = LayerSet {
        lazy: false,
        guard: true,
        cache: false,
    };
    let chain = Composer::new(config_with(&[("B", 5)], layers).with_can_write(false))
        .build()
        .unwrap();
    let b = ResourceKey::new("B");

    assert_eq!(chain.get(&b).unwrap(), 5);
    assert_access_denied(&chain.increase(&b, 3));
    assert_access_denied(&chain.reserve(&b, 2));
    assert_eq!(chain.get(&b).unwrap(), 5);
    assert_eq!(chain.guard_denials(), Some(2));
}

#[test]
fn job_file_runs_both_scenarios() {
    let jobs = read_jobs(&fixture("jobs.json")).unwrap();
    assert_eq!(jobs.len(), 2);

    let batch = JobRunner::new(JobDefaults::default()).run_jobs(&jobs).unwrap();
    assert_eq!(batch.count, 2);

    let cached = &batch.results[0];
    let values: Vec<_> = cached
        .logs
        .iter()
        .filter_map(|log| match log.outcome {
            Outcome::Value { value } => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![10, 10, 13, 13]);
    assert_eq!(cached.logs[2].action, "increase");
    assert_eq!(cached.logs[2].outcome, Outcome::Ok);
    assert_eq!(cached.logs[4].outcome, Outcome::Waited { delay_ms: 260 });
    assert_eq!(cached.store_reads, Some(3));
    assert_eq!(cached.constructions, Some(1));
    assert_eq!(cached.final_stock, BTreeMap::from([("SKU-001".to_string(), 13)]));
    let cache = cached.cache.as_ref().unwrap();
    assert_eq!(cache.hits, 1);
    assert_eq!(cache.expirations, 1);

    let guarded = &batch.results[1];
    let kinds: Vec<_> = guarded.logs.iter().map(|log| error_kind(&log.outcome)).collect();
    assert_eq!(
        kinds,
        vec![None, Some(ErrorKind::AccessDenied), Some(ErrorKind::AccessDenied), None]
    );
    assert_eq!(guarded.logs[3].outcome, Outcome::Value { value: 5 });
    assert_eq!(guarded.final_stock, BTreeMap::from([("SKU-002".to_string(), 5)]));
    assert_eq!(guarded.guard_denials, Some(2));
    assert!(guarded.cache.is_none());
    assert_eq!(guarded.constructions, None);
}

#[test]
fn jobs_do_not_share_state() {
    let runner = JobRunner::new(JobDefaults {
        latency_ms: 0,
        ..Default::default()
    });
    let job = InventoryJob {
        initial_stock: BTreeMap::from([("A".to_string(), 1)]),
        commands: vec![InventoryCommand::reserve("A", 1), InventoryCommand::get("A")],
        ..Default::default()
    };

    let batch = runner.run_jobs(&[job.clone(), job]).unwrap();
    for report in &batch.results {
        assert_eq!(report.logs[0].outcome, Outcome::Reserved { reserved: true });
        assert_eq!(report.final_stock.get("A"), Some(&0));
    }
    assert_ne!(batch.results[0].job_id, batch.results[1].job_id);
}

#[test]
fn report_serializes_with_camel_case_fields() {
    let runner = JobRunner::new(JobDefaults {
        latency_ms: 0,
        ..Default::default()
    });
    let report = runner
        .run_job(&InventoryJob {
            initial_stock: BTreeMap::from([("A".to_string(), 2)]),
            commands: vec![InventoryCommand::get("A")],
            ..Default::default()
        })
        .unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["options"]["useLazy"], true);
    assert_eq!(value["initialStock"]["A"], 2);
    assert_eq!(value["finalStock"]["A"], 2);
    assert_eq!(value["storeReads"], 1);
    assert_eq!(value["logs"][0]["outcome"], "value");
    assert!(value.get("guardDenials").is_none());
}

#[test]
fn missing_job_file_is_config_error() {
    let err = read_jobs(&fixture("missing.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn fixture_chain_reads_case_insensitively() {
    let chain = chain_with(&[("Sku-9", 4)], LayerSet::all());
    assert_eq!(chain.get(&ResourceKey::new("SKU-9")).unwrap(), 4);
}
