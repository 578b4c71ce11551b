use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use super::*;
use crate::config::{Config, Preferences};
use crate::freshness::InMemoryFreshnessStore;
use crate::model::{FeatureBundle, TraitVector, UserId};
use crate::scoring::MatchEngine;

type TestDriver = JobDriver<SnapshotSource, MemorySink, Arc<InMemoryFreshnessStore>>;

const TAGS: [&str; 6] = ["hiking", "jazz", "chess", "film", "travel", "books"];

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

fn population() -> Vec<FeatureBundle> {
    (1..=10u64)
        .map(|id| {
            let i = id as usize;
            FeatureBundle::new(id)
                .with_interests([TAGS[i % 6], TAGS[(i * 2) % 6], TAGS[(i + 3) % 6]])
                .with_traits(TraitVector::dense([
                    (id as f64 / 10.0) - 0.5,
                    0.2,
                    1.0 - id as f64 / 10.0,
                ]))
                .with_timestamps(None, Some(now() - Duration::days(id as i64 * 3)))
        })
        .collect()
}

fn flags() -> JobFlags {
    JobFlags {
        user_id: None,
        batch_size: 3,
        candidate_batch_size: 4,
        pause: std::time::Duration::ZERO,
        top_k: 3,
        full_refresh: false,
    }
}

fn driver_with(
    bundles: Vec<FeatureBundle>,
    config: Config,
    store: Arc<InMemoryFreshnessStore>,
) -> TestDriver {
    let engine = MatchEngine::new(Preferences::default()).unwrap();
    JobDriver::new(
        engine,
        config,
        SnapshotSource::from_bundles(bundles),
        MemorySink::new(),
        store,
    )
    .with_clock(now())
}

fn driver() -> TestDriver {
    driver_with(population(), Config::default(), Arc::default())
}

#[tokio::test]
async fn test_match_scores_ranks_every_viewer() {
    let driver = driver();
    let report = driver.run(JobName::MatchScores, &flags()).await.unwrap();

    assert_eq!(report.processed, 10);
    assert_eq!(report.failed, 0);
    assert_eq!(report.batches, 4);
    assert!(!report.cancelled);

    let all = population();
    for viewer in &all {
        let stored = driver.sink().scores_for(viewer.id).unwrap();
        let expected = driver.engine().rank_exhaustive(viewer, &all, now(), 3);
        assert_eq!(stored, expected, "viewer {}", viewer.id);
    }
    assert_eq!(driver.cache().store().len(), 10);
}

#[tokio::test]
async fn test_rerun_skips_fresh_units() {
    let driver = driver();
    driver.run(JobName::MatchScores, &flags()).await.unwrap();
    let writes = driver.sink().write_count();

    let report = driver.run(JobName::MatchScores, &flags()).await.unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(report.skipped_fresh, 10);
    assert_eq!(driver.sink().write_count(), writes);
}

#[tokio::test]
async fn test_changed_candidate_invalidates_viewers() {
    let store = Arc::new(InMemoryFreshnessStore::new());
    let first = driver_with(population(), Config::default(), Arc::clone(&store));
    first.run(JobName::MatchScores, &flags()).await.unwrap();

    let mut changed = population();
    changed[4] = changed[4].clone().with_interests(["sailing"]);
    let second = driver_with(changed, Config::default(), Arc::clone(&store));
    let report = second.run(JobName::MatchScores, &flags()).await.unwrap();

    // Every viewer's candidate pool includes user 5.
    assert_eq!(report.processed, 10);
    assert_eq!(report.skipped_fresh, 0);
}

#[tokio::test]
async fn test_algorithm_version_change_invalidates_hashes() {
    let store = Arc::new(InMemoryFreshnessStore::new());
    driver_with(population(), Config::default(), Arc::clone(&store))
        .run(JobName::MatchScores, &flags())
        .await
        .unwrap();

    let config = Config {
        algorithm_version: "v2".to_string(),
        ..Config::default()
    };
    let report = driver_with(population(), config, Arc::clone(&store))
        .run(JobName::MatchScores, &flags())
        .await
        .unwrap();
    assert_eq!(report.processed, 10);
}

#[tokio::test]
async fn test_next_day_recomputes() {
    let store = Arc::new(InMemoryFreshnessStore::new());
    driver_with(population(), Config::default(), Arc::clone(&store))
        .run(JobName::MatchScores, &flags())
        .await
        .unwrap();

    let later_same_day = driver_with(population(), Config::default(), Arc::clone(&store))
        .with_clock(now() + Duration::hours(6));
    let report = later_same_day
        .run(JobName::MatchScores, &flags())
        .await
        .unwrap();
    assert_eq!(report.skipped_fresh, 10);

    let next_day = driver_with(population(), Config::default(), Arc::clone(&store))
        .with_clock(now() + Duration::days(1));
    let report = next_day.run(JobName::MatchScores, &flags()).await.unwrap();
    assert_eq!(report.processed, 10);
}

#[tokio::test]
async fn test_full_refresh_flag_and_config_override_freshness() {
    let driver = driver();
    driver.run(JobName::MatchScores, &flags()).await.unwrap();

    let refresh = JobFlags {
        full_refresh: true,
        ..flags()
    };
    let report = driver.run(JobName::MatchScores, &refresh).await.unwrap();
    assert_eq!(report.processed, 10);

    let store = Arc::new(InMemoryFreshnessStore::new());
    driver_with(population(), Config::default(), Arc::clone(&store))
        .run(JobName::MatchScores, &flags())
        .await
        .unwrap();
    let config = Config {
        full_recompute: true,
        ..Config::default()
    };
    let report = driver_with(population(), config, store)
        .run(JobName::MatchScores, &flags())
        .await
        .unwrap();
    assert_eq!(report.processed, 10);
}

#[tokio::test]
async fn test_unavailable_freshness_store_never_blocks() {
    let store = Arc::new(InMemoryFreshnessStore::new());
    store.set_unavailable(true);
    let driver = driver_with(population(), Config::default(), store);

    for _ in 0..2 {
        let report = driver.run(JobName::MatchScores, &flags()).await.unwrap();
        assert_eq!(report.processed, 10);
        assert_eq!(report.failed, 0);
    }
}

#[tokio::test]
async fn test_single_user_run_and_not_found() {
    let driver = driver();
    let single = JobFlags {
        user_id: Some(UserId(3)),
        ..flags()
    };
    let report = driver.run(JobName::MatchScores, &single).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.batches, 1);
    assert_eq!(driver.sink().viewers(), vec![UserId(3)]);

    let missing = JobFlags {
        user_id: Some(UserId(99)),
        ..flags()
    };
    let err = driver.run(JobName::MatchScores, &missing).await.unwrap_err();
    assert!(matches!(err, JobError::NotFound { id } if id == UserId(99)));
}

#[tokio::test]
async fn test_failed_unit_is_counted_and_retried_next_run() {
    let driver = driver();
    driver.sink().fail_for(UserId(4));

    let report = driver.run(JobName::MatchScores, &flags()).await.unwrap();
    assert_eq!(report.processed, 9);
    assert_eq!(report.failed, 1);
    assert!(driver.sink().scores_for(UserId(4)).is_none());

    let report = driver.run(JobName::MatchScores, &flags()).await.unwrap();
    assert_eq!(report.skipped_fresh, 9);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_trait_profiles_job() {
    let mut bundles = population();
    bundles.push(FeatureBundle::new(11).with_traits(TraitVector::new(vec![
        Some(3.0),
        Some(4.0),
        None,
    ])));
    bundles.push(FeatureBundle::new(12));
    let driver = driver_with(bundles, Config::default(), Arc::default());

    let report = driver.run(JobName::TraitProfiles, &flags()).await.unwrap();
    assert_eq!(report.processed, 12);

    let profile = driver.sink().profile_for(UserId(11)).unwrap();
    assert_eq!(profile.dimensions, 3);
    assert_eq!(profile.answered, 2);
    assert!((profile.coverage - 2.0 / 3.0).abs() < 1e-12);
    assert!((profile.norm - 5.0).abs() < 1e-12);

    let empty = driver.sink().profile_for(UserId(12)).unwrap();
    assert_eq!(empty.dimensions, 0);
    assert_eq!(empty.coverage, 0.0);

    let report = driver.run(JobName::TraitProfiles, &flags()).await.unwrap();
    assert_eq!(report.skipped_fresh, 12);
}

#[tokio::test]
async fn test_group_refuses_out_of_order_dependencies() {
    let driver = driver();
    let err = driver
        .run_group(&[JobName::MatchScores, JobName::TraitProfiles], &flags())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        JobError::DependencyOrder {
            job: JobName::MatchScores,
            dependency: JobName::TraitProfiles
        }
    ));
    assert_eq!(driver.sink().write_count(), 0);

    let reports = driver
        .run_group(&[JobName::TraitProfiles, JobName::MatchScores], &flags())
        .await
        .unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.processed == 10));
}

#[tokio::test]
async fn test_match_scores_do_not_read_persisted_profiles() {
    let alone = driver();
    alone.run(JobName::MatchScores, &flags()).await.unwrap();

    let grouped = driver();
    grouped
        .run_group(&[JobName::TraitProfiles, JobName::MatchScores], &flags())
        .await
        .unwrap();

    assert_eq!(grouped.sink().viewers().len(), 10);
    for viewer in grouped.sink().viewers() {
        assert_eq!(
            alone.sink().scores_for(viewer),
            grouped.sink().scores_for(viewer),
            "viewer {viewer}"
        );
    }
}

#[test]
fn test_validate_order_allows_missing_dependencies() {
    assert!(validate_order(&[JobName::MatchScores]).is_ok());
    assert!(validate_order(&[JobName::TraitProfiles]).is_ok());
    assert!(validate_order(&[]).is_ok());
}

#[tokio::test]
async fn test_shutdown_stops_between_batches() {
    let driver = driver();
    driver.shutdown_handle().store(true, Ordering::SeqCst);

    let report = driver.run(JobName::MatchScores, &flags()).await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.batches, 0);
    assert_eq!(driver.sink().write_count(), 0);

    let reports = driver
        .run_group(&[JobName::TraitProfiles, JobName::MatchScores], &flags())
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
}

#[tokio::test]
async fn test_zero_sizes_are_rejected() {
    let driver = driver();
    for bad in [
        JobFlags {
            top_k: 0,
            ..flags()
        },
        JobFlags {
            batch_size: 0,
            ..flags()
        },
        JobFlags {
            candidate_batch_size: 0,
            ..flags()
        },
    ] {
        let err = driver.run(JobName::MatchScores, &bad).await.unwrap_err();
        assert!(matches!(err, JobError::Validation { .. }));
    }
}

#[test]
fn test_job_name_parsing() {
    assert_eq!("match-scores".parse::<JobName>(), Ok(JobName::MatchScores));
    assert_eq!(" Trait-Profiles ".parse::<JobName>(), Ok(JobName::TraitProfiles));
    assert!("rank".parse::<JobName>().is_err());
    assert_eq!(JobName::MatchScores.to_string(), "match-scores");
    assert_eq!(JobName::MatchScores.depends_on(), &[JobName::TraitProfiles]);
}

#[tokio::test]
async fn test_snapshot_source_pages_by_id() {
    let source = SnapshotSource::from_bundles(population());
    let ids = source.target_ids(Some(UserId(3)), 2).await.unwrap();
    assert_eq!(ids, vec![UserId(4), UserId(5)]);

    let tail = source.candidate_page(UserId(1), Some(UserId(8)), 10).await.unwrap();
    assert_eq!(tail.len(), 2);
    assert!(source.feature_bundle(UserId(42)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_snapshot_source_loads_json_array() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bundles.json");
    std::fs::write(
        &path,
        r#"[{"id": 2, "interests": ["jazz"]}, {"id": 1, "updatedAt": "2024-05-01T00:00:00Z"}]"#,
    )
    .unwrap();

    let source = SnapshotSource::load(&path).await.unwrap();
    assert_eq!(source.len(), 2);
    let ids = source.target_ids(None, 10).await.unwrap();
    assert_eq!(ids, vec![UserId(1), UserId(2)]);
}

#[tokio::test]
async fn test_json_lines_sink_appends_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.jsonl");
    let store = Arc::new(InMemoryFreshnessStore::new());
    let engine = MatchEngine::new(Preferences::default()).unwrap();
    let driver = JobDriver::new(
        engine,
        Config::default(),
        SnapshotSource::from_bundles(population()),
        JsonLinesSink::open(&path).await.unwrap(),
        store,
    )
    .with_clock(now());

    let single = JobFlags {
        user_id: Some(UserId(1)),
        ..flags()
    };
    driver.run(JobName::TraitProfiles, &single).await.unwrap();
    driver.run(JobName::MatchScores, &single).await.unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let rows: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["job"], "trait-profiles");
    assert_eq!(rows[0]["userId"], 1);
    assert_eq!(rows[1]["job"], "match-scores");
    assert_eq!(rows[1]["rank"], 1);
    assert_eq!(rows[3]["rank"], 3);
    assert!(rows[1]["finalScore"].as_f64().unwrap() >= rows[2]["finalScore"].as_f64().unwrap());
}
