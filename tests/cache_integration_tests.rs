mod common;

use chrono::{Duration, Utc};
use common::*;
use taskmesh_core::config::TaskmeshConfig;
use taskmesh_core::models::UoWProcessingOutcome;
use taskmesh_core::resilience::{ConcurrencyMode, ResilienceMode, TaskIdentityContext};

#[tokio::test]
async fn test_finished_parcel_evicted_after_max_age() {
    let mesh = TestMesh::new();
    let wup = mesh.deploy_wup("1", "ingest", ResilienceMode::Standalone, ConcurrencyMode::Standalone);
    let coordinator = &mesh.context.coordinator;
    let cache = &mesh.context.cache;

    let parcel = coordinator
        .register_new_work_unit_activity(TaskIdentityContext::new(
            wup,
            unique_uow(observation_manifest()),
        ))
        .await
        .unwrap()
        .parcel;
    coordinator.notify_start(parcel.id()).await.unwrap();
    let mut uow = parcel.uow().unwrap().clone();
    uow.record_outcome(vec![], UoWProcessingOutcome::Success).unwrap();
    let finished = coordinator.notify_finish(parcel.id(), uow).await.unwrap();
    let t = finished.end_date().unwrap();

    cache.sweep_at(t + Duration::minutes(9));
    assert!(cache.get(parcel.id()).is_ok());

    let report = cache.sweep_at(t + Duration::minutes(11));
    assert_eq!(report.evicted, 1);
    assert!(cache.get(parcel.id()).unwrap_err().is_not_found());
    assert!(cache.episode(parcel.episode_id()).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_in_progress_parcels_survive_sweeps() {
    let mesh = TestMesh::new();
    let wup = mesh.deploy_wup("1", "ingest", ResilienceMode::Clustered, ConcurrencyMode::OnDemand);
    let parcel = mesh
        .context
        .coordinator
        .register_new_work_unit_activity(TaskIdentityContext::new(
            wup,
            unique_uow(observation_manifest()),
        ))
        .await
        .unwrap()
        .parcel;

    let report = mesh.context.cache.sweep_at(Utc::now() + Duration::days(1));
    assert_eq!(report.evicted, 0);
    assert!(mesh.context.cache.get(parcel.id()).is_ok());

    let stats = mesh.context.cache.stats(Utc::now() + Duration::days(1));
    assert_eq!(stats.in_progress, 1);
    assert!(stats.oldest_non_terminal_age_seconds.unwrap() >= 86_000);
}

#[tokio::test]
async fn test_background_sweeper_evicts_cancelled_parcels() {
    let mut config = TaskmeshConfig::default();
    config.cache.sweep_period_seconds = 1;
    config.cache.max_parcel_age_seconds = 1;
    let mesh = TestMesh::with_config(config);
    let wup = mesh.deploy_wup("1", "ingest", ResilienceMode::Standalone, ConcurrencyMode::Standalone);

    let parcel = mesh
        .context
        .coordinator
        .register_new_work_unit_activity(TaskIdentityContext::new(
            wup,
            unique_uow(observation_manifest()),
        ))
        .await
        .unwrap()
        .parcel;
    mesh.context.coordinator.notify_cancellation(parcel.id()).await.unwrap();

    let housekeeping = mesh.context.start_housekeeping();
    tokio::time::sleep(std::time::Duration::from_millis(3500)).await;
    housekeeping.shutdown();

    assert!(mesh.context.cache.get(parcel.id()).unwrap_err().is_not_found());
}
