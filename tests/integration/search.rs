//! Expanding-radius search and session behaviour against scripted registries.

use rust_decimal_macros::dec;
use std::sync::Arc;

use aankoopkompas::estimator::search::SearchState;
use aankoopkompas::estimator::session::EstimateSession;
use aankoopkompas::estimator::{ComparableSalesEstimator, SearchPolicy};
use aankoopkompas::types::{Coordinate, EstimateStatus, TransactionRecord};

use crate::mock_registry::{coord, houses_at, uniform_houses, FetchGate, ScriptedRegistry};

fn estimator(registry: ScriptedRegistry) -> ComparableSalesEstimator {
    ComparableSalesEstimator::new(Arc::new(registry), SearchPolicy::default())
}

#[tokio::test]
async fn test_outlier_is_trimmed() {
    let registry = ScriptedRegistry::new().with_records(
        500,
        houses_at(&[1000.0, 1200.0, 1300.0, 1400.0, 1500.0, 1600.0, 5000.0]),
    );
    let result = estimator(registry).estimate(coord()).await;

    assert_eq!(result.status, EstimateStatus::Found);
    assert_eq!(result.average_price_per_area, Some(dec!(1400)));
    assert_eq!(result.sample_count, 7);
    assert_eq!(result.search_radius_m, Some(500));
}

#[tokio::test]
async fn test_every_radius_empty_is_insufficient() {
    let registry = ScriptedRegistry::new();
    let log = registry.call_log();
    let result = estimator(registry).estimate(coord()).await;

    assert_eq!(result.status, EstimateStatus::InsufficientData);
    assert_eq!(result.average_price_per_area, None);
    assert_eq!(result.sample_count, 0);
    assert_eq!(*log.lock().unwrap(), vec![500, 1000, 3000, 5000, 10000, 20000]);
}

#[tokio::test]
async fn test_radii_widen_in_order_and_stop_at_first_sufficient() {
    let registry = ScriptedRegistry::new()
        .with_records(500, uniform_houses(2, 1800.0))
        .with_records(1000, uniform_houses(5, 1900.0))
        .with_records(3000, uniform_houses(6, 2100.0))
        .with_records(5000, uniform_houses(40, 9999.0));
    let log = registry.call_log();
    let result = estimator(registry).estimate(coord()).await;

    assert_eq!(result.search_radius_m, Some(3000));
    assert_eq!(result.average_price_per_area, Some(dec!(2100)));
    assert_eq!(*log.lock().unwrap(), vec![500, 1000, 3000]);
}

#[tokio::test]
async fn test_exactly_min_sample_size_is_not_enough() {
    let registry = ScriptedRegistry::new()
        .with_records(500, uniform_houses(5, 2000.0))
        .with_records(1000, uniform_houses(6, 2500.0));
    let result = estimator(registry).estimate(coord()).await;

    assert_eq!(result.search_radius_m, Some(1000));
    assert_eq!(result.sample_count, 6);
}

#[tokio::test]
async fn test_irrelevant_records_are_ignored() {
    let mut records = uniform_houses(3, 2000.0);
    records.push(TransactionRecord::house_sale(10_000.0, 100.0, None));
    records.push(TransactionRecord::house_sale(200_000.0, 20.0, None));
    let mut flat = TransactionRecord::house_sale(200_000.0, 100.0, None);
    flat.property_type = aankoopkompas::types::PropertyType::Apartment;
    records.extend(std::iter::repeat(flat).take(10));

    let registry = ScriptedRegistry::new().with_records(500, records);
    let log = registry.call_log();
    let result = estimator(registry).estimate(coord()).await;

    assert_eq!(result.status, EstimateStatus::InsufficientData);
    assert_eq!(log.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn test_failed_radius_is_skipped() {
    let registry = ScriptedRegistry::new()
        .with_failure(500, "connection reset")
        .with_records(1000, uniform_houses(8, 2300.0));
    let result = estimator(registry).estimate(coord()).await;

    assert_eq!(result.status, EstimateStatus::Found);
    assert_eq!(result.search_radius_m, Some(1000));
}

#[tokio::test]
async fn test_all_radii_failing_reports_transport_error() {
    let registry = ScriptedRegistry::new().failing("offline");
    let result = estimator(registry).estimate(coord()).await;

    assert_eq!(result.status, EstimateStatus::TransportError);
    assert_eq!(result.average_price_per_area, None);
}

#[tokio::test]
async fn test_partial_failures_without_data_are_insufficient() {
    let registry = ScriptedRegistry::new().with_failure(500, "timeout");
    let result = estimator(registry).estimate(coord()).await;
    assert_eq!(result.status, EstimateStatus::InsufficientData);
}

#[tokio::test]
async fn test_same_input_same_result() {
    let registry = ScriptedRegistry::new()
        .with_records(3000, houses_at(&[1500.0, 1700.0, 1900.0, 2100.0, 2300.0, 2500.0, 2700.0]));
    let est = estimator(registry);
    let first = est.estimate(coord()).await;
    let second = est.estimate(coord()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_progress_reports_each_radius() {
    let registry = ScriptedRegistry::new().with_records(1000, uniform_houses(6, 2000.0));
    let mut seen = Vec::new();
    let result = estimator(registry)
        .estimate_with_progress(coord(), |s| seen.push(s))
        .await;

    assert!(result.is_found());
    assert_eq!(
        seen,
        vec![
            SearchState::SearchingAtRadius(500),
            SearchState::SearchingAtRadius(1000),
            SearchState::Found,
        ]
    );
}

#[tokio::test]
async fn test_custom_policy_threshold() {
    let policy = SearchPolicy {
        radii_m: vec![2000],
        min_sample_size: 0,
        ..SearchPolicy::default()
    };
    let registry = ScriptedRegistry::new().with_records(2000, uniform_houses(1, 3100.0));
    let est = ComparableSalesEstimator::new(Arc::new(registry), policy);
    let result = est.estimate(coord()).await;

    assert_eq!(result.average_price_per_area, Some(dec!(3100)));
    assert_eq!(result.sample_count, 1);
}

// -- Session ---------------------------------------------------------------

#[tokio::test]
async fn test_run_commits_current_result() {
    let registry = ScriptedRegistry::new().with_records(500, uniform_houses(6, 2000.0));
    let est = estimator(registry);
    let session = EstimateSession::new();

    let request = session.request(coord()).await;
    let tagged = est.run(request, &session).await.unwrap();
    assert_eq!(tagged.generation, request.generation);

    let view = session.current().await.unwrap();
    assert_eq!(view.estimate.unwrap().average_price_per_area, Some(dec!(2000)));
}

#[tokio::test]
async fn test_stale_result_is_discarded() {
    let gate = FetchGate::default();
    let registry = ScriptedRegistry::new()
        .with_records(500, uniform_houses(6, 2000.0))
        .gated(gate.clone());
    let est = estimator(registry);
    let session = EstimateSession::new();
    let newer = Coordinate::new(48.85, 2.35).unwrap();

    let first = session.request(coord()).await;
    let (outcome, _) = tokio::join!(est.run(first, &session), async {
        gate.entered.notified().await;
        session.request(newer).await;
        gate.release.notify_one();
    });

    assert!(outcome.is_none());
    let view = session.current().await.unwrap();
    assert_eq!(view.coordinate, newer);
    assert!(view.estimate.is_none(), "stale result must not overwrite the new request");
}

#[tokio::test]
async fn test_superseded_search_stops_widening() {
    let gate = FetchGate::default();
    let registry = ScriptedRegistry::new().gated(gate.clone());
    let log = registry.call_log();
    let est = estimator(registry);
    let session = EstimateSession::new();

    let first = session.request(coord()).await;
    let (outcome, _) = tokio::join!(est.run(first, &session), async {
        gate.entered.notified().await;
        session.request(Coordinate::new(45.0, 4.0).unwrap()).await;
        gate.release.notify_one();
    });

    assert!(outcome.is_none());
    assert_eq!(*log.lock().unwrap(), vec![500]);
}
