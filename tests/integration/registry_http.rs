//! Registry clients against wiremock HTTP mocks.

use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aankoopkompas::estimator::commune::{CommuneAggregator, CommunePolicy};
use aankoopkompas::estimator::{ComparableSalesEstimator, SearchPolicy};
use aankoopkompas::registry::cadastre::CadastreClient;
use aankoopkompas::registry::cquest::CquestClient;
use aankoopkompas::registry::geo_dvf::GeoDvfClient;
use aankoopkompas::registry::{CommuneRegistry, ParcelLookup, SalesRegistry};
use aankoopkompas::types::{EstimateStatus, KompasError, PropertyType};

use crate::mock_registry::coord;

fn mutation(nature: &str, local: &str, price: Value, area: Value, date: &str) -> Value {
    json!({
        "type": "Feature",
        "geometry": null,
        "properties": {
            "nature_mutation": nature,
            "type_local": local,
            "valeur_fonciere": price,
            "surface_reelle_bati": area,
            "date_mutation": date
        }
    })
}

fn collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

fn houses(price_per_area: &[f64]) -> Value {
    collection(
        price_per_area
            .iter()
            .map(|ppa| mutation("Vente", "Maison", json!(ppa * 100.0), json!(100), "2024-05-02"))
            .collect(),
    )
}

// -- Radius query ----------------------------------------------------------

#[tokio::test]
async fn test_cquest_fetch_parses_mutations() {
    let server = MockServer::start().await;

    let body = collection(vec![
        mutation("Vente", "Maison", json!(185000), json!(92), "2023-06-14"),
        mutation("Vente", "Appartement", json!("98000.00"), Value::Null, "2022-01-03"),
        json!({ "type": "Feature" }),
    ]);

    Mock::given(method("GET"))
        .and(path("/dvf"))
        .and(query_param("dist", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = CquestClient::with_endpoint(Client::new(), format!("{}/dvf", server.uri()));
    let records = client.fetch_within(coord(), 500).await.expect("should parse");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].property_type, PropertyType::House);
    assert_eq!(records[0].price, Some(185_000.0));
    assert_eq!(records[1].price, Some(98_000.0));
    assert_eq!(records[1].built_area, None);
}

#[tokio::test]
async fn test_cquest_server_error_is_transport() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = CquestClient::with_endpoint(Client::new(), server.uri());
    let err = client.fetch_within(coord(), 1000).await.unwrap_err();
    assert!(matches!(err, KompasError::Transport { .. }));
}

#[tokio::test]
async fn test_cquest_garbage_body_is_transport() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = CquestClient::with_endpoint(Client::new(), server.uri());
    let err = client.fetch_within(coord(), 1000).await.unwrap_err();
    assert!(matches!(err, KompasError::Transport { .. }));
}

#[tokio::test]
async fn test_estimator_over_http_widens_until_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("dist", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(houses(&[2000.0, 2100.0])))
        .expect(1)
        .mount(&server)
        .await;

    // 1000 m is not mounted: wiremock answers 404, which counts as a failed radius.

    Mock::given(method("GET"))
        .and(query_param("dist", "3000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(houses(&[
            1000.0, 1200.0, 1300.0, 1400.0, 1500.0, 1600.0, 5000.0,
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("dist", "5000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(houses(&[9000.0; 20])))
        .expect(0)
        .mount(&server)
        .await;

    let client = CquestClient::with_endpoint(Client::new(), server.uri());
    let estimator = ComparableSalesEstimator::new(Arc::new(client), SearchPolicy::default());
    let result = estimator.estimate(coord()).await;

    assert_eq!(result.status, EstimateStatus::Found);
    assert_eq!(result.search_radius_m, Some(3000));
    assert_eq!(result.average_price_per_area, Some(dec!(1400)));
}

// -- Commune files ---------------------------------------------------------

#[tokio::test]
async fn test_geo_dvf_missing_file_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/communes/99999.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = GeoDvfClient::with_base_url(Client::new(), format!("{}/communes", server.uri()));
    let err = client.fetch_commune("99999").await.unwrap_err();
    assert!(matches!(err, KompasError::NotFound(code) if code == "99999"));
}

#[tokio::test]
async fn test_commune_summary_over_http() {
    let server = MockServer::start().await;

    let body = collection(vec![
        mutation("Vente", "Maison", json!(100000), json!(100), "2024-03-01"),
        mutation("Vente", "Maison", json!("150000"), json!("100"), "2023-01-01"),
        mutation("Vente", "Maison", json!(240000), json!(80), "2025-07-09"),
        // outside the year window
        mutation("Vente", "Maison", json!(500000), json!(100), "2019-01-01"),
        // apartments and non-sales
        mutation("Vente", "Appartement", json!(90000), json!(45), "2024-01-01"),
        mutation("Echange", "Maison", json!(120000), json!(90), "2024-01-01"),
        // outside the €/m² sanity band
        mutation("Vente", "Maison", json!(2_000_000), json!(100), "2024-01-01"),
    ]);

    Mock::given(method("GET"))
        .and(path("/communes/62585.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = GeoDvfClient::with_base_url(Client::new(), format!("{}/communes", server.uri()));
    let aggregator = CommuneAggregator::new(Arc::new(client), CommunePolicy::default());
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let summary = aggregator.summarize_at(" 62585 ", now).await.expect("should summarize");

    assert_eq!(summary.insee, "62585");
    assert!(summary.source_url.ends_with("/communes/62585.json"));
    let metrics = summary.metrics.expect("metrics");
    assert_eq!(metrics.count, 3);
    assert_eq!(metrics.avg_m2, dec!(1833));
    assert_eq!(metrics.median_m2, dec!(1500));
    assert_eq!(metrics.min_m2, dec!(1000));
    assert_eq!(metrics.max_m2, dec!(3000));
    assert!(summary.note.is_none());
}

#[tokio::test]
async fn test_commune_without_recent_houses_has_note() {
    let server = MockServer::start().await;

    let body = collection(vec![mutation(
        "Vente",
        "Appartement",
        json!(90000),
        json!(45),
        "2024-01-01",
    )]);

    Mock::given(method("GET"))
        .and(path("/communes/80021.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = GeoDvfClient::with_base_url(Client::new(), format!("{}/communes", server.uri()));
    let aggregator = CommuneAggregator::new(Arc::new(client), CommunePolicy::default());
    let summary = aggregator.summarize("80021").await.expect("should summarize");

    assert!(summary.metrics.is_none());
    assert!(summary.note.is_some());
}

// -- Cadastre --------------------------------------------------------------

#[tokio::test]
async fn test_cadastre_returns_first_parcel() {
    let server = MockServer::start().await;

    let body = collection(vec![json!({
        "type": "Feature",
        "properties": {
            "id": "625850000B0062",
            "section": "B",
            "numero": "0062",
            "contenance": "1520"
        }
    })]);

    Mock::given(method("GET"))
        .and(path("/parcelle"))
        .and(query_param("code_insee", "62585"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = CadastreClient::with_endpoint(Client::new(), format!("{}/parcelle", server.uri()));
    let parcel = client
        .lookup(coord(), Some("62585"))
        .await
        .expect("should look up")
        .expect("parcel");

    assert_eq!(parcel.id.as_deref(), Some("625850000B0062"));
    assert_eq!(parcel.section.as_deref(), Some("B"));
    assert_eq!(parcel.area_m2, Some(1520.0));
}

#[tokio::test]
async fn test_cadastre_empty_collection_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/parcelle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection(vec![])))
        .mount(&server)
        .await;

    let client = CadastreClient::with_endpoint(Client::new(), format!("{}/parcelle", server.uri()));
    let parcel = client.lookup(coord(), None).await.expect("should look up");
    assert!(parcel.is_none());
}
