//! DVF radius query.
//!
//! API: `https://api.cquest.org/dvf?lat={lat}&lon={lon}&dist={meters}`
//! Auth: None required.
//! Returns a GeoJSON `FeatureCollection` of mutations around the point.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::geojson::parse_mutations;
use super::{http_client, SalesRegistry};
use crate::config::RegistryConfig;
use crate::types::{Coordinate, KompasError, TransactionRecord};

const REGISTRY_NAME: &str = "cquest-dvf";

pub struct CquestClient {
    http: Client,
    endpoint: String,
}

impl CquestClient {
    pub fn new(cfg: &RegistryConfig) -> Result<Self, KompasError> {
        Ok(Self {
            http: http_client(cfg)?,
            endpoint: cfg.radius_endpoint.clone(),
        })
    }

    /// Point the client at another endpoint (mock servers, mirrors).
    pub fn with_endpoint(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    fn query_url(&self, coord: Coordinate, radius_m: u32) -> String {
        format!(
            "{}?lat={}&lon={}&dist={radius_m}",
            self.endpoint.trim_end_matches('/'),
            coord.lat,
            coord.lon
        )
    }
}

#[async_trait]
impl SalesRegistry for CquestClient {
    async fn fetch_within(
        &self,
        coord: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<TransactionRecord>, KompasError> {
        let url = self.query_url(coord, radius_m);

        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| KompasError::transport(REGISTRY_NAME, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(KompasError::transport(
                REGISTRY_NAME,
                format!("HTTP {status} for radius {radius_m} m"),
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| KompasError::transport(REGISTRY_NAME, e))?;

        let records = parse_mutations(&body).map_err(|e| {
            KompasError::transport(REGISTRY_NAME, format!("unparseable response: {e}"))
        })?;

        debug!(%coord, radius_m, records = records.len(), "Radius query complete");
        Ok(records)
    }
}
