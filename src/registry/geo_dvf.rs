//! Per-commune DVF GeoJSON files.
//!
//! API: `https://files.data.gouv.fr/geo-dvf/latest/communes/{insee}.json`
//! Auth: None required.
//! One static file per commune; a missing file means the registry has no
//! data for that code.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::geojson::parse_mutations;
use super::{http_client, CommuneRegistry};
use crate::config::RegistryConfig;
use crate::types::{KompasError, TransactionRecord};

const REGISTRY_NAME: &str = "geo-dvf";

pub struct GeoDvfClient {
    http: Client,
    base_url: String,
}

impl GeoDvfClient {
    pub fn new(cfg: &RegistryConfig) -> Result<Self, KompasError> {
        Ok(Self {
            http: http_client(cfg)?,
            base_url: cfg.commune_endpoint.clone(),
        })
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CommuneRegistry for GeoDvfClient {
    async fn fetch_commune(&self, insee: &str) -> Result<Vec<TransactionRecord>, KompasError> {
        let url = self.source_url(insee);

        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| KompasError::transport(REGISTRY_NAME, e))?;

        if !resp.status().is_success() {
            warn!(insee, status = %resp.status(), "No commune file in registry");
            return Err(KompasError::NotFound(insee.to_string()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| KompasError::transport(REGISTRY_NAME, e))?;

        let records = parse_mutations(&body)
            .map_err(|e| KompasError::Upstream(format!("{REGISTRY_NAME} {insee}: {e}")))?;

        debug!(insee, records = records.len(), "Commune file loaded");
        Ok(records)
    }

    fn source_url(&self, insee: &str) -> String {
        format!(
            "{}/{}.json",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(insee)
        )
    }
}
