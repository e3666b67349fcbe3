//! IGN cadastral parcel lookup.
//!
//! API: `https://apicarto.ign.fr/api/cadastre/parcelle?geom={GeoJSON point}&code_insee={insee}`
//! Auth: None required.
//! Informational only: parcel metadata never feeds the price estimate.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::geojson::FeatureCollection;
use super::{http_client, ParcelLookup};
use crate::config::RegistryConfig;
use crate::types::{lenient_f64, Coordinate, KompasError};

const REGISTRY_NAME: &str = "ign-cadastre";

/// Parcel metadata for the point being valued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParcelInfo {
    /// Unique parcel id, e.g. `625850000B0062`.
    pub id: Option<String>,
    pub section: Option<String>,
    pub numero: Option<String>,
    /// Parcel area (`contenance`) in m².
    pub area_m2: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ParcelProperties {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    numero: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    contenance: Option<f64>,
}

pub struct CadastreClient {
    http: Client,
    endpoint: String,
}

impl CadastreClient {
    pub fn new(cfg: &RegistryConfig) -> Result<Self, KompasError> {
        Ok(Self {
            http: http_client(cfg)?,
            endpoint: cfg.cadastre_endpoint.clone(),
        })
    }

    pub fn with_endpoint(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    fn query_url(&self, coord: Coordinate, insee: Option<&str>) -> String {
        let geom = serde_json::json!({
            "type": "Point",
            "coordinates": [coord.lon, coord.lat],
        })
        .to_string();
        let mut url = format!("{}?geom={}", self.endpoint, urlencoding::encode(&geom));
        // The code narrows the search and avoids mismatches on commune borders.
        if let Some(code) = insee.map(str::trim).filter(|c| !c.is_empty()) {
            url.push_str(&format!("&code_insee={}", urlencoding::encode(code)));
        }
        url
    }
}

#[async_trait]
impl ParcelLookup for CadastreClient {
    async fn lookup(
        &self,
        coord: Coordinate,
        insee: Option<&str>,
    ) -> Result<Option<ParcelInfo>, KompasError> {
        let url = self.query_url(coord, insee);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| KompasError::transport(REGISTRY_NAME, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(KompasError::transport(REGISTRY_NAME, format!("HTTP {status}")));
        }

        let collection: FeatureCollection<ParcelProperties> = resp
            .json()
            .await
            .map_err(|e| KompasError::transport(REGISTRY_NAME, e))?;

        let parcel = collection.into_properties().next().map(|p| ParcelInfo {
            id: p.id,
            section: p.section,
            numero: p.numero,
            area_m2: p.contenance,
        });

        match &parcel {
            Some(p) => debug!(%coord, id = ?p.id, "Parcel found"),
            None => warn!(%coord, "No parcel at point (probably on a road)"),
        }
        Ok(parcel)
    }
}
