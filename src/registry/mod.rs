//! Sales registry and cadastre integrations.
//!
//! Defines the `SalesRegistry`, `CommuneRegistry` and `ParcelLookup` traits
//! and provides HTTP implementations for:
//! - the DVF radius query (`cquest`)
//! - the per-commune DVF GeoJSON files (`geo_dvf`)
//! - the IGN cadastral parcel lookup (`cadastre`)

pub mod cadastre;
pub mod cquest;
pub mod geo_dvf;
pub mod geojson;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::RegistryConfig;
use crate::types::{Coordinate, KompasError, TransactionRecord};
use cadastre::ParcelInfo;

/// Source of raw transactions around a point.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SalesRegistry: Send + Sync {
    /// Fetch every mutation within `radius_m` meters of `coord`.
    ///
    /// Network and decoding failures surface as `KompasError::Transport`.
    async fn fetch_within(
        &self,
        coord: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<TransactionRecord>, KompasError>;
}

/// Source of all transactions for one administrative code.
#[async_trait]
pub trait CommuneRegistry: Send + Sync {
    /// Fetch every mutation recorded for the commune `insee`.
    ///
    /// Returns `KompasError::NotFound` when the registry has no data for
    /// that code.
    async fn fetch_commune(&self, insee: &str) -> Result<Vec<TransactionRecord>, KompasError>;

    /// Public URL of the data backing `insee`, for attribution.
    fn source_url(&self, insee: &str) -> String;
}

/// Cadastral parcel lookup. Informational only.
#[async_trait]
pub trait ParcelLookup: Send + Sync {
    async fn lookup(
        &self,
        coord: Coordinate,
        insee: Option<&str>,
    ) -> Result<Option<ParcelInfo>, KompasError>;
}

/// Build the shared HTTP client used by every registry client.
pub fn http_client(cfg: &RegistryConfig) -> Result<Client, KompasError> {
    Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .user_agent(cfg.user_agent.as_str())
        .build()
        .map_err(|e| KompasError::Config(format!("Failed to build registry HTTP client: {e}")))
}
