//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has documented defaults, so a missing file or a partial file is
//! fine; the sections are converted into the policy structs used by the
//! estimator and the valuation engine.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::estimator::commune::CommunePolicy;
use crate::estimator::SearchPolicy;
use crate::valuation::deductions::DeductionItem;
use crate::valuation::ValuationPolicy;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub estimator: EstimatorConfig,
    pub commune: CommuneConfig,
    pub valuation: ValuationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            enable_cors: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RegistryConfig {
    /// Radius query endpoint (`?lat=&lon=&dist=`).
    pub radius_endpoint: String,
    /// Base URL of the per-commune GeoJSON files (`/{insee}.json`).
    pub commune_endpoint: String,
    pub cadastre_endpoint: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            radius_endpoint: "https://api.cquest.org/dvf".to_string(),
            commune_endpoint: "https://files.data.gouv.fr/geo-dvf/latest/communes".to_string(),
            cadastre_endpoint: "https://apicarto.ign.fr/api/cadastre/parcelle".to_string(),
            timeout_secs: 15,
            user_agent: "Aankoopkompas/0.1.0".to_string(),
        }
    }
}

/// Comparable-sales search policy. Mirrors [`SearchPolicy`].
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EstimatorConfig {
    pub radii_m: Vec<u32>,
    pub min_price: f64,
    pub min_built_area: f64,
    pub min_sample_size: usize,
    pub trim_fraction: f64,
    pub trim_min_samples: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        let policy = SearchPolicy::default();
        Self {
            radii_m: policy.radii_m,
            min_price: policy.min_price,
            min_built_area: policy.min_built_area,
            min_sample_size: policy.min_sample_size,
            trim_fraction: policy.trim_fraction,
            trim_min_samples: policy.trim_min_samples,
        }
    }
}

/// Commune aggregate filters. Mirrors [`CommunePolicy`].
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommuneConfig {
    pub lookback_years: i32,
    pub min_price: f64,
    pub min_built_area: f64,
    pub max_price_per_area: f64,
}

impl Default for CommuneConfig {
    fn default() -> Self {
        let policy = CommunePolicy::default();
        Self {
            lookback_years: policy.lookback_years,
            min_price: policy.min_price,
            min_built_area: policy.min_built_area,
            max_price_per_area: policy.max_price_per_area,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ValuationConfig {
    pub sentiment_min: i32,
    pub sentiment_max: i32,
    pub sentiment_step: i32,
    /// Fraction below the asking price that triggers the "well below" advice.
    pub advice_discount: Decimal,
    pub deductions: Vec<DeductionItem>,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        let policy = ValuationPolicy::default();
        Self {
            sentiment_min: policy.sentiment_min,
            sentiment_max: policy.sentiment_max,
            sentiment_step: policy.sentiment_step,
            advice_discount: dec!(0.15),
            deductions: policy.catalog,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            warn!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Reject settings the estimator cannot work with.
    pub fn validate(&self) -> Result<()> {
        let e = &self.estimator;
        if e.radii_m.is_empty() {
            anyhow::bail!("estimator.radii_m must not be empty");
        }
        if e.radii_m.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!("estimator.radii_m must be strictly ascending: {:?}", e.radii_m);
        }
        if !(0.0..0.5).contains(&e.trim_fraction) {
            anyhow::bail!("estimator.trim_fraction must be in [0, 0.5), got {}", e.trim_fraction);
        }
        let v = &self.valuation;
        if v.sentiment_step <= 0 || v.sentiment_min > v.sentiment_max {
            anyhow::bail!(
                "valuation sentiment range invalid: [{}, {}] step {}",
                v.sentiment_min,
                v.sentiment_max,
                v.sentiment_step
            );
        }
        if v.advice_discount < Decimal::ZERO || v.advice_discount >= Decimal::ONE {
            anyhow::bail!("valuation.advice_discount must be in [0, 1), got {}", v.advice_discount);
        }
        Ok(())
    }

    pub fn search_policy(&self) -> SearchPolicy {
        let e = &self.estimator;
        SearchPolicy {
            radii_m: e.radii_m.clone(),
            min_price: e.min_price,
            min_built_area: e.min_built_area,
            min_sample_size: e.min_sample_size,
            trim_fraction: e.trim_fraction,
            trim_min_samples: e.trim_min_samples,
        }
    }

    pub fn commune_policy(&self) -> CommunePolicy {
        let c = &self.commune;
        CommunePolicy {
            lookback_years: c.lookback_years,
            min_price: c.min_price,
            min_built_area: c.min_built_area,
            max_price_per_area: c.max_price_per_area,
        }
    }

    pub fn valuation_policy(&self) -> ValuationPolicy {
        let v = &self.valuation;
        ValuationPolicy {
            sentiment_min: v.sentiment_min,
            sentiment_max: v.sentiment_max,
            sentiment_step: v.sentiment_step,
            advice_discount: v.advice_discount,
            catalog: v.deductions.clone(),
        }
    }
}
