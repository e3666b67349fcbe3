//! Commune-level price summary.
//!
//! Alternate entry point keyed by an INSEE commune code instead of a
//! coordinate. Restricted to house sales from the last few years inside a
//! fixed sanity band, and returns summary statistics rather than a single
//! robust average.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::stats;
use crate::registry::CommuneRegistry;
use crate::types::{KompasError, PropertyType, TransactionRecord, TransactionType};

pub const NO_RELEVANT_SALES_NOTE: &str =
    "No relevant transactions found (house sales in the recent window).";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CommunePolicy {
    /// Sales from `current_year - lookback_years` onwards are kept.
    pub lookback_years: i32,
    pub min_price: f64,
    pub min_built_area: f64,
    /// Price-per-area values must fall strictly inside `(0, max_price_per_area)`.
    pub max_price_per_area: f64,
}

impl Default for CommunePolicy {
    fn default() -> Self {
        Self {
            lookback_years: 3,
            min_price: 1_000.0,
            min_built_area: 25.0,
            max_price_per_area: 10_000.0,
        }
    }
}

impl CommunePolicy {
    fn is_relevant(&self, record: &TransactionRecord, cutoff_year: i32) -> bool {
        record.transaction_type == TransactionType::Sale
            && record.property_type == PropertyType::House
            && record.built_area.is_some_and(|a| a > self.min_built_area)
            && record.price.is_some_and(|p| p > self.min_price)
            && record
                .transaction_date
                .is_some_and(|d| d.year() >= cutoff_year)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceMetrics {
    pub avg_m2: Decimal,
    pub median_m2: Decimal,
    pub min_m2: Decimal,
    pub max_m2: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommuneSummary {
    pub insee: String,
    /// `None` when filtering left no usable sale.
    pub metrics: Option<PriceMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub source_url: String,
    pub generated_at: DateTime<Utc>,
}

/// Summary statistics over the relevant price-per-area values.
pub fn compute_metrics(
    records: &[TransactionRecord],
    policy: &CommunePolicy,
    today: NaiveDate,
) -> Option<PriceMetrics> {
    let cutoff_year = today.year() - policy.lookback_years;
    let values: Vec<f64> = records
        .iter()
        .filter(|r| policy.is_relevant(r, cutoff_year))
        .filter_map(TransactionRecord::price_per_area)
        .filter(|&ppa| ppa > 0.0 && ppa < policy.max_price_per_area)
        .collect();

    let avg = stats::rounded_mean(&values)?;
    let median = stats::median(&values).and_then(stats::round_currency)?;
    let min = values.iter().copied().reduce(f64::min).and_then(stats::round_currency)?;
    let max = values.iter().copied().reduce(f64::max).and_then(stats::round_currency)?;

    Some(PriceMetrics {
        avg_m2: avg,
        median_m2: median,
        min_m2: min,
        max_m2: max,
        count: values.len(),
    })
}

/// Trim and check an INSEE code.
pub fn normalize_insee(raw: &str) -> Result<String, KompasError> {
    let code = raw.trim();
    if code.chars().count() < 5 {
        return Err(KompasError::InvalidInput(
            "Provide parameter ?insee=XXXXX".to_string(),
        ));
    }
    Ok(code.to_string())
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct CommuneAggregator {
    registry: Arc<dyn CommuneRegistry>,
    policy: CommunePolicy,
}

impl CommuneAggregator {
    pub fn new(registry: Arc<dyn CommuneRegistry>, policy: CommunePolicy) -> Self {
        Self { registry, policy }
    }

    /// Summarize the commune `insee` as of today.
    pub async fn summarize(&self, insee: &str) -> Result<CommuneSummary, KompasError> {
        self.summarize_at(insee, Utc::now()).await
    }

    /// Summarize with an explicit reference time (drives the year window).
    ///
    /// Fails with `NotFound` when the registry has no data for the code; an
    /// empty filtered set is a successful summary with `metrics: None`.
    pub async fn summarize_at(
        &self,
        insee: &str,
        now: DateTime<Utc>,
    ) -> Result<CommuneSummary, KompasError> {
        let insee = normalize_insee(insee)?;
        let records = self.registry.fetch_commune(&insee).await?;
        let metrics = compute_metrics(&records, &self.policy, now.date_naive());

        info!(
            insee = %insee,
            records = records.len(),
            used = metrics.as_ref().map_or(0, |m| m.count),
            "Commune summary computed"
        );

        let note = metrics
            .is_none()
            .then(|| NO_RELEVANT_SALES_NOTE.to_string());

        Ok(CommuneSummary {
            source_url: self.registry.source_url(&insee),
            insee,
            metrics,
            note,
            generated_at: now,
        })
    }
}
