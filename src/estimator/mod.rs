//! Comparable-sales price estimator.
//!
//! Queries the sales registry at increasing radii around a coordinate and
//! stops at the first radius that yields more than `min_sample_size`
//! relevant house sales. The price-per-area samples at that radius are
//! trimmed symmetrically and averaged.
//!
//! The estimator never returns an error: every failure is folded into the
//! `EstimateResult` status.

pub mod commune;
pub mod search;
pub mod session;
pub mod stats;

use std::sync::Arc;
use tracing::{debug, info};

use crate::registry::SalesRegistry;
use crate::types::{
    Coordinate, EstimateResult, PropertyType, TransactionRecord, TransactionType,
};
use search::{SearchMachine, SearchState, Step};
use session::{EstimateRequest, EstimateSession, TaggedEstimate};

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Search radii, sanity thresholds and trimming policy.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPolicy {
    /// Ascending search radii in meters.
    pub radii_m: Vec<u32>,
    /// A sale must be strictly above this price (€) to count.
    pub min_price: f64,
    /// A sale must be strictly above this built area (m²) to count.
    pub min_built_area: f64,
    /// A radius is accepted when the relevant count is strictly greater than this.
    pub min_sample_size: usize,
    /// Fraction dropped from each end of the sorted samples.
    pub trim_fraction: f64,
    /// Trimming only applies to sample sets at least this large.
    pub trim_min_samples: usize,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            radii_m: vec![500, 1000, 3000, 5000, 10000, 20000],
            min_price: 15_000.0,
            min_built_area: 30.0,
            min_sample_size: 5,
            trim_fraction: 0.2,
            trim_min_samples: 5,
        }
    }
}

impl SearchPolicy {
    /// Whether a record belongs to the relevant subset: a house sale above
    /// both sanity thresholds.
    pub fn is_relevant(&self, record: &TransactionRecord) -> bool {
        record.transaction_type == TransactionType::Sale
            && record.property_type == PropertyType::House
            && record.price.is_some_and(|p| p > self.min_price)
            && record.built_area.is_some_and(|a| a > self.min_built_area)
    }

    /// Price-per-area values of the relevant subset, in registry order.
    pub fn relevant_samples(&self, records: &[TransactionRecord]) -> Vec<f64> {
        records
            .iter()
            .filter(|r| self.is_relevant(r))
            .filter_map(TransactionRecord::price_per_area)
            .filter(|ppa| ppa.is_finite())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

pub struct ComparableSalesEstimator {
    registry: Arc<dyn SalesRegistry>,
    policy: SearchPolicy,
}

impl ComparableSalesEstimator {
    pub fn new(registry: Arc<dyn SalesRegistry>, policy: SearchPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    /// Estimate the average price per m² around `coord`.
    pub async fn estimate(&self, coord: Coordinate) -> EstimateResult {
        self.estimate_with_progress(coord, |_| {}).await
    }

    /// Like [`estimate`](Self::estimate), reporting every state change to
    /// `observe` so callers can render progress while radii are tried.
    pub async fn estimate_with_progress<F>(&self, coord: Coordinate, mut observe: F) -> EstimateResult
    where
        F: FnMut(SearchState) + Send,
    {
        let mut machine = SearchMachine::new(&self.policy);
        let mut step = machine.start();
        loop {
            observe(machine.state());
            match step {
                Step::Fetch(radius) => {
                    debug!(%coord, radius_m = radius, "Querying sales registry");
                    let outcome = self.registry.fetch_within(coord, radius).await;
                    step = machine.on_fetch(outcome);
                }
                Step::Done(result) => return result,
            }
        }
    }

    /// Run a session-tagged request.
    ///
    /// The generation is checked before every radius; once a newer request
    /// has been issued the search stops and `None` is returned. A finished
    /// result is committed to the session (and dropped there if it went
    /// stale during the last fetch).
    pub async fn run(
        &self,
        request: EstimateRequest,
        session: &EstimateSession,
    ) -> Option<TaggedEstimate> {
        let mut machine = SearchMachine::new(&self.policy);
        let mut step = machine.start();
        loop {
            match step {
                Step::Fetch(radius) => {
                    if !session.is_current(request.generation) {
                        info!(
                            generation = request.generation.value(),
                            radius_m = radius,
                            "Search superseded, abandoning"
                        );
                        return None;
                    }
                    let outcome = self.registry.fetch_within(request.coordinate, radius).await;
                    step = machine.on_fetch(outcome);
                }
                Step::Done(result) => {
                    let tagged = TaggedEstimate {
                        generation: request.generation,
                        coordinate: request.coordinate,
                        result,
                    };
                    if session.commit(tagged.clone()).await {
                        return Some(tagged);
                    }
                    return None;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
