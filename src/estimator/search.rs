//! Expanding-radius search as an explicit state machine.
//!
//! The machine never performs I/O. The estimator asks it which radius to
//! fetch next, feeds back the fetch outcome, and repeats until the machine
//! reports a terminal result. Tests drive it directly with canned outcomes.

use std::fmt;
use tracing::{debug, info, warn};

use super::{stats, SearchPolicy};
use crate::types::{EstimateResult, KompasError, TransactionRecord};

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    SearchingAtRadius(u32),
    Found,
    InsufficientData,
    /// Every radius failed at transport level.
    Failed,
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SearchState::Found | SearchState::InsufficientData | SearchState::Failed
        )
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchState::Idle => write!(f, "Idle"),
            SearchState::SearchingAtRadius(r) => {
                write!(f, "Searching for comparable houses within {:.1} km...", f64::from(*r) / 1000.0)
            }
            SearchState::Found => write!(f, "Found"),
            SearchState::InsufficientData => write!(f, "Insufficient data"),
            SearchState::Failed => write!(f, "Failed"),
        }
    }
}

/// What the driver should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Fetch(u32),
    Done(EstimateResult),
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

pub struct SearchMachine<'p> {
    policy: &'p SearchPolicy,
    next_index: usize,
    state: SearchState,
    transport_failures: usize,
}

impl<'p> SearchMachine<'p> {
    pub fn new(policy: &'p SearchPolicy) -> Self {
        Self {
            policy,
            next_index: 0,
            state: SearchState::Idle,
            transport_failures: 0,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Leave `Idle` and request the first (smallest) radius.
    pub fn start(&mut self) -> Step {
        self.next_index = 0;
        self.transport_failures = 0;
        self.advance_radius()
    }

    /// Feed the outcome of the fetch for the current radius.
    ///
    /// Transport failures count as zero results for that radius; the search
    /// moves on to the next radius rather than retrying.
    pub fn on_fetch(&mut self, outcome: Result<Vec<TransactionRecord>, KompasError>) -> Step {
        let radius = match self.state {
            SearchState::SearchingAtRadius(r) => r,
            other => {
                debug!(state = ?other, "Fetch outcome ignored outside of an active search");
                return self.advance_radius();
            }
        };

        let records = match outcome {
            Ok(records) => records,
            Err(e) => {
                warn!(radius_m = radius, error = %e, "Registry fetch failed, widening search");
                self.transport_failures += 1;
                return self.advance_radius();
            }
        };

        let samples = self.policy.relevant_samples(&records);
        if samples.len() > self.policy.min_sample_size {
            let trimmed = stats::trim_symmetric(
                &samples,
                self.policy.trim_fraction,
                self.policy.trim_min_samples,
            );
            if let Some(average) = stats::rounded_mean(&trimmed) {
                info!(
                    radius_m = radius,
                    relevant = samples.len(),
                    used = trimmed.len(),
                    average = %average,
                    "Comparable sales found"
                );
                self.state = SearchState::Found;
                return Step::Done(EstimateResult::found(average, samples.len(), radius));
            }
        }

        debug!(
            radius_m = radius,
            fetched = records.len(),
            relevant = samples.len(),
            required = self.policy.min_sample_size + 1,
            "Insufficient data at radius"
        );
        self.advance_radius()
    }

    fn advance_radius(&mut self) -> Step {
        match self.policy.radii_m.get(self.next_index) {
            Some(&radius) => {
                self.next_index += 1;
                self.state = SearchState::SearchingAtRadius(radius);
                Step::Fetch(radius)
            }
            None => self.exhausted(),
        }
    }

    fn exhausted(&mut self) -> Step {
        let tried = self.policy.radii_m.len();
        if tried > 0 && self.transport_failures == tried {
            self.state = SearchState::Failed;
            warn!(radii = tried, "Every radius failed at transport level");
            Step::Done(EstimateResult::transport_error())
        } else {
            self.state = SearchState::InsufficientData;
            info!(radii = tried, "No radius produced enough comparable sales");
            Step::Done(EstimateResult::insufficient_data())
        }
    }
}
