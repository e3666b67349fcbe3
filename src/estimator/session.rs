//! Request session with generation tokens.
//!
//! Holds the single "current coordinate / current estimate" pair. Every new
//! coordinate bumps the generation; results tagged with an older generation
//! are discarded on commit so a slow search can never overwrite a newer one.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{Coordinate, EstimateResult};

/// Monotonically increasing request token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateRequest {
    pub coordinate: Coordinate,
    pub generation: Generation,
}

/// An estimate together with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEstimate {
    pub generation: Generation,
    pub coordinate: Coordinate,
    pub result: EstimateResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub generation: Generation,
    pub coordinate: Coordinate,
    /// `None` while the search for `coordinate` is still running.
    pub estimate: Option<EstimateResult>,
}

pub struct EstimateSession {
    generation: AtomicU64,
    current: RwLock<Option<SessionView>>,
}

impl Default for EstimateSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateSession {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            current: RwLock::new(None),
        }
    }

    /// Start a new request for `coordinate`, superseding any in-flight one.
    pub async fn request(&self, coordinate: Coordinate) -> EstimateRequest {
        let mut current = self.current.write().await;
        let generation = Generation(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
        *current = Some(SessionView {
            generation,
            coordinate,
            estimate: None,
        });
        debug!(generation = generation.0, %coordinate, "New estimate request");
        EstimateRequest {
            coordinate,
            generation,
        }
    }

    pub fn current_generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current_generation() == generation
    }

    /// Store `tagged` if it belongs to the latest request.
    ///
    /// Returns `false` (and drops the result) when it is stale.
    pub async fn commit(&self, tagged: TaggedEstimate) -> bool {
        let mut current = self.current.write().await;
        match current.as_mut() {
            Some(view) if view.generation == tagged.generation => {
                view.estimate = Some(tagged.result);
                true
            }
            _ => {
                debug!(
                    stale = tagged.generation.0,
                    latest = self.current_generation().0,
                    "Discarding stale estimate"
                );
                false
            }
        }
    }

    /// Snapshot of the current coordinate and estimate.
    pub async fn current(&self) -> Option<SessionView> {
        self.current.read().await.clone()
    }
}
