//! Mock registries for integration testing.
//!
//! Deterministic `SalesRegistry` / `CommuneRegistry` implementations with
//! per-radius canned responses, forced failures and a call log, all
//! in-memory with no network access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use aankoopkompas::registry::{CommuneRegistry, SalesRegistry};
use aankoopkompas::types::{Coordinate, KompasError, TransactionRecord};

/// A scripted sales registry.
///
/// Radii without a scripted response return an empty collection.
#[derive(Default)]
pub struct ScriptedRegistry {
    responses: HashMap<u32, Result<Vec<TransactionRecord>, String>>,
    calls: Arc<Mutex<Vec<u32>>>,
    /// If set, every fetch fails with this message.
    force_error: Option<String>,
    gate: Option<FetchGate>,
}

/// Pauses the first fetch until the test releases it.
#[derive(Clone, Default)]
pub struct FetchGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
    used: Arc<Mutex<bool>>,
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, radius_m: u32, records: Vec<TransactionRecord>) -> Self {
        self.responses.insert(radius_m, Ok(records));
        self
    }

    pub fn with_failure(mut self, radius_m: u32, message: &str) -> Self {
        self.responses.insert(radius_m, Err(message.to_string()));
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.force_error = Some(message.to_string());
        self
    }

    pub fn gated(mut self, gate: FetchGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Shared handle on the radii queried so far, in order.
    pub fn call_log(&self) -> Arc<Mutex<Vec<u32>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SalesRegistry for ScriptedRegistry {
    async fn fetch_within(
        &self,
        _coord: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<TransactionRecord>, KompasError> {
        self.calls.lock().unwrap().push(radius_m);

        if let Some(gate) = &self.gate {
            let first = {
                let mut used = gate.used.lock().unwrap();
                !std::mem::replace(&mut *used, true)
            };
            if first {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }

        if let Some(msg) = &self.force_error {
            return Err(KompasError::transport("scripted", msg));
        }
        match self.responses.get(&radius_m) {
            Some(Ok(records)) => Ok(records.clone()),
            Some(Err(msg)) => Err(KompasError::transport("scripted", msg)),
            None => Ok(Vec::new()),
        }
    }
}

/// A commune registry backed by an in-memory map.
#[derive(Default)]
pub struct InMemoryCommunes {
    files: HashMap<String, Vec<TransactionRecord>>,
}

impl InMemoryCommunes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commune(mut self, insee: &str, records: Vec<TransactionRecord>) -> Self {
        self.files.insert(insee.to_string(), records);
        self
    }
}

#[async_trait]
impl CommuneRegistry for InMemoryCommunes {
    async fn fetch_commune(&self, insee: &str) -> Result<Vec<TransactionRecord>, KompasError> {
        self.files
            .get(insee)
            .cloned()
            .ok_or_else(|| KompasError::NotFound(insee.to_string()))
    }

    fn source_url(&self, insee: &str) -> String {
        format!("memory://communes/{insee}.json")
    }
}

// -- Record builders -------------------------------------------------------

/// One relevant house sale per price-per-area value (100 m² each).
pub fn houses_at(price_per_area: &[f64]) -> Vec<TransactionRecord> {
    price_per_area
        .iter()
        .map(|ppa| TransactionRecord::house_sale(ppa * 100.0, 100.0, None))
        .collect()
}

/// `n` identical relevant house sales.
pub fn uniform_houses(n: usize, price_per_area: f64) -> Vec<TransactionRecord> {
    houses_at(&vec![price_per_area; n])
}

pub fn coord() -> Coordinate {
    Coordinate::new(50.43, 1.59).unwrap()
}
