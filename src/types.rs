//! Shared types for the Aankoopkompas engine.
//!
//! These types form the data model used across all modules. Registry
//! clients produce `TransactionRecord`s, the estimator turns them into an
//! `EstimateResult`, and the valuation engine consumes the price-per-area
//! figure from there.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// A WGS84 point, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting NaN/infinite values and out-of-range degrees.
    pub fn new(lat: f64, lon: f64) -> Result<Self, KompasError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(KompasError::InvalidInput(format!(
                "coordinate must be finite, got ({lat}, {lon})"
            )));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(KompasError::InvalidInput(format!(
                "coordinate out of range: ({lat}, {lon})"
            )));
        }
        Ok(Self { lat, lon })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

// ---------------------------------------------------------------------------
// Transaction records
// ---------------------------------------------------------------------------

/// Nature of a registry mutation. Only sales are comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Sale,
    Other,
}

impl TransactionType {
    /// Map the registry's `nature_mutation` label.
    pub fn from_registry(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("Vente") => TransactionType::Sale,
            _ => TransactionType::Other,
        }
    }
}

/// Kind of built property on the parcel (`type_local`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    House,
    Apartment,
    Other,
}

impl PropertyType {
    pub fn from_registry(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("Maison") => PropertyType::House,
            Some("Appartement") => PropertyType::Apartment,
            _ => PropertyType::Other,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::House => write!(f, "House"),
            PropertyType::Apartment => write!(f, "Apartment"),
            PropertyType::Other => write!(f, "Other"),
        }
    }
}

/// A single mutation as published by the sales registry.
///
/// Numeric fields are optional because the open-data feed regularly omits
/// them; the relevance filter drops records with missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_type: TransactionType,
    pub property_type: PropertyType,
    /// Filed price in euros (`valeur_fonciere`).
    pub price: Option<f64>,
    /// Built floor area in m² (`surface_reelle_bati`).
    pub built_area: Option<f64>,
    pub transaction_date: Option<NaiveDate>,
}

impl TransactionRecord {
    /// Price divided by built area, when both are present and the area is positive.
    pub fn price_per_area(&self) -> Option<f64> {
        match (self.price, self.built_area) {
            (Some(price), Some(area)) if area > 0.0 => Some(price / area),
            _ => None,
        }
    }

    /// Convenience constructor for a house sale.
    pub fn house_sale(price: f64, built_area: f64, date: Option<NaiveDate>) -> Self {
        Self {
            transaction_type: TransactionType::Sale,
            property_type: PropertyType::House,
            price: Some(price),
            built_area: Some(built_area),
            transaction_date: date,
        }
    }
}

// ---------------------------------------------------------------------------
// Estimate result
// ---------------------------------------------------------------------------

/// Outcome category of a comparable-sales search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateStatus {
    Found,
    InsufficientData,
    TransportError,
}

impl fmt::Display for EstimateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimateStatus::Found => write!(f, "FOUND"),
            EstimateStatus::InsufficientData => write!(f, "INSUFFICIENT_DATA"),
            EstimateStatus::TransportError => write!(f, "TRANSPORT_ERROR"),
        }
    }
}

/// Result of a comparable-sales search.
///
/// `average_price_per_area` is only present when `status == Found`, which in
/// turn only happens when `sample_count` exceeded the minimum sample size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResult {
    /// Robust average in €/m², rounded to whole euros.
    pub average_price_per_area: Option<Decimal>,
    /// Untrimmed number of relevant sales at the accepted radius
    /// (0 when nothing was accepted).
    pub sample_count: usize,
    pub search_radius_m: Option<u32>,
    pub status: EstimateStatus,
    /// Human-readable summary for display.
    pub message: String,
}

impl EstimateResult {
    pub fn found(average: Decimal, sample_count: usize, radius_m: u32) -> Self {
        Self {
            average_price_per_area: Some(average),
            sample_count,
            search_radius_m: Some(radius_m),
            status: EstimateStatus::Found,
            message: format!(
                "Found {sample_count} comparable houses within {:.1} km",
                f64::from(radius_m) / 1000.0
            ),
        }
    }

    pub fn insufficient_data() -> Self {
        Self {
            average_price_per_area: None,
            sample_count: 0,
            search_radius_m: None,
            status: EstimateStatus::InsufficientData,
            message: "No automatic price found. Enter a price per m² manually.".to_string(),
        }
    }

    pub fn transport_error() -> Self {
        Self {
            average_price_per_area: None,
            sample_count: 0,
            search_radius_m: None,
            status: EstimateStatus::TransportError,
            message: "Sales registry unreachable. Enter a price per m² manually.".to_string(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == EstimateStatus::Found
    }
}

impl fmt::Display for EstimateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.average_price_per_area, self.search_radius_m) {
            (Some(avg), Some(radius)) => write!(
                f,
                "[{}] €{avg}/m² from {} sales (radius {radius} m)",
                self.status, self.sample_count
            ),
            _ => write!(f, "[{}] {}", self.status, self.message),
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient numeric decoding
// ---------------------------------------------------------------------------

/// Registry and form fields arrive as numbers, numeric strings, empty
/// strings, null, or something else entirely. Anything non-numeric decodes
/// to `None` instead of failing the whole payload.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<LooseNumber> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(LooseNumber::Number(n)) => Some(n),
        Some(LooseNumber::Text(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        Some(LooseNumber::Other(_)) | None => None,
    }
    .filter(|n| n.is_finite()))
}

pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use rust_decimal::prelude::FromPrimitive;
    use std::str::FromStr;

    let raw: Option<LooseNumber> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(LooseNumber::Number(n)) => Decimal::from_f64(n),
        Some(LooseNumber::Text(s)) => Decimal::from_str(s.trim().replace(',', ".").as_str()).ok(),
        Some(LooseNumber::Other(_)) | None => None,
    })
}

/// Like [`lenient_decimal`], with anything non-numeric decoding to zero.
pub fn lenient_decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_decimal(deserializer)?.unwrap_or(Decimal::ZERO))
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum KompasError {
    #[error("Transport error ({registry}): {message}")]
    Transport { registry: String, message: String },

    #[error("No registry data for {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed upstream payload: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KompasError {
    pub fn transport(registry: &str, err: impl fmt::Display) -> Self {
        KompasError::Transport {
            registry: registry.to_string(),
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
