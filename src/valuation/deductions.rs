//! Itemized repair deductions.
//!
//! The catalog lists the repair items a user can tick, each with a default
//! amount they may override. Only items with `applies == true` are
//! subtracted from the valuation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::too_large;
use crate::types::{lenient_decimal_or_zero, KompasError};

/// Catalog entry (from config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionItem {
    pub key: String,
    pub label: String,
    pub default_amount: Decimal,
}

/// A deduction as submitted for one valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deduction {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub applies: bool,
    /// Blank or non-numeric form values count as zero.
    #[serde(default, deserialize_with = "lenient_decimal_or_zero")]
    pub amount: Decimal,
}

impl Deduction {
    pub fn new(key: &str, applies: bool, amount: Decimal) -> Self {
        Self {
            key: key.to_string(),
            label: None,
            applies,
            amount,
        }
    }
}

/// Default catalog: roof, windows, electrics, heating, septic tank,
/// insulation, damp.
pub fn default_catalog() -> Vec<DeductionItem> {
    [
        ("dak", "Roof", dec!(15000)),
        ("kozijnen", "Window frames", dec!(8000)),
        ("elektra", "Electrical installation", dec!(7500)),
        ("verwarming", "Heating", dec!(6000)),
        ("fosse_septique", "Septic tank (non-compliant)", dec!(9000)),
        ("isolatie", "Insulation", dec!(10000)),
        ("vocht", "Damp treatment", dec!(5000)),
    ]
    .into_iter()
    .map(|(key, label, amount)| DeductionItem {
        key: key.to_string(),
        label: label.to_string(),
        default_amount: amount,
    })
    .collect()
}

/// Deductions for the given catalog, all unticked, at their default amounts.
pub fn unticked(catalog: &[DeductionItem]) -> Vec<Deduction> {
    catalog
        .iter()
        .map(|item| Deduction {
            key: item.key.clone(),
            label: Some(item.label.clone()),
            applies: false,
            amount: item.default_amount,
        })
        .collect()
}

/// Sum of the amounts of every ticked deduction.
///
/// Negative amounts are rejected; they would silently raise the bid.
pub fn total(deductions: &[Deduction]) -> Result<Decimal, KompasError> {
    let mut sum = Decimal::ZERO;
    for d in deductions {
        if d.amount < Decimal::ZERO {
            return Err(KompasError::InvalidInput(format!(
                "deduction '{}' has a negative amount: {}",
                d.key, d.amount
            )));
        }
        if d.applies {
            sum = sum
                .checked_add(d.amount)
                .ok_or_else(|| too_large("total deductions"))?;
        }
    }
    Ok(sum)
}
