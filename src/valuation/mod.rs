//! Valuation engine: base value, sentiment correction and repair deductions.
//!
//! Pure arithmetic over `Decimal` money values. Nothing is cached: every
//! call recomputes from the inputs it is given.
//!
//! ```text
//! base        = living_area × price_per_area        (0 if either is absent)
//! sentiment   = base × sentiment_percent / 100
//! deductions  = Σ amount of every ticked deduction
//! bid         = max(0, base + sentiment − deductions)
//! ```

pub mod advice;
pub mod deductions;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{lenient_decimal, KompasError};
use advice::BidAdvice;
use deductions::{DeductionItem, Deduction};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ValuationPolicy {
    pub sentiment_min: i32,
    pub sentiment_max: i32,
    pub sentiment_step: i32,
    /// Bids more than this fraction below the asking price get flagged.
    pub advice_discount: Decimal,
    pub catalog: Vec<DeductionItem>,
}

impl Default for ValuationPolicy {
    fn default() -> Self {
        Self {
            sentiment_min: -20,
            sentiment_max: 20,
            sentiment_step: 5,
            advice_discount: dec!(0.15),
            catalog: deductions::default_catalog(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// Condition/location correction in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Sentiment(i32);

impl Sentiment {
    pub const NEUTRAL: Sentiment = Sentiment(0);

    /// Validate `percent` against the policy's range and step.
    pub fn new(percent: i32, policy: &ValuationPolicy) -> Result<Self, KompasError> {
        if percent < policy.sentiment_min || percent > policy.sentiment_max {
            return Err(KompasError::InvalidInput(format!(
                "sentiment {percent}% outside [{}, {}]",
                policy.sentiment_min, policy.sentiment_max
            )));
        }
        if percent % policy.sentiment_step != 0 {
            return Err(KompasError::InvalidInput(format!(
                "sentiment {percent}% is not a multiple of {}",
                policy.sentiment_step
            )));
        }
        Ok(Self(percent))
    }

    pub fn percent(&self) -> i32 {
        self.0
    }

    /// Multiplier fraction, e.g. `0.10` for +10%.
    pub fn fraction(&self) -> Decimal {
        Decimal::from(self.0) / dec!(100)
    }
}

// ---------------------------------------------------------------------------
// Inputs and results
// ---------------------------------------------------------------------------

/// Raw user inputs, as submitted by a form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValuationInputs {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub living_area: Option<Decimal>,
    /// From the estimator, or overridden by the user.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price_per_area: Option<Decimal>,
    #[serde(default)]
    pub sentiment_percent: i32,
    #[serde(default)]
    pub deductions: Vec<Deduction>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub asking_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValuationResult {
    pub base_value: Decimal,
    pub sentiment_adjustment: Decimal,
    pub total_deductions: Decimal,
    pub recommended_bid: Decimal,
}

/// Valuation plus the advisory comparison with the asking price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationReport {
    #[serde(flatten)]
    pub result: ValuationResult,
    pub advice: Option<BidAdvice>,
    pub advice_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

/// Compute the recommended bid.
///
/// Absent area or price per area yields a zero base value rather than an
/// error. Fails on a negative deduction amount, or when an input is so
/// large that the arithmetic overflows.
pub fn valuate(
    living_area: Option<Decimal>,
    price_per_area: Option<Decimal>,
    sentiment: Sentiment,
    deductions: &[Deduction],
) -> Result<ValuationResult, KompasError> {
    let base_value = match (living_area, price_per_area) {
        (Some(area), Some(ppa)) => area.checked_mul(ppa).ok_or_else(|| too_large("base value"))?,
        _ => Decimal::ZERO,
    };
    let sentiment_adjustment = base_value
        .checked_mul(sentiment.fraction())
        .ok_or_else(|| too_large("sentiment adjustment"))?;
    let total_deductions = deductions::total(deductions)?;
    let recommended_bid = base_value
        .checked_add(sentiment_adjustment)
        .and_then(|v| v.checked_sub(total_deductions))
        .ok_or_else(|| too_large("recommended bid"))?
        .max(Decimal::ZERO);

    debug!(
        base = %base_value,
        sentiment = sentiment.percent(),
        deductions = %total_deductions,
        bid = %recommended_bid,
        "Valuation computed"
    );

    Ok(ValuationResult {
        base_value,
        sentiment_adjustment,
        total_deductions,
        recommended_bid,
    })
}

pub(crate) fn too_large(what: &str) -> KompasError {
    KompasError::InvalidInput(format!("{what} out of range, check the entered amounts"))
}

impl ValuationPolicy {
    /// Validate the inputs, valuate, and attach the asking-price advice.
    pub fn evaluate(&self, inputs: &ValuationInputs) -> Result<ValuationReport, KompasError> {
        let sentiment = Sentiment::new(inputs.sentiment_percent, self)?;
        let result = valuate(
            inputs.living_area,
            inputs.price_per_area,
            sentiment,
            &inputs.deductions,
        )?;
        let advice = BidAdvice::assess(result.recommended_bid, inputs.asking_price, self.advice_discount);
        Ok(ValuationReport {
            result,
            advice,
            advice_message: advice.map(|a| a.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
