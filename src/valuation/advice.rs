//! Negotiation advice comparing the recommended bid to the asking price.
//!
//! Purely informational; never feeds back into the valuation.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BidAdvice {
    /// The bid is more than the configured discount below the asking price.
    WellBelowAsking,
    NearAsking,
}

impl BidAdvice {
    /// `None` when there is no (positive) asking price to compare against.
    pub fn assess(recommended_bid: Decimal, asking_price: Option<Decimal>, discount: Decimal) -> Option<Self> {
        let asking = asking_price.filter(|a| *a > Decimal::ZERO)?;
        // A threshold too large to represent is above any bid.
        let well_below = Decimal::ONE
            .checked_sub(discount)
            .and_then(|keep| asking.checked_mul(keep))
            .map_or(true, |threshold| recommended_bid < threshold);
        if well_below {
            Some(BidAdvice::WellBelowAsking)
        } else {
            Some(BidAdvice::NearAsking)
        }
    }
}

impl fmt::Display for BidAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BidAdvice::WellBelowAsking => write!(
                f,
                "Your bid is well below the asking price. Back it up with the itemized repair costs."
            ),
            BidAdvice::NearAsking => write!(
                f,
                "Your bid is close to the asking price. Check the defects for remaining room to negotiate."
            ),
        }
    }
}
