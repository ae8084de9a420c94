//! PriceBook: normalization of catalog price shapes.
//!
//! The catalog returns prices either as a bare number or as a
//! `{ "current": .., "original": .. }` object. Both deserialize into
//! [`PriceField`], and [`current_price`] is the single place that decides
//! which number a cart line is charged at.

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// A catalog price as delivered by the API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceField {
    /// A plain amount.
    Flat(f64),
    /// A marked-down price with its original for display.
    Tiered {
        #[serde(default)]
        current: Option<f64>,
        #[serde(default)]
        original: Option<f64>,
    },
}

impl PriceField {
    /// Whether a lower current price is shown against a higher original.
    pub fn is_discounted(&self) -> bool {
        matches!(
            self,
            PriceField::Tiered { current: Some(current), original: Some(original) }
                if current < original
        )
    }

    /// Amount saved against the original price, if any.
    pub fn savings(&self, currency: Currency) -> Option<Money> {
        match self {
            PriceField::Tiered {
                current: Some(current),
                original: Some(original),
            } if current < original => Some(Money::from_decimal(original - current, currency)),
            _ => None,
        }
    }
}

/// The amount a line is charged at.
///
/// `Tiered` yields its `current` value, `Flat` its amount, and anything
/// missing yields zero.
pub fn current_price(price: Option<&PriceField>, currency: Currency) -> Money {
    let amount = match price {
        Some(PriceField::Tiered {
            current: Some(current),
            ..
        }) => *current,
        Some(PriceField::Flat(amount)) => *amount,
        _ => 0.0,
    };
    Money::from_decimal(amount, currency)
}

/// Two-decimal display with a leading currency symbol.
pub fn format_currency(amount: Money) -> String {
    amount.display()
}
