//! Coupon types and local discount arithmetic.

use crate::money::Money;
use serde::{Deserialize, Serialize};

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CouponKind {
    /// `value` percent of the subtotal.
    #[serde(rename = "percentage")]
    Percentage,
    /// A fixed `value` off, capped at the subtotal.
    #[serde(rename = "fixed", alias = "fixedAmount", alias = "fixed_amount")]
    FixedAmount,
}

impl CouponKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponKind::Percentage => "percentage",
            CouponKind::FixedAmount => "fixed",
        }
    }
}

/// A coupon as reported by the validation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    /// Normalized code (trimmed, uppercase).
    #[serde(deserialize_with = "deserialize_code")]
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub value: f64,
}

impl Coupon {
    pub fn new(code: &str, kind: CouponKind, value: f64) -> Self {
        Self {
            code: normalize_code(code),
            kind,
            value,
        }
    }

    /// Discount this coupon yields on `subtotal`, clamped into `[0, subtotal]`.
    pub fn discount_on(&self, subtotal: &Money) -> Money {
        let raw = match self.kind {
            CouponKind::Percentage => subtotal.percentage(self.value),
            CouponKind::FixedAmount => Money::from_decimal(self.value, subtotal.currency),
        };
        clamp_discount(raw, subtotal)
    }

    /// Short description, e.g. "10% off" or "$5.00 off".
    pub fn describe(&self, currency: crate::money::Currency) -> String {
        match self.kind {
            CouponKind::Percentage => format!("{}% off", self.value),
            CouponKind::FixedAmount => {
                format!("{} off", Money::from_decimal(self.value, currency))
            }
        }
    }
}

/// Trim and uppercase a user-entered code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Keep a discount within `[0, subtotal]`.
pub fn clamp_discount(discount: Money, subtotal: &Money) -> Money {
    discount.clamp_to(subtotal)
}

fn deserialize_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|code| normalize_code(&code))
}
