//! Products as returned by the catalog endpoint.

use crate::cart::Variant;
use crate::ids::ProductId;
use crate::money::{Currency, Money};
use crate::pricing::{current_price, PriceField};
use serde::{Deserialize, Serialize};

/// A product offered by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<PriceField>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Product {
    /// Price a cart line is charged at.
    pub fn unit_price(&self, currency: Currency) -> Money {
        current_price(self.price.as_ref(), currency)
    }

    /// Whether `variant` names only options this product offers.
    pub fn offers(&self, variant: &Variant) -> bool {
        let color_ok = variant
            .color
            .as_ref()
            .map_or(true, |c| self.colors.iter().any(|o| o.eq_ignore_ascii_case(c)));
        let size_ok = variant
            .size
            .as_ref()
            .map_or(true, |s| self.sizes.iter().any(|o| o.eq_ignore_ascii_case(s)));
        color_ok && size_ok
    }

    /// The first color and size, used when none is chosen.
    pub fn default_variant(&self) -> Variant {
        Variant::new(self.colors.first().cloned(), self.sizes.first().cloned())
    }
}
