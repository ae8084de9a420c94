//! Cart and line item types.

use crate::error::CommerceError;
use crate::ids::{LineItemId, ProductId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// The chosen options of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl Variant {
    /// A variant with the given color and size.
    pub fn new(color: Option<String>, size: Option<String>) -> Self {
        Self { color, size }
    }

    /// Short label, e.g. "Red / M".
    pub fn label(&self) -> Option<String> {
        match (&self.color, &self.size) {
            (Some(color), Some(size)) => Some(format!("{color} / {size}")),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        }
    }
}

/// One product entry in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    /// Unique line item identifier.
    pub id: LineItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Product name (denormalized for display).
    pub product_name: String,
    /// Chosen color and size.
    #[serde(default)]
    pub variant: Variant,
    /// Quantity, always at least 1.
    pub quantity: i64,
    /// Unit price.
    pub unit_price: Money,
}

impl LineItem {
    /// Create a new line item.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        variant: Variant,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        Self {
            id: LineItemId::generate(),
            product_id,
            product_name: product_name.into(),
            variant,
            quantity,
            unit_price,
        }
    }

    /// `unit_price * quantity`, saturating.
    pub fn line_total(&self) -> Money {
        Money::new(
            self.unit_price.amount_cents.saturating_mul(self.quantity),
            self.unit_price.currency,
        )
    }

    fn matches(&self, product_id: &ProductId, variant: &Variant) -> bool {
        &self.product_id == product_id && &self.variant == variant
    }
}

/// What an [`Cart::add_item`] call did to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Added(LineItemId),
    /// An existing line's quantity changed.
    Merged(LineItemId),
    /// A negative merge brought the line to zero or below.
    Removed(LineItemId),
}

impl AddOutcome {
    /// The affected line.
    pub fn line_id(&self) -> &LineItemId {
        match self {
            AddOutcome::Added(id) | AddOutcome::Merged(id) | AddOutcome::Removed(id) => id,
        }
    }
}

/// The line items of a shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Cart {
    /// Items in insertion order.
    pub items: Vec<LineItem>,
    /// Cart currency.
    pub currency: Currency,
}

impl Cart {
    /// Create an empty cart.
    pub fn new(currency: Currency) -> Self {
        Self {
            items: Vec::new(),
            currency,
        }
    }

    /// Add an item, merging into the line with the same product and variant.
    ///
    /// A merge with a negative quantity that leaves the line at zero or
    /// below removes the line. A new line needs a positive quantity.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        product_name: impl Into<String>,
        variant: Variant,
        quantity: i64,
        unit_price: Money,
    ) -> Result<AddOutcome, CommerceError> {
        self.check_price(&unit_price)?;

        if let Some(index) = self
            .items
            .iter()
            .position(|i| i.matches(&product_id, &variant))
        {
            let existing = &mut self.items[index];
            let new_quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or(CommerceError::Overflow)?;

            if new_quantity <= 0 {
                let removed = self.items.remove(index);
                return Ok(AddOutcome::Removed(removed.id));
            }
            if new_quantity > MAX_QUANTITY_PER_ITEM {
                return Err(CommerceError::QuantityExceedsLimit(
                    new_quantity,
                    MAX_QUANTITY_PER_ITEM,
                ));
            }

            existing.quantity = new_quantity;
            return Ok(AddOutcome::Merged(existing.id.clone()));
        }

        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }

        let item = LineItem::new(product_id, product_name, variant, quantity, unit_price);
        let id = item.id.clone();
        self.items.push(item);
        Ok(AddOutcome::Added(id))
    }

    /// Apply a quantity delta to a line, clamping at 1.
    ///
    /// Decrementing never removes a line; use [`Cart::remove_item`].
    /// Returns the new quantity.
    pub fn update_quantity(
        &mut self,
        line_item_id: &LineItemId,
        delta: i64,
    ) -> Result<i64, CommerceError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| &i.id == line_item_id)
            .ok_or_else(|| CommerceError::ItemNotInCart(line_item_id.to_string()))?;

        let new_quantity = item.quantity.saturating_add(delta).max(1);
        if new_quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                new_quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }

        item.quantity = new_quantity;
        Ok(new_quantity)
    }

    /// Remove an item from the cart.
    pub fn remove_item(&mut self, line_item_id: &LineItemId) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| &i.id != line_item_id);
        self.items.len() < len_before
    }

    /// Clear all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of quantities.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get an item by ID.
    pub fn get_item(&self, line_item_id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.id == line_item_id)
    }

    /// `Σ unit_price × quantity`, saturating.
    pub fn subtotal(&self) -> Money {
        let amount = self
            .items
            .iter()
            .fold(0_i64, |acc, i| acc.saturating_add(i.line_total().amount_cents));
        Money::new(amount, self.currency)
    }

    /// `Σ unit_price × quantity`, or an error if it does not fit.
    pub fn checked_subtotal(&self) -> Result<Money, CommerceError> {
        self.items.iter().try_fold(Money::zero(self.currency), |acc, item| {
            let line = item
                .unit_price
                .try_multiply(item.quantity)
                .ok_or(CommerceError::Overflow)?;
            acc.try_add(&line).ok_or(CommerceError::Overflow)
        })
    }

    fn check_price(&self, unit_price: &Money) -> Result<(), CommerceError> {
        if unit_price.currency != self.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: unit_price.currency.code().to_string(),
            });
        }
        if unit_price.is_negative() {
            return Err(CommerceError::InvalidPrice(unit_price.amount_cents));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn red_m() -> Variant {
        Variant::new(Some("Red".into()), Some("M".into()))
    }

    #[test]
    fn test_add_item() {
        let mut cart = Cart::new(Currency::USD);
        let outcome = cart
            .add_item(ProductId::new("p1"), "Shirt", red_m(), 2, usd(1000))
            .unwrap();

        assert!(matches!(outcome, AddOutcome::Added(_)));
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.subtotal(), usd(2000));
    }

    #[test]
    fn test_add_same_product_and_variant_merges() {
        let mut cart = Cart::new(Currency::USD);
        cart.add_item(ProductId::new("p1"), "Shirt", red_m(), 1, usd(1000))
            .unwrap();
        let outcome = cart
            .add_item(ProductId::new("p1"), "Shirt", red_m(), 2, usd(1000))
            .unwrap();

        assert!(matches!(outcome, AddOutcome::Merged(_)));
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_different_variant_is_a_new_line() {
        let mut cart = Cart::new(Currency::USD);
        cart.add_item(ProductId::new("p1"), "Shirt", red_m(), 1, usd(1000))
            .unwrap();
        cart.add_item(ProductId::new("p1"), "Shirt", Variant::default(), 1, usd(1000))
            .unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(red_m().label().as_deref(), Some("Red / M"));
    }

    #[test]
    fn test_negative_merge_removes_line() {
        let mut cart = Cart::new(Currency::USD);
        cart.add_item(ProductId::new("p1"), "Shirt", red_m(), 2, usd(1000))
            .unwrap();
        let outcome = cart
            .add_item(ProductId::new("p1"), "Shirt", red_m(), -2, usd(1000))
            .unwrap();

        assert!(matches!(outcome, AddOutcome::Removed(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_invalid_quantity_for_new_line() {
        let mut cart = Cart::new(Currency::USD);
        let result = cart.add_item(ProductId::new("p1"), "Shirt", red_m(), 0, usd(1000));
        assert_eq!(result, Err(CommerceError::InvalidQuantity(0)));
    }

    #[test]
    fn test_quantity_limit() {
        let mut cart = Cart::new(Currency::USD);
        let result = cart.add_item(
            ProductId::new("p1"),
            "Shirt",
            red_m(),
            MAX_QUANTITY_PER_ITEM + 1,
            usd(1000),
        );
        assert!(matches!(result, Err(CommerceError::QuantityExceedsLimit(..))));
    }

    #[test]
    fn test_update_quantity_clamps_at_one() {
        let mut cart = Cart::new(Currency::USD);
        let id = cart
            .add_item(ProductId::new("p1"), "Shirt", red_m(), 3, usd(1000))
            .unwrap()
            .line_id()
            .clone();

        assert_eq!(cart.update_quantity(&id, 2).unwrap(), 5);
        assert_eq!(cart.update_quantity(&id, -10).unwrap(), 1);
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_update_unknown_line() {
        let mut cart = Cart::new(Currency::USD);
        let result = cart.update_quantity(&LineItemId::new("nope"), 1);
        assert!(matches!(result, Err(CommerceError::ItemNotInCart(_))));
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::new(Currency::USD);
        let id = cart
            .add_item(ProductId::new("p1"), "Shirt", red_m(), 1, usd(1000))
            .unwrap()
            .line_id()
            .clone();

        assert!(cart.remove_item(&id));
        assert!(!cart.remove_item(&id));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_rejects_foreign_currency_and_negative_price() {
        let mut cart = Cart::new(Currency::USD);
        let eur = Money::new(100, Currency::EUR);
        assert!(matches!(
            cart.add_item(ProductId::new("p1"), "Shirt", red_m(), 1, eur),
            Err(CommerceError::CurrencyMismatch { .. })
        ));
        assert_eq!(
            cart.add_item(ProductId::new("p1"), "Shirt", red_m(), 1, usd(-1)),
            Err(CommerceError::InvalidPrice(-1))
        );
    }

    #[test]
    fn test_checked_subtotal_detects_overflow() {
        let mut cart = Cart::new(Currency::USD);
        cart.add_item(ProductId::new("p1"), "Gold", red_m(), 2, usd(i64::MAX / 2 + 1))
            .unwrap();
        assert_eq!(cart.checked_subtotal(), Err(CommerceError::Overflow));
    }
}
