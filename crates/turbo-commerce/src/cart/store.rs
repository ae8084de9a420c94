//! Shared cart state with change notification.

use crate::cart::{AddOutcome, Cart, LineItem, Variant, MAX_QUANTITY_PER_ITEM};
use crate::error::CommerceError;
use crate::events::EventBus;
use crate::ids::{LineItemId, ProductId};
use crate::money::{Currency, Money};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Immutable view of the cart at one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Increases on every mutation of the store.
    pub revision: u64,
    /// Line items in insertion order.
    pub lines: Vec<LineItem>,
    /// `Σ unit_price × quantity`.
    pub subtotal: Money,
    /// Sum of quantities.
    pub item_count: i64,
}

impl CartSnapshot {
    fn of(cart: &Cart, revision: u64) -> Self {
        Self {
            revision,
            lines: cart.items.clone(),
            subtotal: cart.subtotal(),
            item_count: cart.item_count(),
        }
    }

    /// Whether the cart had no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Currency of the subtotal.
    pub fn currency(&self) -> Currency {
        self.subtotal.currency
    }
}

/// Kind of mutation that produced a [`CartEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    ItemAdded,
    QuantityChanged,
    ItemRemoved,
    Cleared,
    Restored,
}

/// Published after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct CartEvent {
    pub change: CartChange,
    pub snapshot: CartSnapshot,
}

struct CartState {
    cart: Cart,
    revision: u64,
}

/// The cart shared by the storefront.
///
/// Every mutation bumps the revision and publishes a [`CartEvent`] once the
/// cart lock is released.
pub struct CartStore {
    state: Mutex<CartState>,
    events: EventBus<CartEvent>,
}

impl CartStore {
    /// Create an empty store.
    pub fn new(currency: Currency) -> Self {
        Self {
            state: Mutex::new(CartState {
                cart: Cart::new(currency),
                revision: 0,
            }),
            events: EventBus::new(),
        }
    }

    /// Cart change notifications.
    pub fn events(&self) -> &EventBus<CartEvent> {
        &self.events
    }

    /// Add an item, merging with an identical product/variant line.
    pub fn add_item(
        &self,
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
        variant: Variant,
    ) -> Result<AddOutcome, CommerceError> {
        let product_name = product_name.into();
        self.mutate(|cart| {
            let outcome = cart.add_item(product_id, product_name, variant, quantity, unit_price)?;
            let change = match outcome {
                AddOutcome::Added(_) => CartChange::ItemAdded,
                AddOutcome::Merged(_) => CartChange::QuantityChanged,
                AddOutcome::Removed(_) => CartChange::ItemRemoved,
            };
            Ok((Some(change), outcome))
        })
    }

    /// Apply a quantity delta to a line, clamping at 1. Returns the new quantity.
    pub fn update_quantity(&self, line_id: &LineItemId, delta: i64) -> Result<i64, CommerceError> {
        self.mutate(|cart| {
            let before = cart
                .get_item(line_id)
                .map(|item| item.quantity)
                .ok_or_else(|| CommerceError::ItemNotInCart(line_id.to_string()))?;
            let after = cart.update_quantity(line_id, delta)?;
            Ok(((after != before).then_some(CartChange::QuantityChanged), after))
        })
    }

    /// Remove a line. Returns false if it was not in the cart.
    pub fn remove_item(&self, line_id: &LineItemId) -> bool {
        self.mutate(|cart| {
            let removed = cart.remove_item(line_id);
            Ok((removed.then_some(CartChange::ItemRemoved), removed))
        })
        .unwrap_or(false)
    }

    /// Empty the cart.
    pub fn clear(&self) {
        // Clearing never grows the subtotal, so the overflow check cannot fail.
        let _ = self.mutate(|cart| {
            let had_lines = !cart.is_empty();
            cart.clear();
            Ok((had_lines.then_some(CartChange::Cleared), ()))
        });
    }

    /// Take the ordered quantities out of the cart after an order is placed.
    ///
    /// Only the ordered quantity is removed from each line, so anything added
    /// while the order was in flight stays. An unchanged cart ends up empty.
    pub fn settle(&self, ordered: &CartSnapshot) {
        // Removing quantity never grows the subtotal.
        let _ = self.mutate(|cart| {
            let mut changed = false;
            for line in &ordered.lines {
                let Some(index) = cart.items.iter().position(|item| item.id == line.id) else {
                    continue;
                };
                let remaining = cart.items[index].quantity - line.quantity;
                if remaining > 0 {
                    cart.items[index].quantity = remaining;
                } else {
                    cart.items.remove(index);
                }
                changed = true;
            }

            let change = if cart.is_empty() {
                CartChange::Cleared
            } else {
                CartChange::ItemRemoved
            };
            Ok((changed.then_some(change), ()))
        });
    }

    /// Replace the contents with previously persisted lines.
    ///
    /// Lines in another currency, with quantities outside `1..=9999` or with
    /// negative prices are dropped.
    pub fn restore(&self, lines: Vec<LineItem>) -> Result<(), CommerceError> {
        self.mutate(|cart| {
            let currency = cart.currency;
            cart.items = lines
                .into_iter()
                .filter(|line| {
                    line.unit_price.currency == currency
                        && !line.unit_price.is_negative()
                        && (1..=MAX_QUANTITY_PER_ITEM).contains(&line.quantity)
                })
                .collect();
            Ok((Some(CartChange::Restored), ()))
        })
    }

    /// Current contents at the current revision.
    pub fn snapshot(&self) -> CartSnapshot {
        let state = self.state.lock();
        CartSnapshot::of(&state.cart, state.revision)
    }

    /// `Σ unit_price × quantity` over current lines.
    pub fn subtotal(&self) -> Money {
        self.with_cart(Cart::subtotal)
    }

    /// Sum of quantities.
    pub fn item_count(&self) -> i64 {
        self.with_cart(Cart::item_count)
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.with_cart(Cart::is_empty)
    }

    /// Current revision.
    pub fn revision(&self) -> u64 {
        self.state.lock().revision
    }

    /// Cart currency.
    pub fn currency(&self) -> Currency {
        self.with_cart(|cart| cart.currency)
    }

    fn with_cart<T>(&self, f: impl FnOnce(&Cart) -> T) -> T {
        f(&self.state.lock().cart)
    }

    /// Run a mutation under the lock, roll it back if the subtotal would
    /// overflow, then publish outside the lock.
    ///
    /// `f` reports `None` as the change when nothing changed; no revision is
    /// consumed and no event is published then.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Cart) -> Result<(Option<CartChange>, T), CommerceError>,
    ) -> Result<T, CommerceError> {
        let (event, value) = {
            let mut state = self.state.lock();
            let backup = state.cart.clone();

            let (change, value) = match f(&mut state.cart) {
                Ok((Some(change), value)) => (change, value),
                Ok((None, value)) => return Ok(value),
                Err(e) => {
                    state.cart = backup;
                    return Err(e);
                }
            };

            if let Err(e) = state.cart.checked_subtotal() {
                state.cart = backup;
                return Err(e);
            }

            state.revision += 1;
            tracing::debug!(
                revision = state.revision,
                change = ?change,
                lines = state.cart.items.len(),
                "cart changed"
            );
            let snapshot = CartSnapshot::of(&state.cart, state.revision);
            (CartEvent { change, snapshot }, value)
        };

        self.events.publish(&event);
        Ok(value)
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CartStore")
            .field("revision", &state.revision)
            .field("lines", &state.cart.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn add(store: &CartStore, product: &str, cents: i64, qty: i64) -> LineItemId {
        store
            .add_item(ProductId::new(product), product, usd(cents), qty, Variant::default())
            .unwrap()
            .line_id()
            .clone()
    }

    #[test]
    fn test_subtotal_matches_surviving_lines() {
        let store = CartStore::new(Currency::USD);
        let a = add(&store, "a", 2000, 2);
        let b = add(&store, "b", 1500, 1);
        assert_eq!(store.subtotal(), usd(5500));

        store.update_quantity(&a, 3).unwrap();
        store.update_quantity(&b, -5).unwrap();
        add(&store, "c", 999, 3);
        assert!(store.remove_item(&a));

        let snapshot = store.snapshot();
        let expected: i64 = snapshot
            .lines
            .iter()
            .map(|l| l.unit_price.amount_cents * l.quantity)
            .sum();
        assert_eq!(snapshot.subtotal.amount_cents, expected);
        assert_eq!(snapshot.subtotal, usd(1500 + 999 * 3));
        assert_eq!(snapshot.item_count, 4);
    }

    #[test]
    fn test_every_mutation_bumps_revision_and_publishes() {
        let store = CartStore::new(Currency::USD);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .events()
            .subscribe(move |e: &CartEvent| sink.lock().push((e.change, e.snapshot.revision)));

        let id = add(&store, "a", 100, 1);
        store.update_quantity(&id, 1).unwrap();
        store.remove_item(&id);
        store.clear();

        assert_eq!(
            *seen.lock(),
            vec![
                (CartChange::ItemAdded, 1),
                (CartChange::QuantityChanged, 2),
                (CartChange::ItemRemoved, 3),
            ]
        );
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn test_noop_updates_do_not_publish() {
        let store = CartStore::new(Currency::USD);
        let id = add(&store, "a", 100, 1);
        let revision = store.revision();

        assert_eq!(store.update_quantity(&id, -1).unwrap(), 1);
        assert!(!store.remove_item(&LineItemId::new("missing")));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_failed_mutation_leaves_cart_untouched() {
        let store = CartStore::new(Currency::USD);
        add(&store, "a", i64::MAX / 2, 1);
        let before = store.snapshot();

        let result = store.add_item(
            ProductId::new("b"),
            "b",
            usd(i64::MAX / 2),
            2,
            Variant::default(),
        );

        assert_eq!(result, Err(CommerceError::Overflow));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_listener_can_read_store_during_publish() {
        let store = Arc::new(CartStore::new(Currency::USD));
        let observed = Arc::new(Mutex::new(None));
        let (inner, sink) = (Arc::clone(&store), Arc::clone(&observed));
        store.events().subscribe(move |_| {
            *sink.lock() = Some(inner.subtotal());
        });

        add(&store, "a", 250, 2);
        assert_eq!(*observed.lock(), Some(usd(500)));
    }

    #[test]
    fn test_restore_drops_invalid_lines() {
        let store = CartStore::new(Currency::USD);
        let good = LineItem::new(ProductId::new("a"), "a", Variant::default(), 2, usd(100));
        let zero = LineItem::new(ProductId::new("b"), "b", Variant::default(), 0, usd(100));
        let foreign = LineItem::new(
            ProductId::new("c"),
            "c",
            Variant::default(),
            1,
            Money::new(100, Currency::EUR),
        );

        store.restore(vec![good.clone(), zero, foreign]).unwrap();
        assert_eq!(store.snapshot().lines, vec![good]);
    }

    #[test]
    fn test_settle_keeps_lines_added_after_the_order() {
        let store = CartStore::new(Currency::USD);
        let a = add(&store, "a", 2000, 2);
        add(&store, "b", 1500, 1);
        let ordered = store.snapshot();

        add(&store, "a", 2000, 1);
        let sock = add(&store, "sock", 500, 3);
        store.settle(&ordered);

        let left = store.snapshot();
        assert_eq!(left.lines.len(), 2);
        assert_eq!(left.lines[0].id, a);
        assert_eq!(left.lines[0].quantity, 1);
        assert_eq!(left.lines[1].id, sock);
        assert_eq!(left.subtotal, usd(3500));
    }

    #[test]
    fn test_settle_empties_unchanged_cart() {
        let store = CartStore::new(Currency::USD);
        add(&store, "a", 2000, 2);
        add(&store, "b", 1500, 1);
        let ordered = store.snapshot();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.events().subscribe(move |event: &CartEvent| sink.lock().push(event.change));

        store.settle(&ordered);
        assert!(store.is_empty());
        assert_eq!(*events.lock(), vec![CartChange::Cleared]);

        store.settle(&ordered);
        assert_eq!(events.lock().len(), 1);
    }
}
