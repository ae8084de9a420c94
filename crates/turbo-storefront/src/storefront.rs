//! The storefront facade.
//!
//! A [`Storefront`] owns one cart, one coupon evaluator and one checkout
//! reconciler, and ties them to a [`Session`] through event subscriptions:
//!
//! - every cart change re-evaluates the coupon and persists the cart under
//!   its owner's key;
//! - a login swaps in that user's cart, carrying the guest cart over when
//!   the user has none;
//! - a logout clears the cart and the coupon.

use crate::StorefrontError;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use turbo_auth::{Session, SessionEvent};
use turbo_commerce::cart::{AddOutcome, CartEvent, CartSnapshot, CartStore, Variant};
use turbo_commerce::catalog::Product;
use turbo_commerce::checkout::{
    CheckoutError, CheckoutReconciler, CheckoutState, OrderRecord, ShippingForm, SubmitOutcome,
};
use turbo_commerce::coupon::{
    ActiveDiscount, CouponError, CouponEvaluator, CouponState, RevalidationPolicy,
};
use turbo_commerce::events::SubscriptionId;
use turbo_commerce::gateway::{CouponValidator, OrderGateway};
use turbo_commerce::ids::{LineItemId, ProductId};
use turbo_commerce::money::{Currency, Money};

/// Storefront settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorefrontOptions {
    pub currency: Currency,
    pub policy: RevalidationPolicy,
}

/// What the shopper would pay right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    /// `subtotal - discount`, never negative.
    pub payable: Money,
    pub item_count: i64,
    pub coupon: Option<String>,
    /// The coupon was priced against an earlier cart. It counts as zero here
    /// and is validated again before any charge.
    pub stale: bool,
    pub validating: bool,
}

type CartOwner = Arc<Mutex<Option<String>>>;

pub struct Storefront {
    session: Arc<Session>,
    cart: Arc<CartStore>,
    coupons: Arc<CouponEvaluator>,
    checkout: CheckoutReconciler,
    cart_subscription: SubscriptionId,
    session_subscription: SubscriptionId,
}

impl Storefront {
    /// Restore the current user's cart from `session` and wire everything up.
    pub fn new(
        session: Arc<Session>,
        validator: Arc<dyn CouponValidator>,
        gateway: Arc<dyn OrderGateway>,
        options: StorefrontOptions,
    ) -> Result<Self, StorefrontError> {
        let cart = Arc::new(CartStore::new(options.currency));
        let coupons = Arc::new(CouponEvaluator::new(validator, options.policy));

        let owner = session.username();
        let lines = session.load_cart_for(owner.as_deref())?;
        if !lines.is_empty() {
            tracing::debug!(
                lines = lines.len(),
                owner = owner.as_deref().unwrap_or("guest"),
                "restoring cart"
            );
            cart.restore(lines)?;
        }
        let owner: CartOwner = Arc::new(Mutex::new(owner));

        let cart_subscription = cart.events().subscribe({
            let coupons = Arc::clone(&coupons);
            let session = Arc::clone(&session);
            let owner = Arc::clone(&owner);
            move |event: &CartEvent| {
                coupons.on_cart_changed(&event.snapshot);
                let key_owner = owner.lock().clone();
                let lines = &event.snapshot.lines;
                if let Err(e) = session.save_cart_for(key_owner.as_deref(), lines) {
                    tracing::warn!(error = %e, "failed to persist cart");
                }
            }
        });

        let session_subscription = session.events().subscribe({
            let session = Arc::downgrade(&session);
            let cart = Arc::downgrade(&cart);
            let coupons = Arc::downgrade(&coupons);
            move |event: &SessionEvent| {
                let (Some(session), Some(cart), Some(coupons)) =
                    (session.upgrade(), cart.upgrade(), coupons.upgrade())
                else {
                    return;
                };
                let result = match event {
                    SessionEvent::LoggedIn { username } => {
                        adopt_user_cart(&session, &cart, &coupons, &owner, username)
                    }
                    SessionEvent::LoggedOut { username } => {
                        drop_user_cart(&session, &cart, &coupons, &owner, username)
                    }
                };
                if let Err(e) = result {
                    tracing::warn!(error = %e, "failed to switch carts");
                }
            }
        });

        Ok(Self {
            session,
            cart,
            coupons,
            checkout: CheckoutReconciler::new(gateway),
            cart_subscription,
            session_subscription,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn cart(&self) -> CartSnapshot {
        self.cart.snapshot()
    }

    pub fn coupon_state(&self) -> CouponState {
        self.coupons.state()
    }

    /// Add `quantity` of `product`, in its first color and size unless
    /// `variant` is given.
    pub fn add_product(
        &self,
        product: &Product,
        variant: Option<Variant>,
        quantity: i64,
    ) -> Result<AddOutcome, StorefrontError> {
        let variant = variant.unwrap_or_else(|| product.default_variant());
        if !product.offers(&variant) {
            return Err(StorefrontError::UnavailableVariant {
                product: product.id.clone(),
                variant: variant.label().unwrap_or_default(),
            });
        }
        let unit_price = product.unit_price(self.cart.currency());
        Ok(self
            .cart
            .add_item(product.id.clone(), product.name.clone(), unit_price, quantity, variant)?)
    }

    pub fn add_item(
        &self,
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
        variant: Variant,
    ) -> Result<AddOutcome, StorefrontError> {
        Ok(self
            .cart
            .add_item(product_id, product_name, unit_price, quantity, variant)?)
    }

    /// Apply a quantity delta to a line; the result never drops below 1.
    pub fn update_quantity(&self, line_id: &LineItemId, delta: i64) -> Result<i64, StorefrontError> {
        Ok(self.cart.update_quantity(line_id, delta)?)
    }

    pub fn remove_item(&self, line_id: &LineItemId) -> bool {
        self.cart.remove_item(line_id)
    }

    pub fn clear_cart(&self) {
        self.cart.clear();
    }

    /// Validate `code` against the current cart and apply it.
    pub async fn apply_coupon(&self, code: &str) -> Result<ActiveDiscount, CouponError> {
        self.coupons.apply_coupon(code, &self.cart.snapshot()).await
    }

    pub fn remove_coupon(&self) {
        self.coupons.remove_coupon();
    }

    /// Validate a stale coupon again against the current cart.
    pub async fn refresh_coupon(&self) -> Result<Option<ActiveDiscount>, CouponError> {
        self.coupons.revalidate(&self.cart.snapshot()).await
    }

    pub fn totals(&self) -> Totals {
        let snapshot = self.cart.snapshot();
        let state = self.coupons.state();
        let zero = Money::zero(snapshot.currency());

        let (discount, stale) = match &state {
            CouponState::Applied(active) if active.is_fresh_for(&snapshot) => {
                (active.discount.clamp_to(&snapshot.subtotal), false)
            }
            CouponState::Applied(_) | CouponState::Stale(_) => (zero, true),
            CouponState::NoCoupon | CouponState::Validating { .. } => (zero, false),
        };
        let payable = snapshot
            .subtotal
            .try_subtract(&discount)
            .map_or(zero, |total| total.clamp_to(&snapshot.subtotal));

        Totals {
            subtotal: snapshot.subtotal,
            discount,
            payable,
            item_count: snapshot.item_count,
            coupon: state.discount().map(|active| active.code().to_string()),
            stale,
            validating: state.is_validating(),
        }
    }

    /// Place an order for the current cart with the session's bearer token.
    ///
    /// A placed order is also remembered in the session's order history.
    pub async fn checkout(&self, form: &ShippingForm) -> Result<SubmitOutcome, CheckoutError> {
        let bearer = self.session.bearer();
        let outcome = self
            .checkout
            .submit(&self.cart, &self.coupons, bearer.as_deref(), form)
            .await?;

        if let SubmitOutcome::Placed { receipt, submission } = &outcome {
            if let Err(e) = self.session.record_order(OrderRecord::placed(receipt, submission)) {
                tracing::warn!(order_id = %receipt.order_id, error = %e, "failed to remember order");
            }
        }
        Ok(outcome)
    }

    pub fn checkout_state(&self) -> CheckoutState {
        self.checkout.state()
    }

    /// Return checkout to idle after a failure or a placed order.
    pub fn reset_checkout(&self) -> bool {
        self.checkout.reset()
    }

    /// Orders placed by the current user, newest first.
    pub fn recent_orders(&self) -> Result<Vec<OrderRecord>, StorefrontError> {
        Ok(self.session.recent_orders()?)
    }
}

impl Drop for Storefront {
    fn drop(&mut self) {
        self.cart.events().unsubscribe(self.cart_subscription);
        self.session.events().unsubscribe(self.session_subscription);
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("session", &self.session)
            .field("revision", &self.cart.revision())
            .field("coupon", &self.coupons.state().name())
            .field("checkout", &self.checkout.state().name())
            .finish()
    }
}

fn adopt_user_cart(
    session: &Session,
    cart: &CartStore,
    coupons: &CouponEvaluator,
    owner: &Mutex<Option<String>>,
    username: &str,
) -> Result<(), StorefrontError> {
    if owner.lock().as_deref() == Some(username) {
        return Ok(());
    }

    let mut lines = session.load_cart_for(Some(username))?;
    if lines.is_empty() {
        lines = session.load_cart_for(None)?;
        if !lines.is_empty() {
            tracing::info!(username, lines = lines.len(), "carrying guest cart over");
            session.clear_cart_for(None)?;
        }
    }

    coupons.remove_coupon();
    *owner.lock() = Some(username.to_string());
    cart.restore(lines)?;
    Ok(())
}

fn drop_user_cart(
    session: &Session,
    cart: &CartStore,
    coupons: &CouponEvaluator,
    owner: &Mutex<Option<String>>,
    username: &str,
) -> Result<(), StorefrontError> {
    tracing::debug!(username, "clearing cart after logout");
    *owner.lock() = None;
    coupons.remove_coupon();
    cart.clear();
    session.clear_cart_for(None)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use turbo_commerce::checkout::OrderReceipt;
    use turbo_commerce::checkout::OrderSubmission;
    use turbo_commerce::gateway::{
        CouponValidationRequest, CouponValidationResponse, GatewayError,
    };
    use turbo_commerce::pricing::PriceField;

    struct NoCoupons;

    #[async_trait]
    impl CouponValidator for NoCoupons {
        async fn validate(
            &self,
            _request: &CouponValidationRequest,
        ) -> Result<CouponValidationResponse, GatewayError> {
            Ok(CouponValidationResponse::rejected("Invalid coupon"))
        }
    }

    struct NoOrders;

    #[async_trait]
    impl OrderGateway for NoOrders {
        async fn create_order(
            &self,
            _submission: &OrderSubmission,
            _bearer: &str,
        ) -> Result<OrderReceipt, GatewayError> {
            Err(GatewayError::Transport("offline".into()))
        }
    }

    fn storefront() -> Storefront {
        Storefront::new(
            Arc::new(Session::in_memory()),
            Arc::new(NoCoupons),
            Arc::new(NoOrders),
            StorefrontOptions::default(),
        )
        .unwrap()
    }

    fn tee() -> Product {
        Product {
            id: ProductId::new("tee"),
            name: "Tee".into(),
            description: None,
            price: Some(PriceField::Tiered {
                current: Some(15.0),
                original: Some(20.0),
            }),
            colors: vec!["Red".into(), "Blue".into()],
            sizes: vec!["M".into()],
            category: None,
        }
    }

    #[test]
    fn test_add_product_uses_current_price_and_default_variant() {
        let store = storefront();
        let outcome = store.add_product(&tee(), None, 2).unwrap();

        let cart = store.cart();
        let line = &cart.lines[0];
        assert_eq!(line.id, *outcome.line_id());
        assert_eq!(line.unit_price.amount_cents, 1500);
        assert_eq!(line.variant.color.as_deref(), Some("Red"));
        assert_eq!(store.totals().payable.amount_cents, 3000);
    }

    #[test]
    fn test_add_product_rejects_unknown_variant() {
        let store = storefront();
        let err = store
            .add_product(&tee(), Some(Variant::new(Some("Green".into()), None)), 1)
            .unwrap_err();
        assert!(matches!(err, StorefrontError::UnavailableVariant { .. }));
        assert!(store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_coupon_leaves_totals_alone() {
        let store = storefront();
        store.add_product(&tee(), None, 1).unwrap();

        let err = store.apply_coupon("BOGUS").await.unwrap_err();
        assert_eq!(err, CouponError::Rejected("Invalid coupon".into()));

        let totals = store.totals();
        assert_eq!(totals.discount.amount_cents, 0);
        assert_eq!(totals.payable, totals.subtotal);
        assert_eq!(totals.coupon, None);
    }

    #[test]
    fn test_drop_unsubscribes_from_session() {
        let session = Arc::new(Session::in_memory());
        let store = Storefront::new(
            Arc::clone(&session),
            Arc::new(NoCoupons),
            Arc::new(NoOrders),
            StorefrontOptions::default(),
        )
        .unwrap();
        assert_eq!(session.events().listener_count(), 1);

        drop(store);
        assert_eq!(session.events().listener_count(), 0);
    }
}
