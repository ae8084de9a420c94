//! Applying validated coupons to the cart.
//!
//! ```text
//! NoCoupon ──apply──▶ Validating ──valid──▶ Applied ──cart changed──▶ Stale
//!     ▲                   │                    │                        │
//!     └──── rejected ─────┘◀──── remove ───────┴──── revalidate ────────┘
//! ```
//!
//! Every [`CouponEvaluator::apply_coupon`] call takes a fresh request token.
//! When a validation resolves, its result is only kept if no newer call (or
//! removal) happened in the meantime; otherwise it resolves to
//! [`CouponError::Superseded`] and leaves the state alone.

use crate::cart::CartSnapshot;
use crate::coupon::{clamp_discount, normalize_code, Coupon, CouponKind};
use crate::gateway::{CouponValidationRequest, CouponValidator};
use crate::money::{Currency, Money};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced when applying a coupon.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    /// Input rejected before any network call.
    #[error("{0}")]
    Invalid(String),

    /// The validation endpoint refused the code.
    #[error("{0}")]
    Rejected(String),

    /// The validation endpoint could not be reached.
    #[error("Could not validate coupon: {0}")]
    Unavailable(String),

    /// A newer apply or a removal replaced this validation.
    #[error("Coupon validation was superseded")]
    Superseded,

    /// A validation is still in flight.
    #[error("Coupon is still being validated")]
    Pending,

    /// The cart changed after the discount was computed.
    #[error("Cart changed after the coupon was applied; please review your total")]
    Stale,
}

/// What to do with an applied discount when the cart changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevalidationPolicy {
    /// Mark the discount stale and validate again before it is charged.
    #[default]
    Revalidate,
    /// Drop the coupon; the user applies it again.
    ClearOnChange,
}

/// A coupon validated against one cart revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDiscount {
    pub coupon: Coupon,
    /// Always within `[0, basis_subtotal]`.
    pub discount: Money,
    /// Cart revision the discount was computed against.
    pub basis_revision: u64,
    pub basis_subtotal: Money,
}

impl ActiveDiscount {
    /// Whether this discount was computed against `snapshot`.
    pub fn is_fresh_for(&self, snapshot: &CartSnapshot) -> bool {
        self.basis_revision == snapshot.revision
    }

    pub fn code(&self) -> &str {
        &self.coupon.code
    }
}

/// Coupon state as seen by the view layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CouponState {
    #[default]
    NoCoupon,
    Validating {
        code: String,
    },
    Applied(ActiveDiscount),
    /// Applied against an older cart revision; not chargeable as is.
    Stale(ActiveDiscount),
}

impl CouponState {
    pub fn name(&self) -> &'static str {
        match self {
            CouponState::NoCoupon => "no_coupon",
            CouponState::Validating { .. } => "validating",
            CouponState::Applied(_) => "applied",
            CouponState::Stale(_) => "stale",
        }
    }

    /// The applied or stale discount.
    pub fn discount(&self) -> Option<&ActiveDiscount> {
        match self {
            CouponState::Applied(active) | CouponState::Stale(active) => Some(active),
            _ => None,
        }
    }

    pub fn is_validating(&self) -> bool {
        matches!(self, CouponState::Validating { .. })
    }
}

struct Inner {
    state: CouponState,
    /// Token of the validation whose result will be kept.
    pending: Option<u64>,
    /// Latest cart revision seen.
    cart_revision: u64,
}

/// Tracks the coupon applied to the cart.
pub struct CouponEvaluator {
    validator: Arc<dyn CouponValidator>,
    policy: RevalidationPolicy,
    tokens: AtomicU64,
    inner: Mutex<Inner>,
}

impl CouponEvaluator {
    pub fn new(validator: Arc<dyn CouponValidator>, policy: RevalidationPolicy) -> Self {
        Self {
            validator,
            policy,
            tokens: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                state: CouponState::NoCoupon,
                pending: None,
                cart_revision: 0,
            }),
        }
    }

    pub fn policy(&self) -> RevalidationPolicy {
        self.policy
    }

    /// Current state.
    pub fn state(&self) -> CouponState {
        self.inner.lock().state.clone()
    }

    /// The discount that may be charged right now, if any.
    pub fn active_discount(&self) -> Option<ActiveDiscount> {
        match &self.inner.lock().state {
            CouponState::Applied(active) => Some(active.clone()),
            _ => None,
        }
    }

    /// Chargeable discount amount; zero unless a fresh coupon is applied.
    pub fn discount_amount(&self, currency: Currency) -> Money {
        self.active_discount()
            .map(|active| active.discount)
            .unwrap_or_else(|| Money::zero(currency))
    }

    /// Validate `code` against `snapshot` and apply it.
    pub async fn apply_coupon(
        &self,
        code: &str,
        snapshot: &CartSnapshot,
    ) -> Result<ActiveDiscount, CouponError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(CouponError::Invalid("Please enter a coupon code".into()));
        }
        if snapshot.is_empty() {
            return Err(CouponError::Invalid(
                "Add items to your cart before applying a coupon".into(),
            ));
        }

        let token = self.tokens.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut inner = self.inner.lock();
            inner.pending = Some(token);
            inner.cart_revision = inner.cart_revision.max(snapshot.revision);
            inner.state = CouponState::Validating { code: code.clone() };
        }
        tracing::debug!(code = %code, token, revision = snapshot.revision, "validating coupon");

        let request = CouponValidationRequest::from_snapshot(code.clone(), snapshot);
        let result = self.validator.validate(&request).await;

        let mut inner = self.inner.lock();
        if inner.pending != Some(token) {
            tracing::debug!(code = %code, token, "discarding superseded coupon validation");
            return Err(CouponError::Superseded);
        }
        inner.pending = None;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                inner.state = CouponState::NoCoupon;
                tracing::warn!(code = %code, error = %e, "coupon validation unavailable");
                return Err(CouponError::Unavailable(e.message().to_string()));
            }
        };

        if !response.valid {
            inner.state = CouponState::NoCoupon;
            let message = response
                .message
                .unwrap_or_else(|| "Invalid coupon code".to_string());
            tracing::warn!(code = %code, reason = %message, "coupon rejected");
            return Err(CouponError::Rejected(message));
        }

        let coupon = match (response.coupon, response.discount) {
            (Some(coupon), _) => coupon,
            (None, Some(amount)) => Coupon::new(&code, CouponKind::FixedAmount, amount),
            (None, None) => {
                inner.state = CouponState::NoCoupon;
                return Err(CouponError::Unavailable(
                    "validation response carried neither coupon nor discount".into(),
                ));
            }
        };
        let subtotal = snapshot.subtotal;
        let discount = match response.discount {
            Some(amount) => clamp_discount(Money::from_decimal(amount, subtotal.currency), &subtotal),
            None => coupon.discount_on(&subtotal),
        };

        let active = ActiveDiscount {
            coupon,
            discount,
            basis_revision: snapshot.revision,
            basis_subtotal: subtotal,
        };

        if inner.cart_revision != snapshot.revision {
            return match self.policy {
                RevalidationPolicy::Revalidate => {
                    tracing::debug!(code = %active.code(), "cart changed during validation; coupon stale");
                    inner.state = CouponState::Stale(active.clone());
                    Ok(active)
                }
                RevalidationPolicy::ClearOnChange => {
                    inner.state = CouponState::NoCoupon;
                    Err(CouponError::Superseded)
                }
            };
        }

        tracing::info!(
            code = %active.code(),
            discount = %active.discount,
            subtotal = %subtotal,
            "coupon applied"
        );
        inner.state = CouponState::Applied(active.clone());
        Ok(active)
    }

    /// Drop the coupon. The discount is zero afterwards, whatever the prior
    /// state, and any in-flight validation is discarded when it resolves.
    pub fn remove_coupon(&self) {
        self.reset("removed");
    }

    /// Drop the coupon after an order has been placed.
    pub fn clear(&self) {
        self.reset("cleared");
    }

    /// React to a cart mutation.
    pub fn on_cart_changed(&self, snapshot: &CartSnapshot) {
        let mut inner = self.inner.lock();
        if snapshot.revision < inner.cart_revision {
            return;
        }
        inner.cart_revision = snapshot.revision;

        if snapshot.is_empty() {
            if inner.state != CouponState::NoCoupon {
                tracing::debug!("cart emptied; dropping coupon");
            }
            inner.pending = None;
            inner.state = CouponState::NoCoupon;
            return;
        }

        let outdated = match &inner.state {
            CouponState::Applied(active) if !active.is_fresh_for(snapshot) => active.clone(),
            _ => return,
        };
        inner.state = match self.policy {
            RevalidationPolicy::Revalidate => {
                tracing::debug!(code = %outdated.code(), revision = snapshot.revision, "coupon stale");
                CouponState::Stale(outdated)
            }
            RevalidationPolicy::ClearOnChange => {
                tracing::debug!(code = %outdated.code(), "cart changed; dropping coupon");
                CouponState::NoCoupon
            }
        };
    }

    /// Validate a stale discount again against `snapshot`.
    ///
    /// Returns the fresh discount, `None` if there is no coupon, or the
    /// error that dropped the coupon.
    pub async fn revalidate(
        &self,
        snapshot: &CartSnapshot,
    ) -> Result<Option<ActiveDiscount>, CouponError> {
        let code = {
            let inner = self.inner.lock();
            match &inner.state {
                CouponState::NoCoupon => return Ok(None),
                CouponState::Validating { .. } => return Err(CouponError::Pending),
                CouponState::Applied(active) if active.is_fresh_for(snapshot) => {
                    return Ok(Some(active.clone()))
                }
                CouponState::Applied(active) | CouponState::Stale(active) => active.code().to_string(),
            }
        };

        let active = self.apply_coupon(&code, snapshot).await?;
        if active.is_fresh_for(snapshot) && self.active_discount().as_ref() == Some(&active) {
            Ok(Some(active))
        } else {
            Err(CouponError::Stale)
        }
    }

    /// The discount to charge for `snapshot`.
    ///
    /// A stale discount is validated again under [`RevalidationPolicy::Revalidate`]
    /// and dropped with [`CouponError::Stale`] under
    /// [`RevalidationPolicy::ClearOnChange`].
    pub async fn discount_for_checkout(
        &self,
        snapshot: &CartSnapshot,
    ) -> Result<Option<ActiveDiscount>, CouponError> {
        if self.policy == RevalidationPolicy::ClearOnChange {
            let mut inner = self.inner.lock();
            match &inner.state {
                CouponState::Applied(active) | CouponState::Stale(active)
                    if !active.is_fresh_for(snapshot) =>
                {
                    inner.state = CouponState::NoCoupon;
                    return Err(CouponError::Stale);
                }
                _ => {}
            }
        }
        self.revalidate(snapshot).await
    }

    fn reset(&self, reason: &str) {
        let mut inner = self.inner.lock();
        inner.pending = None;
        if inner.state != CouponState::NoCoupon {
            tracing::debug!(reason, "coupon dropped");
        }
        inner.state = CouponState::NoCoupon;
    }
}

impl std::fmt::Debug for CouponEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponEvaluator")
            .field("policy", &self.policy)
            .field("state", &self.inner.lock().state.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartStore, Variant};
    use crate::gateway::{CouponValidationResponse, GatewayError};
    use crate::ids::ProductId;
    use async_trait::async_trait;

    /// Answers by code; codes starting with "SLOW" yield a few times first.
    #[derive(Default)]
    struct FakeValidator {
        calls: Mutex<Vec<CouponValidationRequest>>,
        offline: bool,
    }

    #[async_trait]
    impl CouponValidator for FakeValidator {
        async fn validate(
            &self,
            request: &CouponValidationRequest,
        ) -> Result<CouponValidationResponse, GatewayError> {
            self.calls.lock().push(request.clone());
            if request.code.starts_with("SLOW") {
                for _ in 0..5 {
                    tokio::task::yield_now().await;
                }
            }
            if self.offline {
                return Err(GatewayError::Transport("connection refused".into()));
            }
            Ok(match request.code.as_str() {
                "TEN" | "SLOWTEN" => CouponValidationResponse::accepted(
                    Coupon::new(&request.code, CouponKind::FixedAmount, 10.0),
                    None,
                ),
                "HALF" | "SLOWHALF" => CouponValidationResponse::accepted(
                    Coupon::new(&request.code, CouponKind::Percentage, 50.0),
                    None,
                ),
                "DOUBLE" => CouponValidationResponse::accepted(
                    Coupon::new("DOUBLE", CouponKind::Percentage, 200.0),
                    None,
                ),
                "SERVER" => CouponValidationResponse::accepted(
                    Coupon::new("SERVER", CouponKind::Percentage, 10.0),
                    Some(7.25),
                ),
                _ => CouponValidationResponse::rejected("Coupon expired"),
            })
        }
    }

    fn setup(policy: RevalidationPolicy) -> (CartStore, Arc<FakeValidator>, CouponEvaluator) {
        let cart = CartStore::new(Currency::USD);
        cart.add_item(ProductId::new("a"), "A", usd(2000), 2, Variant::default())
            .unwrap();
        cart.add_item(ProductId::new("b"), "B", usd(1500), 1, Variant::default())
            .unwrap();
        let validator = Arc::new(FakeValidator::default());
        let evaluator = CouponEvaluator::new(validator.clone(), policy);
        (cart, validator, evaluator)
    }

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[tokio::test]
    async fn test_fixed_coupon_then_remove() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        let snapshot = cart.snapshot();
        assert_eq!(snapshot.subtotal, usd(5500));

        let active = coupons.apply_coupon(" ten ", &snapshot).await.unwrap();
        assert_eq!(active.discount, usd(1000));
        assert_eq!(active.code(), "TEN");
        assert_eq!(coupons.discount_amount(Currency::USD), usd(1000));

        coupons.remove_coupon();
        assert_eq!(coupons.state(), CouponState::NoCoupon);
        assert_eq!(coupons.discount_amount(Currency::USD), usd(0));
    }

    #[tokio::test]
    async fn test_percentage_over_hundred_clamps() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        let active = coupons.apply_coupon("double", &cart.snapshot()).await.unwrap();
        assert_eq!(active.discount, usd(5500));
    }

    #[tokio::test]
    async fn test_server_discount_is_trusted() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        let active = coupons.apply_coupon("SERVER", &cart.snapshot()).await.unwrap();
        assert_eq!(active.discount, usd(725));
    }

    #[tokio::test]
    async fn test_rejection_returns_to_no_coupon_with_message() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        coupons.apply_coupon("TEN", &cart.snapshot()).await.unwrap();

        let err = coupons.apply_coupon("OLD", &cart.snapshot()).await.unwrap_err();
        assert_eq!(err, CouponError::Rejected("Coupon expired".into()));
        assert_eq!(coupons.state(), CouponState::NoCoupon);
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let cart = CartStore::new(Currency::USD);
        cart.add_item(ProductId::new("a"), "A", usd(100), 1, Variant::default())
            .unwrap();
        let validator = Arc::new(FakeValidator {
            offline: true,
            ..FakeValidator::default()
        });
        let coupons = CouponEvaluator::new(validator, RevalidationPolicy::Revalidate);

        let err = coupons.apply_coupon("TEN", &cart.snapshot()).await.unwrap_err();
        assert_eq!(err, CouponError::Unavailable("connection refused".into()));
        assert_eq!(coupons.state(), CouponState::NoCoupon);
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_call() {
        let (cart, validator, coupons) = setup(RevalidationPolicy::Revalidate);
        assert!(matches!(
            coupons.apply_coupon("   ", &cart.snapshot()).await,
            Err(CouponError::Invalid(_))
        ));

        cart.clear();
        assert!(matches!(
            coupons.apply_coupon("TEN", &cart.snapshot()).await,
            Err(CouponError::Invalid(_))
        ));
        assert!(validator.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_last_apply_wins() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        let snapshot = cart.snapshot();

        let (slow, fast) = tokio::join!(
            coupons.apply_coupon("SLOWHALF", &snapshot),
            coupons.apply_coupon("TEN", &snapshot),
        );

        assert_eq!(slow, Err(CouponError::Superseded));
        assert_eq!(fast.unwrap().code(), "TEN");
        assert_eq!(coupons.discount_amount(Currency::USD), usd(1000));
    }

    #[tokio::test]
    async fn test_remove_discards_in_flight_validation() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        let snapshot = cart.snapshot();

        let (applied, ()) = tokio::join!(coupons.apply_coupon("SLOWTEN", &snapshot), async {
            tokio::task::yield_now().await;
            coupons.remove_coupon();
        });

        assert_eq!(applied, Err(CouponError::Superseded));
        assert_eq!(coupons.state(), CouponState::NoCoupon);
    }

    #[tokio::test]
    async fn test_cart_change_marks_discount_stale() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        coupons.apply_coupon("HALF", &cart.snapshot()).await.unwrap();

        cart.add_item(ProductId::new("c"), "C", usd(1000), 1, Variant::default())
            .unwrap();
        coupons.on_cart_changed(&cart.snapshot());

        assert_eq!(coupons.state().name(), "stale");
        assert_eq!(coupons.discount_amount(Currency::USD), usd(0));
    }

    #[tokio::test]
    async fn test_stale_discount_is_revalidated_for_checkout() {
        let (cart, validator, coupons) = setup(RevalidationPolicy::Revalidate);
        coupons.apply_coupon("HALF", &cart.snapshot()).await.unwrap();

        cart.add_item(ProductId::new("c"), "C", usd(1000), 1, Variant::default())
            .unwrap();
        let snapshot = cart.snapshot();
        coupons.on_cart_changed(&snapshot);

        let active = coupons.discount_for_checkout(&snapshot).await.unwrap().unwrap();
        assert_eq!(active.discount, usd(3250));
        assert!(active.is_fresh_for(&snapshot));
        assert_eq!(validator.calls.lock().len(), 2);
        assert_eq!(validator.calls.lock()[1].cart_total, 65.0);
    }

    #[tokio::test]
    async fn test_fresh_discount_is_not_revalidated() {
        let (cart, validator, coupons) = setup(RevalidationPolicy::Revalidate);
        let snapshot = cart.snapshot();
        coupons.apply_coupon("TEN", &snapshot).await.unwrap();

        let active = coupons.discount_for_checkout(&snapshot).await.unwrap();
        assert_eq!(active.unwrap().discount, usd(1000));
        assert_eq!(validator.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_on_change_policy_drops_coupon() {
        let (cart, _, coupons) = setup(RevalidationPolicy::ClearOnChange);
        coupons.apply_coupon("TEN", &cart.snapshot()).await.unwrap();

        cart.update_quantity(&cart.snapshot().lines[0].id, 1).unwrap();
        coupons.on_cart_changed(&cart.snapshot());

        assert_eq!(coupons.state(), CouponState::NoCoupon);
    }

    #[tokio::test]
    async fn test_clear_on_change_refuses_unseen_change_at_checkout() {
        let (cart, _, coupons) = setup(RevalidationPolicy::ClearOnChange);
        coupons.apply_coupon("TEN", &cart.snapshot()).await.unwrap();
        cart.update_quantity(&cart.snapshot().lines[0].id, 1).unwrap();

        let result = coupons.discount_for_checkout(&cart.snapshot()).await;
        assert_eq!(result, Err(CouponError::Stale));
        assert_eq!(coupons.state(), CouponState::NoCoupon);
    }

    #[tokio::test]
    async fn test_emptied_cart_clears_coupon() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        coupons.apply_coupon("TEN", &cart.snapshot()).await.unwrap();

        cart.clear();
        coupons.on_cart_changed(&cart.snapshot());
        assert_eq!(coupons.state(), CouponState::NoCoupon);
    }

    #[tokio::test]
    async fn test_cart_change_during_validation_lands_stale() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        let snapshot = cart.snapshot();

        let (applied, ()) = tokio::join!(coupons.apply_coupon("SLOWTEN", &snapshot), async {
            tokio::task::yield_now().await;
            cart.add_item(ProductId::new("c"), "C", usd(1000), 1, Variant::default())
                .unwrap();
            coupons.on_cart_changed(&cart.snapshot());
        });

        assert!(applied.is_ok());
        assert_eq!(coupons.state().name(), "stale");
    }

    #[tokio::test]
    async fn test_pending_validation_blocks_checkout() {
        let (cart, _, coupons) = setup(RevalidationPolicy::Revalidate);
        let snapshot = cart.snapshot();

        let (_, pending) = tokio::join!(coupons.apply_coupon("SLOWTEN", &snapshot), async {
            tokio::task::yield_now().await;
            coupons.discount_for_checkout(&snapshot).await
        });

        assert_eq!(pending, Err(CouponError::Pending));
    }
}
