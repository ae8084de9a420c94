//! Checkout reconciliation.
//!
//! Merges the cart snapshot, the applied discount and the shipping form
//! into one [`OrderSubmission`] and places it through an [`OrderGateway`].
//! One reconciler guards all submit paths of a storefront: while a
//! submission is in flight, further calls return
//! [`SubmitOutcome::AlreadySubmitting`] without building anything.

use crate::cart::{CartSnapshot, CartStore};
use crate::checkout::{FieldError, OrderReceipt, OrderSubmission, ShippingForm};
use crate::coupon::{CouponError, CouponEvaluator};
use crate::error::CommerceError;
use crate::gateway::OrderGateway;
use crate::ids::OrderId;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Checkout progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    Submitting,
    Success {
        order_id: OrderId,
    },
    Failed {
        message: String,
    },
}

impl CheckoutState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, CheckoutState::Submitting)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::Submitting => "submitting",
            CheckoutState::Success { .. } => "success",
            CheckoutState::Failed { .. } => "failed",
        }
    }
}

/// Result of a [`CheckoutReconciler::submit`] call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The order was created; cart and coupon have been cleared.
    Placed {
        receipt: OrderReceipt,
        /// What was sent, as priced at submission.
        submission: OrderSubmission,
    },
    /// Another submission is in flight; nothing was sent.
    AlreadySubmitting,
}

/// Errors surfaced by checkout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Please log in to place an order")]
    NotAuthenticated,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please correct the shipping details: {}", join_fields(.0))]
    InvalidForm(Vec<FieldError>),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Cart(#[from] CommerceError),

    /// The order endpoint's message, verbatim.
    #[error("{0}")]
    SubmissionFailed(String),
}

impl CheckoutError {
    /// Whether the attempt was refused locally, before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CheckoutError::NotAuthenticated | CheckoutError::EmptyCart | CheckoutError::InvalidForm(_)
        )
    }

    /// Field-level messages, for form errors.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            CheckoutError::InvalidForm(errors) => errors,
            _ => &[],
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Drives one storefront's checkout.
pub struct CheckoutReconciler {
    gateway: Arc<dyn OrderGateway>,
    state: Mutex<CheckoutState>,
}

impl CheckoutReconciler {
    pub fn new(gateway: Arc<dyn OrderGateway>) -> Self {
        Self {
            gateway,
            state: Mutex::new(CheckoutState::Idle),
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state.lock().clone()
    }

    /// Return to `Idle` after a failure or a placed order.
    ///
    /// Has no effect while submitting; returns whether the state changed.
    pub fn reset(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            CheckoutState::Failed { .. } | CheckoutState::Success { .. } => {
                *state = CheckoutState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Check the preconditions that need no network call.
    pub fn check(
        cart: &CartStore,
        bearer: Option<&str>,
        form: &ShippingForm,
    ) -> Result<(), CheckoutError> {
        if bearer.map_or(true, |token| token.trim().is_empty()) {
            return Err(CheckoutError::NotAuthenticated);
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(CheckoutError::InvalidForm(errors));
        }
        Ok(())
    }

    /// Place an order for the current cart.
    ///
    /// On success the ordered lines leave the cart, the coupon is cleared
    /// and the state becomes `Success`. Lines added while the order was in
    /// flight stay in the cart. On failure the state becomes `Failed` with the error
    /// message and the cart is left as it was.
    pub async fn submit(
        &self,
        cart: &CartStore,
        coupons: &CouponEvaluator,
        bearer: Option<&str>,
        form: &ShippingForm,
    ) -> Result<SubmitOutcome, CheckoutError> {
        {
            let mut state = self.state.lock();
            if state.is_submitting() {
                tracing::debug!("checkout already submitting; ignoring");
                return Ok(SubmitOutcome::AlreadySubmitting);
            }
            Self::check(cart, bearer, form)?;
            *state = CheckoutState::Submitting;
        }

        let bearer = bearer.unwrap_or_default();
        match self.place(cart, coupons, bearer, form).await {
            Ok((receipt, submission, ordered)) => {
                cart.settle(&ordered);
                coupons.clear();
                tracing::info!(
                    order_id = %receipt.order_id,
                    status = receipt.status.as_str(),
                    "order placed"
                );
                *self.state.lock() = CheckoutState::Success {
                    order_id: receipt.order_id.clone(),
                };
                Ok(SubmitOutcome::Placed {
                    receipt,
                    submission,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "checkout failed");
                *self.state.lock() = CheckoutState::Failed {
                    message: e.to_string(),
                };
                Err(e)
            }
        }
    }

    async fn place(
        &self,
        cart: &CartStore,
        coupons: &CouponEvaluator,
        bearer: &str,
        form: &ShippingForm,
    ) -> Result<(OrderReceipt, OrderSubmission, CartSnapshot), CheckoutError> {
        let discount = coupons.discount_for_checkout(&cart.snapshot()).await?;

        let snapshot = cart.snapshot();
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if let Some(active) = &discount {
            if !active.is_fresh_for(&snapshot) {
                return Err(CouponError::Stale.into());
            }
        }

        let submission = OrderSubmission::build(&snapshot, discount.as_ref(), form)?;
        tracing::debug!(
            lines = submission.line_items.len(),
            total = %submission.total,
            coupon = submission.coupon.as_deref().unwrap_or("-"),
            "submitting order"
        );

        let receipt = self
            .gateway
            .create_order(&submission, bearer)
            .await
            .map_err(|e| CheckoutError::SubmissionFailed(e.message().to_string()))?;
        Ok((receipt, submission, snapshot))
    }
}

impl std::fmt::Debug for CheckoutReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutReconciler")
            .field("state", &*self.state.lock())
            .finish()
    }
}
