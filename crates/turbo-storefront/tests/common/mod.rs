//! Shared fakes for the storefront integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use turbo_auth::{BearerToken, Session};
use turbo_commerce::cart::Variant;
use turbo_commerce::checkout::{OrderReceipt, OrderSubmission, ShippingForm};
use turbo_commerce::coupon::{Coupon, CouponKind, RevalidationPolicy};
use turbo_commerce::gateway::{
    CouponValidationRequest, CouponValidationResponse, CouponValidator, GatewayError,
    OrderGateway,
};
use turbo_commerce::ids::{OrderId, ProductId};
use turbo_commerce::money::{Currency, Money};
use turbo_storefront::{Storefront, StorefrontOptions};

/// Knows `TEN` (10 off), `HALF` (50%) and `DOUBLE` (200%).
#[derive(Default)]
pub struct FakeCoupons {
    pub calls: AtomicUsize,
}

impl FakeCoupons {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CouponValidator for FakeCoupons {
    async fn validate(
        &self,
        request: &CouponValidationRequest,
    ) -> Result<CouponValidationResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let coupon = match request.code.as_str() {
            "TEN" => Coupon::new("TEN", CouponKind::FixedAmount, 10.0),
            "HALF" => Coupon::new("HALF", CouponKind::Percentage, 50.0),
            "DOUBLE" => Coupon::new("DOUBLE", CouponKind::Percentage, 200.0),
            _ => return Ok(CouponValidationResponse::rejected("Invalid coupon code")),
        };
        Ok(CouponValidationResponse::accepted(coupon, None))
    }
}

/// Records submissions and answers from a queue, then with `ord_<n>`.
#[derive(Default)]
pub struct FakeOrders {
    pub submissions: Mutex<Vec<OrderSubmission>>,
    pub bearers: Mutex<Vec<String>>,
    pub replies: Mutex<VecDeque<Result<OrderReceipt, GatewayError>>>,
}

impl FakeOrders {
    pub fn failing_once(error: GatewayError) -> Self {
        let orders = Self::default();
        orders.replies.lock().push_back(Err(error));
        orders
    }

    pub fn sent(&self) -> usize {
        self.submissions.lock().len()
    }
}

#[async_trait]
impl OrderGateway for FakeOrders {
    async fn create_order(
        &self,
        submission: &OrderSubmission,
        bearer: &str,
    ) -> Result<OrderReceipt, GatewayError> {
        let n = {
            let mut submissions = self.submissions.lock();
            submissions.push(submission.clone());
            submissions.len()
        };
        self.bearers.lock().push(bearer.to_string());
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        let reply = self.replies.lock().pop_front();
        reply.unwrap_or_else(|| {
            let mut receipt = OrderReceipt::new(OrderId::new(format!("ord_{n}")));
            receipt.total = Some(submission.total);
            Ok(receipt)
        })
    }
}

pub struct Harness {
    pub store: Storefront,
    pub coupons: Arc<FakeCoupons>,
    pub orders: Arc<FakeOrders>,
}

pub fn harness(session: Arc<Session>, orders: FakeOrders, policy: RevalidationPolicy) -> Harness {
    let coupons = Arc::new(FakeCoupons::default());
    let orders = Arc::new(orders);
    let store = Storefront::new(
        session,
        coupons.clone(),
        orders.clone(),
        StorefrontOptions {
            currency: Currency::USD,
            policy,
        },
    )
    .unwrap();
    Harness {
        store,
        coupons,
        orders,
    }
}

pub fn logged_in(username: &str) -> Arc<Session> {
    let session = Arc::new(Session::in_memory());
    session
        .login(username, BearerToken::new(format!("tok-{username}")).unwrap())
        .unwrap();
    session
}

pub fn usd(cents: i64) -> Money {
    Money::new(cents, Currency::USD)
}

/// Cart of `[20.00 × 2, 15.00 × 1]`, subtotal 55.00.
pub fn fill_cart(store: &Storefront) {
    store
        .add_item(ProductId::new("tee"), "Tee", usd(2000), 2, Variant::default())
        .unwrap();
    store
        .add_item(ProductId::new("cap"), "Cap", usd(1500), 1, Variant::default())
        .unwrap();
}

pub fn shipping() -> ShippingForm {
    ShippingForm {
        email: "alice@example.com".into(),
        first_name: "Alice".into(),
        last_name: "Liddell".into(),
        address: "1 Rabbit Hole".into(),
        city: "Oxford".into(),
        state: "Oxon".into(),
        postal_code: "OX1".into(),
        country: "UK".into(),
        phone: "+44 1865 000000".into(),
    }
}
