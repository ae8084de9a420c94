//! Login, logout and persistence through the storefront facade.

mod common;

use common::*;
use std::sync::Arc;
use turbo_auth::{BearerToken, Session};
use turbo_cache::Cache;
use turbo_commerce::cart::Variant;
use turbo_commerce::coupon::{CouponState, RevalidationPolicy};
use turbo_commerce::ids::ProductId;

fn login(session: &Session, username: &str) {
    session
        .login(username, BearerToken::new(format!("tok-{username}")).unwrap())
        .unwrap();
}

fn add_tee(h: &Harness, quantity: i64) {
    h.store
        .add_item(ProductId::new("tee"), "Tee", usd(2000), quantity, Variant::default())
        .unwrap();
}

#[test]
fn test_cart_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let session = Arc::new(Session::restore(Cache::open(dir.path()).unwrap()).unwrap());
        login(&session, "alice");
        let h = harness(session, FakeOrders::default(), RevalidationPolicy::Revalidate);
        add_tee(&h, 3);
    }

    let session = Arc::new(Session::restore(Cache::open(dir.path()).unwrap()).unwrap());
    assert_eq!(session.username().as_deref(), Some("alice"));
    let h = harness(session, FakeOrders::default(), RevalidationPolicy::Revalidate);

    let cart = h.store.cart();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.item_count, 3);
    assert_eq!(cart.subtotal, usd(6000));
}

#[test]
fn test_login_carries_guest_cart_over() {
    let session = Arc::new(Session::in_memory());
    let h = harness(session.clone(), FakeOrders::default(), RevalidationPolicy::Revalidate);
    add_tee(&h, 2);
    assert_eq!(session.load_cart_for(None).unwrap().len(), 1);

    login(&session, "alice");

    assert_eq!(h.store.cart().item_count, 2);
    assert!(session.load_cart_for(None).unwrap().is_empty());
    assert_eq!(session.load_cart_for(Some("alice")).unwrap().len(), 1);
}

#[test]
fn test_login_prefers_users_own_cart() {
    let session = Arc::new(Session::in_memory());
    let h = harness(session.clone(), FakeOrders::default(), RevalidationPolicy::Revalidate);

    login(&session, "alice");
    add_tee(&h, 1);
    session.logout().unwrap();

    add_tee(&h, 5);
    login(&session, "alice");

    assert_eq!(h.store.cart().item_count, 1);
}

#[tokio::test]
async fn test_logout_clears_cart_and_coupon() {
    let session = logged_in("alice");
    let h = harness(session.clone(), FakeOrders::default(), RevalidationPolicy::Revalidate);
    add_tee(&h, 2);
    h.store.apply_coupon("TEN").await.unwrap();

    session.logout().unwrap();

    assert!(h.store.cart().is_empty());
    assert_eq!(h.store.coupon_state(), CouponState::NoCoupon);
    let totals = h.store.totals();
    assert_eq!(totals.payable, usd(0));
    assert_eq!(totals.coupon, None);
    assert!(session.load_cart_for(None).unwrap().is_empty());

    login(&session, "alice");
    assert_eq!(h.store.cart().item_count, 2);
    assert_eq!(h.store.coupon_state(), CouponState::NoCoupon);
}

#[test]
fn test_user_named_guest_keeps_cart_across_logout() {
    let session = logged_in("guest");
    let h = harness(session.clone(), FakeOrders::default(), RevalidationPolicy::Revalidate);
    add_tee(&h, 2);

    session.logout().unwrap();
    assert!(h.store.cart().is_empty());
    assert_eq!(session.load_cart_for(Some("guest")).unwrap().len(), 1);

    login(&session, "guest");
    assert_eq!(h.store.cart().item_count, 2);
}

#[test]
fn test_switching_users_does_not_leak_carts() {
    let session = logged_in("alice");
    let h = harness(session.clone(), FakeOrders::default(), RevalidationPolicy::Revalidate);
    add_tee(&h, 4);

    login(&session, "bob");

    assert_eq!(session.username().as_deref(), Some("bob"));
    assert!(h.store.cart().is_empty());
    assert_eq!(session.load_cart_for(Some("alice")).unwrap().len(), 1);
    assert!(session.load_cart_for(Some("bob")).unwrap().is_empty());
}

#[tokio::test]
async fn test_recent_orders_belong_to_user() {
    let session = logged_in("alice");
    let h = harness(session.clone(), FakeOrders::default(), RevalidationPolicy::Revalidate);
    add_tee(&h, 1);
    h.store.checkout(&shipping()).await.unwrap();
    assert_eq!(h.store.recent_orders().unwrap().len(), 1);

    login(&session, "bob");
    assert!(h.store.recent_orders().unwrap().is_empty());
}
