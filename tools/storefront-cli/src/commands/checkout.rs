//! Place an order for the cart.

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use dialoguer::{Confirm, Input};
use turbo_commerce::checkout::{CheckoutError, OrderRecord, ShippingForm, SubmitOutcome};
use turbo_storefront::OrderStatusView;

use super::orders::print_order;
use super::CheckoutArgs;
use crate::context::Context;
use crate::output::amount;

pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let shop = ctx.shop()?;
    if shop.store.session().bearer().is_none() {
        bail!("Please log in to place an order (`shop login <username>`)");
    }
    if shop.store.cart().is_empty() {
        bail!("Your cart is empty");
    }
    if let Err(e) = shop.restore_coupon().await {
        ctx.output.warn(&format!("{e:#}"));
    }

    let mut form = match &args.address {
        Some(path) => load_address(&ctx.resolve_path(path))?,
        None => ShippingForm::default(),
    };
    if !ctx.output.is_json() {
        prompt_missing(&mut form)?;
    }

    let totals = shop.store.totals();
    ctx.output.header("Order summary");
    ctx.output.kv("items", &totals.item_count.to_string());
    ctx.output.kv("subtotal", &amount(totals.subtotal));
    if let Some(code) = &totals.coupon {
        ctx.output.kv(&format!("discount ({code})"), &amount(totals.discount));
    }
    ctx.output.kv("total", &amount(totals.payable));
    ctx.output.kv("ship to", &form.one_line());

    if !args.yes && !ctx.output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt("Place this order?")
            .default(true)
            .interact()?;
        if !confirmed {
            ctx.output.warn("Checkout cancelled");
            return Ok(());
        }
    }

    let spinner = ctx.output.spinner("Placing order...");
    let outcome = shop.store.checkout(&form).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(SubmitOutcome::Placed {
            receipt,
            submission,
        }) => {
            shop.forget_coupon()?;
            let view = OrderStatusView::from(&OrderRecord::placed(&receipt, &submission));
            if ctx.output.is_json() {
                ctx.output.json(&view);
                return Ok(());
            }
            ctx.output.success(&format!("Order {} placed", receipt.order_id));
            print_order(&view, ctx);
            if let Some(url) = &view.payment_url {
                ctx.output.info(&format!("Complete payment at {url}"));
            }
            Ok(())
        }
        Ok(SubmitOutcome::AlreadySubmitting) => {
            ctx.output.warn("An order is already being placed");
            Ok(())
        }
        Err(CheckoutError::InvalidForm(errors)) => {
            for error in &errors {
                ctx.output.error(&error.to_string());
            }
            bail!("Please correct the shipping details");
        }
        Err(e @ CheckoutError::Coupon(_)) => {
            shop.forget_coupon()?;
            Err(anyhow::Error::new(e)
                .context("Your coupon no longer applies; review the total and check out again"))
        }
        Err(e) => Err(anyhow::Error::new(e).context("Checkout failed")),
    }
}

fn load_address(path: &Path) -> Result<ShippingForm> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read address file: {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse address file: {}", path.display()))
    } else {
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse address file: {}", path.display()))
    }
}

fn prompt_missing(form: &mut ShippingForm) -> Result<()> {
    let fields = [
        ("Email", &mut form.email),
        ("First name", &mut form.first_name),
        ("Last name", &mut form.last_name),
        ("Address", &mut form.address),
        ("City", &mut form.city),
        ("State / province", &mut form.state),
        ("Postal code", &mut form.postal_code),
        ("Country", &mut form.country),
        ("Phone", &mut form.phone),
    ];
    for (label, value) in fields {
        if value.trim().is_empty() {
            *value = Input::<String>::new().with_prompt(label).interact_text()?;
        }
    }
    Ok(())
}
