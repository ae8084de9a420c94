//! Cart commands.

use anyhow::{bail, Context as _, Result};
use dialoguer::Confirm;
use serde_json::json;
use turbo_commerce::cart::{AddOutcome, CartSnapshot, Variant};
use turbo_commerce::ids::LineItemId;

use super::{CartArgs, CartCommand};
use crate::context::{Context, Shop};
use crate::output::amount;

pub async fn run(args: CartArgs, ctx: &Context) -> Result<()> {
    let shop = ctx.shop()?;
    match args.command.unwrap_or(CartCommand::Show) {
        CartCommand::Show => {}
        CartCommand::Add {
            product,
            quantity,
            color,
            size,
        } => add(&shop, &product, quantity, color, size, ctx).await?,
        CartCommand::Update { line, delta } => {
            let line_id = resolve_line(&shop.store.cart(), &line)?;
            let quantity = shop.store.update_quantity(&line_id, delta)?;
            ctx.output.success(&format!("Quantity is now {quantity}"));
        }
        CartCommand::Remove { line } => {
            let line_id = resolve_line(&shop.store.cart(), &line)?;
            if shop.store.remove_item(&line_id) {
                ctx.output.success("Removed from cart");
            }
        }
        CartCommand::Clear { yes } => {
            if !yes
                && !ctx.output.is_json()
                && !Confirm::new()
                    .with_prompt("Empty the cart?")
                    .default(false)
                    .interact()?
            {
                return Ok(());
            }
            shop.store.clear_cart();
            shop.forget_coupon()?;
            ctx.output.success("Cart emptied");
        }
    }
    show(&shop, ctx).await
}

async fn add(
    shop: &Shop,
    product_id: &str,
    quantity: i64,
    color: Option<String>,
    size: Option<String>,
    ctx: &Context,
) -> Result<()> {
    let product = shop
        .api
        .get_product(product_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .with_context(|| format!("Failed to load product {product_id}"))?;

    let variant = match (color, size) {
        (None, None) => None,
        (color, size) => {
            let chosen = Variant::new(color, size);
            let default = product.default_variant();
            Some(Variant::new(
                chosen.color.or(default.color),
                chosen.size.or(default.size),
            ))
        }
    };

    match shop.store.add_product(&product, variant, quantity)? {
        AddOutcome::Added(_) | AddOutcome::Merged(_) => {
            ctx.output.success(&format!("Added {quantity} × {}", product.name))
        }
        AddOutcome::Removed(_) => ctx.output.success(&format!("Removed {}", product.name)),
    }
    Ok(())
}

/// Print the cart with totals, applying a previously chosen coupon.
pub async fn show(shop: &Shop, ctx: &Context) -> Result<()> {
    if let Err(e) = shop.restore_coupon().await {
        ctx.output.warn(&format!("{e:#}"));
    }
    let cart = shop.store.cart();
    let totals = shop.store.totals();

    if ctx.output.is_json() {
        ctx.output.json(&json!({ "lines": cart.lines, "totals": totals }));
        return Ok(());
    }
    if cart.is_empty() {
        ctx.output.info("Your cart is empty");
        return Ok(());
    }

    ctx.output.header("Cart");
    for (n, line) in cart.lines.iter().enumerate() {
        let number = format!("{}.", n + 1);
        let variant = line.variant.label().unwrap_or_default();
        let quantity = format!("× {}", line.quantity);
        let total = amount(line.line_total());
        ctx.output.table_row(
            &[
                number.as_str(),
                line.product_name.as_str(),
                variant.as_str(),
                quantity.as_str(),
                total.as_str(),
            ],
            &[3, 28, 12, 6, 10],
        );
    }

    ctx.output.info("");
    ctx.output.kv("subtotal", &amount(totals.subtotal));
    if let Some(code) = &totals.coupon {
        let label = if totals.stale {
            format!("discount ({code}, re-checked at checkout)")
        } else {
            format!("discount ({code})")
        };
        ctx.output.kv(&label, &amount(totals.discount));
    }
    ctx.output.kv("total", &amount(totals.payable));
    Ok(())
}

/// A 1-based line number or a line ID.
fn resolve_line(cart: &CartSnapshot, line: &str) -> Result<LineItemId> {
    if let Ok(n) = line.parse::<usize>() {
        return match n.checked_sub(1).and_then(|i| cart.lines.get(i)) {
            Some(item) => Ok(item.id.clone()),
            None => bail!("No line {n}; the cart has {} line(s)", cart.lines.len()),
        };
    }
    let id = LineItemId::new(line);
    if cart.lines.iter().any(|item| item.id == id) {
        Ok(id)
    } else {
        bail!("No cart line with ID {line}")
    }
}
