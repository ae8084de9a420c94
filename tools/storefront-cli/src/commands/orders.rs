//! Order history and status.

use anyhow::{bail, Context as _, Result};
use turbo_commerce::checkout::OrderRecord;
use turbo_storefront::OrderStatusView;

use super::{OrdersArgs, OrdersCommand};
use crate::context::{Context, Shop};
use crate::output::{amount, status_badge};

pub async fn run(args: OrdersArgs, ctx: &Context) -> Result<()> {
    let shop = ctx.shop()?;
    if !shop.store.session().is_authenticated() {
        bail!("Please log in to see your orders (`shop login <username>`)");
    }
    match args.command.unwrap_or(OrdersCommand::List { local: false }) {
        OrdersCommand::List { local } => list(&shop, local, ctx).await,
        OrdersCommand::Show { order } => show(&shop, &order, ctx).await,
    }
}

async fn list(shop: &Shop, local: bool, ctx: &Context) -> Result<()> {
    let records = match shop.store.session().bearer().filter(|_| !local) {
        Some(bearer) => {
            let spinner = ctx.output.spinner("Fetching orders...");
            let fetched = shop.api.list_orders(&bearer).await;
            spinner.finish_and_clear();
            match fetched {
                Ok(records) => records,
                Err(e) => {
                    ctx.output.warn(&format!("Could not reach the store ({e}); showing local orders"));
                    shop.store.recent_orders()?
                }
            }
        }
        None => shop.store.recent_orders()?,
    };

    let views: Vec<OrderStatusView> = records.iter().map(OrderStatusView::from).collect();
    if ctx.output.is_json() {
        ctx.output.json(&views);
        return Ok(());
    }
    if views.is_empty() {
        ctx.output.info("No orders yet");
        return Ok(());
    }

    ctx.output.header("Orders");
    for view in &views {
        let id = view.order_id.to_string();
        let status = status_badge(view.status);
        let items = view.item_count.to_string();
        let total = amount(view.total);
        let placed = view.placed_at.as_deref().unwrap_or("");
        ctx.output.table_row(
            &[id.as_str(), status.as_str(), items.as_str(), total.as_str(), placed],
            &[24, 12, 5, 10, 20],
        );
    }
    Ok(())
}

async fn show(shop: &Shop, order: &str, ctx: &Context) -> Result<()> {
    let local = || -> Result<Option<OrderRecord>> {
        Ok(shop
            .store
            .recent_orders()?
            .into_iter()
            .find(|record| record.order_id.as_str() == order))
    };

    let record = match shop.store.session().bearer() {
        Some(bearer) => {
            let spinner = ctx.output.spinner("Fetching order...");
            let fetched = shop.api.get_order(&bearer, order).await;
            spinner.finish_and_clear();
            match fetched {
                Ok(record) => Some(record),
                Err(e) => {
                    ctx.output.debug(&format!("Order lookup failed: {e}"));
                    local()?
                }
            }
        }
        None => local()?,
    };
    let record = record.with_context(|| format!("Order {order} not found"))?;

    let view = OrderStatusView::from(&record);
    if ctx.output.is_json() {
        ctx.output.json(&view);
        return Ok(());
    }
    ctx.output.header(&format!("Order {}", view.order_id));
    print_order(&view, ctx);
    if let Some(url) = &view.payment_url {
        ctx.output.info(&format!("Awaiting payment: {url}"));
    }
    Ok(())
}

/// Details of one order.
pub fn print_order(view: &OrderStatusView, ctx: &Context) {
    ctx.output.kv("status", &status_badge(view.status));
    if let Some(placed) = &view.placed_at {
        ctx.output.kv("placed", placed);
    }
    if let Some(code) = &view.coupon {
        ctx.output.kv("coupon", code);
    }
    ctx.output.kv("total", view.total.display().as_str());
    for line in &view.lines {
        ctx.output.list_item(line);
    }
}
