//! Product lookup.

use anyhow::{Context as _, Result};
use turbo_commerce::catalog::Product;
use turbo_commerce::money::Currency;
use turbo_commerce::pricing::format_currency;

use super::{ProductsArgs, ProductsCommand};
use crate::context::Context;

pub async fn run(args: ProductsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ProductsCommand::Show { id } => show(&id, ctx).await,
        ProductsCommand::Search { query, limit } => search(&query, limit, ctx).await,
    }
}

async fn show(id: &str, ctx: &Context) -> Result<()> {
    let api = ctx.api()?;
    let product = api
        .get_product(id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .with_context(|| format!("Failed to load product {id}"))?;

    if ctx.output.is_json() {
        ctx.output.json(&product);
        return Ok(());
    }

    let currency = ctx.config.checkout.currency;
    ctx.output.header(&product.name);
    ctx.output.kv("id", product.id.as_str());
    ctx.output.kv("price", &price_label(&product, currency));
    if let Some(description) = &product.description {
        ctx.output.kv("description", description);
    }
    if !product.colors.is_empty() {
        ctx.output.kv("colors", &product.colors.join(", "));
    }
    if !product.sizes.is_empty() {
        ctx.output.kv("sizes", &product.sizes.join(", "));
    }
    Ok(())
}

async fn search(query: &str, limit: usize, ctx: &Context) -> Result<()> {
    let api = ctx.api()?;
    let spinner = ctx.output.spinner("Searching...");
    let products = api.search_products(query, limit).await;
    spinner.finish_and_clear();
    let products = products
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Search failed")?;

    if ctx.output.is_json() {
        ctx.output.json(&products);
        return Ok(());
    }
    if products.is_empty() {
        ctx.output.info(&format!("No products match \"{query}\""));
        return Ok(());
    }

    let currency = ctx.config.checkout.currency;
    ctx.output.header(&format!("{} result(s)", products.len()));
    for product in &products {
        let price = price_label(product, currency);
        ctx.output.table_row(
            &[product.id.as_str(), product.name.as_str(), price.as_str()],
            &[24, 32, 20],
        );
    }
    Ok(())
}

/// Current price, with the original and savings when marked down.
fn price_label(product: &Product, currency: Currency) -> String {
    let current = format_currency(product.unit_price(currency));
    match &product.price {
        Some(price) if price.is_discounted() => match price.savings(currency) {
            Some(savings) => format!("{current} (save {})", format_currency(savings)),
            None => current,
        },
        _ => current,
    }
}
