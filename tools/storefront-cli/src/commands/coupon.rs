//! Coupon commands.

use anyhow::{Context as _, Result};
use serde_json::json;

use super::{CouponArgs, CouponCommand};
use crate::context::Context;

pub async fn run(args: CouponArgs, ctx: &Context) -> Result<()> {
    let shop = ctx.shop()?;
    match args.command {
        CouponCommand::Apply { code } => {
            let spinner = ctx.output.spinner("Checking coupon...");
            let applied = shop.store.apply_coupon(&code).await;
            spinner.finish_and_clear();
            let active =
                applied.with_context(|| format!("Coupon {} was not applied", code.trim()))?;
            shop.save_coupon(active.code())?;

            let totals = shop.store.totals();
            if ctx.output.is_json() {
                ctx.output.json(&json!({
                    "coupon": active.coupon,
                    "totals": totals,
                }));
                return Ok(());
            }
            ctx.output.success(&format!(
                "{} applied: {} off",
                active.code(),
                active.discount
            ));
            ctx.output.kv("total", &totals.payable.to_string());
        }
        CouponCommand::Remove => {
            shop.store.remove_coupon();
            shop.forget_coupon()?;
            ctx.output.success("Coupon removed");
        }
    }
    Ok(())
}
