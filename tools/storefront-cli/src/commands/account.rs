//! Login, logout and whoami.

use anyhow::{bail, Context as _, Result};
use chrono::{Duration, Utc};
use dialoguer::Password;
use serde_json::json;
use turbo_auth::BearerToken;

use super::LoginArgs;
use crate::context::Context;

/// Log in and adopt the user's cart.
pub async fn login(args: LoginArgs, ctx: &Context) -> Result<()> {
    let username = args.username.trim();
    if username.is_empty() {
        bail!("Username is required");
    }
    let password = match args.password {
        Some(password) => password,
        None => Password::new()
            .with_prompt(format!("Password for {username}"))
            .interact()?,
    };

    let shop = ctx.shop()?;
    let spinner = ctx.output.spinner("Logging in...");
    let grant = shop.api.login(username, &password).await;
    spinner.finish_and_clear();
    let grant = grant
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Login failed")?;

    let mut token = BearerToken::new(grant.token).context("Server returned an unusable token")?;
    if let Some(seconds) = grant.expires_in.filter(|s| *s > 0) {
        token = token.with_expiry(Utc::now() + Duration::seconds(seconds));
    }
    shop.store.session().login(username, token)?;

    let cart = shop.store.cart();
    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "username": username,
            "cart_items": cart.item_count,
        }));
        return Ok(());
    }
    ctx.output.success(&format!("Logged in as {username}"));
    if !cart.is_empty() {
        ctx.output.info(&format!(
            "Your cart has {} item(s), {}",
            cart.item_count, cart.subtotal
        ));
    }
    Ok(())
}

/// Log out. The cart and coupon are cleared.
pub async fn logout(ctx: &Context) -> Result<()> {
    let shop = ctx.shop()?;
    shop.forget_coupon()?;
    match shop.store.session().logout()? {
        Some(username) => ctx.output.success(&format!("Logged out {username}")),
        None => ctx.output.info("Not logged in"),
    }
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    let shop = ctx.shop()?;
    let session = shop.store.session();

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "username": session.username(),
            "authenticated": session.bearer().is_some(),
        }));
        return Ok(());
    }

    match session.username() {
        Some(username) if session.bearer().is_some() => {
            ctx.output.info(&format!("Logged in as {username}"))
        }
        Some(username) => ctx.output.warn(&format!(
            "Session for {username} has expired; run `shop login`"
        )),
        None => ctx.output.info("Not logged in"),
    }
    Ok(())
}
