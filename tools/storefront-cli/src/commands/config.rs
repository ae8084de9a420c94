//! Show or create the CLI configuration.

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::Context;

pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Init { api_url, force } => init(api_url, force, ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    if ctx.output.is_json() {
        ctx.output.json(config);
        return Ok(());
    }

    match &ctx.config_path {
        Some(path) => ctx.output.info(&format!("Loaded from {}", path.display())),
        None => ctx.output.info("No config file found; using defaults"),
    }

    ctx.output.header("api");
    ctx.output.kv("base_url", &config.api.base_url);
    ctx.output.kv("timeout", &format!("{}s", config.api.timeout_secs));
    ctx.output.kv("connect_timeout", &format!("{}s", config.api.connect_timeout_secs));
    ctx.output.kv(
        "retries",
        &format!("{} ({}ms backoff)", config.api.retries, config.api.retry_backoff_ms),
    );

    ctx.output.header("store");
    ctx.output.kv("data_dir", &ctx.data_dir().display().to_string());

    ctx.output.header("log");
    ctx.output.kv("level", config.log.level.as_str());
    ctx.output.kv("format", &format!("{:?}", config.log.format).to_lowercase());

    ctx.output.header("checkout");
    ctx.output.kv("currency", config.checkout.currency.code());
    ctx.output.kv("revalidation", &format!("{:?}", config.checkout.revalidation));
    Ok(())
}

fn init(api_url: Option<String>, force: bool, ctx: &Context) -> Result<()> {
    let path = ctx.cwd.join("shop.toml");
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let base_url = api_url.unwrap_or_else(|| ctx.config.api.base_url.clone());
    std::fs::write(&path, generate_default_config(&base_url))?;
    ctx.output.success(&format!("Wrote {}", path.display()));
    Ok(())
}
