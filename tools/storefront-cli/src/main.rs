//! shop - command line storefront for TurboCommerce shops.
//!
//! Commands:
//! - `shop login` / `shop logout` / `shop whoami` - Account session
//! - `shop products` - Look up products
//! - `shop cart` - Show and edit the cart
//! - `shop coupon` - Apply or remove a coupon
//! - `shop checkout` - Place an order for the cart
//! - `shop orders` - Order history and status
//! - `shop config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    CartArgs, CheckoutArgs, ConfigArgs, CouponArgs, LoginArgs, OrdersArgs, ProductsArgs,
};

/// Shop from the command line
#[derive(Parser)]
#[command(name = "shop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// More log output; repeat for more
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the shop
    Login(LoginArgs),

    /// Log out and clear the local cart
    Logout,

    /// Show who is logged in
    Whoami,

    /// Look up products
    Products(ProductsArgs),

    /// Show and edit the cart
    Cart(CartArgs),

    /// Apply or remove a coupon
    Coupon(CouponArgs),

    /// Place an order for the cart
    Checkout(CheckoutArgs),

    /// Order history and status
    Orders(OrdersArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose > 0, cli.json);
    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    let mut log = ctx.config.log.clone();
    log.level = log.level.raised_by(cli.verbose);
    if let Err(e) = turbo_observability::init(&log) {
        ctx.output.warn(&format!("Logging disabled: {e}"));
    }

    let result = match cli.command {
        Commands::Login(args) => commands::account::login(args, &ctx).await,
        Commands::Logout => commands::account::logout(&ctx).await,
        Commands::Whoami => commands::account::whoami(&ctx).await,
        Commands::Products(args) => commands::products::run(args, &ctx).await,
        Commands::Cart(args) => commands::cart::run(args, &ctx).await,
        Commands::Coupon(args) => commands::coupon::run(args, &ctx).await,
        Commands::Checkout(args) => commands::checkout::run(args, &ctx).await,
        Commands::Orders(args) => commands::orders::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
