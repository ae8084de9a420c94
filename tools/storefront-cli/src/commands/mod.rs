//! CLI command implementations.

pub mod account;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod coupon;
pub mod orders;
pub mod products;

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Arguments for the login command.
#[derive(Args)]
pub struct LoginArgs {
    pub username: String,

    /// Password; prompted for when omitted.
    #[arg(long, env = "SHOP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for the products command.
#[derive(Args)]
pub struct ProductsArgs {
    #[command(subcommand)]
    pub command: ProductsCommand,
}

#[derive(Subcommand)]
pub enum ProductsCommand {
    /// Show one product.
    Show {
        /// Product ID.
        id: String,
    },
    /// Search the catalog.
    Search {
        query: String,

        /// Maximum results.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

/// Arguments for the cart command.
#[derive(Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub command: Option<CartCommand>,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Show the cart and its totals.
    Show,
    /// Add a product.
    Add {
        /// Product ID.
        product: String,

        #[arg(short, long, default_value = "1")]
        quantity: i64,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        size: Option<String>,
    },
    /// Change a line's quantity by a delta, e.g. `+2` or `-1`.
    Update {
        /// Line number as shown by `shop cart`, or line ID.
        line: String,

        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Remove a line.
    Remove {
        /// Line number as shown by `shop cart`, or line ID.
        line: String,
    },
    /// Empty the cart.
    Clear {
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the coupon command.
#[derive(Args)]
pub struct CouponArgs {
    #[command(subcommand)]
    pub command: CouponCommand,
}

#[derive(Subcommand)]
pub enum CouponCommand {
    /// Validate a code against the cart and apply it.
    Apply { code: String },
    /// Remove the applied coupon.
    Remove,
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Shipping address file (TOML or JSON); missing fields are prompted for.
    #[arg(short, long)]
    pub address: Option<PathBuf>,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the orders command.
#[derive(Args)]
pub struct OrdersArgs {
    #[command(subcommand)]
    pub command: Option<OrdersCommand>,
}

#[derive(Subcommand)]
pub enum OrdersCommand {
    /// List orders, newest first.
    List {
        /// Only orders placed from this machine; no network.
        #[arg(long)]
        local: bool,
    },
    /// Show one order.
    Show {
        /// Order ID.
        order: String,
    },
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// API base URL to write.
        #[arg(long)]
        api_url: Option<String>,

        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}
