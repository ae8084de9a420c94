//! Read-only order views for display after checkout and in order history.

use serde::Serialize;
use turbo_commerce::checkout::{OrderRecord, OrderStatus};
use turbo_commerce::ids::OrderId;
use turbo_commerce::money::Money;

/// How one order should be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusView {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub awaiting_payment: bool,
    /// Where to send the shopper to pay, while payment is outstanding.
    pub payment_url: Option<String>,
    pub item_count: i64,
    pub total: Money,
    pub coupon: Option<String>,
    pub placed_at: Option<String>,
    pub lines: Vec<String>,
}

impl From<&OrderRecord> for OrderStatusView {
    fn from(record: &OrderRecord) -> Self {
        let awaiting_payment = record.status.awaits_payment();
        Self {
            order_id: record.order_id.clone(),
            status: record.status,
            status_label: record.status.display_name(),
            awaiting_payment,
            payment_url: record.payment_url.clone().filter(|_| awaiting_payment),
            item_count: record.item_count(),
            total: record.total,
            coupon: record.coupon.clone(),
            placed_at: record.created_at.clone(),
            lines: record
                .line_items
                .iter()
                .map(|line| match line.variant.label() {
                    Some(variant) => format!(
                        "{} × {} ({variant}) {}",
                        line.quantity, line.product_name, line.line_total
                    ),
                    None => format!("{} × {} {}", line.quantity, line.product_name, line.line_total),
                })
                .collect(),
        }
    }
}

impl OrderStatusView {
    /// One-line summary, e.g. `ord_1  Shipped  3 items  $45.00`.
    pub fn summary(&self) -> String {
        let items = if self.item_count == 1 { "item" } else { "items" };
        format!(
            "{}  {}  {} {items}  {}",
            self.order_id, self.status_label, self.item_count, self.total
        )
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }
}
