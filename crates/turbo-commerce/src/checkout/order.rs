//! Order types.

use crate::cart::{CartSnapshot, LineItem, Variant};
use crate::checkout::ShippingForm;
use crate::coupon::ActiveDiscount;
use crate::error::CommerceError;
use crate::ids::{OrderId, ProductId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, awaiting payment or processing.
    #[default]
    Pending,
    /// Order confirmed and processing.
    Confirmed,
    /// Order being prepared.
    Processing,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
    /// Order refunded.
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
        }
    }

    /// Parse a status string, case-insensitively.
    pub fn parse(status: &str) -> Option<Self> {
        match status.trim().to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Whether the order still waits for the payment redirect to complete.
    pub fn awaits_payment(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }
}

/// A line item priced at submission time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub variant: Variant,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

impl From<&LineItem> for OrderLine {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            variant: item.variant.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total(),
        }
    }
}

/// Everything sent to the order endpoint for one checkout attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSubmission {
    pub shipping_address: ShippingForm,
    pub line_items: Vec<OrderLine>,
    /// Applied coupon code.
    pub coupon: Option<String>,
    pub discount: Money,
    pub subtotal: Money,
    /// `subtotal - discount`, never negative.
    pub total: Money,
    /// Cart revision the submission was built from.
    pub cart_revision: u64,
}

impl OrderSubmission {
    /// Build a submission from a cart snapshot and the discount computed
    /// against that same snapshot.
    pub fn build(
        snapshot: &CartSnapshot,
        discount: Option<&ActiveDiscount>,
        shipping_address: &ShippingForm,
    ) -> Result<Self, CommerceError> {
        let subtotal = snapshot.subtotal;
        let discount_amount = discount
            .map(|active| active.discount.clamp_to(&subtotal))
            .unwrap_or_else(|| Money::zero(subtotal.currency));
        let total = subtotal
            .try_subtract(&discount_amount)
            .ok_or(CommerceError::Overflow)?
            .clamp_to(&subtotal);

        Ok(Self {
            shipping_address: shipping_address.clone(),
            line_items: snapshot.lines.iter().map(OrderLine::from).collect(),
            coupon: discount.map(|active| active.coupon.code.clone()),
            discount: discount_amount,
            subtotal,
            total,
            cart_revision: snapshot.revision,
        })
    }

    pub fn item_count(&self) -> i64 {
        self.line_items.iter().map(|line| line.quantity).sum()
    }
}

/// What the order endpoint returns for a created order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Money>,
    /// External payment page the user is sent to next.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

impl OrderReceipt {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            status: OrderStatus::Pending,
            total: None,
            payment_url: None,
        }
    }
}

/// An order as shown in order history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub line_items: Vec<OrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

impl OrderRecord {
    /// Record a freshly placed order.
    pub fn placed(receipt: &OrderReceipt, submission: &OrderSubmission) -> Self {
        Self {
            order_id: receipt.order_id.clone(),
            status: receipt.status,
            total: receipt.total.unwrap_or(submission.total),
            coupon: submission.coupon.clone(),
            created_at: None,
            line_items: submission.line_items.clone(),
            payment_url: receipt.payment_url.clone(),
        }
    }

    pub fn item_count(&self) -> i64 {
        self.line_items.iter().map(|line| line.quantity).sum()
    }
}
