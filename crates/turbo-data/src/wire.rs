//! JSON shapes of the storefront API.
//!
//! The domain types carry integer minor units; the API speaks decimal
//! amounts and camelCase keys. Conversion happens here and nowhere else.

use crate::ApiError;
use serde::{Deserialize, Serialize};
use turbo_commerce::cart::Variant;
use turbo_commerce::catalog::Product;
use turbo_commerce::checkout::{
    OrderLine, OrderReceipt, OrderRecord, OrderStatus, OrderSubmission, ShippingForm,
};
use turbo_commerce::ids::{OrderId, ProductId};
use turbo_commerce::money::{Currency, Money};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrderBody<'a> {
    shipping_address: &'a ShippingForm,
    line_items: Vec<OrderLineBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    coupon: Option<&'a str>,
    discount: f64,
    subtotal: f64,
    total: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderLineBody<'a> {
    product_id: &'a ProductId,
    name: &'a str,
    quantity: i64,
    price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
}

impl<'a> From<&'a OrderSubmission> for CreateOrderBody<'a> {
    fn from(submission: &'a OrderSubmission) -> Self {
        Self {
            shipping_address: &submission.shipping_address,
            line_items: submission
                .line_items
                .iter()
                .map(|line| OrderLineBody {
                    product_id: &line.product_id,
                    name: &line.product_name,
                    quantity: line.quantity,
                    price: line.unit_price.to_decimal(),
                    color: line.variant.color.as_deref(),
                    size: line.variant.size.as_deref(),
                })
                .collect(),
            coupon: submission.coupon.as_deref(),
            discount: submission.discount.to_decimal(),
            subtotal: submission.subtotal.to_decimal(),
            total: submission.total.to_decimal(),
        }
    }
}

/// An order as the API returns it, from creation or from history.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderBody {
    #[serde(alias = "_id", alias = "id")]
    order_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "totalAmount")]
    total: Option<f64>,
    #[serde(default, alias = "checkoutUrl")]
    payment_url: Option<String>,
    #[serde(default)]
    coupon: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default, alias = "lineItems")]
    items: Vec<OrderItemBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderItemBody {
    #[serde(alias = "id", alias = "product")]
    product_id: String,
    #[serde(default)]
    name: String,
    quantity: i64,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

/// Wrapper some endpoints put around a single order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrderEnvelope {
    Wrapped { order: OrderBody },
    Bare(OrderBody),
}

impl OrderEnvelope {
    pub(crate) fn into_inner(self) -> OrderBody {
        match self {
            OrderEnvelope::Wrapped { order } | OrderEnvelope::Bare(order) => order,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrderList {
    Wrapped { orders: Vec<OrderBody> },
    Bare(Vec<OrderBody>),
}

impl OrderList {
    pub(crate) fn into_inner(self) -> Vec<OrderBody> {
        match self {
            OrderList::Wrapped { orders } | OrderList::Bare(orders) => orders,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductList {
    Wrapped { products: Vec<Product> },
    Bare(Vec<Product>),
}

impl ProductList {
    pub(crate) fn into_inner(self) -> Vec<Product> {
        match self {
            ProductList::Wrapped { products } | ProductList::Bare(products) => products,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductEnvelope {
    Wrapped { product: Product },
    Bare(Product),
}

impl ProductEnvelope {
    pub(crate) fn into_inner(self) -> Product {
        match self {
            ProductEnvelope::Wrapped { product } | ProductEnvelope::Bare(product) => product,
        }
    }
}

fn parse_status(status: Option<&str>) -> OrderStatus {
    status.and_then(OrderStatus::parse).unwrap_or_default()
}

impl OrderBody {
    pub(crate) fn into_receipt(self, currency: Currency) -> Result<OrderReceipt, ApiError> {
        if self.order_id.trim().is_empty() {
            return Err(ApiError::Decode("order response without an id".into()));
        }
        Ok(OrderReceipt {
            order_id: OrderId::new(self.order_id),
            status: parse_status(self.status.as_deref()),
            total: self.total.map(|t| Money::from_decimal(t, currency)),
            payment_url: self.payment_url,
        })
    }

    pub(crate) fn into_record(self, currency: Currency) -> OrderRecord {
        let line_items: Vec<OrderLine> = self
            .items
            .into_iter()
            .map(|item| {
                let unit_price = Money::from_decimal(item.price, currency);
                OrderLine {
                    product_id: ProductId::new(item.product_id),
                    product_name: item.name,
                    variant: Variant::new(item.color, item.size),
                    quantity: item.quantity,
                    unit_price,
                    line_total: Money::new(
                        unit_price.amount_cents.saturating_mul(item.quantity),
                        currency,
                    ),
                }
            })
            .collect();
        let total = match self.total {
            Some(total) => Money::from_decimal(total, currency),
            None => Money::new(
                line_items
                    .iter()
                    .fold(0_i64, |acc, l| acc.saturating_add(l.line_total.amount_cents)),
                currency,
            ),
        };

        OrderRecord {
            order_id: OrderId::new(self.order_id),
            status: parse_status(self.status.as_deref()),
            total,
            coupon: self.coupon,
            created_at: self.created_at,
            line_items,
            payment_url: self.payment_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginBody<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
}

/// A successful login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginGrant {
    #[serde(alias = "accessToken")]
    pub token: String,
    /// Token lifetime in seconds, when the server states one.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Pull the human-readable message out of an error body.
pub(crate) fn error_message(body: &str, status: u16) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        msg: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.or(parsed.error).or(parsed.msg) {
            if !message.trim().is_empty() {
                return message;
            }
        }
    }
    let text = body.trim();
    if !text.is_empty() && text.len() <= 300 && !text.starts_with('<') {
        return text.to_string();
    }
    format!("Request failed with status {status}")
}
