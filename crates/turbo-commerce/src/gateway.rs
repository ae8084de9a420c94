//! Remote collaborators the storefront depends on.
//!
//! The coupon validation endpoint and the order creation endpoint are
//! reached through these traits so the core can be driven by the REST
//! client in production and by in-memory fakes in tests.

use crate::cart::CartSnapshot;
use crate::checkout::{OrderReceipt, OrderSubmission};
use crate::coupon::Coupon;
use crate::ids::ProductId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The endpoint answered with an error body.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),

    /// The response could not be understood.
    #[error("{0}")]
    Decode(String),
}

impl GatewayError {
    /// The collaborator's message, verbatim.
    pub fn message(&self) -> &str {
        match self {
            GatewayError::Rejected { message, .. } => message,
            GatewayError::Transport(message) | GatewayError::Decode(message) => message,
        }
    }

    /// HTTP status, when the endpoint answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One product line sent for coupon validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponProduct {
    pub id: ProductId,
    pub price: f64,
    pub quantity: i64,
}

/// Body of a coupon validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidationRequest {
    pub code: String,
    pub cart_total: f64,
    pub products: Vec<CouponProduct>,
}

impl CouponValidationRequest {
    /// Describe `snapshot` for validating `code`.
    pub fn from_snapshot(code: impl Into<String>, snapshot: &CartSnapshot) -> Self {
        Self {
            code: code.into(),
            cart_total: snapshot.subtotal.to_decimal(),
            products: snapshot
                .lines
                .iter()
                .map(|line| CouponProduct {
                    id: line.product_id.clone(),
                    price: line.unit_price.to_decimal(),
                    quantity: line.quantity,
                })
                .collect(),
        }
    }
}

/// Answer of a coupon validation call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CouponValidationResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<Coupon>,
    /// Discount computed by the server, in major units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CouponValidationResponse {
    /// An accepted coupon with a server-computed discount.
    pub fn accepted(coupon: Coupon, discount: Option<f64>) -> Self {
        Self {
            valid: true,
            coupon: Some(coupon),
            discount,
            message: None,
        }
    }

    /// A rejection carrying the reason shown to the user.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Validates coupon codes against a cart.
#[async_trait]
pub trait CouponValidator: Send + Sync {
    async fn validate(
        &self,
        request: &CouponValidationRequest,
    ) -> Result<CouponValidationResponse, GatewayError>;
}

/// Creates orders.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit one order on behalf of the bearer.
    async fn create_order(
        &self,
        submission: &OrderSubmission,
        bearer: &str,
    ) -> Result<OrderReceipt, GatewayError>;
}
