//! Checkout module.
//!
//! Contains the shipping form, order types and the reconciler that turns a
//! cart into a placed order.

mod address;
mod order;
mod reconciler;

pub use address::{is_valid_email, FieldError, ShippingForm};
pub use order::{OrderLine, OrderReceipt, OrderRecord, OrderStatus, OrderSubmission};
pub use reconciler::{CheckoutError, CheckoutReconciler, CheckoutState, SubmitOutcome};
