//! Facade errors.

use thiserror::Error;
use turbo_auth::AuthError;
use turbo_commerce::ids::ProductId;
use turbo_commerce::CommerceError;

#[derive(Error, Debug)]
pub enum StorefrontError {
    /// The chosen color or size is not one the product offers.
    #[error("{product} is not available in {variant}")]
    UnavailableVariant { product: ProductId, variant: String },

    #[error(transparent)]
    Cart(#[from] CommerceError),

    #[error(transparent)]
    Session(#[from] AuthError),
}
