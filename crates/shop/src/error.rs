use thiserror::Error;

use storefront_core::{CategoryId, DomainError, ProductId};
use storefront_infra::{StoreError, UniqueKey};

use crate::payment::PaymentError;

/// Service-level error taxonomy.
///
/// Running out of stock is not an error; see [`crate::ItemUpdate`].
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("a product with slug {0:?} already exists")]
    DuplicateSlug(String),

    #[error("sku {0:?} is already in use")]
    DuplicateSku(String),

    #[error("category {0} is still assigned to products")]
    CategoryInUse(CategoryId),

    #[error("the cart is locked")]
    CartLocked,

    #[error("not found: {0}")]
    NotFound(String),

    /// A release or an undo of a reservation did not reach the store. The
    /// cart and the stock may disagree by `amount` units.
    #[error("stock adjustment of {amount} for product {product_id} was not applied")]
    StockAdjustmentFailed { product_id: ProductId, amount: i64 },

    #[error("unknown payment backend {0:?}")]
    UnknownPaymentBackend(String),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Domain(DomainError),

    #[error(transparent)]
    Store(StoreError),
}

pub type ShopResult<T> = Result<T, ShopError>;

impl From<DomainError> for ShopError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(what) => ShopError::NotFound(what),
            other => ShopError::Domain(other),
        }
    }
}

impl From<StoreError> for ShopError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ShopError::NotFound(what),
            StoreError::Duplicate {
                key: UniqueKey::Slug,
                detail,
            } => ShopError::DuplicateSlug(detail),
            StoreError::Duplicate {
                key: UniqueKey::Sku,
                detail,
            } => ShopError::DuplicateSku(detail),
            other => ShopError::Store(other),
        }
    }
}
