//! Order workflow errors.

use common::ProductId;
use store::StoreError;
use thiserror::Error;

use crate::lookup::LookupError;

/// Errors that abort an order creation.
///
/// Every variant leaves storage untouched: the workflow rolls back any open
/// transaction before returning one of these.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request is malformed. Rejected before any lookup.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A requested product does not exist in the product authority.
    #[error("Product with id {0} does not exist")]
    ProductNotFound(ProductId),

    /// The product authority could not give a definite answer.
    #[error("Product catalog unavailable: {0}")]
    LookupUnavailable(String),

    /// Reading or writing the order store failed.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl OrderError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            OrderError::InvalidRequest(_) => "invalid_request",
            OrderError::ProductNotFound(_) => "product_not_found",
            OrderError::LookupUnavailable(_) => "lookup_unavailable",
            OrderError::Persistence(_) => "persistence",
        }
    }
}

impl From<LookupError> for OrderError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound(id) => OrderError::ProductNotFound(id),
            LookupError::Unavailable(reason) => OrderError::LookupUnavailable(reason),
            LookupError::Store(e) => OrderError::Persistence(e),
        }
    }
}
