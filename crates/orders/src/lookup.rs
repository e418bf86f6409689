//! Product lookup: asking the product authority for one product.

use async_trait::async_trait;
use common::{Product, ProductId};
use store::{ProductSnapshotRead, StoreError};
use thiserror::Error;

/// Outcome of a lookup that did not produce a product.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The authority answered and the product does not exist.
    #[error("Product {0} not found")]
    NotFound(ProductId),

    /// The authority could not be reached in time or gave an answer that is
    /// neither "found" nor "absent".
    #[error("Product authority unavailable: {0}")]
    Unavailable(String),

    /// A transactional read against the local store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Resolves a product id against the authority that owns product data.
#[async_trait]
pub trait ProductLookup: Send {
    async fn lookup(&mut self, product_id: ProductId) -> Result<Product, LookupError>;
}

/// Reads products through an open order transaction.
///
/// Used when products and orders share a database, so validation sees the
/// same snapshot the order is written against.
pub struct TransactionalLookup<'a, T> {
    tx: &'a mut T,
}

impl<'a, T> TransactionalLookup<'a, T> {
    pub fn new(tx: &'a mut T) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl<T: ProductSnapshotRead> ProductLookup for TransactionalLookup<'_, T> {
    async fn lookup(&mut self, product_id: ProductId) -> Result<Product, LookupError> {
        self.tx
            .find_product(product_id)
            .await?
            .ok_or(LookupError::NotFound(product_id))
    }
}
