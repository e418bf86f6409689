//! Where product validation runs relative to the order transaction.

use async_trait::async_trait;
use store::{OrderStore, OrderTransaction, ProductSnapshotRead};

use crate::error::OrderError;
use crate::lookup::{ProductLookup, TransactionalLookup};
use crate::request::OrderRequest;
use crate::validator::{ValidatedOrder, validate};

/// A validated order and the open transaction it will be written into.
pub struct Resolved<T> {
    pub transaction: T,
    pub order: ValidatedOrder,
}

/// Validates a request against the product authority and hands back an open
/// write transaction.
///
/// On error no transaction is left open.
#[async_trait]
pub trait ProductAuthority<S: OrderStore>: Send + Sync {
    /// Label for logs and metrics.
    fn name(&self) -> &'static str;

    async fn resolve(
        &self,
        store: &S,
        request: &OrderRequest,
    ) -> Result<Resolved<S::Transaction>, OrderError>;
}

/// Products live in the order store. The transaction opens first and every
/// lookup reads through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCatalog;

#[async_trait]
impl<S> ProductAuthority<S> for LocalCatalog
where
    S: OrderStore,
    S::Transaction: ProductSnapshotRead,
{
    fn name(&self) -> &'static str {
        "local"
    }

    async fn resolve(
        &self,
        store: &S,
        request: &OrderRequest,
    ) -> Result<Resolved<S::Transaction>, OrderError> {
        let mut transaction = store.begin().await?;

        let validated = validate(&mut TransactionalLookup::new(&mut transaction), request).await;
        match validated {
            Ok(order) => Ok(Resolved { transaction, order }),
            Err(err) => {
                release(transaction).await;
                Err(err)
            }
        }
    }
}

/// Products are owned by another service. Every lookup is a remote call made
/// before the transaction opens, so a price may change between lookup and
/// commit; the order keeps the price it was validated with.
#[derive(Debug, Clone)]
pub struct RemoteCatalog<L> {
    lookup: L,
}

impl<L> RemoteCatalog<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl<S, L> ProductAuthority<S> for RemoteCatalog<L>
where
    S: OrderStore,
    L: ProductLookup + Clone + Sync,
{
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn resolve(
        &self,
        store: &S,
        request: &OrderRequest,
    ) -> Result<Resolved<S::Transaction>, OrderError> {
        let mut lookup = self.lookup.clone();
        let order = validate(&mut lookup, request).await?;
        let transaction = store.begin().await?;
        Ok(Resolved { transaction, order })
    }
}

/// Rolls a transaction back, logging instead of failing.
pub(crate) async fn release<T: OrderTransaction>(transaction: T) {
    if let Err(e) = transaction.rollback().await {
        tracing::warn!(error = %e, "rollback failed; the transaction is discarded on drop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::OrderLine;
    use crate::testing::FakeCatalog;
    use common::{Money, Product, ProductId};
    use store::InMemoryStore;

    fn request(lines: &[(i64, u32)]) -> OrderRequest {
        OrderRequest::new(
            lines
                .iter()
                .map(|&(id, qty)| OrderLine::new(ProductId::new(id), qty))
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn local_catalog_reads_products_from_the_store() {
        let store = InMemoryStore::new();
        store
            .put_product(Product {
                id: ProductId::new(1),
                name: "Widget".to_string(),
                price: Money::from_cents(500),
                stock: 3,
            })
            .await;

        let resolved = LocalCatalog.resolve(&store, &request(&[(1, 2)])).await.unwrap();
        assert_eq!(resolved.order.total(), Money::from_cents(1000));
        resolved.transaction.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn local_catalog_reports_missing_product() {
        let store = InMemoryStore::new();
        let result = LocalCatalog.resolve(&store, &request(&[(999, 1)])).await;
        assert!(matches!(result, Err(OrderError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn remote_catalog_uses_a_fresh_lookup_per_request() {
        let store = InMemoryStore::new();
        let catalog = FakeCatalog::new().with_product(1, "Widget", 500);
        let authority = RemoteCatalog::new(catalog.clone());

        for _ in 0..2 {
            let resolved = authority.resolve(&store, &request(&[(1, 1)])).await.unwrap();
            resolved.transaction.rollback().await.unwrap();
        }

        assert_eq!(catalog.calls(), 2);
        assert_eq!(ProductAuthority::<InMemoryStore>::name(&authority), "remote");
    }
}
