//! Order transaction manager.

use std::time::Instant;

use common::{Order, UserId};
use store::{OrderStore, OrderTransaction};

use crate::authority::{ProductAuthority, Resolved, release};
use crate::error::OrderError;
use crate::phase::{CreationPhase, PhaseTracker};
use crate::request::OrderRequest;

/// Creates and lists orders.
///
/// `create_order` is all-or-nothing: either the header and every line are
/// committed together, or nothing is written.
#[derive(Debug, Clone)]
pub struct OrderService<S, A> {
    store: S,
    authority: A,
}

impl<S, A> OrderService<S, A>
where
    S: OrderStore,
    A: ProductAuthority<S>,
{
    pub fn new(store: S, authority: A) -> Self {
        Self { store, authority }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates `request` and persists it as a new order owned by `user_id`.
    #[tracing::instrument(
        skip(self, request),
        fields(%user_id, lines = request.lines().len(), authority = self.authority.name())
    )]
    pub async fn create_order(
        &self,
        user_id: UserId,
        request: &OrderRequest,
    ) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.run(user_id, request).await;
        metrics::histogram!("order_creation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total,
                    "order created"
                );
            }
            Err(e) => {
                metrics::counter!("order_creation_failures_total", "reason" => e.reason())
                    .increment(1);
                tracing::warn!(error = %e, "order creation failed");
            }
        }

        result
    }

    async fn run(&self, user_id: UserId, request: &OrderRequest) -> Result<Order, OrderError> {
        let mut phase = PhaseTracker::new();

        phase.advance(CreationPhase::Validating);
        let Resolved {
            mut transaction,
            order,
        } = match self.authority.resolve(&self.store, request).await {
            Ok(resolved) => resolved,
            Err(e) => {
                phase.advance(CreationPhase::Aborted);
                return Err(e);
            }
        };

        phase.advance(CreationPhase::Persisting);
        let total = order.total();
        let items = order.into_items();

        let header = match persist(&mut transaction, user_id, total, &items).await {
            Ok(header) => header,
            Err(e) => {
                release(transaction).await;
                phase.advance(CreationPhase::RolledBack);
                return Err(e.into());
            }
        };

        if let Err(e) = transaction.commit().await {
            phase.advance(CreationPhase::RolledBack);
            return Err(e.into());
        }
        phase.advance(CreationPhase::Committed);

        Ok(Order {
            id: header.id,
            user_id,
            total,
            created_at: header.created_at,
            items,
        })
    }

    /// Lists the user's committed orders, newest first.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }
}

async fn persist<T: OrderTransaction>(
    transaction: &mut T,
    user_id: UserId,
    total: common::Money,
    items: &[common::OrderItem],
) -> store::Result<store::OrderHeader> {
    let header = transaction.insert_order(user_id, total).await?;
    for item in items {
        transaction.insert_item(header.id, item).await?;
    }
    Ok(header)
}
