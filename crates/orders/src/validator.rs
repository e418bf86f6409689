//! Order validation: resolves every requested line against the product authority.

use common::{Money, OrderItem};

use crate::error::OrderError;
use crate::lookup::ProductLookup;
use crate::request::OrderRequest;

/// Lines resolved against the product authority, with a price snapshot, and
/// their total. `total == Σ unit_price * quantity` holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    items: Vec<OrderItem>,
    total: Money,
}

impl ValidatedOrder {
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn into_items(self) -> Vec<OrderItem> {
        self.items
    }
}

/// Resolves each line in request order and accumulates the total.
///
/// Stops at the first line that cannot be resolved; lookups already made for
/// earlier lines are discarded. Stock is not consulted. A product priced
/// below zero is treated as an unusable answer from the authority.
#[tracing::instrument(skip_all, fields(lines = request.lines().len()))]
pub async fn validate<L>(lookup: &mut L, request: &OrderRequest) -> Result<ValidatedOrder, OrderError>
where
    L: ProductLookup + ?Sized,
{
    let mut items = Vec::with_capacity(request.lines().len());
    let mut total = Money::zero();

    for line in request.lines() {
        let product = lookup.lookup(line.product_id).await?;
        if product.price.is_negative() {
            return Err(OrderError::LookupUnavailable(format!(
                "product {} has a negative price",
                product.id
            )));
        }

        let item = OrderItem {
            product_id: product.id,
            product_name: product.name,
            unit_price: product.price,
            quantity: line.quantity,
        };
        total = item
            .line_total()
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| {
                OrderError::InvalidRequest("order total exceeds the supported range".to_string())
            })?;

        tracing::debug!(
            product_id = %item.product_id,
            quantity = item.quantity,
            "line validated"
        );
        items.push(item);
    }

    Ok(ValidatedOrder { items, total })
}
