//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use common::{Product, ProductId};
use serde::Serialize;
use store::ProductRepository;

use crate::error::ApiError;

/// Wire shape of a product.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBody {
    pub id: ProductId,
    pub name: String,
    pub price_cents: i64,
    pub stock: i32,
}

impl From<Product> for ProductBody {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price_cents: product.price.cents(),
            stock: product.stock,
        }
    }
}

#[derive(Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductBody>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub product: ProductBody,
}

/// GET /products — every product, ordered by id.
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<ProductListResponse>, ApiError>
where
    S: ProductRepository + 'static,
{
    let products = store.list_products().await?;
    tracing::debug!(count = products.len(), "listing products");
    Ok(Json(ProductListResponse {
        products: products.into_iter().map(ProductBody::from).collect(),
    }))
}

/// GET /products/{id} — one product, or 404.
#[tracing::instrument(skip_all)]
pub async fn get<S>(
    State(store): State<Arc<S>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ProductResponse>, ApiError>
where
    S: ProductRepository + 'static,
{
    let Path(id) = id?;
    let id = ProductId::new(id);

    match store.get_product(id).await? {
        Some(product) => Ok(Json(ProductResponse {
            product: product.into(),
        })),
        None => {
            tracing::info!(product_id = %id, "product not found");
            Err(ApiError::NotFound("Product not found".to_string()))
        }
    }
}
