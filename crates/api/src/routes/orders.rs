//! Order listing and creation endpoints.

use std::sync::Arc;

use auth::IdentityVerifier;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use chrono::SecondsFormat;
use common::{Order, OrderId, OrderItem, ProductId};
use orders::{OrderLineInput, OrderRequest, OrderService, ProductAuthority};
use serde::{Deserialize, Serialize};
use store::OrderStore;

use super::bearer_token;
use crate::error::ApiError;

/// Shared state of the order endpoints.
pub struct OrdersState<S, A> {
    pub service: OrderService<S, A>,
    pub identity: Arc<dyn IdentityVerifier>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Option<Vec<OrderLineInput>>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemBody {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody {
    pub id: OrderId,
    pub total_cents: i64,
    /// RFC 3339, millisecond precision, UTC.
    pub created_at: String,
    pub items: Vec<OrderItemBody>,
}

impl From<OrderItem> for OrderItemBody {
    fn from(item: OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name,
            unit_price_cents: item.unit_price.cents(),
            quantity: item.quantity,
        }
    }
}

impl From<Order> for OrderBody {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            total_cents: order.total.cents(),
            created_at: order.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            items: order.items.into_iter().map(OrderItemBody::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderBody>,
}

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order: OrderBody,
}

// -- Handlers --

/// GET /orders — the caller's orders, newest first.
pub async fn list<S, A>(
    State(state): State<Arc<OrdersState<S, A>>>,
    headers: HeaderMap,
) -> Result<Json<OrderListResponse>, ApiError>
where
    S: OrderStore + 'static,
    A: ProductAuthority<S> + 'static,
{
    let user = state.identity.verify(bearer_token(&headers)?).await?;

    let orders = state.service.list_orders(user.id).await?;
    tracing::debug!(user_id = %user.id, count = orders.len(), "listing orders");

    Ok(Json(OrderListResponse {
        orders: orders.into_iter().map(OrderBody::from).collect(),
    }))
}

/// POST /orders — validates and persists a new order for the caller.
#[tracing::instrument(skip_all)]
pub async fn create<S, A>(
    State(state): State<Arc<OrdersState<S, A>>>,
    headers: HeaderMap,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError>
where
    S: OrderStore + 'static,
    A: ProductAuthority<S> + 'static,
{
    let user = state.identity.verify(bearer_token(&headers)?).await?;
    let Json(req) = payload?;

    let request = OrderRequest::from_input(req.items)?;
    let order = state.service.create_order(user.id, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order: order.into(),
        }),
    ))
}
