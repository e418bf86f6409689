//! Test doubles for the product authority.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use common::{Money, Product, ProductId};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::lookup::{LookupError, ProductLookup};

/// In-process lookup with scripted answers.
#[derive(Clone, Default)]
pub struct FakeCatalog {
    products: HashMap<ProductId, Product>,
    unavailable_on_call: Option<usize>,
    calls: Arc<AtomicUsize>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, id: i64, name: &str, price_cents: i64) -> Self {
        let product = Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Money::from_cents(price_cents),
            stock: 10,
        };
        self.products.insert(product.id, product);
        self
    }

    /// Makes the n-th call (1-based) fail as if the authority timed out.
    pub fn unavailable_on_call(mut self, call: usize) -> Self {
        self.unavailable_on_call = Some(call);
        self
    }

    /// Number of lookups made so far, shared across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductLookup for FakeCatalog {
    async fn lookup(&mut self, product_id: ProductId) -> Result<Product, LookupError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.unavailable_on_call == Some(call) {
            return Err(LookupError::Unavailable("timed out".to_string()));
        }
        self.products
            .get(&product_id)
            .cloned()
            .ok_or(LookupError::NotFound(product_id))
    }
}

#[derive(Clone)]
enum MockResponse {
    Product { name: String, price_cents: i64 },
    Status(u16),
    Raw(String),
    Redirect(String),
}

#[derive(Default)]
struct MockState {
    responses: HashMap<i64, MockResponse>,
    delays: HashMap<i64, Duration>,
    hits: usize,
}

type SharedState = Arc<RwLock<MockState>>;

/// Catalog service stand-in on a random local port.
///
/// Serves `GET /catalog/products/{id}`; unknown ids answer 404.
pub struct MockCatalogServer {
    state: SharedState,
    _handle: JoinHandle<()>,
    addr: SocketAddr,
}

impl MockCatalogServer {
    pub async fn start() -> Self {
        let state = SharedState::default();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock catalog server");
        let addr = listener.local_addr().expect("Failed to get local address");

        let app = Router::new()
            .route("/catalog/products/{id}", get(handle_product))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock catalog server failed");
        });

        Self {
            state,
            _handle: handle,
            addr,
        }
    }

    /// Base URL to hand to [`HttpCatalogClient`](crate::HttpCatalogClient).
    pub fn base_url(&self) -> String {
        format!("http://{}/catalog", self.addr)
    }

    pub async fn add_product(&self, id: i64, name: &str, price_cents: i64) {
        self.state.write().await.responses.insert(
            id,
            MockResponse::Product {
                name: name.to_string(),
                price_cents,
            },
        );
    }

    pub async fn fail_with_status(&self, id: i64, status: u16) {
        self.state
            .write()
            .await
            .responses
            .insert(id, MockResponse::Status(status));
    }

    pub async fn respond_raw(&self, id: i64, body: &str) {
        self.state
            .write()
            .await
            .responses
            .insert(id, MockResponse::Raw(body.to_string()));
    }

    /// Answers `307 Temporary Redirect` pointing at `location`.
    pub async fn redirect(&self, id: i64, location: &str) {
        self.state
            .write()
            .await
            .responses
            .insert(id, MockResponse::Redirect(location.to_string()));
    }

    pub async fn delay(&self, id: i64, delay: Duration) {
        self.state.write().await.delays.insert(id, delay);
    }

    pub async fn hits(&self) -> usize {
        self.state.read().await.hits
    }
}

async fn handle_product(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let (response, delay) = {
        let mut state = state.write().await;
        state.hits += 1;
        (
            state.responses.get(&id).cloned(),
            state.delays.get(&id).copied(),
        )
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    match response {
        Some(MockResponse::Product { name, price_cents }) => Json(serde_json::json!({
            "product": { "id": id, "name": name, "priceCents": price_cents, "stock": 10 }
        }))
        .into_response(),
        Some(MockResponse::Status(code)) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(serde_json::json!({ "error": "mock failure" })),
        )
            .into_response(),
        Some(MockResponse::Raw(body)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Some(MockResponse::Redirect(location)) => Redirect::temporary(&location).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Product not found" })),
        )
            .into_response(),
    }
}
