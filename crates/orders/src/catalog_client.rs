//! HTTP client for the remote catalog service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::{Money, Product, ProductId};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::lookup::{LookupError, ProductLookup};

/// Bound on a single catalog round trip.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct ProductEnvelope {
    product: ProductBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductBody {
    id: i64,
    name: String,
    price_cents: i64,
    stock: i32,
}

/// Looks products up with `GET <base_url>/products/:id`.
///
/// `200` with a matching product is a hit and `404` is a definite miss.
/// Every other outcome, including timeouts and bodies that do not decode,
/// is [`LookupError::Unavailable`], redirects included. No retries.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCatalogClient {
    /// Creates a client for the catalog rooted at `base_url`
    /// (e.g. `"http://catalog-service:3002/catalog"`).
    ///
    /// The underlying client never follows redirects.
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        let client = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        })
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn product_url(&self, product_id: ProductId) -> String {
        format!("{}/products/{}", self.base_url, product_id)
    }

    async fn fetch(&self, product_id: ProductId) -> Result<Product, LookupError> {
        let response = self
            .client
            .get(self.product_url(product_id))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LookupError::Unavailable(format!(
                        "catalog did not answer within {:?}",
                        self.timeout
                    ))
                } else {
                    LookupError::Unavailable(format!("catalog request failed: {e}"))
                }
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(LookupError::NotFound(product_id)),
            status => {
                return Err(LookupError::Unavailable(format!(
                    "catalog answered with HTTP {status}"
                )));
            }
        }

        let body: ProductEnvelope = response
            .json()
            .await
            .map_err(|e| LookupError::Unavailable(format!("unreadable catalog response: {e}")))?;

        let product = body.product;
        if product.id != product_id.get() {
            return Err(LookupError::Unavailable(format!(
                "catalog returned product {} for id {product_id}",
                product.id
            )));
        }
        let price = Money::from_cents(product.price_cents);
        if price.is_negative() {
            return Err(LookupError::Unavailable(format!(
                "catalog returned a negative price for product {product_id}"
            )));
        }

        Ok(Product {
            id: product_id,
            name: product.name,
            price,
            stock: product.stock,
        })
    }
}

#[async_trait]
impl ProductLookup for HttpCatalogClient {
    #[tracing::instrument(skip(self), fields(%product_id))]
    async fn lookup(&mut self, product_id: ProductId) -> Result<Product, LookupError> {
        let started = Instant::now();
        let result = self.fetch(product_id).await;
        metrics::histogram!("catalog_lookup_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let outcome = match &result {
            Ok(product) => {
                tracing::debug!(name = %product.name, "catalog lookup hit");
                "found"
            }
            Err(LookupError::NotFound(_)) => {
                tracing::info!("product not found in catalog");
                "not_found"
            }
            Err(e) => {
                tracing::warn!(error = %e, "catalog lookup failed");
                "unavailable"
            }
        };
        metrics::counter!("catalog_lookups_total", "outcome" => outcome).increment(1);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCatalogServer;

    fn client_for(server: &MockCatalogServer) -> HttpCatalogClient {
        HttpCatalogClient::new(&server.base_url())
            .unwrap()
            .with_timeout(Duration::from_millis(200))
    }

    #[test]
    fn trims_trailing_slash() {
        let client = HttpCatalogClient::new("http://catalog:3002/catalog/").unwrap();
        assert_eq!(client.base_url(), "http://catalog:3002/catalog");
        assert_eq!(
            client.product_url(ProductId::new(7)),
            "http://catalog:3002/catalog/products/7"
        );
        assert_eq!(client.timeout(), DEFAULT_LOOKUP_TIMEOUT);
    }

    #[tokio::test]
    async fn found_product_is_returned() {
        let server = MockCatalogServer::start().await;
        server.add_product(1, "Widget", 500).await;

        let product = client_for(&server)
            .lookup(ProductId::new(1))
            .await
            .unwrap();
        assert_eq!(product.id, ProductId::new(1));
        assert_eq!(product.name, "Widget");
        assert_eq!(product.price, Money::from_cents(500));
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let server = MockCatalogServer::start().await;

        let result = client_for(&server).lookup(ProductId::new(999)).await;
        assert!(matches!(result, Err(LookupError::NotFound(id)) if id == ProductId::new(999)));
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockCatalogServer::start().await;
        server.fail_with_status(2, 500).await;

        let result = client_for(&server).lookup(ProductId::new(2)).await;
        assert!(matches!(result, Err(LookupError::Unavailable(_))));
    }

    #[tokio::test]
    async fn slow_catalog_is_unavailable() {
        let server = MockCatalogServer::start().await;
        server.add_product(3, "Slow", 100).await;
        server.delay(3, Duration::from_millis(1000)).await;

        let result = client_for(&server).lookup(ProductId::new(3)).await;
        assert!(matches!(result, Err(LookupError::Unavailable(msg)) if msg.contains("within")));
    }

    #[tokio::test]
    async fn undecodable_body_is_unavailable() {
        let server = MockCatalogServer::start().await;
        server.respond_raw(4, r#"{"unexpected": true}"#).await;

        let result = client_for(&server).lookup(ProductId::new(4)).await;
        assert!(matches!(result, Err(LookupError::Unavailable(_))));
    }

    #[tokio::test]
    async fn mismatched_product_is_unavailable() {
        let server = MockCatalogServer::start().await;
        server
            .respond_raw(
                5,
                r#"{"product": {"id": 6, "name": "Other", "priceCents": 100, "stock": 1}}"#,
            )
            .await;

        let result = client_for(&server).lookup(ProductId::new(5)).await;
        assert!(matches!(result, Err(LookupError::Unavailable(_))));
    }

    #[tokio::test]
    async fn unreachable_catalog_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut client = HttpCatalogClient::new(&format!("http://{addr}/catalog"))
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let result = client.lookup(ProductId::new(1)).await;
        assert!(matches!(result, Err(LookupError::Unavailable(_))));
    }

    #[tokio::test]
    async fn redirect_is_unavailable() {
        let server = MockCatalogServer::start().await;
        server.add_product(6, "Elsewhere", 100).await;
        server.redirect(5, "/catalog/products/6").await;
        server.redirect(7, "/catalog/products/999").await;

        let result = client_for(&server).lookup(ProductId::new(5)).await;
        assert!(matches!(result, Err(LookupError::Unavailable(msg)) if msg.contains("307")));

        let result = client_for(&server).lookup(ProductId::new(7)).await;
        assert!(matches!(result, Err(LookupError::Unavailable(_))));
    }

    #[tokio::test]
    async fn negative_price_is_unavailable() {
        let server = MockCatalogServer::start().await;
        server
            .respond_raw(
                8,
                r#"{"product": {"id": 8, "name": "Refund", "priceCents": -100, "stock": 1}}"#,
            )
            .await;

        let result = client_for(&server).lookup(ProductId::new(8)).await;
        assert!(matches!(result, Err(LookupError::Unavailable(msg)) if msg.contains("negative")));
    }
}
