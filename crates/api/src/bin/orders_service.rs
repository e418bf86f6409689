//! Orders service: validates against the catalog service over HTTP and
//! resolves callers through the auth service.

use std::sync::Arc;

use api::config::Config;
use api::server;
use auth::RemoteIdentityVerifier;
use metrics_exporter_prometheus::PrometheusHandle;
use orders::{HttpCatalogClient, OrderService, RemoteCatalog};
use store::{Database, InMemoryStore, OrderStore};

async fn run<S>(store: S, config: &Config, metrics_handle: PrometheusHandle)
where
    S: Database + OrderStore + Clone + 'static,
{
    let catalog = HttpCatalogClient::new(&config.catalog_service_url)
        .expect("failed to build catalog client")
        .with_timeout(config.catalog_timeout);
    let identity = RemoteIdentityVerifier::new(&config.auth_service_url)
        .expect("failed to build auth client");
    tracing::info!(
        catalog = catalog.base_url(),
        auth = identity.base_url(),
        "orders service collaborators"
    );

    let service = OrderService::new(store, RemoteCatalog::new(catalog));
    let app = api::create_orders_app(service, Arc::new(identity), metrics_handle);
    server::serve(app, config, "orders-service")
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env(3003);
    server::init_tracing(&config);
    let metrics_handle = server::install_metrics().expect("failed to install Prometheus recorder");

    match config.database_url.clone() {
        Some(url) => {
            let store = server::connect_postgres(&config, &url)
                .await
                .expect("failed to open database");
            run(store.clone(), &config, metrics_handle).await;
            store.close().await;
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using the in-memory store");
            run(InMemoryStore::new(), &config, metrics_handle).await;
        }
    }
}
