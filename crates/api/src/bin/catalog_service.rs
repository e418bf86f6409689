//! Catalog service: the product authority for the orders service.

use api::config::Config;
use api::{seed, server};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{Database, InMemoryStore, ProductRepository};

async fn run<S>(store: S, config: &Config, metrics_handle: PrometheusHandle)
where
    S: Database + ProductRepository + Clone + 'static,
{
    if config.seed_demo_data {
        seed::seed_demo_products(&store)
            .await
            .expect("failed to seed demo products");
    }

    let app = api::create_catalog_app(store, metrics_handle);
    server::serve(app, config, "catalog-service")
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env(3002);
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
            tracing::warn!("DATABASE_URL is not set; using the in-memory store with demo data");
            let config = Config {
                seed_demo_data: true,
                ..config
            };
            run(InMemoryStore::new(), &config, metrics_handle).await;
        }
    }
}
