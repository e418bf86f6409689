//! Single-process storefront: login, catalog and orders over one database.

use api::config::Config;
use api::{seed, server};
use auth::AuthService;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{
    InMemoryStore, OrderStore, ProductRepository, ProductSnapshotRead, SessionRepository,
    UserRepository,
};

async fn run<S>(store: S, config: &Config, metrics_handle: PrometheusHandle)
where
    S: ProductRepository + UserRepository + SessionRepository + OrderStore + Clone + 'static,
    S::Transaction: ProductSnapshotRead,
{
    let auth = AuthService::new(store.clone()).with_session_ttl(config.session_ttl);

    if config.seed_demo_data {
        seed::seed_demo_user(&auth)
            .await
            .expect("failed to seed demo user");
        seed::seed_demo_products(&store)
            .await
            .expect("failed to seed demo products");
    }

    let sweep = server::spawn_session_sweep(auth.clone(), config.session_sweep_interval);
    let app = api::create_monolith_app(store, auth, metrics_handle);
    server::serve(app, config, "monolith")
        .await
        .expect("server error");
    sweep.abort();
}

#[tokio::main]
async fn main() {
    let config = Config::from_env(8080);
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
