//! Auth service: login, current user and token verification.

use api::config::Config;
use api::{seed, server};
use auth::AuthService;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{Database, InMemoryStore, SessionRepository, UserRepository};

async fn run<S>(store: S, config: &Config, metrics_handle: PrometheusHandle)
where
    S: Database + UserRepository + SessionRepository + Clone + 'static,
{
    let auth = AuthService::new(store).with_session_ttl(config.session_ttl);

    if config.seed_demo_data {
        seed::seed_demo_user(&auth)
            .await
            .expect("failed to seed demo user");
    }

    let sweep = server::spawn_session_sweep(auth.clone(), config.session_sweep_interval);
    let app = api::create_auth_app(auth, metrics_handle);
    server::serve(app, config, "auth-service")
        .await
        .expect("server error");
    sweep.abort();
}

#[tokio::main]
async fn main() {
    let config = Config::from_env(3001);
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
