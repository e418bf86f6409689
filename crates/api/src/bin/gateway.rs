//! API gateway in front of the auth, catalog and orders services.

use api::config::Config;
use api::server;

#[tokio::main]
async fn main() {
    let config = Config::from_env(3000);
    server::init_tracing(&config);
    let metrics_handle = server::install_metrics().expect("failed to install Prometheus recorder");

    tracing::info!(
        auth = %config.auth_service_url,
        catalog = %config.catalog_service_url,
        orders = %config.orders_service_url,
        timeout_ms = config.gateway_timeout.as_millis() as u64,
        "gateway upstreams"
    );

    let app =
        api::create_gateway_app(&config, metrics_handle).expect("failed to build upstream client");
    server::serve(app, &config, "api-gateway")
        .await
        .expect("server error");
}
