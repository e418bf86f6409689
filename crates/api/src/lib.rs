//! HTTP surfaces of the storefront.
//!
//! One monolith and four services share the same handlers:
//! - the monolith serves login, catalog and orders from a single database,
//! - the auth, catalog and orders services each own one concern,
//! - the gateway relays `/auth`, `/catalog` and `/orders` to those services.
//!
//! Every router carries `/metrics`, permissive CORS and request tracing.

pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod seed;
pub mod server;

use std::sync::Arc;
use std::time::Instant;

use auth::{AuthService, IdentityVerifier};
use axum::Router;
use axum::routing::{any, get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use orders::{LocalCatalog, OrderService, ProductAuthority};
use store::{
    Database, OrderStore, ProductRepository, ProductSnapshotRead, SessionRepository,
    UserRepository,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use gateway::{RelayState, Upstream};
use routes::health::HealthState;
use routes::orders::OrdersState;

/// Adds `/metrics`, CORS and request tracing to a service router.
fn with_common_layers(router: Router, metrics_handle: PrometheusHandle) -> Router {
    router
        .merge(routes::metrics::router(metrics_handle))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Single-process application: login, catalog and orders over one store.
///
/// Orders are validated inside the order transaction.
pub fn create_monolith_app<S>(store: S, auth: AuthService<S>, metrics_handle: PrometheusHandle) -> Router
where
    S: ProductRepository + UserRepository + SessionRepository + OrderStore + Clone + 'static,
    S::Transaction: ProductSnapshotRead,
{
    let auth = Arc::new(auth);
    let orders = Arc::new(OrdersState {
        service: OrderService::new(store.clone(), LocalCatalog),
        identity: auth.clone() as Arc<dyn IdentityVerifier>,
    });

    let router = Router::new()
        .route("/health", get(routes::health::check))
        .with_state(HealthState::new("monolith"))
        .merge(
            Router::new()
                .route("/login", post(routes::auth::login::<S>))
                .route("/me", get(routes::auth::me::<S>))
                .with_state(auth),
        )
        .merge(
            Router::new()
                .route("/products", get(routes::catalog::list::<S>))
                .route("/products/{id}", get(routes::catalog::get::<S>))
                .with_state(Arc::new(store)),
        )
        .merge(
            Router::new()
                .route(
                    "/orders",
                    get(routes::orders::list::<S, LocalCatalog>)
                        .post(routes::orders::create::<S, LocalCatalog>),
                )
                .with_state(orders),
        );

    with_common_layers(router, metrics_handle)
}

/// Auth service: login, current user and token verification under `/auth`.
pub fn create_auth_app<S>(auth: AuthService<S>, metrics_handle: PrometheusHandle) -> Router
where
    S: Database + UserRepository + SessionRepository + Clone + 'static,
{
    let health =
        HealthState::new("auth-service").with_database(Arc::new(auth.store().clone()));

    let router = Router::new()
        .route("/auth/health", get(routes::health::check))
        .with_state(health)
        .merge(
            Router::new()
                .route("/auth/login", post(routes::auth::login::<S>))
                .route("/auth/me", get(routes::auth::me::<S>))
                .route("/auth/verify", post(routes::auth::verify::<S>))
                .with_state(Arc::new(auth)),
        );

    with_common_layers(router, metrics_handle)
}

/// Catalog service: product reads under `/catalog`.
pub fn create_catalog_app<S>(store: S, metrics_handle: PrometheusHandle) -> Router
where
    S: Database + ProductRepository + Clone + 'static,
{
    let health = HealthState::new("catalog-service").with_database(Arc::new(store.clone()));

    let router = Router::new()
        .route("/catalog/health", get(routes::health::check))
        .with_state(health)
        .merge(
            Router::new()
                .route("/catalog/products", get(routes::catalog::list::<S>))
                .route("/catalog/products/{id}", get(routes::catalog::get::<S>))
                .with_state(Arc::new(store)),
        );

    with_common_layers(router, metrics_handle)
}

/// Orders service: order reads and creation under `/orders`.
///
/// Identity comes from `identity`; products come from whatever authority the
/// service was built with.
pub fn create_orders_app<S, A>(
    service: OrderService<S, A>,
    identity: Arc<dyn IdentityVerifier>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: Database + OrderStore + Clone + 'static,
    A: ProductAuthority<S> + 'static,
{
    let health =
        HealthState::new("orders-service").with_database(Arc::new(service.store().clone()));
    let state = Arc::new(OrdersState { service, identity });

    let router = Router::new()
        .route("/orders/health", get(routes::health::check))
        .with_state(health)
        .merge(
            Router::new()
                .route(
                    "/orders",
                    get(routes::orders::list::<S, A>).post(routes::orders::create::<S, A>),
                )
                .with_state(state),
        );

    with_common_layers(router, metrics_handle)
}

/// Gateway: relays `/auth`, `/catalog` and `/orders` to the configured services.
///
/// Upstream redirects are relayed to the caller, never followed.
pub fn create_gateway_app(
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> reqwest::Result<Router> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let upstreams = [
        Upstream::new("auth", "/auth", &config.auth_service_url),
        Upstream::new("catalog", "/catalog", &config.catalog_service_url),
        Upstream::new("orders", "/orders", &config.orders_service_url),
    ];

    let mut router = Router::new()
        .route("/health", get(gateway::health))
        .with_state(Instant::now());

    for upstream in upstreams {
        let prefix = upstream.prefix;
        let state = RelayState::new(client.clone(), upstream, config.gateway_timeout);
        router = router.merge(
            Router::new()
                .route(prefix, any(gateway::relay))
                .route(&format!("{prefix}/{{*rest}}"), any(gateway::relay))
                .with_state(state),
        );
    }

    Ok(with_common_layers(router, metrics_handle))
}
