//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency. Each test
//! works on its own user ids and emails, so they do not need to truncate.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Duration, Utc};
use common::{Money, OrderItem, ProductId, UserId};
use store::{
    NewProduct, OrderStore, OrderTransaction, PoolOptions, PostgresStore, ProductRepository,
    ProductSnapshotRead, Session, SessionRepository, StoreError, UserRepository,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

static NEXT_USER: AtomicI64 = AtomicI64::new(1000);

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let store = PostgresStore::connect(&connection_string, &PoolOptions::default())
                .await
                .unwrap();
            store.run_migrations().await.unwrap();
            store.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;
    let options = PoolOptions {
        max_connections: 5,
        ..PoolOptions::default()
    };
    PostgresStore::connect(&info.connection_string, &options)
        .await
        .unwrap()
}

fn fresh_user() -> UserId {
    UserId::new(NEXT_USER.fetch_add(1, Ordering::SeqCst))
}

fn item(product_id: ProductId, unit_cents: i64, quantity: u32) -> OrderItem {
    OrderItem {
        product_id,
        product_name: format!("Product {product_id}"),
        unit_price: Money::from_cents(unit_cents),
        quantity,
    }
}

#[tokio::test]
async fn committed_order_round_trips() {
    let store = get_test_store().await;
    let user = fresh_user();

    let mut tx = store.begin().await.unwrap();
    let header = tx.insert_order(user, Money::from_cents(1300)).await.unwrap();
    tx.insert_item(header.id, &item(ProductId::new(1), 500, 2))
        .await
        .unwrap();
    tx.insert_item(header.id, &item(ProductId::new(2), 300, 1))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let orders = store.list_orders_for_user(user).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, header.id);
    assert_eq!(orders[0].created_at, header.created_at);
    assert_eq!(orders[0].total, Money::from_cents(1300));
    assert_eq!(
        orders[0].items,
        vec![
            item(ProductId::new(1), 500, 2),
            item(ProductId::new(2), 300, 1)
        ]
    );
}

#[tokio::test]
async fn rolled_back_order_leaves_no_rows() {
    let store = get_test_store().await;
    let user = fresh_user();

    let mut tx = store.begin().await.unwrap();
    let header = tx.insert_order(user, Money::from_cents(500)).await.unwrap();
    tx.insert_item(header.id, &item(ProductId::new(1), 500, 1))
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(store.list_orders_for_user(user).await.unwrap().is_empty());

    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
        .bind(header.id.get())
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(items, 0);
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    let user = fresh_user();

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(user, Money::from_cents(500)).await.unwrap();
    }

    assert!(store.list_orders_for_user(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn uncommitted_order_is_invisible_to_concurrent_readers() {
    let store = get_test_store().await;
    let user = fresh_user();

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(user, Money::from_cents(500)).await.unwrap();

    assert!(store.list_orders_for_user(user).await.unwrap().is_empty());

    tx.commit().await.unwrap();
    assert_eq!(store.list_orders_for_user(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_item_insert_aborts_the_whole_order() {
    let store = get_test_store().await;
    let user = fresh_user();

    let mut tx = store.begin().await.unwrap();
    let header = tx.insert_order(user, Money::from_cents(500)).await.unwrap();
    tx.insert_item(header.id, &item(ProductId::new(1), 500, 1))
        .await
        .unwrap();

    // Zero quantity violates the CHECK constraint.
    let result = tx
        .insert_item(header.id, &item(ProductId::new(2), 100, 0))
        .await;
    assert!(matches!(result, Err(StoreError::Database(_))));
    tx.rollback().await.unwrap();

    assert!(store.list_orders_for_user(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn orders_listed_newest_first() {
    let store = get_test_store().await;
    let user = fresh_user();

    let mut ids = Vec::new();
    for total in [100, 200, 300] {
        let mut tx = store.begin().await.unwrap();
        let header = tx.insert_order(user, Money::from_cents(total)).await.unwrap();
        tx.commit().await.unwrap();
        ids.push(header.id);
    }

    let listed: Vec<_> = store
        .list_orders_for_user(user)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    ids.reverse();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn products_are_readable_inside_a_transaction() {
    let store = get_test_store().await;
    let product = store
        .insert_product(NewProduct::new("Lamp", Money::from_cents(2500), 4))
        .await
        .unwrap();

    assert_eq!(
        store.get_product(product.id).await.unwrap(),
        Some(product.clone())
    );

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.find_product(product.id).await.unwrap(), Some(product));
    assert_eq!(tx.find_product(ProductId::new(-1)).await.unwrap(), None);
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let store = get_test_store().await;
    let email = format!("{}@example.com", Uuid::new_v4());

    let user = store.insert_user(&email, "hash").await.unwrap();
    assert_eq!(store.find_user(user.id).await.unwrap(), Some(user));

    let result = store.insert_user(&email, "hash").await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn sessions_round_trip() {
    let store = get_test_store().await;
    let email = format!("{}@example.com", Uuid::new_v4());
    let user = store.insert_user(&email, "hash").await.unwrap();

    let session = Session {
        token: Uuid::new_v4(),
        user_id: user.id,
        expires_at: Utc::now() + Duration::hours(8),
    };
    store.insert_session(session.clone()).await.unwrap();

    let found = store.find_session(session.token).await.unwrap().unwrap();
    assert_eq!(found.user_id, user.id);
    assert_eq!(found.token, session.token);
    assert!(store.find_session(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn expired_sessions_are_purged() {
    let store = get_test_store().await;
    let email = format!("{}@example.com", Uuid::new_v4());
    let user = store.insert_user(&email, "hash").await.unwrap();
    let now = Utc::now();

    let expired = Session {
        token: Uuid::new_v4(),
        user_id: user.id,
        expires_at: now - Duration::minutes(1),
    };
    let live = Session {
        token: Uuid::new_v4(),
        user_id: user.id,
        expires_at: now + Duration::hours(1),
    };
    store.insert_session(expired.clone()).await.unwrap();
    store.insert_session(live.clone()).await.unwrap();

    assert!(store.delete_expired_sessions(now).await.unwrap() >= 1);
    assert!(store.find_session(expired.token).await.unwrap().is_none());
    assert!(store.find_session(live.token).await.unwrap().is_some());

    store.delete_session(live.token).await.unwrap();
    assert!(store.find_session(live.token).await.unwrap().is_none());
}
