use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, Order, OrderId, OrderItem, Product, ProductId, User, UserId};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    Result, StoreError,
    repository::{
        Database, NewProduct, OrderHeader, OrderStore, OrderTransaction, ProductRepository,
        ProductSnapshotRead, Session, SessionRepository, UserCredentials, UserRepository,
    },
};

#[derive(Debug, Clone)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total: Money,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, UserCredentials>,
    sessions: HashMap<Uuid, Session>,
    products: BTreeMap<ProductId, Product>,
    orders: Vec<OrderRow>,
    items: Vec<(OrderId, OrderItem)>,
    next_user_id: i64,
    next_product_id: i64,
    fail_item_insert_at: Option<usize>,
    fail_on_commit: bool,
}

/// In-memory store for tests and local development.
///
/// Provides the same interface and transactional visibility as
/// [`PostgresStore`](crate::PostgresStore): order writes are buffered in the
/// transaction and applied under a single write lock on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    order_sequence: Arc<AtomicI64>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a product with an explicit id, replacing any existing one.
    pub async fn put_product(&self, product: Product) {
        let mut tables = self.tables.write().await;
        tables.next_product_id = tables.next_product_id.max(product.id.get());
        tables.products.insert(product.id, product);
    }

    /// Removes a product from the catalog.
    pub async fn remove_product(&self, id: ProductId) {
        self.tables.write().await.products.remove(&id);
    }

    /// Makes the n-th item insert (1-based) of every later transaction fail.
    pub async fn fail_item_insert_at(&self, position: Option<usize>) {
        self.tables.write().await.fail_item_insert_at = position;
    }

    /// Makes every later commit fail.
    pub async fn set_fail_on_commit(&self, fail: bool) {
        self.tables.write().await.fail_on_commit = fail;
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of committed order items.
    pub async fn item_count(&self) -> usize {
        self.tables.read().await.items.len()
    }

    fn next_order_id(&self) -> OrderId {
        OrderId::new(self.order_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl Database for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        tables.next_product_id += 1;
        let product = Product {
            id: ProductId::new(tables.next_product_id),
            name: product.name,
            price: product.price,
            stock: product.stock,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|c| c.user.email == email)
            .cloned())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .get(&id)
            .map(|c| c.user.clone()))
    }

    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|c| c.user.email == email) {
            return Err(StoreError::Conflict(format!(
                "email {email} is already registered"
            )));
        }

        tables.next_user_id += 1;
        let user = User {
            id: UserId::new(tables.next_user_id),
            email: email.to_string(),
        };
        tables.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user)
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn insert_session(&self, session: Session) -> Result<()> {
        self.tables
            .write()
            .await
            .sessions
            .insert(session.token, session);
        Ok(())
    }

    async fn find_session(&self, token: Uuid) -> Result<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(&token).cloned())
    }

    async fn delete_session(&self, token: Uuid) -> Result<()> {
        self.tables.write().await.sessions.remove(&token);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| !session.is_expired_at(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        Ok(InMemoryTransaction {
            store: self.clone(),
            orders: Vec::new(),
            items: Vec::new(),
        })
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&OrderRow> = tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let orders = rows
            .into_iter()
            .map(|row| Order {
                id: row.id,
                user_id: row.user_id,
                total: row.total,
                created_at: row.created_at,
                items: tables
                    .items
                    .iter()
                    .filter(|(order_id, _)| *order_id == row.id)
                    .map(|(_, item)| item.clone())
                    .collect(),
            })
            .collect();

        Ok(orders)
    }
}

/// Buffered order writes, applied atomically on commit.
pub struct InMemoryTransaction {
    store: InMemoryStore,
    orders: Vec<OrderRow>,
    items: Vec<(OrderId, OrderItem)>,
}

#[async_trait]
impl OrderTransaction for InMemoryTransaction {
    async fn insert_order(&mut self, user_id: UserId, total: Money) -> Result<OrderHeader> {
        let header = OrderHeader {
            id: self.store.next_order_id(),
            created_at: Utc::now(),
        };
        self.orders.push(OrderRow {
            id: header.id,
            user_id,
            total,
            created_at: header.created_at,
        });
        Ok(header)
    }

    async fn insert_item(&mut self, order_id: OrderId, item: &OrderItem) -> Result<()> {
        if !self.orders.iter().any(|o| o.id == order_id) {
            return Err(StoreError::Backend(format!(
                "order {order_id} was not inserted in this transaction"
            )));
        }

        let position = self.items.len() + 1;
        if self.store.tables.read().await.fail_item_insert_at == Some(position) {
            return Err(StoreError::Backend(format!(
                "injected failure on item insert {position}"
            )));
        }

        self.items.push((order_id, item.clone()));
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let mut tables = self.store.tables.write().await;
        if tables.fail_on_commit {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }
        tables.orders.extend(self.orders);
        tables.items.extend(self.items);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ProductSnapshotRead for InMemoryTransaction {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        self.store.get_product(id).await
    }
}
