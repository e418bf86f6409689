use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, Order, OrderId, OrderItem, Product, ProductId, User, UserId};
use uuid::Uuid;

use crate::Result;

/// A product to be added to the catalog.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: i32,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Money, stock: i32) -> Self {
        Self {
            name: name.into(),
            price,
            stock,
        }
    }
}

/// A user together with the stored password hash.
///
/// Only the auth service reads this; everything else sees [`User`].
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A server-side login session addressed by an opaque bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: Uuid,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns true once the session may no longer be used.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Store-assigned identity of a freshly inserted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderHeader {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
}

/// Connectivity probe used by health endpoints.
#[async_trait]
pub trait Database: Send + Sync {
    /// Round-trips a trivial query.
    async fn ping(&self) -> Result<()>;
}

/// Read access to the catalog, plus inserts for seeding.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Lists every product ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Fetches one product, or `None` when it does not exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Adds a product and returns it with its assigned id.
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;
}

/// User accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Looks up a user and their password hash by email.
    async fn find_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>>;

    /// Looks up a user by id.
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;

    /// Creates a user. Fails with [`StoreError::Conflict`](crate::StoreError::Conflict)
    /// when the email is already registered.
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User>;
}

/// Login sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, session: Session) -> Result<()>;

    async fn find_session(&self, token: Uuid) -> Result<Option<Session>>;

    /// Removes one session. Removing an unknown token is not an error.
    async fn delete_session(&self, token: Uuid) -> Result<()>;

    /// Removes every session expired at `now` and returns how many went.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Orders and their items.
///
/// Writes only happen through an [`OrderTransaction`]; nothing written inside
/// one is visible to other readers before it commits.
#[async_trait]
pub trait OrderStore: Send + Sync {
    type Transaction: OrderTransaction;

    /// Opens a new write transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Lists a user's committed orders, newest first, items in insertion order.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}

/// An open order write transaction.
///
/// Must end in [`commit`](Self::commit) or [`rollback`](Self::rollback);
/// dropping it unfinished discards its writes.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Inserts the order header and returns its generated id and timestamp.
    async fn insert_order(&mut self, user_id: UserId, total: Money) -> Result<OrderHeader>;

    /// Inserts one line of a previously inserted order.
    async fn insert_item(&mut self, order_id: OrderId, item: &OrderItem) -> Result<()>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Catalog reads that take part in an open order transaction.
///
/// Only available when products and orders share one database.
#[async_trait]
pub trait ProductSnapshotRead: Send {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>>;
}
