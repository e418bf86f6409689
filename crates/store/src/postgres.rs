use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, Order, OrderId, OrderItem, Product, ProductId, User, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    repository::{
        Database, NewProduct, OrderHeader, OrderStore, OrderTransaction, ProductRepository,
        ProductSnapshotRead, Session, SessionRepository, UserCredentials, UserRepository,
    },
};

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// PostgreSQL-backed store implementation.
///
/// Owns the connection pool for the whole process. Create it once at startup,
/// hand clones to the components that need it and call [`close`](Self::close)
/// on shutdown.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`.
    pub async fn connect(database_url: &str, options: &PoolOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await?;
        tracing::info!(
            max_connections = options.max_connections,
            "connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get("stock")?,
        })
    }
}

fn quantity_to_column(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::Backend(format!("quantity {quantity} does not fit the column")))
}

fn quantity_from_column(quantity: i32) -> Result<u32> {
    u32::try_from(quantity)
        .map_err(|_| StoreError::Backend(format!("stored quantity {quantity} is negative")))
}

#[async_trait]
impl Database for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for PostgresStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT id, name, price_cents, stock FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, price_cents, stock FROM products WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price_cents, stock)
            VALUES ($1, $2, $3)
            RETURNING id, name, price_cents, stock
            "#,
        )
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn find_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let row = sqlx::query("SELECT id, email, password_hash FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(UserCredentials {
                user: User {
                    id: UserId::new(row.try_get("id")?),
                    email: row.try_get("email")?,
                },
                password_hash: row.try_get("password_hash")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email FROM users WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(User {
                id: UserId::new(row.try_get("id")?),
                email: row.try_get("email")?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id, email",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict(format!("email {email} is already registered"));
            }
            StoreError::Database(e)
        })?;

        Ok(User {
            id: UserId::new(row.try_get("id")?),
            email: row.try_get("email")?,
        })
    }
}

#[async_trait]
impl SessionRepository for PostgresStore {
    async fn insert_session(&self, session: Session) -> Result<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session.token)
            .bind(session.user_id.get())
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session(&self, token: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT token, user_id, expires_at FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Session {
                token: row.try_get("token")?,
                user_id: UserId::new(row.try_get("user_id")?),
                expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, token: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        Ok(PostgresTransaction {
            tx: self.pool.begin().await?,
        })
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let order_rows = sqlx::query(
            r#"
            SELECT id, user_id, total_cents, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(order_rows.len());
        for row in order_rows {
            orders.push(Order {
                id: OrderId::new(row.try_get("id")?),
                user_id: UserId::new(row.try_get("user_id")?),
                total: Money::from_cents(row.try_get("total_cents")?),
                created_at: row.try_get("created_at")?,
                items: Vec::new(),
            });
        }

        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id.get()).collect();
        let item_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, unit_price_cents, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id: i64 = row.try_get("order_id")?;
            items_by_order.entry(order_id).or_default().push(OrderItem {
                product_id: ProductId::new(row.try_get("product_id")?),
                product_name: row.try_get("product_name")?,
                unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                quantity: quantity_from_column(row.try_get("quantity")?)?,
            });
        }

        for order in &mut orders {
            order.items = items_by_order.remove(&order.id.get()).unwrap_or_default();
        }

        Ok(orders)
    }
}

/// An open PostgreSQL transaction. Dropping it without committing rolls back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PostgresTransaction {
    async fn insert_order(&mut self, user_id: UserId, total: Money) -> Result<OrderHeader> {
        let row = sqlx::query(
            "INSERT INTO orders (user_id, total_cents) VALUES ($1, $2) RETURNING id, created_at",
        )
        .bind(user_id.get())
        .bind(total.cents())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(OrderHeader {
            id: OrderId::new(row.try_get("id")?),
            created_at: row.try_get("created_at")?,
        })
    }

    async fn insert_item(&mut self, order_id: OrderId, item: &OrderItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, product_name, unit_price_cents, quantity)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id.get())
        .bind(item.product_id.get())
        .bind(&item.product_name)
        .bind(item.unit_price.cents())
        .bind(quantity_to_column(item.quantity)?)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl ProductSnapshotRead for PostgresTransaction {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, price_cents, stock FROM products WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(PostgresStore::row_to_product).transpose()
    }
}
