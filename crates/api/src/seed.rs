//! Demo data for local runs.

use auth::{AuthError, AuthService};
use common::Money;
use store::{NewProduct, ProductRepository, SessionRepository, UserRepository};

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "password123";

/// Demo catalog: name, price in cents, stock.
const DEMO_PRODUCTS: &[(&str, i64, i32)] = &[
    ("Laptop", 99_999, 10),
    ("Mouse", 2_599, 50),
    ("Keyboard", 7_999, 30),
    ("Monitor", 24_999, 15),
    ("Headphones", 14_999, 25),
];

/// Registers the demo user unless it already exists.
pub async fn seed_demo_user<S>(auth: &AuthService<S>) -> Result<(), AuthError>
where
    S: UserRepository + SessionRepository,
{
    match auth.register(DEMO_EMAIL, DEMO_PASSWORD).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, email = DEMO_EMAIL, "seeded demo user");
            Ok(())
        }
        Err(AuthError::EmailTaken(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Fills an empty catalog with the demo products.
pub async fn seed_demo_products<S>(store: &S) -> store::Result<()>
where
    S: ProductRepository,
{
    if !store.list_products().await?.is_empty() {
        return Ok(());
    }

    for &(name, cents, stock) in DEMO_PRODUCTS {
        store
            .insert_product(NewProduct::new(name, Money::from_cents(cents), stock))
            .await?;
    }
    tracing::info!(count = DEMO_PRODUCTS.len(), "seeded demo products");
    Ok(())
}
