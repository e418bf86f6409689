//! Shared types for the storefront: identifiers, money and the records that
//! cross crate boundaries.

pub mod records;
pub mod types;

pub use records::{Order, OrderItem, Product, User};
pub use types::{Money, OrderId, ProductId, UserId};
