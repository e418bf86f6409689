//! Storage layer for the storefront services.
//!
//! Every service talks to its data through the traits in [`repository`].
//! Two backends implement them with the same transactional semantics:
//! [`PostgresStore`] for deployments and [`InMemoryStore`] for tests and the
//! database-less development mode.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::{PoolOptions, PostgresStore, PostgresTransaction};
pub use repository::{
    Database, NewProduct, OrderHeader, OrderStore, OrderTransaction, ProductRepository,
    ProductSnapshotRead, Session, SessionRepository, UserCredentials, UserRepository,
};
