//! Order creation workflow.
//!
//! An order is created in three steps:
//! - the request is checked for shape ([`OrderRequest`]),
//! - every line is resolved against the product authority ([`validate`]),
//! - header and lines are written in one transaction ([`OrderService`]).
//!
//! Where the product authority lives is decided by a [`ProductAuthority`]:
//! [`LocalCatalog`] reads products inside the order transaction,
//! [`RemoteCatalog`] asks a remote catalog before the transaction opens.

pub mod authority;
pub mod catalog_client;
pub mod error;
pub mod lookup;
pub mod phase;
pub mod request;
pub mod service;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use authority::{LocalCatalog, ProductAuthority, RemoteCatalog, Resolved};
pub use catalog_client::{DEFAULT_LOOKUP_TIMEOUT, HttpCatalogClient};
pub use error::OrderError;
pub use lookup::{LookupError, ProductLookup, TransactionalLookup};
pub use phase::CreationPhase;
pub use request::{OrderLine, OrderLineInput, OrderRequest};
pub use service::OrderService;
pub use validator::{ValidatedOrder, validate};
