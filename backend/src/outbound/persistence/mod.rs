//! Document persistence adapters.
//!
//! Two implementations of [`crate::domain::ports::DocumentStore`]:
//!
//! - [`DieselDocumentStore`]: PostgreSQL through `diesel-async` and a `bb8`
//!   pool, with serializable transactions.
//! - [`InMemoryDocumentStore`]: process-local, used when no database URL is
//!   configured and throughout the test suites.
//!
//! Row structs and the table definition are internal to this module.

mod diesel_document_store;
mod in_memory_document_store;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_document_store::DieselDocumentStore;
pub use in_memory_document_store::{DEFAULT_MAX_ATTEMPTS, InMemoryDocumentStore};
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
