//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL and in-memory document stores
//! - **cache**: bounded TTL suppression cache
//! - **queue**: Tokio-backed deletion job queue
//! - **http**: identity provider, email and receipt verification clients
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cache;
pub mod http;
pub mod persistence;
pub mod queue;
