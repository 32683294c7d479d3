//! Storage backends for the Fluster URL shortener.

pub mod memory;
pub mod postgres;

pub use fluster_core::{Repository, StorageError, UrlRecord};
pub use memory::InMemoryRepository;
pub use postgres::{PostgresRepository, PostgresSettings};
pub use sqlx::postgres::PgSslMode;
