// Postgres storage layer with sqlx
//
// This crate provides database implementations for core traits:
// - DbEventStore: implements EventStore with unique-index deduplication

pub mod event_store;
pub mod models;
pub mod repositories;

pub use event_store::{create_db_event_store, DbEventStore};
pub use models::*;
pub use repositories::*;
