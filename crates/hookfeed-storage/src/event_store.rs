// Database-backed EventStore implementation
//
// Storage errors are mapped to FeedError::Storage at this boundary; callers
// never see sqlx or anyhow types.

use async_trait::async_trait;
use hookfeed_core::{Event, EventStore, FeedError, InsertResult, NewEvent, Result};

use crate::models::CreateEventRow;
use crate::repositories::Database;

// ============================================================================
// DbEventStore - Stores events in Postgres
// ============================================================================

/// Database-backed event store
///
/// Deduplication relies on the unique index on `events.delivery_id`.
#[derive(Clone)]
pub struct DbEventStore {
    db: Database,
}

impl DbEventStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn storage_error(e: anyhow::Error) -> FeedError {
    FeedError::storage(format!("{e:#}"))
}

#[async_trait]
impl EventStore for DbEventStore {
    async fn insert(&self, event: NewEvent) -> Result<InsertResult> {
        let (row, duplicate) = self
            .db
            .insert_event(CreateEventRow::from(event))
            .await
            .map_err(storage_error)?;

        Ok(InsertResult {
            event: Event::try_from(row).map_err(storage_error)?,
            duplicate,
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Event>> {
        self.db
            .get_event(id)
            .await
            .map_err(storage_error)?
            .map(Event::try_from)
            .transpose()
            .map_err(storage_error)
    }

    async fn list(
        &self,
        page: u32,
        per_page: u32,
        source_kind: Option<&str>,
    ) -> Result<(Vec<Event>, u64)> {
        let limit = i64::from(per_page);
        let offset = i64::from(page.max(1) - 1) * limit;

        let total = self
            .db
            .count_events(source_kind)
            .await
            .map_err(storage_error)?;
        let rows = self
            .db
            .list_events(source_kind, limit, offset)
            .await
            .map_err(storage_error)?;

        let events = rows
            .into_iter()
            .map(Event::try_from)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(storage_error)?;

        Ok((events, total.max(0) as u64))
    }

    async fn health_check(&self) -> Result<()> {
        self.db.ping().await.map_err(storage_error)
    }
}

/// Create a DbEventStore from a database
pub fn create_db_event_store(db: Database) -> DbEventStore {
    DbEventStore::new(db)
}
