// Core traits for pluggable backends
//
// These traits keep the ingestion pipeline independent of its collaborators:
// - EventStore: Postgres in production, in-memory for tests and local runs
// - EventPublisher: the broadcast hub in production, a recorder in tests

use async_trait::async_trait;

use crate::error::Result;
use crate::event::{Event, NewEvent};

// ============================================================================
// EventStore - Dedup-aware persistence
// ============================================================================

/// Result of an insert-with-dedup
#[derive(Debug, Clone, PartialEq)]
pub struct InsertResult {
    /// The stored row. On duplicate this is the originally stored event.
    pub event: Event,
    /// True when the delivery id was already present and nothing was written
    pub duplicate: bool,
}

/// Persistence contract for canonical events
///
/// A delivery id maps to at most one stored event for the lifetime of the
/// store. `insert` must decide fresh vs duplicate atomically; a
/// check-then-insert sequence is not acceptable.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert an event unless its delivery id is already stored
    async fn insert(&self, event: NewEvent) -> Result<InsertResult>;

    /// Get an event by ID
    async fn get(&self, id: i64) -> Result<Option<Event>>;

    /// List events, newest first (received_at DESC, id DESC)
    ///
    /// `source_kind` filters on the raw notification type. Returns the page
    /// and the total number of matching events.
    async fn list(
        &self,
        page: u32,
        per_page: u32,
        source_kind: Option<&str>,
    ) -> Result<(Vec<Event>, u64)>;

    /// Check that the backing store is reachable
    async fn health_check(&self) -> Result<()>;
}

// ============================================================================
// EventPublisher - Live fan-out of freshly stored events
// ============================================================================

/// Sink for events that were just stored for the first time
///
/// Publishing is best-effort: implementations absorb their own failures so
/// a stored event is never reported as failed because of fan-out.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: Event);
}
