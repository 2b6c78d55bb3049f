// In-memory implementations for local runs and testing
//
// These implementations keep all data in memory, which makes them useful for:
// - Running the API without a database
// - Unit and router tests

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::event::{Event, NewEvent};
use crate::traits::{EventPublisher, EventStore, InsertResult};

// ============================================================================
// InMemoryEventStore - Dedup store backed by a Vec
// ============================================================================

#[derive(Debug, Default)]
struct StoreInner {
    events: Vec<Event>,
    by_delivery: HashMap<String, usize>,
    next_id: i64,
}

/// In-memory event store
///
/// The fresh-vs-duplicate decision and the write happen under one write lock,
/// which gives the same at-most-one-row guarantee as the unique index in
/// Postgres.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryEventStore {
    /// Create a new in-memory event store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events
    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: NewEvent) -> Result<InsertResult> {
        let mut inner = self.inner.write().await;

        if let Some(&index) = inner.by_delivery.get(&event.delivery_id) {
            return Ok(InsertResult {
                event: inner.events[index].clone(),
                duplicate: true,
            });
        }

        inner.next_id += 1;
        let stored = event.into_stored(inner.next_id, Utc::now());
        let index = inner.events.len();
        inner
            .by_delivery
            .insert(stored.delivery_id.clone(), index);
        inner.events.push(stored.clone());

        Ok(InsertResult {
            event: stored,
            duplicate: false,
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Event>> {
        let inner = self.inner.read().await;
        Ok(inner.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list(
        &self,
        page: u32,
        per_page: u32,
        source_kind: Option<&str>,
    ) -> Result<(Vec<Event>, u64)> {
        let inner = self.inner.read().await;

        let mut matching: Vec<&Event> = inner
            .events
            .iter()
            .filter(|e| source_kind.map_or(true, |kind| e.source_kind == kind))
            .collect();
        matching.sort_by(|a, b| {
            b.received_at
                .cmp(&a.received_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let offset = (page.max(1) as usize - 1) * per_page as usize;
        let events = matching
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .cloned()
            .collect();

        Ok((events, total))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// RecordingPublisher - Collects published events
// ============================================================================

/// Publisher that records every event it receives
#[derive(Debug, Default, Clone)]
pub struct RecordingPublisher {
    events: Arc<RwLock<Vec<Event>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far
    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: Event) {
        self.events.write().await.push(event);
    }
}
