// Ingestion pipeline
//
// verify -> validate -> normalize -> dedup insert -> publish, for one delivery.
// Decision: The publisher is injected at construction; there is no global
// broadcast callback.
// Decision: Storage write and publish are not transactional. A stored event
// that fails to broadcast is still reported as received.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{FeedError, Result};
use crate::normalize::normalize;
use crate::signature;
use crate::traits::{EventPublisher, EventStore};

/// One inbound webhook delivery as received by the transport
#[derive(Debug, Clone)]
pub struct InboundDelivery {
    /// Exact request body bytes
    pub raw_payload: Vec<u8>,
    /// Value of the signature header (empty if absent)
    pub signature: String,
    /// Value of the delivery id header (empty if absent)
    pub delivery_id: String,
    /// Value of the event type header (empty if absent)
    pub source_kind: String,
}

/// What happened to a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The notification is not one we keep; nothing was stored
    Ignored,
    /// The delivery id was already stored; nothing was written or broadcast
    Duplicate,
    /// Stored for the first time and handed to the broadcast hub
    Received(i64),
}

impl IngestOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            IngestOutcome::Ignored => "ignored",
            IngestOutcome::Duplicate => "duplicate",
            IngestOutcome::Received(_) => "received",
        }
    }

    pub fn event_id(&self) -> Option<i64> {
        match self {
            IngestOutcome::Received(id) => Some(*id),
            _ => None,
        }
    }
}

/// Runs one delivery through the pipeline
#[derive(Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn EventStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn EventStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Ingest one delivery
    ///
    /// The signature is checked against the raw bytes before anything else;
    /// an unsigned or mis-signed delivery never touches storage.
    pub async fn ingest(
        &self,
        delivery: &InboundDelivery,
        shared_secret: &[u8],
    ) -> Result<IngestOutcome> {
        if !signature::verify(&delivery.raw_payload, &delivery.signature, shared_secret) {
            return Err(FeedError::Unauthorized);
        }

        if delivery.delivery_id.is_empty() || delivery.source_kind.is_empty() {
            return Err(FeedError::validation("missing required headers"));
        }

        let Some(event) = normalize(
            &delivery.delivery_id,
            &delivery.source_kind,
            &delivery.raw_payload,
        )?
        else {
            debug!(
                delivery_id = %delivery.delivery_id,
                source_kind = %delivery.source_kind,
                "Delivery ignored"
            );
            return Ok(IngestOutcome::Ignored);
        };

        let inserted = self.store.insert(event).await.map_err(|e| {
            warn!(delivery_id = %delivery.delivery_id, error = %e, "Failed to store event");
            e
        })?;

        if inserted.duplicate {
            info!(
                delivery_id = %delivery.delivery_id,
                event_id = inserted.event.id,
                "Duplicate delivery"
            );
            return Ok(IngestOutcome::Duplicate);
        }

        let event_id = inserted.event.id;
        info!(
            delivery_id = %delivery.delivery_id,
            event_id,
            event_kind = %inserted.event.event_kind,
            "Event stored"
        );
        self.publisher.publish(inserted.event).await;

        Ok(IngestOutcome::Received(event_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, NewEvent};
    use crate::memory::{InMemoryEventStore, RecordingPublisher};
    use crate::traits::InsertResult;
    use async_trait::async_trait;
    use serde_json::json;

    const SECRET: &[u8] = b"test-secret";

    fn pipeline() -> (IngestionPipeline, InMemoryEventStore, RecordingPublisher) {
        let store = InMemoryEventStore::new();
        let publisher = RecordingPublisher::new();
        let pipeline = IngestionPipeline::new(Arc::new(store.clone()), Arc::new(publisher.clone()));
        (pipeline, store, publisher)
    }

    fn delivery(delivery_id: &str, source_kind: &str, payload: serde_json::Value) -> InboundDelivery {
        let raw_payload = payload.to_string().into_bytes();
        InboundDelivery {
            signature: signature::sign(&raw_payload, SECRET),
            raw_payload,
            delivery_id: delivery_id.to_string(),
            source_kind: source_kind.to_string(),
        }
    }

    fn opened_issue() -> serde_json::Value {
        json!({
            "action": "opened",
            "issue": { "title": "Bug", "body": "details", "html_url": "https://github.com/o/r/issues/1" },
            "repository": { "full_name": "o/r" },
            "sender": { "login": "octocat" }
        })
    }

    #[tokio::test]
    async fn test_received_then_duplicate() {
        let (pipeline, store, publisher) = pipeline();
        let d = delivery("abc-123", "issues", opened_issue());

        let first = pipeline.ingest(&d, SECRET).await.unwrap();
        let second = pipeline.ingest(&d, SECRET).await.unwrap();

        let IngestOutcome::Received(id) = first else {
            panic!("expected Received, got {first:?}");
        };
        assert_eq!(second, IngestOutcome::Duplicate);
        assert_eq!(store.len().await, 1);
        assert_eq!(publisher.count().await, 1);
        assert_eq!(publisher.events().await[0].id, id);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected_before_storage() {
        let (pipeline, store, publisher) = pipeline();
        let mut d = delivery("abc", "issues", opened_issue());
        d.signature = signature::sign(&d.raw_payload, b"wrong-secret");

        let err = pipeline.ingest(&d, SECRET).await.unwrap_err();

        assert!(matches!(err, FeedError::Unauthorized));
        assert!(store.is_empty().await);
        assert_eq!(publisher.count().await, 0);
    }

    #[tokio::test]
    async fn test_signature_checked_before_headers() {
        let (pipeline, _, _) = pipeline();
        let mut d = delivery("", "", opened_issue());
        d.signature = String::new();

        let err = pipeline.ingest(&d, SECRET).await.unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized));
    }

    #[tokio::test]
    async fn test_missing_headers_is_validation_error() {
        let (pipeline, store, _) = pipeline();

        let err = pipeline
            .ingest(&delivery("", "issues", opened_issue()), SECRET)
            .await
            .unwrap_err();
        assert_eq!(err.category(), "validation");

        let err = pipeline
            .ingest(&delivery("abc", "", opened_issue()), SECRET)
            .await
            .unwrap_err();
        assert_eq!(err.category(), "validation");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_ignored_delivery_not_stored() {
        let (pipeline, store, publisher) = pipeline();

        let closed = json!({ "action": "closed", "issue": {}, "repository": {}, "sender": {} });
        let outcome = pipeline
            .ingest(&delivery("d-1", "issues", closed), SECRET)
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Ignored);

        let push = json!({ "ref": "refs/heads/main" });
        let outcome = pipeline
            .ingest(&delivery("d-2", "push", push), SECRET)
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Ignored);

        assert!(store.is_empty().await);
        assert_eq!(publisher.count().await, 0);
    }

    #[tokio::test]
    async fn test_parse_error_stores_nothing() {
        let (pipeline, store, _) = pipeline();
        let raw_payload = b"{ not json".to_vec();
        let d = InboundDelivery {
            signature: signature::sign(&raw_payload, SECRET),
            raw_payload,
            delivery_id: "d-1".to_string(),
            source_kind: "pull_request".to_string(),
        };

        let err = pipeline.ingest(&d, SECRET).await.unwrap_err();

        assert_eq!(err.category(), "parse");
        assert!(store.is_empty().await);
    }

    struct FailingStore;

    #[async_trait]
    impl EventStore for FailingStore {
        async fn insert(&self, _event: NewEvent) -> Result<InsertResult> {
            Err(FeedError::storage("connection refused"))
        }

        async fn get(&self, _id: i64) -> Result<Option<Event>> {
            Ok(None)
        }

        async fn list(
            &self,
            _page: u32,
            _per_page: u32,
            _source_kind: Option<&str>,
        ) -> Result<(Vec<Event>, u64)> {
            Ok((vec![], 0))
        }

        async fn health_check(&self) -> Result<()> {
            Err(FeedError::storage("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_propagates_without_publish() {
        let publisher = RecordingPublisher::new();
        let pipeline = IngestionPipeline::new(Arc::new(FailingStore), Arc::new(publisher.clone()));

        let err = pipeline
            .ingest(&delivery("d-1", "issues", opened_issue()), SECRET)
            .await
            .unwrap_err();

        assert_eq!(err.category(), "storage");
        assert_eq!(publisher.count().await, 0);
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(IngestOutcome::Ignored.status(), "ignored");
        assert_eq!(IngestOutcome::Duplicate.event_id(), None);
        assert_eq!(IngestOutcome::Received(5).event_id(), Some(5));
    }
}
