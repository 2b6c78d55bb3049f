// Webhook Feed Core
//
// This crate provides a DB-agnostic implementation of the webhook
// ingestion-and-broadcast pipeline (verify → normalize → dedup insert → publish).
//
// Key design decisions:
// - Uses traits (EventStore, EventPublisher) for pluggable backends
// - The broadcast hub is an actor: one task, one bounded mailbox, no shared map
// - Slow subscribers are evicted rather than slowing the hub down
// - Error handling distinguishes rejection categories (signature, validation,
//   parse, storage) so the transport can map them to responses

pub mod error;
pub mod event;
pub mod hub;
pub mod ingest;
pub mod normalize;
pub mod query;
pub mod signature;
pub mod traits;

// In-memory implementations for local runs and testing
pub mod memory;

// Re-exports for convenience
pub use error::{FeedError, Result};
pub use event::{Event, EventKind, NewEvent, MAX_BODY_LENGTH};
pub use hub::{BroadcastHub, EventFrame, HubConfig, HubHandle, SubscriberId, Subscription};
pub use ingest::{InboundDelivery, IngestOutcome, IngestionPipeline};
pub use normalize::normalize;
pub use query::{EventPage, PageRequest, Pagination, QueryService};
pub use traits::{EventPublisher, EventStore, InsertResult};
