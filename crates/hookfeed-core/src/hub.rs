//! Broadcast hub
//!
//! A single spawned task owns the subscriber set. Register, unregister,
//! publish and count requests all arrive through one bounded mailbox, so the
//! subscriber map is never shared.
//!
//! Delivery is best-effort: each subscriber has a bounded buffer, and a
//! subscriber whose buffer is full when an event is published is evicted
//! (its stream ends, nothing is replayed).

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::event::Event;
use crate::traits::EventPublisher;

/// Default buffer size of each subscriber channel
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;
/// Default size of the hub mailbox
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Identifier assigned to each registered subscriber
pub type SubscriberId = u64;

/// Serialized event as delivered to subscribers
pub type EventFrame = Arc<str>;

// ============================================================================
// Configuration
// ============================================================================

/// Hub sizing
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Events buffered per subscriber before it is evicted
    pub subscriber_capacity: usize,
    /// Commands buffered in the hub mailbox before senders wait
    pub mailbox_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl HubConfig {
    /// Set the per-subscriber buffer size
    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Set the mailbox size
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }
}

// ============================================================================
// Hub worker
// ============================================================================

enum HubCommand {
    Register {
        id: SubscriberId,
        sender: mpsc::Sender<EventFrame>,
    },
    Unregister(SubscriberId),
    Publish(Event),
    Count(oneshot::Sender<usize>),
}

/// The hub task. Created and started with [`BroadcastHub::spawn`].
pub struct BroadcastHub {
    subscribers: HashMap<SubscriberId, mpsc::Sender<EventFrame>>,
    mailbox: mpsc::Receiver<HubCommand>,
    shutdown_rx: watch::Receiver<bool>,
}

impl BroadcastHub {
    /// Start the hub task and return a handle to it
    ///
    /// The task exits when [`HubHandle::shutdown`] is called or when every
    /// handle has been dropped. On exit all subscriber streams end.
    pub fn spawn(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (mailbox_tx, mailbox_rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let hub = BroadcastHub {
            subscribers: HashMap::new(),
            mailbox: mailbox_rx,
            shutdown_rx,
        };
        let task = tokio::spawn(hub.run());

        let handle = HubHandle {
            mailbox: mailbox_tx,
            next_id: Arc::new(AtomicU64::new(1)),
            subscriber_capacity: config.subscriber_capacity.max(1),
            shutdown_tx: Arc::new(shutdown_tx),
        };

        info!(
            subscriber_capacity = handle.subscriber_capacity,
            mailbox_capacity = config.mailbox_capacity,
            "Broadcast hub started"
        );

        (handle, task)
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.mailbox.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => {
                            debug!("Hub mailbox closed");
                            break;
                        }
                    }
                }
                _ = self.shutdown_rx.changed() => {
                    debug!("Hub: shutdown requested");
                    break;
                }
            }
        }

        let remaining = self.subscribers.len();
        self.subscribers.clear();
        info!(subscribers = remaining, "Broadcast hub stopped");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { id, sender } => {
                self.subscribers.insert(id, sender);
                debug!(
                    subscriber_id = id,
                    subscribers = self.subscribers.len(),
                    "Subscriber registered"
                );
            }
            HubCommand::Unregister(id) => {
                if self.subscribers.remove(&id).is_some() {
                    debug!(
                        subscriber_id = id,
                        subscribers = self.subscribers.len(),
                        "Subscriber unregistered"
                    );
                }
            }
            HubCommand::Publish(event) => self.publish(&event),
            HubCommand::Count(reply) => {
                // A dropped subscription whose unregister was lost stays in the
                // map until the next publish; it no longer counts.
                let live = self
                    .subscribers
                    .values()
                    .filter(|sender| !sender.is_closed())
                    .count();
                let _ = reply.send(live);
            }
        }
    }

    fn publish(&mut self, event: &Event) {
        let frame: EventFrame = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                error!(event_id = event.id, error = %e, "Failed to serialize event for broadcast");
                return;
            }
        };

        let mut evicted = Vec::new();
        let mut disconnected = Vec::new();

        for (id, sender) in &self.subscribers {
            match sender.try_send(Arc::clone(&frame)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => evicted.push(*id),
                Err(TrySendError::Closed(_)) => disconnected.push(*id),
            }
        }

        for id in evicted {
            // Dropping the sender ends the subscriber's stream
            self.subscribers.remove(&id);
            info!(
                subscriber_id = id,
                event_id = event.id,
                "Evicted slow subscriber"
            );
        }
        for id in disconnected {
            self.subscribers.remove(&id);
        }

        debug!(
            event_id = event.id,
            subscribers = self.subscribers.len(),
            "Event broadcast"
        );
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable handle used to talk to the hub task
#[derive(Clone)]
pub struct HubHandle {
    mailbox: mpsc::Sender<HubCommand>,
    next_id: Arc<AtomicU64>,
    subscriber_capacity: usize,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl HubHandle {
    /// Register a new subscriber
    ///
    /// The subscription receives every event published after the hub
    /// processes the registration. If the hub has stopped, the returned
    /// stream is already finished.
    pub async fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.subscriber_capacity);

        if self
            .mailbox
            .send(HubCommand::Register { id, sender })
            .await
            .is_err()
        {
            debug!(subscriber_id = id, "Hub stopped; subscription closed");
        }

        Subscription {
            id,
            receiver,
            mailbox: self.mailbox.clone(),
        }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub async fn unregister(&self, id: SubscriberId) {
        let _ = self.mailbox.send(HubCommand::Unregister(id)).await;
    }

    /// Hand an event to the hub for fan-out
    pub async fn publish(&self, event: Event) {
        let event_id = event.id;
        if self.mailbox.send(HubCommand::Publish(event)).await.is_err() {
            warn!(event_id, "Hub stopped; event not broadcast");
        }
    }

    /// Number of live subscribers (0 if the hub has stopped)
    ///
    /// Subscriptions that were dropped are not counted, even before the hub
    /// has removed them.
    pub async fn subscriber_count(&self) -> usize {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.mailbox.send(HubCommand::Count(reply_tx)).await.is_err() {
            return 0;
        }
        reply_rx.await.unwrap_or(0)
    }

    /// Ask the hub task to stop. All subscriber streams end.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[async_trait]
impl EventPublisher for HubHandle {
    async fn publish(&self, event: Event) {
        HubHandle::publish(self, event).await;
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A live stream of serialized events
///
/// Dropping the subscription unregisters it from the hub.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<EventFrame>,
    mailbox: mpsc::Sender<HubCommand>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Receive the next event; `None` once unregistered, evicted or the hub stopped
    pub async fn recv(&mut self) -> Option<EventFrame> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = EventFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // If the mailbox is full the next publish finds the closed receiver
        // and removes it.
        let _ = self.mailbox.try_send(HubCommand::Unregister(self.id));
    }
}
