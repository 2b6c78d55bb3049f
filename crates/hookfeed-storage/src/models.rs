// Database models (internal, may differ from public DTOs)

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use hookfeed_core::{Event, EventKind, NewEvent};
use sqlx::FromRow;

/// Column list shared by every events query
pub(crate) const EVENT_COLUMNS: &str = "id, delivery_id, event_kind, source_kind, action, \
     repo_name, sender_login, sender_avatar_url, title, body, link, \
     occurred_at, received_at, created_at";

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub delivery_id: String,
    pub event_kind: String,
    pub source_kind: String,
    pub action: String,
    pub repo_name: String,
    pub sender_login: String,
    pub sender_avatar_url: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub link: String,
    pub occurred_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateEventRow {
    pub delivery_id: String,
    pub event_kind: String,
    pub source_kind: String,
    pub action: String,
    pub repo_name: String,
    pub sender_login: String,
    pub sender_avatar_url: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub link: String,
    pub occurred_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

impl From<NewEvent> for CreateEventRow {
    fn from(event: NewEvent) -> Self {
        Self {
            delivery_id: event.delivery_id,
            event_kind: event.event_kind.as_str().to_string(),
            source_kind: event.source_kind,
            action: event.action,
            repo_name: event.repo_name,
            sender_login: event.sender_login,
            sender_avatar_url: event.sender_avatar_url,
            title: event.title,
            body: event.body,
            link: event.link,
            occurred_at: event.occurred_at,
            received_at: event.received_at,
        }
    }
}

impl TryFrom<EventRow> for Event {
    type Error = anyhow::Error;

    fn try_from(row: EventRow) -> Result<Self> {
        let event_kind: EventKind = row
            .event_kind
            .parse()
            .map_err(|e: String| anyhow!("row {}: {}", row.id, e))?;

        Ok(Event {
            id: row.id,
            delivery_id: row.delivery_id,
            event_kind,
            source_kind: row.source_kind,
            action: row.action,
            repo_name: row.repo_name,
            sender_login: row.sender_login,
            sender_avatar_url: row.sender_avatar_url,
            title: row.title,
            body: row.body,
            link: row.link,
            occurred_at: row.occurred_at,
            received_at: row.received_at,
            created_at: row.created_at,
        })
    }
}
