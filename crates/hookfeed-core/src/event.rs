// Canonical event entity
//
// This type is both the stored row shape and the wire representation pushed
// to live subscribers. NewEvent is the pre-insert form produced by the
// normalizer; the store assigns id and created_at.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Maximum number of characters kept from an issue or pull request body.
pub const MAX_BODY_LENGTH: usize = 500;

/// Normalized category of an included notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// An issue was opened
    IssueOpened,
    /// A pull request was closed with its merged flag set
    PullRequestMerged,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::IssueOpened => "issue-opened",
            EventKind::PullRequestMerged => "pull-request-merged",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issue-opened" => Ok(EventKind::IssueOpened),
            "pull-request-merged" => Ok(EventKind::PullRequestMerged),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}

/// Event - a stored, ID-assigned notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Event {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Source-assigned delivery token (idempotency key).
    pub delivery_id: String,
    /// Normalized category.
    pub event_kind: EventKind,
    /// Notification type as received (e.g. "issues", "pull_request").
    pub source_kind: String,
    /// Normalized action ("opened" or "merged").
    pub action: String,
    /// Repository full name ("owner/repo").
    pub repo_name: String,
    pub sender_login: String,
    pub sender_avatar_url: Option<String>,
    pub title: Option<String>,
    /// Body, truncated to MAX_BODY_LENGTH characters.
    pub body: Option<String>,
    /// Canonical URL of the originating issue or pull request.
    pub link: String,
    pub occurred_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// NewEvent - a normalized event that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub delivery_id: String,
    pub event_kind: EventKind,
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

impl NewEvent {
    /// Attach storage-assigned fields
    pub fn into_stored(self, id: i64, created_at: DateTime<Utc>) -> Event {
        Event {
            id,
            delivery_id: self.delivery_id,
            event_kind: self.event_kind,
            source_kind: self.source_kind,
            action: self.action,
            repo_name: self.repo_name,
            sender_login: self.sender_login,
            sender_avatar_url: self.sender_avatar_url,
            title: self.title,
            body: self.body,
            link: self.link,
            occurred_at: self.occurred_at,
            received_at: self.received_at,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_round_trip_names() {
        assert_eq!(EventKind::IssueOpened.to_string(), "issue-opened");
        assert_eq!(
            "pull-request-merged".parse::<EventKind>().unwrap(),
            EventKind::PullRequestMerged
        );
        assert!("push".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_event_serialization() {
        let now = Utc::now();
        let event = NewEvent {
            delivery_id: "d-1".to_string(),
            event_kind: EventKind::IssueOpened,
            source_kind: "issues".to_string(),
            action: "opened".to_string(),
            repo_name: "octo/hello".to_string(),
            sender_login: "octocat".to_string(),
            sender_avatar_url: None,
            title: Some("Bug".to_string()),
            body: None,
            link: "https://github.com/octo/hello/issues/1".to_string(),
            occurred_at: now,
            received_at: now,
        }
        .into_stored(7, now);

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["event_kind"], "issue-opened");
        assert_eq!(json["source_kind"], "issues");
        assert!(json["sender_avatar_url"].is_null());
        assert!(json["body"].is_null());
        assert_eq!(json["title"], "Bug");
    }
}
