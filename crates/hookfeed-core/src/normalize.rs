// Payload normalizer
//
// Maps raw GitHub notification payloads into zero-or-one NewEvent.
// Decision: Only `issues` (opened) and `pull_request` (closed + merged) are kept;
// every other notification type is ignored, not rejected.
// Decision: Payload structs default every field, and an explicit `null` reads as
// the default, so sparse payloads still parse; only malformed JSON is a parse error.

use chrono::Utc;
use serde::{Deserialize, Deserializer};

use crate::error::{FeedError, Result};
use crate::event::{EventKind, NewEvent, MAX_BODY_LENGTH};

/// Notification type for issue activity
pub const SOURCE_ISSUES: &str = "issues";
/// Notification type for pull request activity
pub const SOURCE_PULL_REQUEST: &str = "pull_request";

// ============================================================================
// Payload shapes (only the fields we read)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Repository {
    #[serde(deserialize_with = "null_as_default")]
    full_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Sender {
    #[serde(deserialize_with = "null_as_default")]
    login: String,
    avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Issue {
    title: Option<String>,
    body: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    html_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PullRequest {
    title: Option<String>,
    body: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    html_url: String,
    #[serde(deserialize_with = "null_as_default")]
    merged: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IssuesPayload {
    #[serde(deserialize_with = "null_as_default")]
    action: String,
    #[serde(deserialize_with = "null_as_default")]
    issue: Issue,
    #[serde(deserialize_with = "null_as_default")]
    repository: Repository,
    #[serde(deserialize_with = "null_as_default")]
    sender: Sender,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PullRequestPayload {
    #[serde(deserialize_with = "null_as_default")]
    action: String,
    #[serde(deserialize_with = "null_as_default")]
    pull_request: PullRequest,
    #[serde(deserialize_with = "null_as_default")]
    repository: Repository,
    #[serde(deserialize_with = "null_as_default")]
    sender: Sender,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize one delivery into a canonical event.
///
/// Returns `Ok(None)` for notifications that are not included (unknown
/// source kinds, issues not opened, pull requests closed without merge).
pub fn normalize(
    delivery_id: &str,
    source_kind: &str,
    raw_payload: &[u8],
) -> Result<Option<NewEvent>> {
    match source_kind {
        SOURCE_ISSUES => normalize_issue(delivery_id, raw_payload),
        SOURCE_PULL_REQUEST => normalize_pull_request(delivery_id, raw_payload),
        _ => Ok(None),
    }
}

fn normalize_issue(delivery_id: &str, raw_payload: &[u8]) -> Result<Option<NewEvent>> {
    let payload: IssuesPayload = serde_json::from_slice(raw_payload)
        .map_err(|e| FeedError::parse(SOURCE_ISSUES, e))?;

    if payload.action != "opened" {
        return Ok(None);
    }

    let now = Utc::now();
    Ok(Some(NewEvent {
        delivery_id: delivery_id.to_string(),
        event_kind: EventKind::IssueOpened,
        source_kind: SOURCE_ISSUES.to_string(),
        action: "opened".to_string(),
        repo_name: payload.repository.full_name,
        sender_login: payload.sender.login,
        sender_avatar_url: non_empty(payload.sender.avatar_url),
        title: non_empty(payload.issue.title),
        body: non_empty(payload.issue.body).map(truncate_body),
        link: payload.issue.html_url,
        occurred_at: now,
        received_at: now,
    }))
}

fn normalize_pull_request(delivery_id: &str, raw_payload: &[u8]) -> Result<Option<NewEvent>> {
    let payload: PullRequestPayload = serde_json::from_slice(raw_payload)
        .map_err(|e| FeedError::parse(SOURCE_PULL_REQUEST, e))?;

    if payload.action != "closed" || !payload.pull_request.merged {
        return Ok(None);
    }

    let now = Utc::now();
    Ok(Some(NewEvent {
        delivery_id: delivery_id.to_string(),
        event_kind: EventKind::PullRequestMerged,
        source_kind: SOURCE_PULL_REQUEST.to_string(),
        action: "merged".to_string(),
        repo_name: payload.repository.full_name,
        sender_login: payload.sender.login,
        sender_avatar_url: non_empty(payload.sender.avatar_url),
        title: non_empty(payload.pull_request.title),
        body: non_empty(payload.pull_request.body).map(truncate_body),
        link: payload.pull_request.html_url,
        occurred_at: now,
        received_at: now,
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Keep at most MAX_BODY_LENGTH characters, no ellipsis.
fn truncate_body(body: String) -> String {
    match body.char_indices().nth(MAX_BODY_LENGTH) {
        Some((byte_idx, _)) => body[..byte_idx].to_string(),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_payload(action: &str, body: Option<&str>) -> Vec<u8> {
        json!({
            "action": action,
            "issue": {
                "title": "Crash on startup",
                "body": body,
                "html_url": "https://github.com/octo/hello/issues/42"
            },
            "repository": { "full_name": "octo/hello" },
            "sender": {
                "login": "octocat",
                "avatar_url": "https://avatars.githubusercontent.com/u/1"
            }
        })
        .to_string()
        .into_bytes()
    }

    fn pr_payload(action: &str, merged: bool) -> Vec<u8> {
        json!({
            "action": action,
            "pull_request": {
                "title": "Add feature",
                "body": "",
                "html_url": "https://github.com/octo/hello/pull/7",
                "merged": merged
            },
            "repository": { "full_name": "octo/hello" },
            "sender": { "login": "hubot", "avatar_url": "" }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_issue_opened_included() {
        let event = normalize("d-1", "issues", &issue_payload("opened", Some("trace")))
            .unwrap()
            .expect("opened issue should be included");

        assert_eq!(event.delivery_id, "d-1");
        assert_eq!(event.event_kind, EventKind::IssueOpened);
        assert_eq!(event.source_kind, "issues");
        assert_eq!(event.action, "opened");
        assert_eq!(event.repo_name, "octo/hello");
        assert_eq!(event.sender_login, "octocat");
        assert_eq!(
            event.sender_avatar_url.as_deref(),
            Some("https://avatars.githubusercontent.com/u/1")
        );
        assert_eq!(event.title.as_deref(), Some("Crash on startup"));
        assert_eq!(event.body.as_deref(), Some("trace"));
        assert_eq!(event.link, "https://github.com/octo/hello/issues/42");
        assert_eq!(event.occurred_at, event.received_at);
    }

    #[test]
    fn test_issue_other_actions_ignored() {
        for action in ["closed", "edited", "labeled", "reopened"] {
            let result = normalize("d-1", "issues", &issue_payload(action, None)).unwrap();
            assert!(result.is_none(), "action {action} should be ignored");
        }
    }

    #[test]
    fn test_pull_request_merged_included() {
        let event = normalize("d-2", "pull_request", &pr_payload("closed", true))
            .unwrap()
            .expect("merged pull request should be included");

        assert_eq!(event.event_kind, EventKind::PullRequestMerged);
        assert_eq!(event.action, "merged");
        assert_eq!(event.source_kind, "pull_request");
        assert_eq!(event.link, "https://github.com/octo/hello/pull/7");
        // Empty strings normalize to absent
        assert!(event.body.is_none());
        assert!(event.sender_avatar_url.is_none());
    }

    #[test]
    fn test_pull_request_closed_without_merge_ignored() {
        let result = normalize("d-2", "pull_request", &pr_payload("closed", false)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_pull_request_opened_ignored() {
        let result = normalize("d-2", "pull_request", &pr_payload("opened", false)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_unknown_source_kind_ignored() {
        // Not even parsed
        let result = normalize("d-3", "push", b"not json").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = normalize("d-4", "issues", b"{\"action\": ").unwrap_err();
        assert_eq!(err.category(), "parse");

        let err = normalize("d-4", "pull_request", b"not json").unwrap_err();
        assert_eq!(err.category(), "parse");
    }

    #[test]
    fn test_missing_fields_default() {
        let event = normalize("d-5", "issues", br#"{"action":"opened"}"#)
            .unwrap()
            .unwrap();

        assert_eq!(event.repo_name, "");
        assert_eq!(event.sender_login, "");
        assert_eq!(event.link, "");
        assert!(event.title.is_none());
        assert!(event.body.is_none());
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let payload = json!({
            "action": "closed",
            "pull_request": {
                "title": null,
                "body": null,
                "html_url": null,
                "merged": null
            },
            "repository": { "full_name": null },
            "sender": null
        });
        let result = normalize("d-7", "pull_request", payload.to_string().as_bytes()).unwrap();
        // merged: null counts as not merged
        assert!(result.is_none());

        let payload = json!({
            "action": "opened",
            "issue": { "title": "Crash", "html_url": null },
            "repository": null,
            "sender": null
        });
        let event = normalize("d-8", "issues", payload.to_string().as_bytes())
            .unwrap()
            .expect("opened issue should be included");
        assert_eq!(event.repo_name, "");
        assert_eq!(event.sender_login, "");
        assert!(event.sender_avatar_url.is_none());
        assert_eq!(event.link, "");
        assert_eq!(event.title.as_deref(), Some("Crash"));
    }

    #[test]
    fn test_merged_pull_request_with_null_sender_included() {
        let payload = json!({
            "action": "closed",
            "pull_request": { "title": "Fix", "merged": true },
            "repository": { "full_name": "octo/hello" },
            "sender": null
        });
        let event = normalize("d-9", "pull_request", payload.to_string().as_bytes())
            .unwrap()
            .expect("merged pull request should be included");
        assert_eq!(event.repo_name, "octo/hello");
        assert_eq!(event.sender_login, "");
    }

    #[test]
    fn test_body_truncated_to_max_length() {
        let long = "a".repeat(MAX_BODY_LENGTH + 250);
        let event = normalize("d-6", "issues", &issue_payload("opened", Some(&long)))
            .unwrap()
            .unwrap();

        let body = event.body.unwrap();
        assert_eq!(body.chars().count(), MAX_BODY_LENGTH);
        assert!(!body.ends_with("..."));
    }

    #[test]
    fn test_body_truncation_respects_char_boundaries() {
        let long = "é".repeat(MAX_BODY_LENGTH + 1);
        let truncated = truncate_body(long);
        assert_eq!(truncated.chars().count(), MAX_BODY_LENGTH);

        let short = "short body".to_string();
        assert_eq!(truncate_body(short.clone()), short);
    }
}
