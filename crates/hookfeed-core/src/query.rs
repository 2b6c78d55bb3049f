// Query service
//
// Paginated history and point lookup over an EventStore.
// Decision: Out-of-range pagination values fall back to defaults instead of
// being rejected, so a bad query string never produces an error response.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::Result;
use crate::event::Event;
use crate::traits::EventStore;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Page request after clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Clamp raw values: page < 1 becomes 1, per_page outside 1..=100 becomes 20
    pub fn clamp(page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => DEFAULT_PAGE,
        };
        let per_page = match per_page {
            Some(n) if (1..=MAX_PER_PAGE as i64).contains(&n) => n as u32,
            _ => DEFAULT_PER_PAGE,
        };
        Self { page, per_page }
    }

    /// Parse raw query-string values; anything that is not an integer uses the default
    pub fn from_query(page: Option<&str>, per_page: Option<&str>) -> Self {
        Self::clamp(
            page.and_then(|s| s.trim().parse().ok()),
            per_page.and_then(|s| s.trim().parse().ok()),
        )
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Pagination metadata returned alongside a page of events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages: total_pages(total, request.per_page),
        }
    }
}

/// ceil(total / per_page)
pub fn total_pages(total: u64, per_page: u32) -> u64 {
    let per_page = u64::from(per_page.max(1));
    total.div_ceil(per_page)
}

/// One page of events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct EventPage {
    pub events: Vec<Event>,
    pub pagination: Pagination,
}

/// Read-side access to stored events
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn EventStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// List events newest first, optionally filtered by source kind
    pub async fn list(&self, request: PageRequest, source_kind: Option<&str>) -> Result<EventPage> {
        let source_kind = source_kind.filter(|s| !s.is_empty());
        let (events, total) = self
            .store
            .list(request.page, request.per_page, source_kind)
            .await?;

        Ok(EventPage {
            events,
            pagination: Pagination::new(request, total),
        })
    }

    /// Point lookup; `None` for an unknown id
    pub async fn get(&self, id: i64) -> Result<Option<Event>> {
        self.store.get(id).await
    }
}
