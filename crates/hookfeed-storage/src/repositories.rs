// Repository layer for database operations

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Round-trip a trivial query
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Events
    // ============================================

    /// Insert unless the delivery id already exists.
    ///
    /// Returns the stored row and whether it was a duplicate. The conflict
    /// decision is made by the unique index in one statement; the follow-up
    /// read only runs when nothing was inserted.
    pub async fn insert_event(&self, input: CreateEventRow) -> Result<(EventRow, bool)> {
        let inserted = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (delivery_id, event_kind, source_kind, action, repo_name,
                                sender_login, sender_avatar_url, title, body, link,
                                occurred_at, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (delivery_id) DO NOTHING
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(&input.delivery_id)
        .bind(&input.event_kind)
        .bind(&input.source_kind)
        .bind(&input.action)
        .bind(&input.repo_name)
        .bind(&input.sender_login)
        .bind(&input.sender_avatar_url)
        .bind(&input.title)
        .bind(&input.body)
        .bind(&input.link)
        .bind(input.occurred_at)
        .bind(input.received_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row, false));
        }

        let existing = self
            .get_event_by_delivery_id(&input.delivery_id)
            .await?
            .with_context(|| {
                format!(
                    "delivery {} conflicted but no stored row was found",
                    input.delivery_id
                )
            })?;

        Ok((existing, true))
    }

    pub async fn get_event(&self, id: i64) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_event_by_delivery_id(&self, delivery_id: &str) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE delivery_id = $1"
        ))
        .bind(delivery_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Newest first; `source_kind` of None matches everything
    pub async fn list_events(
        &self,
        source_kind: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE ($1::text IS NULL OR source_kind = $1)
            ORDER BY received_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(source_kind)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_events(&self, source_kind: Option<&str>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM events WHERE ($1::text IS NULL OR source_kind = $1)",
        )
        .bind(source_kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
