//! EventStore - SQLite-based event log

use super::helpers::{row_to_event, EVENT_COLUMNS};
use super::query::EventQuery;
use super::traits::EventStoreTrait;
use crate::error::{Error, Result};
use crate::event::{FilterOptions, NewEvent, StoredEvent};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Maximum number of session ids returned by [`EventStore::filter_options`]
const MAX_FILTER_SESSIONS: i64 = 100;

/// Event store persisting the append-only event log to SQLite
#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Create a new event store with the given connection pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new event store from a database path
    ///
    /// This will create the database file if it doesn't exist and run migrations.
    /// Every insert is committed with `synchronous = FULL` so an acknowledged
    /// event survives a crash.
    pub async fn from_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Database(format!("failed to create directory: {e}")))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        info!("SQLite event store initialized at {}", db_path.display());
        Ok(store)
    }

    /// Create a new in-memory event store (for testing)
    pub async fn in_memory() -> Result<Self> {
        // A single connection that is never recycled: dropping it drops the database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        debug!("In-memory SQLite event store initialized");
        Ok(store)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_app TEXT NOT NULL,
                session_id TEXT NOT NULL,
                hook_event_type TEXT NOT NULL,
                payload TEXT NOT NULL,
                chat TEXT,
                summary TEXT,
                timestamp INTEGER NOT NULL,
                model_name TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        for (name, column) in [
            ("idx_events_source_app", "source_app"),
            ("idx_events_session", "session_id"),
            ("idx_events_type", "hook_event_type"),
            ("idx_events_timestamp", "timestamp"),
        ] {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {name} ON events({column})"
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        }

        debug!("Database migrations completed");
        Ok(())
    }

    /// Get a reference to the underlying connection pool
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for in-flight queries to finish
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Event store closed");
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Validate and append an event
    ///
    /// Fails with [`Error::Validation`] before touching the database when a
    /// required field is missing, so a rejected event never leaves a partial row.
    #[instrument(skip(self, event))]
    pub async fn append(&self, event: NewEvent) -> Result<StoredEvent> {
        let event = event.validate()?;

        let chat_text = event
            .chat
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO events (
                source_app, session_id, hook_event_type,
                payload, chat, summary, timestamp, model_name
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
            )
            "#,
        )
        .bind(&event.source_app)
        .bind(&event.session_id)
        .bind(&event.hook_event_type)
        .bind(event.payload.to_string())
        .bind(chat_text)
        .bind(&event.summary)
        .bind(event.timestamp)
        .bind(&event.model_name)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        let stored = StoredEvent {
            id: result.last_insert_rowid(),
            source_app: event.source_app,
            session_id: event.session_id,
            hook_event_type: event.hook_event_type,
            payload: event.payload,
            chat: event.chat,
            summary: event.summary,
            timestamp: event.timestamp,
            model_name: event.model_name,
        };

        debug!(
            event_id = stored.id,
            session_id = %stored.session_id,
            "Recorded {} event",
            stored.hook_event_type
        );
        Ok(stored)
    }

    /// Delete every event
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM events")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        info!(deleted = result.rows_affected(), "Event log cleared");
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get an event by id
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<StoredEvent> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        row_to_event(row)
    }

    /// Most recent events matching the query, oldest first
    ///
    /// Rows are fetched newest-first so `LIMIT` keeps the latest ones, then
    /// reversed for presentation.
    #[instrument(skip(self))]
    pub async fn query(&self, query: &EventQuery) -> Result<Vec<StoredEvent>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events"));

        let filters = [
            ("source_app", &query.source_app),
            ("session_id", &query.session_id),
            ("hook_event_type", &query.hook_event_type),
        ];
        let mut has_where = false;
        for (column, value) in filters {
            if let Some(value) = value {
                builder.push(if has_where { " AND " } else { " WHERE " });
                builder.push(column);
                builder.push(" = ");
                builder.push_bind(value.clone());
                has_where = true;
            }
        }

        builder.push(" ORDER BY id DESC LIMIT ");
        builder.push_bind(query.limit.max(0));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut events = rows
            .into_iter()
            .map(row_to_event)
            .collect::<Result<Vec<_>>>()?;
        events.reverse();
        Ok(events)
    }

    /// Most recent `limit` events, oldest first
    pub async fn recent(&self, limit: i64) -> Result<Vec<StoredEvent>> {
        self.query(&EventQuery::new().paginate(limit)).await
    }

    /// Most recent `limit` events of one session, oldest first
    pub async fn by_session(&self, session_id: &str, limit: i64) -> Result<Vec<StoredEvent>> {
        self.query(&EventQuery::new().for_session(session_id).paginate(limit))
            .await
    }

    /// Distinct values for dashboard filter controls
    #[instrument(skip(self))]
    pub async fn filter_options(&self) -> Result<FilterOptions> {
        let source_apps = self
            .distinct_column("SELECT DISTINCT source_app AS value FROM events ORDER BY source_app")
            .await?;
        let hook_event_types = self
            .distinct_column(
                "SELECT DISTINCT hook_event_type AS value FROM events ORDER BY hook_event_type",
            )
            .await?;

        let session_rows = sqlx::query(
            r#"
            SELECT session_id AS value
            FROM events
            GROUP BY session_id
            ORDER BY MAX(timestamp) DESC
            LIMIT ?1
            "#,
        )
        .bind(MAX_FILTER_SESSIONS)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(FilterOptions {
            source_apps,
            session_ids: session_rows
                .into_iter()
                .map(|row| row.get::<String, _>("value"))
                .collect(),
            hook_event_types,
        })
    }

    async fn distinct_column(&self, sql: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("value"))
            .collect())
    }

    /// Count stored events
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(row.get::<i64, _>("count"))
    }
}

#[async_trait::async_trait]
impl EventStoreTrait for EventStore {
    async fn append(&self, event: NewEvent) -> Result<StoredEvent> {
        EventStore::append(self, event).await
    }

    async fn recent(&self, limit: i64) -> Result<Vec<StoredEvent>> {
        EventStore::recent(self, limit).await
    }

    async fn by_session(&self, session_id: &str, limit: i64) -> Result<Vec<StoredEvent>> {
        EventStore::by_session(self, session_id, limit).await
    }

    async fn clear(&self) -> Result<u64> {
        EventStore::clear(self).await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
