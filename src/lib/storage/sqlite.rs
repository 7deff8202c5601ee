use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::core::{timestamp, StatusFilter, Todo, TodoCounts, TodoId, TodoPatch};
use crate::storage::TodoStore;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title VARCHAR(200) NOT NULL CHECK (length(title) <= 200),
        description VARCHAR(500) NOT NULL DEFAULT '' CHECK (length(description) <= 500),
        completed BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )";

const COLUMNS: &str = "id, title, description, completed, created_at, updated_at";

#[derive(FromRow)]
struct TodoRow {
    id: i64,
    title: String,
    description: String,
    completed: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TodoRow> for Todo {
    type Error = anyhow::Error;

    fn try_from(row: TodoRow) -> Result<Self> {
        Ok(Todo {
            id: row.id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: timestamp::parse(&row.created_at)
                .with_context(|| format!("bad created_at on todo {}", row.id))?,
            updated_at: timestamp::parse(&row.updated_at)
                .with_context(|| format!("bad updated_at on todo {}", row.id))?,
        })
    }
}

/// SQLite-backed store. Ids come from `AUTOINCREMENT`, so they are never
/// reused even after deletes or a `clear`.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid SQLite url {url}"))?
            .create_if_missing(true);
        // every connection to an in-memory database gets its own database
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite database {url}"))?;
        let store = Self { pool };
        store.migrate().await?;
        #[cfg(feature = "tracing")]
        info!(url = %url, "SQLite store ready");
        Ok(store)
    }

    pub async fn new_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .context("failed to create todos table")?;
        Ok(())
    }
}

#[async_trait]
impl TodoStore for SqliteStore {
    async fn insert(&self, title: String, description: String, now: DateTime<Utc>) -> Result<Todo> {
        let stamp = timestamp::format(&now);
        let done = sqlx::query(
            "INSERT INTO todos (title, description, completed, created_at, updated_at)
             VALUES (?, ?, 0, ?, ?)",
        )
        .bind(&title)
        .bind(&description)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .context("failed to insert todo")?;
        Ok(Todo::new(done.last_insert_rowid(), title, description, now))
    }

    async fn fetch(&self, id: TodoId) -> Result<Option<Todo>> {
        let row: Option<TodoRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM todos WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch todo")?;
        row.map(Todo::try_from).transpose()
    }

    async fn fetch_all(&self, filter: StatusFilter) -> Result<Vec<Todo>> {
        let rows: Vec<TodoRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM todos WHERE (?1 IS NULL OR completed = ?1) ORDER BY id"
        ))
        .bind(filter.completed())
        .fetch_all(&self.pool)
        .await
        .context("failed to list todos")?;
        rows.into_iter().map(Todo::try_from).collect()
    }

    async fn update(&self, id: TodoId, patch: &TodoPatch, now: DateTime<Utc>) -> Result<Option<Todo>> {
        // take the write lock up front so concurrent updates queue on busy_timeout
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("failed to begin transaction")?;
        let row: Option<TodoRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM todos WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("failed to fetch todo for update")?;
        let Some(row) = row else {
            tx.rollback().await.context("failed to roll back")?;
            return Ok(None);
        };
        let mut todo = Todo::try_from(row)?;
        if todo.apply(patch, now) {
            sqlx::query(
                "UPDATE todos SET title = ?, description = ?, completed = ?, updated_at = ?
                 WHERE id = ?",
            )
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.completed)
            .bind(timestamp::format(&todo.updated_at))
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("failed to update todo")?;
        }
        tx.commit().await.context("failed to commit update")?;
        #[cfg(feature = "tracing")]
        debug!(id = id, "todo row updated");
        Ok(Some(todo))
    }

    async fn remove(&self, id: TodoId) -> Result<bool> {
        let done = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete todo")?;
        Ok(done.rows_affected() > 0)
    }

    async fn counts(&self) -> Result<TodoCounts> {
        let (total, completed): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM todos")
                .fetch_one(&self.pool)
                .await
                .context("failed to count todos")?;
        Ok(TodoCounts::new(total as u64, completed as u64))
    }

    async fn clear(&self) -> Result<()> {
        // DELETE rather than DROP keeps the AUTOINCREMENT sequence
        sqlx::query("DELETE FROM todos")
            .execute(&self.pool)
            .await
            .context("failed to clear todos")?;
        self.migrate().await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("SQLite store unreachable")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        #[cfg(feature = "tracing")]
        info!("SQLite store closed");
    }
}
