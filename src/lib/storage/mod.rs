pub mod memory;
#[cfg(feature = "storage")]
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::StorageBackend;
use crate::core::{StatusFilter, Todo, TodoCounts, TodoId, TodoPatch};

pub use memory::MemoryStore;
#[cfg(feature = "storage")]
pub use sqlite::SqliteStore;

/// Backing store for todo records.
///
/// Implementations own identity assignment: `insert` must mint the id and
/// store the entity as one atomic step, and ids are never handed out twice.
/// Every listing is in ascending id order.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn insert(&self, title: String, description: String, now: DateTime<Utc>) -> anyhow::Result<Todo>;
    async fn fetch(&self, id: TodoId) -> anyhow::Result<Option<Todo>>;
    async fn fetch_all(&self, filter: StatusFilter) -> anyhow::Result<Vec<Todo>>;
    /// Applies `patch` to the live entity; `None` if `id` is not live.
    async fn update(&self, id: TodoId, patch: &TodoPatch, now: DateTime<Utc>) -> anyhow::Result<Option<Todo>>;
    async fn remove(&self, id: TodoId) -> anyhow::Result<bool>;
    async fn counts(&self) -> anyhow::Result<TodoCounts>;
    /// Drops every live entity. The id sequence is not rewound.
    async fn clear(&self) -> anyhow::Result<()>;
    async fn ping(&self) -> anyhow::Result<()>;
    async fn close(&self);
}

pub async fn open(backend: &StorageBackend) -> anyhow::Result<Arc<dyn TodoStore>> {
    match backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "storage")]
        StorageBackend::Sqlite { url, max_connections } => {
            Ok(Arc::new(SqliteStore::connect(url, *max_connections).await?))
        }
        #[cfg(not(feature = "storage"))]
        StorageBackend::Sqlite { .. } => {
            anyhow::bail!("SQLite storage requires building with the `storage` feature")
        }
    }
}
