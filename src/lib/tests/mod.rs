mod repository;

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::{StatusFilter, Todo, TodoCounts, TodoId, TodoPatch, TodoRepository};
use crate::storage::{MemoryStore, TodoStore};

pub(crate) fn memory_repo() -> TodoRepository {
    TodoRepository::new(Arc::new(MemoryStore::new()))
}

/// One repository per available backend, labelled for assertion messages.
pub(crate) async fn all_repos() -> Vec<(&'static str, TodoRepository)> {
    #[allow(unused_mut)]
    let mut repos = vec![("memory", memory_repo())];
    #[cfg(feature = "storage")]
    {
        let store = crate::storage::SqliteStore::new_memory()
            .await
            .expect("in-memory SQLite should open");
        repos.push(("sqlite", TodoRepository::new(Arc::new(store))));
    }
    repos
}

pub(crate) const STORE_FAILURE: &str = "disk /var/lib/todos.db is on fire";

/// Store whose every call fails, for exercising the storage error path.
pub(crate) struct BrokenStore;

#[async_trait]
impl TodoStore for BrokenStore {
    async fn insert(&self, _title: String, _description: String, _now: DateTime<Utc>) -> anyhow::Result<Todo> {
        bail!(STORE_FAILURE)
    }

    async fn fetch(&self, _id: TodoId) -> anyhow::Result<Option<Todo>> {
        bail!(STORE_FAILURE)
    }

    async fn fetch_all(&self, _filter: StatusFilter) -> anyhow::Result<Vec<Todo>> {
        bail!(STORE_FAILURE)
    }

    async fn update(&self, _id: TodoId, _patch: &TodoPatch, _now: DateTime<Utc>) -> anyhow::Result<Option<Todo>> {
        bail!(STORE_FAILURE)
    }

    async fn remove(&self, _id: TodoId) -> anyhow::Result<bool> {
        bail!(STORE_FAILURE)
    }

    async fn counts(&self) -> anyhow::Result<TodoCounts> {
        bail!(STORE_FAILURE)
    }

    async fn clear(&self) -> anyhow::Result<()> {
        bail!(STORE_FAILURE)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        bail!(STORE_FAILURE)
    }

    async fn close(&self) {}
}

pub(crate) fn broken_repo() -> TodoRepository {
    TodoRepository::new(Arc::new(BrokenStore))
}
