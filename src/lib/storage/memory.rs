use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::core::{StatusFilter, Todo, TodoCounts, TodoId, TodoPatch};

use super::TodoStore;

struct Inner {
    next_id: TodoId,
    todos: BTreeMap<TodoId, Todo>,
}

/// Transient store. All state sits behind a single lock so id minting and
/// insertion happen together.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                todos: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn insert(&self, title: String, description: String, now: DateTime<Utc>) -> anyhow::Result<Todo> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        let todo = Todo::new(id, title, description, now);
        inner.todos.insert(id, todo.clone());
        Ok(todo)
    }

    async fn fetch(&self, id: TodoId) -> anyhow::Result<Option<Todo>> {
        Ok(self.inner.read().await.todos.get(&id).cloned())
    }

    async fn fetch_all(&self, filter: StatusFilter) -> anyhow::Result<Vec<Todo>> {
        let inner = self.inner.read().await;
        Ok(inner.todos.values().filter(|t| filter.matches(t)).cloned().collect())
    }

    async fn update(&self, id: TodoId, patch: &TodoPatch, now: DateTime<Utc>) -> anyhow::Result<Option<Todo>> {
        let mut inner = self.inner.write().await;
        Ok(inner.todos.get_mut(&id).map(|todo| {
            todo.apply(patch, now);
            todo.clone()
        }))
    }

    async fn remove(&self, id: TodoId) -> anyhow::Result<bool> {
        Ok(self.inner.write().await.todos.remove(&id).is_some())
    }

    async fn counts(&self) -> anyhow::Result<TodoCounts> {
        let inner = self.inner.read().await;
        let completed = inner.todos.values().filter(|t| t.completed).count();
        Ok(TodoCounts::new(inner.todos.len() as u64, completed as u64))
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.inner.write().await.todos.clear();
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}
