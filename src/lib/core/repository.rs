use std::sync::Arc;

use crate::core::{now, StatusFilter, Todo, TodoCounts, TodoError, TodoId, TodoPatch};
use crate::storage::TodoStore;

#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Todos loaded at startup and after an admin reset.
pub const SAMPLE_TODOS: [(&str, &str); 3] = [
    ("Learn Rust", "Build a REST API with axum"),
    ("Do the groceries", "Buy vegetables and fruit"),
    ("Go running on Monday", "Run 5km"),
];

/// Single entry point for reading and mutating todos.
///
/// Inputs are trimmed and validated here, whichever store sits underneath.
/// A missing id is reported as `Ok(None)` / `Ok(false)`; `Err` is reserved
/// for invalid input and store failures.
#[derive(Clone)]
pub struct TodoRepository {
    store: Arc<dyn TodoStore>,
}

impl TodoRepository {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, title, description)))]
    pub async fn create(&self, title: &str, description: &str) -> Result<Todo, TodoError> {
        let title = clean_title(title)?;
        let description = clean_description(description)?;
        let todo = self.store.insert(title, description, now()).await?;
        #[cfg(feature = "tracing")]
        info!(id = todo.id, "todo created");
        Ok(todo)
    }

    pub async fn get_all(&self) -> Result<Vec<Todo>, TodoError> {
        self.list(StatusFilter::All).await
    }

    pub async fn get_completed(&self) -> Result<Vec<Todo>, TodoError> {
        self.list(StatusFilter::Completed).await
    }

    pub async fn get_pending(&self) -> Result<Vec<Todo>, TodoError> {
        self.list(StatusFilter::Pending).await
    }

    pub async fn list(&self, filter: StatusFilter) -> Result<Vec<Todo>, TodoError> {
        Ok(self.store.fetch_all(filter).await?)
    }

    pub async fn get_by_id(&self, id: TodoId) -> Result<Option<Todo>, TodoError> {
        Ok(self.store.fetch(id).await?)
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, patch)))]
    pub async fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Option<Todo>, TodoError> {
        if patch.is_empty() {
            return Err(TodoError::validation(
                "At least one field (title, description, completed) must be provided",
            ));
        }
        let patch = TodoPatch {
            title: patch.title.as_deref().map(clean_title).transpose()?,
            description: patch.description.as_deref().map(clean_description).transpose()?,
            completed: patch.completed,
        };
        let updated = self.store.update(id, &patch, now()).await?;
        #[cfg(feature = "tracing")]
        match &updated {
            Some(_) => debug!(id = id, "todo updated"),
            None => debug!(id = id, "update skipped, todo not found"),
        }
        Ok(updated)
    }

    /// Flips `completed`. `None` if the todo does not exist.
    pub async fn toggle(&self, id: TodoId) -> Result<Option<Todo>, TodoError> {
        let Some(current) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        self.update(id, TodoPatch::completed(!current.completed)).await
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn delete(&self, id: TodoId) -> Result<bool, TodoError> {
        let removed = self.store.remove(id).await?;
        #[cfg(feature = "tracing")]
        if removed {
            info!(id = id, "todo deleted");
        }
        Ok(removed)
    }

    pub async fn count(&self) -> Result<TodoCounts, TodoError> {
        Ok(self.store.counts().await?)
    }

    pub async fn seed_sample_data(&self) -> Result<Vec<Todo>, TodoError> {
        let mut seeded = Vec::with_capacity(SAMPLE_TODOS.len());
        for (title, description) in SAMPLE_TODOS {
            seeded.push(self.create(title, description).await?);
        }
        Ok(seeded)
    }

    /// Empties the store and loads the sample todos again.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn reset(&self) -> Result<Vec<Todo>, TodoError> {
        self.store.clear().await?;
        #[cfg(feature = "tracing")]
        info!("store cleared");
        self.seed_sample_data().await
    }

    pub async fn ping(&self) -> Result<(), TodoError> {
        Ok(self.store.ping().await?)
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

fn clean_title(title: &str) -> Result<String, TodoError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TodoError::validation("Title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(TodoError::validation(format!(
            "Title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn clean_description(description: &str) -> Result<String, TodoError> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(TodoError::validation(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(description.to_string())
}
