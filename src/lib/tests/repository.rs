use std::collections::HashSet;

use super::{all_repos, broken_repo, memory_repo, STORE_FAILURE};
use crate::core::{TodoError, TodoPatch, TodoRepository};

fn titles(todos: &[crate::core::Todo]) -> Vec<&str> {
    todos.iter().map(|t| t.title.as_str()).collect()
}

async fn assert_counts_consistent(repo: &TodoRepository) {
    let counts = repo.count().await.unwrap();
    assert_eq!(counts.total, counts.completed + counts.pending);
    assert_eq!(counts.total as usize, repo.get_all().await.unwrap().len());
}

#[tokio::test]
async fn ids_increase_and_are_never_reused() {
    for (backend, repo) in all_repos().await {
        let a = repo.create("A", "").await.unwrap();
        let b = repo.create("B", "").await.unwrap();
        assert!(repo.delete(b.id).await.unwrap(), "{backend}");
        let c = repo.create("C", "").await.unwrap();
        assert_eq!(a.id, 1, "{backend}");
        assert!(b.id > a.id && c.id > b.id, "{backend}");
        assert_counts_consistent(&repo).await;
    }
}

#[tokio::test]
async fn create_trims_title_and_description() {
    for (backend, repo) in all_repos().await {
        let todo = repo.create("  My Task  ", "  desc  ").await.unwrap();
        assert_eq!(todo.title, "My Task", "{backend}");
        assert_eq!(todo.description, "desc", "{backend}");
        assert!(!todo.completed);
        assert_eq!(todo.created_at, todo.updated_at);
        assert_eq!(repo.get_by_id(todo.id).await.unwrap(), Some(todo));
    }
}

#[tokio::test]
async fn blank_titles_are_rejected_without_side_effects() {
    for (backend, repo) in all_repos().await {
        for title in ["", "   "] {
            let err = repo.create(title, "x").await.unwrap_err();
            assert!(matches!(err, TodoError::Validation(_)), "{backend}");
        }
        assert_eq!(repo.count().await.unwrap().total, 0, "{backend}");
        // the failed attempts did not burn ids
        assert_eq!(repo.create("first", "").await.unwrap().id, 1, "{backend}");
    }
}

#[tokio::test]
async fn overlong_fields_are_rejected() {
    let repo = memory_repo();
    let long_title = "t".repeat(201);
    assert!(matches!(
        repo.create(&long_title, "").await,
        Err(TodoError::Validation(_))
    ));
    let todo = repo.create(&"t".repeat(200), "").await.unwrap();
    let patch = TodoPatch {
        description: Some("d".repeat(501)),
        ..Default::default()
    };
    assert!(matches!(repo.update(todo.id, patch).await, Err(TodoError::Validation(_))));
}

#[tokio::test]
async fn update_of_missing_id_is_not_an_upsert() {
    for (backend, repo) in all_repos().await {
        repo.create("only", "").await.unwrap();
        let before = repo.count().await.unwrap();
        let result = repo.update(99, TodoPatch::completed(true)).await.unwrap();
        assert!(result.is_none(), "{backend}");
        assert_eq!(repo.count().await.unwrap(), before, "{backend}");
        assert!(repo.get_by_id(99).await.unwrap().is_none(), "{backend}");
    }
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    for (backend, repo) in all_repos().await {
        let todo = repo.create("Title", "Body").await.unwrap();
        let patch = TodoPatch {
            title: Some("  Renamed ".into()),
            ..Default::default()
        };
        let updated = repo.update(todo.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "Renamed", "{backend}");
        assert_eq!(updated.description, "Body", "{backend}");
        assert!(!updated.completed, "{backend}");
        assert_eq!(updated.created_at, todo.created_at, "{backend}");
        assert!(updated.updated_at > todo.updated_at, "{backend}");
        assert_eq!(repo.get_by_id(todo.id).await.unwrap(), Some(updated));
    }
}

#[tokio::test]
async fn invalid_updates_leave_the_entity_alone() {
    for (backend, repo) in all_repos().await {
        let todo = repo.create("Keep", "me").await.unwrap();
        let empty = repo.update(todo.id, TodoPatch::default()).await;
        assert!(matches!(empty, Err(TodoError::Validation(_))), "{backend}");
        let blank_title = TodoPatch {
            title: Some("  ".into()),
            completed: Some(true),
            ..Default::default()
        };
        let blank = repo.update(todo.id, blank_title).await;
        assert!(matches!(blank, Err(TodoError::Validation(_))), "{backend}");
        assert_eq!(repo.get_by_id(todo.id).await.unwrap(), Some(todo), "{backend}");
    }
}

#[tokio::test]
async fn delete_removes_permanently() {
    for (backend, repo) in all_repos().await {
        let todo = repo.create("Doomed", "").await.unwrap();
        repo.create("Survivor", "").await.unwrap();
        let before = repo.count().await.unwrap().total;
        assert!(repo.delete(todo.id).await.unwrap(), "{backend}");
        assert!(repo.get_by_id(todo.id).await.unwrap().is_none(), "{backend}");
        assert_eq!(repo.count().await.unwrap().total, before - 1, "{backend}");
        assert!(!repo.delete(todo.id).await.unwrap(), "{backend}");
        assert_counts_consistent(&repo).await;
    }
}

#[tokio::test]
async fn toggling_twice_restores_status_and_bumps_updated_at() {
    for (backend, repo) in all_repos().await {
        let todo = repo.create("Flip", "").await.unwrap();
        let once = repo.toggle(todo.id).await.unwrap().unwrap();
        let twice = repo.toggle(todo.id).await.unwrap().unwrap();
        assert!(once.completed, "{backend}");
        assert_eq!(twice.completed, todo.completed, "{backend}");
        assert!(once.updated_at > todo.updated_at, "{backend}");
        assert!(twice.updated_at > once.updated_at, "{backend}");
        assert!(repo.toggle(12345).await.unwrap().is_none(), "{backend}");
    }
}

#[tokio::test]
async fn filters_and_counts_follow_completion() {
    for (backend, repo) in all_repos().await {
        repo.create("A", "").await.unwrap();
        let b = repo.create("B", "").await.unwrap();
        repo.create("C", "").await.unwrap();
        repo.update(b.id, TodoPatch::completed(true)).await.unwrap();

        assert_eq!(titles(&repo.get_all().await.unwrap()), ["A", "B", "C"], "{backend}");
        assert_eq!(titles(&repo.get_completed().await.unwrap()), ["B"], "{backend}");
        assert_eq!(titles(&repo.get_pending().await.unwrap()), ["A", "C"], "{backend}");

        let counts = repo.count().await.unwrap();
        assert_eq!((counts.total, counts.completed, counts.pending), (3, 1, 2), "{backend}");
        assert!((counts.completion_rate() - 33.33).abs() < 0.01, "{backend}");
    }
}

#[tokio::test]
async fn reset_reseeds_without_reusing_ids() {
    for (backend, repo) in all_repos().await {
        let first = repo.seed_sample_data().await.unwrap();
        let max_before = first.iter().map(|t| t.id).max().unwrap();
        let reseeded = repo.reset().await.unwrap();
        assert_eq!(reseeded.len(), first.len(), "{backend}");
        assert!(reseeded.iter().all(|t| t.id > max_before), "{backend}");
        assert_eq!(repo.count().await.unwrap().total, first.len() as u64, "{backend}");
        repo.ping().await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_never_share_an_id() {
    for (backend, repo) in all_repos().await {
        let handles: Vec<_> = (0..50)
            .map(|n| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create(&format!("task {n}"), "").await.unwrap().id })
            })
            .collect();
        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()), "{backend}: duplicate id");
        }
        assert_eq!(ids.len(), 50, "{backend}");
        assert_eq!(repo.count().await.unwrap().total, 50, "{backend}");
    }
}

#[tokio::test]
async fn store_failures_are_errors_not_absence() {
    let repo = broken_repo();
    assert!(matches!(repo.get_by_id(1).await, Err(TodoError::Storage(_))));
    assert!(matches!(repo.delete(1).await, Err(TodoError::Storage(_))));
    assert!(matches!(repo.toggle(1).await, Err(TodoError::Storage(_))));
    assert!(matches!(
        repo.update(1, TodoPatch::completed(true)).await,
        Err(TodoError::Storage(_))
    ));
    let err = repo.create("Valid", "").await.unwrap_err();
    assert!(err.to_string().contains(STORE_FAILURE));
    // validation still runs before the store is touched
    assert!(matches!(repo.create(" ", "").await, Err(TodoError::Validation(_))));
}

#[cfg(feature = "storage")]
#[tokio::test]
async fn closed_sqlite_store_reports_storage_errors() {
    let store = crate::storage::SqliteStore::new_memory().await.unwrap();
    let repo = TodoRepository::new(std::sync::Arc::new(store));
    repo.create("Before close", "").await.unwrap();
    repo.close().await;
    assert!(matches!(repo.get_by_id(1).await, Err(TodoError::Storage(_))));
    assert!(matches!(repo.count().await, Err(TodoError::Storage(_))));
    assert!(repo.ping().await.is_err());
}
