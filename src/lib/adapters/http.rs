use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adapters::ApiError;
use crate::config::{ServerConfig, TlsConfig};
use crate::core::{StatusFilter, Todo, TodoCounts, TodoId, TodoPatch, TodoRepository};
use crate::transport::configure_tls;

#[cfg(feature = "tracing")]
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub repo: TodoRepository,
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Fields left out (or sent as `null`) are not changed.
#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl From<UpdateTodoRequest> for TodoPatch {
    fn from(body: UpdateTodoRequest) -> Self {
        TodoPatch {
            title: body.title,
            description: body.description,
            completed: body.completed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TodoList {
    pub todos: Vec<Todo>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TodoStats {
    #[serde(flatten)]
    pub counts: TodoCounts,
    pub completion_rate: f64,
}

pub fn router(repo: TodoRepository) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/stats", get(stats))
        .route(
            "/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/todos/{id}/toggle", patch(toggle_todo))
        .route("/admin/reset", post(reset_store))
        .fallback(endpoint_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { repo })
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.repo.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "message": "Todo API is running" })),
        ),
        Err(_e) => {
            #[cfg(feature = "tracing")]
            warn!(error = %_e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "message": "Storage is unreachable" })),
            )
        }
    }
}

async fn list_todos(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TodoList>, ApiError> {
    let filter = StatusFilter::from_query(query.status.as_deref());
    let todos = state.repo.list(filter).await?;
    Ok(Json(TodoList {
        count: todos.len(),
        todos,
    }))
}

async fn get_todo(
    State(state): State<AppState>,
    id: Result<Path<TodoId>, PathRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = todo_id(id)?;
    state
        .repo
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::todo_not_found)
}

async fn create_todo(
    State(state): State<AppState>,
    body: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(body) = json_body(body)?;
    let title = body
        .title
        .ok_or_else(|| ApiError::BadRequest("Title is required".into()))?;
    let todo = state
        .repo
        .create(&title, body.description.as_deref().unwrap_or(""))
        .await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    id: Result<Path<TodoId>, PathRejection>,
    body: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = todo_id(id)?;
    let Json(body) = json_body(body)?;
    state
        .repo
        .update(id, body.into())
        .await?
        .map(Json)
        .ok_or_else(ApiError::todo_not_found)
}

async fn delete_todo(
    State(state): State<AppState>,
    id: Result<Path<TodoId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = todo_id(id)?;
    if !state.repo.delete(id).await? {
        return Err(ApiError::todo_not_found());
    }
    Ok(Json(json!({ "message": "Todo deleted successfully" })))
}

async fn toggle_todo(
    State(state): State<AppState>,
    id: Result<Path<TodoId>, PathRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = todo_id(id)?;
    state
        .repo
        .toggle(id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::todo_not_found)
}

async fn stats(State(state): State<AppState>) -> Result<Json<TodoStats>, ApiError> {
    let counts = state.repo.count().await?;
    Ok(Json(TodoStats {
        completion_rate: counts.completion_rate(),
        counts,
    }))
}

async fn reset_store(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let seeded = state.repo.reset().await?;
    Ok(Json(json!({ "message": "Store reset", "count": seeded.len() })))
}

async fn endpoint_not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found")
}

// Non-numeric ids never match a todo route.
fn todo_id(path: Result<Path<TodoId>, PathRejection>) -> Result<TodoId, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("Endpoint not found"))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<Json<T>, ApiError> {
    body.map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e.body_text())))
}

pub struct HttpServer {
    router: Router,
    addr: SocketAddr,
    tls: Option<TlsConfig>,
}

impl HttpServer {
    pub async fn new(repo: TodoRepository, config: &ServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            router: router(repo),
            addr: config.addr().await?,
            tls: config.tls.clone(),
        })
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.tls {
            Some(tls) => {
                let rustls = configure_tls(&tls).await?;
                let handle = axum_server::Handle::new();
                tokio::spawn({
                    let handle = handle.clone();
                    async move {
                        shutdown.await;
                        handle.graceful_shutdown(Some(Duration::from_secs(10)));
                    }
                });
                #[cfg(feature = "tracing")]
                info!(addr = %self.addr, "HTTPS server started");
                axum_server::bind_rustls(self.addr, rustls)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await
                    .context("received error from running server")?;
            }
            None => {
                let listener = TcpListener::bind(self.addr)
                    .await
                    .with_context(|| format!("failed to listen on {}", self.addr))?;
                #[cfg(feature = "tracing")]
                info!(addr = %self.addr, "HTTP server started");
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(shutdown)
                    .await
                    .context("received error from running server")?;
            }
        }
        Ok(())
    }
}
