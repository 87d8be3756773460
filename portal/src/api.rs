use crate::samples;
use crate::todos::{Todo, TodoStore};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use gitlab::types::{MergeRequest, QueryParams};
use gitlab::{FetchError, FetchOutcome, MrFetcher};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Shared services handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<MrFetcher>,
    pub todos: Arc<TodoStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/healthcheck", get(healthcheck))
        .route("/api/widgets/review-mrs", get(review_mrs))
        .route("/api/widgets/my-mrs", get(my_mrs))
        .route("/api/widgets/todos", get(list_todos).post(replace_todos))
        .route("/api/actions/rebase", post(rebase_one))
        .route("/api/actions/rebase-all", post(rebase_all))
        .with_state(state)
}

#[derive(thiserror::Error, Debug)]
enum ApiError {
    #[error("todo store error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Fetch(err) if err.is_auth_failure() => StatusCode::UNAUTHORIZED,
            ApiError::Fetch(FetchError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Fallback page shown when no static frontend is bundled.
const INLINE_DASHBOARD: &str = "<!doctype html>\n<html>\n<head><title>Dev Portal</title></head>\n<body>\n<h1>Dev Portal</h1>\n<p>No static frontend is bundled; the widget API lives under <code>/api/widgets/</code>.</p>\n</body>\n</html>\n";

async fn dashboard() -> Html<String> {
    match tokio::fs::read_to_string("static/index.html").await {
        Ok(contents) => Html(contents),
        Err(_) => Html(INLINE_DASHBOARD.to_string()),
    }
}

async fn healthcheck(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "gitlab_configured": state.fetcher.config().is_configured(),
    }))
}

/// Base query shared by every assignee sub-query of the review widget.
fn review_params() -> QueryParams {
    QueryParams::from([
        ("state".to_string(), json!("opened")),
        ("scope".to_string(), json!("all")),
        ("order_by".to_string(), json!("updated_at")),
        ("sort".to_string(), json!("desc")),
        ("per_page".to_string(), json!(50)),
    ])
}

/// Merge requests from colleagues still waiting for a reviewer. Served from
/// GitLab when configured, from bundled sample data otherwise; a fetch
/// failure degrades to sample data rather than an error page.
async fn review_mrs(State(state): State<AppState>) -> Json<Value> {
    let assignees = state.fetcher.config().assignees.clone();

    let mut source = "sample";
    let mut username = None;
    let mut items;

    match state.fetcher.fetch(&assignees, &review_params()).await {
        Ok(FetchOutcome::Fetched {
            merge_requests,
            default_assignee,
        }) => {
            items = merge_requests;
            username = default_assignee;
            source = "gitlab";
        }
        Ok(FetchOutcome::Unconfigured) => {
            items = samples::review_mrs();
        }
        Err(err) if err.is_auth_failure() => {
            tracing::warn!(error = %err, "GitLab rejected our credentials, serving sample data");
            items = samples::review_mrs();
        }
        Err(err) => {
            tracing::warn!(error = %err, "GitLab fetch failed, serving sample data");
            items = samples::review_mrs();
        }
    }

    items.retain(awaiting_review);
    let normalized: Vec<Value> = items.iter().map(normalize_mr).collect();

    Json(json!({
        "items": normalized,
        "count": normalized.len(),
        "source": source,
        "username": username,
        "server_time": Utc::now().to_rfc3339(),
    }))
}

/// Keeps merge requests nobody has picked up for review yet. A missing
/// reviewers field counts as "no review yet".
fn awaiting_review(record: &MergeRequest) -> bool {
    match record.get("reviewers").and_then(Value::as_array) {
        Some(reviewers) => reviewers.is_empty(),
        None => true,
    }
}

/// Reshapes an opaque upstream record into the fields the dashboard shows.
fn normalize_mr(record: &MergeRequest) -> Value {
    json!({
        "id": record.get("id"),
        "iid": record.get("iid"),
        "title": record.get("title"),
        "author": record.get("author"),
        "created_at": record.get("created_at"),
        "web_url": record.get("web_url"),
        "state": record.get("state"),
    })
}

/// Placeholder widget: the user's own merge requests with rebase states.
async fn my_mrs() -> Json<Value> {
    let items = samples::my_mrs();
    let count = items.len();
    Json(json!({
        "items": items,
        "count": count,
        "source": "dummy",
        "server_time": Utc::now().to_rfc3339(),
    }))
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let items = state.todos.read()?;
    Ok(Json(todos_envelope(items)))
}

#[derive(Deserialize)]
struct TodoUpdate {
    items: Vec<Todo>,
}

/// Replaces the todo list and returns it as re-read from the file, with
/// fresh position-derived ids.
async fn replace_todos(
    State(state): State<AppState>,
    Json(update): Json<TodoUpdate>,
) -> Result<Json<Value>, ApiError> {
    state.todos.write(&update.items)?;
    let items = state.todos.read()?;
    Ok(Json(todos_envelope(items)))
}

fn todos_envelope(items: Vec<Todo>) -> Value {
    let count = items.len();
    json!({
        "items": items,
        "count": count,
        "source": "file",
        "server_time": Utc::now().to_rfc3339(),
    })
}

#[derive(Deserialize)]
struct RebaseRequest {
    project_id: u64,
    mr_iid: u64,
}

/// Best-effort rebase of a single merge request. Upstream auth failures map
/// to 401, an unconfigured GitLab to 503, anything else to 500.
async fn rebase_one(
    State(state): State<AppState>,
    Json(request): Json<RebaseRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .fetcher
        .trigger_rebase(request.project_id, request.mr_iid)
        .await?;

    Ok(Json(json!({
        "status": "triggered",
        "project_id": request.project_id,
        "mr_iid": request.mr_iid,
        "server_time": Utc::now().to_rfc3339(),
    })))
}

/// Placeholder bulk action: reports a queued job without doing any work yet.
async fn rebase_all() -> Json<Value> {
    Json(json!({
        "job_id": "job_dummy_001",
        "status": "queued",
        "queued_at": Utc::now().to_rfc3339(),
        "estimated_total": 2,
    }))
}
