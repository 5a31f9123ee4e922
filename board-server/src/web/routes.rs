//! HTTP route handlers.

use std::sync::Arc;

use askama::Template;
use axum::{
    Json, Router,
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::config::{ConfigError, validate_options};
use crate::coordinator::Coordinator;

use super::dto::*;
use super::state::AppState;
use super::templates::*;

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(board_page))
        .route("/health", get(health))
        .route("/setup", get(setup_page).post(submit_setup))
        .route("/api/boards", get(list_boards))
        .route("/api/refresh", post(force_refresh))
        .route("/api/refresh_stop_names", post(refresh_stop_names))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Departure boards page.
async fn board_page(State(state): State<AppState>) -> Result<Response, AppError> {
    let mut boards = Vec::new();
    for coordinator in state.registry.all().await {
        let snapshot = coordinator.snapshot().await;
        boards.push(BoardView::from_snapshot(
            &coordinator.config().stop_ids,
            snapshot.as_deref(),
            coordinator.last_error().await,
        ));
    }

    let html = BoardTemplate { boards }
        .render()
        .map_err(|e| AppError::Internal {
            message: format!("Template error: {}", e),
        })?;
    Ok(Html(html).into_response())
}

/// Board setup form.
async fn setup_page() -> Result<Response, AppError> {
    render_setup(None, None)
}

/// Create a new board from the setup form.
async fn submit_setup(
    State(state): State<AppState>,
    Form(form): Form<SetupForm>,
) -> Result<Response, AppError> {
    let options = match form.into_options() {
        Ok(options) => options,
        Err(e) => return render_setup(Some(e.to_string()), None),
    };

    let config = match validate_options(&options, state.api.as_ref()).await {
        Ok(config) => config,
        Err(e) => return render_setup(Some(e.to_string()), None),
    };

    let stop_count = config.stop_ids.len();
    let coordinator = Arc::new(Coordinator::new(state.api.clone(), config));
    state.registry.register(coordinator.clone()).await;
    tokio::spawn(coordinator.run());

    info!(stops = stop_count, "board created");
    render_setup(None, Some(format!("Board created with {stop_count} stops")))
}

fn render_setup(error: Option<String>, notice: Option<String>) -> Result<Response, AppError> {
    let html = SetupTemplate { error, notice }
        .render()
        .map_err(|e| AppError::Internal {
            message: format!("Template error: {}", e),
        })?;
    Ok(Html(html).into_response())
}

/// List every board with its latest snapshot.
async fn list_boards(State(state): State<AppState>) -> Json<Vec<BoardStatus>> {
    let mut boards = Vec::new();
    for coordinator in state.registry.all().await {
        boards.push(BoardStatus {
            stop_ids: coordinator
                .config()
                .stop_ids
                .iter()
                .map(|id| id.to_string())
                .collect(),
            snapshot: coordinator.snapshot().await.map(|s| (*s).clone()),
            last_error: coordinator.last_error().await,
        });
    }
    Json(boards)
}

/// Schedule an immediate refresh on every board.
async fn force_refresh(State(state): State<AppState>) -> StatusCode {
    state.registry.force_update().await;
    StatusCode::ACCEPTED
}

/// Reload stop names on every board.
async fn refresh_stop_names(State(state): State<AppState>) -> StatusCode {
    state.registry.refresh_stop_names().await;
    StatusCode::ACCEPTED
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Internal { message: String },
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
        };

        error!(%status, %message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
