//! Route handlers.
//!
//! Every store read runs inside [`run_with_timeout`], parented on the
//! request's deadline, so a slow or wedged store surfaces as a 408 rather
//! than a hung connection. The read itself goes to the blocking pool: store
//! implementations may block, and a blocked worker thread would starve the
//! timer that enforces the deadline.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::content::{
    Contact, ContentStore, GamePlayed, Project, ProjectType, Review, StoreError,
};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::resilience::{run_with_timeout, OperationContext};

/// Envelope for successful content responses.
#[derive(Debug, Serialize)]
pub struct MessageBody<T> {
    pub message: T,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub timestamp: u64,
}

pub async fn health() -> Json<HealthBody> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Json(HealthBody {
        status: "healthy",
        timestamp,
    })
}

pub async fn contact(
    State(state): State<AppState>,
    Extension(ctx): Extension<OperationContext>,
) -> Result<Json<MessageBody<Contact>>, ApiError> {
    read_content(&state, &ctx, |store| store.contact()).await
}

/// Games shown in the carousel.
const CAROUSEL_SIZE: usize = 5;

/// `/projects` and `/tech/projects`.
pub async fn projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<OperationContext>,
) -> Result<Json<MessageBody<Vec<Project>>>, ApiError> {
    projects_of(&state, &ctx, ProjectType::Tech).await
}

pub async fn game_projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<OperationContext>,
) -> Result<Json<MessageBody<Vec<Project>>>, ApiError> {
    projects_of(&state, &ctx, ProjectType::Game).await
}

pub async fn finance_projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<OperationContext>,
) -> Result<Json<MessageBody<Vec<Project>>>, ApiError> {
    projects_of(&state, &ctx, ProjectType::Finance).await
}

pub async fn games_played_carousel(
    State(state): State<AppState>,
    Extension(ctx): Extension<OperationContext>,
) -> Result<Json<MessageBody<Vec<GamePlayed>>>, ApiError> {
    read_content(&state, &ctx, |store| {
        let mut games = store.games_played()?;
        games.truncate(CAROUSEL_SIZE);
        Ok(games)
    })
    .await
}

async fn projects_of(
    state: &AppState,
    ctx: &OperationContext,
    kind: ProjectType,
) -> Result<Json<MessageBody<Vec<Project>>>, ApiError> {
    read_content(state, ctx, move |store| store.projects(kind)).await
}

pub async fn reviews(
    State(state): State<AppState>,
    Extension(ctx): Extension<OperationContext>,
) -> Result<Json<MessageBody<Vec<Review>>>, ApiError> {
    read_content(&state, &ctx, |store| store.reviews()).await
}

async fn read_content<T, F>(
    state: &AppState,
    ctx: &OperationContext,
    read: F,
) -> Result<Json<MessageBody<T>>, ApiError>
where
    F: FnOnce(&dyn ContentStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    let message = run_with_timeout(ctx, state.operation_timeout, move |_| async move {
        match tokio::task::spawn_blocking(move || read(store.as_ref())).await {
            Ok(result) => result,
            // Re-raise so the executor reports it as a panic.
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    })
    .await?;
    Ok(Json(MessageBody { message }))
}
