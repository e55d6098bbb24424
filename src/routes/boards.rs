use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Snapshot returned after every board operation: what the delivery layer
/// needs to format a chat message.
#[derive(Debug, Serialize)]
pub struct BoardView {
    pub channel_id: String,
    pub cell_count: usize,
    pub grid_size: usize,
    pub line_length: usize,
    pub completed: bool,
    pub rendered: String,
}

/// Outcome of a board mutation.
///
/// The view always reflects in-memory state; `persisted` carries the engine's
/// best-effort durability verdict so the delivery layer can warn the user
/// when a write was not stored.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub persisted: bool,
    #[serde(flatten)]
    pub board: BoardView,
}

#[derive(Debug, Deserialize)]
pub struct AddCellRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AddCellResponse {
    pub position: usize,
    #[serde(flatten)]
    pub board: BoardView,
}

#[derive(Debug, Deserialize)]
pub struct SwitchCellsRequest {
    pub first: usize,
    pub second: usize,
}

fn view(board: &crate::board::Board) -> BoardView {
    BoardView {
        channel_id: board.channel_id().to_string(),
        cell_count: board.cell_count(),
        grid_size: board.grid_size(),
        line_length: board.line_length(),
        completed: board.is_completed(),
        rendered: board.to_string(),
    }
}

fn internal_error(e: impl std::fmt::Display) -> StatusCode {
    tracing::error!("Board session error: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Render the board for a channel.
pub async fn get_board(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<Json<BoardView>, StatusCode> {
    let session = state
        .sessions
        .board_for_channel(&channel_id)
        .await
        .map_err(internal_error)?;
    let board = session.lock().await;

    Ok(Json(view(&board)))
}

/// Append a cell to the channel's board. A failed repository write leaves the
/// board untouched, so it surfaces as a plain 500 here.
pub async fn add_cell(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    Json(payload): Json<AddCellRequest>,
) -> Result<Json<AddCellResponse>, StatusCode> {
    let session = state
        .sessions
        .board_for_channel(&channel_id)
        .await
        .map_err(internal_error)?;
    let mut board = session.lock().await;

    let position = board.add_cell(&payload.text).await.map_err(internal_error)?;

    Ok(Json(AddCellResponse {
        position,
        board: view(&board),
    }))
}

/// Remove the cell at a position.
///
/// The engine returns one boolean for two cases, so the position is checked
/// first: absent position is a 404, while a failed repository delete on an
/// existing cell answers with `persisted: false` and an unchanged view.
pub async fn remove_cell(
    State(state): State<Arc<AppState>>,
    Path((channel_id, position)): Path<(String, usize)>,
) -> Result<Json<MutationResponse>, StatusCode> {
    let session = state
        .sessions
        .board_for_channel(&channel_id)
        .await
        .map_err(internal_error)?;
    let mut board = session.lock().await;

    if board.cell(position).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let persisted = board.remove_cell(position).await;
    Ok(Json(MutationResponse {
        persisted,
        board: view(&board),
    }))
}

/// Swap two cells on the channel's board. Either position absent is a 404;
/// once both exist the swap is committed in memory and `persisted` reports
/// whether both repository writes went through.
pub async fn switch_cells(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    Json(payload): Json<SwitchCellsRequest>,
) -> Result<Json<MutationResponse>, StatusCode> {
    let session = state
        .sessions
        .board_for_channel(&channel_id)
        .await
        .map_err(internal_error)?;
    let mut board = session.lock().await;

    if board.cell(payload.first).is_none() || board.cell(payload.second).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let persisted = board.switch_cells(payload.first, payload.second).await;
    Ok(Json(MutationResponse {
        persisted,
        board: view(&board),
    }))
}

/// Mark the cell at a position. The response carries `completed` so the
/// delivery layer can announce a finished line right away; the mark itself is
/// committed to memory even when `persisted` comes back false.
pub async fn mark_cell(
    State(state): State<Arc<AppState>>,
    Path((channel_id, position)): Path<(String, usize)>,
) -> Result<Json<MutationResponse>, StatusCode> {
    let session = state
        .sessions
        .board_for_channel(&channel_id)
        .await
        .map_err(internal_error)?;
    let mut board = session.lock().await;

    if board.cell(position).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let persisted = board.mark_cell(position).await;
    Ok(Json(MutationResponse {
        persisted,
        board: view(&board),
    }))
}

/// Drop the cached session for a channel. The persisted board is untouched
/// and will be reloaded on the channel's next operation.
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> StatusCode {
    state.sessions.close_channel(&channel_id);
    StatusCode::NO_CONTENT
}

/// Clear every mark on the channel's board. Marks are always cleared in
/// memory; `persisted` reports whether the bulk repository reset succeeded.
pub async fn reset_board(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<Json<MutationResponse>, StatusCode> {
    let session = state
        .sessions
        .board_for_channel(&channel_id)
        .await
        .map_err(internal_error)?;
    let mut board = session.lock().await;

    let persisted = board.reset().await;
    Ok(Json(MutationResponse {
        persisted,
        board: view(&board),
    }))
}
