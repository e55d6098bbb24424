use async_trait::async_trait;
use thiserror::Error;

/// Failure from the durable storage backing a board.
///
/// The engine never retries; a failed call is surfaced to the caller of the
/// board operation that triggered it and affects nothing else.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable storage consumed by the board engine.
///
/// Implementations own cell identity: `add_cell` allocates and returns the
/// stable id for a new cell. Position bookkeeping after a removal (closing the
/// gap left by the deleted cell) is also the implementation's job.
#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// Persist a new cell for `board_id` at `position`, returning its id.
    async fn add_cell(
        &self,
        board_id: i64,
        text: &str,
        position: i64,
    ) -> Result<i64, RepositoryError>;

    /// Delete the cell `cell_id` at `position` and close the position gap.
    async fn remove_cell(
        &self,
        board_id: i64,
        position: i64,
        cell_id: i64,
    ) -> Result<(), RepositoryError>;

    /// Persist a cell's position and mark flag.
    async fn update_cell(
        &self,
        cell_id: i64,
        position: i64,
        marked: bool,
    ) -> Result<(), RepositoryError>;

    /// Clear the mark flag on every cell of `board_id`.
    async fn reset_board(&self, board_id: i64) -> Result<(), RepositoryError>;
}
