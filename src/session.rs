use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::{
    board::{Board, BoardRepository, Cell},
    db::{self, PgBoardRepository},
};

/// Per-channel board sessions.
///
/// The engine itself does no locking, so every channel gets exactly one
/// `Board` behind a mutex and concurrent chat events on that channel are
/// serialized here. Sessions are created lazily on first use and dropped on
/// `close_channel`; the board rows themselves stay in the database.
pub struct SessionRegistry {
    boards: DashMap<String, Arc<Mutex<Board>>>,
    pool: PgPool,
    repository: Arc<dyn BoardRepository>,
}

impl SessionRegistry {
    pub fn new(pool: PgPool) -> Self {
        let repository: Arc<dyn BoardRepository> = Arc::new(PgBoardRepository::new(pool.clone()));
        Self {
            boards: DashMap::new(),
            pool,
            repository,
        }
    }

    /// The board session for a channel, loading (or creating) it on first use.
    pub async fn board_for_channel(&self, channel_id: &str) -> Result<Arc<Mutex<Board>>> {
        if let Some(board) = self.boards.get(channel_id) {
            return Ok(board.clone());
        }

        let record = db::queries::get_or_create_board(&self.pool, channel_id).await?;
        let cells: Vec<Cell> = db::queries::get_board_cells(&self.pool, record.board_id)
            .await?
            .into_iter()
            .map(|c| Cell::new(c.cell_id, c.text, c.marked))
            .collect();

        // Grid size is derived from the loaded cells, never read from storage
        let board = if cells.is_empty() {
            Board::new(record.board_id, channel_id, self.repository.clone())
        } else {
            Board::load(record.board_id, channel_id, cells, self.repository.clone())
        };

        let session = self
            .boards
            .entry(channel_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(board)));
        Ok(session.clone())
    }

    /// Drop the cached session for a channel. Persistent state is untouched.
    pub fn close_channel(&self, channel_id: &str) {
        self.boards.remove(channel_id);
    }

    pub fn active_sessions(&self) -> usize {
        self.boards.len()
    }
}
