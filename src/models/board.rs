use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for a board. One board per Slack channel.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BoardRecord {
    pub board_id: i64,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
}

/// Database row for a single cell of a board.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CellRecord {
    pub cell_id: i64,
    pub board_id: i64,
    /// 1-based, dense, row-major display position within the board.
    pub position: i32,
    pub text: String,
    pub marked: bool,
    pub created_at: DateTime<Utc>,
}
