use sqlx::{PgPool, Result};

use crate::{
    encryption,
    models::{BoardRecord, CellRecord, WorkspaceToken},
};

// Board queries

/// Fetch the board for a channel, creating an empty one if none exists yet.
/// One board per channel, enforced by the unique constraint on channel_id.
pub async fn get_or_create_board(pool: &PgPool, channel_id: &str) -> Result<BoardRecord> {
    if let Some(board) =
        sqlx::query_as::<_, BoardRecord>("SELECT * FROM boards WHERE channel_id = $1")
            .bind(channel_id)
            .fetch_optional(pool)
            .await?
    {
        return Ok(board);
    }

    sqlx::query_as::<_, BoardRecord>(
        r#"
        INSERT INTO boards (channel_id)
        VALUES ($1)
        ON CONFLICT (channel_id) DO UPDATE SET channel_id = EXCLUDED.channel_id
        RETURNING *
        "#,
    )
    .bind(channel_id)
    .fetch_one(pool)
    .await
}

/// All cells of a board in display order.
pub async fn get_board_cells(pool: &PgPool, board_id: i64) -> Result<Vec<CellRecord>> {
    sqlx::query_as::<_, CellRecord>(
        "SELECT * FROM cells WHERE board_id = $1 ORDER BY position ASC",
    )
    .bind(board_id)
    .fetch_all(pool)
    .await
}

pub async fn insert_cell(
    pool: &PgPool,
    board_id: i64,
    text: &str,
    position: i32,
) -> Result<i64> {
    let (cell_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO cells (board_id, position, text)
        VALUES ($1, $2, $3)
        RETURNING cell_id
        "#,
    )
    .bind(board_id)
    .bind(position)
    .bind(text)
    .fetch_one(pool)
    .await?;

    Ok(cell_id)
}

/// Delete a cell and shift every later cell of the same board down one
/// position, in a single transaction so stored positions stay dense.
pub async fn delete_cell(pool: &PgPool, board_id: i64, position: i32, cell_id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM cells WHERE cell_id = $1 AND board_id = $2")
        .bind(cell_id)
        .bind(board_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        UPDATE cells
        SET position = position - 1
        WHERE board_id = $1 AND position > $2
        "#,
    )
    .bind(board_id)
    .bind(position)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn update_cell(pool: &PgPool, cell_id: i64, position: i32, marked: bool) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE cells
        SET position = $1, marked = $2
        WHERE cell_id = $3
        "#,
    )
    .bind(position)
    .bind(marked)
    .bind(cell_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Clear the mark flag on every cell of a board in one statement.
pub async fn reset_board(pool: &PgPool, board_id: i64) -> Result<()> {
    sqlx::query("UPDATE cells SET marked = FALSE WHERE board_id = $1")
        .bind(board_id)
        .execute(pool)
        .await?;

    Ok(())
}

// Workspace token queries

/// Store (or rotate) the bot token for a workspace. The token is encrypted
/// before it touches the database.
pub async fn save_workspace_token(
    pool: &PgPool,
    team_id: &str,
    team_name: Option<&str>,
    access_token: &str,
    encryption_key: &str,
) -> Result<WorkspaceToken> {
    let encrypted_token = encryption::encrypt(access_token, encryption_key)
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to encrypt access token: {}", e)))?;

    let mut token = sqlx::query_as::<_, WorkspaceToken>(
        r#"
        INSERT INTO workspace_tokens (team_id, team_name, access_token)
        VALUES ($1, $2, $3)
        ON CONFLICT (team_id)
        DO UPDATE SET
            team_name = $2,
            access_token = $3,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(team_id)
    .bind(team_name)
    .bind(&encrypted_token)
    .fetch_one(pool)
    .await?;

    // Decrypt the returned row so callers never see ciphertext
    token.access_token = encryption::decrypt(&token.access_token, encryption_key)
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to decrypt access token: {}", e)))?;

    Ok(token)
}
