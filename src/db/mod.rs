use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Result};

use crate::board::{BoardRepository, RepositoryError};

pub mod queries;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Postgres-backed implementation of the board engine's storage interface.
#[derive(Clone)]
pub struct PgBoardRepository {
    pool: PgPool,
}

impl PgBoardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoardRepository for PgBoardRepository {
    async fn add_cell(
        &self,
        board_id: i64,
        text: &str,
        position: i64,
    ) -> Result<i64, RepositoryError> {
        let cell_id = queries::insert_cell(&self.pool, board_id, text, position as i32).await?;
        Ok(cell_id)
    }

    async fn remove_cell(
        &self,
        board_id: i64,
        position: i64,
        cell_id: i64,
    ) -> Result<(), RepositoryError> {
        queries::delete_cell(&self.pool, board_id, position as i32, cell_id).await?;
        Ok(())
    }

    async fn update_cell(
        &self,
        cell_id: i64,
        position: i64,
        marked: bool,
    ) -> Result<(), RepositoryError> {
        queries::update_cell(&self.pool, cell_id, position as i32, marked).await?;
        Ok(())
    }

    async fn reset_board(&self, board_id: i64) -> Result<(), RepositoryError> {
        queries::reset_board(&self.pool, board_id).await?;
        Ok(())
    }
}
