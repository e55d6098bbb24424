// Board engine: the in-memory bingo grid and its mutation/query operations.
// Everything durable goes through the BoardRepository trait; everything else
// is plain in-memory state owned by one session at a time.

pub mod repository;

pub use repository::{BoardRepository, RepositoryError};

use std::fmt;
use std::sync::Arc;

/// Shown when a board has no cells yet.
const EMPTY_BOARD_PLACEHOLDER: &str = "No items added yet";
/// Appended to a marked cell's text when rendering.
const MARKED_SUFFIX: &str = " :white_check_mark:";

/// One labeled, markable entry on a board.
///
/// The id comes from the repository when the cell is first persisted and never
/// changes. The text is immutable after creation; only the mark flag mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    id: i64,
    text: String,
    marked: bool,
}

impl Cell {
    pub fn new(id: i64, text: impl Into<String>, marked: bool) -> Self {
        Self {
            id,
            text: text.into(),
            marked,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }
}

/// One bingo grid, owned 1:1 by a chat channel.
///
/// Cells live in display order; position `p` (1-based, row-major) is index
/// `p - 1`. The grid dimensions are a step function of the cell count
/// (recomputed after every add/remove, never trusted from storage):
/// 1 cell is 1x1, up to 4 is 2x2, up to 9 is 3x3, up to 16 is 4x4, anything
/// beyond is capped at 5x5 - extra cells past position 25 exist and render,
/// but can never contribute to a completed line.
///
/// No internal locking: a board expects exactly one logical caller at a time,
/// and serializing chat events per channel is the session layer's job.
pub struct Board {
    id: i64,
    channel_id: String,
    cells: Vec<Cell>,
    grid_size: usize,
    line_length: usize,
    repository: Arc<dyn BoardRepository>,
}

impl Board {
    /// Create a fresh, empty board for a channel.
    pub fn new(id: i64, channel_id: impl Into<String>, repository: Arc<dyn BoardRepository>) -> Self {
        Self::load(id, channel_id, Vec::new(), repository)
    }

    /// Reconstruct a board from persisted cells, already in position order.
    pub fn load(
        id: i64,
        channel_id: impl Into<String>,
        cells: Vec<Cell>,
        repository: Arc<dyn BoardRepository>,
    ) -> Self {
        let mut board = Self {
            id,
            channel_id: channel_id.into(),
            cells,
            grid_size: 0,
            line_length: 0,
            repository,
        };
        board.update_grid_size();
        board
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn line_length(&self) -> usize {
        self.line_length
    }

    /// Cell at a 1-based position, if it exists.
    pub fn cell(&self, position: usize) -> Option<&Cell> {
        self.index(position).map(|i| &self.cells[i])
    }

    /// Append a cell with the given text at the next free position.
    ///
    /// The write is persisted first: on repository failure nothing changes in
    /// memory and the error is returned. On success the new (unmarked) cell
    /// takes position `count + 1`, the grid is resized, and the position is
    /// returned.
    pub async fn add_cell(&mut self, text: &str) -> Result<usize, RepositoryError> {
        let position = self.cells.len() + 1;
        let id = self
            .repository
            .add_cell(self.id, text, position as i64)
            .await?;

        self.cells.push(Cell::new(id, text, false));
        self.update_grid_size();

        Ok(position)
    }

    /// Remove the cell at a position, shifting later cells down one slot.
    ///
    /// Absent position or a failed repository delete both return false and
    /// leave the board untouched. The repository closes the stored position
    /// gap itself; in memory the ordered removal reindexes everything after
    /// the removed slot, tail included.
    pub async fn remove_cell(&mut self, position: usize) -> bool {
        let Some(index) = self.index(position) else {
            return false;
        };

        let cell_id = self.cells[index].id;
        if let Err(e) = self
            .repository
            .remove_cell(self.id, position as i64, cell_id)
            .await
        {
            tracing::warn!("Failed to remove cell {} from board {}: {}", cell_id, self.id, e);
            return false;
        }

        self.cells.remove(index);
        self.update_grid_size();
        true
    }

    /// Swap the cells at two positions and persist both at their new slots.
    ///
    /// Either position absent returns false with no change. Once both exist
    /// the in-memory swap happens first and is kept even when a repository
    /// write fails; the return value only reports whether both writes went
    /// through. Memory is the source of truth, persistence is best effort.
    pub async fn switch_cells(&mut self, pos_a: usize, pos_b: usize) -> bool {
        let (Some(index_a), Some(index_b)) = (self.index(pos_a), self.index(pos_b)) else {
            return false;
        };

        self.cells.swap(index_a, index_b);

        let first = &self.cells[index_a];
        if let Err(e) = self
            .repository
            .update_cell(first.id, pos_a as i64, first.marked)
            .await
        {
            tracing::warn!("Failed to persist switched cell {}: {}", first.id, e);
            return false;
        }

        let second = &self.cells[index_b];
        match self
            .repository
            .update_cell(second.id, pos_b as i64, second.marked)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist switched cell {}: {}", second.id, e);
                false
            }
        }
    }

    /// Mark the cell at a position.
    ///
    /// Absent position returns false. The flag is set in memory
    /// unconditionally; the return value reports whether the repository write
    /// succeeded (same best-effort contract as `switch_cells`).
    pub async fn mark_cell(&mut self, position: usize) -> bool {
        let Some(index) = self.index(position) else {
            return false;
        };

        self.cells[index].marked = true;

        let cell_id = self.cells[index].id;
        match self
            .repository
            .update_cell(cell_id, position as i64, true)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist mark on cell {}: {}", cell_id, e);
                false
            }
        }
    }

    /// Whether any full row, column, or diagonal is marked.
    ///
    /// Pure check against current in-memory state. Walks the logical
    /// `line_length x line_length` grid row-major, keeping a per-row run
    /// counter, one accumulator per column, and one per diagonal; the first
    /// counter to reach `line_length` wins. Positions past the logical grid
    /// (possible on a capped 5x5 board) are never visited, and missing cells
    /// count as unmarked.
    pub fn is_completed(&self) -> bool {
        let len = self.line_length;
        let mut columns = vec![0usize; len];
        let mut diagonal = 0usize;
        let mut anti_diagonal = 0usize;

        for row in 1..=len {
            let mut marked_in_row = 0usize;

            for col in 1..=len {
                let marked = self
                    .cells
                    .get((row - 1) * len + col - 1)
                    .is_some_and(|cell| cell.marked);
                if !marked {
                    continue;
                }

                marked_in_row += 1;
                columns[col - 1] += 1;

                if row == col {
                    diagonal += 1;
                }
                if row + col == len + 1 {
                    anti_diagonal += 1;
                }

                if marked_in_row == len
                    || columns[col - 1] == len
                    || diagonal == len
                    || anti_diagonal == len
                {
                    return true;
                }
            }
        }

        false
    }

    /// Clear every cell's mark flag.
    ///
    /// In-memory clearing is unconditional; the return value reports whether
    /// the bulk repository reset succeeded.
    pub async fn reset(&mut self) -> bool {
        for cell in &mut self.cells {
            cell.marked = false;
        }

        match self.repository.reset_board(self.id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist reset of board {}: {}", self.id, e);
                false
            }
        }
    }

    fn index(&self, position: usize) -> Option<usize> {
        (1..=self.cells.len())
            .contains(&position)
            .then(|| position - 1)
    }

    // Grid dimensions are a tiered step function of cell count, capped at 5x5.
    // An empty board lands in the 2x2 tier, which is harmless: completion
    // checks find no cells there.
    fn update_grid_size(&mut self) {
        self.line_length = match self.cells.len() {
            1 => 1,
            0..=4 => 2,
            5..=9 => 3,
            10..=16 => 4,
            _ => 5,
        };
        self.grid_size = self.line_length * self.line_length;
    }
}

impl fmt::Display for Board {
    /// Enumerated listing in position order, marked cells annotated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cells.is_empty() {
            return f.write_str(EMPTY_BOARD_PLACEHOLDER);
        }

        let items: Vec<String> = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let marked_text = if cell.marked { MARKED_SUFFIX } else { "" };
                format!("{}. {}{}", i + 1, cell.text, marked_text)
            })
            .collect();

        f.write_str(&items.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Mutex;

    /// Every call the engine makes against the repository, in order.
    #[derive(Debug, Clone, PartialEq)]
    enum RepoCall {
        AddCell {
            board_id: i64,
            text: String,
            position: i64,
        },
        RemoveCell {
            board_id: i64,
            position: i64,
            cell_id: i64,
        },
        UpdateCell {
            cell_id: i64,
            position: i64,
            marked: bool,
        },
        ResetBoard {
            board_id: i64,
        },
    }

    /// In-memory repository that records calls and can be told to fail.
    #[derive(Default)]
    struct FakeRepository {
        calls: Mutex<Vec<RepoCall>>,
        next_id: AtomicI64,
        failing: AtomicBool,
    }

    impl FakeRepository {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn calls(&self) -> Vec<RepoCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: RepoCall) -> Result<(), RepositoryError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl BoardRepository for FakeRepository {
        async fn add_cell(
            &self,
            board_id: i64,
            text: &str,
            position: i64,
        ) -> Result<i64, RepositoryError> {
            self.record(RepoCall::AddCell {
                board_id,
                text: text.to_string(),
                position,
            })?;
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn remove_cell(
            &self,
            board_id: i64,
            position: i64,
            cell_id: i64,
        ) -> Result<(), RepositoryError> {
            self.record(RepoCall::RemoveCell {
                board_id,
                position,
                cell_id,
            })
        }

        async fn update_cell(
            &self,
            cell_id: i64,
            position: i64,
            marked: bool,
        ) -> Result<(), RepositoryError> {
            self.record(RepoCall::UpdateCell {
                cell_id,
                position,
                marked,
            })
        }

        async fn reset_board(&self, board_id: i64) -> Result<(), RepositoryError> {
            self.record(RepoCall::ResetBoard { board_id })
        }
    }

    async fn board_with_cells(count: usize) -> (Board, Arc<FakeRepository>) {
        let repo = FakeRepository::new();
        let mut board = Board::new(1, "C123", repo.clone());
        for i in 1..=count {
            board.add_cell(&format!("item {}", i)).await.unwrap();
        }
        (board, repo)
    }

    async fn mark_all(board: &mut Board, positions: &[usize]) {
        for &p in positions {
            assert!(board.mark_cell(p).await);
        }
    }

    #[test]
    fn test_grid_size_tiers() {
        let repo = FakeRepository::new();
        let expected: [(usize, usize); 11] = [
            (0, 2),
            (1, 1),
            (2, 2),
            (4, 2),
            (5, 3),
            (9, 3),
            (10, 4),
            (16, 4),
            (17, 5),
            (25, 5),
            (40, 5), // capped, never grows past 5x5
        ];

        for (count, line_length) in expected {
            let cells: Vec<Cell> = (0..count).map(|i| Cell::new(i as i64, "x", false)).collect();
            let board = Board::load(1, "C123", cells, repo.clone());
            assert_eq!(
                board.line_length(),
                line_length,
                "line length for {} cells",
                count
            );
            assert_eq!(board.grid_size(), line_length * line_length);
        }
    }

    #[tokio::test]
    async fn test_add_cell_assigns_sequential_positions() {
        let repo = FakeRepository::new();
        let mut board = Board::new(1, "C123", repo.clone());

        assert_eq!(board.add_cell("first").await.unwrap(), 1);
        assert_eq!(board.add_cell("second").await.unwrap(), 2);
        assert_eq!(board.add_cell("third").await.unwrap(), 3);

        assert_eq!(board.cell_count(), 3);
        assert_eq!(board.cell(2).unwrap().text(), "second");
        assert!(!board.cell(1).unwrap().is_marked());

        assert_eq!(
            repo.calls()[0],
            RepoCall::AddCell {
                board_id: 1,
                text: "first".to_string(),
                position: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_add_cell_persistence_failure_leaves_board_unchanged() {
        let (mut board, repo) = board_with_cells(3).await;

        repo.set_failing(true);
        assert!(board.add_cell("doomed").await.is_err());

        assert_eq!(board.cell_count(), 3);
        assert_eq!(board.line_length(), 2);

        // Next successful add still gets position 4
        repo.set_failing(false);
        assert_eq!(board.add_cell("fourth").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_remove_cell_shifts_later_positions_down() {
        let (mut board, _repo) = board_with_cells(5).await;

        assert!(board.remove_cell(2).await);

        assert_eq!(board.cell_count(), 4);
        assert_eq!(board.cell(1).unwrap().text(), "item 1");
        assert_eq!(board.cell(2).unwrap().text(), "item 3");
        assert_eq!(board.cell(3).unwrap().text(), "item 4");
        assert_eq!(board.cell(4).unwrap().text(), "item 5");
        assert!(board.cell(5).is_none());
    }

    #[tokio::test]
    async fn test_remove_cell_tail_boundary() {
        // Regression guard for the last slot: removing the final cell must
        // neither duplicate nor drop the tail element.
        let (mut board, _repo) = board_with_cells(3).await;

        assert!(board.remove_cell(3).await);
        assert_eq!(board.cell_count(), 2);
        assert_eq!(board.cell(2).unwrap().text(), "item 2");
        assert!(board.cell(3).is_none());

        // And removing the one just before the tail keeps the tail intact.
        let (mut board, _repo) = board_with_cells(4).await;
        assert!(board.remove_cell(3).await);
        assert_eq!(board.cell_count(), 3);
        assert_eq!(board.cell(3).unwrap().text(), "item 4");
    }

    #[tokio::test]
    async fn test_remove_cell_recomputes_grid_size() {
        let (mut board, _repo) = board_with_cells(5).await;
        assert_eq!(board.line_length(), 3);

        assert!(board.remove_cell(1).await);
        assert_eq!(board.line_length(), 2);
    }

    #[tokio::test]
    async fn test_remove_cell_missing_position_is_noop() {
        let (mut board, repo) = board_with_cells(3).await;
        let calls_before = repo.calls().len();

        assert!(!board.remove_cell(0).await);
        assert!(!board.remove_cell(4).await);

        assert_eq!(board.cell_count(), 3);
        assert_eq!(repo.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_remove_cell_persistence_failure_leaves_board_unchanged() {
        let (mut board, repo) = board_with_cells(3).await;

        repo.set_failing(true);
        assert!(!board.remove_cell(2).await);

        assert_eq!(board.cell_count(), 3);
        assert_eq!(board.cell(2).unwrap().text(), "item 2");
    }

    #[tokio::test]
    async fn test_switch_cells_round_trip() {
        let (mut board, _repo) = board_with_cells(4).await;
        board.mark_cell(1).await;

        assert!(board.switch_cells(1, 3).await);
        assert_eq!(board.cell(1).unwrap().text(), "item 3");
        assert_eq!(board.cell(3).unwrap().text(), "item 1");
        assert!(board.cell(3).unwrap().is_marked());
        assert!(!board.cell(1).unwrap().is_marked());

        // Switching again restores the original order and mark state
        assert!(board.switch_cells(1, 3).await);
        assert_eq!(board.cell(1).unwrap().text(), "item 1");
        assert_eq!(board.cell(3).unwrap().text(), "item 3");
        assert!(board.cell(1).unwrap().is_marked());
        assert!(!board.cell(3).unwrap().is_marked());
    }

    #[tokio::test]
    async fn test_switch_cells_persists_both_cells_at_new_positions() {
        let (mut board, repo) = board_with_cells(2).await;
        board.mark_cell(2).await;

        let id_1 = board.cell(1).unwrap().id();
        let id_2 = board.cell(2).unwrap().id();

        assert!(board.switch_cells(1, 2).await);

        let calls = repo.calls();
        let updates = &calls[calls.len() - 2..];
        assert_eq!(
            updates[0],
            RepoCall::UpdateCell {
                cell_id: id_2,
                position: 1,
                marked: true,
            }
        );
        assert_eq!(
            updates[1],
            RepoCall::UpdateCell {
                cell_id: id_1,
                position: 2,
                marked: false,
            }
        );
    }

    #[tokio::test]
    async fn test_switch_cells_missing_position_is_noop() {
        let (mut board, _repo) = board_with_cells(3).await;

        assert!(!board.switch_cells(1, 4).await);
        assert!(!board.switch_cells(0, 2).await);

        assert_eq!(board.cell(1).unwrap().text(), "item 1");
        assert_eq!(board.cell(2).unwrap().text(), "item 2");
    }

    #[tokio::test]
    async fn test_switch_cells_keeps_memory_swap_on_persistence_failure() {
        // Documented asymmetry: the swap commits to memory first, the return
        // value only reports durability.
        let (mut board, repo) = board_with_cells(2).await;

        repo.set_failing(true);
        assert!(!board.switch_cells(1, 2).await);

        assert_eq!(board.cell(1).unwrap().text(), "item 2");
        assert_eq!(board.cell(2).unwrap().text(), "item 1");
    }

    #[tokio::test]
    async fn test_mark_cell_sets_flag_and_persists() {
        let (mut board, repo) = board_with_cells(3).await;
        let id = board.cell(2).unwrap().id();

        assert!(board.mark_cell(2).await);
        assert!(board.cell(2).unwrap().is_marked());

        assert_eq!(
            *repo.calls().last().unwrap(),
            RepoCall::UpdateCell {
                cell_id: id,
                position: 2,
                marked: true,
            }
        );
    }

    #[tokio::test]
    async fn test_mark_cell_missing_position_is_noop() {
        let (mut board, _repo) = board_with_cells(2).await;
        assert!(!board.mark_cell(0).await);
        assert!(!board.mark_cell(3).await);
    }

    #[tokio::test]
    async fn test_mark_cell_keeps_flag_on_persistence_failure() {
        let (mut board, repo) = board_with_cells(2).await;

        repo.set_failing(true);
        assert!(!board.mark_cell(1).await);

        // Flag is committed to memory regardless of durability
        assert!(board.cell(1).unwrap().is_marked());
    }

    #[tokio::test]
    async fn test_is_completed_empty_and_unmarked_boards() {
        let repo = FakeRepository::new();
        let board = Board::new(1, "C123", repo.clone());
        assert!(!board.is_completed());

        let (board, _repo) = board_with_cells(9).await;
        assert!(!board.is_completed());
    }

    #[tokio::test]
    async fn test_is_completed_full_row() {
        let (mut board, _repo) = board_with_cells(9).await;
        mark_all(&mut board, &[1, 2, 3]).await;
        assert!(board.is_completed());
    }

    #[tokio::test]
    async fn test_is_completed_full_column() {
        let (mut board, _repo) = board_with_cells(9).await;
        mark_all(&mut board, &[1, 4, 7]).await;
        assert!(board.is_completed());
    }

    #[tokio::test]
    async fn test_is_completed_main_diagonal() {
        let (mut board, _repo) = board_with_cells(9).await;
        mark_all(&mut board, &[1, 5, 9]).await;
        assert!(board.is_completed());
    }

    #[tokio::test]
    async fn test_is_completed_anti_diagonal() {
        let (mut board, _repo) = board_with_cells(9).await;
        mark_all(&mut board, &[3, 5, 7]).await;
        assert!(board.is_completed());
    }

    #[tokio::test]
    async fn test_is_completed_no_full_line() {
        let (mut board, _repo) = board_with_cells(9).await;
        mark_all(&mut board, &[1, 2, 4, 5]).await;
        assert!(!board.is_completed());
    }

    #[tokio::test]
    async fn test_is_completed_partial_last_row() {
        // 5 cells on a 3x3 grid: bottom row is mostly missing, and missing
        // cells count as unmarked.
        let (mut board, _repo) = board_with_cells(5).await;
        mark_all(&mut board, &[4, 5]).await;
        assert!(!board.is_completed());
    }

    #[tokio::test]
    async fn test_is_completed_ignores_cells_past_capped_grid() {
        // 30 cells on a capped 5x5 grid: positions 26..30 are invisible to
        // win detection no matter their mark state.
        let (mut board, _repo) = board_with_cells(30).await;
        mark_all(&mut board, &[26, 27, 28, 29, 30]).await;
        assert!(!board.is_completed());

        // A full row inside the logical grid still wins
        mark_all(&mut board, &[1, 2, 3, 4, 5]).await;
        assert!(board.is_completed());
    }

    #[tokio::test]
    async fn test_reset_clears_all_marks() {
        let (mut board, repo) = board_with_cells(9).await;
        mark_all(&mut board, &[1, 2, 3]).await;
        assert!(board.is_completed());

        assert!(board.reset().await);
        assert!(!board.is_completed());
        assert!((1..=9).all(|p| !board.cell(p).unwrap().is_marked()));

        assert_eq!(
            *repo.calls().last().unwrap(),
            RepoCall::ResetBoard { board_id: 1 }
        );
    }

    #[tokio::test]
    async fn test_reset_clears_marks_even_on_persistence_failure() {
        let (mut board, repo) = board_with_cells(4).await;
        mark_all(&mut board, &[1, 2]).await;

        repo.set_failing(true);
        assert!(!board.reset().await);

        assert!((1..=4).all(|p| !board.cell(p).unwrap().is_marked()));
        assert!(!board.is_completed());
    }

    #[tokio::test]
    async fn test_display_empty_board_placeholder() {
        let repo = FakeRepository::new();
        let board = Board::new(1, "C123", repo);
        assert_eq!(board.to_string(), "No items added yet");
    }

    #[tokio::test]
    async fn test_display_lists_cells_with_mark_annotation() {
        let repo = FakeRepository::new();
        let mut board = Board::new(1, "C123", repo);
        board.add_cell("Ship the release").await.unwrap();
        board.add_cell("Fix the flaky test").await.unwrap();
        board.mark_cell(1).await;

        assert_eq!(
            board.to_string(),
            "1. Ship the release :white_check_mark:\n2. Fix the flaky test"
        );
    }

    #[test]
    fn test_load_recomputes_grid_size_from_cells() {
        let repo = FakeRepository::new();
        let cells = vec![
            Cell::new(10, "a", true),
            Cell::new(11, "b", false),
            Cell::new(12, "c", false),
            Cell::new(13, "d", true),
            Cell::new(14, "e", false),
        ];
        let board = Board::load(7, "C456", cells, repo);

        assert_eq!(board.id(), 7);
        assert_eq!(board.channel_id(), "C456");
        assert_eq!(board.line_length(), 3);
        assert!(board.cell(1).unwrap().is_marked());
        assert!(!board.cell(2).unwrap().is_marked());
    }
}
