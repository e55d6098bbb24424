pub mod board;
pub mod token;

pub use board::{BoardRecord, CellRecord};
pub use token::{AccessData, TeamInfo, WorkspaceToken};
