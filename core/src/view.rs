use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// What a renderer should draw for a cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellView {
    #[default]
    Hidden,
    Flagged,
    Open(u8),
    /// Mine uncovered after the round was lost
    Mine,
    /// The mine that ended the round
    Exploded,
    /// Flag left on a safe cell when the round was lost
    WrongFlag,
}

impl CellView {
    /// `hit_mine` is only set once the round is lost.
    pub fn classify(cell: &Cell, hit_mine: Option<Coord2>) -> Self {
        use CellView::*;

        let lost = hit_mine.is_some();
        match (cell.is_revealed(), cell.has_mine()) {
            (true, true) if hit_mine == Some(cell.coords()) => Exploded,
            (true, true) => Mine,
            (true, false) => Open(cell.adjacent_mines()),
            (false, false) if lost && cell.is_flagged() => WrongFlag,
            (false, _) if cell.is_flagged() => Flagged,
            (false, _) => Hidden,
        }
    }

    /// Whether the cell is still drawn covered.
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Hidden | Self::Flagged | Self::WrongFlag)
    }
}

impl Board {
    pub fn views(&self, hit_mine: Option<Coord2>) -> Array2<CellView> {
        self.cell_grid().map(|cell| CellView::classify(cell, hit_mine))
    }
}
