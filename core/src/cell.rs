use serde::{Deserialize, Serialize};

use crate::*;

/// A single grid position and the transitions the rules allow on it.
///
/// The position is fixed at creation. `has_mine` and `is_revealed` only ever
/// go from `false` to `true`, and a revealed cell can no longer be flagged.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    row: Coord,
    col: Coord,
    has_mine: bool,
    is_revealed: bool,
    is_flagged: bool,
    adjacent_mines: u8,
}

impl Cell {
    pub const fn new(row: Coord, col: Coord) -> Self {
        Self {
            row,
            col,
            has_mine: false,
            is_revealed: false,
            is_flagged: false,
            adjacent_mines: 0,
        }
    }

    pub const fn row(&self) -> Coord {
        self.row
    }

    pub const fn col(&self) -> Coord {
        self.col
    }

    pub const fn coords(&self) -> Coord2 {
        (self.row, self.col)
    }

    pub const fn has_mine(&self) -> bool {
        self.has_mine
    }

    pub const fn is_revealed(&self) -> bool {
        self.is_revealed
    }

    pub const fn is_flagged(&self) -> bool {
        self.is_flagged
    }

    pub const fn adjacent_mines(&self) -> u8 {
        self.adjacent_mines
    }

    pub fn place_mine(&mut self) {
        self.has_mine = true;
    }

    /// Uncovers the cell, returns `false` without touching it when it is
    /// already revealed or flagged.
    pub fn reveal(&mut self) -> bool {
        if self.is_revealed || self.is_flagged {
            return false;
        }
        self.is_revealed = true;
        true
    }

    /// Flips the flag and returns the new state; revealed cells keep theirs.
    pub fn toggle_flag(&mut self) -> bool {
        if self.is_revealed {
            return self.is_flagged;
        }
        self.is_flagged = !self.is_flagged;
        self.is_flagged
    }

    pub fn set_adjacent_mines(&mut self, count: u8) {
        self.adjacent_mines = count;
    }

    /// No mine here and none around, revealing it opens its neighbors too.
    pub const fn is_empty(&self) -> bool {
        !self.has_mine && self.adjacent_mines == 0
    }

    /// Reveals a mine regardless of flags, only used to expose the layout
    /// once the game is lost.
    pub(crate) fn force_reveal(&mut self) {
        self.is_revealed = true;
    }
}
