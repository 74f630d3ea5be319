use core::fmt;
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::*;

/// Valid transitions:
/// - NotStarted -> InProgress
/// - InProgress -> Won
/// - InProgress -> Lost
///
/// Only a new round goes back to NotStarted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameStatus {
    /// Board ready, no mines placed yet
    #[default]
    NotStarted,
    /// First cell revealed, clock running
    InProgress,
    /// Every safe cell revealed
    Won,
    /// A mine was revealed
    Lost,
}

impl GameStatus {
    pub const fn is_not_started(self) -> bool {
        matches!(self, Self::NotStarted)
    }

    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Won or lost, no more moves are accepted.
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use GameStatus::*;
        f.write_str(match self {
            NotStarted => "not-started",
            InProgress => "in-progress",
            Won => "won",
            Lost => "lost",
        })
    }
}

/// Called with `(new, old)` on every status change.
pub type StatusObserver = Box<dyn FnMut(GameStatus, GameStatus)>;

/// Outcome of revealing a cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClickResult {
    /// Cells uncovered by this click, in reveal order; every mine on a loss
    pub revealed: Vec<Cell>,
    pub status: GameStatus,
    /// The mine that was clicked, set only on the losing click
    pub hit_mine: Option<Cell>,
}

impl ClickResult {
    fn no_change(status: GameStatus) -> Self {
        Self {
            revealed: Vec::new(),
            status,
            hit_mine: None,
        }
    }

    /// Whether anything on the board changed
    pub fn has_update(&self) -> bool {
        !self.revealed.is_empty()
    }
}

/// Outcome of toggling a flag, `cell` is `None` when nothing happened.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FlagResult {
    pub cell: Option<Cell>,
    pub flagged: bool,
}

impl FlagResult {
    pub const NO_CHANGE: Self = Self {
        cell: None,
        flagged: false,
    };

    pub const fn has_update(&self) -> bool {
        self.cell.is_some()
    }
}

/// Borrowed view of a round for rendering.
#[derive(Copy, Clone, Debug)]
pub struct GameState<'a> {
    pub difficulty: Difficulty,
    pub status: GameStatus,
    pub elapsed_time: u32,
    pub remaining_mines: i32,
    pub board: &'a Board,
}

/// Owned, serializable picture of a round, mine positions hidden unless shown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub difficulty: Difficulty,
    pub status: GameStatus,
    pub elapsed_time: u32,
    pub remaining_mines: i32,
    pub cells: Array2<CellView>,
}

/// A game session: one board per round plus status, clock and observer.
pub struct Game<C = SystemClock> {
    difficulty: Difficulty,
    board: Board,
    status: GameStatus,
    hit_mine: Option<Coord2>,
    stopwatch: Stopwatch,
    clock: C,
    rng: SmallRng,
    observer: Option<StatusObserver>,
}

impl Game {
    /// Beginner round, ready for its first click.
    pub fn new() -> Self {
        Self::from_parts(SystemClock, SmallRng::from_os_rng())
    }

    pub fn with_observer(observer: impl FnMut(GameStatus, GameStatus) + 'static) -> Self {
        let mut game = Self::new();
        game.set_observer(observer);
        game
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Game<C> {
    /// Game on a custom clock with reproducible mine layouts.
    pub fn with_clock(clock: C, seed: u64) -> Self {
        Self::from_parts(clock, SmallRng::seed_from_u64(seed))
    }

    fn from_parts(clock: C, rng: SmallRng) -> Self {
        let difficulty = Difficulty::default();
        Self {
            difficulty,
            board: Board::new(difficulty.config()),
            status: GameStatus::NotStarted,
            hit_mine: None,
            stopwatch: Stopwatch::default(),
            clock,
            rng,
            observer: None,
        }
    }

    /// Registers the status observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl FnMut(GameStatus, GameStatus) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Throws away the current board and starts over on `difficulty`.
    pub fn new_game(&mut self, difficulty: Difficulty) {
        self.stopwatch.reset();
        log::debug!("New {} game", difficulty);
        self.difficulty = difficulty;
        self.board = Board::new(difficulty.config());
        self.hit_mine = None;
        self.set_status(GameStatus::NotStarted);
    }

    /// Like [`Game::new_game`], with the difficulty given by name. An unknown
    /// name leaves the current round alone.
    pub fn new_game_named(&mut self, difficulty: &str) -> Result<()> {
        let difficulty = difficulty.parse()?;
        self.new_game(difficulty);
        Ok(())
    }

    /// New round on the current difficulty.
    pub fn restart(&mut self) {
        self.new_game(self.difficulty);
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn is_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn is_playing(&self) -> bool {
        self.status.is_in_progress()
    }

    pub fn is_not_started(&self) -> bool {
        self.status.is_not_started()
    }

    /// The mine that lost the round.
    pub fn hit_mine(&self) -> Option<&Cell> {
        self.hit_mine.map(|(row, col)| &self.board[(row, col)])
    }

    /// Reveals a cell.
    ///
    /// The first reveal of a round lays the mines out around it and starts the
    /// clock. Out-of-bounds clicks and clicks on a flag are ignored, so is
    /// any click once the round is over.
    pub fn handle_click(&mut self, row: Coord, col: Coord) -> ClickResult {
        if self.status.is_over() {
            return ClickResult::no_change(self.status);
        }

        match self.board.get_cell(row, col) {
            Some(cell) if !cell.is_flagged() => {}
            _ => return ClickResult::no_change(self.status),
        }

        if self.status.is_not_started() {
            self.board.place_mines(row, col, &mut self.rng);
            self.set_status(GameStatus::InProgress);
            self.stopwatch.start(self.clock.now());
        }

        let revealed = self.board.reveal_cell(row, col);
        log::debug!("Click at {:?} revealed {} cells", (row, col), revealed.len());

        if self.board[(row, col)].has_mine() {
            self.hit_mine = Some((row, col));
            self.set_status(GameStatus::Lost);
            self.stopwatch.stop(self.clock.now());
            let mines = self.board.reveal_all_mines();
            return ClickResult {
                revealed: mines,
                status: self.status,
                hit_mine: Some(self.board[(row, col)]),
            };
        }

        if self.board.count_unrevealed_safe() == 0 {
            self.set_status(GameStatus::Won);
            self.stopwatch.stop(self.clock.now());
        }

        ClickResult {
            revealed,
            status: self.status,
            hit_mine: None,
        }
    }

    /// Toggles the flag on a covered cell, also allowed before the first click.
    pub fn handle_right_click(&mut self, row: Coord, col: Coord) -> FlagResult {
        if self.status.is_over() {
            return FlagResult::NO_CHANGE;
        }

        let Some(cell) = self.board.get_cell_mut(row, col) else {
            return FlagResult::NO_CHANGE;
        };
        if cell.is_revealed() {
            return FlagResult::NO_CHANGE;
        }

        let flagged = cell.toggle_flag();
        log::trace!("Flag at {:?} is now {}", (row, col), flagged);
        FlagResult {
            cell: Some(*cell),
            flagged,
        }
    }

    /// Mines minus flags, negative when over-flagged.
    pub fn remaining_mines(&self) -> i32 {
        i32::from(self.board.mine_count()) - i32::from(self.board.count_flags())
    }

    /// Whole seconds since the first click, frozen once the round is over.
    pub fn elapsed_secs(&self) -> u32 {
        self.stopwatch.elapsed_secs(self.clock.now())
    }

    /// Periodic hook for the host's interval, returns the new reading when
    /// the displayed second changed. Does nothing outside a running round.
    pub fn tick(&mut self) -> Option<u32> {
        if !self.status.is_in_progress() {
            return None;
        }
        self.stopwatch.sample(self.clock.now())
    }

    pub fn state(&self) -> GameState<'_> {
        GameState {
            difficulty: self.difficulty,
            status: self.status,
            elapsed_time: self.elapsed_secs(),
            remaining_mines: self.remaining_mines(),
            board: &self.board,
        }
    }

    pub fn cell_views(&self) -> Array2<CellView> {
        self.board.views(self.hit_mine)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            difficulty: self.difficulty,
            status: self.status,
            elapsed_time: self.elapsed_secs(),
            remaining_mines: self.remaining_mines(),
            cells: self.cell_views(),
        }
    }

    fn set_status(&mut self, status: GameStatus) {
        let old = self.status;
        if old == status {
            return;
        }
        self.status = status;
        log::debug!("Status changed from {} to {}", old, status);
        if let Some(observer) = self.observer.as_mut() {
            observer(status, old);
        }
    }

    #[cfg(test)]
    pub(crate) fn install_board(&mut self, board: Board) {
        self.stopwatch.reset();
        self.board = board;
        self.hit_mine = None;
        self.set_status(GameStatus::NotStarted);
    }
}

impl<C: fmt::Debug> fmt::Debug for Game<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("difficulty", &self.difficulty)
            .field("board", &self.board)
            .field("status", &self.status)
            .field("hit_mine", &self.hit_mine)
            .field("stopwatch", &self.stopwatch)
            .field("clock", &self.clock)
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}
