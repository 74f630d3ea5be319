use core::ops::{Index, IndexMut};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// The mine grid of a single round.
///
/// Mines are laid out lazily by [`Board::place_mines`] so the first reveal can
/// never hit one. Once placed, the layout is fixed for the life of the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    config: GameConfig,
    grid: Array2<Cell>,
    mines_placed: bool,
}

impl Board {
    pub fn new(config: GameConfig) -> Self {
        let grid = Array2::from_shape_fn(config.size().to_nd_index(), |(row, col)| {
            Cell::new(row as Coord, col as Coord)
        });
        Self {
            config,
            grid,
            mines_placed: false,
        }
    }

    /// Board with a known layout, adjacency counts already computed.
    ///
    /// Duplicate coordinates are only counted once.
    pub fn with_mines(rows: Coord, cols: Coord, mine_coords: &[Coord2]) -> Result<Self> {
        let mut board = Self::new(GameConfig::new(rows, cols, 0)?);

        for &coords in mine_coords {
            board
                .get_cell_mut(coords.0, coords.1)
                .ok_or(GameError::InvalidCoords)?
                .place_mine();
        }

        board.config = GameConfig::new(rows, cols, board.count_mines())?;
        board.compute_adjacent_mines();
        board.mines_placed = true;
        Ok(board)
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn rows(&self) -> Coord {
        self.config.rows
    }

    pub fn cols(&self) -> Coord {
        self.config.cols
    }

    pub fn size(&self) -> Coord2 {
        self.config.size()
    }

    /// Mines this board is meant to hold, whether or not they were placed yet.
    pub fn mine_count(&self) -> CellCount {
        self.config.mines
    }

    pub fn mines_placed(&self) -> bool {
        self.mines_placed
    }

    pub fn is_valid_cell(&self, row: Coord, col: Coord) -> bool {
        row < self.config.rows && col < self.config.cols
    }

    pub fn get_cell(&self, row: Coord, col: Coord) -> Option<&Cell> {
        self.grid.get((row, col).to_nd_index())
    }

    pub fn get_cell_mut(&mut self, row: Coord, col: Coord) -> Option<&mut Cell> {
        self.grid.get_mut((row, col).to_nd_index())
    }

    /// All cells, row by row.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.grid.iter()
    }

    pub(crate) fn cell_grid(&self) -> &Array2<Cell> {
        &self.grid
    }

    pub fn neighbor_coords(&self, row: Coord, col: Coord) -> NeighborIter {
        self.grid.iter_neighbors((row, col))
    }

    /// Up to 8 surrounding cells, top-left to bottom-right.
    pub fn neighbors(&self, row: Coord, col: Coord) -> SmallVec<[Cell; 8]> {
        self.neighbor_coords(row, col).map(|pos| self[pos]).collect()
    }

    /// Lays out the mines, keeping `(safe_row, safe_col)` and its neighbors clear.
    ///
    /// Runs once; later calls leave the layout untouched. Positions are drawn
    /// uniformly and rejected when already mined or inside the safe zone, so
    /// the mine count has to fit in the cells outside that zone. Every preset
    /// leaves plenty of room; a config that does not gets as many mines as fit.
    pub fn place_mines<R: Rng>(&mut self, safe_row: Coord, safe_col: Coord, rng: &mut R) {
        if self.mines_placed {
            return;
        }

        let safe = (safe_row, safe_col);
        let mut safe_zone: SmallVec<[Coord2; 9]> = self.grid.iter_neighbors(safe).collect();
        safe_zone.push(safe);

        let free_cells = self
            .grid
            .iter()
            .filter(|cell| !safe_zone.contains(&cell.coords()))
            .count() as CellCount;
        let target = if self.config.mines > free_cells {
            log::warn!(
                "Cannot fit {} mines outside the safe zone, only {} cells are free",
                self.config.mines,
                free_cells
            );
            free_cells
        } else {
            self.config.mines
        };

        let mut placed = 0;
        while placed < target {
            let coords = (
                rng.random_range(0..self.config.rows),
                rng.random_range(0..self.config.cols),
            );
            if safe_zone.contains(&coords) {
                continue;
            }

            let cell = &mut self[coords];
            if cell.has_mine() {
                continue;
            }
            cell.place_mine();
            placed += 1;
        }
        log::debug!("Placed {} mines around safe cell {:?}", placed, safe);

        self.compute_adjacent_mines();
        self.mines_placed = true;
    }

    fn compute_adjacent_mines(&mut self) {
        for row in 0..self.config.rows {
            for col in 0..self.config.cols {
                let coords = (row, col);
                if self[coords].has_mine() {
                    continue;
                }
                let count = self
                    .grid
                    .iter_neighbors(coords)
                    .filter(|&pos| self[pos].has_mine())
                    .count();
                self[coords].set_adjacent_mines(count as u8);
            }
        }
    }

    /// Reveals a cell and, when it is empty, the whole region around it.
    ///
    /// Returns the newly revealed cells in reveal order, nothing when the
    /// coordinates are out of bounds or the cell is revealed or flagged. The
    /// region is walked depth-first with an explicit stack; flagged cells
    /// stop the walk and every cell is revealed at most once.
    pub fn reveal_cell(&mut self, row: Coord, col: Coord) -> Vec<Cell> {
        let mut revealed = Vec::new();

        let Some(cell) = self.get_cell_mut(row, col) else {
            return revealed;
        };
        if !cell.reveal() {
            return revealed;
        }
        let start = *cell;
        revealed.push(start);
        log::trace!("Revealed cell at {:?}, mine count: {}", start.coords(), start.adjacent_mines());

        if !start.is_empty() {
            return revealed;
        }

        let mut to_visit: Vec<Coord2> = Vec::new();
        to_visit.extend(self.closed_neighbors(start.coords()).into_iter().rev());
        log::trace!("Starting cascade from {:?}, initial neighbors: {:?}", start.coords(), to_visit);

        while let Some(visit_coords) = to_visit.pop() {
            let cell = &mut self[visit_coords];
            // opened earlier in this cascade
            if !cell.reveal() {
                continue;
            }
            let cell = *cell;
            revealed.push(cell);
            log::trace!("Cascade revealed {:?}, mine count: {}", visit_coords, cell.adjacent_mines());

            if cell.is_empty() {
                to_visit.extend(self.closed_neighbors(visit_coords).into_iter().rev());
            }
        }

        revealed
    }

    fn closed_neighbors(&self, coords: Coord2) -> SmallVec<[Coord2; 8]> {
        self.grid
            .iter_neighbors(coords)
            .filter(|&pos| {
                let cell = &self[pos];
                !cell.is_revealed() && !cell.is_flagged()
            })
            .collect()
    }

    /// Safe cells still covered; the round is won when this reaches zero.
    pub fn count_unrevealed_safe(&self) -> CellCount {
        self.count_where(|cell| !cell.is_revealed() && !cell.has_mine())
    }

    pub fn count_flags(&self) -> CellCount {
        self.count_where(Cell::is_flagged)
    }

    /// Mines actually on the board.
    pub fn count_mines(&self) -> CellCount {
        self.count_where(Cell::has_mine)
    }

    fn count_where(&self, predicate: impl Fn(&Cell) -> bool) -> CellCount {
        self.grid.iter().filter(|&cell| predicate(cell)).count() as CellCount
    }

    /// Uncovers every mine, flagged or not, and returns them row by row.
    pub fn reveal_all_mines(&mut self) -> Vec<Cell> {
        self.grid
            .iter_mut()
            .filter(|cell| cell.has_mine())
            .map(|cell| {
                cell.force_reveal();
                *cell
            })
            .collect()
    }
}

impl Index<Coord2> for Board {
    type Output = Cell;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.grid[coords.to_nd_index()]
    }
}

impl IndexMut<Coord2> for Board {
    fn index_mut(&mut self, coords: Coord2) -> &mut Self::Output {
        &mut self.grid[coords.to_nd_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    fn beginner() -> Board {
        Board::new(Difficulty::Beginner.config())
    }

    #[test]
    fn new_board_has_fresh_cells_in_place() {
        let board = Board::new(GameConfig::new_unchecked(4, 7, 3));

        assert_eq!(board.size(), (4, 7));
        assert_eq!(board.mine_count(), 3);
        assert!(!board.mines_placed());
        assert_eq!(board.cells().count(), 28);
        for cell in board.cells() {
            assert_eq!(board.get_cell(cell.row(), cell.col()), Some(cell));
            assert_eq!(*cell, Cell::new(cell.row(), cell.col()));
        }
    }

    #[test]
    fn get_cell_is_none_out_of_bounds() {
        let board = beginner();

        assert!(board.is_valid_cell(8, 8));
        assert!(!board.is_valid_cell(9, 0));
        assert!(!board.is_valid_cell(0, 9));
        assert!(board.get_cell(9, 0).is_none());
        assert!(board.get_cell(0, Coord::MAX).is_none());
    }

    #[test]
    fn neighbors_count_depends_on_position() {
        let board = beginner();

        assert_eq!(board.neighbors(4, 4).len(), 8);
        assert_eq!(board.neighbors(0, 0).len(), 3);
        assert_eq!(board.neighbors(0, 4).len(), 5);
        let coords: Vec<_> = board.neighbors(0, 0).iter().map(Cell::coords).collect();
        assert_eq!(coords, vec![(0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn place_mines_keeps_safe_zone_clear() {
        for seed in 0..32 {
            let mut board = beginner();
            board.place_mines(4, 4, &mut rng(seed));

            assert_eq!(board.count_mines(), 10);
            assert!(!board[(4, 4)].has_mine());
            assert!(board.neighbors(4, 4).iter().all(|cell| !cell.has_mine()));
        }
    }

    #[test]
    fn place_mines_in_corner_keeps_corner_clear() {
        let mut board = Board::new(Difficulty::Expert.config());
        board.place_mines(0, 0, &mut rng(7));

        assert_eq!(board.count_mines(), 99);
        for coords in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            assert!(!board[coords].has_mine());
        }
    }

    #[test]
    fn place_mines_runs_once() {
        let mut board = beginner();
        board.place_mines(0, 0, &mut rng(1));
        let layout: Vec<_> = board.cells().map(Cell::has_mine).collect();

        board.place_mines(8, 8, &mut rng(2));

        assert!(board.mines_placed());
        assert_eq!(board.cells().map(Cell::has_mine).collect::<Vec<_>>(), layout);
        assert!(!board[(0, 0)].has_mine());
    }

    #[test]
    fn adjacent_counts_match_neighbor_mines() {
        let mut board = Board::new(Difficulty::Intermediate.config());
        board.place_mines(8, 8, &mut rng(3));

        for cell in board.cells().filter(|cell| !cell.has_mine()) {
            let expected = board
                .neighbors(cell.row(), cell.col())
                .iter()
                .filter(|neighbor| neighbor.has_mine())
                .count();
            assert_eq!(cell.adjacent_mines() as usize, expected);
        }
    }

    #[test]
    fn place_mines_caps_count_to_free_cells() {
        let mut board = Board::new(GameConfig::new_unchecked(3, 3, 5));
        board.place_mines(1, 1, &mut rng(0));

        assert_eq!(board.count_mines(), 0);
        assert!(board.mines_placed());

        let mut board = Board::new(GameConfig::new_unchecked(3, 4, 3));
        board.place_mines(1, 1, &mut rng(0));
        assert_eq!(board.count_mines(), 3);
        assert!((0..3).all(|row| board[(row, 3)].has_mine()));
    }

    #[test]
    fn with_mines_builds_known_layout() {
        let board = Board::with_mines(3, 3, &[(0, 0), (0, 0), (2, 2)]).unwrap();

        assert_eq!(board.mine_count(), 2);
        assert!(board.mines_placed());
        assert_eq!(board[(1, 1)].adjacent_mines(), 2);
        assert_eq!(board[(0, 2)].adjacent_mines(), 0);
        assert_eq!(board[(1, 0)].adjacent_mines(), 1);
    }

    #[test]
    fn with_mines_rejects_bad_input() {
        assert_eq!(Board::with_mines(3, 3, &[(3, 0)]), Err(GameError::InvalidCoords));
        assert_eq!(Board::with_mines(0, 3, &[]), Err(GameError::InvalidDimensions));
        assert_eq!(Board::with_mines(1, 1, &[(0, 0)]), Err(GameError::TooManyMines));
    }

    #[test]
    fn reveal_without_mines_cascades_over_whole_board() {
        let mut board = Board::with_mines(3, 3, &[]).unwrap();

        let revealed = board.reveal_cell(1, 1);

        assert_eq!(revealed.len(), 9);
        assert_eq!(revealed[0].coords(), (1, 1));
        assert!(board.cells().all(Cell::is_revealed));
        assert_eq!(board.count_unrevealed_safe(), 0);
    }

    #[test]
    fn reveal_follows_depth_first_neighbor_order() {
        let mut board = Board::with_mines(2, 2, &[]).unwrap();

        let order: Vec<_> = board.reveal_cell(0, 0).iter().map(Cell::coords).collect();

        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn reveal_numbered_cell_does_not_cascade() {
        let mut board = Board::with_mines(3, 3, &[(0, 0)]).unwrap();

        let revealed = board.reveal_cell(1, 1);

        assert_eq!(revealed.len(), 1);
        assert_eq!(revealed[0].adjacent_mines(), 1);
        assert_eq!(board.count_unrevealed_safe(), 7);
    }

    #[test]
    fn cascade_stops_at_numbered_border() {
        // mines down column 2 split the board
        let mut board = Board::with_mines(3, 5, &[(0, 2), (1, 2), (2, 2)]).unwrap();

        let revealed = board.reveal_cell(1, 0);

        let mut coords: Vec<_> = revealed.iter().map(Cell::coords).collect();
        coords.sort();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);
        assert!(!board[(1, 3)].is_revealed());
        assert!(!board[(1, 4)].is_revealed());
    }

    #[test]
    fn cascade_skips_flagged_cells() {
        let mut board = Board::with_mines(1, 5, &[]).unwrap();
        board[(0, 2)].toggle_flag();

        let revealed = board.reveal_cell(0, 0);

        assert_eq!(revealed.len(), 2);
        assert!(board[(0, 2)].is_flagged());
        assert!(!board[(0, 2)].is_revealed());
        assert!(!board[(0, 3)].is_revealed());
    }

    #[test]
    fn reveal_ignores_revealed_flagged_and_missing_cells() {
        let mut board = Board::with_mines(3, 3, &[(0, 0)]).unwrap();
        assert_eq!(board.reveal_cell(1, 1).len(), 1);
        board[(2, 2)].toggle_flag();
        let before = board.clone();

        assert!(board.reveal_cell(1, 1).is_empty());
        assert!(board.reveal_cell(5, 5).is_empty());
        assert!(board.reveal_cell(2, 2).is_empty());
        assert_eq!(board, before);
        assert!(!board[(2, 2)].is_revealed());
    }

    #[test]
    fn large_empty_board_cascades_without_recursion() {
        let mut board = Board::with_mines(Coord::MAX, Coord::MAX, &[]).unwrap();

        let revealed = board.reveal_cell(0, 0);

        assert_eq!(revealed.len(), board.config().total_cells() as usize);
    }

    #[test]
    fn counts_flags_and_unrevealed_safe_cells() {
        let mut board = Board::with_mines(3, 3, &[(0, 0)]).unwrap();
        assert_eq!(board.count_flags(), 0);
        assert_eq!(board.count_unrevealed_safe(), 8);

        board[(0, 0)].toggle_flag();
        board[(1, 1)].toggle_flag();
        assert_eq!(board.count_flags(), 2);

        board[(2, 2)].reveal();
        assert_eq!(board.count_unrevealed_safe(), 7);
    }

    #[test]
    fn reveal_all_mines_uncovers_flagged_mines_too() {
        let mut board = Board::new(GameConfig::new_unchecked(5, 5, 3));
        board.place_mines(2, 2, &mut rng(11));
        let first_mine = board.cells().find(|cell| cell.has_mine()).unwrap().coords();
        board[first_mine].toggle_flag();

        let mines = board.reveal_all_mines();

        assert_eq!(mines.len(), 3);
        assert!(mines.iter().all(|cell| cell.has_mine() && cell.is_revealed()));
        assert!(board[first_mine].is_revealed());
        assert_eq!(board.cells().filter(|cell| cell.is_revealed()).count(), 3);
    }
}
