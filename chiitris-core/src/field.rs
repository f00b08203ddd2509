//! The piece catalog and the playfield.

use crate::geom::Cell;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Milliseconds since the frontend's clock started.
pub type Timestamp = u64;

/// A rotation state, doubling as the index into a piece's offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rotation {
    Spawn = 0,
    Cw = 1,
    Flip = 2,
    Ccw = 3,
}

impl Rotation {
    pub fn index(self) -> usize {
        self as usize
    }

    /// The next state clockwise (+1 mod 4).
    pub fn cw(self) -> Rotation {
        Rotation::from_index(self.index() + 1)
    }

    /// The next state counter-clockwise (−1 mod 4, wrapping 0 to 3).
    pub fn ccw(self) -> Rotation {
        Rotation::from_index(self.index() + 3)
    }

    fn from_index(index: usize) -> Rotation {
        match index % 4 {
            0 => Rotation::Spawn,
            1 => Rotation::Cw,
            2 => Rotation::Flip,
            _ => Rotation::Ccw,
        }
    }
}

// Rotation-state cell offsets, `(row, col)` relative to the piece anchor.
// Gameplay feel (spawn shape, kick distances) depends on these exact values,
// including the O piece repeating a single state in all four slots.
const I_OFFSETS: [[(isize, isize); 4]; 4] = [
    [(0, 0), (0, 1), (0, 2), (0, 3)],
    [(0, 2), (1, 2), (2, 2), (3, 2)],
    [(2, 0), (2, 1), (2, 2), (2, 3)],
    [(0, 1), (1, 1), (2, 1), (3, 1)],
];
const O_OFFSETS: [[(isize, isize); 4]; 4] = [
    [(0, 0), (0, 1), (1, 0), (1, 1)],
    [(0, 0), (0, 1), (1, 0), (1, 1)],
    [(0, 0), (0, 1), (1, 0), (1, 1)],
    [(0, 0), (0, 1), (1, 0), (1, 1)],
];
const T_OFFSETS: [[(isize, isize); 4]; 4] = [
    [(0, 1), (1, 0), (1, 1), (1, 2)],
    [(0, 1), (1, 1), (1, 2), (2, 1)],
    [(1, 0), (1, 1), (1, 2), (2, 1)],
    [(0, 1), (1, 0), (1, 1), (2, 1)],
];
const S_OFFSETS: [[(isize, isize); 4]; 4] = [
    [(0, 1), (0, 2), (1, 0), (1, 1)],
    [(0, 1), (1, 1), (1, 2), (2, 2)],
    [(1, 1), (1, 2), (2, 0), (2, 1)],
    [(0, 0), (1, 0), (1, 1), (2, 1)],
];
const Z_OFFSETS: [[(isize, isize); 4]; 4] = [
    [(0, 0), (0, 1), (1, 1), (1, 2)],
    [(0, 2), (1, 1), (1, 2), (2, 1)],
    [(1, 0), (1, 1), (2, 1), (2, 2)],
    [(0, 1), (1, 0), (1, 1), (2, 0)],
];
const J_OFFSETS: [[(isize, isize); 4]; 4] = [
    [(0, 0), (1, 0), (1, 1), (1, 2)],
    [(0, 1), (0, 2), (1, 1), (2, 1)],
    [(1, 0), (1, 1), (1, 2), (2, 2)],
    [(0, 1), (1, 1), (2, 0), (2, 1)],
];
const L_OFFSETS: [[(isize, isize); 4]; 4] = [
    [(0, 2), (1, 0), (1, 1), (1, 2)],
    [(0, 1), (1, 1), (2, 1), (2, 2)],
    [(1, 0), (1, 1), (1, 2), (2, 0)],
    [(0, 0), (0, 1), (1, 1), (2, 1)],
];

/// Types of tetrominoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceType {
    /// Returns a vector containing all piece types.
    pub fn all() -> Vec<PieceType> {
        vec![
            PieceType::I,
            PieceType::O,
            PieceType::T,
            PieceType::S,
            PieceType::Z,
            PieceType::J,
            PieceType::L,
        ]
    }

    /// The four rotation states of this piece as cell-offset sets.
    pub fn offsets(self) -> &'static [[(isize, isize); 4]; 4] {
        match self {
            PieceType::I => &I_OFFSETS,
            PieceType::O => &O_OFFSETS,
            PieceType::T => &T_OFFSETS,
            PieceType::S => &S_OFFSETS,
            PieceType::Z => &Z_OFFSETS,
            PieceType::J => &J_OFFSETS,
            PieceType::L => &L_OFFSETS,
        }
    }

    /// Display color as RGB. Purely cosmetic; renderers may substitute.
    pub fn color(self) -> (u8, u8, u8) {
        match self {
            PieceType::I => (173, 216, 230),
            PieceType::O => (255, 250, 205),
            PieceType::T => (221, 160, 221),
            PieceType::S => (189, 252, 201),
            PieceType::Z => (255, 182, 193),
            PieceType::J => (176, 196, 222),
            PieceType::L => (255, 218, 185),
        }
    }
}

/// Contents of one board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Empty,
    Piece(PieceType),
}

impl Tile {
    pub fn is_empty(self) -> bool {
        self == Tile::Empty
    }
}

/// The falling piece: a catalog shape plus an anchor position and rotation.
///
/// Absolute cells are recomputed from the offset table on demand and never
/// cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePiece {
    piece_type: PieceType,
    rotation: Rotation,
    row: isize,
    col: isize,
}

impl ActivePiece {
    /// Creates a piece at the spawn position: top row, horizontally centered.
    pub fn spawn(piece_type: PieceType) -> ActivePiece {
        ActivePiece {
            piece_type,
            rotation: Rotation::Spawn,
            row: 0,
            col: Board::WIDTH as isize / 2 - 2,
        }
    }

    pub fn piece_type(&self) -> PieceType {
        self.piece_type
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn row(&self) -> isize {
        self.row
    }

    pub fn col(&self) -> isize {
        self.col
    }

    /// Cells the piece would occupy at a hypothetical anchor and rotation.
    pub fn cells_at(&self, row: isize, col: isize, rotation: Rotation) -> [Cell; 4] {
        let offsets = &self.piece_type.offsets()[rotation.index()];
        let mut cells = [Cell::new(0, 0); 4];
        for (cell, &offset) in cells.iter_mut().zip(offsets.iter()) {
            *cell = Cell::new(row, col) + offset;
        }
        cells
    }

    /// Cells the piece occupies right now.
    pub fn cells(&self) -> [Cell; 4] {
        self.cells_at(self.row, self.col, self.rotation)
    }

    /// Attempts to move the piece by the given delta, committing the new
    /// anchor only if the target cells are valid on `board`.
    pub fn try_move(&mut self, board: &Board, d_row: isize, d_col: isize) -> bool {
        let cells = self.cells_at(self.row + d_row, self.col + d_col, self.rotation);
        if board.is_valid_position(&cells) {
            self.row += d_row;
            self.col += d_col;
            true
        } else {
            false
        }
    }

    /// Attempts to rotate the piece. The unchanged anchor is tried first,
    /// then the wall-kick column offsets +1, −1, +2, −2 in that order; the
    /// kick table is the same for every piece and rotation. On failure the
    /// piece is left untouched.
    pub fn try_rotate(&mut self, board: &Board, clockwise: bool) -> bool {
        let rotation = if clockwise {
            self.rotation.cw()
        } else {
            self.rotation.ccw()
        };
        for &kick in &[0, 1, -1, 2, -2] {
            let cells = self.cells_at(self.row, self.col + kick, rotation);
            if board.is_valid_position(&cells) {
                self.rotation = rotation;
                self.col += kick;
                return true;
            }
        }
        false
    }

    /// Cells of the piece's landing position if dropped straight down.
    pub fn ghost_cells(&self, board: &Board) -> [Cell; 4] {
        let mut row = self.row;
        while board.is_valid_position(&self.cells_at(row + 1, self.col, self.rotation)) {
            row += 1;
        }
        self.cells_at(row, self.col, self.rotation)
    }

    #[cfg(test)]
    pub(crate) fn at(piece_type: PieceType, rotation: Rotation, row: isize, col: isize) -> ActivePiece {
        ActivePiece {
            piece_type,
            rotation,
            row,
            col,
        }
    }
}

/// The playfield: a fixed grid of locked tiles.
///
/// The falling piece is never part of the grid; it is only written in by
/// [`Board::lock`].
#[derive(Debug, Clone)]
pub struct Board {
    tiles: Vec<Tile>,
}

impl Board {
    pub const WIDTH: usize = 10;
    pub const HEIGHT: usize = 20;

    pub fn new() -> Board {
        Board {
            tiles: vec![Tile::Empty; Self::WIDTH * Self::HEIGHT],
        }
    }

    pub fn width(&self) -> usize {
        Self::WIDTH
    }

    pub fn height(&self) -> usize {
        Self::HEIGHT
    }

    /// All tiles in row-major order, row 0 first.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Returns the tile at the given visible coordinates.
    pub fn tile(&self, row: usize, col: usize) -> Option<Tile> {
        if col >= Self::WIDTH {
            return None;
        }
        self.tiles.get(row * Self::WIDTH + col).copied()
    }

    pub(crate) fn set_tile(&mut self, row: usize, col: usize, tile: Tile) {
        if col < Self::WIDTH && row < Self::HEIGHT {
            self.tiles[row * Self::WIDTH + col] = tile;
        }
    }

    /// True iff every cell is inside the side and bottom bounds and every
    /// visible cell is empty. Rows above the top (negative) pass the check,
    /// so a piece may legally overhang the board during spawn and rotation.
    pub fn is_valid_position(&self, cells: &[Cell]) -> bool {
        cells.iter().all(|cell| {
            if cell.col < 0 || cell.col >= Self::WIDTH as isize {
                return false;
            }
            if cell.row >= Self::HEIGHT as isize {
                return false;
            }
            if cell.row < 0 {
                return true;
            }
            self.tiles[cell.row as usize * Self::WIDTH + cell.col as usize].is_empty()
        })
    }

    /// Writes the piece's type into the grid. Cells outside the visible
    /// board are skipped, so a piece locking partway above the top does not
    /// write its hidden rows anywhere.
    pub fn lock(&mut self, piece: &ActivePiece) {
        for cell in piece.cells().iter() {
            if cell.row >= 0
                && cell.row < Self::HEIGHT as isize
                && cell.col >= 0
                && cell.col < Self::WIDTH as isize
            {
                self.tiles[cell.row as usize * Self::WIDTH + cell.col as usize] =
                    Tile::Piece(piece.piece_type());
            }
        }
    }

    fn row_complete(&self, row: usize) -> bool {
        let start = row * Self::WIDTH;
        self.tiles[start..start + Self::WIDTH]
            .iter()
            .all(|tile| !tile.is_empty())
    }

    /// Removes every complete row and inserts an empty row at the top for
    /// each, so rows above a removed row shift down while row order is
    /// otherwise preserved. Scans bottom to top, re-examining the same index
    /// after a removal. Returns the number of rows removed.
    pub fn clear_completed_lines(&mut self) -> usize {
        let mut cleared = 0;
        let mut row = Self::HEIGHT;
        while row > 0 {
            let current = row - 1;
            if self.row_complete(current) {
                let start = current * Self::WIDTH;
                self.tiles.drain(start..start + Self::WIDTH);
                for _ in 0..Self::WIDTH {
                    self.tiles.insert(0, Tile::Empty);
                }
                cleared += 1;
            } else {
                row -= 1;
            }
        }
        cleared
    }
}

impl Default for Board {
    fn default() -> Board {
        Board::new()
    }
}

#[test]
fn rotation_wraps_in_both_directions() {
    assert_eq!(Rotation::Ccw.cw(), Rotation::Spawn);
    assert_eq!(Rotation::Spawn.ccw(), Rotation::Ccw);
    assert_eq!(Rotation::Spawn.cw(), Rotation::Cw);
    assert_eq!(Rotation::Cw.ccw(), Rotation::Spawn);
}

#[test]
fn every_rotation_state_has_four_distinct_cells() {
    for piece_type in PieceType::all() {
        let piece = ActivePiece::spawn(piece_type);
        for &rotation in &[Rotation::Spawn, Rotation::Cw, Rotation::Flip, Rotation::Ccw] {
            let cells = piece.cells_at(5, 4, rotation);
            for (i, a) in cells.iter().enumerate() {
                for b in cells.iter().skip(i + 1) {
                    assert_ne!(a, b, "{:?} {:?} has duplicate cells", piece_type, rotation);
                }
            }
        }
    }
}

#[test]
fn o_piece_is_rotation_invariant() {
    let piece = ActivePiece::spawn(PieceType::O);
    let spawn_cells = piece.cells_at(3, 3, Rotation::Spawn);
    for &rotation in &[Rotation::Cw, Rotation::Flip, Rotation::Ccw] {
        assert_eq!(piece.cells_at(3, 3, rotation), spawn_cells);
    }
}

#[test]
fn spawn_position_is_top_center() {
    let piece = ActivePiece::spawn(PieceType::T);
    assert_eq!(piece.row(), 0);
    assert_eq!(piece.col(), Board::WIDTH as isize / 2 - 2);
}

#[test]
fn valid_position_respects_bounds() {
    let board = Board::new();
    assert!(board.is_valid_position(&[Cell::new(0, 0), Cell::new(19, 9)]));
    // above the visible top is fine
    assert!(board.is_valid_position(&[Cell::new(-2, 4)]));
    // side and bottom bounds are not
    assert!(!board.is_valid_position(&[Cell::new(0, -1)]));
    assert!(!board.is_valid_position(&[Cell::new(0, 10)]));
    assert!(!board.is_valid_position(&[Cell::new(20, 0)]));
}

#[test]
fn valid_position_rejects_occupied_cells() {
    let mut board = Board::new();
    board.set_tile(10, 4, Tile::Piece(PieceType::S));
    assert!(!board.is_valid_position(&[Cell::new(10, 4)]));
    assert!(board.is_valid_position(&[Cell::new(10, 5)]));
}

#[test]
fn lock_skips_cells_above_the_top() {
    let mut board = Board::new();
    // vertical I with its anchor above the board: rows -2..=1 at col 2
    let piece = ActivePiece::at(PieceType::I, Rotation::Cw, -2, 0);
    board.lock(&piece);
    assert_eq!(board.tile(0, 2), Some(Tile::Piece(PieceType::I)));
    assert_eq!(board.tile(1, 2), Some(Tile::Piece(PieceType::I)));
    // nothing else was written
    let occupied = board.tiles().iter().filter(|t| !t.is_empty()).count();
    assert_eq!(occupied, 2);
}

#[test]
fn clear_on_empty_board_is_a_no_op() {
    let mut board = Board::new();
    assert_eq!(board.clear_completed_lines(), 0);
    assert!(board.tiles().iter().all(|tile| tile.is_empty()));
}

#[test]
fn complete_rows_are_removed_and_stack_shifts_down() {
    let mut board = Board::new();
    for col in 0..Board::WIDTH {
        board.set_tile(19, col, Tile::Piece(PieceType::I));
    }
    // an incomplete row above the full one
    board.set_tile(18, 0, Tile::Piece(PieceType::T));
    board.set_tile(17, 3, Tile::Piece(PieceType::Z));

    assert_eq!(board.clear_completed_lines(), 1);
    assert_eq!(board.tile(19, 0), Some(Tile::Piece(PieceType::T)));
    assert_eq!(board.tile(18, 3), Some(Tile::Piece(PieceType::Z)));
    assert!((0..Board::WIDTH).all(|col| board.tile(0, col) == Some(Tile::Empty)));
    let occupied = board.tiles().iter().filter(|t| !t.is_empty()).count();
    assert_eq!(occupied, 2);
}

#[test]
fn separated_complete_rows_clear_in_one_pass() {
    let mut board = Board::new();
    for col in 0..Board::WIDTH {
        board.set_tile(19, col, Tile::Piece(PieceType::J));
        board.set_tile(17, col, Tile::Piece(PieceType::L));
    }
    board.set_tile(18, 5, Tile::Piece(PieceType::O));
    assert_eq!(board.clear_completed_lines(), 2);
    // the surviving row landed on the floor
    assert_eq!(board.tile(19, 5), Some(Tile::Piece(PieceType::O)));
    let occupied = board.tiles().iter().filter(|t| !t.is_empty()).count();
    assert_eq!(occupied, 1);
}

#[test]
fn rotation_against_the_left_wall_kicks_back_in() {
    let board = Board::new();
    let mut piece = ActivePiece::spawn(PieceType::I);
    assert!(piece.try_rotate(&board, true));
    // flush against the left wall (vertical I occupies a single column)
    while piece.try_move(&board, 0, -1) {}
    assert_eq!(piece.cells().iter().map(|c| c.col).min(), Some(0));

    // in-place rotation back to horizontal would stick out past the wall;
    // one of the kick offsets must resolve it
    assert!(piece.try_rotate(&board, true));
    assert!(piece
        .cells()
        .iter()
        .all(|c| c.col >= 0 && c.col < Board::WIDTH as isize));
}

#[test]
fn blocked_rotation_leaves_the_piece_unchanged() {
    let mut board = Board::new();
    // box the piece in so neither the in-place rotation nor any kick fits
    for row in 0..Board::HEIGHT {
        for col in 0..Board::WIDTH {
            board.set_tile(row, col, Tile::Piece(PieceType::O));
        }
    }
    for col in 2..=5 {
        board.set_tile(5, col, Tile::Empty);
    }
    let mut piece = ActivePiece::at(PieceType::I, Rotation::Spawn, 5, 2);
    let before = piece;
    assert!(!piece.try_rotate(&board, true));
    assert_eq!(piece, before);
}

#[test]
fn ghost_cells_rest_on_the_floor() {
    let board = Board::new();
    let piece = ActivePiece::spawn(PieceType::I);
    let ghost = piece.ghost_cells(&board);
    assert!(ghost.iter().all(|c| c.row == Board::HEIGHT as isize - 1));
    assert!(board.is_valid_position(&ghost));
}
