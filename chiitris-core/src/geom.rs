//! Board coordinates.

use core::ops::Add;
use serde::{Deserialize, Serialize};

/// A position on the board. Row 0 is the top of the visible playfield and
/// rows grow downward; negative rows lie above the visible area and occur
/// only transiently during spawn and rotation checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: isize,
    pub col: isize,
}

impl Cell {
    pub fn new(row: isize, col: isize) -> Cell {
        Cell { row, col }
    }
}

impl Add<(isize, isize)> for Cell {
    type Output = Cell;
    fn add(self, (d_row, d_col): (isize, isize)) -> Cell {
        Cell::new(self.row + d_row, self.col + d_col)
    }
}

impl From<(isize, isize)> for Cell {
    fn from(this: (isize, isize)) -> Cell {
        Cell::new(this.0, this.1)
    }
}

#[test]
fn cell_offset_addition() {
    assert_eq!(Cell::new(2, 3) + (-1, 2), Cell::new(1, 5));
    assert_eq!(Cell::from((0, -4)), Cell::new(0, -4));
}
