//! Chiitris game rules: pieces, playfield, sequencing and the controller.
//!
//! This crate has no I/O and no clock of its own. Frontends feed it discrete
//! commands plus a millisecond timestamp once per frame, and read state back
//! through [`game::Snapshot`].

pub mod field;
pub mod game;
pub mod geom;

pub use field::{ActivePiece, Board, PieceType, Rotation, Tile, Timestamp};
pub use game::{Game, GameCommand, PieceBag, PieceView, Snapshot};
pub use geom::Cell;
