//! The game controller: spawn, gravity, locking, scoring, sequencing.

use crate::field::{ActivePiece, Board, PieceType, Tile, Timestamp};
use crate::geom::Cell;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Gravity interval at level 1, in milliseconds.
const BASE_FALL_INTERVAL: u64 = 500;
/// How much each level above 1 shortens the gravity interval.
const FALL_INTERVAL_STEP: u64 = 50;
/// The gravity interval never drops below this.
const MIN_FALL_INTERVAL: u64 = 100;

/// Sequences piece types with the 7-bag rule: every run of seven draws,
/// aligned to a refill, is a permutation of all seven types.
#[derive(Debug, Clone)]
pub struct PieceBag {
    bag: Vec<PieceType>,
    rng: StdRng,
}

impl PieceBag {
    pub fn new() -> PieceBag {
        PieceBag {
            bag: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// A seeded bag replays the same sequence every run.
    pub fn with_seed(seed: u64) -> PieceBag {
        PieceBag {
            bag: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pops the next type, refilling the bag with a fresh uniform shuffle of
    /// all seven types when it runs out.
    pub fn next_type(&mut self) -> PieceType {
        if self.bag.is_empty() {
            self.bag = PieceType::all();
            self.bag.shuffle(&mut self.rng);
        }
        self.bag.pop().expect("bag was just refilled")
    }

    /// Discards any partially consumed bag so the next draw starts a fresh
    /// one. Used on game reset to realign the bag boundary.
    pub fn restart(&mut self) {
        self.bag.clear();
    }
}

impl Default for PieceBag {
    fn default() -> PieceBag {
        PieceBag::new()
    }
}

/// Discrete player commands. Frontends map raw input to these; anything the
/// frontend cannot map simply never reaches the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameCommand {
    #[serde(rename = "move-left")]
    MoveLeft,
    #[serde(rename = "move-right")]
    MoveRight,
    #[serde(rename = "soft-drop")]
    SoftDrop,
    #[serde(rename = "hard-drop")]
    HardDrop,
    #[serde(rename = "rotate-cw")]
    RotateCw,
    #[serde(rename = "rotate-ccw")]
    RotateCcw,
    #[serde(rename = "pause-toggle")]
    PauseToggle,
    #[serde(rename = "reset")]
    Reset,
}

/// The falling piece as a renderer sees it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PieceView {
    pub piece_type: PieceType,
    pub cells: [Cell; 4],
}

/// A read-only view of the controller state, taken once per frame by the
/// renderer. Renderers draw from this and feed commands back; they never
/// touch the live state. Cells with negative rows must not be drawn.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<Tile>,
    pub active: Option<PieceView>,
    pub ghost: Option<[Cell; 4]>,
    pub next: Option<PieceType>,
    pub score: usize,
    pub level: usize,
    pub lines_cleared: usize,
    pub paused: bool,
    pub game_over: bool,
}

/// The game controller.
///
/// Owns the board, the current and next pieces and all session counters;
/// every mutation goes through its methods. Single-threaded and
/// frame-driven: callers apply queued commands, then call [`Game::tick`]
/// once per frame with a monotonic millisecond timestamp.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    bag: PieceBag,
    current: Option<ActivePiece>,
    next: Option<ActivePiece>,
    score: usize,
    level: usize,
    lines_cleared: usize,
    fall_interval: u64,
    last_fall: Timestamp,
    paused: bool,
    game_over: bool,
}

impl Game {
    pub fn new() -> Game {
        Game::with_bag(PieceBag::new())
    }

    /// A seeded game replays the same piece sequence every run.
    pub fn with_seed(seed: u64) -> Game {
        Game::with_bag(PieceBag::with_seed(seed))
    }

    fn with_bag(bag: PieceBag) -> Game {
        let mut game = Game {
            board: Board::new(),
            bag,
            current: None,
            next: None,
            score: 0,
            level: 1,
            lines_cleared: 0,
            fall_interval: BASE_FALL_INTERVAL,
            last_fall: 0,
            paused: false,
            game_over: false,
        };
        game.spawn_piece(0);
        game
    }

    /// Starts a fresh session: new board, counters cleared, bag realigned,
    /// and two fresh pieces drawn.
    pub fn reset(&mut self, now: Timestamp) {
        self.board = Board::new();
        self.bag.restart();
        self.current = None;
        self.next = None;
        self.score = 0;
        self.level = 1;
        self.lines_cleared = 0;
        self.fall_interval = BASE_FALL_INTERVAL;
        self.last_fall = now;
        self.paused = false;
        self.game_over = false;
        self.spawn_piece(now);
    }

    /// Promotes the queued piece to the playfield and draws a new preview
    /// piece. When the spawn cells are already occupied the board has topped
    /// out: the game-over flag is set, no piece is installed, and false is
    /// returned. Otherwise the fall timer is rebased to `now`.
    pub fn spawn_piece(&mut self, now: Timestamp) -> bool {
        let promoted = match self.next.take() {
            Some(piece) => piece,
            None => ActivePiece::spawn(self.bag.next_type()),
        };
        self.next = Some(ActivePiece::spawn(self.bag.next_type()));

        if !self.board.is_valid_position(&promoted.cells()) {
            self.game_over = true;
            self.current = None;
            return false;
        }
        self.current = Some(promoted);
        self.last_fall = now;
        true
    }

    /// Tries to move the current piece by the given delta. False (and a
    /// no-op) when blocked or when there is no current piece.
    pub fn move_piece(&mut self, d_row: isize, d_col: isize) -> bool {
        match &mut self.current {
            Some(piece) => piece.try_move(&self.board, d_row, d_col),
            None => false,
        }
    }

    /// Tries to rotate the current piece, wall kicks included.
    pub fn rotate_piece(&mut self, clockwise: bool) -> bool {
        match &mut self.current {
            Some(piece) => piece.try_rotate(&self.board, clockwise),
            None => false,
        }
    }

    /// Drops the piece straight to its landing row, awarding 2 points per
    /// row travelled, and locks it immediately.
    pub fn hard_drop(&mut self, now: Timestamp) {
        if self.current.is_none() {
            return;
        }
        let mut rows = 0;
        while self.move_piece(1, 0) {
            rows += 1;
        }
        self.score += rows * 2;
        self.lock_current_piece(now);
    }

    /// Writes the current piece into the board, clears completed lines,
    /// applies scoring and level progression, and spawns the next piece.
    ///
    /// The line reward is multiplied by the level value after this lock's
    /// recompute, so a level-up earned by the clear applies to its own
    /// reward.
    pub fn lock_current_piece(&mut self, now: Timestamp) {
        let piece = match self.current.take() {
            Some(piece) => piece,
            None => return,
        };
        self.board.lock(&piece);

        let lines = self.board.clear_completed_lines();
        if lines > 0 {
            self.lines_cleared += lines;
            self.level = self.lines_cleared / 10 + 1;
            self.fall_interval = BASE_FALL_INTERVAL
                .saturating_sub((self.level as u64 - 1) * FALL_INTERVAL_STEP)
                .max(MIN_FALL_INTERVAL);
            self.score += line_score(lines) * self.level;
        }
        self.spawn_piece(now);
    }

    /// Advances gravity. Once the fall interval has elapsed the piece moves
    /// down one row, or locks if it cannot; either way the fall timer is
    /// rebased to `now`. No-op while paused or after game over.
    pub fn tick(&mut self, now: Timestamp) {
        if self.game_over || self.paused {
            return;
        }
        if now.saturating_sub(self.last_fall) >= self.fall_interval {
            if !self.move_piece(1, 0) {
                self.lock_current_piece(now);
            }
            self.last_fall = now;
        }
    }

    /// Applies a player command. Reset is always honored; pause toggling is
    /// refused after game over; everything else is ignored while paused or
    /// after game over. A successful soft drop awards 1 point and counts as
    /// a fall event, rebasing the fall timer.
    pub fn apply(&mut self, command: GameCommand, now: Timestamp) {
        match command {
            GameCommand::Reset => self.reset(now),
            GameCommand::PauseToggle if !self.game_over => self.paused = !self.paused,
            _ if self.game_over || self.paused => {}
            GameCommand::MoveLeft => {
                self.move_piece(0, -1);
            }
            GameCommand::MoveRight => {
                self.move_piece(0, 1);
            }
            GameCommand::SoftDrop => {
                if self.move_piece(1, 0) {
                    self.score += 1;
                    self.last_fall = now;
                }
            }
            GameCommand::RotateCw => {
                self.rotate_piece(true);
            }
            GameCommand::RotateCcw => {
                self.rotate_piece(false);
            }
            GameCommand::HardDrop => self.hard_drop(now),
            GameCommand::PauseToggle => {}
        }
    }

    /// Where the current piece would land, without mutating any state.
    pub fn ghost_cells(&self) -> Option<[Cell; 4]> {
        self.current
            .as_ref()
            .map(|piece| piece.ghost_cells(&self.board))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_piece(&self) -> Option<&ActivePiece> {
        self.current.as_ref()
    }

    pub fn next_piece_type(&self) -> Option<PieceType> {
        self.next.as_ref().map(|piece| piece.piece_type())
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn lines_cleared(&self) -> usize {
        self.lines_cleared
    }

    pub fn fall_interval(&self) -> u64 {
        self.fall_interval
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// The per-frame view handed to renderers.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.board.width(),
            height: self.board.height(),
            tiles: self.board.tiles().to_vec(),
            active: self.current.as_ref().map(|piece| PieceView {
                piece_type: piece.piece_type(),
                cells: piece.cells(),
            }),
            ghost: self.ghost_cells(),
            next: self.next_piece_type(),
            score: self.score,
            level: self.level,
            lines_cleared: self.lines_cleared,
            paused: self.paused,
            game_over: self.game_over,
        }
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[cfg(test)]
    pub(crate) fn force_current(&mut self, piece: ActivePiece) {
        self.current = Some(piece);
    }

    #[cfg(test)]
    pub(crate) fn force_progress(&mut self, lines_cleared: usize) {
        self.lines_cleared = lines_cleared;
        self.level = lines_cleared / 10 + 1;
    }
}

impl Default for Game {
    fn default() -> Game {
        Game::new()
    }
}

fn line_score(lines: usize) -> usize {
    match lines {
        1 => 100,
        2 => 300,
        3 => 500,
        4 => 800,
        _ => 0,
    }
}

#[cfg(test)]
use crate::field::Rotation;

#[test]
fn bag_draws_aligned_permutations() {
    let mut bag = PieceBag::with_seed(42);
    for _ in 0..4 {
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(bag.next_type());
        }
        for piece_type in PieceType::all() {
            assert!(seen.contains(&piece_type), "missing {:?}", piece_type);
        }
    }
}

#[test]
fn seeded_bags_replay_the_same_sequence() {
    let mut a = PieceBag::with_seed(7);
    let mut b = PieceBag::with_seed(7);
    for _ in 0..21 {
        assert_eq!(a.next_type(), b.next_type());
    }
}

#[test]
fn bag_restart_realigns_the_boundary() {
    let mut bag = PieceBag::with_seed(3);
    bag.next_type();
    bag.next_type();
    bag.restart();
    let mut seen = Vec::new();
    for _ in 0..7 {
        seen.push(bag.next_type());
    }
    for piece_type in PieceType::all() {
        assert!(seen.contains(&piece_type));
    }
}

#[test]
fn new_game_holds_a_current_and_a_next_piece() {
    let game = Game::with_seed(1);
    assert!(game.current_piece().is_some());
    assert!(game.next_piece_type().is_some());
    assert_eq!(game.score(), 0);
    assert_eq!(game.level(), 1);
    assert_eq!(game.lines_cleared(), 0);
    assert_eq!(game.fall_interval(), 500);
    assert!(!game.is_game_over());
}

#[test]
fn hard_drop_awards_two_points_per_row() {
    let mut game = Game::with_seed(1);
    // a horizontal I five rows above the floor
    game.force_current(ActivePiece::at(PieceType::I, Rotation::Spawn, 14, 0));
    game.hard_drop(0);
    assert_eq!(game.score(), 10);
    assert_eq!(game.lines_cleared(), 0);
}

#[test]
fn single_line_clear_scores_one_hundred_at_level_one() {
    let mut game = Game::with_seed(1);
    for col in 4..Board::WIDTH {
        game.board_mut().set_tile(19, col, Tile::Piece(PieceType::O));
    }
    game.force_current(ActivePiece::at(PieceType::I, Rotation::Spawn, 19, 0));
    game.lock_current_piece(0);
    assert_eq!(game.score(), 100);
    assert_eq!(game.lines_cleared(), 1);
    assert_eq!(game.level(), 1);
    // the cleared row collapsed away
    assert!((0..Board::WIDTH).all(|col| game.board().tile(19, col) == Some(Tile::Empty)));
}

#[test]
fn line_reward_uses_the_level_after_the_clear() {
    let mut game = Game::with_seed(1);
    game.force_progress(9);
    for col in 4..Board::WIDTH {
        game.board_mut().set_tile(19, col, Tile::Piece(PieceType::O));
    }
    game.force_current(ActivePiece::at(PieceType::I, Rotation::Spawn, 19, 0));
    game.lock_current_piece(0);
    // the tenth line lifts the game to level 2 and the reward doubles
    assert_eq!(game.level(), 2);
    assert_eq!(game.lines_cleared(), 10);
    assert_eq!(game.score(), 200);
    assert_eq!(game.fall_interval(), 450);
}

#[test]
fn four_line_clear_scores_eight_hundred() {
    let mut game = Game::with_seed(1);
    for row in 16..Board::HEIGHT {
        for col in 1..Board::WIDTH {
            game.board_mut().set_tile(row, col, Tile::Piece(PieceType::O));
        }
    }
    // a vertical I filling the remaining column of all four rows
    game.force_current(ActivePiece::at(PieceType::I, Rotation::Cw, 16, -2));
    game.lock_current_piece(0);
    assert_eq!(game.lines_cleared(), 4);
    assert_eq!(game.score(), 800);
    assert!(game.board().tiles().iter().all(|tile| tile.is_empty()));
}

#[test]
fn soft_drop_scores_one_point_and_rebases_the_fall_timer() {
    let mut game = Game::with_seed(1);
    let row_before = game.current_piece().map(|p| p.row());
    game.apply(GameCommand::SoftDrop, 499);
    assert_eq!(game.score(), 1);
    assert_eq!(game.current_piece().map(|p| p.row()), row_before.map(|r| r + 1));
    // gravity at 501 would have fired against the old timer reference
    game.tick(501);
    assert_eq!(game.current_piece().map(|p| p.row()), row_before.map(|r| r + 1));
}

#[test]
fn gravity_moves_the_piece_after_the_interval() {
    let mut game = Game::with_seed(1);
    let row_before = game.current_piece().map(|p| p.row());
    game.tick(499);
    assert_eq!(game.current_piece().map(|p| p.row()), row_before);
    game.tick(500);
    assert_eq!(game.current_piece().map(|p| p.row()), row_before.map(|r| r + 1));
}

#[test]
fn pause_freezes_gravity_and_commands() {
    let mut game = Game::with_seed(1);
    game.apply(GameCommand::PauseToggle, 0);
    assert!(game.is_paused());
    let snapshot_before = game.snapshot();
    game.apply(GameCommand::MoveLeft, 10);
    game.tick(10_000);
    let snapshot_after = game.snapshot();
    assert_eq!(snapshot_before.tiles, snapshot_after.tiles);
    assert_eq!(
        snapshot_before.active.map(|p| p.cells),
        snapshot_after.active.map(|p| p.cells)
    );
    game.apply(GameCommand::PauseToggle, 10_000);
    assert!(!game.is_paused());
}

#[test]
fn topping_out_ends_the_game_and_reset_recovers() {
    let mut game = Game::with_seed(5);
    let mut now = 0;
    while !game.is_game_over() {
        now += 1;
        game.hard_drop(now);
        assert!(now < 1000, "game never topped out");
    }
    assert!(game.current_piece().is_none());

    // everything but reset is frozen now
    let score = game.score();
    let tiles = game.snapshot().tiles;
    game.apply(GameCommand::MoveLeft, now + 1);
    game.apply(GameCommand::HardDrop, now + 2);
    game.apply(GameCommand::PauseToggle, now + 3);
    game.tick(now + 10_000);
    assert!(!game.is_paused());
    assert_eq!(game.score(), score);
    assert_eq!(game.snapshot().tiles, tiles);

    game.apply(GameCommand::Reset, now + 4);
    assert!(!game.is_game_over());
    assert_eq!(game.score(), 0);
    assert_eq!(game.lines_cleared(), 0);
    assert!(game.current_piece().is_some());
    assert!(game.snapshot().tiles.iter().all(|tile| tile.is_empty()));
}

#[test]
fn ghost_matches_the_hard_drop_landing_row() {
    let mut game = Game::with_seed(9);
    for col in 0..Board::WIDTH {
        game.board_mut().set_tile(19, col, Tile::Piece(PieceType::S));
    }
    game.board_mut().set_tile(19, 0, Tile::Empty);
    game.force_current(ActivePiece::at(PieceType::T, Rotation::Spawn, 0, 3));
    let ghost = game.ghost_cells().expect("piece in play");
    assert_eq!(ghost.iter().map(|c| c.row).max(), Some(18));
}

#[test]
fn filling_the_bottom_row_end_to_end() {
    let mut game = Game::with_seed(11);
    let mut now = 0;
    // two horizontal I pieces cover columns 0..=7 of the bottom row
    for &col in &[0, 4] {
        game.force_current(ActivePiece::at(PieceType::I, Rotation::Spawn, 0, col));
        now += 100;
        game.hard_drop(now);
    }
    // an O fills the last two columns, overhanging into row 18
    game.force_current(ActivePiece::at(PieceType::O, Rotation::Spawn, 0, 8));
    now += 100;
    game.hard_drop(now);

    assert_eq!(game.lines_cleared(), 1);
    assert_eq!(game.level(), 1);
    // hard drops of 19, 19 and 18 rows, then 100 for the line
    assert_eq!(game.score(), 2 * (19 + 19 + 18) + 100);
    // only the O overhang survives, shifted down onto the floor
    assert_eq!(game.board().tile(19, 8), Some(Tile::Piece(PieceType::O)));
    assert_eq!(game.board().tile(19, 9), Some(Tile::Piece(PieceType::O)));
    let occupied = game.board().tiles().iter().filter(|t| !t.is_empty()).count();
    assert_eq!(occupied, 2);
    assert!((0..Board::WIDTH).all(|col| game.board().tile(0, col) == Some(Tile::Empty)));
}

#[test]
fn snapshot_reflects_controller_state() {
    let game = Game::with_seed(2);
    let snapshot = game.snapshot();
    assert_eq!(snapshot.width, 10);
    assert_eq!(snapshot.height, 20);
    assert_eq!(snapshot.tiles.len(), 200);
    assert!(snapshot.active.is_some());
    assert!(snapshot.ghost.is_some());
    assert!(snapshot.next.is_some());
    assert!(!snapshot.paused);
    assert!(!snapshot.game_over);
}

#[test]
fn snapshot_and_commands_serialize() {
    let game = Game::with_seed(2);
    let json = serde_json::to_string(&game.snapshot()).expect("snapshot serializes");
    assert!(json.contains("\"score\":0"));

    let json = serde_json::to_string(&GameCommand::MoveLeft).expect("command serializes");
    assert_eq!(json, "\"move-left\"");
    let parsed: GameCommand = serde_json::from_str("\"hard-drop\"").expect("command parses");
    assert_eq!(parsed, GameCommand::HardDrop);
}
