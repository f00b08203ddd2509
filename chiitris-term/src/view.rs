//! Snapshot rendering: board, ghost, sidebar and overlays.

use chiitris_core::{Cell, PieceType, Snapshot, Tile};
use crossterm::style::{self, Color, Stylize};
use crossterm::{cursor, queue};
use std::io::{self, Write};

// Each board cell is drawn two characters wide so it reads roughly square.
const CELL_W: u16 = 2;
const BOARD_Y: u16 = 1;
const SIDEBAR_PAD: usize = 16;

fn piece_color(piece_type: PieceType) -> Color {
    let (r, g, b) = piece_type.color();
    Color::Rgb { r, g, b }
}

/// Draws one full frame. Every cell of the board and sidebar is rewritten,
/// so no stale output survives a reset or an overlay being dismissed.
pub fn draw(stdout: &mut io::Stdout, snapshot: &Snapshot) -> io::Result<()> {
    let board_w = snapshot.width as u16 * CELL_W;

    queue!(stdout, cursor::MoveTo(0, 0), style::Print("\u{250c}"))?;
    for _ in 0..board_w {
        queue!(stdout, style::Print("\u{2500}"))?;
    }
    queue!(stdout, style::Print("\u{2510}"))?;

    let ghost: &[Cell] = snapshot.ghost.as_ref().map(|g| &g[..]).unwrap_or(&[]);
    for row in 0..snapshot.height {
        queue!(
            stdout,
            cursor::MoveTo(0, BOARD_Y + row as u16),
            style::Print("\u{2502}")
        )?;
        for col in 0..snapshot.width {
            let here = Cell::new(row as isize, col as isize);
            let active = snapshot
                .active
                .as_ref()
                .filter(|piece| piece.cells.contains(&here));
            if let Some(piece) = active {
                queue!(
                    stdout,
                    style::PrintStyledContent("\u{2588}\u{2588}".with(piece_color(piece.piece_type)))
                )?;
            } else if let Tile::Piece(piece_type) = snapshot.tiles[row * snapshot.width + col] {
                queue!(
                    stdout,
                    style::PrintStyledContent("\u{2588}\u{2588}".with(piece_color(piece_type)))
                )?;
            } else if ghost.contains(&here) {
                queue!(
                    stdout,
                    style::PrintStyledContent("\u{2591}\u{2591}".with(Color::DarkGrey))
                )?;
            } else {
                queue!(stdout, style::PrintStyledContent(" .".with(Color::DarkGrey)))?;
            }
        }
        queue!(stdout, style::Print("\u{2502}"))?;
        draw_sidebar_row(stdout, snapshot, row)?;
    }

    let bottom = BOARD_Y + snapshot.height as u16;
    queue!(stdout, cursor::MoveTo(0, bottom), style::Print("\u{2514}"))?;
    for _ in 0..board_w {
        queue!(stdout, style::Print("\u{2500}"))?;
    }
    queue!(stdout, style::Print("\u{2518}"))?;

    if snapshot.game_over {
        draw_overlay(stdout, snapshot, " GAME OVER ", " R restart  Q quit ")?;
    } else if snapshot.paused {
        draw_overlay(stdout, snapshot, " PAUSED ", " P to resume ")?;
    }

    stdout.flush()
}

fn draw_sidebar_row(stdout: &mut io::Stdout, snapshot: &Snapshot, row: usize) -> io::Result<()> {
    let x = snapshot.width as u16 * CELL_W + 4;
    let y = BOARD_Y + row as u16;
    queue!(stdout, cursor::MoveTo(x, y))?;

    // Values are padded so a shrinking number (after reset) leaves no residue.
    match row {
        0 => queue!(stdout, style::Print("Score"))?,
        1 => queue!(stdout, style::Print(format!("{:<SIDEBAR_PAD$}", snapshot.score)))?,
        3 => queue!(stdout, style::Print("Level"))?,
        4 => queue!(stdout, style::Print(format!("{:<SIDEBAR_PAD$}", snapshot.level)))?,
        6 => queue!(stdout, style::Print("Lines"))?,
        7 => queue!(
            stdout,
            style::Print(format!("{:<SIDEBAR_PAD$}", snapshot.lines_cleared))
        )?,
        9 => queue!(stdout, style::Print("Next"))?,
        10..=13 => draw_preview_row(stdout, snapshot, row - 10)?,
        15 => queue!(
            stdout,
            style::PrintStyledContent("\u{2190}\u{2192} move   \u{2193} soft drop".with(Color::DarkGrey))
        )?,
        16 => queue!(
            stdout,
            style::PrintStyledContent("\u{2191}/X cw    Z ccw".with(Color::DarkGrey))
        )?,
        17 => queue!(
            stdout,
            style::PrintStyledContent("Space hard drop".with(Color::DarkGrey))
        )?,
        18 => queue!(
            stdout,
            style::PrintStyledContent("P pause   R restart".with(Color::DarkGrey))
        )?,
        19 => queue!(
            stdout,
            style::PrintStyledContent("Q quit".with(Color::DarkGrey))
        )?,
        _ => {}
    }
    Ok(())
}

/// One row of the next-piece preview, drawn from the rotation-0 offsets.
fn draw_preview_row(stdout: &mut io::Stdout, snapshot: &Snapshot, preview_row: usize) -> io::Result<()> {
    let next = match snapshot.next {
        Some(next) => next,
        None => return Ok(()),
    };
    let offsets = &next.offsets()[0];
    for col in 0..4 {
        if offsets.contains(&(preview_row as isize, col as isize)) {
            queue!(
                stdout,
                style::PrintStyledContent("\u{2588}\u{2588}".with(piece_color(next)))
            )?;
        } else {
            queue!(stdout, style::Print("  "))?;
        }
    }
    Ok(())
}

fn draw_overlay(
    stdout: &mut io::Stdout,
    snapshot: &Snapshot,
    title: &str,
    subtitle: &str,
) -> io::Result<()> {
    let board_w = snapshot.width as u16 * CELL_W;
    let center_y = BOARD_Y + snapshot.height as u16 / 2;
    let title_x = 1 + (board_w.saturating_sub(title.len() as u16)) / 2;
    let subtitle_x = 1 + (board_w.saturating_sub(subtitle.len() as u16)) / 2;

    queue!(
        stdout,
        cursor::MoveTo(title_x, center_y - 1),
        style::PrintStyledContent(title.with(Color::White).on(Color::DarkMagenta)),
        cursor::MoveTo(subtitle_x, center_y + 1),
        style::PrintStyledContent(subtitle.with(Color::White).on(Color::DarkMagenta)),
    )?;
    Ok(())
}
