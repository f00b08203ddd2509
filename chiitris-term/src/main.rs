//! Terminal frontend for the chiitris engine.
//!
//! Runs the frame loop: drain pending key events into engine commands,
//! advance gravity once, then redraw from a fresh snapshot.

mod input;
mod view;

use chiitris_core::Game;
use clap::{App, Arg};
use crossterm::{cursor, event, execute, terminal};
use log::{debug, info};
use std::io;
use std::time::{Duration, Instant};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() {
    let matches = App::new("chiitris")
        .version("0.1.0")
        .about("A falling-block puzzle game for the terminal")
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed for a reproducible piece sequence")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("log")
                .long("log")
                .value_name("FILE")
                .help("Write a debug log to FILE")
                .takes_value(true),
        )
        .get_matches();

    let seed = match matches.value_of("seed").map(str::parse::<u64>) {
        Some(Ok(seed)) => Some(seed),
        Some(Err(_)) => {
            eprintln!("--seed must be an unsigned integer");
            std::process::exit(2);
        }
        None => None,
    };

    if let Some(path) = matches.value_of("log") {
        if let Err(err) = setup_logger(path) {
            eprintln!("failed to set up logging at {}: {}", path, err);
            std::process::exit(1);
        }
    }

    if let Err(err) = run(seed) {
        eprintln!("terminal error: {}", err);
        std::process::exit(1);
    }
}

/// File logging via fern. A TUI owns the terminal, so nothing may log to
/// stdout; without `--log` no logger is installed at all.
fn setup_logger(path: &str) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                time::now().rfc3339(),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(fern::log_file(path)?)
        .apply()?;
    Ok(())
}

/// Sets up the terminal, runs the game, and restores the terminal on every
/// exit path.
fn run(seed: Option<u64>) -> io::Result<()> {
    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(
        stdout,
        terminal::EnterAlternateScreen,
        cursor::Hide,
        terminal::Clear(terminal::ClearType::All)
    )?;

    let result = game_loop(&mut stdout, seed);

    execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn game_loop(stdout: &mut io::Stdout, seed: Option<u64>) -> io::Result<()> {
    let mut game = match seed {
        Some(seed) => {
            info!("starting seeded session (seed {})", seed);
            Game::with_seed(seed)
        }
        None => {
            info!("starting session");
            Game::new()
        }
    };

    let clock = Instant::now();
    let mut was_game_over = false;

    loop {
        // Apply every queued command before this frame's single gravity
        // tick, so player input always wins against gravity within a frame.
        let frame_deadline = Instant::now() + FRAME_INTERVAL;
        loop {
            let wait = frame_deadline.saturating_duration_since(Instant::now());
            if !event::poll(wait)? {
                break;
            }
            match input::read_input()? {
                input::Input::Command(command) => {
                    debug!("command: {:?}", command);
                    game.apply(command, now_ms(&clock));
                }
                input::Input::Quit => return Ok(()),
                input::Input::Ignored => {}
            }
        }

        game.tick(now_ms(&clock));

        let snapshot = game.snapshot();
        if snapshot.game_over && !was_game_over {
            info!(
                "game over: score {} level {} lines {}",
                snapshot.score, snapshot.level, snapshot.lines_cleared
            );
            match serde_json::to_string(&snapshot) {
                Ok(json) => debug!("final state: {}", json),
                Err(err) => debug!("final state unavailable: {}", err),
            }
        }
        was_game_over = snapshot.game_over;

        view::draw(stdout, &snapshot)?;
    }
}

fn now_ms(clock: &Instant) -> u64 {
    clock.elapsed().as_millis() as u64
}
