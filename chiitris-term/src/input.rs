//! Key event to engine command mapping.

use chiitris_core::GameCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;

/// What one terminal event means to the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Command(GameCommand),
    Quit,
    Ignored,
}

/// Reads one pending event and translates it. Only key presses map to
/// commands; releases, repeats from terminals that report them as such,
/// resizes and mouse events are ignored.
pub fn read_input() -> io::Result<Input> {
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(translate(key)),
        _ => Ok(Input::Ignored),
    }
}

fn translate(key: KeyEvent) -> Input {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Input::Quit;
    }
    match key.code {
        KeyCode::Left => Input::Command(GameCommand::MoveLeft),
        KeyCode::Right => Input::Command(GameCommand::MoveRight),
        KeyCode::Down => Input::Command(GameCommand::SoftDrop),
        KeyCode::Up | KeyCode::Char('x') | KeyCode::Char('X') => {
            Input::Command(GameCommand::RotateCw)
        }
        KeyCode::Char('z') | KeyCode::Char('Z') => Input::Command(GameCommand::RotateCcw),
        KeyCode::Char(' ') => Input::Command(GameCommand::HardDrop),
        KeyCode::Char('p') | KeyCode::Char('P') => Input::Command(GameCommand::PauseToggle),
        KeyCode::Char('r') | KeyCode::Char('R') => Input::Command(GameCommand::Reset),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Input::Quit,
        _ => Input::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_map_to_movement() {
        assert_eq!(
            translate(press(KeyCode::Left)),
            Input::Command(GameCommand::MoveLeft)
        );
        assert_eq!(
            translate(press(KeyCode::Right)),
            Input::Command(GameCommand::MoveRight)
        );
        assert_eq!(
            translate(press(KeyCode::Down)),
            Input::Command(GameCommand::SoftDrop)
        );
        assert_eq!(
            translate(press(KeyCode::Up)),
            Input::Command(GameCommand::RotateCw)
        );
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        assert_eq!(translate(press(KeyCode::Char('k'))), Input::Ignored);
        assert_eq!(translate(press(KeyCode::Tab)), Input::Ignored);
    }

    #[test]
    fn ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(translate(key), Input::Quit);
        assert_eq!(translate(press(KeyCode::Char('c'))), Input::Ignored);
    }
}
