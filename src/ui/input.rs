/// Blocking keyboard input.
///
/// The engine's input contract is one call: `read_key()` blocks until
/// the next keystroke and returns it as a `Key`. Named constants cover
/// the keys a tile game cares about; everything printable comes back
/// as `Key::Char`.

use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Backspace,
    Tab,
    Space,
    F(u8),
    Char(char),
    Other,
}

/// Block until the next key press (key releases are skipped on
/// terminals that report them).
pub fn read_key() -> io::Result<Key> {
    loop {
        if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
            if kind == KeyEventKind::Release {
                continue;
            }
            return Ok(map_code(code));
        }
    }
}

fn map_code(code: KeyCode) -> Key {
    match code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Tab => Key::Tab,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::F(n) => Key::F(n),
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_map_to_constants() {
        assert_eq!(map_code(KeyCode::Up), Key::Up);
        assert_eq!(map_code(KeyCode::Esc), Key::Escape);
        assert_eq!(map_code(KeyCode::Char(' ')), Key::Space);
        assert_eq!(map_code(KeyCode::Char('q')), Key::Char('q'));
        assert_eq!(map_code(KeyCode::F(5)), Key::F(5));
        assert_eq!(map_code(KeyCode::Home), Key::Other);
    }
}
