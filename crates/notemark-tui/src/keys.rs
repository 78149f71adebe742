//! crossterm key events to notemark keys.

use crossterm::event::{KeyCode as TermKeyCode, KeyEvent, KeyModifiers};
use notemark_preview::{Key, KeyCode, Modifiers};

/// The notemark key for `event`, if notemark has a name for it.
pub fn to_key(event: KeyEvent) -> Option<Key> {
    let mut modifiers = Modifiers {
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
        meta: event.modifiers.contains(KeyModifiers::SUPER),
    };
    let code = match event.code {
        TermKeyCode::Char(ch) if modifiers.primary() || modifiers.alt => {
            KeyCode::Char(ch.to_ascii_lowercase())
        }
        TermKeyCode::Char(ch) => KeyCode::Char(ch),
        TermKeyCode::Enter => KeyCode::Enter,
        TermKeyCode::Esc => KeyCode::Escape,
        TermKeyCode::Backspace => KeyCode::Backspace,
        TermKeyCode::Delete => KeyCode::Delete,
        TermKeyCode::Tab => KeyCode::Tab,
        TermKeyCode::BackTab => {
            modifiers.shift = true;
            KeyCode::Tab
        }
        TermKeyCode::Left => KeyCode::Left,
        TermKeyCode::Right => KeyCode::Right,
        TermKeyCode::Up => KeyCode::Up,
        TermKeyCode::Down => KeyCode::Down,
        TermKeyCode::Home => KeyCode::Home,
        TermKeyCode::End => KeyCode::End,
        _ => return None,
    };
    Some(Key::with_modifiers(code, modifiers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shifted_chord_is_lowercase() {
        let event = KeyEvent::new(
            TermKeyCode::Char('X'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT,
        );
        assert_eq!(to_key(event), Key::parse_sequence("<C-S-x>").first().copied());
    }

    #[test]
    fn test_typed_uppercase_is_kept() {
        let event = KeyEvent::new(TermKeyCode::Char('A'), KeyModifiers::SHIFT);
        let key = to_key(event).unwrap();
        assert_eq!(key.typed_char(), Some('A'));
    }

    #[test]
    fn test_back_tab() {
        let event = KeyEvent::new(TermKeyCode::BackTab, KeyModifiers::SHIFT);
        assert_eq!(to_key(event), Key::parse_sequence("<S-Tab>").first().copied());
        assert_eq!(to_key(KeyEvent::new(TermKeyCode::F(5), KeyModifiers::NONE)), None);
    }
}
