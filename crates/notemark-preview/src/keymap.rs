//! Host-independent key events and the default formatting keymap.

use crate::formatting::{FormatCommand, InlineStyle, LinePrefix};

/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Control.
    pub ctrl: bool,
    /// Alt / Option.
    pub alt: bool,
    /// Shift.
    pub shift: bool,
    /// Command / Super.
    pub meta: bool,
}

impl Modifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Control only.
    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Shift only.
    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    /// Returns `true` when Control or Command is held.
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Returns `true` when nothing but Shift is held.
    pub fn is_plain(&self) -> bool {
        !self.ctrl && !self.alt && !self.meta
    }
}

/// Key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Printable character.
    Char(char),
    /// Enter / Return.
    Enter,
    /// Escape.
    Escape,
    /// Backspace.
    Backspace,
    /// Forward delete.
    Delete,
    /// Tab.
    Tab,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Home.
    Home,
    /// End.
    End,
}

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    /// Which key.
    pub code: KeyCode,
    /// Held modifiers.
    pub modifiers: Modifiers,
}

impl Key {
    /// Key without modifiers.
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
        }
    }

    /// Key with modifiers.
    pub fn with_modifiers(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// Plain character key.
    pub fn char(ch: char) -> Self {
        Self::new(KeyCode::Char(ch))
    }

    /// Control + character.
    pub fn ctrl(ch: char) -> Self {
        Self::with_modifiers(KeyCode::Char(ch), Modifiers::CTRL)
    }

    /// The character this key types, if it is an unmodified printable key.
    pub fn typed_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch) if self.modifiers.is_plain() => Some(ch),
            _ => None,
        }
    }

    /// Parse a vim-style key notation such as `"d2w"`, `"ihello<Esc>"` or `"<C-r>"`.
    ///
    /// Recognized names: `Esc`, `CR`/`Enter`, `BS`, `Del`, `Tab`, `Left`, `Right`, `Up`,
    /// `Down`, `Home`, `End`, `lt`, `Space`; prefixes `C-`, `S-`, `A-`, `D-` (command).
    /// Unknown `<...>` groups are typed literally.
    pub fn parse_sequence(notation: &str) -> Vec<Key> {
        let chars: Vec<char> = notation.chars().collect();
        let mut keys = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '<'
                && let Some(len) = chars[i + 1..].iter().position(|&c| c == '>')
            {
                let name: String = chars[i + 1..i + 1 + len].iter().collect();
                if let Some(key) = parse_named(&name) {
                    keys.push(key);
                    i += len + 2;
                    continue;
                }
            }
            keys.push(Key::char(chars[i]));
            i += 1;
        }
        keys
    }
}

fn parse_named(name: &str) -> Option<Key> {
    let mut modifiers = Modifiers::NONE;
    let mut rest = name;
    while rest.len() > 2 && rest.as_bytes()[1] == b'-' {
        match rest.as_bytes()[0] {
            b'C' => modifiers.ctrl = true,
            b'S' => modifiers.shift = true,
            b'A' => modifiers.alt = true,
            b'D' => modifiers.meta = true,
            _ => return None,
        }
        rest = &rest[2..];
    }

    let code = match rest {
        "Esc" => KeyCode::Escape,
        "CR" | "Enter" => KeyCode::Enter,
        "BS" => KeyCode::Backspace,
        "Del" => KeyCode::Delete,
        "Tab" => KeyCode::Tab,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "lt" => KeyCode::Char('<'),
        "Space" => KeyCode::Char(' '),
        single if single.chars().count() == 1 && modifiers != Modifiers::NONE => {
            KeyCode::Char(single.chars().next()?.to_ascii_lowercase())
        }
        _ => return None,
    };
    Some(Key::with_modifiers(code, modifiers))
}

/// A shortcut: a key code plus the modifiers it requires. The primary modifier matches either
/// Control or Command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    /// Key code, lowercase for letters.
    pub code: KeyCode,
    /// Requires Control or Command.
    pub primary: bool,
    /// Requires Shift.
    pub shift: bool,
    /// Requires Alt.
    pub alt: bool,
}

impl Chord {
    /// Primary modifier + `ch`.
    pub const fn primary(ch: char) -> Self {
        Self {
            code: KeyCode::Char(ch),
            primary: true,
            shift: false,
            alt: false,
        }
    }

    /// Primary modifier + Shift + `ch`.
    pub const fn primary_shift(ch: char) -> Self {
        Self {
            code: KeyCode::Char(ch),
            primary: true,
            shift: true,
            alt: false,
        }
    }

    /// Primary modifier + Alt + `ch`.
    pub const fn primary_alt(ch: char) -> Self {
        Self {
            code: KeyCode::Char(ch),
            primary: true,
            shift: false,
            alt: true,
        }
    }

    /// Returns `true` if `key` triggers this chord. Letter case is ignored.
    pub fn matches(&self, key: &Key) -> bool {
        let code = match key.code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        code == self.code
            && key.modifiers.primary() == self.primary
            && key.modifiers.shift == self.shift
            && key.modifiers.alt == self.alt
    }
}

/// Shortcut bindings for the formatting commands.
pub fn default_keymap() -> Vec<(Chord, FormatCommand)> {
    vec![
        (Chord::primary('b'), FormatCommand::Inline(InlineStyle::Bold)),
        (Chord::primary('i'), FormatCommand::Inline(InlineStyle::Italic)),
        (Chord::primary('e'), FormatCommand::Inline(InlineStyle::Code)),
        (Chord::primary('k'), FormatCommand::Link),
        (
            Chord::primary_shift('x'),
            FormatCommand::Inline(InlineStyle::Strike),
        ),
        (
            Chord::primary_shift('h'),
            FormatCommand::Inline(InlineStyle::Highlight),
        ),
        (
            Chord::primary_alt('1'),
            FormatCommand::Line(LinePrefix::Heading(1)),
        ),
        (
            Chord::primary_alt('2'),
            FormatCommand::Line(LinePrefix::Heading(2)),
        ),
        (
            Chord::primary_alt('3'),
            FormatCommand::Line(LinePrefix::Heading(3)),
        ),
        (Chord::primary_shift('q'), FormatCommand::Line(LinePrefix::Quote)),
        (Chord::primary_shift('7'), FormatCommand::Line(LinePrefix::Ordered)),
        (Chord::primary_shift('8'), FormatCommand::Line(LinePrefix::Bullet)),
        (Chord::primary_shift('9'), FormatCommand::Line(LinePrefix::Task)),
    ]
}

/// Look `key` up in `keymap`.
pub fn lookup(keymap: &[(Chord, FormatCommand)], key: &Key) -> Option<FormatCommand> {
    keymap
        .iter()
        .find(|(chord, _)| chord.matches(key))
        .map(|(_, command)| *command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sequence() {
        let keys = Key::parse_sequence("ia<Esc>:wq<CR>");
        assert_eq!(keys.len(), 7);
        assert_eq!(keys[0], Key::char('i'));
        assert_eq!(keys[2], Key::new(KeyCode::Escape));
        assert_eq!(keys[6], Key::new(KeyCode::Enter));
    }

    #[test]
    fn test_parse_modifiers() {
        assert_eq!(Key::parse_sequence("<C-r>"), vec![Key::ctrl('r')]);
        assert_eq!(
            Key::parse_sequence("<S-Tab>"),
            vec![Key::with_modifiers(KeyCode::Tab, Modifiers::SHIFT)]
        );
        // Unknown groups are literal text.
        assert_eq!(Key::parse_sequence("<x>").len(), 3);
        assert_eq!(Key::parse_sequence("<lt>"), vec![Key::char('<')]);
    }

    #[test]
    fn test_chord_matching() {
        let bold = Chord::primary('b');
        assert!(bold.matches(&Key::ctrl('b')));
        assert!(bold.matches(&Key::with_modifiers(
            KeyCode::Char('b'),
            Modifiers {
                meta: true,
                ..Modifiers::NONE
            }
        )));
        assert!(!bold.matches(&Key::char('b')));

        let strike = Chord::primary_shift('x');
        let key = Key::with_modifiers(
            KeyCode::Char('X'),
            Modifiers {
                ctrl: true,
                shift: true,
                ..Modifiers::NONE
            },
        );
        assert!(strike.matches(&key));
        assert!(!bold.matches(&key));
    }

    #[test]
    fn test_lookup_default_keymap() {
        let keymap = default_keymap();
        assert_eq!(
            lookup(&keymap, &Key::ctrl('i')),
            Some(FormatCommand::Inline(InlineStyle::Italic))
        );
        assert_eq!(lookup(&keymap, &Key::ctrl('z')), None);
    }
}
