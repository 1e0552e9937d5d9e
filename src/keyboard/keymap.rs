//! Key codes and the static key table used for naming keys
//!
//! Codes follow the Linux evdev scancode numbering, which every source
//! converts into before handing events to the recorder.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Represents a physical key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const LEFT_SHIFT: KeyCode = KeyCode(42);
    pub const RIGHT_SHIFT: KeyCode = KeyCode(54);
    pub const CAPS_LOCK: KeyCode = KeyCode(58);

    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub fn is_shift(&self) -> bool {
        *self == Self::LEFT_SHIFT || *self == Self::RIGHT_SHIFT
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl From<device_query::Keycode> for KeyCode {
    fn from(keycode: device_query::Keycode) -> Self {
        use device_query::Keycode as DK;
        let code = match keycode {
            // Letters
            DK::Q => 16,
            DK::W => 17,
            DK::E => 18,
            DK::R => 19,
            DK::T => 20,
            DK::Y => 21,
            DK::U => 22,
            DK::I => 23,
            DK::O => 24,
            DK::P => 25,
            DK::A => 30,
            DK::S => 31,
            DK::D => 32,
            DK::F => 33,
            DK::G => 34,
            DK::H => 35,
            DK::J => 36,
            DK::K => 37,
            DK::L => 38,
            DK::Z => 44,
            DK::X => 45,
            DK::C => 46,
            DK::V => 47,
            DK::B => 48,
            DK::N => 49,
            DK::M => 50,

            // Digits and punctuation
            DK::Key1 => 2,
            DK::Key2 => 3,
            DK::Key3 => 4,
            DK::Key4 => 5,
            DK::Key5 => 6,
            DK::Key6 => 7,
            DK::Key7 => 8,
            DK::Key8 => 9,
            DK::Key9 => 10,
            DK::Key0 => 11,
            DK::Minus => 12,
            DK::Equal => 13,
            DK::LeftBracket => 26,
            DK::RightBracket => 27,
            DK::Semicolon => 39,
            DK::Apostrophe => 40,
            DK::Grave => 41,
            DK::BackSlash => 43,
            DK::Comma => 51,
            DK::Dot => 52,
            DK::Slash => 53,

            // Editing and whitespace
            DK::Escape => 1,
            DK::Backspace => 14,
            DK::Tab => 15,
            DK::Enter => 28,
            DK::Space => 57,
            DK::CapsLock => 58,
            DK::Insert => 110,
            DK::Delete => 111,

            // Modifiers
            DK::LControl => 29,
            DK::LShift => 42,
            DK::RShift => 54,
            DK::LAlt => 56,
            DK::RControl => 97,
            DK::RAlt => 100,
            DK::LMeta => 125,
            DK::RMeta => 126,
            // macOS reports these instead of LMeta/LAlt/RAlt
            DK::Command => 125,
            DK::LOption => 56,
            DK::ROption => 100,

            // Function row
            DK::F1 => 59,
            DK::F2 => 60,
            DK::F3 => 61,
            DK::F4 => 62,
            DK::F5 => 63,
            DK::F6 => 64,
            DK::F7 => 65,
            DK::F8 => 66,
            DK::F9 => 67,
            DK::F10 => 68,
            DK::F11 => 87,
            DK::F12 => 88,
            DK::F13 => 183,
            DK::F14 => 184,
            DK::F15 => 185,
            DK::F16 => 186,
            DK::F17 => 187,
            DK::F18 => 188,
            DK::F19 => 189,
            DK::F20 => 190,

            // Navigation
            DK::Home => 102,
            DK::Up => 103,
            DK::PageUp => 104,
            DK::Left => 105,
            DK::Right => 106,
            DK::End => 107,
            DK::Down => 108,
            DK::PageDown => 109,

            // Keypad
            DK::NumpadMultiply => 55,
            DK::Numpad7 => 71,
            DK::Numpad8 => 72,
            DK::Numpad9 => 73,
            DK::NumpadSubtract => 74,
            DK::Numpad4 => 75,
            DK::Numpad5 => 76,
            DK::Numpad6 => 77,
            DK::NumpadAdd => 78,
            DK::Numpad1 => 79,
            DK::Numpad2 => 80,
            DK::Numpad3 => 81,
            DK::Numpad0 => 82,
            DK::NumpadDecimal => 83,
            DK::NumpadEnter => 96,
            DK::NumpadDivide => 98,
            DK::NumpadEquals => 117,
        };
        Self(code)
    }
}

/// Naming information about a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    /// Canonical symbolic name, used when the key produces no character
    pub name: &'static str,
    /// Base and shifted characters for keys that type something
    pub chars: Option<(char, char)>,
}

impl KeyInfo {
    const fn symbolic(name: &'static str) -> Self {
        Self { name, chars: None }
    }

    const fn printable(name: &'static str, base: char, shifted: char) -> Self {
        Self {
            name,
            chars: Some((base, shifted)),
        }
    }

    /// Whether caps-lock flips this key's case
    pub fn is_letter(&self) -> bool {
        matches!(self.chars, Some((base, _)) if base.is_ascii_alphabetic())
    }
}

/// Static key table for a standard US layout
pub static KEYMAP: LazyLock<HashMap<KeyCode, KeyInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Number row
    let digits = [
        (2, '1', '!'),
        (3, '2', '@'),
        (4, '3', '#'),
        (5, '4', '$'),
        (6, '5', '%'),
        (7, '6', '^'),
        (8, '7', '&'),
        (9, '8', '*'),
        (10, '9', '('),
        (11, '0', ')'),
    ];
    for (code, base, shifted) in digits {
        map.insert(KeyCode(code), KeyInfo::printable("digit", base, shifted));
    }
    map.insert(KeyCode(12), KeyInfo::printable("minus", '-', '_'));
    map.insert(KeyCode(13), KeyInfo::printable("equal", '=', '+'));
    map.insert(KeyCode(41), KeyInfo::printable("grave", '`', '~'));

    // Letters, row by row
    let rows: [(u16, &str); 3] = [(16, "qwertyuiop"), (30, "asdfghjkl"), (44, "zxcvbnm")];
    for (first, letters) in rows {
        for (offset, letter) in letters.chars().enumerate() {
            map.insert(
                KeyCode(first + offset as u16),
                KeyInfo::printable("letter", letter, letter.to_ascii_uppercase()),
            );
        }
    }

    // Punctuation
    map.insert(KeyCode(26), KeyInfo::printable("bracket_left", '[', '{'));
    map.insert(KeyCode(27), KeyInfo::printable("bracket_right", ']', '}'));
    map.insert(KeyCode(39), KeyInfo::printable("semicolon", ';', ':'));
    map.insert(KeyCode(40), KeyInfo::printable("apostrophe", '\'', '"'));
    map.insert(KeyCode(43), KeyInfo::printable("backslash", '\\', '|'));
    map.insert(KeyCode(51), KeyInfo::printable("comma", ',', '<'));
    map.insert(KeyCode(52), KeyInfo::printable("period", '.', '>'));
    map.insert(KeyCode(53), KeyInfo::printable("slash", '/', '?'));
    map.insert(KeyCode(86), KeyInfo::printable("less", '<', '>'));

    // Keypad (numlock assumed on)
    let keypad = [
        (55, '*'),
        (71, '7'),
        (72, '8'),
        (73, '9'),
        (74, '-'),
        (75, '4'),
        (76, '5'),
        (77, '6'),
        (78, '+'),
        (79, '1'),
        (80, '2'),
        (81, '3'),
        (82, '0'),
        (83, '.'),
        (98, '/'),
        (117, '='),
    ];
    for (code, ch) in keypad {
        map.insert(KeyCode(code), KeyInfo::printable("keypad", ch, ch));
    }

    // Whitespace and editing
    map.insert(KeyCode(1), KeyInfo::symbolic("esc"));
    map.insert(KeyCode(14), KeyInfo::symbolic("backspace"));
    map.insert(KeyCode(15), KeyInfo::symbolic("tab"));
    map.insert(KeyCode(28), KeyInfo::symbolic("enter"));
    map.insert(KeyCode(96), KeyInfo::symbolic("kp_enter"));
    map.insert(KeyCode(57), KeyInfo::symbolic("space"));
    map.insert(KeyCode(110), KeyInfo::symbolic("insert"));
    map.insert(KeyCode(111), KeyInfo::symbolic("delete"));

    // Modifiers and locks
    map.insert(KeyCode(29), KeyInfo::symbolic("ctrl_l"));
    map.insert(KeyCode(42), KeyInfo::symbolic("shift"));
    map.insert(KeyCode(54), KeyInfo::symbolic("shift_r"));
    map.insert(KeyCode(56), KeyInfo::symbolic("alt_l"));
    map.insert(KeyCode(58), KeyInfo::symbolic("caps_lock"));
    map.insert(KeyCode(69), KeyInfo::symbolic("num_lock"));
    map.insert(KeyCode(70), KeyInfo::symbolic("scroll_lock"));
    map.insert(KeyCode(97), KeyInfo::symbolic("ctrl_r"));
    map.insert(KeyCode(100), KeyInfo::symbolic("alt_gr"));
    map.insert(KeyCode(125), KeyInfo::symbolic("cmd"));
    map.insert(KeyCode(126), KeyInfo::symbolic("cmd_r"));
    map.insert(KeyCode(127), KeyInfo::symbolic("menu"));

    // Function keys: F1-F10 are contiguous, F11/F12 and F13-F24 are not
    const F_NAMES: [&str; 24] = [
        "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "f13", "f14",
        "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24",
    ];
    for (i, name) in F_NAMES.iter().enumerate() {
        let code = match i {
            0..=9 => 59 + i as u16,
            10 => 87,
            11 => 88,
            _ => 183 + (i as u16 - 12),
        };
        map.insert(KeyCode(code), KeyInfo::symbolic(name));
    }

    // Navigation cluster
    map.insert(KeyCode(99), KeyInfo::symbolic("print_screen"));
    map.insert(KeyCode(102), KeyInfo::symbolic("home"));
    map.insert(KeyCode(103), KeyInfo::symbolic("up"));
    map.insert(KeyCode(104), KeyInfo::symbolic("page_up"));
    map.insert(KeyCode(105), KeyInfo::symbolic("left"));
    map.insert(KeyCode(106), KeyInfo::symbolic("right"));
    map.insert(KeyCode(107), KeyInfo::symbolic("end"));
    map.insert(KeyCode(108), KeyInfo::symbolic("down"));
    map.insert(KeyCode(109), KeyInfo::symbolic("page_down"));
    map.insert(KeyCode(119), KeyInfo::symbolic("pause"));

    // Media
    map.insert(KeyCode(113), KeyInfo::symbolic("media_volume_mute"));
    map.insert(KeyCode(114), KeyInfo::symbolic("media_volume_down"));
    map.insert(KeyCode(115), KeyInfo::symbolic("media_volume_up"));
    map.insert(KeyCode(163), KeyInfo::symbolic("media_next"));
    map.insert(KeyCode(164), KeyInfo::symbolic("media_play_pause"));
    map.insert(KeyCode(165), KeyInfo::symbolic("media_previous"));

    map
});

/// Get key info by code
pub fn get_key_info(code: KeyCode) -> Option<KeyInfo> {
    KEYMAP.get(&code).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_have_both_cases() {
        let a = get_key_info(KeyCode(30)).unwrap();
        assert_eq!(a.chars, Some(('a', 'A')));
        assert!(a.is_letter());

        let m = get_key_info(KeyCode(50)).unwrap();
        assert_eq!(m.chars, Some(('m', 'M')));
    }

    #[test]
    fn digits_are_not_letters() {
        let one = get_key_info(KeyCode(2)).unwrap();
        assert_eq!(one.chars, Some(('1', '!')));
        assert!(!one.is_letter());
    }

    #[test]
    fn function_keys_cover_gaps() {
        assert_eq!(get_key_info(KeyCode(59)).unwrap().name, "f1");
        assert_eq!(get_key_info(KeyCode(68)).unwrap().name, "f10");
        assert_eq!(get_key_info(KeyCode(87)).unwrap().name, "f11");
        assert_eq!(get_key_info(KeyCode(88)).unwrap().name, "f12");
        assert_eq!(get_key_info(KeyCode(183)).unwrap().name, "f13");
        assert_eq!(get_key_info(KeyCode(194)).unwrap().name, "f24");
    }

    #[test]
    fn space_is_symbolic() {
        let space = get_key_info(KeyCode(57)).unwrap();
        assert_eq!(space.name, "space");
        assert!(space.chars.is_none());
    }

    #[test]
    fn unknown_code_has_no_info() {
        assert!(get_key_info(KeyCode(0)).is_none());
        assert!(get_key_info(KeyCode(500)).is_none());
    }

    #[test]
    fn device_query_conversion() {
        assert_eq!(KeyCode::from(device_query::Keycode::A), KeyCode(30));
        assert_eq!(KeyCode::from(device_query::Keycode::Space), KeyCode(57));
        assert_eq!(KeyCode::from(device_query::Keycode::F12), KeyCode(88));
        assert_eq!(KeyCode::from(device_query::Keycode::RShift), KeyCode::RIGHT_SHIFT);
    }

    const ALL_DEVICE_QUERY_KEYS: [device_query::Keycode; 111] = {
        use device_query::Keycode::*;
        [
            Key0, Key1, Key2, Key3, Key4, Key5, Key6, Key7, Key8, Key9, A, B, C, D, E, F, G, H,
            I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z, F1, F2, F3, F4, F5, F6, F7,
            F8, F9, F10, F11, F12, F13, F14, F15, F16, F17, F18, F19, F20, Escape, Space,
            LControl, RControl, LShift, RShift, LAlt, RAlt, Command, LOption, ROption, LMeta,
            RMeta, Enter, Up, Down, Left, Right, Backspace, CapsLock, Tab, Home, End, PageUp,
            PageDown, Insert, Delete, Numpad0, Numpad1, Numpad2, Numpad3, Numpad4, Numpad5,
            Numpad6, Numpad7, Numpad8, Numpad9, NumpadSubtract, NumpadAdd, NumpadDivide,
            NumpadMultiply, NumpadEquals, NumpadEnter, NumpadDecimal, Grave, Minus, Equal,
            LeftBracket, RightBracket, BackSlash, Semicolon, Apostrophe, Comma, Dot, Slash,
        ]
    };

    /// Same physical key, named differently on macOS
    fn is_platform_alias(key: device_query::Keycode) -> bool {
        use device_query::Keycode::*;
        matches!(key, Command | LOption | ROption)
    }

    #[test]
    fn device_query_keys_get_distinct_known_codes() {
        let mut seen: HashMap<KeyCode, device_query::Keycode> = HashMap::new();
        for key in ALL_DEVICE_QUERY_KEYS {
            let code = KeyCode::from(key);
            assert!(
                get_key_info(code).is_some(),
                "{:?} converts to unnamed {}",
                key,
                code
            );
            if is_platform_alias(key) {
                continue;
            }
            if let Some(other) = seen.insert(code, key) {
                panic!("{:?} and {:?} both convert to {}", other, key, code);
            }
        }
    }

    #[test]
    fn macos_modifiers_match_their_linux_codes() {
        use device_query::Keycode as DK;
        assert_eq!(KeyCode::from(DK::Command), KeyCode::from(DK::LMeta));
        assert_eq!(KeyCode::from(DK::LOption), KeyCode::from(DK::LAlt));
        assert_eq!(KeyCode::from(DK::ROption), KeyCode::from(DK::RAlt));
    }

    #[test]
    fn display_uses_angle_brackets() {
        assert_eq!(KeyCode(183).to_string(), "<183>");
    }
}
