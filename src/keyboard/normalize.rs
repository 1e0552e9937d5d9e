//! Key identity normalization
//!
//! Turns a [`RawKeyEvent`] into the string identifier counts are kept under.
//! The stored form is also the displayed form:
//!
//! | Press | Identifier |
//! |-------|------------|
//! | `a` | `a` |
//! | shift + `a` | `A` |
//! | shift + `1` | `!` |
//! | spacebar | `space` |
//! | left shift | `shift` |
//! | right shift | `shift_r` |
//! | F5 | `f5` |
//! | unmapped scancode 240 | `<240>` |

use super::event::RawKeyEvent;
use super::keymap::get_key_info;

/// Prefix older data files carry on non-printable keys, e.g. `Key.shift`
pub const LEGACY_PREFIX: &str = "Key.";

/// Map a raw key press to its identifier. Never fails.
pub fn normalize(event: &RawKeyEvent) -> String {
    if let Some(ch) = event.text.filter(|c| is_printable(*c)) {
        return ch.to_string();
    }

    match get_key_info(event.key) {
        Some(info) => match info.chars {
            Some((base, shifted)) => {
                let mut use_shifted = event.modifiers.shift;
                if info.is_letter() && event.modifiers.caps_lock {
                    use_shifted = !use_shifted;
                }
                let ch = if use_shifted { shifted } else { base };
                ch.to_string()
            }
            None => info.name.to_string(),
        },
        None => event.key.to_string(),
    }
}

/// Canonical form of an identifier read back from disk
pub fn canonical_identifier(stored: &str) -> &str {
    match stored.strip_prefix(LEGACY_PREFIX) {
        Some(name) if !name.is_empty() => name,
        _ => stored,
    }
}

fn is_printable(ch: char) -> bool {
    !ch.is_whitespace() && !ch.is_control()
}
