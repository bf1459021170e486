//! The closed key-identifier table that button mappings can target.
//!
//! A mapping entry pairs a logical button label (whatever the remote sends,
//! e.g. `"L1"`) with a *key identifier* string (e.g. `"W"`, `"SPACE"`,
//! `"UP"`).  This module owns the static, closed enumeration of identifiers
//! the server knows how to inject, and the lookup from identifier string to
//! [`KeyCode`].
//!
//! # The `Unknown` sentinel
//!
//! Not every string a user puts in the mapping table is a real key.
//! [`KeyCode::Unknown`] is the placeholder for any identifier with no entry
//! in the table.  Lookup never fails: an unrecognised identifier resolves to
//! `Unknown` and the injector treats it as "no key" — it is simply not
//! actionable.  This mirrors the rule for unmapped button labels: bad input
//! from the mapping layer is a no-op, never an error.
//!
//! # Case sensitivity
//!
//! Lookup is case-insensitive.  `"w"`, `"W"`, `"space"`, and `"Space"` all
//! resolve to the same code, because mapping tables are hand-edited and the
//! table should not care which case the user typed.

use serde::{Deserialize, Serialize};

/// Platform-independent key identifier.
///
/// [`KeyCode::Unknown`] represents any identifier that has no mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    // Letters
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,

    // Digits (top row)
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,

    // Whitespace and editing keys
    Space,
    Enter,
    Tab,
    Escape,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,

    // Arrows
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    // Modifiers
    Shift,
    Control,
    Alt,
    Meta,
    CapsLock,

    // Punctuation
    Minus,
    Equal,
    BracketLeft,
    BracketRight,
    Backslash,
    Semicolon,
    Quote,
    Backquote,
    Comma,
    Period,
    Slash,

    // Function keys
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    /// Identifier not present in the table; never injected.
    Unknown,
}

/// Resolves a key-identifier string to its [`KeyCode`].
///
/// Letters accept either case, named keys accept common aliases
/// (`"ESC"`/`"ESCAPE"`, `"CTRL"`/`"CONTROL"`, `"UP"`/`"ARROWUP"`).
/// Anything unrecognised resolves to [`KeyCode::Unknown`] — by contract this
/// function has no error path.
pub fn resolve(identifier: &str) -> KeyCode {
    // Normalise once so the match arms below only deal with upper case.
    let id = identifier.to_ascii_uppercase();
    match id.as_str() {
        "A" => KeyCode::KeyA,
        "B" => KeyCode::KeyB,
        "C" => KeyCode::KeyC,
        "D" => KeyCode::KeyD,
        "E" => KeyCode::KeyE,
        "F" => KeyCode::KeyF,
        "G" => KeyCode::KeyG,
        "H" => KeyCode::KeyH,
        "I" => KeyCode::KeyI,
        "J" => KeyCode::KeyJ,
        "K" => KeyCode::KeyK,
        "L" => KeyCode::KeyL,
        "M" => KeyCode::KeyM,
        "N" => KeyCode::KeyN,
        "O" => KeyCode::KeyO,
        "P" => KeyCode::KeyP,
        "Q" => KeyCode::KeyQ,
        "R" => KeyCode::KeyR,
        "S" => KeyCode::KeyS,
        "T" => KeyCode::KeyT,
        "U" => KeyCode::KeyU,
        "V" => KeyCode::KeyV,
        "W" => KeyCode::KeyW,
        "X" => KeyCode::KeyX,
        "Y" => KeyCode::KeyY,
        "Z" => KeyCode::KeyZ,

        "0" => KeyCode::Digit0,
        "1" => KeyCode::Digit1,
        "2" => KeyCode::Digit2,
        "3" => KeyCode::Digit3,
        "4" => KeyCode::Digit4,
        "5" => KeyCode::Digit5,
        "6" => KeyCode::Digit6,
        "7" => KeyCode::Digit7,
        "8" => KeyCode::Digit8,
        "9" => KeyCode::Digit9,

        " " | "SPACE" => KeyCode::Space,
        "ENTER" | "RETURN" => KeyCode::Enter,
        "TAB" => KeyCode::Tab,
        "ESC" | "ESCAPE" => KeyCode::Escape,
        "BACKSPACE" => KeyCode::Backspace,
        "DEL" | "DELETE" => KeyCode::Delete,
        "INS" | "INSERT" => KeyCode::Insert,
        "HOME" => KeyCode::Home,
        "END" => KeyCode::End,
        "PGUP" | "PAGEUP" => KeyCode::PageUp,
        "PGDN" | "PAGEDOWN" => KeyCode::PageDown,

        "UP" | "ARROWUP" => KeyCode::ArrowUp,
        "DOWN" | "ARROWDOWN" => KeyCode::ArrowDown,
        "LEFT" | "ARROWLEFT" => KeyCode::ArrowLeft,
        "RIGHT" | "ARROWRIGHT" => KeyCode::ArrowRight,

        "SHIFT" => KeyCode::Shift,
        "CTRL" | "CONTROL" => KeyCode::Control,
        "ALT" | "OPTION" => KeyCode::Alt,
        "CMD" | "META" | "SUPER" | "WIN" => KeyCode::Meta,
        "CAPSLOCK" => KeyCode::CapsLock,

        "-" => KeyCode::Minus,
        "=" => KeyCode::Equal,
        "[" => KeyCode::BracketLeft,
        "]" => KeyCode::BracketRight,
        "\\" => KeyCode::Backslash,
        ";" => KeyCode::Semicolon,
        "'" => KeyCode::Quote,
        "`" => KeyCode::Backquote,
        "," => KeyCode::Comma,
        "." => KeyCode::Period,
        "/" => KeyCode::Slash,

        "F1" => KeyCode::F1,
        "F2" => KeyCode::F2,
        "F3" => KeyCode::F3,
        "F4" => KeyCode::F4,
        "F5" => KeyCode::F5,
        "F6" => KeyCode::F6,
        "F7" => KeyCode::F7,
        "F8" => KeyCode::F8,
        "F9" => KeyCode::F9,
        "F10" => KeyCode::F10,
        "F11" => KeyCode::F11,
        "F12" => KeyCode::F12,

        _ => KeyCode::Unknown,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
