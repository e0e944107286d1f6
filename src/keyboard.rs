//! Keyboard-to-byte encoding per DEC/xterm conventions.
//!
//! The host hands over an abstract keycode, a modifier mask, and the
//! text the key carries; this module resolves them to the byte sequence
//! the child expects. Function and editing keys go through a template
//! table whose parameter placeholder is expanded from the modifier mask;
//! keypad keys are first remapped according to application-keypad mode
//! and NumLock; everything else falls back to the carried text, with an
//! ESC prefix under Alt.

use bitflags::bitflags;
use tracing::warn;

/// Encoder scratch size; a sequence that cannot fit sends nothing.
pub const INPUT_MAX: usize = 128;

bitflags! {
    /// Modifier mask delivered with a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mods: u8 {
        const SHIFT   = 1 << 0;
        const ALT     = 1 << 1;
        const CTRL    = 1 << 2;
        const NUMLOCK = 1 << 3;
    }
}

/// Keyboard-relevant mode flags owned by the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardModes {
    /// DECCKM: application cursor keys (SS3 arrow forms).
    pub app_cursor: bool,
    /// DECKPAM: application keypad (SS3 keypad forms).
    pub app_keypad: bool,
}

/// The closed set of keys the encoder understands. Printable input
/// arrives as `Char` carriers; unknown keys fall back to their text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Printable ASCII carrier.
    Char(u8),
    Escape,
    Return,
    Tab,
    Backspace,
    Up,
    Down,
    Right,
    Left,
    Begin,
    End,
    Home,
    Insert,
    Delete,
    PgUp,
    PgDown,
    /// Function key 1..=25.
    F(u8),
    KpSpace,
    KpTab,
    KpEnter,
    KpMultiply,
    KpAdd,
    KpSeparator,
    KpSubtract,
    KpDecimal,
    KpDivide,
    /// Keypad digit 0..=9.
    Kp(u8),
    KpEqual,
    KpUp,
    KpDown,
    KpRight,
    KpLeft,
    KpBegin,
    KpEnd,
    KpHome,
    KpInsert,
    KpDelete,
    KpPgUp,
    KpPgDown,
}

/// Placeholder byte expanded to the modifier parameter.
const PARAM: u8 = 0x01;

const PARAM_MASK: Mods = Mods::SHIFT.union(Mods::ALT).union(Mods::CTRL);

/// xterm modifier parameter: 2=Shift, 3=Alt, 5=Ctrl and sums thereof.
fn mods_to_param(mods: Mods) -> u8 {
    let bits = (mods & PARAM_MASK).bits();
    if bits == 0 { 0 } else { bits + 1 }
}

/// Whether the keypad resolves to its application layer. NumLock forces
/// the numeric layer unless Shift is held.
fn resolve_appkeypad(mods: Mods, app_keypad: bool) -> bool {
    let shift = mods.contains(Mods::SHIFT);
    let numlock = mods.contains(Mods::NUMLOCK);
    if !numlock && app_keypad { !shift } else { shift }
}

/// Map keypad keys onto their cursor/edit equivalents when the numeric
/// layer is active.
fn remap_keypad(key: Key, appkp: bool) -> Key {
    if appkp {
        return match key {
            Key::KpUp => Key::Kp(8),
            Key::KpDown => Key::Kp(2),
            Key::KpRight => Key::Kp(6),
            Key::KpLeft => Key::Kp(4),
            Key::KpBegin => Key::Kp(5),
            Key::KpEnd => Key::Kp(1),
            Key::KpHome => Key::Kp(7),
            Key::KpInsert => Key::Kp(0),
            Key::KpDelete => Key::KpDecimal,
            Key::KpPgUp => Key::Kp(9),
            Key::KpPgDown => Key::Kp(3),
            other => other,
        };
    }
    match key {
        Key::KpUp => Key::Up,
        Key::KpDown => Key::Down,
        Key::KpRight => Key::Right,
        Key::KpLeft => Key::Left,
        Key::KpBegin => Key::Begin,
        Key::KpEnd => Key::End,
        Key::KpHome => Key::Home,
        Key::KpInsert => Key::Insert,
        Key::KpDelete => Key::Delete,
        Key::KpPgUp => Key::PgUp,
        Key::KpPgDown => Key::PgDown,
        Key::KpTab => Key::Tab,
        Key::KpEnter => Key::Return,
        Key::KpSpace => Key::Char(b' '),
        Key::KpEqual => Key::Char(b'='),
        other => other,
    }
}

/// Pre-defined sequence for a function key, if one exists. `PARAM`
/// bytes mark where the modifier parameter is substituted.
fn query_substitute(key: Key, mods: Mods, modes: KeyboardModes) -> Option<&'static [u8]> {
    let appkp = resolve_appkeypad(mods, modes.app_keypad);
    let key = remap_keypad(key, appkp);

    if appkp {
        let seq: Option<&'static [u8]> = match key {
            Key::KpSpace => Some(b"\x1bO "),
            Key::KpTab => Some(b"\x1bOI"),
            Key::KpEnter => Some(b"\x1bOM"),
            Key::KpMultiply => Some(b"\x1bOj"),
            Key::KpAdd => Some(b"\x1bOk"),
            Key::KpSeparator => Some(b"\x1bOl"),
            Key::KpSubtract => Some(b"\x1bOm"),
            Key::KpDecimal => Some(b"\x1bOn"),
            Key::KpDivide => Some(b"\x1bOo"),
            Key::Kp(0) => Some(b"\x1bOp"),
            Key::Kp(1) => Some(b"\x1bOq"),
            Key::Kp(2) => Some(b"\x1bOr"),
            Key::Kp(3) => Some(b"\x1bOs"),
            Key::Kp(4) => Some(b"\x1bOt"),
            Key::Kp(5) => Some(b"\x1bOu"),
            Key::Kp(6) => Some(b"\x1bOv"),
            Key::Kp(7) => Some(b"\x1bOw"),
            Key::Kp(8) => Some(b"\x1bOx"),
            Key::Kp(9) => Some(b"\x1bOy"),
            Key::KpEqual => Some(b"\x1bOX"),
            _ => None,
        };
        if seq.is_some() {
            return seq;
        }
    }

    let appcrs = modes.app_cursor;

    let seq: Option<&'static [u8]> = match key {
        Key::Up => Some(if appcrs { b"\x1bOA" } else { b"\x1b[\x01A" }),
        Key::Down => Some(if appcrs { b"\x1bOB" } else { b"\x1b[\x01B" }),
        Key::Right => Some(if appcrs { b"\x1bOC" } else { b"\x1b[\x01C" }),
        Key::Left => Some(if appcrs { b"\x1bOD" } else { b"\x1b[\x01D" }),
        Key::Begin => Some(if appcrs { b"\x1bOE" } else { b"\x1b[\x01E" }),
        Key::End => Some(if appcrs { b"\x1bOF" } else { b"\x1b[\x01F" }),
        Key::Home => Some(if appcrs { b"\x1bOH" } else { b"\x1b[\x01H" }),

        Key::Insert => Some(b"\x1b[2\x01~"),
        Key::Delete => Some(b"\x1b[3\x01~"),
        Key::PgUp => Some(b"\x1b[5\x01~"),
        Key::PgDown => Some(b"\x1b[6\x01~"),

        Key::F(1) => Some(b"\x1bO\x01P"),
        Key::F(2) => Some(b"\x1bO\x01Q"),
        Key::F(3) => Some(b"\x1bO\x01R"),
        Key::F(4) => Some(b"\x1bO\x01S"),
        Key::F(5) => Some(b"\x1b[15\x01~"),
        Key::F(6) => Some(b"\x1b[17\x01~"),
        Key::F(7) => Some(b"\x1b[18\x01~"),
        Key::F(8) => Some(b"\x1b[19\x01~"),
        Key::F(9) => Some(b"\x1b[20\x01~"),
        Key::F(10) => Some(b"\x1b[21\x01~"),
        Key::F(11) => Some(b"\x1b[23\x01~"),
        Key::F(12) => Some(b"\x1b[24\x01~"),
        Key::F(13) => Some(b"\x1b[25\x01~"),
        Key::F(14) => Some(b"\x1b[26\x01~"),
        Key::F(15) => Some(b"\x1b[28\x01~"),
        Key::F(16) => Some(b"\x1b[29\x01~"),
        Key::F(17) => Some(b"\x1b[31\x01~"),
        Key::F(18) => Some(b"\x1b[32\x01~"),
        Key::F(19) => Some(b"\x1b[33\x01~"),
        Key::F(20) => Some(b"\x1b[34\x01~"),
        _ => None,
    };
    if seq.is_some() {
        return seq;
    }

    if !mods.is_empty()
        && !mods.contains(Mods::ALT)
        && matches!(key, Key::Return | Key::Tab)
    {
        return Some(b"\x1b[27\x01;13~");
    }
    if !mods.contains(Mods::CTRL) && key == Key::Backspace {
        return Some(b"\x7f");
    }

    None
}

/// Expand a template into `buf`, substituting the modifier parameter and
/// applying the single-byte Alt prefix. Returns the length, or `None` if
/// the result would not fit.
fn parse_sequence(template: &[u8], mods: Mods, buf: &mut [u8]) -> Option<usize> {
    let param = mods_to_param(mods);
    let mut len = 0usize;

    let push = |buf: &mut [u8], len: &mut usize, byte: u8| -> bool {
        if *len >= buf.len() {
            return false;
        }
        buf[*len] = byte;
        *len += 1;
        true
    };

    let mut prev = 0u8;
    for &byte in template {
        if byte != PARAM {
            if !push(buf, &mut len, byte) {
                return None;
            }
            prev = byte;
        } else if param != 0 {
            // No numeric prefix yet: the parameter position itself
            // becomes "1;<mod>".
            if !prev.is_ascii_digit() && !push(buf, &mut len, b'1') {
                return None;
            }
            if !push(buf, &mut len, b';') || !push(buf, &mut len, b'0' + param) {
                return None;
            }
        }
    }

    // Single-byte emissions become ESC-prefixed under Alt.
    if len == 1 && mods.contains(Mods::ALT) {
        if buf.len() < 2 {
            return None;
        }
        buf[1] = buf[0];
        buf[0] = 0x1b;
        len = 2;
    }

    Some(len)
}

/// Resolve one key event to bytes in `buf`. Returns the number of bytes
/// to send; 0 means the key has no terminal meaning (or was oversize).
pub fn encode(
    key: Key,
    mods: Mods,
    text: &[u8],
    modes: KeyboardModes,
    buf: &mut [u8; INPUT_MAX],
) -> usize {
    if let Some(template) = query_substitute(key, mods, modes) {
        match parse_sequence(template, mods, buf) {
            Some(n) => return n,
            None => {
                warn!("oversize input, dropping key sequence");
                return 0;
            }
        }
    }

    // Raw fallback: either standard text or an unknown function key.
    if text.len() == 1 && mods.contains(Mods::ALT) {
        buf[0] = 0x1b;
        buf[1] = text[0];
        return 2;
    }
    if !text.is_empty() {
        if text.len() > buf.len() {
            warn!(len = text.len(), "oversize input, dropping text");
            return 0;
        }
        buf[..text.len()].copy_from_slice(text);
        return text.len();
    }

    0
}
