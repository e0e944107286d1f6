//! Byte-level state machine for the VT escape grammar.
//!
//! The classic VT500-family parser organized as a dense transition table:
//! for every `(state, byte)` pair the table yields a `(next state, action)`
//! pair packed into 16 bits. The table is built once from per-state
//! ordered range lists (first matching range wins) and is immutable
//! afterwards; it is the only process-wide state in the crate.

use std::sync::OnceLock;

/// Parser states. The three `Utf8B*` states count remaining continuation
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum State {
    #[default]
    Ground,
    Esc1,
    Esc2,
    Csi1,
    Csi2,
    CsiParam,
    CsiIgnore,
    Osc,
    Dcs1,
    Dcs2,
    DcsParam,
    DcsIgnore,
    DcsPass,
    SosPmApc,
    Utf8B1,
    Utf8B2,
    Utf8B3,
}

pub const NUM_STATES: usize = 17;

/// Per-byte actions the parser performs while walking the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Action {
    #[default]
    None,
    Ignore,
    Print,
    PrintWide,
    Utf8GetB2,
    Utf8GetB3,
    Utf8GetB4,
    Utf8Error,
    Exec,
    Clear,
    GetIntermediate,
    GetPrivMarker,
    Param,
    EscDispatch,
    CsiDispatch,
    Hook,
    Unhook,
    Put,
    OscStart,
    OscPut,
    OscEnd,
}

impl State {
    fn from_raw(raw: u8) -> State {
        match raw {
            0 => State::Ground,
            1 => State::Esc1,
            2 => State::Esc2,
            3 => State::Csi1,
            4 => State::Csi2,
            5 => State::CsiParam,
            6 => State::CsiIgnore,
            7 => State::Osc,
            8 => State::Dcs1,
            9 => State::Dcs2,
            10 => State::DcsParam,
            11 => State::DcsIgnore,
            12 => State::DcsPass,
            13 => State::SosPmApc,
            14 => State::Utf8B1,
            15 => State::Utf8B2,
            16 => State::Utf8B3,
            _ => State::Ground,
        }
    }
}

impl Action {
    fn from_raw(raw: u8) -> Action {
        match raw {
            0 => Action::None,
            1 => Action::Ignore,
            2 => Action::Print,
            3 => Action::PrintWide,
            4 => Action::Utf8GetB2,
            5 => Action::Utf8GetB3,
            6 => Action::Utf8GetB4,
            7 => Action::Utf8Error,
            8 => Action::Exec,
            9 => Action::Clear,
            10 => Action::GetIntermediate,
            11 => Action::GetPrivMarker,
            12 => Action::Param,
            13 => Action::EscDispatch,
            14 => Action::CsiDispatch,
            15 => Action::Hook,
            16 => Action::Unhook,
            17 => Action::Put,
            18 => Action::OscStart,
            19 => Action::OscPut,
            20 => Action::OscEnd,
            _ => Action::None,
        }
    }
}

/// A byte range and the transition it selects. `state == None` keeps the
/// current state (self-reference).
struct Range {
    beg: u8,
    end: u8,
    state: Option<State>,
    action: Action,
}

const fn r(beg: u8, end: u8, state: Option<State>, action: Action) -> Range {
    Range { beg, end, state, action }
}

fn pack(state: State, action: Action) -> u16 {
    (state as u16) | ((action as u16) << 8)
}

/// The dense table: 256 bytes by `NUM_STATES` states.
pub struct Table {
    entries: [[u16; NUM_STATES]; 256],
}

impl Table {
    /// Transition for `(state, byte)`.
    pub fn next(&self, state: State, byte: u8) -> (State, Action) {
        let pair = self.entries[byte as usize][state as usize];
        (State::from_raw((pair & 0xff) as u8), Action::from_raw((pair >> 8) as u8))
    }

    /// The process-wide table, built on first use.
    pub fn get() -> &'static Table {
        static TABLE: OnceLock<Table> = OnceLock::new();
        TABLE.get_or_init(Table::generate)
    }

    fn generate() -> Table {
        use Action as A;
        use State as S;

        // Character ranges per state, searched linearly; the first range
        // containing the byte is selected.
        let descs: [&[Range]; NUM_STATES] = [
            // Ground
            &[
                r(0xf0, 0xf7, Some(S::Utf8B3), A::Utf8GetB4),
                r(0xe0, 0xef, Some(S::Utf8B2), A::Utf8GetB3),
                r(0xc0, 0xdf, Some(S::Utf8B1), A::Utf8GetB2),
                r(0x20, 0x7f, None, A::Print),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::Utf8Error),
            ],
            // Esc1
            &[
                r(b']', b']', Some(S::Osc), A::OscStart),
                r(b'[', b'[', Some(S::Csi1), A::None),
                r(b'X', b'X', Some(S::SosPmApc), A::None),
                r(b'^', b'_', Some(S::SosPmApc), A::None),
                r(b'P', b'P', Some(S::Dcs1), A::None),
                r(b'0', 0x7e, Some(S::Ground), A::EscDispatch),
                r(b' ', b'/', Some(S::Esc2), A::GetIntermediate),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // Esc2
            &[
                r(b'0', 0x7e, Some(S::Ground), A::EscDispatch),
                r(b' ', b'/', Some(S::Ground), A::None),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // Csi1
            &[
                r(b'@', 0x7e, Some(S::Ground), A::CsiDispatch),
                r(b'<', b'?', Some(S::CsiParam), A::GetPrivMarker),
                r(b':', b':', Some(S::CsiIgnore), A::None),
                r(b'0', b';', Some(S::CsiParam), A::Param),
                r(b' ', b'/', Some(S::Csi2), A::GetIntermediate),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // Csi2
            &[
                r(b'@', 0x7e, Some(S::Ground), A::CsiDispatch),
                r(b' ', b'?', Some(S::CsiIgnore), A::None),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // CsiParam
            &[
                r(b'@', 0x7e, Some(S::Ground), A::CsiDispatch),
                r(b'<', b'?', Some(S::CsiIgnore), A::None),
                r(b':', b':', Some(S::CsiIgnore), A::None),
                r(b'0', b';', None, A::Param),
                r(b' ', b'/', Some(S::Csi2), A::GetIntermediate),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // CsiIgnore
            &[
                r(b'@', 0x7e, Some(S::Ground), A::None),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // Osc
            &[
                r(0x07, 0x07, Some(S::Ground), A::OscEnd),
                r(0x00, 0x1f, None, A::None),
                r(0x00, 0xff, None, A::OscPut),
            ],
            // Dcs1
            &[
                r(b'@', 0x7e, Some(S::DcsPass), A::Hook),
                r(b'<', b'?', Some(S::DcsParam), A::GetPrivMarker),
                r(b':', b':', Some(S::DcsIgnore), A::None),
                r(b'0', b';', Some(S::DcsParam), A::Param),
                r(b' ', b'/', Some(S::Dcs2), A::GetIntermediate),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // Dcs2
            &[
                r(b'@', 0x7e, Some(S::DcsPass), A::Hook),
                r(b' ', b'?', Some(S::DcsIgnore), A::None),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // DcsParam
            &[
                r(b'@', 0x7e, Some(S::DcsPass), A::Hook),
                r(b'<', b'?', Some(S::DcsIgnore), A::None),
                r(b':', b':', Some(S::DcsIgnore), A::None),
                r(b'0', b';', None, A::Param),
                r(b' ', b'/', Some(S::Dcs2), A::GetIntermediate),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // DcsIgnore
            &[
                r(0x9c, 0x9c, Some(S::Ground), A::None),
                r(0x00, 0x1f, None, A::Exec),
                r(0x00, 0xff, None, A::None),
            ],
            // DcsPass
            &[
                r(0x9c, 0x9c, Some(S::Ground), A::Unhook),
                r(0x00, 0x7e, None, A::Put),
                r(0x00, 0xff, None, A::None),
            ],
            // SosPmApc
            &[
                r(0x9c, 0x9c, Some(S::Ground), A::None),
                r(0x00, 0xff, None, A::None),
            ],
            // Utf8B1
            &[
                r(0x80, 0xff, Some(S::Ground), A::PrintWide),
                r(0x00, 0x3f, Some(S::Ground), A::PrintWide),
                r(0x00, 0xff, Some(S::Ground), A::Utf8Error),
            ],
            // Utf8B2
            &[
                r(0x80, 0xff, Some(S::Utf8B1), A::Utf8GetB2),
                r(0x00, 0x3f, Some(S::Utf8B1), A::Utf8GetB2),
                r(0x00, 0xff, Some(S::Ground), A::Utf8Error),
            ],
            // Utf8B3
            &[
                r(0x80, 0xff, Some(S::Utf8B2), A::Utf8GetB3),
                r(0x00, 0x3f, Some(S::Utf8B2), A::Utf8GetB3),
                r(0x00, 0xff, Some(S::Ground), A::Utf8Error),
            ],
        ];

        let mut entries = [[0u16; NUM_STATES]; 256];

        // First pass: fill from the range lists.
        for c in 0..=255u8 {
            for (s, desc) in descs.iter().enumerate() {
                let current = State::from_raw(s as u8);
                let (state, action) = match find_range(c, desc) {
                    Some(range) => (range.state.unwrap_or(current), range.action),
                    None => (current, A::None),
                };
                entries[c as usize][s] = pack(state, action);
            }
        }

        // Second pass: ESC/CAN/SUB apply across states, except inside
        // UTF-8 continuation runs where 0x00..=0x3f are valid
        // continuation bytes.
        for s in 0..NUM_STATES {
            match State::from_raw(s as u8) {
                S::Utf8B1 | S::Utf8B2 | S::Utf8B3 => {}
                _ => {
                    entries[0x1b][s] = pack(S::Esc1, A::Clear);
                    entries[0x1a][s] = pack(S::Ground, A::Exec);
                    entries[0x18][s] = pack(S::Ground, A::Exec);
                }
            }
        }

        Table { entries }
    }
}

fn find_range<'a>(c: u8, ranges: &'a [Range]) -> Option<&'a Range> {
    ranges.iter().find(|range| c >= range.beg && c <= range.end)
}
