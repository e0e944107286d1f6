//! Typed opcodes emitted by the parser.
//!
//! Each escape sequence collapses to a small record of its final byte,
//! optional intermediate, and optional private marker; printable input
//! collapses to `Write`. Numeric parameters and string payloads stay in
//! the parser, which lends them to the executor at dispatch time.

/// One decoded unit of terminal input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// A codepoint to print, or a C0 control to execute.
    Write(u32),
    /// `ESC` sequence: optional intermediate plus final.
    Esc { inter: u8, finalb: u8 },
    /// `CSI` sequence: optional private marker, optional intermediate,
    /// final. Parameters live in the parser.
    Csi { private: u8, inter: u8, finalb: u8 },
    /// Operating System Command; leading numeric argument and payload
    /// live in the parser.
    Osc,
    /// Device Control String, terminated; payload lives in the parser.
    Dcs { private: u8, inter: u8, finalb: u8 },
}

impl Opcode {
    /// CSI with no private marker or intermediate.
    pub fn csi(finalb: u8) -> Opcode {
        Opcode::Csi { private: 0, inter: 0, finalb }
    }

    /// ESC with no intermediate.
    pub fn esc(finalb: u8) -> Opcode {
        Opcode::Esc { inter: 0, finalb }
    }
}
