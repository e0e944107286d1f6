//! Cell-level data model for the terminal grid.
//!
//! A `Cell` is the fixed-layout record stored per column in every row:
//! codepoint, column width, colors, attribute set, and a kind tag that
//! distinguishes real content from the filler slots written by tab
//! expansion and wide glyphs. Colors are tagged references resolved
//! against the palette at render time, never raw pixels.

use bitflags::bitflags;

bitflags! {
    /// Graphic-rendition attributes applied by SGR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attrs: u8 {
        const BOLD      = 1 << 0;
        const ITALIC    = 1 << 1;
        const UNDERLINE = 1 << 2;
        const BLINK     = 1 << 3;
        const INVERT    = 1 << 4;
        const INVISIBLE = 1 << 5;
    }
}

bitflags! {
    /// Row header flags.
    ///
    /// `WRAPPED` means the next row continues this logical line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RowFlags: u8 {
        const WRAPPED      = 1 << 0;
        const HAS_TABS     = 1 << 1;
        const HAS_MULTICOL = 1 << 2;
        const HAS_COMPLEX  = 1 << 3;
    }
}

/// What a cell slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellKind {
    /// Never written (zero codepoint).
    #[default]
    Blank,
    Normal,
    Complex,
    /// The space written at a tab's first column.
    TabLeader,
    /// Spaces padding out the rest of a tab run.
    DummyTab,
    /// Filler behind a width-2 glyph.
    DummyWide,
}

/// A color reference. `Default` resolves to the palette's default
/// background or foreground depending on which slot it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    /// 8-bit palette index (16 ANSI + 240 extended).
    Indexed(u8),
    /// 24-bit literal, `0xRRGGBB`.
    Rgb(u32),
}

/// One grid slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    /// UCS-4 codepoint; zero for a never-written slot.
    pub ucs4: u32,
    /// Columns occupied: 1 or 2 (0 for a never-written slot).
    pub width: u8,
    pub bg: Color,
    pub fg: Color,
    pub attrs: Attrs,
    pub kind: CellKind,
}

impl Cell {
    /// True for a slot no write has ever touched.
    pub fn is_empty(&self) -> bool {
        self.ucs4 == 0
    }
}

/// Cursor shapes selectable via DECSCUSR. Discriminants follow the DEC
/// parameter space (2 block, 4 underscore, 5 bar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default = 0,
    Block = 2,
    Underscore = 4,
    Bar = 5,
    Outline = 7,
}

impl CursorStyle {
    /// Map a DECSCUSR parameter to a style. Parameters above 7 are
    /// rejected; blink variants collapse onto their steady shape.
    pub fn from_param(param: i32) -> Option<Self> {
        match param {
            0 => Some(CursorStyle::Default),
            1 | 2 => Some(CursorStyle::Block),
            3 | 4 => Some(CursorStyle::Underscore),
            5 | 6 => Some(CursorStyle::Bar),
            7 => Some(CursorStyle::Outline),
            _ => None,
        }
    }
}

/// Everything a renderer needs to draw the cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorDesc {
    pub col: usize,
    pub row: usize,
    pub style: CursorStyle,
    /// Resolved `0xRRGGBB`.
    pub color: u32,
    pub visible: bool,
}

/// A snapshot of the visible grid, handed to the renderer. Never shares
/// storage with the ring.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub cells: Vec<Cell>,
    pub cols: usize,
    pub rows: usize,
    pub cursor: CursorDesc,
    /// Resolved default background, `0xRRGGBB`.
    pub default_bg: u32,
    /// Resolved default foreground, `0xRRGGBB`.
    pub default_fg: u32,
    pub time_ms: u64,
}

impl Frame {
    /// Grow the backing storage to hold at least `cols x rows` cells.
    /// Shrinking keeps the allocation.
    pub(crate) fn ensure_capacity(&mut self, cols: usize, rows: usize) {
        let need = cols * rows;
        if self.cells.len() < need {
            self.cells.resize(need, Cell::default());
        }
    }

    /// Cell at visible coordinates. Valid after a snapshot has been taken.
    pub fn cell(&self, col: usize, row: usize) -> &Cell {
        &self.cells[row * self.cols + col]
    }
}
