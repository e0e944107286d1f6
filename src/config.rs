//! Construction parameters for a terminal instance.
//!
//! The core consumes a fully-resolved `TermConfig`; whatever produced it
//! (CLI flags, a theme file, a windowing shell) has already turned user
//! input into numbers. In particular `Theme` colors are numeric
//! `0xRRGGBB` values: color-string parsing belongs to the launcher.

/// Default columns-per-tabstop stride.
pub const DEFAULT_TABCOLS: usize = 8;

/// Default scrollback allotment, rounded up to a power of two at
/// construction.
pub const DEFAULT_HISTLINES: usize = 1024;

/// Resolved color scheme: the two default slots plus the 16 base ANSI
/// entries the palette is seeded with.
#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: u32,
    pub fg: u32,
    pub base16: [u32; 16],
}

impl Default for Theme {
    fn default() -> Self {
        // Stock VT table; the defaults alias entries 0 and 7.
        let base16 = [
            0x000000, 0x800000, 0x008000, 0x808000, 0x000080, 0x800080, 0x008080, 0xc0c0c0,
            0x808080, 0xff0000, 0x00ff00, 0xffff00, 0x0000ff, 0xff00ff, 0x00ffff, 0xffffff,
        ];
        Theme {
            bg: base16[0],
            fg: base16[7],
            base16,
        }
    }
}

/// Everything `Terminal::create` needs.
#[derive(Debug, Clone)]
pub struct TermConfig {
    pub cols: usize,
    pub rows: usize,
    /// Scrollback rows; rounded up to a power of two (and to at least
    /// `rows`) at construction.
    pub histlines: usize,
    /// Columns per tabstop.
    pub tabcols: usize,
    /// Nominal cell size in pixels `(width, height)`, used for the
    /// pixel-to-grid conversion in `resize` and for TIOCSWINSZ.
    pub cell_size: (u16, u16),
    /// Border padding in pixels, subtracted from each window edge before
    /// the grid conversion.
    pub border: u16,
    pub theme: Theme,
}

impl Default for TermConfig {
    fn default() -> Self {
        TermConfig {
            cols: 80,
            rows: 24,
            histlines: DEFAULT_HISTLINES,
            tabcols: DEFAULT_TABCOLS,
            cell_size: (8, 16),
            border: 0,
            theme: Theme::default(),
        }
    }
}

/// Round up to the next power of two, saturating at the type's largest
/// power of two.
pub(crate) fn round_pow2(n: usize) -> usize {
    n.checked_next_power_of_two().unwrap_or(1 << (usize::BITS - 1))
}
