//! The 258-entry color table: 16 ANSI colors, the 6x6x6 cube, the
//! 24-step grayscale ramp, and the two default slots. Fully resolved at
//! construction; lookups never fail.

use crate::cells::Color;
use crate::config::Theme;

/// Palette index of the default background slot.
pub const BACKGROUND: usize = 256;
/// Palette index of the default foreground slot.
pub const FOREGROUND: usize = 257;

/// Resolved color table. Entries are `0xRRGGBB`.
#[derive(Debug, Clone)]
pub struct Palette {
    base256: [u32; 256],
    bg: u32,
    fg: u32,
}

impl Palette {
    /// Build the table from a theme. The theme supplies the 16 base
    /// colors and the two defaults; the cube and grayscale ramp are
    /// generated by the standard VT formulas.
    pub fn new(theme: &Theme) -> Self {
        let mut base256 = [0u32; 256];

        base256[..16].copy_from_slice(&theme.base16);

        // 6x6x6 color cube (16..=231): component k maps to 0 or 40k + 55.
        for i in 16..232 {
            let n = i - 16;
            let ramp = |v: u32| if v == 0 { 0 } else { 40 * v + 55 };
            let r = ramp((n / 36) % 6);
            let g = ramp((n / 6) % 6);
            let b = ramp(n % 6);
            base256[i as usize] = (r << 16) | (g << 8) | b;
        }

        // Grayscale, darkest to lightest (232..=255).
        for i in 232..256 {
            let k = (i - 232) * 10 + 8;
            base256[i as usize] = (k << 16) | (k << 8) | k;
        }

        Palette {
            base256,
            bg: theme.bg & 0xff_ffff,
            fg: theme.fg & 0xff_ffff,
        }
    }

    pub fn default_bg(&self) -> u32 {
        self.bg
    }

    pub fn default_fg(&self) -> u32 {
        self.fg
    }

    /// Entry at one of the 258 slots.
    pub fn entry(&self, index: usize) -> u32 {
        match index {
            BACKGROUND => self.bg,
            FOREGROUND => self.fg,
            n => self.base256[n & 0xff],
        }
    }

    /// Resolve a tagged color for a background slot.
    pub fn resolve_bg(&self, color: Color) -> u32 {
        match color {
            Color::Default => self.bg,
            Color::Indexed(i) => self.base256[i as usize],
            Color::Rgb(rgb) => rgb & 0xff_ffff,
        }
    }

    /// Resolve a tagged color for a foreground slot.
    pub fn resolve_fg(&self, color: Color) -> u32 {
        match color {
            Color::Default => self.fg,
            Color::Indexed(i) => self.base256[i as usize],
            Color::Rgb(rgb) => rgb & 0xff_ffff,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::new(&Theme::default())
    }
}
