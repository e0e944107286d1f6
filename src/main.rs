//! vtcore headless launcher.
//!
//! Runs a shell (or an arbitrary command) under the emulator core with
//! no window system attached: bytes are pulled from the PTY and fed to
//! the grid until the child exits, then the final screen is printed to
//! stdout. This is the smoke-test surface for the core; a graphical
//! launcher would drive the same `Terminal` API from its event loop and
//! hand frames to a real renderer instead.
//!
//! The theme file is a small TOML document with hex color strings:
//!
//! ```toml
//! bg = "#1b1c1e"
//! fg = "#a5a8a6"
//! base16 = ["#34373c", "#b25449", "..."]
//! ```
//!
//! Color-string parsing happens here in the launcher; the core only
//! consumes resolved numeric colors.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;

use vtcore::cells::Frame;
use vtcore::config::{TermConfig, Theme};
use vtcore::logging;
use vtcore::terminal::{Renderer, Terminal};

/// Headless VT terminal core runner.
#[derive(Parser, Debug)]
#[command(name = "vtcore", version, about = "Run a command under the vtcore terminal emulator")]
struct Args {
    /// Shell or command to execute (defaults to $SHELL, then /bin/sh)
    #[arg(short = 'S', long = "shell")]
    shell: Option<String>,

    /// Screen columns
    #[arg(short = 'c', long = "cols", default_value_t = 80,
          value_parser = clap::value_parser!(u32).range(1..=1024))]
    cols: u32,

    /// Screen rows
    #[arg(short = 'r', long = "rows", default_value_t = 24,
          value_parser = clap::value_parser!(u32).range(1..=2048))]
    rows: u32,

    /// Scrollback lines (rounded up to a power of two)
    #[arg(short = 'l', long = "histlines", default_value_t = 1024,
          value_parser = clap::value_parser!(u32).range(256..=32768))]
    histlines: u32,

    /// Border padding in pixels
    #[arg(short = 'b', long = "border", default_value_t = 0,
          value_parser = clap::value_parser!(u32).range(0..=16383))]
    border: u32,

    /// TOML theme file with hex colors
    #[arg(long = "theme")]
    theme: Option<PathBuf>,

    /// Arguments passed to the command
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version requests are clean exits; anything else
            // is an invalid invocation and exits 1.
            let is_usage_error = err.use_stderr();
            let _ = err.print();
            std::process::exit(if is_usage_error { 1 } else { 0 });
        }
    };

    let _log_guard = logging::init();

    let theme = match &args.theme {
        Some(path) => load_theme(path)?,
        None => Theme::default(),
    };

    let config = TermConfig {
        cols: args.cols as usize,
        rows: args.rows as usize,
        histlines: args.histlines as usize,
        border: args.border as u16,
        theme,
        ..TermConfig::default()
    };

    let mut term = Terminal::create(config)?;
    let arg_refs: Vec<&str> = args.args.iter().map(String::as_str).collect();
    term.exec(args.shell.as_deref(), &arg_refs)?;

    // Single-threaded pull loop: each pull blocks in one PTY read and
    // dispatches everything it got. Zero means the child exited.
    loop {
        match term.pull() {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => return Err(err).context("terminal I/O loop failed"),
        }
    }

    term.draw(&mut StdoutScreen);
    Ok(())
}

/// Renderer that prints the frame as plain text, one line per row.
struct StdoutScreen;

impl Renderer for StdoutScreen {
    fn draw(&mut self, frame: &Frame) {
        for row in 0..frame.rows {
            let line: String = (0..frame.cols)
                .map(|col| {
                    let cell = frame.cell(col, row);
                    char::from_u32(cell.ucs4).filter(|c| *c != '\0').unwrap_or(' ')
                })
                .collect();
            println!("{}", line.trim_end());
        }
    }
}

/// Launcher-side theme file: hex color strings, all fields optional.
#[derive(Debug, Deserialize)]
struct ThemeFile {
    bg: Option<String>,
    fg: Option<String>,
    #[serde(default)]
    base16: Vec<String>,
}

fn load_theme(path: &PathBuf) -> Result<Theme> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read theme file {}", path.display()))?;
    let file: ThemeFile =
        toml::from_str(&text).with_context(|| format!("bad theme file {}", path.display()))?;

    let mut theme = Theme::default();
    if let Some(bg) = &file.bg {
        theme.bg = parse_hex_color(bg)?;
    }
    if let Some(fg) = &file.fg {
        theme.fg = parse_hex_color(fg)?;
    }
    if file.base16.len() > 16 {
        bail!("theme base16 has {} entries, expected at most 16", file.base16.len());
    }
    for (i, spec) in file.base16.iter().enumerate() {
        theme.base16[i] = parse_hex_color(spec)?;
    }
    Ok(theme)
}

/// Parse `#RRGGBB` (or `RRGGBB`) into a packed RGB value.
fn parse_hex_color(spec: &str) -> Result<u32> {
    let digits = spec.strip_prefix('#').unwrap_or(spec);
    if digits.len() != 6 {
        bail!("bad color {spec:?}: expected #RRGGBB");
    }
    u32::from_str_radix(digits, 16).with_context(|| format!("bad color {spec:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#1b1c1e").unwrap(), 0x1b1c1e);
        assert_eq!(parse_hex_color("ffffff").unwrap(), 0xffffff);
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn theme_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme.toml");
        std::fs::write(&path, "bg = \"#101010\"\nbase16 = [\"#000000\", \"#ff0000\"]\n").unwrap();

        let theme = load_theme(&path).unwrap();
        assert_eq!(theme.bg, 0x101010);
        assert_eq!(theme.base16[1], 0xff0000);
        // Untouched entries keep their defaults.
        assert_eq!(theme.base16[7], Theme::default().base16[7]);
    }
}
