//! Terminal façade: the one object the host talks to.
//!
//! Owns the primary/alternate screen rings, the escape parser, the
//! active pen and cursor, keyboard modes, tabstops, the frame scratch
//! buffer, and the byte backend (a local PTY from `exec()`, or any
//! reader/writer pair from `attach_streams()`).
//!
//! Data flows:
//!
//! ```text
//! pull():  backend read ──► Parser ──► opcode ──► executor methods ──► Ring
//! draw():  Ring snapshot ──► Frame ──► Renderer::draw()
//! push_input(): key event ──► keyboard::encode ──► backend write
//! ```
//!
//! The executor is implemented as a method set on the façade rather than
//! a separate object: DSR replies and OSC property reports need the
//! backend writer and the host hooks, both of which live here.
//!
//! Single-threaded by design: `pull` performs one blocking read and the
//! host gates it on fd readiness; `resize` must be called between pulls.

use std::io::{Read, Write};
use std::os::fd::RawFd;
use std::time::Instant;

use bitflags::bitflags;
use portable_pty::Child;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::cells::{Attrs, Cell, CellKind, Color, CursorDesc, CursorStyle, Frame, RowFlags};
use crate::config::{TermConfig, round_pow2};
use crate::keyboard::{self, INPUT_MAX, Key, KeyboardModes, Mods};
use crate::opcodes::Opcode;
use crate::palette::Palette;
use crate::parser::{MAX_PARAMS, Parser};
use crate::pty::{self, PtyError, ResizePty};
use crate::ring::Ring;

/// PTY read chunk size.
pub const READ_MAX: usize = 4096;

/// `errno` for a master-side read after the child released the slave.
const EIO: i32 = 5;

bitflags! {
    /// Which window properties an OSC report targets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Props: u8 {
        const ICON  = 1 << 0;
        const TITLE = 1 << 1;
        const XPROP = 1 << 2;
    }
}

/// Host-side property sink for OSC 0/1/2/3.
pub trait Host {
    fn set_properties(&mut self, _props: Props, _payload: &[u8]) {}
}

/// Default sink: drop everything.
pub struct NullHost;

impl Host for NullHost {}

/// Frame consumer.
pub trait Renderer {
    fn draw(&mut self, frame: &Frame);
}

/// Timestamp source for frames.
pub trait Clock {
    fn millis(&self) -> u64;
}

/// Milliseconds since terminal creation.
pub struct SystemClock(Instant);

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock(Instant::now())
    }
}

impl Clock for SystemClock {
    fn millis(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}

/// Fatal terminal errors. Parser- and executor-level problems never
/// surface here; they are logged and dropped.
#[derive(Debug, Error)]
pub enum TermError {
    #[error(transparent)]
    Pty(#[from] PtyError),
    #[error("terminal I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("no byte backend attached")]
    NotAttached,
    #[error("invalid terminal dimensions {cols}x{rows}")]
    InvalidDimensions { cols: usize, rows: usize },
}

/// What DECSC stashes, per screen. The pen is deliberately not part of
/// the save.
#[derive(Debug, Clone, Copy, Default)]
struct SavedCursor {
    col: usize,
    row: usize,
    style: CursorStyle,
    visible: bool,
}

pub struct Terminal {
    palette: Palette,
    rings: [Ring; 2],
    /// Alternate screen selector; indexes `rings` and `saved_cursor`.
    alt: bool,

    parser: Parser,

    /// Cell template applied to subsequent writes.
    pen: Cell,

    // Cursor.
    x: usize,
    y: usize,
    wrap_pending: bool,
    hide_cursor: bool,
    cursor_style: CursorStyle,
    saved_cursor: [SavedCursor; 2],

    kbd: KeyboardModes,

    tabstops: Vec<bool>,
    tabcols: usize,

    cols: usize,
    rows: usize,
    colpx: u16,
    rowpx: u16,
    border: u16,

    frame: Frame,

    // Byte backend.
    reader: Option<Box<dyn Read + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    resizer: Option<Box<dyn ResizePty>>,
    child: Option<Box<dyn Child + Send + Sync>>,
    raw_fd: Option<RawFd>,
    exited: bool,

    host: Box<dyn Host>,
    clock: Box<dyn Clock>,
}

impl Terminal {
    /// Build a terminal with no backend attached yet. `histlines` is
    /// rounded up to a power of two no smaller than `rows`.
    pub fn create(config: TermConfig) -> Result<Terminal, TermError> {
        if config.cols == 0 || config.rows == 0 {
            return Err(TermError::InvalidDimensions { cols: config.cols, rows: config.rows });
        }

        let cols = config.cols;
        let rows = config.rows;
        let histlines = round_pow2(config.histlines.max(rows).max(1));
        let tabcols =
            if config.tabcols == 0 { crate::config::DEFAULT_TABCOLS } else { config.tabcols };

        let palette = Palette::new(&config.theme);

        let pen = Cell {
            ucs4: b' ' as u32,
            width: 1,
            bg: Color::Default,
            fg: Color::Default,
            attrs: Attrs::empty(),
            kind: CellKind::Normal,
        };

        let mut frame = Frame::default();
        frame.ensure_capacity(cols, rows);

        Ok(Terminal {
            palette,
            rings: [Ring::new(histlines, cols, rows), Ring::new(rows, cols, rows)],
            alt: false,
            parser: Parser::new(),
            pen,
            x: 0,
            y: 0,
            wrap_pending: false,
            hide_cursor: false,
            cursor_style: CursorStyle::Default,
            saved_cursor: [SavedCursor::default(); 2],
            kbd: KeyboardModes::default(),
            tabstops: build_tabstops(cols, tabcols),
            tabcols,
            cols,
            rows,
            colpx: config.cell_size.0.max(1),
            rowpx: config.cell_size.1.max(1),
            border: config.border,
            frame,
            reader: None,
            writer: None,
            resizer: None,
            child: None,
            raw_fd: None,
            exited: false,
            host: Box::new(NullHost),
            clock: Box::new(SystemClock::default()),
        })
    }

    /// Replace the OSC property sink.
    pub fn set_host(&mut self, host: Box<dyn Host>) {
        self.host = host;
    }

    /// Replace the frame timestamp source.
    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    /// Spawn a shell under a fresh PTY and wire it up as the backend.
    /// Returns the master fd for readiness polling where available.
    pub fn exec(&mut self, shell: Option<&str>, args: &[&str]) -> Result<Option<RawFd>, TermError> {
        if self.child.is_some() {
            return Ok(self.raw_fd);
        }

        let handles = pty::spawn(
            shell,
            args,
            self.cols as u16,
            self.rows as u16,
            self.colpx,
            self.rowpx,
        )?;

        self.reader = Some(handles.reader);
        self.writer = Some(handles.writer);
        self.resizer = Some(handles.resizer);
        self.child = Some(handles.child);
        self.exited = false;
        self.raw_fd = handles.raw_fd;
        Ok(self.raw_fd)
    }

    /// Wire an arbitrary byte-stream backend (serial console, test
    /// harness) instead of a local PTY.
    pub fn attach_streams(
        &mut self,
        reader: Box<dyn Read + Send>,
        writer: Box<dyn Write + Send>,
        resizer: Box<dyn ResizePty>,
    ) {
        self.reader = Some(reader);
        self.writer = Some(writer);
        self.resizer = Some(resizer);
        self.exited = false;
    }

    /// One blocking read from the backend, parsed and dispatched.
    /// Returns the number of bytes read; 0 means the child exited.
    pub fn pull(&mut self) -> Result<usize, TermError> {
        if self.exited {
            return Ok(0);
        }
        let reader = self.reader.as_mut().ok_or(TermError::NotAttached)?;

        let mut buf = [0u8; READ_MAX];
        match reader.read(&mut buf) {
            Ok(0) => {
                self.child_exited();
                Ok(0)
            }
            Ok(n) => {
                self.consume(&buf[..n]);
                Ok(n)
            }
            Err(err) if err.raw_os_error() == Some(EIO) => {
                // Linux reports EIO instead of EOF once the slave side
                // is gone; same exit signal.
                self.child_exited();
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn child_exited(&mut self) {
        self.exited = true;
        self.reader = None;
        self.writer = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
        debug!("child exited, terminal loop done");
    }

    /// Write raw bytes to the backend (keyboard input, DSR replies).
    /// Blocks until the backend has accepted the whole buffer.
    pub fn push(&mut self, bytes: &[u8]) -> Result<usize, TermError> {
        let writer = self.writer.as_mut().ok_or(TermError::NotAttached)?;
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(bytes.len())
    }

    /// Encode a key event and send it. Any non-empty emission snaps the
    /// viewport back to the live screen. Returns the bytes sent.
    pub fn push_input(&mut self, key: Key, mods: Mods, text: &[u8]) -> usize {
        let mut buf = [0u8; INPUT_MAX];
        let n = keyboard::encode(key, mods, text, self.kbd, &mut buf);
        if n == 0 {
            return 0;
        }
        match self.push(&buf[..n]) {
            Ok(sent) => {
                self.reset_scroll();
                sent
            }
            Err(err) => {
                debug!(%err, "dropping key input");
                0
            }
        }
    }

    /// Feed bytes straight into the parser/executor. Public so hosts
    /// with their own transport (and tests) can drive the screen.
    pub fn consume(&mut self, bytes: &[u8]) -> usize {
        let mut offset = 0;
        while offset < bytes.len() {
            let (opcode, adv) = self.parser.emit(&bytes[offset..]);
            offset += adv;
            if let Some(op) = opcode {
                self.dispatch(op);
            }
        }
        offset
    }

    /// Shift the viewport; negative delta scrolls back into history.
    pub fn scroll(&mut self, delta: isize) {
        self.ring_mut().adjust_scroll(-delta);
    }

    pub fn reset_scroll(&mut self) {
        self.ring_mut().reset_scroll();
    }

    /// Recompute the grid from pixel dimensions, reshape both screens,
    /// and propagate the new size to the backend. Must not be called
    /// concurrently with `pull`.
    pub fn resize(&mut self, width_px: u32, height_px: u32) {
        let pad = 2 * self.border as u32;
        let usable_w = width_px.saturating_sub(pad).max(self.colpx as u32);
        let usable_h = height_px.saturating_sub(pad).max(self.rowpx as u32);
        let cols = (usable_w / self.colpx as u32).max(1) as usize;
        let rows = (usable_h / self.rowpx as u32).max(1) as usize;
        self.resize_grid(cols, rows);
    }

    fn resize_grid(&mut self, cols: usize, rows: usize) {
        if cols == self.cols && rows == self.rows {
            return;
        }

        // Compress the screen vertically: the rows above the cursor
        // move into history.
        if rows <= self.y {
            let delta = self.rows - rows;
            self.rings[0].adjust_head(delta as isize);
            self.y = self.y.saturating_sub(delta);
        }

        // Expand vertically while history lines exist.
        if rows > self.rows {
            let delta = (rows - self.rows).min(self.rings[0].histlines());
            self.rings[0].adjust_head(-(delta as isize));
            self.y += delta;
        }

        self.rings[0].set_dimensions(cols, rows);
        self.rings[1].set_dimensions(cols, rows);

        // Initialize tabstops for any new columns, preserving the
        // existing ones (HTS may have customized them).
        if cols > self.tabstops.len() {
            let old = self.tabstops.len();
            self.tabstops.extend((old..cols).map(|i| i != 0 && i % self.tabcols == 0));
        }

        self.frame.ensure_capacity(cols, rows);

        self.cols = cols;
        self.rows = rows;
        self.x = self.x.min(cols - 1);
        self.y = self.y.min(rows - 1);
        self.wrap_pending = false;

        if let Some(resizer) = &self.resizer {
            resizer.resize(
                cols as u16,
                rows as u16,
                cols as u16 * self.colpx,
                rows as u16 * self.rowpx,
            );
        }
    }

    /// Snapshot the visible grid and hand it to the renderer.
    pub fn draw(&mut self, renderer: &mut dyn Renderer) {
        self.generate_frame();
        renderer.draw(&self.frame);
    }

    /// Snapshot the visible grid; for hosts that render by hand and for
    /// tests.
    pub fn frame(&mut self) -> &Frame {
        self.generate_frame();
        &self.frame
    }

    fn generate_frame(&mut self) {
        let (cols, rows) = (self.cols, self.rows);
        self.frame.ensure_capacity(cols, rows);
        self.frame.cols = cols;
        self.frame.rows = rows;

        let ring = &self.rings[self.alt as usize];
        ring.copy_framebuffer(&mut self.frame.cells[..cols * rows]);

        let mut cursor = CursorDesc {
            col: self.x,
            row: self.y,
            style: self.cursor_style,
            color: self.palette.default_fg(),
            visible: false,
        };
        // Hidden when manually turned off, or when the cursor's logical
        // row has been scrolled out of the viewport.
        if !self.hide_cursor && ring.is_visible(self.x, self.y) {
            cursor.visible = true;
            cursor.row += ring.scroll();
        }
        self.frame.cursor = cursor;

        self.frame.default_bg = self.palette.default_bg();
        self.frame.default_fg = self.palette.default_fg();
        self.frame.time_ms = self.clock.millis();
    }

    /// Tear down the child session.
    pub fn hangup(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.reader = None;
        self.writer = None;
        self.exited = true;
    }

    // --- accessors --------------------------------------------------------

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cursor position `(col, row)` in screen coordinates.
    pub fn cursor(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn wrap_pending(&self) -> bool {
        self.wrap_pending
    }

    pub fn histlines(&self) -> usize {
        self.rings[self.alt as usize].histlines()
    }

    pub fn scroll_offset(&self) -> usize {
        self.rings[self.alt as usize].scroll()
    }

    pub fn is_alt_screen(&self) -> bool {
        self.alt
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Cell at screen coordinates on the active screen.
    pub fn cell(&self, col: usize, row: usize) -> &Cell {
        self.rings[self.alt as usize].cell(col, row)
    }

    fn ring_mut(&mut self) -> &mut Ring {
        &mut self.rings[self.alt as usize]
    }

    // --- executor: dispatch ----------------------------------------------

    fn dispatch(&mut self, op: Opcode) {
        match op {
            Opcode::Write(c) => self.op_write(c),
            Opcode::Esc { inter, finalb } => self.esc_dispatch(inter, finalb),
            Opcode::Csi { private, inter, finalb } => {
                // Detach the parameters from the parser so the handlers
                // can borrow the rest of the terminal freely.
                let mut args = [0i32; MAX_PARAMS];
                let argc = self.parser.args().len();
                args[..argc].copy_from_slice(self.parser.args());
                self.csi_dispatch(private, inter, finalb, &args[..argc]);
            }
            Opcode::Osc => self.osc_dispatch(),
            Opcode::Dcs { private, inter, finalb } => {
                debug!(private, inter, finalb, "ignoring DCS sequence");
            }
        }
    }

    fn op_write(&mut self, c: u32) {
        match c {
            0x07 => {} // BEL
            0x08 => self.move_cursor_cols(-1),
            0x09 => self.write_tab(),
            0x0a | 0x0b | 0x0c => {
                // Line feed implies carriage return in this core.
                self.write_newline();
                self.set_cursor_col(0);
            }
            0x0d => self.set_cursor_col(0),
            c if c < 0x20 => {
                debug!(byte = c, "unhandled control character");
            }
            _ => self.write_codepoint(c, CellKind::Normal),
        }
    }

    fn esc_dispatch(&mut self, inter: u8, finalb: u8) {
        trace!(inter, finalb = ?(finalb as char), "esc dispatch");
        match (inter, finalb) {
            // IND
            (0, b'D') => self.write_newline(),
            // NEL
            (0, b'E') => {
                self.write_newline();
                self.set_cursor_col(0);
            }
            // HTS
            (0, b'H') => {
                let x = self.x;
                if x < self.tabstops.len() {
                    self.tabstops[x] = true;
                }
            }
            // RI
            (0, b'M') => self.reverse_index(),
            // DECSC / DECRC
            (0, b'7') => self.cursor_save(),
            (0, b'8') => self.cursor_restore(),
            // DECKPAM / DECKPNM
            (0, b'=') => self.kbd.app_keypad = true,
            (0, b'>') => self.kbd.app_keypad = false,
            _ => {
                debug!(inter, finalb = ?(finalb as char), "unhandled ESC sequence");
            }
        }
    }

    fn csi_dispatch(&mut self, private: u8, inter: u8, finalb: u8, args: &[i32]) {
        trace!(private, inter, finalb = ?(finalb as char), ?args, "csi dispatch");

        let arg = |idx: usize| -> i32 { args.get(idx).copied().unwrap_or(0) };
        let arg_or = |idx: usize, def: i32| -> i32 {
            match arg(idx) {
                0 => def,
                n => n,
            }
        };

        match (private, inter, finalb) {
            // ICH
            (0, 0, b'@') => {
                let blank = self.blank_cell();
                let (x, y) = (self.x, self.y);
                let n = arg_or(0, 1) as usize;
                self.ring_mut().cells_insert(blank, x, y, n);
            }
            // CUU / CUD / CUF / CUB
            (0, 0, b'A') => self.move_cursor_rows(-(arg_or(0, 1) as isize)),
            (0, 0, b'B') => self.move_cursor_rows(arg_or(0, 1) as isize),
            (0, 0, b'C') => self.move_cursor_cols(arg_or(0, 1) as isize),
            (0, 0, b'D') => self.move_cursor_cols(-(arg_or(0, 1) as isize)),
            // CNL / CPL
            (0, 0, b'E') => {
                self.move_cursor_rows(arg_or(0, 1) as isize);
                self.set_cursor_col(0);
            }
            (0, 0, b'F') => {
                self.move_cursor_rows(-(arg_or(0, 1) as isize));
                self.set_cursor_col(0);
            }
            // CHA
            (0, 0, b'G') => self.set_cursor_col(arg_or(0, 1) as usize - 1),
            // CUP: 1-based (row;col), origin (1,1)
            (0, 0, b'H') => {
                self.set_cursor_col(arg_or(1, 1) as usize - 1);
                self.set_cursor_row(arg_or(0, 1) as usize - 1);
            }
            // CHT
            (0, 0, b'I') => {
                for _ in 0..arg_or(0, 1) {
                    self.write_tab();
                }
            }
            // ED / EL
            (0, 0, b'J') => self.csi_ed(arg(0)),
            (0, 0, b'K') => self.csi_el(arg(0)),
            // IL / DL
            (0, 0, b'L') => {
                let (y, rows) = (self.y, self.rows);
                self.ring_mut().rows_move(y, rows, arg_or(0, 1) as usize);
            }
            (0, 0, b'M') => {
                let y = self.y;
                self.ring_mut().rows_delete(y, arg_or(0, 1) as usize);
            }
            // DCH
            (0, 0, b'P') => {
                let blank = self.blank_cell();
                let (x, y) = (self.x, self.y);
                let n = arg_or(0, 1) as usize;
                self.ring_mut().cells_delete(blank, x, y, n);
            }
            // ECH
            (0, 0, b'X') => {
                let blank = self.blank_cell();
                let (x, y) = (self.x, self.y);
                let n = arg_or(0, 1) as usize;
                self.ring_mut().cells_set(blank, x, y, n);
            }
            // VPA / VPR
            (0, 0, b'd') => self.set_cursor_row(arg_or(0, 1) as usize - 1),
            (0, 0, b'e') => self.move_cursor_rows(arg_or(0, 1) as isize),
            // TBC
            (0, 0, b'g') => self.csi_tbc(arg(0)),
            // SGR
            (0, 0, b'm') => self.csi_sgr(args),
            // DSR
            (0, 0, b'n') => self.csi_dsr(arg(0)),
            // DECSCUSR
            (0, b' ', b'q') => {
                if let Some(style) = CursorStyle::from_param(arg(0)) {
                    self.cursor_style = style;
                }
            }
            // DECSET / DECRST
            (b'?', 0, b'h') => self.dec_private_mode(arg(0), true),
            (b'?', 0, b'l') => self.dec_private_mode(arg(0), false),
            _ => {
                debug!(private, inter, finalb = ?(finalb as char), "unhandled CSI sequence");
            }
        }
    }

    fn osc_dispatch(&mut self) {
        // Leading argument selects the action; the payload goes to the
        // host untouched.
        let code = self.parser.arg(0);
        let payload = self.parser.data().to_vec();

        let props = match code {
            0 => Props::ICON | Props::TITLE,
            1 => Props::ICON,
            2 => Props::TITLE,
            3 => Props::XPROP,
            4 => {
                // Palette color specification: not supported in this core.
                debug!("ignoring OSC 4 color specification");
                return;
            }
            other => {
                debug!(code = other, "unhandled OSC command");
                return;
            }
        };
        self.host.set_properties(props, &payload);
    }

    // --- executor: writes -------------------------------------------------

    /// Template for erased and inserted filler cells: a blank space
    /// carrying the active pen's colors but default attributes.
    fn blank_cell(&self) -> Cell {
        Cell {
            ucs4: b' ' as u32,
            width: 1,
            bg: self.pen.bg,
            fg: self.pen.fg,
            attrs: Attrs::empty(),
            kind: CellKind::Normal,
        }
    }

    fn write_codepoint(&mut self, ucs4: u32, kind: CellKind) {
        let width = glyph_width(ucs4);
        if width == 0 {
            // Zero-width codepoints have no cell of their own.
            return;
        }

        let cols = self.cols;
        // A wide glyph with only one column left wraps like a pending
        // write would.
        let need_wrap = self.wrap_pending || self.x + width > cols;

        if need_wrap {
            self.wrap_pending = false;
            let y = self.y;
            self.ring_mut().row_set_wrap(y, true);
            if self.y + 1 == self.rows {
                self.scroll_up_one();
            } else {
                self.y += 1;
            }
            self.x = 0;
        }

        if self.x + width < cols {
            self.wrap_pending = false;
        } else {
            // This write fills the final column; the next printable
            // must wrap before writing.
            self.wrap_pending = true;
        }

        let (x, y) = (self.x, self.y);
        *self.ring_mut().cell_mut(x, y) = Cell {
            ucs4,
            width: width as u8,
            bg: self.pen.bg,
            fg: self.pen.fg,
            attrs: self.pen.attrs,
            kind,
        };

        if width == 2 {
            *self.ring_mut().cell_mut(x + 1, y) = Cell {
                ucs4: b' ' as u32,
                width: 1,
                bg: self.pen.bg,
                fg: self.pen.fg,
                attrs: self.pen.attrs,
                kind: CellKind::DummyWide,
            };
            self.ring_mut().row_or_flags(y, RowFlags::HAS_MULTICOL);
        }
        if ucs4 > 0x7f {
            self.ring_mut().row_or_flags(y, RowFlags::HAS_COMPLEX);
        }

        if !self.wrap_pending {
            self.x += width;
        } else {
            self.x = cols - 1;
        }
    }

    fn scroll_up_one(&mut self) {
        let rows = self.rows;
        let ring = self.ring_mut();
        ring.adjust_head(1);
        ring.rows_clear(rows - 1, 1);
    }

    fn write_newline(&mut self) {
        if self.y + 1 == self.rows {
            self.scroll_up_one();
        } else {
            self.y += 1;
        }
    }

    fn write_tab(&mut self) {
        let mut kind = CellKind::TabLeader;
        let mut n = 0;
        while self.x + 1 < self.cols {
            if n > 0 && self.tabstops.get(self.x).copied().unwrap_or(false) {
                break;
            }
            self.write_codepoint(b' ' as u32, kind);
            kind = CellKind::DummyTab;
            n += 1;
        }
        if n > 0 {
            let y = self.y;
            self.ring_mut().row_or_flags(y, RowFlags::HAS_TABS);
        }
    }

    // --- executor: cursor -------------------------------------------------

    /// Horizontal cursor motion. Moving right realizes the skipped gap
    /// with pen-colored blanks; moving left leaves cells untouched.
    fn move_cursor_cols(&mut self, delta: isize) {
        let beg = self.x;
        let end = (beg as isize + delta).clamp(0, self.cols as isize - 1) as usize;

        if end > beg {
            let blank = self.blank_cell();
            let y = self.y;
            self.ring_mut().cells_fill_blanks(blank, beg, y, end - beg);
        }

        self.x = end;
        self.wrap_pending = false;
    }

    fn move_cursor_rows(&mut self, delta: isize) {
        self.y = (self.y as isize + delta).clamp(0, self.rows as isize - 1) as usize;
        self.wrap_pending = false;
    }

    fn set_cursor_col(&mut self, col: usize) {
        self.x = col.min(self.cols - 1);
        self.wrap_pending = false;
    }

    fn set_cursor_row(&mut self, row: usize) {
        self.y = row.min(self.rows - 1);
        self.wrap_pending = false;
    }

    fn cursor_save(&mut self) {
        self.saved_cursor[self.alt as usize] = SavedCursor {
            col: self.x,
            row: self.y,
            style: self.cursor_style,
            visible: !self.hide_cursor,
        };
    }

    fn cursor_restore(&mut self) {
        let saved = self.saved_cursor[self.alt as usize];
        self.x = saved.col.min(self.cols - 1);
        self.y = saved.row.min(self.rows - 1);
        self.cursor_style = saved.style;
        self.hide_cursor = !saved.visible;
        self.wrap_pending = false;
    }

    fn reverse_index(&mut self) {
        if self.y > 0 {
            self.move_cursor_rows(-1);
        } else {
            let rows = self.rows;
            self.ring_mut().rows_move(0, rows, 1);
        }
    }

    // --- executor: erase --------------------------------------------------

    /// Clear whole rows, then re-stamp them with the pen's colors when
    /// the pen differs from the defaults.
    fn erase_rows(&mut self, row: usize, count: usize) {
        self.ring_mut().rows_clear(row, count);
        if self.pen.bg != Color::Default || self.pen.fg != Color::Default {
            let blank = self.blank_cell();
            let cols = self.cols;
            let end = (row + count).min(self.rows);
            for r in row..end {
                self.ring_mut().cells_set(blank, 0, r, cols);
            }
        }
    }

    fn csi_ed(&mut self, mode: i32) {
        let (x, y) = (self.x, self.y);
        let (cols, rows) = (self.cols, self.rows);
        match mode {
            0 => {
                // Cursor to end of screen.
                self.erase_rows(y + 1, rows);
                let blank = self.blank_cell();
                self.ring_mut().cells_set(blank, x, y, cols);
            }
            1 => {
                // Start of screen through the cursor.
                self.erase_rows(0, y);
                let blank = self.blank_cell();
                self.ring_mut().cells_set(blank, 0, y, x + 1);
            }
            2 => {
                // Whole screen, cursor homes.
                self.erase_rows(0, rows);
                self.set_cursor_row(0);
                self.set_cursor_col(0);
            }
            3 => {
                // Scrollback erase: not supported in this core.
                debug!("ignoring ED 3");
            }
            _ => {}
        }
    }

    fn csi_el(&mut self, mode: i32) {
        let (x, y) = (self.x, self.y);
        let cols = self.cols;
        let blank = self.blank_cell();
        match mode {
            0 => self.ring_mut().cells_set(blank, x, y, cols),
            1 => self.ring_mut().cells_set(blank, 0, y, x + 1),
            2 => {
                self.ring_mut().cells_set(blank, 0, y, cols);
                self.set_cursor_col(0);
            }
            _ => {}
        }
    }

    fn csi_tbc(&mut self, mode: i32) {
        match mode {
            0 => {
                if self.x < self.tabstops.len() {
                    self.tabstops[self.x] = false;
                }
            }
            3 => self.tabstops.fill(false),
            _ => {}
        }
    }

    // --- executor: rendition ----------------------------------------------

    fn csi_sgr(&mut self, args: &[i32]) {
        let argc = args.len();
        let mut i = 0;

        while i < argc {
            let start = i;
            match args[i] {
                0 => {
                    self.pen.attrs = Attrs::empty();
                    self.pen.bg = Color::Default;
                    self.pen.fg = Color::Default;
                }

                1 => self.pen.attrs |= Attrs::BOLD,
                3 => self.pen.attrs |= Attrs::ITALIC,
                4 => self.pen.attrs |= Attrs::UNDERLINE,
                5 => self.pen.attrs |= Attrs::BLINK,
                7 => self.pen.attrs |= Attrs::INVERT,
                8 => self.pen.attrs |= Attrs::INVISIBLE,
                22 => self.pen.attrs -= Attrs::BOLD,
                23 => self.pen.attrs -= Attrs::ITALIC,
                24 => self.pen.attrs -= Attrs::UNDERLINE,
                25 => self.pen.attrs -= Attrs::BLINK,
                27 => self.pen.attrs -= Attrs::INVERT,
                28 => self.pen.attrs -= Attrs::INVISIBLE,

                n @ 30..=37 => self.pen.fg = Color::Indexed((n - 30) as u8),
                39 => self.pen.fg = Color::Default,
                n @ 40..=47 => self.pen.bg = Color::Indexed((n - 40) as u8),
                49 => self.pen.bg = Color::Default,

                38 | 48 => {
                    i += 1;
                    if i + 1 < argc {
                        if args[i] == 5 {
                            i += 1;
                        } else if args[i] == 2 && i + 3 < argc {
                            i += 3;
                        }
                    }
                    let color = if i - start == 2 {
                        Some(Color::Indexed((args[i] & 0xff) as u8))
                    } else if i - start == 4 {
                        let r = (args[i - 2] & 0xff) as u32;
                        let g = (args[i - 1] & 0xff) as u32;
                        let b = (args[i] & 0xff) as u32;
                        Some(Color::Rgb((r << 16) | (g << 8) | b))
                    } else {
                        None
                    };
                    match color {
                        Some(color) if args[start] == 48 => self.pen.bg = color,
                        Some(color) => self.pen.fg = color,
                        None => {
                            // A malformed sub-sequence resets the pen.
                            debug!("skipping invalid SGR sequence");
                            self.pen.attrs = Attrs::empty();
                            self.pen.bg = Color::Default;
                            self.pen.fg = Color::Default;
                            return;
                        }
                    }
                }

                n @ 90..=97 => self.pen.fg = Color::Indexed((n - 90 + 8) as u8),
                n @ 100..=107 => self.pen.bg = Color::Indexed((n - 100 + 8) as u8),

                _ => {}
            }
            i += 1;
        }
    }

    // --- executor: reports and modes --------------------------------------

    fn csi_dsr(&mut self, mode: i32) {
        let reply = match mode {
            5 => Some("\x1b[0n".to_string()),
            6 => Some(format!("\x1b[{};{}R", self.y + 1, self.x + 1)),
            _ => None,
        };
        if let Some(reply) = reply {
            if let Err(err) = self.push(reply.as_bytes()) {
                warn!(%err, "failed to send DSR reply");
            }
        }
    }

    fn dec_private_mode(&mut self, mode: i32, enable: bool) {
        match mode {
            // DECCKM
            1 => self.kbd.app_cursor = enable,
            // DECTCEM
            25 => self.hide_cursor = !enable,
            // Save cursor + alternate screen
            1049 => {
                if enable {
                    self.cursor_save();
                    self.alt = true;
                } else {
                    self.alt = false;
                    self.cursor_restore();
                }
            }
            other => {
                debug!(mode = other, enable, "unrecognized private mode");
            }
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.hangup();
    }
}

fn build_tabstops(cols: usize, tabcols: usize) -> Vec<bool> {
    (0..cols).map(|i| i != 0 && i % tabcols == 0).collect()
}

/// Column width of a codepoint: 0 for zero-width, 2 for wide glyphs.
fn glyph_width(ucs4: u32) -> usize {
    match char::from_u32(ucs4) {
        Some(ch) => unicode_width::UnicodeWidthChar::width(ch).unwrap_or(1),
        None => 1,
    }
}
