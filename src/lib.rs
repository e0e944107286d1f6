//! vtcore: a VT-style terminal emulator core.
//!
//! Consumes the byte stream of a pseudoterminal and maintains an
//! addressable grid of styled character cells that a renderer and a
//! window system can project to pixels. The crate covers the escape
//! parser, the scrollback ring, the executor, the keyboard-to-byte
//! encoder, and the PTY lifecycle; font rasterization, GPU compositing,
//! and display-server plumbing stay on the host side behind the
//! `Renderer`/`Host`/`Clock` traits.
//!
//! Architecture (data flows):
//!
//! ```text
//! [backend: local PTY / any byte stream]
//!       │ read
//!       ▼
//! Terminal::pull() ──► Parser (FSM table) ──► opcodes ──► executor
//!                                                            │
//!                                                            ▼
//!                                               Ring (screen + scrollback)
//!                                                            │
//! Terminal::draw() ◄── Frame snapshot ◄──────────────────────┘
//!
//! host key event ──► keyboard::encode ──► Terminal::push() ──► backend
//! ```
//!
//! The host owns the event loop: it polls the fd returned by
//! [`Terminal::exec`] and calls [`Terminal::pull`] when it is readable.
//! The core itself creates no threads and performs no asynchronous work.

pub mod cells;
pub mod config;
pub mod fsm;
pub mod keyboard;
pub mod logging;
pub mod opcodes;
pub mod palette;
pub mod parser;
pub mod pty;
pub mod ring;
pub mod terminal;

pub use cells::{Attrs, Cell, CellKind, Color, CursorDesc, CursorStyle, Frame, RowFlags};
pub use config::{TermConfig, Theme};
pub use keyboard::{Key, KeyboardModes, Mods};
pub use palette::Palette;
pub use pty::{NullResize, PtyError, ResizePty};
pub use ring::Ring;
pub use terminal::{Clock, Host, NullHost, Props, Renderer, TermError, Terminal};
