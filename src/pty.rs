//! PTY lifecycle: open a pseudoterminal pair, run the shell on the slave
//! side, and hand the master side out as plain byte streams.
//!
//! Built on `portable-pty`, which performs the `openpty`/`fork`/`setsid`/
//! `TIOCSCTTY` dance and the `TIOCSWINSZ` ioctl internally. The child's
//! login environment (`SHELL`, `USER`, `LOGNAME`, `HOME`) is propagated
//! from the parent environment; the shell falls back from the explicit
//! argument to `$SHELL` to `/bin/sh`.
//!
//! Reaping: the spawned child handle travels with the streams, and the
//! owner `wait()`s it once a read reports end-of-file. No process-global
//! signal handler is installed.

use std::io::{Read, Write};
use std::os::fd::RawFd;

use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use thiserror::Error;
use tracing::info;

/// Fatal PTY failures. Everything here invalidates the terminal session.
#[derive(Debug, Error)]
pub enum PtyError {
    #[error("failed to open pty pair: {0}")]
    Open(#[source] anyhow::Error),
    #[error("failed to spawn {shell}: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to clone pty streams: {0}")]
    Streams(#[source] anyhow::Error),
}

/// Winsize propagation, abstracted over backends so a terminal can also
/// sit on a serial console or a test harness.
pub trait ResizePty: Send {
    fn resize(&self, cols: u16, rows: u16, pixel_width: u16, pixel_height: u16);
}

/// No-op handle for backends with no notion of window size.
pub struct NullResize;

impl ResizePty for NullResize {
    fn resize(&self, _cols: u16, _rows: u16, _pixel_width: u16, _pixel_height: u16) {}
}

/// Adapter over the local PTY master.
struct LocalResize(Box<dyn MasterPty + Send>);

impl ResizePty for LocalResize {
    fn resize(&self, cols: u16, rows: u16, pixel_width: u16, pixel_height: u16) {
        let _ = self.0.resize(PtySize { rows, cols, pixel_width, pixel_height });
    }
}

/// Everything a spawned PTY session hands back to its owner.
pub struct PtyHandles {
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
    pub resizer: Box<dyn ResizePty>,
    pub child: Box<dyn Child + Send + Sync>,
    /// Master fd for readiness polling by the host, when the backend
    /// exposes one.
    pub raw_fd: Option<RawFd>,
}

/// Resolve the shell to execute: explicit argument, then `$SHELL`, then
/// `/bin/sh`.
pub fn resolve_shell(shell: Option<&str>) -> String {
    if let Some(shell) = shell {
        if !shell.is_empty() {
            return shell.to_string();
        }
    }
    match std::env::var("SHELL") {
        Ok(shell) if !shell.is_empty() => shell,
        _ => "/bin/sh".to_string(),
    }
}

/// Open a PTY pair sized `cols x rows` (cell size `colpx x rowpx`
/// pixels) and spawn `shell` with `args` on the slave side.
pub fn spawn(
    shell: Option<&str>,
    args: &[&str],
    cols: u16,
    rows: u16,
    colpx: u16,
    rowpx: u16,
) -> Result<PtyHandles, PtyError> {
    let shell = resolve_shell(shell);

    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            rows,
            cols,
            pixel_width: cols * colpx,
            pixel_height: rows * rowpx,
        })
        .map_err(PtyError::Open)?;

    let mut cmd = CommandBuilder::new(&shell);
    for arg in args {
        cmd.arg(arg);
    }
    cmd.env("SHELL", &shell);
    cmd.env("TERM", "xterm-256color");
    for var in ["USER", "LOGNAME", "HOME"] {
        if let Ok(value) = std::env::var(var) {
            cmd.env(var, value);
        }
    }

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|source| PtyError::Spawn { shell: shell.clone(), source })?;

    let reader = pair.master.try_clone_reader().map_err(PtyError::Streams)?;
    let writer = pair.master.take_writer().map_err(PtyError::Streams)?;

    let raw_fd = pair.master.as_raw_fd();

    info!(shell = %shell, pid = ?child.process_id(), "spawned child shell");

    Ok(PtyHandles {
        reader,
        writer,
        resizer: Box::new(LocalResize(pair.master)),
        child,
        raw_fd,
    })
}
