//! Opt-in file logging for the launcher binary.
//!
//! Set `VTCORE_LOG` to enable it. The bare opt-in values (`1`, `true`,
//! `on`) record at `info`; anything else is taken as a `tracing` filter
//! directive, e.g.:
//!
//! ```sh
//! VTCORE_LOG=vtcore::parser=trace vtcore
//! ```
//!
//! Events are appended to `~/vtcore.log` through a non-blocking writer,
//! and panics are recorded there before the previous panic hook runs.
//! Without the variable nothing is installed. Only the binary calls
//! this; the library never touches the global subscriber, so embedding
//! hosts keep control of their own logging.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the file subscriber if `VTCORE_LOG` is set. The returned
/// guard flushes the writer on drop; keep it alive in `main()`.
pub fn init() -> Option<WorkerGuard> {
    let spec = std::env::var("VTCORE_LOG").ok().filter(|s| !s.is_empty())?;

    let path = log_path();
    let file = match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(err) => {
            // A broken log destination must not take the terminal down.
            eprintln!("vtcore: cannot open {}: {err}", path.display());
            return None;
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives_for(&spec)))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    // Panics reach the log before whatever hook was already in place.
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(target: "vtcore::panic", "{info}");
        previous(info);
    }));

    tracing::info!(file = %path.display(), filter = %spec, "logging enabled");
    Some(guard)
}

/// Map the environment value to filter directives: bare opt-in values
/// select `info`, anything else passes through verbatim.
fn directives_for(spec: &str) -> &str {
    match spec {
        "1" | "true" | "on" => "info",
        directives => directives,
    }
}

fn log_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join("vtcore.log")
}
