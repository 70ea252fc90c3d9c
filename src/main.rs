// SPDX-License-Identifier: MIT
//
// n-view — a terminal text viewer.
//
// This is the main binary that wires together the two crates:
//
//   n-term      → raw mode, window size, key decoding, batched output
//   n-view-core → line store, cursor, viewport, renderer, session loop
//
// Each keypress flows through:
//
//   stdin → read_key → Viewer::process_key → cursor move
//   scroll → render_frame → OutputBuffer → one write() → terminal
//
// Usage: `n-view [FILE]`. Ctrl-Q quits. With no file, an empty screen with
// a welcome banner is shown.
//
// Logging is off unless RUST_LOG is set; it goes to stderr, so redirect it
// (`RUST_LOG=debug n-view notes.txt 2>trace.log`) to keep it off the screen.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use n_term::input::Stdin;
use n_term::output::Stdout;
use n_term::terminal::RawMode;
use n_view_core::options::Options;
use n_view_core::session::{self, Viewer};
use tracing::{debug, error};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    init_tracing();

    let path = file_arg(env::args_os());

    if let Err(e) = run(path.as_deref()) {
        error!("{e}");
        eprintln!("n-view: {e}");
        process::exit(1);
    }
}

/// Install the stderr subscriber. Silent unless `RUST_LOG` asks otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_ansi(false))
        .try_init();
}

/// The optional file to view: the first argument after the program name.
fn file_arg(args: impl IntoIterator<Item = OsString>) -> Option<PathBuf> {
    args.into_iter().nth(1).map(PathBuf::from)
}

/// Enter raw mode, run a session, and put the terminal back.
///
/// The raw-mode guard is dropped (restoring the terminal) before this
/// returns, on success and on every error path, so the caller can print
/// to a cooked terminal.
fn run(path: Option<&Path>) -> n_view_core::Result<()> {
    let raw = RawMode::enable()?;
    let mut input = Stdin;
    let mut output = Stdout;

    let result = Viewer::start(path, &mut input, &mut output, Options::default())
        .and_then(|mut viewer| viewer.run(&mut input, &mut output));

    if result.is_err() {
        let _ = session::reset_screen(&mut output);
    }

    let restored = raw.disable();
    debug!(ok = result.is_ok(), "terminal restored");
    result?;
    restored?;
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
