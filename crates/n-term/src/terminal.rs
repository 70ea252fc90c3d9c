// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode, window size, and RAII cleanup.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), and raw fd writes. These are
// the standard POSIX interfaces for terminal control — there is no safe
// alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// The terminal device is one shared resource per process, so the original
// attributes are captured exactly once when raw mode is enabled and handed
// back when the guard goes away. `RawMode` is that guard: it restores on
// drop, which covers normal quit, `?` error returns, and unwinding. The
// panic hook covers the one path a guard can't: a panic that aborts before
// destructors run, or one that happens while the guard is borrowed
// mid-frame. It restores from a global backup and writes straight to fd 1.

use std::io::Write;
#[cfg(unix)]
use std::io;
use std::sync::{Mutex, Once};

use tracing::{debug, warn};

use crate::ansi;
use crate::error::{Error, Result};
use crate::input::ByteSource;
use crate::output::OutputBuffer;

/// `VTIME` value while in raw mode, in tenths of a second.
///
/// A read with no input pending returns empty after this long instead of
/// blocking forever.
pub const READ_TIMEOUT_DECISECONDS: u8 = 1;

/// Longest cursor-position report we are willing to read.
const CURSOR_REPORT_MAX: usize = 32;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if stdout is not a terminal, the query fails, or the
/// terminal reports zero columns.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Determine the window size, falling back to a cursor-position query.
///
/// Some terminals (serial consoles, a few emulators) don't answer
/// `TIOCGWINSZ`. For those we park the cursor in the bottom-right corner
/// and ask where it ended up. Must be called with the terminal in raw mode
/// so the reply isn't echoed or line-buffered.
///
/// # Errors
///
/// [`Error::WindowSize`] if neither method yields a size, [`Error::Write`]
/// or [`Error::Read`] if talking to the terminal fails.
pub fn window_size(input: &mut impl ByteSource, output: &mut impl Write) -> Result<Size> {
    if let Some(size) = get_size() {
        debug!(cols = size.cols, rows = size.rows, "window size from ioctl");
        return Ok(size);
    }
    warn!("TIOCGWINSZ unavailable, falling back to cursor position report");
    query_size_by_cursor(input, output)
}

/// Measure the window by moving the cursor to the far corner and asking
/// the terminal to report its position.
///
/// # Errors
///
/// Same as [`window_size`].
pub fn query_size_by_cursor(
    input: &mut impl ByteSource,
    output: &mut impl Write,
) -> Result<Size> {
    let mut out = OutputBuffer::new();
    ansi::cursor_to_far_corner(&mut out).map_err(Error::Write)?;
    ansi::request_cursor_position(&mut out).map_err(Error::Write)?;
    out.flush_to(output).map_err(Error::Write)?;

    let mut reply = Vec::with_capacity(CURSOR_REPORT_MAX);
    while reply.len() < CURSOR_REPORT_MAX {
        match input.read_byte().map_err(Error::Read)? {
            Some(b'R') | None => break,
            Some(b) => reply.push(b),
        }
    }

    parse_cursor_report(&reply).ok_or(Error::WindowSize)
}

/// Parse a cursor position report body: `ESC [ rows ; cols` (the final `R`
/// already stripped).
#[must_use]
pub fn parse_cursor_report(reply: &[u8]) -> Option<Size> {
    let body = reply.strip_prefix(b"\x1b[")?;
    let text = std::str::from_utf8(body).ok()?;
    let (rows, cols) = text.split_once(';')?;
    let size = Size {
        rows: rows.parse().ok()?,
        cols: cols.parse().ok()?,
    };
    (size.rows > 0 && size.cols > 0).then_some(size)
}

// ─── Snapshot ───────────────────────────────────────────────────────────────

/// The terminal's attributes as they were before we touched them.
///
/// Two snapshots are equal when every mode flag, every control character
/// and both line speeds match.
#[cfg(unix)]
#[derive(Clone, Copy)]
pub struct TerminalSnapshot(libc::termios);

#[cfg(unix)]
impl TerminalSnapshot {
    /// Read the current attributes of `fd`.
    ///
    /// # Errors
    ///
    /// [`Error::GetAttr`] if `tcgetattr` fails (e.g. `fd` is not a TTY).
    pub fn capture(fd: libc::c_int) -> Result<Self> {
        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(Error::GetAttr(io::Error::last_os_error()));
            }
            Ok(Self(termios))
        }
    }

    /// Apply these attributes to `fd`, discarding pending input.
    ///
    /// # Errors
    ///
    /// [`Error::SetAttr`] if `tcsetattr` fails.
    pub fn apply(&self, fd: libc::c_int) -> Result<()> {
        unsafe {
            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const self.0) != 0 {
                return Err(Error::SetAttr(io::Error::last_os_error()));
            }
        }
        Ok(())
    }

    /// A copy of these attributes with raw mode applied.
    #[must_use]
    pub fn to_raw(&self) -> Self {
        let mut raw = self.0;
        make_raw(&mut raw);
        Self(raw)
    }
}

#[cfg(unix)]
impl std::fmt::Debug for TerminalSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSnapshot")
            .field("c_iflag", &self.0.c_iflag)
            .field("c_oflag", &self.0.c_oflag)
            .field("c_cflag", &self.0.c_cflag)
            .field("c_lflag", &self.0.c_lflag)
            .field("c_cc", &self.0.c_cc)
            .field("ispeed", &self.ispeed())
            .field("ospeed", &self.ospeed())
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
impl TerminalSnapshot {
    fn ispeed(&self) -> libc::speed_t {
        unsafe { libc::cfgetispeed(&raw const self.0) }
    }

    fn ospeed(&self) -> libc::speed_t {
        unsafe { libc::cfgetospeed(&raw const self.0) }
    }
}

#[cfg(unix)]
impl PartialEq for TerminalSnapshot {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (&self.0, &other.0);

        #[cfg(any(target_os = "linux", target_os = "android"))]
        if a.c_line != b.c_line {
            return false;
        }

        a.c_iflag == b.c_iflag
            && a.c_oflag == b.c_oflag
            && a.c_cflag == b.c_cflag
            && a.c_lflag == b.c_lflag
            && a.c_cc == b.c_cc
            && self.ispeed() == other.ispeed()
            && self.ospeed() == other.ospeed()
    }
}

#[cfg(unix)]
impl Eq for TerminalSnapshot {}

/// Turn `termios` into raw-mode attributes.
///
/// Disables signal keys, echo, canonical line buffering, output
/// post-processing, XON/XOFF flow control and CR→NL translation; selects
/// 8-bit characters; makes reads return after at most
/// [`READ_TIMEOUT_DECISECONDS`] with zero or more bytes.
#[cfg(unix)]
pub fn make_raw(termios: &mut libc::termios) {
    termios.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
    termios.c_oflag &= !libc::OPOST;
    termios.c_cflag = (termios.c_cflag & !libc::CSIZE) | libc::CS8;
    termios.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);

    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = READ_TIMEOUT_DECISECONDS;
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of the raw-mode descriptor and its original termios, for
/// panic recovery.
///
/// The [`RawMode`] guard owns its own copy, but the panic hook can't
/// access it. This global backup — behind a [`Mutex`], not `static mut` —
/// lets the hook restore cooked mode without the guard.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<(libc::c_int, TerminalSnapshot)>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some((fd, ref original)) = *guard {
            let _ = original.apply(fd);
        }
    }
}

/// Clear the screen, home the cursor, and make it visible again.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Without this, a panic in raw mode leaves the user's terminal broken:
/// no echo, no line editing, and the panic message smeared across the
/// last frame with no carriage returns.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

/// Write [`EMERGENCY_RESTORE`] directly to stdout's file descriptor.
///
/// Bypasses Rust's `io::stdout()` lock to avoid deadlocking if the panic
/// occurred while the lock was held.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let mut out = std::io::stdout();
        let _ = out.write_all(EMERGENCY_RESTORE);
        let _ = out.flush();
    }
}

// ─── RawMode ────────────────────────────────────────────────────────────────

/// Raw-mode guard.
///
/// [`enable`](Self::enable) captures the terminal's attributes and switches
/// to raw mode. The original attributes are reapplied when the guard is
/// dropped or [`disable`](Self::disable)d — whichever comes first.
///
/// # Example
///
/// ```no_run
/// use n_term::terminal::RawMode;
///
/// let raw = RawMode::enable()?;
/// // ... read keys, render frames ...
/// raw.disable()?;
/// # Ok::<(), n_term::Error>(())
/// ```
pub struct RawMode {
    /// The terminal descriptor put into raw mode.
    #[cfg(unix)]
    fd: libc::c_int,
    /// Original attributes, `None` once restored.
    #[cfg(unix)]
    original: Option<TerminalSnapshot>,
}

impl RawMode {
    /// Capture stdin's current attributes and enter raw mode.
    ///
    /// # Errors
    ///
    /// See [`enable_on`](Self::enable_on).
    #[cfg(unix)]
    pub fn enable() -> Result<Self> {
        Self::enable_on(libc::STDIN_FILENO)
    }

    /// Capture the attributes of terminal `fd` and put it into raw mode.
    ///
    /// # Errors
    ///
    /// [`Error::GetAttr`] if `fd` is not a terminal, [`Error::SetAttr`] if
    /// the raw attributes can't be applied. On `SetAttr` failure the
    /// original attributes are reapplied best-effort before returning.
    #[cfg(unix)]
    pub fn enable_on(fd: libc::c_int) -> Result<Self> {
        install_panic_hook();

        let original = TerminalSnapshot::capture(fd)?;
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some((fd, original));
        }

        // From here on the guard owns restoration, including the error path.
        let guard = Self {
            fd,
            original: Some(original),
        };
        original.to_raw().apply(fd)?;

        debug!(fd, "raw mode enabled");
        Ok(guard)
    }

    #[cfg(not(unix))]
    pub fn enable() -> Result<Self> {
        install_panic_hook();
        Ok(Self {})
    }

    /// Restore the original attributes, reporting failure.
    ///
    /// # Errors
    ///
    /// [`Error::SetAttr`] if `tcsetattr` fails.
    pub fn disable(mut self) -> Result<()> {
        self.restore()
    }

    #[cfg(unix)]
    fn restore(&mut self) -> Result<()> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };

        original.apply(self.fd)?;

        // Restored successfully — the panic hook has nothing left to do.
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            if matches!(*guard, Some((fd, _)) if fd == self.fd) {
                *guard = None;
            }
        }
        debug!(fd = self.fd, "raw mode disabled");
        Ok(())
    }

    #[cfg(not(unix))]
    #[allow(clippy::unnecessary_wraps)]
    fn restore(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
