//! View — the bridge from line store to terminal.
//!
//! A [`Viewport`] is a fixed-size window onto the [`LineStore`]: the first
//! visible row and column, plus the screen extents measured once at
//! startup. Before every frame the viewport is scrolled just far enough to
//! keep the cursor inside it, then [`render_frame`] paints the visible
//! region into an [`OutputBuffer`].
//!
//! # Frame layout
//!
//! ```text
//! ESC[?25l ESC[H                     hide cursor, home
//! row 0 .. row N-1                   text slice or "~", then ESC[K, "\r\n"
//!                                    (no "\r\n" after the last row)
//! ESC[{y};{x}H ESC[?25h              place and show cursor
//! ```
//!
//! Rows past the end of the file show `~`. When the file is empty, the row a
//! third of the way down carries the centered welcome banner instead.
//!
//! Every row is erased to end-of-line after its content rather than clearing
//! the whole screen up front, so nothing on screen is blanked between frames.

use std::io::{self, Write};

use n_term::ansi;
use n_term::output::OutputBuffer;
use n_term::terminal::Size;

use crate::buffer::LineStore;
use crate::cursor::Cursor;

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Scroll offsets and screen extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// First visible line of the store.
    pub rowoff: usize,
    /// First visible column.
    pub coloff: usize,
    /// Screen height in rows.
    pub screenrows: usize,
    /// Screen width in columns.
    pub screencols: usize,
}

impl Viewport {
    /// A viewport at the top-left of the file with the given extents.
    #[must_use]
    pub const fn new(screenrows: usize, screencols: usize) -> Self {
        Self {
            rowoff: 0,
            coloff: 0,
            screenrows,
            screencols,
        }
    }

    /// A viewport covering the whole terminal.
    #[must_use]
    pub fn from_size(size: Size) -> Self {
        Self::new(usize::from(size.rows), usize::from(size.cols))
    }

    /// Scroll so the cursor is inside the viewport.
    ///
    /// Offsets only move toward the cursor and stop as soon as it is
    /// visible: afterwards `rowoff <= cy < rowoff + screenrows` and
    /// `coloff <= cx < coloff + screencols`. Does nothing if the cursor is
    /// already visible.
    pub const fn scroll(&mut self, cursor: &Cursor) {
        if cursor.cy < self.rowoff {
            self.rowoff = cursor.cy;
        }
        if cursor.cy >= self.rowoff + self.screenrows {
            self.rowoff = cursor.cy + 1 - self.screenrows;
        }
        if cursor.cx < self.coloff {
            self.coloff = cursor.cx;
        }
        if cursor.cx >= self.coloff + self.screencols {
            self.coloff = cursor.cx + 1 - self.screencols;
        }
    }

    /// Whether the cursor is inside the viewport.
    #[must_use]
    pub const fn contains(&self, cursor: &Cursor) -> bool {
        self.rowoff <= cursor.cy
            && cursor.cy < self.rowoff + self.screenrows
            && self.coloff <= cursor.cx
            && cursor.cx < self.coloff + self.screencols
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Paint one complete frame into `out`.
///
/// Appends only; the caller flushes `out` in a single write.
///
/// # Errors
///
/// Propagates write errors from `out` (none in practice — it's a `Vec`).
pub fn render_frame(
    out: &mut OutputBuffer,
    store: &LineStore,
    cursor: &Cursor,
    viewport: &Viewport,
    welcome: &str,
) -> io::Result<()> {
    ansi::cursor_hide(out)?;
    ansi::cursor_home(out)?;

    draw_rows(out, store, viewport, welcome)?;

    ansi::cursor_to(
        out,
        cursor.cx.saturating_sub(viewport.coloff),
        cursor.cy.saturating_sub(viewport.rowoff),
    )?;
    ansi::cursor_show(out)
}

/// Paint every screen row: text, `~` markers, or the welcome banner.
///
/// # Errors
///
/// Propagates write errors from `out`.
pub fn draw_rows(
    out: &mut impl Write,
    store: &LineStore,
    viewport: &Viewport,
    welcome: &str,
) -> io::Result<()> {
    for y in 0..viewport.screenrows {
        let filerow = y + viewport.rowoff;

        if let Some(line) = store.get(filerow) {
            out.write_all(line.slice(viewport.coloff, viewport.screencols))?;
        } else if store.is_empty() && y == viewport.screenrows / 3 {
            draw_banner(out, welcome, viewport.screencols)?;
        } else {
            out.write_all(b"~")?;
        }

        ansi::erase_line(out)?;
        if y + 1 < viewport.screenrows {
            out.write_all(b"\r\n")?;
        }
    }
    Ok(())
}

/// Paint `text` centered in a row `screencols` wide.
///
/// The text is cut to fit. The first padding cell keeps the `~` marker so
/// the left edge stays continuous.
///
/// # Errors
///
/// Propagates write errors from `out`.
pub fn draw_banner(out: &mut impl Write, text: &str, screencols: usize) -> io::Result<()> {
    let text = &text.as_bytes()[..text.len().min(screencols)];
    let mut padding = (screencols - text.len()) / 2;

    if padding > 0 {
        out.write_all(b"~")?;
        padding -= 1;
    }
    for _ in 0..padding {
        out.write_all(b" ")?;
    }
    out.write_all(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
