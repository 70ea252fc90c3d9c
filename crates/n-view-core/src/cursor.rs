//! Cursor — the viewer's position in the file.
//!
//! `cx` is a column, `cy` a row, both 0-indexed into the [`LineStore`]
//! rather than the screen. The viewport translates them to screen cells.
//!
//! Row movement is bounded to `[0, numrows]`: the cursor may sit on the
//! virtual row just past the last line, which is where a new line would be
//! appended. Column movement is bounded below by 0 but not above — moving
//! right never stops, and the viewport scrolls horizontally to follow.
//!
//! [`LineStore`]: crate::buffer::LineStore

use n_term::input::Key;

/// Cursor position in file coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Column (0-indexed).
    pub cx: usize,
    /// Row (0-indexed), at most `numrows`.
    pub cy: usize,
}

impl Cursor {
    /// A cursor at the top-left of the file.
    #[must_use]
    pub const fn new() -> Self {
        Self { cx: 0, cy: 0 }
    }

    /// A cursor at `(cx, cy)`.
    #[must_use]
    pub const fn at(cx: usize, cy: usize) -> Self {
        Self { cx, cy }
    }

    /// Move one cell for an arrow key, or jump for Home/End.
    ///
    /// `numrows` bounds downward movement; `screencols` defines where End
    /// lands. Any other key leaves the cursor alone. Returns whether the
    /// key was a movement key.
    pub const fn move_by(&mut self, key: Key, numrows: usize, screencols: usize) -> bool {
        match key {
            Key::Left => self.cx = self.cx.saturating_sub(1),
            Key::Right => self.cx = self.cx.saturating_add(1),
            Key::Up => self.cy = self.cy.saturating_sub(1),
            Key::Down => {
                if self.cy < numrows {
                    self.cy += 1;
                }
            }
            Key::Home => self.cx = 0,
            Key::End => self.cx = screencols.saturating_sub(1),
            _ => return false,
        }
        true
    }
}
