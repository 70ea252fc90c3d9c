//! Session loop — wires the terminal, line store, and renderer together.
//!
//! A session moves through three states:
//!
//! ```text
//! Starting ──run()──▶ Running ──quit key──▶ Terminating
//! ```
//!
//! - **Starting**: the window has been measured and the file (if any)
//!   loaded. Raw mode is the caller's job: the guard has to outlive the
//!   session so it can restore the terminal on every exit path.
//! - **Running**: scroll, render one frame, block for one key, dispatch.
//! - **Terminating**: clear the screen and home the cursor so the shell
//!   prompt comes back on a clean screen.
//!
//! All state is owned by [`Viewer`] and mutated only from the loop.

use std::io::{self, Write};
use std::path::Path;

use n_term::ansi;
use n_term::input::{read_key, ByteSource, Key};
use n_term::output::OutputBuffer;
use n_term::terminal::{self, Size};
use tracing::debug;

use crate::buffer::LineStore;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::options::Options;
use crate::view::{self, Viewport};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Terminating,
}

/// One viewing session: the file, the cursor, and the screen.
pub struct Viewer {
    store: LineStore,
    cursor: Cursor,
    viewport: Viewport,
    options: Options,
    out: OutputBuffer,
    state: SessionState,
}

impl Viewer {
    /// A session over `store` on a screen of `size`.
    #[must_use]
    pub fn new(store: LineStore, size: Size, options: Options) -> Self {
        Self {
            store,
            cursor: Cursor::new(),
            viewport: Viewport::from_size(size),
            options,
            out: OutputBuffer::new(),
            state: SessionState::Starting,
        }
    }

    /// Measure the window and load `path`, if given.
    ///
    /// The terminal must already be in raw mode: the size fallback reads
    /// the terminal's reply from `input`.
    ///
    /// # Errors
    ///
    /// Fails if the window size can't be determined or the file can't be
    /// opened or read.
    pub fn start(
        path: Option<&Path>,
        input: &mut impl ByteSource,
        output: &mut impl Write,
        options: Options,
    ) -> Result<Self> {
        let size = terminal::window_size(input, output)?;
        let store = match path {
            Some(path) => LineStore::load(path)?,
            None => LineStore::new(),
        };
        debug!(cols = size.cols, rows = size.rows, lines = store.len(), "session starting");
        Ok(Self::new(store, size, options))
    }

    // -- Accessors ----------------------------------------------------------

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub const fn store(&self) -> &LineStore {
        &self.store
    }

    // -- Loop ---------------------------------------------------------------

    /// Run until the quit key is pressed.
    ///
    /// On a clean quit the screen is cleared before returning. On error the
    /// caller is expected to clear it (see [`reset_screen`]) before
    /// restoring the terminal.
    ///
    /// # Errors
    ///
    /// Any terminal read or write failure.
    pub fn run(&mut self, input: &mut impl ByteSource, output: &mut impl Write) -> Result<()> {
        self.state = SessionState::Running;
        debug!("session running");

        while self.state == SessionState::Running {
            self.refresh_screen(output)?;
            let key = read_key(input)?;
            self.process_key(key);
        }

        debug!("session terminating");
        reset_screen(output).map_err(n_term::Error::Write)?;
        Ok(())
    }

    /// Scroll to the cursor and draw one frame in a single write.
    ///
    /// # Errors
    ///
    /// [`n_term::Error::Write`] if the frame can't be written.
    pub fn refresh_screen(&mut self, output: &mut impl Write) -> Result<()> {
        self.viewport.scroll(&self.cursor);
        view::render_frame(
            &mut self.out,
            &self.store,
            &self.cursor,
            &self.viewport,
            &self.options.welcome,
        )
        .map_err(n_term::Error::Write)?;
        self.out.flush_to(output).map_err(n_term::Error::Write)?;
        Ok(())
    }

    /// Apply one key and return the resulting state.
    pub fn process_key(&mut self, key: Key) -> SessionState {
        let numrows = self.store.len();
        let screencols = self.viewport.screencols;

        if key == self.options.quit_key {
            self.state = SessionState::Terminating;
            return self.state;
        }

        match key {
            Key::PageUp | Key::PageDown => {
                let step = if key == Key::PageUp { Key::Up } else { Key::Down };
                for _ in 0..self.viewport.screenrows {
                    self.cursor.move_by(step, numrows, screencols);
                }
            }
            _ => {
                self.cursor.move_by(key, numrows, screencols);
            }
        }
        self.state
    }
}

/// Clear the screen and home the cursor, in one write.
///
/// # Errors
///
/// Propagates the write error.
pub fn reset_screen(output: &mut impl Write) -> io::Result<()> {
    let mut out = OutputBuffer::new();
    ansi::clear_screen(&mut out)?;
    ansi::cursor_home(&mut out)?;
    out.flush_to(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Line;
    use crate::error::Error;
    use n_term::input::ScriptedInput;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const SIZE: Size = Size { cols: 80, rows: 24 };

    const UP: &[u8] = b"\x1b[A";
    const DOWN: &[u8] = b"\x1b[B";
    const RIGHT: &[u8] = b"\x1b[C";
    const QUIT: u8 = 0x11;

    fn viewer_with(lines: usize, size: Size) -> Viewer {
        let store = (0..lines).map(|i| Line::from(format!("line {i}").as_str())).collect();
        Viewer::new(store, size, Options::default())
    }

    fn script(parts: &[&[u8]]) -> ScriptedInput {
        let mut bytes: Vec<u8> = parts.concat();
        bytes.push(QUIT);
        ScriptedInput::new(&bytes)
    }

    #[derive(Default)]
    struct CountingWriter {
        writes: usize,
        bytes: Vec<u8>,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct ClosedTerminal;

    impl Write for ClosedTerminal {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct DeadInput;

    impl ByteSource for DeadInput {
        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            Err(io::Error::other("EIO"))
        }
    }

    // ── State machine ─────────────────────────────────────────────────────

    #[test]
    fn new_session_is_starting() {
        let v = viewer_with(0, SIZE);
        assert_eq!(v.state(), SessionState::Starting);
        assert_eq!(*v.cursor(), Cursor::new());
        assert_eq!(*v.viewport(), Viewport::new(24, 80));
    }

    #[test]
    fn quit_key_terminates() {
        let mut v = viewer_with(3, SIZE);
        assert_eq!(v.process_key(Key::Char(QUIT)), SessionState::Terminating);
    }

    #[test]
    fn other_keys_are_no_ops() {
        let mut v = viewer_with(3, SIZE);
        for key in [Key::Char(b'q'), Key::Escape, Key::Delete, Key::Char(b'\r')] {
            v.process_key(key);
        }
        assert_eq!(*v.cursor(), Cursor::new());
    }

    #[test]
    fn page_down_moves_a_screen() {
        let mut v = viewer_with(100, Size { cols: 80, rows: 10 });
        v.process_key(Key::PageDown);
        assert_eq!(v.cursor().cy, 10);
        v.process_key(Key::PageUp);
        assert_eq!(v.cursor().cy, 0);
    }

    #[test]
    fn page_down_clamps_at_numrows() {
        let mut v = viewer_with(5, SIZE);
        v.process_key(Key::PageDown);
        assert_eq!(v.cursor().cy, 5);
    }

    #[test]
    fn end_goes_to_last_screen_column() {
        let mut v = viewer_with(1, SIZE);
        v.process_key(Key::End);
        assert_eq!(v.cursor().cx, 79);
        v.process_key(Key::Home);
        assert_eq!(v.cursor().cx, 0);
    }

    // ── End to end ────────────────────────────────────────────────────────

    #[test]
    fn down_presses_clamp_at_numrows() {
        let mut v = viewer_with(3, SIZE);
        let mut input = script(&[DOWN, DOWN, DOWN, DOWN]);
        let mut output = Vec::new();

        v.run(&mut input, &mut output).unwrap();

        assert_eq!(v.cursor().cy, 3);
        assert_eq!(v.state(), SessionState::Terminating);
    }

    #[test]
    fn quit_clears_screen_last() {
        let mut v = viewer_with(3, SIZE);
        let mut output = Vec::new();

        v.run(&mut ScriptedInput::new(&[QUIT]), &mut output).unwrap();

        assert!(output.ends_with(b"\x1b[2J\x1b[H"));
        assert_eq!(v.state(), SessionState::Terminating);
    }

    #[test]
    fn one_write_per_frame() {
        let mut v = viewer_with(3, SIZE);
        let mut input = script(&[DOWN, RIGHT, UP]);
        let mut output = CountingWriter::default();

        v.run(&mut input, &mut output).unwrap();

        // A frame before each of the 4 keys, then the final clear.
        assert_eq!(output.writes, 5);
        let frames = output.bytes.windows(6).filter(|w| *w == b"\x1b[?25l").count();
        assert_eq!(frames, 4);
    }

    #[test]
    fn scrolls_as_cursor_moves_down() {
        let mut v = viewer_with(50, Size { cols: 80, rows: 5 });
        let downs = vec![DOWN; 7];
        let mut output = Vec::new();

        v.run(&mut script(&downs), &mut output).unwrap();

        assert_eq!(v.cursor().cy, 7);
        assert_eq!(v.viewport().rowoff, 3);
    }

    #[test]
    fn read_error_is_fatal() {
        let mut v = viewer_with(1, SIZE);
        let err = v.run(&mut DeadInput, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Terminal(n_term::Error::Read(_))));
    }

    #[test]
    fn write_error_is_fatal() {
        let mut v = viewer_with(1, SIZE);
        let err = v
            .run(&mut ScriptedInput::new(&[QUIT]), &mut ClosedTerminal)
            .unwrap_err();
        assert!(matches!(err, Error::Terminal(n_term::Error::Write(_))));
    }

    #[test]
    fn start_loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "a\nb\r\nc").unwrap();
        // Answer the cursor-position query in case stdout isn't a terminal.
        let mut input = ScriptedInput::new(b"\x1b[24;80R");
        let mut output = Vec::new();

        let v = Viewer::start(Some(file.path()), &mut input, &mut output, Options::default())
            .unwrap();

        assert_eq!(v.store().len(), 3);
        assert_eq!(v.store().get(1).unwrap().as_bytes(), b"b");
        assert_eq!(v.state(), SessionState::Starting);
    }

    #[test]
    fn start_without_file_is_empty() {
        let mut input = ScriptedInput::new(b"\x1b[24;80R");
        let v = Viewer::start(None, &mut input, &mut Vec::new(), Options::default()).unwrap();
        assert!(v.store().is_empty());
    }

    #[test]
    fn start_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let mut input = ScriptedInput::new(b"\x1b[24;80R");
        let err = Viewer::start(
            Some(missing.as_path()),
            &mut input,
            &mut Vec::new(),
            Options::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn reset_screen_sequence() {
        let mut out = Vec::new();
        reset_screen(&mut out).unwrap();
        assert_eq!(out, b"\x1b[2J\x1b[H");
    }

    // ── Viewport invariant ────────────────────────────────────────────────

    fn nav_key() -> impl Strategy<Value = Key> {
        prop_oneof![
            Just(Key::Up),
            Just(Key::Down),
            Just(Key::Left),
            Just(Key::Right),
            Just(Key::Home),
            Just(Key::End),
            Just(Key::PageUp),
            Just(Key::PageDown),
        ]
    }

    proptest! {
        /// After every render the cursor is on screen.
        #[test]
        fn cursor_always_visible_after_render(
            numrows in 1usize..60,
            rows in 1u16..30,
            cols in 1u16..100,
            keys in prop::collection::vec(nav_key(), 0..80),
        ) {
            let mut v = viewer_with(numrows, Size { cols, rows });
            let mut sink = Vec::new();

            for key in keys {
                v.process_key(key);
                v.refresh_screen(&mut sink).unwrap();
                sink.clear();

                let vp = *v.viewport();
                let c = *v.cursor();
                prop_assert!(vp.rowoff <= c.cy && c.cy < vp.rowoff + vp.screenrows);
                prop_assert!(vp.coloff <= c.cx && c.cx < vp.coloff + vp.screencols);
                prop_assert!(c.cy <= numrows);
            }
        }

        /// Scrolling twice without moving changes nothing the second time.
        #[test]
        fn scroll_twice_is_stable(
            cx in 0usize..10_000,
            cy in 0usize..10_000,
            rows in 1usize..50,
            cols in 1usize..200,
        ) {
            let cursor = Cursor::at(cx, cy);
            let mut vp = Viewport::new(rows, cols);
            vp.scroll(&cursor);
            let once = vp;
            vp.scroll(&cursor);
            prop_assert_eq!(vp, once);
        }
    }
}
