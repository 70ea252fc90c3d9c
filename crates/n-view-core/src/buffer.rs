//! Line store — the loaded file as an ordered list of lines.
//!
//! # Design choices
//!
//! - **Bytes, not `String`.** The viewer makes no encoding promises: a line
//!   is whatever bytes sat between two `\n`s. Invalid UTF-8, stray control
//!   characters and Latin-1 files all load and render byte-for-byte.
//!
//! - **Length is authoritative.** Line terminators are stripped on load and
//!   nothing downstream looks for a terminator or a NUL.
//!
//! - **Append-only.** Lines are pushed in file order during load and never
//!   reordered or removed. Once the session loop starts, the store is only
//!   read.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// One line of the file, without its terminator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    bytes: Vec<u8>,
}

impl Line {
    /// Build a line from raw bytes, stripping any trailing `\n` / `\r`.
    #[must_use]
    pub fn new(mut bytes: Vec<u8>) -> Self {
        while matches!(bytes.last(), Some(b'\n' | b'\r')) {
            bytes.pop();
        }
        Self { bytes }
    }

    /// Length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for an empty line.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The line's bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The part of the line visible through a window starting at column
    /// `start` and `width` columns wide.
    ///
    /// Clamped to the line: empty when `start` is past the end.
    #[must_use]
    pub fn slice(&self, start: usize, width: usize) -> &[u8] {
        let start = start.min(self.bytes.len());
        let end = start.saturating_add(width).min(self.bytes.len());
        &self.bytes[start..end]
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

// ---------------------------------------------------------------------------
// LineStore
// ---------------------------------------------------------------------------

/// The file being viewed, one [`Line`] per file line.
#[derive(Debug, Clone, Default)]
pub struct LineStore {
    lines: Vec<Line>,
    path: Option<PathBuf>,
}

impl LineStore {
    /// An empty store — the "no file given" state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            path: None,
        }
    }

    /// Load every line of the file at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::Open`] if the file can't be opened, [`Error::Read`] if
    /// reading fails partway.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut store = Self::from_reader(BufReader::new(file)).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        store.path = Some(path.to_path_buf());

        debug!(path = %path.display(), lines = store.len(), "loaded file");
        Ok(store)
    }

    /// Read lines from any buffered reader, splitting on `\n`.
    ///
    /// A final line without a terminator is kept; a trailing `\n` does not
    /// produce an extra empty line.
    ///
    /// # Errors
    ///
    /// Propagates read errors from `reader`.
    pub fn from_reader(mut reader: impl BufRead) -> io::Result<Self> {
        let mut store = Self::new();
        loop {
            let mut bytes = Vec::new();
            if reader.read_until(b'\n', &mut bytes)? == 0 {
                break;
            }
            store.push(Line::new(bytes));
        }
        Ok(store)
    }

    /// Append a line at the end.
    pub fn push(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Number of lines (`numrows`).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when no file was loaded or the file was empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line at `row`, if it exists.
    #[inline]
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&Line> {
        self.lines.get(row)
    }

    /// Iterate lines in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// The file this store was loaded from.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl FromIterator<Line> for LineStore {
    fn from_iter<I: IntoIterator<Item = Line>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
            path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
