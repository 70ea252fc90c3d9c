// SPDX-License-Identifier: MIT
//
// Terminal error type.
//
// Every variant here is fatal to a raw-mode session: once we can't read
// attributes, write attributes, or write a frame, the terminal is no longer
// under our control. Callers restore what they can and exit.

use std::io;

use thiserror::Error;

/// Errors raised while driving the terminal.
#[derive(Error, Debug)]
pub enum Error {
    /// `tcgetattr` failed (usually: stdin is not a terminal).
    #[error("tcgetattr: {0}")]
    GetAttr(#[source] io::Error),

    /// `tcsetattr` failed.
    #[error("tcsetattr: {0}")]
    SetAttr(#[source] io::Error),

    /// Reading from the terminal failed with something other than a timeout.
    #[error("read: {0}")]
    Read(#[source] io::Error),

    /// Writing to the terminal failed.
    #[error("write: {0}")]
    Write(#[source] io::Error),

    /// Neither `TIOCGWINSZ` nor the cursor-position fallback produced a size.
    #[error("getWindowSize: unable to determine terminal size")]
    WindowSize,
}

/// Result alias for terminal operations.
pub type Result<T> = std::result::Result<T, Error>;
