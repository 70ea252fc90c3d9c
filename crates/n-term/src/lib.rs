// SPDX-License-Identifier: MIT
//
// n-term — Terminal layer for n-view.
//
// Everything that touches the terminal device lives here: entering and
// leaving raw mode, measuring the window, decoding the raw byte stream into
// keys, and encoding output as ANSI sequences batched into one write per
// frame. The viewer core above this crate never sees a file descriptor.
//
// Input is read through the `ByteSource` trait, so the key decoder and the
// cursor-report size query run the same against a scripted byte stream as
// against the real terminal.

pub mod ansi;
pub mod error;
pub mod input;
pub mod output;
pub mod terminal;

pub use error::{Error, Result};
