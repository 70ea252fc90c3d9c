//! # n-view-core — Viewer core for n-view
//!
//! - **[`buffer`]** — `LineStore` of byte `Line`s loaded from a file
//! - **[`cursor`]** — `Cursor` (cx, cy) and its movement rules
//! - **[`view`]** — `Viewport` scrolling and single-write frame rendering
//! - **[`options`]** — built-in defaults: quit key, welcome banner
//! - **[`session`]** — `Viewer`, the Starting → Running → Terminating loop
//!
//! Terminal control and key decoding live in `n-term`; nothing here touches
//! a file descriptor directly.

pub mod buffer;
pub mod cursor;
pub mod error;
pub mod options;
pub mod session;
pub mod view;

pub use error::{Error, Result};
