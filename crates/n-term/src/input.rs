// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Key decoding.
//
// Turns the raw byte stream from a raw-mode terminal into logical keys.
// Navigation keys arrive as short escape sequences:
//
//   ESC [ A..D        arrows
//   ESC [ H / ESC [ F Home / End
//   ESC [ n ~         editing keys (1/7 Home, 3 Delete, 4/8 End, 5/6 PgUp/PgDn)
//   ESC O H / ESC O F Home / End (SS3 form)
//
// # Design
//
// Decoding is a bounded-lookahead state machine over at most three bytes
// after ESC. The byte→key mappings are tables, not match arms, so each one
// can be checked on its own.
//
// A lone ESC is ambiguous: it is either the Escape key or the start of a
// sequence whose remaining bytes never arrived. The only way to tell is the
// read timeout. Both cases decode to `Key::Escape`.
//
// The first byte is waited for indefinitely (retrying each 100ms timeout).
// Lookahead bytes get exactly one timed attempt each.

use std::collections::VecDeque;
use std::io;

use tracing::trace;

use crate::error::{Error, Result};

// ─── Key ────────────────────────────────────────────────────────────────────

/// A decoded logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Any byte that isn't the start of a recognized escape sequence:
    /// printable ASCII, control characters, UTF-8 fragments.
    Char(u8),
    /// A bare ESC, or an escape sequence we don't recognize.
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Delete,
    PageUp,
    PageDown,
}

impl Key {
    /// The key produced by holding Ctrl with `ch` (`ch & 0x1f`).
    ///
    /// `Key::ctrl(b'q')` is `Key::Char(0x11)`.
    #[inline]
    #[must_use]
    pub const fn ctrl(ch: u8) -> Self {
        Self::Char(ch & 0x1f)
    }
}

// ─── Mapping tables ─────────────────────────────────────────────────────────

/// `ESC [ <digit> ~` — editing keys keyed by the digit.
pub const TILDE_KEYS: &[(u8, Key)] = &[
    (b'1', Key::Home),
    (b'3', Key::Delete),
    (b'4', Key::End),
    (b'5', Key::PageUp),
    (b'6', Key::PageDown),
    (b'7', Key::Home),
    (b'8', Key::End),
];

/// `ESC [ <letter>` — arrows and Home/End.
pub const CSI_KEYS: &[(u8, Key)] = &[
    (b'A', Key::Up),
    (b'B', Key::Down),
    (b'C', Key::Right),
    (b'D', Key::Left),
    (b'H', Key::Home),
    (b'F', Key::End),
];

/// `ESC O <letter>` — SS3 Home/End.
pub const SS3_KEYS: &[(u8, Key)] = &[(b'H', Key::Home), (b'F', Key::End)];

/// Look up `byte` in a mapping table.
#[must_use]
pub fn lookup(table: &[(u8, Key)], byte: u8) -> Option<Key> {
    table.iter().find(|&&(b, _)| b == byte).map(|&(_, key)| key)
}

// ─── Byte sources ───────────────────────────────────────────────────────────

/// Something that yields terminal input one byte at a time.
pub trait ByteSource {
    /// Try to read a single byte.
    ///
    /// Returns `Ok(None)` when the read timed out with no data. Transient
    /// conditions (`EAGAIN`, `EINTR`) are reported the same way.
    ///
    /// # Errors
    ///
    /// Returns an error on any other read failure.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// Raw `read(2)` on stdin.
///
/// With the terminal in raw mode (`VMIN = 0`, `VTIME = 1`), each call
/// returns after at most 100ms.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stdin;

impl ByteSource for Stdin {
    #[cfg(unix)]
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        let n = unsafe { libc::read(libc::STDIN_FILENO, (&raw mut byte).cast(), 1) };
        match n {
            1 => Ok(Some(byte)),
            0 => Ok(None),
            _ => {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(None),
                    _ => Err(err),
                }
            }
        }
    }

    #[cfg(not(unix))]
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        use std::io::Read;

        let mut byte = [0u8; 1];
        match io::stdin().lock().read(&mut byte) {
            Ok(1) => Ok(Some(byte[0])),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// A fixed script of input bytes.
///
/// Yields each byte once, then times out forever. Used by tests and by
/// anything that wants to replay a captured keystroke sequence.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    bytes: VecDeque<u8>,
}

impl ScriptedInput {
    /// Create a source that will yield `bytes` in order.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.iter().copied().collect(),
        }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

impl ByteSource for ScriptedInput {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.bytes.pop_front())
    }
}

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Block until a byte arrives, then decode one logical key.
///
/// # Errors
///
/// Returns [`Error::Read`] if reading the first byte fails for any reason
/// other than a timeout. Failures after an ESC decode as [`Key::Escape`].
pub fn read_key(input: &mut impl ByteSource) -> Result<Key> {
    let first = loop {
        if let Some(b) = input.read_byte().map_err(Error::Read)? {
            break b;
        }
    };

    let key = if first == 0x1B {
        decode_escape(input)
    } else {
        Key::Char(first)
    };

    trace!(byte = first, ?key, "decoded key");
    Ok(key)
}

/// Decode the rest of a sequence after ESC has been consumed.
///
/// Never fails: a lookahead that times out or errors ends the sequence as a
/// bare escape.
fn decode_escape(input: &mut impl ByteSource) -> Key {
    let Some(intro) = next(input) else {
        return Key::Escape;
    };
    let Some(b) = next(input) else {
        return Key::Escape;
    };

    let key = match intro {
        b'[' if b.is_ascii_digit() => match next(input) {
            Some(b'~') => lookup(TILDE_KEYS, b),
            _ => None,
        },
        b'[' => lookup(CSI_KEYS, b),
        // Some captures render SS3's `O` as the digit `0`; accept both.
        b'O' | b'0' => lookup(SS3_KEYS, b),
        _ => None,
    };

    key.unwrap_or(Key::Escape)
}

/// One timed lookahead attempt. Read errors count as a timeout.
fn next(input: &mut impl ByteSource) -> Option<u8> {
    input.read_byte().unwrap_or_else(|e| {
        trace!(error = %e, "lookahead read failed");
        None
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Key {
        read_key(&mut ScriptedInput::new(bytes)).unwrap()
    }

    /// Decode every key in `bytes`, stopping when the script runs dry.
    fn decode_all(bytes: &[u8]) -> Vec<Key> {
        let mut input = ScriptedInput::new(bytes);
        let mut keys = Vec::new();
        while input.remaining() > 0 {
            keys.push(read_key(&mut input).unwrap());
        }
        keys
    }

    /// Source that times out `n` times before yielding its bytes.
    struct SlowInput {
        timeouts: usize,
        inner: ScriptedInput,
    }

    impl ByteSource for SlowInput {
        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            if self.timeouts > 0 {
                self.timeouts -= 1;
                return Ok(None);
            }
            self.inner.read_byte()
        }
    }

    struct BrokenInput;

    /// Source that yields its bytes, then fails every read.
    struct FailsAfter(ScriptedInput);

    impl ByteSource for FailsAfter {
        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            match self.0.read_byte()? {
                Some(b) => Ok(Some(b)),
                None => Err(io::Error::other("EIO")),
            }
        }
    }

    impl ByteSource for BrokenInput {
        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    // ── Plain bytes ─────────────────────────────────────────────────────

    #[test]
    fn ascii_char() {
        assert_eq!(decode(b"a"), Key::Char(b'a'));
    }

    #[test]
    fn control_char() {
        assert_eq!(decode(&[0x11]), Key::Char(0x11));
    }

    #[test]
    fn ctrl_q_is_0x11() {
        assert_eq!(Key::ctrl(b'q'), Key::Char(0x11));
        assert_eq!(Key::ctrl(b'Q'), Key::Char(0x11));
    }

    #[test]
    fn high_byte_passes_through() {
        assert_eq!(decode(&[0xC3]), Key::Char(0xC3));
    }

    // ── CSI letters ─────────────────────────────────────────────────────

    #[test]
    fn arrow_up() {
        assert_eq!(decode(b"\x1b[A"), Key::Up);
    }

    #[test]
    fn arrows() {
        assert_eq!(
            decode_all(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![Key::Up, Key::Down, Key::Right, Key::Left]
        );
    }

    #[test]
    fn home_end_csi_letter() {
        assert_eq!(decode(b"\x1b[H"), Key::Home);
        assert_eq!(decode(b"\x1b[F"), Key::End);
    }

    // ── Tilde sequences ─────────────────────────────────────────────────

    #[test]
    fn delete() {
        assert_eq!(decode(b"\x1b[3~"), Key::Delete);
    }

    #[test]
    fn tilde_table() {
        assert_eq!(decode(b"\x1b[1~"), Key::Home);
        assert_eq!(decode(b"\x1b[7~"), Key::Home);
        assert_eq!(decode(b"\x1b[4~"), Key::End);
        assert_eq!(decode(b"\x1b[8~"), Key::End);
        assert_eq!(decode(b"\x1b[5~"), Key::PageUp);
        assert_eq!(decode(b"\x1b[6~"), Key::PageDown);
    }

    #[test]
    fn unknown_tilde_digit_is_escape() {
        assert_eq!(decode(b"\x1b[2~"), Key::Escape);
        assert_eq!(decode(b"\x1b[9~"), Key::Escape);
    }

    #[test]
    fn digit_without_tilde_is_escape() {
        let mut input = ScriptedInput::new(b"\x1b[5xq");
        assert_eq!(read_key(&mut input).unwrap(), Key::Escape);
        // The non-tilde byte was consumed as lookahead.
        assert_eq!(read_key(&mut input).unwrap(), Key::Char(b'q'));
    }

    #[test]
    fn digit_then_timeout_is_escape() {
        assert_eq!(decode(b"\x1b[5"), Key::Escape);
    }

    // ── SS3 ─────────────────────────────────────────────────────────────

    #[test]
    fn ss3_home_end() {
        assert_eq!(decode(b"\x1bOH"), Key::Home);
        assert_eq!(decode(b"\x1bOF"), Key::End);
    }

    #[test]
    fn ss3_zero_alias() {
        assert_eq!(decode(b"\x1b0H"), Key::Home);
        assert_eq!(decode(b"\x1b0F"), Key::End);
    }

    #[test]
    fn ss3_unknown_is_escape() {
        assert_eq!(decode(b"\x1bOA"), Key::Escape);
    }

    // ── Bare escape ─────────────────────────────────────────────────────

    #[test]
    fn lone_escape() {
        assert_eq!(decode(b"\x1b"), Key::Escape);
    }

    #[test]
    fn escape_bracket_then_timeout() {
        assert_eq!(decode(b"\x1b["), Key::Escape);
    }

    #[test]
    fn unknown_csi_letter_is_escape() {
        assert_eq!(decode(b"\x1b[Z"), Key::Escape);
    }

    #[test]
    fn unknown_introducer_is_escape() {
        assert_eq!(decode(b"\x1bxy"), Key::Escape);
    }

    #[test]
    fn sequences_never_exceed_four_bytes() {
        let mut input = ScriptedInput::new(b"\x1b[3~~");
        assert_eq!(read_key(&mut input).unwrap(), Key::Delete);
        assert_eq!(input.remaining(), 1);
    }

    // ── Timeouts and errors ─────────────────────────────────────────────

    #[test]
    fn first_byte_retries_through_timeouts() {
        let mut input = SlowInput {
            timeouts: 5,
            inner: ScriptedInput::new(b"j"),
        };
        assert_eq!(read_key(&mut input).unwrap(), Key::Char(b'j'));
    }

    #[test]
    fn read_failure_is_an_error() {
        let err = read_key(&mut BrokenInput).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
    }

    #[test]
    fn failed_lookahead_is_bare_escape() {
        let mut input = FailsAfter(ScriptedInput::new(b"\x1b"));
        assert_eq!(read_key(&mut input).unwrap(), Key::Escape);
    }

    #[test]
    fn failure_mid_sequence_is_bare_escape() {
        assert_eq!(
            read_key(&mut FailsAfter(ScriptedInput::new(b"\x1b["))).unwrap(),
            Key::Escape
        );
        assert_eq!(
            read_key(&mut FailsAfter(ScriptedInput::new(b"\x1b[3"))).unwrap(),
            Key::Escape
        );
    }

    // ── Tables ──────────────────────────────────────────────────────────

    #[test]
    fn lookup_hits_and_misses() {
        assert_eq!(lookup(CSI_KEYS, b'C'), Some(Key::Right));
        assert_eq!(lookup(CSI_KEYS, b'Z'), None);
        assert_eq!(lookup(SS3_KEYS, b'A'), None);
    }

    #[test]
    fn tables_have_unique_bytes() {
        for table in [TILDE_KEYS, CSI_KEYS, SS3_KEYS] {
            let mut seen: Vec<u8> = table.iter().map(|&(b, _)| b).collect();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), table.len());
        }
    }
}
