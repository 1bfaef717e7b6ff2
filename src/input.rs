//! Turns buffered terminal bytes into key events: escape sequences
//! from the capability table, lone ESC or ALT prefixes, control bytes,
//! and UTF-8 code points.

use crate::ringbuf::RingBuf;
use crate::utf8;
use crate::{InputMode, KeyEvent, KEY_BACKSPACE2, KEY_ESC, KEY_SPACE};

/// Longest escape sequence we try to match, with margin.
const PEEK_MAX: usize = 16;

/// Extracts one key event from `inbuf`, consuming exactly the bytes of
/// that event. Returns `None` when the buffered bytes do not yet form
/// a complete event; in [`InputMode::Alt`] a recognized ESC prefix is
/// consumed even then, and `alt_pending` carries the modifier to the
/// caller's next attempt.
pub(crate) fn extract_event(
    inbuf: &mut RingBuf,
    keys: &[&str],
    mode: InputMode,
    alt_pending: &mut bool,
) -> Option<KeyEvent> {
    loop {
        let mut peek = [0; PEEK_MAX];
        let n = inbuf.peek(&mut peek);
        if n == 0 {
            return None;
        }
        let buf = &peek[..n];

        if buf[0] == 0x1B {
            // An escape sequence, a lone ESC, or an ALT prefix.
            if let Some((idx, seq_len)) = match_escape_seq(buf, keys) {
                inbuf.pop(seq_len);
                return Some(KeyEvent {
                    key: 0xFFFF - idx as u16,
                    ch: '\0',
                    alt: *alt_pending,
                });
            }
            match mode {
                InputMode::Esc => {
                    inbuf.pop(1);
                    return Some(KeyEvent {
                        key: KEY_ESC,
                        ch: '\0',
                        alt: false,
                    });
                }
                InputMode::Alt => {
                    // Decode what follows as an ALT-modified key. The
                    // ESC byte is gone after this, so the modifier has
                    // to survive a retry for the rest of the bytes.
                    *alt_pending = true;
                    inbuf.pop(1);
                    continue;
                }
            }
        }

        if buf[0] <= KEY_SPACE as u8 || buf[0] == KEY_BACKSPACE2 as u8 {
            // Control keys are delivered as the raw byte value.
            inbuf.pop(1);
            return Some(KeyEvent {
                key: u16::from(buf[0]),
                ch: '\0',
                alt: *alt_pending,
            });
        }

        // The leading byte of a UTF-8 code point; wait until the whole
        // sequence arrived.
        if n < utf8::char_length(buf[0]) {
            return None;
        }
        let (scalar, consumed) = utf8::char_to_unicode(buf);
        inbuf.pop(consumed);
        return Some(KeyEvent {
            key: 0,
            ch: char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER),
            alt: *alt_pending,
        });
    }
}

/// First table sequence that is a prefix of `buf`, with its index and
/// byte length.
fn match_escape_seq(buf: &[u8], keys: &[&str]) -> Option<(usize, usize)> {
    keys.iter().enumerate().find_map(|(idx, seq)| {
        let seq = seq.as_bytes();
        buf.starts_with(seq).then_some((idx, seq.len()))
    })
}
