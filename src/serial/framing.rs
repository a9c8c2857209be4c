//! # Sentence Framing
//!
//! Single-pass, constant-space assembly of a byte stream into lines.
//!
//! Both `\r` and `\n` close a line; the line handed to the decoder always ends
//! with a single normalized `\n`. Lines whose framed length (including that
//! `\n`) is not above [`MIN_SENTENCE_LEN`] are swallowed, which filters the
//! empty line produced by every `\r\n` pair.
//!
//! Input longer than the buffer is a framing overflow: the partial line is
//! dropped and the remaining bytes up to the next terminator are skipped, so a
//! truncated tail is never reported as a sentence. Nothing is signalled to the
//! caller; devices do emit garbage now and then.

use bytes::{BufMut, BytesMut};

/// Size of the accumulation buffer, terminator slot included
pub const NMEA_BUFFER_SIZE: usize = 160;

/// Framed lines must be longer than this to be dispatched
pub const MIN_SENTENCE_LEN: usize = 5;

/// Line framing state machine
#[derive(Debug)]
pub struct SentenceFramer {
    buf: BytesMut,
    discarding: bool,
}

impl Default for SentenceFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceFramer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(NMEA_BUFFER_SIZE),
            discarding: false,
        }
    }

    /// Bytes accumulated for the line in progress
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Feed one byte
    ///
    /// `on_line` is called with the completed line (ending in `\n`) when the
    /// byte closes a meaningful sentence. Returns `true` if it was called.
    pub fn push<F>(&mut self, byte: u8, mut on_line: F) -> bool
    where
        F: FnMut(&[u8]),
    {
        // One slot stays reserved for the terminator
        let has_room = self.buf.len() + 1 < NMEA_BUFFER_SIZE;

        if byte == b'\n' || byte == b'\r' {
            if self.discarding || !has_room {
                self.reset();
                return false;
            }

            self.buf.put_u8(b'\n');
            let dispatched = self.buf.len() > MIN_SENTENCE_LEN;
            if dispatched {
                on_line(&self.buf);
            }
            self.buf.clear();
            return dispatched;
        }

        if self.discarding {
            return false;
        }

        if has_room {
            self.buf.put_u8(byte);
        } else {
            // overflow
            self.buf.clear();
            self.discarding = true;
        }
        false
    }

    /// Drop the line in progress and leave overflow mode
    pub fn reset(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }
}
