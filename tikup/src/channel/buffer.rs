//! Output accumulator for prompt detection.
//!
//! RouterOS colours its prompt and redraws lines with CSI sequences, so
//! output is stripped of escape codes before it is buffered. Only the last
//! `search_depth` bytes are searched: the prompt is always at the end, and
//! `print` output on a large router can be long.

use std::borrow::Cow;

use regex::bytes::Regex;

const ESC: u8 = 0x1b;

/// ANSI-stripped device output with tail search.
#[derive(Debug)]
pub struct PatternBuffer {
    buffer: Vec<u8>,

    /// Start of an escape sequence cut off at the end of the last chunk.
    partial_escape: Vec<u8>,

    search_depth: usize,
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            partial_escape: Vec::new(),
            search_depth,
        }
    }

    /// Append a chunk read from the channel.
    ///
    /// An escape sequence split across two chunks is held back until the
    /// rest of it arrives, so it never leaks into the buffer half-stripped.
    pub fn extend(&mut self, data: &[u8]) {
        let mut pending = std::mem::take(&mut self.partial_escape);
        pending.extend_from_slice(data);

        let split = incomplete_escape_start(&pending).unwrap_or(pending.len());
        let cleaned = strip_ansi_escapes::strip(&pending[..split]);
        self.buffer.extend_from_slice(&cleaned);
        self.partial_escape = pending[split..].to_vec();
    }

    /// Find `pattern` in the searched tail.
    pub fn search_tail(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern.find(&self.buffer[start..])
    }

    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        self.search_tail(pattern).is_some()
    }

    /// Take the buffered output, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop buffered output and any held-back escape bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.partial_escape.clear();
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Offset of a trailing escape sequence that is not terminated yet.
fn incomplete_escape_start(data: &[u8]) -> Option<usize> {
    let esc = data.iter().rposition(|&b| b == ESC)?;
    let rest = &data[esc + 1..];

    let terminated = match rest.first() {
        None => false,
        // CSI ends at the first byte in 0x40..=0x7e after the parameters.
        Some(b'[') => rest[1..].iter().any(|b| (0x40..=0x7e).contains(b)),
        Some(_) => true,
    };

    (!terminated).then_some(esc)
}
