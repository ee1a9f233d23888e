//! PTY channel abstraction for interactive sessions.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Search depth for pattern matching.
    pub search_depth: usize,

    /// Line terminator appended by [`PtyChannel::send`].
    pub line_ending: &'static str,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            search_depth: 1000,
            line_ending: "\r\n",
        }
    }
}

/// Interactive shell channel with pattern-based reads.
pub struct PtyChannel {
    channel: Channel<Msg>,

    config: PtyConfig,

    /// Pattern buffer for accumulating output.
    buffer: PatternBuffer,
}

impl PtyChannel {
    /// Wrap an opened russh shell channel.
    pub fn new(channel: Channel<Msg>, config: PtyConfig) -> Self {
        Self {
            buffer: PatternBuffer::new(config.search_depth),
            channel,
            config,
        }
    }

    /// Send a line of input followed by the configured line ending.
    pub async fn send(&mut self, input: &str) -> Result<()> {
        let line = format!("{}{}", input, self.config.line_ending);
        self.write_raw(line.as_bytes()).await
    }

    /// Write bytes to the channel exactly as given.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        trace!("write {:?}", String::from_utf8_lossy(data));
        self.channel
            .data(data)
            .await
            .map_err(|e| ChannelError::Ssh(e).into())
    }

    /// Read until `pattern` matches the tail of the accumulated output.
    ///
    /// Returns everything read, including the matched text.
    pub async fn read_until_pattern(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.buffer.tail_contains(pattern) {
                return Ok(self.buffer.take());
            }

            match tokio::time::timeout_at(deadline, self.channel.wait()).await {
                Err(_) => return Err(ChannelError::PatternTimeout(timeout).into()),
                Ok(msg) => {
                    if !self.absorb(msg) {
                        return Err(ChannelError::Closed.into());
                    }
                }
            }
        }
    }

    /// Read until the device has been quiet for `idle`, or `max` has elapsed.
    ///
    /// This never waits for a prompt; it returns whatever accumulated. A
    /// channel that closes after producing output returns that output; a
    /// channel that closes before producing anything is an error.
    pub async fn read_until_idle(&mut self, idle: Duration, max: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + max;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match tokio::time::timeout(idle.min(remaining), self.channel.wait()).await {
                Err(_) => break,
                Ok(msg) => {
                    if !self.absorb(msg) {
                        if self.buffer.is_empty() {
                            return Err(ChannelError::Closed.into());
                        }
                        break;
                    }
                }
            }
        }

        Ok(self.buffer.take())
    }

    /// Feed one channel message into the buffer. Returns `false` once the
    /// channel has reached end of stream.
    fn absorb(&mut self, msg: Option<ChannelMsg>) -> bool {
        match msg {
            Some(ChannelMsg::Data { ref data }) => {
                self.buffer.extend(data);
                true
            }
            Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                self.buffer.extend(data);
                true
            }
            Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => false,
            Some(other) => {
                trace!("ignoring channel message {:?}", other);
                true
            }
        }
    }

    /// Discard anything buffered so far.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Close the channel.
    pub async fn close(self) -> Result<()> {
        self.channel
            .close()
            .await
            .map_err(|e| ChannelError::Ssh(e).into())
    }
}
