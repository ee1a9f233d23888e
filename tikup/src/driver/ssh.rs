//! SSH driver: a platform-aware shell session over russh.

use std::time::{Duration, Instant};

use log::{debug, warn};
use regex::bytes::Regex;

use super::Driver;
use super::response::Response;
use crate::channel::{PtyChannel, PtyConfig, compile_prompt_pattern};
use crate::error::{ChannelError, Result};
use crate::platform::PlatformDefinition;
use crate::transport::{SshConfig, SshTransport};

/// Driver for one interactive SSH shell session.
///
/// Handles:
/// - SSH transport and PTY channel lifetime
/// - Login dialogs shown before the first prompt
/// - Command execution with prompt detection or idle-timing reads
/// - Output normalization and failure detection from the platform
pub struct SshDriver {
    host: String,

    platform: PlatformDefinition,

    transport: SshTransport,

    channel: PtyChannel,

    /// Timeout for prompt and pattern waits.
    timeout: Duration,

    /// Quiet period that ends a timing read.
    timing_idle: Duration,
}

impl SshDriver {
    /// Connect, authenticate, open a shell and wait for the first prompt.
    ///
    /// If anything fails after the SSH connection is up, the connection is
    /// closed before the error is returned.
    pub async fn open(
        ssh_config: SshConfig,
        platform: PlatformDefinition,
        timeout: Duration,
        timing_idle: Duration,
    ) -> Result<Self> {
        let transport = SshTransport::connect(&ssh_config).await?;

        let channel = match transport.open_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    debug!("{}: close after failed channel open: {}", ssh_config.host, close_err);
                }
                return Err(e);
            }
        };

        let channel = PtyChannel::new(
            channel,
            PtyConfig {
                line_ending: platform.line_ending,
                ..Default::default()
            },
        );

        let mut driver = Self {
            host: ssh_config.host,
            platform,
            transport,
            channel,
            timeout,
            timing_idle,
        };

        if let Err(e) = driver.wait_for_initial_prompt().await {
            let host = driver.host.clone();
            if let Err(close_err) = driver.close().await {
                debug!("{}: close after failed login: {}", host, close_err);
            }
            return Err(e);
        }

        Ok(driver)
    }

    /// Read the login banner, answering any login dialog, until the prompt.
    async fn wait_for_initial_prompt(&mut self) -> Result<()> {
        let combined = self.login_pattern()?;

        // Each dialog is answered at most once.
        for _ in 0..=self.platform.login_dialogs.len() {
            let data = self
                .channel
                .read_until_pattern(&combined, self.timeout)
                .await?;

            if self.platform.prompt.is_match(&data) {
                debug!("{}: logged in", self.host);
                return Ok(());
            }

            let reply = self
                .platform
                .login_dialogs
                .iter()
                .find(|dialog| dialog.pattern.is_match(&data))
                .map(|dialog| dialog.reply.clone());

            if let Some(reply) = reply {
                debug!("{}: answering login dialog with {:?}", self.host, reply);
                self.channel.send(&reply).await?;
            }
        }

        warn!("{}: login dialogs repeated without reaching a prompt", self.host);
        Err(ChannelError::PatternTimeout(self.timeout).into())
    }

    /// Pattern matching either the prompt or any login dialog.
    fn login_pattern(&self) -> Result<Regex> {
        let patterns: Vec<String> = std::iter::once(&self.platform.prompt)
            .chain(self.platform.login_dialogs.iter().map(|d| &d.pattern))
            .map(|re| format!("(?:{})", re.as_str()))
            .collect();

        Regex::new(&patterns.join("|")).map_err(|e| ChannelError::InvalidPattern(e).into())
    }

    /// Send `command` and read until `pattern` matches.
    async fn execute(&mut self, command: &str, pattern: &Regex) -> Result<Response> {
        let start = Instant::now();

        self.channel.clear_buffer();
        self.channel.send(command).await?;

        let data = self.channel.read_until_pattern(pattern, self.timeout).await?;

        Ok(self.build_response(command, &data, start.elapsed()))
    }

    /// Normalize output and check it for failure phrases.
    fn build_response(&self, command: &str, data: &[u8], elapsed: Duration) -> Response {
        let raw_result = String::from_utf8_lossy(data).to_string();
        let result = self.platform.normalize_output(&raw_result, command);

        debug!(
            "{}: '{}' returned {} bytes in {:?}",
            self.host,
            command,
            raw_result.len(),
            elapsed
        );

        match self.platform.detect_failure(&result) {
            Some(failure) => {
                let failure = failure.to_string();
                Response::failed(command, result, raw_result, elapsed, failure)
            }
            None => Response::new(command, result, raw_result, elapsed),
        }
    }

}

impl Driver for SshDriver {
    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let prompt = self.platform.prompt.clone();
        self.execute(command, &prompt).await
    }

    async fn send_command_expect(&mut self, command: &str, pattern: &str) -> Result<Response> {
        let pattern = compile_prompt_pattern(pattern).map_err(ChannelError::InvalidPattern)?;
        self.execute(command, &pattern).await
    }

    async fn send_command_timing(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();

        self.channel.clear_buffer();
        self.channel.send(command).await?;

        let data = self
            .channel
            .read_until_idle(self.timing_idle, self.timeout)
            .await?;

        Ok(self.build_response(command, &data, start.elapsed()))
    }

    async fn write_channel(&mut self, input: &str) -> Result<()> {
        self.channel.write_raw(input.as_bytes()).await
    }

    async fn close(self) -> Result<()> {
        let channel_result = self.channel.close().await;
        self.transport.close().await?;
        channel_result
    }
}
