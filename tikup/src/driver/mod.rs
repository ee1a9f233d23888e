//! Remote sessions.
//!
//! The workflows never talk to russh directly. They open sessions through a
//! [`Connector`] and drive them through the [`Driver`] trait, which keeps the
//! upgrade state machine testable against scripted sessions.

mod builder;
mod connector;
pub(crate) mod response;
mod ssh;

pub use builder::DriverBuilder;
pub use connector::SshConnector;
pub use response::Response;
pub use ssh::SshDriver;

use std::future::Future;

use crate::config::SessionTimeouts;
use crate::error::Result;
use crate::target::DeviceTarget;

/// An open interactive session on one device.
///
/// A driver is owned by exactly one workflow phase and is consumed by
/// [`close`](Driver::close).
pub trait Driver: Send {
    /// Send a command and wait for the prompt.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Send a command and wait for `pattern` instead of the prompt.
    ///
    /// Used for commands that end in a question, such as
    /// `/system routerboard upgrade` asking `[y/n]`.
    fn send_command_expect(
        &mut self,
        command: &str,
        pattern: &str,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Send a command and return whatever output arrives until the device
    /// goes quiet, without waiting for any particular text.
    fn send_command_timing(&mut self, command: &str)
    -> impl Future<Output = Result<Response>> + Send;

    /// Write raw text to the channel, e.g. `"y\n"` to answer a question.
    fn write_channel(&mut self, input: &str) -> impl Future<Output = Result<()>> + Send;

    /// Disconnect.
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens sessions to devices.
pub trait Connector: Send + Sync {
    /// The session type produced.
    type Driver: Driver;

    /// Open an authenticated session.
    fn connect(
        &self,
        target: &DeviceTarget,
        timeouts: SessionTimeouts,
    ) -> impl Future<Output = Result<Self::Driver>> + Send;
}
