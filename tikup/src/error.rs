//! Error types for tikup.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for tikup operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl Error {
    /// Whether this error is what a device that is going down for a reboot
    /// produces: a dropped channel, a closed session or a stalled read.
    ///
    /// Authentication failures, host key problems and command failures are
    /// never connection loss.
    pub fn is_connection_loss(&self) -> bool {
        match self {
            Error::Transport(e) => matches!(
                e,
                TransportError::Disconnected
                    | TransportError::Timeout(_)
                    | TransportError::Ssh(_)
                    | TransportError::Io(_)
            ),
            Error::Channel(e) => matches!(
                e,
                ChannelError::Closed | ChannelError::PatternTimeout(_) | ChannelError::Ssh(_)
            ),
            Error::Driver(_) => false,
        }
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host is not present in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (command execution, configuration, inputs).
#[derive(Error, Debug)]
pub enum DriverError {
    /// The device answered a command with an error message
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Invalid configuration in the driver builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The device target list could not be read
    #[error("Cannot read target list {}: {source}", path.display())]
    TargetList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The device target list contained no addresses
    #[error("Target list {} contains no addresses", path.display())]
    EmptyTargetList { path: PathBuf },

    /// An expected field was missing from command output
    #[error("Could not determine {field} from '{command}' output")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },
}

/// Result type alias using tikup's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_loss_classification() {
        assert!(Error::from(ChannelError::Closed).is_connection_loss());
        assert!(Error::from(TransportError::Disconnected).is_connection_loss());
        assert!(
            Error::from(ChannelError::PatternTimeout(Duration::from_secs(2))).is_connection_loss()
        );

        let auth = Error::from(TransportError::AuthenticationFailed {
            user: "admin".into(),
        });
        assert!(!auth.is_connection_loss());

        let failed = Error::from(DriverError::CommandFailed {
            command: "/system reboot".into(),
            message: "bad command name".into(),
        });
        assert!(!failed.is_connection_loss());
    }

    #[test]
    fn test_error_display() {
        let err = Error::from(DriverError::MissingField {
            command: "/system package update print",
            field: "installed-version",
        });
        assert_eq!(
            err.to_string(),
            "Driver error: Could not determine installed-version from \
             '/system package update print' output"
        );
    }
}
