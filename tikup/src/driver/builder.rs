//! Builder for opening SSH drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::ssh::SshDriver;
use crate::error::{DriverError, Result};
use crate::platform::PlatformDefinition;
use crate::platform::vendors::mikrotik_routeros;
use crate::transport::{HostKeyVerification, SshConfig};

/// Builder for constructing and opening an [`SshDriver`].
///
/// # Example
///
/// ```rust,no_run
/// use tikup::driver::{Driver, DriverBuilder};
///
/// # async fn example() -> Result<(), tikup::Error> {
/// let mut driver = DriverBuilder::new("192.168.88.1")
///     .username("admin")
///     .password("secret")
///     .open()
///     .await?;
///
/// let response = driver.send_command("/system routerboard print").await?;
/// println!("{}", response.result);
///
/// driver.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    platform: Option<PlatformDefinition>,
    connect_timeout: Duration,
    command_timeout: Duration,
    timing_idle: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl DriverBuilder {
    /// Create a new driver builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            password: None,
            platform: None,
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
            timing_idle: Duration::from_secs(2),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set the platform (default: MikroTik RouterOS).
    pub fn platform(mut self, platform: PlatformDefinition) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the timeout for prompt and pattern waits.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than the user's default.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Validate the settings and produce the SSH configuration.
    pub(super) fn into_parts(self) -> Result<(SshConfig, PlatformDefinition, Duration, Duration)> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        let password = self.password.ok_or_else(|| DriverError::InvalidConfig {
            message: "Password is required".to_string(),
        })?;

        if self.command_timeout.is_zero() {
            return Err(DriverError::InvalidConfig {
                message: "Command timeout must be greater than zero".to_string(),
            }
            .into());
        }

        let platform = self.platform.unwrap_or_else(mikrotik_routeros::platform);

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username: platform.login_username(&username),
            password,
            connect_timeout: self.connect_timeout,
            terminal_width: platform.terminal_width,
            terminal_height: platform.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        Ok((ssh_config, platform, self.command_timeout, self.timing_idle))
    }

    /// Connect and return a driver sitting at the device prompt.
    pub async fn open(self) -> Result<SshDriver> {
        let (ssh_config, platform, command_timeout, timing_idle) = self.into_parts()?;
        SshDriver::open(ssh_config, platform, command_timeout, timing_idle).await
    }
}
