//! Connector opening real SSH sessions.

use std::path::PathBuf;

use secrecy::ExposeSecret;

use super::builder::DriverBuilder;
use super::ssh::SshDriver;
use super::Connector;
use crate::config::SessionTimeouts;
use crate::error::Result;
use crate::platform::PlatformDefinition;
use crate::platform::vendors::mikrotik_routeros;
use crate::target::DeviceTarget;
use crate::transport::HostKeyVerification;

/// Opens [`SshDriver`] sessions for device targets.
#[derive(Debug, Clone)]
pub struct SshConnector {
    platform: PlatformDefinition,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SshConnector {
    /// Connector for RouterOS devices with default SSH settings.
    pub fn new() -> Self {
        Self {
            platform: mikrotik_routeros::platform(),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the host key verification mode.
    pub fn with_host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than the user's default.
    pub fn with_known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    fn builder(&self, target: &DeviceTarget, timeouts: SessionTimeouts) -> DriverBuilder {
        let credentials = target.credentials();
        let builder = DriverBuilder::new(target.address())
            .port(target.port())
            .username(credentials.username())
            .password(credentials.password().expose_secret())
            .platform(self.platform.clone())
            .connect_timeout(timeouts.connect)
            .command_timeout(timeouts.command)
            .host_key_verification(self.host_key_verification.clone());

        match &self.known_hosts_path {
            Some(path) => builder.known_hosts_path(path.clone()),
            None => builder,
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SshConnector {
    type Driver = SshDriver;

    async fn connect(&self, target: &DeviceTarget, timeouts: SessionTimeouts) -> Result<SshDriver> {
        self.builder(target, timeouts).open().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::target::Credentials;

    fn target() -> DeviceTarget {
        DeviceTarget::new("10.0.0.1", Arc::new(Credentials::new("admin", "secret"))).with_port(2222)
    }

    #[test]
    fn test_session_settings_from_target() {
        let connector = SshConnector::new()
            .with_host_key_verification(HostKeyVerification::Strict)
            .with_known_hosts_path("/etc/tikup/known_hosts");

        let (config, platform, command_timeout, _) = connector
            .builder(&target(), SessionTimeouts::uniform(Duration::from_secs(10)))
            .into_parts()
            .unwrap();

        assert_eq!(config.socket_addr(), "10.0.0.1:2222");
        assert_eq!(config.username, "admin+ct511w4098h");
        assert_eq!(config.host_key_verification, HostKeyVerification::Strict);
        assert_eq!(
            config.known_hosts_path,
            Some(PathBuf::from("/etc/tikup/known_hosts"))
        );
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(command_timeout, Duration::from_secs(10));
        assert_eq!(platform.name, mikrotik_routeros::PLATFORM_NAME);
    }

    #[test]
    fn test_default_known_hosts() {
        let (config, ..) = SshConnector::default()
            .builder(&target(), SessionTimeouts::uniform(Duration::from_secs(5)))
            .into_parts()
            .unwrap();

        assert_eq!(config.known_hosts_path, None);
        assert_eq!(config.host_key_verification, HostKeyVerification::AcceptNew);
    }
}
