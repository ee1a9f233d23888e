//! Timeouts and pauses for the discovery and upgrade workflows.
//!
//! Defaults reproduce the timings the workflows were tuned with against
//! real hardware. Tests shrink them or run on a paused clock.

use std::time::Duration;

use crate::error::{DriverError, Result};

/// Timeouts for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// TCP connect, SSH handshake and authentication.
    pub connect: Duration,

    /// Waiting for a command's prompt or expected pattern.
    pub command: Duration,
}

impl SessionTimeouts {
    /// Same value for both timeouts.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            connect: timeout,
            command: timeout,
        }
    }
}

/// Settings for the upgrade workflow.
#[derive(Debug, Clone)]
pub struct UpgradeConfig {
    /// Connect timeout for upgrade sessions.
    pub connect_timeout: Duration,

    /// Command timeout for upgrade sessions. Package checks and installs are
    /// slow, so this is longer than the discovery timeout.
    pub command_timeout: Duration,

    /// Pause after confirming a package install.
    pub install_confirm_delay: Duration,

    /// Pause after confirming a RouterBOARD firmware upgrade.
    pub firmware_confirm_delay: Duration,

    /// Pause after confirming a reboot.
    pub reboot_confirm_delay: Duration,

    /// Wait before the first probe after a reboot was triggered.
    pub reboot_grace_period: Duration,

    /// Pause between probes.
    pub reboot_poll_interval: Duration,

    /// Connect timeout for a single probe.
    pub probe_timeout: Duration,

    /// How long to wait for the device after a package install.
    pub reboot_deadline_after_install: Duration,

    /// How long to wait for the device after a firmware upgrade reboot.
    pub reboot_deadline_after_firmware: Duration,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
            install_confirm_delay: Duration::from_secs(5),
            firmware_confirm_delay: Duration::from_secs(3),
            reboot_confirm_delay: Duration::from_secs(2),
            reboot_grace_period: Duration::from_secs(30),
            reboot_poll_interval: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(10),
            reboot_deadline_after_install: Duration::from_secs(300),
            reboot_deadline_after_firmware: Duration::from_secs(240),
        }
    }
}

impl UpgradeConfig {
    /// Timeouts for the package, firmware and reboot sessions.
    pub fn session_timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            connect: self.connect_timeout,
            command: self.command_timeout,
        }
    }

    /// Timeouts for a reachability probe.
    pub fn probe_timeouts(&self) -> SessionTimeouts {
        SessionTimeouts::uniform(self.probe_timeout)
    }

    /// Reject settings the workflow cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.reboot_poll_interval.is_zero() {
            return Err(DriverError::InvalidConfig {
                message: "reboot poll interval must be greater than zero".to_string(),
            }
            .into());
        }
        if self.connect_timeout.is_zero() || self.probe_timeout.is_zero() {
            return Err(DriverError::InvalidConfig {
                message: "connect and probe timeouts must be greater than zero".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Settings for version discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub connect_timeout: Duration,
    pub command_timeout: Duration,

    /// How many times `/system package update print` is issued when the
    /// installed version is missing from its output.
    pub version_attempts: u32,

    /// Pause after each version query.
    pub version_retry_delay: Duration,

    /// Pause before checking for updates.
    pub check_delay: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            command_timeout: Duration::from_secs(15),
            version_attempts: 2,
            version_retry_delay: Duration::from_secs(2),
            check_delay: Duration::from_secs(1),
        }
    }
}

impl DiscoveryConfig {
    pub fn session_timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            connect: self.connect_timeout,
            command: self.command_timeout,
        }
    }
}

/// Settings for the sequential device loop.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Pause after each device.
    pub inter_device_pause: Duration,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            inter_device_pause: Duration::from_secs(1),
        }
    }
}
