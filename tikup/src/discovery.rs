//! Read-only version discovery.

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::config::DiscoveryConfig;
use crate::driver::{Connector, Driver};
use crate::error::{DriverError, Result};
use crate::parser::{self, VersionInfo};
use crate::platform::vendors::mikrotik_routeros::commands;
use crate::target::DeviceTarget;

/// Package versions of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub address: String,
    pub version: VersionInfo,
}

impl DiscoveryReport {
    /// The installed RouterOS version.
    pub fn installed_version(&self) -> &str {
        self.version.installed_version.as_deref().unwrap_or_default()
    }

    /// Whether the device reported a newer package.
    pub fn update_available(&self) -> bool {
        self.version.update_available()
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.update_available() {
            write!(
                f,
                "{} — version: {} → new available: {}",
                self.address,
                self.installed_version(),
                self.version
                    .latest_version
                    .as_deref()
                    .filter(|latest| !latest.is_empty())
                    .unwrap_or("unknown")
            )
        } else {
            write!(
                f,
                "{} — version: {} — no updates",
                self.address,
                self.installed_version()
            )
        }
    }
}

/// Reads installed and available versions without changing anything.
pub struct Discovery<C> {
    connector: C,
    config: DiscoveryConfig,
}

impl<C: Connector> Discovery<C> {
    pub fn new(connector: C, config: DiscoveryConfig) -> Self {
        Self { connector, config }
    }

    /// Query one device. The session is closed whether or not this succeeds.
    pub async fn run(&self, target: &DeviceTarget) -> Result<DiscoveryReport> {
        info!("{} — connecting", target);

        let mut session = self
            .connector
            .connect(target, self.config.session_timeouts())
            .await?;

        let result = self.query(target, &mut session).await;

        if let Err(e) = session.close().await {
            debug!("{}: session close failed: {}", target, e);
        }

        let report = result?;
        info!("{}", report);
        Ok(report)
    }

    async fn query<D: Driver>(&self, target: &DeviceTarget, session: &mut D) -> Result<DiscoveryReport> {
        let installed = self.installed_version(target, session).await?;

        tokio::time::sleep(self.config.check_delay).await;

        let response = session
            .send_command(commands::PACKAGE_UPDATE_CHECK)
            .await?
            .ensure_success()?;
        let mut version = VersionInfo::parse(&response.result);
        version.installed_version = Some(installed);

        Ok(DiscoveryReport {
            address: target.to_string(),
            version,
        })
    }

    /// `/system package update print`, repeated while the version is missing.
    ///
    /// Right after login RouterOS sometimes answers before the package
    /// information is loaded.
    async fn installed_version<D: Driver>(
        &self,
        target: &DeviceTarget,
        session: &mut D,
    ) -> Result<String> {
        let attempts = self.config.version_attempts.max(1);

        for attempt in 1..=attempts {
            let response = session
                .send_command(commands::PACKAGE_UPDATE_PRINT)
                .await?
                .ensure_success()?;

            if let Some(version) = parser::parse_installed_version(&response.result) {
                return Ok(version);
            }

            debug!(
                "{}: no installed version in output (attempt {}/{})",
                target, attempt, attempts
            );
            if attempt < attempts {
                tokio::time::sleep(self.config.version_retry_delay).await;
            }
        }

        Err(DriverError::MissingField {
            command: commands::PACKAGE_UPDATE_PRINT,
            field: parser::INSTALLED_VERSION,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(latest: Option<&str>, status: Option<&str>) -> DiscoveryReport {
        DiscoveryReport {
            address: "10.0.0.1".to_string(),
            version: VersionInfo {
                installed_version: Some("7.1".to_string()),
                latest_version: latest.map(str::to_string),
                update_status: status.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_status_line_with_update() {
        let report = sample(Some("7.2"), Some("New version is available"));
        assert_eq!(
            report.to_string(),
            "10.0.0.1 — version: 7.1 → new available: 7.2"
        );
    }

    #[test]
    fn test_status_line_without_update() {
        let report = sample(Some("7.1"), Some("System is already up to date"));
        assert_eq!(report.to_string(), "10.0.0.1 — version: 7.1 — no updates");

        let report = sample(None, None);
        assert_eq!(report.to_string(), "10.0.0.1 — version: 7.1 — no updates");
    }

    #[test]
    fn test_status_line_flagged_without_latest() {
        let report = sample(None, Some("New version is available"));
        assert_eq!(
            report.to_string(),
            "10.0.0.1 — version: 7.1 → new available: unknown"
        );

        let report = sample(Some(""), Some("New version is available"));
        assert_eq!(
            report.to_string(),
            "10.0.0.1 — version: 7.1 → new available: unknown"
        );
    }
}
