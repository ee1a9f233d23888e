//! Running a workflow over every device of a run.

use log::{error, info};
use serde::Serialize;

use crate::config::FleetConfig;
use crate::discovery::{Discovery, DiscoveryReport};
use crate::driver::Connector;
use crate::target::DeviceTarget;
use crate::upgrade::{UpgradeOutcome, Upgrader};

/// A per-device result that can be counted as success or failure.
pub trait DeviceResult {
    fn is_success(&self) -> bool;
}

impl DeviceResult for UpgradeOutcome {
    fn is_success(&self) -> bool {
        UpgradeOutcome::is_success(self)
    }
}

/// Result of discovering one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryResult {
    Report(DiscoveryReport),
    Failed { reason: String },
}

impl DeviceResult for DiscoveryResult {
    fn is_success(&self) -> bool {
        matches!(self, DiscoveryResult::Report(_))
    }
}

/// One device's line in the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct FleetEntry<T> {
    pub address: String,
    pub result: T,
}

/// Results of a whole run, in target order.
#[derive(Debug, Clone, Serialize)]
pub struct FleetSummary<T> {
    pub entries: Vec<FleetEntry<T>>,
}

impl<T: DeviceResult> FleetSummary<T> {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    /// Every device finished successfully.
    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|e| e.result.is_success())
    }
}

impl<T> Default for FleetSummary<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

/// Processes devices strictly one after another.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    config: FleetConfig,
}

impl Fleet {
    pub fn new(config: FleetConfig) -> Self {
        Self { config }
    }

    /// Discover versions on every target. Failures are logged and recorded;
    /// the run always continues with the next device.
    pub async fn discover_all<C: Connector>(
        &self,
        discovery: &Discovery<C>,
        targets: &[DeviceTarget],
    ) -> FleetSummary<DiscoveryResult> {
        let mut summary = FleetSummary::default();

        for (index, target) in targets.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.inter_device_pause).await;
            }

            let result = match discovery.run(target).await {
                Ok(report) => DiscoveryResult::Report(report),
                Err(e) => {
                    error!("{} — error: {}", target, e);
                    DiscoveryResult::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            summary.entries.push(FleetEntry {
                address: target.to_string(),
                result,
            });
        }

        info!(
            "Discovery finished: {} of {} devices answered",
            summary.succeeded(),
            summary.entries.len()
        );
        summary
    }

    /// Upgrade every target.
    pub async fn upgrade_all<C: Connector>(
        &self,
        upgrader: &Upgrader<C>,
        targets: &[DeviceTarget],
    ) -> FleetSummary<UpgradeOutcome> {
        let mut summary = FleetSummary::default();

        for (index, target) in targets.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.inter_device_pause).await;
            }

            info!("===== {} ({}/{}) =====", target, index + 1, targets.len());
            let outcome = upgrader.run(target).await;
            summary.entries.push(FleetEntry {
                address: target.to_string(),
                result: outcome,
            });
        }

        info!(
            "Upgrade finished: {} succeeded, {} failed",
            summary.succeeded(),
            summary.failed()
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::Phase;

    #[test]
    fn test_summary_counts() {
        let summary = FleetSummary {
            entries: vec![
                FleetEntry {
                    address: "10.0.0.1".to_string(),
                    result: UpgradeOutcome::Upgraded,
                },
                FleetEntry {
                    address: "10.0.0.2".to_string(),
                    result: UpgradeOutcome::TimedOutAfterReboot {
                        phase: Phase::AwaitingRebootAfterFirmware,
                    },
                },
            ],
        };
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn test_summary_json() {
        let summary = FleetSummary {
            entries: vec![FleetEntry {
                address: "10.0.0.9".to_string(),
                result: DiscoveryResult::Failed {
                    reason: "refused".to_string(),
                },
            }],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["entries"][0]["address"], "10.0.0.9");
        assert_eq!(json["entries"][0]["result"]["failed"]["reason"], "refused");
    }
}
