//! Workflow phases and per-device results.

use std::fmt;

use serde::Serialize;

/// A bounded step of the upgrade workflow, each with its own session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CheckingUpdate,
    Installing,
    AwaitingRebootAfterInstall,
    CheckingFirmware,
    UpgradingFirmware,
    TriggeringReboot,
    AwaitingRebootAfterFirmware,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::CheckingUpdate => "checking for package updates",
            Phase::Installing => "installing package update",
            Phase::AwaitingRebootAfterInstall => "waiting for reboot after install",
            Phase::CheckingFirmware => "checking RouterBOARD firmware",
            Phase::UpgradingFirmware => "upgrading RouterBOARD firmware",
            Phase::TriggeringReboot => "rebooting after firmware upgrade",
            Phase::AwaitingRebootAfterFirmware => "waiting for reboot after firmware upgrade",
        };
        f.write_str(name)
    }
}

/// How the upgrade workflow ended for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpgradeOutcome {
    /// Neither a package nor a firmware update was needed.
    UpToDate,

    /// Packages were upgraded; firmware was already current.
    Upgraded,

    /// No package update, but the RouterBOARD firmware was upgraded.
    FirmwareUpgraded,

    /// Packages and RouterBOARD firmware were both upgraded.
    UpgradedAndFirmwareUpgraded,

    /// The initial session could not be opened; nothing was sent.
    FailedConnect { reason: String },

    /// A command or session failed during `phase`.
    FailedDuringUpgrade { phase: Phase, reason: String },

    /// The device did not come back after a reboot.
    TimedOutAfterReboot { phase: Phase },
}

impl UpgradeOutcome {
    /// The device finished in a known good state.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            UpgradeOutcome::UpToDate
                | UpgradeOutcome::Upgraded
                | UpgradeOutcome::FirmwareUpgraded
                | UpgradeOutcome::UpgradedAndFirmwareUpgraded
        )
    }
}

impl fmt::Display for UpgradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeOutcome::UpToDate => write!(f, "up to date"),
            UpgradeOutcome::Upgraded => write!(f, "packages upgraded"),
            UpgradeOutcome::FirmwareUpgraded => write!(f, "RouterBOARD firmware upgraded"),
            UpgradeOutcome::UpgradedAndFirmwareUpgraded => {
                write!(f, "packages and RouterBOARD firmware upgraded")
            }
            UpgradeOutcome::FailedConnect { reason } => write!(f, "connection failed: {}", reason),
            UpgradeOutcome::FailedDuringUpgrade { phase, reason } => {
                write!(f, "failed while {}: {}", phase, reason)
            }
            UpgradeOutcome::TimedOutAfterReboot { phase } => {
                write!(f, "no response while {}", phase)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_classification() {
        assert!(UpgradeOutcome::UpToDate.is_success());
        assert!(UpgradeOutcome::UpgradedAndFirmwareUpgraded.is_success());
        assert!(
            !UpgradeOutcome::TimedOutAfterReboot {
                phase: Phase::AwaitingRebootAfterFirmware
            }
            .is_success()
        );
        assert!(
            !UpgradeOutcome::FailedConnect {
                reason: "refused".into()
            }
            .is_success()
        );
    }

    #[test]
    fn test_display() {
        let outcome = UpgradeOutcome::FailedDuringUpgrade {
            phase: Phase::Installing,
            reason: "Channel closed".into(),
        };
        assert_eq!(
            outcome.to_string(),
            "failed while installing package update: Channel closed"
        );
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(UpgradeOutcome::TimedOutAfterReboot {
            phase: Phase::AwaitingRebootAfterInstall,
        })
        .unwrap();
        assert_eq!(json["outcome"], "timed_out_after_reboot");
        assert_eq!(json["phase"], "awaiting_reboot_after_install");

        let json = serde_json::to_value(UpgradeOutcome::Upgraded).unwrap();
        assert_eq!(json["outcome"], "upgraded");
    }
}
