//! The per-device upgrade workflow.
//!
//! One device goes through two independent tracks, always in this order:
//!
//! ```text
//! Connecting ─► CheckingUpdate ─┬─ no update ─────────────────────────────┐
//!                               └─► Installing ─┬─ "up to date" ───────────┤
//!                                               ├─ confirmed ─┐            │
//!                                               └─ ambiguous ─┴─► reboot   │
//!                                                                  wait    │
//!                                                                   │      │
//!    ┌──────────────────────────────────────────────────────────────┘◄─────┘
//!    ▼
//! CheckingFirmware ─┬─ current ─────────────────────────────────────► done
//!                   └─► UpgradingFirmware ─► TriggeringReboot ─► reboot wait
//! ```
//!
//! Every phase opens its own session, because the device may have rebooted
//! since the previous one, and closes it before moving on. Errors stay in
//! the phase that raised them and end the workflow with an
//! [`UpgradeOutcome`]; nothing propagates to the caller.

mod outcome;

pub use outcome::{Phase, UpgradeOutcome};

use log::{debug, error, info, warn};

use crate::channel::{ConfirmationPrompt, PhrasePrompt};
use crate::config::UpgradeConfig;
use crate::driver::{Connector, Driver};
use crate::error::{Error, Result};
use crate::parser::{FirmwareInfo, VersionInfo};
use crate::platform::vendors::mikrotik_routeros::commands;
use crate::probe::wait_until_online;
use crate::target::DeviceTarget;

/// Runs the upgrade workflow against devices reached through `C`.
pub struct Upgrader<C> {
    connector: C,
    config: UpgradeConfig,
    install_prompt: Box<dyn ConfirmationPrompt>,
    up_to_date: Box<dyn ConfirmationPrompt>,
    reboot_prompt: Box<dyn ConfirmationPrompt>,
}

/// Where the package track ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackageStage {
    NoUpdate,
    Installed { back_online: bool },
}

/// Where the firmware track ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirmwareStage {
    Current,
    Upgraded,
}

/// What the device said to the install command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstallResult {
    Confirmed,
    AlreadyUpToDate,
    Ambiguous,
}

/// What happened when the reboot command went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RebootTrigger {
    Confirmed,
    SentWithoutPrompt,
    ConnectionDropped,
}

/// Why the workflow stopped early.
#[derive(Debug)]
enum Halt {
    Failed { phase: Phase, error: Error },
    TimedOut { phase: Phase },
}

impl Halt {
    fn failed(phase: Phase) -> impl FnOnce(Error) -> Halt {
        move |error| Halt::Failed { phase, error }
    }
}

impl From<Halt> for UpgradeOutcome {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::Failed { phase, error } => UpgradeOutcome::FailedDuringUpgrade {
                phase,
                reason: error.to_string(),
            },
            Halt::TimedOut { phase } => UpgradeOutcome::TimedOutAfterReboot { phase },
        }
    }
}

impl<C: Connector> Upgrader<C> {
    /// Create an upgrader with the standard RouterOS prompt phrasings.
    pub fn new(connector: C, config: UpgradeConfig) -> Self {
        Self {
            connector,
            config,
            install_prompt: Box::new(PhrasePrompt::package_upgrade()),
            up_to_date: Box::new(PhrasePrompt::up_to_date()),
            reboot_prompt: Box::new(PhrasePrompt::yes_no()),
        }
    }

    /// Replace the predicate recognising the package install question.
    pub fn with_install_prompt(mut self, prompt: impl ConfirmationPrompt + 'static) -> Self {
        self.install_prompt = Box::new(prompt);
        self
    }

    /// Replace the predicate recognising "already up to date" install output.
    pub fn with_up_to_date_phrase(mut self, prompt: impl ConfirmationPrompt + 'static) -> Self {
        self.up_to_date = Box::new(prompt);
        self
    }

    /// Replace the predicate recognising the reboot question.
    pub fn with_reboot_prompt(mut self, prompt: impl ConfirmationPrompt + 'static) -> Self {
        self.reboot_prompt = Box::new(prompt);
        self
    }

    /// Run the whole workflow for one device.
    pub async fn run(&self, target: &DeviceTarget) -> UpgradeOutcome {
        info!("{} — connecting for upgrade", target);

        let session = match self
            .connector
            .connect(target, self.config.session_timeouts())
            .await
        {
            Ok(session) => session,
            Err(e) => {
                error!("{} — connection failed: {}", target, e);
                return UpgradeOutcome::FailedConnect {
                    reason: e.to_string(),
                };
            }
        };

        let package = match self.package_track(target, session).await {
            Ok(stage) => stage,
            Err(halt) => return self.halted(target, halt),
        };

        let firmware = match self.firmware_track(target, package).await {
            Ok(stage) => stage,
            Err(halt) => {
                if matches!(package, PackageStage::Installed { .. }) {
                    warn!(
                        "{} — package upgrade was already applied before the firmware stage stopped",
                        target
                    );
                }
                return self.halted(target, halt);
            }
        };

        let outcome = match (package, firmware) {
            (PackageStage::NoUpdate, FirmwareStage::Current) => UpgradeOutcome::UpToDate,
            (PackageStage::Installed { .. }, FirmwareStage::Current) => UpgradeOutcome::Upgraded,
            (PackageStage::NoUpdate, FirmwareStage::Upgraded) => UpgradeOutcome::FirmwareUpgraded,
            (PackageStage::Installed { .. }, FirmwareStage::Upgraded) => {
                UpgradeOutcome::UpgradedAndFirmwareUpgraded
            }
        };

        info!("{} — done: {}", target, outcome);
        outcome
    }

    fn halted(&self, target: &DeviceTarget, halt: Halt) -> UpgradeOutcome {
        match &halt {
            Halt::Failed { phase, error } => {
                error!("{} — error while {}: {}", target, phase, error)
            }
            Halt::TimedOut { phase } => {
                error!("{} — device did not come back while {}", target, phase)
            }
        }
        halt.into()
    }

    /// Check for a package update on the already open session and install it.
    async fn package_track<D: Driver>(
        &self,
        target: &DeviceTarget,
        mut session: D,
    ) -> std::result::Result<PackageStage, Halt> {
        let checked = self.check_for_updates(&mut session).await;
        let info = match checked {
            Ok(info) => info,
            Err(e) => {
                self.release(target, session).await;
                return Err(Halt::Failed {
                    phase: Phase::CheckingUpdate,
                    error: e,
                });
            }
        };

        if !info.update_available() {
            info!(
                "{} — no package updates ({}), checking RouterBOARD...",
                target,
                info.update_status.as_deref().unwrap_or("status unknown")
            );
            self.release(target, session).await;
            return Ok(PackageStage::NoUpdate);
        }

        info!(
            "{} — update to {} available, installing...",
            target,
            info.latest_version.as_deref().unwrap_or("an unknown version")
        );

        let installed = self.install(target, &mut session).await;
        self.release(target, session).await;

        match installed.map_err(Halt::failed(Phase::Installing))? {
            InstallResult::AlreadyUpToDate => Ok(PackageStage::NoUpdate),
            InstallResult::Confirmed | InstallResult::Ambiguous => {
                let back_online = wait_until_online(
                    &self.connector,
                    target,
                    self.config.reboot_deadline_after_install,
                    &self.config,
                )
                .await;
                if !back_online {
                    warn!(
                        "{} — continuing with the RouterBOARD check anyway",
                        target
                    );
                }
                Ok(PackageStage::Installed { back_online })
            }
        }
    }

    async fn check_for_updates<D: Driver>(&self, session: &mut D) -> Result<VersionInfo> {
        let response = session
            .send_command(commands::PACKAGE_UPDATE_CHECK)
            .await?
            .ensure_success()?;
        Ok(VersionInfo::parse(&response.result))
    }

    /// Issue the install command and answer its question if one appears.
    async fn install<D: Driver>(
        &self,
        target: &DeviceTarget,
        session: &mut D,
    ) -> Result<InstallResult> {
        let response = session
            .send_command_timing(commands::PACKAGE_UPDATE_INSTALL)
            .await?
            .ensure_success()?;

        if self
            .install_prompt
            .looks_like_confirmation(&response.raw_result)
        {
            session.write_channel(commands::CONFIRM).await?;
            tokio::time::sleep(self.config.install_confirm_delay).await;
            info!("{} — install confirmed, waiting for reboot...", target);
            return Ok(InstallResult::Confirmed);
        }

        info!("{} — response: {}", target, response.result.trim());

        if self.up_to_date.looks_like_confirmation(&response.raw_result) {
            info!("{} — already up to date, skipping reboot", target);
            return Ok(InstallResult::AlreadyUpToDate);
        }

        warn!(
            "{} — no confirmation prompt seen, the install may have started without one",
            target
        );
        Ok(InstallResult::Ambiguous)
    }

    /// Check the RouterBOARD firmware on a fresh session and upgrade it if
    /// a newer one is staged.
    async fn firmware_track(
        &self,
        target: &DeviceTarget,
        package: PackageStage,
    ) -> std::result::Result<FirmwareStage, Halt> {
        let mut session = match self
            .connector
            .connect(target, self.config.session_timeouts())
            .await
        {
            Ok(session) => session,
            Err(e) if package == (PackageStage::Installed { back_online: false }) => {
                debug!("{}: firmware session after reboot timeout: {}", target, e);
                return Err(Halt::TimedOut {
                    phase: Phase::AwaitingRebootAfterInstall,
                });
            }
            Err(e) => {
                return Err(Halt::Failed {
                    phase: Phase::CheckingFirmware,
                    error: e,
                });
            }
        };

        let firmware = match self.check_firmware(&mut session).await {
            Ok(firmware) => firmware,
            Err(e) => {
                self.release(target, session).await;
                return Err(Halt::Failed {
                    phase: Phase::CheckingFirmware,
                    error: e,
                });
            }
        };

        if !firmware.needs_upgrade() {
            if firmware.is_complete() {
                info!(
                    "{} — RouterBOARD firmware is current ({})",
                    target,
                    firmware.current_firmware.as_deref().unwrap_or_default()
                );
            } else {
                warn!(
                    "{} — could not read RouterBOARD firmware versions, skipping firmware upgrade",
                    target
                );
            }
            self.release(target, session).await;
            return Ok(FirmwareStage::Current);
        }

        info!(
            "{} — RouterBOARD upgrade required: {} → {}",
            target,
            firmware.current_firmware.as_deref().unwrap_or_default(),
            firmware.upgrade_firmware.as_deref().unwrap_or_default()
        );

        let upgraded = self.upgrade_firmware(&mut session).await;
        self.release(target, session).await;
        upgraded.map_err(Halt::failed(Phase::UpgradingFirmware))?;

        info!("{} — RouterBOARD upgrade done, sending reboot...", target);
        self.trigger_reboot(target)
            .await
            .map_err(Halt::failed(Phase::TriggeringReboot))?;

        let back_online = wait_until_online(
            &self.connector,
            target,
            self.config.reboot_deadline_after_firmware,
            &self.config,
        )
        .await;

        if !back_online {
            return Err(Halt::TimedOut {
                phase: Phase::AwaitingRebootAfterFirmware,
            });
        }

        Ok(FirmwareStage::Upgraded)
    }

    async fn check_firmware<D: Driver>(&self, session: &mut D) -> Result<FirmwareInfo> {
        let response = session
            .send_command(commands::ROUTERBOARD_PRINT)
            .await?
            .ensure_success()?;
        Ok(FirmwareInfo::parse(&response.result))
    }

    async fn upgrade_firmware<D: Driver>(&self, session: &mut D) -> Result<()> {
        session
            .send_command_expect(commands::ROUTERBOARD_UPGRADE, commands::YES_NO_PATTERN)
            .await?
            .ensure_success()?;
        session.write_channel(commands::CONFIRM).await?;
        tokio::time::sleep(self.config.firmware_confirm_delay).await;
        Ok(())
    }

    /// Send `/system reboot` on a new session, fire-and-forget.
    ///
    /// The device starts going down as soon as the reboot is confirmed, so
    /// losing the connection from that point on is expected. Failing to open
    /// the session, or the device rejecting the command, is not.
    async fn trigger_reboot(&self, target: &DeviceTarget) -> Result<()> {
        let mut session = self
            .connector
            .connect(target, self.config.session_timeouts())
            .await?;

        let sent = match self.send_reboot(&mut session).await {
            Ok(trigger) => trigger,
            Err(e) if e.is_connection_loss() => {
                debug!("{}: connection dropped during reboot: {}", target, e);
                RebootTrigger::ConnectionDropped
            }
            Err(e) => {
                self.release(target, session).await;
                return Err(e);
            }
        };

        if let Err(e) = session.close().await {
            debug!("{}: close after reboot ignored: {}", target, e);
        }

        match sent {
            RebootTrigger::Confirmed => info!("{} — reboot confirmed", target),
            RebootTrigger::SentWithoutPrompt => {
                info!("{} — reboot sent, no confirmation was asked", target)
            }
            RebootTrigger::ConnectionDropped => {
                info!("{} — connection closed by the rebooting device", target)
            }
        }
        Ok(())
    }

    async fn send_reboot<D: Driver>(&self, session: &mut D) -> Result<RebootTrigger> {
        let response = session
            .send_command_timing(commands::SYSTEM_REBOOT)
            .await?
            .ensure_success()?;

        if !self
            .reboot_prompt
            .looks_like_confirmation(&response.raw_result)
        {
            return Ok(RebootTrigger::SentWithoutPrompt);
        }

        session.write_channel(commands::CONFIRM).await?;
        tokio::time::sleep(self.config.reboot_confirm_delay).await;
        Ok(RebootTrigger::Confirmed)
    }

    /// Close a session, logging instead of failing.
    async fn release<D: Driver>(&self, target: &DeviceTarget, session: D) {
        if let Err(e) = session.close().await {
            debug!("{}: session close failed: {}", target, e);
        }
    }
}
