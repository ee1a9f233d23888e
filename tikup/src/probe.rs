//! Reachability polling after a reboot.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::config::UpgradeConfig;
use crate::driver::{Connector, Driver};
use crate::target::DeviceTarget;

/// Wait until `target` accepts an SSH login again, for at most `deadline`.
///
/// Sleeps the configured grace period first so a device that has not gone
/// down yet is not mistaken for one that is back. Then opens and closes a
/// session every poll interval. Returns `true` on the first successful
/// login and `false` once the deadline has passed; connection failures
/// are the expected state while the device boots and are never returned.
///
/// At most `deadline / poll_interval` probes are made, and no probe starts
/// after the deadline (counted from the end of the grace period).
pub async fn wait_until_online<C: Connector>(
    connector: &C,
    target: &DeviceTarget,
    deadline: Duration,
    config: &UpgradeConfig,
) -> bool {
    info!(
        "{} — waiting for the device to come back (up to {}s)",
        target,
        deadline.as_secs()
    );

    tokio::time::sleep(config.reboot_grace_period).await;

    let poll = config.reboot_poll_interval.max(Duration::from_millis(1));
    let max_attempts = (deadline.as_millis() / poll.as_millis()).max(1);
    let started = Instant::now();
    let timeouts = config.probe_timeouts();

    for attempt in 1..=max_attempts {
        let probe = tokio::time::timeout(config.probe_timeout, connector.connect(target, timeouts));
        match probe.await {
            Ok(Ok(session)) => {
                if let Err(e) = session.close().await {
                    debug!("{}: probe session close failed: {}", target, e);
                }
                info!("{} — device is back online", target);
                return true;
            }
            Ok(Err(e)) => {
                debug!("{}: probe {}/{} failed: {}", target, attempt, max_attempts, e);
            }
            Err(_) => {
                debug!("{}: probe {}/{} timed out", target, attempt, max_attempts);
            }
        }

        if attempt == max_attempts || started.elapsed() + poll > deadline {
            break;
        }
        tokio::time::sleep(poll).await;
    }

    warn!(
        "{} — not responding after the {}s timeout",
        target,
        deadline.as_secs()
    );
    false
}
