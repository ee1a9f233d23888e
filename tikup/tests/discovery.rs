mod common;

use std::time::Duration;

use common::*;
use tikup::error::{DriverError, Error};
use tikup::platform::vendors::mikrotik_routeros::commands;
use tikup::{Discovery, DiscoveryConfig, DiscoveryResult, Fleet, FleetConfig, UpgradeConfig, Upgrader};
use tokio::time::Instant;

fn discovery(connector: &MockConnector) -> Discovery<MockConnector> {
    Discovery::new(connector.clone(), DiscoveryConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_report_with_update() {
    let connector = MockConnector::new([Step::Open(Session::new([
        output(PRINT_VERSION),
        output(CHECK_AVAILABLE),
    ]))]);

    let report = discovery(&connector).run(&target("10.0.0.1")).await.unwrap();

    assert_eq!(report.installed_version(), "7.1");
    assert!(report.update_available());
    assert_eq!(report.to_string(), "10.0.0.1 — version: 7.1 → new available: 7.2");
    assert_eq!(
        connector.commands(),
        [commands::PACKAGE_UPDATE_PRINT, commands::PACKAGE_UPDATE_CHECK]
    );
    connector.assert_sessions_closed();
}

#[tokio::test(start_paused = true)]
async fn test_version_found_on_retry() {
    let connector = MockConnector::new([Step::Open(Session::new([
        output("          channel: stable"),
        output(PRINT_VERSION),
        output(CHECK_UP_TO_DATE),
    ]))]);

    let start = Instant::now();
    let report = discovery(&connector).run(&target("10.0.0.1")).await.unwrap();

    assert_eq!(report.installed_version(), "7.1");
    assert!(!report.update_available());
    assert_eq!(
        connector.commands(),
        [
            commands::PACKAGE_UPDATE_PRINT,
            commands::PACKAGE_UPDATE_PRINT,
            commands::PACKAGE_UPDATE_CHECK
        ]
    );
    // one retry delay plus the pause before checking
    assert!(start.elapsed() >= Duration::from_secs(3));
    connector.assert_sessions_closed();
}

#[tokio::test(start_paused = true)]
async fn test_version_never_found() {
    let connector = MockConnector::new([Step::Open(Session::new([
        output("status: loading"),
        output("status: loading"),
        output(CHECK_UP_TO_DATE),
    ]))]);

    let err = discovery(&connector).run(&target("10.0.0.1")).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Driver(DriverError::MissingField {
            field: "installed-version",
            ..
        })
    ));
    assert!(
        !connector
            .commands()
            .iter()
            .any(|c| c == commands::PACKAGE_UPDATE_CHECK)
    );
    connector.assert_sessions_closed();
}

#[tokio::test(start_paused = true)]
async fn test_command_error_closes_session() {
    let connector = MockConnector::new([Step::Open(Session::new([Reply::ChannelClosed]))]);

    let err = discovery(&connector).run(&target("10.0.0.1")).await.unwrap_err();

    assert!(err.is_connection_loss());
    assert_eq!(connector.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fleet_continues_after_failure() {
    let connector = MockConnector::new([
        Step::Refuse,
        Step::Open(Session::new([output(PRINT_VERSION), output(CHECK_AVAILABLE)])),
    ]);
    let fleet = Fleet::new(FleetConfig::default());
    let targets = [target("10.0.0.1"), target("10.0.0.2")];

    let summary = fleet.discover_all(&discovery(&connector), &targets).await;

    assert_eq!(summary.entries.len(), 2);
    assert_eq!(summary.entries[0].address, "10.0.0.1");
    assert!(matches!(summary.entries[0].result, DiscoveryResult::Failed { .. }));
    assert!(matches!(summary.entries[1].result, DiscoveryResult::Report(_)));
    assert_eq!(summary.succeeded(), 1);
    assert!(!summary.all_succeeded());
}

#[tokio::test(start_paused = true)]
async fn test_fleet_pauses_between_devices() {
    let connector = MockConnector::default();
    let fleet = Fleet::new(FleetConfig::default());
    let upgrader = Upgrader::new(connector.clone(), UpgradeConfig::default());
    let targets = [target("10.0.0.1"), target("10.0.0.2"), target("10.0.0.3")];

    let start = Instant::now();
    let summary = fleet.upgrade_all(&upgrader, &targets).await;

    assert_eq!(summary.failed(), 3);
    assert_eq!(connector.connect_attempts(), 3);

    let times = connector.connect_times();
    assert_eq!(times[0], start);
    assert!(times[1] - times[0] >= Duration::from_secs(1));
    assert!(times[2] - times[1] >= Duration::from_secs(1));
}
