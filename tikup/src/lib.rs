//! # tikup
//!
//! Package and RouterBOARD firmware upgrades for fleets of MikroTik
//! RouterOS devices, driven over SSH.
//!
//! Two workflows are provided:
//!
//! - [`Discovery`] logs in, reads the installed RouterOS version and asks
//!   the device whether a newer one exists. Nothing is changed.
//! - [`Upgrader`] checks for and installs a package update, waits for the
//!   device to reboot, then upgrades the RouterBOARD bootloader if a newer
//!   one is staged and reboots again.
//!
//! [`Fleet`] runs either workflow over a list of devices, one at a time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tikup::{Credentials, DeviceTarget, SshConnector, UpgradeConfig, Upgrader};
//!
//! #[tokio::main]
//! async fn main() {
//!     let credentials = Arc::new(Credentials::new("admin", "secret"));
//!     let target = DeviceTarget::new("192.168.88.1", credentials);
//!
//!     let upgrader = Upgrader::new(SshConnector::new(), UpgradeConfig::default());
//!     let outcome = upgrader.run(&target).await;
//!     println!("{}: {}", target, outcome);
//! }
//! ```

pub mod channel;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod fleet;
pub mod parser;
pub mod platform;
pub mod probe;
pub mod target;
pub mod transport;
pub mod upgrade;

// Re-export main types for convenience
pub use config::{DiscoveryConfig, FleetConfig, SessionTimeouts, UpgradeConfig};
pub use discovery::{Discovery, DiscoveryReport};
pub use driver::{Connector, Driver, DriverBuilder, Response, SshConnector, SshDriver};
pub use error::{Error, Result};
pub use fleet::{DiscoveryResult, Fleet, FleetEntry, FleetSummary};
pub use parser::{FirmwareInfo, VersionInfo};
pub use platform::PlatformDefinition;
pub use probe::wait_until_online;
pub use target::{Credentials, DeviceTarget};
pub use transport::{HostKeyVerification, SshConfig};
pub use upgrade::{Phase, UpgradeOutcome, Upgrader};
