//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tikup::HostKeyVerification;
use tikup::target::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(name = "tikup")]
#[command(author, version, about = "Mass RouterOS package and RouterBOARD firmware upgrades over SSH", long_about = None)]
pub struct Args {
    /// What to do with each device
    #[arg(long, value_enum)]
    pub mode: Mode,

    #[command(flatten)]
    pub selection: Selection,

    /// RouterOS user name (asked for when omitted)
    #[arg(long)]
    pub user: Option<String>,

    /// SSH port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// File every log line is appended to
    #[arg(long, default_value = "mikrotik_update.log")]
    pub log_file: PathBuf,

    /// How unknown or changed SSH host keys are handled
    #[arg(long, value_enum, default_value_t = HostKeyChecking::AcceptNew)]
    pub host_key_checking: HostKeyChecking,

    /// known_hosts file to check and record host keys in (default: ~/.ssh/known_hosts)
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Print the run summary as JSON after the log
    #[arg(long)]
    pub json: bool,
}

/// Exactly one device source.
#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Selection {
    /// Address of a single device
    #[arg(long)]
    pub ip: Option<String>,

    /// File with one device address per line
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Report installed and available versions, change nothing
    #[value(alias = "discover")]
    Gather,

    /// Install package updates and upgrade RouterBOARD firmware
    Upgrade,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKeyChecking {
    Strict,
    AcceptNew,
    Off,
}

impl From<HostKeyChecking> for HostKeyVerification {
    fn from(mode: HostKeyChecking) -> Self {
        match mode {
            HostKeyChecking::Strict => HostKeyVerification::Strict,
            HostKeyChecking::AcceptNew => HostKeyVerification::AcceptNew,
            HostKeyChecking::Off => HostKeyVerification::Disabled,
        }
    }
}
